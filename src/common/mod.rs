//! Input loading shared by the library and the command-line runner.

pub mod config;
pub mod scene;
