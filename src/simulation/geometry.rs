//! Geometry between access points and user tracks.
//!
//! Contains helper functions for:
//! - Euclidean distance and squared distance between points
//! - Bearing from an AP to a user (used by the directional antenna model)
//! - The full AP × user × time distance tensor consumed by the orchestrator

use super::mobility::MobilityTrace;
use super::types::{AccessPoint, Point};

/// Squared Euclidean distance in meters².
pub fn distance2(a: &Point, b: &Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

pub fn distance(a: &Point, b: &Point) -> f64 {
    distance2(a, b).sqrt()
}

/// Bearing of `user` as seen from `ap`, in radians in (-π, π], measured
/// counter-clockwise from the positive x axis.
pub fn bearing(ap: &Point, user: &Point) -> f64 {
    (user.y - ap.y).atan2(user.x - ap.x)
}

/// Smallest absolute angle between two azimuths, in degrees within [0, 180].
pub fn angular_offset_deg(a_deg: f64, b_deg: f64) -> f64 {
    let diff = (a_deg - b_deg).rem_euclid(360.0);
    if diff > 180.0 { 360.0 - diff } else { diff }
}

/// Distance from every AP to one user track: `[ap][t]`.
pub fn distances_to_track(aps: &[AccessPoint], track: &[Point]) -> Vec<Vec<f64>> {
    aps.iter()
        .map(|ap| track.iter().map(|p| distance(&ap.position, p)).collect())
        .collect()
}

/// Distance tensor indexed `[ap][user][t]`.
pub fn distance_tensor(aps: &[AccessPoint], trace: &MobilityTrace) -> Vec<Vec<Vec<f64>>> {
    aps.iter()
        .map(|ap| {
            trace
                .users()
                .iter()
                .map(|user| user.positions.iter().map(|p| distance(&ap.position, p)).collect())
                .collect()
        })
        .collect()
}

/// Arithmetic mean of the AP positions; the origin for generated traces.
pub fn centroid(aps: &[AccessPoint]) -> Point {
    if aps.is_empty() {
        return Point::default();
    }
    let n = aps.len() as f64;
    let (sx, sy) = aps.iter().fold((0.0, 0.0), |(sx, sy), ap| (sx + ap.position.x, sy + ap.position.y));
    Point::new(sx / n, sy / n)
}
