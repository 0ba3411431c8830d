use std::io::Write;

use multiap_link_simulator::SimulationError;
use multiap_link_simulator::common::scene::{load_scene, load_trace};
use multiap_link_simulator::simulation::geometry::centroid;
use multiap_link_simulator::simulation::{LinearMobility, MobilityModel, simulate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::NamedTempFile;

const SCENE: &str = r#"{
    "numberOfAccessPoints": 2,
    "transmissionPowers": [20, 20],
    "frequencies": [5.18e9, 5.22e9],
    "bandwidths": [20e6, 20e6],
    "apPositions": [[0, 0], [10, 0]],
    "simulationTime": 5,
    "timeStep": 1,
    "numberOfNodes": 1
}"#;

fn temp_json(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn user_walking_between_two_aps() {
    let scene_file = temp_json(SCENE);
    let trace_file = temp_json("[[[0.0, 2.5, 5.0, 7.5, 10.0], [1.0, 1.0, 1.0, 1.0, 1.0]]]");

    let scene = load_scene(scene_file.path()).unwrap();
    let aps = scene.access_points().unwrap();
    let trace = load_trace(trace_file.path()).unwrap();
    trace.expect_shape(scene.number_of_nodes, scene.step_count()).unwrap();

    let mut rng = StdRng::seed_from_u64(17);
    let result = simulate(&aps, &trace, &scene.simulation_parameters(), &mut rng).unwrap();

    assert_eq!(result.time, vec![1, 2, 3, 4, 5]);
    assert_eq!(result.users_sinr.len(), 1);
    assert_eq!(result.users_sinr[0].len(), 2);
    assert!(result.users_sinr[0].iter().all(|row| row.len() == 5 && row.iter().all(|v| v.is_finite())));
    assert!(result.users_handover[0].iter().all(|&ap| ap == 1 || ap == 2));
    assert!(result.users_per[0].iter().all(|per| (0.0..=1.0).contains(per)));
    assert!(result.users_retries[0].iter().all(|&r| r <= 3));
    assert!((result.users_distance[0][0][0] - 1.0).abs() < 1e-12);
    assert!((result.users_distance[0][1][4] - 1.0).abs() < 1e-12);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["users_handover"][0].as_array().unwrap().len(), 5);
    assert_eq!(json["users_collision"][0].as_array().unwrap().len(), 5);
}

#[test]
fn steady_channel_hands_over_to_nearest_ap() {
    let steady = SCENE.replace(
        "\"numberOfNodes\": 1",
        "\"numberOfNodes\": 1, \"shadowSigmaDB\": 0, \"K0dB\": 40, \"KDecay\": 0",
    );
    let scene_file = temp_json(&steady);
    let trace_file = temp_json("[[[0.0, 2.5, 5.0, 7.5, 10.0], [1.0, 1.0, 1.0, 1.0, 1.0]]]");

    let scene = load_scene(scene_file.path()).unwrap();
    let trace = load_trace(trace_file.path()).unwrap();
    let mut rng = StdRng::seed_from_u64(3);
    let result = simulate(&scene.access_points().unwrap(), &trace, &scene.simulation_parameters(), &mut rng).unwrap();

    let serving = &result.users_handover[0];
    assert_eq!(serving[0], 1);
    assert_eq!(serving[4], 2);
    assert!(result.users_sinr[0][0][0] > result.users_sinr[0][1][0]);
    assert!(result.users_sinr[0][1][4] > result.users_sinr[0][0][4]);
}

#[test]
fn generated_trace_is_reproducible_with_a_seed() {
    let scene_file = temp_json(&SCENE.replace("\"numberOfNodes\": 1", "\"numberOfNodes\": 4"));
    let scene = load_scene(scene_file.path()).unwrap();
    let aps = scene.access_points().unwrap();
    let model = LinearMobility {
        origin: centroid(&aps),
        velocity: scene.velocity,
        time_step: scene.time_step,
    };

    let run = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        let trace = model.generate(scene.number_of_nodes, scene.step_count(), &mut rng).unwrap();
        simulate(&aps, &trace, &scene.simulation_parameters(), &mut rng).unwrap()
    };

    let first = run(8);
    assert_eq!(first.user_count(), 4);
    assert_eq!(first, run(8));
}

#[test]
fn trace_shape_must_match_scene() {
    let scene_file = temp_json(SCENE);
    let scene = load_scene(scene_file.path()).unwrap();
    let trace_file = temp_json("[[[0.0, 1.0, 2.0], [0.0, 0.0, 0.0]]]");
    let trace = load_trace(trace_file.path()).unwrap();
    assert!(matches!(
        trace.expect_shape(scene.number_of_nodes, scene.step_count()),
        Err(SimulationError::ShapeMismatch(_))
    ));
}
