//! Multi-island networks: independent solves and per-island failures

mod common;

use common::*;
use gridlf_algo::{
    build_contexts, ContextParameters, IslandReport, LoadFlow, LoadFlowParameters, NewtonRaphson,
    SlackBusSelectionMode, SolveStatus,
};
use gridlf_core::*;

/// Island 0: buses 1-2, island 1: buses 3-4, each fed by its own generator.
fn two_islands(load_b: f64) -> Network {
    let mut network = Network::new();
    for id in 1..=4 {
        bus(&mut network, id, 100.0);
    }
    line(&mut network, 1, 1, 2, 1.0, 10.0);
    line(&mut network, 2, 3, 4, 1.0, 10.0);
    slack_gen(&mut network, 1, 1, 100.0);
    slack_gen(&mut network, 2, 3, 100.0);
    load(&mut network, 1, 2, 50.0, 10.0);
    load(&mut network, 2, 4, load_b, 10.0);
    network
}

fn run(network: &mut Network, parallel: bool) -> gridlf_algo::LoadFlowReport {
    let params = LoadFlowParameters {
        parallel,
        ..LoadFlowParameters::default()
    };
    LoadFlow::new(params).run(network).unwrap()
}

#[test]
fn test_islands_solved_independently() {
    init_tracing();
    let mut network = two_islands(50.0);
    let report = run(&mut network, true);

    assert_eq!(report.islands.len(), 2);
    assert_eq!(report.converged_count(), 2);
    let islands: Vec<usize> = report
        .islands
        .iter()
        .filter_map(IslandReport::outcome)
        .map(|o| o.island)
        .collect();
    assert_eq!(islands, vec![0, 1]);

    // identical islands give identical results
    let (v2, v4) = (voltage_kv(&network, 2).unwrap(), voltage_kv(&network, 4).unwrap());
    assert!((v2 - v4).abs() < 1e-9);
}

#[test]
fn test_injection_change_stays_in_its_island() {
    let mut base = two_islands(50.0);
    let mut changed = two_islands(90.0);
    run(&mut base, false);
    run(&mut changed, false);

    assert_eq!(voltage_kv(&base, 2), voltage_kv(&changed, 2));
    assert_eq!(angle_rad(&base, 2), angle_rad(&changed, 2));
    assert!(voltage_kv(&changed, 4).unwrap() < voltage_kv(&base, 4).unwrap());
}

#[test]
fn test_parallel_matches_sequential() {
    let mut sequential = two_islands(70.0);
    let mut parallel = two_islands(70.0);
    let a = run(&mut sequential, false);
    let b = run(&mut parallel, true);

    assert_eq!(a, b);
    for id in 1..=4 {
        assert_eq!(voltage_kv(&sequential, id), voltage_kv(&parallel, id));
    }
}

#[test]
fn test_island_without_generator_fails_alone() {
    let mut network = two_islands(50.0);
    bus(&mut network, 5, 100.0);
    bus(&mut network, 6, 100.0);
    line(&mut network, 3, 5, 6, 1.0, 10.0);
    load(&mut network, 3, 6, 5.0, 1.0);

    let report = run(&mut network, true);
    assert_eq!(report.islands.len(), 3);
    assert_eq!(report.converged_count(), 2);
    assert!(matches!(
        &report.islands[2],
        IslandReport::Failed { island: 2, .. }
    ));
    assert!(voltage_kv(&network, 1).is_some());
    assert!(voltage_kv(&network, 5).is_none());
    assert!(voltage_kv(&network, 6).is_none());
}

#[test]
fn test_zero_impedance_branch_leaves_load_unsupplied() {
    let mut network = Network::new();
    bus(&mut network, 1, 20.0);
    bus(&mut network, 2, 20.0);
    line(&mut network, 1, 1, 2, 0.0, 0.0);
    slack_gen(&mut network, 1, 1, 20.0);
    load(&mut network, 1, 2, 5.0, 1.0);

    let contexts = build_contexts(&network, &ContextParameters::default());
    let mut ctx = contexts.into_iter().next().unwrap().unwrap();
    assert_eq!(ctx.buses().len(), 2);
    assert!(!ctx.branches()[0].is_attached());

    let outcome = NewtonRaphson::default().run(&mut ctx);
    assert_eq!(outcome.status, SolveStatus::Diverged);

    let report = run(&mut network, false);
    assert!(!report.all_converged());
    assert!(network.buses().all(|b| b.voltage.is_none()));
}

#[test]
fn test_fixed_slack_bus() {
    let mut network = Network::new();
    for id in 1..=3 {
        bus(&mut network, id, 100.0);
    }
    line(&mut network, 1, 1, 2, 1.0, 10.0);
    line(&mut network, 2, 2, 3, 1.0, 10.0);
    network.add_gen(
        Gen::voltage_regulating(GenId::new(1), "G1", BusId::new(1), Kilovolts(100.0))
            .with_target_p(Megawatts(20.0)),
    );
    slack_gen(&mut network, 2, 3, 101.0);
    load(&mut network, 1, 2, 60.0, 10.0);

    let mut params = LoadFlowParameters::default();
    params
        .context
        .set_slack_bus_selection(SlackBusSelectionMode::Fixed(BusId::new(3)));
    let report = LoadFlow::new(params).run(&mut network).unwrap();
    assert!(report.all_converged());

    let outputs: Vec<f64> = network
        .generators()
        .map(|g| g.active_power.unwrap().value())
        .collect();
    assert!((outputs[0] - 20.0).abs() < 1e-9);
    assert!(outputs[1] > 40.0);
    assert_eq!(angle_rad(&network, 3), Some(0.0));
}
