//! Network fixtures shared by the load flow integration tests

#![allow(dead_code)]

use gridlf_core::*;
use tracing_subscriber::EnvFilter;

/// Routes solver logs to the test output, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn bus(network: &mut Network, id: usize, kv: f64) {
    network.add_bus(Bus::new(BusId::new(id), format!("B{id}"), Kilovolts(kv)));
}

pub fn line(network: &mut Network, id: usize, from: usize, to: usize, r: f64, x: f64) {
    network
        .add_branch(Branch::new(
            BranchId::new(id),
            format!("L{from}{to}"),
            BusId::new(from),
            BusId::new(to),
            Ohms(r),
            Ohms(x),
        ))
        .unwrap();
}

pub fn slack_gen(network: &mut Network, id: usize, bus: usize, kv: f64) {
    network.add_gen(Gen::voltage_regulating(
        GenId::new(id),
        format!("G{id}"),
        BusId::new(bus),
        Kilovolts(kv),
    ));
}

pub fn load(network: &mut Network, id: usize, bus: usize, mw: f64, mvar: f64) {
    network.add_load(Load::constant_power(
        LoadId::new(id),
        format!("D{id}"),
        BusId::new(bus),
        Megawatts(mw),
        Megavars(mvar),
    ));
}

/// 100 kV feeder: generator at bus 1 holding nominal voltage, 10 Ω line,
/// load at bus 2.
pub fn two_bus(mw: f64, mvar: f64) -> Network {
    let mut network = Network::new();
    bus(&mut network, 1, 100.0);
    bus(&mut network, 2, 100.0);
    line(&mut network, 1, 1, 2, 0.0, 10.0);
    slack_gen(&mut network, 1, 1, 100.0);
    load(&mut network, 1, 2, mw, mvar);
    network
}

pub fn voltage_kv(network: &Network, id: usize) -> Option<f64> {
    network
        .bus(BusId::new(id))
        .and_then(|b| b.voltage)
        .map(|v| v.value())
}

pub fn angle_rad(network: &Network, id: usize) -> Option<f64> {
    network
        .bus(BusId::new(id))
        .and_then(|b| b.angle)
        .map(|a| a.value())
}
