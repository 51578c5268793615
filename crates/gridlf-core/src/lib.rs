//! # gridlf-core: physical grid model
//!
//! Provides the physical network consumed and updated by the load-flow
//! solver in `gridlf-algo`.
//!
//! Networks are **undirected multigraphs**:
//! - **Nodes**: buses, generators, loads and shunts
//! - **Edges**: branches (lines and two-winding transformers) between buses
//!
//! Generators, loads and shunts are not wired into the graph by edges; they
//! name their bus through a [`BusId`]. Topology queries (islands) therefore
//! only walk bus-to-bus branch edges.
//!
//! Element parameters are stored in engineering units (kV, Ω, S, MW, Mvar).
//! The solver converts them to per-unit with [`units::PerUnitBase`] and writes
//! its results back into the `Option` result fields (`voltage`, `angle`,
//! `flow`, `active_power`, `reactive_power`). Those fields stay `None` until a
//! load flow converges on the island holding the element.
//!
//! ## Quick Start
//!
//! ```rust
//! use gridlf_core::*;
//!
//! let mut network = Network::new();
//! network.add_bus(Bus::new(BusId::new(1), "B1", Kilovolts(100.0)));
//! network.add_bus(Bus::new(BusId::new(2), "B2", Kilovolts(100.0)));
//! network
//!     .add_branch(Branch::new(
//!         BranchId::new(1),
//!         "L1-2",
//!         BusId::new(1),
//!         BusId::new(2),
//!         Ohms(0.0),
//!         Ohms(10.0),
//!     ))
//!     .unwrap();
//! network.add_gen(Gen::voltage_regulating(GenId::new(1), "G1", BusId::new(1), Kilovolts(100.0)));
//! network.add_load(Load::constant_power(LoadId::new(1), "D2", BusId::new(2), Megawatts(200.0), Megavars(100.0)));
//!
//! assert_eq!(network.stats().num_buses, 2);
//! ```

use petgraph::{prelude::*, Undirected};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub mod error;
pub mod graph_utils;
pub mod units;

pub use error::{GridError, GridResult};
pub use graph_utils::{find_islands, Island, IslandAnalysis};
pub use petgraph::graph::{EdgeIndex, NodeIndex};
pub use units::{Kilovolts, Megavars, Megawatts, Ohms, PerUnitBase, Radians, Siemens};

macro_rules! impl_id {
    ($($name:ident),*) => {
        $(
            #[derive(
                Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
            )]
            #[serde(transparent)]
            pub struct $name(usize);

            impl $name {
                #[inline]
                pub fn new(value: usize) -> Self {
                    $name(value)
                }
                #[inline]
                pub fn value(&self) -> usize {
                    self.0
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

impl_id!(BusId, BranchId, GenId, LoadId, ShuntId);

#[derive(Debug, Clone)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    /// Nominal voltage, the per-unit voltage base of the bus
    pub nominal_kv: Kilovolts,
    pub in_service: bool,
    /// Solved voltage magnitude
    pub voltage: Option<Kilovolts>,
    /// Solved voltage angle
    pub angle: Option<Radians>,
}

impl Bus {
    pub fn new(id: BusId, name: impl Into<String>, nominal_kv: Kilovolts) -> Self {
        Self {
            id,
            name: name.into(),
            nominal_kv,
            in_service: true,
            voltage: None,
            angle: None,
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(BusId(0), String::new(), Kilovolts(1.0))
    }
}

/// Power entering a branch at each of its two sides.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BranchFlow {
    pub p1: Megawatts,
    pub q1: Megavars,
    pub p2: Megawatts,
    pub q2: Megavars,
}

impl BranchFlow {
    /// Active losses of the branch (sum of both side inflows)
    pub fn active_losses(&self) -> Megawatts {
        self.p1 + self.p2
    }
}

/// Line or two-winding transformer, modeled as a π section with an ideal
/// transformer (tap and phase shift) on side 1.
#[derive(Debug, Clone)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    pub from_bus: BusId,
    pub to_bus: BusId,
    pub resistance: Ohms,
    pub reactance: Ohms,
    /// Shunt conductance on side 1
    pub g1: Siemens,
    /// Shunt susceptance on side 1
    pub b1: Siemens,
    pub g2: Siemens,
    pub b2: Siemens,
    /// Off-nominal tap ratio applied on side 1 (1.0 for lines)
    pub tap_ratio: f64,
    pub phase_shift: Radians,
    pub status: bool,
    /// Solved flows
    pub flow: Option<BranchFlow>,
}

impl Branch {
    pub fn new(
        id: BranchId,
        name: impl Into<String>,
        from_bus: BusId,
        to_bus: BusId,
        resistance: Ohms,
        reactance: Ohms,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            from_bus,
            to_bus,
            resistance,
            reactance,
            ..Self::default()
        }
    }

    /// Split a total line charging susceptance half and half on both sides.
    pub fn with_charging(mut self, b_total: Siemens) -> Self {
        self.b1 = b_total / 2.0;
        self.b2 = b_total / 2.0;
        self
    }

    pub fn with_tap(mut self, tap_ratio: f64, phase_shift: Radians) -> Self {
        self.tap_ratio = tap_ratio;
        self.phase_shift = phase_shift;
        self
    }
}

impl Default for Branch {
    fn default() -> Self {
        Self {
            id: BranchId(0),
            name: String::new(),
            from_bus: BusId(0),
            to_bus: BusId(0),
            resistance: Ohms(0.0),
            reactance: Ohms(0.0),
            g1: Siemens(0.0),
            b1: Siemens(0.0),
            g2: Siemens(0.0),
            b2: Siemens(0.0),
            tap_ratio: 1.0,
            phase_shift: Radians::ZERO,
            status: true,
            flow: None,
        }
    }
}

/// How a generator controls its terminal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GenControl {
    /// Regulates the bus voltage magnitude; reactive output is free
    Voltage { target_kv: Kilovolts },
    /// Injects a fixed reactive power
    ReactivePower { target_q: Megavars },
}

#[derive(Debug, Clone)]
pub struct Gen {
    pub id: GenId,
    pub name: String,
    pub bus: BusId,
    pub target_p: Megawatts,
    pub control: GenControl,
    pub min_q: Megavars,
    pub max_q: Megavars,
    pub status: bool,
    /// Solved active output (generator sign convention)
    pub active_power: Option<Megawatts>,
    /// Solved reactive output (generator sign convention)
    pub reactive_power: Option<Megavars>,
}

impl Gen {
    pub fn new(id: GenId, name: impl Into<String>, bus: BusId, control: GenControl) -> Self {
        Self {
            id,
            name: name.into(),
            bus,
            target_p: Megawatts(0.0),
            control,
            min_q: Megavars(f64::NEG_INFINITY),
            max_q: Megavars(f64::INFINITY),
            status: true,
            active_power: None,
            reactive_power: None,
        }
    }

    pub fn voltage_regulating(
        id: GenId,
        name: impl Into<String>,
        bus: BusId,
        target_kv: Kilovolts,
    ) -> Self {
        Self::new(id, name, bus, GenControl::Voltage { target_kv })
    }

    pub fn with_target_p(mut self, target_p: Megawatts) -> Self {
        self.target_p = target_p;
        self
    }

    pub fn with_q_limits(mut self, min_q: Megavars, max_q: Megavars) -> Self {
        self.min_q = min_q;
        self.max_q = max_q;
        self
    }

    pub fn is_voltage_regulating(&self) -> bool {
        matches!(self.control, GenControl::Voltage { .. })
    }
}

/// Voltage dependence of a load.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadModel {
    #[default]
    ConstantPower,
    /// `P = P0 · v^p_exponent`, `Q = Q0 · v^q_exponent` with `v` in per-unit
    Exponential { p_exponent: f64, q_exponent: f64 },
}

#[derive(Debug, Clone)]
pub struct Load {
    pub id: LoadId,
    pub name: String,
    pub bus: BusId,
    /// Active demand at nominal voltage
    pub p0: Megawatts,
    /// Reactive demand at nominal voltage
    pub q0: Megavars,
    pub model: LoadModel,
    pub status: bool,
    /// Solved active consumption
    pub active_power: Option<Megawatts>,
    /// Solved reactive consumption
    pub reactive_power: Option<Megavars>,
}

impl Load {
    pub fn constant_power(
        id: LoadId,
        name: impl Into<String>,
        bus: BusId,
        p0: Megawatts,
        q0: Megavars,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            bus,
            p0,
            q0,
            model: LoadModel::ConstantPower,
            status: true,
            active_power: None,
            reactive_power: None,
        }
    }

    pub fn with_model(mut self, model: LoadModel) -> Self {
        self.model = model;
        self
    }
}

/// Shunt compensator (capacitor bank: `b > 0`, reactor: `b < 0`).
#[derive(Debug, Clone)]
pub struct Shunt {
    pub id: ShuntId,
    pub name: String,
    pub bus: BusId,
    pub g: Siemens,
    pub b: Siemens,
    pub status: bool,
    /// Solved reactive power, load sign convention (positive = absorbed)
    pub reactive_power: Option<Megavars>,
}

impl Shunt {
    pub fn new(id: ShuntId, name: impl Into<String>, bus: BusId, b: Siemens) -> Self {
        Self {
            id,
            name: name.into(),
            bus,
            g: Siemens(0.0),
            b,
            status: true,
            reactive_power: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Bus(Bus),
    Gen(Gen),
    Load(Load),
    Shunt(Shunt),
}

#[derive(Debug, Clone)]
pub enum Edge {
    Branch(Branch),
}

/// The physical power network graph
#[derive(Debug, Default, Clone)]
pub struct Network {
    pub graph: Graph<Node, Edge, Undirected>,
    /// First bus node registered under each id
    bus_index: HashMap<BusId, NodeIndex>,
}

impl Network {
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
            bus_index: HashMap::new(),
        }
    }

    pub fn add_bus(&mut self, bus: Bus) -> NodeIndex {
        let id = bus.id;
        let idx = self.graph.add_node(Node::Bus(bus));
        self.bus_index.entry(id).or_insert(idx);
        idx
    }

    /// Adds a branch between two existing buses.
    pub fn add_branch(&mut self, branch: Branch) -> GridResult<EdgeIndex> {
        let from = self.require_bus_node(branch.from_bus)?;
        let to = self.require_bus_node(branch.to_bus)?;
        Ok(self.graph.add_edge(from, to, Edge::Branch(branch)))
    }

    pub fn add_gen(&mut self, gen: Gen) -> NodeIndex {
        self.graph.add_node(Node::Gen(gen))
    }

    pub fn add_load(&mut self, load: Load) -> NodeIndex {
        self.graph.add_node(Node::Load(load))
    }

    pub fn add_shunt(&mut self, shunt: Shunt) -> NodeIndex {
        self.graph.add_node(Node::Shunt(shunt))
    }

    /// Graph node holding the bus with the given id.
    ///
    /// Served from the id index; falls back to a scan when the graph was
    /// edited directly and the indexed node no longer holds that bus.
    pub fn bus_node(&self, id: BusId) -> Option<NodeIndex> {
        let holds = |idx: NodeIndex| {
            matches!(self.graph.node_weight(idx), Some(Node::Bus(bus)) if bus.id == id)
        };
        match self.bus_index.get(&id) {
            Some(&idx) if holds(idx) => Some(idx),
            _ => self.graph.node_indices().find(|&idx| holds(idx)),
        }
    }

    fn require_bus_node(&self, id: BusId) -> GridResult<NodeIndex> {
        self.bus_node(id)
            .ok_or_else(|| GridError::Network(format!("unknown bus {id}")))
    }

    pub fn buses(&self) -> impl Iterator<Item = &Bus> + '_ {
        self.graph.node_weights().filter_map(|n| match n {
            Node::Bus(b) => Some(b),
            _ => None,
        })
    }

    pub fn generators(&self) -> impl Iterator<Item = &Gen> + '_ {
        self.graph.node_weights().filter_map(|n| match n {
            Node::Gen(g) => Some(g),
            _ => None,
        })
    }

    pub fn loads(&self) -> impl Iterator<Item = &Load> + '_ {
        self.graph.node_weights().filter_map(|n| match n {
            Node::Load(l) => Some(l),
            _ => None,
        })
    }

    pub fn shunts(&self) -> impl Iterator<Item = &Shunt> + '_ {
        self.graph.node_weights().filter_map(|n| match n {
            Node::Shunt(s) => Some(s),
            _ => None,
        })
    }

    pub fn branches(&self) -> impl Iterator<Item = &Branch> + '_ {
        self.graph.edge_weights().map(|e| match e {
            Edge::Branch(b) => b,
        })
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        match &self.graph[self.bus_node(id)?] {
            Node::Bus(bus) => Some(bus),
            _ => None,
        }
    }

    pub fn bus_mut_at(&mut self, idx: NodeIndex) -> GridResult<&mut Bus> {
        match self.graph.node_weight_mut(idx) {
            Some(Node::Bus(bus)) => Ok(bus),
            _ => Err(GridError::Network(format!("node {} is not a bus", idx.index()))),
        }
    }

    pub fn gen_mut_at(&mut self, idx: NodeIndex) -> GridResult<&mut Gen> {
        match self.graph.node_weight_mut(idx) {
            Some(Node::Gen(gen)) => Ok(gen),
            _ => Err(GridError::Network(format!(
                "node {} is not a generator",
                idx.index()
            ))),
        }
    }

    pub fn load_mut_at(&mut self, idx: NodeIndex) -> GridResult<&mut Load> {
        match self.graph.node_weight_mut(idx) {
            Some(Node::Load(load)) => Ok(load),
            _ => Err(GridError::Network(format!("node {} is not a load", idx.index()))),
        }
    }

    pub fn shunt_mut_at(&mut self, idx: NodeIndex) -> GridResult<&mut Shunt> {
        match self.graph.node_weight_mut(idx) {
            Some(Node::Shunt(shunt)) => Ok(shunt),
            _ => Err(GridError::Network(format!("node {} is not a shunt", idx.index()))),
        }
    }

    pub fn branch_mut_at(&mut self, idx: EdgeIndex) -> GridResult<&mut Branch> {
        match self.graph.edge_weight_mut(idx) {
            Some(Edge::Branch(branch)) => Ok(branch),
            None => Err(GridError::Network(format!("edge {} is not a branch", idx.index()))),
        }
    }

    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats::default();

        for node in self.graph.node_weights() {
            match node {
                Node::Bus(_) => stats.num_buses += 1,
                Node::Gen(g) => {
                    stats.num_gens += 1;
                    stats.total_gen_target_mw += g.target_p.value();
                }
                Node::Load(l) => {
                    stats.num_loads += 1;
                    stats.total_load_mw += l.p0.value();
                    stats.total_load_mvar += l.q0.value();
                }
                Node::Shunt(_) => stats.num_shunts += 1,
            }
        }

        stats.num_branches = self.graph.edge_count();
        stats
    }

    /// Checks the invariants the solver relies on: unique bus ids, positive
    /// nominal voltages, element references to existing buses and positive
    /// finite branch tap ratios.
    pub fn validate(&self) -> GridResult<()> {
        let mut seen = HashSet::new();
        for bus in self.buses() {
            if !seen.insert(bus.id) {
                return Err(GridError::Validation(format!("duplicate bus id {}", bus.id)));
            }
            if !(bus.nominal_kv.value() > 0.0 && bus.nominal_kv.is_finite()) {
                return Err(GridError::Validation(format!(
                    "bus {} has a non-positive nominal voltage ({})",
                    bus.id, bus.nominal_kv
                )));
            }
        }

        let check = |kind: &str, name: &str, bus: BusId| {
            if seen.contains(&bus) {
                Ok(())
            } else {
                Err(GridError::Validation(format!(
                    "{kind} '{name}' references unknown bus {bus}"
                )))
            }
        };
        for node in self.graph.node_weights() {
            match node {
                Node::Bus(_) => {}
                Node::Gen(g) => check("generator", &g.name, g.bus)?,
                Node::Load(l) => check("load", &l.name, l.bus)?,
                Node::Shunt(s) => check("shunt", &s.name, s.bus)?,
            }
        }
        for branch in self.branches() {
            if !(branch.tap_ratio > 0.0 && branch.tap_ratio.is_finite()) {
                return Err(GridError::Validation(format!(
                    "branch '{}' has a non-positive tap ratio ({})",
                    branch.name, branch.tap_ratio
                )));
            }
        }
        Ok(())
    }
}

/// Statistics about a network's size
#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_gens: usize,
    pub num_loads: usize,
    pub num_shunts: usize,
    pub num_branches: usize,
    pub total_load_mw: f64,
    pub total_load_mvar: f64,
    pub total_gen_target_mw: f64,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buses, {} branches, {} gens ({:.0} MW), {} loads ({:.0} MW), {} shunts",
            self.num_buses,
            self.num_branches,
            self.num_gens,
            self.total_gen_target_mw,
            self.num_loads,
            self.total_load_mw,
            self.num_shunts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_bus_network() -> Network {
        let mut network = Network::new();
        network.add_bus(Bus::new(BusId::new(1), "Bus 1", Kilovolts(138.0)));
        network.add_bus(Bus::new(BusId::new(2), "Bus 2", Kilovolts(138.0)));
        network
            .add_branch(Branch::new(
                BranchId::new(1),
                "Branch 1-2",
                BusId::new(1),
                BusId::new(2),
                Ohms(1.9),
                Ohms(19.0),
            ))
            .unwrap();
        network
    }

    #[test]
    fn test_network_creation() {
        let network = two_bus_network();
        assert_eq!(network.graph.node_count(), 2);
        assert_eq!(network.graph.edge_count(), 1);

        let idx = network.bus_node(BusId::new(1)).unwrap();
        assert!(matches!(&network.graph[idx], Node::Bus(bus) if bus.name == "Bus 1"));
    }

    #[test]
    fn test_add_branch_unknown_bus() {
        let mut network = two_bus_network();
        let err = network
            .add_branch(Branch::new(
                BranchId::new(2),
                "dangling",
                BusId::new(1),
                BusId::new(9),
                Ohms(0.0),
                Ohms(1.0),
            ))
            .unwrap_err();
        assert!(err.to_string().contains("unknown bus 9"));
    }

    #[test]
    fn test_network_stats() {
        let mut network = two_bus_network();
        network.add_gen(
            Gen::voltage_regulating(GenId::new(1), "Gen 1", BusId::new(1), Kilovolts(138.0))
                .with_target_p(Megawatts(60.0)),
        );
        network.add_load(Load::constant_power(
            LoadId::new(1),
            "Load 1",
            BusId::new(2),
            Megawatts(50.0),
            Megavars(10.0),
        ));
        network.add_shunt(Shunt::new(ShuntId::new(1), "C1", BusId::new(2), Siemens(1e-4)));

        let stats = network.stats();
        assert_eq!(stats.num_buses, 2);
        assert_eq!(stats.num_gens, 1);
        assert_eq!(stats.num_loads, 1);
        assert_eq!(stats.num_shunts, 1);
        assert_eq!(stats.num_branches, 1);
        assert!((stats.total_load_mw - 50.0).abs() < 1e-12);
        assert!((stats.total_gen_target_mw - 60.0).abs() < 1e-12);
        assert!(network.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_reference() {
        let mut network = two_bus_network();
        network.add_load(Load::constant_power(
            LoadId::new(1),
            "orphan",
            BusId::new(7),
            Megawatts(1.0),
            Megavars(0.0),
        ));
        let err = network.validate().unwrap_err();
        assert!(matches!(err, GridError::Validation(_)));
        assert!(err.to_string().contains("orphan"));
    }

    #[test]
    fn test_validate_rejects_duplicate_and_zero_nominal() {
        let mut network = two_bus_network();
        network.add_bus(Bus::new(BusId::new(2), "again", Kilovolts(138.0)));
        assert!(network.validate().is_err());

        let mut network = Network::new();
        network.add_bus(Bus::new(BusId::new(1), "zero", Kilovolts(0.0)));
        assert!(network.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_tap_ratio() {
        for tap in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut network = two_bus_network();
            let edge = network.graph.edge_indices().next().unwrap();
            network.branch_mut_at(edge).unwrap().tap_ratio = tap;
            let err = network.validate().unwrap_err();
            assert!(matches!(err, GridError::Validation(_)));
            assert!(err.to_string().contains("tap ratio"));
        }
    }

    #[test]
    fn test_bus_lookup_uses_first_registration() {
        let mut network = two_bus_network();
        let first = network.bus_node(BusId::new(2)).unwrap();
        network.add_bus(Bus::new(BusId::new(2), "duplicate", Kilovolts(20.0)));
        assert_eq!(network.bus_node(BusId::new(2)), Some(first));
        assert_eq!(network.bus(BusId::new(2)).unwrap().name, "Bus 2");
        assert_eq!(network.bus_node(BusId::new(9)), None);

        // index stays consistent when an id is edited in place
        network.bus_mut_at(first).unwrap().id = BusId::new(5);
        assert_eq!(network.bus_node(BusId::new(5)), Some(first));
        assert_eq!(network.bus(BusId::new(2)).unwrap().name, "duplicate");
    }

    #[test]
    fn test_typed_mut_accessors() {
        let mut network = two_bus_network();
        let bus_idx = network.bus_node(BusId::new(2)).unwrap();
        network.bus_mut_at(bus_idx).unwrap().voltage = Some(Kilovolts(137.0));
        assert_eq!(network.bus(BusId::new(2)).unwrap().voltage, Some(Kilovolts(137.0)));

        assert!(network.gen_mut_at(bus_idx).is_err());
        assert!(network.branch_mut_at(EdgeIndex::new(5)).is_err());
    }

    #[test]
    fn test_branch_charging_split() {
        let branch = Branch::default().with_charging(Siemens(2e-4));
        assert_eq!(branch.b1, Siemens(1e-4));
        assert_eq!(branch.b2, Siemens(1e-4));
    }

    #[test]
    fn test_flow_losses() {
        let flow = BranchFlow {
            p1: Megawatts(100.0),
            q1: Megavars(20.0),
            p2: Megawatts(-98.5),
            q2: Megavars(-10.0),
        };
        assert!((flow.active_losses().value() - 1.5).abs() < 1e-12);
    }
}
