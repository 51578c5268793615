//! Per-unit load-flow model of one electrical island.
//!
//! A [`NetworkContext`] owns the Lf projections of every in-service element of
//! an island. Elements are stored in plain vectors and addressed by local
//! index; each [`LfBus`] keeps the indices of the elements connected to it.
//! The `attach_*` methods are the only way to add elements, so the bus
//! adjacency lists always agree with the element vectors.

mod branch;
mod builder;
mod bus;
mod generator;
mod load;
mod shunt;
mod slack;
mod snapshot;

pub use branch::{BranchAdmittance, LfBranch, ZERO_IMPEDANCE_THRESHOLD};
pub use builder::{build_contexts, ContextParameters};
pub use bus::{BusType, LfBus};
pub use generator::{LfGenControl, LfGenerator};
pub use load::LfLoad;
pub use shunt::LfShunt;
pub use slack::{select_slack_bus, SlackBusSelectionMode};
pub use snapshot::{BusSnapshot, ContextSnapshot};

use crate::error::{LoadFlowError, LoadFlowResult};
use gridlf_core::{BusId, GridError, GridResult, Network, Node};

/// Result values that were never computed are not written back.
pub(crate) fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

#[derive(Debug, Clone)]
pub struct NetworkContext {
    island: usize,
    base_mva: f64,
    buses: Vec<LfBus>,
    branches: Vec<LfBranch>,
    shunts: Vec<LfShunt>,
    generators: Vec<LfGenerator>,
    loads: Vec<LfLoad>,
    slack_bus: Option<usize>,
    has_previous_state: bool,
}

impl NetworkContext {
    pub fn new(island: usize, base_mva: f64) -> Self {
        Self {
            island,
            base_mva,
            buses: Vec::new(),
            branches: Vec::new(),
            shunts: Vec::new(),
            generators: Vec::new(),
            loads: Vec::new(),
            slack_bus: None,
            has_previous_state: false,
        }
    }

    pub fn island(&self) -> usize {
        self.island
    }

    /// System base power `Sb` (MVA)
    pub fn base_mva(&self) -> f64 {
        self.base_mva
    }

    pub fn buses(&self) -> &[LfBus] {
        &self.buses
    }

    pub fn bus(&self, index: usize) -> Option<&LfBus> {
        self.buses.get(index)
    }

    pub fn bus_mut(&mut self, index: usize) -> Option<&mut LfBus> {
        self.buses.get_mut(index)
    }

    pub(crate) fn buses_mut(&mut self) -> &mut [LfBus] {
        &mut self.buses
    }

    /// Local index of the bus with the given physical id
    pub fn bus_index(&self, id: BusId) -> Option<usize> {
        self.buses.iter().position(|b| b.id() == id)
    }

    pub fn branches(&self) -> &[LfBranch] {
        &self.branches
    }

    pub(crate) fn branches_mut(&mut self) -> &mut [LfBranch] {
        &mut self.branches
    }

    pub fn shunts(&self) -> &[LfShunt] {
        &self.shunts
    }

    pub(crate) fn shunts_mut(&mut self) -> &mut [LfShunt] {
        &mut self.shunts
    }

    pub fn generators(&self) -> &[LfGenerator] {
        &self.generators
    }

    pub(crate) fn generators_mut(&mut self) -> &mut [LfGenerator] {
        &mut self.generators
    }

    pub fn loads(&self) -> &[LfLoad] {
        &self.loads
    }

    pub(crate) fn loads_mut(&mut self) -> &mut [LfLoad] {
        &mut self.loads
    }

    pub fn slack_bus(&self) -> Option<usize> {
        self.slack_bus
    }

    pub fn has_previous_state(&self) -> bool {
        self.has_previous_state
    }

    pub(crate) fn set_previous_state(&mut self, value: bool) {
        self.has_previous_state = value;
    }

    fn check_bus(&self, bus: usize, element: &str) -> LoadFlowResult<()> {
        if bus < self.buses.len() {
            Ok(())
        } else {
            Err(LoadFlowError::Topology {
                island: self.island,
                reason: format!("{element} refers to bus index {bus} outside the island"),
            })
        }
    }

    pub fn attach_bus(&mut self, bus: LfBus) -> usize {
        self.buses.push(bus);
        self.buses.len() - 1
    }

    pub fn attach_branch(&mut self, mut branch: LfBranch) -> LoadFlowResult<usize> {
        self.check_bus(branch.bus1(), "branch")?;
        self.check_bus(branch.bus2(), "branch")?;
        let index = self.branches.len();
        branch.attached = true;
        self.buses[branch.bus1()].branches.push(index);
        self.buses[branch.bus2()].branches.push(index);
        self.branches.push(branch);
        Ok(index)
    }

    /// Removes a branch from the adjacency of both its buses. The branch keeps
    /// its slot so other indices stay valid; it no longer takes part in the
    /// equations and is not written back.
    pub fn detach_branch(&mut self, index: usize) -> bool {
        let Some(branch) = self.branches.get_mut(index) else {
            return false;
        };
        if !branch.attached {
            return false;
        }
        branch.attached = false;
        let (bus1, bus2) = (branch.bus1(), branch.bus2());
        self.buses[bus1].branches.retain(|&b| b != index);
        self.buses[bus2].branches.retain(|&b| b != index);
        true
    }

    pub fn attach_shunt(&mut self, shunt: LfShunt) -> LoadFlowResult<usize> {
        self.check_bus(shunt.bus(), "shunt")?;
        let index = self.shunts.len();
        self.buses[shunt.bus()].shunts.push(index);
        self.shunts.push(shunt);
        Ok(index)
    }

    /// Attaches a generator and folds its targets into the bus: a voltage
    /// regulating generator turns a PQ bus into a PV bus.
    pub fn attach_generator(&mut self, generator: LfGenerator) -> LoadFlowResult<usize> {
        self.check_bus(generator.bus(), "generator")?;
        let index = self.generators.len();
        let bus = &mut self.buses[generator.bus()];
        bus.generators.push(index);
        bus.generation_target_p += generator.target_p;
        match generator.control {
            LfGenControl::Voltage { target_v } => {
                if bus.target_v.is_none() {
                    bus.target_v = Some(target_v);
                }
                if bus.bus_type == BusType::PQ {
                    bus.bus_type = BusType::PV;
                }
            }
            LfGenControl::ReactivePower { target_q } => bus.generation_target_q += target_q,
        }
        self.generators.push(generator);
        Ok(index)
    }

    pub fn attach_load(&mut self, load: LfLoad) -> LoadFlowResult<usize> {
        self.check_bus(load.bus(), "load")?;
        let index = self.loads.len();
        self.buses[load.bus()].loads.push(index);
        self.loads.push(load);
        Ok(index)
    }

    /// Makes `index` the reference bus of the island.
    ///
    /// A slack bus without a regulating generator holds 1.0 pu.
    pub fn set_slack_bus(&mut self, index: usize) -> LoadFlowResult<()> {
        self.check_bus(index, "slack selection")?;
        if let Some(previous) = self.slack_bus.take() {
            let bus = &mut self.buses[previous];
            bus.bus_type = if bus.target_v.is_some() {
                BusType::PV
            } else {
                BusType::PQ
            };
        }
        self.buses[index].bus_type = BusType::Slack;
        self.slack_bus = Some(index);
        Ok(())
    }

    /// Number of attached branches incident to a bus
    pub fn degree(&self, bus: usize) -> usize {
        self.buses.get(bus).map_or(0, |b| b.branches.len())
    }

    /// Checks that every element still addresses a graph slot holding an
    /// element of its own kind, so that [`update_state`](Self::update_state)
    /// cannot stop halfway.
    pub fn check_targets(&self, network: &Network) -> GridResult<()> {
        let graph = &network.graph;
        let missing = |kind: &str, index: usize| {
            Err(GridError::Network(format!(
                "island {}: {kind} target {index} no longer in the network",
                self.island
            )))
        };
        for bus in &self.buses {
            if !matches!(graph.node_weight(bus.node()), Some(Node::Bus(_))) {
                return missing("bus", bus.node().index());
            }
        }
        for branch in self.branches.iter().filter(|b| b.is_attached()) {
            if graph.edge_weight(branch.edge()).is_none() {
                return missing("branch", branch.edge().index());
            }
        }
        for shunt in &self.shunts {
            if !matches!(graph.node_weight(shunt.node()), Some(Node::Shunt(_))) {
                return missing("shunt", shunt.node().index());
            }
        }
        for generator in &self.generators {
            if !matches!(graph.node_weight(generator.node()), Some(Node::Gen(_))) {
                return missing("generator", generator.node().index());
            }
        }
        for load in &self.loads {
            if !matches!(graph.node_weight(load.node()), Some(Node::Load(_))) {
                return missing("load", load.node().index());
            }
        }
        Ok(())
    }

    /// Commits every element's state to the physical network.
    pub fn update_state(&self, network: &mut Network) -> GridResult<()> {
        for bus in &self.buses {
            bus.update_state(network)?;
        }
        for branch in self.branches.iter().filter(|b| b.is_attached()) {
            branch.update_state(network)?;
        }
        for shunt in &self.shunts {
            shunt.update_state(network)?;
        }
        for generator in &self.generators {
            generator.update_state(network)?;
        }
        for load in &self.loads {
            load.update_state(network)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlf_core::{
        Branch, BranchId, Bus, EdgeIndex, Gen, GenId, Kilovolts, Load, LoadId, Megavars,
        Megawatts, NodeIndex, Ohms,
    };

    fn bus(id: usize) -> LfBus {
        let bus = Bus::new(BusId::new(id), format!("B{id}"), Kilovolts(100.0));
        LfBus::new(&bus, NodeIndex::new(id), 100.0)
    }

    fn branch(id: usize, bus1: usize, bus2: usize) -> LfBranch {
        let physical = Branch::new(
            BranchId::new(id),
            "L",
            BusId::new(bus1),
            BusId::new(bus2),
            Ohms(0.0),
            Ohms(10.0),
        );
        LfBranch::new(&physical, EdgeIndex::new(id), bus1, bus2, Kilovolts(100.0), 100.0)
    }

    fn triangle() -> NetworkContext {
        let mut ctx = NetworkContext::new(0, 100.0);
        for id in 0..3 {
            ctx.attach_bus(bus(id));
        }
        ctx.attach_branch(branch(0, 0, 1)).unwrap();
        ctx.attach_branch(branch(1, 1, 2)).unwrap();
        ctx.attach_branch(branch(2, 2, 0)).unwrap();
        ctx
    }

    #[test]
    fn test_attach_keeps_adjacency() {
        let ctx = triangle();
        assert_eq!(ctx.bus(0).unwrap().branches(), &[0, 2]);
        assert_eq!(ctx.bus(1).unwrap().branches(), &[0, 1]);
        assert_eq!(ctx.degree(2), 2);
    }

    #[test]
    fn test_detach_branch() {
        let mut ctx = triangle();
        assert!(ctx.detach_branch(1));
        assert!(!ctx.detach_branch(1));
        assert!(!ctx.detach_branch(7));
        assert_eq!(ctx.bus(1).unwrap().branches(), &[0]);
        assert_eq!(ctx.bus(2).unwrap().branches(), &[2]);
        assert_eq!(ctx.branches().len(), 3);
        assert!(!ctx.branches()[1].is_attached());
    }

    #[test]
    fn test_attach_rejects_foreign_bus() {
        let mut ctx = triangle();
        let err = ctx.attach_branch(branch(9, 0, 5)).unwrap_err();
        assert!(matches!(err, LoadFlowError::Topology { island: 0, .. }));
    }

    #[test]
    fn test_generator_makes_pv_bus() {
        let mut ctx = triangle();
        let gen = Gen::voltage_regulating(GenId::new(1), "G", BusId::new(1), Kilovolts(102.0))
            .with_target_p(Megawatts(40.0));
        let idx = ctx
            .attach_generator(LfGenerator::new(
                &gen,
                NodeIndex::new(10),
                1,
                Kilovolts(100.0),
                100.0,
            ))
            .unwrap();
        assert_eq!(idx, 0);
        let pv = ctx.bus(1).unwrap();
        assert_eq!(pv.bus_type(), BusType::PV);
        assert!((pv.target_v().unwrap() - 1.02).abs() < 1e-12);
        assert!((pv.generation_target_p() - 0.4).abs() < 1e-12);
        assert_eq!(pv.generators(), &[0]);
    }

    #[test]
    fn test_slack_reassignment_restores_type() {
        let mut ctx = triangle();
        let load = Load::constant_power(
            LoadId::new(1),
            "D",
            BusId::new(2),
            Megawatts(1.0),
            Megavars(0.0),
        );
        ctx.attach_load(LfLoad::new(&load, NodeIndex::new(11), 2, Kilovolts(100.0), 100.0))
            .unwrap();

        ctx.set_slack_bus(0).unwrap();
        assert_eq!(ctx.bus(0).unwrap().bus_type(), BusType::Slack);
        ctx.set_slack_bus(2).unwrap();
        assert_eq!(ctx.bus(0).unwrap().bus_type(), BusType::PQ);
        assert_eq!(ctx.slack_bus(), Some(2));
        assert_eq!(ctx.bus(2).unwrap().loads(), &[0]);
    }
}
