use gridlf_core::{Bus, BusId, GridResult, Kilovolts, Network, NodeIndex, PerUnitBase, Radians};
use serde::{Deserialize, Serialize};

/// Bus classification for the Newton-Raphson equations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusType {
    /// Magnitude and angle fixed; closes the active and reactive balance
    Slack,
    /// Active injection and magnitude specified
    PV,
    /// Active and reactive injection specified
    PQ,
}

/// Per-unit projection of a physical bus.
///
/// `v` and `angle` are the solver state. The adjacency lists hold local
/// indices into the owning [`NetworkContext`](super::NetworkContext) and are
/// maintained by its `attach_*` / `detach_*` methods only.
#[derive(Debug, Clone)]
pub struct LfBus {
    id: BusId,
    node: NodeIndex,
    base: PerUnitBase,
    /// Voltage magnitude (pu)
    pub v: f64,
    /// Voltage angle (rad)
    pub angle: f64,
    pub(crate) bus_type: BusType,
    pub(crate) target_v: Option<f64>,
    pub(crate) generation_target_p: f64,
    pub(crate) generation_target_q: f64,
    pub(crate) branches: Vec<usize>,
    pub(crate) shunts: Vec<usize>,
    pub(crate) generators: Vec<usize>,
    pub(crate) loads: Vec<usize>,
}

impl LfBus {
    pub fn new(bus: &Bus, node: NodeIndex, base_mva: f64) -> Self {
        let base = PerUnitBase::new(bus.nominal_kv, base_mva);
        Self {
            id: bus.id,
            node,
            base,
            v: 1.0,
            angle: 0.0,
            bus_type: BusType::PQ,
            target_v: None,
            generation_target_p: 0.0,
            generation_target_q: 0.0,
            branches: Vec::new(),
            shunts: Vec::new(),
            generators: Vec::new(),
            loads: Vec::new(),
        }
    }

    /// Seeds the state from a solution already written to the physical bus.
    ///
    /// Returns false (state untouched) when the bus holds no solution.
    pub fn load_previous_state(&mut self, bus: &Bus) -> bool {
        match (bus.voltage, bus.angle) {
            (Some(v), Some(angle)) if v.is_finite() && angle.is_finite() => {
                self.v = self.base.voltage_pu(v);
                self.angle = angle.value();
                true
            }
            _ => false,
        }
    }

    pub fn id(&self) -> BusId {
        self.id
    }

    pub fn node(&self) -> NodeIndex {
        self.node
    }

    pub fn nominal_kv(&self) -> Kilovolts {
        self.base.nominal_kv
    }

    pub fn base(&self) -> &PerUnitBase {
        &self.base
    }

    pub fn bus_type(&self) -> BusType {
        self.bus_type
    }

    /// Regulated magnitude (pu) for slack and PV buses
    pub fn target_v(&self) -> Option<f64> {
        match self.bus_type {
            BusType::Slack => Some(self.target_v.unwrap_or(1.0)),
            BusType::PV => self.target_v,
            BusType::PQ => None,
        }
    }

    pub fn is_voltage_controlled(&self) -> bool {
        matches!(self.bus_type, BusType::Slack | BusType::PV)
    }

    /// Sum of the active targets of the attached generators (pu)
    pub fn generation_target_p(&self) -> f64 {
        self.generation_target_p
    }

    /// Sum of the reactive targets of attached reactive-power controlled generators (pu)
    pub fn generation_target_q(&self) -> f64 {
        self.generation_target_q
    }

    pub fn branches(&self) -> &[usize] {
        &self.branches
    }

    pub fn shunts(&self) -> &[usize] {
        &self.shunts
    }

    pub fn generators(&self) -> &[usize] {
        &self.generators
    }

    pub fn loads(&self) -> &[usize] {
        &self.loads
    }

    pub fn update_state(&self, network: &mut Network) -> GridResult<()> {
        let bus = network.bus_mut_at(self.node)?;
        bus.voltage = Some(self.base.voltage_kv(self.v));
        bus.angle = Some(Radians(self.angle));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_previous_state_round_trip() {
        let mut network = Network::new();
        let mut bus = Bus::new(BusId::new(3), "B3", Kilovolts(380.0));
        bus.voltage = Some(Kilovolts(395.2));
        bus.angle = Some(Radians(-0.05));
        let node = network.add_bus(bus.clone());

        let mut lf = LfBus::new(&bus, node, 100.0);
        assert!(lf.load_previous_state(&bus));
        assert!((lf.v - 1.04).abs() < 1e-12);

        lf.update_state(&mut network).unwrap();
        let written = network.bus(BusId::new(3)).unwrap();
        assert!((written.voltage.unwrap().value() - 395.2).abs() < 1e-9);
        assert_eq!(written.angle, Some(Radians(-0.05)));
    }

    #[test]
    fn test_no_previous_state() {
        let bus = Bus::new(BusId::new(1), "B1", Kilovolts(20.0));
        let mut lf = LfBus::new(&bus, NodeIndex::new(0), 100.0);
        assert!(!lf.load_previous_state(&bus));
        assert_eq!(lf.v, 1.0);
        assert_eq!(lf.bus_type(), BusType::PQ);
    }
}
