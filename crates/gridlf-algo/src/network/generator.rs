use super::finite;
use crate::evaluable::{Evaluable, NAN};
use gridlf_core::{Gen, GenControl, GenId, GridResult, Kilovolts, Network, NodeIndex, PerUnitBase};

/// Per-unit generator control target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LfGenControl {
    /// Regulated magnitude (pu of the bus nominal voltage)
    Voltage { target_v: f64 },
    /// Fixed reactive injection (pu)
    ReactivePower { target_q: f64 },
}

/// Per-unit projection of a generator. `p` and `q` follow the generator sign
/// convention (positive = injected).
#[derive(Debug, Clone)]
pub struct LfGenerator {
    id: GenId,
    node: NodeIndex,
    bus: usize,
    base: PerUnitBase,
    pub target_p: f64,
    pub control: LfGenControl,
    pub min_q: f64,
    pub max_q: f64,
    p: Evaluable,
    q: Evaluable,
}

impl LfGenerator {
    pub fn new(
        gen: &Gen,
        node: NodeIndex,
        bus: usize,
        nominal_kv: Kilovolts,
        base_mva: f64,
    ) -> Self {
        let base = PerUnitBase::new(nominal_kv, base_mva);
        let control = match gen.control {
            GenControl::Voltage { target_kv } => LfGenControl::Voltage {
                target_v: base.voltage_pu(target_kv),
            },
            GenControl::ReactivePower { target_q } => LfGenControl::ReactivePower {
                target_q: base.reactive_power_pu(target_q),
            },
        };
        Self {
            id: gen.id,
            node,
            bus,
            base,
            target_p: base.active_power_pu(gen.target_p),
            control,
            min_q: base.reactive_power_pu(gen.min_q),
            max_q: base.reactive_power_pu(gen.max_q),
            p: NAN.clone(),
            q: NAN.clone(),
        }
    }

    pub fn id(&self) -> GenId {
        self.id
    }

    pub fn node(&self) -> NodeIndex {
        self.node
    }

    pub fn bus(&self) -> usize {
        self.bus
    }

    pub fn target_v(&self) -> Option<f64> {
        match self.control {
            LfGenControl::Voltage { target_v } => Some(target_v),
            LfGenControl::ReactivePower { .. } => None,
        }
    }

    pub fn target_q(&self) -> Option<f64> {
        match self.control {
            LfGenControl::ReactivePower { target_q } => Some(target_q),
            LfGenControl::Voltage { .. } => None,
        }
    }

    pub fn is_voltage_regulating(&self) -> bool {
        matches!(self.control, LfGenControl::Voltage { .. })
    }

    pub fn p(&self) -> &Evaluable {
        &self.p
    }

    pub fn q(&self) -> &Evaluable {
        &self.q
    }

    pub fn set_p(&mut self, p: Evaluable) {
        self.p = p;
    }

    pub fn set_q(&mut self, q: Evaluable) {
        self.q = q;
    }

    pub fn update_state(&self, network: &mut Network) -> GridResult<()> {
        let p = finite(self.p.eval()).map(|p| self.base.active_power_mw(p));
        let q = finite(self.q.eval()).map(|q| self.base.reactive_power_mvar(q));
        let gen = network.gen_mut_at(self.node)?;
        gen.active_power = p;
        gen.reactive_power = q;
        Ok(())
    }
}
