use super::finite;
use crate::evaluable::{Evaluable, NAN};
use gridlf_core::{GridResult, Kilovolts, Load, LoadId, LoadModel, Network, NodeIndex, PerUnitBase};

/// Per-unit projection of a load. `p` and `q` are consumptions.
#[derive(Debug, Clone)]
pub struct LfLoad {
    id: LoadId,
    node: NodeIndex,
    bus: usize,
    base: PerUnitBase,
    pub p0: f64,
    pub q0: f64,
    pub model: LoadModel,
    p: Evaluable,
    q: Evaluable,
}

impl LfLoad {
    pub fn new(
        load: &Load,
        node: NodeIndex,
        bus: usize,
        nominal_kv: Kilovolts,
        base_mva: f64,
    ) -> Self {
        let base = PerUnitBase::new(nominal_kv, base_mva);
        Self {
            id: load.id,
            node,
            bus,
            base,
            p0: base.active_power_pu(load.p0),
            q0: base.reactive_power_pu(load.q0),
            model: load.model,
            p: NAN.clone(),
            q: NAN.clone(),
        }
    }

    pub fn id(&self) -> LoadId {
        self.id
    }

    pub fn node(&self) -> NodeIndex {
        self.node
    }

    pub fn bus(&self) -> usize {
        self.bus
    }

    /// Active consumption at magnitude `v` (pu)
    pub fn p_at(&self, v: f64) -> f64 {
        match self.model {
            LoadModel::ConstantPower => self.p0,
            LoadModel::Exponential { p_exponent, .. } => self.p0 * v.powf(p_exponent),
        }
    }

    pub fn q_at(&self, v: f64) -> f64 {
        match self.model {
            LoadModel::ConstantPower => self.q0,
            LoadModel::Exponential { q_exponent, .. } => self.q0 * v.powf(q_exponent),
        }
    }

    /// `d p_at / d v`
    pub fn dp_dv(&self, v: f64) -> f64 {
        match self.model {
            LoadModel::ConstantPower => 0.0,
            LoadModel::Exponential { p_exponent, .. } => {
                p_exponent * self.p0 * v.powf(p_exponent - 1.0)
            }
        }
    }

    pub fn dq_dv(&self, v: f64) -> f64 {
        match self.model {
            LoadModel::ConstantPower => 0.0,
            LoadModel::Exponential { q_exponent, .. } => {
                q_exponent * self.q0 * v.powf(q_exponent - 1.0)
            }
        }
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
        let load = network.load_mut_at(self.node)?;
        load.active_power = p;
        load.reactive_power = q;
        Ok(())
    }
}
