use super::finite;
use crate::evaluable::{Evaluable, NAN};
use gridlf_core::{GridResult, Kilovolts, Network, NodeIndex, PerUnitBase, Shunt, ShuntId};

#[derive(Debug, Clone)]
pub struct LfShunt {
    id: ShuntId,
    node: NodeIndex,
    bus: usize,
    base: PerUnitBase,
    /// Conductance (pu)
    pub g: f64,
    /// Susceptance (pu)
    pub b: f64,
    q: Evaluable,
}

impl LfShunt {
    pub fn new(
        shunt: &Shunt,
        node: NodeIndex,
        bus: usize,
        nominal_kv: Kilovolts,
        base_mva: f64,
    ) -> Self {
        let base = PerUnitBase::new(nominal_kv, base_mva);
        Self {
            id: shunt.id,
            node,
            bus,
            base,
            g: base.admittance_pu(shunt.g),
            b: base.admittance_pu(shunt.b),
            q: NAN.clone(),
        }
    }

    pub fn id(&self) -> ShuntId {
        self.id
    }

    pub fn node(&self) -> NodeIndex {
        self.node
    }

    pub fn bus(&self) -> usize {
        self.bus
    }

    pub fn base(&self) -> &PerUnitBase {
        &self.base
    }

    /// Reactive power absorbed by the shunt (pu)
    pub fn q(&self) -> &Evaluable {
        &self.q
    }

    pub fn set_q(&mut self, q: Evaluable) {
        self.q = q;
    }

    pub fn update_state(&self, network: &mut Network) -> GridResult<()> {
        let q = finite(self.q.eval()).map(|q| self.base.reactive_power_mvar(q));
        network.shunt_mut_at(self.node)?.reactive_power = q;
        Ok(())
    }
}
