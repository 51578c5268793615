use super::finite;
use crate::evaluable::{Evaluable, NAN};
use gridlf_core::{
    Branch, BranchFlow, BranchId, EdgeIndex, GridResult, Kilovolts, Network, PerUnitBase,
};
use num_complex::Complex64;

/// Below this series impedance magnitude (pu) a branch cannot be admitted.
pub const ZERO_IMPEDANCE_THRESHOLD: f64 = 1e-8;

/// Two-port admittances of a π branch, `[I1; I2] = [yff yft; ytf ytt] [V1; V2]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchAdmittance {
    pub yff: Complex64,
    pub yft: Complex64,
    pub ytf: Complex64,
    pub ytt: Complex64,
}

/// Per-unit projection of a line or two-winding transformer.
///
/// Impedances are normalized with the nominal voltage of side 2; the tap
/// `rho` and phase shift `a1` sit on side 1.
#[derive(Debug, Clone)]
pub struct LfBranch {
    id: BranchId,
    edge: EdgeIndex,
    bus1: usize,
    bus2: usize,
    base: PerUnitBase,
    pub r: f64,
    pub x: f64,
    pub g1: f64,
    pub b1: f64,
    pub g2: f64,
    pub b2: f64,
    pub rho: f64,
    pub a1: f64,
    pub(crate) attached: bool,
    p1: Evaluable,
    q1: Evaluable,
    p2: Evaluable,
    q2: Evaluable,
}

impl LfBranch {
    pub fn new(
        branch: &Branch,
        edge: EdgeIndex,
        bus1: usize,
        bus2: usize,
        nominal_kv_side2: Kilovolts,
        base_mva: f64,
    ) -> Self {
        let base = PerUnitBase::new(nominal_kv_side2, base_mva);
        Self {
            id: branch.id,
            edge,
            bus1,
            bus2,
            base,
            r: base.impedance_pu(branch.resistance),
            x: base.impedance_pu(branch.reactance),
            g1: base.admittance_pu(branch.g1),
            b1: base.admittance_pu(branch.b1),
            g2: base.admittance_pu(branch.g2),
            b2: base.admittance_pu(branch.b2),
            rho: branch.tap_ratio,
            a1: branch.phase_shift.value(),
            attached: false,
            p1: NAN.clone(),
            q1: NAN.clone(),
            p2: NAN.clone(),
            q2: NAN.clone(),
        }
    }

    pub fn id(&self) -> BranchId {
        self.id
    }

    pub fn edge(&self) -> EdgeIndex {
        self.edge
    }

    /// Local index of the side-1 bus
    pub fn bus1(&self) -> usize {
        self.bus1
    }

    pub fn bus2(&self) -> usize {
        self.bus2
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_zero_impedance(&self) -> bool {
        Complex64::new(self.r, self.x).norm() < ZERO_IMPEDANCE_THRESHOLD
    }

    pub fn admittance(&self) -> BranchAdmittance {
        let ys = Complex64::new(self.r, self.x).inv();
        let y1 = Complex64::new(self.g1, self.b1);
        let y2 = Complex64::new(self.g2, self.b2);
        let t = Complex64::from_polar(self.rho, self.a1);
        BranchAdmittance {
            yff: (ys + y1) / (self.rho * self.rho),
            yft: -ys / t.conj(),
            ytf: -ys / t,
            ytt: ys + y2,
        }
    }

    pub fn set_flows(&mut self, p1: Evaluable, q1: Evaluable, p2: Evaluable, q2: Evaluable) {
        self.p1 = p1;
        self.q1 = q1;
        self.p2 = p2;
        self.q2 = q2;
    }

    pub fn p1(&self) -> &Evaluable {
        &self.p1
    }

    pub fn q1(&self) -> &Evaluable {
        &self.q1
    }

    pub fn p2(&self) -> &Evaluable {
        &self.p2
    }

    pub fn q2(&self) -> &Evaluable {
        &self.q2
    }

    pub fn update_state(&self, network: &mut Network) -> GridResult<()> {
        let flow = match (
            finite(self.p1.eval()),
            finite(self.q1.eval()),
            finite(self.p2.eval()),
            finite(self.q2.eval()),
        ) {
            (Some(p1), Some(q1), Some(p2), Some(q2)) => Some(BranchFlow {
                p1: self.base.active_power_mw(p1),
                q1: self.base.reactive_power_mvar(q1),
                p2: self.base.active_power_mw(p2),
                q2: self.base.reactive_power_mvar(q2),
            }),
            _ => None,
        };
        network.branch_mut_at(self.edge)?.flow = flow;
        Ok(())
    }
}
