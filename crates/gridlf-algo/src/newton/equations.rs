//! Mismatch and Jacobian assembly in polar coordinates.
//!
//! Unknowns: the angle of every non-slack bus, then the magnitude of every PQ
//! bus. Equations follow the same order: active balance of every non-slack
//! bus, then reactive balance of every PQ bus.
//!
//! ```text
//! P_i = V_i Σ_j V_j (G_ij cos θ_ij + B_ij sin θ_ij)
//! Q_i = V_i Σ_j V_j (G_ij sin θ_ij - B_ij cos θ_ij)
//! ```

use crate::network::{BusType, NetworkContext};
use crate::sparse::SparseYBus;
use num_complex::Complex64;
use sprs::{CsMat, TriMat};

/// Equation system of one context. Holds the Y-bus and the variable
/// numbering; the state itself stays in the context buses.
#[derive(Debug, Clone)]
pub struct EquationSystem {
    ybus: SparseYBus,
    angle_var: Vec<Option<usize>>,
    v_var: Vec<Option<usize>>,
    dimension: usize,
}

impl EquationSystem {
    pub fn new(context: &NetworkContext) -> Self {
        let buses = context.buses();
        let mut dimension = 0;
        let angle_var = buses
            .iter()
            .map(|bus| {
                (bus.bus_type() != BusType::Slack).then(|| {
                    dimension += 1;
                    dimension - 1
                })
            })
            .collect();
        let v_var = buses
            .iter()
            .map(|bus| {
                (bus.bus_type() == BusType::PQ).then(|| {
                    dimension += 1;
                    dimension - 1
                })
            })
            .collect();
        Self {
            ybus: SparseYBus::from_context(context),
            angle_var,
            v_var,
            dimension,
        }
    }

    pub fn ybus(&self) -> &SparseYBus {
        &self.ybus
    }

    /// Number of unknowns (and equations)
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Complex bus voltages of the current state
    pub fn voltages(context: &NetworkContext) -> Vec<Complex64> {
        context
            .buses()
            .iter()
            .map(|bus| Complex64::from_polar(bus.v, bus.angle))
            .collect()
    }

    /// Calculated injections `S_i = V_i conj(Σ_j Y_ij V_j)` (pu)
    pub fn injections(&self, context: &NetworkContext) -> Vec<Complex64> {
        let voltages = Self::voltages(context);
        self.ybus
            .currents(&voltages)
            .iter()
            .zip(&voltages)
            .map(|(i, v)| v * i.conj())
            .collect()
    }

    /// Specified active injection: generation targets minus load at the
    /// current magnitude (pu)
    pub fn specified_p(context: &NetworkContext, bus: usize) -> f64 {
        let lf = &context.buses()[bus];
        let load: f64 = lf.loads().iter().map(|&l| context.loads()[l].p_at(lf.v)).sum();
        lf.generation_target_p() - load
    }

    pub fn specified_q(context: &NetworkContext, bus: usize) -> f64 {
        let lf = &context.buses()[bus];
        let load: f64 = lf.loads().iter().map(|&l| context.loads()[l].q_at(lf.v)).sum();
        lf.generation_target_q() - load
    }

    /// `calculated - specified` for every equation
    pub fn mismatch(&self, context: &NetworkContext) -> Vec<f64> {
        let injections = self.injections(context);
        let mut mismatch = vec![0.0; self.dimension];
        for (bus, s) in injections.iter().enumerate() {
            if let Some(row) = self.angle_var[bus] {
                mismatch[row] = s.re - Self::specified_p(context, bus);
            }
            if let Some(row) = self.v_var[bus] {
                mismatch[row] = s.im - Self::specified_q(context, bus);
            }
        }
        mismatch
    }

    /// Sparse Jacobian of [`mismatch`](Self::mismatch) with respect to the
    /// unknowns, restricted to the Y-bus pattern.
    pub fn jacobian(&self, context: &NetworkContext) -> CsMat<f64> {
        let buses = context.buses();
        let injections = self.injections(context);
        let mut triplets = TriMat::new((self.dimension, self.dimension));

        for (i, bus_i) in buses.iter().enumerate() {
            let p_row = self.angle_var[i];
            let q_row = self.v_var[i];
            if p_row.is_none() && q_row.is_none() {
                continue;
            }
            let (vi, p, q) = (bus_i.v, injections[i].re, injections[i].im);

            for (j, y) in self.ybus.row_iter(i) {
                let (g, b) = (y.re, y.im);
                // (∂P/∂θ, ∂P/∂V, ∂Q/∂θ, ∂Q/∂V)
                let (dp_dth, mut dp_dv, dq_dth, mut dq_dv) = if i == j {
                    (
                        -q - b * vi * vi,
                        p / vi + g * vi,
                        p - g * vi * vi,
                        q / vi - b * vi,
                    )
                } else {
                    let vj = buses[j].v;
                    let (sin, cos) = (bus_i.angle - buses[j].angle).sin_cos();
                    let a = g * cos + b * sin;
                    let c = g * sin - b * cos;
                    (vi * vj * c, vi * a, -vi * vj * a, vi * c)
                };
                if i == j {
                    // specified injection depends on the magnitude through the loads
                    for &l in bus_i.loads() {
                        dp_dv += context.loads()[l].dp_dv(vi);
                        dq_dv += context.loads()[l].dq_dv(vi);
                    }
                }

                if let Some(row) = p_row {
                    if let Some(col) = self.angle_var[j] {
                        triplets.add_triplet(row, col, dp_dth);
                    }
                    if let Some(col) = self.v_var[j] {
                        triplets.add_triplet(row, col, dp_dv);
                    }
                }
                if let Some(row) = q_row {
                    if let Some(col) = self.angle_var[j] {
                        triplets.add_triplet(row, col, dq_dth);
                    }
                    if let Some(col) = self.v_var[j] {
                        triplets.add_triplet(row, col, dq_dv);
                    }
                }
            }
        }
        triplets.to_csr()
    }

    /// Current unknowns in equation order
    pub fn state_vector(&self, context: &NetworkContext) -> Vec<f64> {
        let mut x = vec![0.0; self.dimension];
        for (bus, lf) in context.buses().iter().enumerate() {
            if let Some(k) = self.angle_var[bus] {
                x[k] = lf.angle;
            }
            if let Some(k) = self.v_var[bus] {
                x[k] = lf.v;
            }
        }
        x
    }

    pub fn set_state_vector(&self, context: &mut NetworkContext, x: &[f64]) {
        for (bus, lf) in context.buses_mut().iter_mut().enumerate() {
            if let Some(k) = self.angle_var[bus] {
                lf.angle = x[k];
            }
            if let Some(k) = self.v_var[bus] {
                lf.v = x[k];
            }
        }
    }

    /// `x += dx`
    pub fn apply_correction(&self, context: &mut NetworkContext, dx: &[f64]) {
        for (bus, lf) in context.buses_mut().iter_mut().enumerate() {
            if let Some(k) = self.angle_var[bus] {
                lf.angle += dx[k];
            }
            if let Some(k) = self.v_var[bus] {
                lf.v += dx[k];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{build_contexts, ContextParameters};
    use gridlf_core::{
        Branch, BranchId, Bus, BusId, Gen, GenId, Kilovolts, Load, LoadId, LoadModel, Megavars,
        Megawatts, Network, Ohms, Shunt, ShuntId, Siemens,
    };

    /// Slack on 1, PV on 2, PQ on 3 and 4 (4 with a voltage dependent load).
    fn four_bus_context() -> NetworkContext {
        let mut network = Network::new();
        for id in 1..=4 {
            network.add_bus(Bus::new(BusId::new(id), format!("B{id}"), Kilovolts(100.0)));
        }
        let lines = [
            (1, 2, 1.0, 8.0),
            (2, 3, 2.0, 10.0),
            (3, 4, 1.0, 6.0),
            (1, 4, 1.5, 12.0),
        ];
        for (k, (from, to, r, x)) in lines
            .into_iter()
            .enumerate()
        {
            network
                .add_branch(
                    Branch::new(
                        BranchId::new(k),
                        format!("L{k}"),
                        BusId::new(from),
                        BusId::new(to),
                        Ohms(r),
                        Ohms(x),
                    )
                    .with_charging(Siemens(2e-4)),
                )
                .unwrap();
        }
        network.add_gen(Gen::voltage_regulating(
            GenId::new(1),
            "G1",
            BusId::new(1),
            Kilovolts(102.0),
        ));
        network.add_gen(
            Gen::voltage_regulating(GenId::new(2), "G2", BusId::new(2), Kilovolts(101.0))
                .with_target_p(Megawatts(40.0)),
        );
        network.add_load(Load::constant_power(
            LoadId::new(3),
            "D3",
            BusId::new(3),
            Megawatts(60.0),
            Megavars(20.0),
        ));
        network.add_load(
            Load::constant_power(
                LoadId::new(4),
                "D4",
                BusId::new(4),
                Megawatts(30.0),
                Megavars(10.0),
            )
            .with_model(LoadModel::Exponential {
                p_exponent: 1.5,
                q_exponent: 2.0,
            }),
        );
        network.add_shunt(Shunt::new(ShuntId::new(1), "C4", BusId::new(4), Siemens(5e-4)));
        build_contexts(&network, &ContextParameters::default())
            .pop()
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_dimension() {
        let ctx = four_bus_context();
        let eq = EquationSystem::new(&ctx);
        // 3 angles (buses 2, 3, 4) and 2 magnitudes (buses 3, 4)
        assert_eq!(eq.dimension(), 5);
        assert_eq!(eq.mismatch(&ctx).len(), 5);
    }

    #[test]
    fn test_flat_start_mismatch() {
        let ctx = four_bus_context();
        let eq = EquationSystem::new(&ctx);
        let mismatch = eq.mismatch(&ctx);
        // flat profile: no series flow, so P mismatch is minus the specified injection
        assert!((mismatch[0] - (-0.4)).abs() < 1e-12);
        assert!((mismatch[1] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_jacobian_matches_finite_differences() {
        let mut ctx = four_bus_context();
        let eq = EquationSystem::new(&ctx);
        // move away from the flat profile so every term is exercised
        let x0: Vec<f64> = eq
            .state_vector(&ctx)
            .iter()
            .enumerate()
            .map(|(k, x)| x + 0.013 * (k as f64 + 1.0) * if k % 2 == 0 { -1.0 } else { 1.0 })
            .collect();
        eq.set_state_vector(&mut ctx, &x0);
        let jacobian = eq.jacobian(&ctx);

        let h = 1e-7;
        for col in 0..eq.dimension() {
            let mut plus = x0.clone();
            plus[col] += h;
            eq.set_state_vector(&mut ctx, &plus);
            let f_plus = eq.mismatch(&ctx);

            let mut minus = x0.clone();
            minus[col] -= h;
            eq.set_state_vector(&mut ctx, &minus);
            let f_minus = eq.mismatch(&ctx);

            for row in 0..eq.dimension() {
                let fd = (f_plus[row] - f_minus[row]) / (2.0 * h);
                let analytic = jacobian.get(row, col).copied().unwrap_or(0.0);
                assert!(
                    (fd - analytic).abs() < 1e-5 * (1.0 + analytic.abs()),
                    "J[{row},{col}]: analytic {analytic}, finite difference {fd}"
                );
            }
        }
    }

    #[test]
    fn test_apply_correction() {
        let mut ctx = four_bus_context();
        let eq = EquationSystem::new(&ctx);
        let before = eq.state_vector(&ctx);
        let dx = vec![0.1; eq.dimension()];
        eq.apply_correction(&mut ctx, &dx);
        let after = eq.state_vector(&ctx);
        for (a, b) in after.iter().zip(&before) {
            assert!((a - b - 0.1).abs() < 1e-15);
        }
        // slack untouched
        assert_eq!(ctx.buses()[0].angle, 0.0);
    }
}
