use super::{
    solve_linear_system, EquationSystem, NewtonRaphsonParameters, SolveOutcome, SolveStatus,
    VoltageInitMode,
};
use crate::evaluable::Evaluable;
use crate::network::{BusType, NetworkContext};
use num_complex::Complex64;
use tracing::{debug, trace, warn};

/// Reactive outputs outside the generator limits by more than this (pu) are logged.
const Q_LIMIT_LOG_THRESHOLD: f64 = 1e-4;

/// The iteration diverges once the max mismatch exceeds this multiple of the
/// initial one (floored at 1 pu).
const DIVERGENCE_GROWTH: f64 = 1e3;

/// The iteration diverges after this many consecutive updates that fail to
/// improve on the best max mismatch seen so far.
const STALL_LIMIT: usize = 5;

/// Newton-Raphson iteration controller.
#[derive(Debug, Clone, Default)]
pub struct NewtonRaphson {
    parameters: NewtonRaphsonParameters,
}

impl NewtonRaphson {
    pub fn new(parameters: NewtonRaphsonParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &NewtonRaphsonParameters {
        &self.parameters
    }

    /// Runs the iteration on `context`, updating its bus state in place.
    ///
    /// The run is `Diverged` when the Jacobian is singular, when the
    /// mismatch becomes non-finite or grows past [`DIVERGENCE_GROWTH`] times
    /// its initial value, when [`STALL_LIMIT`] consecutive updates fail to
    /// reduce it, or when a bus magnitude drops to zero or below.
    /// `MaxIterationsReached` is left for runs that were still making
    /// progress when the iteration budget ran out.
    ///
    /// On convergence the result evaluables of every element are installed
    /// and the context is marked as holding a previous state. Any other
    /// outcome leaves the result evaluables as they were.
    pub fn run(&self, context: &mut NetworkContext) -> SolveOutcome {
        let island = context.island();
        self.initialize(context);
        let equations = EquationSystem::new(context);
        trace!(island, unknowns = equations.dimension(), "newton-raphson initialized");

        let mut iterations = 0;
        let mut progress = Progress::default();
        let (status, max_mismatch) = loop {
            let mismatch = equations.mismatch(context);
            let max_mismatch = mismatch.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
            if mismatch.iter().any(|x| !x.is_finite()) {
                break (SolveStatus::Diverged, f64::NAN);
            }
            trace!(island, iteration = iterations, max_mismatch, "mismatch");

            if max_mismatch < self.parameters.tolerance() {
                break (SolveStatus::Converged, max_mismatch);
            }
            if let Some(reason) = progress.record(max_mismatch) {
                debug!(island, iteration = iterations, max_mismatch, reason, "diverging");
                break (SolveStatus::Diverged, max_mismatch);
            }
            if iterations >= self.parameters.max_iteration() {
                break (SolveStatus::MaxIterationsReached, max_mismatch);
            }

            let jacobian = equations.jacobian(context);
            let rhs: Vec<f64> = mismatch.iter().map(|m| -m).collect();
            let Some(dx) = solve_linear_system(&jacobian, &rhs) else {
                debug!(island, iteration = iterations, "singular jacobian");
                break (SolveStatus::Diverged, max_mismatch);
            };
            equations.apply_correction(context, &dx);
            iterations += 1;

            if context.buses().iter().any(|bus| !(bus.v > 0.0)) {
                debug!(island, iteration = iterations, "non-positive voltage magnitude");
                break (SolveStatus::Diverged, max_mismatch);
            }
        };

        match status {
            SolveStatus::Converged => {
                install_results(context, &equations);
                context.set_previous_state(true);
            }
            SolveStatus::Diverged | SolveStatus::MaxIterationsReached => {
                context.set_previous_state(false);
            }
        }
        debug!(island, ?status, iterations, max_mismatch, "newton-raphson finished");

        SolveOutcome {
            island,
            status,
            iterations,
            max_mismatch,
        }
    }

    fn initialize(&self, context: &mut NetworkContext) {
        let previous = self.parameters.voltage_init_mode() == VoltageInitMode::PreviousValues
            && context.has_previous_state();
        for bus in context.buses_mut() {
            if !previous {
                bus.v = 1.0;
                bus.angle = 0.0;
            }
            if let Some(target_v) = bus.target_v() {
                bus.v = target_v;
            }
        }
    }
}

/// Max mismatch history of one run.
#[derive(Debug, Default)]
struct Progress {
    initial: Option<f64>,
    best: f64,
    stalled: usize,
}

impl Progress {
    /// Records the max mismatch of the current iterate, returning why the
    /// run is diverging if it is.
    fn record(&mut self, max_mismatch: f64) -> Option<&'static str> {
        let Some(initial) = self.initial else {
            self.initial = Some(max_mismatch);
            self.best = max_mismatch;
            return None;
        };
        if max_mismatch > DIVERGENCE_GROWTH * initial.max(1.0) {
            return Some("mismatch growth");
        }
        if max_mismatch < self.best {
            self.best = max_mismatch;
            self.stalled = 0;
        } else {
            self.stalled += 1;
            if self.stalled >= STALL_LIMIT {
                return Some("mismatch stalled");
            }
        }
        None
    }
}

/// Installs the result evaluables of every element from the converged state.
fn install_results(context: &mut NetworkContext, equations: &EquationSystem) {
    let voltages = EquationSystem::voltages(context);
    let injections = equations.injections(context);
    let magnitudes: Vec<f64> = voltages.iter().map(|v| v.norm()).collect();

    for load in context.loads_mut() {
        let v = magnitudes[load.bus()];
        let (p_model, q_model) = (load.clone(), load.clone());
        load.set_p(Evaluable::new(move || p_model.p_at(v)));
        load.set_q(Evaluable::new(move || q_model.q_at(v)));
    }

    for shunt in context.shunts_mut() {
        let (v, b) = (magnitudes[shunt.bus()], shunt.b);
        shunt.set_q(Evaluable::new(move || -b * v * v));
    }

    for branch in context.branches_mut().iter_mut().filter(|b| b.is_attached()) {
        let y = branch.admittance();
        let (v1, v2) = (voltages[branch.bus1()], voltages[branch.bus2()]);
        let s1 = move || v1 * (y.yff * v1 + y.yft * v2).conj();
        let s2 = move || v2 * (y.ytf * v1 + y.ytt * v2).conj();
        branch.set_flows(
            Evaluable::new(move || s1().re),
            Evaluable::new(move || s1().im),
            Evaluable::new(move || s2().re),
            Evaluable::new(move || s2().im),
        );
    }

    let outputs = generator_outputs(context, &injections);
    for (generator, (p, q)) in context.generators_mut().iter_mut().zip(outputs) {
        let below = q < generator.min_q - Q_LIMIT_LOG_THRESHOLD;
        let above = q > generator.max_q + Q_LIMIT_LOG_THRESHOLD;
        if below || above {
            warn!(
                generator = %generator.id(),
                q,
                min_q = generator.min_q,
                max_q = generator.max_q,
                "reactive output outside generator limits"
            );
        }
        generator.set_p(Evaluable::constant(p));
        generator.set_q(Evaluable::constant(q));
    }
}

/// Active and reactive output (pu) of every generator, in generator order.
///
/// The slack bus residual active power is shared equally by the generators of
/// the slack bus. At voltage controlled buses the residual reactive power is
/// shared equally by the voltage regulating generators (by every generator of
/// the bus when none regulates); the others keep their reactive target.
fn generator_outputs(context: &NetworkContext, injections: &[Complex64]) -> Vec<(f64, f64)> {
    let mut outputs: Vec<(f64, f64)> = context
        .generators()
        .iter()
        .map(|g| (g.target_p, g.target_q().unwrap_or(0.0)))
        .collect();

    for (index, bus) in context.buses().iter().enumerate() {
        if bus.generators().is_empty() {
            continue;
        }
        let load_p: f64 = bus.loads().iter().map(|&l| context.loads()[l].p_at(bus.v)).sum();
        let load_q: f64 = bus.loads().iter().map(|&l| context.loads()[l].q_at(bus.v)).sum();
        let s = injections[index];

        if bus.bus_type() == BusType::Slack {
            let share = (s.re + load_p) / bus.generators().len() as f64;
            for &g in bus.generators() {
                outputs[g].0 = share;
            }
        }

        if bus.is_voltage_controlled() {
            let regulating: Vec<usize> = bus
                .generators()
                .iter()
                .copied()
                .filter(|&g| context.generators()[g].is_voltage_regulating())
                .collect();
            let free = if regulating.is_empty() {
                bus.generators().to_vec()
            } else {
                regulating
            };
            let fixed_q: f64 = bus
                .generators()
                .iter()
                .filter(|&&g| !free.contains(&g))
                .map(|&g| outputs[g].1)
                .sum();
            let share = (s.im + load_q - fixed_q) / free.len() as f64;
            for g in free {
                outputs[g].1 = share;
            }
        }
    }
    outputs
}
