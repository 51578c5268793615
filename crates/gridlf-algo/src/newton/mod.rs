//! Newton-Raphson AC load flow on one [`NetworkContext`](crate::network::NetworkContext).
//!
//! ```text
//!   Initialized ──► Iterating ──┬──► Converged            max |mismatch| < tolerance
//!                               ├──► MaxIterationsReached budget spent, still improving
//!                               └──► Diverged             singular, runaway or stalled
//! ```
//!
//! A run diverges on a singular Jacobian, a non-finite mismatch, a mismatch
//! growing past 1e3 times its initial value, five consecutive updates that
//! fail to reduce it, or a bus magnitude dropping to zero or below.
//!
//! Each iteration assembles the mismatch vector (`calculated - specified`),
//! then the sparse Jacobian, solves `J dx = -mismatch` and adds `dx` to the
//! bus state.
//!
//! ## References
//!
//! - **Tinney & Hart (1967)**: "Power Flow Solution by Newton's Method"
//!   IEEE Trans. PAS, 86(11), 1449-1460.
//!   DOI: [10.1109/TPAS.1967.291823](https://doi.org/10.1109/TPAS.1967.291823)

mod equations;
mod linear;
mod parameters;
mod solver;

pub use equations::EquationSystem;
pub use linear::solve_linear_system;
pub use parameters::{NewtonRaphsonParameters, VoltageInitMode};
pub use solver::NewtonRaphson;

use serde::{Deserialize, Serialize};

/// Terminal state of a Newton-Raphson run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Converged,
    /// Singular Jacobian, runaway or stalled mismatch, or a collapsed voltage
    Diverged,
    /// Iteration budget spent while the mismatch was still decreasing
    MaxIterationsReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolveOutcome {
    pub island: usize,
    pub status: SolveStatus,
    /// Number of corrections applied
    pub iterations: usize,
    /// Max absolute mismatch (pu) at the last evaluation
    pub max_mismatch: f64,
}

impl SolveOutcome {
    pub fn is_converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }
}
