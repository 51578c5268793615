//! End-to-end load flow over every island of a network.

use crate::error::{LoadFlowError, LoadFlowResult};
use crate::network::{build_contexts, ContextParameters, NetworkContext};
use crate::newton::{NewtonRaphson, NewtonRaphsonParameters, SolveOutcome};
use crate::state::StateWriter;
use gridlf_core::Network;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadFlowParameters {
    pub newton_raphson: NewtonRaphsonParameters,
    pub context: ContextParameters,
    /// Solve islands on the rayon pool (needs the `parallel` feature)
    pub parallel: bool,
}

impl Default for LoadFlowParameters {
    fn default() -> Self {
        Self {
            newton_raphson: NewtonRaphsonParameters::default(),
            context: ContextParameters::default(),
            parallel: true,
        }
    }
}

/// Result of one island.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IslandReport {
    Solved(SolveOutcome),
    /// The island could not be turned into a context
    Failed { island: usize, reason: String },
}

impl IslandReport {
    pub fn outcome(&self) -> Option<&SolveOutcome> {
        match self {
            IslandReport::Solved(outcome) => Some(outcome),
            IslandReport::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadFlowReport {
    pub islands: Vec<IslandReport>,
}

impl LoadFlowReport {
    pub fn converged_count(&self) -> usize {
        self.islands
            .iter()
            .filter_map(IslandReport::outcome)
            .filter(|o| o.is_converged())
            .count()
    }

    /// True when every island was built and converged
    pub fn all_converged(&self) -> bool {
        self.converged_count() == self.islands.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadFlow {
    parameters: LoadFlowParameters,
}

impl LoadFlow {
    pub fn new(parameters: LoadFlowParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &LoadFlowParameters {
        &self.parameters
    }

    /// Builds, solves and writes back every island.
    ///
    /// Only converged islands are written to `network`; the report lists every
    /// island in order, including the ones that failed to build. Write targets
    /// of every converged island are checked before the first write, so an
    /// `Err` leaves the network as it was.
    pub fn run(&self, network: &mut Network) -> LoadFlowResult<LoadFlowReport> {
        network.validate()?;

        let mut slots: Vec<Option<IslandReport>> = Vec::new();
        let mut contexts: Vec<(usize, NetworkContext)> = Vec::new();
        for (position, built) in build_contexts(network, &self.parameters.context)
            .into_iter()
            .enumerate()
        {
            match built {
                Ok(context) => {
                    slots.push(None);
                    contexts.push((position, context));
                }
                Err(err) => {
                    let island = match &err {
                        LoadFlowError::Topology { island, .. } => *island,
                        _ => position,
                    };
                    slots.push(Some(IslandReport::Failed {
                        island,
                        reason: err.to_string(),
                    }));
                }
            }
        }

        let outcomes = self.solve_all(&mut contexts);

        // nothing is written unless every converged island can be written
        for ((_, context), outcome) in contexts.iter().zip(&outcomes) {
            if outcome.is_converged() {
                context.check_targets(network)?;
            }
        }

        for ((position, context), outcome) in contexts.iter().zip(outcomes) {
            if outcome.is_converged() {
                StateWriter::write(context, network, &outcome)?;
            } else {
                warn!(
                    island = outcome.island,
                    status = ?outcome.status,
                    iterations = outcome.iterations,
                    max_mismatch = outcome.max_mismatch,
                    "island did not converge, network left unchanged"
                );
            }
            slots[*position] = Some(IslandReport::Solved(outcome));
        }

        let report = LoadFlowReport {
            islands: slots.into_iter().flatten().collect(),
        };
        info!(
            islands = report.islands.len(),
            converged = report.converged_count(),
            "load flow finished"
        );
        Ok(report)
    }

    fn solve_all(&self, contexts: &mut [(usize, NetworkContext)]) -> Vec<SolveOutcome> {
        let solver = NewtonRaphson::new(self.parameters.newton_raphson);
        if self.parameters.parallel && contexts.len() > 1 {
            solve_parallel(&solver, contexts)
        } else {
            contexts
                .iter_mut()
                .map(|(_, context)| solver.run(context))
                .collect()
        }
    }
}

#[cfg(feature = "parallel")]
fn solve_parallel(
    solver: &NewtonRaphson,
    contexts: &mut [(usize, NetworkContext)],
) -> Vec<SolveOutcome> {
    contexts
        .par_iter_mut()
        .map(|(_, context)| solver.run(context))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn solve_parallel(
    solver: &NewtonRaphson,
    contexts: &mut [(usize, NetworkContext)],
) -> Vec<SolveOutcome> {
    contexts
        .iter_mut()
        .map(|(_, context)| solver.run(context))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newton::SolveStatus;

    #[test]
    fn test_report_counts() {
        let solved = |status| {
            IslandReport::Solved(SolveOutcome {
                island: 0,
                status,
                iterations: 2,
                max_mismatch: 0.0,
            })
        };
        let report = LoadFlowReport {
            islands: vec![
                solved(SolveStatus::Converged),
                solved(SolveStatus::MaxIterationsReached),
                IslandReport::Failed {
                    island: 2,
                    reason: "no slack".into(),
                },
            ],
        };
        assert_eq!(report.converged_count(), 1);
        assert!(!report.all_converged());
        assert!(LoadFlowReport::default().all_converged());
    }

    #[test]
    fn test_empty_network() {
        let mut network = Network::new();
        let report = LoadFlow::default().run(&mut network).unwrap();
        assert!(report.islands.is_empty());
    }

    #[test]
    fn test_parameters_serde_defaults() {
        let params: LoadFlowParameters =
            serde_json::from_str(r#"{"parallel": false, "newton_raphson": {"max_iteration": 3}}"#)
                .unwrap();
        assert!(!params.parallel);
        assert_eq!(params.newton_raphson.max_iteration(), 3);
        assert_eq!(params.context, ContextParameters::default());
    }
}
