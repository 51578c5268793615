//! Commits converged per-unit results to the physical network.

use crate::error::{LoadFlowError, LoadFlowResult};
use crate::network::NetworkContext;
use crate::newton::SolveOutcome;
use gridlf_core::Network;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct StateWriter;

impl StateWriter {
    /// Writes bus voltages, branch flows, shunt, generator and load outputs.
    ///
    /// Refuses outcomes that did not converge, and contexts whose elements no
    /// longer match the network; in both cases the network is left untouched.
    pub fn write(
        context: &NetworkContext,
        network: &mut Network,
        outcome: &SolveOutcome,
    ) -> LoadFlowResult<()> {
        if !outcome.is_converged() {
            return Err(LoadFlowError::NotConverged {
                island: context.island(),
                status: outcome.status,
            });
        }
        context.check_targets(network)?;
        context.update_state(network)?;
        debug!(
            island = context.island(),
            buses = context.buses().len(),
            "wrote load flow results"
        );
        Ok(())
    }
}
