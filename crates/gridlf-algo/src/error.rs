use crate::newton::SolveStatus;
use gridlf_core::GridError;
use thiserror::Error;

/// Errors raised by context construction, configuration and write-back.
///
/// Numerical failures of a solve are not errors: they are reported through
/// [`SolveStatus`] in the outcome of the run.
#[derive(Debug, Error)]
pub enum LoadFlowError {
    /// A parameter was rejected by its setter or builder
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// An island cannot be turned into a solvable context
    #[error("Island {island}: {reason}")]
    Topology { island: usize, reason: String },

    /// Write-back was requested for a context that did not converge
    #[error("Island {island} did not converge ({status:?}), network left unchanged")]
    NotConverged { island: usize, status: SolveStatus },

    #[error(transparent)]
    Grid(#[from] GridError),
}

pub type LoadFlowResult<T> = Result<T, LoadFlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_display() {
        let err = LoadFlowError::Topology {
            island: 2,
            reason: "no slack bus candidate".into(),
        };
        assert_eq!(err.to_string(), "Island 2: no slack bus candidate");
    }

    #[test]
    fn test_grid_error_conversion() {
        fn write() -> LoadFlowResult<()> {
            Err(GridError::Network("node 4 is not a load".into()))?;
            Ok(())
        }
        let err = write().unwrap_err();
        assert!(matches!(err, LoadFlowError::Grid(GridError::Network(_))));
        assert_eq!(err.to_string(), "Network error: node 4 is not a load");
    }

    #[test]
    fn test_not_converged_display() {
        let err = LoadFlowError::NotConverged {
            island: 0,
            status: SolveStatus::MaxIterationsReached,
        };
        assert!(err.to_string().contains("MaxIterationsReached"));
    }
}
