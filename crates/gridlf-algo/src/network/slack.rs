use super::NetworkContext;
use crate::error::{LoadFlowError, LoadFlowResult};
use gridlf_core::BusId;
use serde::{Deserialize, Serialize};

/// How the reference bus of an island is chosen among its candidates.
///
/// Candidates are the buses hosting at least one in-service generator, in
/// island order. Every mode is deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "bus", rename_all = "snake_case")]
pub enum SlackBusSelectionMode {
    /// First candidate
    #[default]
    First,
    /// Candidate with the most attached branches, ties broken by order
    MostMeshed,
    /// The named bus, which must be a candidate of the island
    Fixed(BusId),
}

/// Picks the slack bus of a context and returns its local index.
pub fn select_slack_bus(
    context: &NetworkContext,
    mode: SlackBusSelectionMode,
) -> LoadFlowResult<usize> {
    let mut candidates = context
        .buses()
        .iter()
        .enumerate()
        .filter(|(_, bus)| !bus.generators().is_empty())
        .map(|(index, _)| index)
        .peekable();

    let no_candidate = |reason: String| LoadFlowError::Topology {
        island: context.island(),
        reason,
    };

    if candidates.peek().is_none() {
        return Err(no_candidate(
            "no bus with an in-service generator to serve as slack".to_string(),
        ));
    }

    match mode {
        SlackBusSelectionMode::First => candidates
            .next()
            .ok_or_else(|| no_candidate("no slack candidate".to_string())),
        SlackBusSelectionMode::MostMeshed => {
            let mut best: Option<(usize, usize)> = None;
            for index in candidates {
                let degree = context.degree(index);
                if best.map_or(true, |(_, d)| degree > d) {
                    best = Some((index, degree));
                }
            }
            best.map(|(index, _)| index)
                .ok_or_else(|| no_candidate("no slack candidate".to_string()))
        }
        SlackBusSelectionMode::Fixed(id) => candidates
            .find(|&index| context.buses()[index].id() == id)
            .ok_or_else(|| {
                no_candidate(format!(
                    "bus {id} is not a slack candidate of this island"
                ))
            }),
    }
}
