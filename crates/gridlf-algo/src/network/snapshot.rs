use super::NetworkContext;
use gridlf_core::{BusId, GridResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusSnapshot {
    pub id: BusId,
    /// Magnitude (pu)
    pub v: f64,
    /// Angle (rad)
    pub angle: f64,
}

/// Serializable view of the per-unit state of one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub island: usize,
    pub base_mva: f64,
    pub slack_bus: Option<BusId>,
    pub buses: Vec<BusSnapshot>,
}

impl ContextSnapshot {
    pub fn to_json(&self) -> GridResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> GridResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl NetworkContext {
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            island: self.island(),
            base_mva: self.base_mva(),
            slack_bus: self.slack_bus().map(|i| self.buses()[i].id()),
            buses: self
                .buses()
                .iter()
                .map(|bus| BusSnapshot {
                    id: bus.id(),
                    v: bus.v,
                    angle: bus.angle,
                })
                .collect(),
        }
    }
}
