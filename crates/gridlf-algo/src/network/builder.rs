//! Island partitioning and context construction.

use super::{
    select_slack_bus, LfBranch, LfBus, LfGenerator, LfLoad, LfShunt, NetworkContext,
    SlackBusSelectionMode,
};
use crate::error::{LoadFlowError, LoadFlowResult};
use gridlf_core::{find_islands, BusId, Edge, Island, Network, Node, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Parameters shared by every context built from one network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContextParameters")]
pub struct ContextParameters {
    base_mva: f64,
    slack_bus_selection: SlackBusSelectionMode,
}

#[derive(Deserialize)]
struct RawContextParameters {
    #[serde(default = "default_base_mva")]
    base_mva: f64,
    #[serde(default)]
    slack_bus_selection: SlackBusSelectionMode,
}

fn default_base_mva() -> f64 {
    ContextParameters::DEFAULT_BASE_MVA
}

impl TryFrom<RawContextParameters> for ContextParameters {
    type Error = LoadFlowError;

    fn try_from(raw: RawContextParameters) -> Result<Self, Self::Error> {
        ContextParameters::default()
            .with_base_mva(raw.base_mva)
            .map(|p| p.with_slack_bus_selection(raw.slack_bus_selection))
    }
}

impl Default for ContextParameters {
    fn default() -> Self {
        Self {
            base_mva: Self::DEFAULT_BASE_MVA,
            slack_bus_selection: SlackBusSelectionMode::default(),
        }
    }
}

impl ContextParameters {
    pub const DEFAULT_BASE_MVA: f64 = 100.0;

    pub fn base_mva(&self) -> f64 {
        self.base_mva
    }

    pub fn slack_bus_selection(&self) -> SlackBusSelectionMode {
        self.slack_bus_selection
    }

    pub fn set_base_mva(&mut self, base_mva: f64) -> LoadFlowResult<&mut Self> {
        if !(base_mva.is_finite() && base_mva > 0.0) {
            return Err(LoadFlowError::Configuration(format!(
                "base power must be positive and finite, got {base_mva}"
            )));
        }
        self.base_mva = base_mva;
        Ok(self)
    }

    pub fn set_slack_bus_selection(&mut self, mode: SlackBusSelectionMode) -> &mut Self {
        self.slack_bus_selection = mode;
        self
    }

    pub fn with_base_mva(mut self, base_mva: f64) -> LoadFlowResult<Self> {
        self.set_base_mva(base_mva)?;
        Ok(self)
    }

    pub fn with_slack_bus_selection(mut self, mode: SlackBusSelectionMode) -> Self {
        self.slack_bus_selection = mode;
        self
    }
}

/// Splits the network into islands and builds one [`NetworkContext`] per
/// island, in island order.
///
/// An island that cannot be given a slack bus yields an `Err` entry; the
/// other islands are unaffected.
pub fn build_contexts(
    network: &Network,
    parameters: &ContextParameters,
) -> Vec<LoadFlowResult<NetworkContext>> {
    let analysis = find_islands(network);
    info!(
        islands = analysis.islands.len(),
        buses = network.stats().num_buses,
        "partitioned network into islands"
    );

    let bus_nodes: HashMap<BusId, NodeIndex> = network
        .graph
        .node_indices()
        .filter_map(|idx| match &network.graph[idx] {
            Node::Bus(bus) => Some((bus.id, idx)),
            _ => None,
        })
        .collect();

    analysis
        .islands
        .iter()
        .filter(|island| !island.buses.is_empty())
        .map(|island| {
            let result = build_context(network, island, &bus_nodes, parameters);
            if let Err(err) = &result {
                warn!(island = island.island_id, error = %err, "island skipped");
            }
            result
        })
        .collect()
}

fn build_context(
    network: &Network,
    island: &Island,
    bus_nodes: &HashMap<BusId, NodeIndex>,
    parameters: &ContextParameters,
) -> LoadFlowResult<NetworkContext> {
    let base_mva = parameters.base_mva;
    let mut context = NetworkContext::new(island.island_id, base_mva);

    // buses keep graph insertion order so numbering is reproducible
    let mut members: Vec<NodeIndex> = island.buses.clone();
    members.sort();

    let mut local: HashMap<NodeIndex, usize> = HashMap::with_capacity(members.len());
    let mut all_previous = true;
    for &node in &members {
        let Node::Bus(bus) = &network.graph[node] else {
            continue;
        };
        let mut lf = LfBus::new(bus, node, base_mva);
        all_previous &= lf.load_previous_state(bus);
        local.insert(node, context.attach_bus(lf));
    }

    let mut edges: Vec<_> = members
        .iter()
        .flat_map(|&node| network.graph.edges(node))
        .map(|edge| edge.id())
        .collect();
    edges.sort();
    edges.dedup();
    for edge in edges {
        let Edge::Branch(branch) = &network.graph[edge];
        if !branch.status {
            continue;
        }
        let (Some(&bus1), Some(&bus2)) = (
            bus_nodes.get(&branch.from_bus).and_then(|n| local.get(n)),
            bus_nodes.get(&branch.to_bus).and_then(|n| local.get(n)),
        ) else {
            continue;
        };
        let nominal_kv = context.buses()[bus2].nominal_kv();
        let lf = LfBranch::new(branch, edge, bus1, bus2, nominal_kv, base_mva);
        let zero_impedance = lf.is_zero_impedance();
        let index = context.attach_branch(lf)?;
        if zero_impedance {
            warn!(
                island = island.island_id,
                branch = %branch.id,
                name = %branch.name,
                "zero impedance branch cannot be modeled, detached"
            );
            context.detach_branch(index);
        }
    }

    for node in network.graph.node_indices() {
        let bus_of = |id: &BusId| bus_nodes.get(id).and_then(|n| local.get(n)).copied();
        match &network.graph[node] {
            Node::Gen(gen) if gen.status => {
                if let Some(bus) = bus_of(&gen.bus) {
                    let nominal_kv = context.buses()[bus].nominal_kv();
                    let generator = LfGenerator::new(gen, node, bus, nominal_kv, base_mva);
                    context.attach_generator(generator)?;
                }
            }
            Node::Load(load) if load.status => {
                if let Some(bus) = bus_of(&load.bus) {
                    let nominal_kv = context.buses()[bus].nominal_kv();
                    context.attach_load(LfLoad::new(load, node, bus, nominal_kv, base_mva))?;
                }
            }
            Node::Shunt(shunt) if shunt.status => {
                if let Some(bus) = bus_of(&shunt.bus) {
                    let nominal_kv = context.buses()[bus].nominal_kv();
                    context.attach_shunt(LfShunt::new(shunt, node, bus, nominal_kv, base_mva))?;
                }
            }
            _ => {}
        }
    }

    let slack = select_slack_bus(&context, parameters.slack_bus_selection)?;
    context.set_slack_bus(slack)?;
    context.set_previous_state(all_previous);

    debug!(
        island = island.island_id,
        buses = context.buses().len(),
        branches = context.branches().iter().filter(|b| b.is_attached()).count(),
        generators = context.generators().len(),
        loads = context.loads().len(),
        shunts = context.shunts().len(),
        slack = %context.buses()[slack].id(),
        previous_state = all_previous,
        "built network context"
    );
    Ok(context)
}
