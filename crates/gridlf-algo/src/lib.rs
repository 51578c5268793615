//! # gridlf-algo: Newton-Raphson AC load flow
//!
//! Computes the steady-state bus voltages of a [`gridlf_core::Network`] and the
//! resulting branch flows, generator and load outputs.
//!
//! ## Pipeline
//!
//! | Step | Item | Description |
//! |------|------|-------------|
//! | Partition | [`build_contexts`] | One [`NetworkContext`] per island, slack bus selected per island |
//! | Assemble | [`EquationSystem`] | Y-bus, mismatch vector and sparse Jacobian |
//! | Iterate | [`NewtonRaphson`] | Drives the iteration to a [`SolveStatus`] |
//! | Commit | [`StateWriter`] | Writes converged results back to the physical network |
//!
//! [`LoadFlow`] chains the four steps over every island, solving independent
//! islands in parallel when the `parallel` feature is enabled.
//!
//! All quantities inside a context are per-unit on the system base power
//! (default 100 MVA) and the nominal voltage of each bus.
//!
//! ## Example
//!
//! ```
//! use gridlf_algo::LoadFlow;
//! use gridlf_core::*;
//!
//! let mut network = Network::new();
//! network.add_bus(Bus::new(BusId::new(1), "B1", Kilovolts(100.0)));
//! network.add_bus(Bus::new(BusId::new(2), "B2", Kilovolts(100.0)));
//! network
//!     .add_branch(Branch::new(BranchId::new(1), "L12", BusId::new(1), BusId::new(2), Ohms(0.0), Ohms(10.0)))
//!     .unwrap();
//! network.add_gen(Gen::voltage_regulating(GenId::new(1), "G1", BusId::new(1), Kilovolts(100.0)));
//! network.add_load(Load::constant_power(LoadId::new(1), "D2", BusId::new(2), Megawatts(200.0), Megavars(100.0)));
//!
//! let report = LoadFlow::default().run(&mut network).unwrap();
//! assert!(report.all_converged());
//! let v2 = network.bus(BusId::new(2)).unwrap().voltage.unwrap();
//! assert!(v2.value() < 100.0);
//! ```

pub mod error;
pub mod evaluable;
pub mod network;
pub mod newton;
pub mod runner;
pub mod sparse;
pub mod state;

pub use error::{LoadFlowError, LoadFlowResult};
pub use evaluable::Evaluable;
pub use network::{
    build_contexts, select_slack_bus, BusType, ContextParameters, ContextSnapshot, LfBranch,
    LfBus, LfGenerator, LfLoad, LfShunt, NetworkContext, SlackBusSelectionMode,
};
pub use newton::{
    EquationSystem, NewtonRaphson, NewtonRaphsonParameters, SolveOutcome, SolveStatus,
    VoltageInitMode,
};
pub use runner::{IslandReport, LoadFlow, LoadFlowParameters, LoadFlowReport};
pub use sparse::SparseYBus;
pub use state::StateWriter;
