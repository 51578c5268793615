//! # Sparse Matrix Infrastructure
//!
//! Power grids are inherently sparse: a 10,000-bus network might have only
//! 15,000 branches, yielding ~0.03% matrix density. The admittance matrix and
//! the Newton-Raphson Jacobian are therefore stored in CSR form (`sprs`).
//!
//! - [`ybus`]: Sparse admittance matrix (Y-bus) of a network context

pub mod ybus;

pub use ybus::SparseYBus;
