//! Sparse Y-bus (admittance) matrix of one network context.
//!
//! The Y-bus matrix is the complex admittance matrix of the bus injections:
//! ```text
//! I = Y × V
//!
//! where Y[i,j] = G[i,j] + jB[i,j] (conductance + j×susceptance)
//! ```
//!
//! This module provides CSR storage for the real (G) and imaginary (B) parts
//! separately. Both parts are assembled from the same triplet sequence so
//! they share one sparsity pattern.

use crate::network::NetworkContext;
use num_complex::Complex64;
use sprs::{CsMat, TriMat};

/// Sparse Y-bus matrix in CSR format, indexed by local bus index.
#[derive(Debug, Clone)]
pub struct SparseYBus {
    n_bus: usize,
    /// Real part (conductance G) in CSR format
    g_matrix: CsMat<f64>,
    /// Imaginary part (susceptance B) in CSR format
    b_matrix: CsMat<f64>,
}

impl SparseYBus {
    /// Build the Y-bus from the attached branches and shunts of a context.
    ///
    /// Every bus gets a diagonal entry, even an isolated one, so the pattern
    /// of each row always contains the row's own bus.
    pub fn from_context(context: &NetworkContext) -> Self {
        let n_bus = context.buses().len();
        let mut g_triplet = TriMat::new((n_bus, n_bus));
        let mut b_triplet = TriMat::new((n_bus, n_bus));
        let mut add = |i: usize, j: usize, y: Complex64| {
            g_triplet.add_triplet(i, j, y.re);
            b_triplet.add_triplet(i, j, y.im);
        };

        for i in 0..n_bus {
            add(i, i, Complex64::new(0.0, 0.0));
        }

        for branch in context.branches().iter().filter(|b| b.is_attached()) {
            let (i, j) = (branch.bus1(), branch.bus2());
            let y = branch.admittance();
            add(i, i, y.yff);
            add(i, j, y.yft);
            add(j, i, y.ytf);
            add(j, j, y.ytt);
        }

        for shunt in context.shunts() {
            add(shunt.bus(), shunt.bus(), Complex64::new(shunt.g, shunt.b));
        }

        Self {
            n_bus,
            g_matrix: g_triplet.to_csr(),
            b_matrix: b_triplet.to_csr(),
        }
    }

    /// Number of buses
    pub fn n_bus(&self) -> usize {
        self.n_bus
    }

    /// Get G[i,j] (conductance)
    pub fn g(&self, i: usize, j: usize) -> f64 {
        self.g_matrix.get(i, j).copied().unwrap_or(0.0)
    }

    /// Get B[i,j] (susceptance)
    pub fn b(&self, i: usize, j: usize) -> f64 {
        self.b_matrix.get(i, j).copied().unwrap_or(0.0)
    }

    /// Get complex Y[i,j] = G[i,j] + jB[i,j]
    pub fn y(&self, i: usize, j: usize) -> Complex64 {
        Complex64::new(self.g(i, j), self.b(i, j))
    }

    /// Number of stored entries (shared by G and B)
    pub fn nnz(&self) -> usize {
        self.g_matrix.nnz()
    }

    /// Iterate over the stored entries of row i as complex admittances.
    ///
    /// Directly walks the CSR arrays of both parts, which share the same
    /// `indptr`/`indices` layout.
    pub fn row_iter(&self, i: usize) -> impl Iterator<Item = (usize, Complex64)> + '_ {
        let indptr = self.g_matrix.indptr();
        let start = indptr.index(i);
        let end = indptr.index(i + 1);
        let indices = &self.g_matrix.indices()[start..end];
        let g = &self.g_matrix.data()[start..end];
        let b = &self.b_matrix.data()[start..end];
        indices
            .iter()
            .zip(g.iter().zip(b.iter()))
            .map(|(&j, (&g, &b))| (j, Complex64::new(g, b)))
    }

    /// Bus current injections `I = Y V`
    pub fn currents(&self, voltages: &[Complex64]) -> Vec<Complex64> {
        (0..self.n_bus)
            .map(|i| self.row_iter(i).map(|(j, y)| y * voltages[j]).sum())
            .collect()
    }
}
