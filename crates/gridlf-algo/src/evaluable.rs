//! Lazily evaluated scalar results.
//!
//! Lf elements expose their computed quantities (flows, outputs, shunt
//! reactive power) as [`Evaluable`] handles. The solver installs a closure
//! over its converged state; the value is only computed when the state writer
//! (or a caller) asks for it. Until then every result slot holds [`NAN`].

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a deferred `f64` computation.
#[derive(Clone)]
pub struct Evaluable(Arc<dyn Fn() -> f64 + Send + Sync>);

/// "Not computed yet"
pub static NAN: Lazy<Evaluable> = Lazy::new(|| Evaluable::constant(f64::NAN));

pub static ZERO: Lazy<Evaluable> = Lazy::new(|| Evaluable::constant(0.0));

impl Evaluable {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn constant(value: f64) -> Self {
        Self::new(move || value)
    }

    #[inline]
    pub fn eval(&self) -> f64 {
        (self.0)()
    }
}

impl Default for Evaluable {
    fn default() -> Self {
        NAN.clone()
    }
}

impl fmt::Debug for Evaluable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Evaluable({})", self.eval())
    }
}
