use crate::error::{LoadFlowError, LoadFlowResult};
use serde::{Deserialize, Serialize};

/// Starting point of the iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoltageInitMode {
    /// PQ buses at 1.0 pu / 0 rad, voltage controlled buses at their target / 0 rad
    #[default]
    UniformValues,
    /// Continue from the previous solution when the context holds one
    PreviousValues,
}

/// Newton-Raphson settings. Every setter validates and leaves the current
/// value untouched on rejection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawNewtonRaphsonParameters")]
pub struct NewtonRaphsonParameters {
    max_iteration: usize,
    voltage_init_mode: VoltageInitMode,
    tolerance: f64,
}

#[derive(Deserialize)]
struct RawNewtonRaphsonParameters {
    #[serde(default = "default_max_iteration")]
    max_iteration: i64,
    #[serde(default)]
    voltage_init_mode: VoltageInitMode,
    #[serde(default = "default_tolerance")]
    tolerance: f64,
}

fn default_max_iteration() -> i64 {
    NewtonRaphsonParameters::DEFAULT_MAX_ITERATION as i64
}

fn default_tolerance() -> f64 {
    NewtonRaphsonParameters::DEFAULT_TOLERANCE
}

impl TryFrom<RawNewtonRaphsonParameters> for NewtonRaphsonParameters {
    type Error = LoadFlowError;

    fn try_from(raw: RawNewtonRaphsonParameters) -> Result<Self, Self::Error> {
        Ok(NewtonRaphsonParameters::default()
            .with_max_iteration(raw.max_iteration)?
            .with_tolerance(raw.tolerance)?
            .with_voltage_init_mode(raw.voltage_init_mode))
    }
}

impl Default for NewtonRaphsonParameters {
    fn default() -> Self {
        Self {
            max_iteration: Self::DEFAULT_MAX_ITERATION,
            voltage_init_mode: VoltageInitMode::default(),
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }
}

impl NewtonRaphsonParameters {
    pub const DEFAULT_MAX_ITERATION: usize = 30;
    /// Max absolute mismatch (pu)
    pub const DEFAULT_TOLERANCE: f64 = 1e-6;

    pub fn max_iteration(&self) -> usize {
        self.max_iteration
    }

    pub fn voltage_init_mode(&self) -> VoltageInitMode {
        self.voltage_init_mode
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn set_max_iteration(&mut self, max_iteration: i64) -> LoadFlowResult<&mut Self> {
        if max_iteration < 1 {
            return Err(LoadFlowError::Configuration(format!(
                "max iteration must be strictly positive, got {max_iteration}"
            )));
        }
        self.max_iteration = usize::try_from(max_iteration).map_err(|_| {
            LoadFlowError::Configuration(format!("max iteration {max_iteration} out of range"))
        })?;
        Ok(self)
    }

    pub fn set_tolerance(&mut self, tolerance: f64) -> LoadFlowResult<&mut Self> {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(LoadFlowError::Configuration(format!(
                "tolerance must be positive and finite, got {tolerance}"
            )));
        }
        self.tolerance = tolerance;
        Ok(self)
    }

    pub fn set_voltage_init_mode(&mut self, mode: VoltageInitMode) -> &mut Self {
        self.voltage_init_mode = mode;
        self
    }

    pub fn with_max_iteration(mut self, max_iteration: i64) -> LoadFlowResult<Self> {
        self.set_max_iteration(max_iteration)?;
        Ok(self)
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> LoadFlowResult<Self> {
        self.set_tolerance(tolerance)?;
        Ok(self)
    }

    pub fn with_voltage_init_mode(mut self, mode: VoltageInitMode) -> Self {
        self.voltage_init_mode = mode;
        self
    }
}
