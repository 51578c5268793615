//! Unit newtypes for grid quantities and the per-unit conversion law.
//!
//! Physical elements of a [`Network`](crate::Network) carry engineering units
//! (kV, MW, Mvar, Ω, S). The load-flow solver works in per-unit relative to a
//! base power `Sb` (MVA) and the nominal voltage of each bus. Every conversion
//! between the two goes through [`PerUnitBase`] so the law lives in one place:
//!
//! ```text
//! zb    = V_nominal² / Sb
//! z_pu  = z_Ω / zb        (resistance, reactance)
//! y_pu  = y_S · zb        (conductance, susceptance)
//! s_pu  = s_MVA / Sb      (active, reactive power)
//! v_pu  = v_kV / V_nominal
//! ```
//!
//! # Usage
//!
//! ```
//! use gridlf_core::units::{Kilovolts, Ohms, PerUnitBase, Siemens};
//!
//! let base = PerUnitBase::new(Kilovolts(100.0), 100.0);
//! assert_eq!(base.impedance_pu(Ohms(10.0)), 0.1);
//! assert_eq!(base.admittance_pu(Siemens(1e-3)), 0.1);
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            /// Raw numeric value in the unit of the type
            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl std::iter::Sum for $type {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }
    };
}

/// Active power in megawatts (MW)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Megawatts(pub f64);

impl_unit_ops!(Megawatts, "MW");

/// Reactive power in megavolt-amperes reactive (Mvar)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Megavars(pub f64);

impl_unit_ops!(Megavars, "Mvar");

/// Voltage in kilovolts (kV)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Kilovolts(pub f64);

impl_unit_ops!(Kilovolts, "kV");

/// Angle in radians
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Radians(pub f64);

impl_unit_ops!(Radians, "rad");

/// Series resistance or reactance in ohms (Ω)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Ohms(pub f64);

impl_unit_ops!(Ohms, "Ω");

/// Shunt conductance or susceptance in siemens (S)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Siemens(pub f64);

impl_unit_ops!(Siemens, "S");

impl Radians {
    pub const ZERO: Self = Self(0.0);
}

/// Base quantities of one voltage level: nominal voltage and system base power.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerUnitBase {
    pub nominal_kv: Kilovolts,
    /// System base power `Sb` in MVA
    pub base_mva: f64,
}

impl PerUnitBase {
    pub fn new(nominal_kv: Kilovolts, base_mva: f64) -> Self {
        Self {
            nominal_kv,
            base_mva,
        }
    }

    /// Base impedance `zb = V_nominal² / Sb` in ohms
    #[inline]
    pub fn base_impedance(&self) -> f64 {
        self.nominal_kv.0 * self.nominal_kv.0 / self.base_mva
    }

    #[inline]
    pub fn impedance_pu(&self, z: Ohms) -> f64 {
        z.0 / self.base_impedance()
    }

    #[inline]
    pub fn impedance_ohms(&self, z_pu: f64) -> Ohms {
        Ohms(z_pu * self.base_impedance())
    }

    #[inline]
    pub fn admittance_pu(&self, y: Siemens) -> f64 {
        y.0 * self.base_impedance()
    }

    #[inline]
    pub fn admittance_siemens(&self, y_pu: f64) -> Siemens {
        Siemens(y_pu / self.base_impedance())
    }

    #[inline]
    pub fn voltage_pu(&self, v: Kilovolts) -> f64 {
        v.0 / self.nominal_kv.0
    }

    #[inline]
    pub fn voltage_kv(&self, v_pu: f64) -> Kilovolts {
        Kilovolts(v_pu * self.nominal_kv.0)
    }

    #[inline]
    pub fn active_power_pu(&self, p: Megawatts) -> f64 {
        p.0 / self.base_mva
    }

    #[inline]
    pub fn active_power_mw(&self, p_pu: f64) -> Megawatts {
        Megawatts(p_pu * self.base_mva)
    }

    #[inline]
    pub fn reactive_power_pu(&self, q: Megavars) -> f64 {
        q.0 / self.base_mva
    }

    #[inline]
    pub fn reactive_power_mvar(&self, q_pu: f64) -> Megavars {
        Megavars(q_pu * self.base_mva)
    }
}
