//! Output transforms applied to raw model predictions.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a raw model output maps back to revenue units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformMode {
    /// Raw output as is
    #[default]
    #[serde(alias = "raw")]
    Identity,
    /// `exp(raw) - 1`, for models trained on `log1p(revenue)`
    #[serde(alias = "expm1")]
    LogInverse,
    /// Raw output times the scale
    #[serde(alias = "raw_scale")]
    IdentityScaled,
    /// `(exp(raw) - 1)` times the scale
    #[serde(alias = "expm1_scale")]
    LogInverseScaled,
}

impl TransformMode {
    pub const ALL: [TransformMode; 4] = [
        TransformMode::Identity,
        TransformMode::LogInverse,
        TransformMode::IdentityScaled,
        TransformMode::LogInverseScaled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransformMode::Identity => "identity",
            TransformMode::LogInverse => "log_inverse",
            TransformMode::IdentityScaled => "identity_scaled",
            TransformMode::LogInverseScaled => "log_inverse_scaled",
        }
    }

    /// Compact name (`raw`, `expm1`, `raw_scale`, `expm1_scale`).
    pub fn short_name(&self) -> &'static str {
        match self {
            TransformMode::Identity => "raw",
            TransformMode::LogInverse => "expm1",
            TransformMode::IdentityScaled => "raw_scale",
            TransformMode::LogInverseScaled => "expm1_scale",
        }
    }

    pub fn is_scaled(&self) -> bool {
        matches!(
            self,
            TransformMode::IdentityScaled | TransformMode::LogInverseScaled
        )
    }

    /// Stable integer code used across the C boundary.
    pub fn code(&self) -> i32 {
        match self {
            TransformMode::Identity => 0,
            TransformMode::LogInverse => 1,
            TransformMode::IdentityScaled => 2,
            TransformMode::LogInverseScaled => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        TransformMode::ALL.into_iter().find(|m| m.code() == code)
    }
}

impl FromStr for TransformMode {
    type Err = ForecastError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "identity" | "raw" => Ok(Self::Identity),
            "log_inverse" | "expm1" => Ok(Self::LogInverse),
            "identity_scaled" | "raw_scale" => Ok(Self::IdentityScaled),
            "log_inverse_scaled" | "expm1_scale" => Ok(Self::LogInverseScaled),
            _ => Err(ForecastError::invalid_parameter(
                "transform_mode",
                s,
                "expected one of identity, log_inverse, identity_scaled, log_inverse_scaled",
            )),
        }
    }
}

impl fmt::Display for TransformMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transform mode and its scale, fixed for one run of one target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformPolicy {
    pub mode: TransformMode,
    pub scale: f64,
}

impl Default for TransformPolicy {
    fn default() -> Self {
        Self {
            mode: TransformMode::Identity,
            scale: 1.0,
        }
    }
}

impl TransformPolicy {
    /// # Errors
    /// [`ForecastError::InvalidParameter`] unless `scale` is finite and positive.
    pub fn new(mode: TransformMode, scale: f64) -> Result<Self> {
        let policy = Self { mode, scale };
        policy.validate()?;
        Ok(policy)
    }

    pub fn identity() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ForecastError::invalid_parameter(
                "transform_scale",
                self.scale,
                "must be finite and positive",
            ));
        }
        Ok(())
    }

    /// Scale that actually applies; unscaled modes ignore it.
    pub fn effective_scale(&self) -> f64 {
        if self.mode.is_scaled() {
            self.scale
        } else {
            1.0
        }
    }

    /// Map a raw prediction to revenue units.
    pub fn apply(&self, raw: f64) -> f64 {
        match self.mode {
            TransformMode::Identity => raw,
            TransformMode::LogInverse => raw.exp_m1(),
            TransformMode::IdentityScaled => raw * self.scale,
            TransformMode::LogInverseScaled => raw.exp_m1() * self.scale,
        }
    }
}

impl fmt::Display for TransformPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mode.is_scaled() {
            write!(f, "{} x {}", self.mode, self.scale)
        } else {
            write!(f, "{}", self.mode)
        }
    }
}
