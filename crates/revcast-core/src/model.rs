//! The prediction model boundary.
//!
//! A model is opaque: it declares the feature names it expects and maps one
//! feature row to a scalar. Training happens elsewhere.

use crate::error::{ForecastError, Result};
use crate::features::FeatureVector;
use serde::{Deserialize, Serialize};

/// A pre-trained daily revenue model.
///
/// Implementations must be pure and re-entrant; the forecaster calls
/// `predict` once per future date.
pub trait RevenueModel: Send + Sync {
    /// Ordered names of the features the model was trained on.
    fn expected_feature_names(&self) -> &[String];

    /// Predict one raw value for a feature row in schema order.
    fn predict(&self, features: &FeatureVector) -> Result<f64>;
}

/// One weight of a [`LinearModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub feature: String,
    pub weight: f64,
}

/// A linear model described in JSON:
/// `{"intercept": 1.0, "weights": [{"feature": "lag_1", "weight": 0.5}]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "LinearModelSpec", into = "LinearModelSpec")]
pub struct LinearModel {
    intercept: f64,
    names: Vec<String>,
    weights: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct LinearModelSpec {
    #[serde(default)]
    intercept: f64,
    weights: Vec<FeatureWeight>,
}

impl From<LinearModelSpec> for LinearModel {
    fn from(spec: LinearModelSpec) -> Self {
        let (names, weights) = spec
            .weights
            .into_iter()
            .map(|w| (w.feature, w.weight))
            .unzip();
        Self {
            intercept: spec.intercept,
            names,
            weights,
        }
    }
}

impl From<LinearModel> for LinearModelSpec {
    fn from(model: LinearModel) -> Self {
        Self {
            intercept: model.intercept,
            weights: model
                .names
                .into_iter()
                .zip(model.weights)
                .map(|(feature, weight)| FeatureWeight { feature, weight })
                .collect(),
        }
    }
}

impl LinearModel {
    pub fn new(intercept: f64, weights: Vec<FeatureWeight>) -> Self {
        LinearModelSpec { intercept, weights }.into()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl RevenueModel for LinearModel {
    fn expected_feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        if features.values().len() != self.weights.len() {
            return Err(ForecastError::Model(format!(
                "expected {} features, got {}",
                self.weights.len(),
                features.values().len()
            )));
        }
        let dot: f64 = self
            .weights
            .iter()
            .zip(features.values())
            .map(|(w, x)| w * x)
            .sum();
        Ok(self.intercept + dot)
    }
}

/// A model backed by a closure over the feature row.
pub struct FnModel<F> {
    names: Vec<String>,
    f: F,
}

impl<F> FnModel<F>
where
    F: Fn(&FeatureVector) -> Result<f64> + Send + Sync,
{
    pub fn new<S: AsRef<str>>(names: &[S], f: F) -> Self {
        Self {
            names: names.iter().map(|n| n.as_ref().to_string()).collect(),
            f,
        }
    }
}

impl<F> RevenueModel for FnModel<F>
where
    F: Fn(&FeatureVector) -> Result<f64> + Send + Sync,
{
    fn expected_feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        (self.f)(features)
    }
}

impl<F> std::fmt::Debug for FnModel<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnModel").field("names", &self.names).finish()
    }
}
