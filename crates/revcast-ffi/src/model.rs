//! Adapter that lets a C caller supply the prediction model.

use crate::conversion::c_str_array_to_vec;
use crate::types::{RevcastModel, RevcastPredictFn};
use libc::c_void;
use revcast_core::{FeatureVector, ForecastError, Result, RevenueModel};

/// A [`RevenueModel`] backed by a C callback.
pub struct CallbackModel {
    names: Vec<String>,
    predict: RevcastPredictFn,
    user_data: *mut c_void,
}

// SAFETY: the caller guarantees that `predict` may be invoked with
// `user_data` from any thread for the duration of the call that created the
// adapter. The adapter never outlives that call.
unsafe impl Send for CallbackModel {}
unsafe impl Sync for CallbackModel {}

impl CallbackModel {
    /// Copy the feature names out of a C model description.
    ///
    /// # Safety
    /// `model.feature_names` must point to `model.n_features` valid strings.
    pub unsafe fn from_raw(model: &RevcastModel) -> Result<Self> {
        let predict = model
            .predict
            .ok_or_else(|| ForecastError::InvalidInput("model has no predict callback".into()))?;
        let names = c_str_array_to_vec(model.feature_names, model.n_features)?;
        Ok(Self {
            names,
            predict,
            user_data: model.user_data,
        })
    }
}

impl RevenueModel for CallbackModel {
    fn expected_feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let values = features.values();
        let mut out = f64::NAN;
        // SAFETY: `values` is a live slice and `out` a live local.
        let ok = unsafe { (self.predict)(self.user_data, values.as_ptr(), values.len(), &mut out) };
        if !ok {
            return Err(ForecastError::Model("predict callback reported failure".into()));
        }
        Ok(out)
    }
}

impl std::fmt::Debug for CallbackModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackModel")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}
