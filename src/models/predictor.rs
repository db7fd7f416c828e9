//! Prediction capability consumed by the forecast engine

use crate::feature_deriver::FeatureVector;
use anyhow::Result;

/// A trained single-step sales model.
///
/// Implementations must be safe to call from several merchant pipelines at
/// once and must not depend on call order.
pub trait SalesPredictor: Send + Sync {
    /// Predict sales for the period described by `features`.
    fn predict(&self, features: &FeatureVector) -> Result<f64>;
}

impl<P: SalesPredictor + ?Sized> SalesPredictor for &P {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        (**self).predict(features)
    }
}

impl<P: SalesPredictor + ?Sized> SalesPredictor for Box<P> {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        (**self).predict(features)
    }
}

impl<P: SalesPredictor + ?Sized> SalesPredictor for std::sync::Arc<P> {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        (**self).predict(features)
    }
}

/// Always predicts the same value.
#[derive(Debug, Clone, Copy)]
pub struct ConstantPredictor(pub f64);

impl SalesPredictor for ConstantPredictor {
    fn predict(&self, _features: &FeatureVector) -> Result<f64> {
        Ok(self.0)
    }
}

/// Naive persistence model: next month's sales equal last month's.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveLagPredictor;

impl SalesPredictor for NaiveLagPredictor {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        Ok(features.sales_lag_1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(lag_1: f64) -> FeatureVector {
        FeatureVector {
            merchant_index: 0,
            month: 1,
            year: 2023,
            month_index: 1,
            sales_lag_1: lag_1,
            sales_lag_2: 0.0,
            rolling_mean_3: 0.0,
            rolling_std_3: 0.0,
        }
    }

    #[test]
    fn test_baselines() {
        assert_eq!(ConstantPredictor(12.5).predict(&features(3.0)).unwrap(), 12.5);
        assert_eq!(NaiveLagPredictor.predict(&features(3.0)).unwrap(), 3.0);
    }

    #[test]
    fn test_trait_object_forwarding() {
        let boxed: Box<dyn SalesPredictor> = Box::new(NaiveLagPredictor);
        assert_eq!(boxed.predict(&features(8.0)).unwrap(), 8.0);

        let shared = std::sync::Arc::new(ConstantPredictor(1.0));
        assert_eq!(shared.predict(&features(8.0)).unwrap(), 1.0);
    }
}
