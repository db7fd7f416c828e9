//! Sales prediction models

pub mod inference;
pub mod loader;
pub mod predictor;

pub use inference::OnnxSalesPredictor;
pub use loader::ModelLoader;
pub use predictor::{ConstantPredictor, NaiveLagPredictor, SalesPredictor};
