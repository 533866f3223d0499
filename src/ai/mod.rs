//! The categorization assistant: feature extraction, the category model,
//! voice parsing, and spending insights.

pub mod artifacts;
pub mod assistant;
pub mod classifier;
pub mod features;
pub mod forest;
pub mod insights;
pub mod scaler;
pub mod voice;

pub use artifacts::FsModelStore;
pub use assistant::Assistant;
pub use classifier::CategoryClassifier;
pub use features::PredictionInput;
pub use insights::InsightData;
