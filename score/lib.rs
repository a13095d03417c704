#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod adjust;
pub mod classifier;
pub mod config;
pub mod features;
pub mod input;
pub mod io;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod reference;
pub mod tier;
pub mod types;

pub use classifier::{Classifier, ClassifierOutput};
pub use config::ScoringConfig;
pub use input::{Gender, RawUserInput};
pub use pipeline::{RiskReport, RiskScorer, ScoreStatus, ScoringError, load_classifier};
pub use types::{Condition, ConditionRiskSet, Diagnostic};
