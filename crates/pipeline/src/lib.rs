//! Reference capability implementations: generation, animation, subject
//! analysis and quality evaluation on the CPU with the `image` crate.

pub mod analyzer;
pub mod animator;
pub mod evaluator;
pub mod factory;
pub mod generator;
pub mod imaging;

pub use analyzer::MetadataAnalyzer;
pub use animator::ReferenceAnimator;
pub use evaluator::HistogramEvaluator;
pub use factory::ReferenceEngineFactory;
pub use generator::ReferenceGenerator;
