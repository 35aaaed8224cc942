//! Template learning and matching engine (C6-C10).

pub mod matcher;
pub mod orchestrator;
pub mod pattern_builder;
pub mod rule_executor;
pub mod rules;
pub mod store;

pub use matcher::StructuralMatcher;
pub use orchestrator::TemplateOrchestrator;
pub use pattern_builder::PatternBuilder;
pub use rule_executor::RuleExecutor;
pub use rules::ExtractionRule;
pub use store::{Template, TemplateStore, TemplateStoreStats};
