//! Rule registry and pattern model.

pub mod registry;
pub mod types;

pub use registry::{RuleRegistry, RuleRegistryBuilder, RulesFor};
pub use types::{Descriptor, FixAction, FixTemplate, Invariant, Pattern, StrategyKind};
