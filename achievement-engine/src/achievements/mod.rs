//! Achievements - state store, rule checkers and evaluation
//!
//! # 模块结构
//!
//! ```text
//! achievements/
//! ├── traits.rs     # RuleChecker, StateView, proposals
//! ├── store.rs      # unlock records + accumulator metadata
//! ├── state.rs      # per-checker metadata overlay
//! ├── checkers/     # one file per achievement family
//! ├── registry.rs   # event kind → ordered checkers
//! ├── engine.rs     # single-event evaluation
//! └── replay.rs     # full log replay
//! ```

pub mod traits;

pub mod checkers;
pub mod engine;
pub mod registry;
pub mod replay;
pub mod state;
pub mod store;

pub use checkers::Checker;
pub use engine::{EvaluationEngine, EvaluationOutcome};
pub use registry::RuleRegistry;
pub use replay::{ReplayCoordinator, ReplayReport};
pub use store::{AchievementStore, MetadataEntry};
pub use traits::{
    AchievementDef, CheckerError, CheckerResult, CommitActor, EvaluationContext, RuleChecker,
    StateView, UnlockProposal,
};
