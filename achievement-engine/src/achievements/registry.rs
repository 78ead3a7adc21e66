//! Rule Registry - event kind → ordered checkers

use std::collections::BTreeMap;

use shared::models::AchievementInfo;
use shared::webhook::EventKind;

use super::checkers::{
    BranchJuggler, Checker, FirstBlood, NightsWatchman, NotYourDay, PipelineStreak, ReviewerRank,
    YouSeeMyPoint,
};
use super::traits::RuleChecker;
use crate::core::config::RuleConfig;

/// Static mapping from event kind to the checkers run for it, in order
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: BTreeMap<EventKind, Vec<Checker>>,
}

impl RuleRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard rule set
    pub fn from_config(config: &RuleConfig) -> Self {
        let mut registry = Self::new();
        registry
            .register(EventKind::Push, FirstBlood)
            .register(
                EventKind::Push,
                NightsWatchman {
                    start_hour: config.night_window_start_hour,
                    end_hour: config.night_window_end_hour,
                },
            )
            .register(
                EventKind::Push,
                BranchJuggler {
                    threshold: config.branch_juggler_threshold,
                },
            )
            .register(EventKind::Note, YouSeeMyPoint)
            .register(EventKind::Note, ReviewerRank)
            .register(
                EventKind::Pipeline,
                NotYourDay {
                    threshold: config.failed_pipelines_threshold,
                },
            )
            .register(EventKind::Pipeline, PipelineStreak);
        registry
    }

    /// Append a checker to the list of `kind`
    pub fn register(&mut self, kind: EventKind, checker: impl Into<Checker>) -> &mut Self {
        self.rules.entry(kind).or_default().push(checker.into());
        self
    }

    /// Checkers for `kind`, `None` when the kind has no entry
    pub fn checkers_for(&self, kind: EventKind) -> Option<&[Checker]> {
        self.rules
            .get(&kind)
            .map(Vec::as_slice)
            .filter(|checkers| !checkers.is_empty())
    }

    pub fn handles(&self, kind: EventKind) -> bool {
        self.checkers_for(kind).is_some()
    }

    /// Every achievement the registered checkers can unlock
    pub fn catalog(&self) -> Vec<AchievementInfo> {
        let mut catalog = Vec::new();
        for (kind, checkers) in &self.rules {
            for checker in checkers {
                for def in checker.achievements() {
                    catalog.push(AchievementInfo {
                        name: def.name.to_string(),
                        description: def.description.to_string(),
                        event_kind: kind.as_str().to_string(),
                    });
                }
            }
        }
        catalog
    }
}
