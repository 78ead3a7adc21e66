//! Branch juggler - pushes to many distinct branches within one day
//!
//! Days are the UTC ingest date of the push, not commit timestamps.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use shared::webhook::WebhookEvent;

use crate::achievements::traits::{
    AchievementDef, CheckerResult, EvaluationContext, RuleChecker, StateView, UnlockProposal,
    load_metadata, store_metadata,
};

pub const BRANCH_JUGGLER: &str = "Branch juggler";

const ACHIEVEMENTS: &[AchievementDef] = &[AchievementDef {
    name: BRANCH_JUGGLER,
    description: "Push to several distinct branches in a single day",
}];

/// Metadata: day label → branches pushed that day
#[derive(Debug, Default, Serialize, Deserialize)]
struct BranchProgress {
    #[serde(default)]
    branches: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Debug, Clone, Copy)]
pub struct BranchJuggler {
    /// Distinct branches in one day that unlock the achievement
    pub threshold: usize,
}

impl RuleChecker for BranchJuggler {
    fn name(&self) -> &'static str {
        "branch_juggler"
    }

    fn achievements(&self) -> &'static [AchievementDef] {
        ACHIEVEMENTS
    }

    fn evaluate(
        &self,
        state: &mut dyn StateView,
        ctx: &EvaluationContext<'_>,
    ) -> CheckerResult<Vec<UnlockProposal>> {
        let WebhookEvent::Push(push) = ctx.event else {
            return Ok(Vec::new());
        };
        let Some(branch) = push.branch() else {
            return Ok(Vec::new());
        };
        if state.has_unlocked(&ctx.actor, BRANCH_JUGGLER)? {
            return Ok(Vec::new());
        }

        let mut progress: BranchProgress = load_metadata(state, &ctx.actor, BRANCH_JUGGLER)?;
        let day = progress
            .branches
            .entry(ctx.ingest_date.clone())
            .or_default();
        day.insert(branch.to_string());
        let distinct = day.len();

        if distinct == self.threshold {
            state.clear_metadata(&ctx.actor, BRANCH_JUGGLER)?;
            return Ok(vec![UnlockProposal::new(&ctx.actor, BRANCH_JUGGLER)]);
        }

        store_metadata(state, &ctx.actor, BRANCH_JUGGLER, &progress)?;
        Ok(Vec::new())
    }
}
