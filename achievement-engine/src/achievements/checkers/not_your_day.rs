//! Not your day - many failed pipelines within one day
//!
//! Days are the UTC ingest date. The count compares with `>=` so a replay
//! that skips an intermediate count still unlocks. Progress keeps being
//! tracked after the unlock, starting over from a cleared slate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shared::webhook::{PipelineStatus, WebhookEvent};

use crate::achievements::traits::{
    AchievementDef, CheckerResult, EvaluationContext, RuleChecker, StateView, UnlockProposal,
    load_metadata, store_metadata,
};

pub const NOT_YOUR_DAY: &str = "Not your day";

const ACHIEVEMENTS: &[AchievementDef] = &[AchievementDef {
    name: NOT_YOUR_DAY,
    description: "Fail ten pipelines in a single day",
}];

/// Metadata: day label → failed pipelines that day
#[derive(Debug, Default, Serialize, Deserialize)]
struct FailureProgress {
    #[serde(default)]
    pipelines: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Copy)]
pub struct NotYourDay {
    /// Failures in one day that unlock the achievement
    pub threshold: u64,
}

impl RuleChecker for NotYourDay {
    fn name(&self) -> &'static str {
        "not_your_day"
    }

    fn achievements(&self) -> &'static [AchievementDef] {
        ACHIEVEMENTS
    }

    fn evaluate(
        &self,
        state: &mut dyn StateView,
        ctx: &EvaluationContext<'_>,
    ) -> CheckerResult<Vec<UnlockProposal>> {
        let WebhookEvent::Pipeline(pipeline) = ctx.event else {
            return Ok(Vec::new());
        };
        if pipeline.status != PipelineStatus::Failed {
            return Ok(Vec::new());
        }

        let mut progress: FailureProgress = load_metadata(state, &ctx.actor, NOT_YOUR_DAY)?;
        let failures = progress
            .pipelines
            .entry(ctx.ingest_date.clone())
            .or_insert(0);
        *failures += 1;
        let failures = *failures;

        if failures >= self.threshold {
            state.clear_metadata(&ctx.actor, NOT_YOUR_DAY)?;
            return Ok(vec![UnlockProposal::new(&ctx.actor, NOT_YOUR_DAY)]);
        }

        store_metadata(state, &ctx.actor, NOT_YOUR_DAY, &progress)?;
        Ok(Vec::new())
    }
}
