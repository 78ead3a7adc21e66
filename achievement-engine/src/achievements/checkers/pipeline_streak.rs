//! Pipeline streaks - consecutive successful pipelines
//!
//! A failure resets the streak to zero. Statuses other than success and
//! failure leave it untouched.

use serde::{Deserialize, Serialize};
use shared::webhook::{PipelineStatus, WebhookEvent};

use super::tiers::{self, Tier};
use crate::achievements::traits::{
    AchievementDef, CheckerResult, EvaluationContext, RuleChecker, StateView, UnlockProposal,
    load_metadata, store_metadata,
};

pub const METADATA_KEY: &str = "Pipeline streak";

const LADDER: &[Tier] = &[
    Tier { checkpoint: 2, achievement: "On a roll" },
    Tier { checkpoint: 7, achievement: "Steady hands" },
    Tier { checkpoint: 15, achievement: "Well oiled" },
    Tier { checkpoint: 20, achievement: "Flawless" },
];

const ACHIEVEMENTS: &[AchievementDef] = &[
    AchievementDef {
        name: "On a roll",
        description: "2 successful pipelines in a row",
    },
    AchievementDef {
        name: "Steady hands",
        description: "7 successful pipelines in a row",
    },
    AchievementDef {
        name: "Well oiled",
        description: "15 successful pipelines in a row",
    },
    AchievementDef {
        name: "Flawless",
        description: "20 successful pipelines in a row",
    },
];

#[derive(Debug, Default, Serialize, Deserialize)]
struct StreakProgress {
    #[serde(default)]
    streak: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStreak;

impl RuleChecker for PipelineStreak {
    fn name(&self) -> &'static str {
        "pipeline_streak"
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
        if let Some(top) = tiers::top(LADDER)
            && state.has_unlocked(&ctx.actor, top.achievement)?
        {
            return Ok(Vec::new());
        }

        let mut progress: StreakProgress = load_metadata(state, &ctx.actor, METADATA_KEY)?;
        match pipeline.status {
            PipelineStatus::Success => progress.streak += 1,
            PipelineStatus::Failed => {
                progress.streak = 0;
                store_metadata(state, &ctx.actor, METADATA_KEY, &progress)?;
                return Ok(Vec::new());
            }
            PipelineStatus::Other(_) => return Ok(Vec::new()),
        }

        let reached = tiers::reached(LADDER, progress.streak);
        if let Some(tier) = reached
            && tiers::is_top(LADDER, tier)
        {
            state.clear_metadata(&ctx.actor, METADATA_KEY)?;
        } else {
            store_metadata(state, &ctx.actor, METADATA_KEY, &progress)?;
        }

        Ok(reached
            .map(|tier| vec![UnlockProposal::new(&ctx.actor, tier.achievement)])
            .unwrap_or_default())
    }
}
