//! Reviewer ranks - comments on other people's merge requests
//!
//! Comments on one's own merge request are not counted.

use serde::{Deserialize, Serialize};
use shared::webhook::WebhookEvent;

use super::tiers::{self, Tier};
use crate::achievements::traits::{
    AchievementDef, CheckerResult, EvaluationContext, RuleChecker, StateView, UnlockProposal,
    load_metadata, store_metadata,
};

pub const METADATA_KEY: &str = "Reviewer Rank";

const LADDER: &[Tier] = &[
    Tier { checkpoint: 25, achievement: "Apprentice Reviewer" },
    Tier { checkpoint: 75, achievement: "Adept Reviewer" },
    Tier { checkpoint: 150, achievement: "Master Reviewer" },
    Tier { checkpoint: 200, achievement: "Grandmaster Reviewer" },
];

const ACHIEVEMENTS: &[AchievementDef] = &[
    AchievementDef {
        name: "Apprentice Reviewer",
        description: "Comment on 25 merge requests of other people",
    },
    AchievementDef {
        name: "Adept Reviewer",
        description: "Comment on 75 merge requests of other people",
    },
    AchievementDef {
        name: "Master Reviewer",
        description: "Comment on 150 merge requests of other people",
    },
    AchievementDef {
        name: "Grandmaster Reviewer",
        description: "Comment on 200 merge requests of other people",
    },
];

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReviewProgress {
    #[serde(default)]
    comments: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewerRank;

impl RuleChecker for ReviewerRank {
    fn name(&self) -> &'static str {
        "reviewer_rank"
    }

    fn achievements(&self) -> &'static [AchievementDef] {
        ACHIEVEMENTS
    }

    fn evaluate(
        &self,
        state: &mut dyn StateView,
        ctx: &EvaluationContext<'_>,
    ) -> CheckerResult<Vec<UnlockProposal>> {
        let WebhookEvent::Note(note) = ctx.event else {
            return Ok(Vec::new());
        };
        if let Some(top) = tiers::top(LADDER)
            && state.has_unlocked(&ctx.actor, top.achievement)?
        {
            return Ok(Vec::new());
        }
        if note.merge_request.is_none() || note.is_self_review() {
            return Ok(Vec::new());
        }

        let mut progress: ReviewProgress = load_metadata(state, &ctx.actor, METADATA_KEY)?;
        progress.comments += 1;
        store_metadata(state, &ctx.actor, METADATA_KEY, &progress)?;

        let Some(tier) = tiers::reached(LADDER, progress.comments) else {
            return Ok(Vec::new());
        };
        if tiers::is_top(LADDER, tier) {
            state.clear_metadata(&ctx.actor, METADATA_KEY)?;
        }
        Ok(vec![UnlockProposal::new(&ctx.actor, tier.achievement)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::checkers::test_support::*;
    use crate::achievements::state::MemoryState;
    use serde_json::json;
    use shared::models::UserId;
    use shared::webhook::EventKind;

    fn comment(state: &mut MemoryState, mr_author: Option<i64>) -> Vec<String> {
        let event = parse(EventKind::Note, &note_body("alice", 1, mr_author));
        let proposals = ReviewerRank.evaluate(state, &context(&event, NOON_INGEST)).unwrap();
        state.apply(&proposals);
        proposals.into_iter().map(|p| p.achievement).collect()
    }

    #[test]
    fn test_tiers_unlock_at_exact_checkpoints() {
        let mut state = MemoryState::default();
        let mut unlocked = Vec::new();

        for n in 1..=200 {
            let names = comment(&mut state, Some(2));
            if !names.is_empty() {
                unlocked.push((n, names));
            }
        }

        assert_eq!(
            unlocked,
            vec![
                (25, vec!["Apprentice Reviewer".to_string()]),
                (75, vec!["Adept Reviewer".to_string()]),
                (150, vec!["Master Reviewer".to_string()]),
                (200, vec!["Grandmaster Reviewer".to_string()]),
            ]
        );
        assert_eq!(state.metadata_of(&UserId::from("alice"), METADATA_KEY), None);

        // Grandmaster reached: nothing is tracked anymore
        assert!(comment(&mut state, Some(2)).is_empty());
        assert_eq!(state.metadata_of(&UserId::from("alice"), METADATA_KEY), None);
    }

    #[test]
    fn test_self_review_not_counted() {
        let mut state = MemoryState::default();

        comment(&mut state, Some(1));
        comment(&mut state, None);
        assert_eq!(state.metadata_of(&UserId::from("alice"), METADATA_KEY), None);

        comment(&mut state, Some(3));
        assert_eq!(
            state.metadata_of(&UserId::from("alice"), METADATA_KEY),
            Some(&json!({"comments": 1}))
        );
    }
}
