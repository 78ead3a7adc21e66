//! Night's watchman - a commit authored in the middle of the night
//!
//! Evaluated per commit author: every author with a commit in the window is
//! credited independently of the pusher.

use crate::achievements::traits::{
    AchievementDef, CheckerResult, EvaluationContext, RuleChecker, StateView, UnlockProposal,
};
use crate::utils::time::hour_in_window;

pub const NIGHTS_WATCHMAN: &str = "Night's watchman";

const ACHIEVEMENTS: &[AchievementDef] = &[AchievementDef {
    name: NIGHTS_WATCHMAN,
    description: "Author a commit in the middle of the night (UTC)",
}];

#[derive(Debug, Clone, Copy)]
pub struct NightsWatchman {
    /// Window start hour, inclusive (UTC)
    pub start_hour: u32,
    /// Window end hour, exclusive (UTC)
    pub end_hour: u32,
}

impl RuleChecker for NightsWatchman {
    fn name(&self) -> &'static str {
        "nights_watchman"
    }

    fn achievements(&self) -> &'static [AchievementDef] {
        ACHIEVEMENTS
    }

    fn evaluate(
        &self,
        state: &mut dyn StateView,
        ctx: &EvaluationContext<'_>,
    ) -> CheckerResult<Vec<UnlockProposal>> {
        let mut proposals: Vec<UnlockProposal> = Vec::new();

        for author in &ctx.commit_authors {
            if !hour_in_window(&author.timestamp, self.start_hour, self.end_hour) {
                continue;
            }
            if proposals.iter().any(|p| p.user_id == author.user_id) {
                continue;
            }
            if state.has_unlocked(&author.user_id, NIGHTS_WATCHMAN)? {
                continue;
            }
            proposals.push(UnlockProposal::new(&author.user_id, NIGHTS_WATCHMAN));
        }

        Ok(proposals)
    }
}
