//! You see my point? - a comment on a merge request

use shared::webhook::WebhookEvent;

use crate::achievements::traits::{
    AchievementDef, CheckerResult, EvaluationContext, RuleChecker, StateView, UnlockProposal,
};

pub const YOU_SEE_MY_POINT: &str = "You see my point?";

const ACHIEVEMENTS: &[AchievementDef] = &[AchievementDef {
    name: YOU_SEE_MY_POINT,
    description: "Comment on a merge request",
}];

#[derive(Debug, Clone, Copy, Default)]
pub struct YouSeeMyPoint;

impl RuleChecker for YouSeeMyPoint {
    fn name(&self) -> &'static str {
        "you_see_my_point"
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
        if note.merge_request.is_none() || state.has_unlocked(&ctx.actor, YOU_SEE_MY_POINT)? {
            return Ok(Vec::new());
        }
        Ok(vec![UnlockProposal::new(&ctx.actor, YOU_SEE_MY_POINT)])
    }
}
