//! First blood - the first push ever seen from a user

use shared::webhook::WebhookEvent;

use crate::achievements::traits::{
    AchievementDef, CheckerResult, EvaluationContext, RuleChecker, StateView, UnlockProposal,
};

pub const FIRST_BLOOD: &str = "First blood";

const ACHIEVEMENTS: &[AchievementDef] = &[AchievementDef {
    name: FIRST_BLOOD,
    description: "Push to a repository for the first time",
}];

#[derive(Debug, Clone, Copy, Default)]
pub struct FirstBlood;

impl RuleChecker for FirstBlood {
    fn name(&self) -> &'static str {
        "first_blood"
    }

    fn achievements(&self) -> &'static [AchievementDef] {
        ACHIEVEMENTS
    }

    fn evaluate(
        &self,
        state: &mut dyn StateView,
        ctx: &EvaluationContext<'_>,
    ) -> CheckerResult<Vec<UnlockProposal>> {
        if !matches!(ctx.event, WebhookEvent::Push(_)) {
            return Ok(Vec::new());
        }
        if state.has_unlocked(&ctx.actor, FIRST_BLOOD)? {
            return Ok(Vec::new());
        }
        Ok(vec![UnlockProposal::new(&ctx.actor, FIRST_BLOOD)])
    }
}
