//! Tiered checkpoints shared by counter-style checkers

/// Named checkpoint of a counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    pub checkpoint: u64,
    pub achievement: &'static str,
}

/// Tier whose checkpoint equals `count` exactly
pub fn reached(tiers: &'static [Tier], count: u64) -> Option<&'static Tier> {
    tiers.iter().find(|tier| tier.checkpoint == count)
}

/// Highest tier of a ladder
pub fn top(tiers: &'static [Tier]) -> Option<&'static Tier> {
    tiers.iter().max_by_key(|tier| tier.checkpoint)
}

/// Whether `tier` is the highest tier of its ladder
pub fn is_top(tiers: &'static [Tier], tier: &Tier) -> bool {
    top(tiers).is_some_and(|top| top.checkpoint == tier.checkpoint)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LADDER: &[Tier] = &[
        Tier { checkpoint: 2, achievement: "Two" },
        Tier { checkpoint: 7, achievement: "Seven" },
        Tier { checkpoint: 15, achievement: "Fifteen" },
    ];

    #[test]
    fn test_exact_checkpoints_only() {
        assert_eq!(reached(LADDER, 2).map(|t| t.achievement), Some("Two"));
        assert_eq!(reached(LADDER, 3), None);
        assert_eq!(reached(LADDER, 16), None);
    }

    #[test]
    fn test_top_tier() {
        assert_eq!(top(LADDER).map(|t| t.achievement), Some("Fifteen"));
        assert!(is_top(LADDER, &LADDER[2]));
        assert!(!is_top(LADDER, &LADDER[0]));
    }
}
