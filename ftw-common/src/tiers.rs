//! Tier tables
//!
//! Four independent tables map a tier name to a price, a profit-retention
//! fraction and an unlocked feature set. They do not agree with each other
//! (the same tier name carries different prices and retention fractions
//! depending on the table), and nothing here reconciles them. Callers pick
//! the table that governs their operation:
//!
//! - [`TierTableId::Catalog`] governs user records and tier upgrades
//! - [`TierTableId::FounderLadder`] governs earnings splits
//! - [`TierTableId::CreatorTools`] governs creator tool access
//! - [`TierTableId::Community`] is a rank-only ladder without prices

use serde::{Deserialize, Serialize};

/// Retention applied to earnings when the user's tier is not on the ladder
pub const DEFAULT_EARNINGS_RETENTION: f64 = 0.80;

/// One row of a tier table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierSpec {
    pub name: &'static str,
    /// One-time price in US cents
    pub price_cents: i64,
    /// Fraction of revenue the creator keeps, in `[0, 1]`
    pub profit_retention: f64,
    pub features: &'static [&'static str],
}

/// Identifies one of the static tier tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierTableId {
    Catalog,
    CreatorTools,
    FounderLadder,
    Community,
}

impl TierTableId {
    pub const ALL: [TierTableId; 4] = [
        TierTableId::Catalog,
        TierTableId::CreatorTools,
        TierTableId::FounderLadder,
        TierTableId::Community,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TierTableId::Catalog => "catalog",
            TierTableId::CreatorTools => "creator_tools",
            TierTableId::FounderLadder => "founder_ladder",
            TierTableId::Community => "community",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == s)
    }

    /// Rows in ascending rank order
    pub fn tiers(&self) -> &'static [TierSpec] {
        match self {
            TierTableId::Catalog => CATALOG,
            TierTableId::CreatorTools => CREATOR_TOOLS,
            TierTableId::FounderLadder => FOUNDER_LADDER,
            TierTableId::Community => COMMUNITY,
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&'static TierSpec> {
        self.tiers().iter().find(|t| t.name == name)
    }

    /// Zero-based position in ascending rank order
    pub fn rank(&self, name: &str) -> Option<usize> {
        self.tiers().iter().position(|t| t.name == name)
    }

    /// The tier directly above `name`; `None` at the top or for unknown names
    pub fn next_tier(&self, name: &str) -> Option<&'static TierSpec> {
        let rank = self.rank(name)?;
        self.tiers().get(rank + 1)
    }
}

const fn usd(dollars: i64) -> i64 {
    dollars * 100
}

static CATALOG: &[TierSpec] = &[
    TierSpec {
        name: "free",
        price_cents: usd(0),
        profit_retention: 0.30,
        features: &[],
    },
    TierSpec {
        name: "general",
        price_cents: usd(15),
        profit_retention: 0.50,
        features: &["basicPublishing"],
    },
    TierSpec {
        name: "supporter",
        price_cents: usd(50),
        profit_retention: 0.85,
        features: &["limitedFeatures"],
    },
    TierSpec {
        name: "legacy",
        price_cents: usd(100),
        profit_retention: 0.95,
        features: &["allFeaturesExceptCGI", "futureRituals"],
    },
    TierSpec {
        name: "standard",
        price_cents: usd(100),
        profit_retention: 1.0,
        features: &["allFeatures", "CGI", "futureRituals"],
    },
    TierSpec {
        name: "mythic",
        price_cents: usd(200),
        profit_retention: 1.0,
        features: &["allFeatures", "CGI", "futureRituals", "forever"],
    },
];

static CREATOR_TOOLS: &[TierSpec] = &[
    TierSpec {
        name: "general",
        price_cents: usd(15),
        profit_retention: 0.80,
        features: &["canvas-basic"],
    },
    TierSpec {
        name: "supporter",
        price_cents: usd(50),
        profit_retention: 0.85,
        features: &["canvas-full"],
    },
    TierSpec {
        name: "legacy",
        price_cents: usd(100),
        profit_retention: 0.95,
        features: &["canvas-full", "sound-forge", "prompt-design", "prompt-track"],
    },
    TierSpec {
        name: "standard",
        price_cents: usd(200),
        profit_retention: 1.0,
        features: &["all-tools"],
    },
    TierSpec {
        name: "mythic",
        price_cents: usd(200),
        profit_retention: 1.0,
        features: &["all-tools", "cgi-tribute", "future-drops"],
    },
];

// Prices here are the cost of stepping onto the rung from the one below.
// The top rung costs nothing because the ladder is already maxed out there.
static FOUNDER_LADDER: &[TierSpec] = &[
    TierSpec {
        name: "General Access",
        price_cents: usd(15),
        profit_retention: 0.80,
        features: &["adultAccess"],
    },
    TierSpec {
        name: "Supporter Creator",
        price_cents: usd(35),
        profit_retention: 0.85,
        features: &["adultAccess"],
    },
    TierSpec {
        name: "Legacy Creator",
        price_cents: usd(50),
        profit_retention: 0.95,
        features: &["creatorAccess"],
    },
    TierSpec {
        name: "Standard Founder",
        price_cents: usd(100),
        profit_retention: 1.0,
        features: &["founderStatus", "cgiAccess", "ritualAccess"],
    },
    TierSpec {
        name: "Mythic Founder",
        price_cents: usd(0),
        profit_retention: 1.0,
        features: &["founderStatus", "cgiAccess", "ritualAccess"],
    },
];

static COMMUNITY: &[TierSpec] = &[
    TierSpec {
        name: "Free",
        price_cents: 0,
        profit_retention: 0.0,
        features: &[],
    },
    TierSpec {
        name: "Adult Access",
        price_cents: 0,
        profit_retention: 0.0,
        features: &["matureContent"],
    },
    TierSpec {
        name: "Users",
        price_cents: 0,
        profit_retention: 0.0,
        features: &["rituals"],
    },
    TierSpec {
        name: "Contributors",
        price_cents: 0,
        profit_retention: 0.0,
        features: &["rituals", "infrastructure"],
    },
    TierSpec {
        name: "Creators",
        price_cents: 0,
        profit_retention: 0.0,
        features: &["rituals", "lore"],
    },
    TierSpec {
        name: "Founders",
        price_cents: 0,
        profit_retention: 0.0,
        features: &["rituals", "lore", "sovereign"],
    },
];

/// Tier assigned to newly created users
pub const DEFAULT_USER_TIER: &str = "free";

/// Community ladder weight, 1 (Free) through 6 (Founders)
pub fn community_weight(name: &str) -> Option<u32> {
    TierTableId::Community.rank(name).map(|r| r as u32 + 1)
}

/// Retention used when logging earnings for a user on tier `name`
pub fn earnings_retention(name: &str) -> f64 {
    TierTableId::FounderLadder
        .lookup(name)
        .map(|t| t.profit_retention)
        .unwrap_or(DEFAULT_EARNINGS_RETENTION)
}

/// Largest USD amount accepted in a request
pub const MAX_USD_AMOUNT: f64 = 10_000_000.0;

// Float noise tolerated when checking that an amount is whole cents
const CENT_TOLERANCE: f64 = 1e-4;

/// Convert a USD amount to whole cents
///
/// `None` for non-finite, negative or oversized amounts, and for amounts
/// with a fraction of a cent. Nothing is rounded up to the next cent.
pub fn usd_to_cents(amount: f64) -> Option<i64> {
    if !amount.is_finite() || !(0.0..=MAX_USD_AMOUNT).contains(&amount) {
        return None;
    }
    let cents = amount * 100.0;
    let whole = cents.round();
    if (cents - whole).abs() > CENT_TOLERANCE {
        return None;
    }
    Some(whole as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    // The tables are known to disagree. These tests pin the current values so
    // that any reconciliation shows up as a deliberate change.

    #[test]
    fn test_general_retention_differs_between_catalog_and_creator_tools() {
        let catalog = TierTableId::Catalog.lookup("general").unwrap();
        let tools = TierTableId::CreatorTools.lookup("general").unwrap();
        assert_eq!(catalog.profit_retention, 0.50);
        assert_eq!(tools.profit_retention, 0.80);
        assert_ne!(catalog.profit_retention, tools.profit_retention);
    }

    #[test]
    fn test_standard_price_differs_between_catalog_and_creator_tools() {
        assert_eq!(TierTableId::Catalog.lookup("standard").unwrap().price_cents, 10_000);
        assert_eq!(TierTableId::CreatorTools.lookup("standard").unwrap().price_cents, 20_000);
    }

    #[test]
    fn test_supporter_price_differs_between_ladder_and_catalog() {
        let ladder = TierTableId::FounderLadder.lookup("Supporter Creator").unwrap();
        let catalog = TierTableId::Catalog.lookup("supporter").unwrap();
        assert_eq!(ladder.price_cents, 3_500);
        assert_eq!(catalog.price_cents, 5_000);
        // Same retention, though: not every value diverges.
        assert_eq!(ladder.profit_retention, catalog.profit_retention);
    }

    #[test]
    fn test_free_tier_only_in_catalog() {
        assert!(TierTableId::Catalog.lookup("free").is_some());
        assert!(TierTableId::CreatorTools.lookup("free").is_none());
    }

    #[test]
    fn test_rank_and_next_tier() {
        assert_eq!(TierTableId::Catalog.rank("free"), Some(0));
        assert_eq!(TierTableId::Catalog.rank("mythic"), Some(5));
        assert_eq!(TierTableId::Catalog.next_tier("legacy").unwrap().name, "standard");
        assert!(TierTableId::Catalog.next_tier("mythic").is_none());
        assert!(TierTableId::Catalog.next_tier("platinum").is_none());

        let next = TierTableId::FounderLadder.next_tier("General Access").unwrap();
        assert_eq!(next.name, "Supporter Creator");
        assert_eq!(next.price_cents, 3_500);
    }

    #[test]
    fn test_community_weights() {
        assert_eq!(community_weight("Free"), Some(1));
        assert_eq!(community_weight("Founders"), Some(6));
        assert_eq!(community_weight("Lurkers"), None);
    }

    #[test]
    fn test_earnings_retention_defaults_for_unknown_tier() {
        assert_eq!(earnings_retention("Legacy Creator"), 0.95);
        assert_eq!(earnings_retention("Unknown"), DEFAULT_EARNINGS_RETENTION);
        // Catalog names are not on the ladder, so they fall through to the default.
        assert_eq!(earnings_retention("mythic"), DEFAULT_EARNINGS_RETENTION);
    }

    #[test]
    fn test_table_ids_round_trip_names() {
        for id in TierTableId::ALL {
            assert_eq!(TierTableId::parse(id.as_str()), Some(id));
        }
        assert_eq!(TierTableId::parse("gold"), None);
    }

    #[test]
    fn test_usd_to_cents() {
        assert_eq!(usd_to_cents(15.0), Some(1_500));
        assert_eq!(usd_to_cents(19.99), Some(1_999));
        assert_eq!(usd_to_cents(0.1 + 0.2), Some(30));
        assert_eq!(usd_to_cents(MAX_USD_AMOUNT), Some(1_000_000_000));
        assert_eq!(usd_to_cents(9_999_999.99), Some(999_999_999));
        assert_eq!(usd_to_cents(-1.0), None);
        assert_eq!(usd_to_cents(f64::NAN), None);
        assert_eq!(usd_to_cents(f64::INFINITY), None);
    }

    #[test]
    fn test_usd_to_cents_never_rounds_up_a_short_payment() {
        assert_eq!(usd_to_cents(49.996), None);
        assert_eq!(usd_to_cents(49.999), None);
        assert_eq!(usd_to_cents(199.995), None);
        assert_eq!(usd_to_cents(1e300), None);
        assert_eq!(usd_to_cents(MAX_USD_AMOUNT + 0.01), None);
    }
}
