//! Vault tier gating

use crate::tiers::TierTableId;

/// Tier filter supplied by a vault reader
#[derive(Debug, Clone, PartialEq)]
pub enum TierFilter {
    /// Reader rank; admits gates ranked at or below it
    Rank(f64),
    /// Exact tier name; admits that gate and ungated artifacts
    Name(String),
}

impl TierFilter {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(rank) if rank.is_finite() => TierFilter::Rank(rank),
            _ => TierFilter::Name(raw.to_string()),
        }
    }

    /// Whether an artifact gated by `gate` is visible under this filter
    ///
    /// With a numeric filter a gate may itself be numeric, or a catalog tier
    /// name compared by catalog rank. Ungated artifacts are only visible to
    /// name filters.
    pub fn admits(&self, gate: Option<&str>) -> bool {
        match self {
            TierFilter::Name(name) => match gate {
                None => true,
                Some(g) => g == name,
            },
            TierFilter::Rank(rank) => match gate.and_then(gate_rank) {
                Some(gate_rank) => gate_rank <= *rank,
                None => false,
            },
        }
    }
}

fn gate_rank(gate: &str) -> Option<f64> {
    if let Ok(n) = gate.trim().parse::<f64>() {
        return Some(n);
    }
    TierTableId::Catalog.rank(gate).map(|r| r as f64)
}
