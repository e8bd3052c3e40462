//! Payment routing rules
//!
//! Two independent decision tables live here:
//!
//! - [`route_by_content`] picks a processor for a single payment from a
//!   SafeSearch classification of the content being paid for
//! - [`resolve_method`] picks a payout method for a creator from the
//!   creator's stored payment profile
//!
//! Both are pure; classification itself is done by the caller.

use serde::{Deserialize, Serialize};

/// SafeSearch likelihood buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Likelihood {
    Unknown,
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

impl Likelihood {
    /// LIKELY or VERY_LIKELY
    pub fn is_likely(self) -> bool {
        matches!(self, Likelihood::Likely | Likelihood::VeryLikely)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Likelihood::Unknown => "UNKNOWN",
            Likelihood::VeryUnlikely => "VERY_UNLIKELY",
            Likelihood::Unlikely => "UNLIKELY",
            Likelihood::Possible => "POSSIBLE",
            Likelihood::Likely => "LIKELY",
            Likelihood::VeryLikely => "VERY_LIKELY",
        }
    }
}

impl Default for Likelihood {
    fn default() -> Self {
        Likelihood::Unknown
    }
}

/// SafeSearch annotation for one piece of content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeSearch {
    #[serde(default)]
    pub adult: Likelihood,
    #[serde(default)]
    pub racy: Likelihood,
    #[serde(default)]
    pub violence: Likelihood,
}

impl SafeSearch {
    /// Adult for payment routing: adult or racy is at least LIKELY
    pub fn is_adult_for_payment(&self) -> bool {
        self.adult.is_likely() || self.racy.is_likely()
    }

    /// Adult for creator profiling: adult is at least LIKELY, or racy is
    /// VERY_LIKELY
    ///
    /// Stricter on racy than [`Self::is_adult_for_payment`] because the
    /// result permanently restricts the creator's payout options.
    pub fn is_adult_for_profile(&self) -> bool {
        self.adult.is_likely() || self.racy == Likelihood::VeryLikely
    }
}

/// Processor a payment is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProcessor {
    Stripe,
    Coinbase,
}

impl PaymentProcessor {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentProcessor::Stripe => "stripe",
            PaymentProcessor::Coinbase => "coinbase",
        }
    }
}

/// Outcome of [`route_by_content`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentRoute {
    pub decision: PaymentProcessor,
    pub reason: &'static str,
    pub safe_search: Option<SafeSearch>,
    pub error: Option<String>,
}

pub const REASON_ADULT: &str = "Adult content detected - routing to crypto";
pub const REASON_SAFE: &str = "Safe content - routing to Stripe Connect";
pub const REASON_CLASSIFIER_FAILED: &str = "Vision API failed - defaulting to crypto for safety";

/// Route a payment from the classifier outcome
///
/// A classifier failure routes to crypto.
pub fn route_by_content<E: std::fmt::Display>(
    classification: std::result::Result<SafeSearch, E>,
) -> ContentRoute {
    match classification {
        Ok(safe_search) if safe_search.is_adult_for_payment() => ContentRoute {
            decision: PaymentProcessor::Coinbase,
            reason: REASON_ADULT,
            safe_search: Some(safe_search),
            error: None,
        },
        Ok(safe_search) => ContentRoute {
            decision: PaymentProcessor::Stripe,
            reason: REASON_SAFE,
            safe_search: Some(safe_search),
            error: None,
        },
        Err(e) => ContentRoute {
            decision: PaymentProcessor::Coinbase,
            reason: REASON_CLASSIFIER_FAILED,
            safe_search: None,
            error: Some(e.to_string()),
        },
    }
}

/// Creator payout method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutMethod {
    Crypto,
    StripeConnect,
}

impl PayoutMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PayoutMethod::Crypto => "crypto",
            PayoutMethod::StripeConnect => "stripe_connect",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "crypto" => Some(PayoutMethod::Crypto),
            "stripe_connect" => Some(PayoutMethod::StripeConnect),
            _ => None,
        }
    }
}

/// Content rating stored on a creator profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentRating {
    Sfw,
    Adult,
}

impl ContentRating {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentRating::Sfw => "sfw",
            ContentRating::Adult => "adult",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s == "adult" {
            ContentRating::Adult
        } else {
            ContentRating::Sfw
        }
    }
}

/// Inputs to [`resolve_method`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileRouting {
    pub forced_crypto_only: bool,
    pub payment_type: Option<PayoutMethod>,
    pub content_rating: ContentRating,
}

/// Outcome of [`resolve_method`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodChoice {
    pub method: PayoutMethod,
    pub reason: &'static str,
}

/// Pick a creator's payout method
///
/// Forced crypto wins, then an explicit creator preference, then the content
/// rating.
pub fn resolve_method(profile: &ProfileRouting) -> MethodChoice {
    if profile.forced_crypto_only {
        return MethodChoice {
            method: PayoutMethod::Crypto,
            reason: "adult_content_detected",
        };
    }

    if let Some(method) = profile.payment_type {
        return MethodChoice {
            method,
            reason: "creator_preference",
        };
    }

    match profile.content_rating {
        ContentRating::Adult => MethodChoice {
            method: PayoutMethod::Crypto,
            reason: "adult_content",
        },
        ContentRating::Sfw => MethodChoice {
            method: PayoutMethod::StripeConnect,
            reason: "sfw_content",
        },
    }
}
