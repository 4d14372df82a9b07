//! Rate codes for dynamic-pricing programs.
//!
//! Hydro-Québec exposes peak announcements per commercial "offer" code;
//! internally we work with the two residential dynamic rates that carry
//! peak events. The offer-code table mirrors the upstream feed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EventError;

/// Mapping from Hydro-Québec offer codes to internal rate codes.
///
/// Commercial codes are listed for completeness; only the residential
/// dynamic rates are modeled by this crate.
pub const OFFER_CODE_TABLE: &[(&str, &str)] = &[
    ("CPC-D", "DCPC"),      // Rate D + Winter Credits
    ("TPC-DPC", "DPC"),     // Flex-D (dynamic pricing)
    ("GDP-Affaires", "M-GDP"),
    ("CPC-G", "M-CPC"),
    ("TPC-GPC", "M-GPC"),
    ("ENG01", "M-ENG"),
    ("OEA", "M-OEA"),
];

/// A dynamic rate that carries peak events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rate {
    /// Rate D with the Winter Credits option (DCPC). Has a fixed
    /// fallback schedule and anchor periods during the winter season.
    WinterCredits,
    /// Flex-D dynamic pricing (DPC). Announced events only, all critical.
    DynamicPricing,
}

impl Rate {
    /// Parses an internal rate code ("DCPC" or "DPC").
    pub fn from_code(code: &str) -> Result<Self, EventError> {
        match code {
            "DCPC" => Ok(Self::WinterCredits),
            "DPC" => Ok(Self::DynamicPricing),
            other => Err(EventError::UnknownRate {
                code: other.to_string(),
            }),
        }
    }

    /// Returns the internal rate code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::WinterCredits => "DCPC",
            Self::DynamicPricing => "DPC",
        }
    }

    /// Returns the upstream offer codes announcing peaks for this rate.
    pub fn offer_codes(&self) -> Vec<&'static str> {
        OFFER_CODE_TABLE
            .iter()
            .filter(|(_, internal)| *internal == self.code())
            .map(|(offer, _)| *offer)
            .collect()
    }

    /// Whether this rate defines anchor periods before peaks.
    pub fn supports_anchor(&self) -> bool {
        matches!(self, Self::WinterCredits)
    }

    /// Whether a local fallback schedule is generated for this rate.
    pub fn has_fallback_schedule(&self) -> bool {
        matches!(self, Self::WinterCredits)
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_codes() {
        assert_eq!(Rate::from_code("DCPC").unwrap(), Rate::WinterCredits);
        assert_eq!(Rate::from_code("DPC").unwrap(), Rate::DynamicPricing);
        assert!(Rate::from_code("D").is_err());
    }

    #[test]
    fn offer_codes() {
        assert_eq!(Rate::WinterCredits.offer_codes(), vec!["CPC-D"]);
        assert_eq!(Rate::DynamicPricing.offer_codes(), vec!["TPC-DPC"]);
    }

    #[test]
    fn capabilities() {
        assert!(Rate::WinterCredits.supports_anchor());
        assert!(Rate::WinterCredits.has_fallback_schedule());
        assert!(!Rate::DynamicPricing.supports_anchor());
        assert!(!Rate::DynamicPricing.has_fallback_schedule());
    }

    #[test]
    fn serde_roundtrip() {
        let json = serde_json::to_string(&Rate::WinterCredits).unwrap();
        assert_eq!(json, "\"winter_credits\"");
        let parsed: Rate = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Rate::WinterCredits);
    }
}
