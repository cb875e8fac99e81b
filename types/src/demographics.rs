//! Coarsened demographic dimensions.
//!
//! These are the only identity-derived values the system ever persists:
//! a five-way age partition and a continent-scale region. Raw birth dates
//! and any finer-grained values stay inside the request that carried them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Five-way partition of ages ≥ 18.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeBucket {
    #[serde(rename = "18-24")]
    From18To24,
    #[serde(rename = "25-34")]
    From25To34,
    #[serde(rename = "35-44")]
    From35To44,
    #[serde(rename = "45-54")]
    From45To54,
    #[serde(rename = "55+")]
    From55,
}

impl AgeBucket {
    /// Bucket for an age in whole years. `None` for under-18.
    pub fn from_age(age: u32) -> Option<Self> {
        match age {
            0..=17 => None,
            18..=24 => Some(Self::From18To24),
            25..=34 => Some(Self::From25To34),
            35..=44 => Some(Self::From35To44),
            45..=54 => Some(Self::From45To54),
            _ => Some(Self::From55),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::From18To24 => "18-24",
            Self::From25To34 => "25-34",
            Self::From35To44 => "35-44",
            Self::From45To54 => "45-54",
            Self::From55 => "55+",
        }
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Continent-scale region, derived from an ISO 3166-1 alpha-2 country code
/// via a static lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    Africa,
    Americas,
    Asia,
    Europe,
    Oceania,
}

impl Region {
    /// Static country-code → region mapping. `None` for unknown codes.
    pub fn from_country(code: &str) -> Option<Self> {
        let upper = code.to_ascii_uppercase();
        Some(match upper.as_str() {
            "DZ" | "AO" | "BJ" | "BW" | "BF" | "BI" | "CM" | "CV" | "CF" | "TD" | "KM"
            | "CG" | "CD" | "CI" | "DJ" | "EG" | "GQ" | "ER" | "SZ" | "ET" | "GA" | "GM"
            | "GH" | "GN" | "GW" | "KE" | "LS" | "LR" | "LY" | "MG" | "MW" | "ML" | "MR"
            | "MU" | "MA" | "MZ" | "NA" | "NE" | "NG" | "RW" | "ST" | "SN" | "SC" | "SL"
            | "SO" | "ZA" | "SS" | "SD" | "TZ" | "TG" | "TN" | "UG" | "ZM" | "ZW" => Self::Africa,
            "AR" | "BS" | "BB" | "BZ" | "BO" | "BR" | "CA" | "CL" | "CO" | "CR" | "CU"
            | "DM" | "DO" | "EC" | "SV" | "GD" | "GT" | "GY" | "HT" | "HN" | "JM" | "MX"
            | "NI" | "PA" | "PY" | "PE" | "KN" | "LC" | "VC" | "SR" | "TT" | "US" | "UY"
            | "VE" => Self::Americas,
            "AF" | "AM" | "AZ" | "BH" | "BD" | "BT" | "BN" | "KH" | "CN" | "CY" | "GE"
            | "IN" | "ID" | "IR" | "IQ" | "IL" | "JP" | "JO" | "KZ" | "KW" | "KG" | "LA"
            | "LB" | "MY" | "MV" | "MN" | "MM" | "NP" | "KP" | "OM" | "PK" | "PS" | "PH"
            | "QA" | "SA" | "SG" | "KR" | "LK" | "SY" | "TW" | "TJ" | "TH" | "TL" | "TR"
            | "TM" | "AE" | "UZ" | "VN" | "YE" => Self::Asia,
            "AL" | "AD" | "AT" | "BY" | "BE" | "BA" | "BG" | "HR" | "CZ" | "DK" | "EE"
            | "FI" | "FR" | "DE" | "GR" | "HU" | "IS" | "IE" | "IT" | "LV" | "LI" | "LT"
            | "LU" | "MT" | "MD" | "MC" | "ME" | "NL" | "MK" | "NO" | "PL" | "PT" | "RO"
            | "RU" | "SM" | "RS" | "SK" | "SI" | "ES" | "SE" | "CH" | "UA" | "GB" | "VA" => {
                Self::Europe
            }
            "AU" | "FJ" | "KI" | "MH" | "FM" | "NR" | "NZ" | "PW" | "PG" | "WS" | "SB"
            | "TO" | "TV" | "VU" => Self::Oceania,
            _ => return None,
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Africa => "Africa",
            Self::Americas => "Americas",
            Self::Asia => "Asia",
            Self::Europe => "Europe",
            Self::Oceania => "Oceania",
        };
        write!(f, "{name}")
    }
}
