//! Proof schema kinds and field derivation.
//!
//! Each schema kind yields at most one derived field. Raw inputs (birth
//! dates, precise values) never leave this module; only the coarsened
//! result is returned.

use crate::IngestError;
use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use tally_types::{AgeBucket, Region, Timestamp};

/// The accepted proof schema kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaKind {
    /// Birth-date credential → age bucket.
    Age,
    /// Country credential → region + country.
    Country,
    /// Personhood credential → verified flag.
    Personhood,
}

impl SchemaKind {
    pub fn parse(raw: &str) -> Result<Self, IngestError> {
        match raw {
            "age" => Ok(Self::Age),
            "country" => Ok(Self::Country),
            "personhood" => Ok(Self::Personhood),
            other => Err(IngestError::UnknownSchema(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Country => "country",
            Self::Personhood => "personhood",
        }
    }
}

/// The single coarse field a submission derives.
#[derive(Clone, Debug, PartialEq)]
pub enum DerivedField {
    Age(AgeBucket),
    Country { region: Region, country: String },
    Verified,
}

/// Derive the field for `kind` from the submitted raw fields.
pub fn derive_field(
    kind: SchemaKind,
    fields: &Value,
    now: Timestamp,
) -> Result<DerivedField, IngestError> {
    match kind {
        SchemaKind::Age => {
            let raw = fields
                .get("birthdate")
                .and_then(Value::as_str)
                .ok_or(IngestError::InvalidField("birthdate"))?;
            let birth = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| IngestError::InvalidField("birthdate"))?;
            let today = chrono::DateTime::from_timestamp(now.as_secs() as i64, 0)
                .ok_or(IngestError::InvalidField("birthdate"))?
                .date_naive();
            let age = age_in_whole_years(birth, today);
            let bucket = u32::try_from(age)
                .ok()
                .and_then(AgeBucket::from_age)
                .ok_or(IngestError::Underage)?;
            Ok(DerivedField::Age(bucket))
        }
        SchemaKind::Country => {
            let raw = fields
                .get("country")
                .and_then(Value::as_str)
                .ok_or(IngestError::InvalidField("country"))?;
            let country = raw.to_ascii_uppercase();
            let region = Region::from_country(&country)
                .ok_or_else(|| IngestError::UnknownCountry(country.clone()))?;
            Ok(DerivedField::Country { region, country })
        }
        SchemaKind::Personhood => Ok(DerivedField::Verified),
    }
}

fn age_in_whole_years(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}
