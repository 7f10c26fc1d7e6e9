//! Typed documents for every collection.

pub mod academic;
pub mod class;
pub mod fulfillment;
pub mod metadata;
pub mod parent;
pub mod requirement;
pub mod requirement_set;
pub mod school_fees;
pub mod staff;
pub mod student;
pub mod subject;
pub mod user;

pub use academic::{AcademicTerm, AcademicYear};
pub use class::SchoolClass;
pub use fulfillment::{FulfilledItem, FulfillmentStats, FulfillmentStatus, ItemUpdate, RequirementFulfillment};
pub use metadata::Metadata;
pub use parent::{Parent, Relationship};
pub use requirement::Requirement;
pub use requirement_set::{RequirementItem, RequirementSet};
pub use school_fees::SchoolFees;
pub use staff::{EmploymentStatus, Staff};
pub use student::{AcademicStatus, ParentLink, Student};
pub use subject::Subject;
pub use user::{Role, Subrole, User, UserProfile};

/// Serde helpers for date fields. Input may be a full RFC 3339 timestamp or
/// a plain `YYYY-MM-DD` date (read as midnight UTC).
pub mod dates {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw)))
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw))),
                None => Ok(None),
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::Datelike;

        #[test]
        fn accepts_dates_and_timestamps() {
            let d = parse("2024-02-05").unwrap();
            assert_eq!((d.year(), d.month(), d.day()), (2024, 2, 5));
            assert!(parse("2024-02-05T10:00:00+03:00").is_some());
            assert!(parse("05/02/2024").is_none());
        }
    }
}

/// Parse a unit enum variant from its serialized name.
pub(crate) fn parse_variant<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(raw.to_string())).ok()
}
