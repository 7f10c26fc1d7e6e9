use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::record::{require_ordered_dates, require_text, Entity, Meta, RecordError};
use crate::database::Collection;
use crate::models::dates;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYear {
    #[serde(flatten)]
    pub meta: Meta,
    pub name: String,
    #[serde(deserialize_with = "dates::deserialize")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "dates::deserialize")]
    pub end_date: DateTime<Utc>,
}

impl Entity for AcademicYear {
    const COLLECTION: Collection = Collection::AcademicYears;
    const LABEL: &'static str = "Academic year";

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_text("name", &self.name)?;
        require_ordered_dates(self.start_date, self.end_date)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicTerm {
    #[serde(flatten)]
    pub meta: Meta,
    pub academic_year: Uuid,
    /// e.g. "Term 1"
    pub name: String,
    #[serde(deserialize_with = "dates::deserialize")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "dates::deserialize")]
    pub end_date: DateTime<Utc>,
}

impl Entity for AcademicTerm {
    const COLLECTION: Collection = Collection::AcademicTerms;
    const LABEL: &'static str = "Academic term";

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_text("name", &self.name)?;
        require_ordered_dates(self.start_date, self.end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::record::from_api_input;
    use serde_json::json;

    #[test]
    fn term_dates_must_be_ordered() {
        let year = Uuid::new_v4();
        let ok: Result<AcademicTerm, _> = from_api_input(json!({
            "academicYear": year,
            "name": "Term 1",
            "startDate": "2025-02-03",
            "endDate": "2025-04-25"
        }));
        assert!(ok.is_ok());

        let err = from_api_input::<AcademicTerm>(json!({
            "academicYear": year,
            "name": "Term 1",
            "startDate": "2025-04-25",
            "endDate": "2025-02-03"
        }))
        .unwrap_err();
        assert_eq!(err.field(), Some("endDate"));
    }
}
