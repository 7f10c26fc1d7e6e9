use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::record::{require_text, Entity, Meta, RecordError};
use crate::database::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relationship {
    Father,
    Mother,
    Guardian,
}

fn default_nationality() -> String {
    "Ugandan".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    #[serde(flatten)]
    pub meta: Meta,
    pub full_name: String,
    /// National identification number
    pub nin: String,
    #[serde(default)]
    pub occupation: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_nationality")]
    pub nationality: String,
    #[serde(default)]
    pub photo: String,
    #[serde(default)]
    pub id_document: String,
    pub relationship: Relationship,
    #[serde(default)]
    pub guardian_relationship: Option<String>,
    #[serde(default)]
    pub students: Vec<Uuid>,
    #[serde(default)]
    pub alternate_phone: String,
    #[serde(default)]
    pub is_primary_contact: bool,
}

impl Parent {
    pub fn link_student(&mut self, student: Uuid) -> bool {
        if self.students.contains(&student) {
            return false;
        }
        self.students.push(student);
        true
    }

    pub fn unlink_student(&mut self, student: Uuid) -> bool {
        let before = self.students.len();
        self.students.retain(|id| *id != student);
        self.students.len() != before
    }
}

impl Entity for Parent {
    const COLLECTION: Collection = Collection::Parents;
    const LABEL: &'static str = "Parent";

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn managed_fields() -> &'static [&'static str] {
        &["students"]
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_text("fullName", &self.full_name)?;
        require_text("nin", &self.nin)?;
        require_text("phone", &self.phone)?;

        let has_guardian_detail = self
            .guardian_relationship
            .as_deref()
            .map(|g| !g.trim().is_empty())
            .unwrap_or(false);
        if self.relationship == Relationship::Guardian && !has_guardian_detail {
            return Err(RecordError::MissingRequiredField("guardianRelationship".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::record::{apply_patch, from_api_input};
    use serde_json::json;

    fn body() -> serde_json::Value {
        json!({
            "fullName": "Sarah Namuli",
            "nin": "CM900123",
            "phone": "+256700000001",
            "relationship": "Mother",
            "students": [Uuid::new_v4()]
        })
    }

    #[test]
    fn applies_defaults_and_ignores_links_in_body() {
        let parent: Parent = from_api_input(body()).unwrap();
        assert_eq!(parent.nationality, "Ugandan");
        assert!(parent.students.is_empty());
        assert!(!parent.is_primary_contact);
    }

    #[test]
    fn guardian_needs_a_described_relationship() {
        let parent: Parent = from_api_input(body()).unwrap();
        let err = apply_patch(&parent, json!({"relationship": "Guardian"})).unwrap_err();
        assert_eq!(err.field(), Some("guardianRelationship"));

        let ok = apply_patch(&parent, json!({"relationship": "Guardian", "guardianRelationship": "Aunt"}));
        assert!(ok.is_ok());
    }
}
