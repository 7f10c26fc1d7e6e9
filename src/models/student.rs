use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::record::{require_text, Entity, Meta, RecordError};
use crate::database::Collection;
use crate::models::dates;
use crate::models::parent::Relationship;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AcademicStatus {
    #[default]
    Active,
    Suspended,
    Graduated,
    Transferred,
    Withdrawn,
}

/// One entry of a student's `parents` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentLink {
    pub parent: Uuid,
    pub relationship: Relationship,
    #[serde(default)]
    pub is_primary_contact: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(flatten)]
    pub meta: Meta,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub other_name: Option<String>,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "dates::option::deserialize")]
    pub date_of_birth: Option<DateTime<Utc>>,
    #[serde(default)]
    pub emis_no: Option<String>,
    #[serde(default)]
    pub lin_number: Option<String>,
    #[serde(default)]
    pub current_class: Option<Uuid>,
    #[serde(default)]
    pub academic_status: AcademicStatus,
    #[serde(default)]
    pub parents: Vec<ParentLink>,
}

impl Student {
    pub fn parent_link(&self, parent: Uuid) -> Option<&ParentLink> {
        self.parents.iter().find(|link| link.parent == parent)
    }

    /// Add a parent link. A primary link clears the flag on every other link.
    /// Returns false if the parent is already linked.
    pub fn link_parent(&mut self, link: ParentLink) -> bool {
        if self.parent_link(link.parent).is_some() {
            return false;
        }
        if link.is_primary_contact {
            for other in &mut self.parents {
                other.is_primary_contact = false;
            }
        }
        self.parents.push(link);
        true
    }

    pub fn unlink_parent(&mut self, parent: Uuid) -> bool {
        let before = self.parents.len();
        self.parents.retain(|link| link.parent != parent);
        self.parents.len() != before
    }

    /// Make one linked parent the only primary contact.
    pub fn set_primary_contact(&mut self, parent: Uuid) -> bool {
        if self.parent_link(parent).is_none() {
            return false;
        }
        for link in &mut self.parents {
            link.is_primary_contact = link.parent == parent;
        }
        true
    }

    pub fn compose_full_name(first: &str, other: Option<&str>, last: &str) -> String {
        [Some(first), other, Some(last)]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Entity for Student {
    const COLLECTION: Collection = Collection::Students;
    const LABEL: &'static str = "Student";

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn managed_fields() -> &'static [&'static str] {
        &["fullName", "parents"]
    }

    fn recompute(&mut self) {
        self.full_name = Self::compose_full_name(&self.first_name, self.other_name.as_deref(), &self.last_name);
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_text("firstName", &self.first_name)?;
        require_text("lastName", &self.last_name)
    }
}
