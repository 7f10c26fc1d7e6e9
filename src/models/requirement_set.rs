use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::record::{require_text, Entity, Meta, RecordError};
use crate::database::Collection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementItem {
    pub requirement: Uuid,
    pub quantity: u32,
}

/// Requirements with quantities, scoped to one class and term.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementSet {
    #[serde(flatten)]
    pub meta: Meta,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub requirement_items: Vec<RequirementItem>,
    pub school_class: Uuid,
    pub academic_term: Uuid,
}

impl RequirementSet {
    /// Distinct requirement ids referenced by the set.
    pub fn requirement_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = Vec::with_capacity(self.requirement_items.len());
        for item in &self.requirement_items {
            if !ids.contains(&item.requirement) {
                ids.push(item.requirement);
            }
        }
        ids
    }

    pub fn quantity_of(&self, requirement: Uuid) -> Option<u32> {
        self.requirement_items
            .iter()
            .find(|item| item.requirement == requirement)
            .map(|item| item.quantity)
    }
}

impl Entity for RequirementSet {
    const COLLECTION: Collection = Collection::RequirementSets;
    const LABEL: &'static str = "Requirement set";

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)?;
        if self.requirement_ids().len() != self.requirement_items.len() {
            return Err(RecordError::invalid(
                "requirementItems",
                "Each requirement may only appear once in a set",
            ));
        }
        Ok(())
    }
}
