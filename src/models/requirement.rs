use serde::{Deserialize, Serialize};

use crate::database::record::{require_text, Entity, Meta, RecordError};
use crate::database::Collection;

/// A named item students must supply, e.g. "Ream of paper".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    #[serde(flatten)]
    pub meta: Meta,
    pub name: String,
    pub description: String,
}

impl Entity for Requirement {
    const COLLECTION: Collection = Collection::Requirements;
    const LABEL: &'static str = "Requirement";

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_text("name", &self.name)?;
        require_text("description", &self.description)
    }
}
