use serde::{Deserialize, Serialize};

use crate::database::record::{require_text, Entity, Meta, RecordError};
use crate::database::Collection;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    #[serde(flatten)]
    pub meta: Meta,
    pub name: String,
    pub short_name: String,
}

impl Entity for SchoolClass {
    const COLLECTION: Collection = Collection::Classes;
    const LABEL: &'static str = "Class";

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn recompute(&mut self) {
        self.name = self.name.trim().to_string();
        self.short_name = self.short_name.trim().to_string();
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_text("name", &self.name)?;
        require_text("shortName", &self.short_name)
    }
}
