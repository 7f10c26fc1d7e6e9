use serde::{Deserialize, Serialize};

use crate::database::record::{require_text, Entity, Meta, RecordError};
use crate::database::Collection;

/// School profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(flatten)]
    pub meta: Meta,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub box_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl Entity for Metadata {
    const COLLECTION: Collection = Collection::Metadata;
    const LABEL: &'static str = "Metadata";

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn validate(&self) -> Result<(), RecordError> {
        require_text("name", &self.name)
    }
}
