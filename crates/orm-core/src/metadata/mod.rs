pub mod reference;

pub use reference::ReferenceKind;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single property of an entity as declared by the schema collaborator.
///
/// Only the parts the error taxonomy reads are modelled: the declared type
/// name and the relationship attributes (`owner`, `mappedBy`, `inversedBy`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityProperty {
    pub name: String,
    /// Declared type name. `None` when the definition omitted it.
    #[serde(rename = "type", default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub owner: bool,
    #[serde(default)]
    pub mapped_by: Option<String>,
    #[serde(default)]
    pub inversed_by: Option<String>,
}

impl EntityProperty {
    pub fn new(name: impl Into<String>, property_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_type: Some(property_type.into()),
            owner: false,
            mapped_by: None,
            inversed_by: None,
        }
    }

    /// A property declared without a type.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_type: None,
            owner: false,
            mapped_by: None,
            inversed_by: None,
        }
    }

    pub fn owner(mut self) -> Self {
        self.owner = true;
        self
    }

    pub fn mapped_by(mut self, property: impl Into<String>) -> Self {
        self.mapped_by = Some(property.into());
        self
    }

    pub fn inversed_by(mut self, property: impl Into<String>) -> Self {
        self.inversed_by = Some(property.into());
        self
    }

    /// Declared type name, or an empty string when none was declared.
    pub fn type_name(&self) -> &str {
        self.property_type.as_deref().unwrap_or_default()
    }

    /// Value of the given relationship attribute, if set.
    pub fn reference(&self, key: ReferenceKind) -> Option<&str> {
        match key {
            ReferenceKind::MappedBy => self.mapped_by.as_deref(),
            ReferenceKind::InversedBy => self.inversed_by.as_deref(),
        }
    }
}

/// Schema metadata for one entity type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    pub name: String,
    /// Name of the base entity this one extends.
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, EntityProperty>,
}

impl EntityMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn extending(mut self, base: impl Into<String>) -> Self {
        self.extends = Some(base.into());
        self
    }

    pub fn with_property(mut self, property: EntityProperty) -> Self {
        self.properties.insert(property.name.clone(), property);
        self
    }

    pub fn property(&self, name: &str) -> Option<&EntityProperty> {
        self.properties.get(name)
    }
}
