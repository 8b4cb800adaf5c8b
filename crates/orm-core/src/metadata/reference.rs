use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of a bidirectional relationship, named by the attribute that declares it.
///
/// `inversedBy` marks the owning side, `mappedBy` the inverse side. The `owner`
/// flag is a plain boolean on the property and never appears as a reference key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceKind {
    #[serde(rename = "mappedBy")]
    MappedBy,
    #[serde(rename = "inversedBy")]
    InversedBy,
}

impl ReferenceKind {
    /// The attribute name as it appears in entity definitions.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MappedBy => "mappedBy",
            Self::InversedBy => "inversedBy",
        }
    }

    /// The attribute used on the other side of the relationship.
    pub fn opposite(self) -> Self {
        match self {
            Self::MappedBy => Self::InversedBy,
            Self::InversedBy => Self::MappedBy,
        }
    }

    /// Which side of the relationship this attribute declares.
    pub fn side(self) -> &'static str {
        match self {
            Self::InversedBy => "owning",
            Self::MappedBy => "inverse",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
