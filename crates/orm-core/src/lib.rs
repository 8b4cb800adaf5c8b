pub mod entity;
pub mod error;
pub mod metadata;
pub mod version;

pub use entity::{Entity, EntityRef, LockTarget};
pub use error::{
    ErrorFamily, ErrorReport, ReferenceProblem, TypeDefinitionProblem, ValidationError,
    ValidationErrorKind, ValidationResult,
};
pub use metadata::{EntityMetadata, EntityProperty, ReferenceKind};
pub use version::LockVersion;
