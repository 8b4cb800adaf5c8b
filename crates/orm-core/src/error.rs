use crate::entity::{Entity, EntityRef, LockTarget};
use crate::metadata::{EntityMetadata, EntityProperty, ReferenceKind};
use crate::version::LockVersion;
use serde::Serialize;
use std::backtrace::Backtrace;
use thiserror::Error;

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Broad grouping of validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorFamily {
    /// Broken entity definitions: types, keys, inheritance, relationship wiring.
    SchemaIntegrity,
    /// The unit of work is in a state that does not allow the operation.
    RuntimeState,
    /// Optimistic locking.
    Concurrency,
}

/// Why a `mappedBy`/`inversedBy` attribute could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum ReferenceProblem {
    /// The referenced property exists but points at another entity type.
    #[error("has wrong '{key}' reference type: {owner_type} instead of {expected_type}")]
    WrongType {
        key: ReferenceKind,
        owner_type: String,
        expected_type: String,
    },
    /// The referenced property does not exist on the target type.
    #[error("has unknown '{key}' reference: {target_type}.{target_property}")]
    Unknown {
        key: ReferenceKind,
        target_type: String,
        target_property: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum TypeDefinitionProblem {
    #[error("is missing type definition")]
    Missing,
    #[error("has unknown type: {property_type}")]
    Unknown { property_type: String },
}

/// Every failure mode the mapping layer reports, with the context it needs.
///
/// The `Display` output of a kind is the final diagnostic message. The
/// `entity` fields hold display names (runtime type names), never instances.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "code", rename_all = "kebab-case")]
pub enum ValidationErrorKind {
    #[error("Trying to set {entity}.{property} of type '{expected_type}' to '{given_value}' of type '{given_type}'")]
    WrongPropertyType {
        entity: String,
        property: String,
        expected_type: String,
        given_type: String,
        given_value: String,
    },

    #[error("{entity}.{property} is not initialized, define it as '{property} = new Collection<{property_type}>(this);'")]
    CollectionNotInitialized {
        entity: String,
        property: String,
        property_type: String,
    },

    #[error("{entity} entity is missing @PrimaryKey()")]
    MissingPrimaryKey { entity: String },

    #[error("{entity}.{property} {problem}")]
    WrongReference {
        entity: String,
        property: String,
        problem: ReferenceProblem,
    },

    #[error("{entity}.{property} {problem}")]
    WrongTypeDefinition {
        entity: String,
        property: String,
        problem: TypeDefinitionProblem,
    },

    #[error(
        "Both {entity}.{property} and {target_type}.{target_property} are defined as {} sides, use {} on one of them",
        side_of(.key),
        other_side_of(.key)
    )]
    WrongOwnership {
        entity: String,
        property: String,
        target_type: String,
        target_property: String,
        key: ReferenceKind,
    },

    #[error("{entity}.{property} needs to have one of 'owner', 'mappedBy' or 'inversedBy' attributes")]
    MissingOwnership { entity: String, property: String },

    #[error("You cannot merge entity '{entity}' without identifier!")]
    MergeWithoutIdentifier { entity: String },

    #[error("Entity '{entity}' extends unknown base entity '{base}', please make sure to provide it in 'entities' array when initializing the ORM")]
    UnknownBaseEntity { entity: String, base: String },

    #[error("An open transaction is required for this operation")]
    TransactionRequired,

    #[error("Entity {entity} is not managed. An entity is managed if its fetched from the database or registered as new through EntityManager.persist()")]
    EntityNotManaged { entity: String },

    #[error("Cannot obtain optimistic lock on unversioned entity {entity}")]
    NotVersioned { entity: String },

    #[error("The optimistic lock on entity {entity} failed")]
    LockFailed { entity: String },

    #[error("The optimistic lock failed, version {expected} was expected, but is actually {actual}")]
    LockFailedVersionMismatch {
        expected: LockVersion,
        actual: LockVersion,
    },
}

fn side_of(key: &ReferenceKind) -> &'static str {
    key.side()
}

fn other_side_of(key: &ReferenceKind) -> ReferenceKind {
    key.opposite()
}

impl ValidationErrorKind {
    /// Stable identifier of the failure mode.
    pub fn code(&self) -> &'static str {
        match self {
            Self::WrongPropertyType { .. } => "wrong-property-type",
            Self::CollectionNotInitialized { .. } => "collection-not-initialized",
            Self::MissingPrimaryKey { .. } => "missing-primary-key",
            Self::WrongReference { .. } => "wrong-reference",
            Self::WrongTypeDefinition { .. } => "wrong-type-definition",
            Self::WrongOwnership { .. } => "wrong-ownership",
            Self::MissingOwnership { .. } => "missing-ownership",
            Self::MergeWithoutIdentifier { .. } => "merge-without-identifier",
            Self::UnknownBaseEntity { .. } => "unknown-base-entity",
            Self::TransactionRequired => "transaction-required",
            Self::EntityNotManaged { .. } => "entity-not-managed",
            Self::NotVersioned { .. } => "not-versioned",
            Self::LockFailed { .. } => "lock-failed",
            Self::LockFailedVersionMismatch { .. } => "lock-failed-version-mismatch",
        }
    }

    pub fn family(&self) -> ErrorFamily {
        match self {
            Self::WrongPropertyType { .. }
            | Self::MissingPrimaryKey { .. }
            | Self::WrongReference { .. }
            | Self::WrongTypeDefinition { .. }
            | Self::WrongOwnership { .. }
            | Self::MissingOwnership { .. }
            | Self::UnknownBaseEntity { .. } => ErrorFamily::SchemaIntegrity,
            Self::CollectionNotInitialized { .. }
            | Self::MergeWithoutIdentifier { .. }
            | Self::TransactionRequired
            | Self::EntityNotManaged { .. } => ErrorFamily::RuntimeState,
            Self::NotVersioned { .. }
            | Self::LockFailed { .. }
            | Self::LockFailedVersionMismatch { .. } => ErrorFamily::Concurrency,
        }
    }
}

/// A validation failure raised by the mapping layer.
///
/// The message is rendered once at construction and never changes. Lock
/// failures may carry a weak reference to the entity they were raised for;
/// every other kind carries none.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
    kind: ValidationErrorKind,
    entity: Option<EntityRef>,
    trace: CapturedTrace,
}

/// thiserror must not see a bare `Backtrace` field; its `provide` support is nightly-only.
#[derive(Debug)]
struct CapturedTrace(Backtrace);

impl ValidationError {
    fn new(kind: ValidationErrorKind, entity: Option<EntityRef>) -> Self {
        Self {
            message: kind.to_string(),
            kind,
            entity,
            trace: CapturedTrace(Backtrace::capture()),
        }
    }

    pub fn wrong_property_type(
        entity: &dyn Entity,
        property: &str,
        expected_type: &str,
        given_type: &str,
        given_value: &str,
    ) -> Self {
        Self::new(
            ValidationErrorKind::WrongPropertyType {
                entity: entity.entity_name().to_owned(),
                property: property.to_owned(),
                expected_type: expected_type.to_owned(),
                given_type: given_type.to_owned(),
                given_value: given_value.to_owned(),
            },
            None,
        )
    }

    pub fn collection_not_initialized(entity: &dyn Entity, prop: &EntityProperty) -> Self {
        Self::new(
            ValidationErrorKind::CollectionNotInitialized {
                entity: entity.entity_name().to_owned(),
                property: prop.name.clone(),
                property_type: prop.type_name().to_owned(),
            },
            None,
        )
    }

    pub fn missing_primary_key(meta: &EntityMetadata) -> Self {
        Self::new(
            ValidationErrorKind::MissingPrimaryKey {
                entity: meta.name.clone(),
            },
            None,
        )
    }

    /// `owner` is the counterpart property the reference resolved to. When it
    /// is given the reference points at the wrong type, otherwise the
    /// reference could not be resolved at all.
    pub fn wrong_reference(
        meta: &EntityMetadata,
        prop: &EntityProperty,
        key: ReferenceKind,
        owner: Option<&EntityProperty>,
    ) -> Self {
        let problem = match owner {
            Some(owner) => ReferenceProblem::WrongType {
                key,
                owner_type: owner.type_name().to_owned(),
                expected_type: meta.name.clone(),
            },
            None => ReferenceProblem::Unknown {
                key,
                target_type: prop.type_name().to_owned(),
                target_property: prop.reference(key).unwrap_or_default().to_owned(),
            },
        };
        Self::new(
            ValidationErrorKind::WrongReference {
                entity: meta.name.clone(),
                property: prop.name.clone(),
                problem,
            },
            None,
        )
    }

    pub fn wrong_type_definition(meta: &EntityMetadata, prop: &EntityProperty) -> Self {
        let problem = match &prop.property_type {
            Some(property_type) if !property_type.is_empty() => TypeDefinitionProblem::Unknown {
                property_type: property_type.clone(),
            },
            _ => TypeDefinitionProblem::Missing,
        };
        Self::new(
            ValidationErrorKind::WrongTypeDefinition {
                entity: meta.name.clone(),
                property: prop.name.clone(),
                problem,
            },
            None,
        )
    }

    /// Both sides of a relationship declare the same side through `key`.
    pub fn wrong_ownership(meta: &EntityMetadata, prop: &EntityProperty, key: ReferenceKind) -> Self {
        Self::new(
            ValidationErrorKind::WrongOwnership {
                entity: meta.name.clone(),
                property: prop.name.clone(),
                target_type: prop.type_name().to_owned(),
                target_property: prop.reference(key).unwrap_or_default().to_owned(),
                key,
            },
            None,
        )
    }

    pub fn missing_ownership(meta: &EntityMetadata, prop: &EntityProperty) -> Self {
        Self::new(
            ValidationErrorKind::MissingOwnership {
                entity: meta.name.clone(),
                property: prop.name.clone(),
            },
            None,
        )
    }

    /// Fails a merge of an entity that has no identifier.
    ///
    /// Always returns `Err`, so a merge path can bail out with `?` at the
    /// point of detection.
    pub fn merge_without_identifier<T>(meta: &EntityMetadata) -> ValidationResult<T> {
        Err(Self::new(
            ValidationErrorKind::MergeWithoutIdentifier {
                entity: meta.name.clone(),
            },
            None,
        ))
    }

    pub fn unknown_base_entity(meta: &EntityMetadata) -> Self {
        Self::new(
            ValidationErrorKind::UnknownBaseEntity {
                entity: meta.name.clone(),
                base: meta.extends.clone().unwrap_or_default(),
            },
            None,
        )
    }

    pub fn transaction_required() -> Self {
        Self::new(ValidationErrorKind::TransactionRequired, None)
    }

    pub fn entity_not_managed(entity: &dyn Entity) -> Self {
        Self::new(
            ValidationErrorKind::EntityNotManaged {
                entity: entity.entity_name().to_owned(),
            },
            None,
        )
    }

    pub fn not_versioned(meta: &EntityMetadata) -> Self {
        Self::new(
            ValidationErrorKind::NotVersioned {
                entity: meta.name.clone(),
            },
            None,
        )
    }

    /// Accepts either a bare entity name or a live instance. Only an
    /// instance is attached to the error.
    pub fn lock_failed(target: impl Into<LockTarget>) -> Self {
        let target = target.into();
        let kind = ValidationErrorKind::LockFailed {
            entity: target.name().to_owned(),
        };
        Self::new(kind, target.into_entity())
    }

    pub fn lock_failed_version_mismatch(
        entity: impl Into<EntityRef>,
        expected: impl Into<LockVersion>,
        actual: impl Into<LockVersion>,
    ) -> Self {
        Self::new(
            ValidationErrorKind::LockFailedVersionMismatch {
                expected: expected.into(),
                actual: actual.into(),
            },
            Some(entity.into()),
        )
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ValidationErrorKind {
        &self.kind
    }

    pub fn family(&self) -> ErrorFamily {
        self.kind.family()
    }

    /// The entity this error was raised for, if one was attached.
    pub fn entity(&self) -> Option<&EntityRef> {
        self.entity.as_ref()
    }

    /// Stack trace captured at construction. Empty unless backtraces are
    /// enabled through `RUST_BACKTRACE` or `RUST_LIB_BACKTRACE`.
    pub fn backtrace(&self) -> &Backtrace {
        &self.trace.0
    }

    /// Logs this error as a `warn` event. Construction never logs; callers
    /// emit at the point where they surface the failure.
    pub fn emit(&self) {
        tracing::warn!(
            code = self.kind.code(),
            family = ?self.family(),
            attached_entity = self.entity.as_ref().map(EntityRef::name),
            "{}",
            self.message
        );
    }

    pub fn report(&self) -> ErrorReport<'_> {
        ErrorReport {
            family: self.family(),
            message: &self.message,
            kind: &self.kind,
            attached_entity: self.entity.as_ref().map(EntityRef::name),
        }
    }
}

/// Serializable view of a [`ValidationError`] for structured logs.
#[derive(Debug, Serialize)]
pub struct ErrorReport<'a> {
    pub family: ErrorFamily,
    pub message: &'a str,
    #[serde(flatten)]
    pub kind: &'a ValidationErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_entity: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Author;

    impl Entity for Author {
        fn entity_name(&self) -> &str {
            "Author"
        }
    }

    fn author_meta() -> EntityMetadata {
        EntityMetadata::new("Author")
    }

    fn books_prop() -> EntityProperty {
        EntityProperty::new("books", "Book").mapped_by("author")
    }

    #[test]
    fn wrong_property_type_message() {
        let err = ValidationError::wrong_property_type(&Author, "age", "number", "string", "abc");
        assert_eq!(
            err.message(),
            "Trying to set Author.age of type 'number' to 'abc' of type 'string'"
        );
        assert!(err.entity().is_none());
    }

    #[test]
    fn collection_not_initialized_message() {
        let err = ValidationError::collection_not_initialized(&Author, &books_prop());
        assert_eq!(
            err.message(),
            "Author.books is not initialized, define it as 'books = new Collection<Book>(this);'"
        );
    }

    #[test]
    fn missing_primary_key_message() {
        let err = ValidationError::missing_primary_key(&author_meta());
        assert_eq!(err.message(), "Author entity is missing @PrimaryKey()");
    }

    #[test]
    fn wrong_reference_with_owner_reports_type() {
        let owner = EntityProperty::new("author", "Publisher");
        let err = ValidationError::wrong_reference(
            &author_meta(),
            &books_prop(),
            ReferenceKind::MappedBy,
            Some(&owner),
        );
        assert_eq!(
            err.message(),
            "Author.books has wrong 'mappedBy' reference type: Publisher instead of Author"
        );
    }

    #[test]
    fn wrong_reference_without_owner_reports_unknown() {
        let err =
            ValidationError::wrong_reference(&author_meta(), &books_prop(), ReferenceKind::MappedBy, None);
        assert_eq!(
            err.message(),
            "Author.books has unknown 'mappedBy' reference: Book.author"
        );
    }

    #[test]
    fn wrong_type_definition_missing_and_unknown() {
        let missing = ValidationError::wrong_type_definition(
            &author_meta(),
            &EntityProperty::untyped("books"),
        );
        assert_eq!(missing.message(), "Author.books is missing type definition");

        let unknown = ValidationError::wrong_type_definition(&author_meta(), &books_prop());
        assert_eq!(unknown.message(), "Author.books has unknown type: Book");
    }

    #[test]
    fn wrong_ownership_inversed_by() {
        let prop = EntityProperty::new("books", "Book").inversed_by("author");
        let err = ValidationError::wrong_ownership(&author_meta(), &prop, ReferenceKind::InversedBy);
        assert_eq!(
            err.message(),
            "Both Author.books and Book.author are defined as owning sides, use mappedBy on one of them"
        );
    }

    #[test]
    fn wrong_ownership_mapped_by() {
        let err = ValidationError::wrong_ownership(&author_meta(), &books_prop(), ReferenceKind::MappedBy);
        assert_eq!(
            err.message(),
            "Both Author.books and Book.author are defined as inverse sides, use inversedBy on one of them"
        );
    }

    #[test]
    fn missing_ownership_message() {
        let err = ValidationError::missing_ownership(&author_meta(), &EntityProperty::new("books", "Book"));
        assert_eq!(
            err.message(),
            "Author.books needs to have one of 'owner', 'mappedBy' or 'inversedBy' attributes"
        );
    }

    #[test]
    fn merge_without_identifier_is_err() {
        let result: ValidationResult<()> = ValidationError::merge_without_identifier(&author_meta());
        let err = result.unwrap_err();
        assert_eq!(err.message(), "You cannot merge entity 'Author' without identifier!");
        assert_eq!(err.family(), ErrorFamily::RuntimeState);
    }

    #[test]
    fn unknown_base_entity_message() {
        let err = ValidationError::unknown_base_entity(&author_meta().extending("BaseEntity"));
        assert_eq!(
            err.message(),
            "Entity 'Author' extends unknown base entity 'BaseEntity', please make sure to provide it in 'entities' array when initializing the ORM"
        );
    }

    #[test]
    fn transaction_required_message() {
        let err = ValidationError::transaction_required();
        assert_eq!(err.message(), "An open transaction is required for this operation");
        assert_eq!(err.kind(), &ValidationErrorKind::TransactionRequired);
    }

    #[test]
    fn entity_not_managed_message() {
        let err = ValidationError::entity_not_managed(&Author);
        assert_eq!(
            err.message(),
            "Entity Author is not managed. An entity is managed if its fetched from the database or registered as new through EntityManager.persist()"
        );
    }

    #[test]
    fn not_versioned_message() {
        let err = ValidationError::not_versioned(&author_meta());
        assert_eq!(err.message(), "Cannot obtain optimistic lock on unversioned entity Author");
        assert_eq!(err.family(), ErrorFamily::Concurrency);
    }

    #[test]
    fn lock_failed_by_name_and_by_instance() {
        let by_name = ValidationError::lock_failed("Author");
        assert_eq!(by_name.message(), "The optimistic lock on entity Author failed");
        assert!(by_name.entity().is_none());

        let author: Arc<dyn Entity> = Arc::new(Author);
        let by_instance = ValidationError::lock_failed(&author);
        assert_eq!(by_instance.message(), "The optimistic lock on entity Author failed");
        assert!(by_instance.entity().unwrap().refers_to(&author));
    }

    #[test]
    fn lock_failed_version_mismatch_numeric() {
        let author = Arc::new(Author);
        let err = ValidationError::lock_failed_version_mismatch(&author, 1i64, 2i64);
        assert_eq!(
            err.message(),
            "The optimistic lock failed, version 1 was expected, but is actually 2"
        );
        assert_eq!(err.entity().map(EntityRef::name), Some("Author"));
    }

    #[test]
    fn display_matches_message() {
        let err = ValidationError::missing_primary_key(&author_meta());
        assert_eq!(err.to_string(), err.message());
    }

    #[test]
    fn codes_and_families() {
        let cases = [
            (
                ValidationError::missing_primary_key(&author_meta()),
                "missing-primary-key",
                ErrorFamily::SchemaIntegrity,
            ),
            (
                ValidationError::collection_not_initialized(&Author, &books_prop()),
                "collection-not-initialized",
                ErrorFamily::RuntimeState,
            ),
            (
                ValidationError::entity_not_managed(&Author),
                "entity-not-managed",
                ErrorFamily::RuntimeState,
            ),
            (
                ValidationError::lock_failed("Author"),
                "lock-failed",
                ErrorFamily::Concurrency,
            ),
        ];
        for (err, code, family) in cases {
            assert_eq!(err.kind().code(), code);
            assert_eq!(err.family(), family);
        }
    }
}
