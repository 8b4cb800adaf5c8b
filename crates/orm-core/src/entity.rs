use std::fmt;
use std::sync::{Arc, Weak};

/// A managed object instance tracked by the unit of work.
///
/// Errors only ever need the name of the entity's runtime type, so that is the
/// whole capability. Implementors return the same name for every instance of
/// a type so messages stay stable across instances.
pub trait Entity: fmt::Debug + Send + Sync {
    fn entity_name(&self) -> &str;
}

/// Weak back-reference from an error to the entity it was raised for.
///
/// Holding an `EntityRef` never keeps the entity alive. The display name is
/// captured eagerly so it survives the entity being dropped by its owner.
#[derive(Clone)]
pub struct EntityRef {
    name: String,
    handle: Weak<dyn Entity>,
}

impl EntityRef {
    pub fn new(entity: &Arc<dyn Entity>) -> Self {
        Self {
            name: entity.entity_name().to_owned(),
            handle: Arc::downgrade(entity),
        }
    }

    /// Runtime type name of the referenced entity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The entity, if its owner still holds it.
    pub fn upgrade(&self) -> Option<Arc<dyn Entity>> {
        self.handle.upgrade()
    }

    /// Whether this reference points at the given instance.
    pub fn refers_to(&self, entity: &Arc<dyn Entity>) -> bool {
        Weak::ptr_eq(&self.handle, &Arc::downgrade(entity))
    }

    pub fn is_alive(&self) -> bool {
        self.handle.strong_count() > 0
    }
}

impl<E: Entity + 'static> From<&Arc<E>> for EntityRef {
    fn from(entity: &Arc<E>) -> Self {
        let handle: Weak<E> = Arc::downgrade(entity);
        Self {
            name: entity.entity_name().to_owned(),
            handle,
        }
    }
}

impl From<&Arc<dyn Entity>> for EntityRef {
    fn from(entity: &Arc<dyn Entity>) -> Self {
        Self::new(entity)
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRef")
            .field("name", &self.name)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// What an optimistic-lock failure is reported against: a bare label or a live instance.
#[derive(Debug, Clone)]
pub enum LockTarget {
    Name(String),
    Entity(EntityRef),
}

impl LockTarget {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Entity(entity) => entity.name(),
        }
    }

    /// The instance to attach to the error. Bare labels attach nothing.
    pub fn into_entity(self) -> Option<EntityRef> {
        match self {
            Self::Name(_) => None,
            Self::Entity(entity) => Some(entity),
        }
    }
}

impl From<&str> for LockTarget {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for LockTarget {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<EntityRef> for LockTarget {
    fn from(entity: EntityRef) -> Self {
        Self::Entity(entity)
    }
}

impl<E: Entity + 'static> From<&Arc<E>> for LockTarget {
    fn from(entity: &Arc<E>) -> Self {
        Self::Entity(EntityRef::from(entity))
    }
}

impl From<&Arc<dyn Entity>> for LockTarget {
    fn from(entity: &Arc<dyn Entity>) -> Self {
        Self::Entity(EntityRef::new(entity))
    }
}
