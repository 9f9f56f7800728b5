//! Component instance identity and typed handles.
//!
//! Every component stored in an object gets an [`InstanceId`] that is never
//! reused. A [`ComponentHandle`] pairs an object with one instance so that a
//! reader holding it can tell a live instance apart from a later replacement
//! of the same type.

use std::fmt;
use std::marker::PhantomData;

use crate::component::Component;
use crate::object::ObjectId;

/// A unique component instance identifier.
///
/// Instance ids carry no data of their own; they only tell two instances of
/// the same component type apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

impl InstanceId {
    /// The null / invalid instance sentinel.
    pub const INVALID: InstanceId = InstanceId(0);

    /// Create an instance id from a raw `u64`.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) instance id.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.0)
    }
}

/// Allocates monotonically increasing instance ids.
///
/// One allocator lives in each [`World`](crate::World). Ids are never
/// recycled.
#[derive(Debug)]
pub struct InstanceAllocator {
    next_id: u64,
}

impl InstanceAllocator {
    /// Creates a new allocator. Ids start at 1 (0 is reserved for [`InstanceId::INVALID`]).
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Allocates a fresh instance id.
    pub fn allocate(&mut self) -> InstanceId {
        let id = self.next_id;
        self.next_id += 1;
        InstanceId(id)
    }

    /// Returns the number of ids allocated so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.next_id - 1
    }
}

impl Default for InstanceAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// A typed reference to one component instance of one object.
///
/// Resolve it through [`World::resolve`](crate::World::resolve). A handle
/// keeps resolving while the instance is allocated, including while it is
/// inactive and waiting in the trash; it stops resolving once the instance
/// has been physically freed.
pub struct ComponentHandle<C> {
    object: ObjectId,
    instance: InstanceId,
    _marker: PhantomData<fn() -> C>,
}

impl<C: Component> ComponentHandle<C> {
    pub(crate) fn new(object: ObjectId, instance: InstanceId) -> Self {
        Self {
            object,
            instance,
            _marker: PhantomData,
        }
    }

    /// The object holding the instance.
    #[must_use]
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// The instance this handle names.
    #[must_use]
    pub fn instance(&self) -> InstanceId {
        self.instance
    }
}

impl<C> Clone for ComponentHandle<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for ComponentHandle<C> {}

impl<C> PartialEq for ComponentHandle<C> {
    fn eq(&self, other: &Self) -> bool {
        self.object == other.object && self.instance == other.instance
    }
}

impl<C> Eq for ComponentHandle<C> {}

impl<C> fmt::Debug for ComponentHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("object", &self.object)
            .field("instance", &self.instance)
            .field("type", &std::any::type_name::<C>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_creation() {
        let id = InstanceId::from_raw(42);
        assert_eq!(id.id(), 42);
        assert!(id.is_valid());
    }

    #[test]
    fn test_instance_invalid() {
        assert!(!InstanceId::INVALID.is_valid());
        assert_eq!(InstanceId::INVALID.id(), 0);
    }

    #[test]
    fn test_allocator_produces_unique_ids() {
        let mut alloc = InstanceAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        let c = alloc.allocate();
        assert_eq!(a.id(), 1);
        assert_eq!(b.id(), 2);
        assert_eq!(c.id(), 3);
        assert_eq!(alloc.count(), 3);
    }

    #[test]
    fn test_instance_display() {
        assert_eq!(InstanceId::from_raw(7).to_string(), "Instance(7)");
    }
}
