//! Core [`Component`] trait and its type identity.
//!
//! A component is a unit of per-object data. The data itself is plain user
//! state; the active flag that decides whether filters see it is kept by the
//! object store next to the value, so toggling it always goes through the
//! [`World`](crate::World) and raises a notification.
//!
//! ## Type Identity
//!
//! [`ComponentTypeId`] is derived from the component's **type name** using
//! the FNV-1a 64-bit hash algorithm. The id is deterministic for a given name
//! and cheap to compare, which makes it a good map key for the per-object
//! component table.

use std::any::Any;

/// A unique identifier for a component type, derived from its type name
/// using the FNV-1a 64-bit hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Compute the [`ComponentTypeId`] from a type name using the FNV-1a
    /// 64-bit hash algorithm.
    ///
    /// # Algorithm (FNV-1a 64-bit)
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325          (offset basis)
    /// for each byte in name.as_bytes():
    ///     hash = hash XOR byte
    ///     hash = hash * 0x00000100000001b3  (prime)
    /// return hash
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// Compute the [`ComponentTypeId`] for a component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_name(T::type_name())
    }
}

impl std::fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentType({:#018x})", self.0)
    }
}

/// The core component trait.
///
/// Any `'static` type can be a component. Override [`Component::on_destroy`]
/// to release resources right before the instance is physically freed.
///
/// # Examples
///
/// ```rust
/// use reactor_component::Component;
///
/// #[derive(Debug)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {}
/// ```
pub trait Component: Any {
    /// A human-readable name for this component type.
    ///
    /// Defaults to the fully qualified Rust type name.
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        std::any::type_name::<Self>()
    }

    /// Returns the [`ComponentTypeId`] for this component.
    fn component_type_id() -> ComponentTypeId
    where
        Self: Sized,
    {
        ComponentTypeId::from_name(Self::type_name())
    }

    /// Called once, right before the instance is physically freed.
    ///
    /// This happens when a trashed component is flushed, when its object is
    /// destroyed, or when the world holding it is dropped.
    fn on_destroy(&mut self) {}
}

/// Object-safe view of a stored component.
pub(crate) trait AnyComponent: Any {
    fn destroy(&mut self);
    fn name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> AnyComponent for C {
    fn destroy(&mut self) {
        self.on_destroy();
    }

    fn name(&self) -> &'static str {
        C::type_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
