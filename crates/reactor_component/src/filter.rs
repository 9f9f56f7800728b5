//! Requirements and the per-object filters generated from them.
//!
//! A [`Requirement`] names a fixed list of component types an engine needs.
//! When an object first satisfies a requirement, the engine generates a
//! [`Filter`] for it: a snapshot of the object id plus one reference per
//! required component instance, captured once and never re-pointed. If the
//! object's composition changes the filter is retired and, if the object
//! still qualifies, a fresh one is generated.

use std::fmt;
use std::marker::PhantomData;

use crate::component::{Component, ComponentTypeId};
use crate::instance::{ComponentHandle, InstanceId};
use crate::object::{Object, ObjectId};
use crate::world::World;

/// A fixed list of component types, implemented for tuples of 1 to 8
/// components.
pub trait ComponentSet: 'static {
    /// The component type ids in declaration order.
    fn type_ids() -> Vec<ComponentTypeId>;

    /// Returns `true` if `predicate` holds for every component type.
    fn all<P: FnMut(ComponentTypeId) -> bool>(predicate: P) -> bool;
}

macro_rules! impl_component_set {
    ($($name:ident),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            fn type_ids() -> Vec<ComponentTypeId> {
                vec![$($name::component_type_id()),+]
            }

            fn all<P: FnMut(ComponentTypeId) -> bool>(mut predicate: P) -> bool {
                $(predicate($name::component_type_id()))&&+
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);

/// A named requirement over a set of component types.
///
/// Two requirements over the same components are still distinct: each gets
/// its own membership set and hooks inside an engine.
///
/// # Examples
///
/// ```rust
/// use reactor_component::{Component, Requirement};
///
/// struct Position(f32, f32);
/// impl Component for Position {}
///
/// struct Velocity(f32, f32);
/// impl Component for Velocity {}
///
/// struct Moving;
/// impl Requirement for Moving {
///     type Components = (Position, Velocity);
/// }
/// ```
pub trait Requirement: 'static {
    /// The component types an object must carry, all active.
    type Components: ComponentSet;

    /// A human-readable name, used in logs.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The fingerprint of one object for one requirement.
pub struct Filter<R> {
    object: ObjectId,
    active: bool,
    slots: Vec<(ComponentTypeId, InstanceId)>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Requirement> Filter<R> {
    /// Tests whether `object` currently qualifies: every required type is
    /// present and active.
    #[must_use]
    pub fn pass_filter(object: &Object) -> bool {
        R::Components::all(|type_id| object.is_type_active(type_id))
    }

    /// Generate a filter for `object`, capturing the instance currently
    /// stored for each required type.
    ///
    /// Types the object lacks are captured as [`InstanceId::INVALID`] and
    /// never resolve; callers check [`Filter::pass_filter`] first.
    #[must_use]
    pub fn make_filter(object: &Object) -> Self {
        let slots = R::Components::type_ids()
            .into_iter()
            .map(|type_id| {
                let instance = object.instance_of(type_id).unwrap_or(InstanceId::INVALID);
                (type_id, instance)
            })
            .collect();

        Self {
            object: object.id(),
            active: true,
            slots,
            _marker: PhantomData,
        }
    }

    /// The object this filter was generated for.
    #[must_use]
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// Returns `false` once the owning engine has retired the filter.
    #[must_use]
    pub fn active(&self) -> bool {
        self.active
    }

    /// Mark the filter active or retired. Only the owning engine calls this.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// The captured handle for component `C`, or `None` if `C` is not part
    /// of the requirement.
    #[must_use]
    pub fn handle<C: Component>(&self) -> Option<ComponentHandle<C>> {
        let type_id = C::component_type_id();
        self.slots
            .iter()
            .find(|(ty, _)| *ty == type_id)
            .map(|&(_, instance)| ComponentHandle::new(self.object, instance))
    }

    /// Read the captured instance of `C`.
    #[must_use]
    pub fn get<'w, C: Component>(&self, world: &'w World) -> Option<&'w C> {
        world.resolve(self.handle::<C>()?)
    }

    /// Write the captured instance of `C`.
    #[must_use]
    pub fn get_mut<'w, C: Component>(&self, world: &'w mut World) -> Option<&'w mut C> {
        world.resolve_mut(self.handle::<C>()?)
    }
}

impl<R> fmt::Debug for Filter<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("requirement", &std::any::type_name::<R>())
            .field("object", &self.object)
            .field("active", &self.active)
            .field("slots", &self.slots)
            .finish()
    }
}
