//! The engine authoring surface.
//!
//! An engine implements [`Engine`] once, declaring the requirements it tracks,
//! and [`Tracks<R>`] once per declared requirement. The `Tracks` bound on
//! [`Requirements::track`] makes it impossible to declare a requirement
//! without the matching hook family.

use std::any::TypeId;

use reactor_component::{Filter, ObjectId, Requirement, World};

use crate::context::EngineContext;
use crate::membership::{AnyMembership, Membership, Transition};

/// A behavior unit driven by a scene.
///
/// Lifecycle hooks run in scene order: `on_start` once the scene has started
/// (or right away when added to a started scene), `on_update` once per tick,
/// `on_destroy` when the engine is removed or its scene is dropped.
pub trait Engine: Sized + 'static {
    /// Declare the requirements this engine tracks, in evaluation order.
    fn requirements(reqs: &mut Requirements<Self>);

    /// A human-readable name, used in logs.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Called once when the scene starts.
    fn on_start(&mut self, _ctx: &mut EngineContext<'_>) {}

    /// Called once per scene update, before retired filters are freed.
    fn on_update(&mut self, _ctx: &mut EngineContext<'_>) {}

    /// Called when the engine is removed or its scene is dropped.
    fn on_destroy(&mut self, _ctx: &mut EngineContext<'_>) {}
}

/// Membership hooks for one requirement.
///
/// Hooks may mutate the world. Notifications they raise are delivered once
/// the current reconciliation step has returned.
pub trait Tracks<R: Requirement>: Engine {
    /// An object just qualified for `R`. Returning `false` discards the
    /// filter; no other hook fires for it.
    fn on_object_coming(&mut self, _filter: &Filter<R>, _world: &mut World) -> bool {
        true
    }

    /// The filter was accepted and is now live.
    fn on_object_added(&mut self, _filter: &Filter<R>, _world: &mut World) {}

    /// The object left `R`. The filter is retired but stays readable until
    /// the engine's trash is cleaned.
    fn on_object_removed(&mut self, _filter: &Filter<R>, _world: &mut World) {}
}

pub(crate) type Reconcile<E> =
    fn(&mut E, &mut dyn AnyMembership, ObjectId, bool, &mut World) -> Transition;

pub(crate) struct Declared<E> {
    pub(crate) requirement: TypeId,
    pub(crate) membership: Box<dyn AnyMembership>,
    pub(crate) reconcile: Reconcile<E>,
}

/// The ordered requirement list of an engine.
pub struct Requirements<E> {
    declared: Vec<Declared<E>>,
}

impl<E: Engine> Requirements<E> {
    pub(crate) fn collect() -> Vec<Declared<E>> {
        let mut reqs = Self {
            declared: Vec::new(),
        };
        E::requirements(&mut reqs);
        reqs.declared
    }

    /// Track requirement `R`. Declaring the same requirement twice has no
    /// effect.
    pub fn track<R: Requirement>(&mut self) -> &mut Self
    where
        E: Tracks<R>,
    {
        let requirement = TypeId::of::<R>();
        if self.declared.iter().all(|d| d.requirement != requirement) {
            self.declared.push(Declared {
                requirement,
                membership: Box::new(Membership::<R>::new()),
                reconcile: reconcile_as::<E, R>,
            });
        }
        self
    }

    /// Returns the number of declared requirements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declared.len()
    }

    /// Returns `true` if nothing has been declared yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }
}

fn reconcile_as<E: Tracks<R>, R: Requirement>(
    engine: &mut E,
    membership: &mut dyn AnyMembership,
    object: ObjectId,
    remove: bool,
    world: &mut World,
) -> Transition {
    membership
        .as_any_mut()
        .downcast_mut::<Membership<R>>()
        .map_or(Transition::Unchanged, |membership| {
            membership.reconcile(engine, object, remove, world)
        })
}

#[cfg(test)]
mod tests {
    use reactor_component::Component;

    use super::*;

    struct A;
    impl Component for A {}

    struct OnlyA;
    impl Requirement for OnlyA {
        type Components = (A,);
    }

    struct AlsoA;
    impl Requirement for AlsoA {
        type Components = (A,);
    }

    struct Twice;

    impl Engine for Twice {
        fn requirements(reqs: &mut Requirements<Self>) {
            reqs.track::<OnlyA>().track::<AlsoA>().track::<OnlyA>();
        }
    }

    impl Tracks<OnlyA> for Twice {}
    impl Tracks<AlsoA> for Twice {}

    #[test]
    fn test_requirements_keep_order_and_dedupe() {
        let declared = Requirements::<Twice>::collect();
        let ids: Vec<_> = declared.iter().map(|d| d.requirement).collect();
        assert_eq!(ids, vec![TypeId::of::<OnlyA>(), TypeId::of::<AlsoA>()]);
    }

    #[test]
    fn test_default_engine_name_is_rust_path() {
        assert!(Twice::name().ends_with("Twice"));
    }
}
