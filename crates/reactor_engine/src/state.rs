//! An engine bundled with one membership per declared requirement.

use std::any::Any;
use std::ops::{Deref, DerefMut};

use reactor_component::{Filter, ObjectId, Requirement, World};
use tracing::trace;

use crate::context::{EngineContext, Entities};
use crate::engine::{Engine, Reconcile, Requirements};
use crate::membership::{AnyMembership, Membership, Transition};

/// An engine and the filters it currently holds.
///
/// Derefs to the engine so its own fields and methods stay reachable.
pub struct EngineState<E> {
    engine: E,
    memberships: Vec<Box<dyn AnyMembership>>,
    reconcilers: Vec<Reconcile<E>>,
}

impl<E: Engine> EngineState<E> {
    /// Wrap an engine, creating an empty membership for each requirement it
    /// declares.
    #[must_use]
    pub fn new(engine: E) -> Self {
        let (memberships, reconcilers) = Requirements::<E>::collect()
            .into_iter()
            .map(|declared| (declared.membership, declared.reconcile))
            .unzip();
        Self {
            engine,
            memberships,
            reconcilers,
        }
    }

    /// Re-test an object against every requirement, in declaration order.
    ///
    /// A veto only concerns the requirement it was raised for. Returns how
    /// many requirements changed state.
    pub fn update_object(&mut self, object: ObjectId, remove: bool, world: &mut World) -> usize {
        let mut changed = 0;
        for (membership, reconcile) in self.memberships.iter_mut().zip(&self.reconcilers) {
            let transition = reconcile(&mut self.engine, membership.as_mut(), object, remove, world);
            if transition != Transition::Unchanged {
                trace!(
                    engine = E::name(),
                    requirement = membership.requirement_name(),
                    ?object,
                    ?transition,
                    "membership changed"
                );
                changed += 1;
            }
        }
        changed
    }

    /// Free every retired filter of every requirement.
    pub fn clean_trash(&mut self) -> usize {
        self.memberships.iter_mut().map(|m| m.clean_trash()).sum()
    }

    /// Every filter of requirement `R`, retiring ones included until the
    /// next clean. Empty if `R` is not tracked.
    #[must_use]
    pub fn entities<R: Requirement>(&self) -> &[Filter<R>] {
        self.view().get::<R>()
    }

    /// The membership of requirement `R`, if tracked.
    #[must_use]
    pub fn membership<R: Requirement>(&self) -> Option<&Membership<R>> {
        self.view().membership::<R>()
    }

    /// Returns `true` if the engine declared requirement `R`.
    #[must_use]
    pub fn is_tracking<R: Requirement>(&self) -> bool {
        self.membership::<R>().is_some()
    }

    /// Number of declared requirements.
    #[must_use]
    pub fn requirement_count(&self) -> usize {
        self.memberships.len()
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Unwrap the engine, dropping its filters.
    #[must_use]
    pub fn into_inner(self) -> E {
        self.engine
    }

    fn view(&self) -> Entities<'_> {
        Entities::new(&self.memberships)
    }

    fn run_hook(
        &mut self,
        world: &mut World,
        tick_id: u64,
        dt: f64,
        hook: fn(&mut E, &mut EngineContext<'_>),
    ) {
        let entities = Entities::new(&self.memberships);
        let mut ctx = EngineContext::new(tick_id, dt, entities, world);
        hook(&mut self.engine, &mut ctx);
    }
}

impl<E> Deref for EngineState<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.engine
    }
}

impl<E> DerefMut for EngineState<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

impl<E: Engine> std::fmt::Debug for EngineState<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineState")
            .field("engine", &E::name())
            .field("requirements", &self.view())
            .finish()
    }
}

/// Type-erased engine, as stored by a scene.
pub trait AnyEngine: Any {
    fn name(&self) -> &'static str;
    fn update_object(&mut self, object: ObjectId, remove: bool, world: &mut World) -> usize;
    fn clean_trash(&mut self) -> usize;
    fn start(&mut self, world: &mut World, tick_id: u64);
    fn update(&mut self, world: &mut World, tick_id: u64, dt: f64);
    fn destroy(&mut self, world: &mut World, tick_id: u64);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<E: Engine> AnyEngine for EngineState<E> {
    fn name(&self) -> &'static str {
        E::name()
    }

    fn update_object(&mut self, object: ObjectId, remove: bool, world: &mut World) -> usize {
        EngineState::update_object(self, object, remove, world)
    }

    fn clean_trash(&mut self) -> usize {
        EngineState::clean_trash(self)
    }

    fn start(&mut self, world: &mut World, tick_id: u64) {
        self.run_hook(world, tick_id, 0.0, E::on_start);
    }

    fn update(&mut self, world: &mut World, tick_id: u64, dt: f64) {
        self.run_hook(world, tick_id, dt, E::on_update);
    }

    fn destroy(&mut self, world: &mut World, tick_id: u64) {
        self.run_hook(world, tick_id, 0.0, E::on_destroy);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
