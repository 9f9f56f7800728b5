//! The scene: owns the world and the engines, routes notifications between
//! them, and drives the start/update/cleanup phases.
//!
//! ## Update phases
//!
//! 1. Advance the tick counter.
//! 2. Run every engine's `on_update`, in registration order, delivering the
//!    notifications each one raised before moving to the next.
//! 3. Clean every engine's retired filters.
//! 4. Free every component queued for removal, then every despawned object.
//!
//! ## Delivery
//!
//! Every scene call that can change an object ends by delivering the queued
//! notifications. Notifications raised while a delivery is being handled
//! are delivered right after it, before the rest of the outer batch, so
//! propagation stays depth-first.

use reactor_component::{Component, Filter, Object, ObjectId, Requirement, World};
use reactor_engine::{Engine, EngineState};
use tracing::{debug, trace};

use crate::registry::{EngineRegistry, RegisteredEngine};

/// Delta time used by [`Scene::update`], in seconds.
pub const DEFAULT_STEP: f64 = 1.0 / 60.0;

/// Owns objects and engines and keeps their memberships in sync.
#[derive(Debug, Default)]
pub struct Scene {
    world: World,
    registry: EngineRegistry,
    started: bool,
    tick_id: u64,
}

impl Scene {
    /// Create an empty, unstarted scene.
    #[must_use]
    pub fn new() -> Self {
        Self {
            world: World::new(),
            registry: EngineRegistry::new(),
            started: false,
            tick_id: 0,
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Start every registered engine. Does nothing if already started.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        debug!(engines = self.registry.engine_count(), "scene started");

        for index in 0..self.registry.engine_count() {
            if let Some(entry) = self.registry.get_index_mut(index) {
                entry.state.start(&mut self.world, self.tick_id);
            }
            self.deliver();
        }
    }

    /// Run one update with [`DEFAULT_STEP`].
    pub fn update(&mut self) {
        self.update_by(DEFAULT_STEP);
    }

    /// Run one update with the given delta time. Does nothing before
    /// [`Scene::start`].
    pub fn update_by(&mut self, dt: f64) {
        if !self.started {
            return;
        }
        self.tick_id += 1;

        for index in 0..self.registry.engine_count() {
            if let Some(entry) = self.registry.get_index_mut(index) {
                entry.state.update(&mut self.world, self.tick_id, dt);
            }
            self.deliver();
        }

        let filters: usize = self
            .registry
            .iter_mut()
            .map(|entry| entry.state.clean_trash())
            .sum();
        let components = self.world.flush_trash();
        let objects = self.world.reap();

        trace!(
            tick_id = self.tick_id,
            filters,
            components,
            objects,
            "tick cleanup"
        );
    }

    /// Returns `true` once [`Scene::start`] has run.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Number of updates run so far.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    // ── Objects ──────────────────────────────────────────────────────────

    /// Create an object that is not yet part of the scene.
    pub fn create_object(&mut self, name: impl Into<String>) -> ObjectId {
        self.world.create_object(name)
    }

    /// Create an object and add it to the scene.
    pub fn spawn(&mut self, name: impl Into<String>) -> ObjectId {
        let id = self.world.create_object(name);
        self.add_object(id);
        id
    }

    /// Add an object to the scene and offer it to every engine.
    ///
    /// Returns `false` if the object is unknown or already in the scene.
    pub fn add_object(&mut self, id: ObjectId) -> bool {
        let attached = self.world.attach_object(id);
        self.deliver();
        attached
    }

    /// Take an object out of the scene. Every engine drops it; the object
    /// and its components stay allocated and can be added back.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        let detached = self.world.detach_object(id);
        self.deliver();
        detached
    }

    /// Take an object out of the scene and free it with all its components.
    pub fn destroy_object(&mut self, id: ObjectId) -> bool {
        if !self.world.despawn(id) {
            return false;
        }
        self.deliver();
        self.world.reap();
        true
    }

    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.world.object(id)
    }

    #[must_use]
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.world.object_mut(id)
    }

    /// Number of live objects, in the scene or not.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.world.object_count()
    }

    /// The underlying world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    // ── Components ───────────────────────────────────────────────────────

    /// Attach a component and deliver the resulting notifications.
    ///
    /// See [`World::add_component`] for the attach/reactivate rules.
    pub fn add_component<C: Component>(&mut self, id: ObjectId, value: C) -> Option<&mut C> {
        self.world.add_component(id, value)?;
        self.deliver();
        self.world.get_component_mut(id)
    }

    #[must_use]
    pub fn get_component<C: Component>(&self, id: ObjectId) -> Option<&C> {
        self.world.get_component(id)
    }

    #[must_use]
    pub fn get_component_mut<C: Component>(&mut self, id: ObjectId) -> Option<&mut C> {
        self.world.get_component_mut(id)
    }

    /// Request removal of a component. It is freed at the end of the next
    /// update.
    pub fn remove_component<C: Component>(&mut self, id: ObjectId) -> bool {
        let removed = self.world.remove_component::<C>(id);
        self.deliver();
        removed
    }

    pub fn set_component_active<C: Component>(&mut self, id: ObjectId, active: bool) -> bool {
        let found = self.world.set_component_active::<C>(id, active);
        self.deliver();
        found
    }

    // ── Engines ──────────────────────────────────────────────────────────

    /// Add an engine, offer it every object in the scene, and start it if
    /// the scene is already started.
    ///
    /// Returns `false` (dropping `engine`) if an engine of the same type is
    /// already registered.
    pub fn add_engine<E: Engine>(&mut self, engine: E) -> bool {
        if self.registry.contains::<E>() {
            debug!(engine = E::name(), "engine already registered");
            return false;
        }

        let mut state = EngineState::new(engine);
        let subscriber = self.world.subscribe();
        for object in self.world.attached().to_vec() {
            state.update_object(object, false, &mut self.world);
        }

        if let Err(entry) = self
            .registry
            .register(RegisteredEngine::new(state, subscriber))
        {
            self.world.unsubscribe(entry.subscriber);
            return false;
        }
        debug!(engine = E::name(), %subscriber, "engine added");
        self.deliver();

        if self.started {
            if let Some(entry) = self.registry.get_mut::<E>() {
                entry.state.start(&mut self.world, self.tick_id);
            }
            self.deliver();
        }
        true
    }

    /// The engine of type `E`, if registered.
    #[must_use]
    pub fn get_engine<E: Engine>(&self) -> Option<&E> {
        self.engine_state::<E>().map(EngineState::engine)
    }

    #[must_use]
    pub fn get_engine_mut<E: Engine>(&mut self) -> Option<&mut E> {
        self.registry
            .get_mut::<E>()?
            .downcast_mut::<E>()
            .map(EngineState::engine_mut)
    }

    /// The engine of type `E` together with its memberships.
    #[must_use]
    pub fn engine_state<E: Engine>(&self) -> Option<&EngineState<E>> {
        self.registry.get::<E>()?.downcast::<E>()
    }

    /// Every filter engine `E` holds for requirement `R`. Empty if either is
    /// unknown.
    #[must_use]
    pub fn entities<E: Engine, R: Requirement>(&self) -> &[Filter<R>] {
        self.engine_state::<E>()
            .map(EngineState::entities::<R>)
            .unwrap_or_default()
    }

    /// Remove the engine of type `E`, running its `on_destroy` hook, and
    /// hand it back. Does nothing if no such engine is registered.
    pub fn remove_engine<E: Engine>(&mut self) -> Option<E> {
        let mut entry = self.registry.unregister::<E>()?;
        self.world.unsubscribe(entry.subscriber);
        entry.state.destroy(&mut self.world, self.tick_id);
        debug!(engine = entry.name, "engine removed");
        self.deliver();

        let state = entry.state.into_any().downcast::<EngineState<E>>().ok()?;
        Some((*state).into_inner())
    }

    /// Number of registered engines.
    #[must_use]
    pub fn engine_count(&self) -> usize {
        self.registry.engine_count()
    }

    // ── Delivery ─────────────────────────────────────────────────────────

    fn deliver(&mut self) {
        for delivery in self.world.take_deliveries() {
            // An earlier hook may have put the object back since it left.
            let remove = delivery.remove && !self.world.is_attached(delivery.object);
            if let Some(entry) = self.registry.by_subscriber_mut(delivery.subscriber) {
                trace!(
                    engine = entry.name,
                    object = ?delivery.object,
                    remove,
                    "delivering"
                );
                entry
                    .state
                    .update_object(delivery.object, remove, &mut self.world);
            }
            if self.world.has_deliveries() {
                self.deliver();
            }
        }
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        let tick_id = self.tick_id;
        for mut entry in self.registry.drain() {
            entry.state.destroy(&mut self.world, tick_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use reactor_engine::{EngineContext, Requirements, Tracks};

    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    fn entries(log: &Log) -> Vec<String> {
        log.borrow().clone()
    }

    #[derive(Debug, PartialEq)]
    struct A(u32);
    impl Component for A {}

    #[derive(Debug, PartialEq)]
    struct B(u32);
    impl Component for B {}

    struct FilterA;
    impl Requirement for FilterA {
        type Components = (A,);
    }

    struct FilterB;
    impl Requirement for FilterB {
        type Components = (B,);
    }

    struct FilterAb;
    impl Requirement for FilterAb {
        type Components = (A, B);
    }

    /// Records every hook it receives.
    #[derive(Default)]
    struct Watcher {
        log: Log,
        veto: bool,
    }

    impl Watcher {
        fn new(log: &Log) -> Self {
            Self {
                log: Rc::clone(log),
                veto: false,
            }
        }

        fn push(&self, event: &str) {
            self.log.borrow_mut().push(event.to_string());
        }
    }

    impl Engine for Watcher {
        fn requirements(reqs: &mut Requirements<Self>) {
            reqs.track::<FilterA>();
        }

        fn on_start(&mut self, _ctx: &mut EngineContext<'_>) {
            self.push("start");
        }

        fn on_update(&mut self, ctx: &mut EngineContext<'_>) {
            self.push(&format!("update {}", ctx.tick_id));
        }

        fn on_destroy(&mut self, _ctx: &mut EngineContext<'_>) {
            self.push("destroy");
        }
    }

    impl Tracks<FilterA> for Watcher {
        fn on_object_coming(&mut self, _filter: &Filter<FilterA>, _world: &mut World) -> bool {
            self.push("coming");
            !self.veto
        }

        fn on_object_added(&mut self, _filter: &Filter<FilterA>, _world: &mut World) {
            self.push("added");
        }

        fn on_object_removed(&mut self, _filter: &Filter<FilterA>, _world: &mut World) {
            self.push("removed");
        }
    }

    #[test]
    fn test_membership_scenario() {
        let log = Log::default();
        let mut scene = Scene::new();
        scene.add_engine(Watcher::new(&log));
        scene.start();

        let o = scene.spawn("o");
        assert_eq!(entries(&log), vec!["start"], "no hooks for an empty object");

        scene.add_component(o, A(1));
        assert_eq!(entries(&log), vec!["start", "coming", "added"]);
        assert_eq!(scene.entities::<Watcher, FilterA>().len(), 1);

        scene.remove_component::<A>(o);
        assert_eq!(entries(&log).last().map(String::as_str), Some("removed"));
        assert_eq!(scene.entities::<Watcher, FilterA>().len(), 1);

        scene.update();
        assert!(scene.entities::<Watcher, FilterA>().is_empty());
        assert!(scene.get_component::<A>(o).is_none());
    }

    #[test]
    fn test_idempotent_attach_fires_no_hooks() {
        let log = Log::default();
        let mut scene = Scene::new();
        scene.add_engine(Watcher::new(&log));
        let o = scene.spawn("o");
        scene.add_component(o, A(1));
        let before = entries(&log).len();

        let a = scene.add_component(o, A(2));
        assert_eq!(a.map(|a| a.0), Some(1));
        assert_eq!(entries(&log).len(), before);
    }

    #[test]
    fn test_reactivation_keeps_state_and_membership_cycles() {
        let log = Log::default();
        let mut scene = Scene::new();
        scene.add_engine(Watcher::new(&log));
        scene.start();
        let o = scene.spawn("o");
        scene.add_component(o, A(1));
        if let Some(a) = scene.get_component_mut::<A>(o) {
            a.0 = 9;
        }

        scene.remove_component::<A>(o);
        let a = scene.add_component(o, A(0));
        assert_eq!(a.map(|a| a.0), Some(9));
        assert!(scene.world().pending_cleanup().is_empty());

        scene.update();
        assert_eq!(scene.get_component::<A>(o), Some(&A(9)));
        assert_eq!(scene.entities::<Watcher, FilterA>().len(), 1);
        assert!(scene.entities::<Watcher, FilterA>()[0].active());
    }

    #[test]
    fn test_veto_keeps_object_out() {
        let log = Log::default();
        let mut scene = Scene::new();
        scene.add_engine(Watcher {
            veto: true,
            ..Watcher::new(&log)
        });
        let o = scene.spawn("o");
        scene.add_component(o, A(1));
        scene.remove_component::<A>(o);

        assert!(scene.entities::<Watcher, FilterA>().is_empty());
        assert_eq!(entries(&log), vec!["coming"]);
    }

    #[test]
    fn test_lifecycle_waits_for_start() {
        let log = Log::default();
        let mut scene = Scene::new();
        scene.add_engine(Watcher::new(&log));
        scene.update();
        assert!(entries(&log).is_empty());
        assert_eq!(scene.tick_id(), 0);

        scene.start();
        scene.start();
        scene.update();
        assert_eq!(entries(&log), vec!["start", "update 1"]);
        assert!(scene.is_started());
    }

    #[test]
    fn test_engine_added_after_start_is_started_and_sees_objects() {
        let log = Log::default();
        let mut scene = Scene::new();
        scene.start();
        let o = scene.spawn("o");
        scene.add_component(o, A(1));

        assert!(scene.add_engine(Watcher::new(&log)));
        assert_eq!(entries(&log), vec!["coming", "added", "start"]);
    }

    #[test]
    fn test_duplicate_engine_is_ignored() {
        let log = Log::default();
        let mut scene = Scene::new();
        assert!(scene.add_engine(Watcher::new(&log)));
        assert!(!scene.add_engine(Watcher::new(&log)));
        assert_eq!(scene.engine_count(), 1);

        let o = scene.spawn("o");
        assert!(!scene.add_object(o));
        scene.add_component(o, A(1));
        assert_eq!(entries(&log), vec!["coming", "added"]);
    }

    #[test]
    fn test_remove_engine_destroys_and_returns_it() {
        let log = Log::default();
        let mut scene = Scene::new();
        scene.add_engine(Watcher::new(&log));
        let o = scene.spawn("o");

        let engine = scene.remove_engine::<Watcher>();
        assert!(engine.is_some());
        assert!(scene.remove_engine::<Watcher>().is_none());
        assert!(scene.get_engine::<Watcher>().is_none());
        assert_eq!(entries(&log), vec!["destroy"]);

        scene.add_component(o, A(1));
        assert_eq!(entries(&log), vec!["destroy"], "removed engines hear nothing");
    }

    #[test]
    fn test_dropping_scene_destroys_engines() {
        let log = Log::default();
        {
            let mut scene = Scene::new();
            scene.add_engine(Watcher::new(&log));
        }
        assert_eq!(entries(&log), vec!["destroy"]);
    }

    #[test]
    fn test_remove_object_disconnects_it() {
        let log = Log::default();
        let mut scene = Scene::new();
        scene.add_engine(Watcher::new(&log));
        let o = scene.spawn("o");
        scene.add_component(o, A(1));

        assert!(scene.remove_object(o));
        assert_eq!(entries(&log), vec!["coming", "added", "removed"]);

        scene.set_component_active::<A>(o, false);
        scene.set_component_active::<A>(o, true);
        assert_eq!(entries(&log).len(), 3, "detached objects are not re-tested");

        assert!(scene.add_object(o));
        assert_eq!(entries(&log).len(), 5);
        assert!(scene.object(o).is_some());
    }

    /// Puts every object it loses straight back into the scene.
    struct Rejoin;

    impl Engine for Rejoin {
        fn requirements(reqs: &mut Requirements<Self>) {
            reqs.track::<FilterA>();
        }
    }

    impl Tracks<FilterA> for Rejoin {
        fn on_object_removed(&mut self, filter: &Filter<FilterA>, world: &mut World) {
            world.attach_object(filter.object());
        }
    }

    #[test]
    fn test_object_put_back_by_a_hook_stays_tracked_everywhere() {
        let log = Log::default();
        let mut scene = Scene::new();
        scene.add_engine(Rejoin);
        scene.add_engine(Watcher::new(&log));
        let o = scene.spawn("o");
        scene.add_component(o, A(1));

        assert!(scene.remove_object(o));
        assert!(scene.world().is_attached(o));
        let active = |filters: &[Filter<FilterA>]| filters.iter().filter(|f| f.active()).count();
        assert_eq!(active(scene.entities::<Rejoin, FilterA>()), 1);
        assert_eq!(active(scene.entities::<Watcher, FilterA>()), 1);
        assert_eq!(entries(&log), vec!["coming", "added"]);
    }

    struct Tracked(Rc<RefCell<u32>>);
    impl Component for Tracked {
        fn on_destroy(&mut self) {
            *self.0.borrow_mut() += 1;
        }
    }

    #[test]
    fn test_removal_made_outside_scene_is_flushed_after_joining() {
        let destroyed = Rc::new(RefCell::new(0));
        let mut scene = Scene::new();
        scene.start();
        let o = scene.create_object("o");
        scene.add_component(o, Tracked(Rc::clone(&destroyed)));
        scene.remove_component::<Tracked>(o);

        assert!(scene.add_object(o));
        scene.update();
        assert_eq!(*destroyed.borrow(), 1);
        assert!(scene.get_component::<Tracked>(o).is_none());
    }

    #[test]
    fn test_destroy_object_frees_it() {
        let log = Log::default();
        let mut scene = Scene::new();
        scene.add_engine(Watcher::new(&log));
        let o = scene.spawn("o");
        scene.add_component(o, A(1));

        assert!(scene.destroy_object(o));
        assert!(!scene.destroy_object(o));
        assert!(scene.object(o).is_none());
        assert_eq!(scene.object_count(), 0);
        assert_eq!(entries(&log).last().map(String::as_str), Some("removed"));
    }

    /// Tracks two requirements independently.
    #[derive(Default)]
    struct Pair {
        a: u32,
        b: u32,
    }

    impl Engine for Pair {
        fn requirements(reqs: &mut Requirements<Self>) {
            reqs.track::<FilterA>().track::<FilterB>();
        }
    }

    impl Tracks<FilterA> for Pair {
        fn on_object_added(&mut self, _filter: &Filter<FilterA>, _world: &mut World) {
            self.a += 1;
        }
    }

    impl Tracks<FilterB> for Pair {
        fn on_object_added(&mut self, _filter: &Filter<FilterB>, _world: &mut World) {
            self.b += 1;
        }
    }

    #[test]
    fn test_multi_requirement_independence() {
        let mut scene = Scene::new();
        scene.add_engine(Pair::default());
        let o = scene.spawn("o");
        scene.add_component(o, B(1));

        assert!(scene.entities::<Pair, FilterA>().is_empty());
        assert_eq!(scene.entities::<Pair, FilterB>().len(), 1);
        assert_eq!(scene.get_engine::<Pair>().map(|p| (p.a, p.b)), Some((0, 1)));
    }

    /// Gives every object that gains `A` a `B` as well, and strips `B` from
    /// objects that lose `A`.
    #[derive(Default)]
    struct Grant;

    impl Engine for Grant {
        fn requirements(reqs: &mut Requirements<Self>) {
            reqs.track::<FilterA>();
        }
    }

    impl Tracks<FilterA> for Grant {
        fn on_object_added(&mut self, filter: &Filter<FilterA>, world: &mut World) {
            let _ = world.add_component(filter.object(), B(7));
        }

        fn on_object_removed(&mut self, filter: &Filter<FilterA>, world: &mut World) {
            world.remove_component::<B>(filter.object());
        }
    }

    /// Counts objects carrying both `A` and `B`.
    #[derive(Default)]
    struct Both {
        added: u32,
        removed: u32,
    }

    impl Engine for Both {
        fn requirements(reqs: &mut Requirements<Self>) {
            reqs.track::<FilterAb>();
        }
    }

    impl Tracks<FilterAb> for Both {
        fn on_object_added(&mut self, _filter: &Filter<FilterAb>, _world: &mut World) {
            self.added += 1;
        }

        fn on_object_removed(&mut self, _filter: &Filter<FilterAb>, _world: &mut World) {
            self.removed += 1;
        }
    }

    #[test]
    fn test_hook_mutations_propagate_before_call_returns() {
        let mut scene = Scene::new();
        scene.add_engine(Grant);
        scene.add_engine(Both::default());
        let o = scene.spawn("o");

        scene.add_component(o, A(1));
        assert_eq!(scene.get_component::<B>(o), Some(&B(7)));
        assert_eq!(scene.get_engine::<Both>().map(|b| b.added), Some(1));
        assert_eq!(scene.entities::<Both, FilterAb>().len(), 1);

        scene.remove_component::<A>(o);
        assert_eq!(scene.get_engine::<Both>().map(|b| b.removed), Some(1));
        assert_eq!(scene.world().pending_cleanup(), &[o, o]);

        scene.start();
        scene.update();
        assert!(scene.get_component::<A>(o).is_none());
        assert!(scene.get_component::<B>(o).is_none());
        assert!(scene.entities::<Both, FilterAb>().is_empty());
    }

    /// Strips `A` from every tracked object during its update.
    #[derive(Default)]
    struct Stripper;

    impl Engine for Stripper {
        fn requirements(reqs: &mut Requirements<Self>) {
            reqs.track::<FilterA>();
        }

        fn on_update(&mut self, ctx: &mut EngineContext<'_>) {
            let objects: Vec<_> = ctx.entities.active::<FilterA>().map(Filter::object).collect();
            for object in objects {
                ctx.world.remove_component::<A>(object);
            }
        }
    }

    impl Tracks<FilterA> for Stripper {}

    /// Reads its filters during update to check they are still allocated.
    #[derive(Default)]
    struct Reader {
        seen: Vec<(bool, Option<u32>)>,
    }

    impl Engine for Reader {
        fn requirements(reqs: &mut Requirements<Self>) {
            reqs.track::<FilterA>();
        }

        fn on_update(&mut self, ctx: &mut EngineContext<'_>) {
            for filter in ctx.entities.get::<FilterA>() {
                let value = filter.get::<A>(ctx.world).map(|a| a.0);
                self.seen.push((filter.active(), value));
            }
        }
    }

    impl Tracks<FilterA> for Reader {}

    #[test]
    fn test_deferred_deletion_during_update() {
        let mut scene = Scene::new();
        scene.add_engine(Stripper);
        scene.add_engine(Reader::default());
        scene.start();
        let o = scene.spawn("o");
        scene.add_component(o, A(3));

        scene.update();
        assert_eq!(
            scene.get_engine::<Reader>().map(|r| r.seen.clone()),
            Some(vec![(false, Some(3))]),
            "retired filter still dereferenceable within the tick"
        );
        assert!(scene.entities::<Reader, FilterA>().is_empty());
        assert!(scene.get_component::<A>(o).is_none());
    }

    #[test]
    fn test_get_engine_mut_reaches_engine() {
        let mut scene = Scene::new();
        scene.add_engine(Pair::default());
        if let Some(pair) = scene.get_engine_mut::<Pair>() {
            pair.a = 42;
        }
        assert_eq!(scene.get_engine::<Pair>().map(|p| p.a), Some(42));
        assert!(scene.engine_state::<Pair>().is_some_and(|s| s.is_tracking::<FilterB>()));
        assert!(scene.entities::<Watcher, FilterA>().is_empty());
    }
}
