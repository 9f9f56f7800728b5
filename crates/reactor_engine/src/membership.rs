//! Per-requirement membership and the reconciliation state machine.
//!
//! For every (requirement, object) pair a membership walks
//! **absent → active → retiring → absent**:
//!
//! - absent → active: the object is attached, passes the filter, and has no
//!   active filter yet. A filter is generated and offered to the coming hook;
//!   a veto discards it and the pair stays absent.
//! - active → retiring: the object is leaving, or stopped passing. The filter
//!   is deactivated, queued for retirement, and the removed hook fires right
//!   away.
//! - retiring → absent: only in [`Membership::clean_trash`].

use std::any::Any;
use std::collections::HashMap;

use reactor_component::{Filter, ObjectId, Requirement, World};
use tracing::trace;

use crate::engine::Tracks;

/// The outcome of reconciling one object against one requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A filter was generated and accepted.
    Added,
    /// A filter was generated and rejected by the coming hook.
    Vetoed,
    /// The active filter was retired.
    Removed,
    /// Nothing changed.
    Unchanged,
}

/// The filters an engine holds for one requirement.
pub struct Membership<R> {
    filters: Vec<Filter<R>>,
    active: HashMap<ObjectId, usize>,
    trash: Vec<usize>,
}

impl<R: Requirement> Membership<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            active: HashMap::new(),
            trash: Vec::new(),
        }
    }

    /// Every filter, retiring ones included until the next clean.
    #[must_use]
    pub fn filters(&self) -> &[Filter<R>] {
        &self.filters
    }

    /// The active filter for `object`, if any.
    #[must_use]
    pub fn filter_of(&self, object: ObjectId) -> Option<&Filter<R>> {
        self.filters.get(*self.active.get(&object)?)
    }

    /// Returns `true` if `object` currently has an active filter.
    #[must_use]
    pub fn contains(&self, object: ObjectId) -> bool {
        self.active.contains_key(&object)
    }

    /// Number of active filters.
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Number of filters waiting for [`Membership::clean_trash`].
    #[must_use]
    pub fn retiring_len(&self) -> usize {
        self.trash.len()
    }

    /// Re-test `object` and move its state for this requirement, firing the
    /// engine's hooks on the way.
    ///
    /// With `remove` set the object is treated as leaving regardless of its
    /// components. Detached objects are always treated as leaving.
    pub fn reconcile<E: Tracks<R>>(
        &mut self,
        engine: &mut E,
        object: ObjectId,
        remove: bool,
        world: &mut World,
    ) -> Transition {
        let qualifies = !remove
            && world.is_attached(object)
            && world.object(object).is_some_and(Filter::<R>::pass_filter);

        match (self.active.get(&object).copied(), qualifies) {
            (None, true) => self.admit(engine, object, world),
            (Some(index), false) => self.retire(engine, index, object, world),
            _ => Transition::Unchanged,
        }
    }

    fn admit<E: Tracks<R>>(&mut self, engine: &mut E, object: ObjectId, world: &mut World) -> Transition {
        let Some(filter) = world.object(object).map(Filter::<R>::make_filter) else {
            return Transition::Unchanged;
        };
        if !engine.on_object_coming(&filter, world) {
            trace!(requirement = R::name(), ?object, "object vetoed");
            return Transition::Vetoed;
        }

        let index = self.filters.len();
        self.filters.push(filter);
        self.active.insert(object, index);
        trace!(requirement = R::name(), ?object, "object added");

        if let Some(filter) = self.filters.get(index) {
            engine.on_object_added(filter, world);
        }
        Transition::Added
    }

    fn retire<E: Tracks<R>>(
        &mut self,
        engine: &mut E,
        index: usize,
        object: ObjectId,
        world: &mut World,
    ) -> Transition {
        self.active.remove(&object);
        let Some(filter) = self.filters.get_mut(index) else {
            return Transition::Unchanged;
        };
        filter.set_active(false);
        self.trash.push(index);
        trace!(requirement = R::name(), ?object, "object removed");

        engine.on_object_removed(filter, world);
        Transition::Removed
    }

    /// Free every retired filter and compact the live collection.
    ///
    /// Returns how many filters were freed.
    pub fn clean_trash(&mut self) -> usize {
        if self.trash.is_empty() {
            return 0;
        }
        let freed = self.trash.len();
        self.trash.clear();
        self.filters.retain(Filter::active);
        self.active = self
            .filters
            .iter()
            .enumerate()
            .map(|(index, filter)| (filter.object(), index))
            .collect();
        freed
    }
}

impl<R: Requirement> Default for Membership<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> std::fmt::Debug for Membership<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Membership")
            .field("requirement", &std::any::type_name::<R>())
            .field("filters", &self.filters.len())
            .field("active", &self.active.len())
            .field("retiring", &self.trash.len())
            .finish()
    }
}

/// Object-safe view of a [`Membership`], used to store one per requirement.
pub trait AnyMembership: Any {
    /// The requirement's name.
    fn requirement_name(&self) -> &'static str;
    fn clean_trash(&mut self) -> usize;
    fn active_len(&self) -> usize;
    fn retiring_len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<R: Requirement> AnyMembership for Membership<R> {
    fn requirement_name(&self) -> &'static str {
        R::name()
    }

    fn clean_trash(&mut self) -> usize {
        Membership::clean_trash(self)
    }

    fn active_len(&self) -> usize {
        Membership::active_len(self)
    }

    fn retiring_len(&self) -> usize {
        Membership::retiring_len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use reactor_component::Component;

    use super::*;
    use crate::engine::{Engine, Requirements};

    #[derive(Debug, PartialEq)]
    struct A(u32);
    impl Component for A {}

    #[derive(Debug, PartialEq)]
    struct B(u32);
    impl Component for B {}

    struct NeedsAb;
    impl Requirement for NeedsAb {
        type Components = (A, B);
    }

    #[derive(Default)]
    struct Recorder {
        veto: bool,
        events: Vec<&'static str>,
    }

    impl Engine for Recorder {
        fn requirements(reqs: &mut Requirements<Self>) {
            reqs.track::<NeedsAb>();
        }
    }

    impl Tracks<NeedsAb> for Recorder {
        fn on_object_coming(&mut self, _filter: &Filter<NeedsAb>, _world: &mut World) -> bool {
            self.events.push("coming");
            !self.veto
        }

        fn on_object_added(&mut self, _filter: &Filter<NeedsAb>, _world: &mut World) {
            self.events.push("added");
        }

        fn on_object_removed(&mut self, filter: &Filter<NeedsAb>, world: &mut World) {
            assert!(!filter.active());
            assert!(filter.get::<A>(world).is_some(), "still readable while retiring");
            self.events.push("removed");
        }
    }

    fn setup() -> (World, ObjectId) {
        let mut world = World::new();
        let id = world.create_object("o");
        world.attach_object(id);
        (world, id)
    }

    #[test]
    fn test_absent_to_active_requires_every_component() {
        let (mut world, id) = setup();
        let mut engine = Recorder::default();
        let mut membership = Membership::<NeedsAb>::new();

        let _ = world.add_component(id, A(1));
        assert_eq!(
            membership.reconcile(&mut engine, id, false, &mut world),
            Transition::Unchanged
        );

        let _ = world.add_component(id, B(2));
        assert_eq!(
            membership.reconcile(&mut engine, id, false, &mut world),
            Transition::Added
        );
        assert_eq!(engine.events, vec!["coming", "added"]);
        assert!(membership.contains(id));

        // Re-testing a member that still qualifies changes nothing.
        assert_eq!(
            membership.reconcile(&mut engine, id, false, &mut world),
            Transition::Unchanged
        );
        assert_eq!(engine.events.len(), 2);
    }

    #[test]
    fn test_retire_keeps_filter_until_clean() {
        let (mut world, id) = setup();
        let mut engine = Recorder::default();
        let mut membership = Membership::<NeedsAb>::new();
        let _ = world.add_component(id, A(1));
        let _ = world.add_component(id, B(2));
        membership.reconcile(&mut engine, id, false, &mut world);

        world.remove_component::<B>(id);
        assert_eq!(
            membership.reconcile(&mut engine, id, false, &mut world),
            Transition::Removed
        );
        assert_eq!(engine.events, vec!["coming", "added", "removed"]);
        assert_eq!(membership.filters().len(), 1);
        assert_eq!(membership.active_len(), 0);
        assert_eq!(membership.retiring_len(), 1);

        assert_eq!(membership.clean_trash(), 1);
        assert!(membership.filters().is_empty());
        assert_eq!(membership.clean_trash(), 0);
    }

    #[test]
    fn test_veto_discards_filter() {
        let (mut world, id) = setup();
        let mut engine = Recorder {
            veto: true,
            ..Recorder::default()
        };
        let mut membership = Membership::<NeedsAb>::new();
        let _ = world.add_component(id, A(1));
        let _ = world.add_component(id, B(2));

        assert_eq!(
            membership.reconcile(&mut engine, id, false, &mut world),
            Transition::Vetoed
        );
        assert!(membership.filters().is_empty());

        world.remove_component::<A>(id);
        membership.reconcile(&mut engine, id, false, &mut world);
        assert_eq!(engine.events, vec!["coming"], "no hooks for a vetoed object");
    }

    #[test]
    fn test_remove_flag_retires_qualifying_object() {
        let (mut world, id) = setup();
        let mut engine = Recorder::default();
        let mut membership = Membership::<NeedsAb>::new();
        let _ = world.add_component(id, A(1));
        let _ = world.add_component(id, B(2));
        membership.reconcile(&mut engine, id, false, &mut world);

        assert_eq!(
            membership.reconcile(&mut engine, id, true, &mut world),
            Transition::Removed
        );
        assert!(!membership.contains(id));
    }

    #[test]
    fn test_detached_objects_never_qualify() {
        let mut world = World::new();
        let id = world.create_object("detached");
        let _ = world.add_component(id, A(1));
        let _ = world.add_component(id, B(2));
        let mut engine = Recorder::default();
        let mut membership = Membership::<NeedsAb>::new();

        assert_eq!(
            membership.reconcile(&mut engine, id, false, &mut world),
            Transition::Unchanged
        );
        assert!(engine.events.is_empty());
    }

    #[test]
    fn test_requalifying_after_retire_generates_fresh_filter() {
        let (mut world, id) = setup();
        let mut engine = Recorder::default();
        let mut membership = Membership::<NeedsAb>::new();
        let _ = world.add_component(id, A(1));
        let _ = world.add_component(id, B(2));
        membership.reconcile(&mut engine, id, false, &mut world);

        world.remove_component::<B>(id);
        membership.reconcile(&mut engine, id, false, &mut world);
        let _ = world.add_component(id, B(0));
        assert_eq!(
            membership.reconcile(&mut engine, id, false, &mut world),
            Transition::Added
        );

        assert_eq!(membership.filters().len(), 2);
        assert_eq!(membership.clean_trash(), 1);
        assert_eq!(membership.filters().len(), 1);
        assert_eq!(
            membership.filter_of(id).and_then(|f| f.get::<B>(&world)),
            Some(&B(2)),
            "reactivation keeps the original instance"
        );
    }
}
