//! Per-call context handed to engine lifecycle hooks.

use reactor_component::{Filter, Requirement, World};

use crate::membership::{AnyMembership, Membership};

/// Read-only view of an engine's memberships.
///
/// The view is `Copy` and its slices outlive any borrow of the context, so
/// hooks can iterate their entities while writing through
/// [`EngineContext::world`].
#[derive(Clone, Copy)]
pub struct Entities<'a> {
    memberships: &'a [Box<dyn AnyMembership>],
}

impl<'a> Entities<'a> {
    pub(crate) fn new(memberships: &'a [Box<dyn AnyMembership>]) -> Self {
        Self { memberships }
    }

    /// The membership tracking requirement `R`, if the engine declared it.
    #[must_use]
    pub fn membership<R: Requirement>(self) -> Option<&'a Membership<R>> {
        self.memberships
            .iter()
            .find_map(|m| m.as_any().downcast_ref::<Membership<R>>())
    }

    /// Every filter of requirement `R`, retiring ones included until the
    /// next clean. Empty if `R` is not tracked.
    #[must_use]
    pub fn get<R: Requirement>(self) -> &'a [Filter<R>] {
        self.membership::<R>()
            .map(Membership::filters)
            .unwrap_or_default()
    }

    /// Active filters of requirement `R` only.
    pub fn active<R: Requirement>(self) -> impl Iterator<Item = &'a Filter<R>> {
        self.get::<R>().iter().filter(|filter| filter.active())
    }
}

impl std::fmt::Debug for Entities<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.memberships.iter().map(|m| m.requirement_name()))
            .finish()
    }
}

/// Context provided to an engine's `on_start`, `on_update` and `on_destroy`.
#[derive(Debug)]
pub struct EngineContext<'a> {
    /// The scene's current tick counter.
    pub tick_id: u64,
    /// Delta time for this call, in seconds. Zero outside of updates.
    pub dt: f64,
    /// The engine's tracked filters.
    pub entities: Entities<'a>,
    /// Mutable access to objects and components. Notifications raised here
    /// are delivered once the hook returns.
    pub world: &'a mut World,
}

impl<'a> EngineContext<'a> {
    /// Create a new context for one hook call.
    #[must_use]
    pub fn new(tick_id: u64, dt: f64, entities: Entities<'a>, world: &'a mut World) -> Self {
        Self {
            tick_id,
            dt,
            entities,
            world,
        }
    }
}
