//! # reactor_engine
//!
//! Engines are behaviors that track, per declared requirement, the objects
//! whose current composition satisfies it.
//!
//! This crate provides:
//!
//! - [`Engine`] — lifecycle hooks and the requirement declaration.
//! - [`Tracks`] — the coming/added/removed hooks for one requirement.
//! - [`Requirements`] — the builder an engine declares its requirements on.
//! - [`Membership`] — the live filters and retirement queue of one
//!   requirement, and the reconciliation state machine.
//! - [`EngineState`] — an engine bundled with its memberships.
//! - [`EngineContext`] / [`Entities`] — what lifecycle hooks receive.
//! - [`AnyEngine`] — the type-erased view a scene stores.
//!
//! ## Usage
//!
//! ```rust
//! use reactor_component::{Component, Filter, Requirement, World};
//! use reactor_engine::{Engine, EngineContext, EngineState, Requirements, Tracks};
//!
//! struct Health(u32);
//! impl Component for Health {}
//!
//! struct Living;
//! impl Requirement for Living {
//!     type Components = (Health,);
//! }
//!
//! #[derive(Default)]
//! struct Regen;
//!
//! impl Engine for Regen {
//!     fn requirements(reqs: &mut Requirements<Self>) {
//!         reqs.track::<Living>();
//!     }
//!
//!     fn on_update(&mut self, ctx: &mut EngineContext<'_>) {
//!         for filter in ctx.entities.get::<Living>() {
//!             if let Some(health) = filter.get_mut::<Health>(ctx.world) {
//!                 health.0 += 1;
//!             }
//!         }
//!     }
//! }
//!
//! impl Tracks<Living> for Regen {}
//!
//! let mut world = World::new();
//! let mut state = EngineState::new(Regen);
//! let id = world.create_object("hero");
//! world.attach_object(id);
//! let _ = world.add_component(id, Health(1));
//! state.update_object(id, false, &mut world);
//! assert_eq!(state.entities::<Living>().len(), 1);
//! ```

pub mod context;
pub mod engine;
pub mod membership;
pub mod state;

pub use context::{EngineContext, Entities};
pub use engine::{Engine, Requirements, Tracks};
pub use membership::{AnyMembership, Membership, Transition};
pub use state::{AnyEngine, EngineState};
