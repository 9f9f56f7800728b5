//! # reactor_component
//!
//! Objects, the components attached to them, and the filters engines build
//! over them.
//!
//! This crate provides:
//!
//! - [`Component`] trait — the contract all per-object data must satisfy.
//! - [`ComponentTypeId`] — stable FNV-1a type identity used as a map key.
//! - [`InstanceId`] / [`ComponentHandle`] — identity of one stored instance.
//! - [`Object`] — at most one component per type, plus a removal trash.
//! - [`Requirement`] / [`Filter`] — declared component sets and the
//!   per-object snapshots generated from them.
//! - [`World`] — owns every object and the notifier wiring that turns
//!   component changes into [`Delivery`] records for subscribers.

pub mod component;
pub mod filter;
pub mod instance;
pub mod object;
pub mod world;

pub use component::{Component, ComponentTypeId};
pub use filter::{ComponentSet, Filter, Requirement};
pub use instance::{ComponentHandle, InstanceAllocator, InstanceId};
pub use object::{Object, ObjectId};
pub use world::{Delivery, SubscriberId, World};
