//! # reactor_scene
//!
//! The orchestration layer: a [`Scene`] owns the world and every engine,
//! routes change notifications from objects to engines, and drives the
//! start/update/cleanup phases. A [`TickLoop`] runs a scene at a fixed rate.
//!
//! This crate provides:
//!
//! - [`Scene`] — objects, engines, and the update cycle.
//! - [`EngineRegistry`] — engines in registration order, one per type.
//! - [`TickConfig`] / [`TickLoop`] — fixed-timestep driver.
//! - [`TickError`] — tick configuration errors.

pub mod error;
pub mod registry;
pub mod scene;
pub mod tick;

pub use error::TickError;
pub use registry::{EngineRegistry, RegisteredEngine};
pub use scene::{DEFAULT_STEP, Scene};
pub use tick::{TickConfig, TickLoop};
