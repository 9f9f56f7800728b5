//! Engine registry: the engines added to a scene, in insertion order.
//!
//! Each engine type is registered at most once. Entries also remember the
//! subscriber id their engine listens on so deliveries can be routed back.

use std::any::TypeId;

use reactor_component::SubscriberId;
use reactor_engine::{AnyEngine, Engine, EngineState};

/// A registered engine.
pub struct RegisteredEngine {
    /// Identity of the engine type.
    pub type_id: TypeId,
    /// The engine's name, for logs.
    pub name: &'static str,
    /// The hub subscription this engine receives deliveries on.
    pub subscriber: SubscriberId,
    /// The engine and its memberships.
    pub state: Box<dyn AnyEngine>,
}

impl RegisteredEngine {
    /// Wrap an engine state for registration.
    #[must_use]
    pub fn new<E: Engine>(state: EngineState<E>, subscriber: SubscriberId) -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            name: E::name(),
            subscriber,
            state: Box::new(state),
        }
    }

    /// The concrete state, if this entry holds engine `E`.
    #[must_use]
    pub fn downcast<E: Engine>(&self) -> Option<&EngineState<E>> {
        self.state.as_any().downcast_ref()
    }

    /// The concrete state mutably, if this entry holds engine `E`.
    #[must_use]
    pub fn downcast_mut<E: Engine>(&mut self) -> Option<&mut EngineState<E>> {
        self.state.as_any_mut().downcast_mut()
    }
}

impl std::fmt::Debug for RegisteredEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredEngine")
            .field("name", &self.name)
            .field("subscriber", &self.subscriber)
            .finish_non_exhaustive()
    }
}

/// Registry of all engines known to a scene.
#[derive(Debug, Default)]
pub struct EngineRegistry {
    engines: Vec<RegisteredEngine>,
}

impl EngineRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            engines: Vec::new(),
        }
    }

    /// Register an engine. If an engine of the same type is already
    /// registered the entry is handed back untouched.
    pub fn register(&mut self, entry: RegisteredEngine) -> Result<(), RegisteredEngine> {
        if self.contains_type(entry.type_id) {
            return Err(entry);
        }
        self.engines.push(entry);
        Ok(())
    }

    /// Remove the engine of type `E`, keeping the order of the others.
    pub fn unregister<E: Engine>(&mut self) -> Option<RegisteredEngine> {
        let pos = self.position(TypeId::of::<E>())?;
        Some(self.engines.remove(pos))
    }

    /// Returns `true` if an engine of type `E` is registered.
    #[must_use]
    pub fn contains<E: Engine>(&self) -> bool {
        self.contains_type(TypeId::of::<E>())
    }

    fn contains_type(&self, type_id: TypeId) -> bool {
        self.position(type_id).is_some()
    }

    fn position(&self, type_id: TypeId) -> Option<usize> {
        self.engines.iter().position(|e| e.type_id == type_id)
    }

    /// Returns the entry for engine `E`.
    #[must_use]
    pub fn get<E: Engine>(&self) -> Option<&RegisteredEngine> {
        self.engines.get(self.position(TypeId::of::<E>())?)
    }

    /// Returns the entry for engine `E` mutably.
    #[must_use]
    pub fn get_mut<E: Engine>(&mut self) -> Option<&mut RegisteredEngine> {
        let pos = self.position(TypeId::of::<E>())?;
        self.engines.get_mut(pos)
    }

    /// Returns the entry at a registration index.
    #[must_use]
    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut RegisteredEngine> {
        self.engines.get_mut(index)
    }

    /// Returns the entry listening on `subscriber`.
    #[must_use]
    pub fn by_subscriber_mut(&mut self, subscriber: SubscriberId) -> Option<&mut RegisteredEngine> {
        self.engines.iter_mut().find(|e| e.subscriber == subscriber)
    }

    /// Returns an iterator over all engines in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredEngine> {
        self.engines.iter()
    }

    /// Returns a mutable iterator over all engines in registration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RegisteredEngine> {
        self.engines.iter_mut()
    }

    /// Returns the number of registered engines.
    #[must_use]
    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    /// Remove every engine, in registration order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, RegisteredEngine> {
        self.engines.drain(..)
    }
}
