//! Objects and their per-type component table.
//!
//! An [`Object`] holds at most one component instance per component type,
//! a pending-deletion list ("trash") of component types, and two notifier
//! nodes: one raised on every change, one raised on trash transitions.
//!
//! Objects are created and owned by a [`World`](crate::World). Reads are
//! available directly on the object; anything that must notify (attaching,
//! removing, toggling activity, flushing the trash) goes through the world.

use std::collections::BTreeMap;

use reactor_notify::NodeId;
use slotmap::new_key_type;

use crate::component::{AnyComponent, Component, ComponentTypeId};
use crate::instance::InstanceId;

new_key_type! {
    /// A stable, generational handle to an object in a [`World`](crate::World).
    pub struct ObjectId;
}

/// One stored component instance.
///
/// Dropping the slot is the physical free: it runs the component's
/// `on_destroy` hook first.
pub(crate) struct ComponentSlot {
    pub(crate) instance: InstanceId,
    pub(crate) active: bool,
    pub(crate) node: NodeId,
    pub(crate) value: Box<dyn AnyComponent>,
}

impl ComponentSlot {
    pub(crate) fn new<C: Component>(instance: InstanceId, node: NodeId, value: C) -> Self {
        Self {
            instance,
            active: true,
            node,
            value: Box::new(value),
        }
    }
}

impl Drop for ComponentSlot {
    fn drop(&mut self) {
        self.value.destroy();
    }
}

impl std::fmt::Debug for ComponentSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentSlot")
            .field("type", &self.value.name())
            .field("instance", &self.instance)
            .field("active", &self.active)
            .finish()
    }
}

type DestroyHook = Box<dyn FnOnce(&mut Object)>;

/// A container identity defined by the components attached to it.
///
/// Dropping an object runs its destroy hook, then frees every stored
/// component, trashed or not.
pub struct Object {
    /// A free-form label, used for diagnostics only.
    pub name: String,
    id: ObjectId,
    components: BTreeMap<ComponentTypeId, ComponentSlot>,
    trash: Vec<ComponentTypeId>,
    node: NodeId,
    trash_node: NodeId,
    on_destroy: Option<DestroyHook>,
}

impl Object {
    pub(crate) fn new(id: ObjectId, name: String, node: NodeId, trash_node: NodeId) -> Self {
        Self {
            name,
            id,
            components: BTreeMap::new(),
            trash: Vec::new(),
            node,
            trash_node,
            on_destroy: None,
        }
    }

    /// Run `hook` when the object is destroyed, before its components are
    /// freed. Replaces any previous hook.
    pub fn on_destroy(&mut self, hook: impl FnOnce(&mut Object) + 'static) {
        self.on_destroy = Some(Box::new(hook));
    }

    /// The object's handle in its world.
    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The notifier raised whenever the object's composition changes.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The notifier raised when a component enters or leaves the trash.
    #[must_use]
    pub fn trash_node(&self) -> NodeId {
        self.trash_node
    }

    /// Returns the stored component of type `C`, active or not.
    #[must_use]
    pub fn get<C: Component>(&self) -> Option<&C> {
        self.components
            .get(&C::component_type_id())?
            .value
            .as_any()
            .downcast_ref()
    }

    /// Returns the stored component of type `C` mutably.
    ///
    /// Mutating component data does not notify anyone.
    #[must_use]
    pub fn get_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.components
            .get_mut(&C::component_type_id())?
            .value
            .as_any_mut()
            .downcast_mut()
    }

    /// Returns `true` if an instance of `C` is stored, active or not.
    #[must_use]
    pub fn has<C: Component>(&self) -> bool {
        self.components.contains_key(&C::component_type_id())
    }

    /// Returns the active flag of the stored `C`, or `None` if absent.
    #[must_use]
    pub fn is_active<C: Component>(&self) -> Option<bool> {
        self.components
            .get(&C::component_type_id())
            .map(|slot| slot.active)
    }

    /// Returns `true` if a component of the given type is present and active.
    #[must_use]
    pub fn is_type_active(&self, type_id: ComponentTypeId) -> bool {
        self.components.get(&type_id).is_some_and(|slot| slot.active)
    }

    /// Returns the instance currently stored for a component type.
    #[must_use]
    pub fn instance_of(&self, type_id: ComponentTypeId) -> Option<InstanceId> {
        self.components.get(&type_id).map(|slot| slot.instance)
    }

    /// Returns `true` if `C` is queued for physical removal.
    #[must_use]
    pub fn is_trashed<C: Component>(&self) -> bool {
        self.trash.contains(&C::component_type_id())
    }

    /// Number of component types queued for physical removal.
    #[must_use]
    pub fn trash_len(&self) -> usize {
        self.trash.len()
    }

    /// Number of stored components, including inactive ones.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// The stored component types in ascending id order.
    pub fn component_types(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.components.keys().copied()
    }

    pub(crate) fn slot(&self, type_id: ComponentTypeId) -> Option<&ComponentSlot> {
        self.components.get(&type_id)
    }

    pub(crate) fn slot_mut(&mut self, type_id: ComponentTypeId) -> Option<&mut ComponentSlot> {
        self.components.get_mut(&type_id)
    }

    pub(crate) fn insert(&mut self, type_id: ComponentTypeId, slot: ComponentSlot) {
        self.components.insert(type_id, slot);
    }

    /// Queue a type in the trash. Returns `false` if it already was.
    pub(crate) fn queue_trash(&mut self, type_id: ComponentTypeId) -> bool {
        if self.trash.contains(&type_id) {
            return false;
        }
        self.trash.push(type_id);
        true
    }

    /// Take a type back out of the trash. Returns `false` if it was not queued.
    pub(crate) fn cancel_trash(&mut self, type_id: ComponentTypeId) -> bool {
        let Some(pos) = self.trash.iter().position(|&t| t == type_id) else {
            return false;
        };
        self.trash.remove(pos);
        true
    }

    /// Unlink every trashed component that is still stored and clear the
    /// trash. The caller decides when the returned slots are dropped.
    pub(crate) fn drain_trash(&mut self) -> Vec<ComponentSlot> {
        let trash = std::mem::take(&mut self.trash);
        trash
            .into_iter()
            .filter_map(|type_id| self.components.remove(&type_id))
            .collect()
    }

    /// Notifier nodes of every stored component.
    pub(crate) fn component_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.components.values().map(|slot| slot.node)
    }
}

impl Drop for Object {
    fn drop(&mut self) {
        if let Some(hook) = self.on_destroy.take() {
            hook(self);
        }
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("components", &self.components)
            .field("trash", &self.trash)
            .field("on_destroy", &self.on_destroy.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use reactor_notify::NotifierGraph;
    use slotmap::SlotMap;

    use super::*;

    #[derive(Debug, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    struct Tracked(Rc<Cell<u32>>);
    impl Component for Tracked {
        fn on_destroy(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn make_object() -> (Object, NotifierGraph<()>) {
        let mut graph = NotifierGraph::new();
        let mut ids: SlotMap<ObjectId, ()> = SlotMap::with_key();
        let id = ids.insert(());
        let object = Object::new(id, "test".into(), graph.create(), graph.create());
        (object, graph)
    }

    #[test]
    fn test_get_and_has() {
        let (mut object, mut graph) = make_object();
        assert!(!object.has::<Health>());
        assert!(object.get::<Health>().is_none());

        let slot = ComponentSlot::new(InstanceId(1), graph.create(), Health(10));
        object.insert(Health::component_type_id(), slot);

        assert!(object.has::<Health>());
        assert_eq!(object.get::<Health>(), Some(&Health(10)));
        assert_eq!(object.is_active::<Health>(), Some(true));
        assert_eq!(object.instance_of(Health::component_type_id()), Some(InstanceId(1)));

        if let Some(health) = object.get_mut::<Health>() {
            health.0 = 3;
        }
        assert_eq!(object.get::<Health>(), Some(&Health(3)));
    }

    #[test]
    fn test_trash_queue_is_deduplicated() {
        let (mut object, _graph) = make_object();
        let ty = Health::component_type_id();
        assert!(object.queue_trash(ty));
        assert!(!object.queue_trash(ty));
        assert_eq!(object.trash_len(), 1);
        assert!(object.cancel_trash(ty));
        assert!(!object.cancel_trash(ty));
        assert_eq!(object.trash_len(), 0);
    }

    #[test]
    fn test_drain_trash_frees_only_trashed_entries() {
        let (mut object, mut graph) = make_object();
        let destroyed = Rc::new(Cell::new(0));

        object.insert(
            Tracked::component_type_id(),
            ComponentSlot::new(InstanceId(1), graph.create(), Tracked(Rc::clone(&destroyed))),
        );
        object.insert(
            Health::component_type_id(),
            ComponentSlot::new(InstanceId(2), graph.create(), Health(1)),
        );

        object.queue_trash(Tracked::component_type_id());
        let freed = object.drain_trash();
        assert_eq!(freed.len(), 1);
        assert_eq!(destroyed.get(), 0, "not freed until the slot is dropped");
        drop(freed);
        assert_eq!(destroyed.get(), 1);

        assert!(!object.has::<Tracked>());
        assert!(object.has::<Health>());
        assert_eq!(object.trash_len(), 0);
    }

    #[test]
    fn test_dropping_object_destroys_components() {
        let (mut object, mut graph) = make_object();
        let destroyed = Rc::new(Cell::new(0));
        object.insert(
            Tracked::component_type_id(),
            ComponentSlot::new(InstanceId(1), graph.create(), Tracked(Rc::clone(&destroyed))),
        );
        drop(object);
        assert_eq!(destroyed.get(), 1);
    }

    #[test]
    fn test_destroy_hook_runs_once_with_components_present() {
        let (mut object, mut graph) = make_object();
        let destroyed = Rc::new(Cell::new(0));
        let calls = Rc::new(Cell::new(0));
        object.insert(
            Tracked::component_type_id(),
            ComponentSlot::new(InstanceId(1), graph.create(), Tracked(Rc::clone(&destroyed))),
        );

        let hook_destroyed = Rc::clone(&destroyed);
        let hook_calls = Rc::clone(&calls);
        object.on_destroy(move |object| {
            assert!(object.has::<Tracked>());
            assert_eq!(hook_destroyed.get(), 0);
            hook_calls.set(hook_calls.get() + 1);
        });
        drop(object);
        assert_eq!(calls.get(), 1);
        assert_eq!(destroyed.get(), 1);
    }
}
