//! The object store and its notification wiring.
//!
//! A [`World`] owns every object, the component instances attached to them,
//! and two notifier graphs:
//!
//! - the **change graph**: component → object → hub → subscribers. Every
//!   attach, activity toggle and removal raises it.
//! - the **trash graph**: object → trash hub. It reports components entering
//!   or leaving the trash so the world knows which objects need a flush.
//!
//! Objects connected to the hubs are *attached*. Subscribers (engines) hang
//! off the change hub. A notification reaching a subscriber is recorded as a
//! [`Delivery`], in depth-first order, and handed to whoever drives the
//! subscribers through [`World::take_deliveries`]. Nothing in the world
//! calls back into engines directly, so any code holding `&mut World` can
//! mutate objects while an engine is running.
//!
//! ## Deferred deletion
//!
//! Removing a component only deactivates it and queues it in its object's
//! trash; [`World::flush_trash`] frees it later. Despawning an object only
//! detaches it; [`World::reap`] frees it later. Handles to queued instances
//! keep resolving until the flush.

use std::collections::HashMap;
use std::fmt;

use reactor_notify::{NodeId, NotifierGraph};
use slotmap::SlotMap;
use tracing::{debug, trace};

use crate::component::{Component, ComponentTypeId};
use crate::instance::{ComponentHandle, InstanceAllocator};
use crate::object::{ComponentSlot, Object, ObjectId};

/// Identifies one subscriber to the world's change hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscriber({})", self.0)
    }
}

/// A pending notification for one subscriber about one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Who should re-evaluate the object.
    pub subscriber: SubscriberId,
    /// The object that changed.
    pub object: ObjectId,
    /// `true` when the object is leaving the scene and must be dropped
    /// regardless of its components.
    pub remove: bool,
}

#[derive(Debug, Clone, Copy)]
enum TrashSink {
    CleanupQueue,
}

/// Owns objects, their components, and the notifier wiring between them.
#[derive(Debug)]
pub struct World {
    objects: SlotMap<ObjectId, Object>,
    instances: InstanceAllocator,
    changes: NotifierGraph<SubscriberId>,
    trash: NotifierGraph<TrashSink>,
    hub: NodeId,
    trash_hub: NodeId,
    subscribers: HashMap<SubscriberId, NodeId>,
    next_subscriber: u64,
    attached: Vec<ObjectId>,
    cleanup: Vec<ObjectId>,
    deliveries: Vec<Delivery>,
    doomed: Vec<ObjectId>,
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        let mut changes = NotifierGraph::new();
        let hub = changes.create();
        let mut trash = NotifierGraph::new();
        let trash_hub = trash.create_with(TrashSink::CleanupQueue);

        Self {
            objects: SlotMap::with_key(),
            instances: InstanceAllocator::new(),
            changes,
            trash,
            hub,
            trash_hub,
            subscribers: HashMap::new(),
            next_subscriber: 1,
            attached: Vec::new(),
            cleanup: Vec::new(),
            deliveries: Vec::new(),
            doomed: Vec::new(),
        }
    }

    // ── Objects ──────────────────────────────────────────────────────────

    /// Create a detached object with no components.
    pub fn create_object(&mut self, name: impl Into<String>) -> ObjectId {
        let name = name.into();
        let node = self.changes.create();
        let trash_node = self.trash.create();
        self.objects
            .insert_with_key(|id| Object::new(id, name, node, trash_node))
    }

    /// Returns an object by id.
    #[must_use]
    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    /// Returns an object mutably, for renaming or editing component data.
    #[must_use]
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id)
    }

    /// Returns `true` if the object exists (attached or not).
    #[must_use]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Returns the number of live objects, attached or not.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Iterate over every live object.
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    /// Attached objects, in attachment order.
    #[must_use]
    pub fn attached(&self) -> &[ObjectId] {
        &self.attached
    }

    /// Returns `true` if the object is connected to the hubs.
    #[must_use]
    pub fn is_attached(&self, id: ObjectId) -> bool {
        self.attached.contains(&id)
    }

    /// Connect an object to the hubs and queue a delivery for every
    /// subscriber.
    ///
    /// Returns `false` for unknown, already attached, or despawned objects.
    pub fn attach_object(&mut self, id: ObjectId) -> bool {
        if self.is_attached(id) || self.doomed.contains(&id) {
            return false;
        }
        let Some(object) = self.objects.get(id) else {
            return false;
        };
        let (node, trash_node) = (object.node(), object.trash_node());
        let trashed = object.trash_len();

        self.changes.connect(node, self.hub);
        self.trash.connect(trash_node, self.trash_hub);
        self.attached.push(id);

        // Removals requested while detached never reached the trash hub.
        let queued = self.cleanup.iter().filter(|&&o| o == id).count();
        for _ in queued..trashed {
            self.cleanup.push(id);
        }
        debug!(object = ?id, name = %object.name, "object attached");

        self.deliver_from_hub(id, false);
        true
    }

    /// Queue a removal delivery for every subscriber and disconnect the
    /// object from the hubs.
    ///
    /// The object and its components stay allocated. Returns `false` if the
    /// object was not attached.
    pub fn detach_object(&mut self, id: ObjectId) -> bool {
        let Some(pos) = self.attached.iter().position(|&o| o == id) else {
            return false;
        };
        self.deliver_from_hub(id, true);
        self.attached.remove(pos);

        if let Some(object) = self.objects.get(id) {
            self.changes.disconnect(object.node(), self.hub);
            self.trash.disconnect(object.trash_node(), self.trash_hub);
            debug!(object = ?id, name = %object.name, "object detached");
        }
        true
    }

    /// Detach an object and schedule it for destruction at the next
    /// [`World::reap`].
    ///
    /// Returns `false` if the object does not exist or is already doomed.
    pub fn despawn(&mut self, id: ObjectId) -> bool {
        if !self.objects.contains_key(id) || self.doomed.contains(&id) {
            return false;
        }
        self.detach_object(id);
        self.doomed.push(id);
        true
    }

    /// Returns `true` if the object is waiting for [`World::reap`].
    #[must_use]
    pub fn is_doomed(&self, id: ObjectId) -> bool {
        self.doomed.contains(&id)
    }

    /// Physically destroy every despawned object, running its destroy hook
    /// and then that of each remaining component. Returns how many objects
    /// were freed.
    pub fn reap(&mut self) -> usize {
        let doomed = std::mem::take(&mut self.doomed);
        doomed
            .into_iter()
            .filter(|&id| self.destroy_now(id))
            .count()
    }

    fn destroy_now(&mut self, id: ObjectId) -> bool {
        let Some(object) = self.objects.remove(id) else {
            return false;
        };
        for node in object.component_nodes() {
            self.changes.destroy(node);
        }
        self.changes.destroy(object.node());
        self.trash.destroy(object.trash_node());
        self.cleanup.retain(|&o| o != id);
        self.attached.retain(|&o| o != id);

        debug!(
            object = ?id,
            name = %object.name,
            components = object.component_count(),
            "object destroyed"
        );
        drop(object);
        true
    }

    // ── Components ───────────────────────────────────────────────────────

    /// Attach a component of type `C` to an object.
    ///
    /// - No `C` stored: stores `value`, wires its notifier to the object's,
    ///   and raises the object's change notification.
    /// - An active `C` stored: nothing happens; `value` is discarded.
    /// - An inactive `C` stored: reactivates it (raising a change), and if it
    ///   was queued in the trash, cancels the pending removal; `value` is
    ///   discarded and the original instance kept.
    ///
    /// Returns the stored instance, or `None` if the object does not exist.
    pub fn add_component<C: Component>(&mut self, id: ObjectId, value: C) -> Option<&mut C> {
        let type_id = C::component_type_id();
        let object = self.objects.get_mut(id)?;

        match object.slot(type_id).map(|slot| slot.active) {
            Some(true) => {}
            Some(false) => {
                self.reactivate(id, type_id);
            }
            None => {
                let node = self.changes.create();
                self.changes.connect(node, object.node());
                let instance = self.instances.allocate();
                object.insert(type_id, ComponentSlot::new(instance, node, value));
                let object_node = object.node();

                trace!(object = ?id, component = C::type_name(), %instance, "component attached");
                self.notify_changed(id, object_node);
            }
        }

        self.objects.get_mut(id)?.get_mut::<C>()
    }

    /// Returns the stored `C`, active or not.
    #[must_use]
    pub fn get_component<C: Component>(&self, id: ObjectId) -> Option<&C> {
        self.objects.get(id)?.get::<C>()
    }

    /// Returns the stored `C` mutably. Editing data does not notify.
    #[must_use]
    pub fn get_component_mut<C: Component>(&mut self, id: ObjectId) -> Option<&mut C> {
        self.objects.get_mut(id)?.get_mut::<C>()
    }

    /// Request removal of the stored `C`.
    ///
    /// Queues it in the trash (raising the trash notification), then
    /// deactivates it (raising a change). The instance stays allocated until
    /// the object's trash is flushed. Returns `false` if no `C` is stored; a
    /// `C` already queued returns `true` without notifying again.
    pub fn remove_component<C: Component>(&mut self, id: ObjectId) -> bool {
        let type_id = C::component_type_id();
        let Some(object) = self.objects.get_mut(id) else {
            return false;
        };
        if object.slot(type_id).is_none() {
            return false;
        }
        if !object.queue_trash(type_id) {
            return true;
        }
        let trash_node = object.trash_node();

        trace!(object = ?id, component = C::type_name(), "component queued for removal");
        self.notify_trash(id, trash_node, true);
        self.set_active_raw(id, type_id, false);
        true
    }

    /// Set the active flag of the stored `C` and raise a change.
    ///
    /// The notification is raised even when the flag does not change.
    /// Activating a component waiting in the trash cancels its removal, the
    /// same as [`World::add_component`]. Returns `false` if no `C` is stored.
    pub fn set_component_active<C: Component>(&mut self, id: ObjectId, active: bool) -> bool {
        let type_id = C::component_type_id();
        let Some(object) = self.objects.get(id) else {
            return false;
        };
        if object.slot(type_id).is_none() {
            return false;
        }
        if active {
            self.reactivate(id, type_id);
        } else {
            self.set_active_raw(id, type_id, false);
        }
        true
    }

    /// Returns the active flag of the stored `C`, or `None` if absent.
    #[must_use]
    pub fn is_component_active<C: Component>(&self, id: ObjectId) -> Option<bool> {
        self.objects.get(id)?.is_active::<C>()
    }

    /// A handle to the instance of `C` currently stored on an object.
    #[must_use]
    pub fn handle<C: Component>(&self, id: ObjectId) -> Option<ComponentHandle<C>> {
        let instance = self
            .objects
            .get(id)?
            .instance_of(C::component_type_id())?;
        Some(ComponentHandle::new(id, instance))
    }

    /// Read the instance a handle names, if it is still allocated.
    #[must_use]
    pub fn resolve<C: Component>(&self, handle: ComponentHandle<C>) -> Option<&C> {
        let slot = self
            .objects
            .get(handle.object())?
            .slot(C::component_type_id())?;
        if slot.instance != handle.instance() {
            return None;
        }
        slot.value.as_any().downcast_ref()
    }

    /// Write the instance a handle names, if it is still allocated.
    #[must_use]
    pub fn resolve_mut<C: Component>(&mut self, handle: ComponentHandle<C>) -> Option<&mut C> {
        let slot = self
            .objects
            .get_mut(handle.object())?
            .slot_mut(C::component_type_id())?;
        if slot.instance != handle.instance() {
            return None;
        }
        slot.value.as_any_mut().downcast_mut()
    }

    fn reactivate(&mut self, id: ObjectId, type_id: ComponentTypeId) {
        self.set_active_raw(id, type_id, true);

        let Some(object) = self.objects.get_mut(id) else {
            return;
        };
        if object.cancel_trash(type_id) {
            let trash_node = object.trash_node();
            trace!(object = ?id, component = %type_id, "pending removal cancelled");
            self.notify_trash(id, trash_node, false);
        }
    }

    fn set_active_raw(&mut self, id: ObjectId, type_id: ComponentTypeId, active: bool) {
        let Some(slot) = self
            .objects
            .get_mut(id)
            .and_then(|object| object.slot_mut(type_id))
        else {
            return;
        };
        slot.active = active;
        let node = slot.node;
        self.notify_changed(id, node);
    }

    // ── Trash ────────────────────────────────────────────────────────────

    /// Physically free every trashed component of one object.
    ///
    /// Returns how many instances were freed.
    pub fn clean_trash(&mut self, id: ObjectId) -> usize {
        let Some(object) = self.objects.get_mut(id) else {
            return 0;
        };
        let freed = object.drain_trash();
        for slot in &freed {
            self.changes.destroy(slot.node);
        }
        if !freed.is_empty() {
            trace!(object = ?id, freed = freed.len(), "object trash cleaned");
        }
        freed.len()
    }

    /// Objects with pending removals, one entry per removal request.
    #[must_use]
    pub fn pending_cleanup(&self) -> &[ObjectId] {
        &self.cleanup
    }

    /// Clean the trash of every object reported through the trash hub.
    ///
    /// Returns how many instances were freed.
    pub fn flush_trash(&mut self) -> usize {
        let cleanup = std::mem::take(&mut self.cleanup);
        cleanup.into_iter().map(|id| self.clean_trash(id)).sum()
    }

    // ── Subscribers ──────────────────────────────────────────────────────

    /// Register a subscriber on the change hub.
    pub fn subscribe(&mut self) -> SubscriberId {
        let subscriber = SubscriberId(self.next_subscriber);
        self.next_subscriber += 1;

        let node = self.changes.create_with(subscriber);
        self.changes.connect(self.hub, node);
        self.subscribers.insert(subscriber, node);
        subscriber
    }

    /// Remove a subscriber and drop its pending deliveries.
    pub fn unsubscribe(&mut self, subscriber: SubscriberId) -> bool {
        let Some(node) = self.subscribers.remove(&subscriber) else {
            return false;
        };
        self.changes.destroy(node);
        self.deliveries.retain(|d| d.subscriber != subscriber);
        true
    }

    /// Returns the number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Take every queued delivery, oldest first.
    pub fn take_deliveries(&mut self) -> Vec<Delivery> {
        std::mem::take(&mut self.deliveries)
    }

    /// Returns `true` if deliveries are waiting.
    #[must_use]
    pub fn has_deliveries(&self) -> bool {
        !self.deliveries.is_empty()
    }

    // ── Notification ─────────────────────────────────────────────────────

    fn notify_changed(&mut self, object: ObjectId, from: NodeId) {
        let deliveries = &mut self.deliveries;
        self.changes.notify(from, |_, &mut subscriber| {
            deliveries.push(Delivery {
                subscriber,
                object,
                remove: false,
            });
        });
    }

    fn deliver_from_hub(&mut self, object: ObjectId, remove: bool) {
        let deliveries = &mut self.deliveries;
        self.changes.notify(self.hub, |_, &mut subscriber| {
            deliveries.push(Delivery {
                subscriber,
                object,
                remove,
            });
        });
    }

    fn notify_trash(&mut self, object: ObjectId, from: NodeId, removed: bool) {
        let cleanup = &mut self.cleanup;
        self.trash.notify(from, |_, sink| match sink {
            TrashSink::CleanupQueue => {
                if removed {
                    cleanup.push(object);
                } else if let Some(pos) = cleanup.iter().position(|&o| o == object) {
                    cleanup.remove(pos);
                }
            }
        });
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
