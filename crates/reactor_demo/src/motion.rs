//! Bodies that drift until their lifetime runs out.

use glam::Vec3;
use reactor_component::{Component, Filter, Requirement, World};
use reactor_engine::{Engine, EngineContext, Requirements, Tracks};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position(pub Vec3);
impl Component for Position {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity(pub Vec3);
impl Component for Velocity {}

/// Seconds left before a body stops moving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifetime {
    pub remaining: f32,
}
impl Component for Lifetime {}

/// Objects with a position and a velocity.
pub struct Moving;
impl Requirement for Moving {
    type Components = (Position, Velocity);
}

/// Objects with a lifetime.
pub struct Mortal;
impl Requirement for Mortal {
    type Components = (Lifetime,);
}

/// Integrates velocities into positions.
#[derive(Debug, Default)]
pub struct Movement {
    pub moving: usize,
    pub stopped: usize,
}

impl Engine for Movement {
    fn requirements(reqs: &mut Requirements<Self>) {
        reqs.track::<Moving>();
    }

    fn on_update(&mut self, ctx: &mut EngineContext<'_>) {
        let dt = ctx.dt as f32;
        for filter in ctx.entities.active::<Moving>() {
            let Some(Velocity(velocity)) = filter.get::<Velocity>(ctx.world).copied() else {
                continue;
            };
            if let Some(position) = filter.get_mut::<Position>(ctx.world) {
                position.0 += velocity * dt;
            }
        }
    }
}

impl Tracks<Moving> for Movement {
    fn on_object_added(&mut self, filter: &Filter<Moving>, _world: &mut World) {
        self.moving += 1;
        debug!(object = ?filter.object(), "body started moving");
    }

    fn on_object_removed(&mut self, filter: &Filter<Moving>, world: &mut World) {
        self.moving -= 1;
        self.stopped += 1;
        let name = world.object(filter.object()).map(|o| o.name.clone());
        if let Some(Position(position)) = filter.get::<Position>(world) {
            info!(body = ?name, %position, "body came to rest");
        }
    }
}

/// Counts lifetimes down and stops bodies whose time is up.
#[derive(Debug, Default)]
pub struct Expiry {
    pub expired: usize,
}

impl Engine for Expiry {
    fn requirements(reqs: &mut Requirements<Self>) {
        reqs.track::<Mortal>();
    }

    fn on_update(&mut self, ctx: &mut EngineContext<'_>) {
        let dt = ctx.dt as f32;
        let mut expired = Vec::new();
        for filter in ctx.entities.active::<Mortal>() {
            if let Some(lifetime) = filter.get_mut::<Lifetime>(ctx.world) {
                lifetime.remaining -= dt;
                if lifetime.remaining <= 0.0 {
                    expired.push(filter.object());
                }
            }
        }

        for object in expired {
            ctx.world.remove_component::<Velocity>(object);
            ctx.world.remove_component::<Lifetime>(object);
            self.expired += 1;
        }
    }
}

impl Tracks<Mortal> for Expiry {}
