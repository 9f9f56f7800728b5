//! # reactor_demo
//!
//! Spawns a handful of drifting bodies, lets a movement engine integrate
//! them and an expiry engine stop them when their lifetime runs out, then
//! reports where every body ended up.
//!
//! ```text
//! RUST_LOG=reactor_demo=debug reactor_demo --ticks 240 --bodies 16
//! ```

mod motion;

use anyhow::Result;
use clap::Parser;
use glam::Vec3;
use reactor_scene::{Scene, TickConfig, TickLoop};
use tracing::info;
use tracing_subscriber::EnvFilter;

use motion::{Expiry, Lifetime, Movement, Position, Velocity};

#[derive(Parser)]
#[command(name = "reactor_demo", about = "Run a reactive scene of drifting bodies")]
struct Args {
    /// Number of ticks to run (0 = until interrupted)
    #[arg(short, long, default_value_t = 120)]
    ticks: u64,

    /// Target ticks per second
    #[arg(short = 'r', long, default_value_t = 60.0)]
    tick_rate: f64,

    /// Number of bodies to spawn
    #[arg(short, long, default_value_t = 8)]
    bodies: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("reactor_demo=info".parse()?))
        .init();

    let args = Args::parse();
    info!(bodies = args.bodies, ticks = args.ticks, "reactor demo starting");

    let mut scene = Scene::new();
    scene.add_engine(Movement::default());
    scene.add_engine(Expiry::default());

    for i in 0..args.bodies {
        let angle = i as f32 / args.bodies.max(1) as f32 * std::f32::consts::TAU;
        let id = scene.spawn(format!("body-{i}"));
        scene.add_component(id, Position(Vec3::ZERO));
        scene.add_component(id, Velocity(Vec3::new(angle.cos(), angle.sin(), 0.0)));
        scene.add_component(
            id,
            Lifetime {
                remaining: 0.25 * (i + 1) as f32,
            },
        );
    }

    let config = TickConfig::default()
        .with_tick_rate(args.tick_rate)
        .with_max_ticks(args.ticks);
    let mut tick_loop = TickLoop::new(scene, config)?;
    tick_loop.run();

    let scene = tick_loop.scene();
    if let Some(movement) = scene.get_engine::<Movement>() {
        info!(
            moving = movement.moving,
            stopped = movement.stopped,
            "movement summary"
        );
    }
    for object in scene.world().objects() {
        if let Some(Position(position)) = object.get::<Position>() {
            info!(body = %object.name, %position, "final position");
        }
    }

    info!(ticks = tick_loop.tick_id(), "reactor demo finished");
    Ok(())
}
