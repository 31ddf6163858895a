//! # Helm CLI
//!
//! Command-line runner for Helm physics scenes.
//!
//! ## Commands
//! - `simulate` - Run a scene headless and report the final entity states
//! - `check` - Validate a scene without running it
//! - `demo` - Run the built-in thruster scene

pub mod scene;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use helm_core::time::validate_step;
use helm_core::{FixedTimeStep, StepAccumulator, Vec2};
use helm_physics::{
    CollisionPoint, EntityHandle, EntityId, Listenable, PhysicsManager, PhysicsResult, StepStats,
};
use rayon::prelude::*;

pub use scene::Scene;

/// Built-in scene used by `helm demo`
pub const DEMO_SCENE: &str = include_str!("../scenes/demo.json");

/// Helm physics scene runner
#[derive(Parser)]
#[command(name = "helm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a scene and report the final entity states
    Simulate {
        /// Scene file (JSON)
        scene: PathBuf,

        /// Number of fixed steps, overriding the scene
        #[arg(short, long)]
        steps: Option<u64>,

        /// Fixed step length in seconds, overriding the scene
        #[arg(long)]
        dt: Option<f64>,

        /// Substeps per fixed step, overriding the scene
        #[arg(long)]
        substeps: Option<u32>,

        /// Simulated frame length fed to the fixed-step scheduler
        #[arg(long)]
        frame_time: Option<f64>,
    },

    /// Validate a scene without running it
    Check {
        /// Scene file (JSON)
        scene: PathBuf,
    },

    /// Run the built-in thruster scene
    Demo {
        /// Number of fixed steps
        #[arg(short, long)]
        steps: Option<u64>,
    },
}

/// How to drive a scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub steps: u64,
    pub dt: f64,
    pub substeps: u32,
    pub frame_time: f64,
}

impl RunOptions {
    /// Scene defaults with optional overrides
    pub fn for_scene(
        scene: &Scene,
        steps: Option<u64>,
        dt: Option<f64>,
        substeps: Option<u32>,
        frame_time: Option<f64>,
    ) -> Self {
        let dt = dt.unwrap_or(scene.world.fixed_timestep);
        Self {
            steps: steps.unwrap_or(scene.steps),
            dt,
            substeps: substeps.unwrap_or(scene.world.substeps),
            frame_time: frame_time.unwrap_or(dt),
        }
    }
}

/// Final state of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityReport {
    pub label: String,
    pub id: EntityId,
    pub position: Vec2,
    pub orientation: f64,
    pub linear_velocity: Vec2,
    pub asleep: bool,
}

/// Outcome of a scene run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
    pub steps: u64,
    pub simulated_time: f64,
    pub stats: StepStats,
    pub entities: Vec<EntityReport>,
}

/// Create every entity of the scene. Copies of one blueprint are built in
/// parallel from the shared locked definition.
fn populate<E: helm_physics::RigidBodyEngine>(
    manager: &PhysicsManager<E>,
    scene: &Scene,
) -> Result<Vec<(String, EntityHandle)>> {
    let definitions = scene.definitions()?;
    let mut created = Vec::with_capacity(scene.entity_count());
    for (blueprint, template) in scene.entities.iter().zip(&definitions) {
        let batch = (0..blueprint.copies)
            .into_par_iter()
            .map(|index| -> PhysicsResult<(String, EntityHandle)> {
                let mut def = template.clone();
                def.set_position(blueprint.position_of(index))?;
                let handle = manager.create_entity(&def)?;
                let label = blueprint.label(index);
                {
                    let mut entity = handle.lock();
                    for (id, thrust) in &blueprint.thrust {
                        entity.set_thrust(id, *thrust)?;
                    }
                    entity.set_linear_velocity(blueprint.velocity)?;
                    entity.set_user_data(label.clone());
                }
                Ok((label, handle))
            })
            .collect::<PhysicsResult<Vec<_>>>()
            .with_context(|| format!("creating '{}'", blueprint.name))?;
        created.extend(batch);
    }
    Ok(created)
}

/// Run a scene on the reference engine
pub fn run_scene(scene: &Scene, options: &RunOptions) -> Result<SimulationReport> {
    let dt = validate_step(options.dt).context("invalid step length")?;
    let frame_time = validate_step(options.frame_time).context("invalid frame time")?;

    let manager = PhysicsManager::new();
    manager.initialise_world_with(scene.world.clone())?;
    manager.add_collision_listener(Arc::new(|point: &CollisionPoint| {
        log::debug!("Contact {} / {} at {}", point.entity0, point.entity1, point.point);
    }));

    let entities = populate(&manager, scene)?;
    for (_, handle) in &entities {
        manager.spawn_entity(handle)?;
    }
    log::info!("Spawned {} entities", entities.len());

    let mut scheduler = StepAccumulator::new(FixedTimeStep::from_step(dt));
    let mut stats = StepStats::default();
    let mut executed = 0;
    while executed < options.steps {
        for _ in 0..scheduler.advance(frame_time) {
            if executed == options.steps {
                break;
            }
            stats += manager.step_world_substeps(dt, options.substeps)?;
            executed += 1;
        }
    }

    let entities = entities
        .into_iter()
        .map(|(label, handle)| {
            let entity = handle.lock();
            EntityReport {
                label,
                id: entity.id(),
                position: entity.position(),
                orientation: entity.orientation(),
                linear_velocity: entity.linear_velocity(),
                asleep: entity.is_asleep(),
            }
        })
        .collect();

    Ok(SimulationReport {
        steps: executed,
        simulated_time: executed as f64 * dt,
        stats,
        entities,
    })
}

fn log_report(report: &SimulationReport) {
    log::info!(
        "Simulated {:.3}s in {} steps: {} contacts, {} bullet impacts, {} pairs vetoed",
        report.simulated_time,
        report.steps,
        report.stats.collisions,
        report.stats.impacts,
        report.stats.vetoed_pairs
    );
    for entity in &report.entities {
        log::info!(
            "  {:<12} {} pos ({:.3}, {:.3}) rot {:.3} vel ({:.3}, {:.3}){}",
            entity.label,
            entity.id,
            entity.position.x,
            entity.position.y,
            entity.orientation,
            entity.linear_velocity.x,
            entity.linear_velocity.y,
            if entity.asleep { " asleep" } else { "" }
        );
    }
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    match cli.command {
        Commands::Simulate {
            scene,
            steps,
            dt,
            substeps,
            frame_time,
        } => {
            log::info!("Simulating {}...", scene.display());
            let scene = Scene::load(&scene)?;
            let options = RunOptions::for_scene(&scene, steps, dt, substeps, frame_time);
            let report = run_scene(&scene, &options)?;
            log_report(&report);
        }

        Commands::Check { scene: path } => {
            let scene = Scene::load(&path)?;
            scene.definitions()?;
            log::info!(
                "{} OK: {} blueprints, {} entities",
                path.display(),
                scene.entities.len(),
                scene.entity_count()
            );
        }

        Commands::Demo { steps } => {
            log::info!("Running demo scene...");
            let scene = Scene::parse(DEMO_SCENE)?;
            let options = RunOptions::for_scene(&scene, steps, None, None, None);
            let report = run_scene(&scene, &options)?;
            log_report(&report);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::parse_from(["helm", "demo"]);
        assert!(matches!(cli.command, Commands::Demo { steps: None }));
    }

    #[test]
    fn test_simulate_command() {
        let cli = Cli::parse_from([
            "helm", "-v", "simulate", "scene.json", "-s", "10", "--dt", "0.01", "--substeps", "4",
        ]);
        assert!(cli.verbose);
        if let Commands::Simulate {
            scene,
            steps,
            dt,
            substeps,
            frame_time,
        } = cli.command
        {
            assert_eq!(scene, PathBuf::from("scene.json"));
            assert_eq!(steps, Some(10));
            assert_eq!(dt, Some(0.01));
            assert_eq!(substeps, Some(4));
            assert_eq!(frame_time, None);
        } else {
            panic!("Expected Simulate command");
        }
    }

    #[test]
    fn test_run_options_overrides() {
        let scene = Scene::parse(DEMO_SCENE).unwrap();
        let options = RunOptions::for_scene(&scene, None, None, None, None);
        assert_eq!(options.steps, 180);
        assert_eq!(options.substeps, 2);
        assert_eq!(options.frame_time, options.dt);

        let options = RunOptions::for_scene(&scene, Some(5), Some(0.1), Some(1), Some(0.25));
        assert_eq!(
            (options.steps, options.dt, options.substeps, options.frame_time),
            (5, 0.1, 1, 0.25)
        );
    }

    #[test]
    fn test_demo_runs() {
        let scene = Scene::parse(DEMO_SCENE).unwrap();
        let options = RunOptions::for_scene(&scene, Some(60), None, None, None);
        let report = run_scene(&scene, &options).unwrap();
        assert_eq!(report.steps, 60);
        assert_eq!(report.entities.len(), 6);

        let floor = &report.entities[0];
        assert_eq!(floor.label, "floor");
        assert_eq!(floor.position, Vec2::new(0.0, -6.0));

        let crates: Vec<_> = report
            .entities
            .iter()
            .filter(|e| e.label.starts_with("crate"))
            .collect();
        assert_eq!(crates.len(), 3);
        assert!(crates.iter().all(|c| c.position.y < 0.0));

        let lander = report.entities.iter().find(|e| e.label == "lander").unwrap();
        assert!(lander.position.y > 2.0);
    }

    #[test]
    fn test_frame_time_batches_steps() {
        let scene = Scene::parse(DEMO_SCENE).unwrap();
        let options = RunOptions {
            steps: 7,
            dt: 0.01,
            substeps: 1,
            frame_time: 0.035,
        };
        let report = run_scene(&scene, &options).unwrap();
        assert_eq!(report.steps, 7);
        assert!((report.simulated_time - 0.07).abs() < 1.0e-12);
    }

    #[test]
    fn test_invalid_step_length() {
        let scene = Scene::parse(DEMO_SCENE).unwrap();
        let options = RunOptions {
            steps: 1,
            dt: -1.0,
            substeps: 1,
            frame_time: 0.1,
        };
        assert!(run_scene(&scene, &options).is_err());
    }
}
