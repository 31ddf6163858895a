//! Scene files
//!
//! A scene is a JSON document holding the world configuration, a default step
//! count and a list of entity blueprints. Every blueprint value is routed
//! through the definition setters, so a scene is subject to exactly the same
//! validation as code-built definitions.

use std::path::Path;

use anyhow::{Context, Result, bail};
use helm_core::Lockable;
use helm_physics::{
    EntityType, FixtureDefinition, PhysicsEntityDefinition, PhysicsError, PhysicsResult, Shape,
    ThrustPointDefinition, Vec2, WorldConfig,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

fn default_steps() -> u64 {
    120
}

fn default_copies() -> usize {
    1
}

/// Whole scene description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    #[serde(default)]
    pub world: WorldConfig,
    /// Fixed steps to run unless overridden on the command line
    #[serde(default = "default_steps")]
    pub steps: u64,
    #[serde(default)]
    pub entities: Vec<Blueprint>,
}

/// Entities sharing one definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Blueprint {
    pub name: String,
    #[serde(rename = "type", default)]
    pub entity_type: EntityType,
    pub mass: Option<f64>,
    #[serde(default)]
    pub position: Vec2,
    #[serde(default)]
    pub orientation: f64,
    pub linear_damping: Option<f64>,
    pub angular_damping: Option<f64>,
    #[serde(default)]
    pub fixtures: Vec<FixtureConfig>,
    #[serde(default)]
    pub thrust_points: Vec<ThrustPointConfig>,
    /// Initial thrust per thrust point identifier
    #[serde(default)]
    pub thrust: IndexMap<String, f64>,
    #[serde(default)]
    pub velocity: Vec2,
    /// Number of entities to create from this blueprint
    #[serde(default = "default_copies")]
    pub copies: usize,
    /// Offset between consecutive copies
    #[serde(default)]
    pub spacing: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixtureConfig {
    pub id: Option<String>,
    pub shape: ShapeConfig,
    pub density: Option<f64>,
    pub friction: Option<f64>,
    pub restitution: Option<f64>,
    #[serde(default)]
    pub sensor: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeConfig {
    Circle {
        radius: f64,
        #[serde(default)]
        center: Vec2,
    },
    Rectangle {
        width: f64,
        height: f64,
    },
    Polygon {
        vertices: Vec<Vec2>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThrustPointConfig {
    pub id: String,
    pub position: Vec2,
    pub direction: Vec2,
}

impl ShapeConfig {
    pub fn build(&self) -> PhysicsResult<Shape> {
        match self {
            ShapeConfig::Circle { radius, center } => Shape::circle_at(*center, *radius),
            ShapeConfig::Rectangle { width, height } => Shape::rectangle(*width, *height),
            ShapeConfig::Polygon { vertices } => Shape::polygon(vertices.iter().copied()),
        }
    }
}

impl FixtureConfig {
    pub fn definition(&self) -> PhysicsResult<FixtureDefinition> {
        let mut def = FixtureDefinition::new(self.shape.build()?);
        def.set_identifier(self.id.as_deref())?.set_sensor(self.sensor)?;
        if let Some(density) = self.density {
            def.set_density(density)?;
        }
        if let Some(friction) = self.friction {
            def.set_friction(friction)?;
        }
        if let Some(restitution) = self.restitution {
            def.set_restitution(restitution)?;
        }
        Ok(def)
    }
}

impl ThrustPointConfig {
    pub fn definition(&self) -> PhysicsResult<ThrustPointDefinition> {
        ThrustPointDefinition::new(self.position, self.direction, &self.id)
    }
}

impl Blueprint {
    /// Build and lock the definition shared by every copy
    pub fn definition(&self) -> PhysicsResult<PhysicsEntityDefinition> {
        let mut def = PhysicsEntityDefinition::new(self.entity_type);
        def.set_position(self.position)?.set_orientation(self.orientation)?;
        if let Some(mass) = self.mass {
            def.set_mass(mass)?;
        }
        if let Some(damping) = self.linear_damping {
            def.set_linear_damping(damping)?;
        }
        if let Some(damping) = self.angular_damping {
            def.set_angular_damping(damping)?;
        }
        for fixture in &self.fixtures {
            def.add_fixture(fixture.definition()?)?;
        }
        for thrust_point in &self.thrust_points {
            def.add_thrust_point(thrust_point.definition()?)?;
        }
        for id in self.thrust.keys() {
            if def.thrust_point(id).is_none() {
                return Err(PhysicsError::UnknownThrustPoint(id.clone()));
            }
        }
        def.validate()?;
        def.lock();
        Ok(def)
    }

    /// Label of the `index`-th copy
    pub fn label(&self, index: usize) -> String {
        if self.copies > 1 {
            format!("{}[{index}]", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Spawn position of the `index`-th copy
    pub fn position_of(&self, index: usize) -> Vec2 {
        self.position + self.spacing * index as f64
    }
}

impl Scene {
    /// Read a scene from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scene {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("loading scene {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let scene: Scene = serde_json::from_str(text).context("parsing scene JSON")?;
        Ok(scene)
    }

    /// Build every blueprint's definition, failing on the first invalid one
    pub fn definitions(&self) -> Result<Vec<PhysicsEntityDefinition>> {
        let mut seen = std::collections::HashSet::new();
        self.entities
            .iter()
            .map(|blueprint| {
                if !seen.insert(blueprint.name.as_str()) {
                    bail!("duplicate blueprint name '{}'", blueprint.name);
                }
                if blueprint.copies == 0 {
                    bail!("blueprint '{}' has zero copies", blueprint.name);
                }
                blueprint
                    .definition()
                    .with_context(|| format!("blueprint '{}'", blueprint.name))
            })
            .collect()
    }

    /// Total number of entities the scene creates
    pub fn entity_count(&self) -> usize {
        self.entities.iter().map(|b| b.copies).sum()
    }
}
