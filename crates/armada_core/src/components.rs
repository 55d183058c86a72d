//! ECS component definitions.
//!
//! Components are pure data with no behavior beyond small accessors. All game
//! entities (ships, planets, projectiles) are composed of these records in the
//! [`World`](crate::ecs::World).

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::ecs::EntityId;
use crate::math::Vec2;

/// Position component in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// World position.
    pub value: Vec2,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(value: Vec2) -> Self {
        Self { value }
    }

    /// Create a position from raw coordinates.
    #[must_use]
    pub const fn at(x: f32, y: f32) -> Self {
        Self {
            value: Vec2::new(x, y),
        }
    }
}

/// Health component for damageable entities.
///
/// `is_alive` flips to `false` the first time `current_hp` reaches zero and
/// never flips back. Dead entities stay in the world (inert) until destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    /// Current hit points.
    pub current_hp: i32,
    /// Maximum hit points.
    pub max_hp: i32,
    /// Whether the entity is still alive.
    pub is_alive: bool,
}

impl Health {
    /// Create health at full hit points.
    #[must_use]
    pub const fn new(max_hp: i32) -> Self {
        Self {
            current_hp: max_hp,
            max_hp,
            is_alive: max_hp > 0,
        }
    }

    /// Create health with explicit current hit points.
    #[must_use]
    pub const fn with_current(current_hp: i32, max_hp: i32) -> Self {
        Self {
            current_hp,
            max_hp,
            is_alive: current_hp > 0,
        }
    }

    /// Apply damage. Returns `true` if this hit killed the entity.
    ///
    /// Hits on dead entities are ignored.
    pub fn apply_damage(&mut self, amount: i32) -> bool {
        if !self.is_alive {
            return false;
        }
        self.current_hp -= amount;
        if self.current_hp <= 0 {
            self.is_alive = false;
            return true;
        }
        false
    }

    /// Current hit points as a fraction of maximum (0 for dead entities).
    #[must_use]
    pub fn fraction(&self) -> f32 {
        if !self.is_alive || self.max_hp <= 0 {
            return 0.0;
        }
        self.current_hp as f32 / self.max_hp as f32
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Which side a spacecraft fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SpacecraftType {
    /// Controlled by the player (input and auto-attack).
    #[default]
    Player,
    /// Controlled by the combat AI.
    Enemy,
}

impl SpacecraftType {
    /// The opposing side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }

    /// Whether planets with the given ownership flag belong to this side.
    #[must_use]
    pub const fn owns_planet(self, is_player_owned: bool) -> bool {
        matches!(
            (self, is_player_owned),
            (Self::Player, true) | (Self::Enemy, false)
        )
    }
}

/// Tactical state of an AI-controlled unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AiState {
    /// Looking for something to attack.
    #[default]
    Search,
    /// Target detected, closing to firing range.
    Approach,
    /// Target in range, firing.
    Engage,
    /// Badly hurt and outnumbered, falling back.
    Retreat,
    /// Nothing on the map to react to; joining allies.
    Regroup,
}

impl AiState {
    /// All states, in transition priority order.
    pub const ALL: [Self; 5] = [
        Self::Retreat,
        Self::Regroup,
        Self::Engage,
        Self::Approach,
        Self::Search,
    ];

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Approach => "approach",
            Self::Engage => "engage",
            Self::Retreat => "retreat",
            Self::Regroup => "regroup",
        }
    }
}

/// Component for spacecraft entities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spacecraft {
    /// Side this craft fights for.
    pub kind: SpacecraftType,
    /// Facing in degrees; 0 is +Y, increasing clockwise.
    pub angle: f32,
    /// Where the movement integrator should steer.
    pub destination: Vec2,
    /// Whether `destination` is live. The integrator ignores it otherwise.
    pub is_moving: bool,
    /// Player attack-move flag.
    pub is_attacking: bool,
    /// Seconds until the weapon can fire again.
    pub weapon_cooldown: f32,
    /// Pursuit target set by the player.
    pub target_entity: Option<EntityId>,
    /// Current tactical state (meaningful for enemy craft only).
    pub ai_state: AiState,
    /// Seconds spent in `ai_state`.
    pub time_in_state: f32,
    /// Target picked by the combat AI.
    pub ai_target: Option<EntityId>,
}

impl Spacecraft {
    /// Create an idle craft for the given side.
    #[must_use]
    pub const fn new(kind: SpacecraftType) -> Self {
        Self {
            kind,
            angle: 0.0,
            destination: Vec2::ZERO,
            is_moving: false,
            is_attacking: false,
            weapon_cooldown: 0.0,
            target_entity: None,
            ai_state: AiState::Search,
            time_in_state: 0.0,
            ai_target: None,
        }
    }

    /// Steer toward `destination`.
    pub fn move_to(&mut self, destination: Vec2) {
        self.destination = destination;
        self.is_moving = true;
    }

    /// Drop the current destination.
    pub fn stop(&mut self) {
        self.is_moving = false;
    }

    /// Whether the weapon is ready.
    #[must_use]
    pub fn can_fire(&self) -> bool {
        self.weapon_cooldown <= 0.0
    }
}

impl Default for Spacecraft {
    fn default() -> Self {
        Self::new(SpacecraftType::Player)
    }
}

/// Unit types that can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BuildableUnit {
    /// A standard spacecraft.
    #[default]
    Spacecraft,
}

/// One pending build on a planet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildQueueEntry {
    /// What is being built.
    pub unit: BuildableUnit,
    /// Seconds left.
    pub time_remaining: f32,
    /// Total build time.
    pub total_build_time: f32,
}

impl BuildQueueEntry {
    /// Create a fresh entry.
    #[must_use]
    pub const fn new(unit: BuildableUnit, build_time: f32) -> Self {
        Self {
            unit,
            time_remaining: build_time,
            total_build_time: build_time,
        }
    }

    /// Build progress in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.total_build_time <= 0.0 {
            return 1.0;
        }
        (1.0 - self.time_remaining / self.total_build_time).clamp(0.0, 1.0)
    }
}

/// Component for planet entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planet {
    /// Planet radius.
    pub radius: f32,
    /// Pending builds, head first.
    pub build_queue: VecDeque<BuildQueueEntry>,
    /// Whether the player owns this planet.
    pub is_player_owned: bool,
}

impl Planet {
    /// Create a planet with an empty build queue.
    #[must_use]
    pub fn new(radius: f32, is_player_owned: bool) -> Self {
        Self {
            radius,
            build_queue: VecDeque::new(),
            is_player_owned,
        }
    }

    /// Side that owns this planet.
    #[must_use]
    pub const fn owner(&self) -> SpacecraftType {
        if self.is_player_owned {
            SpacecraftType::Player
        } else {
            SpacecraftType::Enemy
        }
    }

    /// Queue a build.
    pub fn enqueue(&mut self, unit: BuildableUnit, build_time: f32) {
        self.build_queue.push_back(BuildQueueEntry::new(unit, build_time));
    }
}

/// Component for projectile entities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unit travel direction.
    pub direction: Vec2,
    /// Travel speed.
    pub speed: f32,
    /// Seconds until the projectile expires.
    pub lifetime: f32,
    /// Entity that fired it.
    pub owner: EntityId,
    /// Side of the shooter. Hits still resolve after the shooter is destroyed.
    pub side: SpacecraftType,
    /// Intended target; `None` hits any hostile in its path.
    pub target: Option<EntityId>,
    /// Whether it can still hit.
    pub is_active: bool,
}

impl Default for Projectile {
    fn default() -> Self {
        Self {
            direction: Vec2::ZERO,
            speed: 1.0,
            lifetime: 1.5,
            owner: crate::ecs::INVALID_ENTITY,
            side: SpacecraftType::Player,
            target: None,
            is_active: true,
        }
    }
}

/// Component for entities that can be selected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Selectable {
    /// Whether currently selected.
    pub is_selected: bool,
    /// Selection circle radius.
    pub selection_radius: f32,
}

impl Default for Selectable {
    fn default() -> Self {
        Self {
            is_selected: false,
            selection_radius: 0.04,
        }
    }
}

/// Component for visual representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Renderable {
    /// RGBA tint.
    pub color: [f32; 4],
    /// Draw scale.
    pub scale: f32,
}

impl Renderable {
    /// Player ship tint.
    pub const PLAYER_SHIP: Self = Self::tinted([1.0, 0.8, 0.2, 1.0]);
    /// Enemy ship tint.
    pub const ENEMY_SHIP: Self = Self::tinted([1.0, 0.2, 0.2, 1.0]);
    /// Planet tint.
    pub const PLANET: Self = Self::tinted([0.2, 0.6, 1.0, 1.0]);
    /// Destroyed planet tint.
    pub const DESTROYED_PLANET: Self = Self::tinted([1.0, 0.0, 0.0, 1.0]);
    /// Projectile tint.
    pub const PROJECTILE: Self = Self {
        color: [1.0, 1.0, 0.0, 1.0],
        scale: 0.5,
    };

    /// Full-scale renderable with the given color.
    #[must_use]
    pub const fn tinted(color: [f32; 4]) -> Self {
        Self { color, scale: 1.0 }
    }

    /// Enemy tint for an AI state, so the renderer can show intent.
    #[must_use]
    pub const fn for_ai_state(state: AiState) -> Self {
        match state {
            AiState::Search => Self::ENEMY_SHIP,
            AiState::Approach => Self::tinted([1.0, 0.35, 0.2, 1.0]),
            AiState::Engage => Self::tinted([1.0, 0.1, 0.1, 1.0]),
            AiState::Retreat => Self::tinted([1.0, 0.6, 0.2, 1.0]),
            AiState::Regroup => Self::tinted([0.8, 0.3, 0.6, 1.0]),
        }
    }
}

impl Default for Renderable {
    fn default() -> Self {
        Self::tinted([1.0, 1.0, 1.0, 1.0])
    }
}
