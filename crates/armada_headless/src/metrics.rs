//! Game metrics collection.
//!
//! A [`MetricsCollector`] watches the tick events of one headless run and
//! folds them into a serializable [`GameMetrics`] report.

use std::collections::HashMap;

use armada_core::prelude::*;
use armada_core::systems::WaveSpawner;
use serde::{Deserialize, Serialize};

/// Complete metrics for a single game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Unique game identifier.
    pub game_id: String,
    /// Scenario name.
    pub scenario: String,
    /// Random seed used.
    pub seed: u64,
    /// Total game duration in ticks.
    pub duration_ticks: u64,
    /// How the match stood when the run ended.
    pub outcome: Outcome,
    /// Enemy waves that arrived.
    pub waves: u32,
    /// Player side.
    pub player: SideMetrics,
    /// Enemy side.
    pub enemy: SideMetrics,
    /// Timed events log.
    pub events: Vec<TimedEvent>,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl GameMetrics {
    /// Create a new game metrics instance.
    #[must_use]
    pub fn new(game_id: impl Into<String>, scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            game_id: game_id.into(),
            scenario: scenario.into(),
            seed,
            ..Default::default()
        }
    }

    /// Metrics for one side.
    pub fn side_mut(&mut self, side: SpacecraftType) -> &mut SideMetrics {
        match side {
            SpacecraftType::Player => &mut self.player,
            SpacecraftType::Enemy => &mut self.enemy,
        }
    }

    /// Record a timed event.
    pub fn record_event(
        &mut self,
        tick: u64,
        event_type: EventType,
        side: SpacecraftType,
        entity: EntityId,
    ) {
        self.events.push(TimedEvent {
            tick,
            event_type,
            side,
            entity,
        });
    }

    /// Whether the player still held a planet when the run ended.
    #[must_use]
    pub fn survived(&self) -> bool {
        self.outcome == Outcome::InProgress
    }
}

/// Per-side combat tallies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideMetrics {
    /// Ships at the start of the run.
    pub starting_ships: u32,
    /// Ships added later (planet builds and waves).
    pub ships_spawned: u32,
    /// Ships destroyed.
    pub ships_lost: u32,
    /// Planets destroyed.
    pub planets_lost: u32,
    /// Shots fired.
    pub shots_fired: u32,
    /// Projectiles that struck an opposing ship or planet.
    pub hits_landed: u32,
    /// Damage dealt to the other side.
    pub damage_dealt: i64,
    /// Ships alive at the end.
    pub surviving_ships: u32,
    /// Largest fleet seen at the end of any tick.
    pub peak_fleet: u32,
}

impl SideMetrics {
    /// Fraction of shots that hit, or 0 without shots.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        if self.shots_fired == 0 {
            0.0
        } else {
            f64::from(self.hits_landed) / f64::from(self.shots_fired)
        }
    }
}

/// A timed event during the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Tick when the event occurred.
    pub tick: u64,
    /// Type of event.
    pub event_type: EventType,
    /// Side involved.
    pub side: SpacecraftType,
    /// Entity involved.
    pub entity: EntityId,
}

/// Types of events that can be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// A planet finished a ship.
    ShipBuilt,
    /// An enemy wave arrived; the entity is the first ship of the wave.
    WaveArrived,
    /// A planet was destroyed.
    PlanetDestroyed,
    /// First shot fired by a side.
    FirstShot,
}

/// Summary statistics across multiple games.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total games played.
    pub total_games: u32,
    /// Games that ended in defeat.
    pub defeats: u32,
    /// Fraction of games the player survived.
    pub survival_rate: f64,
    /// Average game duration in ticks.
    pub avg_duration_ticks: f64,
    /// Shortest game.
    pub min_duration_ticks: u64,
    /// Longest game.
    pub max_duration_ticks: u64,
    /// Average waves reached.
    pub avg_waves: f64,
    /// Average player ships lost.
    pub avg_player_ships_lost: f64,
    /// Average enemy ships lost.
    pub avg_enemy_ships_lost: f64,
}

impl BatchSummary {
    /// Aggregate a set of games.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }
        let n = games.len() as f64;
        let mean = |f: &dyn Fn(&GameMetrics) -> f64| games.iter().map(f).sum::<f64>() / n;
        let defeats = games.iter().filter(|g| !g.survived()).count() as u32;

        Self {
            total_games: games.len() as u32,
            defeats,
            survival_rate: 1.0 - f64::from(defeats) / n,
            avg_duration_ticks: mean(&|g| g.duration_ticks as f64),
            min_duration_ticks: games.iter().map(|g| g.duration_ticks).min().unwrap_or(0),
            max_duration_ticks: games.iter().map(|g| g.duration_ticks).max().unwrap_or(0),
            avg_waves: mean(&|g| f64::from(g.waves)),
            avg_player_ships_lost: mean(&|g| f64::from(g.player.ships_lost)),
            avg_enemy_ships_lost: mean(&|g| f64::from(g.enemy.ships_lost)),
        }
    }
}

/// What the collector remembers about an entity it has seen.
#[derive(Debug, Clone, Copy)]
struct Known {
    side: SpacecraftType,
    planet: bool,
}

/// Metrics collector that tracks events during a game.
///
/// Call [`track`](Self::track) before each tick so entities that die during
/// the tick can still be attributed, then [`record_tick`](Self::record_tick)
/// with the tick's events.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: GameMetrics,
    known: HashMap<EntityId, Known>,
    started: bool,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    #[must_use]
    pub fn new(game_id: &str, scenario: &str, seed: u64) -> Self {
        Self {
            metrics: GameMetrics::new(game_id, scenario, seed),
            known: HashMap::new(),
            started: false,
        }
    }

    /// Remember the side of every ship and planet currently in the world.
    ///
    /// The first call also counts the starting fleets.
    pub fn track(&mut self, world: &World) {
        for id in world.ids::<Spacecraft>() {
            if let Some(craft) = world.get_component::<Spacecraft>(id) {
                let fresh = self
                    .known
                    .insert(
                        id,
                        Known {
                            side: craft.kind,
                            planet: false,
                        },
                    )
                    .is_none();
                if fresh && !self.started {
                    self.metrics.side_mut(craft.kind).starting_ships += 1;
                }
            }
        }
        for id in world.ids::<Planet>() {
            // Destroyed planets stay in the world but are done being tracked.
            let alive = world
                .get_component::<Health>(id)
                .map_or(true, |health| health.is_alive);
            if !alive {
                continue;
            }
            if let Some(planet) = world.get_component::<Planet>(id) {
                self.known.insert(
                    id,
                    Known {
                        side: planet.owner(),
                        planet: true,
                    },
                );
            }
        }
        self.started = true;
    }

    /// Fold one tick's events into the report.
    pub fn record_tick(&mut self, tick: u64, events: &TickEvents, world: &World) {
        self.track(world);

        for event in &events.combat {
            match *event {
                CombatEvent::WeaponFired { shooter, .. } => {
                    if let Some(known) = self.known.get(&shooter).copied() {
                        let side = self.metrics.side_mut(known.side);
                        side.shots_fired += 1;
                        if side.shots_fired == 1 {
                            self.metrics
                                .record_event(tick, EventType::FirstShot, known.side, shooter);
                        }
                    }
                }
                CombatEvent::ProjectileHit { damage, side, .. } => {
                    let attacker = self.metrics.side_mut(side);
                    attacker.hits_landed += 1;
                    attacker.damage_dealt += i64::from(damage);
                }
                CombatEvent::Explosion { entity, .. } => {
                    if let Some(known) = self.known.get(&entity).copied() {
                        if known.planet {
                            self.known.remove(&entity);
                            self.metrics.side_mut(known.side).planets_lost += 1;
                            self.metrics
                                .record_event(tick, EventType::PlanetDestroyed, known.side, entity);
                        }
                    }
                }
            }
        }

        // Wave ships are appended after planet builds.
        let wave_len = events
            .wave
            .map_or(0, |wave| WaveSpawner::wave_size(wave.saturating_sub(1)) as usize);
        let built = events.spawned.len().saturating_sub(wave_len);
        for (index, &ship) in events.spawned.iter().enumerate() {
            let Some(known) = self.known.get(&ship).copied() else {
                continue;
            };
            self.metrics.side_mut(known.side).ships_spawned += 1;
            if index < built {
                self.metrics
                    .record_event(tick, EventType::ShipBuilt, known.side, ship);
            }
        }
        if let Some(wave) = events.wave {
            self.metrics.waves = wave;
            if let Some(&first) = events.spawned.get(built) {
                self.metrics
                    .record_event(tick, EventType::WaveArrived, SpacecraftType::Enemy, first);
            }
        }

        for ship in &events.deaths {
            if let Some(known) = self.known.remove(ship) {
                self.metrics.side_mut(known.side).ships_lost += 1;
            }
        }

        let (players, enemies) = fleet_sizes(world);
        self.metrics.player.peak_fleet = self.metrics.player.peak_fleet.max(players);
        self.metrics.enemy.peak_fleet = self.metrics.enemy.peak_fleet.max(enemies);
    }

    /// Close the report with the final simulation state.
    #[must_use]
    pub fn finish(mut self, sim: &Simulation) -> GameMetrics {
        let (players, enemies) = fleet_sizes(sim.world());
        self.metrics.player.surviving_ships = players;
        self.metrics.enemy.surviving_ships = enemies;
        self.metrics.duration_ticks = sim.get_tick();
        self.metrics.outcome = sim.outcome();
        self.metrics.final_state_hash = sim.state_hash();
        self.metrics
    }
}

/// Alive (player, enemy) ship counts.
fn fleet_sizes(world: &World) -> (u32, u32) {
    world
        .iter::<Spacecraft>()
        .fold((0, 0), |(players, enemies), (_, craft)| match craft.kind {
            SpacecraftType::Player => (players + 1, enemies),
            SpacecraftType::Enemy => (players, enemies + 1),
        })
}
