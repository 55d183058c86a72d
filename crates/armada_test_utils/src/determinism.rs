//! Replay checks for [`Simulation`].
//!
//! A battle is reproducible when the same setup and seed always end on the
//! same [`Simulation::state_hash`]. The helpers here replay one setup several
//! times, sequentially or on threads, find the first tick where two copies
//! drift apart, and push a mid-battle snapshot through bincode to check that
//! it resumes in lockstep.
//!
//! What usually breaks a replay in this world: walking a `HashMap` instead
//! of sorted entity ids, or drawing from anything but the simulation's own
//! [`SimRng`](armada_core::math::SimRng). Hashes go through `f32::to_bits`,
//! so a single ulp of drift is enough to fail.

use std::thread;

use armada_core::simulation::Simulation;

/// Final state hashes from several replays of one setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// One hash per replay, in launch order.
    pub hashes: Vec<u64>,
    /// Ticks every replay ran for.
    pub ticks: u64,
}

impl ReplayReport {
    /// The different end states reached, sorted.
    #[must_use]
    pub fn distinct_hashes(&self) -> Vec<u64> {
        let mut distinct = self.hashes.clone();
        distinct.sort_unstable();
        distinct.dedup();
        distinct
    }

    /// Whether every replay ended on the same state.
    #[must_use]
    pub fn all_match(&self) -> bool {
        self.distinct_hashes().len() <= 1
    }

    /// # Panics
    ///
    /// Panics, listing every hash, when replays ended on different states.
    pub fn assert_replays_match(&self) {
        let distinct = self.distinct_hashes();
        assert!(
            distinct.len() <= 1,
            "{} replays of {} ticks ended on {} different states: {:?}",
            self.hashes.len(),
            self.ticks,
            distinct.len(),
            self.hashes
        );
    }
}

fn run_to_hash(mut sim: Simulation, ticks: u64) -> u64 {
    for _ in 0..ticks {
        sim.tick();
    }
    sim.state_hash()
}

/// Build `runs` simulations from `setup`, one after another, and tick each
/// for `ticks` fixed steps.
///
/// ```
/// use armada_test_utils::determinism::replay;
/// use armada_test_utils::fixtures::quiet_skirmish;
///
/// replay(quiet_skirmish, 3, 60).assert_replays_match();
/// ```
pub fn replay<F>(setup: F, runs: usize, ticks: u64) -> ReplayReport
where
    F: Fn() -> Simulation,
{
    let hashes = (0..runs).map(|_| run_to_hash(setup(), ticks)).collect();
    ReplayReport { hashes, ticks }
}

/// [`replay`] with every copy on its own scoped thread.
pub fn replay_on_threads<F>(setup: F, runs: usize, ticks: u64) -> ReplayReport
where
    F: Fn() -> Simulation + Sync,
{
    let setup = &setup;
    let hashes = thread::scope(|scope| {
        let handles: Vec<_> = (0..runs)
            .map(|_| scope.spawn(move || run_to_hash(setup(), ticks)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    });
    ReplayReport { hashes, ticks }
}

/// Tick two copies of `setup` side by side and return the first tick whose
/// hashes differ. Tick 0 is the freshly built state.
pub fn find_first_divergence<F>(setup: F, ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut left = setup();
    let mut right = setup();
    if left.state_hash() != right.state_hash() {
        return Some(0);
    }
    (1..=ticks).find(|_| {
        left.tick();
        right.tick();
        left.state_hash() != right.state_hash()
    })
}

/// Snapshot a battle after `ticks` steps, restore it, then tick both the
/// live and the restored copy another `ticks` steps. True when they agree
/// at the restore point and at the end.
pub fn snapshot_resumes_in_lockstep<F>(setup: F, ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut live = setup();
    for _ in 0..ticks {
        live.tick();
    }

    let restored = live
        .serialize()
        .and_then(|bytes| Simulation::deserialize(&bytes));
    let mut restored = match restored {
        Ok(sim) => sim,
        Err(error) => {
            tracing::warn!(%error, tick = live.get_tick(), "Snapshot round trip failed");
            return false;
        }
    };
    if restored.state_hash() != live.state_hash() {
        tracing::warn!(tick = live.get_tick(), "Restored snapshot hashes differently");
        return false;
    }

    for _ in 0..ticks {
        live.tick();
        restored.tick();
    }
    live.state_hash() == restored.state_hash()
}

/// Proptest strategies that build random fleets for replay checks.
pub mod strategies {
    use armada_core::components::SpacecraftType;
    use armada_core::config::SimConfig;
    use armada_core::math::Vec2;
    use armada_core::simulation::Simulation;
    use proptest::prelude::*;

    /// Generate a position inside the playable field.
    pub fn arb_position() -> impl Strategy<Value = Vec2> {
        (-0.9f32..0.9, -0.65f32..0.65).prop_map(|(x, y)| Vec2::new(x, y))
    }

    /// Generate a ship allegiance.
    pub fn arb_side() -> impl Strategy<Value = SpacecraftType> {
        prop_oneof![Just(SpacecraftType::Player), Just(SpacecraftType::Enemy)]
    }

    /// Generate an RNG seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Generate hit points for a ship (1-10).
    pub fn arb_ship_hp() -> impl Strategy<Value = i32> {
        1i32..=10
    }

    /// Parameters for spawning a test ship.
    #[derive(Debug, Clone)]
    pub struct TestShipParams {
        /// Allegiance.
        pub kind: SpacecraftType,
        /// Position.
        pub position: Vec2,
        /// Starting hit points.
        pub hp: i32,
    }

    /// Generate parameters for a test ship.
    pub fn arb_ship_params() -> impl Strategy<Value = TestShipParams> {
        (arb_side(), arb_position(), arb_ship_hp())
            .prop_map(|(kind, position, hp)| TestShipParams { kind, position, hp })
    }

    /// Generate a fleet of ship spawn parameters.
    pub fn arb_fleet(max_ships: usize) -> impl Strategy<Value = Vec<TestShipParams>> {
        proptest::collection::vec(arb_ship_params(), 1..max_ships)
    }

    /// Build a simulation with both home planets and the given fleet.
    #[must_use]
    pub fn fleet_simulation(
        fleet: &[TestShipParams],
        config: SimConfig,
        seed: u64,
    ) -> Simulation {
        let mut sim = Simulation::new(config, seed);
        sim.spawn_planet(Vec2::new(-0.5, 0.0), 0.15, true);
        sim.spawn_planet(Vec2::new(0.5, 0.3), 0.10, false);
        for params in fleet {
            let id = sim.spawn_ship(params.kind, params.position);
            crate::fixtures::set_hp(sim.world_mut(), id, params.hp);
        }
        sim
    }
}
