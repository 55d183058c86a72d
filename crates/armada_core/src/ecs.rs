//! Entity store.
//!
//! An entity is a bare `u32` key; all of its data lives in per-type
//! component tables. Each component type gets its own statically registered
//! [`ComponentTable`], a sparse set (id -> dense slot) so that insert, remove
//! and lookup are O(1) amortized and iteration walks a packed `Vec`.
//!
//! # Re-entrancy
//!
//! [`World::for_each`] borrows the world mutably for the whole walk, so the
//! callback cannot create or destroy entities. Systems that need to do that
//! snapshot [`World::ids`] first and mutate after the loop:
//!
//! ```
//! use armada_core::components::Projectile;
//! use armada_core::ecs::World;
//!
//! let mut world = World::new();
//! let id = world.create_entity();
//! world.add_component(id, Projectile::default());
//!
//! let expired: Vec<_> = world
//!     .ids::<Projectile>()
//!     .into_iter()
//!     .filter(|&id| world.get_component::<Projectile>(id).is_some_and(|p| !p.is_active))
//!     .collect();
//! for id in expired {
//!     world.destroy_entity(id);
//! }
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::components::{
    Health, Planet, Position, Projectile, Renderable, Selectable, Spacecraft,
};

/// Unique identifier for entities. Zero is never issued.
pub type EntityId = u32;

/// Reserved id meaning "no entity".
pub const INVALID_ENTITY: EntityId = 0;

/// Sparse-set storage for one component type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentTable<T> {
    /// Entity id -> index into `dense`.
    sparse: HashMap<EntityId, usize>,
    /// Packed component records.
    dense: Vec<(EntityId, T)>,
}

impl<T> Default for ComponentTable<T> {
    fn default() -> Self {
        Self {
            sparse: HashMap::new(),
            dense: Vec::new(),
        }
    }
}

impl<T> ComponentTable<T> {
    /// Insert or overwrite the record for `id`.
    pub fn insert(&mut self, id: EntityId, value: T) {
        if let Some(&slot) = self.sparse.get(&id) {
            self.dense[slot].1 = value;
        } else {
            self.sparse.insert(id, self.dense.len());
            self.dense.push((id, value));
        }
    }

    /// Remove the record for `id`, returning it if present.
    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        let slot = self.sparse.remove(&id)?;
        let (_, value) = self.dense.swap_remove(slot);
        if let Some((moved, _)) = self.dense.get(slot) {
            self.sparse.insert(*moved, slot);
        }
        Some(value)
    }

    /// Borrow the record for `id`.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.sparse.get(&id).map(|&slot| &self.dense[slot].1)
    }

    /// Mutably borrow the record for `id`.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        let slot = *self.sparse.get(&id)?;
        Some(&mut self.dense[slot].1)
    }

    /// Whether a record exists for `id`.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.sparse.contains_key(&id)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Iterate over records in storage order (unspecified).
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.dense.iter().map(|(id, value)| (*id, value))
    }

    /// Iterate mutably over records in storage order (unspecified).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.dense.iter_mut().map(|(id, value)| (*id, value))
    }

    /// Owning entity ids in ascending order.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.dense.iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        ids
    }
}

/// A data record that can be attached to an entity.
///
/// Implemented once per component type by `component_tables!`, which maps the
/// type onto its dedicated field of [`World`]. No runtime type lookup happens.
pub trait Component: Sized + 'static {
    /// Human-readable component name, used in error messages.
    const NAME: &'static str;

    /// The table holding this component type.
    fn table(world: &World) -> &ComponentTable<Self>;

    /// The table holding this component type, mutably.
    fn table_mut(world: &mut World) -> &mut ComponentTable<Self>;
}

macro_rules! component_tables {
    ($($ty:ident => $field:ident),* $(,)?) => {
        /// Storage for every entity and all of its components.
        ///
        /// One table per component type; an entity "has" a component iff its
        /// table holds a record for it.
        #[derive(Debug, Clone, Default, Serialize, Deserialize)]
        pub struct World {
            /// Last id handed out; ids are never reused.
            last_id: EntityId,
            /// Entities created and not yet destroyed.
            live: HashSet<EntityId>,
            $(
                #[doc = concat!("`", stringify!($ty), "` records.")]
                $field: ComponentTable<$ty>,
            )*
        }

        impl World {
            fn remove_all_components(&mut self, id: EntityId) {
                $( self.$field.remove(id); )*
            }

            /// Number of component records held for `id` across all tables.
            #[must_use]
            pub fn component_count(&self, id: EntityId) -> usize {
                0 $( + usize::from(self.$field.contains(id)) )*
            }
        }

        $(
            impl Component for $ty {
                const NAME: &'static str = stringify!($ty);

                fn table(world: &World) -> &ComponentTable<Self> {
                    &world.$field
                }

                fn table_mut(world: &mut World) -> &mut ComponentTable<Self> {
                    &mut world.$field
                }
            }
        )*
    };
}

component_tables! {
    Position => positions,
    Health => healths,
    Spacecraft => spacecraft,
    Planet => planets,
    Projectile => projectiles,
    Selectable => selectables,
    Renderable => renderables,
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh entity. Ids start at 1 and are never reused.
    pub fn create_entity(&mut self) -> EntityId {
        self.last_id += 1;
        self.live.insert(self.last_id);
        self.last_id
    }

    /// Destroy an entity and every component record it owns.
    ///
    /// Destroying an invalid or already destroyed id is a no-op.
    pub fn destroy_entity(&mut self, id: EntityId) {
        if id == INVALID_ENTITY {
            return;
        }
        self.live.remove(&id);
        self.remove_all_components(id);
        #[cfg(feature = "debug-validation")]
        debug_assert_eq!(self.component_count(id), 0, "entity {id} left records behind");
    }

    /// Whether `id` was created and not yet destroyed.
    #[must_use]
    pub fn exists(&self, id: EntityId) -> bool {
        self.live.contains(&id)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.live.len()
    }

    /// Attach `value` to `id`, overwriting any previous record of that type.
    ///
    /// Ignored for ids that are not alive, so a stale id can never resurrect
    /// component data.
    pub fn add_component<T: Component>(&mut self, id: EntityId, value: T) {
        if !self.exists(id) {
            return;
        }
        T::table_mut(self).insert(id, value);
    }

    /// Detach and return the `T` record of `id`.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> Option<T> {
        T::table_mut(self).remove(id)
    }

    /// Borrow the `T` record of `id`.
    #[must_use]
    pub fn get_component<T: Component>(&self, id: EntityId) -> Option<&T> {
        T::table(self).get(id)
    }

    /// Mutably borrow the `T` record of `id`.
    pub fn get_component_mut<T: Component>(&mut self, id: EntityId) -> Option<&mut T> {
        T::table_mut(self).get_mut(id)
    }

    /// Whether `id` owns a `T` record.
    #[must_use]
    pub fn has_component<T: Component>(&self, id: EntityId) -> bool {
        T::table(self).contains(id)
    }

    /// Number of entities owning a `T` record.
    #[must_use]
    pub fn count<T: Component>(&self) -> usize {
        T::table(self).len()
    }

    /// Ids owning a `T` record, ascending. Safe to hold across mutation.
    #[must_use]
    pub fn ids<T: Component>(&self) -> Vec<EntityId> {
        T::table(self).sorted_ids()
    }

    /// Iterate over every `T` record (unspecified order).
    pub fn iter<T: Component>(&self) -> impl Iterator<Item = (EntityId, &T)> {
        T::table(self).iter()
    }

    /// Call `f` for every `T` record, allowing in-place mutation.
    pub fn for_each<T: Component>(&mut self, mut f: impl FnMut(EntityId, &mut T)) {
        for (id, value) in T::table_mut(self).iter_mut() {
            f(id, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Spacecraft, SpacecraftType};
    use crate::math::Vec2;
    use proptest::prelude::*;

    #[test]
    fn test_create_entity_starts_at_one() {
        let mut world = World::new();
        assert_eq!(world.create_entity(), 1);
        assert_eq!(world.create_entity(), 2);
        assert_eq!(world.entity_count(), 2);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut world = World::new();
        let a = world.create_entity();
        world.destroy_entity(a);
        let b = world.create_entity();
        assert_ne!(a, b);
    }

    #[test]
    fn test_add_get_overwrite() {
        let mut world = World::new();
        let id = world.create_entity();
        world.add_component(id, Position::new(Vec2::new(0.1, 0.2)));
        world.add_component(id, Position::new(Vec2::new(0.3, 0.4)));

        assert_eq!(world.count::<Position>(), 1);
        assert_eq!(world.get_component::<Position>(id).unwrap().value, Vec2::new(0.3, 0.4));
        assert!(world.has_component::<Position>(id));
        assert!(!world.has_component::<Health>(id));
    }

    #[test]
    fn test_destroy_removes_every_component() {
        let mut world = World::new();
        let id = world.create_entity();
        world.add_component(id, Position::new(Vec2::ZERO));
        world.add_component(id, Health::new(10));
        world.add_component(id, Spacecraft::new(SpacecraftType::Enemy));

        world.destroy_entity(id);

        assert_eq!(world.component_count(id), 0);
        assert!(!world.exists(id));
        assert!(world.get_component::<Health>(id).is_none());
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut world = World::new();
        let id = world.create_entity();
        world.destroy_entity(id);
        world.destroy_entity(id);
        world.destroy_entity(INVALID_ENTITY);
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn test_add_to_dead_entity_is_ignored() {
        let mut world = World::new();
        let id = world.create_entity();
        world.destroy_entity(id);
        world.add_component(id, Health::new(3));
        world.add_component(INVALID_ENTITY, Health::new(3));
        assert_eq!(world.count::<Health>(), 0);
    }

    #[test]
    fn test_remove_component_keeps_others_addressable() {
        let mut world = World::new();
        let ids: Vec<_> = (0..4).map(|_| world.create_entity()).collect();
        for (i, &id) in ids.iter().enumerate() {
            world.add_component(id, Health::new(i as i32 + 1));
        }

        let removed = world.remove_component::<Health>(ids[0]).unwrap();
        assert_eq!(removed.max_hp, 1);

        // The swapped-in record must still be found under its own id.
        for (i, &id) in ids.iter().enumerate().skip(1) {
            assert_eq!(world.get_component::<Health>(id).unwrap().max_hp, i as i32 + 1);
        }
        assert_eq!(world.ids::<Health>(), ids[1..].to_vec());
    }

    #[test]
    fn test_for_each_mutates_in_place() {
        let mut world = World::new();
        for _ in 0..3 {
            let id = world.create_entity();
            world.add_component(id, Health::new(10));
        }
        world.for_each::<Health>(|_, health| health.current_hp -= 4);
        assert!(world.iter::<Health>().all(|(_, h)| h.current_hp == 6));
    }

    proptest! {
        #[test]
        fn prop_destroyed_entities_leave_no_records(
            ops in proptest::collection::vec((0u8..3, 0usize..16), 1..64)
        ) {
            let mut world = World::new();
            let mut destroyed = Vec::new();
            let mut created = Vec::new();

            for (op, pick) in ops {
                match op {
                    0 => {
                        let id = world.create_entity();
                        world.add_component(id, Position::new(Vec2::ZERO));
                        world.add_component(id, Health::new(5));
                        created.push(id);
                    }
                    1 if !created.is_empty() => {
                        let id = created[pick % created.len()];
                        world.destroy_entity(id);
                        destroyed.push(id);
                    }
                    _ if !created.is_empty() => {
                        let id = created[pick % created.len()];
                        world.add_component(id, Selectable::default());
                    }
                    _ => {}
                }
            }

            for id in destroyed {
                prop_assert_eq!(world.component_count(id), 0);
                prop_assert!(!world.exists(id));
            }
        }
    }
}
