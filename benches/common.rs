#![allow(dead_code)]

use bytemuck::{Pod, Zeroable};

use archetype_store::{EntityManager, StoreResult};

pub const ENTITIES_SMALL: usize = 10_000;
pub const ENTITIES_MED: usize = 100_000;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

pub fn setup_store(entity_count: usize) -> StoreResult<EntityManager> {
    let mut manager = EntityManager::new();

    for i in 0..entity_count {
        let entity = manager.create_entity()?;
        manager.add_component(entity, Position { x: i as f32, y: 0.0 })?;
        manager.add_component(entity, Velocity { dx: 0.5, dy: 1.0 })?;
    }

    Ok(manager)
}
