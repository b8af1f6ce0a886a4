use bytemuck::{Pod, Zeroable};

use archetype_store::{
    component_info_of, register_component, BitSet, ChunkPool, EntityId, EntityManager, StoreError,
};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct Marker {
    tag: u64,
}

fn marker_signature() -> BitSet {
    let id = register_component::<Marker>().unwrap().id as usize;
    BitSet::from_bits(&[id]).unwrap()
}

fn entity(index: u32) -> EntityId {
    EntityId { index, generation: 0 }
}

#[test]
fn chunk_fills_to_capacity_then_rejects() {
    let signature = marker_signature();
    let id = component_info_of::<Marker>().unwrap().id;

    let mut pool = ChunkPool::new();
    let mut chunk = pool.rent(&signature, 8).unwrap();

    for i in 0..8 {
        let slot = chunk.add_entity(entity(i)).unwrap();
        assert_eq!(slot as u32, i);
        chunk.set::<Marker>(id, slot, Marker { tag: i as u64 }).unwrap();
    }
    assert!(chunk.is_full());

    assert_eq!(
        chunk.add_entity(entity(99)),
        Err(StoreError::CapacityExceeded { cap: 8 })
    );
}

#[test]
fn swap_remove_preserves_dense_region() {
    let signature = marker_signature();
    let id = component_info_of::<Marker>().unwrap().id;

    let mut pool = ChunkPool::new();
    let mut chunk = pool.rent(&signature, 16).unwrap();

    for i in 0..6 {
        let slot = chunk.add_entity(entity(i)).unwrap();
        chunk.set::<Marker>(id, slot, Marker { tag: 100 + i as u64 }).unwrap();
    }

    // Remove an interior slot: the last row must move into it.
    let displaced = chunk.remove_at(1).unwrap();
    assert_eq!(displaced, Some(entity(5)));
    assert_eq!(chunk.count(), 5);
    assert_eq!(chunk.entity_at(1).unwrap(), entity(5));
    assert_eq!(chunk.get::<Marker>(id, 1).unwrap(), Marker { tag: 105 });

    // Remove the (current) last slot: nothing moves.
    let displaced = chunk.remove_at(4).unwrap();
    assert_eq!(displaced, None);
    assert_eq!(chunk.count(), 4);

    // Every slot in [0, count) still resolves; [count, capacity) does not.
    for slot in 0..chunk.count() {
        chunk.get::<Marker>(id, slot).unwrap();
        chunk.entity_at(slot).unwrap();
    }
    assert!(matches!(
        chunk.get::<Marker>(id, chunk.count()),
        Err(StoreError::OutOfRange { .. })
    ));
    assert!(chunk.entity_at(chunk.count()).is_err());
}

#[test]
fn density_holds_under_interleaved_adds_and_removes() {
    let signature = marker_signature();
    let id = component_info_of::<Marker>().unwrap().id;

    let mut pool = ChunkPool::new();
    let mut chunk = pool.rent(&signature, 32).unwrap();
    let mut next = 0u32;

    for round in 0..10 {
        for _ in 0..5 {
            let slot = chunk.add_entity(entity(next)).unwrap();
            chunk.set::<Marker>(id, slot, Marker { tag: next as u64 }).unwrap();
            next += 1;
        }
        // Remove from the front to force swaps every round.
        for _ in 0..3 {
            chunk.remove_at(0).unwrap();
        }
        assert_eq!(chunk.count(), (round + 1) * 2);

        // The dense region stays consistent: stored tags match entity ids.
        for slot in 0..chunk.count() {
            let row_entity = chunk.entity_at(slot).unwrap();
            let marker = chunk.get::<Marker>(id, slot).unwrap();
            assert_eq!(marker.tag, row_entity.index as u64);
        }
    }
}

#[test]
fn column_bytes_cover_exactly_the_dense_region() {
    let signature = marker_signature();
    let id = component_info_of::<Marker>().unwrap().id;

    let mut pool = ChunkPool::new();
    let mut chunk = pool.rent(&signature, 16).unwrap();
    for i in 0..5 {
        let slot = chunk.add_entity(entity(i)).unwrap();
        chunk.set::<Marker>(id, slot, Marker { tag: i as u64 }).unwrap();
    }

    let slice = chunk.column_slice::<Marker>(id).unwrap();
    assert_eq!(slice.len(), 5);
    assert_eq!(slice[4], Marker { tag: 4 });
}

#[test]
fn migrations_spill_into_multiple_chunks() {
    // Tiny chunks force the manager to grow the chunk list.
    let mut manager = EntityManager::with_chunk_capacity(4);

    let entities: Vec<_> = (0..10)
        .map(|i| {
            let entity = manager.create_entity().unwrap();
            manager.add_component(entity, Marker { tag: i as u64 }).unwrap();
            entity
        })
        .collect();

    let mask = marker_signature();
    assert_eq!(manager.entities_with(&mask).len(), 10);

    // Spot-check values survived migration into chunked storage.
    for (i, &entity) in entities.iter().enumerate() {
        assert_eq!(
            manager.get_component::<Marker>(entity).unwrap(),
            Marker { tag: i as u64 }
        );
    }

    // Destroy half and confirm the rest still resolve correctly.
    for &entity in entities.iter().step_by(2) {
        manager.destroy_entity(entity).unwrap();
    }
    for (i, &entity) in entities.iter().enumerate() {
        if i % 2 == 0 {
            assert!(!manager.is_alive(entity));
        } else {
            assert_eq!(
                manager.get_component::<Marker>(entity).unwrap(),
                Marker { tag: i as u64 }
            );
        }
    }
}
