use bytemuck::{Pod, Zeroable};

use archetype_store::{
    cached_accessors, cached_copiers, cached_setters, component_info_of, register_component,
    BitSet, ChunkPool, EntityId, EntityManager, StoreError,
};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct Mass {
    kilograms: f32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
struct Charge {
    coulombs: f32,
}

fn entity(index: u32) -> EntityId {
    EntityId { index, generation: 0 }
}

fn mass_chunk(values: &[f32]) -> (archetype_store::ArchetypeChunk, archetype_store::ComponentTypeId) {
    let id = register_component::<Mass>().unwrap().id;
    let signature = BitSet::from_bits(&[id as usize]).unwrap();

    let mut pool = ChunkPool::new();
    let mut chunk = pool.rent(&signature, 16).unwrap();
    for (i, &kilograms) in values.iter().enumerate() {
        let slot = chunk.add_entity(entity(i as u32)).unwrap();
        chunk.set::<Mass>(id, slot, Mass { kilograms }).unwrap();
    }
    (chunk, id)
}

#[test]
fn accessor_tiers_agree_on_valid_slots() {
    let (chunk, id) = mass_chunk(&[1.0, 2.0, 3.0]);
    let accessors = cached_accessors::<Mass>();

    assert_eq!((accessors.raw)(&chunk, id, 1), Mass { kilograms: 2.0 });
    assert_eq!(
        (accessors.validated)(&chunk, id, 1).unwrap(),
        Mass { kilograms: 2.0 }
    );
    assert_eq!((accessors.or_default)(&chunk, id, 1), Mass { kilograms: 2.0 });
}

#[test]
fn validated_accessor_reports_bounds_and_presence() {
    let (chunk, id) = mass_chunk(&[1.0]);
    let accessors = cached_accessors::<Mass>();

    assert_eq!(
        (accessors.validated)(&chunk, id, 5),
        Err(StoreError::OutOfRange { index: 5, limit: 1 })
    );

    // Asking for a component the chunk does not carry.
    register_component::<Charge>().unwrap();
    let charge_accessors = cached_accessors::<Charge>();
    let charge_id = component_info_of::<Charge>().unwrap().id;
    assert!(matches!(
        (charge_accessors.validated)(&chunk, charge_id, 0),
        Err(StoreError::ComponentNotFound { .. })
    ));
}

#[test]
fn default_accessor_returns_zero_value_instead_of_failing() {
    let (chunk, _) = mass_chunk(&[1.0]);

    register_component::<Charge>().unwrap();
    let charge_id = component_info_of::<Charge>().unwrap().id;
    let accessors = cached_accessors::<Charge>();

    assert_eq!((accessors.or_default)(&chunk, charge_id, 0), Charge { coulombs: 0.0 });

    // Out-of-range slot also defaults rather than failing.
    let mass_accessors = cached_accessors::<Mass>();
    let (chunk, mass_id) = mass_chunk(&[1.0]);
    assert_eq!((mass_accessors.or_default)(&chunk, mass_id, 9), Mass { kilograms: 0.0 });
}

#[test]
fn setter_tiers_write_in_place() {
    let (mut chunk, id) = mass_chunk(&[1.0, 2.0]);
    let setters = cached_setters::<Mass>();

    (setters.raw)(&mut chunk, id, 0, Mass { kilograms: 10.0 });
    assert_eq!(chunk.get::<Mass>(id, 0).unwrap(), Mass { kilograms: 10.0 });

    (setters.validated)(&mut chunk, id, 1, Mass { kilograms: 20.0 }).unwrap();
    assert_eq!(chunk.get::<Mass>(id, 1).unwrap(), Mass { kilograms: 20.0 });

    assert_eq!(
        (setters.validated)(&mut chunk, id, 7, Mass { kilograms: 0.0 }),
        Err(StoreError::OutOfRange { index: 7, limit: 2 })
    );
}

#[test]
fn upsert_setter_adds_or_overwrites() {
    let mut manager = EntityManager::new();
    let entity = manager.create_entity().unwrap();
    let setters = cached_setters::<Mass>();

    // Missing component: upsert migrates the entity into the Mass archetype.
    (setters.upsert)(&mut manager, entity, Mass { kilograms: 1.5 }).unwrap();
    assert_eq!(
        manager.get_component::<Mass>(entity).unwrap(),
        Mass { kilograms: 1.5 }
    );

    // Present component: upsert sets in place.
    (setters.upsert)(&mut manager, entity, Mass { kilograms: 2.5 }).unwrap();
    assert_eq!(
        manager.get_component::<Mass>(entity).unwrap(),
        Mass { kilograms: 2.5 }
    );

    // Stale handle is the only failure surface.
    manager.destroy_entity(entity).unwrap();
    assert!(matches!(
        (setters.upsert)(&mut manager, entity, Mass { kilograms: 3.0 }),
        Err(StoreError::InvalidHandle(_))
    ));
}

#[test]
fn validated_copier_moves_values_between_chunks() {
    let (source, id) = mass_chunk(&[5.0, 6.0]);
    let (mut dest, _) = mass_chunk(&[0.0]);
    let copiers = cached_copiers::<Mass>();

    (copiers.validated)(id, &source, 1, &mut dest, 0).unwrap();
    assert_eq!(dest.get::<Mass>(id, 0).unwrap(), Mass { kilograms: 6.0 });

    assert_eq!(
        (copiers.validated)(id, &source, 9, &mut dest, 0),
        Err(StoreError::OutOfRange { index: 9, limit: 2 })
    );
}

#[test]
fn skipping_copier_silently_ignores_invalid_indices() {
    let (source, id) = mass_chunk(&[5.0, 6.0]);
    let (mut dest, _) = mass_chunk(&[42.0]);
    let copiers = cached_copiers::<Mass>();

    // Negative indices: no copy, no error, destination unchanged.
    (copiers.skipping)(id, &source, -1, &mut dest, 0);
    assert_eq!(dest.get::<Mass>(id, 0).unwrap(), Mass { kilograms: 42.0 });

    (copiers.skipping)(id, &source, 0, &mut dest, -1);
    assert_eq!(dest.get::<Mass>(id, 0).unwrap(), Mass { kilograms: 42.0 });

    // Out-of-range indices skip the same way.
    (copiers.skipping)(id, &source, 10, &mut dest, 0);
    (copiers.skipping)(id, &source, 0, &mut dest, 10);
    assert_eq!(dest.get::<Mass>(id, 0).unwrap(), Mass { kilograms: 42.0 });

    // Valid indices still copy.
    (copiers.skipping)(id, &source, 0, &mut dest, 0);
    assert_eq!(dest.get::<Mass>(id, 0).unwrap(), Mass { kilograms: 5.0 });
}

#[test]
fn cached_sets_return_identical_function_pointers() {
    let first = cached_accessors::<Mass>();
    let second = cached_accessors::<Mass>();

    // Generate-once: every lookup observes the same generated functions.
    assert_eq!(first.raw as usize, second.raw as usize);
    assert_eq!(first.validated as usize, second.validated as usize);
    assert_eq!(first.or_default as usize, second.or_default as usize);
}
