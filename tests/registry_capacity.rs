use archetype_store::{register_raw, registered_count, reset_components_for_tests, StoreError, MAX_COMPONENT_TYPES};

// Single test on purpose: it owns the process-wide registry for this binary.
#[test]
fn registry_assigns_full_id_range_then_exhausts() {
    reset_components_for_tests();

    for expected_id in 0..MAX_COMPONENT_TYPES {
        let name: &'static str = Box::leak(format!("synthetic_component_{expected_id}").into_boxed_str());
        let info = register_raw(name, 8, 8).unwrap();
        assert_eq!(info.id as usize, expected_id);
    }
    assert_eq!(registered_count(), MAX_COMPONENT_TYPES);

    // Re-registering an existing name stays idempotent at full capacity.
    let again = register_raw("synthetic_component_0", 8, 8).unwrap();
    assert_eq!(again.id, 0);

    let overflow = register_raw("one_type_too_many", 8, 8);
    assert_eq!(
        overflow,
        Err(StoreError::RegistryExhausted {
            cap: MAX_COMPONENT_TYPES
        })
    );
}
