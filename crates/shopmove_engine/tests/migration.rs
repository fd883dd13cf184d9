//! End-to-end runs of the engine against the testkit catalog and destination.

use serde_json::json;
use shopmove_engine::{
    DestinationFault, EngineConfig, ImageTarget, MigrationEngine, MigrationError, Settings,
    TaskPayload, TaskType, TickStatus,
};
use shopmove_storage::TypedStore;
use shopmove_testkit::prelude::*;
use std::collections::BTreeMap;

fn simple_products(count: u64) -> MemoryCatalog {
    let mut builder = MemoryCatalog::builder();
    for id in 1..=count {
        builder = builder.product(id, &format!("Product {id}"), None, None, &[]);
    }
    builder.build()
}

#[test]
fn seven_tasks_take_two_ticks() {
    init_tracing();
    let engine = MigrationEngine::new(memory_store(), simple_products(7), RecordingDestination::new());
    engine.initiate(Settings::default()).unwrap();

    let first = engine.tick().unwrap();
    assert_eq!(first.status, TickStatus::InProgress);
    assert_eq!(first.current, 5);
    assert_eq!(first.total, 7);
    assert_eq!(first.success, vec![TaskType::CreateProduct; 5]);
    assert_eq!(engine.state().unwrap().unwrap().current_index, 5);

    let second = engine.tick().unwrap();
    assert_eq!(second.status, TickStatus::Complete);
    assert_eq!(second.current, 7);
    assert_eq!(second.success.len(), 2);

    assert!(engine.is_catalog_imported().unwrap());
    assert_eq!(engine.destination().count(CallKind::CreateProduct), 7);
}

#[test]
fn quota_fault_short_circuits_later_tasks_of_same_type() {
    init_tracing();
    let mut builder = MemoryCatalog::builder();
    for id in 1..=10 {
        builder = builder.category(id, None, &format!("Category {id}"), None);
    }
    let catalog = builder.product(1, "Mug", None, None, &[]).build();
    let destination = RecordingDestination::new();
    destination.fail_call(2, DestinationFault::api(402, Some("categories limit".into())));

    let engine = MigrationEngine::new(memory_store(), catalog, destination);
    engine.initiate(Settings::default()).unwrap();

    let first = engine.tick().unwrap();
    assert_eq!(first.success, vec![TaskType::CreateCategory; 2]);
    assert_eq!(first.error, vec![TaskType::CreateCategory; 3]);
    assert_eq!(first.plan_limit_hit.len(), 2);
    assert_eq!(
        first.error_messages[&TaskType::CreateCategory]["categories limit"],
        1
    );

    let second = engine.tick().unwrap();
    assert_eq!(second.plan_limit_hit, vec![TaskType::CreateCategory; 5]);
    assert!(second.error_messages.is_empty());

    let third = engine.tick().unwrap();
    assert!(third.is_complete());
    assert_eq!(third.success, vec![TaskType::CreateProduct]);

    // Only the first three category creates were sent
    assert_eq!(engine.destination().count(CallKind::CreateCategory), 3);
    let state = engine.state().unwrap().unwrap();
    assert_eq!(state.tasks[9].error.as_deref(), Some("plan limit reached"));
    assert!(state.rate_limited.contains(&TaskType::CreateCategory));
    assert!(!state.rate_limited.contains(&TaskType::CreateProduct));
}

#[test]
fn breaker_is_cleared_by_initiate() {
    let catalog = MemoryCatalog::builder().category(1, None, "A", None).build();
    let destination = RecordingDestination::new();
    destination.fail_call(0, DestinationFault::api(402, None));

    let engine = MigrationEngine::new(memory_store(), catalog, destination);
    engine.initiate(Settings::default()).unwrap();
    engine.tick().unwrap();
    assert!(!engine.state().unwrap().unwrap().rate_limited.is_empty());

    engine.initiate(Settings::default()).unwrap();
    assert!(engine.state().unwrap().unwrap().rate_limited.is_empty());
    assert_eq!(engine.tick().unwrap().success, vec![TaskType::CreateCategory]);
}

#[test]
fn demo_only_destination_is_cleared_first() {
    let destination = RecordingDestination::new().with_demo_products(3);
    let demo_ids = destination.product_ids();
    let engine = MigrationEngine::new(memory_store(), simple_products(2), destination);

    let plan = engine.initiate(Settings::default().with_delete_demo(false)).unwrap();
    assert!(plan.settings.delete_demo_catalog);

    let state = engine.state().unwrap().unwrap();
    assert_eq!(
        state.tasks[0].task,
        TaskPayload::DeleteProducts(shopmove_engine::task::DeletePayload { ids: demo_ids.clone() })
    );

    run_to_completion(&engine, 5);
    let remaining = engine.destination().product_ids();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|id| !demo_ids.contains(id)));
}

#[test]
fn large_destination_is_not_probed_for_demo_items() {
    let destination = RecordingDestination::new()
        .with_demo_products(2)
        .with_products(3);
    let config = EngineConfig::new().with_demo_probe_limit(4);
    let engine = MigrationEngine::with_config(config, memory_store(), simple_products(1), destination);

    let plan = engine.initiate(Settings::default().with_delete_demo(true)).unwrap();
    assert!(!plan.by_type.contains_key(&TaskType::DeleteProducts));
}

#[test]
fn resumes_in_a_new_process() {
    init_tracing();
    let store = TempStore::new();
    let catalog = simple_products(7);
    let destination = RecordingDestination::new();

    {
        let engine = MigrationEngine::new(store.handle(), &catalog, &destination);
        engine.initiate(Settings::default()).unwrap();
        assert_eq!(engine.tick().unwrap().current, 5);
    }

    let engine = MigrationEngine::new(store.reopen(), &catalog, &destination);
    assert!(engine.has_begun().unwrap());
    let report = engine.proceed().unwrap();

    assert!(report.is_complete());
    assert_eq!(report.success.len(), 2);
    assert_eq!(destination.count(CallKind::CreateProduct), 7);
}

#[test]
fn replayed_batch_does_not_duplicate_creates() {
    let store = memory_store();
    let engine = MigrationEngine::new(store.clone(), simple_products(7), RecordingDestination::new());
    engine.initiate(Settings::default()).unwrap();
    engine.tick().unwrap();

    // Crash before the position was saved
    store.set_value("importer.current_task", &0usize).unwrap();

    let replay = engine.tick().unwrap();
    assert_eq!(replay.success.len(), 5);
    assert_eq!(engine.destination().count(CallKind::CreateProduct), 5);

    run_to_completion(&engine, 2);
    assert_eq!(engine.destination().count(CallKind::CreateProduct), 7);
}

#[test]
fn ticks_after_completion_do_nothing() {
    let engine = MigrationEngine::new(memory_store(), simple_products(3), RecordingDestination::new());
    engine.initiate(Settings::default()).unwrap();
    run_to_completion(&engine, 1);
    let calls = engine.destination().calls();

    for _ in 0..3 {
        let report = engine.tick().unwrap();
        assert!(report.is_complete());
        assert_eq!(report.executed(), 0);
    }
    assert_eq!(engine.destination().calls(), calls);
    assert!(engine.has_begun().unwrap());
}

#[test]
fn update_by_sku_from_raw_settings() {
    let catalog = MemoryCatalog::builder()
        .product(1, "Mug", Some("MUG-1"), None, &[])
        .product(2, "Cup", Some("CUP-1"), None, &[])
        .build();
    let destination = RecordingDestination::new().with_existing_sku("MUG-1", 77);
    let engine = MigrationEngine::new(memory_store(), catalog, destination);

    let raw: BTreeMap<String, serde_json::Value> = BTreeMap::from([
        ("update-by-sku".to_string(), json!("1")),
        ("import-orders".to_string(), json!(true)),
    ]);
    let settings = Settings::normalize(&raw);
    engine.initiate(settings).unwrap();
    run_to_completion(&engine, 1);

    assert_eq!(engine.get_mapped_product_id(1).unwrap(), Some(77));
    assert_eq!(engine.destination().count(CallKind::UpdateProduct), 1);
    assert_eq!(engine.destination().count(CallKind::CreateProduct), 1);
}

#[test]
fn full_catalog_with_images_and_variations() {
    let catalog = MemoryCatalog::builder()
        .category(1, None, "Clothes", Some(500))
        .category(2, Some(1), "Shirts", None)
        .product(1, "Tee", Some("TEE"), Some(600), &[2])
        .gallery(1, &[601, 602])
        .variation(1, 1, Some(600))
        .variation(1, 2, Some(700))
        .build();
    let engine = MigrationEngine::new(memory_store(), catalog, RecordingDestination::new());

    let plan = engine.initiate(Settings::default()).unwrap();
    assert_eq!(plan.total_tasks, 10);
    let reports = run_to_completion(&engine, 3);
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.error.is_empty()));

    let destination = engine.destination();
    assert_eq!(destination.count(CallKind::CreateCategory), 2);
    assert_eq!(destination.count(CallKind::CreateVariation), 2);
    assert_eq!(destination.count(CallKind::UploadImage), 5);

    let product = engine.get_mapped_product_id(1).unwrap().unwrap();
    let variation = engine.mapping().get_mapped_variation_id(1, 2).unwrap().unwrap();
    assert!(destination.calls().iter().any(|call| matches!(
        call,
        DestinationCall::UploadImage(ImageTarget::Variation { product: p, variation: v }, _)
            if *p == product && *v == variation
    )));

    // The product landed in the migrated subcategory
    let shirts = engine.get_mapped_category_id(2).unwrap().unwrap();
    assert!(destination.calls().iter().any(|call| matches!(
        call,
        DestinationCall::CreateProduct(p) if p.category_ids == vec![shirts]
    )));
}

#[test]
fn source_outage_fails_tasks_not_the_run() {
    let engine = MigrationEngine::new(memory_store(), simple_products(3), RecordingDestination::new());
    engine.initiate(Settings::default()).unwrap();

    engine.catalog().set_unavailable(true);
    let report = engine.tick().unwrap();

    assert!(report.is_complete());
    assert_eq!(report.error.len(), 3);
    assert_eq!(
        report.error_messages[&TaskType::CreateProduct]["source catalog unavailable"],
        3
    );
}

#[test]
fn missing_image_bytes_are_skipped() {
    let catalog = MemoryCatalog::builder()
        .product(1, "Tee", None, Some(600), &[])
        .without_image_bytes(600)
        .build();
    let engine = MigrationEngine::new(memory_store(), catalog, RecordingDestination::new());
    engine.initiate(Settings::default()).unwrap();

    let report = engine.tick().unwrap();
    assert_eq!(report.success, vec![TaskType::CreateProduct]);
    assert_eq!(report.error, vec![TaskType::UploadProductImage]);
    assert_eq!(engine.destination().count(CallKind::UploadImage), 0);
}

#[test]
fn catalog_summary_reflects_both_sides() {
    let catalog = MemoryCatalog::builder()
        .category(1, None, "A", None)
        .category(2, None, "Uncategorized", None)
        .default_category(2)
        .product(1, "Mug", None, None, &[])
        .build();
    let destination = RecordingDestination::new().with_demo_products(2);
    let engine = MigrationEngine::new(memory_store(), catalog, destination);

    let summary = engine.catalog_summary().unwrap();
    assert_eq!(summary.source_categories, 1);
    assert_eq!(summary.source_products, 1);
    assert_eq!(summary.destination_products, 2);
    assert_eq!(summary.demo_products, 2);
}

#[test]
fn tick_before_initiate_fails() {
    let engine = MigrationEngine::new(memory_store(), simple_products(1), RecordingDestination::new());
    assert!(!engine.has_begun().unwrap());
    assert!(matches!(engine.tick(), Err(MigrationError::NotInitiated)));
}

#[test]
fn empty_plan_completes_on_first_tick() {
    let engine = MigrationEngine::new(
        memory_store(),
        MemoryCatalog::builder().build(),
        RecordingDestination::new(),
    );
    engine.initiate(Settings::default()).unwrap();

    let report = engine.tick().unwrap();
    assert!(report.is_complete());
    assert_eq!(report.total, 0);
    assert!(engine.is_catalog_imported().unwrap());
}

#[test]
fn completed_run_leaves_store_untouched() {
    let store = memory_store();
    let engine = MigrationEngine::new(store.clone(), simple_products(2), RecordingDestination::new());
    engine.initiate(Settings::default()).unwrap();
    engine.tick().unwrap();

    let before = store.snapshot();
    assert!(engine.tick().unwrap().is_complete());
    assert_eq!(store.snapshot(), before);
}

#[test]
fn failures_are_attached_and_run_continues() {
    let destination = RecordingDestination::new();
    destination.fail_next(DestinationFault::api(400, Some("invalid price".into())));
    let engine = MigrationEngine::new(memory_store(), simple_products(2), destination);
    engine.initiate(Settings::default()).unwrap();

    let report = engine.tick().unwrap();
    assert!(report.is_complete());
    assert_eq!(report.error_messages[&TaskType::CreateProduct]["invalid price"], 1);

    let state = engine.state().unwrap().unwrap();
    assert_eq!(state.tasks[0].error.as_deref(), Some("invalid price"));
    assert_eq!(state.tasks[1].error, None);
    assert_eq!(state.failed_tasks().count(), 1);
}

#[test]
fn mixed_destination_keeps_caller_choice() {
    let destination = RecordingDestination::new()
        .with_demo_products(1)
        .with_products(4);
    let engine = MigrationEngine::new(memory_store(), simple_products(1), destination);

    let plan = engine.initiate(Settings::default()).unwrap();
    assert!(!plan.settings.delete_demo_catalog);
    assert!(!plan.by_type.contains_key(&TaskType::DeleteProducts));
}

#[test]
fn initiate_resets_previous_run() {
    let engine = MigrationEngine::new(memory_store(), simple_products(1), RecordingDestination::new());
    engine.initiate(Settings::default()).unwrap();
    engine.tick().unwrap();
    assert!(engine.get_mapped_product_id(1).unwrap().is_some());

    engine.initiate(Settings::default()).unwrap();
    assert_eq!(engine.get_mapped_product_id(1).unwrap(), None);
    assert!(!engine.is_catalog_imported().unwrap());
    assert_eq!(engine.tick().unwrap().success, vec![TaskType::CreateProduct]);
}

#[test]
fn position_past_the_end_is_corrupt_state() {
    let store = memory_store();
    let engine = MigrationEngine::new(store.clone(), simple_products(1), RecordingDestination::new());
    engine.initiate(Settings::default()).unwrap();
    store.set_value("importer.current_task", &9usize).unwrap();

    assert!(matches!(engine.tick(), Err(MigrationError::CorruptState(_))));
}

#[test]
fn categories_are_left_out_when_destination_lacks_them() {
    let catalog = MemoryCatalog::builder()
        .category(1, None, "Shoes", Some(5))
        .product(1, "Boot", None, None, &[1])
        .build();
    let engine = MigrationEngine::new(
        memory_store(),
        catalog,
        RecordingDestination::new().without_categories(),
    );

    let plan = engine.initiate(Settings::default()).unwrap();
    assert_eq!(plan.total_tasks, 1);
    run_to_completion(&engine, 1);
    assert_eq!(engine.destination().count(CallKind::CreateCategory), 0);
    assert_eq!(engine.destination().count(CallKind::CreateProduct), 1);
}
