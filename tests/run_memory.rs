use doctype_prune::config::Config;
use doctype_prune::driver::{RunOutcome, execute, run};
use doctype_prune::error::Error;
use doctype_prune::execution::ExecutionMethod;
use doctype_prune::memory::MemoryRepository;
use doctype_prune::model::{DocumentType, EntityKind, Property};
use doctype_prune::stats::Category;

fn seeded() -> MemoryRepository {
    let repo = MemoryRepository::new();
    for name in ["A", "B", "C", "OIT_OldDocID", "OIT_Legacy"] {
        repo.insert_property(Property::named(name));
    }
    repo.insert_doc_type(DocumentType::new(
        "Invoice",
        vec![Property::named("A"), Property::named("OIT_OldDocID"), Property::named("B")],
    ));
    repo.insert_doc_type(DocumentType::new("Receipt", vec![Property::named("C")]));
    repo.insert_doc_type(DocumentType::new("Empty", Vec::new()));
    repo.insert_doc_type(DocumentType::new(
        "Contract",
        vec![Property::named("OIT_Legacy"), Property::named("A"), Property::named("OIT_OldDocID")],
    ));
    repo
}

fn cfg(dry_run: bool, doc_types: &[&str]) -> Config {
    Config {
        dry_run,
        doc_types: doc_types.iter().map(|s| s.to_string()).collect(),
        remove_props: vec!["OIT_OldDocID".into(), "OIT_Legacy".into()],
        ..Config::default()
    }
}

fn names(dt: &DocumentType) -> Vec<&str> {
    dt.props.iter().map(|p| p.name.as_str()).collect()
}

#[tokio::test]
async fn live_run_updates_only_changed_doc_types() {
    let repo = seeded();
    let report = run(&cfg(false, &["Invoice", "Receipt", "Empty", "Contract"]), &repo)
        .await
        .expect("run");

    assert!(report.is_completed());
    assert_eq!(report.stats.get(Category::Updated), 2);
    assert_eq!(report.stats.get(Category::NoChanges), 2);
    assert_eq!(report.stats.get(Category::DryRunUpdated), 0);
    assert_eq!(repo.updates(), vec!["Invoice".to_string(), "Contract".to_string()]);
    assert_eq!(names(&repo.doc_type("Invoice").unwrap()), vec!["A", "B"]);
    assert_eq!(names(&repo.doc_type("Contract").unwrap()), vec!["A"]);
    assert_eq!(names(&repo.doc_type("Receipt").unwrap()), vec!["C"]);
}

#[tokio::test]
async fn second_live_run_finds_nothing_to_do() {
    let repo = seeded();
    let cfg = cfg(false, &["Invoice", "Contract"]);
    run(&cfg, &repo).await.expect("first run");
    let report = run(&cfg, &repo).await.expect("second run");
    assert_eq!(report.stats.get(Category::NoChanges), 2);
    assert_eq!(report.stats.get(Category::Updated), 0);
    assert_eq!(repo.updates().len(), 2);
}

#[tokio::test]
async fn dry_run_never_writes() {
    let repo = seeded();
    let report = run(&cfg(true, &["Invoice", "Receipt", "Contract"]), &repo)
        .await
        .expect("run");

    assert!(report.is_completed());
    assert_eq!(report.stats.get(Category::DryRunUpdated), 2);
    assert_eq!(report.stats.get(Category::NoChanges), 1);
    assert_eq!(report.stats.get(Category::Updated), 0);
    assert!(repo.updates().is_empty());
    assert_eq!(names(&repo.doc_type("Invoice").unwrap()), vec!["A", "OIT_OldDocID", "B"]);
}

#[tokio::test]
async fn unknown_doc_type_aborts_before_any_update() {
    let repo = seeded();
    let report = run(&cfg(false, &["Invoice", "Unknown"]), &repo)
        .await
        .expect("run");

    match &report.outcome {
        RunOutcome::Aborted(Error::NotFound { kind, name }) => {
            assert_eq!(*kind, EntityKind::DocumentType);
            assert_eq!(name, "Unknown");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(report.stats.total(), 0);
    assert!(repo.updates().is_empty());
    assert_eq!(names(&repo.doc_type("Invoice").unwrap()), vec!["A", "OIT_OldDocID", "B"]);
}

#[tokio::test]
async fn unknown_property_aborts_before_any_update() {
    let repo = seeded();
    let mut cfg = cfg(false, &["Invoice"]);
    cfg.remove_props.push("NoSuchProperty".into());
    let report = run(&cfg, &repo).await.expect("run");
    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted(Error::NotFound { kind: EntityKind::Property, .. })
    ));
    assert!(repo.updates().is_empty());
}

#[tokio::test]
async fn failed_update_is_counted_and_processing_continues() {
    let repo = seeded();
    repo.fail_updates_for("Invoice");
    let report = run(&cfg(false, &["Invoice", "Contract"]), &repo)
        .await
        .expect("run");

    assert!(report.is_completed());
    assert_eq!(report.stats.get(Category::UpdateErrors), 1);
    assert_eq!(report.stats.get(Category::Updated), 1);
    assert_eq!(repo.updates(), vec!["Contract".to_string()]);
    assert_eq!(names(&repo.doc_type("Invoice").unwrap()), vec!["A", "OIT_OldDocID", "B"]);
}

#[tokio::test]
async fn disallowed_execution_method_is_rejected_before_opening_the_repository() {
    let missing = std::env::temp_dir().join("doctype_prune_never_created.json");
    let mut cfg = cfg(false, &["Invoice"]);
    cfg.snapshot = Some(missing.clone());
    // an unreachable backend must not mask the configuration error
    cfg.postgres_url = Some("postgres://nobody@127.0.0.1:1/none".into());

    let err = execute(&cfg, ExecutionMethod::Workflow)
        .await
        .expect_err("should be rejected");
    assert!(matches!(err, Error::ExecutionMethod { actual: ExecutionMethod::Workflow, .. }));
    assert!(err.is_fatal_config());
    assert!(!missing.exists());
}

#[tokio::test]
async fn allowed_execution_method_reaches_the_repository() {
    let missing = std::env::temp_dir().join("doctype_prune_never_created.json");
    let mut cfg = cfg(false, &["Invoice"]);
    cfg.snapshot = Some(missing);
    let err = execute(&cfg, ExecutionMethod::Intool)
        .await
        .expect_err("snapshot is missing");
    assert!(err.to_string().contains("doctype_prune_never_created.json"));
    assert!(!err.is_fatal_config());
}

#[tokio::test]
async fn repository_failure_during_validation_is_unexpected_and_writes_nothing() {
    let repo = seeded();
    repo.fail_lookups_for("Contract");
    let err = run(&cfg(false, &["Invoice", "Contract"]), &repo)
        .await
        .expect_err("lookup failure must surface");
    assert!(matches!(err, Error::Msg(_)));
    assert!(!err.is_fatal_config());
    assert!(repo.updates().is_empty());
    assert_eq!(names(&repo.doc_type("Invoice").unwrap()), vec!["A", "OIT_OldDocID", "B"]);
}

#[tokio::test]
async fn empty_target_list_completes_with_no_counts() {
    let repo = seeded();
    let report = run(&cfg(false, &[]), &repo).await.expect("run");
    assert!(report.is_completed());
    assert_eq!(report.stats.total(), 0);
}
