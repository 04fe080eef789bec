// Integration tests for training data collection and model versioning

use anyhow::Result;
use honeyduo::config::ProjectPaths;
use honeyduo::family::Member;
use honeyduo::training::{load_json_array, ModelVersionManager, TrainingCollector, TrainingParams};

#[test]
fn test_collected_examples_flow_into_summary_and_dataset() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let paths = ProjectPaths::new(dir.path());
    let collector = TrainingCollector::new(paths.training_dir())?;

    let code = "try:\n    place_order()\nexcept Exception as e:\n    log(e)\n";
    collector.collect_code_example(code, "Order placement", "trading", "Never crash on a bad fill", &[])?;
    collector.collect_code_example("def risk(): pass", "Risk stub", "risk", "", &["stub".into()])?;
    collector.collect_code_example("def risk2(): pass", "Risk stub 2", "risk", "", &[])?;

    let summary = collector.generate_training_summary()?;
    assert_eq!(summary.total_examples, 3);
    assert_eq!(summary.categories.get("risk"), Some(&2));
    assert!(paths.training_dir().join("training_summary.json").exists());

    let trading = load_json_array(
        &paths
            .training_dir()
            .join("code_examples")
            .join("trading_examples.json"),
    );
    assert_eq!(trading.len(), 1);
    assert!(trading[0]["file_pattern"]
        .as_array()
        .is_some_and(|p| !p.is_empty()));

    let versions = ModelVersionManager::new(paths)?;
    let (dataset, rows) = versions.prepare_dataset(Member::Claudae)?;
    assert_eq!(rows, 3);
    assert!(dataset.exists());
    Ok(())
}

#[test]
fn test_other_records_land_in_their_own_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let collector = TrainingCollector::new(dir.path().join("training"))?;

    collector.collect_architecture_decision(
        "SQLite for metrics",
        &["CSV files".into()],
        "Single file, indexed by time",
        "Simple pruning",
    )?;
    let debug = collector.collect_debugging_solution(
        "Ollama timeout on first call",
        "first request hangs",
        "Preload models",
        "Keep models resident",
    )?;
    collector.collect_system_pattern("retry", "Retry with backoff", "", "Flaky IO")?;

    assert_eq!(
        load_json_array(&dir.path().join("training/architecture_decisions/decisions.json")).len(),
        1
    );
    assert_eq!(
        load_json_array(&dir.path().join("training/debugging_solutions/solutions.json")).len(),
        1
    );
    assert_eq!(
        load_json_array(&dir.path().join("training/system_patterns/patterns.json")).len(),
        1
    );
    assert!(!debug.component.is_empty());
    Ok(())
}

#[test]
fn test_version_lifecycle_with_rollback() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let versions = ModelVersionManager::new(ProjectPaths::new(dir.path()))?;

    let v1 = versions.create_version(Member::Deon, "llama3.2:1b", "first cut")?;
    let v2 = versions.create_version(Member::Deon, "llama3.2:1b", "second cut")?;
    assert_eq!((v1.version.as_str(), v2.version.as_str()), ("v1", "v2"));

    let plan = versions.train(Member::Deon, "v2", TrainingParams::default())?;
    assert_eq!(plan.params.epochs, 3);
    assert_eq!(versions.load_metadata(Member::Deon, "v2")?.training_data_size, plan.examples);

    assert!(versions.rollback(Member::Deon, None).is_err());

    versions.deploy(Member::Deon, "v1")?;
    versions.deploy(Member::Deon, "v2")?;
    assert_eq!(versions.rollback(Member::Deon, None)?, "v1");
    assert_eq!(versions.deployments(Member::Deon).len(), 3);

    let status = versions.status(Some(Member::Deon))?;
    let deon = &status[&Member::Deon];
    assert_eq!(deon.total_versions, 2);
    assert_eq!(deon.latest_version.as_deref(), Some("v2"));
    assert_eq!(deon.production_status, "Deployed");
    Ok(())
}

#[test]
fn test_deploy_unknown_version_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let versions = ModelVersionManager::new(ProjectPaths::new(dir.path()))?;
    assert!(versions.deploy(Member::Nyala, "v9").is_err());
    assert_eq!(
        versions.status(None)?[&Member::Nyala].production_status,
        "Not Deployed"
    );
    Ok(())
}
