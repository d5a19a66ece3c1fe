use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use slotguard::{
    cli::args_from_env,
    config::Config,
    logging::init_tracing,
    schedule::{
        ImportBatch, ScheduleFacade, SnapshotPersistence, TracingAuditSink,
        assert_schedule_invariants,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = args_from_env()?;
    let config = Config::load(&args.config_path)
        .with_context(|| format!("failed to load config from {}", args.config_path.display()))?;
    let _logging = init_tracing(&config.logging)?;

    let persistence = SnapshotPersistence::new(config.store.state_path.clone());
    let snapshot = persistence
        .load()
        .context("failed to load schedule snapshot")?
        .unwrap_or_default();
    let facade = ScheduleFacade::from_snapshot(
        snapshot,
        &config.engine,
        Arc::new(TracingAuditSink),
    );

    if let Some(import_path) = &args.import_path {
        let batch = read_import_batch(import_path)?;
        let report = facade
            .import_assignments(batch)
            .await
            .context("import failed")?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    let unresolved = facade.list_unresolved_conflicts().await?;
    println!("{}", serde_json::to_string_pretty(&unresolved)?);

    let current = facade.snapshot().await?;
    if let Err(err) = assert_schedule_invariants(&current.assignments) {
        tracing::warn!(
            target: "coordinator",
            unresolved = unresolved.len(),
            error = %err,
            "schedule_has_double_bookings"
        );
    }

    persistence
        .save(&current)
        .context("failed to save schedule snapshot")?;
    tracing::info!(
        target: "persistence",
        path = %persistence.path().display(),
        "shutdown_complete"
    );
    Ok(())
}

fn read_import_batch(path: &Path) -> Result<ImportBatch> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    json5::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
