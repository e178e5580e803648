use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::analyze::RUN_MANIFEST_PREFIX;
use crate::commands::ingest::CATALOG_MANIFEST_FILE;
use crate::ledger::{LEDGER_FILE, latest_for_target, ledger_counts, open_ledger};
use crate::model::{AnalysisRunManifest, CatalogManifest};

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let catalog_manifest_path = manifest_dir.join(CATALOG_MANIFEST_FILE);
    let ledger_path = args.cache_root.join(LEDGER_FILE);

    info!(cache_root = %args.cache_root.display(), "status requested");

    if catalog_manifest_path.exists() {
        let manifest: CatalogManifest = read_json(&catalog_manifest_path)?;
        info!(
            source = %manifest.source_path,
            source_sha256 = %manifest.source_sha256,
            generated_at = %manifest.generated_at,
            records = manifest.counts.record_count,
            brands = manifest.counts.brand_count,
            categories = manifest.counts.category_count,
            duplicates = manifest.counts.duplicate_id_count,
            pass_through = %manifest.pass_through_columns.join(","),
            missing = %manifest.missing_columns.join(","),
            "loaded catalog manifest"
        );
    } else {
        warn!(path = %catalog_manifest_path.display(), "catalog manifest missing");
    }

    match latest_run_manifest(&manifest_dir)? {
        Some(path) => {
            let manifest: AnalysisRunManifest = read_json(&path)?;
            info!(
                run_id = %manifest.run_id,
                status = %manifest.status,
                target_id = %manifest.target_id,
                retailer = %manifest.retailer,
                model = %manifest.model,
                score = manifest.score.unwrap_or_default(),
                failure_kind = %manifest.failure_kind.unwrap_or_default(),
                failure_reason = %manifest.failure_reason.unwrap_or_default(),
                export = %manifest.paths.export_path.unwrap_or_default(),
                updated_at = %manifest.updated_at,
                "loaded latest analysis run manifest"
            );
        }
        None => warn!(path = %manifest_dir.display(), "no analysis run manifests found"),
    }

    if ledger_path.exists() {
        let connection = open_ledger(&ledger_path)?;
        let counts = ledger_counts(&connection)?;
        info!(
            path = %ledger_path.display(),
            total = counts.total,
            completed = counts.completed,
            failed = counts.failed,
            targets = counts.distinct_targets,
            "ledger status"
        );

        if let Some(target) = &args.target {
            match latest_for_target(&connection, &target.to_lowercase())? {
                Some(entry) => info!(
                    target_id = %entry.target_id,
                    run_id = %entry.run_id,
                    status = %entry.status,
                    score = entry.score.unwrap_or_default(),
                    error_kind = %entry.error_kind.unwrap_or_default(),
                    created_at = %entry.created_at,
                    "latest analysis for target"
                ),
                None => warn!(target_id = %target, "no analyses recorded for target"),
            }
        }
    } else {
        warn!(path = %ledger_path.display(), "ledger file missing");
    }

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Run manifests carry a compact UTC timestamp, so the greatest name is the newest.
fn latest_run_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.is_dir() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    for entry in fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to list {}", manifest_dir.display()))?
    {
        let path = entry?.path();
        let is_run_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(RUN_MANIFEST_PREFIX) && name.ends_with(".json"));
        if is_run_manifest && latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }

    Ok(latest)
}
