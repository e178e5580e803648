use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::catalog::{CanonicalField, Catalog, HeaderTarget};
use crate::cli::IngestArgs;
use crate::model::{CatalogCounts, CatalogManifest, HeaderMappingEntry};
use crate::util::{now_utc_string, read_catalog_text, write_json_pretty};

pub const CATALOG_MANIFEST_FILE: &str = "catalog_manifest.json";

pub fn run(args: IngestArgs) -> Result<()> {
    info!(catalog = %args.catalog.display(), "starting ingest");

    let (catalog, source_sha256) = load_catalog(&args.catalog)?;
    let manifest = build_manifest(&catalog, &args.catalog, source_sha256);

    for entry in manifest.header_mapping.iter().filter(|entry| !entry.canonical) {
        info!(
            position = entry.position,
            raw_label = %entry.raw_label,
            field = %entry.field,
            "keeping unrecognized column as pass-through"
        );
    }
    if !manifest.missing_columns.is_empty() {
        warn!(
            missing = %manifest.missing_columns.join(","),
            "catalog lacks canonical columns; fields stay empty"
        );
    }
    if manifest.counts.duplicate_id_count > 0 {
        warn!(
            duplicates = manifest.counts.duplicate_id_count,
            "catalog contains duplicate ids; lookups use the first occurrence"
        );
    }

    if args.dry_run {
        info!(
            records = manifest.counts.record_count,
            brands = manifest.counts.brand_count,
            categories = manifest.counts.category_count,
            "ingest dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| args.cache_root.join("manifests").join(CATALOG_MANIFEST_FILE));
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote catalog manifest");
    info!(
        records = manifest.counts.record_count,
        brands = manifest.counts.brand_count,
        categories = manifest.counts.category_count,
        "ingest completed"
    );

    Ok(())
}

/// Reads and ingests a catalog file, returning it with the source digest.
pub fn load_catalog(path: &Path) -> Result<(Catalog, String)> {
    let (text, digest) = read_catalog_text(path)?;
    let catalog = Catalog::ingest(&text)
        .with_context(|| format!("failed to ingest catalog: {}", path.display()))?;

    info!(
        path = %path.display(),
        records = catalog.len(),
        columns = catalog.plan().targets.len(),
        "catalog ingested"
    );

    Ok((catalog, digest))
}

pub fn build_manifest(catalog: &Catalog, source_path: &Path, source_sha256: String) -> CatalogManifest {
    let plan = catalog.plan();

    let header_mapping = plan
        .labels
        .iter()
        .zip(plan.targets.iter())
        .enumerate()
        .map(|(position, (raw_label, target))| HeaderMappingEntry {
            position,
            raw_label: raw_label.clone(),
            field: target.key().to_string(),
            canonical: matches!(target, HeaderTarget::Canonical(_)),
        })
        .collect::<Vec<HeaderMappingEntry>>();

    let mapped = plan
        .targets
        .iter()
        .filter_map(|target| match target {
            HeaderTarget::Canonical(field) => Some(*field),
            HeaderTarget::PassThrough(_) => None,
        })
        .collect::<HashSet<CanonicalField>>();
    let missing_columns = CanonicalField::ALL
        .into_iter()
        .filter(|field| !mapped.contains(field))
        .map(|field| field.key().to_string())
        .collect::<Vec<String>>();

    let brands = to_owned_list(catalog.distinct_brands());
    let categories = to_owned_list(catalog.distinct_categories());

    let mut seen_ids = HashSet::new();
    let duplicate_id_count = catalog
        .records()
        .iter()
        .filter(|record| !record.id.is_empty() && !seen_ids.insert(record.id.as_str()))
        .count();

    CatalogManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_path: source_path.display().to_string(),
        source_sha256,
        counts: CatalogCounts {
            record_count: catalog.len(),
            brand_count: brands.len(),
            category_count: categories.len(),
            records_missing_id: catalog
                .records()
                .iter()
                .filter(|record| record.id.is_empty())
                .count(),
            records_missing_brand: catalog
                .records()
                .iter()
                .filter(|record| record.brand_name.is_empty())
                .count(),
            duplicate_id_count,
        },
        header_mapping,
        pass_through_columns: plan
            .pass_through_columns()
            .into_iter()
            .map(ToOwned::to_owned)
            .collect(),
        missing_columns,
        brands,
        categories,
    }
}

fn to_owned_list(values: Vec<&str>) -> Vec<String> {
    values.into_iter().map(ToOwned::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::model::CatalogManifest;

    const SAMPLE: &str = "\
SKU ID,Product Name,Universe,Brand,Avg Rank Category,Color
A1,Acme Pro Widget,Widgets,,4,Red
A2,Zeta Widget,Widgets,Zeta,2,Blue
A2,Zeta Widget Copy,Widgets,Zeta,3,Blue
";

    #[test]
    fn build_manifest_reports_mapping_missing_columns_and_duplicates() {
        let catalog = Catalog::ingest(SAMPLE).expect("sample should ingest");
        let manifest = build_manifest(&catalog, Path::new("catalog.csv"), "abc".to_string());

        assert_eq!(manifest.counts.record_count, 3);
        assert_eq!(manifest.counts.duplicate_id_count, 1);
        assert_eq!(manifest.counts.records_missing_brand, 0);
        assert_eq!(manifest.brands, vec!["acme", "zeta"]);
        assert_eq!(manifest.categories, vec!["widgets"]);
        assert_eq!(manifest.pass_through_columns, vec!["color"]);
        assert!(manifest.missing_columns.contains(&"description".to_string()));
        assert!(!manifest.missing_columns.contains(&"id".to_string()));

        let color = &manifest.header_mapping[5];
        assert_eq!(color.raw_label, "Color");
        assert!(!color.canonical);
    }

    #[test]
    fn run_writes_manifest_under_cache_root() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let catalog_path = dir.path().join("catalog.csv");
        fs::write(&catalog_path, SAMPLE).expect("catalog should be written");

        run(IngestArgs {
            cache_root: dir.path().join("cache"),
            catalog: catalog_path,
            manifest_path: None,
            dry_run: false,
        })
        .expect("ingest should succeed");

        let manifest_path = dir
            .path()
            .join("cache")
            .join("manifests")
            .join(CATALOG_MANIFEST_FILE);
        let raw = fs::read(&manifest_path).expect("manifest should exist");
        let manifest: CatalogManifest =
            serde_json::from_slice(&raw).expect("manifest should parse");
        assert_eq!(manifest.counts.record_count, 3);
        assert_eq!(manifest.source_sha256.len(), 64);
    }

    #[test]
    fn run_rejects_header_only_catalog() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let catalog_path = dir.path().join("catalog.csv");
        fs::write(&catalog_path, "SKU ID,Title\n\n").expect("catalog should be written");

        let err = run(IngestArgs {
            cache_root: dir.path().join("cache"),
            catalog: catalog_path,
            manifest_path: None,
            dry_run: false,
        })
        .expect_err("header-only catalog should fail");

        assert!(format!("{err:#}").contains("no usable rows"));
        assert!(!dir.path().join("cache").exists());
    }
}
