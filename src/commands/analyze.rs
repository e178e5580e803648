use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::analysis::{
    AnalysisOutcome, AnalysisSession, AnalysisSettings, Attachment, CompletedAnalysis,
    GeminiOracle, GuidelinePayload, Oracle, OracleConfig, render_prompt,
};
use crate::catalog::export_row;
use crate::cli::AnalyzeArgs;
use crate::commands::ingest::load_catalog;
use crate::error::PipelineError;
use crate::ledger::{LEDGER_FILE, LEDGER_SCHEMA_VERSION, LedgerEntry, open_ledger, record_analysis};
use crate::model::{AnalysisPaths, AnalysisRunManifest};
use crate::report::{ReportDocument, write_json_report, write_text_report};
use crate::util::{
    ensure_directory, file_stem_for_id, now_utc_string, utc_compact_string, write_json_pretty,
    write_text_file,
};

pub const RUN_MANIFEST_PREFIX: &str = "analysis_run_";

pub fn run(args: AnalyzeArgs) -> Result<()> {
    if args.dry_run {
        return print_prompt(&args);
    }

    let api_key = args
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .context("missing oracle API key: pass --api-key or set GEMINI_API_KEY")?;

    let oracle = GeminiOracle::new(OracleConfig {
        api_key,
        model: args.model.clone(),
        base_url: args.oracle_url.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
    })?;

    execute(&args, &oracle)
}

/// Runs one analysis against `oracle`, then records the attempt in the ledger
/// and a run manifest whatever its outcome.
pub fn execute(args: &AnalyzeArgs, oracle: &dyn Oracle) -> Result<()> {
    let started_at = now_utc_string();
    let run_id = format!("analysis-{}", utc_compact_string(Utc::now()));
    let target_id = args.target.to_lowercase();

    let (catalog, catalog_sha256) = load_catalog(&args.catalog)?;
    let guideline = load_guideline(&args.guidelines)?;
    let guideline_kind = guideline_kind(&guideline);
    let settings = AnalysisSettings {
        retailer: args.retailer.clone(),
        guideline,
        competitor_limit: args.competitors,
    };
    let session = AnalysisSession::new(Arc::new(catalog));

    info!(
        run_id = %run_id,
        target_id = %target_id,
        retailer = %args.retailer,
        model = %args.model,
        guideline = guideline_kind,
        "analysis run started"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;
    let outcome = runtime.block_on(analyze_until_interrupted(
        &session, oracle, &target_id, &settings,
    ));

    let ledger_path = args
        .ledger_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join(LEDGER_FILE));
    let mut manifest = AnalysisRunManifest {
        manifest_version: 1,
        run_id: run_id.clone(),
        ledger_schema_version: LEDGER_SCHEMA_VERSION.to_string(),
        status: String::new(),
        started_at,
        updated_at: String::new(),
        target_id: target_id.clone(),
        retailer: args.retailer.clone(),
        model: args.model.clone(),
        generation: session.latest_generation(),
        guideline_kind: guideline_kind.to_string(),
        catalog_sha256,
        competitor_ids: Vec::new(),
        score: None,
        failure_kind: None,
        failure_reason: None,
        paths: AnalysisPaths {
            catalog_path: args.catalog.display().to_string(),
            guideline_path: args.guidelines.display().to_string(),
            ledger_path: ledger_path.display().to_string(),
            export_path: None,
        },
    };
    let mut entry = LedgerEntry {
        run_id,
        target_id,
        retailer: args.retailer.clone(),
        generation: session.latest_generation(),
        status: String::new(),
        score: None,
        error_kind: None,
        error_message: None,
        result_json: None,
        merged_json: None,
        created_at: String::new(),
    };

    let result = match outcome {
        Ok(AnalysisOutcome::Applied(completed)) => {
            manifest.generation = completed.generation;
            manifest.competitor_ids = completed
                .competitors
                .iter()
                .map(|record| record.id.clone())
                .collect();
            manifest.score = Some(completed.result.score);
            entry.generation = completed.generation;
            entry.score = Some(completed.result.score);

            match publish(args, &completed) {
                Ok(published) => {
                    manifest.status = "completed".to_string();
                    manifest.paths.export_path = Some(published.export_path.display().to_string());
                    entry.status = "completed".to_string();
                    entry.result_json = Some(published.result_json);
                    entry.merged_json = Some(published.merged_json);

                    info!(
                        target_id = %completed.target.id,
                        score = completed.result.score,
                        export = %published.export_path.display(),
                        "analysis applied"
                    );
                    Ok(())
                }
                Err(err) => {
                    mark_failed(&mut manifest, &mut entry, "publish", &err);
                    Err(err)
                }
            }
        }
        Ok(AnalysisOutcome::Superseded {
            generation,
            target_id,
        }) => {
            let reason = format!("analysis for {target_id} was interrupted; late result discarded");
            manifest.status = "superseded".to_string();
            manifest.generation = generation;
            manifest.failure_reason = Some(reason.clone());
            entry.status = "superseded".to_string();
            entry.generation = generation;
            entry.error_message = Some(reason.clone());
            Err(anyhow!(reason))
        }
        Err(err) => {
            let pipeline_error = err.downcast_ref::<PipelineError>();
            if pipeline_error.is_some_and(PipelineError::is_analysis_scoped) {
                warn!(target_id = %entry.target_id, "analysis failed; re-run analyze to retry");
            }
            let kind = pipeline_error.map_or("internal", PipelineError::kind);
            mark_failed(&mut manifest, &mut entry, kind, &err);
            Err(err)
        }
    };

    let finished_at = now_utc_string();
    manifest.updated_at = finished_at.clone();
    entry.created_at = finished_at;

    if let Some(parent) = ledger_path.parent() {
        ensure_directory(parent)?;
    }
    let connection = open_ledger(&ledger_path)?;
    record_analysis(&connection, &entry)?;

    let manifest_path = args.cache_root.join("manifests").join(format!(
        "{RUN_MANIFEST_PREFIX}{}.json",
        entry.run_id.trim_start_matches("analysis-")
    ));
    write_json_pretty(&manifest_path, &manifest)?;
    info!(
        status = %manifest.status,
        manifest = %manifest_path.display(),
        ledger = %ledger_path.display(),
        "analysis run recorded"
    );

    result
}

/// The first Ctrl-C resets the selection so a late oracle answer is dropped;
/// a second one abandons the wait.
async fn analyze_until_interrupted(
    session: &AnalysisSession,
    oracle: &dyn Oracle,
    target_id: &str,
    settings: &AnalysisSettings,
) -> Result<AnalysisOutcome> {
    let analysis = session.analyze_target(oracle, target_id, settings);
    tokio::pin!(analysis);

    tokio::select! {
        outcome = &mut analysis => return Ok(outcome?),
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for interrupt")?;
            warn!(target_id, "interrupt received; resetting selection");
            session.reset();
        }
    }

    tokio::select! {
        outcome = &mut analysis => Ok(outcome?),
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for interrupt")?;
            bail!("analysis for {target_id} abandoned before the oracle answered")
        }
    }
}

fn print_prompt(args: &AnalyzeArgs) -> Result<()> {
    let (catalog, _) = load_catalog(&args.catalog)?;
    let settings = AnalysisSettings {
        retailer: args.retailer.clone(),
        guideline: load_guideline(&args.guidelines)?,
        competitor_limit: args.competitors,
    };
    let session = AnalysisSession::new(Arc::new(catalog));
    let request = session.prepare_request(&args.target.to_lowercase(), &settings)?;
    let prompt = render_prompt(&request).context("failed to render prompt")?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    write!(output, "{prompt}")?;
    if let GuidelinePayload::Attachments(attachments) = &request.guideline {
        for attachment in attachments {
            writeln!(
                output,
                "[attachment {} {} bytes]",
                attachment.mime_type,
                attachment.data.len()
            )?;
        }
    }
    output.flush()?;

    info!(
        target_id = %request.target.id,
        competitors = request.competitors.len(),
        "dry-run prompt rendered; oracle not called"
    );
    Ok(())
}

struct Published {
    export_path: PathBuf,
    result_json: String,
    merged_json: String,
}

/// Serializes the applied result, writes the export row and prints the report.
fn publish(args: &AnalyzeArgs, completed: &CompletedAnalysis) -> Result<Published> {
    let result_json =
        serde_json::to_string(&completed.result).context("failed to serialize analysis result")?;
    let merged_json = serde_json::to_string(&completed.merged)
        .context("failed to serialize optimized record")?;
    let export_path = write_export(args, completed)?;
    write_report(args, completed)?;

    Ok(Published {
        export_path,
        result_json,
        merged_json,
    })
}

fn mark_failed(
    manifest: &mut AnalysisRunManifest,
    entry: &mut LedgerEntry,
    kind: &str,
    err: &anyhow::Error,
) {
    let reason = format!("{err:#}");
    manifest.status = "failed".to_string();
    manifest.failure_kind = Some(kind.to_string());
    manifest.failure_reason = Some(reason.clone());
    entry.status = "failed".to_string();
    entry.error_kind = Some(kind.to_string());
    entry.error_message = Some(reason);
}

fn write_export(args: &AnalyzeArgs, completed: &CompletedAnalysis) -> Result<PathBuf> {
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.cache_root.join("exports"));
    let export_path = output_dir.join(format!(
        "optimized_{}.csv",
        file_stem_for_id(&completed.merged.id)
    ));
    write_text_file(&export_path, &export_row(&completed.merged))?;
    Ok(export_path)
}

fn write_report(args: &AnalyzeArgs, completed: &CompletedAnalysis) -> Result<()> {
    let generated_at = now_utc_string();
    let report = ReportDocument::new(completed, &args.retailer, &generated_at);

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        write_json_report(&mut output, &report)?;
    } else {
        write_text_report(&mut output, &report)?;
    }
    output.flush()?;
    Ok(())
}

/// Loads guideline material: documents and images become attachments,
/// anything else is read as text.
pub fn load_guideline(path: &Path) -> Result<GuidelinePayload> {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let Some(mime_type) = attachment_mime_type(&extension) else {
        return read_guideline_text(path);
    };

    match fs::read(path) {
        Ok(data) => {
            info!(path = %path.display(), mime_type, bytes = data.len(), "loaded guideline attachment");
            Ok(GuidelinePayload::Attachments(vec![Attachment {
                mime_type: mime_type.to_string(),
                data,
            }]))
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to read guideline as binary; falling back to text"
            );
            read_guideline_text(path)
        }
    }
}

fn read_guideline_text(path: &Path) -> Result<GuidelinePayload> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read guidelines: {}", path.display()))?;
    info!(path = %path.display(), chars = text.chars().count(), "loaded guideline text");
    Ok(GuidelinePayload::Text(text))
}

fn attachment_mime_type(extension: &str) -> Option<&'static str> {
    match extension {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn guideline_kind(guideline: &GuidelinePayload) -> &'static str {
    match guideline {
        GuidelinePayload::Text(_) => "text",
        GuidelinePayload::Attachments(_) => "attachments",
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::analysis::AnalysisRequest;
    use crate::ledger::{latest_for_target, ledger_counts};

    const CATALOG: &str = "\
SKU ID,Product Name,Category,Brand,Avg Rank Category,Description
S1,Acme Mouse,Mice,Acme,5,A mouse
S2,Zeta Mouse,Mice,Zeta,2,Another mouse
S3,Beta Mouse,Mice,Beta,n/a,
";

    const RESPONSE: &str = r#"{
        "score": 64,
        "comparison": [
            {"metric": "Title Length", "skuValue": 10, "competitorAvg": 11, "recommendation": "Add detail"}
        ],
        "topEdits": {
            "title": "Acme Silent Wireless Mouse",
            "bullets": "Silent clicks; 2.4 GHz",
            "description": "A quiet wireless mouse.",
            "rulesLink": "Section 2",
            "competitorRef": "s2"
        },
        "complianceCheck": [{"status": "pass", "issue": "Brand present"}]
    }"#;

    struct CannedOracle(Result<String, PipelineError>);

    #[async_trait]
    impl Oracle for CannedOracle {
        async fn complete(&self, _request: &AnalysisRequest) -> crate::error::Result<String> {
            self.0.clone()
        }
    }

    fn args(dir: &Path, target: &str) -> AnalyzeArgs {
        let catalog = dir.join("catalog.csv");
        let guidelines = dir.join("rules.md");
        fs::write(&catalog, CATALOG).expect("catalog should be written");
        fs::write(&guidelines, "Titles under 80 characters.").expect("guidelines should be written");

        AnalyzeArgs {
            cache_root: dir.join("cache"),
            catalog,
            guidelines,
            target: target.to_string(),
            retailer: "Acme Retail".to_string(),
            competitors: 3,
            api_key: None,
            model: "test-model".to_string(),
            oracle_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            output_dir: None,
            ledger_path: None,
            dry_run: false,
            json: true,
        }
    }

    #[test]
    fn execute_exports_merged_row_and_records_completion() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let args = args(dir.path(), "S1");

        execute(&args, &CannedOracle(Ok(RESPONSE.to_string()))).expect("analysis should succeed");

        let export = fs::read_to_string(dir.path().join("cache/exports/optimized_s1.csv"))
            .expect("export should exist");
        let mut lines = export.lines();
        assert!(lines.next().expect("header line").starts_with("id,title,"));
        assert!(
            lines
                .next()
                .expect("value line")
                .starts_with(r#""s1","Acme Silent Wireless Mouse","mice""#)
        );

        let connection = open_ledger(&dir.path().join("cache").join(LEDGER_FILE))
            .expect("ledger should open");
        let latest = latest_for_target(&connection, "s1")
            .expect("query should succeed")
            .expect("entry should exist");
        assert_eq!(latest.status, "completed");
        assert_eq!(latest.score, Some(64.0));
    }

    #[test]
    fn execute_records_failed_attempts_with_error_kind() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let args = args(dir.path(), "S1");

        let err = execute(
            &args,
            &CannedOracle(Err(PipelineError::OracleTransport("503".to_string()))),
        )
        .expect_err("transport failure should surface");
        assert_eq!(
            err.downcast_ref::<PipelineError>(),
            Some(&PipelineError::OracleTransport("503".to_string()))
        );

        let connection = open_ledger(&dir.path().join("cache").join(LEDGER_FILE))
            .expect("ledger should open");
        assert_eq!(ledger_counts(&connection).expect("counts").failed, 1);
        let latest = latest_for_target(&connection, "s1")
            .expect("query should succeed")
            .expect("entry should exist");
        assert_eq!(latest.error_kind.as_deref(), Some("oracle_transport"));
        assert!(!dir.path().join("cache/exports").exists());
    }

    #[test]
    fn execute_records_failed_publish_when_export_cannot_be_written() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").expect("blocker should be written");
        let mut args = args(dir.path(), "S1");
        args.output_dir = Some(blocker);

        let err = execute(&args, &CannedOracle(Ok(RESPONSE.to_string())))
            .expect_err("export into a file path should fail");
        assert!(format!("{err:#}").contains("failed to create directory"));

        let connection = open_ledger(&dir.path().join("cache").join(LEDGER_FILE))
            .expect("ledger should open");
        let counts = ledger_counts(&connection).expect("counts");
        assert_eq!((counts.total, counts.failed), (1, 1));
        let latest = latest_for_target(&connection, "s1")
            .expect("query should succeed")
            .expect("entry should exist");
        assert_eq!(latest.error_kind.as_deref(), Some("publish"));
        assert_eq!(latest.score, Some(64.0));

        let manifests = fs::read_dir(dir.path().join("cache/manifests"))
            .expect("manifest dir should exist")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(RUN_MANIFEST_PREFIX))
            .count();
        assert_eq!(manifests, 1);
    }

    #[test]
    fn consecutive_runs_keep_separate_manifests() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let args = args(dir.path(), "S1");
        let oracle = CannedOracle(Ok(RESPONSE.to_string()));

        execute(&args, &oracle).expect("first run should succeed");
        execute(&args, &oracle).expect("second run should succeed");

        let manifests = fs::read_dir(dir.path().join("cache/manifests"))
            .expect("manifest dir should exist")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(RUN_MANIFEST_PREFIX))
            .count();
        assert_eq!(manifests, 2);
    }

    #[test]
    fn execute_reports_unknown_target() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let args = args(dir.path(), "missing");

        let err = execute(&args, &CannedOracle(Ok(RESPONSE.to_string())))
            .expect_err("unknown target should fail");
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::TargetNotFound(_))
        ));
    }

    #[test]
    fn load_guideline_picks_payload_by_extension() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let text_path = dir.path().join("rules.TXT");
        let pdf_path = dir.path().join("rules.pdf");
        fs::write(&text_path, "No emoji in titles.").expect("text should be written");
        fs::write(&pdf_path, b"%PDF-1.7").expect("pdf should be written");

        assert_eq!(
            load_guideline(&text_path).expect("text guideline"),
            GuidelinePayload::Text("No emoji in titles.".to_string())
        );
        assert_eq!(
            load_guideline(&pdf_path).expect("pdf guideline"),
            GuidelinePayload::Attachments(vec![Attachment {
                mime_type: "application/pdf".to_string(),
                data: b"%PDF-1.7".to_vec(),
            }])
        );
        assert!(load_guideline(&dir.path().join("absent.png")).is_err());
    }
}
