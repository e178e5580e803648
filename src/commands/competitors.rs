use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::catalog::{CanonicalRecord, rank_metric, select_top};
use crate::cli::CompetitorsArgs;
use crate::commands::ingest::load_catalog;
use crate::error::PipelineError;

#[derive(Debug, Serialize)]
struct CompetitorRow<'a> {
    position: usize,
    rank_metric: f64,
    record: &'a CanonicalRecord,
}

#[derive(Debug, Serialize)]
struct CompetitorsResponse<'a> {
    target: &'a CanonicalRecord,
    limit: usize,
    competitors: Vec<CompetitorRow<'a>>,
}

pub fn run(args: CompetitorsArgs) -> Result<()> {
    let (catalog, _) = load_catalog(&args.catalog)?;
    let target_id = args.target.to_lowercase();
    let target = catalog
        .find(&target_id)
        .ok_or_else(|| PipelineError::TargetNotFound(args.target.clone()))?;

    let competitors = select_top(target, &catalog, args.limit);
    info!(
        target_id = %target.id,
        category = %target.category,
        competitors = competitors.len(),
        "competitor selection complete"
    );

    let response = CompetitorsResponse {
        target,
        limit: args.limit,
        competitors: competitors
            .into_iter()
            .enumerate()
            .map(|(index, record)| CompetitorRow {
                position: index + 1,
                rank_metric: rank_metric(record),
                record,
            })
            .collect(),
    };

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &response)
            .context("failed to serialize competitors json output")?;
        writeln!(output)?;
    } else {
        writeln!(
            output,
            "Target: {}\t{}\tcategory={}",
            target.id, target.title, target.category
        )?;
        if response.competitors.is_empty() {
            writeln!(output, "No competitors share this category.")?;
        }
        for row in &response.competitors {
            writeln!(
                output,
                "{}.\t{}\t{}\trank={}",
                row.position, row.record.id, row.record.title, row.rank_metric
            )?;
        }
    }
    output.flush()?;
    Ok(())
}
