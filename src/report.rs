use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::analysis::{AnalysisResult, CompletedAnalysis, ComplianceStatus};
use crate::catalog::{CanonicalRecord, rank_metric};

#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    pub retailer: &'a str,
    pub generated_at: &'a str,
    pub target_id: &'a str,
    pub image_urls: Vec<String>,
    pub competitors: Vec<CompetitorSummary<'a>>,
    pub analysis: &'a AnalysisResult,
    pub original: &'a CanonicalRecord,
    pub optimized: &'a CanonicalRecord,
}

#[derive(Debug, Serialize)]
pub struct CompetitorSummary<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub brand_name: &'a str,
    pub rank_metric: f64,
}

impl<'a> ReportDocument<'a> {
    pub fn new(completed: &'a CompletedAnalysis, retailer: &'a str, generated_at: &'a str) -> Self {
        Self {
            retailer,
            generated_at,
            target_id: &completed.target.id,
            image_urls: completed.target.image_urls(),
            competitors: completed
                .competitors
                .iter()
                .map(|record| CompetitorSummary {
                    id: &record.id,
                    title: &record.title,
                    brand_name: &record.brand_name,
                    rank_metric: rank_metric(record),
                })
                .collect(),
            analysis: &completed.result,
            original: &completed.target,
            optimized: &completed.merged,
        }
    }
}

pub fn write_json_report(output: &mut impl Write, report: &ReportDocument<'_>) -> Result<()> {
    serde_json::to_writer_pretty(&mut *output, report)?;
    writeln!(output)?;
    Ok(())
}

pub fn write_text_report(output: &mut impl Write, report: &ReportDocument<'_>) -> Result<()> {
    let analysis = report.analysis;

    writeln!(output, "Listing report: {} ({})", report.target_id, report.retailer)?;
    writeln!(output, "Generated: {}", report.generated_at)?;
    writeln!(output, "Score: {:.0}/100", analysis.score)?;
    writeln!(output, "Images: {}", report.image_urls.len())?;

    writeln!(output)?;
    writeln!(output, "Competitors: {}", report.competitors.len())?;
    for (index, competitor) in report.competitors.iter().enumerate() {
        writeln!(
            output,
            "{}.\t{}\t{}\tbrand={}\trank={}",
            index + 1,
            competitor.id,
            competitor.title,
            display_or_dash(competitor.brand_name),
            competitor.rank_metric
        )?;
    }

    writeln!(output)?;
    writeln!(output, "Comparison:")?;
    for row in &analysis.comparison {
        writeln!(
            output,
            "\t{}: target={} competitor_avg={}",
            row.metric, row.sku_value, row.competitor_avg
        )?;
        writeln!(output, "\t  {}", row.recommendation)?;
    }

    writeln!(output)?;
    writeln!(output, "Compliance:")?;
    for item in &analysis.compliance_check {
        writeln!(output, "\t[{}] {}", status_marker(item.status), item.issue)?;
    }

    let edits = &analysis.top_edits;
    writeln!(output)?;
    writeln!(output, "Top edits:")?;
    write_field_change(output, "title", &report.original.title, &edits.title)?;
    write_field_change(output, "bullets", &report.original.bullet_text, &edits.bullets)?;
    write_field_change(
        output,
        "description",
        &report.original.description_text,
        &edits.description,
    )?;
    writeln!(output, "\trules: {}", display_or_dash(&edits.rules_link))?;
    writeln!(output, "\tcompetitor reference: {}", display_or_dash(&edits.competitor_ref))?;

    Ok(())
}

fn write_field_change(
    output: &mut impl Write,
    label: &str,
    original: &str,
    optimized: &str,
) -> Result<()> {
    writeln!(output, "\t{label}:")?;
    writeln!(output, "\t  before: {}", display_or_dash(original))?;
    writeln!(output, "\t  after:  {}", display_or_dash(optimized))?;
    Ok(())
}

fn status_marker(status: ComplianceStatus) -> &'static str {
    match status {
        ComplianceStatus::Pass => "PASS",
        ComplianceStatus::Fail => "FAIL",
        ComplianceStatus::Warning => "WARN",
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() { "--" } else { value }
}
