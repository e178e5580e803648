use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::catalog::{CanonicalRecord, SearchFilter};
use crate::cli::SearchArgs;
use crate::commands::ingest::load_catalog;

#[derive(Debug, Serialize)]
struct SearchResponse<'a> {
    text: &'a str,
    brand: &'a str,
    category: &'a str,
    matched: usize,
    returned: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    facets: Option<Facets<'a>>,
    results: Vec<&'a CanonicalRecord>,
}

#[derive(Debug, Serialize)]
struct Facets<'a> {
    brands: Vec<&'a str>,
    categories: Vec<&'a str>,
}

pub fn run(args: SearchArgs) -> Result<()> {
    let (catalog, _) = load_catalog(&args.catalog)?;

    let filter = SearchFilter {
        text: args.text.clone(),
        brand: args.brand.to_lowercase(),
        category: args.category.to_lowercase(),
    };
    let matches = catalog.search(&filter);

    info!(
        matched = matches.len(),
        limit = args.limit,
        "catalog search complete"
    );

    let facets = args.facets.then(|| Facets {
        brands: catalog.distinct_brands(),
        categories: catalog.distinct_categories(),
    });

    let response = SearchResponse {
        text: &args.text,
        brand: &filter.brand,
        category: &filter.category,
        matched: matches.len(),
        returned: matches.len().min(args.limit),
        facets,
        results: matches.into_iter().take(args.limit).collect(),
    };

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &response)
            .context("failed to serialize search json output")?;
        writeln!(output)?;
    } else {
        write_text_response(&mut output, &response)?;
    }
    output.flush()?;
    Ok(())
}

fn write_text_response(output: &mut impl Write, response: &SearchResponse<'_>) -> Result<()> {
    if let Some(facets) = &response.facets {
        writeln!(output, "Brands: {}", facets.brands.join(", "))?;
        writeln!(output, "Categories: {}", facets.categories.join(", "))?;
    }

    writeln!(
        output,
        "Results: {} of {} matched",
        response.returned, response.matched
    )?;
    for record in &response.results {
        writeln!(
            output,
            "{}\t{}\t{}\t{}\t#{}",
            record.id,
            record.title,
            or_placeholder(&record.brand_name, "generic"),
            record.category,
            or_placeholder(&record.category_rank_avg, "--"),
        )?;
    }
    Ok(())
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() { placeholder } else { value }
}
