//! Output formatting for CLI commands.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cli::args::{LexlinkArgs, OutputFormat};
use crate::error::Result;
use crate::linking::LinkingOutput;
use crate::retrieval::ScoredDoc;
use crate::tti::TtiOutput;

/// Ranked documents of a single query.
#[derive(Debug, Serialize, Deserialize)]
pub struct RetrieveResult {
    pub query: String,
    pub model: String,
    pub docs: Vec<ScoredDoc>,
    pub duration_ms: u64,
}

/// Score of one document. `score` is absent when no query term occurs in
/// the scored fields.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreResult {
    pub doc_id: String,
    pub model: String,
    pub query: String,
    pub score: Option<f64>,
}

/// Field mapping probabilities `p(f|t)`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MapFieldsResult {
    pub term: String,
    pub mapping: BTreeMap<String, f64>,
}

/// Summary of a batch run.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResult {
    pub command: String,
    pub output_file: String,
    pub duration_ms: u64,
}

/// Output of a CLI command.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CommandOutput {
    Retrieve(RetrieveResult),
    Link(LinkingOutput),
    Score(ScoreResult),
    MapFields(MapFieldsResult),
    Tti(TtiOutput),
    Batch(BatchResult),
}

/// Output a result in the specified format.
pub fn output_result(message: &str, result: &CommandOutput, args: &LexlinkArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            print!("{}", format_human(message, result, args));
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

fn output_json(result: &CommandOutput, args: &LexlinkArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}

/// Render a result in human-readable form.
pub fn format_human(message: &str, result: &CommandOutput, args: &LexlinkArgs) -> String {
    let mut out = String::new();
    if args.verbosity() > 0 {
        out.push_str(message);
        out.push_str("\n\n");
    }

    match result {
        CommandOutput::Retrieve(r) => {
            out.push_str(&format!("Query: {} ({})\n", r.query, r.model));
            if r.docs.is_empty() {
                out.push_str("No documents scored.\n");
            }
            for (i, doc) in r.docs.iter().enumerate() {
                out.push_str(&format!("{:>4}  {:<30} {:.6}\n", i + 1, doc.doc_id, doc.score));
                let mut fields: Vec<_> = doc.fields.iter().collect();
                fields.sort();
                for (name, value) in fields {
                    out.push_str(&format!("      {name}: {value}\n"));
                }
            }
            if args.verbosity() > 1 {
                out.push_str(&format!("\nTook {}ms\n", r.duration_ms));
            }
        }
        CommandOutput::Link(r) => {
            out.push_str(&format!("Query: {}\n", r.query));
            out.push_str(&format!("Processed: {}\n", r.processed_query));
            if r.results.is_empty() {
                out.push_str("No entities linked.\n");
            }
            for linked in &r.results {
                out.push_str(&format!(
                    "  {:<25} -> {:<40} {:.4}\n",
                    linked.mention, linked.entity, linked.score
                ));
            }
        }
        CommandOutput::Score(r) => match r.score {
            Some(score) => out.push_str(&format!(
                "{} score of {} for [{}]: {score}\n",
                r.model, r.doc_id, r.query
            )),
            None => out.push_str(&format!(
                "{} score of {} for [{}]: not scorable\n",
                r.model, r.doc_id, r.query
            )),
        },
        CommandOutput::MapFields(r) => {
            out.push_str(&format!("p(f|{}):\n", r.term));
            let mut mapping: Vec<(&String, &f64)> = r.mapping.iter().collect();
            mapping.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (field, prob) in mapping {
                out.push_str(&format!("  {field:<20} {prob:.6}\n"));
            }
        }
        CommandOutput::Tti(r) => {
            out.push_str(&format!("Query: {}\n", r.query));
            if r.results.is_empty() {
                out.push_str("No types identified.\n");
            }
            for t in &r.results {
                out.push_str(&format!("{:>4}  {:<30} {:.6}\n", t.rank, t.type_id, t.score));
            }
        }
        CommandOutput::Batch(r) => {
            out.push_str(&format!(
                "{} finished in {}ms, output: {}\n",
                r.command, r.duration_ms, r.output_file
            ));
        }
    }
    out
}
