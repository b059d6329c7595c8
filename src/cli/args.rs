//! Command line argument parsing for the lexlink CLI using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// lexlink - field-aware retrieval and entity linking for search queries
#[derive(Parser, Debug, Clone)]
#[command(name = "lexlink")]
#[command(about = "Language-model retrieval and entity linking for search queries")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct LexlinkArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl LexlinkArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Score documents for a query, or run a batch retrieval
    Retrieve(RetrieveArgs),

    /// Link entities in a query, or run a batch linking step
    Link(LinkArgs),

    /// Score a single document for a query
    Score(ScoreArgs),

    /// Show the field mapping probabilities of a term
    #[command(name = "map-fields")]
    MapFields(MapFieldsArgs),

    /// Identify the target types of a query, or run a batch identification
    Tti(TtiArgs),
}

/// Arguments for retrieval
#[derive(Args, Debug, Clone)]
pub struct RetrieveArgs {
    /// Retrieval configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Documents to index (`{doc_id: {field: text}}`); overrides the config
    #[arg(short, long, value_name = "FILE")]
    pub index: Option<PathBuf>,

    /// Entity URI index for ELR (`{doc_id: {field: "uri uri ..."}}`); overrides the config
    #[arg(long, value_name = "FILE")]
    pub uri_index: Option<PathBuf>,

    /// Query to run; without it the configured query file is processed
    #[arg(short = 'q', long)]
    pub query: Option<String>,

    /// Query id whose annotations are used with ELR
    #[arg(long, default_value = "0")]
    pub qid: String,
}

/// Arguments for entity linking
#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    /// Linking configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Directory with entities.json, surface_forms.json and optionally fb2dbp.json
    #[arg(short, long, value_name = "DIR")]
    pub store: PathBuf,

    /// Documents to index for the similarity features; overrides the config
    #[arg(short, long, value_name = "FILE")]
    pub index: Option<PathBuf>,

    /// Query to link; without it the configured batch step is run
    #[arg(short = 'q', long)]
    pub query: Option<String>,

    /// Query id attached to a single query
    #[arg(long, default_value = "0")]
    pub qid: String,
}

/// Arguments for scoring one document
#[derive(Args, Debug, Clone)]
pub struct ScoreArgs {
    /// Documents to index (`{doc_id: {field: text}}`)
    #[arg(short, long, value_name = "FILE")]
    pub index: PathBuf,

    /// Retrieval model (lm, mlm or prms)
    #[arg(short, long, default_value = "lm")]
    pub model: String,

    /// Fields to score; `name:weight` pairs for mlm
    #[arg(long = "field", value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Smoothing method (jm or dirichlet)
    #[arg(long, default_value = "dirichlet")]
    pub smoothing: String,

    /// Smoothing parameter: a number or avg_len
    #[arg(long)]
    pub param: Option<String>,

    /// Document id
    #[arg(short, long)]
    pub doc: String,

    /// Query text
    pub query: String,
}

/// Arguments for field mapping
#[derive(Args, Debug, Clone)]
pub struct MapFieldsArgs {
    /// Documents to index (`{doc_id: {field: text}}`)
    #[arg(short, long, value_name = "FILE")]
    pub index: PathBuf,

    /// Comma-separated fields; all indexed fields with --top
    #[arg(long, value_delimiter = ',', required_unless_present = "top")]
    pub fields: Vec<String>,

    /// Map over the term's n fields with the highest document frequency
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Index entity URIs (whitespace tokens, case kept)
    #[arg(long)]
    pub uri: bool,

    /// Term to map (analyzed before lookup)
    pub term: String,
}

/// Arguments for target type identification
#[derive(Args, Debug, Clone)]
pub struct TtiArgs {
    /// Identification configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: PathBuf,

    /// Type documents (tc) or entity documents (ec); overrides the config
    #[arg(short, long, value_name = "FILE")]
    pub index: Option<PathBuf>,

    /// Store directory with entities.json, required for ec
    #[arg(short, long, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Query to identify; without it the configured query file is processed
    #[arg(short = 'q', long)]
    pub query: Option<String>,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieve_command() {
        let args = LexlinkArgs::try_parse_from([
            "lexlink",
            "retrieve",
            "--config",
            "retrieval.json",
            "-q",
            "barack obama",
        ])
        .unwrap();

        assert_eq!(args.verbosity(), 1);
        if let Command::Retrieve(retrieve) = args.command {
            assert_eq!(retrieve.config, PathBuf::from("retrieval.json"));
            assert_eq!(retrieve.query.as_deref(), Some("barack obama"));
            assert!(retrieve.index.is_none());
            assert!(retrieve.uri_index.is_none());
            assert_eq!(retrieve.qid, "0");
        } else {
            panic!("Expected Retrieve command");
        }
    }

    #[test]
    fn test_link_command() {
        let args = LexlinkArgs::try_parse_from([
            "lexlink", "-vv", "-f", "json", "link", "--config", "el.json", "--store", "data",
        ])
        .unwrap();

        assert_eq!(args.verbosity(), 2);
        assert_eq!(args.output_format, OutputFormat::Json);
        if let Command::Link(link) = args.command {
            assert_eq!(link.store, PathBuf::from("data"));
            assert_eq!(link.qid, "0");
            assert!(link.query.is_none());
        } else {
            panic!("Expected Link command");
        }
    }

    #[test]
    fn test_score_command() {
        let args = LexlinkArgs::try_parse_from([
            "lexlink", "score", "--index", "docs.json", "--field", "title", "--doc", "d1",
            "hawaii",
        ])
        .unwrap();

        if let Command::Score(score) = args.command {
            assert_eq!(score.model, "lm");
            assert_eq!(score.fields, vec!["title"]);
            assert_eq!(score.doc, "d1");
            assert_eq!(score.query, "hawaii");
        } else {
            panic!("Expected Score command");
        }
    }

    #[test]
    fn test_map_fields_command() {
        let args = LexlinkArgs::try_parse_from([
            "lexlink",
            "-q",
            "map-fields",
            "--index",
            "docs.json",
            "--fields",
            "title,body",
            "friends",
        ])
        .unwrap();

        assert_eq!(args.verbosity(), 0);
        if let Command::MapFields(map) = args.command {
            assert_eq!(map.fields, vec!["title", "body"]);
            assert_eq!(map.term, "friends");
        } else {
            panic!("Expected MapFields command");
        }
    }

    #[test]
    fn test_map_fields_top_without_fields() {
        let args = LexlinkArgs::try_parse_from([
            "lexlink",
            "map-fields",
            "--index",
            "uris.json",
            "--top",
            "3",
            "--uri",
            "<dbpedia:Honolulu>",
        ])
        .unwrap();
        if let Command::MapFields(map) = args.command {
            assert!(map.fields.is_empty());
            assert_eq!(map.top, Some(3));
            assert!(map.uri);
        } else {
            panic!("Expected MapFields command");
        }
    }

    #[test]
    fn test_tti_command() {
        let args = LexlinkArgs::try_parse_from([
            "lexlink", "tti", "-c", "tti.json", "--store", "data", "-q", "capital city",
        ])
        .unwrap();
        if let Command::Tti(tti) = args.command {
            assert_eq!(tti.config, PathBuf::from("tti.json"));
            assert_eq!(tti.store, Some(PathBuf::from("data")));
            assert_eq!(tti.query.as_deref(), Some("capital city"));
            assert!(tti.index.is_none());
        } else {
            panic!("Expected Tti command");
        }
    }

    #[test]
    fn test_map_fields_requires_fields() {
        assert!(
            LexlinkArgs::try_parse_from(["lexlink", "map-fields", "--index", "d.json", "x"])
                .is_err()
        );
    }
}
