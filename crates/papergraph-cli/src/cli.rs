//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use papergraph_graph::GraphBackend;
use std::path::PathBuf;

/// Papergraph - build and query a knowledge graph of AI research papers.
#[derive(Debug, Parser)]
#[command(name = "papergraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "PAPERGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract entities and relations from the paper tracker
    Extract(ExtractArgs),

    /// Load extracted relations into the graph
    Ingest(IngestArgs),

    /// Ask a single question about the graph
    Ask(AskArgs),

    /// Enter the interactive question REPL
    Chat(GraphArgs),

    /// List configured LLM providers in fallback order
    Providers,

    /// Show node and edge counts of the graph
    Stats(GraphArgs),
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Source table (.xlsx or .json)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Cumulative extraction store (.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Re-extract every record, ignoring earlier results
    #[arg(long)]
    pub full: bool,

    /// Process at most N new records
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Provider calls in flight
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// Arguments for the ingest command.
#[derive(Debug, Parser)]
pub struct IngestArgs {
    /// Extraction store to load (.json)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Delete every paper and entity before loading
    #[arg(long)]
    pub clear: bool,

    #[command(flatten)]
    pub graph: GraphArgs,
}

/// Arguments for the ask command.
#[derive(Debug, Parser)]
pub struct AskArgs {
    /// The question
    #[arg(required = true, num_args = 1..)]
    pub question: Vec<String>,

    #[command(flatten)]
    pub graph: GraphArgs,
}

impl AskArgs {
    /// Question words joined back together
    pub fn question(&self) -> String {
        self.question.join(" ")
    }
}

/// Graph backend selection shared by graph commands.
#[derive(Debug, Clone, Default, Parser)]
pub struct GraphArgs {
    /// Graph backend (sqlite or neo4j)
    #[arg(short, long)]
    pub backend: Option<GraphBackend>,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_is_chat() {
        let cli = Cli::parse_from(["papergraph"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_extract_command() {
        let cli = Cli::parse_from([
            "papergraph",
            "extract",
            "--full",
            "--limit",
            "3",
            "-i",
            "papers.json",
        ]);
        match cli.command {
            Some(Command::Extract(args)) => {
                assert!(args.full);
                assert_eq!(args.limit, Some(3));
                assert_eq!(args.input, Some(PathBuf::from("papers.json")));
                assert!(args.output.is_none());
            }
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_ingest_command_with_backend() {
        let cli = Cli::parse_from(["papergraph", "-vv", "ingest", "--clear", "--backend", "neo4j"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Command::Ingest(args)) => {
                assert!(args.clear);
                assert_eq!(args.graph.backend, Some(GraphBackend::Neo4j));
            }
            _ => panic!("Expected Ingest command"),
        }
    }

    #[test]
    fn test_ask_joins_words() {
        let cli = Cli::parse_from(["papergraph", "ask", "latest", "papers", "--format", "json"]);
        assert_eq!(cli.format, Some(CliFormat::Json));
        match cli.command {
            Some(Command::Ask(args)) => assert_eq!(args.question(), "latest papers"),
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(Cli::try_parse_from(["papergraph", "stats", "--backend", "mysql"]).is_err());
    }
}
