//! CLI command definitions and argument parsing

use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(name = "patientrag")]
#[command(about = "Retrieve similar patient records and generate treatment insights")]
#[command(version)]
pub struct Cli {
    /// Enable verbose debug logging (default: info level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to the configuration file (default: config.toml)
    #[arg(short, long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest the configured record feed into the store
    Load {
        /// Clear the store and refetch the feed
        #[arg(long)]
        reset: bool,
    },
    /// Rank stored records against a literal embedding
    Query {
        /// Comma-separated embedding components
        #[arg(long, allow_hyphen_values = true)]
        vector: String,
        /// Number of results (values <= 0 return nothing)
        #[arg(short = 'n', long, default_value = "3", allow_hyphen_values = true)]
        n_results: i64,
    },
    /// Ask for treatment insights on a symptom description
    Ask {
        /// Free-text symptom description
        symptom: String,
        /// Number of similar records to retrieve (default: retrieval.top_k)
        #[arg(short, long)]
        k: Option<usize>,
        /// Print the generated prompt as well
        #[arg(long)]
        show_prompt: bool,
    },
    /// Show store statistics
    Stats,
    /// Start the REST API server
    Serve {
        /// Host to bind to (default: server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (default: server.port)
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable CORS
        #[arg(long)]
        cors: bool,
    },
    /// Show current configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_with_negative_components() {
        let cli = Cli::parse_from(["patientrag", "query", "--vector", "-0.5,0.25", "-n", "5"]);
        match cli.command {
            Commands::Query { vector, n_results } => {
                assert_eq!(vector, "-0.5,0.25");
                assert_eq!(n_results, 5);
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn test_parse_ask_and_globals() {
        let cli = Cli::parse_from([
            "patientrag",
            "--verbose",
            "--config",
            "custom.toml",
            "ask",
            "dry cough",
            "-k",
            "5",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("custom.toml"));
        assert!(matches!(
            cli.command,
            Commands::Ask { ref symptom, k: Some(5), show_prompt: false } if symptom == "dry cough"
        ));
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::parse_from(["patientrag", "serve"]);
        assert!(matches!(
            cli.command,
            Commands::Serve { host: None, port: None, cors: false }
        ));
    }
}
