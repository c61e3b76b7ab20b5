use clap::Parser;
use patientrag::cli::handle_ask_command;
use patientrag::cli::handle_config_command;
use patientrag::cli::handle_load_command;
use patientrag::cli::handle_query_command;
use patientrag::cli::handle_serve_command;
use patientrag::cli::handle_stats_command;
use patientrag::cli::print_error;
use patientrag::cli::Cli;
use patientrag::cli::Commands;
use patientrag::config::AppConfig;
use patientrag::RagService;
use patientrag::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            print_error(&format!("Failed to load configuration: {e}"));
            return Err(e);
        }
    };

    // Initialize logging
    if cli.verbose {
        patientrag::logging::init_logging_with_level("debug")?;
    } else {
        patientrag::logging::init_logging_with_config(Some(&config))?;
    }
    info!("Configuration loaded successfully");

    // Commands that do not need the retrieval stack
    match cli.command {
        Commands::Config => return handle_config_command(&config).await,
        Commands::Serve { host, port, cors } => {
            return handle_serve_command(&config, host, port, cors).await
        }
        _ => {}
    }

    let service = RagService::new(&config).await?;

    let result = match cli.command {
        Commands::Load { reset } => handle_load_command(&service, reset).await,
        Commands::Query { vector, n_results } => {
            handle_query_command(&service, &vector, n_results).await
        }
        Commands::Ask {
            symptom,
            k,
            show_prompt,
        } => handle_ask_command(&service, &symptom, k, show_prompt).await,
        Commands::Stats => handle_stats_command(&service, &config).await,
        Commands::Config | Commands::Serve { .. } => Ok(()),
    };

    if let Err(e) = &result {
        print_error(&e.to_string());
    }
    result
}
