use std::io::IsTerminal;

use anyhow::Result;
use clap::{Parser, Subcommand};
use codesearch_core::{SearchHandler, SearchParams};

mod render;

#[derive(Parser)]
#[command(name = "cs", about = "Code search backed by ripgrep", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a directory for a pattern
    Search {
        /// Pattern to search for (case-insensitive unless --case-sensitive)
        query: String,
        /// Directory to search; a leading ~ expands to the home directory
        #[arg(short, long, default_value = ".")]
        path: String,
        /// Maximum number of matches to return (default 100)
        #[arg(short = 'n', long)]
        max_results: Option<usize>,
        /// Context lines requested from ripgrep (default 2)
        #[arg(short = 'C', long)]
        context: Option<usize>,
        /// Match case exactly
        #[arg(short = 's', long)]
        case_sensitive: bool,
        /// Only search files matching this glob (e.g. '*.rs')
        #[arg(short, long)]
        glob: Option<String>,
    },
    /// Check whether ripgrep can be found
    Available,
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("codesearch_core=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = codesearch_config::Config::load_for(&std::env::current_dir()?)?;
    let handler = SearchHandler::from_config(&config);

    match cli.command {
        Commands::Search {
            query,
            path,
            max_results,
            context,
            case_sensitive,
            glob,
        } => {
            if !cli.json && query.chars().count() < render::MIN_QUERY_CHARS {
                println!(
                    "Type at least {} characters to search",
                    render::MIN_QUERY_CHARS
                );
                return Ok(());
            }

            let params = SearchParams {
                query: Some(query),
                path: Some(path),
                max_results: max_results.map(|n| n.to_string()),
                context_lines: context.map(|n| n.to_string()),
                case_sensitive: Some(case_sensitive.to_string()),
                glob,
            };

            match handler.search(&params).await {
                Ok(response) if cli.json => {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
                Ok(response) => {
                    let color = std::io::stdout().is_terminal();
                    render::print_results(&mut std::io::stdout().lock(), &response, color)?;
                }
                Err(e) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&e.to_json())?);
                    } else {
                        eprintln!("Error: {e}");
                    }
                    std::process::exit(if e.status == 400 { 2 } else { 1 });
                }
            }
        }
        Commands::Available => {
            let availability = handler.available();
            if cli.json {
                println!("{}", serde_json::to_string(&availability)?);
            } else if availability.available {
                println!("{} is available", handler.invoker().binary());
            } else {
                println!(
                    "{} not found. Install with: brew install ripgrep",
                    handler.invoker().binary()
                );
            }
        }
        Commands::Config => {
            let path = codesearch_config::Config::config_path();
            println!("Config path: {}", path.display());
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
