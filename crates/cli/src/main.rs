use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::find::{find, FindFilters};
use cli::render;
use roster_core::config::{self, AppConfig};
use roster_core::pipeline;
use roster_core::QueryService;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.logging.level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    debug!(config = ?cli.config, "configuration loaded");

    match cli.command {
        Commands::BuildIndex { json } => run_build_index(cfg, json).await,
        Commands::Ask {
            question,
            sources,
            json,
        } => run_ask(cfg, &question.join(" "), sources, json).await,
        Commands::Intent { text } => {
            let intent = roster_core::intent::parse_intent(&text.join(" "));
            println!("{}", serde_json::to_string_pretty(&intent)?);
            Ok(())
        }
        Commands::Find {
            name,
            department,
            role,
            location,
            email,
            min_years,
            max_years,
        } => {
            let filters = FindFilters {
                name,
                department,
                role,
                location,
                email,
                min_years,
                max_years,
            };
            let service = open(&cfg).await?;
            let found = find(&service.engine(), &filters);
            println!("{}", serde_json::to_string_pretty(&found)?);
            Ok(())
        }
        Commands::Overview => {
            let service = open(&cfg).await?;
            let overview = service.engine().company_overview();
            println!("{}", serde_json::to_string_pretty(&overview)?);
            Ok(())
        }
        Commands::Departments => {
            let service = open(&cfg).await?;
            let stats = service.engine().department_stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Commands::Seniority => {
            let service = open(&cfg).await?;
            let stats = service.engine().seniority_analysis();
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Commands::Check => run_check(cfg).await,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&cfg)?);
            println!("{}", render::problems_text(&cfg.validate()));
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Question answering over an employee spreadsheet", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Embed every table row and persist the vector index
    BuildIndex {
        /// Output JSON summary
        #[arg(long)]
        json: bool,
    },
    /// Answer a natural-language question
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
        /// Include the supporting documents
        #[arg(long)]
        sources: bool,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the parameters extracted from a question
    Intent {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Structured employee lookup; all given filters must match
    Find {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        min_years: Option<f64>,
        #[arg(long)]
        max_years: Option<f64>,
    },
    /// Company-wide headcount summary
    Overview,
    /// Per-department statistics
    Departments,
    /// Seniority bucket statistics
    Seniority,
    /// Readiness and provider health
    Check,
    /// Print effective settings and validation findings
    Config,
}

async fn open(cfg: &AppConfig) -> Result<QueryService> {
    let registry = pipeline::build_registry(cfg);
    pipeline::open_service(cfg, &registry).await
}

async fn run_build_index(cfg: AppConfig, json: bool) -> Result<()> {
    let registry = pipeline::build_registry(&cfg);
    let summary = pipeline::build_index(&cfg, &registry).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "indexed {} documents from {} rows (dimension {}, model {}) into {}",
            summary.documents, summary.rows, summary.dimension, summary.model, summary.index_path
        );
    }
    Ok(())
}

async fn run_ask(cfg: AppConfig, question: &str, sources: bool, json: bool) -> Result<()> {
    let service = open(&cfg).await?;
    match service.route(question, sources).await {
        Ok(answer) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                println!("{}", render::answer_text(&answer));
            }
            Ok(())
        }
        Err(err) if err.is_client_error() => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
        Err(err) => Err(err).context("answer question"),
    }
}

async fn run_check(cfg: AppConfig) -> Result<()> {
    let registry = pipeline::build_registry(&cfg);
    let service = pipeline::open_service(&cfg, &registry).await?;
    let embedder = registry.embedding(None)?;
    let llm = registry.llm(None)?;
    let report = serde_json::json!({
        "ready": service.is_ready(),
        "table_loaded": service.engine().is_loaded(),
        "table_error": service.engine().load_error(),
        "documents": service.document_count(),
        "embedding_provider": {
            "name": cfg.embeddings.provider,
            "model": embedder.model(),
            "healthy": embedder.health().await,
        },
        "llm_provider": {
            "name": cfg.llm.provider,
            "healthy": llm.health().await,
        },
        "problems": cfg.validate(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
