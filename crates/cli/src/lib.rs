use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syllabus_protocol::{search_response_schema, HealthReport};
use syllabus_search::{EngineConfig, RetrievalEngine};

mod http_api;
mod server_security;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    print_stdout(&text)
}

#[derive(Parser)]
#[command(name = "syllabus")]
#[command(about = "Hybrid retrieval over university course syllabi", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Engine configuration file (TOML or JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory the dataset paths are relative to
    #[arg(long, global = true)]
    corpus_root: Option<PathBuf>,

    /// Directory of tabular (CSV) course files
    #[arg(long, global = true)]
    tabular_dir: Option<PathBuf>,

    /// Override embedding backend in this process
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum EmbedMode {
    Openai,
    Stub,
}

impl EmbedMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Stub => "stub",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Answer one query and print the ranked passages as JSON
    Search(SearchArgs),

    /// Serve the search API over HTTP (POST /search, GET /health)
    ServeHttp(ServeArgs),

    /// Load every configured corpus and report what was found
    Doctor(DoctorArgs),

    /// Print the JSON schema of the search response
    Schema,
}

#[derive(Args)]
struct SearchArgs {
    /// Question text
    query: String,

    /// Pretty-print JSON response
    #[arg(long)]
    pretty: bool,

    /// Print only the synthesized context block
    #[arg(long)]
    context_only: bool,
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address, e.g. 127.0.0.1:8000
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: String,

    /// Allow binding to non-loopback addresses
    #[arg(long)]
    public: bool,

    /// Load the corpora before accepting requests
    #[arg(long)]
    warm: bool,
}

#[derive(Args)]
struct DoctorArgs {
    /// Pretty-print JSON report
    #[arg(long)]
    pretty: bool,
}

#[derive(Serialize)]
struct DatasetStatus {
    name: String,
    records: PathBuf,
    embeddings: PathBuf,
    available: bool,
}

#[derive(Serialize)]
struct DoctorReport {
    ok: bool,
    embedding_mode: String,
    datasets: Vec<DatasetStatus>,
    tabular_dir: PathBuf,
    tabular_dir_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    health: HealthReport,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Search(args) => run_search(args, &config).await?,
        Commands::ServeHttp(args) => serve_http(args, &config).await?,
        Commands::Doctor(args) => run_doctor(args, &config).await?,
        Commands::Schema => print_json(&search_response_schema()?, true)?,
    }

    Ok(())
}

/// Config file, then environment, then command-line flags.
fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    config.apply_env()?;

    if let Some(root) = &cli.corpus_root {
        config.corpus_root = root.clone();
    }
    if let Some(dir) = &cli.tabular_dir {
        config.tabular_dir = Some(absolute(dir)?);
    }
    if let Some(mode) = cli.embed_mode {
        config.embedding.mode = mode.as_str().to_string();
    }
    log::debug!(
        "Corpus root {}, tabular dir {}, embedding mode {}",
        config.corpus_root.display(),
        config.resolved_tabular_dir().display(),
        config.embedding.mode
    );
    Ok(config)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(cwd.join(path))
}

fn build_engine(config: &EngineConfig) -> Result<RetrievalEngine> {
    let embedder = config
        .embedder()
        .context("Failed to configure the embedding backend")?;
    Ok(RetrievalEngine::from_config(config, embedder)?)
}

async fn run_search(args: SearchArgs, config: &EngineConfig) -> Result<()> {
    let engine = build_engine(config)?;
    let response = engine
        .search(&args.query)
        .await
        .with_context(|| format!("Search failed for query '{}'", args.query))?;

    if args.context_only {
        print_stdout(&response.context)
    } else {
        print_json(&response, args.pretty)
    }
}

async fn run_doctor(args: DoctorArgs, config: &EngineConfig) -> Result<()> {
    let datasets: Vec<DatasetStatus> = config
        .dataset_descriptors()
        .into_iter()
        .map(|ds| DatasetStatus {
            available: ds.is_available(),
            name: ds.name,
            records: ds.records,
            embeddings: ds.embeddings,
        })
        .collect();
    let tabular_dir = config.resolved_tabular_dir();

    // Loading needs no embedding client, so doctor works without an API key.
    let engine = RetrievalEngine::from_config(
        config,
        Arc::new(syllabus_vector_store::StubEmbedder::new(
            config.embedding.stub_dimension,
        )),
    )?;
    let error = engine.warm().await.err().map(|e| e.to_string());

    let report = DoctorReport {
        ok: error.is_none(),
        embedding_mode: config.embedding.mode.clone(),
        datasets,
        tabular_dir_exists: tabular_dir.is_dir(),
        tabular_dir,
        error,
        health: engine.health(),
    };
    print_json(&report, args.pretty)?;

    if !report.ok {
        std::process::exit(1);
    }
    Ok(())
}

async fn serve_http(args: ServeArgs, config: &EngineConfig) -> Result<()> {
    let addr = server_security::guarded_bind_addr(&args.bind, args.public).await?;
    let engine = build_engine(config)?;
    if args.warm {
        engine.warm().await.context("Failed to load corpora")?;
    }

    let state = Arc::new(http_api::HttpState { engine });
    let app = http_api::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let base_url = format!("http://{local_addr}");

    print_stdout(&format!("Serving search API: {base_url}/search"))?;
    print_stdout(&format!("Health endpoint: {base_url}/health"))?;
    print_stdout(&format!(
        "Try: curl -X POST {base_url}/search -H 'Content-Type: application/json' -d '{{\"query\":\"民法の単位は?\"}}'"
    ))?;
    axum::serve(listener, app).await?;
    Ok(())
}
