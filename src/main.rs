use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use scholai::config::{find_config_file, load_config, save_config, Config};
use scholai::mcp::McpServer;
use scholai::models::{PaperRecord, SearchHit, SearchRequest, Surface};
use scholai::storage::ArtifactListing;
use scholai::AppContext;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// ScholAI - discover, rank, download and read academic papers
#[derive(Parser, Debug)]
#[command(name = "scholai")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Discover, rank, download and extract academic papers", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table on a terminal, JSON otherwise
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if std::io::stdout().is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct SearchArgs {
    /// Single search phrase
    query: String,

    /// Maximum number of results
    #[arg(long, short = 'n', default_value_t = 100)]
    max_results: usize,

    /// Sort newest first before truncating
    #[arg(long)]
    sort_by_time: bool,

    /// Skip PDF link resolution
    #[arg(long)]
    no_pdf_link: bool,

    /// Look up venue and CCF rank for every result
    #[arg(long)]
    publication_info: bool,
}

impl SearchArgs {
    fn request(&self) -> SearchRequest {
        SearchRequest::new(&self.query)
            .max_results(self.max_results)
            .sort_by_time(self.sort_by_time)
            .with_pdf_link(!self.no_pdf_link)
            .with_publication_info(self.publication_info)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server over stdio
    Serve,

    /// Search arXiv preprints
    #[command(alias = "s")]
    Search(SearchArgs),

    /// Search conference and journal papers
    Venue(SearchArgs),

    /// CCF rank of a venue
    Rank {
        /// Venue abbreviation or full name
        venue: String,
    },

    /// Publication venue and CCF rank of a paper (DBLP)
    Info {
        /// Paper title
        title: String,

        /// Author to narrow the match
        #[arg(long)]
        author: Option<String>,
    },

    /// Resolve the PDF link of a paper page
    PdfLink {
        /// Paper page URL
        url: String,
    },

    /// Download a PDF into the data directory
    #[command(alias = "d")]
    Download {
        /// Paper title, used to name the file
        title: String,

        /// PDF URL
        url: String,
    },

    /// List downloaded papers
    List,

    /// Extract text from a PDF
    Extract {
        /// Absolute path, working-directory path, or stored file name
        path: String,
    },

    /// Write a default configuration file
    InitConfig {
        /// Destination
        #[arg(default_value = "scholai.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(cli: &Cli, config: &Config) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("scholai={}", level)),
    );
    let registry = tracing_subscriber::registry().with(filter);

    // stdout belongs to the MCP transport and command output
    if config.logging.format.as_deref() == Some("json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(find_config_file);
    let config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config".to_string(),
    })?;

    init_logging(&cli, &config);
    if let Some(path) = &config_path {
        tracing::debug!("Using config file: {}", path.display());
    }

    let format = cli.output.resolve();
    let command = cli.command.unwrap_or(Commands::Serve);

    if let Commands::InitConfig { path, force } = &command {
        if path.exists() && !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
        }
        save_config(&Config::default(), path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let app = AppContext::from_config(&config)?;

    match command {
        Commands::Serve => {
            let server = McpServer::new(Arc::new(app))?;
            server.run().await?;
        }
        Commands::Search(args) => {
            let hits = app.search.search(Surface::Preprint, &args.request()).await;
            output_hits(&hits, format)?;
        }
        Commands::Venue(args) => {
            let hits = app.search.search(Surface::Venue, &args.request()).await;
            output_hits(&hits, format)?;
        }
        Commands::Rank { venue } => {
            let rank = app.ranking.resolve(&venue)?;
            output_value(&serde_json::json!({ "venue": venue, "ccf_rank": rank }), format)?;
        }
        Commands::Info { title, author } => {
            let info = app
                .search
                .dblp()
                .publication_info(&title, author.as_deref())
                .await?;
            output_value(&serde_json::to_value(&info)?, format)?;
        }
        Commands::PdfLink { url } => match app.search.resolve_pdf_link(&url).await? {
            Some(link) => println!("{}", link),
            None => anyhow::bail!("No PDF link found on {}", url),
        },
        Commands::Download { title, url } => {
            let name = app.store.download(&title, &url).await?;
            println!("{}", app.store.dir().join(name).display());
        }
        Commands::List => {
            let listing = app.store.list().await?;
            match (format, &listing) {
                (OutputFormat::Json, _) => {
                    println!("{}", serde_json::to_string_pretty(&listing)?)
                }
                (_, ArtifactListing::Empty) => println!("{}", scholai::storage::EMPTY_LISTING),
                (_, ArtifactListing::Files(names)) => {
                    for name in names {
                        println!("{}", name);
                    }
                }
            }
        }
        Commands::Extract { path } => {
            let text = app.extraction.extract(&path).await?;
            println!("{}", text);
        }
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max.saturating_sub(3)).collect();
        cut.push_str("...");
        cut
    }
}

fn record_time(record: &PaperRecord) -> String {
    match record {
        PaperRecord::Preprint(r) => r.published.clone().unwrap_or_default(),
        PaperRecord::Venue(r) => r
            .year
            .map(|y| y.to_string())
            .or_else(|| r.updated.clone())
            .unwrap_or_default(),
        PaperRecord::Error(_) => String::new(),
    }
}

fn output_hits(hits: &[SearchHit], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(hits)?);
        return Ok(());
    }

    use comfy_table::{Attribute, Cell, Table};
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Title", "First author", "Time", "PDF", "CCF"]);

    for hit in hits {
        if let Some(message) = hit.record.error_message() {
            table.add_row(vec![
                Cell::new(format!("error: {}", truncate_chars(message, 60))),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
                Cell::new(""),
            ]);
            continue;
        }

        let rank = hit
            .publication_info
            .as_ref()
            .map(|info| info.ccf_rank.clone())
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(truncate_chars(hit.record.title().unwrap_or_default(), 50))
                .add_attribute(Attribute::Bold),
            Cell::new(truncate_chars(hit.record.author().unwrap_or_default(), 30)),
            Cell::new(record_time(&hit.record)),
            Cell::new(hit.record.pdf_url().unwrap_or_default()),
            Cell::new(rank),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn output_value(value: &serde_json::Value, format: OutputFormat) -> Result<()> {
    match (format, value) {
        (OutputFormat::Table, serde_json::Value::Object(fields)) => {
            let mut table = comfy_table::Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            for (key, field) in fields {
                let shown = match field {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                table.add_row(vec![key.clone(), shown]);
            }
            println!("{table}");
        }
        _ => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}
