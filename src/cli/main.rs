use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use manuscript_search::{
    app::Components,
    config::Config,
    indexing::CatalogueProgress,
    search::{parse_search_query, resolve_segment, QueryParams},
};
use std::io::Write;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "manuscript-search-cli")]
#[command(about = "Manage and query the manuscript search indexes", long_about = None)]
struct Cli {
    /// Log indexing progress at info level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create every index and push its settings
    Setup,

    /// Reindex one index from the catalogue
    Sync {
        #[arg(value_name = "INDEX")]
        index: String,
    },

    /// Reindex every index
    SyncAll,

    /// Delete every document of one index
    Clear {
        #[arg(value_name = "INDEX")]
        index: String,
    },

    /// Clear every index, then rebuild them all
    RebuildAll,

    /// Compare engine and catalogue counts
    Stats,

    /// Run a query against one index
    Search {
        #[arg(value_name = "INDEX")]
        index: String,

        #[arg(short, long, default_value = "")]
        q: String,

        /// Repeatable `attribute=value` filter
        #[arg(short, long, value_name = "ATTR=VALUE")]
        filter: Vec<String>,

        #[arg(short, long)]
        sort: Option<String>,

        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "manuscript_search=info"
    } else {
        "manuscript_search=warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().context("failed to load configuration")?;
    let components = Components::from_config(&config)
        .await
        .context("failed to initialise search components")?;
    let orchestrator = &components.orchestrator;

    match cli.command {
        Commands::Setup => {
            orchestrator.setup_all_indexes().await?;
            println!("All indexes configured.");
        }

        Commands::Sync { index } => {
            let index_type = resolve_segment(&index)?;
            let indexed = orchestrator
                .reindex(index_type, Some(&print_progress))
                .await?;
            finish_progress();
            println!("{}: {} documents indexed.", index, indexed);
        }

        Commands::SyncAll => {
            let counts = orchestrator.reindex_all().await?;
            for (index, indexed) in &counts {
                println!("{}: {} documents indexed.", index, indexed);
            }
        }

        Commands::Clear { index } => {
            orchestrator.clear(resolve_segment(&index)?).await?;
            println!("{}: cleared.", index);
        }

        Commands::RebuildAll => {
            let counts = orchestrator
                .clear_and_reindex_all(Some(&print_catalogue_progress))
                .await?;
            finish_progress();
            println!(
                "Rebuilt {} indexes, {} documents.",
                counts.len(),
                counts.values().sum::<u64>()
            );
        }

        Commands::Stats => {
            let stats = components.app_state(&config).admin.stats().await;
            if !stats.healthy {
                bail!("search engine at {} is not healthy", config.meilisearch.url);
            }
            println!("{:<14} {:>10} {:>10}  in sync", "index", "engine", "catalogue");
            for index in &stats.indexes {
                println!(
                    "{:<14} {:>10} {:>10}  {}",
                    index.index_type,
                    index.meilisearch_count,
                    index.db_count,
                    if index.in_sync { "yes" } else { "no" }
                );
            }
            println!(
                "{:<14} {:>10} {:>10}",
                "total", stats.total_meilisearch, stats.total_database
            );
        }

        Commands::Search {
            index,
            q,
            filter,
            sort,
            limit,
        } => {
            let registration = components.registry.by_segment(&index)?;

            let mut params = QueryParams::default();
            params.push("q", q);
            for entry in filter {
                let Some((attribute, value)) = entry.split_once('=') else {
                    bail!("filter '{}' is not of the form attribute=value", entry);
                };
                params.push(attribute.trim(), value.trim());
            }
            if let Some(sort) = sort {
                params.push("sort", sort);
            }
            if let Some(limit) = limit {
                params.push("limit", limit.to_string());
            }

            let query = parse_search_query(registration, &params, &config.search);
            let search = components.app_state(&config).search;
            let page = search.search(registration.index_type, &query).await?;

            println!(
                "{} hits (showing {} from offset {})",
                page.total,
                page.hits.len(),
                page.offset
            );
            for hit in &page.hits {
                println!("{}", serde_json::to_string_pretty(hit)?);
            }
        }
    }

    Ok(())
}

fn print_progress(done: u64, total: u64) {
    print!("\rIndexed {}/{} records", done, total);
    let _ = std::io::stdout().flush();
}

fn print_catalogue_progress(p: CatalogueProgress) {
    print!(
        "\r[{}/{}] {}: {}/{} records",
        p.index_position, p.index_count, p.index_type, p.done, p.total
    );
    let _ = std::io::stdout().flush();
}

fn finish_progress() {
    println!();
}
