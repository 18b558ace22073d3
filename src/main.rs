use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Attribute, Cell, Table};
use kaken_client::config::{
    default_config_path, find_config_file, get_config, load_config, Config,
};
use kaken_client::models::{
    Language, PersonName, Project, ProjectSearchParams, Researcher, ResearcherSearchParams,
    SearchResponse,
};
use kaken_client::utils::ResponseCache;
use kaken_client::KakenClient;
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// KAKEN - Search Japanese research grant projects and researchers
#[derive(Parser, Debug)]
#[command(name = "kaken")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search KAKEN grant projects and researchers", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Per-attempt request timeout in seconds (overrides the config file)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Bypass the response cache for this command
    #[arg(long, global = true, default_value_t = false)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Table if stdout is a terminal, JSON otherwise
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

/// Display language requested from the service
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Lang {
    Ja,
    En,
}

impl From<Lang> for Language {
    fn from(lang: Lang) -> Self {
        match lang {
            Lang::Ja => Language::Ja,
            Lang::En => Language::En,
        }
    }
}

/// Paging options shared by both searches
#[derive(clap::Args, Debug)]
struct Paging {
    /// Results per page (1-500)
    #[arg(long, short = 'n')]
    rows: Option<u32>,

    /// 1-based index of the first result
    #[arg(long)]
    start: Option<u32>,

    /// Sort order code passed through to the service
    #[arg(long)]
    sort: Option<String>,

    /// Display language
    #[arg(long, value_enum)]
    lang: Option<Lang>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search grant projects
    #[command(alias = "p")]
    Projects {
        /// Free-text keyword
        keyword: Option<String>,

        /// Project title
        #[arg(long)]
        title: Option<String>,

        /// Award number
        #[arg(long)]
        award_number: Option<String>,

        /// Research institution
        #[arg(long)]
        institution: Option<String>,

        /// Researcher name
        #[arg(long)]
        researcher: Option<String>,

        #[command(flatten)]
        paging: Paging,
    },

    /// Search researchers
    #[command(alias = "r")]
    Researchers {
        /// Free-text keyword
        keyword: Option<String>,

        /// Researcher name
        #[arg(long)]
        name: Option<String>,

        /// Affiliated institution
        #[arg(long)]
        institution: Option<String>,

        /// Researcher number
        #[arg(long)]
        number: Option<String>,

        #[command(flatten)]
        paging: Paging,
    },

    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommands {
    /// Delete every cached response
    Clear,
    /// Print the cache directory
    Path,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Destination (defaults to the user config directory)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(cli: &Cli, config: &Config) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => config.logging.level.as_str(),
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_directive(level)),
    );
    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format.as_deref() == Some("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Filter covering both the library and this binary
fn default_directive(level: &str) -> String {
    format!("kaken_client={level},kaken={level}")
}

fn load(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(path) = &cli.config {
        load_config(path).with_context(|| format!("Failed to load {}", path.display()))?
    } else if let Some(path) = find_config_file() {
        load_config(&path).with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        get_config()
    };

    if cli.no_cache {
        config.cache.enabled = false;
    }
    if let Some(secs) = cli.timeout {
        config.network.timeout_ms = secs.saturating_mul(1000);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load(&cli)?;
    init_tracing(&cli, &config);

    let format = cli.output.resolve();

    match cli.command {
        Commands::Projects {
            keyword,
            title,
            award_number,
            institution,
            researcher,
            paging,
        } => {
            let params = ProjectSearchParams {
                keyword,
                title,
                award_number,
                institution,
                researcher_name: researcher,
                results_per_page: paging.rows,
                start_index: paging.start,
                sort_order: paging.sort,
                language: paging.lang.map(Language::from),
            };
            let client = KakenClient::new(config)?;
            let response = client.search_projects(&params).await?;
            output(&response, format, project_table)?;
        }
        Commands::Researchers {
            keyword,
            name,
            institution,
            number,
            paging,
        } => {
            let params = ResearcherSearchParams {
                keyword,
                name,
                institution,
                researcher_number: number,
                results_per_page: paging.rows,
                start_index: paging.start,
                sort_order: paging.sort,
                language: paging.lang.map(Language::from),
            };
            let client = KakenClient::new(config)?;
            let response = client.search_researchers(&params).await?;
            output(&response, format, researcher_table)?;
        }
        Commands::Cache { command } => {
            let directory = config.cache.resolved_directory();
            match command {
                CacheCommands::Clear => {
                    if !config.cache.enabled {
                        tracing::warn!("Cache is disabled; clearing {} anyway", directory.display());
                    }
                    ResponseCache::new(directory.clone()).clear();
                    if !cli.quiet {
                        println!("Cleared cache at {}", directory.display());
                    }
                }
                CacheCommands::Path => println!("{}", directory.display()),
            }
        }
        Commands::Config { command } => match command {
            ConfigCommands::Init { path, force } => {
                let path = path
                    .or_else(default_config_path)
                    .context("No config directory on this platform; pass a path")?;
                if path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    );
                }
                let mut template = Config::default();
                template.app_id = None;
                template.save(&path)?;
                if !cli.quiet {
                    println!("Wrote {}", path.display());
                }
            }
        },
    }

    Ok(())
}

fn output<T: Serialize>(
    response: &SearchResponse<T>,
    format: OutputFormat,
    table: fn(&[T]) -> Table,
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&response.items)?),
        _ => {
            println!("{}", table(&response.items));
            match response.total_results {
                Some(total) => println!("{} of {} results", response.len(), total),
                None => println!("{} results", response.len()),
            }
        }
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn project_table(projects: &[Project]) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Award", "Title", "Principal investigator", "Years", "Status"]);

    for project in projects {
        let investigator = project
            .principal_investigator()
            .and_then(|m| m.name.as_ref())
            .map(|n| n.full_name.clone())
            .unwrap_or_default();
        let years = project
            .period_of_award
            .as_ref()
            .map(|p| match (p.start_fiscal_year, p.end_fiscal_year) {
                (Some(start), Some(end)) => format!("{}-{}", start, end),
                (Some(start), None) => format!("{}-", start),
                (None, Some(end)) => format!("-{}", end),
                (None, None) => String::new(),
            })
            .unwrap_or_default();
        let status = project
            .project_status
            .as_ref()
            .map(|s| s.status_code.clone())
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(project.award_number.as_deref().unwrap_or("")),
            Cell::new(truncate(project.title.as_deref().unwrap_or(""), 40))
                .add_attribute(Attribute::Bold),
            Cell::new(investigator),
            Cell::new(years),
            Cell::new(status),
        ]);
    }
    table
}

fn researcher_table(researchers: &[Researcher]) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Number", "Name", "Reading", "Affiliation"]);

    for researcher in researchers {
        let name = researcher.name.as_ref();
        let reading = name
            .and_then(|n| {
                PersonName::join_parts(
                    n.family_name_reading.as_deref(),
                    n.given_name_reading.as_deref(),
                )
            })
            .unwrap_or_default();
        let affiliation = researcher
            .current_affiliations
            .as_ref()
            .and_then(|list| list.first())
            .map(|a| {
                [a.institution.as_ref(), a.department.as_ref(), a.job_title.as_ref()]
                    .into_iter()
                    .flatten()
                    .map(|unit| unit.name.as_str())
                    .collect::<Vec<_>>()
                    .join(" / ")
            })
            .unwrap_or_default();

        table.add_row(vec![
            Cell::new(researcher.id.as_deref().unwrap_or("")),
            Cell::new(name.map(|n| n.full_name.as_str()).unwrap_or(""))
                .add_attribute(Attribute::Bold),
            Cell::new(reading),
            Cell::new(truncate(&affiliation, 40)),
        ]);
    }
    table
}
