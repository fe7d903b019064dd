use std::fs::File;
use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use evodex_crawler::{CrawlerConfig, Fetcher, OnError};
use evodex_pokedb::site::{DEFAULT_OUTPUT_DIR, DEFAULT_URL_LIST, EVOLUTION_URL};
use evodex_pokedb::{CollectorConfig, GeneratorConfig, HtmlPdfRenderer};
use tokio::runtime;

/// Fully evolved Pokémon sheets from pokemondb.net
#[derive(Debug, Parser)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: SubCommand,

    /// When quiet no logs are outputted
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    Collect(CollectArgs),
    Generate(GenerateArgs),
    Run(RunArgs),
    #[command(hide = true)]
    Completion,
}

#[derive(Debug, Clone, clap::Args)]
pub struct CrawlerArgs {
    /// Optional default crawler yaml configuration file
    #[arg(env = "EVODEX_CRAWLER_CONFIG", long)]
    pub crawler_config: Option<PathBuf>,
    /// Override crawler's user agent
    #[arg(long)]
    pub user_agent: Option<String>,
    /// Override crawler's request timeout, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Override crawler's connection timeout, in seconds
    #[arg(long)]
    pub connect_timeout: Option<u64>,
    /// Override crawler's maximum concurrent page downloads
    #[arg(long)]
    pub concurrent_downloads: Option<usize>,
    /// Override crawler's retries of transient download failures
    #[arg(long)]
    pub retries: Option<u32>,
    /// Override crawler's download error handling strategy
    #[arg(value_enum, long)]
    pub on_dl_error: Option<OnError>,
    /// Override crawler's scrap error handling strategy
    #[arg(value_enum, long)]
    pub on_scrap_error: Option<OnError>,
}

impl TryFrom<&CrawlerArgs> for CrawlerConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlerArgs) -> Result<Self, Self::Error> {
        let mut conf = if let Some(file) = args.crawler_config.as_ref().map(File::open) {
            serde_yaml::from_reader(file?)?
        } else {
            CrawlerConfig::default()
        };
        if let Some(user_agent) = &args.user_agent {
            conf.user_agent = user_agent.to_string();
        }
        if let Some(timeout) = args.timeout {
            conf.timeout_secs = timeout;
        }
        if let Some(connect_timeout) = args.connect_timeout {
            conf.connect_timeout_secs = connect_timeout;
        }
        if let Some(concurrent_downloads) = args.concurrent_downloads {
            conf.concurrent_downloads = concurrent_downloads;
        }
        if let Some(retries) = args.retries {
            conf.retries = retries;
        }
        if let Some(on_dl_error) = args.on_dl_error {
            conf.on_dl_error = on_dl_error;
        }
        if let Some(on_scrap_error) = args.on_scrap_error {
            conf.on_scrap_error = on_scrap_error;
        }
        Ok(conf)
    }
}

/// Write the URLs of fully evolved species to a text file
#[derive(Debug, clap::Args)]
pub struct CollectArgs {
    /// Evolution listing page
    #[arg(long, default_value = EVOLUTION_URL)]
    pub listing_url: String,
    /// Path to the URL list to write
    #[arg(long, short, default_value = DEFAULT_URL_LIST)]
    pub output_file: PathBuf,
    /// Decide from the listing's chains only, without visiting detail pages
    #[arg(long)]
    pub from_listing: bool,
    #[command(flatten)]
    pub crawler: CrawlerArgs,
}

impl From<&CollectArgs> for CollectorConfig {
    fn from(args: &CollectArgs) -> Self {
        Self {
            listing_url: args.listing_url.clone(),
            output_file: args.output_file.clone(),
            from_listing: args.from_listing,
        }
    }
}

/// Render one PDF per species of a URL list
#[derive(Debug, clap::Args)]
pub struct GenerateArgs {
    /// Path to the URL list to read
    #[arg(long, short, default_value = DEFAULT_URL_LIST)]
    pub input_file: PathBuf,
    /// Directory the PDFs are written to
    #[arg(long, short = 'd', default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,
    #[command(flatten)]
    pub crawler: CrawlerArgs,
}

impl From<&GenerateArgs> for GeneratorConfig {
    fn from(args: &GenerateArgs) -> Self {
        Self {
            url_list: args.input_file.clone(),
            output_dir: args.output_dir.clone(),
        }
    }
}

/// Collect then generate
#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Evolution listing page
    #[arg(long, default_value = EVOLUTION_URL)]
    pub listing_url: String,
    /// Path to the intermediate URL list
    #[arg(long, default_value = DEFAULT_URL_LIST)]
    pub url_list: PathBuf,
    /// Directory the PDFs are written to
    #[arg(long, short = 'd', default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,
    /// Decide from the listing's chains only, without visiting detail pages
    #[arg(long)]
    pub from_listing: bool,
    #[command(flatten)]
    pub crawler: CrawlerArgs,
}

fn block_on<F: std::future::Future>(fut: F) -> anyhow::Result<F::Output> {
    let rt = runtime::Builder::new_current_thread().enable_all().build()?;
    Ok(rt.block_on(fut))
}

pub fn collect(args: CollectArgs) -> anyhow::Result<()> {
    let fetcher = Fetcher::new(&(&args.crawler).try_into()?)?;
    let conf = CollectorConfig::from(&args);
    let report = block_on(evodex_pokedb::collect(&fetcher, &conf))??;
    log::info!(
        "{} fully evolved species out of {} ({} skipped)",
        report.fully_evolved.len(),
        report.candidates,
        report.failures.len()
    );
    Ok(())
}

pub fn generate_pdfs(args: GenerateArgs) -> anyhow::Result<()> {
    let fetcher = Fetcher::new(&(&args.crawler).try_into()?)?;
    let conf = GeneratorConfig::from(&args);
    block_on(evodex_pokedb::generate(&fetcher, &conf, &HtmlPdfRenderer))??;
    Ok(())
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let fetcher = Fetcher::new(&(&args.crawler).try_into()?)?;
    let collect_conf = CollectorConfig {
        listing_url: args.listing_url,
        output_file: args.url_list.clone(),
        from_listing: args.from_listing,
    };
    let generate_conf = GeneratorConfig {
        url_list: args.url_list,
        output_dir: args.output_dir,
    };

    let report = block_on(async {
        evodex_pokedb::collect(&fetcher, &collect_conf).await?;
        evodex_pokedb::generate(&fetcher, &generate_conf, &HtmlPdfRenderer).await
    })??;

    println!(
        "Generated {} PDFs in {}",
        report.outputs.len(),
        generate_conf.output_dir.display()
    );
    Ok(())
}

fn init_logger() {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or("evodex=info,evodex_crawler=info,evodex_pokedb=info"),
    )
    .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if !args.quiet && !matches!(args.cmd, SubCommand::Completion) {
        init_logger();
    }

    match args.cmd {
        SubCommand::Collect(args) => collect(args),
        SubCommand::Generate(args) => generate_pdfs(args),
        SubCommand::Run(args) => run(args),
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "evodex", &mut io::stdout());
            Ok(())
        }
    }
}
