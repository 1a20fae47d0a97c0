use anyhow::{Context, Result};
use clap::Parser;
use dircrawl::{
    input, logging, BatchRunner, BatchSummary, CrawlConfig, CrawlController, Engine,
    FetcherFactory, HeadlessFactory, HttpFactory, InterruptHandle, WorkUnit,
};
use log::{error, info, LevelFilter};
use std::path::PathBuf;
use std::process::ExitCode;

/// Command line arguments
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// CSV file listing cities (columns: city, contractor_url)
    #[clap(short, long)]
    input: PathBuf,

    /// TOML configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Skip the first K cities of the input
    #[clap(short, long, default_value = "0")]
    skip: usize,

    /// Maximum listing pages per city
    #[clap(short, long)]
    max_pages: Option<u32>,

    /// Site root that listing paths are joined onto
    #[clap(short, long)]
    base_url: Option<String>,

    /// Directory for per-city checkpoint files
    #[clap(short, long)]
    output_dir: Option<PathBuf>,

    /// Page fetcher backend
    #[clap(short, long, value_enum)]
    engine: Option<Engine>,

    /// Show the browser window
    #[clap(long)]
    headful: bool,

    /// Stop the whole batch when a city is interrupted
    #[clap(long)]
    stop_on_interrupt: bool,

    /// Log level
    #[clap(short, long, default_value = "info")]
    log_level: LevelFilter,
}

impl Args {
    /// Configuration file (or defaults) with command line overrides applied
    fn crawl_config(&self) -> Result<CrawlConfig> {
        let mut config = match &self.config {
            Some(path) => CrawlConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?,
            None => CrawlConfig::default(),
        };

        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        if self.headful {
            config.headless = false;
        }
        if self.stop_on_interrupt {
            config.stop_on_interrupt = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.log_level);

    match run(args).await {
        Ok(summary) if summary.interrupted() => ExitCode::from(130),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<BatchSummary> {
    let config = args.crawl_config()?;
    let units = input::load_work_units(&args.input, args.skip)
        .context("Failed to load city list")?;

    info!(
        "Crawling {} cities from {} with the {:?} engine",
        units.len(),
        config.base_url,
        config.engine
    );

    match config.engine {
        Engine::Headless => {
            let factory = HeadlessFactory::new(config.headless, config.user_agent.clone());
            run_batch(factory, &config, &units).await
        }
        Engine::Http => {
            let factory = HttpFactory::new(config.user_agent.clone());
            run_batch(factory, &config, &units).await
        }
    }
}

async fn run_batch<F: FetcherFactory>(
    factory: F,
    config: &CrawlConfig,
    units: &[WorkUnit],
) -> Result<BatchSummary> {
    let controller = CrawlController::from_config(factory, config)
        .context("Failed to initialize crawl controller")?;

    let interrupts = InterruptHandle::new();
    let listener = interrupts.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            listener.trigger();
        }
    });

    let runner = BatchRunner::new(controller, interrupts, config.stop_on_interrupt);
    let summary = runner.run(units).await;

    for (unit, reason) in &summary.failed {
        error!("{} failed: {}", unit.city_name, reason);
    }
    Ok(summary)
}
