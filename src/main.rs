use clap::Parser;
use color_eyre::eyre::Result;
use fruit_gacha::{
    GachaEngine,
    HttpPoolSource,
    SledSaveStore,
};
use std::path::PathBuf;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter,
    fmt,
};
use url::Url;

mod ui;

const DEFAULT_POOL_URL: &str = "https://bfscraper.app.abledtaha.online/info";
const DEFAULT_DATA_DIR: &str = "gacha_data";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Endpoint serving the reward pool.
    #[arg(long)]
    pool_url: Option<Url>,

    /// Directory for the sled save database.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Draws per roll (clamped to 1..=10000).
    #[arg(long, default_value = "1")]
    roll_count: u32,

    /// Start with the debug pane enabled (a persisted flag wins).
    #[arg(long)]
    debug: bool,

    #[arg(short, long, default_value = "false")]
    tracing: bool,
}

fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
    // The terminal belongs to the TUI, so logs go to a rolling file.
    let file_appender = rolling::daily("logs", "fruit-gacha.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .init();
    guard
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let _guard = args.tracing.then(init_tracing);

    let pool_url = match args.pool_url {
        Some(url) => url,
        None => Url::parse(DEFAULT_POOL_URL)?,
    };
    let data_dir = args
        .data_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

    let store = SledSaveStore::open(&data_dir)?;
    let source = HttpPoolSource::new(pool_url);
    let debug_override = args.debug.then_some(true);
    let engine = GachaEngine::new(&source, store, debug_override).await?;

    ui::run_app(engine, args.roll_count).await
}
