//! page-docx command line
//!
//! Opens a page (or replays a saved capture), exports it and waits for the
//! document to be written.

use anyhow::{Context, bail};
use clap::Parser;
use page_docx::browser::{BrowserSession, ConnectionOptions, LaunchOptions, LivePage, StaticPage};
use page_docx::export::{ChannelSink, ExportConfig, ExportEvent, ExportOptions, Exporter, StartResponse};
use page_docx::tools::utils::normalize_url;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "page-docx")]
#[command(version)]
#[command(about = "Export a rendered web page as a Word document", long_about = None)]
struct Cli {
    /// Page to export
    #[arg(required_unless_present = "from_capture")]
    url: Option<String>,

    /// Scroll through the page first so lazily loaded content is captured
    #[arg(long)]
    auto_scroll: bool,

    /// Directory the document is written to
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Export options as JSON
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    chrome_path: Option<PathBuf>,

    /// WebSocket endpoint URL for remote browser connection
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,

    /// Export a previously saved page capture instead of a live page
    #[arg(long, value_name = "FILE", conflicts_with_all = ["ws_endpoint", "headed", "chrome_path"])]
    from_capture: Option<PathBuf>,
}

fn open_session(cli: &Cli) -> anyhow::Result<BrowserSession> {
    let session = match &cli.ws_endpoint {
        Some(endpoint) => BrowserSession::connect(ConnectionOptions::new(endpoint.clone()))?,
        None => {
            let mut launch = LaunchOptions::new().headless(!cli.headed);
            if let Some(path) = &cli.chrome_path {
                launch = launch.chrome_path(path.clone());
            }
            BrowserSession::launch(launch)?
        }
    };
    Ok(session)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut options = match &cli.config {
        Some(path) => ExportOptions::from_file(path)?,
        None => ExportOptions::default(),
    };
    if let Some(dir) = &cli.out_dir {
        options.output_dir = dir.clone();
    }

    // The session must outlive the export
    let (page, _session): (Arc<dyn LivePage>, Option<BrowserSession>) = match (&cli.from_capture, &cli.url) {
        (Some(path), _) => {
            let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let page: Arc<dyn LivePage> = Arc::new(StaticPage::from_json(&json)?);
            (page, None)
        }
        (None, Some(url)) => {
            let session = open_session(&cli)?;
            let url = normalize_url(url);
            log::info!("Loading {}", url);
            session.navigate(&url)?;
            session.wait_for_navigation()?;
            let page: Arc<dyn LivePage> = Arc::new(session.page()?);
            (page, Some(session))
        }
        (None, None) => bail!("a URL or --from-capture is required"),
    };

    let (sink, mut events) = ChannelSink::new();
    let exporter = Exporter::new(page, options, Arc::new(sink))?;

    if exporter.start_export(ExportConfig::new(cli.auto_scroll)) == StartResponse::Busy {
        bail!("an export is already running");
    }

    while let Some(event) = events.recv().await {
        match event {
            ExportEvent::ExportDone { location, .. } => {
                println!("{}", location);
                return Ok(());
            }
            ExportEvent::ExportError { message } => bail!("export failed: {}", message),
            _ => {}
        }
    }

    bail!("export ended without a result")
}
