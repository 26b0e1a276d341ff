//! page-docx MCP server
//!
//! Serves the export tools over stdio to MCP clients.

use clap::Parser;
use page_docx::browser::{BrowserSession, ConnectionOptions, LaunchOptions};
use page_docx::export::ExportOptions;
use page_docx::mcp::ExportServer;
use rmcp::{ServiceExt, transport::stdio};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "page-docx-mcp")]
#[command(version)]
#[command(about = "Page to Word export MCP server", long_about = None)]
struct Cli {
    /// Launch browser in headed mode (default: headless)
    #[arg(long, short = 'H')]
    headed: bool,

    /// Path to custom browser executable
    #[arg(long, value_name = "PATH")]
    executable_path: Option<PathBuf>,

    /// WebSocket endpoint URL for remote browser connection
    #[arg(long, value_name = "URL")]
    ws_endpoint: Option<String>,

    /// Persistent browser profile directory
    #[arg(long, value_name = "DIR")]
    user_data_dir: Option<PathBuf>,

    /// Export options as JSON
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory exported documents are written to
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut options = match &cli.config {
        Some(path) => ExportOptions::from_file(path)?,
        None => ExportOptions::default(),
    };
    if let Some(dir) = cli.out_dir {
        options.output_dir = dir;
    }

    log::info!("page-docx MCP server v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Documents are written to {}", options.output_dir.display());

    let server = match cli.ws_endpoint {
        Some(endpoint) => {
            log::info!("Connecting to browser at {}", endpoint);
            let session = BrowserSession::connect(ConnectionOptions::new(endpoint))?;
            ExportServer::with_session(session, options)?
        }
        None => {
            let mut launch = LaunchOptions::new().headless(!cli.headed);
            if let Some(path) = cli.executable_path {
                launch = launch.chrome_path(path);
            }
            if let Some(dir) = cli.user_data_dir {
                launch = launch.user_data_dir(dir);
            }
            log::info!("Browser mode: {}", if cli.headed { "headed" } else { "headless" });
            ExportServer::with_options(launch, options)?
        }
    };

    log::info!("Ready to accept MCP connections via stdio");
    let service = server.serve(stdio()).await?;
    let quit_reason = service.waiting().await?;
    log::info!("Server quit with reason: {:?}", quit_reason);

    Ok(())
}
