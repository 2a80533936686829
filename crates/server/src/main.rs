use std::error::Error;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};
use log::info;
use serde_json::{Map, Value};

use rtl_report::{AssetPaths, Branding, ReportInput, ReportRenderer, ReportTemplate, SystemClock};
use rtl_report_server::AppState;

/// Renders right-to-left Arabic school reports as PDF.
///
/// The Arabic font must be present under `fonts/` in the assets directory, which is taken from
/// `--assets-dir`, `RTL_REPORT_ASSETS_DIR`, `assets/` next to the executable or `assets/` in the
/// library crate, in that order.
#[derive(Parser)]
#[command(author, version, about = "Arabic report PDF renderer")]
struct Cli {
    /// Directory containing `fonts/` and `images/`.
    #[arg(long, global = true)]
    assets_dir: Option<PathBuf>,

    /// TOML file overriding the letterhead and names.
    #[arg(long, global = true, env = "RTL_REPORT_BRANDING")]
    branding: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "RTL_REPORT_BIND", default_value = "127.0.0.1:8000")]
        bind: SocketAddr,
    },

    /// Render one report from a JSON file.
    Render {
        /// rounds, weekly or attendance.
        #[arg(long, default_value = "rounds")]
        template: ReportTemplate,

        /// JSON object with the request fields; an empty report is rendered without it.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output file; defaults to the download name in the current directory.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        print_error_sources(&*err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let renderer = load_renderer(cli.assets_dir.as_deref(), cli.branding.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => {
            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("failed to bind {bind}"))?;
            rtl_report_server::serve(listener, AppState::new(renderer))
                .await
                .context("server stopped")?;
        }
        Commands::Render {
            template,
            input,
            output,
        } => {
            let fields = match input {
                Some(path) => read_fields(&path)?,
                None => Map::new(),
            };
            let input = ReportInput::from_fields(&fields, template.policy().malformed_rows)?;
            let document = renderer.render(template, &input, &SystemClock)?;
            let output = output.unwrap_or_else(|| PathBuf::from(&document.filename));
            fs::write(&output, &document.bytes)
                .with_context(|| format!("failed to write {}", output.display()))?;
            info!(
                "Wrote {} ({} pages)",
                output.display(),
                document.page_count
            );
        }
    }
    Ok(())
}

fn load_renderer(assets_dir: Option<&Path>, branding: Option<&Path>) -> anyhow::Result<ReportRenderer> {
    let branding = match branding {
        Some(path) => Branding::from_toml_file(path)?,
        None => Branding::default(),
    };
    let assets = AssetPaths::discover(assets_dir);
    Ok(ReportRenderer::from_assets(assets, branding)?)
}

fn read_fields(path: &Path) -> anyhow::Result<Map<String, Value>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    match serde_json::from_str::<Value>(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?
    {
        Value::Object(fields) => Ok(fields),
        _ => bail!("{} must contain a JSON object", path.display()),
    }
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
