//! invitation-forge – compile invitations from the command line, or serve the
//! compiler over HTTP.
//!
//! Usage:
//!   invitation-forge compile <request.json> [-o out.html] [--config cfg.json]
//!   invitation-forge serve [--addr 127.0.0.1:8080] [--config cfg.json]
//!   invitation-forge templates
//!
//! `RUST_LOG` controls log verbosity (default `info`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::{Parser, Subcommand};

use invitation_forge::bundle::precompile_all;
use invitation_forge::config::CompilerConfig;
use invitation_forge::pipeline::{CompileRequest, Compiler};
use invitation_forge::server::{self, AppState};
use invitation_forge::templates;

#[derive(Parser)]
#[command(name = "invitation-forge", version, about = "Self-contained HTML invitation compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a request file (`{"templateIdentifier": .., "content": ..}`).
    Compile {
        request: PathBuf,
        /// Output path (default: `<slug>.html` in the current directory).
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Serve the compile API.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the template registry as JSON.
    Templates,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Compile {
            request,
            output,
            config,
        } => run_compile(&request, output, config.as_deref()).await,
        Command::Serve { addr, config } => run_serve(addr, config.as_deref()).await,
        Command::Templates => run_templates(),
    };

    if let Err(message) = result {
        eprintln!("Error: {message}");
        process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<CompilerConfig, String> {
    match path {
        Some(p) => CompilerConfig::load(p).map_err(|e| e.to_string()),
        None => Ok(CompilerConfig::default()),
    }
}

async fn run_compile(
    request_path: &Path,
    output: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<(), String> {
    let config = load_config(config_path)?;
    let text = fs::read_to_string(request_path)
        .map_err(|e| format!("reading '{}': {e}", request_path.display()))?;
    let request: CompileRequest = serde_json::from_str(&text)
        .map_err(|e| format!("parsing '{}': {e}", request_path.display()))?;

    let compiler = Compiler::from_config(config);
    let artifact = compiler.compile(&request).await.map_err(|e| e.to_string())?;

    let output = output.unwrap_or_else(|| PathBuf::from(format!("{}.html", artifact.slug)));
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("creating output directory: {e}"))?;
        }
    }
    fs::write(&output, &artifact.html)
        .map_err(|e| format!("writing '{}': {e}", output.display()))?;

    let failed = artifact.report.failed_assets.len();
    eprintln!(
        "Wrote '{}' ({} bytes, {} image{} inlined{})",
        output.display(),
        artifact.report.bytes,
        artifact.report.inlined_assets,
        if artifact.report.inlined_assets == 1 { "" } else { "s" },
        if failed == 0 {
            String::new()
        } else {
            format!(", {failed} kept as paths")
        }
    );
    Ok(())
}

async fn run_serve(addr: SocketAddr, config_path: Option<&Path>) -> Result<(), String> {
    let config = load_config(config_path)?;
    let count = precompile_all().map_err(|e| e.to_string())?;
    log::info!("Precompiled {count} client entries");
    let state = AppState::new(Compiler::from_config(config));
    server::run(state, addr).await.map_err(|e| e.to_string())
}

fn run_templates() -> Result<(), String> {
    let json = serde_json::to_string_pretty(&templates::summaries()).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}
