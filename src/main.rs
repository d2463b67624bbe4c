use clap::{Parser, Subcommand};
use imgtool::config::{self, ToolConfig};
use imgtool::handler::handle_request;
use imgtool::imaging::{ImageBackend, RustBackend};
use imgtool::logging::TracingErrorLog;
use imgtool::output;
use imgtool::pipeline::EditConfig;
use imgtool::response::EditResponse;
use imgtool::storage::UploadDir;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imgtool")]
#[command(about = "Declarative image edits with file-size targeting")]
#[command(long_about = "\
Declarative image edits with file-size targeting

An edit request names a stored file and the actions to apply:

  { \"fileId\": \"abc123\",
    \"action\": {
      \"resize\": {\"width\": 8, \"height\": 6, \"unit\": \"cm\", \"dpi\": 300},
      \"percentage\": 50,
      \"targetSize\": 100,
      \"quality\": 90,
      \"format\": \"webp\",
      \"rotate\": 90,
      \"maintainAspectRatio\": true } }

Actions run in a fixed order: resize, format, size target, rotate, encode.
targetSize (KB) binary-searches encoder quality and overrides quality.

Run 'imgtool gen-config' to generate a documented imgtool.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file means stock defaults)
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Uploads directory, overriding storage.uploads_dir
    #[arg(long, global = true)]
    uploads: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply an edit request (JSON file, or - for stdin)
    Edit {
        request: PathBuf,
        /// Write the image here instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Show format, dimensions and size of a stored file
    Inspect { file_id: String },
    /// Print a stock imgtool.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("imgtool=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(ExitCode::SUCCESS);
    }

    let tool_config = config::load_config(&cli.config)?;
    let uploads = upload_dir(cli.uploads.as_deref(), &tool_config);
    let backend = RustBackend::with_avif_speed(tool_config.encoding.avif_speed);

    match cli.command {
        Command::Edit { request, out } => {
            let body = read_request(&request)?;
            let edit_config = EditConfig::from_tool_config(&tool_config);
            let response =
                handle_request(&uploads, &backend, &TracingErrorLog, &body, &edit_config);
            match response {
                EditResponse::Success(outcome) => {
                    match &out {
                        Some(path) => {
                            std::fs::write(path, &outcome.bytes)?;
                            output::print_edit_output(&outcome, Some(path));
                        }
                        None => {
                            std::io::stdout().write_all(&outcome.bytes)?;
                            for line in output::format_edit_output(&outcome, None) {
                                eprintln!("{}", line);
                            }
                        }
                    }
                    Ok(ExitCode::SUCCESS)
                }
                failure => {
                    if let EditResponse::Failure { code, message, .. } = &failure {
                        output::print_error_output(code, message);
                    }
                    println!("{}", String::from_utf8_lossy(&failure.into_body()));
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Inspect { file_id } => {
            let path = uploads.resolve(&file_id)?;
            let bytes = std::fs::read(&path)?;
            let dimensions = backend.identify(&bytes)?;
            let format = image::guess_format(&bytes)
                .ok()
                .and_then(|f| f.extensions_str().first().copied());
            output::print_inspect_output(&file_id, &path, format, dimensions, bytes.len());
            Ok(ExitCode::SUCCESS)
        }
        Command::GenConfig => Ok(ExitCode::SUCCESS),
    }
}

fn upload_dir(cli_uploads: Option<&Path>, config: &ToolConfig) -> UploadDir {
    match cli_uploads {
        Some(path) => UploadDir::new(path),
        None => UploadDir::new(&config.storage.uploads_dir),
    }
}

fn read_request(path: &Path) -> std::io::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut body = Vec::new();
        std::io::stdin().read_to_end(&mut body)?;
        Ok(body)
    } else {
        std::fs::read(path)
    }
}
