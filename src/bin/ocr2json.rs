//! CLI binary for edgequake-ocr2json.
//!
//! `serve` runs the HTTP service; `extract` runs the same pipeline once on a
//! local file. Both map flags onto a single `ServiceConfig`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_ocr2json::pipeline::input::read_pdf_file;
use edgequake_ocr2json::{
    run_pipeline, serve, AppState, OcrBackend, ResponseMode, ServiceConfig, TextExtractor,
};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the service on the default port
  ocr2json serve

  # Use a docTR-compatible OCR service instead of the vision engine
  ocr2json serve --ocr-url http://localhost:8080/ocr

  # One-off extraction, structured JSON to stdout
  ocr2json extract invoice.pdf

  # Only print the OCR transcript (no structuring call)
  ocr2json extract --transcript-only invoice.pdf

  # Call the running service
  curl --data-binary @invoice.pdf http://localhost:8000/extract-binary

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (vision OCR engine)
  RUST_LOG                Log filter, overrides --verbose / --quiet
"#;

/// Extract structured JSON from invoice PDFs with OCR and an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "ocr2json",
    version,
    about = "Extract structured JSON from invoice PDFs with OCR and an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    opts: PipelineOpts,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "OCR2JSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "OCR2JSON_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "OCR2JSON_BIND", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,

        /// Largest accepted request body in bytes.
        #[arg(long, env = "OCR2JSON_MAX_BODY_BYTES", default_value_t = 64 * 1024 * 1024)]
        max_body_bytes: usize,
    },
    /// Run the pipeline once on a local PDF and print the result.
    Extract {
        /// Local PDF file path.
        input: PathBuf,

        /// Print the OCR transcript and skip structuring.
        #[arg(long)]
        transcript_only: bool,
    },
}

#[derive(Args, Debug)]
struct PipelineOpts {
    /// Structuring model ID (default: gpt-4).
    #[arg(long, global = true, env = "OCR2JSON_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "OCR2JSON_PROVIDER")]
    provider: Option<String>,

    /// Vision model used to transcribe pages (vision OCR engine).
    #[arg(long, global = true, env = "OCR2JSON_VISION_MODEL")]
    vision_model: Option<String>,

    /// Provider for the vision model, if different from --provider.
    #[arg(long, global = true, env = "OCR2JSON_VISION_PROVIDER")]
    vision_provider: Option<String>,

    /// URL of a docTR-compatible OCR service; replaces the vision engine.
    #[arg(long, global = true, env = "OCR2JSON_OCR_URL")]
    ocr_url: Option<String>,

    /// Bearer token for the OCR service.
    #[arg(long, global = true, env = "OCR2JSON_OCR_API_KEY", hide_env_values = true)]
    ocr_api_key: Option<String>,

    /// OCR service timeout in seconds.
    #[arg(long, global = true, env = "OCR2JSON_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// Pages transcribed concurrently by the vision engine.
    #[arg(short, long, global = true, env = "OCR2JSON_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "OCR2JSON_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Path to a text file containing a custom structuring system prompt.
    #[arg(long, global = true, env = "OCR2JSON_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max structuring output tokens.
    #[arg(long, global = true, env = "OCR2JSON_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Structuring temperature (0.0–2.0).
    #[arg(long, global = true, env = "OCR2JSON_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Retries after a failed structuring call.
    #[arg(long, global = true, env = "OCR2JSON_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Per-LLM-call timeout in seconds.
    #[arg(long, global = true, env = "OCR2JSON_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Require the structuring reply to be a JSON object (strips code fences).
    #[arg(long, global = true, env = "OCR2JSON_VALIDATE")]
    validate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            bind,
            max_body_bytes,
        } => {
            let config = build_config(&cli.opts, Some((bind, max_body_bytes))).await?;
            serve(config).await.context("HTTP server failed")?;
        }
        Command::Extract {
            ref input,
            transcript_only,
        } => {
            let config = build_config(&cli.opts, None).await?;
            let start = Instant::now();
            let bytes = read_pdf_file(input)
                .await
                .with_context(|| format!("Failed to read {}", input.display()))?;

            let output = if transcript_only {
                TextExtractor::new(config)
                    .extract(&bytes)
                    .await
                    .context("Extraction failed")?
                    .into_string()
            } else {
                let state = AppState::from_config(&config);
                run_pipeline(&state, &bytes)
                    .await
                    .context("Extraction failed")?
            };

            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output.as_bytes())
                .context("Failed to write to stdout")?;
            if !output.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }

            if !cli.quiet {
                eprintln!(
                    "{} {}  {}",
                    green("✔"),
                    input.display(),
                    dim(&format!("{}ms", start.elapsed().as_millis()))
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ServiceConfig`.
async fn build_config(
    opts: &PipelineOpts,
    server: Option<(SocketAddr, usize)>,
) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder()
        .ocr_concurrency(opts.concurrency)
        .max_tokens(opts.max_tokens)
        .temperature(opts.temperature)
        .max_retries(opts.max_retries)
        .api_timeout_secs(opts.api_timeout);

    if let Some((bind, max_body_bytes)) = server {
        builder = builder.bind_addr(bind).max_body_bytes(max_body_bytes);
    }
    if let Some(ref url) = opts.ocr_url {
        builder = builder.ocr_backend(OcrBackend::Remote {
            url: url.clone(),
            api_key: opts.ocr_api_key.clone(),
            timeout_secs: opts.ocr_timeout,
        });
    }
    if let Some(ref model) = opts.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = opts.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = opts.vision_model {
        builder = builder.vision_model(model);
    }
    if let Some(ref provider) = opts.vision_provider {
        builder = builder.vision_provider_name(provider);
    }
    if let Some(ref pwd) = opts.password {
        builder = builder.pdf_password(pwd);
    }
    if let Some(ref path) = opts.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if opts.validate {
        builder = builder.response_mode(ResponseMode::Validate);
    }

    builder.build().context("Invalid configuration")
}
