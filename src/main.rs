// Command-line front end for the background compression engine.
// The lib.rs file serves as the public API for external consumers.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use image_compressor::{
    CompressedOutput, CompressionParams, Compressor, ImageFormat, TaskHandle,
    format_from_extension,
};

/// How long to wait for a single task before giving up.
const TASK_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Parser, Debug)]
#[command(
    name = "image-compressor",
    version,
    about = "Compress images on a background worker pool"
)]
struct Args {
    /// Input image files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Compression quality (0-100, higher keeps more detail)
    #[arg(short, long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(0..=100))]
    quality: u8,

    /// Downscale factor; only values in (0, 1) resize
    #[arg(short, long, default_value_t = 1.0)]
    scale: f64,

    /// Convert to grayscale before encoding
    #[arg(short, long)]
    grayscale: bool,

    /// Output format (jpeg, png, webp); defaults to each input's extension
    #[arg(short, long)]
    format: Option<String>,

    /// Directory for outputs (defaults to each input's own directory)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Maximum number of worker threads (defaults to the host core count)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Print a JSON summary per file instead of plain messages
    #[arg(long)]
    json: bool,
}

/// Per-file summary, printed as JSON with `--json`.
#[derive(Debug, Serialize)]
struct FileSummary {
    input: String,
    output: Option<String>,
    original_size: u64,
    compressed_size: u64,
    saved_bytes: i64,
    success: bool,
    error: Option<String>,
}

struct PendingFile {
    input: PathBuf,
    output: PathBuf,
    original_size: u64,
    handle: TaskHandle,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(failures) if failures == 0 => ExitCode::SUCCESS,
        Ok(failures) => {
            error!(failures, "some files failed to compress");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<usize> {
    let format_override = args
        .format
        .as_deref()
        .map(str::parse::<ImageFormat>)
        .transpose()?;

    let compressor = match args.threads {
        Some(threads) => Compressor::with_max_workers(threads),
        None => Compressor::new(),
    };
    debug!(max_workers = compressor.max_workers(), "engine ready");

    // Submit everything up front so the pool can run wide, then collect.
    let mut pending = Vec::new();
    let mut failures = 0usize;
    for input in &args.inputs {
        match submit_file(&compressor, input, format_override, args) {
            Ok(file) => pending.push(file),
            Err(err) => {
                failures += 1;
                report(args.json, &failed_summary(input, &err));
            }
        }
    }

    for file in pending {
        let summary = match collect_file(&compressor, &file) {
            Ok(summary) => summary,
            Err(err) => {
                failures += 1;
                failed_summary(&file.input, &err)
            }
        };
        report(args.json, &summary);
    }

    Ok(failures)
}

fn submit_file(
    compressor: &Compressor,
    input: &Path,
    format_override: Option<ImageFormat>,
    args: &Args,
) -> Result<PendingFile> {
    let data = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let image = image::load_from_memory(&data)
        .with_context(|| format!("decoding {}", input.display()))?;

    let format = match format_override {
        Some(format) => format,
        None => format_from_extension(input)?,
    };
    let params = CompressionParams {
        scale: args.scale,
        quality: args.quality,
        grayscale: args.grayscale,
        format,
    };

    let handle = compressor.submit(image, params)?;
    debug!(input = %input.display(), handle = %handle, "submitted");

    Ok(PendingFile {
        input: input.to_path_buf(),
        output: output_path(input, args.out_dir.as_deref(), format),
        original_size: data.len() as u64,
        handle,
    })
}

fn collect_file(compressor: &Compressor, file: &PendingFile) -> Result<FileSummary> {
    let bytes = wait_for_bytes(compressor, file.handle)?;
    fs::write(&file.output, &bytes)
        .with_context(|| format!("writing {}", file.output.display()))?;

    Ok(FileSummary {
        input: file.input.display().to_string(),
        output: Some(file.output.display().to_string()),
        original_size: file.original_size,
        compressed_size: bytes.len() as u64,
        saved_bytes: file.original_size as i64 - bytes.len() as i64,
        success: true,
        error: None,
    })
}

/// Bounded poll-and-sleep wait for one task, then a consuming fetch.
fn wait_for_bytes(compressor: &Compressor, handle: TaskHandle) -> Result<Vec<u8>> {
    let deadline = Instant::now() + TASK_TIMEOUT;
    while !compressor.poll(handle) {
        if Instant::now() >= deadline {
            bail!("timed out waiting for task {handle}");
        }
        thread::sleep(Duration::from_millis(20));
    }

    match compressor.fetch(handle) {
        Some(Ok(output)) => match output {
            CompressedOutput::Bytes(bytes) => Ok(bytes),
            CompressedOutput::Image(_) => bail!("task {handle} produced an unexpected image sink"),
        },
        Some(Err(err)) => Err(err).with_context(|| format!("compressing task {handle}")),
        None => bail!("result for task {handle} disappeared"),
    }
}

/// `<stem>_output.<ext>` next to the input, or inside `--out-dir`.
fn output_path(input: &Path, out_dir: Option<&Path>, format: ImageFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let name = format!("{stem}_output.{}", format.primary_extension());
    match out_dir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

fn failed_summary(input: &Path, err: &anyhow::Error) -> FileSummary {
    FileSummary {
        input: input.display().to_string(),
        output: None,
        original_size: 0,
        compressed_size: 0,
        saved_bytes: 0,
        success: false,
        error: Some(format!("{err:#}")),
    }
}

fn report(json: bool, summary: &FileSummary) {
    if json {
        match serde_json::to_string(summary) {
            Ok(line) => println!("{line}"),
            Err(err) => error!(error = %err, "failed to serialize summary"),
        }
        return;
    }

    if summary.success {
        info!(
            "{} -> {} ({} -> {} bytes, saved {})",
            summary.input,
            summary.output.as_deref().unwrap_or("-"),
            summary.original_size,
            summary.compressed_size,
            summary.saved_bytes,
        );
    } else {
        error!(
            "{}: {}",
            summary.input,
            summary.error.as_deref().unwrap_or("unknown error"),
        );
    }
}
