//! Subject cutout CLI
//!
//! Segments image files, writes `<stem>_cutout.png` and `<stem>_mask.png`, and
//! optionally prints one JSON response per image.

use super::config::PipelineArgs;
use crate::{
    api::SegmentationResponse,
    processor::SegmentationPipeline,
    services::ImageIOService,
    tracing_config::{init_cli_tracing, spans, TracingFormat},
    types::SegmentationResult,
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

const CUTOUT_SUFFIX: &str = "_cutout.png";
const MASK_SUFFIX: &str = "_mask.png";

/// Subject cutout CLI tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgcutout")]
pub struct Cli {
    /// Input image files or directories (use "-" for stdin)
    #[arg(value_name = "INPUT", required = true)]
    pub input: Vec<String>,

    /// Output directory [default: next to each input]
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Print the segmentation response for each image as a JSON line
    #[arg(long)]
    pub json: bool,

    /// Process directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

pub async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_cli_tracing(
        cli.pipeline.verbose,
        cli.pipeline.log_filter.as_deref(),
        TracingFormat::Console,
    )
    .context("Failed to initialize tracing")?;

    let config = cli.pipeline.to_config()?;
    info!("Scorer: {}", config.scorer);
    let pipeline =
        SegmentationPipeline::new(config).context("Failed to create segmentation pipeline")?;

    if let Some(dir) = &cli.output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
    }

    let start_time = Instant::now();
    let (processed, failed) = if cli.input.len() == 1 && cli.input.first().is_some_and(|s| s == "-") {
        process_stdin(&cli, &pipeline).await.map(|()| (1, 0))?
    } else {
        process_inputs(&cli, &pipeline)?
    };

    info!(
        "Processed {} image(s) in {:.2}s",
        processed,
        start_time.elapsed().as_secs_f64()
    );

    if failed > 0 {
        anyhow::bail!("{failed} of {} input(s) failed", processed + failed);
    }
    Ok(())
}

async fn process_stdin(cli: &Cli, pipeline: &SegmentationPipeline) -> Result<()> {
    info!("Reading image from stdin");
    let result = pipeline
        .process_reader(tokio::io::stdin())
        .await
        .context("Failed to segment stdin image")?;

    if cli.output.is_some() || !cli.json {
        write_outputs(&result, Path::new("stdin"), cli.output.as_deref())?;
    }
    if cli.json {
        print_json(&result)?;
    }
    Ok(())
}

/// Process every collected file, returning (processed, failed)
fn process_inputs(cli: &Cli, pipeline: &SegmentationPipeline) -> Result<(usize, usize)> {
    let files = collect_inputs(&cli.input, cli.recursive)?;
    if files.is_empty() {
        warn!("No supported image files found in the provided inputs");
        return Ok((0, 0));
    }
    info!("Found {} image file(s) to process", files.len());

    let _batch = spans::batch_processing(files.len()).entered();
    let progress = (files.len() > 1).then(|| batch_progress_bar(files.len() as u64));

    let mut processed = 0;
    let mut failed = 0;

    for file in &files {
        if let Some(pb) = &progress {
            pb.set_message(file.display().to_string());
        }

        let _span = spans::file_processing(file).entered();
        match process_file(cli, pipeline, file) {
            Ok(()) => processed += 1,
            Err(e) => {
                error!("Failed to process {}: {:#}", file.display(), e);
                failed += 1;
            },
        }

        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message(format!("Processed: {processed}, Failed: {failed}"));
    }

    Ok((processed, failed))
}

fn process_file(cli: &Cli, pipeline: &SegmentationPipeline, file: &Path) -> Result<()> {
    let result = pipeline
        .process_file(file)
        .with_context(|| format!("Failed to segment {}", file.display()))?;

    let (cutout, mask) = write_outputs(&result, file, cli.output.as_deref())?;
    info!(
        "{} -> {}, {} (bbox {}) | {}",
        file.display(),
        cutout.display(),
        mask.display(),
        result.bounding_box,
        result.timings.summary()
    );

    if cli.json {
        print_json(&result)?;
    }
    Ok(())
}

fn write_outputs(
    result: &SegmentationResult,
    input: &Path,
    output_dir: Option<&Path>,
) -> Result<(PathBuf, PathBuf)> {
    let (cutout, mask) = output_paths(input, output_dir);
    result.save_cutout(&cutout)?;
    result.save_mask(&mask)?;
    Ok((cutout, mask))
}

fn print_json(result: &SegmentationResult) -> Result<()> {
    let line = serde_json::to_string(&SegmentationResponse::from(result))
        .context("Failed to serialize response")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}").context("Failed to write to stdout")?;
    Ok(())
}

fn batch_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-"),
    );
    pb
}

/// Expand inputs into a sorted list of image files
///
/// Explicit files are taken as given. Directories contribute files with a
/// supported extension, skipping outputs of earlier runs.
fn collect_inputs(inputs: &[String], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let path = PathBuf::from(input);
        if path.is_file() {
            files.push(path);
        } else if path.is_dir() {
            let max_depth = if recursive { usize::MAX } else { 1 };
            for entry in WalkDir::new(&path).max_depth(max_depth) {
                let entry = entry
                    .with_context(|| format!("Failed to read directory: {}", path.display()))?;
                let candidate = entry.path();
                if entry.file_type().is_file()
                    && ImageIOService::is_supported_format(candidate)
                    && !is_generated_output(candidate)
                {
                    files.push(candidate.to_path_buf());
                }
            }
        } else {
            anyhow::bail!(
                "Input path does not exist or is not accessible: {}",
                path.display()
            );
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn is_generated_output(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(CUTOUT_SUFFIX) || name.ends_with(MASK_SUFFIX))
}

/// `<dir>/<stem>_cutout.png` and `<dir>/<stem>_mask.png`
fn output_paths(input: &Path, output_dir: Option<&Path>) -> (PathBuf, PathBuf) {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();

    (
        dir.join(format!("{stem}{CUTOUT_SUFFIX}")),
        dir.join(format!("{stem}{MASK_SUFFIX}")),
    )
}
