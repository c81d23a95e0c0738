use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;

use agri_vision::Analyzer;
use agri_vision::analyzer::AnalysisRequest;
use agri_vision::cli::{AnalysisKind, Args, BatchArgs, Command, CropArgs, FixturesArgs, ImageArgs};
use agri_vision::fixtures::write_solid_fixtures;
use agri_vision::logging::init_logging;
use agri_vision::utils::{content_type_for, get_all_files, is_valid_image};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Soil(args) => run_soil(args),
        Command::Crop(args) => run_crop(args),
        Command::Batch(args) => run_batch(args),
        Command::Fixtures(args) => run_fixtures(args),
        #[cfg(feature = "grpc")]
        Command::Serve(args) => run_serve(args),
    }
}

fn read_request(path: &Path) -> Result<AnalysisRequest> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut request = AnalysisRequest::new(bytes);
    if let Some(content_type) = content_type_for(path) {
        request = request.with_content_type(content_type);
    }
    Ok(request)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_soil(args: ImageArgs) -> Result<()> {
    let analyzer = Analyzer::from_config(&args.service.to_config())?;
    let request = read_request(&args.source)?.with_location(args.latitude, args.longitude);
    print_json(&analyzer.analyze_soil(&request)?)
}

fn run_crop(args: CropArgs) -> Result<()> {
    let analyzer = Analyzer::from_config(&args.image.service.to_config())?;
    let mut request = read_request(&args.image.source)?
        .with_location(args.image.latitude, args.image.longitude);
    if let Some(crop_name) = args.crop_name {
        request = request.with_crop_name(crop_name);
    }
    print_json(&analyzer.analyze_crop(&request)?)
}

#[derive(Serialize)]
struct BatchEntry {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn analyze_file(analyzer: &Analyzer, path: &Path, kind: AnalysisKind) -> Result<serde_json::Value> {
    let request = read_request(path)?;
    let value = match kind {
        AnalysisKind::Soil => serde_json::to_value(analyzer.analyze_soil(&request)?)?,
        AnalysisKind::Crop => serde_json::to_value(analyzer.analyze_crop(&request)?)?,
    };
    Ok(value)
}

fn run_batch(args: BatchArgs) -> Result<()> {
    let analyzer = Analyzer::from_config(&args.service.to_config())?;
    let files: Vec<PathBuf> = get_all_files(&args.dir)
        .with_context(|| format!("listing {}", args.dir.display()))?
        .into_iter()
        .filter(|p| is_valid_image(p))
        .collect();
    tracing::info!(count = files.len(), dir = %args.dir.display(), "Batch analysis");

    let entries: Vec<BatchEntry> = files
        .par_iter()
        .map(|path| match analyze_file(&analyzer, path, args.kind) {
            Ok(result) => BatchEntry {
                path: path.clone(),
                result: Some(result),
                error: None,
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping image");
                BatchEntry {
                    path: path.clone(),
                    result: None,
                    error: Some(format!("{:#}", e)),
                }
            }
        })
        .collect();

    print_json(&entries)
}

fn run_fixtures(args: FixturesArgs) -> Result<()> {
    let written = write_solid_fixtures(&args.output, args.size)?;
    for path in written {
        println!("{}", path.display());
    }
    Ok(())
}

#[cfg(feature = "grpc")]
fn run_serve(args: agri_vision::cli::ServeArgs) -> Result<()> {
    let config = args.to_config();
    let addr = config
        .addr
        .parse()
        .with_context(|| format!("invalid listen address {}", config.addr))?;
    let analyzer = Analyzer::from_config(&config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(agri_vision::service::serve(analyzer, addr))
}
