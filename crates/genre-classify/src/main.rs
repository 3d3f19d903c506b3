//! genre-classify - classify audio files by musical genre
//!
//! ## Usage
//!
//! ```text
//! genre-classify [--config <path>] [--json] <audio files...>
//! ```
//!
//! - `--config <path>`: YAML config (default `<config_dir>/genre-classifier/config.yaml`)
//! - `--json`: print one JSON response per file instead of text
//!
//! Set `RUST_LOG=debug` to see per-stage shapes and the top 3 genres.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;

use genre_classify::{ClassificationResponse, ClassificationService, ClassifierConfig, APP_NAME};
use genre_core::config::{default_config_path, load_config};

struct Args {
    config_path: Option<PathBuf>,
    json: bool,
    files: Vec<PathBuf>,
}

fn parse_args() -> Result<Option<Args>> {
    let mut args = Args {
        config_path: None,
        json: false,
        files: Vec::new(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--json" => args.json = true,
            "--config" => {
                let path = iter.next().context("--config requires a path")?;
                args.config_path = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--") => bail!("Unknown flag: {}", flag),
            file => args.files.push(PathBuf::from(file)),
        }
    }

    if args.files.is_empty() {
        bail!("No audio files given");
    }
    Ok(Some(args))
}

fn print_usage() {
    eprintln!("Usage: genre-classify [--config <path>] [--json] <audio files...>");
}

fn run(args: Args) -> Result<bool> {
    let config_path = args
        .config_path
        .unwrap_or_else(|| default_config_path(APP_NAME));
    let config: ClassifierConfig = load_config(&config_path);

    let service = ClassificationService::from_config(&config)
        .context("Invalid genre configuration")?;
    if !service.is_ready() {
        let reason = service
            .context()
            .last_error()
            .unwrap_or_else(|| "unknown error".to_string());
        bail!("Genre model is not ready: {}", reason);
    }

    log::info!("Classifying {} file(s)", args.files.len());

    let results: Vec<_> = args
        .files
        .par_iter()
        .map(|path| (path, service.classify_path(path)))
        .collect();

    let mut all_ok = true;
    for (path, result) in results {
        all_ok &= result.is_ok();
        if args.json {
            let response = ClassificationResponse::from(result);
            let line = serde_json::to_string(&response).context("Failed to serialize response")?;
            println!("{}", line);
        } else {
            match result {
                Ok(prediction) => println!(
                    "{}: {} ({:.2}%)",
                    path.display(),
                    prediction.genre(),
                    prediction.confidence()
                ),
                Err(e) => eprintln!("{}: error: {}", path.display(), e),
            }
        }
    }

    Ok(all_ok)
}

fn main() -> ExitCode {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
