//! unity-ripper — extract assets from Unity game data
//!
//! Walks a `<Game>_Data` directory (or a single asset file), hands each Unity
//! container to UnityPy and sorts the decoded textures, sprites, audio,
//! meshes, texts, fonts, scripts and materials into an output directory.

mod category;
mod config;
mod dispatch;
mod error;
mod extractor;
mod logging;
mod naming;
mod report;
mod request;
mod scan;
mod unitypy_extractor;
mod version;

use anyhow::Result;
use category::{AssetCategory, CategorySet};
use clap::{Parser, Subcommand, ValueEnum};
use config::Config;
use dispatch::Dispatcher;
use extractor::AssetBackend;
use report::ExtractionReport;
use request::{ExtractionRequest, OutputLayout};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use unitypy_extractor::UnityPyExtractor;

/// Extract assets from Unity game data
#[derive(Parser)]
#[command(name = "unity-ripper")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug-level logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also append log output to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// YAML config file (default: ./unity-ripper.yaml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract assets from a Game_Data directory or a single asset file
    Extract {
        /// File or folder to extract from
        input: PathBuf,

        /// Output folder [default: exported_assets]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Extract only these categories (repeatable)
        #[arg(long, value_enum, value_delimiter = ',', conflicts_with = "skip")]
        only: Vec<AssetCategory>,

        /// Skip these categories (repeatable)
        #[arg(long, value_enum, value_delimiter = ',')]
        skip: Vec<AssetCategory>,

        /// Do not create per-category subfolders
        #[arg(long)]
        flat: bool,

        #[command(flatten)]
        backend: BackendOptions,

        /// Report format printed to stdout
        #[arg(long, default_value = "yaml", value_enum)]
        format: OutputFormat,
    },

    /// List the files that would be handed to the asset parser
    Scan {
        /// Folder to scan
        input: PathBuf,
    },

    /// Detect the Unity version of asset files
    DetectVersion {
        /// File or folder to inspect
        input: PathBuf,

        /// Number of candidate files to check
        #[arg(long, default_value = "3")]
        limit: usize,

        #[command(flatten)]
        backend: BackendOptions,
    },

    /// List asset categories and the Unity classes they cover
    Categories,
}

#[derive(Parser, Clone)]
struct BackendOptions {
    /// Python interpreter with UnityPy installed
    #[arg(long, env = "UNITY_RIPPER_PYTHON")]
    python: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let log_file = cli.log_file.as_deref().or(config.log_file.as_deref());
    logging::init(cli.verbose, log_file)?;

    match cli.command {
        Commands::Extract {
            input,
            output,
            only,
            skip,
            flat,
            backend,
            format,
        } => {
            let categories = select_categories(config.categories.clone(), &only, &skip);
            let output = output
                .or_else(|| config.output.clone())
                .unwrap_or_else(|| PathBuf::from("exported_assets"));
            let layout = if flat {
                OutputLayout::Flat
            } else {
                config.layout.unwrap_or_default()
            };

            let request = ExtractionRequest::new(input, output, categories, cli.verbose)
                .with_layout(layout);

            if !dispatch::check_request(&request)? {
                return output_report(&ExtractionReport::default(), format);
            }

            let extractor = open_backend(&backend, &config)?;
            let report = Dispatcher::new(&extractor)
                .with_extra_extensions(config.extra_extensions.clone())
                .run(&request)?;
            output_report(&report, format)?;
        }
        Commands::Scan { input } => {
            let files = if input.is_file() {
                vec![input]
            } else if input.is_dir() {
                scan::find_input_files(&input, &config.extra_extensions)
            } else {
                anyhow::bail!("Input path does not exist: {}", input.display());
            };

            let stdout = io::stdout();
            let mut handle = stdout.lock();
            for file in files {
                writeln!(handle, "{}", file.display())?;
            }
        }
        Commands::DetectVersion {
            input,
            limit,
            backend,
        } => detect_versions(&input, limit, &backend, &config)?,
        Commands::Categories => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            for category in AssetCategory::ALL {
                writeln!(handle, "{:<10} {}", category, category.class_names().join(", "))?;
            }
        }
    }

    Ok(())
}

/// Resolve the enabled categories: `--only` wins, then config, then all; `--skip` removes.
fn select_categories(
    configured: Option<CategorySet>,
    only: &[AssetCategory],
    skip: &[AssetCategory],
) -> CategorySet {
    let mut categories = if only.is_empty() {
        configured.unwrap_or_else(CategorySet::all)
    } else {
        let mut selected = CategorySet::empty();
        for category in only {
            selected.insert(*category);
        }
        selected
    };
    for category in skip {
        categories.remove(*category);
    }
    categories
}

fn open_backend(options: &BackendOptions, config: &Config) -> Result<UnityPyExtractor> {
    let python = options.python.as_deref().or(config.python.as_deref());
    let extractor = UnityPyExtractor::new(python)?;
    let unitypy_version = extractor.check_available()?;
    info!("Using UnityPy {}", unitypy_version);
    Ok(extractor)
}

fn detect_versions(
    input: &Path,
    limit: usize,
    backend: &BackendOptions,
    config: &Config,
) -> Result<()> {
    let files = if input.is_file() {
        vec![input.to_path_buf()]
    } else if input.is_dir() {
        scan::find_input_files(input, &config.extra_extensions)
    } else {
        anyhow::bail!("Input path does not exist: {}", input.display());
    };
    if files.is_empty() {
        return Err(error::RipperError::NoAssetFiles(input.to_path_buf()).into());
    }

    // Header scanning still works without UnityPy.
    let unitypy = match open_backend(backend, config) {
        Ok(unitypy) => Some(unitypy),
        Err(e) => {
            warn!("{:#}; falling back to header scan", e);
            None
        }
    };
    let unitypy_ref = unitypy.as_ref().map(|u| u as &dyn AssetBackend);

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for file in files.iter().take(limit) {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        match version::detect_unity_version(file, unitypy_ref) {
            Some(found) => {
                let compatibility = version::check_compatibility(&found.version);
                writeln!(handle, "File: {}", name)?;
                writeln!(handle, "  Unity version: {}", found.version)?;
                writeln!(handle, "  Status: {}", compatibility)?;
                if !compatibility.is_compatible() {
                    writeln!(handle, "  Warning: extraction will likely fail")?;
                }
            }
            None => {
                writeln!(handle, "File: {}", name)?;
                writeln!(handle, "  Could not detect version")?;
            }
        }
    }

    Ok(())
}

fn output_report(report: &ExtractionReport, format: OutputFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    match format {
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(report)?;
            write!(handle, "{}", yaml)?;
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report)?;
            writeln!(handle, "{}", json)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_categories_defaults_to_all() {
        assert_eq!(select_categories(None, &[], &[]), CategorySet::all());
    }

    #[test]
    fn test_select_categories_only_and_skip() {
        let selected = select_categories(
            None,
            &[AssetCategory::Audio, AssetCategory::Fonts],
            &[AssetCategory::Fonts],
        );
        assert_eq!(selected, [AssetCategory::Audio].into_iter().collect());
    }

    #[test]
    fn test_select_categories_config_then_skip() {
        let configured: CategorySet = [AssetCategory::Meshes, AssetCategory::Texts]
            .into_iter()
            .collect();
        let selected = select_categories(Some(configured), &[], &[AssetCategory::Texts]);
        assert_eq!(selected, [AssetCategory::Meshes].into_iter().collect());

        let selected = select_categories(Some(CategorySet::empty()), &[], &[]);
        assert!(selected.is_empty());
    }

    #[test]
    fn test_skipping_everything_needs_no_backend() {
        let tmp = tempfile::TempDir::new().unwrap();
        let selected = select_categories(None, &[], &AssetCategory::ALL);
        assert!(selected.is_empty());

        let request = ExtractionRequest::new(tmp.path(), tmp.path().join("out"), selected, false);
        assert!(!dispatch::check_request(&request).unwrap());

        let missing = ExtractionRequest::new(
            tmp.path().join("no/such/dir"),
            tmp.path().join("out"),
            CategorySet::all(),
            false,
        );
        assert!(matches!(
            dispatch::check_request(&missing),
            Err(error::RipperError::InputNotFound(_))
        ));
    }

    #[test]
    fn test_cli_parses_category_lists() {
        let cli = Cli::try_parse_from([
            "unity-ripper",
            "extract",
            "Game_Data",
            "--only",
            "textures,audio",
            "-v",
        ])
        .unwrap();
        match cli.command {
            Commands::Extract { only, .. } => {
                assert_eq!(only, vec![AssetCategory::Textures, AssetCategory::Audio]);
            }
            _ => panic!("expected extract"),
        }
        assert!(cli.verbose);

        assert!(Cli::try_parse_from([
            "unity-ripper",
            "extract",
            "Game_Data",
            "--only",
            "audio",
            "--skip",
            "fonts",
        ])
        .is_err());
    }
}
