use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;

use enssex_correlates::{Pipeline, PipelineConfig, SyntheticSurvey};

#[derive(Parser, Debug)]
#[command(name = "enssex-correlates")]
#[command(about = "Condom-use correlates in the ENSSEX survey", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SurveyFormat {
    /// Parquet table (primary source format)
    Parquet,
    /// Delimited text with a header row (alternate source format)
    Delimited,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every pipeline stage and write the result tables
    Run {
        /// JSON configuration file; missing keys keep their defaults
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Primary survey source (Parquet)
        #[arg(long)]
        primary: Option<PathBuf>,

        /// Alternate survey source (delimited text)
        #[arg(long)]
        alternate: Option<PathBuf>,

        /// Field separator of the alternate source
        #[arg(long)]
        delimiter: Option<char>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads used for model fitting
        #[arg(long)]
        threads: Option<usize>,

        /// Fit models sequentially
        #[arg(long)]
        sequential: bool,

        /// Show a progress bar while fitting
        #[arg(long)]
        progress: bool,
    },

    /// Write a reproducible synthetic survey export
    Synthesize {
        /// Output file
        output: PathBuf,

        /// Number of respondents
        #[arg(short = 'n', long, default_value = "1000")]
        respondents: usize,

        /// Random seed
        #[arg(long, default_value = "2024")]
        seed: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value = "parquet")]
        format: SurveyFormat,

        /// Field separator for delimited output
        #[arg(long, default_value = " ")]
        delimiter: char,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Commands::Run {
            config,
            primary,
            alternate,
            delimiter,
            output,
            threads,
            sequential,
            progress,
        } => {
            let mut config = match config {
                Some(path) => PipelineConfig::from_json_file(&path)
                    .with_context(|| format!("loading configuration {}", path.display()))?,
                None => PipelineConfig::default(),
            };
            if let Some(path) = primary {
                config.primary_source = path;
            }
            if let Some(path) = alternate {
                config.alternate_source = path;
            }
            if let Some(d) = delimiter {
                config.delimiter = d;
            }
            if let Some(dir) = output {
                config.output_dir = dir;
            }
            if threads.is_some() {
                config.model.threads = threads;
            }
            if sequential {
                config.model.parallel = false;
            }
            config.model.show_progress |= progress;

            info!("Configuration:\n{config}");
            let pipeline = Pipeline::new(config).context("invalid configuration")?;
            let report = pipeline.run().context("pipeline run failed")?;
            println!("{}", report.results.summary());
            for path in &report.artifacts {
                println!("wrote {}", path.display());
            }
        }

        Commands::Synthesize {
            output,
            respondents,
            seed,
            format,
            delimiter,
        } => {
            let survey = SyntheticSurvey::new(respondents, seed);
            match format {
                SurveyFormat::Parquet => survey.write_parquet(&output),
                SurveyFormat::Delimited => {
                    anyhow::ensure!(delimiter.is_ascii(), "delimiter must be ASCII");
                    survey.write_delimited(&output, delimiter as u8)
                }
            }
            .with_context(|| format!("writing {}", output.display()))?;
            info!("Wrote {respondents} synthetic respondents to {}", output.display());
        }
    }

    Ok(())
}
