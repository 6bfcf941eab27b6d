use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use synthrec::rng::seeded_or_entropy;
use synthrec::NoiseInjector;
use synthrec_gen::{
    add_column_noise, append_spurious_features, expand_dummy_vars, generate_records,
    record_layout, GeneratorConfig, NoiseColumn,
};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SYNTHREC_LOG";

#[derive(Debug, Parser)]
#[command(name = "synthrec-gen")]
#[command(about = "Class-conditioned synthetic record generation with controlled noise")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Emit noisy heart disease records on stdout
    Generate {
        /// JSON config; `config.json` in the working directory is used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        num_samples: Option<usize>,

        /// Numeric noise standard deviation and categorical flip probability
        #[arg(long)]
        noise: Option<f64>,

        /// Prefix each record with a random id of this length
        #[arg(long)]
        key_len: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,
    },
    /// Add uniform integer noise to columns of an existing file
    AddNoise {
        input: PathBuf,

        /// `index:half_width`, repeatable
        #[arg(long = "column", required = true)]
        columns: Vec<NoiseColumn>,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },
    /// Insert class-independent features ahead of the class column
    SpuriousFeatures {
        input: PathBuf,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },
    /// One-hot encode the categorical columns of generated records
    DummyVars {
        input: PathBuf,

        /// Records carry a leading id column
        #[arg(long)]
        keyed: bool,

        #[arg(long, default_value_t = ',')]
        delimiter: char,
    },
}

fn main() {
    if let Err(error) = try_main() {
        eprintln!("synthrec-gen failed: {error:#}");
        std::process::exit(1);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

fn byte_delimiter(delimiter: char) -> Result<u8> {
    if !delimiter.is_ascii() {
        bail!("delimiter {delimiter:?} must be a single ascii character");
    }
    Ok(delimiter as u8)
}

fn open_input(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("failed to open input file: {}", path.display()))
}

fn try_main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Command::Generate {
            config,
            num_samples,
            noise,
            key_len,
            seed,
        } => {
            let mut cfg = GeneratorConfig::load(config.as_deref())
                .context("failed to load generator config")?;
            if let Some(num_samples) = num_samples {
                cfg.num_samples = num_samples;
            }
            if let Some(noise) = noise {
                cfg.noise = noise;
            }
            if key_len.is_some() {
                cfg.key_len = key_len;
            }
            if seed.is_some() {
                cfg.seed = seed;
            }
            cfg.validate()?;
            generate_records(&cfg, &mut out)?;
        }
        Command::AddNoise {
            input,
            columns,
            seed,
            delimiter,
        } => {
            let mut injector = NoiseInjector::new(seeded_or_entropy(seed));
            add_column_noise(
                open_input(&input)?,
                &mut out,
                &columns,
                byte_delimiter(delimiter)?,
                &mut injector,
            )
            .with_context(|| format!("failed to add noise to {}", input.display()))?;
        }
        Command::SpuriousFeatures {
            input,
            seed,
            delimiter,
        } => {
            let mut rng = seeded_or_entropy(seed);
            append_spurious_features(
                open_input(&input)?,
                &mut out,
                byte_delimiter(delimiter)?,
                &mut rng,
            )
            .with_context(|| format!("failed to extend {}", input.display()))?;
        }
        Command::DummyVars {
            input,
            keyed,
            delimiter,
        } => {
            let (row_len, columns) = record_layout(keyed);
            expand_dummy_vars(
                open_input(&input)?,
                &mut out,
                row_len,
                &columns,
                byte_delimiter(delimiter)?,
            )
            .with_context(|| format!("failed to encode {}", input.display()))?;
        }
    }

    Ok(())
}
