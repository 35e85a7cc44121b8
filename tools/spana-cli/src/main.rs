//! spana - talking-toy flash image tool
//!
//! Lists, decodes and extracts the sounds in a flash image, encodes WAV files,
//! compiles complete voice packs and patches individual table entries.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::num::NonZeroU32;
use std::path::PathBuf;

use spana_cli::commands::{self, compile, decode, encode, extract, patch, table};
use spana_cli::manifest::VoicePackManifest;
use spana_image::{default_image_path, load_image};

#[derive(Parser)]
#[command(name = "spana")]
#[command(about = "Talking-toy flash image tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the offset table and any parse warnings
    Table {
        /// Flash image (default: $SPANA_IMAGE or flash_images/ORIGINAL_FLASH_IMAGE)
        image: Option<PathBuf>,

        /// Label table (TOML)
        #[arg(short, long)]
        labels: Option<PathBuf>,
    },

    /// Decode every entry to a WAV file
    Decode {
        /// Flash image (default: $SPANA_IMAGE or flash_images/ORIGINAL_FLASH_IMAGE)
        image: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = decode::DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Label table (TOML)
        #[arg(short, long)]
        labels: Option<PathBuf>,
    },

    /// Dump the raw payload of entries whose label matches a pattern
    Extract {
        /// Flash image (default: $SPANA_IMAGE or flash_images/ORIGINAL_FLASH_IMAGE)
        image: Option<PathBuf>,

        /// Label pattern (*, ?, [..] wildcards)
        #[arg(short, long)]
        pattern: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Label table (TOML)
        #[arg(short, long)]
        labels: Option<PathBuf>,
    },

    /// Encode a single WAV file to a raw frame stream
    Encode {
        /// Input WAV file
        input: PathBuf,

        /// Output file (default: input with .bin extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fixed gain exponent 0-6 (default: best per frame)
        #[arg(short, long)]
        gain: Option<u8>,
    },

    /// Build a complete voice-pack image from a directory of WAV files
    Compile {
        /// Path to voice_pack.toml manifest
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// WAV directory (overrides manifest)
        #[arg(short = 'd', long)]
        wav_dir: Option<PathBuf>,

        /// Output image (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Encoder threads (overrides manifest)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Edit one table entry and write a patched image
    Patch {
        /// Flash image (default: $SPANA_IMAGE or flash_images/ORIGINAL_FLASH_IMAGE)
        image: Option<PathBuf>,

        /// Entry index
        #[arg(short, long)]
        entry: usize,

        /// New start address (decimal or 0x hex)
        #[arg(long, value_parser = patch::parse_address)]
        start: Option<u32>,

        /// Point at the same payload as this entry
        #[arg(long)]
        same_as: Option<usize>,

        /// New playback rate in Hz
        #[arg(long)]
        rate: Option<NonZeroU32>,

        /// Output image
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Table { image, labels } => {
            let loaded = commands::load_image_and_table(image.as_deref(), labels.as_deref())?;
            print!("{}", table::render(&loaded.table.value, &loaded.table.warnings));
        }

        Commands::Decode {
            image,
            output_dir,
            labels,
        } => {
            let loaded = commands::load_image_and_table(image.as_deref(), labels.as_deref())?;
            let decoded = decode::decode_all(&loaded.bytes, &loaded.table.value, &output_dir)?;
            tracing::info!("Decoded {} entries into {:?}", decoded.len(), output_dir);
        }

        Commands::Extract {
            image,
            pattern,
            output_dir,
            labels,
        } => {
            let loaded = commands::load_image_and_table(image.as_deref(), labels.as_deref())?;
            let written =
                extract::extract_matching(&loaded.bytes, &loaded.table.value, &pattern, &output_dir)?;
            tracing::info!("Extracted {} entries", written.len());
        }

        Commands::Encode {
            input,
            output,
            gain,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension("bin"));
            tracing::info!("Encoding {:?} -> {:?}", input, output);
            encode::encode_wav(&input, &output, gain)?;
            tracing::info!("Done!");
        }

        Commands::Compile {
            manifest,
            wav_dir,
            output,
            jobs,
        } => {
            let manifest = VoicePackManifest::load_or_default(manifest.as_deref())?;
            let mut options = compile::CompileOptions::from_manifest(&manifest)?;
            if let Some(wav_dir) = wav_dir {
                options.wav_dir = wav_dir;
            }
            if let Some(output) = output {
                options.output = output;
            }
            if jobs.is_some() {
                options.jobs = jobs;
            }

            tracing::info!("Compiling voice pack from {:?}", options.wav_dir);
            compile::compile(&options)?;
            tracing::info!("Build complete!");
        }

        Commands::Patch {
            image,
            entry,
            start,
            same_as,
            rate,
            output,
        } => {
            let edit = patch::PatchEdit::from_flags(start, same_as, rate)?;
            let image = image.unwrap_or_else(default_image_path);
            tracing::info!("Patching {:?}", image);
            let bytes = load_image(&image)?;
            patch::patch_image(&bytes, entry, edit, &output)?;
        }
    }

    Ok(())
}
