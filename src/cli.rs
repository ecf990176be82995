use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a strings.xml file from the beginning
    Translate {
        /// Input strings.xml file
        #[arg(short, long)]
        input: PathBuf,

        /// Target language code (vi, en, zh, ru, ko, es, fr, de, ja)
        #[arg(short, long)]
        target_lang: Option<String>,

        /// Strings per request (1-10)
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Translation speed (1 = slowest, 5 = fastest)
        #[arg(short, long)]
        speed: Option<u8>,

        /// Output directory for the translated resources
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Write the translation log to this file when done
        #[arg(long)]
        export_log: Option<PathBuf>,
    },

    /// Continue the saved session from the first untranslated string
    Continue {
        /// Output directory for the translated resources
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Write the translation log to this file when done
        #[arg(long)]
        export_log: Option<PathBuf>,
    },

    /// Translate again every string that failed in the saved session
    RetryErrors {
        /// Output directory for the translated resources
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Write the translation log to this file when done
        #[arg(long)]
        export_log: Option<PathBuf>,
    },

    /// Set the translation of one string in the saved session
    Edit {
        /// Resource name (the `name` attribute)
        #[arg(short, long)]
        name: String,

        /// New translated value
        #[arg(long)]
        value: String,
    },

    /// Show progress of the saved session
    Status,

    /// Write the output file from the saved session
    Export {
        /// Output directory for the translated resources
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// List the models offered by a provider
    Models {
        /// Provider (groq, gemini, cerebras); defaults to the configured one
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Delete the saved session
    Clear,

    /// Write a default configuration file
    InitConfig {
        /// Where to write the file
        #[arg(short, long, default_value = "config.toml")]
        path: PathBuf,
    },
}
