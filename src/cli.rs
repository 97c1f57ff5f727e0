//! Command-line surface: `--file`, `--output`, `--config`

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::config::{load_config, KeyPath, DEFAULT_CONFIG_PATH};
use crate::encryptor::encrypt_file;

#[derive(Debug, Parser)]
#[command(name = "encryption-tool")]
#[command(about = "Encryption Tool")]
#[command(version)]
pub struct Args {
    /// File to encrypt
    #[arg(long)]
    pub file: PathBuf,

    /// Encrypted output file path
    #[arg(long)]
    pub output: PathBuf,

    /// Config file path
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Result of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Encrypted { output: PathBuf, key_path: KeyPath },
    Failed,
}

impl Outcome {
    /// The line printed to stdout
    pub fn message(&self) -> String {
        match self {
            Self::Encrypted { output, key_path } => format!(
                "Success: Encrypted file saved to {}, key saved to {}",
                output.display(),
                key_path
            ),
            Self::Failed => "Error: Encryption failed".to_string(),
        }
    }
}

/// Load the config and encrypt the requested file once
///
/// Logging must already be initialized by the caller.
pub fn execute(args: &Args) -> Outcome {
    let config = load_config(&args.config);

    info!(
        "Encrypting {} to {}",
        args.file.display(),
        args.output.display()
    );
    if encrypt_file(&args.file, &args.output, &config.key_path) {
        info!(
            "File encrypted successfully. Key saved to {}",
            config.key_path
        );
        Outcome::Encrypted {
            output: args.output.clone(),
            key_path: config.key_path,
        }
    } else {
        Outcome::Failed
    }
}
