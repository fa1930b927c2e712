//! Command-line interface: the server plus setup helpers.

pub mod configure;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::db_url;

#[derive(Parser)]
#[command(name = "file-catalog", version, about = "File catalog server and setup tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Interactively choose a storage provider and write an env file
    Configure {
        /// Where to write the configuration
        #[arg(short, long, default_value = ".env")]
        output: PathBuf,
    },
    /// Encode or decode a base64 database URL
    DbUrl {
        #[command(subcommand)]
        action: DbUrlAction,
    },
}

#[derive(Subcommand)]
pub enum DbUrlAction {
    /// Base64-encode a database URL for DATABASE_URL_BASE64
    Encode { url: String },
    /// Decode a DATABASE_URL_BASE64 value
    Decode { value: String },
}

/// Run a `db-url` action and return the text to print.
pub fn run_db_url(action: &DbUrlAction) -> Result<String, db_url::DbUrlError> {
    match action {
        DbUrlAction::Encode { url } => {
            let encoded = db_url::encode(url);
            Ok(format!(
                "Encoded URL:\n{encoded}\n\nAdd this to your env file:\nDATABASE_URL_BASE64=\"{encoded}\""
            ))
        }
        DbUrlAction::Decode { value } => {
            let decoded = db_url::decode(value)?;
            Ok(format!("Decoded URL:\n{decoded}"))
        }
    }
}
