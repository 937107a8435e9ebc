use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Could not determine the home directory")]
    NoHome,

    #[error("{} not found, run 'quickbill init' first", dir.display())]
    NotInitialized { dir: PathBuf },

    #[error("{} already exists", dir.display())]
    AlreadyInitialized { dir: PathBuf },

    #[error("Reading {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Writing {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("Parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Encoding invoice {number}: {source}")]
    Encode {
        number: String,
        source: serde_yaml::Error,
    },

    #[error("Generating default {file}: {reason}")]
    Scaffold { file: String, reason: String },

    #[error("Customer '{key}' not found in customers.yml")]
    CustomerNotFound { key: String },

    #[error("Invoice {number} not found")]
    InvoiceNotFound { number: String },
}
