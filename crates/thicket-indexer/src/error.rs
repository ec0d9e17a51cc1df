//! Setup errors for the indexer. Per-file failures are logged, never returned.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Invalid {category} pattern for language `{language}`: {pattern}")]
    InvalidPattern {
        language: String,
        category: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Extension `{extension}` aliases `{target}`, which is not a registered rule set")]
    UnknownAlias { extension: String, target: String },

    #[error("Language `{0}` must declare either an alias or a block style")]
    IncompleteLanguage(String),

    #[error("Failed to load tree-sitter grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("Failed to parse config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid exclude glob: {0}")]
    InvalidGlob(#[from] globset::Error),
}
