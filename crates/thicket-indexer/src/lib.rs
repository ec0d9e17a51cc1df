//! Symbol extraction, import linking and run orchestration

pub mod complexity;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod extractor;
pub mod languages;
pub mod linker;
pub mod parser_pool;
pub mod registry;


pub use config::IndexerConfig;
pub use coordinator::{Coordinator, ProjectAnalysis};
pub use error::IndexError;
pub use extractor::{ExtractionResult, LanguageExtractor, ParsedScript};
pub use parser_pool::{ParseRequest, ParseResult, ParserPool, ScriptDialect};
pub use registry::{BlockStyle, LanguageRegistry, Strategy, TokenCategory};

use thicket_core::SourceFile;

/// One-shot analysis of in-memory files.
pub fn analyze_project(files: Vec<SourceFile>, config: IndexerConfig) -> Result<ProjectAnalysis, IndexError> {
    Ok(Coordinator::new(config)?.run(files))
}
