//! Orchestrates a full analysis run: filter, extract, link, analyze, assemble

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use globset::GlobSet;
use rayon::prelude::*;
use thicket_core::{analyze, assemble, AnalysisSummary, GraphNode, SourceFile, SymbolTable, TreeNode};

use crate::config::IndexerConfig;
use crate::error::IndexError;
use crate::extractor::{ExtractionResult, LanguageExtractor, ParsedScript};
use crate::languages::{PatternExtractor, ScriptExtractor};
use crate::linker::{LinkSource, Linker};
use crate::parser_pool::{create_parser_pool, verify_grammars, ParserPool};
use crate::registry::{LanguageRegistry, Strategy};

/// Output of one run.
#[derive(Debug, Clone)]
pub struct ProjectAnalysis {
    pub tree: TreeNode,
    pub summary: AnalysisSummary,
}

pub struct Coordinator {
    config: IndexerConfig,
    registry: LanguageRegistry,
    exclude: GlobSet,
    parser_pool: ParserPool,
}

impl Coordinator {
    /// Validate configuration and grammars. Fails only on setup errors.
    pub fn new(config: IndexerConfig) -> Result<Self, IndexError> {
        verify_grammars()?;
        let registry = LanguageRegistry::with_languages(&config.languages)?;
        let exclude = config.exclude_set()?;
        Ok(Self {
            config,
            registry,
            exclude,
            parser_pool: create_parser_pool(),
        })
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// True if a file at `path` would be extracted.
    pub fn admits(&self, path: &str) -> bool {
        !self.exclude.is_match(path) && self.registry.supports(path)
    }

    /// Analyze a project. Individual file failures are logged and skipped.
    pub fn run(&self, files: Vec<SourceFile>) -> ProjectAnalysis {
        let admitted = self.admit(files);
        tracing::debug!("extracting {} files", admitted.len());

        let mut table = SymbolTable::new();
        for (file, strategy) in &admitted {
            table.merge(GraphNode::file(&file.path, Some(strategy.language())));
        }

        let extracted: Vec<Option<ExtractionResult>> = if self.config.parallel {
            admitted
                .par_iter()
                .map(|(file, strategy)| self.extract_one(file, strategy))
                .collect()
        } else {
            admitted
                .iter()
                .map(|(file, strategy)| self.extract_one(file, strategy))
                .collect()
        };

        // Merge in admission order so first-encounter order is deterministic.
        let mut scripts: HashMap<&str, ParsedScript> = HashMap::new();
        let mut failed = 0usize;
        for ((file, _), result) in admitted.iter().zip(extracted) {
            let Some(result) = result else {
                failed += 1;
                continue;
            };
            if let Some(node) = table.get_mut(&file.path) {
                node.imports = result.imports;
            }
            table.absorb(result.symbols);
            if let Some(script) = result.script {
                scripts.insert(file.path.as_str(), script);
            }
        }
        if failed > 0 {
            tracing::debug!("{} files contributed no symbols", failed);
        }

        let paths: Vec<String> = admitted.iter().map(|(file, _)| file.path.clone()).collect();
        let sources: HashMap<String, LinkSource<'_>> = admitted
            .iter()
            .filter_map(|(file, strategy)| {
                let source = match strategy {
                    Strategy::Script(_) => LinkSource::Script(scripts.get(file.path.as_str())?),
                    Strategy::Patterns(rules) => LinkSource::Patterns(rules.as_ref()),
                };
                Some((file.path.clone(), source))
            })
            .collect();
        Linker::new(&paths).link(&mut table, &sources);

        let summary = analyze(&mut table);
        let tree = assemble(table, self.config.root_name());
        ProjectAnalysis { tree, summary }
    }

    /// Registry and exclude filter. Repeated paths keep their first occurrence.
    fn admit(&self, files: Vec<SourceFile>) -> Vec<(SourceFile, Strategy)> {
        let mut seen = HashSet::new();
        files
            .into_iter()
            .filter(|file| !self.exclude.is_match(&file.path))
            .filter_map(|file| {
                let strategy = self.registry.for_path(&file.path)?;
                seen.insert(file.path.clone()).then_some((file, strategy))
            })
            .collect()
    }

    fn extract_one(&self, file: &SourceFile, strategy: &Strategy) -> Option<ExtractionResult> {
        let result = match strategy {
            Strategy::Script(dialect) => ScriptExtractor::new(
                self.parser_pool.clone(),
                *dialect,
                self.config.tolerate_syntax_errors,
            )
            .extract(&file.path, &file.content),
            Strategy::Patterns(rules) => {
                PatternExtractor::new(Arc::clone(rules)).extract(&file.path, &file.content)
            }
        };
        match result {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!("Failed to extract {}: {}", file.path, e);
                None
            }
        }
    }
}
