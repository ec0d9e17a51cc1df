//! Thread-safe parser pool for tree-sitter parsers
//!
//! Tree-sitter parsers are not `Sync`, so each worker thread owns one parser
//! and requests are handed over a channel. Extraction running on the rayon
//! pool shares a single `ParserPool` by cloning its sender.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tree_sitter::{Language, Parser, Tree};

/// Grammars of the AST-capable language family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptDialect {
    JavaScript,
    TypeScript,
    Tsx,
}

impl ScriptDialect {
    /// Get the tree-sitter language for this dialect
    pub fn get_language(&self) -> Language {
        match self {
            ScriptDialect::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            ScriptDialect::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            ScriptDialect::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScriptDialect::JavaScript => "javascript",
            ScriptDialect::TypeScript => "typescript",
            ScriptDialect::Tsx => "tsx",
        }
    }
}

/// A parsing request sent to the parser pool
#[derive(Debug)]
pub struct ParseRequest {
    pub dialect: ScriptDialect,
    pub content: String,
    pub path: String,
}

/// Result of a parsing operation
#[derive(Debug)]
pub struct ParseResult {
    pub tree: Tree,
    pub path: String,
    pub content: String,
}

/// Internal message for the parser worker
struct WorkerRequest {
    request: ParseRequest,
    response_sender: Sender<Result<ParseResult>>,
}

/// Thread-safe parser pool
#[derive(Clone)]
pub struct ParserPool {
    sender: Sender<WorkerRequest>,
}

impl ParserPool {
    /// Create a new parser pool with the specified number of worker threads
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<WorkerRequest>();
        let receiver = Arc::new(Mutex::new(receiver));

        for i in 0..num_workers.max(1) {
            let receiver = Arc::clone(&receiver);
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender }
    }

    /// Worker thread function that processes parsing requests
    fn worker_thread(worker_id: usize, receiver: Arc<Mutex<Receiver<WorkerRequest>>>) {
        tracing::debug!("Parser worker {} started", worker_id);

        let mut parser = Parser::new();

        loop {
            let next = match receiver.lock() {
                Ok(guard) => guard.recv(),
                Err(_) => break,
            };
            let Ok(WorkerRequest {
                request,
                response_sender,
            }) = next
            else {
                break;
            };

            let language = request.dialect.get_language();
            if let Err(e) = parser.set_language(&language) {
                let _ = response_sender.send(Err(anyhow::anyhow!("Failed to set language: {}", e)));
                continue;
            }

            let result = match parser.parse(&request.content, None) {
                Some(tree) => Ok(ParseResult {
                    tree,
                    path: request.path,
                    content: request.content,
                }),
                None => Err(anyhow::anyhow!("Parser produced no tree for {}", request.path)),
            };

            if response_sender.send(result).is_err() {
                tracing::warn!("Failed to send parse result back to caller");
            }
        }

        tracing::debug!("Parser worker {} shutting down", worker_id);
    }

    /// Parse content, blocking the current thread until a worker answers.
    pub fn parse_blocking(&self, request: ParseRequest) -> Result<ParseResult> {
        let (response_sender, response_receiver) = mpsc::channel();

        let worker_request = WorkerRequest {
            request,
            response_sender,
        };

        self.sender
            .send(worker_request)
            .map_err(|_| anyhow::anyhow!("Parser pool is shut down"))?;

        response_receiver
            .recv()
            .map_err(|_| anyhow::anyhow!("Parser worker died"))?
    }
}

/// Check once, up front, that every bundled grammar loads into a parser.
pub fn verify_grammars() -> std::result::Result<(), tree_sitter::LanguageError> {
    let mut parser = Parser::new();
    for dialect in [ScriptDialect::JavaScript, ScriptDialect::TypeScript, ScriptDialect::Tsx] {
        parser.set_language(&dialect.get_language())?;
    }
    Ok(())
}

/// Convenience function to create a parser pool with default settings
pub fn create_parser_pool() -> ParserPool {
    // Use number of CPU cores as default worker count, but at least 2
    let num_workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);

    ParserPool::new(num_workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_typescript() {
        let pool = create_parser_pool();
        let request = ParseRequest {
            dialect: ScriptDialect::TypeScript,
            content: "class MyClass { method(): void { console.log('hi'); } }".to_string(),
            path: "test.ts".to_string(),
        };

        let result = pool.parse_blocking(request).unwrap();
        assert_eq!(result.tree.root_node().kind(), "program");
        assert!(!result.tree.root_node().has_error());
    }

    #[test]
    fn test_parse_jsx_with_javascript_grammar() {
        let pool = ParserPool::new(1);
        let request = ParseRequest {
            dialect: ScriptDialect::JavaScript,
            content: "const App = () => <div className=\"x\">hi</div>;".to_string(),
            path: "app.jsx".to_string(),
        };

        let result = pool.parse_blocking(request).unwrap();
        assert!(!result.tree.root_node().has_error());
    }

    #[test]
    fn test_grammars_load() {
        assert!(verify_grammars().is_ok());
    }
}
