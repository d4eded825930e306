//! AST Adapter worker pool: `tree_sitter::Parser` is not `Send`, so
//! parsing happens on a small set of dedicated OS threads reached through
//! a channel, and async callers bridge in via `spawn_blocking`. This is
//! also the bounded CPU-bound parse pool (P) of the concurrency model —
//! parse jobs are pure `(path, content) -> Tree` functions that never
//! touch the graph.

use anyhow::Result;
use codegraph_core::Language;
use std::path::PathBuf;
use tree_sitter::Parser;

fn tree_sitter_language(language: Language) -> Option<tree_sitter::Language> {
    Some(match language {
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::C => tree_sitter_c::LANGUAGE.into(),
        Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        _ => return None,
    })
}

/// A parsing request sent to the parser pool.
pub struct ParseRequest {
    pub language: Language,
    pub content: String,
    pub path: PathBuf,
}

/// Result of a parsing operation. `tree_sitter::Tree` owns its bytes and
/// is `Send`, so this crosses the `spawn_blocking` boundary intact.
pub struct ParseResult {
    pub tree: tree_sitter::Tree,
    pub path: PathBuf,
    pub content: String,
}

struct WorkerRequest {
    request: ParseRequest,
    response_sender: std::sync::mpsc::Sender<Result<ParseResult>>,
}

/// Thread-safe parser pool.
pub struct ParserPool {
    sender: std::sync::mpsc::Sender<WorkerRequest>,
}

impl ParserPool {
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = std::sync::mpsc::channel::<WorkerRequest>();
        let receiver = std::sync::Arc::new(std::sync::Mutex::new(receiver));

        for i in 0..num_workers {
            let receiver = receiver.clone();
            std::thread::spawn(move || Self::worker_thread(i, receiver));
        }

        Self { sender }
    }

    fn worker_thread(
        worker_id: usize,
        receiver: std::sync::Arc<std::sync::Mutex<std::sync::mpsc::Receiver<WorkerRequest>>>,
    ) {
        tracing::debug!(worker_id, "parser worker started");
        let mut parser = Parser::new();

        loop {
            let WorkerRequest { request, response_sender } = match receiver.lock().unwrap().recv() {
                Ok(req) => req,
                Err(_) => {
                    tracing::debug!(worker_id, "parser worker shutting down");
                    break;
                }
            };

            let Some(ts_language) = tree_sitter_language(request.language) else {
                let _ = response_sender
                    .send(Err(anyhow::anyhow!("UNSUPPORTED_LANGUAGE: {:?}", request.language)));
                continue;
            };

            if let Err(e) = parser.set_language(&ts_language) {
                let _ = response_sender.send(Err(anyhow::anyhow!("failed to set language: {e}")));
                continue;
            }

            let result = match parser.parse(&request.content, None) {
                Some(tree) => Ok(ParseResult { tree, path: request.path, content: request.content }),
                None => Err(anyhow::anyhow!("PARSE_ERROR: tree-sitter returned no tree")),
            };

            if response_sender.send(result).is_err() {
                tracing::warn!(worker_id, "caller dropped before receiving parse result");
            }
        }
    }

    pub fn parse_blocking(&self, request: ParseRequest) -> Result<ParseResult> {
        let (response_sender, response_receiver) = std::sync::mpsc::channel();
        self.sender
            .send(WorkerRequest { request, response_sender })
            .map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;
        response_receiver.recv().map_err(|_| anyhow::anyhow!("parser worker died"))?
    }

    pub async fn parse(&self, request: ParseRequest) -> Result<ParseResult> {
        let sender = self.sender.clone();
        tokio::task::spawn_blocking(move || {
            let (response_sender, response_receiver) = std::sync::mpsc::channel();
            sender
                .send(WorkerRequest { request, response_sender })
                .map_err(|_| anyhow::anyhow!("parser pool is shut down"))?;
            response_receiver.recv().map_err(|_| anyhow::anyhow!("parser worker died"))?
        })
        .await
        .map_err(|e| anyhow::anyhow!("parser task join error: {e}"))?
    }
}

impl Clone for ParserPool {
    fn clone(&self) -> Self {
        Self { sender: self.sender.clone() }
    }
}

pub fn create_parser_pool() -> ParserPool {
    let num_workers = std::thread::available_parallelism().map(|n| n.get().max(2)).unwrap_or(2);
    ParserPool::new(num_workers)
}
