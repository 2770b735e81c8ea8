//! Parallel per-file parse dispatch.
//!
//! One task per discovered file, fanned out over a scoped worker pool and
//! collected through a channel join. Tasks share nothing but the
//! immutable filter set; each returns its own ordered record buffer.
//! A failing task reports its cause in the per-file outcome instead of
//! aborting its siblings, and the dispatcher always waits for the whole
//! pool before returning.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::sync::mpsc::channel;
use tracing::{info, warn};

use crate::broker::{FileSet, MrtFile};
use crate::filters::MessageFilters;
use crate::messages::BgpMessage;

/// Result of one file's parse task.
#[derive(Debug, Clone, Serialize)]
pub struct FileParseOutcome {
    /// Position of the file in the discovered set; merge order key.
    pub file_index: usize,
    pub url: String,
    pub msgs: Vec<BgpMessage>,
    /// Recorded cause when the task failed; the record list is empty in
    /// that case.
    pub error: Option<String>,
}

/// Dispatches parse tasks onto a bounded worker pool.
pub struct ParseDispatcher {
    worker_count: Option<usize>,
}

impl ParseDispatcher {
    /// `worker_count` of `None` sizes the pool to the number of logical
    /// processors.
    pub fn new(worker_count: Option<usize>) -> ParseDispatcher {
        ParseDispatcher { worker_count }
    }

    /// Run one parse task per file and return the outcomes in
    /// file-discovery order.
    ///
    /// Blocks until every task has finished; results of fast workers are
    /// never dropped and slow workers are never cancelled. The pool is
    /// scoped to this call and released on return even when tasks fail.
    pub fn dispatch(
        &self,
        files: &FileSet,
        filters: &MessageFilters,
        per_file_limit: Option<usize>,
    ) -> Result<Vec<FileParseOutcome>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(workers) = self.worker_count {
            builder = builder.num_threads(workers);
        }
        let pool = builder
            .build()
            .map_err(|e| anyhow!("failed to build parse worker pool: {}", e))?;

        let (sender, receiver) = channel::<FileParseOutcome>();
        pool.scope(|scope| {
            for (file_index, file) in files.files().iter().enumerate() {
                let sender = sender.clone();
                scope.spawn(move |_| {
                    let _ = sender.send(parse_one_file(file_index, file, filters, per_file_limit));
                });
            }
        });
        drop(sender);

        let mut outcomes: Vec<FileParseOutcome> = receiver.iter().collect();
        outcomes.sort_unstable_by_key(|outcome| outcome.file_index);
        Ok(outcomes)
    }
}

/// Parse a single file: open a parser session with the shared filters and
/// pull records until exhaustion or the per-file cap.
fn parse_one_file(
    file_index: usize,
    file: &MrtFile,
    filters: &MessageFilters,
    limit: Option<usize>,
) -> FileParseOutcome {
    info!("start parsing {}", file.url.as_str());

    let parser = match filters.to_parser(file.url.as_str()) {
        Ok(parser) => parser,
        Err(e) => {
            warn!("failed to parse {}: {}", file.url.as_str(), e);
            return FileParseOutcome {
                file_index,
                url: file.url.clone(),
                msgs: Vec::new(),
                error: Some(format!("failed to parse {}: {}", file.url, e)),
            };
        }
    };

    let mut msgs = Vec::new();
    for elem in parser {
        msgs.push(BgpMessage::from(&elem));
        if limit.is_some_and(|limit| msgs.len() >= limit) {
            break;
        }
    }

    info!(
        "finished parsing {}, found {} messages",
        file.url.as_str(),
        msgs.len()
    );
    FileParseOutcome {
        file_index,
        url: file.url.clone(),
        msgs,
        error: None,
    }
}
