//! Merging per-file parse results.
//!
//! Per-file record lists concatenate strictly in file-discovery order,
//! never by record timestamp and never by worker completion order. A
//! positive global limit keeps the prefix of the merged sequence, so
//! earlier-discovered files win ties at the limit boundary.

use crate::dispatch::FileParseOutcome;
use crate::messages::BgpMessage;

/// Merge dispatch outcomes into one ordered record list, applying the
/// global message limit when it is set and positive.
pub fn merge_outcomes(
    outcomes: Vec<FileParseOutcome>,
    msgs_limit: Option<usize>,
) -> Vec<BgpMessage> {
    let mut merged: Vec<BgpMessage> = outcomes
        .into_iter()
        .flat_map(|outcome| outcome.msgs)
        .collect();

    if let Some(limit) = msgs_limit {
        if limit > 0 && merged.len() > limit {
            merged.truncate(limit);
        }
    }

    merged
}
