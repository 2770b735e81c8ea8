//! The search pipeline: discovery, parallel parse, and merge.
//!
//! Three operations make up the caller surface: parse one file, list
//! files for a time window, and search (discover + parse). Every
//! operation returns a fully-formed response value; a populated `error`
//! field is the only failure signal, and the sole error that ever crosses
//! this boundary is an unparseable time range. All other faults are
//! logged and degrade to empty results.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::merge_outcomes;
use crate::broker::{describe_url, BrokerClient, FileSet, MrtFile};
use crate::config::MrtSearchConfig;
use crate::dispatch::ParseDispatcher;
use crate::filters::{FilterOptions, MessageFilters};
use crate::messages::BgpMessage;

/// Response error string for unparseable time ranges.
pub const INVALID_TIMESTAMP: &str = "invalid timestamp";

/// Query for the single-file parse operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseFileQuery {
    /// URL of the MRT file to parse
    pub url: String,

    #[serde(flatten)]
    pub filters: FilterOptions,

    /// Cap on the number of messages returned from this file
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Query for the file-listing operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListFilesQuery {
    /// Start timestamp, Unix time or RFC3339
    pub ts_start: String,

    /// End timestamp, Unix time or RFC3339
    pub ts_end: String,

    /// Narrow to a collection project, `riperis` or `routeviews`
    #[serde(default)]
    pub project: Option<String>,

    /// Narrow to a single collector, e.g. `rrc00` or `route-views2`
    #[serde(default)]
    pub collector: Option<String>,
}

/// Query for the combined discover-and-parse operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Start timestamp, Unix time or RFC3339
    pub ts_start: String,

    /// End timestamp, Unix time or RFC3339
    pub ts_end: String,

    /// Narrow to a collection project, `riperis` or `routeviews`
    #[serde(default)]
    pub project: Option<String>,

    /// Narrow to a single collector, e.g. `rrc00` or `route-views2`
    #[serde(default)]
    pub collector: Option<String>,

    #[serde(flatten)]
    pub filters: FilterOptions,

    /// Cap on the total number of messages returned; the configured
    /// default (100) applies when absent, 0 means unlimited
    #[serde(default)]
    pub msgs_limit: Option<usize>,

    /// Cap on the number of discovered files that get parsed
    #[serde(default)]
    pub files_limit: Option<usize>,

    /// Discover only, skip parsing entirely
    #[serde(default)]
    pub dry_run: bool,
}

/// File-listing response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileSearchResult {
    pub count: usize,
    pub total_size: i64,
    pub error: Option<String>,
    pub files: Vec<MrtFile>,
}

impl FileSearchResult {
    pub fn from_set(set: &FileSet) -> FileSearchResult {
        FileSearchResult {
            count: set.count(),
            total_size: set.total_size(),
            error: None,
            files: set.files().to_vec(),
        }
    }

    fn invalid_timestamp() -> FileSearchResult {
        FileSearchResult {
            error: Some(INVALID_TIMESTAMP.to_string()),
            ..Default::default()
        }
    }
}

/// Message-search response, shared by the single-file parse and the
/// discover-and-parse operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageSearchResult {
    pub count: usize,
    pub error: Option<String>,
    pub msgs: Vec<BgpMessage>,
    pub files: FileSearchResult,
}

impl MessageSearchResult {
    fn invalid_timestamp() -> MessageSearchResult {
        MessageSearchResult {
            error: Some(INVALID_TIMESTAMP.to_string()),
            ..Default::default()
        }
    }
}

/// Orchestrates discovery, dispatch, and aggregation for one request at a
/// time. Construct once with an immutable configuration; holds no
/// per-request state and no cross-request cache.
pub struct SearchPipeline {
    config: MrtSearchConfig,
    broker: BrokerClient,
    dispatcher: ParseDispatcher,
}

impl SearchPipeline {
    pub fn new(config: MrtSearchConfig) -> SearchPipeline {
        let broker = BrokerClient::new(config.broker_page_size);
        let dispatcher = ParseDispatcher::new(config.workers);
        SearchPipeline {
            config,
            broker,
            dispatcher,
        }
    }

    /// Parse a single MRT file by URL.
    ///
    /// The file listing in the response describes the requested URL, with
    /// the project classified from the URL path and the size from a
    /// metadata probe. A parse failure yields zero messages, not a
    /// response error.
    pub fn parse_file(&self, query: &ParseFileQuery) -> MessageSearchResult {
        let filters = MessageFilters::from_options(&query.filters);
        let limit = query.limit.filter(|v| *v > 0);

        let set = FileSet::new(vec![describe_url(&query.url)]);
        let outcomes = match self.dispatcher.dispatch(&set, &filters, limit) {
            Ok(outcomes) => outcomes,
            Err(e) => {
                warn!("parse dispatch failed for {}: {}", query.url, e);
                Vec::new()
            }
        };

        let msgs = merge_outcomes(outcomes, None);
        MessageSearchResult {
            count: msgs.len(),
            error: None,
            msgs,
            files: FileSearchResult::from_set(&set),
        }
    }

    /// List update files covering a time window.
    pub fn list_files(&self, query: &ListFilesQuery) -> FileSearchResult {
        match self.broker.discover(
            &query.ts_start,
            &query.ts_end,
            query.project.as_deref(),
            query.collector.as_deref(),
        ) {
            Ok(set) => FileSearchResult::from_set(&set),
            Err(_) => FileSearchResult::invalid_timestamp(),
        }
    }

    /// Discover update files for a time window, then parse them in
    /// parallel and merge the filtered messages.
    ///
    /// Three linear stages with no backtracking: discover (an invalid
    /// time range short-circuits to the terminal error response), an
    /// optional file-count truncation, then parse + merge. With `dry_run`
    /// the parse stage is skipped and the response carries the discovered
    /// listing with an empty message list.
    pub fn search(&self, query: &SearchQuery) -> MessageSearchResult {
        let set = match self.broker.discover(
            &query.ts_start,
            &query.ts_end,
            query.project.as_deref(),
            query.collector.as_deref(),
        ) {
            Ok(set) => set,
            Err(_) => return MessageSearchResult::invalid_timestamp(),
        };

        let set = set.truncated(query.files_limit);
        let listing = FileSearchResult::from_set(&set);
        info!(
            "total of {} files to parse with total size of {}",
            listing.count, listing.total_size
        );

        let mut msgs = Vec::new();
        if !query.dry_run {
            let filters = MessageFilters::from_options(&query.filters);
            let outcomes = match self.dispatcher.dispatch(&set, &filters, None) {
                Ok(outcomes) => outcomes,
                Err(e) => {
                    warn!("parse dispatch failed: {}", e);
                    Vec::new()
                }
            };

            let msgs_limit = query.msgs_limit.unwrap_or(self.config.default_msgs_limit);
            msgs = merge_outcomes(outcomes, Some(msgs_limit));
            info!("total msgs count: {}", msgs.len());
        }

        MessageSearchResult {
            count: msgs.len(),
            error: None,
            msgs,
            files: listing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::Project;

    fn pipeline() -> SearchPipeline {
        SearchPipeline::new(MrtSearchConfig {
            workers: Some(2),
            ..Default::default()
        })
    }

    #[test]
    fn test_list_files_invalid_timestamp() {
        let result = pipeline().list_files(&ListFilesQuery {
            ts_start: "not-a-date".to_string(),
            ts_end: "1696204860".to_string(),
            ..Default::default()
        });

        assert_eq!(result.error.as_deref(), Some(INVALID_TIMESTAMP));
        assert_eq!(result.count, 0);
        assert_eq!(result.total_size, 0);
        assert!(result.files.is_empty());
    }

    #[test]
    fn test_search_invalid_timestamp_short_circuits() {
        let result = pipeline().search(&SearchQuery {
            ts_start: "1696204800".to_string(),
            ts_end: "not-a-date".to_string(),
            ..Default::default()
        });

        assert_eq!(result.error.as_deref(), Some(INVALID_TIMESTAMP));
        assert_eq!(result.count, 0);
        assert!(result.msgs.is_empty());
        assert_eq!(result.files, FileSearchResult::default());
    }

    #[test]
    fn test_parse_file_absorbs_task_failure() {
        // An unreadable path degrades to an empty result with a single
        // unknown-project file entry, never a response error.
        let result = pipeline().parse_file(&ParseFileQuery {
            url: "/nonexistent/updates.20231002.0000.gz".to_string(),
            ..Default::default()
        });

        assert_eq!(result.count, 0);
        assert_eq!(result.error, None);
        assert!(result.msgs.is_empty());
        assert_eq!(result.files.count, 1);
        assert_eq!(result.files.files[0].project, Project::Unknown);
        assert_eq!(result.files.files[0].collector, "unknown");
        assert_eq!(result.files.files[0].size, 0);
    }

    #[test]
    fn test_response_json_shape() {
        let result = pipeline().search(&SearchQuery {
            ts_start: "bogus".to_string(),
            ts_end: "bogus".to_string(),
            ..Default::default()
        });
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["count"], 0);
        assert_eq!(json["error"], INVALID_TIMESTAMP);
        assert!(json["msgs"].as_array().unwrap().is_empty());
        assert_eq!(json["files"]["count"], 0);
        assert_eq!(json["files"]["total_size"], 0);
        assert!(json["files"]["files"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_query_param_deserialization() {
        // Wire-shaped queries: filter fields flatten next to the window
        let query: SearchQuery = serde_json::from_value(serde_json::json!({
            "ts_start": "1696204800",
            "ts_end": "1696204860",
            "prefix": "1.1.1.0/24",
            "include_sub": true,
            "origin_asn": 13335,
            "msgs_limit": 10,
            "files_limit": 2,
            "dry_run": true,
        }))
        .unwrap();

        assert_eq!(query.ts_start, "1696204800");
        assert_eq!(query.filters.prefix.as_deref(), Some("1.1.1.0/24"));
        assert!(query.filters.include_sub);
        assert_eq!(query.filters.origin_asn, Some(13335));
        assert_eq!(query.msgs_limit, Some(10));
        assert_eq!(query.files_limit, Some(2));
        assert!(query.dry_run);
    }

    // Queries the public broker; run with `cargo test -- --ignored`.
    #[test]
    #[ignore = "requires network access to the public BGPKIT broker"]
    fn test_dry_run_matches_discovery() {
        let pipeline = pipeline();
        let dry = pipeline.search(&SearchQuery {
            ts_start: "1696204800".to_string(),
            ts_end: "1696204860".to_string(),
            collector: Some("rrc00".to_string()),
            dry_run: true,
            ..Default::default()
        });
        assert_eq!(dry.error, None);
        assert!(dry.msgs.is_empty());

        let listed = pipeline.list_files(&ListFilesQuery {
            ts_start: "1696204800".to_string(),
            ts_end: "1696204860".to_string(),
            collector: Some("rrc00".to_string()),
            ..Default::default()
        });
        assert_eq!(dry.files, listed);
    }
}
