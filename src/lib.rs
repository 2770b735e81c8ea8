#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! mrt-search - search and parse BGP MRT update files
//!
//! This library discovers archived BGP update files from the RIPE RIS and
//! RouteViews collector networks through the BGPKIT broker, parses them in
//! parallel with per-record filters, and merges the results into one
//! bounded, ordered message list.
//!
//! # Architecture
//!
//! The pipeline is strictly two-phase: discover, then parse + merge.
//!
//! - **[`filters`]**: caller options normalized once into a canonical,
//!   immutable filter set applied by every parse task
//! - **[`broker`]**: archive discovery (time window, project, collector)
//!   with transparent pagination, plus single-URL description for the
//!   one-file flow
//! - **[`dispatch`]**: one parse task per file on a bounded worker pool,
//!   per-file failure isolation, full join before returning
//! - **[`aggregate`]**: merge in file-discovery order under a global
//!   message limit
//! - **[`pipeline`]**: the three caller operations (parse one file, list
//!   files, search) and their response types
//! - **[`config`]**: constructed-once application configuration
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use mrt_search::{MrtSearchConfig, SearchPipeline, SearchQuery};
//!
//! let pipeline = SearchPipeline::new(MrtSearchConfig::default());
//!
//! let result = pipeline.search(&SearchQuery {
//!     ts_start: "1696204800".to_string(),
//!     ts_end: "1696204860".to_string(),
//!     collector: Some("rrc00".to_string()),
//!     msgs_limit: Some(100),
//!     ..Default::default()
//! });
//!
//! assert!(result.error.is_none());
//! println!("{} messages from {} files", result.count, result.files.count);
//! ```
//!
//! # Error Behavior
//!
//! Responses are always fully formed; a populated `error` field is the
//! only failure signal. Unparseable time bounds produce the
//! `invalid timestamp` error with empty data fields. Every other fault
//! (a missing file size, an empty discovery window, a failed per-file
//! parse) degrades to empty or zero values and is reported in the log,
//! never as a response error. A transport embedding this crate is
//! expected to return a success status even when `error` is set; existing
//! consumers depend on that.

pub mod aggregate;
pub mod broker;
pub mod config;
pub mod dispatch;
pub mod filters;
pub mod messages;
pub mod pipeline;
pub mod time;

// =============================================================================
// Configuration
// =============================================================================

pub use config::MrtSearchConfig;

// =============================================================================
// Discovery types
// =============================================================================

pub use broker::{describe_url, probe_file_size, BrokerClient, FileSet, MrtFile, Project};

// =============================================================================
// Filters and messages
// =============================================================================

pub use filters::{ElemDirection, FilterOptions, MessageFilters, PrefixMatch};
pub use messages::BgpMessage;

// =============================================================================
// Dispatch and aggregation
// =============================================================================

pub use aggregate::merge_outcomes;
pub use dispatch::{FileParseOutcome, ParseDispatcher};

// =============================================================================
// Pipeline surface
// =============================================================================

pub use pipeline::{
    FileSearchResult, ListFilesQuery, MessageSearchResult, ParseFileQuery, SearchPipeline,
    SearchQuery, INVALID_TIMESTAMP,
};
pub use time::{string_to_time, TimeRange};
