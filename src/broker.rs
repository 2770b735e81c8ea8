//! Archive file discovery via the BGPKIT broker.
//!
//! The broker maps a time window (plus optional project/collector
//! narrowing) to a list of MRT update files. Pagination is handled inside
//! the broker client, so one `discover` call always returns the complete
//! ordered file set for the window. A second, broker-less path describes a
//! single known URL for the one-file parse flow.

use anyhow::Result;
use bgpkit_broker::BrokerItem;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::{info, warn};

use crate::time::TimeRange;

/// Data type requested from the broker; this pipeline only ever deals in
/// update dumps, never full RIB dumps.
const UPDATES_DATA_TYPE: &str = "updates";

/// Route collection project that recorded an archive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Project {
    Riperis,
    Routeviews,
    Unknown,
}

impl Project {
    /// Classify by collector ID: RIPE RIS collectors are named `rrc*`,
    /// everything else the broker returns belongs to RouteViews.
    pub fn from_collector_id(collector_id: &str) -> Project {
        if collector_id.starts_with("rrc") {
            Project::Riperis
        } else {
            Project::Routeviews
        }
    }
}

impl Display for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Project::Riperis => "riperis",
            Project::Routeviews => "routeviews",
            Project::Unknown => "unknown",
        })
    }
}

/// One discovered MRT file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MrtFile {
    pub url: String,
    pub project: Project,
    pub collector: String,
    pub data_type: String,
    pub size: i64,
}

impl MrtFile {
    /// Convert a raw broker item, classifying the project from the
    /// collector ID and preferring the exact file size when the broker
    /// reports one.
    pub fn from_broker_item(item: &BrokerItem) -> MrtFile {
        let size = if item.exact_size > 0 {
            item.exact_size
        } else {
            item.rough_size
        };

        MrtFile {
            url: item.url.clone(),
            project: Project::from_collector_id(&item.collector_id),
            collector: item.collector_id.clone(),
            data_type: item.data_type.clone(),
            size,
        }
    }
}

/// Ordered, immutable set of discovered files.
///
/// Order is the broker's return order; it is never re-sorted, and the
/// parse and merge stages preserve it end to end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileSet {
    files: Vec<MrtFile>,
}

impl FileSet {
    pub fn new(files: Vec<MrtFile>) -> FileSet {
        FileSet { files }
    }

    pub fn files(&self) -> &[MrtFile] {
        &self.files
    }

    pub fn count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_size(&self) -> i64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// A copy capped to the first `limit` files. `None` and non-positive
    /// limits keep the whole set.
    pub fn truncated(&self, limit: Option<usize>) -> FileSet {
        match limit {
            Some(limit) if limit > 0 && limit < self.files.len() => FileSet {
                files: self.files[..limit].to_vec(),
            },
            _ => self.clone(),
        }
    }
}

/// Client for the broker's file index.
pub struct BrokerClient {
    page_size: i64,
}

impl BrokerClient {
    pub fn new(page_size: i64) -> BrokerClient {
        BrokerClient { page_size }
    }

    /// Discover update files covering a time window.
    ///
    /// The only error path is unparseable time strings. An empty result
    /// set is a valid, empty [`FileSet`]; broker transport faults are
    /// logged and degrade to an empty set as well.
    pub fn discover(
        &self,
        ts_start: &str,
        ts_end: &str,
        project: Option<&str>,
        collector: Option<&str>,
    ) -> Result<FileSet> {
        let range = TimeRange::parse(ts_start, ts_end)?;

        let mut broker = bgpkit_broker::BgpkitBroker::new()
            .ts_start(range.start.to_rfc3339())
            .ts_end(range.end.to_rfc3339())
            .data_type(UPDATES_DATA_TYPE)
            .page_size(self.page_size);

        if let Some(project) = project {
            broker = broker.project(project);
        }
        if let Some(collector) = collector {
            broker = broker.collector_id(collector);
        }

        let items = match broker.query() {
            Ok(items) => items,
            Err(e) => {
                warn!("broker query failed, returning empty file set: {}", e);
                Vec::new()
            }
        };

        let files = FileSet::new(items.iter().map(MrtFile::from_broker_item).collect());
        info!(
            "discovered {} update files ({} bytes) in window",
            files.count(),
            files.total_size()
        );
        Ok(files)
    }
}

/// Describe a single known URL without a broker query, for the one-file
/// parse flow. Classification inspects the URL path for collector
/// markers; the size comes from a metadata probe.
pub fn describe_url(url: &str) -> MrtFile {
    let (project, collector) = classify_url(url);
    MrtFile {
        url: url.to_string(),
        project,
        collector,
        data_type: UPDATES_DATA_TYPE.to_string(),
        size: probe_file_size(url),
    }
}

/// RIPE RIS archive paths carry an `rrc` segment and RouteViews paths a
/// `route-views` segment; the collector name sits right after the host.
fn classify_url(url: &str) -> (Project, String) {
    let project = if url.contains("rrc") {
        Project::Riperis
    } else if url.contains("route-views") {
        Project::Routeviews
    } else {
        Project::Unknown
    };

    let collector = match project {
        Project::Unknown => "unknown".to_string(),
        _ => url
            .split('/')
            .nth(3)
            .unwrap_or("unknown")
            .to_string(),
    };

    (project, collector)
}

/// Resolve a file's size with a HEAD request. Any miss (request failure,
/// missing or non-numeric `content-length`) resolves to 0, never an
/// error.
pub fn probe_file_size(url: &str) -> i64 {
    let response = match ureq::head(url).call() {
        Ok(response) => response,
        Err(e) => {
            warn!("size probe for {} failed: {}", url, e);
            return 0;
        }
    };

    response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn broker_item(collector: &str, exact_size: i64, rough_size: i64) -> BrokerItem {
        let ts = DateTime::from_timestamp(1696204800, 0).unwrap().naive_utc();
        BrokerItem {
            ts_start: ts,
            ts_end: ts,
            collector_id: collector.to_string(),
            data_type: UPDATES_DATA_TYPE.to_string(),
            url: format!("https://archive.example.org/{collector}/updates.gz"),
            rough_size,
            exact_size,
        }
    }

    #[test]
    fn test_project_from_collector_id() {
        assert_eq!(Project::from_collector_id("rrc00"), Project::Riperis);
        assert_eq!(Project::from_collector_id("rrc26"), Project::Riperis);
        assert_eq!(
            Project::from_collector_id("route-views2"),
            Project::Routeviews
        );
        assert_eq!(Project::from_collector_id("amsix"), Project::Routeviews);
    }

    #[test]
    fn test_size_prefers_exact_when_positive() {
        let file = MrtFile::from_broker_item(&broker_item("rrc00", 1024, 2048));
        assert_eq!(file.size, 1024);

        let file = MrtFile::from_broker_item(&broker_item("rrc00", 0, 2048));
        assert_eq!(file.size, 2048);

        let file = MrtFile::from_broker_item(&broker_item("rrc00", -1, 2048));
        assert_eq!(file.size, 2048);
    }

    #[test]
    fn test_from_broker_item_classifies_project() {
        let file = MrtFile::from_broker_item(&broker_item("rrc03", 10, 0));
        assert_eq!(file.project, Project::Riperis);
        assert_eq!(file.collector, "rrc03");

        let file = MrtFile::from_broker_item(&broker_item("route-views.sg", 10, 0));
        assert_eq!(file.project, Project::Routeviews);
    }

    #[test]
    fn test_file_set_totals() {
        let set = FileSet::new(vec![
            MrtFile::from_broker_item(&broker_item("rrc00", 100, 0)),
            MrtFile::from_broker_item(&broker_item("rrc01", 0, 250)),
            MrtFile::from_broker_item(&broker_item("route-views2", 7, 0)),
        ]);
        assert_eq!(set.count(), 3);
        assert_eq!(set.total_size(), 357);
        assert!(!set.is_empty());

        let empty = FileSet::default();
        assert_eq!(empty.count(), 0);
        assert_eq!(empty.total_size(), 0);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_file_set_truncated() {
        let set = FileSet::new(vec![
            MrtFile::from_broker_item(&broker_item("rrc00", 1, 0)),
            MrtFile::from_broker_item(&broker_item("rrc01", 2, 0)),
            MrtFile::from_broker_item(&broker_item("rrc02", 3, 0)),
        ]);

        assert_eq!(set.truncated(None), set);
        assert_eq!(set.truncated(Some(0)), set);
        assert_eq!(set.truncated(Some(5)), set);

        let capped = set.truncated(Some(2));
        assert_eq!(capped.count(), 2);
        assert_eq!(capped.files()[0].collector, "rrc00");
        assert_eq!(capped.files()[1].collector, "rrc01");
        assert_eq!(capped.total_size(), 3);
    }

    #[test]
    fn test_classify_url() {
        let (project, collector) =
            classify_url("https://data.ris.ripe.net/rrc00/2023.10/updates.20231002.0000.gz");
        assert_eq!(project, Project::Riperis);
        assert_eq!(collector, "rrc00");

        let (project, collector) = classify_url(
            "http://archive.routeviews.org/route-views.sg/bgpdata/2023.10/UPDATES/updates.20231002.0000.bz2",
        );
        assert_eq!(project, Project::Routeviews);
        assert_eq!(collector, "route-views.sg");

        let (project, collector) = classify_url("https://example.com/some/file.mrt");
        assert_eq!(project, Project::Unknown);
        assert_eq!(collector, "unknown");
    }

    #[test]
    fn test_mrt_file_json_field_names() {
        let file = MrtFile::from_broker_item(&broker_item("rrc00", 42, 0));
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["project"], "riperis");
        assert_eq!(json["collector"], "rrc00");
        assert_eq!(json["data_type"], "updates");
        assert_eq!(json["size"], 42);
        assert!(json["url"].as_str().unwrap().contains("rrc00"));
    }

    #[test]
    fn test_discover_invalid_timestamp_is_the_only_error() {
        let client = BrokerClient::new(100);
        assert!(client
            .discover("not-a-date", "1696204860", None, None)
            .is_err());
        assert!(client
            .discover("1696204800", "not-a-date", None, None)
            .is_err());
    }

    // Queries the public broker; run with `cargo test -- --ignored`.
    #[test]
    #[ignore = "requires network access to the public BGPKIT broker"]
    fn test_discover_window_invariants() {
        let client = BrokerClient::new(1000);
        let set = client
            .discover("1696204800", "1696204860", None, None)
            .unwrap();
        let summed: i64 = set.files().iter().map(|f| f.size).sum();
        assert_eq!(set.total_size(), summed);
        for file in set.files() {
            assert_eq!(file.project, Project::from_collector_id(&file.collector));
        }

        // Idempotence: same window, same ordered result
        let again = client
            .discover("1696204800", "1696204860", None, None)
            .unwrap();
        assert_eq!(set, again);
    }
}
