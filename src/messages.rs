//! Parsed BGP update messages.
//!
//! [`BgpMessage`] is the wire shape of one parsed update: a flattened,
//! string-friendly rendering of `bgpkit_parser::BgpElem` with a derived
//! UTC timestamp string stamped on at conversion time.

use bgpkit_parser::models::ElemType;
use bgpkit_parser::BgpElem;
use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// One parsed update record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BgpMessage {
    pub timestamp: f64,
    pub timestamp_str: String,
    pub elem_type: String,
    pub peer_ip: String,
    pub peer_asn: u32,
    pub prefix: String,
    pub next_hop: Option<String>,
    pub as_path: Option<String>,
    pub origin_asns: Option<Vec<String>>,
    pub origin: Option<String>,
    pub local_pref: Option<u32>,
    pub med: Option<u32>,
    pub communities: Option<Vec<String>>,
    pub atomic: Option<String>,
    pub aggr_asn: Option<u32>,
    pub aggr_ip: Option<String>,
}

/// UTC stamp derived from the integral part of a record timestamp.
fn timestamp_to_string(timestamp: f64) -> String {
    DateTime::from_timestamp(timestamp as i64, 0)
        .unwrap_or_default()
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

impl From<&BgpElem> for BgpMessage {
    fn from(elem: &BgpElem) -> BgpMessage {
        let elem_type = if elem.elem_type == ElemType::ANNOUNCE {
            "A"
        } else {
            "W"
        };
        let atomic = if elem.atomic { "AG" } else { "NAG" };

        BgpMessage {
            timestamp: elem.timestamp,
            timestamp_str: timestamp_to_string(elem.timestamp),
            elem_type: elem_type.to_string(),
            peer_ip: elem.peer_ip.to_string(),
            peer_asn: elem.peer_asn.to_u32(),
            prefix: elem.prefix.to_string(),
            next_hop: elem.next_hop.as_ref().map(|h| h.to_string()),
            as_path: elem.as_path.as_ref().map(|p| p.to_string()),
            origin_asns: elem
                .origin_asns
                .as_ref()
                .map(|asns| asns.iter().map(|a| a.to_string()).collect()),
            origin: elem.origin.as_ref().map(|o| o.to_string()),
            local_pref: elem.local_pref,
            med: elem.med,
            communities: elem
                .communities
                .as_ref()
                .map(|cs| cs.iter().map(|c| c.to_string()).collect()),
            atomic: Some(atomic.to_string()),
            aggr_asn: elem.aggr_asn.map(|asn| asn.to_u32()),
            aggr_ip: elem.aggr_ip.as_ref().map(|ip| ip.to_string()),
        }
    }
}
