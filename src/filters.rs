//! Message filter normalization.
//!
//! Caller-supplied filter options are normalized once per request into a
//! canonical [`MessageFilters`] value, which is the only filter shape the
//! record parser ever sees. Normalization is a pure function with no
//! failure mode: malformed but syntactically acceptable input (empty
//! strings, negative ASNs, unknown message types) simply yields an absent
//! filter field.

use bgpkit_parser::BgpkitParser;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::io::Read;

/// Raw filter options as supplied by a caller.
///
/// Field names follow the caller contract; all fields are optional and a
/// default value means "no filter".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Filter by network prefix
    #[serde(default)]
    pub prefix: Option<String>,

    /// Include super-prefixes when filtering
    #[serde(default)]
    pub include_super: bool,

    /// Include sub-prefixes when filtering
    #[serde(default)]
    pub include_sub: bool,

    /// Filter by origin AS number; negative values are ignored
    #[serde(default)]
    pub origin_asn: Option<i64>,

    /// Filter by AS path regex string
    #[serde(default)]
    pub as_path: Option<String>,

    /// Message type, matched by leading letter: `a`nnounce or `w`ithdraw
    #[serde(default)]
    pub msg_type: Option<String>,

    /// Filter by collector peer IP address
    #[serde(default)]
    pub peer_ip: Option<String>,

    /// Filter by collector peer ASN
    #[serde(default)]
    pub peer_asn: Option<String>,
}

/// Prefix matching mode, derived from the `(include_super, include_sub)`
/// flag pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrefixMatch {
    /// Exact prefix match
    #[default]
    Exact,
    /// Match the prefix and its super-prefixes
    Super,
    /// Match the prefix and its sub-prefixes
    Sub,
    /// Match the prefix and both super- and sub-prefixes
    SuperOrSub,
}

impl PrefixMatch {
    fn from_flags(include_super: bool, include_sub: bool) -> PrefixMatch {
        match (include_super, include_sub) {
            (false, false) => PrefixMatch::Exact,
            (true, false) => PrefixMatch::Super,
            (false, true) => PrefixMatch::Sub,
            (true, true) => PrefixMatch::SuperOrSub,
        }
    }

    /// Parser filter key for this matching mode.
    pub fn filter_key(&self) -> &'static str {
        match self {
            PrefixMatch::Exact => "prefix",
            PrefixMatch::Super => "prefix_super",
            PrefixMatch::Sub => "prefix_sub",
            PrefixMatch::SuperOrSub => "prefix_super_sub",
        }
    }
}

/// Update direction filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElemDirection {
    /// BGP announcement
    Announce,
    /// BGP withdrawal
    Withdraw,
}

impl Display for ElemDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ElemDirection::Announce => "announce",
            ElemDirection::Withdraw => "withdraw",
        })
    }
}

/// Canonical, immutable per-request filter set.
///
/// All present fields are conjunctive: a record passes only if every one
/// of them matches. At most one prefix-matching mode is active, carried by
/// `prefix_mode` and only meaningful while `prefix` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageFilters {
    pub prefix: Option<String>,
    pub prefix_mode: PrefixMatch,
    pub origin_asn: Option<u32>,
    pub as_path: Option<String>,
    pub direction: Option<ElemDirection>,
    pub peer_ip: Option<String>,
    pub peer_asn: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

impl MessageFilters {
    /// Normalize raw caller options into a canonical filter set.
    ///
    /// Pure and total: every input produces a valid filter set. Negative
    /// ASNs and empty strings normalize to absent fields, and message
    /// types are matched by their leading letter (`w` for withdrawals,
    /// `a` for announcements, anything else is ignored).
    pub fn from_options(options: &FilterOptions) -> MessageFilters {
        let prefix = non_empty(&options.prefix);
        let prefix_mode = PrefixMatch::from_flags(options.include_super, options.include_sub);

        let origin_asn = options
            .origin_asn
            .filter(|asn| *asn >= 0)
            .map(|asn| asn as u32);

        let direction = options.msg_type.as_deref().and_then(|t| {
            if t.starts_with('w') {
                Some(ElemDirection::Withdraw)
            } else if t.starts_with('a') {
                Some(ElemDirection::Announce)
            } else {
                None
            }
        });

        MessageFilters {
            prefix,
            prefix_mode,
            origin_asn,
            as_path: non_empty(&options.as_path),
            direction,
            peer_ip: non_empty(&options.peer_ip),
            peer_asn: non_empty(&options.peer_asn),
        }
    }

    /// Open a record-parser session for one file URL with these filters
    /// applied.
    pub fn to_parser(&self, url: &str) -> anyhow::Result<BgpkitParser<Box<dyn Read + Send>>> {
        let mut parser = BgpkitParser::new(url)?.disable_warnings();

        if let Some(v) = &self.prefix {
            parser = parser.add_filter(self.prefix_mode.filter_key(), v.as_str())?;
        }
        if let Some(v) = &self.origin_asn {
            parser = parser.add_filter("origin_asn", v.to_string().as_str())?;
        }
        if let Some(v) = &self.as_path {
            parser = parser.add_filter("as_path", v.as_str())?;
        }
        if let Some(v) = &self.direction {
            parser = parser.add_filter("type", v.to_string().as_str())?;
        }
        if let Some(v) = &self.peer_ip {
            parser = parser.add_filter("peer_ips", v.as_str())?;
        }
        if let Some(v) = &self.peer_asn {
            parser = parser.add_filter("peer_asn", v.as_str())?;
        }

        Ok(parser)
    }
}
