//! Parsing of the backend configuration string.
//!
//! The string is either a plain Redis URL (`redis://[user:pass@]host:port/db`)
//! or a Sentinel discovery address: one or more `sentinel://` URLs joined by
//! `;`, e.g. `sentinel://:secret@10.0.0.1:26379;sentinel://10.0.0.2`.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;
use url::{Host, Url};

use singleton_lock::LockError;

/// Scheme prefix that switches the backend into Sentinel discovery mode.
pub const SENTINEL_SCHEME: &str = "sentinel://";

/// Port used for a Sentinel endpoint that does not name one.
pub const DEFAULT_SENTINEL_PORT: u16 = 26379;

/// A single Sentinel node to query for the current master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelEndpoint {
    pub host: String,
    pub port: u16,
}

/// Parsed form of a Sentinel discovery address.
///
/// Endpoints keep the order in which they appear in the address, which is
/// the order they are tried in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyDescriptor {
    pub endpoints: Vec<SentinelEndpoint>,
    /// Password for the master connection, taken from the first endpoint
    /// URL only.
    pub credential: Option<String>,
}

/// Where the backend connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAddress {
    /// A single Redis URL, handed to the client unchanged.
    Direct(String),
    /// A set of Sentinel nodes that know the current master.
    Discovery(TopologyDescriptor),
}

impl StoreAddress {
    /// Classify and parse a configuration string.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Configuration`] for a blank string, a discovery
    /// address without any `sentinel://` segment, or a `sentinel://` segment
    /// that is not a valid URL with a host.
    pub fn parse(raw: &str) -> Result<Self, LockError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(LockError::Configuration(
                "store address must not be empty".to_owned(),
            ));
        }

        if raw.starts_with(SENTINEL_SCHEME) {
            TopologyDescriptor::parse(raw).map(Self::Discovery)
        } else {
            Ok(Self::Direct(raw.to_owned()))
        }
    }
}

impl TopologyDescriptor {
    /// Parse a `;`-separated list of `sentinel://` URLs.
    ///
    /// Segments with any other scheme are skipped. Only the first URL's
    /// password is used; passwords on later URLs are ignored.
    pub fn parse(raw: &str) -> Result<Self, LockError> {
        let segments: Vec<&str> = raw
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        let mut endpoints = Vec::new();
        let mut credential = None;

        for segment in segments.iter().filter(|s| s.starts_with(SENTINEL_SCHEME)) {
            let (endpoint, password) = parse_segment(segment)?;
            if endpoints.is_empty() {
                credential = password;
            }
            endpoints.push(endpoint);
        }

        if endpoints.is_empty() {
            return Err(LockError::Configuration(format!(
                "no {SENTINEL_SCHEME} endpoint found in discovery address"
            )));
        }

        if endpoints.len() < segments.len() {
            tracing::warn!(
                kept = endpoints.len(),
                total = segments.len(),
                "ignoring discovery address segments without the sentinel scheme"
            );
        }

        Ok(Self {
            endpoints,
            credential,
        })
    }
}

fn parse_segment(segment: &str) -> Result<(SentinelEndpoint, Option<String>), LockError> {
    let url = Url::parse(segment).map_err(|e| {
        LockError::Configuration(format!("invalid sentinel url {segment:?}: {e}"))
    })?;

    let host = match url.host() {
        Some(Host::Domain(d)) if !d.is_empty() => d.to_owned(),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        _ => {
            return Err(LockError::Configuration(format!(
                "sentinel url {segment:?} has no host"
            )));
        }
    };
    let port = url.port().unwrap_or(DEFAULT_SENTINEL_PORT);

    let password = url
        .password()
        .map(|p| {
            percent_decode_str(p)
                .decode_utf8()
                .map(Cow::into_owned)
                .map_err(|e| {
                    LockError::Configuration(format!(
                        "sentinel url {segment:?} has a password that is not utf-8: {e}"
                    ))
                })
        })
        .transpose()?;

    Ok((SentinelEndpoint { host, port }, password))
}
