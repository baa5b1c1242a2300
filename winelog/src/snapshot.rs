//! Public snapshot loading
//!
//! The public snapshot is a static `public.json` file written by
//! [`export_public`](crate::transfer::export_public) and hosted anywhere.
//! Loading it never fails: an unreachable or malformed snapshot is reported
//! as [`PublicSnapshot::Unavailable`] and shown as an empty state.

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    Result,
    entry::migrate_values,
    http_client::HttpClient,
    transfer::PUBLIC_SNAPSHOT_FILE,
    view::{ListFilter, SummaryRow, rows},
};

/// Message shown in place of the public list when it cannot be loaded
pub const UNAVAILABLE_MESSAGE: &str = "No public tastings available right now.";

/// Result of loading the public snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicSnapshot {
    /// Read-only rows, newest first
    Loaded(Vec<SummaryRow>),
    /// The snapshot could not be fetched or decoded
    Unavailable(String),
}

impl PublicSnapshot {
    pub fn rows(&self) -> &[SummaryRow] {
        match self {
            Self::Loaded(rows) => rows,
            Self::Unavailable(_) => &[],
        }
    }

    /// Text shown when there are no rows to list
    pub fn empty_state(&self) -> Option<&'static str> {
        match self {
            Self::Loaded(rows) if !rows.is_empty() => None,
            _ => Some(UNAVAILABLE_MESSAGE),
        }
    }
}

/// Client for a hosted public snapshot
#[derive(Debug, Clone)]
pub struct PublicSnapshotClient {
    http: HttpClient,
    base_url: String,
}

impl PublicSnapshotClient {
    /// `base_url` is the directory hosting `public.json`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new()?,
            base_url: base_url.into(),
        })
    }

    pub fn url(&self) -> String {
        format!(
            "{}/{PUBLIC_SNAPSHOT_FILE}",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Fetches and decodes the snapshot
    pub async fn load(&self) -> PublicSnapshot {
        let url = self.url();
        match self.http.get_json::<Value>(&url).await {
            Ok(Value::Array(values)) => {
                let entries = migrate_values(values);
                debug!(count = entries.len(), "loaded public snapshot");
                PublicSnapshot::Loaded(rows(&entries, &ListFilter::default()))
            }
            Ok(_) => {
                warn!(url, "public snapshot is not an array");
                PublicSnapshot::Unavailable("public snapshot is not a json array".into())
            }
            Err(err) => {
                warn!(url, "public snapshot unavailable: {err}");
                PublicSnapshot::Unavailable(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base() {
        let client = PublicSnapshotClient::new("https://example.com/wine/").expect("client");
        assert_eq!(client.url(), "https://example.com/wine/public.json");
    }

    #[test]
    fn unavailable_has_empty_state() {
        let snapshot = PublicSnapshot::Unavailable("offline".into());
        assert!(snapshot.rows().is_empty());
        assert_eq!(snapshot.empty_state(), Some(UNAVAILABLE_MESSAGE));
        assert_eq!(PublicSnapshot::Loaded(vec![]).empty_state(), Some(UNAVAILABLE_MESSAGE));
    }
}
