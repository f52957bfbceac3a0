use anyhow::Result;
use serde_json::Value;

/// One page of records from the remote.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Value>,
    pub next_page: Option<u32>,
}

/// The authoritative source being mirrored. Pages are 1-based.
pub trait RemoteSource {
    /// Issues of every state, most recently updated first.
    fn list_issues(&self, page: u32, per_page: u32) -> Result<Page>;

    fn list_comments(&self, issue_number: u64, page: u32, per_page: u32) -> Result<Page>;
}
