use std::collections::HashSet;
use std::time::Duration;

use harufilm_protocol::Part;
use serde::{Deserialize, Serialize};

/// Persisted state of one multipart transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    /// Transfer identifier issued by the control plane.
    #[serde(rename = "uploadId")]
    pub transfer_id: String,
    /// Diary date (`YYYY-MM-DD`) the upload belongs to.
    #[serde(rename = "uploadDate")]
    pub logical_date: String,
    pub part_count: u32,
    pub completed_parts: Vec<Part>,
    /// Epoch milliseconds of the last mutation.
    pub last_updated: i64,
}

impl UploadSession {
    /// A fresh session with no completed parts.
    pub fn new(
        transfer_id: impl Into<String>,
        logical_date: impl Into<String>,
        part_count: u32,
        now_ms: i64,
    ) -> Self {
        Self {
            transfer_id: transfer_id.into(),
            logical_date: logical_date.into(),
            part_count,
            completed_parts: Vec::new(),
            last_updated: now_ms,
        }
    }

    pub fn has_part(&self, part_number: u32) -> bool {
        self.completed_parts
            .iter()
            .any(|p| p.part_number == part_number)
    }

    pub fn completed_count(&self) -> u32 {
        self.completed_parts.len() as u32
    }

    /// Part numbers already durably recorded.
    pub fn completed_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.completed_parts.iter().map(|p| p.part_number)
    }

    pub fn is_complete(&self) -> bool {
        self.completed_count() >= self.part_count
    }

    /// Completed parts ordered by part number, as the commit manifest requires.
    pub fn sorted_parts(&self) -> Vec<Part> {
        let mut parts = self.completed_parts.clone();
        parts.sort_by_key(|p| p.part_number);
        parts
    }

    /// `true` once the session has been idle for longer than `ttl`.
    pub fn is_expired(&self, now_ms: i64, ttl: Duration) -> bool {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.last_updated) > ttl_ms
    }

    /// Checks the stored invariants: parts unique and within `1..=part_count`.
    pub(crate) fn is_consistent(&self) -> bool {
        let mut seen = HashSet::new();
        self.completed_parts.iter().all(|p| {
            p.part_number >= 1 && p.part_number <= self.part_count && seen.insert(p.part_number)
        })
    }
}
