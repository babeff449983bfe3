use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub url: String,
    pub title: String,
    pub last_visit: i64, // Unix timestamp in seconds
    pub visit_count: u64,
    pub typed_count: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HistoryMatch {
    pub url: String,
    pub title: String,
    pub score: u64,
}

/// Source of visited pages for the history suggestion provider.
#[async_trait]
pub trait HistoryStorage: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<HistoryMatch>, String>;
}

/// In-memory visit index ranked by frecency.
#[derive(Default)]
pub struct HistoryStore {
    index: Mutex<HashMap<String, HistoryEntry>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_visit(&self, url: &str, title: Option<&str>, is_typed: bool) {
        self.record_visit_at(url, title, is_typed, Utc::now().timestamp());
    }

    fn record_visit_at(&self, url: &str, title: Option<&str>, is_typed: bool, now: i64) {
        let normalized = normalize_url(url);
        let mut index = self.index.lock().unwrap_or_else(|e| e.into_inner());

        let entry = index.entry(normalized.clone()).or_insert(HistoryEntry {
            url: normalized,
            title: String::new(),
            last_visit: 0,
            visit_count: 0,
            typed_count: 0,
        });

        entry.last_visit = now;
        entry.visit_count += 1;
        if is_typed {
            entry.typed_count += 1;
        }
        // Keep the previous title unless a non-empty one arrives
        if let Some(t) = title.filter(|t| !t.is_empty()) {
            entry.title = t.to_string();
        }
    }

    pub fn len(&self) -> usize {
        self.index.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn search_at(&self, query: &str, limit: usize, now: i64) -> Vec<HistoryMatch> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        let index = self.index.lock().unwrap_or_else(|e| e.into_inner());

        let mut results: Vec<HistoryMatch> = index
            .values()
            .filter_map(|entry| {
                let url_lower = entry.url.to_lowercase();
                let host = Url::parse(&entry.url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_string))
                    .unwrap_or_default();

                // "goo" should match "https://google.com"
                let schemeless = url_lower
                    .trim_start_matches("https://")
                    .trim_start_matches("http://");
                let is_prefix = schemeless.starts_with(&query)
                    || (!host.is_empty() && host.starts_with(&query));

                let mut score = if is_prefix {
                    5000
                } else if url_lower.contains(&query) || entry.title.to_lowercase().contains(&query) {
                    100
                } else {
                    return None;
                };

                score += entry.typed_count * 500;

                // Ten points off per day of age, capped at the full recency bonus
                let age_days = (now.saturating_sub(entry.last_visit).max(0) / 86_400) as u64;
                score += 1000u64.saturating_sub(age_days * 10);

                score += entry.visit_count * 10;

                Some(HistoryMatch {
                    url: entry.url.clone(),
                    title: entry.title.clone(),
                    score,
                })
            })
            .collect();

        // Highest score first, url as a stable tie-break
        results.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.url.cmp(&b.url)));
        results.truncate(limit);
        results
    }
}

#[async_trait]
impl HistoryStorage for HistoryStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<HistoryMatch>, String> {
        Ok(self.search_at(query, limit, Utc::now().timestamp()))
    }
}

fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => url.to_string(),
    }
}
