//! Click-through feedback store and training-sample aggregation.
//!
//! The store is an append-only ring bounded by a TTL and a capacity, both
//! enforced after every append. All mutators serialize under one mutex;
//! reports take a consistent snapshot.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use hansearch_core::choseong;

/// What the user did with the suggestions for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedbackOutcome {
    AcceptedSuggestion,
    ClickedResult,
    NoSuggestion,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEvent {
    pub query: String,
    pub selected_key: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub outcome: FeedbackOutcome,
    pub locale: Option<String>,
}

/// An aggregated `(query, selected key)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingSample {
    pub query: String,
    pub selected_key: String,
    pub count: u64,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct FeedbackStoreOptions {
    pub max_events: usize,
    pub ttl: Duration,
}

impl Default for FeedbackStoreOptions {
    fn default() -> Self {
        Self {
            max_events: 10_000,
            ttl: Duration::days(30),
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    events: VecDeque<FeedbackEvent>,
    dropped_by_ttl: u64,
    dropped_by_capacity: u64,
}

/// Mutex-serialized feedback event store.
#[derive(Debug)]
pub struct FeedbackStore {
    options: FeedbackStoreOptions,
    state: Mutex<StoreState>,
}

/// Read-only report over the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSummary {
    pub generated_at: DateTime<Utc>,
    pub total_events: u64,
    pub unique_queries: u64,
    #[serde(rename = "droppedByTTL")]
    pub dropped_by_ttl: u64,
    pub dropped_by_capacity: u64,
    pub top_pairs: Vec<TrainingSample>,
}

/// Pairs reported in a summary.
const SUMMARY_TOP_PAIRS: usize = 10;

impl FeedbackStore {
    pub fn new(options: FeedbackStoreOptions) -> Self {
        Self {
            options,
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn record(&self, event: FeedbackEvent) {
        self.record_at(event, Utc::now());
    }

    pub fn record_all(&self, events: Vec<FeedbackEvent>) {
        let now = Utc::now();
        for event in events {
            self.record_at(event, now);
        }
    }

    /// Append one event, then enforce TTL and capacity from the oldest end.
    pub fn record_at(&self, event: FeedbackEvent, now: DateTime<Utc>) {
        let mut state = self.state.lock().unwrap();
        state.events.push_back(event);

        let horizon = now - self.options.ttl;
        let before = state.events.len();
        state.events.retain(|e| e.timestamp >= horizon);
        let expired = (before - state.events.len()) as u64;
        state.dropped_by_ttl += expired;

        while state.events.len() > self.options.max_events {
            state.events.pop_front();
            state.dropped_by_capacity += 1;
        }
    }

    pub fn snapshot(&self) -> Vec<FeedbackEvent> {
        self.state.lock().unwrap().events.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregated `(query, selected key)` pairs; see
    /// [`aggregate_training_samples`].
    pub fn training_samples(&self, min_occurrences: u64, max_samples: usize) -> Vec<TrainingSample> {
        let events = self.snapshot();
        aggregate_training_samples(&events, min_occurrences, max_samples)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> FeedbackSummary {
        let state = self.state.lock().unwrap();
        let events: Vec<FeedbackEvent> = state.events.iter().cloned().collect();
        let unique_queries = {
            let mut queries: Vec<String> = events
                .iter()
                .map(|e| choseong::normalized_token(e.query.trim()))
                .filter(|q| !q.is_empty())
                .collect();
            queries.sort();
            queries.dedup();
            queries.len() as u64
        };
        FeedbackSummary {
            generated_at: now,
            total_events: events.len() as u64,
            unique_queries,
            dropped_by_ttl: state.dropped_by_ttl,
            dropped_by_capacity: state.dropped_by_capacity,
            top_pairs: aggregate_training_samples(&events, 1, SUMMARY_TOP_PAIRS),
        }
    }

    /// Summary as pretty JSON with lexicographically sorted keys.
    pub fn summary_json(&self, now: DateTime<Utc>) -> Result<String, serde_json::Error> {
        let value = serde_json::to_value(self.summary(now))?;
        serde_json::to_string_pretty(&value)
    }
}

impl Default for FeedbackStore {
    fn default() -> Self {
        Self::new(FeedbackStoreOptions::default())
    }
}

/// Aggregate events into `(query, selected key)` pair counts.
///
/// Queries and keys are trimmed and normalized; events without a selected
/// key are skipped. Pairs below `min_occurrences` are dropped; the rest sort
/// by count, then recency, and cap at `max_samples`.
pub fn aggregate_training_samples(
    events: &[FeedbackEvent],
    min_occurrences: u64,
    max_samples: usize,
) -> Vec<TrainingSample> {
    use ahash::AHashMap;

    let mut pairs: AHashMap<(String, String), (u64, DateTime<Utc>)> = AHashMap::new();
    for event in events {
        let query = choseong::normalized_token(event.query.trim());
        let key = match &event.selected_key {
            Some(k) => choseong::normalized_token(k.trim()),
            None => continue,
        };
        if query.is_empty() || key.is_empty() {
            continue;
        }
        let entry = pairs.entry((query, key)).or_insert((0, event.timestamp));
        entry.0 += 1;
        if event.timestamp > entry.1 {
            entry.1 = event.timestamp;
        }
    }

    let min_occurrences = min_occurrences.max(1);
    let mut samples: Vec<TrainingSample> = pairs
        .into_iter()
        .filter(|(_, (count, _))| *count >= min_occurrences)
        .map(|((query, selected_key), (count, last_seen))| TrainingSample {
            query,
            selected_key,
            count,
            last_seen,
        })
        .collect();
    samples.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(b.last_seen.cmp(&a.last_seen))
            .then(a.query.cmp(&b.query))
            .then(a.selected_key.cmp(&b.selected_key))
    });
    samples.truncate(max_samples);
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(query: &str, key: Option<&str>, minutes_ago: i64) -> FeedbackEvent {
        FeedbackEvent {
            query: query.to_string(),
            selected_key: key.map(|k| k.to_string()),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            outcome: FeedbackOutcome::ClickedResult,
            locale: Some("ko-KR".to_string()),
        }
    }

    #[test]
    fn test_capacity_trim_counts_drops() {
        let store = FeedbackStore::new(FeedbackStoreOptions {
            max_events: 2,
            ttl: Duration::days(1),
        });
        store.record(event("a", Some("가"), 3));
        store.record(event("b", Some("나"), 2));
        store.record(event("c", Some("다"), 1));
        assert_eq!(store.len(), 2);
        let summary = store.summary(Utc::now());
        assert_eq!(summary.dropped_by_capacity, 1);
        assert_eq!(summary.dropped_by_ttl, 0);
    }

    #[test]
    fn test_ttl_trim_counts_drops() {
        let store = FeedbackStore::new(FeedbackStoreOptions {
            max_events: 100,
            ttl: Duration::hours(1),
        });
        store.record(event("old", Some("가"), 120));
        store.record(event("fresh", Some("나"), 1));
        assert_eq!(store.len(), 1);
        assert_eq!(store.summary(Utc::now()).dropped_by_ttl, 1);
    }

    #[test]
    fn test_training_samples_aggregation() {
        let events = vec![
            event("검삭", Some("검색"), 10),
            event(" 검삭 ", Some("검색"), 5),
            event("검삭", Some("검사"), 4),
            event("ㅍㄹㅌ", Some("프론트엔드"), 3),
            event("no-key", None, 2),
        ];
        let samples = aggregate_training_samples(&events, 1, 10);
        assert_eq!(samples.len(), 3);
        // Most frequent pair first; trimming merged the padded query.
        assert_eq!(samples[0].query, "검삭");
        assert_eq!(samples[0].selected_key, "검색");
        assert_eq!(samples[0].count, 2);

        let frequent = aggregate_training_samples(&events, 2, 10);
        assert_eq!(frequent.len(), 1);

        let capped = aggregate_training_samples(&events, 1, 1);
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn test_summary_json_shape() {
        let store = FeedbackStore::default();
        store.record(event("검삭", Some("검색"), 1));
        let json = store.summary_json(Utc::now()).unwrap();
        for field in [
            "\"generatedAt\"",
            "\"totalEvents\"",
            "\"uniqueQueries\"",
            "\"droppedByTTL\"",
            "\"droppedByCapacity\"",
            "\"topPairs\"",
            "\"selectedKey\"",
            "\"lastSeen\"",
        ] {
            assert!(json.contains(field), "missing {field} in {json}");
        }
    }

    #[test]
    fn test_record_all() {
        let store = FeedbackStore::default();
        store.record_all(vec![event("a", Some("가"), 1), event("b", Some("나"), 1)]);
        assert_eq!(store.len(), 2);
    }
}
