//! Part-time job track records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

/// Part-time job categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PtjType {
    GeneralShop,
    GroceryStore,
    Bookstore,
    Church,
    HealersHouse,
    Blacksmith,
    ClothingShop,
    WeaponsShop,
    Bank,
    Inn,
    Library,
    Farm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtjTrackRecord {
    pub ptj_type: PtjType,
    pub success: i32,
    pub done: i32,
    pub last_change: DateTime<Utc>,
}

impl PtjTrackRecord {
    pub fn new(ptj_type: PtjType) -> Self {
        Self {
            ptj_type,
            success: 0,
            done: 0,
            last_change: Utc::now(),
        }
    }
}

/// Per-character track records, created lazily on first access
#[derive(Debug, Default)]
pub struct PtjTracker {
    records: Mutex<HashMap<PtjType, PtjTrackRecord>>,
}

impl PtjTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the success and done counters and touch the last change time.
    pub async fn modify_track_record(&self, ptj_type: PtjType, success: i32, done: i32) {
        let mut records = self.records.lock().await;
        let record = records
            .entry(ptj_type)
            .or_insert_with(|| PtjTrackRecord::new(ptj_type));

        record.success += success;
        record.done += done;
        record.last_change = Utc::now();

        debug!(
            "PTJ {:?} track record now {}/{}",
            ptj_type, record.success, record.done
        );
    }

    /// Returns the record for the type, creating a zeroed one if needed
    pub async fn get_track_record(&self, ptj_type: PtjType) -> PtjTrackRecord {
        let mut records = self.records.lock().await;
        records
            .entry(ptj_type)
            .or_insert_with(|| PtjTrackRecord::new(ptj_type))
            .clone()
    }

    /// Snapshot of all track records
    pub async fn get_track_records(&self) -> Vec<PtjTrackRecord> {
        self.records.lock().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_modify_is_additive() {
        let tracker = PtjTracker::new();
        tracker.modify_track_record(PtjType::GeneralShop, 1, 1).await;
        tracker.modify_track_record(PtjType::GeneralShop, 1, 1).await;

        let record = tracker.get_track_record(PtjType::GeneralShop).await;
        assert_eq!(record.success, 2);
        assert_eq!(record.done, 2);
    }

    #[tokio::test]
    async fn test_get_materializes_record() {
        let tracker = PtjTracker::new();
        assert!(tracker.get_track_records().await.is_empty());

        let record = tracker.get_track_record(PtjType::Church).await;
        assert_eq!((record.success, record.done), (0, 0));
        assert_eq!(tracker.get_track_records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_last_change_advances() {
        let tracker = PtjTracker::new();
        let before = tracker.get_track_record(PtjType::Bank).await.last_change;
        tracker.modify_track_record(PtjType::Bank, 0, 1).await;
        let after = tracker.get_track_record(PtjType::Bank).await;
        assert!(after.last_change >= before);
        assert_eq!((after.success, after.done), (0, 1));
    }

    #[tokio::test]
    async fn test_concurrent_modifications() {
        let tracker = std::sync::Arc::new(PtjTracker::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                tracker.modify_track_record(PtjType::Inn, 1, 2).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let record = tracker.get_track_record(PtjType::Inn).await;
        assert_eq!((record.success, record.done), (16, 32));
    }
}
