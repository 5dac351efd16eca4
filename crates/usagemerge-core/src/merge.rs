use crate::model::UsageRecord;

/// Concatenates per-source batches in registration order, then stable-sorts
/// by request time ascending. Records with equal timestamps keep their
/// relative order from the concatenation.
pub fn merge_sorted(batches: Vec<Vec<UsageRecord>>) -> Vec<UsageRecord> {
    let mut merged: Vec<UsageRecord> = batches.into_iter().flatten().collect();
    merged.sort_by_key(|record| record.request_time);
    merged
}
