//! Business handling of admitted notification batches.
//!
//! The admission pipeline has already authenticated the request by the time
//! a batch lands here; this stage performs duplicate detection and field
//! validation per transaction and assembles the per-transaction result list
//! for the response envelope.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;

use crate::webhook::types::{TransactionRecord, TransactionResult, WebhookRequest};

/// Outcome of processing one batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<TransactionResult>,
    pub processed: usize,
    pub failed: usize,
}

impl BatchOutcome {
    pub fn all_ok(&self) -> bool {
        self.failed == 0
    }
}

/// Counters exposed on the health endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProcessorStats {
    pub processed: u64,
    pub duplicates: u64,
    pub failed: u64,
    pub tracked_ids: usize,
}

pub struct WebhookProcessor {
    /// Transaction id → Unix second it was first processed.
    seen: DashMap<String, u64>,
    processed: AtomicU64,
    duplicates: AtomicU64,
    failed: AtomicU64,
}

impl WebhookProcessor {
    pub fn new() -> Self {
        Self {
            seen: DashMap::new(),
            processed: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Process every transaction in a batch, producing one result per
    /// record in input order.
    pub fn process_batch(&self, batch: &WebhookRequest, now: u64) -> BatchOutcome {
        let mut results = Vec::with_capacity(batch.data.len());
        let mut processed = 0;
        let mut failed = 0;

        for record in &batch.data {
            let result = self.process_one(record, now);
            if result.error_code == super::types::codes::PROCESSED {
                processed += 1;
            } else {
                failed += 1;
            }
            results.push(result);
        }

        tracing::info!(
            batch_id = %batch.batch_id,
            source_app_id = %batch.source_app_id,
            transactions = batch.data.len(),
            processed,
            failed,
            "Batch processed"
        );

        BatchOutcome {
            results,
            processed,
            failed,
        }
    }

    fn process_one(&self, record: &TransactionRecord, now: u64) -> TransactionResult {
        let errors = validate(record);
        if !errors.is_empty() {
            self.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                transaction_id = %record.transaction_id,
                errors = %errors.join(", "),
                "Transaction validation failed"
            );
            return TransactionResult::invalid(&record.transaction_id, &errors);
        }

        // insert() returning a previous value is the atomic duplicate test.
        if self
            .seen
            .insert(record.transaction_id.clone(), now)
            .is_some()
        {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                transaction_id = %record.transaction_id,
                "Duplicate transaction detected"
            );
            return TransactionResult::duplicate(&record.transaction_id);
        }

        self.processed.fetch_add(1, Ordering::Relaxed);
        TransactionResult::processed(&record.transaction_id)
    }

    /// Drop processed-transaction ids older than the retention horizon so
    /// the dedup set stays bounded.
    pub fn prune(&self, retention_secs: u64, now: u64) -> usize {
        let horizon = now.saturating_sub(retention_secs);
        // Counted inside retain: len() snapshots taken around it race
        // concurrent process_batch inserts.
        let mut removed = 0;
        self.seen.retain(|_, at| {
            let keep = *at >= horizon;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    pub fn stats(&self) -> ProcessorStats {
        ProcessorStats {
            processed: self.processed.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            tracked_ids: self.seen.len(),
        }
    }
}

impl Default for WebhookProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(record: &TransactionRecord) -> Vec<String> {
    let mut errors = Vec::new();
    if record.transaction_id.trim().is_empty() {
        errors.push("transactionId is empty".to_string());
    }
    if record.src_account_number.trim().is_empty() {
        errors.push("srcAccountNumber is empty".to_string());
    }
    if !(record.amount > 0.0) {
        errors.push(format!("amount must be positive, got {}", record.amount));
    }
    match record.trans_type.as_str() {
        "C" | "D" => {}
        other => errors.push(format!("transType must be C or D, got '{}'", other)),
    }
    errors
}
