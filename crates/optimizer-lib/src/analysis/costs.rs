//! Cost summaries over provider cost line items

use crate::models::{default_currency, CostRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Total spend over a date range, broken down by service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total: f64,
    pub currency: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub by_service: BTreeMap<String, f64>,
    pub record_count: usize,
}

impl CostSummary {
    pub fn from_records(records: &[CostRecord], start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let mut by_service = BTreeMap::new();
        for record in records {
            *by_service.entry(record.service.clone()).or_insert(0.0) += record.amount;
        }

        Self {
            total: records.iter().map(|r| r.amount).sum(),
            currency: records
                .first()
                .map(|r| r.currency.clone())
                .unwrap_or_else(default_currency),
            start,
            end,
            by_service,
            record_count: records.len(),
        }
    }

    /// Fold another provider's summary into this one
    pub fn merge(&mut self, other: CostSummary) {
        self.total += other.total;
        self.record_count += other.record_count;
        for (service, amount) in other.by_service {
            *self.by_service.entry(service).or_insert(0.0) += amount;
        }
    }
}
