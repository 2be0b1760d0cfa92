//! Transaction data structures for risk scoring

use serde::{Deserialize, Serialize};

/// A single financial event submitted for scoring.
///
/// All six fields are required on the wire. Counts and the time index are
/// unsigned, so negative values are rejected during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Signed amount; negative values represent refunds
    pub amount: f64,

    /// Discretized time index (one step per hour)
    pub step: u64,

    /// Prior observed frequency of this merchant
    pub merchant_freq: u64,

    /// Prior observed frequency of this category
    pub category_freq: u64,

    /// Encoded merchant identifier
    pub merchant_code: i64,

    /// Encoded category identifier
    pub category_code: i64,
}

impl Transaction {
    /// Create a transaction with first-seen merchant and category frequencies
    pub fn new(amount: f64, step: u64) -> Self {
        Self {
            amount,
            step,
            merchant_freq: 1,
            category_freq: 1,
            merchant_code: 0,
            category_code: 0,
        }
    }

    pub fn with_frequencies(mut self, merchant_freq: u64, category_freq: u64) -> Self {
        self.merchant_freq = merchant_freq;
        self.category_freq = category_freq;
        self
    }

    pub fn with_codes(mut self, merchant_code: i64, category_code: i64) -> Self {
        self.merchant_code = merchant_code;
        self.category_code = category_code;
        self
    }
}
