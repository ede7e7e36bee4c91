//! Domain relevance filtering.

use crate::types::{BusinessDomain, IntentClassification};

/// Domains scored at or below this value are not considered relevant.
pub const DEFAULT_RELEVANCE_THRESHOLD: f64 = 0.5;

/// Domains whose relevance is strictly greater than `threshold`, in the
/// order the classification listed them.
pub fn relevant_domains(classification: &IntentClassification, threshold: f64) -> Vec<BusinessDomain> {
    classification
        .business_domains
        .iter()
        .filter(|score| score.relevance > threshold)
        .map(|score| score.domain)
        .collect()
}
