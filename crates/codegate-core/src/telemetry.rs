//! Gate counters
//!
//! Emitted through the `metrics` facade; no exporter is installed here.

/// Attempts by final outcome (`committed`, `aborted`, `discarded`, `duplicate`)
pub const ATTEMPTS_TOTAL: &str = "codegate_attempts_total";

/// Aborts by reason code
pub const REJECTIONS_TOTAL: &str = "codegate_rejections_total";

/// Refund requests by result
pub const REFUNDS_TOTAL: &str = "codegate_refunds_total";

pub(crate) fn record_attempt(outcome: &'static str) {
    metrics::counter!(ATTEMPTS_TOTAL, "outcome" => outcome).increment(1);
}

pub(crate) fn record_rejection(code: &'static str) {
    metrics::counter!(REJECTIONS_TOTAL, "code" => code).increment(1);
}

pub(crate) fn record_refund(result: &'static str) {
    metrics::counter!(REFUNDS_TOTAL, "result" => result).increment(1);
}
