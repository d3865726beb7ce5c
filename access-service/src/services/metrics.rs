//! Counters for resolution and authorization outcomes. The recorder is
//! installed by the host process; without one these calls are no-ops.

pub fn record_resolution(entity: &'static str, result: &'static str) {
    metrics::counter!("scope_resolution_total", "entity" => entity, "result" => result)
        .increment(1);
}

pub fn record_decision(outcome: &'static str, reason: &'static str) {
    metrics::counter!("access_decisions_total", "outcome" => outcome, "reason" => reason)
        .increment(1);
}
