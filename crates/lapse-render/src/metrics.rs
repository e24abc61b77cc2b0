//! Render metrics. Recorded through the `metrics` facade; the API binary
//! installs the Prometheus recorder.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const TASKS_CREATED_TOTAL: &str = "lapse_tasks_created_total";
    pub const TASKS_COMPLETED_TOTAL: &str = "lapse_tasks_completed_total";
    pub const TASKS_FAILED_TOTAL: &str = "lapse_tasks_failed_total";
    pub const RENDER_DURATION_SECONDS: &str = "lapse_render_duration_seconds";
    pub const SAMPLING_PLANS_TOTAL: &str = "lapse_sampling_plans_total";
}

pub fn record_task_created(variant: &'static str) {
    counter!(names::TASKS_CREATED_TOTAL, "variant" => variant).increment(1);
}

pub fn record_sampling_plan(case: &'static str) {
    counter!(names::SAMPLING_PLANS_TOTAL, "case" => case).increment(1);
}

pub fn record_task_completed(variant: &'static str, duration_secs: f64) {
    counter!(names::TASKS_COMPLETED_TOTAL, "variant" => variant).increment(1);
    histogram!(names::RENDER_DURATION_SECONDS, "variant" => variant).record(duration_secs);
}

pub fn record_task_failed(variant: &'static str, reason: &'static str) {
    counter!(names::TASKS_FAILED_TOTAL, "variant" => variant, "reason" => reason).increment(1);
}
