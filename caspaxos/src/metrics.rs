//! Round metrics, reported through the `metrics` facade.
//!
//! Nothing is exported until the application installs a recorder. With the
//! `prometheus` feature, [`install_prometheus_recorder`] installs one.
//!
//! | Name | Kind | Labels |
//! |---|---|---|
//! | `caspaxos_rounds_total` | counter | `outcome` = ok, conflict, timeout |
//! | `caspaxos_messages_total` | counter | `type` = Prepare, Accept; `direction` = sent, received |
//! | `caspaxos_errors_total` | counter | `type` = storage, transport, config, internal |
//! | `caspaxos_round_latency_seconds` | histogram | |
//! | `caspaxos_phase_latency_seconds` | histogram | `phase` = prepare, accept |

use crate::message::RoundOutcome;
use metrics::{counter, histogram};
use std::time::{Duration, Instant};

pub mod names {
    pub const ROUNDS_TOTAL: &str = "caspaxos_rounds_total";
    pub const MESSAGES_TOTAL: &str = "caspaxos_messages_total";
    pub const ERRORS_TOTAL: &str = "caspaxos_errors_total";
    pub const ROUND_LATENCY: &str = "caspaxos_round_latency_seconds";
    pub const PHASE_LATENCY: &str = "caspaxos_phase_latency_seconds";
}

/// Values of the `phase` label.
pub mod phase {
    pub const PREPARE: &str = "prepare";
    pub const ACCEPT: &str = "accept";
}

/// Values of the `direction` label.
pub mod direction {
    pub const SENT: &str = "sent";
    pub const RECEIVED: &str = "received";
}

/// Values of the `type` label of `caspaxos_errors_total`.
pub mod error_type {
    pub const STORAGE: &str = "storage";
    pub const TRANSPORT: &str = "transport";
    pub const CONFIG: &str = "config";
    pub const INTERNAL: &str = "internal";
}

/// Count a finished round.
pub fn record_round(outcome: RoundOutcome) {
    counter!(names::ROUNDS_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

/// Count one Prepare or Accept going out or coming back.
pub fn record_message(message_type: &'static str, direction: &'static str) {
    counter!(
        names::MESSAGES_TOTAL,
        "type" => message_type,
        "direction" => direction
    )
    .increment(1);
}

/// Count a collaborator or configuration error.
pub fn record_error(error_type: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type).increment(1);
}

/// Latency guard, records into its histogram when dropped.
pub struct Timer {
    started_at: Instant,
    phase: Option<&'static str>,
}

impl Timer {
    /// Measure a whole round.
    pub fn round() -> Self {
        Self {
            started_at: Instant::now(),
            phase: None,
        }
    }

    /// Measure one phase, `phase` being one of [`phase`].
    pub fn phase(phase: &'static str) -> Self {
        Self {
            started_at: Instant::now(),
            phase: Some(phase),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Record now instead of at the end of the scope.
    pub fn stop(self) {}
}

impl Drop for Timer {
    fn drop(&mut self) {
        let seconds = self.elapsed().as_secs_f64();

        match self.phase {
            Some(phase) => histogram!(names::PHASE_LATENCY, "phase" => phase).record(seconds),
            None => histogram!(names::ROUND_LATENCY).record(seconds),
        }
    }
}

/// Install a global Prometheus recorder and return its render handle.
///
/// Fails if a recorder is already installed.
#[cfg(feature = "prometheus")]
pub fn install_prometheus_recorder(
) -> Result<metrics_exporter_prometheus::PrometheusHandle, metrics_exporter_prometheus::BuildError>
{
    metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()
}
