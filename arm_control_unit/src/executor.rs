//! Bus effect executor.
//!
//! Performs effects in order against an [`ActuatorBus`]. Successful reads
//! land in `measured`; a failed operation leaves the state untouched (last
//! known-good value retained) and is reported, never retried here. The next
//! natural cycle is the retry.

use arm_common::bus::{ActuatorBus, BusEffect, BusError};
use tracing::warn;

use crate::state::ActuatorState;

/// What happened to one batch of effects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Effects the bus acknowledged.
    pub performed: usize,
    pub failures: Vec<BusError>,
}

impl ExecutionReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn merge(&mut self, other: ExecutionReport) {
        self.performed += other.performed;
        self.failures.extend(other.failures);
    }
}

/// Perform `effects` in order. A failure does not stop the batch.
pub fn execute<B: ActuatorBus + ?Sized>(
    bus: &mut B,
    effects: &[BusEffect],
    state: &mut ActuatorState,
) -> ExecutionReport {
    let mut report = ExecutionReport::default();
    for effect in effects {
        match bus.perform(effect) {
            Ok(reading) => {
                if let Some(position) = reading {
                    state.set_measured(effect.joint(), position);
                }
                report.performed += 1;
            }
            Err(e) => {
                warn!(joint = %effect.joint(), error = %e, "Bus operation failed");
                report.failures.push(e);
            }
        }
    }
    report
}
