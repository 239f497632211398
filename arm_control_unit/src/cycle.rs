//! Fixed-rate control loop: poll → dispatch → mode work → report.
//!
//! ## Startup
//! 1. Apply the configured profile velocity to every primary joint.
//! 2. Release the leader group (torque off) so it can be moved by hand.
//! 3. Enable torque on the primary group.
//! 4. Command the default pose.
//! 5. Prime `measured` with one read per joint.
//!
//! Startup bus failures are reported as diagnostics; the loop still starts.
//!
//! ## Iteration
//! At most one framed record is consumed. Its effects are executed, then
//! the current mode's work runs, then diagnostics and one status line are
//! written. No error leaves an iteration.
//!
//! ## Pacing
//! Deadlines advance by exactly one cycle time from the loop start, so a
//! slow iteration does not shift later ones. An overrun is counted and
//! logged, never fatal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use arm_common::bus::{ActuatorBus, BusEffect, BusError};
use arm_common::config::{ArmConfig, ConfigError};
use arm_common::consts::{CYCLE_TIME_MS_MAX, CYCLE_TIME_MS_MIN, MAX_JOINTS};
use arm_common::protocol::decode::CommandDecoder;
use arm_common::protocol::status::StatusLine;
use static_assertions::const_assert;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{LoopSettings, Mechanism};
use crate::dispatch::{self, goal_for};
use crate::executor::{self, ExecutionReport};
use crate::mirror;
use crate::state::{ActuatorState, ControlMode};
use crate::transport::Transport;

const_assert!(CYCLE_TIME_MS_MIN > 0);
const_assert!(CYCLE_TIME_MS_MIN <= CYCLE_TIME_MS_MAX);
// Joint ids are single bytes on the bus.
const_assert!(MAX_JOINTS <= u8::MAX as usize);

// ─── Cycle Statistics ───────────────────────────────────────────────

/// Per-cycle timing statistics. O(1) update, no allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: u64,
    pub min_cycle_ns: u64,
    pub max_cycle_ns: u64,
    /// Running sum for the average.
    pub sum_cycle_ns: u64,
    /// Cycles whose body took longer than the cycle time.
    pub overruns: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: u64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
        }
    }

    #[inline]
    pub fn record(&mut self, duration_ns: u64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> u64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors & Reports ───────────────────────────────────────────────

/// Errors that keep the loop from starting or stopping cleanly.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("bus error: {0}")]
    Bus(#[from] BusError),
}

/// What one iteration did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationReport {
    /// A framed record (or an overflow notice) was taken from the transport.
    pub consumed_record: bool,
    /// Bus outcome of the command and the mode work combined.
    pub execution: ExecutionReport,
    /// `Error:` lines written, in order.
    pub diagnostics: Vec<String>,
    /// The status line written, if any.
    pub status: Option<String>,
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns the mechanism, the actuator state, the bus and the host channel.
pub struct CycleRunner<B: ActuatorBus, T: Transport> {
    mechanism: Mechanism,
    settings: LoopSettings,
    decoder: CommandDecoder,
    state: ActuatorState,
    bus: B,
    transport: T,
    stats: CycleStats,
}

impl<B: ActuatorBus, T: Transport> CycleRunner<B, T> {
    pub fn new(config: &ArmConfig, bus: B, transport: T) -> Result<Self, CycleError> {
        let mechanism = Mechanism::from_config(config)?;
        let settings = LoopSettings::from_config(config);
        let decoder = CommandDecoder::new(mechanism.primary.ids());
        let state = ActuatorState::new(&mechanism);
        info!(
            bus = bus.name(),
            cycle_ms = settings.cycle_time.as_millis() as u64,
            arity = decoder.arity(),
            "CycleRunner initialized"
        );
        Ok(Self {
            mechanism,
            settings,
            decoder,
            state,
            bus,
            transport,
            stats: CycleStats::new(),
        })
    }

    /// Bring the mechanism to its default pose. Returns the bus outcome;
    /// failures have already been sent as diagnostics.
    pub fn startup(&mut self) -> ExecutionReport {
        let mut effects = Vec::new();
        let primary = &self.mechanism.primary;

        if let Some(velocity) = self.mechanism.profile_velocity {
            effects.extend(
                primary
                    .iter()
                    .map(|joint| BusEffect::SetProfileVelocity { joint, velocity }),
            );
        }
        if let Some(leader) = &self.mechanism.leader {
            for joint in leader.iter() {
                self.state.set_torque(joint, false);
                effects.push(BusEffect::SetTorqueEnabled { joint, enabled: false });
            }
        }
        for joint in primary.iter() {
            self.state.set_torque(joint, true);
            effects.push(BusEffect::SetTorqueEnabled { joint, enabled: true });
        }
        for &(joint, raw) in &self.mechanism.default_pose {
            // Validation guarantees every primary joint has a limit.
            let Ok(position) = goal_for(joint, i64::from(raw), &self.mechanism) else {
                continue;
            };
            self.state.set_commanded(joint, position);
            effects.push(BusEffect::SetGoalPosition { joint, position });
        }
        effects.extend(primary.iter().map(|joint| BusEffect::ReadPresentPosition { joint }));
        effects.extend(mirror::leader_reads(&self.mechanism));

        let report = executor::execute(&mut self.bus, &effects, &mut self.state);
        for failure in &report.failures {
            self.send(&StatusLine::diagnostic(failure.to_string()));
        }
        info!(
            performed = report.performed,
            failed = report.failures.len(),
            "Startup sequence complete"
        );
        report
    }

    /// Run one iteration.
    pub fn step(&mut self) -> IterationReport {
        let mut report = IterationReport::default();
        let mut diagnostics: Vec<StatusLine> = Vec::new();
        let mut report_requested = false;
        let mut goals_sent = false;

        // 1-2: at most one record.
        match self.transport.poll_frame() {
            Ok(Some(Ok(record))) => {
                report.consumed_record = true;
                match self.decoder.decode_bytes(&record) {
                    Ok(cmd) => {
                        let outcome = dispatch::apply(cmd, &mut self.state, &self.mechanism);
                        diagnostics.extend(
                            outcome
                                .diagnostics
                                .iter()
                                .map(|e| StatusLine::diagnostic(e.to_string())),
                        );
                        goals_sent = outcome.sets_goals();
                        report_requested = outcome.report_requested;
                        report.execution =
                            executor::execute(&mut self.bus, &outcome.effects, &mut self.state);
                    }
                    Err(e) => {
                        debug!(error = %e, "record rejected");
                        diagnostics.push(StatusLine::diagnostic(e.to_string()));
                    }
                }
            }
            Ok(Some(Err(overflow))) => {
                report.consumed_record = true;
                warn!(error = %overflow, "record discarded");
                diagnostics.push(StatusLine::diagnostic(overflow.to_string()));
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "transport poll failed"),
        }

        // 3: mode work.
        let mode_effects = self.mode_effects(goals_sent, report_requested);
        if !mode_effects.is_empty() {
            let executed = executor::execute(&mut self.bus, &mode_effects, &mut self.state);
            report.execution.merge(executed);
        }
        if self.state.mode() == ControlMode::LeaderFollowerMirror {
            let goals = mirror::follow(&mut self.state, &self.mechanism);
            let writes = mirror::goal_effects(&goals);
            let executed = executor::execute(&mut self.bus, &writes, &mut self.state);
            report.execution.merge(executed);
        }
        diagnostics.extend(
            report
                .execution
                .failures
                .iter()
                .map(|e| StatusLine::diagnostic(e.to_string())),
        );

        // 4: diagnostics, then one status line.
        for line in &diagnostics {
            report.diagnostics.push(self.send(line));
        }
        if let Some(status) = self.status_line(report_requested) {
            report.status = Some(self.send(&status));
        }
        report
    }

    /// Effects the current mode mandates, besides mirroring goals.
    fn mode_effects(&self, goals_sent: bool, report_requested: bool) -> Vec<BusEffect> {
        let primary = &self.mechanism.primary;
        match self.state.mode() {
            ControlMode::Idle => Vec::new(),
            ControlMode::Active => {
                if goals_sent || !self.settings.reissue_goals {
                    return Vec::new();
                }
                primary
                    .iter()
                    .filter_map(|joint| {
                        let commanded = self.state.commanded(joint)?;
                        let position =
                            goal_for(joint, i64::from(commanded), &self.mechanism).ok()?;
                        Some(BusEffect::SetGoalPosition { joint, position })
                    })
                    .collect()
            }
            // A feedback request this iteration already read the group.
            ControlMode::PassiveFeedback if report_requested => Vec::new(),
            ControlMode::PassiveFeedback => primary
                .iter()
                .map(|joint| BusEffect::ReadPresentPosition { joint })
                .collect(),
            ControlMode::LeaderFollowerMirror => mirror::leader_reads(&self.mechanism),
        }
    }

    fn status_line(&self, report_requested: bool) -> Option<StatusLine> {
        let primary = &self.mechanism.primary;
        if report_requested {
            return Some(StatusLine::positions(self.state.measured_pose(primary)));
        }
        if !self.settings.status_every_cycle {
            return None;
        }
        Some(match self.state.mode() {
            ControlMode::PassiveFeedback => StatusLine::feedback(self.state.measured_pose(primary)),
            ControlMode::LeaderFollowerMirror => mirror::leader_dump(&self.state, &self.mechanism),
            ControlMode::Idle | ControlMode::Active => {
                StatusLine::Echo(self.state.commanded_pose(primary))
            }
        })
    }

    /// Write one line; a transport failure is logged and dropped.
    fn send(&mut self, line: &StatusLine) -> String {
        let text = line.to_string();
        if let Err(e) = self.transport.send_line(&text) {
            warn!(error = %e, "status line dropped");
        }
        text
    }

    /// Iterate at the configured rate until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) {
        let cycle = self.settings.cycle_time;
        let mut deadline = Instant::now();
        info!(cycle_ms = cycle.as_millis() as u64, "Entering control loop");

        while running.load(Ordering::SeqCst) {
            let started = Instant::now();
            self.step();
            let elapsed = started.elapsed();
            self.stats.record(elapsed.as_nanos() as u64);

            deadline += cycle;
            let now = Instant::now();
            if now > deadline {
                self.stats.overruns += 1;
                debug!(
                    elapsed_us = elapsed.as_micros() as u64,
                    budget_us = cycle.as_micros() as u64,
                    "cycle overrun"
                );
                // Resynchronise instead of bursting to catch up.
                deadline = now;
            } else {
                thread::sleep(deadline - now);
            }
        }

        info!(
            cycles = self.stats.cycle_count,
            avg_us = self.stats.avg_cycle_ns() / 1_000,
            max_us = self.stats.max_cycle_ns / 1_000,
            overruns = self.stats.overruns,
            "Control loop stopped"
        );
    }

    /// Release the bus. The commanded pose is left in place.
    pub fn shutdown(&mut self) -> Result<(), CycleError> {
        self.bus.shutdown()?;
        Ok(())
    }

    // ─── Accessors ──────────────────────────────────────────────────

    pub fn mechanism(&self) -> &Mechanism {
        &self.mechanism
    }

    pub fn settings(&self) -> &LoopSettings {
        &self.settings
    }

    pub fn state(&self) -> &ActuatorState {
        &self.state
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    pub fn cycle_time(&self) -> Duration {
        self.settings.cycle_time
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
