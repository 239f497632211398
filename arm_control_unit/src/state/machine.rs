//! Control mode transitions.
//!
//! | Event           | From  | To                     |
//! |-----------------|-------|------------------------|
//! | `Activate`      | any   | `Active`               |
//! | `StartFeedback` | any   | `PassiveFeedback`      |
//! | `StartMirror`   | any   | `LeaderFollowerMirror` |
//!
//! `StartMirror` is rejected on a mechanism without a leader group.
//!
//! Transitions happen only on mode events; there is no timeout. No state
//! is terminal and `Idle` is never re-entered once left.

use arm_common::protocol::command::ModeRequest;

/// Operating mode of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    /// Startup pose held, commands accepted, nothing re-sent.
    #[default]
    Idle,
    /// Command-driven.
    Active,
    /// Measured positions streamed every cycle.
    PassiveFeedback,
    /// Leader readings copied onto the primary group every cycle.
    LeaderFollowerMirror,
}

impl ControlMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Active => "Active",
            Self::PassiveFeedback => "PassiveFeedback",
            Self::LeaderFollowerMirror => "LeaderFollowerMirror",
        }
    }

    /// Inbound `SetPositions` is honored.
    #[inline]
    pub const fn accepts_positions(self) -> bool {
        !matches!(self, Self::LeaderFollowerMirror)
    }
}

/// Result of a mode transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded: new mode.
    Ok(ControlMode),
    /// Transition rejected: reason.
    Rejected(&'static str),
}

/// Event that can change the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeEvent {
    Activate,
    StartFeedback,
    StartMirror,
}

/// Mode manager holding the current mode.
#[derive(Debug, Clone)]
pub struct ModeStateMachine {
    mode: ControlMode,
    has_leader: bool,
}

impl ModeStateMachine {
    /// Start in `Idle`.
    pub const fn new(has_leader: bool) -> Self {
        Self {
            mode: ControlMode::Idle,
            has_leader,
        }
    }

    #[inline]
    pub const fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Map a wire-level mode request onto an event. On a dual-group
    /// mechanism "passive" means mirroring.
    pub const fn event_for(&self, request: ModeRequest) -> ModeEvent {
        match request {
            ModeRequest::Active => ModeEvent::Activate,
            ModeRequest::Passive if self.has_leader => ModeEvent::StartMirror,
            ModeRequest::Passive => ModeEvent::StartFeedback,
        }
    }

    pub fn handle_event(&mut self, event: ModeEvent) -> TransitionResult {
        use ControlMode::*;
        use ModeEvent::*;

        let next = match (self.mode, event) {
            (_, StartMirror) if !self.has_leader => {
                return TransitionResult::Rejected("mirroring requires a leader group");
            }
            (_, Activate) => Active,
            (_, StartFeedback) => PassiveFeedback,
            (_, StartMirror) => LeaderFollowerMirror,
        };

        self.mode = next;
        TransitionResult::Ok(next)
    }

    /// Convenience for [`Self::event_for`] + [`Self::handle_event`].
    pub fn request(&mut self, request: ModeRequest) -> TransitionResult {
        let event = self.event_for(request);
        self.handle_event(event)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
