//! # Arm Control Unit Library
//!
//! Command-driven control of a servo arm over one framed text channel.
//! Each fixed-rate cycle consumes at most one inbound record, dispatches
//! it against the joint limit table, performs the resulting bus effects,
//! runs whatever the current mode mandates (goal re-issue, feedback
//! streaming, leader-follower mirroring) and emits one status line.
//!
//! ## Data Flow
//!
//! ```text
//! transport ─► FrameAssembler ─► CommandDecoder ─► dispatch::apply ─► executor ─► ActuatorBus
//!                                                      │    ▲                        │
//!                                                      ▼    │                        │
//!                                                  ActuatorState ◄───────────────────┘
//!                                                      │
//!                                                      └──► StatusLine ─► transport
//! ```
//!
//! ## Modes
//!
//! 1. **Idle**: holds the startup pose, accepts commands
//! 2. **Active**: command-driven, commanded pose re-sent every cycle
//! 3. **PassiveFeedback**: measured positions streamed every cycle
//! 4. **LeaderFollowerMirror**: leader readings copied onto the primary group

pub mod config;
pub mod cycle;
pub mod dispatch;
pub mod executor;
pub mod mirror;
pub mod state;
pub mod transport;
