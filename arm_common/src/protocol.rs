//! Host command channel wire format.
//!
//! Inbound: `*`-terminated text records (see [`framing`]) decoded into
//! typed [`command::Command`] values (see [`decode`]).
//! Outbound: one text [`status::StatusLine`] per control loop iteration.

pub mod command;
pub mod decode;
pub mod framing;
pub mod status;
