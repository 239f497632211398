//! Integration tests for the Arm Control Unit.
//!
//! These drive the full loop (transport, decoder, dispatcher, executor,
//! simulated bus) one iteration at a time.

mod integration;
