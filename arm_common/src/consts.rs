//! System-wide constants for the servo arm workspace.
//!
//! Single source of truth for numeric limits and defaults.

use static_assertions::const_assert;

/// Upper bound of the narrow (10-bit) position domain.
pub const POSITION_MAX_NARROW: u16 = 1023;

/// Upper bound of the wide (12-bit) position domain.
pub const POSITION_MAX_WIDE: u16 = 4095;

/// Maximum number of joints in one group.
pub const MAX_JOINTS: usize = 16;

/// Sentinel byte that terminates one inbound record.
pub const FRAME_TERMINATOR: u8 = b'*';

/// Default upper bound for one framed record, terminator excluded.
pub const DEFAULT_MAX_FRAME_LEN: usize = 128;

/// Hard capacity of the frame assembly buffer.
pub const FRAME_BUFFER_CAPACITY: usize = 512;

/// Default control loop period in milliseconds.
pub const DEFAULT_CYCLE_TIME_MS: u32 = 20;

/// Accepted control loop period range in milliseconds.
pub const CYCLE_TIME_MS_MIN: u32 = 1;
pub const CYCLE_TIME_MS_MAX: u32 = 1000;

/// Default baud rate of the host command channel.
pub const DEFAULT_HOST_BAUD_RATE: u32 = 115_200;

/// Default baud rate of the actuator bus.
pub const DEFAULT_BUS_BAUD_RATE: u32 = 1_000_000;

/// Default time to wait for a status packet on the actuator bus.
pub const DEFAULT_REPLY_TIMEOUT_MS: u64 = 10;

/// Label of the streamed measured-position line.
pub const FEEDBACK_LABEL: &str = "Feedback";

/// Label of the on-demand measured-position line.
pub const POSITIONS_LABEL: &str = "Positions";

/// Prefix of diagnostic lines on the status channel.
pub const ERROR_LABEL: &str = "Error";

const_assert!(POSITION_MAX_NARROW < POSITION_MAX_WIDE);
const_assert!(DEFAULT_MAX_FRAME_LEN <= FRAME_BUFFER_CAPACITY);
const_assert!(MAX_JOINTS <= u8::MAX as usize);
