//! Command decoder: one framed record → one [`Command`].
//!
//! Two textual shapes are accepted:
//!
//! 1. **Unlabeled CSV**: `<kind>,<v1>,...,<vN>` where `<kind>` is a
//!    [`CommandKind`] selector and N is the primary group size.
//! 2. **Labeled**: `<Word>:<v1>,...,<vN>` with `Word` one of `Control`
//!    or `Torque`, matched case-insensitively.
//!
//! Decoding is pure: no state is read or written, identical input always
//! yields identical output, and no input can panic.

use thiserror::Error;

use crate::joint::JointId;
use crate::protocol::command::{Command, CommandKind, ModeRequest, TorqueRequest};

/// Labeled-form vocabulary.
const WORD_CONTROL: &str = "control";
const WORD_TORQUE: &str = "torque";

/// Why a record could not be decoded. Always recoverable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty record")]
    Empty,

    #[error("record is not valid UTF-8")]
    InvalidUtf8,

    /// `(expected, got)` value count.
    #[error("arity mismatch: expected {0} values, got {1}")]
    ArityMismatch(usize, usize),

    #[error("malformed number '{0}'")]
    MalformedNumber(String),

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("missing ':' separator after command word")]
    MissingSeparator,

    #[error("invalid flag {0}, expected 0 or 1")]
    InvalidFlag(i64),
}

/// Decoder bound to one mechanism's primary joint set.
///
/// The joint set fixes both the expected arity and the identity of the
/// joint each value is addressed to.
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    joints: Vec<JointId>,
}

impl CommandDecoder {
    pub fn new(joints: &[JointId]) -> Self {
        Self {
            joints: joints.to_vec(),
        }
    }

    /// Number of values every record must carry.
    #[inline]
    pub fn arity(&self) -> usize {
        self.joints.len()
    }

    /// Decode a raw record (terminator already stripped by framing).
    pub fn decode_bytes(&self, raw: &[u8]) -> Result<Command, DecodeError> {
        let text = std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8)?;
        self.decode(text)
    }

    /// Decode one record. Surrounding whitespace is ignored.
    pub fn decode(&self, raw: &str) -> Result<Command, DecodeError> {
        let line = raw.trim();
        if line.is_empty() {
            return Err(DecodeError::Empty);
        }

        match line.split_once(':') {
            Some((word, body)) => self.decode_labeled(word.trim(), body),
            None => self.decode_unlabeled(line),
        }
    }

    fn decode_labeled(&self, word: &str, body: &str) -> Result<Command, DecodeError> {
        let lowered = word.to_ascii_lowercase();
        if lowered != WORD_CONTROL && lowered != WORD_TORQUE {
            return Err(DecodeError::UnknownCommand(word.to_string()));
        }

        let values = parse_values(body)?;
        self.check_arity(values.len())?;

        if lowered == WORD_CONTROL {
            Ok(Command::SetPositions(self.address(&values)))
        } else {
            let flags = values
                .iter()
                .map(|v| parse_flag(*v))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Command::SetTorque(TorqueRequest::PerJoint(
                self.joints.iter().copied().zip(flags).collect(),
            )))
        }
    }

    fn decode_unlabeled(&self, line: &str) -> Result<Command, DecodeError> {
        let (head, _) = line.split_once(',').unwrap_or((line, ""));
        if looks_like_missing_separator(head.trim()) {
            return Err(DecodeError::MissingSeparator);
        }

        let tokens = parse_values(line)?;
        let (kind, values) = match tokens.split_first() {
            Some(split) => split,
            None => return Err(DecodeError::Empty),
        };

        let Some(kind) = CommandKind::from_raw(*kind) else {
            return Ok(Command::Unrecognized(line.to_string()));
        };

        self.check_arity(values.len())?;

        match kind {
            CommandKind::SetPositions => Ok(Command::SetPositions(self.address(values))),
            CommandKind::SetTorque => Ok(Command::SetTorque(TorqueRequest::All(
                leading_flag(values)?,
            ))),
            CommandKind::SetMode => Ok(Command::SetMode(ModeRequest::from_flag(
                leading_flag(values)?,
            ))),
            CommandKind::RequestFeedback => Ok(Command::RequestFeedback),
        }
    }

    fn check_arity(&self, got: usize) -> Result<(), DecodeError> {
        let expected = self.arity();
        if got != expected {
            return Err(DecodeError::ArityMismatch(expected, got));
        }
        Ok(())
    }

    fn address(&self, values: &[i64]) -> Vec<(JointId, i64)> {
        self.joints.iter().copied().zip(values.iter().copied()).collect()
    }
}

/// Split on `,` and parse every token as a signed integer.
fn parse_values(body: &str) -> Result<Vec<i64>, DecodeError> {
    body.split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<i64>()
                .map_err(|_| DecodeError::MalformedNumber(token.to_string()))
        })
        .collect()
}

fn parse_flag(value: i64) -> Result<bool, DecodeError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(DecodeError::InvalidFlag(other)),
    }
}

/// Broadcast flag carried in `v1`; the remaining values are ignored.
fn leading_flag(values: &[i64]) -> Result<bool, DecodeError> {
    match values.first() {
        Some(v) => parse_flag(*v),
        None => Err(DecodeError::ArityMismatch(1, 0)),
    }
}

/// A vocabulary word followed by something other than `:`.
fn looks_like_missing_separator(head: &str) -> bool {
    let word: String = head
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_lowercase();
    word == WORD_CONTROL || word == WORD_TORQUE
}

// ─── Tests ──────────────────────────────────────────────────────────
