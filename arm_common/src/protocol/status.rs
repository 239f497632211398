//! Outbound status lines.
//!
//! ```text
//! 512,512,380,800,700,512,512          echo of commanded positions
//! Feedback:510,515,381,799,702,512,500 streamed measured positions
//! Positions:510,515,381,799,702,512,500 on-demand measured positions
//! ID11: 510, ID12: 515, ...            mirroring dump
//! Error:arity mismatch: ...            diagnostic
//! ```

use std::fmt;

use crate::consts::{ERROR_LABEL, FEEDBACK_LABEL, POSITIONS_LABEL};
use crate::joint::{JointId, Position};

/// One line on the status channel (newline not included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusLine {
    /// Plain comma-separated commanded positions.
    Echo(Vec<Position>),
    /// `<label>:<v1>,...,<vN>`.
    Labeled {
        label: &'static str,
        values: Vec<Position>,
    },
    /// `ID<j>: <v>` pairs.
    JointDump(Vec<(JointId, Position)>),
    /// Human-readable failure.
    Diagnostic(String),
}

impl StatusLine {
    pub fn feedback(values: Vec<Position>) -> Self {
        Self::Labeled {
            label: FEEDBACK_LABEL,
            values,
        }
    }

    pub fn positions(values: Vec<Position>) -> Self {
        Self::Labeled {
            label: POSITIONS_LABEL,
            values,
        }
    }

    pub fn diagnostic(message: impl Into<String>) -> Self {
        Self::Diagnostic(message.into())
    }

    #[inline]
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Diagnostic(_))
    }
}

fn write_csv(f: &mut fmt::Formatter<'_>, values: &[Position]) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{v}")?;
    }
    Ok(())
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Echo(values) => write_csv(f, values),
            Self::Labeled { label, values } => {
                write!(f, "{label}:")?;
                write_csv(f, values)
            }
            Self::JointDump(pairs) => {
                for (i, (joint, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "ID{joint}: {v}")?;
                }
                Ok(())
            }
            Self::Diagnostic(message) => write!(f, "{ERROR_LABEL}:{message}"),
        }
    }
}
