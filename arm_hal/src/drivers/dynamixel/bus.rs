//! Dynamixel bus adapter.
//!
//! One request, one status packet: every instruction is written in full and
//! the reply is read back before the next one goes out. A reply timeout is
//! `NoReply`; anything unparseable is `MalformedReply`.
//!
//! Input left over from an earlier transaction (a reply that arrived after
//! its timeout, line noise) is discarded before each request. A foreign
//! status packet that still shows up ahead of the expected one is skipped.

use std::io::{self, Read, Write};
use std::time::Duration;

use arm_common::bus::{ActuatorBus, BusError};
use arm_common::config::BusConfig;
use arm_common::joint::{JointId, Position, PositionDomain};
use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info, warn};

use super::packet::{self, StatusPacket, address};

/// Foreign status packets tolerated ahead of the expected reply.
const MAX_FOREIGN_REPLIES: usize = 4;

/// Byte stream a [`DynamixelBus`] talks over.
pub trait BusPort: Read + Write + Send {
    /// Drop whatever has been received but not yet read.
    fn discard_input(&mut self) -> io::Result<()>;
}

impl BusPort for Box<dyn SerialPort> {
    fn discard_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}

/// Protocol 1.0 adapter over any byte stream (normally a serial port).
pub struct DynamixelBus<P = Box<dyn SerialPort>> {
    port: P,
    domain: PositionDomain,
}

impl DynamixelBus {
    /// Open the serial device named in `[bus]`.
    pub fn open(config: &BusConfig, domain: PositionDomain) -> Result<Self, BusError> {
        let path = config
            .port
            .as_deref()
            .ok_or_else(|| BusError::InitFailed("[bus] port is required".to_string()))?;

        let port = serialport::new(path, config.baud_rate)
            .timeout(Duration::from_millis(config.reply_timeout_ms))
            .open()
            .map_err(|e| BusError::InitFailed(format!("{path}: {e}")))?;

        info!(port = path, baud = config.baud_rate, "Dynamixel bus opened");
        Ok(Self::with_port(port, domain))
    }
}

impl<P: BusPort> DynamixelBus<P> {
    /// Wrap an already opened byte stream.
    pub fn with_port(port: P, domain: PositionDomain) -> Self {
        Self { port, domain }
    }

    /// Underlying stream.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Send one instruction packet and read its status packet.
    fn transact(&mut self, joint: JointId, request: &[u8]) -> Result<StatusPacket, BusError> {
        self.port.discard_input().map_err(|e| io_error(joint, e))?;
        self.port.write_all(request).map_err(|e| io_error(joint, e))?;
        self.port.flush().map_err(|e| io_error(joint, e))?;

        let mut foreign = None;
        for _ in 0..=MAX_FOREIGN_REPLIES {
            let status = match self.read_status(joint) {
                Ok(status) => status,
                // Only a foreign packet came back.
                Err(BusError::NoReply(_)) if foreign.is_some() => break,
                Err(e) => return Err(e),
            };
            if status.id != joint.get() {
                debug!(%joint, from = status.id, "skipping foreign status packet");
                foreign = Some(status.id);
                continue;
            }
            if status.error != 0 {
                warn!(%joint, code = status.error, "Actuator reported error");
                return Err(BusError::DeviceError {
                    joint,
                    code: status.error,
                });
            }
            return Ok(status);
        }
        match foreign {
            Some(id) => Err(malformed(joint, format!("reply from id {id}"))),
            None => Err(BusError::NoReply(joint)),
        }
    }

    /// Read one complete status packet, whoever sent it.
    fn read_status(&mut self, joint: JointId) -> Result<StatusPacket, BusError> {
        let mut head = [0u8; 4];
        self.port.read_exact(&mut head).map_err(|e| io_error(joint, e))?;
        let total = packet::expected_len(&head).map_err(|e| malformed(joint, e))?;
        if total < packet::STATUS_MIN_LEN {
            return Err(malformed(joint, "length field too small"));
        }

        let mut raw = Vec::with_capacity(total);
        raw.extend_from_slice(&head);
        raw.resize(total, 0);
        self.port
            .read_exact(&mut raw[4..])
            .map_err(|e| io_error(joint, e))?;

        packet::parse_status(&raw).map_err(|e| malformed(joint, e))
    }

    fn write_word(&mut self, joint: JointId, addr: u8, value: u16) -> Result<(), BusError> {
        let request = packet::write(joint.get(), addr, &value.to_le_bytes());
        self.transact(joint, &request).map(|_| ())
    }
}

fn io_error(joint: JointId, e: io::Error) -> BusError {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::UnexpectedEof | io::ErrorKind::WouldBlock => {
            BusError::NoReply(joint)
        }
        _ => BusError::Io(e.to_string()),
    }
}

fn malformed(joint: JointId, detail: impl ToString) -> BusError {
    BusError::MalformedReply {
        joint,
        detail: detail.to_string(),
    }
}

impl<P: BusPort> ActuatorBus for DynamixelBus<P> {
    fn name(&self) -> &'static str {
        super::DRIVER_NAME
    }

    fn set_goal_position(&mut self, joint: JointId, position: Position) -> Result<(), BusError> {
        let max = self.domain.max();
        if position > max {
            return Err(BusError::OutOfDomain {
                joint,
                value: u32::from(position),
                max,
            });
        }
        self.write_word(joint, address::GOAL_POSITION, position)
    }

    fn present_position(&mut self, joint: JointId) -> Result<Position, BusError> {
        let request = packet::read(joint.get(), address::PRESENT_POSITION, 2);
        let status = self.transact(joint, &request)?;
        let value = status
            .word()
            .ok_or_else(|| malformed(joint, "missing position bytes"))?;
        let max = self.domain.max();
        if value > max {
            return Err(BusError::OutOfDomain {
                joint,
                value: u32::from(value),
                max,
            });
        }
        Ok(value)
    }

    fn set_torque_enabled(&mut self, joint: JointId, enabled: bool) -> Result<(), BusError> {
        let request = packet::write(joint.get(), address::TORQUE_ENABLE, &[u8::from(enabled)]);
        self.transact(joint, &request).map(|_| ())
    }

    fn set_profile_velocity(&mut self, joint: JointId, velocity: u16) -> Result<(), BusError> {
        self.write_word(joint, address::MOVING_SPEED, velocity)
    }

    fn shutdown(&mut self) -> Result<(), BusError> {
        debug!("Dynamixel bus closing");
        self.port
            .flush()
            .map_err(|e| BusError::Io(e.to_string()))
    }
}
