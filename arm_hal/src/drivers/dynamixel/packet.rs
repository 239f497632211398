//! Protocol 1.0 packet codec.
//!
//! ```text
//! instruction: FF FF <id> <len> <instr> <params..> <checksum>
//! status:      FF FF <id> <len> <error> <params..> <checksum>
//! ```
//!
//! `len` counts the bytes after itself (instruction/error, params,
//! checksum). `checksum = !(id + len + instr/error + params)` with
//! wrapping addition.

use thiserror::Error;

/// Packet preamble.
pub const HEADER: [u8; 2] = [0xFF, 0xFF];

/// Bytes of a status packet that carries no parameters.
pub const STATUS_MIN_LEN: usize = 6;

/// Instruction codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Instruction {
    Ping = 0x01,
    ReadData = 0x02,
    WriteData = 0x03,
}

/// Control table addresses (AX/MX series, protocol 1.0).
pub mod address {
    /// 1 byte.
    pub const TORQUE_ENABLE: u8 = 24;
    /// 2 bytes, little-endian.
    pub const GOAL_POSITION: u8 = 30;
    /// 2 bytes, little-endian.
    pub const MOVING_SPEED: u8 = 32;
    /// 2 bytes, little-endian.
    pub const PRESENT_POSITION: u8 = 36;
}

/// Status packet decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("truncated packet ({0} bytes)")]
    Truncated(usize),

    #[error("missing FF FF header")]
    BadHeader,

    #[error("length field {declared} does not match {actual} trailing bytes")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("checksum 0x{got:02X}, expected 0x{expected:02X}")]
    Checksum { expected: u8, got: u8 },
}

/// Decoded status packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPacket {
    pub id: u8,
    /// Error bitfield; zero when the instruction succeeded.
    pub error: u8,
    pub params: Vec<u8>,
}

impl StatusPacket {
    /// Little-endian word at the start of `params`.
    pub fn word(&self) -> Option<u16> {
        match self.params.as_slice() {
            [lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi])),
            _ => None,
        }
    }
}

/// `!sum` over `bytes`.
#[inline]
pub fn checksum(bytes: &[u8]) -> u8 {
    !bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Encode an instruction packet.
pub fn instruction(id: u8, instr: Instruction, params: &[u8]) -> Vec<u8> {
    let length = (params.len() + 2) as u8;
    let mut pkt = Vec::with_capacity(STATUS_MIN_LEN + params.len());
    pkt.extend_from_slice(&HEADER);
    pkt.push(id);
    pkt.push(length);
    pkt.push(instr as u8);
    pkt.extend_from_slice(params);
    pkt.push(checksum(&pkt[2..]));
    pkt
}

/// WRITE_DATA of `data` starting at `addr`.
pub fn write(id: u8, addr: u8, data: &[u8]) -> Vec<u8> {
    let mut params = Vec::with_capacity(1 + data.len());
    params.push(addr);
    params.extend_from_slice(data);
    instruction(id, Instruction::WriteData, &params)
}

/// READ_DATA of `len` bytes starting at `addr`.
pub fn read(id: u8, addr: u8, len: u8) -> Vec<u8> {
    instruction(id, Instruction::ReadData, &[addr, len])
}

/// Total size of a status packet announced by its first four bytes.
pub fn expected_len(head: &[u8]) -> Result<usize, PacketError> {
    if head.len() < 4 {
        return Err(PacketError::Truncated(head.len()));
    }
    if head[..2] != HEADER {
        return Err(PacketError::BadHeader);
    }
    Ok(4 + head[3] as usize)
}

/// Decode one complete status packet.
pub fn parse_status(bytes: &[u8]) -> Result<StatusPacket, PacketError> {
    if bytes.len() < STATUS_MIN_LEN {
        return Err(PacketError::Truncated(bytes.len()));
    }
    if bytes[..2] != HEADER {
        return Err(PacketError::BadHeader);
    }

    let declared = bytes[3] as usize;
    let actual = bytes.len() - 4;
    if declared != actual || declared < 2 {
        return Err(PacketError::LengthMismatch { declared, actual });
    }

    let (body, tail) = bytes.split_at(bytes.len() - 1);
    let expected = checksum(&body[2..]);
    let got = tail[0];
    if expected != got {
        return Err(PacketError::Checksum { expected, got });
    }

    Ok(StatusPacket {
        id: bytes[2],
        error: bytes[4],
        params: body[5..].to_vec(),
    })
}
