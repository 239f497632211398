//! Host command channel.
//!
//! A transport hands out at most one framed record per poll without
//! blocking, and writes one status line at a time. Framing is shared:
//! every transport feeds its raw bytes through a [`FrameAssembler`].
//!
//! - [`StdioTransport`] - records on stdin, status on stdout
//! - [`SerialTransport`] - records and status on one serial device
//! - [`ScriptedTransport`] - in-memory, for tests and benchmarks

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use arm_common::config::{TransportConfig, TransportKind};
use arm_common::protocol::framing::{FrameAssembler, FramingError};
use serialport::SerialPort;
use thiserror::Error;
use tracing::{debug, info};

/// Stdin chunks buffered ahead of the control loop. When the loop falls
/// behind, the reader thread blocks and the host sees backpressure.
const STDIN_BACKLOG: usize = 16;

/// Largest single read from a serial host channel.
const SERIAL_READ_MAX: usize = 256;

/// One framing result: a complete record or an overflow notice.
pub type Frame = Result<Vec<u8>, FramingError>;

/// Transport failure.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cannot open {port}: {reason}")]
    Open { port: String, reason: String },
}

/// Non-blocking framed record source and status sink.
pub trait Transport {
    /// Next complete frame, if one has arrived.
    fn poll_frame(&mut self) -> Result<Option<Frame>, TransportError>;

    /// Write one status line (newline appended).
    fn send_line(&mut self, line: &str) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn poll_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        (**self).poll_frame()
    }

    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        (**self).send_line(line)
    }
}

/// Build the transport selected by `[transport]`.
pub fn open(config: &TransportConfig) -> Result<Box<dyn Transport>, TransportError> {
    match config.kind {
        TransportKind::Stdio => Ok(Box::new(StdioTransport::spawn(config.max_frame_len))),
        TransportKind::Serial => {
            let port = config.port.as_deref().ok_or_else(|| TransportError::Open {
                port: String::new(),
                reason: "no port configured".to_string(),
            })?;
            Ok(Box::new(SerialTransport::open(
                port,
                config.baud_rate,
                config.max_frame_len,
            )?))
        }
    }
}

// ─── Frame Queue ────────────────────────────────────────────────────

/// Assembler plus the frames it completed but nobody polled yet.
#[derive(Debug)]
struct FrameQueue {
    assembler: FrameAssembler,
    ready: VecDeque<Frame>,
}

impl FrameQueue {
    fn new(max_frame_len: usize) -> Self {
        Self {
            assembler: FrameAssembler::new(max_frame_len),
            ready: VecDeque::new(),
        }
    }

    fn feed(&mut self, bytes: &[u8]) {
        self.ready.extend(self.assembler.extend(bytes));
    }

    fn pop(&mut self) -> Option<Frame> {
        self.ready.pop_front()
    }

    /// Take chunks from `rx` until a frame completes or nothing is waiting.
    /// Returns `false` once the sending side is gone.
    fn refill(&mut self, rx: &Receiver<Vec<u8>>) -> bool {
        while self.ready.is_empty() {
            match rx.try_recv() {
                Ok(chunk) => self.feed(&chunk),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
        true
    }
}

// ─── Stdio ──────────────────────────────────────────────────────────

/// Reads stdin on a helper thread; the control loop only drains a channel.
pub struct StdioTransport {
    rx: Receiver<Vec<u8>>,
    frames: FrameQueue,
    closed: bool,
    stdout: io::Stdout,
}

impl StdioTransport {
    pub fn spawn(max_frame_len: usize) -> Self {
        let (tx, rx) = mpsc::sync_channel(STDIN_BACKLOG);
        thread::spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buf = [0u8; 256];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!("stdin read failed: {e}");
                        break;
                    }
                }
            }
        });
        info!("Host channel on stdio");
        Self {
            rx,
            frames: FrameQueue::new(max_frame_len),
            closed: false,
            stdout: io::stdout(),
        }
    }
}

impl Transport for StdioTransport {
    fn poll_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        if let Some(frame) = self.frames.pop() {
            return Ok(Some(frame));
        }
        if !self.closed && !self.frames.refill(&self.rx) {
            info!("Host channel closed, holding pose");
            self.closed = true;
        }
        Ok(self.frames.pop())
    }

    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        let mut out = self.stdout.lock();
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

// ─── Serial ─────────────────────────────────────────────────────────

/// Host channel on a serial device (USB CDC or UART).
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    frames: FrameQueue,
}

impl SerialTransport {
    pub fn open(path: &str, baud_rate: u32, max_frame_len: usize) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate)
            .timeout(Duration::from_millis(1))
            .open()
            .map_err(|e| TransportError::Open {
                port: path.to_string(),
                reason: e.to_string(),
            })?;
        info!(port = path, baud = baud_rate, "Host channel on serial");
        Ok(Self {
            port,
            frames: FrameQueue::new(max_frame_len),
        })
    }
}

impl Transport for SerialTransport {
    fn poll_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        if let Some(frame) = self.frames.pop() {
            return Ok(Some(frame));
        }
        let available = self
            .port
            .bytes_to_read()
            .map_err(|e| TransportError::Io(io::Error::other(e)))?;
        if available > 0 {
            let mut buf = vec![0u8; (available as usize).min(SERIAL_READ_MAX)];
            match self.port.read(&mut buf) {
                Ok(n) => self.frames.feed(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(self.frames.pop())
    }

    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\n")?;
        self.port.flush()?;
        Ok(())
    }
}

// ─── Scripted ───────────────────────────────────────────────────────

/// In-memory transport: bytes are pushed by the caller, sent lines are
/// collected.
#[derive(Debug)]
pub struct ScriptedTransport {
    frames: FrameQueue,
    sent: Vec<String>,
}

impl ScriptedTransport {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            frames: FrameQueue::new(max_frame_len),
            sent: Vec::new(),
        }
    }

    /// Transport with `script` already received.
    pub fn with_input(max_frame_len: usize, script: &[u8]) -> Self {
        let mut transport = Self::new(max_frame_len);
        transport.push_bytes(script);
        transport
    }

    /// Deliver raw bytes as if they arrived from the host.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.frames.feed(bytes);
    }

    /// Frames received but not yet polled.
    pub fn pending(&self) -> usize {
        self.frames.ready.len()
    }

    /// Every line sent so far.
    pub fn sent(&self) -> &[String] {
        &self.sent
    }

    /// Take the sent lines, leaving the log empty.
    pub fn take_sent(&mut self) -> Vec<String> {
        std::mem::take(&mut self.sent)
    }
}

impl Transport for ScriptedTransport {
    fn poll_frame(&mut self) -> Result<Option<Frame>, TransportError> {
        Ok(self.frames.pop())
    }

    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.sent.push(line.to_string());
        Ok(())
    }
}
