//! AT command exchange with the modem
//!
//! Every operation is one synchronous round trip: write the command, wait for the transmit
//! path to drain, (write and drain the payload,) then read one response. Each blocking step
//! has its own [`MODEM_TIMEOUT`] deadline and a single failed step fails the operation, there
//! are no retries.
//!
//! | operation | sent                                | success when response contains      |
//! |-----------|-------------------------------------|-------------------------------------|
//! | init      | `AT\r\n`                            | `OK`                                |
//! | transmit  | `AT+CIPSEND=<N>\r\n` + `N` raw bytes | `OK`                                |
//! | receive   | `AT+CIPRXGET=2,<N>\r\n`             | `+CIPRXGET: 2`, payload after CRLF  |
//!
//! Responses are parsed only within the bytes a read actually returned.
use core::fmt::Write;
#[cfg(feature = "std")]
use core::fmt;
use core::time::Duration;

use heapless::String;

use crate::fmt::Hex;
use crate::transport::{SerialLine, Transport, TransportConfig, TransportError};

pub const MODEM_TIMEOUT: Duration = Duration::from_millis(1000);

pub const INIT_RESPONSE_CAPACITY: usize = 64;
pub const TRANSMIT_RESPONSE_CAPACITY: usize = 64;
pub const RECEIVE_RESPONSE_CAPACITY: usize = 256;

pub const INIT_COMMAND: &str = "AT\r\n";
const COMMAND_CAPACITY: usize = 32;

const OK_MARKER: &[u8] = b"OK";
const RECEIVE_MARKER: &[u8] = b"+CIPRXGET: 2";
const CRLF: &[u8] = b"\r\n";

pub type Command = String<COMMAND_CAPACITY>;

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum ModemState {
    Uninitialized,
    Ready,
    /// Last init failed; a later init may still bring the modem up
    Faulted,
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum ModemError {
    Transport(TransportError),
    CommandTooLong,
    /// Response did not contain `OK`
    UnexpectedResponse,
    /// Response did not contain `+CIPRXGET: 2`
    MissingMarker,
    /// No CRLF after the `+CIPRXGET: 2` marker
    MissingDelimiter,
}

impl From<TransportError> for ModemError {
    fn from(e: TransportError) -> ModemError {
        ModemError::Transport(e)
    }
}

#[cfg(feature = "std")]
impl fmt::Display for ModemError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModemError::Transport(e) => write!(f, "transport: {}", e),
            ModemError::CommandTooLong => write!(f, "AT command does not fit the command buffer"),
            ModemError::UnexpectedResponse => write!(f, "modem did not answer OK"),
            ModemError::MissingMarker => write!(f, "response lacks the +CIPRXGET: 2 marker"),
            ModemError::MissingDelimiter => write!(f, "response lacks CRLF after the marker"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ModemError {}

/// `AT+CIPSEND=<size>\r\n`
pub fn send_command(size: usize) -> Result<Command, ModemError> {
    let mut command = Command::new();
    write!(command, "AT+CIPSEND={}\r\n", size).map_err(|_| ModemError::CommandTooLong)?;
    Ok(command)
}

/// `AT+CIPRXGET=2,<capacity>\r\n`
pub fn receive_command(capacity: usize) -> Result<Command, ModemError> {
    let mut command = Command::new();
    write!(command, "AT+CIPRXGET=2,{}\r\n", capacity).map_err(|_| ModemError::CommandTooLong)?;
    Ok(command)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub fn is_ok_response(response: &[u8]) -> bool {
    find(response, OK_MARKER).is_some()
}

/// Returns the payload part of a `+CIPRXGET: 2` response: everything after the first CRLF
/// that follows the marker
pub fn receive_payload(response: &[u8]) -> Result<&[u8], ModemError> {
    let marker = find(response, RECEIVE_MARKER).ok_or(ModemError::MissingMarker)?;
    let marker_end = marker + RECEIVE_MARKER.len();
    let delimiter = find(&response[marker_end..], CRLF).ok_or(ModemError::MissingDelimiter)?;
    Ok(&response[marker_end + delimiter + CRLF.len()..])
}

fn expect_ok(response: &[u8]) -> Result<(), ModemError> {
    if is_ok_response(response) {
        Ok(())
    } else {
        warn!("unexpected modem response: {}", Hex(response));
        Err(ModemError::UnexpectedResponse)
    }
}

/// Drives the modem over one borrowed [`Transport`]
pub struct ModemProtocol<'t, L> {
    transport: &'t mut Transport<L>,
    config: TransportConfig,
    state: ModemState,
}

impl<'t, L: SerialLine> ModemProtocol<'t, L> {
    /// Uses [`TransportConfig::modem`] when init has to configure the line
    pub fn new(transport: &'t mut Transport<L>) -> Self {
        Self::with_config(transport, TransportConfig::modem())
    }

    pub fn with_config(transport: &'t mut Transport<L>, config: TransportConfig) -> Self {
        ModemProtocol {
            transport,
            config,
            state: ModemState::Uninitialized,
        }
    }

    pub fn state(&self) -> ModemState {
        self.state
    }

    pub fn transport(&self) -> &Transport<L> {
        &*self.transport
    }

    /// Configures the line if nobody did yet and checks the modem answers `AT` with `OK`.
    ///
    /// The state becomes [`ModemState::Ready`] on success and [`ModemState::Faulted`] otherwise.
    pub fn init(&mut self) -> Result<(), ModemError> {
        let result = self.probe();
        let state = match result {
            Ok(()) => ModemState::Ready,
            Err(_) => ModemState::Faulted,
        };
        if state != self.state {
            debug!("modem state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
        result
    }

    fn probe(&mut self) -> Result<(), ModemError> {
        if !self.transport.is_configured() {
            self.transport.configure(&self.config)?;
        }
        self.send(INIT_COMMAND.as_bytes())?;

        let mut buf = [0u8; INIT_RESPONSE_CAPACITY];
        let response = self.transport.read(&mut buf, MODEM_TIMEOUT)?;
        expect_ok(response)
    }

    /// Sends `data` as one `AT+CIPSEND` frame
    ///
    /// The modem state is not checked here, a modem which is not ready simply fails the
    /// response check.
    pub fn transmit(&mut self, data: &[u8]) -> Result<(), ModemError> {
        if self.state != ModemState::Ready {
            debug!("transmitting while modem is {:?}", self.state);
        }
        let command = send_command(data.len())?;
        self.send(command.as_bytes())?;
        self.send(data)?;

        let mut buf = [0u8; TRANSMIT_RESPONSE_CAPACITY];
        let response = self.transport.read(&mut buf, MODEM_TIMEOUT)?;
        expect_ok(response)
    }

    /// Requests up to `out.len()` bytes from the modem and copies the payload into `out`
    ///
    /// Returns the number of bytes copied, which is never more than `out.len()`.
    pub fn receive(&mut self, out: &mut [u8]) -> Result<usize, ModemError> {
        if self.state != ModemState::Ready {
            debug!("receiving while modem is {:?}", self.state);
        }
        let command = receive_command(out.len())?;
        self.send(command.as_bytes())?;

        let mut buf = [0u8; RECEIVE_RESPONSE_CAPACITY];
        let response = self.transport.read(&mut buf, MODEM_TIMEOUT)?;
        let payload = receive_payload(response).map_err(|e| {
            warn!("malformed receive response: {}", Hex(response));
            e
        })?;

        let len = payload.len().min(out.len());
        out[..len].copy_from_slice(&payload[..len]);
        Ok(len)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), ModemError> {
        self.transport.write(bytes)?;
        self.transport.wait_write_complete(MODEM_TIMEOUT);
        Ok(())
    }
}
