//! Serial transport beneath the modem protocol
//!
//! A [`Transport`] owns one serial line (the "handle" of one logical UART). Lines are opened
//! once and then configured exactly once with a [`TransportConfig`] before any byte is written
//! or read. Unsupported configuration values are never an error, they fold to the nearest
//! supported setting (see [`TransportConfig::settings`]).
//!
//! A transport whose line could not be opened stays usable: every operation on it reports
//! [`TransportError::Unavailable`] (or does nothing, for [`Transport::wait_write_complete`]).
//!
//! The actual byte pushing is delegated to a [`SerialLine`] backend, on hosts
//! [`serial::SerialPortLine`].
#[cfg(feature = "std")]
use core::fmt;
use core::time::Duration;

use crate::fmt::Hex;

#[cfg(feature = "std")]
pub mod serial;

/// Number of logical UARTs a [`UartContext`] can hold
pub const UART_COUNT: usize = 2;

/// Read window applied to a freshly configured line: a read returns as soon as one byte is
/// available or after this window elapses
pub const INTER_BYTE_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum UartNum {
    Uart0 = 0,
    Uart1 = 1,
}

impl UartNum {
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Baud rates a line can actually run at
#[derive(Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum BaudRate {
    #[default]
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    pub const fn as_u32(self) -> u32 {
        match self {
            BaudRate::B9600 => 9_600,
            BaudRate::B19200 => 19_200,
            BaudRate::B38400 => 38_400,
            BaudRate::B57600 => 57_600,
            BaudRate::B115200 => 115_200,
        }
    }

    /// Any rate outside of the supported set folds to 9600
    pub const fn fold(rate: u32) -> Self {
        match rate {
            19_200 => BaudRate::B19200,
            38_400 => BaudRate::B38400,
            57_600 => BaudRate::B57600,
            115_200 => BaudRate::B115200,
            _ => BaudRate::B9600,
        }
    }
}

impl From<BaudRate> for u32 {
    fn from(rate: BaudRate) -> u32 {
        rate.as_u32()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u8", into = "u8")
)]
pub enum WordLength {
    Five,
    Six,
    Seven,
    Eight,
}

impl WordLength {
    pub const fn bits(self) -> u8 {
        match self {
            WordLength::Five => 5,
            WordLength::Six => 6,
            WordLength::Seven => 7,
            WordLength::Eight => 8,
        }
    }
}

impl TryFrom<u8> for WordLength {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            5 => Ok(WordLength::Five),
            6 => Ok(WordLength::Six),
            7 => Ok(WordLength::Seven),
            8 => Ok(WordLength::Eight),
            _ => Err("word length must be 5 to 8 bits"),
        }
    }
}

impl From<WordLength> for u8 {
    fn from(word_length: WordLength) -> u8 {
        word_length.bits()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Parity {
    None,
    Even,
    Odd,
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StopBits {
    One,
    /// Not representable on the line, folds to [`StopBits::One`]
    OnePointFive,
    Two,
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FlowControl {
    None,
    /// RTS only, folds to [`FlowControl::None`]
    Rts,
    /// CTS only, folds to [`FlowControl::None`]
    Cts,
    RtsCts,
}

/// Requested line configuration, as supplied by the caller
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TransportConfig {
    pub baud_rate: u32,
    pub word_length: WordLength,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl TransportConfig {
    /// 115200 8N1 without flow control, what the modem expects
    pub const fn modem() -> Self {
        TransportConfig {
            baud_rate: 115_200,
            word_length: WordLength::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }

    /// Folds the requested values into settings the line supports
    pub fn settings(&self) -> LineSettings {
        let baud_rate = BaudRate::fold(self.baud_rate);
        if baud_rate.as_u32() != self.baud_rate {
            debug!(
                "baud rate {} not supported, falling back to {}",
                self.baud_rate,
                baud_rate.as_u32()
            );
        }

        let stop_bits = match self.stop_bits {
            StopBits::OnePointFive => {
                debug!("1.5 stop bits not supported, falling back to 1");
                StopBits::One
            }
            other => other,
        };

        let flow_control = match self.flow_control {
            FlowControl::Rts | FlowControl::Cts => {
                debug!("partial hardware flow control not supported, disabling it");
                FlowControl::None
            }
            other => other,
        };

        LineSettings {
            baud_rate,
            word_length: self.word_length,
            parity: self.parity,
            stop_bits,
            flow_control,
            read_timeout: INTER_BYTE_TIMEOUT,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            baud_rate: BaudRate::default().as_u32(),
            ..TransportConfig::modem()
        }
    }
}

/// Effective line settings after folding
///
/// `stop_bits` is never [`StopBits::OnePointFive`] and `flow_control` is either
/// [`FlowControl::None`] or [`FlowControl::RtsCts`]. Lines run raw (non-canonical), parity
/// errors are ignored.
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct LineSettings {
    pub baud_rate: BaudRate,
    pub word_length: WordLength,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    pub read_timeout: Duration,
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum TransportError {
    /// The line was never opened, or has been closed
    Unavailable,
    NotConfigured,
    AlreadyConfigured,
    /// The backend refused the settings
    Configure,
    /// Zero length read deadlines are not allowed
    InvalidTimeout,
    TimedOut,
    ShortWrite { written: usize, expected: usize },
    Write,
    Read,
}

#[cfg(feature = "std")]
impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TransportError::Unavailable => write!(f, "serial line is not available"),
            TransportError::NotConfigured => write!(f, "serial line used before configuration"),
            TransportError::AlreadyConfigured => write!(f, "serial line is already configured"),
            TransportError::Configure => write!(f, "serial line rejected the configuration"),
            TransportError::InvalidTimeout => write!(f, "read timeout must not be zero"),
            TransportError::TimedOut => write!(f, "no data received before the deadline"),
            TransportError::ShortWrite { written, expected } => {
                write!(f, "short write: {} of {} bytes", written, expected)
            }
            TransportError::Write => write!(f, "writing to the serial line failed"),
            TransportError::Read => write!(f, "reading from the serial line failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TransportError {}

/// Backend moving bytes over a physical (or simulated) serial line
pub trait SerialLine {
    /// Applies the settings and discards any pending input
    fn apply(&mut self, settings: &LineSettings) -> Result<(), TransportError>;

    /// Blocking write, returns number of bytes accepted by the line
    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError>;

    /// Waits at most `timeout` for data and returns as soon as some arrived.
    ///
    /// Returns the number of bytes actually stored in `buf`, never zero; no data means
    /// [`TransportError::TimedOut`].
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError>;

    /// Waits at most `timeout` for the transmit path to drain
    fn wait_drained(&mut self, timeout: Duration);
}

/// One serial line handle bound to a logical UART
pub struct Transport<L> {
    uart: UartNum,
    line: Option<L>,
    settings: Option<LineSettings>,
}

impl<L> Transport<L> {
    /// Handle for a line which could not be opened
    pub const fn unavailable(uart: UartNum) -> Self {
        Transport {
            uart,
            line: None,
            settings: None,
        }
    }

    pub fn new(uart: UartNum, line: L) -> Self {
        Transport {
            uart,
            line: Some(line),
            settings: None,
        }
    }

    pub fn uart(&self) -> UartNum {
        self.uart
    }

    pub fn is_open(&self) -> bool {
        self.line.is_some()
    }

    pub fn is_configured(&self) -> bool {
        self.settings.is_some()
    }

    /// Settings applied by [`Transport::configure`], if any
    pub fn settings(&self) -> Option<&LineSettings> {
        self.settings.as_ref()
    }

    pub fn line(&self) -> Option<&L> {
        self.line.as_ref()
    }

    /// Releases the line, the handle becomes unavailable
    pub fn close(&mut self) -> Option<L> {
        self.settings = None;
        let line = self.line.take();
        if line.is_some() {
            debug!("UART{} closed", self.uart.index());
        }
        line
    }
}

impl<L: SerialLine> Transport<L> {
    /// Applies `config`, only once per opened line
    pub fn configure(&mut self, config: &TransportConfig) -> Result<LineSettings, TransportError> {
        if self.settings.is_some() {
            return Err(TransportError::AlreadyConfigured);
        }
        let line = self.line.as_mut().ok_or(TransportError::Unavailable)?;
        let settings = config.settings();
        line.apply(&settings)?;
        debug!(
            "UART{} configured: {} baud, {} data bits",
            self.uart.index(),
            settings.baud_rate.as_u32(),
            settings.word_length.bits()
        );
        self.settings = Some(settings);
        Ok(settings)
    }

    fn configured_line(&mut self) -> Result<&mut L, TransportError> {
        let line = self.line.as_mut().ok_or(TransportError::Unavailable)?;
        if self.settings.is_none() {
            return Err(TransportError::NotConfigured);
        }
        Ok(line)
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let uart = self.uart.index();
        let line = self.configured_line()?;
        trace!("UART{} TX {}", uart, Hex(bytes));
        let written = line.write(bytes)?;
        if written < bytes.len() {
            warn!("UART{} short write: {} of {} bytes", uart, written, bytes.len());
            return Err(TransportError::ShortWrite {
                written,
                expected: bytes.len(),
            });
        }
        Ok(())
    }

    /// Reads whatever arrives before `timeout` into `buf`
    ///
    /// The returned slice is exactly the received bytes; the rest of `buf` is untouched and
    /// must never be parsed.
    pub fn read<'b>(
        &mut self,
        buf: &'b mut [u8],
        timeout: Duration,
    ) -> Result<&'b [u8], TransportError> {
        if timeout.is_zero() {
            return Err(TransportError::InvalidTimeout);
        }
        let uart = self.uart.index();
        let line = self.configured_line()?;
        match line.read(buf, timeout) {
            Ok(len) => {
                let received = &buf[..len.min(buf.len())];
                trace!("UART{} RX {}", uart, Hex(received));
                Ok(received)
            }
            Err(e) => {
                debug!("UART{} read failed: {:?}", uart, e);
                Err(e)
            }
        }
    }

    /// Waits for the transmit path to drain; does nothing on a line which is not configured
    pub fn wait_write_complete(&mut self, timeout: Duration) {
        if let Ok(line) = self.configured_line() {
            line.wait_drained(timeout);
        }
    }
}

/// Table of serial line handles, one slot per logical UART
pub struct UartContext<L> {
    ports: [Transport<L>; UART_COUNT],
}

impl<L> UartContext<L> {
    pub fn new() -> Self {
        UartContext {
            ports: [
                Transport::unavailable(UartNum::Uart0),
                Transport::unavailable(UartNum::Uart1),
            ],
        }
    }

    /// Opens the line of `uart` using `opener`
    ///
    /// When the opener fails the slot holds an unavailable handle, which is returned as well.
    pub fn open<E, F>(&mut self, uart: UartNum, opener: F) -> &mut Transport<L>
    where
        F: FnOnce(UartNum) -> Result<L, E>,
    {
        let port = &mut self.ports[uart.index()];
        *port = match opener(uart) {
            Ok(line) => Transport::new(uart, line),
            Err(_) => {
                error!("UART{} could not be opened", uart.index());
                Transport::unavailable(uart)
            }
        };
        port
    }

    pub fn port(&self, uart: UartNum) -> &Transport<L> {
        &self.ports[uart.index()]
    }

    pub fn port_mut(&mut self, uart: UartNum) -> &mut Transport<L> {
        &mut self.ports[uart.index()]
    }
}

impl<L> Default for UartContext<L> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockLine};

    fn configured(line: MockLine) -> Transport<MockLine> {
        let mut transport = Transport::new(UartNum::Uart1, line);
        transport.configure(&TransportConfig::modem()).unwrap();
        transport
    }

    #[test]
    fn test_supported_baud_rates_are_kept() {
        for rate in [9_600, 19_200, 38_400, 57_600, 115_200] {
            assert_eq!(BaudRate::fold(rate).as_u32(), rate);
        }
    }

    #[test]
    fn test_unsupported_baud_rate_folds_to_9600() {
        let config = TransportConfig {
            baud_rate: 4_800,
            ..TransportConfig::modem()
        };
        let mut transport = Transport::new(UartNum::Uart0, MockLine::new());
        let settings = transport.configure(&config).unwrap();

        assert_eq!(settings.baud_rate, BaudRate::B9600);
        assert_eq!(
            transport.line().unwrap().calls(),
            &[Call::Apply(settings)][..]
        );
    }

    #[test]
    fn test_stop_bits_and_flow_control_folding() {
        let config = TransportConfig {
            stop_bits: StopBits::OnePointFive,
            flow_control: FlowControl::Rts,
            ..TransportConfig::default()
        };
        let settings = config.settings();
        assert_eq!(settings.stop_bits, StopBits::One);
        assert_eq!(settings.flow_control, FlowControl::None);

        let config = TransportConfig {
            stop_bits: StopBits::Two,
            flow_control: FlowControl::Cts,
            ..TransportConfig::default()
        };
        let settings = config.settings();
        assert_eq!(settings.stop_bits, StopBits::Two);
        assert_eq!(settings.flow_control, FlowControl::None);

        let config = TransportConfig {
            flow_control: FlowControl::RtsCts,
            ..TransportConfig::default()
        };
        assert_eq!(config.settings().flow_control, FlowControl::RtsCts);
    }

    #[test]
    fn test_word_length_from_bits() {
        assert_eq!(WordLength::try_from(7), Ok(WordLength::Seven));
        assert!(WordLength::try_from(9).is_err());
        assert!(WordLength::try_from(4).is_err());
    }

    #[test]
    fn test_configure_only_once() {
        let mut transport = configured(MockLine::new());
        assert_eq!(
            transport.configure(&TransportConfig::default()),
            Err(TransportError::AlreadyConfigured)
        );
        assert_eq!(transport.settings().unwrap().baud_rate, BaudRate::B115200);
    }

    #[test]
    fn test_use_before_configure_is_rejected() {
        let mut transport = Transport::new(UartNum::Uart1, MockLine::new());
        let mut buf = [0u8; 8];
        assert_eq!(transport.write(b"AT\r\n"), Err(TransportError::NotConfigured));
        assert_eq!(
            transport.read(&mut buf, INTER_BYTE_TIMEOUT),
            Err(TransportError::NotConfigured)
        );
        transport.wait_write_complete(INTER_BYTE_TIMEOUT);
        assert!(transport.line().unwrap().calls().is_empty());

        transport.configure(&TransportConfig::modem()).unwrap();
        transport.wait_write_complete(INTER_BYTE_TIMEOUT);
        assert_eq!(
            transport.line().unwrap().calls().last(),
            Some(&Call::WaitDrained(INTER_BYTE_TIMEOUT))
        );
    }

    #[test]
    fn test_default_baud_rate() {
        assert_eq!(BaudRate::default(), BaudRate::B9600);
        assert_eq!(TransportConfig::default().settings().baud_rate, BaudRate::B9600);
    }

    #[test]
    fn test_unavailable_handle_never_panics() {
        let mut transport = Transport::<MockLine>::unavailable(UartNum::Uart0);
        let mut buf = [0u8; 8];
        assert!(!transport.is_open());
        assert_eq!(
            transport.configure(&TransportConfig::modem()),
            Err(TransportError::Unavailable)
        );
        assert_eq!(transport.write(b"AT\r\n"), Err(TransportError::Unavailable));
        assert_eq!(
            transport.read(&mut buf, INTER_BYTE_TIMEOUT),
            Err(TransportError::Unavailable)
        );
        transport.wait_write_complete(INTER_BYTE_TIMEOUT);
    }

    #[test]
    fn test_read_returns_only_received_bytes() {
        let mut transport = configured(MockLine::new().respond(b"OK\r\n"));
        let mut buf = [0xaa; 64];
        let received = transport.read(&mut buf, INTER_BYTE_TIMEOUT).unwrap();
        assert_eq!(received, b"OK\r\n");
    }

    #[test]
    fn test_read_rejects_zero_timeout() {
        let mut transport = configured(MockLine::new().respond(b"OK"));
        let mut buf = [0u8; 8];
        assert_eq!(
            transport.read(&mut buf, Duration::ZERO),
            Err(TransportError::InvalidTimeout)
        );
    }

    #[test]
    fn test_read_times_out_without_data() {
        let mut transport = configured(MockLine::new());
        let mut buf = [0u8; 8];
        assert_eq!(
            transport.read(&mut buf, INTER_BYTE_TIMEOUT),
            Err(TransportError::TimedOut)
        );
    }

    #[test]
    fn test_short_write_is_surfaced() {
        let mut transport = configured(MockLine::new().accept_at_most(2));
        assert_eq!(
            transport.write(b"AT\r\n"),
            Err(TransportError::ShortWrite {
                written: 2,
                expected: 4
            })
        );
    }

    #[test]
    fn test_close_makes_handle_unavailable() {
        let mut transport = configured(MockLine::new());
        assert!(transport.close().is_some());
        assert!(!transport.is_open());
        assert!(!transport.is_configured());
        assert_eq!(transport.write(b"AT\r\n"), Err(TransportError::Unavailable));
    }

    #[test]
    fn test_context_open_failure_yields_unavailable_handle() {
        let mut context = UartContext::<MockLine>::new();
        let port = context.open(UartNum::Uart1, |_| Err::<MockLine, _>("busy"));
        assert!(!port.is_open());
        assert_eq!(port.uart(), UartNum::Uart1);

        let port = context.open(UartNum::Uart0, |_| Ok::<_, ()>(MockLine::new()));
        assert!(port.is_open());
        assert!(context.port(UartNum::Uart0).is_open());
        assert!(!context.port(UartNum::Uart1).is_open());
    }
}
