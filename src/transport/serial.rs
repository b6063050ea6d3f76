//! [`SerialLine`] over the `serialport` crate
use std::io::{self, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, SerialPort};

use super::{
    FlowControl, LineSettings, Parity, SerialLine, StopBits, Transport, TransportError,
    UartContext, UartNum, WordLength, INTER_BYTE_TIMEOUT,
};

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, thiserror::Error)]
pub enum SerialLineError {
    #[error("Serialport error: {0}")]
    Port(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub struct SerialPortLine {
    port: Box<dyn SerialPort>,
}

impl SerialPortLine {
    /// Opens `path` at the default rate, [`SerialLine::apply`] sets the real parameters
    pub fn open(path: &str) -> Result<Self, SerialLineError> {
        let port = serialport::new(path, super::BaudRate::default().as_u32())
            .timeout(INTER_BYTE_TIMEOUT)
            .open()?;
        Ok(Self::from_port(port))
    }

    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        SerialPortLine { port }
    }

    fn apply_settings(&mut self, settings: &LineSettings) -> Result<(), SerialLineError> {
        self.port.set_baud_rate(settings.baud_rate.as_u32())?;
        self.port.set_data_bits(settings.word_length.into())?;
        self.port.set_parity(settings.parity.into())?;
        self.port.set_stop_bits(settings.stop_bits.into())?;
        self.port.set_flow_control(settings.flow_control.into())?;
        self.port.set_timeout(settings.read_timeout)?;
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

impl SerialLine for SerialPortLine {
    fn apply(&mut self, settings: &LineSettings) -> Result<(), TransportError> {
        self.apply_settings(settings).map_err(|e| {
            error!("could not configure serial line: {}", e);
            TransportError::Configure
        })
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        match self.port.write_all(bytes) {
            Ok(()) => Ok(bytes.len()),
            Err(e) => {
                warn!("serial write failed: {}", e);
                Err(TransportError::Write)
            }
        }
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError> {
        self.port
            .set_timeout(timeout)
            .map_err(|_| TransportError::Read)?;
        match self.port.read(buf) {
            Ok(0) => Err(TransportError::TimedOut),
            Ok(len) => Ok(len),
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Err(TransportError::TimedOut),
            Err(e) => {
                warn!("serial read failed: {}", e);
                Err(TransportError::Read)
            }
        }
    }

    fn wait_drained(&mut self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            match self.port.bytes_to_write() {
                Ok(0) => return,
                Ok(_) => thread::sleep(DRAIN_POLL_INTERVAL),
                Err(e) => {
                    // output queue not observable, fall back to waiting the whole window
                    debug!("cannot query output queue: {}", e);
                    thread::sleep(deadline.saturating_duration_since(Instant::now()));
                    return;
                }
            }
        }
    }
}

impl UartContext<SerialPortLine> {
    /// Opens the serial device at `path` for `uart`
    pub fn open_path(&mut self, uart: UartNum, path: &str) -> &mut Transport<SerialPortLine> {
        self.open(uart, |uart| {
            SerialPortLine::open(path).map_err(|e| {
                error!("UART{}: failed to open \"{}\": {}", uart.index(), path, e);
                e
            })
        })
    }
}

impl From<WordLength> for serialport::DataBits {
    fn from(word_length: WordLength) -> Self {
        match word_length {
            WordLength::Five => serialport::DataBits::Five,
            WordLength::Six => serialport::DataBits::Six,
            WordLength::Seven => serialport::DataBits::Seven,
            WordLength::Eight => serialport::DataBits::Eight,
        }
    }
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
        }
    }
}

impl From<StopBits> for serialport::StopBits {
    fn from(stop_bits: StopBits) -> Self {
        match stop_bits {
            StopBits::Two => serialport::StopBits::Two,
            StopBits::One | StopBits::OnePointFive => serialport::StopBits::One,
        }
    }
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow_control: FlowControl) -> Self {
        match flow_control {
            FlowControl::RtsCts => serialport::FlowControl::Hardware,
            FlowControl::None | FlowControl::Rts | FlowControl::Cts => {
                serialport::FlowControl::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportConfig;

    #[test]
    fn test_folded_settings_map_to_serialport() {
        let settings = TransportConfig {
            baud_rate: 4_800,
            stop_bits: StopBits::OnePointFive,
            flow_control: FlowControl::Cts,
            ..TransportConfig::modem()
        }
        .settings();

        assert_eq!(settings.baud_rate.as_u32(), 9_600);
        assert_eq!(
            serialport::StopBits::from(settings.stop_bits),
            serialport::StopBits::One
        );
        assert_eq!(
            serialport::FlowControl::from(settings.flow_control),
            serialport::FlowControl::None
        );
        assert_eq!(
            serialport::DataBits::from(settings.word_length),
            serialport::DataBits::Eight
        );
        assert_eq!(
            serialport::FlowControl::from(FlowControl::RtsCts),
            serialport::FlowControl::Hardware
        );
    }

    #[test]
    fn test_open_missing_device_gives_unavailable_handle() {
        let mut context = UartContext::new();
        let port = context.open_path(UartNum::Uart1, "/dev/ras-serial-does-not-exist");
        assert!(!port.is_open());
    }

    #[cfg(unix)]
    mod pty {
        use super::*;
        use crate::modem::{ModemError, ModemProtocol, ModemState, MODEM_TIMEOUT};
        use crate::transport::BaudRate;
        use serialport::TTYPort;

        /// Reads one CRLF terminated command from the modem side of the pair
        fn read_command(peer: &mut TTYPort) -> Vec<u8> {
            let mut command = Vec::new();
            let mut byte = [0u8; 1];
            while !command.ends_with(b"\r\n") {
                peer.read_exact(&mut byte).unwrap();
                command.push(byte[0]);
            }
            command
        }

        #[test]
        fn test_modem_exchange_over_pty() {
            let (line, mut peer) = TTYPort::pair().unwrap();
            peer.set_timeout(Duration::from_secs(5)).unwrap();

            let modem_side = thread::spawn(move || {
                let mut commands = Vec::new();
                commands.push(read_command(&mut peer));
                peer.write_all(b"\r\nOK\r\n").unwrap();
                commands.push(read_command(&mut peer));
                peer.write_all(b"\r\n+CIPRXGET: 2,5,0\r\n\x01\x02\x03\x04\x05")
                    .unwrap();
                // read the last request but never answer it
                commands.push(read_command(&mut peer));
                (peer, commands)
            });

            let mut transport = Transport::new(
                UartNum::Uart1,
                SerialPortLine::from_port(Box::new(line)),
            );
            {
                let mut modem = ModemProtocol::new(&mut transport);
                assert_eq!(modem.init(), Ok(()));
                assert_eq!(modem.state(), ModemState::Ready);

                let mut out = [0u8; 16];
                assert_eq!(modem.receive(&mut out), Ok(5));
                assert_eq!(&out[..5], &[0x01, 0x02, 0x03, 0x04, 0x05]);
                assert!(out[5..].iter().all(|b| *b == 0));

                let started = Instant::now();
                assert_eq!(
                    modem.receive(&mut out),
                    Err(ModemError::Transport(TransportError::TimedOut))
                );
                let elapsed = started.elapsed();
                assert!(elapsed >= MODEM_TIMEOUT - Duration::from_millis(50));
                assert!(elapsed < MODEM_TIMEOUT * 3);
            }

            let (_peer, commands) = modem_side.join().unwrap();
            assert_eq!(
                commands,
                vec![
                    b"AT\r\n".to_vec(),
                    b"AT+CIPRXGET=2,16\r\n".to_vec(),
                    b"AT+CIPRXGET=2,16\r\n".to_vec(),
                ]
            );
            assert_eq!(
                transport.settings().unwrap().baud_rate,
                BaudRate::B115200
            );
        }

        #[test]
        fn test_drain_wait_is_bounded() {
            let (line, _peer) = TTYPort::pair().unwrap();
            let mut line = SerialPortLine::from_port(Box::new(line));
            line.apply(&TransportConfig::modem().settings()).unwrap();
            assert_eq!(line.write(b"AT\r\n"), Ok(4));

            let timeout = Duration::from_millis(200);
            let started = Instant::now();
            line.wait_drained(timeout);
            assert!(started.elapsed() < timeout + Duration::from_millis(100));
        }
    }
}
