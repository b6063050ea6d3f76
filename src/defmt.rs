use defmt::Formatter;

use crate::modem::{ModemError, ModemState};
use crate::ras::{RasError, Status};
use crate::transport::{TransportError, UartNum};

impl defmt::Format for UartNum {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(fmt, "UART{=usize}", self.index())
    }
}

impl defmt::Format for TransportError {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            TransportError::Unavailable => defmt::write!(fmt, "Unavailable"),
            TransportError::NotConfigured => defmt::write!(fmt, "NotConfigured"),
            TransportError::AlreadyConfigured => defmt::write!(fmt, "AlreadyConfigured"),
            TransportError::Configure => defmt::write!(fmt, "Configure"),
            TransportError::InvalidTimeout => defmt::write!(fmt, "InvalidTimeout"),
            TransportError::TimedOut => defmt::write!(fmt, "TimedOut"),
            TransportError::ShortWrite { written, expected } => {
                defmt::write!(fmt, "ShortWrite({=usize}/{=usize})", written, expected)
            }
            TransportError::Write => defmt::write!(fmt, "Write"),
            TransportError::Read => defmt::write!(fmt, "Read"),
        }
    }
}

impl defmt::Format for ModemState {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            ModemState::Uninitialized => defmt::write!(fmt, "Uninitialized"),
            ModemState::Ready => defmt::write!(fmt, "Ready"),
            ModemState::Faulted => defmt::write!(fmt, "Faulted"),
        }
    }
}

impl defmt::Format for ModemError {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            ModemError::Transport(e) => defmt::write!(fmt, "Transport({})", e),
            ModemError::CommandTooLong => defmt::write!(fmt, "CommandTooLong"),
            ModemError::UnexpectedResponse => defmt::write!(fmt, "UnexpectedResponse"),
            ModemError::MissingMarker => defmt::write!(fmt, "MissingMarker"),
            ModemError::MissingDelimiter => defmt::write!(fmt, "MissingDelimiter"),
        }
    }
}

impl defmt::Format for Status {
    fn format(&self, fmt: Formatter<'_>) {
        defmt::write!(fmt, "{=str}", self.message())
    }
}

impl defmt::Format for RasError {
    fn format(&self, fmt: Formatter<'_>) {
        match self {
            RasError::TransmissionFailed(e) | RasError::ReceptionFailed(e) => {
                defmt::write!(fmt, "{} ({})", self.status(), e)
            }
            _ => defmt::write!(fmt, "{}", self.status()),
        }
    }
}
