//! RAS service: validated transmit/receive on top of [`ModemProtocol`]
//!
//! Each call yields a [`Status`]. Failures are logged and reported, never retried.
#[cfg(feature = "std")]
use core::fmt;

use crate::modem::{ModemError, ModemProtocol};
use crate::scoring::{NoScoring, ScoringBackend, SimulationProfile, DEFAULT_QUALITY_THRESHOLD};
use crate::transport::{SerialLine, Transport};
use crate::MAX_DATA_SIZE;

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
#[repr(u8)]
pub enum Status {
    Success = 0,
    InvalidParameter = 1,
    TransmissionFailed = 2,
    ReceptionFailed = 3,
    SimulationFailed = 4,
}

impl Status {
    /// Diagnostic message written by [`handle_error`]
    pub const fn message(self) -> &'static str {
        match self {
            Status::Success => "Success.",
            Status::InvalidParameter => "Invalid parameter.",
            Status::TransmissionFailed => "Data transmission failed.",
            Status::ReceptionFailed => "Data reception failed.",
            Status::SimulationFailed => "Simulation failed.",
        }
    }

    pub fn of<T>(result: &Result<T, RasError>) -> Status {
        match result {
            Ok(_) => Status::Success,
            Err(e) => e.status(),
        }
    }
}

impl TryFrom<u8> for Status {
    type Error = &'static str;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Status::Success),
            1 => Ok(Status::InvalidParameter),
            2 => Ok(Status::TransmissionFailed),
            3 => Ok(Status::ReceptionFailed),
            4 => Ok(Status::SimulationFailed),
            _ => Err("Unknown Status"),
        }
    }
}

#[cfg(feature = "std")]
impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub enum RasError {
    /// Size zero, above [`MAX_DATA_SIZE`], or larger than the caller's buffer
    InvalidParameter,
    TransmissionFailed(ModemError),
    ReceptionFailed(ModemError),
    /// The scoring backend reported a failure
    SimulationFailed,
}

impl RasError {
    pub const fn status(&self) -> Status {
        match self {
            RasError::InvalidParameter => Status::InvalidParameter,
            RasError::TransmissionFailed(_) => Status::TransmissionFailed,
            RasError::ReceptionFailed(_) => Status::ReceptionFailed,
            RasError::SimulationFailed => Status::SimulationFailed,
        }
    }
}

impl From<RasError> for Status {
    fn from(e: RasError) -> Status {
        e.status()
    }
}

#[cfg(feature = "std")]
impl fmt::Display for RasError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RasError::TransmissionFailed(e) | RasError::ReceptionFailed(e) => {
                write!(f, "{} ({})", self.status(), e)
            }
            _ => write!(f, "{}", self.status()),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RasError {}

/// Outcome of a successful [`RasService::transmit_data`]
#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(feature = "std", derive(Debug))]
pub struct Transmitted {
    pub size: usize,
    /// Bit error rate from the scoring backend, if one is wired in
    pub score: Option<f64>,
}

impl Transmitted {
    /// Whether the score exceeded the quality threshold; still a success
    pub fn is_degraded(&self, threshold: f64) -> bool {
        self.score.map_or(false, |score| score > threshold)
    }
}

/// Writes the diagnostic message for `status`, nothing for [`Status::Success`]
pub fn handle_error(status: Status) {
    if status != Status::Success {
        error!("RAS Error: {}", status.message());
    }
}

fn check_size(size: usize) -> Result<(), RasError> {
    if size == 0 || size > MAX_DATA_SIZE {
        return Err(RasError::InvalidParameter);
    }
    Ok(())
}

pub struct RasService<'t, L, S = NoScoring> {
    modem: ModemProtocol<'t, L>,
    scoring: Option<S>,
    profile: SimulationProfile,
    quality_threshold: f64,
}

impl<'t, L: SerialLine> RasService<'t, L, NoScoring> {
    pub fn new(transport: &'t mut Transport<L>) -> Self {
        Self::from_modem(ModemProtocol::new(transport))
    }

    pub fn from_modem(modem: ModemProtocol<'t, L>) -> Self {
        RasService {
            modem,
            scoring: None,
            profile: SimulationProfile::default(),
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
        }
    }
}

impl<'t, L: SerialLine, S: ScoringBackend> RasService<'t, L, S> {
    /// Scores every successful transmission with `backend`
    pub fn with_scoring<B: ScoringBackend>(self, backend: B) -> RasService<'t, L, B> {
        RasService {
            modem: self.modem,
            scoring: Some(backend),
            profile: self.profile,
            quality_threshold: self.quality_threshold,
        }
    }

    pub fn with_profile(mut self, profile: SimulationProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_quality_threshold(mut self, threshold: f64) -> Self {
        self.quality_threshold = threshold;
        self
    }

    pub fn modem(&self) -> &ModemProtocol<'t, L> {
        &self.modem
    }

    pub fn quality_threshold(&self) -> f64 {
        self.quality_threshold
    }

    /// Brings the modem up; a failure is logged and later calls keep reporting failures
    pub fn init(&mut self) {
        match self.modem.init() {
            Ok(()) => info!("RAS layer initialized."),
            Err(e) => error!("Modem initialization failed. Cause: {:?}", e),
        }
    }

    pub fn transmit_data(&mut self, data: &[u8]) -> Result<Transmitted, RasError> {
        check_size(data.len())?;
        self.modem
            .transmit(data)
            .map_err(RasError::TransmissionFailed)?;

        let score = match self.scoring.as_mut() {
            Some(backend) => Some(rate_transmission(
                backend,
                &self.profile,
                self.quality_threshold,
            )?),
            None => None,
        };
        Ok(Transmitted {
            size: data.len(),
            score,
        })
    }

    /// Receives up to `size` bytes into the front of `buffer`
    ///
    /// Returns the number of bytes received, never more than `size`.
    pub fn receive_data(&mut self, buffer: &mut [u8], size: usize) -> Result<usize, RasError> {
        check_size(size)?;
        let out = buffer.get_mut(..size).ok_or(RasError::InvalidParameter)?;
        self.modem.receive(out).map_err(RasError::ReceptionFailed)
    }

    pub fn handle_error(&self, status: Status) {
        handle_error(status)
    }
}

fn rate_transmission<S: ScoringBackend>(
    backend: &mut S,
    profile: &SimulationProfile,
    threshold: f64,
) -> Result<f64, RasError> {
    let score = backend.score(profile);
    if score.is_nan() || score < 0.0 {
        error!("{} simulation failed", profile.model.as_str());
        return Err(RasError::SimulationFailed);
    }
    if score > threshold {
        warn!(
            "bit error rate {} exceeds quality threshold {}",
            score, threshold
        );
    } else {
        debug!("bit error rate {}", score);
    }
    Ok(score)
}
