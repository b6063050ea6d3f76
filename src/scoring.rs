//! Link quality scoring run after a successful transmission
//!
//! The scoring itself (an OFDM/MIMO bit error rate simulation) lives outside of this crate. Host
//! applications wire one in through [`ScoringBackend`]; until they do, no scoring happens.

/// Score returned by a backend which failed to produce a result
pub const SCORE_FAILED: f64 = -1.0;

/// Bit error rate above which a transmission is reported as degraded
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 0.1;

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ModelKind {
    Ras,
    Mimo,
}

impl ModelKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ModelKind::Ras => "ras",
            ModelKind::Mimo => "mimo",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ChannelModel {
    Rayleigh,
    Rician,
}

impl ChannelModel {
    pub const fn as_str(self) -> &'static str {
        match self {
            ChannelModel::Rayleigh => "rayleigh",
            ChannelModel::Rician => "rician",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Modulation {
    #[cfg_attr(feature = "serde", serde(rename = "qpsk"))]
    Qpsk,
    #[cfg_attr(feature = "serde", serde(rename = "16qam"))]
    Qam16,
    #[cfg_attr(feature = "serde", serde(rename = "64qam"))]
    Qam64,
}

impl Modulation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Modulation::Qpsk => "qpsk",
            Modulation::Qam16 => "16qam",
            Modulation::Qam64 => "64qam",
        }
    }
}

/// Parameters handed to the scoring backend
#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(Debug))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationProfile {
    pub subcarrier_count: u32,
    pub symbol_count: u32,
    pub antenna_count: u32,
    pub model: ModelKind,
    pub channel: ChannelModel,
    pub modulation: Modulation,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        SimulationProfile {
            subcarrier_count: 64,
            symbol_count: 100,
            antenna_count: 4,
            model: ModelKind::Ras,
            channel: ChannelModel::Rayleigh,
            modulation: Modulation::Qpsk,
        }
    }
}

pub trait ScoringBackend {
    /// Runs the simulation for `profile`
    ///
    /// Returns the bit error rate in `[0, 1]`, or a negative value (see [`SCORE_FAILED`]) when
    /// the simulation could not run.
    fn score(&mut self, profile: &SimulationProfile) -> f64;
}

impl<F> ScoringBackend for F
where
    F: FnMut(&SimulationProfile) -> f64,
{
    fn score(&mut self, profile: &SimulationProfile) -> f64 {
        self(profile)
    }
}

/// Placeholder for services without a scoring backend, cannot be constructed
pub enum NoScoring {}

impl ScoringBackend for NoScoring {
    fn score(&mut self, _profile: &SimulationProfile) -> f64 {
        match *self {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = SimulationProfile::default();
        assert_eq!(
            (
                profile.subcarrier_count,
                profile.symbol_count,
                profile.antenna_count
            ),
            (64, 100, 4)
        );
        assert_eq!(profile.model.as_str(), "ras");
        assert_eq!(profile.channel.as_str(), "rayleigh");
        assert_eq!(profile.modulation.as_str(), "qpsk");
    }

    #[test]
    fn test_closure_backend() {
        let mut seen = 0;
        let mut backend = |profile: &SimulationProfile| {
            seen = profile.antenna_count;
            0.25
        };
        assert_eq!(backend.score(&SimulationProfile::default()), 0.25);
        assert_eq!(seen, 4);
    }
}
