//! Host side configuration
//!
//! Values are layered, later sources win:
//! 1. built-in defaults ([`ServiceConfig::default`])
//! 2. an optional TOML file
//! 3. `RAS_` prefixed environment variables, nested keys separated by `__`
//!    (e.g. `RAS_TRANSPORT__BAUD_RATE=57600`)
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::modem::ModemProtocol;
use crate::ras::RasService;
use crate::scoring::{SimulationProfile, DEFAULT_QUALITY_THRESHOLD};
use crate::transport::serial::SerialPortLine;
use crate::transport::{Transport, TransportConfig, UartContext, UartNum};

pub const ENV_PREFIX: &str = "RAS_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Serial device the modem is attached to
    pub port: String,
    pub uart: UartNum,
    pub transport: TransportConfig,
    /// Bit error rate above which a transmission is logged as degraded
    pub quality_threshold: f64,
    pub profile: SimulationProfile,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            port: "/dev/ttyUSB0".to_string(),
            uart: UartNum::Uart1,
            transport: TransportConfig::modem(),
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            profile: SimulationProfile::default(),
        }
    }
}

impl ServiceConfig {
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(ServiceConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    /// Opens the configured device in `context`
    pub fn open<'c>(
        &self,
        context: &'c mut UartContext<SerialPortLine>,
    ) -> &'c mut Transport<SerialPortLine> {
        context.open_path(self.uart, &self.port)
    }

    /// Service over `transport` with this configuration's line settings, profile and threshold
    pub fn service<'t>(
        &self,
        transport: &'t mut Transport<SerialPortLine>,
    ) -> RasService<'t, SerialPortLine> {
        RasService::from_modem(ModemProtocol::with_config(transport, self.transport))
            .with_profile(self.profile)
            .with_quality_threshold(self.quality_threshold)
    }
}
