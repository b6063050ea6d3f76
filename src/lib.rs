//! Bridge between an application and a radio/cellular modem speaking AT commands over a serial
//! line.
//!
//! Layers, leaf first:
//! * [`transport`] - configurable serial line with bounded blocking reads and writes
//! * [`modem`] - AT command framing and response matching, modem readiness
//! * [`ras`] - validated transmit/receive returning a [`ras::Status`], optional link scoring
//!
//! ```no_run
//! use ras_serial::config::ServiceConfig;
//! use ras_serial::transport::UartContext;
//!
//! let config = ServiceConfig::load(None).unwrap();
//! let mut context = UartContext::new();
//! let transport = config.open(&mut context);
//! let mut service = config.service(transport);
//! service.init();
//! let status = ras_serial::ras::Status::of(&service.transmit_data(&[0x01, 0x02]));
//! service.handle_error(status);
//! ```
#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod fmt;

pub mod modem;
pub mod payload;
pub mod ras;
pub mod scoring;
pub mod transport;

#[cfg(feature = "std")]
pub mod config;

// include defmt::Format implementations
#[cfg(feature = "defmt-impl")]
pub mod defmt;

#[cfg(test)]
mod mock;

// reexport heapless
pub use heapless;

/// Largest payload accepted by a single transmit or receive
pub const MAX_DATA_SIZE: usize = 1024;
