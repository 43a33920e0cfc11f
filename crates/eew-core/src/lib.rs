//! Core types for Earthquake Early Warning (EEW) reports.
//!
//! This crate parses the JMA seismic XML carried by dmdata.jp telegrams into
//! an [`Advisory`] and renders it as the Japanese notice posted to the social
//! targets. It also defines the bus constants shared by every process.

mod advisory;
mod error;
mod parser;

pub use advisory::{Advisory, Depth, Intensity, LatLng};
pub use error::AdvisoryError;
pub use parser::parse_coordinate;

/// Bus topic for EEW forecast telegrams (the JMA schema tag).
pub const EEW_TOPIC: &str = "VXSE45";

/// Default endpoint of the internal pub/sub bus.
pub const DEFAULT_BUS_ENDPOINT: &str = "tcp://127.0.0.1:5563";
