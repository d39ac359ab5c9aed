//! # bshlocal
//!
//! `bshlocal-lib` is a client for the local API of a smart-home controller. It lists rooms and
//! devices, reads and writes the state of device services, and keeps a local copy of that
//! state current through the controller's long-polling subscription.
//!
//! The controller authenticates clients by certificate: register a client certificate with it
//! once, then hand the certificate and its private key to [`config::ClientConfig`].
//!
//! ## Features
//!
//! - Room and device enumeration
//! - Typed wrappers for the common device services (switches, thermostats, contacts, shutters)
//! - State writes that update the local copy once the controller accepts them
//! - JSON-RPC long polling with dispatch of change records to the devices they belong to
//!
//! ## Example
//!
//! ```no_run
//! use std::collections::HashMap;
//!
//! use bshlocal_lib::api::BshLocalApi;
//! use bshlocal_lib::config::ClientConfig;
//! use bshlocal_lib::device::{dispatch_poll_results, Device};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("192.168.0.10", "client-cert.pem", "client-key.pem");
//!     let api = BshLocalApi::new(&config).await?;
//!
//!     let mut devices = HashMap::new();
//!     for raw in api.get_devices().await? {
//!         let device = Device::new(&api, raw).await?;
//!         devices.insert(device.id().to_string(), device);
//!     }
//!
//!     let subscription = api.subscribe().await?;
//!     loop {
//!         let records = subscription.poll().await?;
//!         for updated in dispatch_poll_results(&mut devices, &records)? {
//!             println!("{} / {} changed", updated.device_id, updated.service_id);
//!         }
//!     }
//! }
//! ```
//!
//! The library runs no loop of its own: polling, cancelling the poll and retrying after
//! failures are up to the caller.

// HTTPS session with the controller: client certificate, fixed headers and status handling.
pub mod transport;

// REST calls and the JSON-RPC long-polling methods, plus the records they return.
pub mod api;

// Devices and the typed device services they own.
pub mod device;

pub mod config;
pub mod error;

pub use error::{Error, JsonRpcError, Result};

#[cfg(test)]
pub(crate) mod test_util;
