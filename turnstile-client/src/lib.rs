//! Turnstile license client.
//!
//! Wires the license and lease crates together: acquire a floating lease,
//! validate the signed license against this host, print what it grants,
//! release the lease, and report usage.

mod client;
mod config;
mod sink;

pub use client::{Client, Session, render};
pub use config::ClientConfig;
pub use sink::JsonReportSink;
