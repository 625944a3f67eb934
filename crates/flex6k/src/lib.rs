//! # flex6k -- FlexRadio SmartSDR client engine
//!
//! An asynchronous client for FLEX-6000/8000-series software-defined
//! radios: find them, connect to them, mirror their state, and receive
//! their telemetry.
//!
//! - **Discovery** ([`discovery`]) -- merge LAN broadcasts and smartlink
//!   relay announcements into one observable [`Directory`] of radios and
//!   their connected stations.
//! - **Session** ([`session`]) -- the TCP command channel with
//!   sequence-numbered reply correlation, the status feed, keep-alive, and
//!   the session's UDP telemetry socket. One active session at a time is
//!   the supported model.
//! - **Status registry** ([`registry`] + [`objects`]) -- typed, keyed
//!   collections (slices, panadapters, meters, ...) synchronized from the
//!   radio's status feed with add/update/remove semantics.
//! - **Streams** ([`streams`]) -- VITA-49 telemetry demultiplexing and
//!   per-stream frame reassembly for spectrum and waterfall data, plus
//!   meter fan-out and opaque audio payload delivery.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use flex6k::discovery::{Directory, LanListener};
//! use flex6k::session::{Session, SessionOptions};
//!
//! # async fn example() -> flex6k_core::Result<()> {
//! let directory = Directory::new();
//! let listener = LanListener::start(directory.clone()).await?;
//!
//! tokio::time::sleep(Duration::from_secs(2)).await;
//! if let Some(packet) = directory.radios().first() {
//!     let session = Session::connect(packet, SessionOptions::default()).await?;
//!     for slice in session.registry().slices.snapshot() {
//!         println!("slice at {} Hz, {}", slice.frequency_hz(), slice.mode);
//!     }
//!     session.disconnect().await;
//! }
//! listener.stop();
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod discovery;
mod net;
pub mod objects;
mod pinger;
pub mod registry;
pub mod session;
pub mod streams;

pub use discovery::{Directory, DiscoveryPacket, GuiClient, LanListener, PacketSource, WanListener};
pub use registry::{StatusCollection, StatusHandler, StatusRegistry};
pub use session::{Session, SessionEvent, SessionOptions, SessionState};
pub use streams::{PanadapterFrame, StreamRouter, WaterfallFrame};

// Re-export the base crates: callers need the error type and ids.
pub use flex6k_core::{Error, Handle, Result, SequenceNumber, StreamId};
pub use flex6k_proto as proto;
