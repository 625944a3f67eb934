//! flex6k-proto: pure wire codecs for the SmartSDR protocol.
//!
//! Two independent codecs, no I/O in either:
//!
//! - **TCP line protocol** ([`line`]) -- newline-terminated ASCII over the
//!   command port. Commands flow client to radio (`C<seq>|<text>`); replies,
//!   status, message and handshake lines flow radio to client.
//! - **VITA-49 packets** ([`vita`]) -- the fixed binary header FlexRadio
//!   uses for all UDP telemetry (meter data, spectrum bins, waterfall lines,
//!   DAX audio, discovery broadcasts).
//!
//! Everything here operates on byte/str slices and returns typed values or
//! errors; malformed input never panics into caller state.

pub mod line;
pub mod vita;

pub use line::{encode_command, key_values, parse_line, Reply, Status, TcpMessage};
pub use vita::{PacketClass, VitaHeader, VitaPacket, FLEX_OUI, VITA_HEADER_SIZE};
