//! flex6k-core: error taxonomy and base types shared by all flex6k crates.
//!
//! Everything that both the wire codecs and the connection engine need to
//! agree on lives here: the [`Error`]/[`Result`] pair, the protocol's
//! identifier aliases ([`Handle`], [`SequenceNumber`], [`StreamId`]), and the
//! lenient value-parse helpers used when applying status text to typed
//! objects.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    format_handle, parse_bool, parse_handle, Handle, SequenceNumber, StreamId,
};
