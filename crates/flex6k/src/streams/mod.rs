//! UDP telemetry streams: frame reassembly and routing.
//!
//! The radio segments each logical unit of telemetry (one spectrum sweep,
//! one waterfall line) across several UDP datagrams. [`Reassembler`] puts
//! them back together per stream; [`StreamRouter`] owns one reassembler per
//! active stream id and fans completed frames out to consumers, fed
//! synchronously from the session's UDP receive task.

mod frame;
mod meter;
mod panadapter;
mod router;
mod waterfall;

pub use frame::{Reassembler, SegmentMeta, StreamFrame};
pub use meter::{decode_meter_payload, MeterReading};
pub use panadapter::PanadapterFrame;
pub use router::{StreamErrors, StreamRouter};
pub use waterfall::WaterfallFrame;
