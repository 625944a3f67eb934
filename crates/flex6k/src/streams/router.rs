//! Per-stream routing of decoded VITA packets.
//!
//! The session's UDP receive task calls [`StreamRouter::route`] for every
//! datagram. Routing and reassembly run synchronously on that task, so
//! nothing here blocks: completed frames and audio payloads are handed to
//! consumers with `try_send` and dropped (counted) when a consumer lags.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;

use flex6k_core::StreamId;
use flex6k_proto::vita::{self, PacketClass};

use crate::objects::Meter;
use crate::registry::StatusCollection;

use super::frame::{Reassembler, StreamFrame};
use super::meter::decode_meter_payload;
use super::panadapter::PanadapterFrame;
use super::waterfall::WaterfallFrame;

/// Default consumer channel depth for bin-frame subscriptions.
const FRAME_CHANNEL_DEPTH: usize = 16;

/// Default consumer channel depth for opaque byte streams (audio runs at
/// ~93 packets/s per stream).
const BYTES_CHANNEL_DEPTH: usize = 64;

struct BinStream<F: StreamFrame> {
    reassembler: Reassembler<F>,
    consumer: Option<mpsc::Sender<F>>,
}

impl<F: StreamFrame> BinStream<F> {
    fn new() -> BinStream<F> {
        BinStream {
            reassembler: Reassembler::new(),
            consumer: None,
        }
    }
}

/// Observable per-class stream error counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamErrors {
    /// Panadapter gaps (missing frames), summed over streams.
    pub panadapter: u64,
    /// Waterfall gaps, summed over streams.
    pub waterfall: u64,
    /// Malformed meter payloads.
    pub meter: u64,
    /// Frames/payloads dropped because a consumer lagged.
    pub dropped: u64,
}

/// Routes decoded UDP telemetry to per-stream consumers.
pub struct StreamRouter {
    meters: Arc<StatusCollection<Meter>>,
    panadapters: Mutex<HashMap<StreamId, BinStream<PanadapterFrame>>>,
    waterfalls: Mutex<HashMap<StreamId, BinStream<WaterfallFrame>>>,
    byte_sinks: Mutex<HashMap<StreamId, mpsc::Sender<Bytes>>>,
    meter_errors: AtomicU64,
    dropped: AtomicU64,
}

impl StreamRouter {
    /// Create a router updating the given meter collection from meter
    /// packets.
    pub fn new(meters: Arc<StatusCollection<Meter>>) -> Arc<StreamRouter> {
        Arc::new(StreamRouter {
            meters,
            panadapters: Mutex::new(HashMap::new()),
            waterfalls: Mutex::new(HashMap::new()),
            byte_sinks: Mutex::new(HashMap::new()),
            meter_errors: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    /// Subscribe to completed panadapter frames for one stream id.
    pub fn subscribe_panadapter(&self, stream_id: StreamId) -> mpsc::Receiver<PanadapterFrame> {
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_DEPTH);
        let mut streams = self.panadapters.lock().unwrap();
        streams.entry(stream_id).or_insert_with(BinStream::new).consumer = Some(tx);
        rx
    }

    /// Subscribe to completed waterfall lines for one stream id.
    pub fn subscribe_waterfall(&self, stream_id: StreamId) -> mpsc::Receiver<WaterfallFrame> {
        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_DEPTH);
        let mut streams = self.waterfalls.lock().unwrap();
        streams.entry(stream_id).or_insert_with(BinStream::new).consumer = Some(tx);
        rx
    }

    /// Subscribe to raw payload bytes for an audio/IQ stream id. The
    /// payload layout is opaque here (Opus frames, float32 samples, ...).
    pub fn subscribe_bytes(&self, stream_id: StreamId) -> mpsc::Receiver<Bytes> {
        let (tx, rx) = mpsc::channel(BYTES_CHANNEL_DEPTH);
        self.byte_sinks.lock().unwrap().insert(stream_id, tx);
        rx
    }

    /// Drop any subscription and reassembly state for a stream id.
    pub fn unsubscribe(&self, stream_id: StreamId) {
        self.panadapters.lock().unwrap().remove(&stream_id);
        self.waterfalls.lock().unwrap().remove(&stream_id);
        self.byte_sinks.lock().unwrap().remove(&stream_id);
    }

    /// Current error counters.
    pub fn errors(&self) -> StreamErrors {
        let panadapter = self
            .panadapters
            .lock()
            .unwrap()
            .values()
            .map(|s| s.reassembler.errors())
            .sum();
        let waterfall = self
            .waterfalls
            .lock()
            .unwrap()
            .values()
            .map(|s| s.reassembler.errors())
            .sum();
        StreamErrors {
            panadapter,
            waterfall,
            meter: self.meter_errors.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// Route one raw UDP datagram.
    ///
    /// Malformed datagrams are discarded without disturbing other streams.
    pub fn route(&self, datagram: &[u8]) {
        let packet = match vita::decode(datagram) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::trace!(error = %e, "undecodable datagram dropped");
                return;
            }
        };

        match packet.header.class {
            PacketClass::Meter => match decode_meter_payload(packet.payload) {
                Ok(readings) => {
                    for reading in readings {
                        self.meters.apply_reading(reading.id as u32, reading.raw);
                    }
                }
                Err(e) => {
                    self.meter_errors.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(error = %e, "bad meter payload");
                }
            },

            PacketClass::Panadapter => {
                let mut streams = self.panadapters.lock().unwrap();
                let stream = streams
                    .entry(packet.header.stream_id)
                    .or_insert_with(BinStream::new);
                if let Some(frame) = stream.reassembler.ingest(packet.payload) {
                    if let Some(consumer) = &stream.consumer {
                        if consumer.try_send(frame.clone()).is_err() {
                            self.dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }

            PacketClass::Waterfall => {
                let mut streams = self.waterfalls.lock().unwrap();
                let stream = streams
                    .entry(packet.header.stream_id)
                    .or_insert_with(BinStream::new);
                if let Some(frame) = stream.reassembler.ingest(packet.payload) {
                    if let Some(consumer) = &stream.consumer {
                        if consumer.try_send(frame.clone()).is_err() {
                            self.dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            }

            PacketClass::DaxAudio
            | PacketClass::DaxReducedBw
            | PacketClass::Opus
            | PacketClass::DaxIq24
            | PacketClass::DaxIq48
            | PacketClass::DaxIq96
            | PacketClass::DaxIq192 => {
                let sinks = self.byte_sinks.lock().unwrap();
                if let Some(sink) = sinks.get(&packet.header.stream_id) {
                    if sink.try_send(Bytes::copy_from_slice(packet.payload)).is_err() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }

            // Discovery broadcasts arrive on the discovery socket, not the
            // session socket; seeing one here is harmless.
            PacketClass::Discovery => {}

            PacketClass::Unknown(code) => {
                tracing::trace!(class = format!("0x{code:04X}"), "unknown stream class");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
