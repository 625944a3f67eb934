//! Waterfall line frame layout.
//!
//! Each segment payload leads with a 36-byte header, then big-endian u16
//! bins:
//!
//! ```text
//! offset  0  u64  first_bin_freq (1/1.048576 MHz units)
//! offset  8  u64  bin_bandwidth  (1/1.048576 MHz units)
//! offset 16  u32  line_duration (ms)
//! offset 20  u16  segment_bin_count
//! offset 22  u16  height (lines)
//! offset 24  u32  frame_number
//! offset 28  u32  auto_black_level
//! offset 32  u16  frame_bin_count
//! offset 34  u16  starting_bin
//! ```

use flex6k_core::{Error, Result};

use super::frame::{SegmentMeta, StreamFrame};

const HEADER_SIZE: usize = 36;

/// Divisor turning the radio's fixed-point frequency fields into MHz.
const FREQ_SCALE: f64 = 1.048576e6;

/// Largest line the radio produces (bins).
pub const MAX_WATERFALL_BINS: usize = 4096;

/// One complete waterfall line.
#[derive(Debug, Clone)]
pub struct WaterfallFrame {
    /// Frequency of the first bin in MHz.
    pub first_bin_freq_mhz: f64,
    /// Bandwidth of a single bin in MHz.
    pub bin_bandwidth_mhz: f64,
    /// Duration of this line in milliseconds.
    pub line_duration: u32,
    /// Height of the frame in lines.
    pub height: usize,
    /// Auto black level computed by the radio.
    pub auto_black_level: u32,
    /// Number of valid bins in `bins`.
    pub frame_bin_count: usize,
    /// Frame sequence number (time code).
    pub frame_number: u32,
    /// Bin values, host byte order.
    pub bins: Vec<u16>,
}

impl Default for WaterfallFrame {
    fn default() -> Self {
        WaterfallFrame {
            first_bin_freq_mhz: 0.0,
            bin_bandwidth_mhz: 0.0,
            line_duration: 0,
            height: 0,
            auto_black_level: 0,
            frame_bin_count: 0,
            frame_number: 0,
            bins: vec![0; MAX_WATERFALL_BINS],
        }
    }
}

fn be_u16(payload: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([payload[offset], payload[offset + 1]])
}

fn be_u32(payload: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        payload[offset],
        payload[offset + 1],
        payload[offset + 2],
        payload[offset + 3],
    ])
}

fn be_u64(payload: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&payload[offset..offset + 8]);
    u64::from_be_bytes(bytes)
}

impl StreamFrame for WaterfallFrame {
    const RING_SLOTS: usize = 10;
    const LABEL: &'static str = "waterfall";

    fn read_segment(payload: &[u8]) -> Result<SegmentMeta> {
        if payload.len() < HEADER_SIZE {
            return Err(Error::Codec(format!(
                "waterfall segment too short: {} bytes",
                payload.len()
            )));
        }
        let meta = SegmentMeta {
            starting_bin: be_u16(payload, 34) as usize,
            segment_bin_count: be_u16(payload, 20) as usize,
            frame_bin_count: be_u16(payload, 32) as usize,
            frame_number: be_u32(payload, 24),
        };
        if meta.frame_bin_count > MAX_WATERFALL_BINS {
            return Err(Error::Codec(format!(
                "waterfall frame_bin_count {} exceeds capacity",
                meta.frame_bin_count
            )));
        }
        if payload.len() < HEADER_SIZE + meta.segment_bin_count * 2 {
            return Err(Error::Codec("waterfall segment bins truncated".into()));
        }
        Ok(meta)
    }

    fn apply_segment(&mut self, payload: &[u8], meta: &SegmentMeta) {
        self.first_bin_freq_mhz = be_u64(payload, 0) as f64 / FREQ_SCALE;
        self.bin_bandwidth_mhz = be_u64(payload, 8) as f64 / FREQ_SCALE;
        self.line_duration = be_u32(payload, 16);
        self.height = be_u16(payload, 22) as usize;
        self.auto_black_level = be_u32(payload, 28);
        self.frame_bin_count = meta.frame_bin_count;
        self.frame_number = meta.frame_number;

        for i in 0..meta.segment_bin_count {
            let offset = HEADER_SIZE + 2 * i;
            self.bins[meta.starting_bin + i] =
                u16::from_be_bytes([payload[offset], payload[offset + 1]]);
        }
    }
}

/// Build a segment payload for in-crate tests.
#[cfg(test)]
pub(crate) fn build_segment(
    starting_bin: u16,
    segment_bin_count: u16,
    frame_bin_count: u16,
    frame_number: u32,
    bins: &[u16],
) -> Vec<u8> {
    let mut payload = Vec::with_capacity(HEADER_SIZE + bins.len() * 2);
    payload.extend_from_slice(&((14.1 * FREQ_SCALE) as u64).to_be_bytes());
    payload.extend_from_slice(&((0.0001 * FREQ_SCALE) as u64).to_be_bytes());
    payload.extend_from_slice(&100u32.to_be_bytes()); // line_duration
    payload.extend_from_slice(&segment_bin_count.to_be_bytes());
    payload.extend_from_slice(&1u16.to_be_bytes()); // height
    payload.extend_from_slice(&frame_number.to_be_bytes());
    payload.extend_from_slice(&20u32.to_be_bytes()); // auto_black_level
    payload.extend_from_slice(&frame_bin_count.to_be_bytes());
    payload.extend_from_slice(&starting_bin.to_be_bytes());
    for bin in bins {
        payload.extend_from_slice(&bin.to_be_bytes());
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::Reassembler;

    #[test]
    fn line_reassembles_with_metadata() {
        let mut r = Reassembler::<WaterfallFrame>::new();

        let first: Vec<u16> = (0..100).collect();
        let second: Vec<u16> = (100..200).collect();

        assert!(r.ingest(&build_segment(0, 100, 200, 9, &first)).is_none());
        let frame = r
            .ingest(&build_segment(100, 100, 200, 9, &second))
            .expect("complete line");

        assert_eq!(frame.frame_number, 9);
        assert_eq!(frame.frame_bin_count, 200);
        assert_eq!(frame.line_duration, 100);
        assert_eq!(frame.auto_black_level, 20);
        assert!((frame.first_bin_freq_mhz - 14.1).abs() < 1e-6);
        for (i, bin) in frame.bins[..200].iter().enumerate() {
            assert_eq!(*bin as usize, i);
        }
    }

    #[test]
    fn header_layout_offsets() {
        let payload = build_segment(16, 32, 64, 5, &[0; 32]);
        let meta = WaterfallFrame::read_segment(&payload).unwrap();
        assert_eq!(meta.starting_bin, 16);
        assert_eq!(meta.segment_bin_count, 32);
        assert_eq!(meta.frame_bin_count, 64);
        assert_eq!(meta.frame_number, 5);
    }

    #[test]
    fn short_payload_rejected() {
        assert!(WaterfallFrame::read_segment(&[0u8; 35]).is_err());
    }

    #[test]
    fn ring_is_ten_deep() {
        assert_eq!(WaterfallFrame::RING_SLOTS, 10);
    }
}
