//! Panadapter FFT frame layout.
//!
//! Each segment payload leads with a 12-byte header, then big-endian u16
//! bins:
//!
//! ```text
//! offset 0  u16  starting_bin
//! offset 2  u16  segment_bin_count
//! offset 4  u16  bin_size (bytes per bin)
//! offset 6  u16  frame_bin_count
//! offset 8  u32  frame_number
//! ```

use flex6k_core::{Error, Result};

use super::frame::{SegmentMeta, StreamFrame};

/// Size of the segment payload header in bytes.
const HEADER_SIZE: usize = 12;

/// Largest frame the radio produces (bins).
pub const MAX_PANADAPTER_BINS: usize = 5120;

/// One complete panadapter sweep.
#[derive(Debug, Clone)]
pub struct PanadapterFrame {
    /// Bin size in bytes as declared by the radio.
    pub bin_size: usize,
    /// Number of valid bins in `bins`.
    pub frame_bin_count: usize,
    /// Frame sequence number.
    pub frame_number: u32,
    /// Bin values, host byte order. Only `frame_bin_count` entries are
    /// meaningful.
    pub bins: Vec<u16>,
}

impl Default for PanadapterFrame {
    fn default() -> Self {
        PanadapterFrame {
            bin_size: 0,
            frame_bin_count: 0,
            frame_number: 0,
            bins: vec![0; MAX_PANADAPTER_BINS],
        }
    }
}

impl StreamFrame for PanadapterFrame {
    const RING_SLOTS: usize = 16;
    const LABEL: &'static str = "panadapter";

    fn read_segment(payload: &[u8]) -> Result<SegmentMeta> {
        if payload.len() < HEADER_SIZE {
            return Err(Error::Codec(format!(
                "panadapter segment too short: {} bytes",
                payload.len()
            )));
        }
        let meta = SegmentMeta {
            starting_bin: u16::from_be_bytes([payload[0], payload[1]]) as usize,
            segment_bin_count: u16::from_be_bytes([payload[2], payload[3]]) as usize,
            frame_bin_count: u16::from_be_bytes([payload[6], payload[7]]) as usize,
            frame_number: u32::from_be_bytes([payload[8], payload[9], payload[10], payload[11]]),
        };
        if meta.frame_bin_count > MAX_PANADAPTER_BINS {
            return Err(Error::Codec(format!(
                "panadapter frame_bin_count {} exceeds capacity",
                meta.frame_bin_count
            )));
        }
        if payload.len() < HEADER_SIZE + meta.segment_bin_count * 2 {
            return Err(Error::Codec("panadapter segment bins truncated".into()));
        }
        Ok(meta)
    }

    fn apply_segment(&mut self, payload: &[u8], meta: &SegmentMeta) {
        self.bin_size = u16::from_be_bytes([payload[4], payload[5]]) as usize;
        self.frame_bin_count = meta.frame_bin_count;
        self.frame_number = meta.frame_number;

        // Swap to host order as the bins land in the frame.
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
    payload.extend_from_slice(&starting_bin.to_be_bytes());
    payload.extend_from_slice(&segment_bin_count.to_be_bytes());
    payload.extend_from_slice(&2u16.to_be_bytes()); // bin_size
    payload.extend_from_slice(&frame_bin_count.to_be_bytes());
    payload.extend_from_slice(&frame_number.to_be_bytes());
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
    fn segmented_sweep_reassembles_in_order() {
        let mut r = Reassembler::<PanadapterFrame>::new();

        let first: Vec<u16> = (0..512).collect();
        let second: Vec<u16> = (512..1024).collect();

        assert!(r.ingest(&build_segment(0, 512, 1024, 42, &first)).is_none());
        let frame = r
            .ingest(&build_segment(512, 512, 1024, 42, &second))
            .expect("complete frame");

        assert_eq!(frame.frame_number, 42);
        assert_eq!(frame.frame_bin_count, 1024);
        assert_eq!(frame.bin_size, 2);
        // Bin array equals the concatenation of segments by offset.
        for (i, bin) in frame.bins[..1024].iter().enumerate() {
            assert_eq!(*bin as usize, i, "bin {i}");
        }
        assert_eq!(r.errors(), 0);
    }

    #[test]
    fn bins_are_byte_swapped_from_wire_order() {
        let mut r = Reassembler::<PanadapterFrame>::new();
        let frame = r
            .ingest(&build_segment(0, 2, 2, 0, &[0x0102, 0xA0B0]))
            .expect("complete");
        assert_eq!(frame.bins[0], 0x0102);
        assert_eq!(frame.bins[1], 0xA0B0);
    }

    #[test]
    fn gap_resets_and_counts() {
        let mut r = Reassembler::<PanadapterFrame>::new();
        assert!(r.ingest(&build_segment(0, 4, 8, 1, &[0; 4])).is_none());
        assert!(r.ingest(&build_segment(0, 4, 8, 3, &[0; 4])).is_none());
        assert_eq!(r.errors(), 1);
    }

    #[test]
    fn oversized_frame_declaration_rejected() {
        let payload = build_segment(0, 1, 6000, 1, &[0]);
        assert!(PanadapterFrame::read_segment(&payload).is_err());
    }

    #[test]
    fn truncated_bins_rejected() {
        let mut payload = build_segment(0, 8, 8, 1, &[0; 8]);
        payload.truncate(HEADER_SIZE + 4);
        assert!(PanadapterFrame::read_segment(&payload).is_err());
    }
}
