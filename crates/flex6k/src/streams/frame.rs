//! Per-stream frame reassembly state machine.
//!
//! Segments of one frame may arrive split arbitrarily; frames may go
//! missing wholesale under load. The reassembler accumulates segments into
//! a ring of frame slots and hands out a completed frame exactly when the
//! accumulated bin count reaches the frame's declared total:
//!
//! - While awaiting a frame start, segments that do not begin at bin 0 are
//!   discarded (mid-frame arrivals after a gap or at startup).
//! - A segment for a different frame number than expected means loss: the
//!   partial accumulation is discarded, the error counter bumps once, and
//!   the machine waits for the next frame start.
//! - A completed frame advances the expected frame number by one and
//!   rotates to the next ring slot, so a consumer may hold the returned
//!   frame reference's clone while the next frames assemble.
//!
//! Byte-order conversion of bin values happens here, as segments are copied
//! into the frame, not in the packet codec.

use flex6k_core::Result;

/// Segment placement fields common to every segmented stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentMeta {
    /// Index of this segment's first bin within the frame.
    pub starting_bin: usize,
    /// Number of bins in this segment.
    pub segment_bin_count: usize,
    /// Total number of bins in the complete frame.
    pub frame_bin_count: usize,
    /// Frame sequence number.
    pub frame_number: u32,
}

/// One reassemblable frame type.
pub trait StreamFrame: Default + Clone + Send + 'static {
    /// Ring depth: how many in-flight frames to tolerate before a slot is
    /// overwritten (sized so a slow consumer does not stall the receive
    /// path).
    const RING_SLOTS: usize;

    /// Stream label for gap logging.
    const LABEL: &'static str;

    /// Parse the segment placement fields from a payload, validating that
    /// the declared bin run fits the payload and the frame capacity.
    fn read_segment(payload: &[u8]) -> Result<SegmentMeta>;

    /// Copy the segment's header fields and bins into the frame.
    fn apply_segment(&mut self, payload: &[u8], meta: &SegmentMeta);
}

/// Reassembles ordered, complete frames from one stream's segments.
pub struct Reassembler<F: StreamFrame> {
    frames: Vec<F>,
    index: usize,
    expected_frame: Option<u32>,
    accumulated_bins: usize,
    errors: u64,
    streaming: bool,
}

impl<F: StreamFrame> Reassembler<F> {
    pub fn new() -> Reassembler<F> {
        Reassembler {
            frames: vec![F::default(); F::RING_SLOTS],
            index: 0,
            expected_frame: None,
            accumulated_bins: 0,
            errors: 0,
            streaming: false,
        }
    }

    /// Number of gaps detected so far (one per missing-frame event).
    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Ingest one segment payload. Returns the completed frame when this
    /// segment finishes one, `None` otherwise.
    pub fn ingest(&mut self, payload: &[u8]) -> Option<&F> {
        let meta = match F::read_segment(payload) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::trace!(stream = F::LABEL, error = %e, "segment discarded");
                return None;
            }
        };

        // Incomplete packets show up at stream startup.
        if meta.frame_bin_count == 0 {
            return None;
        }
        if meta.starting_bin + meta.segment_bin_count > meta.frame_bin_count {
            tracing::trace!(stream = F::LABEL, "segment exceeds declared frame size");
            return None;
        }

        if !self.streaming {
            self.streaming = true;
            tracing::debug!(stream = F::LABEL, "stream started");
        }

        match self.expected_frame {
            None => {
                if meta.starting_bin != 0 {
                    // Not a frame boundary; keep waiting.
                    return None;
                }
                self.expected_frame = Some(meta.frame_number);
            }
            Some(expected) if expected != meta.frame_number => {
                tracing::debug!(
                    stream = F::LABEL,
                    expected,
                    received = meta.frame_number,
                    accumulated_bins = self.accumulated_bins,
                    frame_bin_count = meta.frame_bin_count,
                    "missing frame(s)"
                );
                self.expected_frame = None;
                self.accumulated_bins = 0;
                self.errors += 1;
                return None;
            }
            Some(_) => {}
        }

        let frame = &mut self.frames[self.index];
        frame.apply_segment(payload, &meta);
        self.accumulated_bins += meta.segment_bin_count;

        if self.accumulated_bins == meta.frame_bin_count {
            self.expected_frame = Some(meta.frame_number.wrapping_add(1));
            self.accumulated_bins = 0;
            let completed = self.index;
            self.index = (self.index + 1) % F::RING_SLOTS;
            return Some(&self.frames[completed]);
        }
        None
    }
}

impl<F: StreamFrame> Default for Reassembler<F> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// A minimal 8-bin frame for exercising the state machine without the
    /// real payload headers: segments are
    /// `[start, count, total, frame_no, bins...]` bytes.
    #[derive(Debug, Clone, Default)]
    struct TestFrame {
        frame_number: u32,
        bins: [u8; 8],
    }

    impl StreamFrame for TestFrame {
        const RING_SLOTS: usize = 4;
        const LABEL: &'static str = "test";

        fn read_segment(payload: &[u8]) -> flex6k_core::Result<SegmentMeta> {
            if payload.len() < 4 {
                return Err(flex6k_core::Error::Codec("short".into()));
            }
            let meta = SegmentMeta {
                starting_bin: payload[0] as usize,
                segment_bin_count: payload[1] as usize,
                frame_bin_count: payload[2] as usize,
                frame_number: payload[3] as u32,
            };
            if meta.frame_bin_count > 8 || payload.len() < 4 + meta.segment_bin_count {
                return Err(flex6k_core::Error::Codec("bad lengths".into()));
            }
            Ok(meta)
        }

        fn apply_segment(&mut self, payload: &[u8], meta: &SegmentMeta) {
            self.frame_number = meta.frame_number;
            self.bins[meta.starting_bin..meta.starting_bin + meta.segment_bin_count]
                .copy_from_slice(&payload[4..4 + meta.segment_bin_count]);
        }
    }

    fn seg(start: u8, count: u8, total: u8, frame: u8, bins: &[u8]) -> Vec<u8> {
        let mut v = vec![start, count, total, frame];
        v.extend_from_slice(bins);
        v
    }

    #[test]
    fn two_segments_one_frame() {
        let mut r = Reassembler::<TestFrame>::new();
        assert!(r.ingest(&seg(0, 4, 8, 1, &[1, 2, 3, 4])).is_none());
        let frame = r.ingest(&seg(4, 4, 8, 1, &[5, 6, 7, 8])).expect("complete");
        assert_eq!(frame.frame_number, 1);
        assert_eq!(frame.bins, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(r.errors(), 0);
    }

    #[test]
    fn single_segment_frame_completes_immediately() {
        let mut r = Reassembler::<TestFrame>::new();
        let frame = r.ingest(&seg(0, 8, 8, 7, &[9; 8])).expect("complete");
        assert_eq!(frame.frame_number, 7);
    }

    #[test]
    fn mid_frame_arrival_discarded_until_start() {
        let mut r = Reassembler::<TestFrame>::new();
        // First seen segment is mid-frame: not a boundary, dropped.
        assert!(r.ingest(&seg(4, 4, 8, 1, &[0; 4])).is_none());
        assert_eq!(r.errors(), 0);
        // Next frame's start is accepted.
        assert!(r.ingest(&seg(0, 4, 8, 2, &[1; 4])).is_none());
        assert!(r.ingest(&seg(4, 4, 8, 2, &[2; 4])).is_some());
    }

    #[test]
    fn gap_counts_once_and_recovers() {
        let mut r = Reassembler::<TestFrame>::new();
        assert!(r.ingest(&seg(0, 4, 8, 1, &[1; 4])).is_none());
        // Frame 2 arrives while 1 is partial: gap. The revealing segment is
        // discarded too.
        assert!(r.ingest(&seg(0, 4, 8, 2, &[2; 4])).is_none());
        assert_eq!(r.errors(), 1);
        // Machine resumes at the next frame start.
        assert!(r.ingest(&seg(0, 4, 8, 3, &[3; 4])).is_none());
        let frame = r.ingest(&seg(4, 4, 8, 3, &[4; 4])).expect("complete");
        assert_eq!(frame.frame_number, 3);
        assert_eq!(r.errors(), 1);
    }

    #[test]
    fn skipped_frame_between_completions() {
        let mut r = Reassembler::<TestFrame>::new();
        assert!(r.ingest(&seg(0, 8, 8, 1, &[1; 8])).is_some());
        // Frame 2 lost entirely; frame 3 starts.
        assert!(r.ingest(&seg(0, 8, 8, 3, &[3; 8])).is_none());
        assert_eq!(r.errors(), 1);
        // Frame 4 then completes normally.
        assert!(r.ingest(&seg(0, 8, 8, 4, &[4; 8])).is_some());
        assert_eq!(r.errors(), 1);
    }

    #[test]
    fn zero_total_bins_is_startup_noise() {
        let mut r = Reassembler::<TestFrame>::new();
        assert!(r.ingest(&seg(0, 0, 0, 1, &[])).is_none());
        assert_eq!(r.errors(), 0);
        assert!(r.ingest(&seg(0, 8, 8, 2, &[2; 8])).is_some());
    }

    #[test]
    fn overrun_segment_is_corrupt() {
        let mut r = Reassembler::<TestFrame>::new();
        // start + count > total
        assert!(r.ingest(&seg(6, 4, 8, 1, &[0; 4])).is_none());
        assert_eq!(r.errors(), 0);
    }

    #[test]
    fn consecutive_frames_rotate_ring_slots() {
        let mut r = Reassembler::<TestFrame>::new();
        let mut seen = Vec::new();
        for n in 1..=6u8 {
            let frame = r.ingest(&seg(0, 8, 8, n, &[n; 8])).expect("complete");
            seen.push((frame.frame_number, frame.bins[0]));
        }
        assert_eq!(
            seen,
            vec![(1, 1), (2, 2), (3, 3), (4, 4), (5, 5), (6, 6)]
        );
    }

    #[test]
    fn truncated_segment_discarded() {
        let mut r = Reassembler::<TestFrame>::new();
        assert!(r.ingest(&[0, 8]).is_none());
        assert_eq!(r.errors(), 0);
    }
}
