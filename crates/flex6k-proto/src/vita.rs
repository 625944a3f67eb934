//! VITA-49.0 packet codec for FlexRadio UDP telemetry.
//!
//! FlexRadio frames every UDP datagram -- meter data, panadapter bins,
//! waterfall lines, DAX audio, even discovery broadcasts -- as a VITA-49.0
//! Extension Data packet with a 28-byte header. All multi-byte header fields
//! are big-endian network order.
//!
//! Decoding yields the header fields plus the raw payload slice. Payload
//! sample values are *not* byte-swapped here: the per-stream reassembly code
//! converts to host order as it copies bins, so the codec stays a pure,
//! allocation-free view over the datagram.

use flex6k_core::{Error, Result, StreamId};

/// VITA-49 header size in bytes.
pub const VITA_HEADER_SIZE: usize = 28;

/// FlexRadio OUI (Organizationally Unique Identifier) in the Class ID.
pub const FLEX_OUI: u32 = 0x001C2D;

/// Information Class Code FlexRadio stamps on its packets.
pub const FLEX_INFORMATION_CLASS: u16 = 0x534C;

/// Logical stream class, identified by the Packet Class Code.
///
/// The class code selects the payload interpretation; the stream id then
/// selects the object instance (which panadapter, which DAX channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketClass {
    /// Meter data records -- class code 0x8002.
    Meter,
    /// Panadapter FFT bins -- class code 0x8003.
    Panadapter,
    /// Waterfall lines -- class code 0x8004.
    Waterfall,
    /// Opus-compressed remote audio -- class code 0x8005.
    Opus,
    /// Reduced-bandwidth DAX audio -- class code 0x0123.
    DaxReducedBw,
    /// DAX IQ at 24 ksps -- class code 0x02E3.
    DaxIq24,
    /// DAX IQ at 48 ksps -- class code 0x02E4.
    DaxIq48,
    /// DAX IQ at 96 ksps -- class code 0x02E5.
    DaxIq96,
    /// DAX IQ at 192 ksps -- class code 0x02E6.
    DaxIq192,
    /// DAX demodulated audio, 24 kHz stereo float32 -- class code 0x03E3.
    DaxAudio,
    /// Discovery broadcast -- class code 0xFFFF.
    Discovery,
    /// Unrecognized class code, preserved for logging.
    Unknown(u16),
}

impl PacketClass {
    /// Derive the class from a Packet Class Code.
    pub fn from_code(code: u16) -> PacketClass {
        match code {
            0x8002 => PacketClass::Meter,
            0x8003 => PacketClass::Panadapter,
            0x8004 => PacketClass::Waterfall,
            0x8005 => PacketClass::Opus,
            0x0123 => PacketClass::DaxReducedBw,
            0x02E3 => PacketClass::DaxIq24,
            0x02E4 => PacketClass::DaxIq48,
            0x02E5 => PacketClass::DaxIq96,
            0x02E6 => PacketClass::DaxIq192,
            0x03E3 => PacketClass::DaxAudio,
            0xFFFF => PacketClass::Discovery,
            other => PacketClass::Unknown(other),
        }
    }

    /// The Packet Class Code for this class.
    pub fn code(&self) -> u16 {
        match self {
            PacketClass::Meter => 0x8002,
            PacketClass::Panadapter => 0x8003,
            PacketClass::Waterfall => 0x8004,
            PacketClass::Opus => 0x8005,
            PacketClass::DaxReducedBw => 0x0123,
            PacketClass::DaxIq24 => 0x02E3,
            PacketClass::DaxIq48 => 0x02E4,
            PacketClass::DaxIq96 => 0x02E5,
            PacketClass::DaxIq192 => 0x02E6,
            PacketClass::DaxAudio => 0x03E3,
            PacketClass::Discovery => 0xFFFF,
            PacketClass::Unknown(code) => *code,
        }
    }
}

/// Parsed VITA-49 packet header (28 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VitaHeader {
    /// Packet type from bits 31-28 of the header word. FlexRadio uses 0x3,
    /// Extension Data with Stream ID.
    pub packet_type: u8,
    /// Whether a Class ID is present (bit 27). True for FlexRadio packets.
    pub class_id_present: bool,
    /// Whether a trailer is present (bit 26). False for FlexRadio.
    pub trailer_present: bool,
    /// 4-bit rolling packet counter (bits 15-12).
    pub packet_count: u8,
    /// Total packet size in 32-bit words, including header (bits 11-0).
    pub packet_size_words: u16,
    /// Stream ID identifying the specific stream instance.
    pub stream_id: StreamId,
    /// 24-bit OUI from the Class ID field. 0x001C2D for FlexRadio.
    pub class_oui: u32,
    /// Information Class Code (0x534C for FlexRadio).
    pub information_class: u16,
    /// Packet Class Code identifying the stream class.
    pub packet_class_code: u16,
    /// Stream class derived from the packet class code.
    pub class: PacketClass,
    /// Integer timestamp in seconds since the Unix epoch.
    pub timestamp_int: u32,
    /// Fractional timestamp in picoseconds.
    pub timestamp_frac: u64,
}

/// A decoded VITA-49 packet: header plus a borrow of the payload bytes.
#[derive(Debug, PartialEq, Eq)]
pub struct VitaPacket<'a> {
    /// The parsed 28-byte header.
    pub header: VitaHeader,
    /// Payload bytes after the header, up to the declared packet size.
    /// A slice into the original buffer; no copying occurs.
    pub payload: &'a [u8],
}

/// Decode a VITA-49 packet from a raw UDP datagram.
///
/// The buffer must contain at least [`VITA_HEADER_SIZE`] bytes and the
/// declared `packet_size` must not exceed the buffer. Trailing bytes beyond
/// the declared size are ignored (some switches pad runt frames).
pub fn decode(data: &[u8]) -> Result<VitaPacket<'_>> {
    if data.len() < VITA_HEADER_SIZE {
        return Err(Error::Codec(format!(
            "VITA packet too short: {} bytes, minimum is {VITA_HEADER_SIZE}",
            data.len()
        )));
    }

    // -- Header word (offset 0-3) --
    let header_word = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let packet_type = ((header_word >> 28) & 0x0F) as u8;
    let class_id_present = (header_word >> 27) & 1 == 1;
    let trailer_present = (header_word >> 26) & 1 == 1;
    let packet_count = ((header_word >> 12) & 0x0F) as u8;
    let packet_size_words = (header_word & 0x0FFF) as u16;

    let packet_size_bytes = packet_size_words as usize * 4;
    if packet_size_bytes > data.len() {
        return Err(Error::Codec(format!(
            "VITA packet_size ({packet_size_words} words) exceeds buffer length ({} bytes)",
            data.len()
        )));
    }
    if packet_size_bytes < VITA_HEADER_SIZE {
        return Err(Error::Codec(format!(
            "VITA packet_size ({packet_size_words} words) smaller than header"
        )));
    }

    // -- Stream ID (offset 4-7) --
    let stream_id = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);

    // -- Class ID (offset 8-15): OUI, information class, packet class --
    let class_upper = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
    let class_oui = (class_upper >> 8) & 0x00FF_FFFF;

    let class_lower = u32::from_be_bytes([data[12], data[13], data[14], data[15]]);
    let information_class = ((class_lower >> 16) & 0xFFFF) as u16;
    let packet_class_code = (class_lower & 0xFFFF) as u16;

    if class_id_present && class_oui != FLEX_OUI {
        tracing::warn!(
            oui = format!("0x{class_oui:06X}"),
            "VITA packet OUI does not match FlexRadio"
        );
    }

    // -- Timestamps (offset 16-27) --
    let timestamp_int = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
    let timestamp_frac = u64::from_be_bytes([
        data[20], data[21], data[22], data[23], data[24], data[25], data[26], data[27],
    ]);

    let header = VitaHeader {
        packet_type,
        class_id_present,
        trailer_present,
        packet_count,
        packet_size_words,
        stream_id,
        class_oui,
        information_class,
        packet_class_code,
        class: PacketClass::from_code(packet_class_code),
        timestamp_int,
        timestamp_frac,
    };

    Ok(VitaPacket {
        header,
        payload: &data[VITA_HEADER_SIZE..packet_size_bytes],
    })
}

/// Encode a VITA-49 packet for transmission (outbound DAX TX audio, test
/// fixtures).
///
/// The payload is padded to a 32-bit word boundary with zero bytes, matching
/// what the radio accepts. `packet_count` is masked to its 4-bit field.
pub fn encode(
    class: PacketClass,
    stream_id: StreamId,
    packet_count: u8,
    timestamp_int: u32,
    timestamp_frac: u64,
    payload: &[u8],
) -> Vec<u8> {
    let padded_len = (payload.len() + 3) & !3;
    let total_bytes = VITA_HEADER_SIZE + padded_len;
    let size_words = (total_bytes / 4) as u32;

    let mut pkt = Vec::with_capacity(total_bytes);

    // Header word: type 0x3, class id present, TSI = UTC, TSF = sample count.
    let mut hw: u32 = 0;
    hw |= 0x3 << 28;
    hw |= 1 << 27;
    hw |= 0x01 << 22;
    hw |= 0x01 << 20;
    hw |= ((packet_count as u32) & 0x0F) << 12;
    hw |= size_words & 0x0FFF;
    pkt.extend_from_slice(&hw.to_be_bytes());

    pkt.extend_from_slice(&stream_id.to_be_bytes());
    pkt.extend_from_slice(&(FLEX_OUI << 8).to_be_bytes());

    let class_lower: u32 = ((FLEX_INFORMATION_CLASS as u32) << 16) | class.code() as u32;
    pkt.extend_from_slice(&class_lower.to_be_bytes());

    pkt.extend_from_slice(&timestamp_int.to_be_bytes());
    pkt.extend_from_slice(&timestamp_frac.to_be_bytes());

    pkt.extend_from_slice(payload);
    pkt.resize(total_bytes, 0);
    pkt
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- class codes --------------------------------------------------------

    #[test]
    fn class_code_table() {
        let codes: &[(u16, PacketClass)] = &[
            (0x8002, PacketClass::Meter),
            (0x8003, PacketClass::Panadapter),
            (0x8004, PacketClass::Waterfall),
            (0x8005, PacketClass::Opus),
            (0x0123, PacketClass::DaxReducedBw),
            (0x02E3, PacketClass::DaxIq24),
            (0x02E4, PacketClass::DaxIq48),
            (0x02E5, PacketClass::DaxIq96),
            (0x02E6, PacketClass::DaxIq192),
            (0x03E3, PacketClass::DaxAudio),
            (0xFFFF, PacketClass::Discovery),
        ];
        for &(code, class) in codes {
            assert_eq!(PacketClass::from_code(code), class, "code 0x{code:04X}");
            assert_eq!(class.code(), code, "class {class:?}");
        }
        assert_eq!(PacketClass::from_code(0x1234), PacketClass::Unknown(0x1234));
        assert_eq!(PacketClass::Unknown(0x1234).code(), 0x1234);
    }

    // -- round trip ---------------------------------------------------------

    #[test]
    fn encode_decode_round_trip() {
        let payload = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let pkt = encode(
            PacketClass::Meter,
            0xAABB_CCDD,
            5,
            1_700_000_000,
            500_000_000_000,
            &payload,
        );

        let parsed = decode(&pkt).unwrap();
        assert_eq!(parsed.header.packet_type, 0x3);
        assert!(parsed.header.class_id_present);
        assert!(!parsed.header.trailer_present);
        assert_eq!(parsed.header.packet_count, 5);
        assert_eq!(parsed.header.stream_id, 0xAABB_CCDD);
        assert_eq!(parsed.header.class_oui, FLEX_OUI);
        assert_eq!(parsed.header.information_class, FLEX_INFORMATION_CLASS);
        assert_eq!(parsed.header.class, PacketClass::Meter);
        assert_eq!(parsed.header.timestamp_int, 1_700_000_000);
        assert_eq!(parsed.header.timestamp_frac, 500_000_000_000);
        assert_eq!(parsed.payload, &payload);
    }

    #[test]
    fn encode_pads_payload_to_word_boundary() {
        let pkt = encode(PacketClass::DaxAudio, 1, 0, 0, 0, &[0xAA; 5]);
        assert_eq!(pkt.len(), VITA_HEADER_SIZE + 8);

        let parsed = decode(&pkt).unwrap();
        assert_eq!(parsed.payload.len(), 8);
        assert_eq!(&parsed.payload[..5], &[0xAA; 5]);
        assert_eq!(&parsed.payload[5..], &[0, 0, 0]);
    }

    #[test]
    fn encode_masks_packet_count() {
        let pkt = encode(PacketClass::Meter, 0, 0x1F, 0, 0, &[]);
        let parsed = decode(&pkt).unwrap();
        assert_eq!(parsed.header.packet_count, 0x0F);
    }

    #[test]
    fn header_only_packet() {
        let pkt = encode(PacketClass::Panadapter, 0x4000_0001, 0, 0, 0, &[]);
        assert_eq!(pkt.len(), VITA_HEADER_SIZE);

        let parsed = decode(&pkt).unwrap();
        assert!(parsed.payload.is_empty());
        assert_eq!(parsed.header.packet_size_words, 7);
    }

    // -- decode error cases -------------------------------------------------

    #[test]
    fn reject_truncated() {
        assert!(decode(&[0u8; 27]).is_err());
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn reject_declared_size_exceeding_buffer() {
        let mut pkt = encode(PacketClass::Meter, 0, 0, 0, 0, &[0u8; 8]);
        // Truncate the buffer below the declared size.
        pkt.truncate(VITA_HEADER_SIZE + 4);
        let err = decode(&pkt).unwrap_err();
        assert!(err.to_string().contains("exceeds buffer"));
    }

    #[test]
    fn reject_declared_size_below_header() {
        let mut pkt = encode(PacketClass::Meter, 0, 0, 0, 0, &[]);
        // Rewrite the size field to 3 words (12 bytes), below the header size.
        let hw = u32::from_be_bytes([pkt[0], pkt[1], pkt[2], pkt[3]]);
        let bad = (hw & !0x0FFF) | 3;
        pkt[0..4].copy_from_slice(&bad.to_be_bytes());
        assert!(decode(&pkt).is_err());
    }

    #[test]
    fn ignores_trailing_padding_beyond_declared_size() {
        let mut pkt = encode(PacketClass::Meter, 0x01, 0, 0, 0, &[9u8; 4]);
        pkt.extend_from_slice(&[0xFF; 36]);

        let parsed = decode(&pkt).unwrap();
        assert_eq!(parsed.payload, &[9u8; 4]);
    }

    #[test]
    fn decode_payload_stays_raw() {
        // Big-endian u16 0x0102 in the payload must come back as raw bytes,
        // untouched by the codec.
        let pkt = encode(PacketClass::Panadapter, 0, 0, 0, 0, &[0x01, 0x02, 0x03, 0x04]);
        let parsed = decode(&pkt).unwrap();
        assert_eq!(parsed.payload, &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn foreign_oui_still_decodes() {
        // A non-Flex OUI is logged but not rejected; some test generators
        // use a zero OUI.
        let mut pkt = encode(PacketClass::Meter, 0, 0, 0, 0, &[]);
        pkt[8..12].copy_from_slice(&0u32.to_be_bytes());
        let parsed = decode(&pkt).unwrap();
        assert_eq!(parsed.header.class_oui, 0);
    }

    #[test]
    fn stream_id_and_timestamps() {
        let pkt = encode(
            PacketClass::Waterfall,
            0xDEAD_BEEF,
            0,
            1_700_100_200,
            42_000_000_000,
            &[],
        );
        let parsed = decode(&pkt).unwrap();
        assert_eq!(parsed.header.stream_id, 0xDEAD_BEEF);
        assert_eq!(parsed.header.timestamp_int, 1_700_100_200);
        assert_eq!(parsed.header.timestamp_frac, 42_000_000_000);
    }

    #[test]
    fn packet_count_range() {
        for count in 0..16u8 {
            let pkt = encode(PacketClass::Meter, 0, count, 0, 0, &[]);
            assert_eq!(decode(&pkt).unwrap().header.packet_count, count);
        }
    }
}
