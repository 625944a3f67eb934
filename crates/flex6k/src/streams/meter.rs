//! Meter stream payload decoding.
//!
//! Meter packets are flat arrays of 4-byte records: a big-endian `u16`
//! meter id followed by a big-endian `i16` raw value. No reassembly is
//! involved; every packet is self-contained.

use flex6k_core::{Error, Result};

/// One raw meter reading from a meter packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterReading {
    /// Runtime-assigned meter id.
    pub id: u16,
    /// Raw signed value; scale with the meter's units.
    pub raw: i16,
}

/// Decode a meter packet payload into readings.
///
/// Radio firmware (seen up through v2.2.8) sometimes repeats a meter id
/// within a single packet; duplicates after the first are dropped here.
/// This workaround is specific to the meter stream and deliberately not
/// applied to any other stream type.
pub fn decode_meter_payload(payload: &[u8]) -> Result<Vec<MeterReading>> {
    if payload.len() % 4 != 0 {
        return Err(Error::Codec(format!(
            "meter payload length {} is not divisible by 4",
            payload.len()
        )));
    }

    let count = payload.len() / 4;
    let mut readings: Vec<MeterReading> = Vec::with_capacity(count);

    for i in 0..count {
        let offset = i * 4;
        let id = u16::from_be_bytes([payload[offset], payload[offset + 1]]);
        let raw = i16::from_be_bytes([payload[offset + 2], payload[offset + 3]]);

        if readings.iter().any(|r| r.id == id) {
            continue;
        }
        readings.push(MeterReading { id, raw });
    }

    Ok(readings)
}
