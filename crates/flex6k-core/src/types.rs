//! Protocol identifier aliases and lenient value parsing.
//!
//! SmartSDR identifies everything by small integers rendered as text:
//! connection handles and stream ids are 32-bit hex (with or without a
//! leading `0x`), sequence numbers are decimal. Status values use a handful
//! of boolean spellings. The helpers here are deliberately forgiving --
//! status application isolates faults per key, so a malformed value should
//! yield `None`/default rather than abort a parse loop.

/// A device-assigned opaque identifier for one connected client session.
pub type Handle = u32;

/// Monotonically increasing integer tagging an outbound command for reply
/// correlation.
pub type SequenceNumber = u32;

/// UDP telemetry multiplexing key; also the id of panadapter/waterfall
/// objects in status messages.
pub type StreamId = u32;

/// Parse a hex handle or stream id, accepting `"0x40000001"`, `"40000001"`,
/// and shorter forms like `"1A"`.
pub fn parse_handle(s: &str) -> Option<Handle> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u32::from_str_radix(digits, 16).ok()
}

/// Format a handle the way the radio prints them: `0x` + 8 upper-case hex
/// digits.
pub fn format_handle(handle: Handle) -> String {
    format!("0x{handle:08X}")
}

/// Parse a status boolean. The radio uses `1`/`0` almost everywhere but
/// `T`/`F` and full words appear in a few legacy messages.
pub fn parse_bool(s: &str) -> bool {
    matches!(s, "1" | "T" | "t" | "true" | "True" | "TRUE")
}
