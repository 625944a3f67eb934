//! SmartSDR TCP line protocol encoding and decoding.
//!
//! The command channel is newline-terminated ASCII on TCP port 4992.
//!
//! # Line formats
//!
//! ```text
//! Command:   C<seq>|<command text>\n
//! Reply:     R<seq>|<hex_code>|<data>\n
//! Status:    S<hex_handle>|<object> <key>=<value> ...\n
//! Message:   M<hex_code>|<text>\n
//! Version:   V<text>\n
//! Handle:    H<hex_handle>\n
//! ```
//!
//! The first character is case-insensitive; the radio emits upper case but
//! older firmware has been seen emitting lower case after a reboot.

use flex6k_core::{parse_handle, Error, Handle, Result, SequenceNumber};

// ---------------------------------------------------------------------------
// Command encoding
// ---------------------------------------------------------------------------

/// Encode a command with the given sequence number: `C<seq>|<command>\n`.
pub fn encode_command(seq: SequenceNumber, command: &str) -> Vec<u8> {
    format!("C{seq}|{command}\n").into_bytes()
}

// ---------------------------------------------------------------------------
// Inbound line types
// ---------------------------------------------------------------------------

/// A decoded reply to a previously-sent command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Sequence number correlating this reply to the originating command.
    pub sequence: SequenceNumber,
    /// Error code. `0` means success; non-zero is a device error code.
    pub code: u32,
    /// Reply data (may be empty). For `slice create` this is the new id.
    pub data: String,
}

/// A decoded status line (unsolicited, pushed after subscription).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// The client handle this status was addressed to.
    pub handle: Handle,
    /// The object type token (first word: `"slice"`, `"meter"`, ...).
    pub object: String,
    /// Everything after the type token, untouched. Per-type parsers split
    /// this with their own delimiter.
    pub message: String,
}

/// Lines received from the SmartSDR TCP stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TcpMessage {
    /// Handshake hardware/protocol version: `V3.3.32.0`.
    Version(String),
    /// Handshake client handle: `H1A2B3C4D`.
    Handle(Handle),
    /// Reply to a command: `R<seq>|<code>|<data>`.
    Reply(Reply),
    /// Unsolicited status update: `S<handle>|<object> <kv>...`.
    Status(Status),
    /// Radio message/log line: `M<code>|<text>`.
    Message { code: u32, text: String },
    /// An unrecognised line, preserved for logging.
    Unknown(String),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a single line received from the TCP stream.
///
/// The line should not include the trailing `\n`; surrounding whitespace is
/// stripped for robustness. Empty lines are an error so read loops can skip
/// them explicitly.
pub fn parse_line(line: &str) -> Result<TcpMessage> {
    let line = line.trim();
    if line.is_empty() {
        return Err(Error::Protocol("empty line".into()));
    }

    match line.as_bytes()[0] {
        b'V' | b'v' => Ok(TcpMessage::Version(line[1..].to_string())),
        b'H' | b'h' => parse_handle_line(line),
        b'R' | b'r' => parse_reply(line),
        b'S' | b's' => parse_status(line),
        b'M' | b'm' => parse_message_line(line),
        _ => Ok(TcpMessage::Unknown(line.to_string())),
    }
}

/// Parse a handle line: `H<hex>`.
fn parse_handle_line(line: &str) -> Result<TcpMessage> {
    let body = &line[1..];
    let handle = parse_handle(body)
        .ok_or_else(|| Error::Protocol(format!("invalid hex handle: {body}")))?;
    Ok(TcpMessage::Handle(handle))
}

/// Parse a reply line: `R<seq>|<hex_code>|<data>`.
fn parse_reply(line: &str) -> Result<TcpMessage> {
    let body = &line[1..];
    let mut parts = body.splitn(3, '|');

    let seq_str = parts.next().unwrap_or("");
    let sequence = seq_str
        .parse::<u32>()
        .map_err(|_| Error::Protocol(format!("invalid reply sequence number: {seq_str}")))?;

    let code_str = parts
        .next()
        .ok_or_else(|| Error::Protocol(format!("malformed reply (no code): {line}")))?;
    let code = u32::from_str_radix(code_str, 16)
        .map_err(|_| Error::Protocol(format!("invalid reply code: {code_str}")))?;

    let data = parts.next().unwrap_or("").to_string();

    Ok(TcpMessage::Reply(Reply {
        sequence,
        code,
        data,
    }))
}

/// Parse a status line: `S<hex_handle>|<object> [<rest>]`.
///
/// Only the addressed handle and the object type token are interpreted here.
/// The remainder is returned verbatim because delimiters and id placement
/// vary by object type.
fn parse_status(line: &str) -> Result<TcpMessage> {
    let body = &line[1..];
    let pipe = body
        .find('|')
        .ok_or_else(|| Error::Protocol(format!("malformed status (no pipe): {line}")))?;

    let handle_str = &body[..pipe];
    let handle = parse_handle(handle_str)
        .ok_or_else(|| Error::Protocol(format!("invalid status handle: {handle_str}")))?;

    let payload = body[pipe + 1..].trim();
    let (object, message) = match payload.find(' ') {
        Some(space) => (&payload[..space], payload[space + 1..].trim_start()),
        None => (payload, ""),
    };
    if object.is_empty() {
        return Err(Error::Protocol(format!("status with empty type: {line}")));
    }

    Ok(TcpMessage::Status(Status {
        handle,
        object: object.to_string(),
        message: message.to_string(),
    }))
}

/// Parse a message line: `M<hex_code>|<text>`.
///
/// The code's low byte carries the severity the radio assigned.
fn parse_message_line(line: &str) -> Result<TcpMessage> {
    let body = &line[1..];
    let pipe = body
        .find('|')
        .ok_or_else(|| Error::Protocol(format!("malformed message (no pipe): {line}")))?;

    let code = u32::from_str_radix(&body[..pipe], 16).unwrap_or(0);
    Ok(TcpMessage::Message {
        code,
        text: body[pipe + 1..].to_string(),
    })
}

// ---------------------------------------------------------------------------
// Key/value splitting
// ---------------------------------------------------------------------------

/// Split status/reply text into `(key, value)` pairs.
///
/// Pairs are separated by `delimiter` -- a space for most messages, `'#'`
/// for meter and gps status, `','` for the `info` reply, `'='` for the
/// waveform message. Within a pair the first `'='` separates key from value;
/// a token with no `'='` yields an empty value (some removal markers are
/// bare words). Empty tokens are skipped.
pub fn key_values(text: &str, delimiter: char) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for token in text.split(delimiter) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.find('=') {
            Some(eq) => pairs.push((token[..eq].to_string(), token[eq + 1..].to_string())),
            None => pairs.push((token.to_string(), String::new())),
        }
    }
    pairs
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
