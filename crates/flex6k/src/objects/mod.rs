//! Typed radio-side object models populated from status messages.
//!
//! Each type here mirrors one object the radio reports over the status
//! feed: keyed, dynamic objects (slices, panadapters, meters, ...) and
//! static singletons (transmit, interlock, wan). The generic add/update/
//! remove machinery that routes status text into these types lives in
//! [`crate::registry`]; the types themselves only know how to parse their
//! own id and apply their own key/value pairs.
//!
//! Property parsing is fault-isolated per key: an unknown key is logged and
//! skipped, a malformed value leaves the field unchanged. The radio adds
//! keys across firmware versions and a client must keep working.

pub mod amplifier;
pub mod interlock;
pub mod meter;
pub mod panadapter;
pub mod slice;
pub mod tnf;
pub mod transmit;
pub mod waterfall;
pub mod wan;

pub use amplifier::Amplifier;
pub use interlock::Interlock;
pub use meter::{Meter, MeterUnits};
pub use panadapter::Panadapter;
pub use slice::Slice;
pub use tnf::Tnf;
pub use transmit::Transmit;
pub use waterfall::Waterfall;
pub use wan::Wan;

use flex6k_proto::key_values;

/// One parsed `key=value` pair from a status message.
pub type KeyValue = (String, String);

/// A keyed, dynamically created/removed radio object.
///
/// Implementors define how their id is spelled in status text, which
/// delimiter their key/value pairs use, what marks a removal, and when the
/// object has seen enough fields to be considered ready for consumers.
pub trait RadioObject: Send + Sync + Sized + 'static {
    /// The device-assigned identifier type (numeric index, stream id, or
    /// connection handle depending on the object).
    type Id: Clone + Eq + std::hash::Hash + std::fmt::Debug + Send + Sync;

    /// Type token as it appears in status lines, used for logging.
    const TYPE_NAME: &'static str;

    /// Construct a default object for a newly seen id.
    fn new(id: Self::Id) -> Self;

    /// The object's id.
    fn id(&self) -> &Self::Id;

    /// Parse the id from its status-text spelling.
    fn parse_id(token: &str) -> Option<Self::Id>;

    /// Delimiter between key/value pairs (meters use `'#'`).
    fn delimiter() -> char {
        ' '
    }

    /// Whether this raw status message marks the object's removal.
    fn is_removal(message: &str) -> bool {
        message.contains("removed")
    }

    /// Split a raw status message (type token already stripped) into the
    /// object id and its key/value pairs.
    ///
    /// The default takes the first whitespace token as the id and splits
    /// the remainder on [`delimiter`](RadioObject::delimiter). Types whose
    /// id is embedded differently (meters) override this.
    fn parse_status(message: &str) -> Option<(Self::Id, Vec<KeyValue>)> {
        let message = message.trim();
        let (id_token, rest) = match message.find(' ') {
            Some(space) => (&message[..space], &message[space + 1..]),
            None => (message, ""),
        };
        let id = Self::parse_id(id_token)?;
        Some((id, key_values(rest, Self::delimiter())))
    }

    /// Apply key/value pairs to the object in place.
    fn apply(&mut self, properties: &[KeyValue]);

    /// Whether the type's minimal field set has been observed.
    fn initialized(&self) -> bool;
}

/// A static singleton object (one instance per radio, never removed).
pub trait StaticObject: Default + Send + Sync + 'static {
    /// Type token as it appears in status lines.
    const TYPE_NAME: &'static str;

    /// Delimiter between key/value pairs.
    fn delimiter() -> char {
        ' '
    }

    /// Apply key/value pairs to the object in place.
    fn apply(&mut self, properties: &[KeyValue]);
}
