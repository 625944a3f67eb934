//! Tracking notch filter model.
//!
//! ```text
//! tnf 1 freq=14.101500 depth=2 width=0.000100 permanent=0
//! ```

use flex6k_core::parse_bool;

use super::{KeyValue, RadioObject};

/// One tracking notch filter, keyed by its decimal id.
#[derive(Debug, Clone, Default)]
pub struct Tnf {
    id: u32,
    /// Notch center frequency in MHz.
    pub frequency_mhz: f64,
    /// Depth setting 1-3.
    pub depth: u32,
    /// Width in MHz.
    pub width_mhz: f64,
    /// Whether the notch persists across band changes.
    pub permanent: bool,
}

impl RadioObject for Tnf {
    type Id = u32;
    const TYPE_NAME: &'static str = "tnf";

    fn new(id: u32) -> Tnf {
        Tnf {
            id,
            ..Tnf::default()
        }
    }

    fn id(&self) -> &u32 {
        &self.id
    }

    fn parse_id(token: &str) -> Option<u32> {
        token.parse().ok()
    }

    fn apply(&mut self, properties: &[KeyValue]) {
        for (key, value) in properties {
            match key.as_str() {
                "freq" => self.frequency_mhz = value.parse().unwrap_or(self.frequency_mhz),
                "depth" => self.depth = value.parse().unwrap_or(self.depth),
                "width" => self.width_mhz = value.parse().unwrap_or(self.width_mhz),
                "permanent" => self.permanent = parse_bool(value),
                _ => {
                    tracing::warn!(key = %key, value = %value, "Tnf: unknown property");
                }
            }
        }
    }

    fn initialized(&self) -> bool {
        self.frequency_mhz != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flex6k_proto::key_values;

    #[test]
    fn apply_and_initialize() {
        let mut t = Tnf::new(1);
        assert!(!t.initialized());
        t.apply(&key_values("freq=14.101500 depth=2 width=0.000100 permanent=1", ' '));
        assert!(t.initialized());
        assert_eq!(t.depth, 2);
        assert!(t.permanent);
    }
}
