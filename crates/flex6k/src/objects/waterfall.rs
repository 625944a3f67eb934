//! Waterfall display model.
//!
//! Arrives under `display waterfall 0x42000000 ...`, paired to a panadapter
//! by the `panadapter` key. The id is the stream id its lines arrive on.

use flex6k_core::{parse_bool, parse_handle, Handle, StreamId};

use super::{KeyValue, RadioObject};

/// One waterfall, keyed by its hex stream id.
#[derive(Debug, Clone, Default)]
pub struct Waterfall {
    id: StreamId,
    /// Handle of the owning client.
    pub client_handle: Handle,
    /// Stream id of the panadapter this waterfall is attached to.
    pub panadapter: StreamId,
    /// Line duration in milliseconds.
    pub line_duration: u32,
    /// Color gain 0-100.
    pub color_gain: u32,
    /// Automatic black-level tracking enabled.
    pub auto_black: bool,
    /// Manual black level 0-100.
    pub black_level: u32,
    /// Palette index.
    pub gradient_index: u32,
}

enum Property {
    AutoBlack,
    BlackLevel,
    ClientHandle,
    ColorGain,
    GradientIndex,
    LineDuration,
    Panadapter,
}

impl Property {
    fn from_token(token: &str) -> Option<Property> {
        Some(match token {
            "auto_black" => Property::AutoBlack,
            "black_level" => Property::BlackLevel,
            "client_handle" => Property::ClientHandle,
            "color_gain" => Property::ColorGain,
            "gradient_index" => Property::GradientIndex,
            "line_duration" => Property::LineDuration,
            "panadapter" => Property::Panadapter,
            _ => return None,
        })
    }
}

impl RadioObject for Waterfall {
    type Id = StreamId;
    const TYPE_NAME: &'static str = "waterfall";

    fn new(id: StreamId) -> Waterfall {
        Waterfall {
            id,
            ..Waterfall::default()
        }
    }

    fn id(&self) -> &StreamId {
        &self.id
    }

    fn parse_id(token: &str) -> Option<StreamId> {
        parse_handle(token)
    }

    fn apply(&mut self, properties: &[KeyValue]) {
        for (key, value) in properties {
            let Some(token) = Property::from_token(key) else {
                tracing::warn!(key = %key, value = %value, "Waterfall: unknown property");
                continue;
            };
            match token {
                Property::AutoBlack => self.auto_black = parse_bool(value),
                Property::BlackLevel => self.black_level = value.parse().unwrap_or(self.black_level),
                Property::ClientHandle => {
                    self.client_handle = parse_handle(value).unwrap_or(self.client_handle)
                }
                Property::ColorGain => self.color_gain = value.parse().unwrap_or(self.color_gain),
                Property::GradientIndex => {
                    self.gradient_index = value.parse().unwrap_or(self.gradient_index)
                }
                Property::LineDuration => {
                    self.line_duration = value.parse().unwrap_or(self.line_duration)
                }
                Property::Panadapter => {
                    self.panadapter = parse_handle(value).unwrap_or(self.panadapter)
                }
            }
        }
    }

    fn initialized(&self) -> bool {
        self.panadapter != 0
    }
}
