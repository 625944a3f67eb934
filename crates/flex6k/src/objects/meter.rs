//! Meter model and unit scaling.
//!
//! Meters are described over TCP and updated over UDP. The status form is
//! unusual twice over: pairs are `'#'`-delimited (values may contain
//! spaces) and every key carries the meter id as a prefix:
//!
//! ```text
//! meter 3.src=SLC#3.num=0#3.nam=LEVEL#3.low=-150.0#3.hi=20.0#3.unit=dBFS#3.fps=10
//! ```
//!
//! UDP meter packets then deliver raw `i16` readings which scale to the
//! meter's units by a per-unit denominator.

use super::{KeyValue, RadioObject};
use flex6k_proto::key_values;

/// Measurement units a meter reports, with their raw-value denominators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeterUnits {
    Db,
    Dbm,
    Dbfs,
    Swr,
    Volts,
    Amps,
    DegC,
    DegF,
    Rpm,
    Watts,
    Percent,
    #[default]
    None,
}

impl MeterUnits {
    /// Parse the `unit` status value (case-insensitive).
    pub fn from_token(token: &str) -> Option<MeterUnits> {
        Some(match token.to_ascii_lowercase().as_str() {
            "db" => MeterUnits::Db,
            "dbm" => MeterUnits::Dbm,
            "dbfs" => MeterUnits::Dbfs,
            "swr" => MeterUnits::Swr,
            "volts" => MeterUnits::Volts,
            "amps" => MeterUnits::Amps,
            "degc" => MeterUnits::DegC,
            "degf" => MeterUnits::DegF,
            "rpm" => MeterUnits::Rpm,
            "watts" => MeterUnits::Watts,
            "percent" => MeterUnits::Percent,
            "" => MeterUnits::None,
            _ => return None,
        })
    }

    /// Convert a raw streamed reading to this unit.
    pub fn scale(&self, raw: i16) -> f32 {
        match self {
            MeterUnits::Db | MeterUnits::Dbm | MeterUnits::Dbfs | MeterUnits::Swr => {
                raw as f32 / 128.0
            }
            MeterUnits::Volts | MeterUnits::Amps => raw as f32 / 256.0,
            MeterUnits::DegC | MeterUnits::DegF => raw as f32 / 64.0,
            MeterUnits::Rpm | MeterUnits::Watts | MeterUnits::Percent | MeterUnits::None => {
                raw as f32
            }
        }
    }
}

/// One meter, keyed by its runtime-assigned decimal id.
#[derive(Debug, Clone, Default)]
pub struct Meter {
    id: u32,
    /// Source subsystem: `"SLC"`, `"TX-"`, `"RAD"`, `"AMP"`.
    pub source: String,
    /// Source instance number (e.g. the slice index for `SLC`).
    pub number: String,
    /// Short name (`"LEVEL"`, `"SWR"`, `"FWDPWR"`, ...).
    pub name: String,
    /// Range low/high in scaled units.
    pub low: f32,
    pub high: f32,
    /// Human-readable description.
    pub description: String,
    /// Measurement units; selects the raw-value scaling.
    pub units: MeterUnits,
    /// Update rate in frames per second.
    pub fps: u32,
    /// Latest scaled value from the UDP meter stream.
    pub value: f32,
    seen: bool,
}

enum Property {
    Description,
    Fps,
    High,
    Low,
    Name,
    Number,
    Source,
    Units,
}

impl Property {
    fn from_token(token: &str) -> Option<Property> {
        Some(match token {
            "desc" => Property::Description,
            "fps" => Property::Fps,
            "hi" => Property::High,
            "low" => Property::Low,
            "nam" => Property::Name,
            "num" => Property::Number,
            "src" => Property::Source,
            "unit" => Property::Units,
            _ => return None,
        })
    }
}

impl RadioObject for Meter {
    type Id = u32;
    const TYPE_NAME: &'static str = "meter";

    fn new(id: u32) -> Meter {
        Meter {
            id,
            ..Meter::default()
        }
    }

    fn id(&self) -> &u32 {
        &self.id
    }

    fn parse_id(token: &str) -> Option<u32> {
        // Keys are "<id>.<prop>"; the id is everything before the dot.
        token.split('.').next()?.parse().ok()
    }

    fn delimiter() -> char {
        '#'
    }

    /// Meter status has no standalone id token; every key is prefixed with
    /// the id. Take it from the first pair and strip the prefix from all.
    fn parse_status(message: &str) -> Option<(u32, Vec<KeyValue>)> {
        let pairs = key_values(message.trim(), Self::delimiter());
        let id = Self::parse_id(&pairs.first()?.0)?;
        let prefix = format!("{id}.");
        let stripped = pairs
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&prefix).map(|k| (k.to_string(), value))
            })
            .collect();
        Some((id, stripped))
    }

    fn apply(&mut self, properties: &[KeyValue]) {
        for (key, value) in properties {
            let Some(token) = Property::from_token(key) else {
                tracing::warn!(key = %key, value = %value, "Meter: unknown property");
                continue;
            };
            match token {
                Property::Description => self.description = value.clone(),
                Property::Fps => self.fps = value.parse().unwrap_or(self.fps),
                Property::High => self.high = value.parse().unwrap_or(self.high),
                Property::Low => self.low = value.parse().unwrap_or(self.low),
                Property::Name => self.name = value.clone(),
                Property::Number => self.number = value.clone(),
                Property::Source => self.source = value.clone(),
                Property::Units => {
                    match MeterUnits::from_token(value) {
                        Some(units) => self.units = units,
                        None => {
                            tracing::warn!(units = %value, "Meter: unknown units");
                        }
                    }
                }
            }
        }
        self.seen = true;
    }

    fn initialized(&self) -> bool {
        self.seen
    }
}

impl Meter {
    /// Apply a raw streamed reading, converting to the meter's units.
    pub fn apply_raw(&mut self, raw: i16) {
        self.value = self.units.scale(raw);
    }
}
