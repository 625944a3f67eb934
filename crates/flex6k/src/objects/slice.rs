//! Slice receiver model.
//!
//! A slice is one independent demodulating receiver bound to a panadapter.
//! Status example:
//!
//! ```text
//! slice 3 in_use=1 RF_frequency=14.250000 pan=0x40000001 mode=USB ...
//! ```
//!
//! The removal marker is `in_use=0` rather than the usual `removed`.

use flex6k_core::{parse_bool, parse_handle, Handle, StreamId};

use super::{KeyValue, RadioObject};

/// One slice receiver, keyed by its decimal slice index.
#[derive(Debug, Clone, Default)]
pub struct Slice {
    id: u32,
    /// Handle of the client that owns this slice.
    pub client_handle: Handle,
    /// Stream id of the panadapter this slice sits on.
    pub panadapter: StreamId,
    /// Receive frequency in MHz, as the radio reports it.
    pub frequency_mhz: f64,
    /// Demodulation mode string (`"USB"`, `"CW"`, `"DIGU"`, ...).
    pub mode: String,
    /// Lower filter edge in Hz.
    pub filter_lo: i32,
    /// Upper filter edge in Hz.
    pub filter_hi: i32,
    /// Receive antenna port.
    pub rx_ant: String,
    /// Transmit antenna port.
    pub tx_ant: String,
    /// Whether this is the active (focused) slice.
    pub active: bool,
    /// Whether this slice is designated for transmit.
    pub tx_enabled: bool,
    /// AGC mode string (`"off"`, `"slow"`, `"med"`, `"fast"`).
    pub agc_mode: String,
    /// Audio gain 0-100.
    pub audio_gain: i32,
    /// Whether slice audio is muted.
    pub audio_mute: bool,
    /// RIT enabled / offset in Hz.
    pub rit_enabled: bool,
    pub rit_offset: i32,
    /// XIT enabled / offset in Hz.
    pub xit_enabled: bool,
    pub xit_offset: i32,
    /// DAX channel assignment (0 = none).
    pub dax_channel: u32,
    /// Raw `in_use` flag from the radio.
    pub in_use: bool,
}

enum Property {
    Active,
    AgcMode,
    AudioGain,
    AudioMute,
    ClientHandle,
    DaxChannel,
    FilterHi,
    FilterLo,
    InUse,
    Mode,
    Panadapter,
    RfFrequency,
    RitEnabled,
    RitOffset,
    RxAnt,
    TxAnt,
    TxEnabled,
    XitEnabled,
    XitOffset,
}

impl Property {
    fn from_token(token: &str) -> Option<Property> {
        Some(match token {
            "active" => Property::Active,
            "agc_mode" => Property::AgcMode,
            "audio_gain" => Property::AudioGain,
            "audio_mute" => Property::AudioMute,
            "client_handle" => Property::ClientHandle,
            "dax" => Property::DaxChannel,
            "filter_hi" => Property::FilterHi,
            "filter_lo" => Property::FilterLo,
            "in_use" => Property::InUse,
            "mode" => Property::Mode,
            "pan" => Property::Panadapter,
            "RF_frequency" | "rf_frequency" => Property::RfFrequency,
            "rit_on" => Property::RitEnabled,
            "rit_freq" => Property::RitOffset,
            "rxant" => Property::RxAnt,
            "txant" => Property::TxAnt,
            "tx" => Property::TxEnabled,
            "xit_on" => Property::XitEnabled,
            "xit_freq" => Property::XitOffset,
            _ => return None,
        })
    }
}

impl RadioObject for Slice {
    type Id = u32;
    const TYPE_NAME: &'static str = "slice";

    fn new(id: u32) -> Slice {
        Slice {
            id,
            ..Slice::default()
        }
    }

    fn id(&self) -> &u32 {
        &self.id
    }

    fn parse_id(token: &str) -> Option<u32> {
        token.parse().ok()
    }

    fn is_removal(message: &str) -> bool {
        message.contains("in_use=0")
    }

    fn apply(&mut self, properties: &[KeyValue]) {
        for (key, value) in properties {
            let Some(token) = Property::from_token(key) else {
                tracing::warn!(key = %key, value = %value, "Slice: unknown property");
                continue;
            };
            match token {
                Property::Active => self.active = parse_bool(value),
                Property::AgcMode => self.agc_mode = value.clone(),
                Property::AudioGain => self.audio_gain = value.parse().unwrap_or(self.audio_gain),
                Property::AudioMute => self.audio_mute = parse_bool(value),
                Property::ClientHandle => {
                    self.client_handle = parse_handle(value).unwrap_or(self.client_handle)
                }
                Property::DaxChannel => self.dax_channel = value.parse().unwrap_or(self.dax_channel),
                Property::FilterHi => self.filter_hi = value.parse().unwrap_or(self.filter_hi),
                Property::FilterLo => self.filter_lo = value.parse().unwrap_or(self.filter_lo),
                Property::InUse => self.in_use = parse_bool(value),
                Property::Mode => self.mode = value.clone(),
                Property::Panadapter => {
                    self.panadapter = parse_handle(value).unwrap_or(self.panadapter)
                }
                Property::RfFrequency => {
                    self.frequency_mhz = value.parse().unwrap_or(self.frequency_mhz)
                }
                Property::RitEnabled => self.rit_enabled = parse_bool(value),
                Property::RitOffset => self.rit_offset = value.parse().unwrap_or(self.rit_offset),
                Property::RxAnt => self.rx_ant = value.clone(),
                Property::TxAnt => self.tx_ant = value.clone(),
                Property::TxEnabled => self.tx_enabled = parse_bool(value),
                Property::XitEnabled => self.xit_enabled = parse_bool(value),
                Property::XitOffset => self.xit_offset = value.parse().unwrap_or(self.xit_offset),
            }
        }
    }

    /// Ready once the identifying trio has been observed: the owning
    /// panadapter, a non-zero frequency, and a mode.
    fn initialized(&self) -> bool {
        self.panadapter != 0 && self.frequency_mhz != 0.0 && !self.mode.is_empty()
    }
}

impl Slice {
    /// Receive frequency in Hz.
    pub fn frequency_hz(&self) -> u64 {
        (self.frequency_mhz * 1_000_000.0).round() as u64
    }
}
