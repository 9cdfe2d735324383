//! The fixed catalog of tracked instruments.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// A named quantity tracked for alerts. Values are integer rials.
///
/// Declaration order is the display order of snapshot listings.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum Instrument {
    Usd,
    Eur,
    Gold18,
    Btc,
    Eth,
}

impl Instrument {
    /// Human readable name used in chat messages.
    pub fn label(self) -> &'static str {
        match self {
            Instrument::Usd => "US Dollar",
            Instrument::Eur => "Euro",
            Instrument::Gold18 => "Gold (18k, gram)",
            Instrument::Btc => "Bitcoin",
            Instrument::Eth => "Ethereum",
        }
    }

    pub fn all() -> Vec<Instrument> {
        Instrument::iter().collect()
    }

    /// Whether the instrument is a crypto asset.
    pub fn is_crypto(self) -> bool {
        matches!(self, Instrument::Btc | Instrument::Eth)
    }
}
