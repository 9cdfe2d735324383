//! Chat message text.

use crate::detector::PriceMove;
use crate::snapshot::QuoteSnapshot;
use num_format::{Locale, ToFormattedString};

pub const CURRENCY: &str = "IRR";

/// `1015000` -> `"1,015,000"`.
pub fn format_rials(value: i64) -> String {
    value.to_formatted_string(&Locale::en)
}

/// One alert per instrument move.
pub fn alert_message(price_move: &PriceMove) -> String {
    let arrow = if price_move.delta() >= 0 { "📈" } else { "📉" };
    format!(
        "📢 {} price changed!\n{arrow} New price: {} {CURRENCY} (was {})",
        price_move.instrument.label(),
        format_rials(price_move.current),
        format_rials(price_move.previous),
    )
}

/// Listing of every instrument in the snapshot, absent ones marked unavailable.
pub fn snapshot_listing(snapshot: &QuoteSnapshot) -> String {
    let mut msg = String::from("💹 Live prices:\n");
    for (instrument, value) in snapshot.iter() {
        match value {
            Some(v) => msg.push_str(&format!(
                "{}: {} {CURRENCY}\n",
                instrument.label(),
                format_rials(v)
            )),
            None => msg.push_str(&format!("{}: unavailable\n", instrument.label())),
        }
    }
    msg
}
