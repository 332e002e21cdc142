//! Display conversion helpers for amplifier volume.
//!
//! The status packet carries a raw volume byte. Front ends (sliders, status
//! lines) need that byte in decibels, which is a simple affine mapping and
//! unrelated to the non-linear register used by volume *commands*.

/// Raw volume byte that corresponds to 0 dB.
pub const ZERO_DB_REGISTER: u8 = 195;

/// Convert a raw status volume byte to decibels.
///
/// Each step of the byte is 0.5 dB, with 195 mapping to 0 dB.
///
/// # Example
///
/// ```
/// use devimote_core::register_to_db;
///
/// assert_eq!(register_to_db(195), 0.0);
/// assert_eq!(register_to_db(150), -22.5);
/// assert_eq!(register_to_db(0), -97.5);
/// ```
pub fn register_to_db(raw: u8) -> f64 {
    (f64::from(raw) - f64::from(ZERO_DB_REGISTER)) / 2.0
}

/// Format a raw volume byte as a decibel string with one decimal, e.g.
/// `"-22.5dB"` or `"-10.0dB"`.
///
/// # Example
///
/// ```
/// use devimote_core::format_volume_db;
///
/// assert_eq!(format_volume_db(150), "-22.5dB");
/// assert_eq!(format_volume_db(175), "-10.0dB");
/// ```
pub fn format_volume_db(raw: u8) -> String {
    format!("{:.1}dB", register_to_db(raw))
}
