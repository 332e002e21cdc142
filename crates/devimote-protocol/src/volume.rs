//! Decibel to volume-register conversion for set-volume commands.
//!
//! The amplifier takes a 16-bit attenuation register in its volume command.
//! The register is built up in 0.5 dB steps: 0.5 dB is `0x3F00`, and every
//! further half decibel `a` adds `256 >> ceil(1 + log2(a))`. Bit `0x8000`
//! marks attenuation (negative dB). The amplifier uses the register as an
//! index into its own attenuation table, so the step arithmetic has to be
//! reproduced exactly.
//!
//! The display conversion in the other direction lives in
//! [`devimote_core::register_to_db`].

/// Highest volume the engine will ever request, in dB.
pub const VOLUME_CEILING_DB: f64 = -10.0;

/// Sign bit of the volume register.
pub const ATTENUATION_FLAG: u16 = 0x8000;

/// Register magnitude for exactly 0.5 dB.
const HALF_DB_REGISTER: u16 = 0x3F00;

/// Steps above this magnitude contribute `256 >> 9 == 0`.
const MAX_CONTRIBUTING_DB: f64 = 128.0;

/// Encode `db` as a volume register.
///
/// `db` is first rounded to the nearest 0.5 dB step. No ceiling is applied
/// here; volume commands cap their input at [`VOLUME_CEILING_DB`] before
/// calling this.
///
/// # Example
///
/// ```
/// use devimote_protocol::volume::db_to_register;
///
/// assert_eq!(db_to_register(0.0), 0);
/// assert_eq!(db_to_register(-0.5), 0xBF00);
/// assert_eq!(db_to_register(-10.0), 0xC120);
/// assert_eq!(db_to_register(-22.5), 0xC1B4);
/// ```
pub fn db_to_register(db: f64) -> u16 {
    let mut magnitude = ((db.abs() * 2.0).round() / 2.0).min(MAX_CONTRIBUTING_DB);
    let mut register: u16 = 0;

    while magnitude > 0.5 {
        let shift = (1.0 + magnitude.log2()).ceil() as u32;
        register += (256u32 >> shift) as u16;
        magnitude -= 0.5;
    }
    if magnitude == 0.5 {
        register += HALF_DB_REGISTER;
    }

    if db < 0.0 {
        register |= ATTENUATION_FLAG;
    }
    register
}
