/// Byte order of the RGB565 palette entries handed to the draw sink.
///
/// SPI-driven panels usually clock the high byte first, so hosts feeding
/// such a display pick `Swapped` and can push palette lookups out verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaletteOrder {
    /// Entries are stored as native little-endian `u16` values.
    #[default]
    Native,
    /// Each entry is byte-swapped at palette load time.
    Swapped,
}

/// Packs a 24-bit RGB triplet into RGB565: top 5 bits of red, 6 of green,
/// 5 of blue.
pub fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    (r as u16 & 0xF8) << 8 | (g as u16 & 0xFC) << 3 | b as u16 >> 3
}

/// Widens an RGB565 entry back to an RGB triplet (low bits zero).
pub fn rgb_from_565(c: u16) -> (u8, u8, u8) {
    (
        ((c >> 11) as u8) << 3,
        ((c >> 5) as u8 & 0x3F) << 2,
        (c as u8 & 0x1F) << 3,
    )
}
