//! 8b/10b-decoded symbol representation.
//!
//! A [`Symbol`] is the 9-bit unit the SERDES hands up once it has already performed 8b/10b
//! decoding: 8 data bits plus one flag distinguishing a control (`K`) character from a data
//! (`D`) character. This module defines the bitfield itself plus the handful of named K/D
//! characters the training-sequence grammar (`parser`, `emitter`) matches against.

use bitbybit::bitfield;

/// A single 8b/10b-decoded symbol: 8 data bits (`x`) and a K/D flag (bit 8).
///
/// Encoding is bit-exact with the PCIe physical layer: `(k << 8) | (y << 5) | x` for a
/// `Kx.y`/`Dx.y` character. For data characters `k` is always `0`.
#[bitfield(u16)]
#[derive(Debug, PartialEq, Eq)]
pub struct Symbol {
    /// The 8 data bits of the decoded character.
    #[bits(0..=7, rw)]
    pub data: u8,

    /// `1` for a control (`K`) character, `0` for a data (`D`) character.
    #[bit(8, rw)]
    pub ctrl: bool,
}

impl Default for Symbol {
    fn default() -> Self {
        Self::new_with_raw_value(0)
    }
}

impl Symbol {
    /// Builds the symbol for the control character `Kx.y`.
    pub fn k(x: u8, y: u8) -> Self {
        Self::new_with_raw_value(0x100 | ((y as u16) << 5) | (x as u16))
    }

    /// Builds the symbol for the data character `Dx.y`.
    pub fn d(x: u8, y: u8) -> Self {
        Self::new_with_raw_value(((y as u16) << 5) | (x as u16))
    }

    /// `true` when this is a data (non-control) character, i.e. `sym[8] = 0`.
    pub fn is_data(self) -> bool {
        !self.ctrl()
    }

    /// The 9-bit raw value, suitable for equality comparisons against the constants below.
    pub fn raw9(self) -> u16 {
        self.raw_value() & 0x1ff
    }
}

/// Comma: `K28.5`, used to frame every training sequence and skip ordered set.
pub fn comma() -> Symbol {
    Symbol::k(28, 5)
}

/// Skip: `K28.0`, used for elastic-buffer padding between ordered sets.
pub fn skip() -> Symbol {
    Symbol::k(28, 0)
}

/// Pad: `K23.7`, placed in the Link or Lane field of a TS to mean "unassigned".
pub fn pad() -> Symbol {
    Symbol::k(23, 7)
}

/// TS1 identifier, non-inverted polarity.
pub fn d10_2() -> Symbol {
    Symbol::d(10, 2)
}

/// TS2 identifier, non-inverted polarity.
pub fn d5_2() -> Symbol {
    Symbol::d(5, 2)
}

/// TS1 identifier, inverted polarity.
pub fn d21_5() -> Symbol {
    Symbol::d(21, 5)
}

/// TS2 identifier, inverted polarity.
pub fn d26_5() -> Symbol {
    Symbol::d(26, 5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_exact_encoding() {
        assert_eq!(comma().raw9(), 0x1BC);
        assert_eq!(pad().raw9(), 0x1F7);
        assert_eq!(skip().raw9(), 0x19C);
        assert_eq!(d10_2().raw9(), 0x4A);
        assert_eq!(d5_2().raw9(), 0x45);
        assert_eq!(d21_5().raw9(), 0xB5);
        assert_eq!(d26_5().raw9(), 0xBA);
    }

    #[test]
    fn data_symbols_are_not_control() {
        assert!(d10_2().is_data());
        assert!(!comma().is_data());
    }

    #[test]
    fn data_accessor_round_trips() {
        let sym = Symbol::new_with_raw_value(0xAA);
        assert_eq!(sym.data(), 0xAA);
        assert!(!sym.ctrl());
    }
}
