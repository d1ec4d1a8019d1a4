//! The Training Sequence (TS1/TS2) record.
//!
//! A [`TsRecord`] packs every field of a training sequence ordered set into a single 32-bit
//! value, so that "two consecutive TSes are byte-identical" (spec invariant, see
//! [`crate::parser`]) reduces to a single integer comparison — the `PartialEq` impl bitbybit
//! derives compares the underlying raw value.

use arbitrary_int::u5;
use bitbybit::bitfield;

/// Upstream link number field (`link.valid`, `link.number`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Link {
    pub valid: bool,
    pub number: u8,
}

/// Upstream lane number field (`lane.valid`, `lane.number`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lane {
    pub valid: bool,
    pub number: u5,
}

/// Advertised data rate field. This core only ever advertises Gen1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rate {
    pub reserved: bool,
    pub gen1: bool,
}

/// TS control bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ctrl {
    pub reset: bool,
    pub disable: bool,
    pub loopback: bool,
    pub unscramble: bool,
}

/// Which ordered set this record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TsKind {
    /// Body symbols are `D10.2`.
    #[default]
    Ts1,
    /// Body symbols are `D5.2`.
    Ts2,
}

/// A fully-decoded (or to-be-transmitted) training sequence, packed into 32 bits.
///
/// Field layout mirrors the PCIe TS body: `valid | link | lane | n_fts | rate | ctrl |
/// ts_id`. Records are plain value types; there is no pointer anywhere in this crate's
/// representation of a TS.
#[bitfield(u32)]
#[derive(Debug, PartialEq, Eq)]
pub struct TsRecord {
    /// Set when two consecutive identical TSes have been received with no error in between.
    #[bit(0, rw)]
    pub valid: bool,

    #[bit(1, rw)]
    link_valid: bool,
    #[bits(2..=9, rw)]
    link_number: u8,

    #[bit(10, rw)]
    lane_valid: bool,
    #[bits(11..=15, rw)]
    lane_number: u5,

    /// Number of Fast Training Sequences the transmitter requires.
    #[bits(16..=23, rw)]
    pub n_fts: u8,

    #[bit(24, rw)]
    rate_reserved: bool,
    #[bit(25, rw)]
    rate_gen1: bool,

    #[bit(26, rw)]
    ctrl_reset: bool,
    #[bit(27, rw)]
    ctrl_disable: bool,
    #[bit(28, rw)]
    ctrl_loopback: bool,
    #[bit(29, rw)]
    ctrl_unscramble: bool,

    /// `false` ⇒ TS1 (body symbols `D10.2`), `true` ⇒ TS2 (body symbols `D5.2`).
    #[bit(30, rw)]
    ts_id: bool,
}

impl Default for TsRecord {
    fn default() -> Self {
        Self::new_with_raw_value(0)
    }
}

impl TsKind {
    fn bit(self) -> bool {
        matches!(self, TsKind::Ts2)
    }

    fn from_bit(bit: bool) -> Self {
        if bit { TsKind::Ts2 } else { TsKind::Ts1 }
    }
}

impl TsRecord {
    /// Which ordered set (TS1 or TS2) this record represents.
    pub fn kind(self) -> TsKind {
        TsKind::from_bit(self.ts_id())
    }

    /// Replaces the TS1/TS2 identifier bit.
    pub fn with_kind(self, kind: TsKind) -> Self {
        self.with_ts_id(kind.bit())
    }

    /// The upstream link number field.
    pub fn link(self) -> Link {
        Link {
            valid: self.link_valid(),
            number: self.link_number(),
        }
    }

    /// Replaces the upstream link number field.
    pub fn with_link(self, link: Link) -> Self {
        self.with_link_valid(link.valid).with_link_number(link.number)
    }

    /// The upstream lane number field.
    pub fn lane(self) -> Lane {
        Lane {
            valid: self.lane_valid(),
            number: self.lane_number(),
        }
    }

    /// Replaces the upstream lane number field.
    pub fn with_lane(self, lane: Lane) -> Self {
        self.with_lane_valid(lane.valid).with_lane_number(lane.number)
    }

    /// The advertised data rate field.
    pub fn rate(self) -> Rate {
        Rate {
            reserved: self.rate_reserved(),
            gen1: self.rate_gen1(),
        }
    }

    /// Replaces the advertised data rate field.
    pub fn with_rate(self, rate: Rate) -> Self {
        self.with_rate_reserved(rate.reserved).with_rate_gen1(rate.gen1)
    }

    /// The control-bits field.
    pub fn ctrl(self) -> Ctrl {
        Ctrl {
            reset: self.ctrl_reset(),
            disable: self.ctrl_disable(),
            loopback: self.ctrl_loopback(),
            unscramble: self.ctrl_unscramble(),
        }
    }

    /// Replaces the control-bits field.
    pub fn with_ctrl(self, ctrl: Ctrl) -> Self {
        self.with_ctrl_reset(ctrl.reset)
            .with_ctrl_disable(ctrl.disable)
            .with_ctrl_loopback(ctrl.loopback)
            .with_ctrl_unscramble(ctrl.unscramble)
    }

    /// `true` when this record's link field is PAD (unassigned).
    pub fn link_is_pad(self) -> bool {
        !self.link_valid()
    }

    /// `true` when this record's lane field is PAD (unassigned).
    pub fn lane_is_pad(self) -> bool {
        !self.lane_valid()
    }

    /// Builds a PAD/PAD TS1 or TS2 with the given rate/n_fts/ctrl, as sent during Detect,
    /// Polling and the early Configuration sub-states before a link/lane has been adopted.
    pub fn pad_pad(kind: TsKind) -> Self {
        Self::new_with_raw_value(0).with_kind(kind).with_rate(Rate {
            reserved: false,
            gen1: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_pad_has_no_link_or_lane() {
        let ts = TsRecord::pad_pad(TsKind::Ts1);
        assert!(ts.link_is_pad());
        assert!(ts.lane_is_pad());
        assert_eq!(ts.rate().gen1, true);
        assert_eq!(ts.kind(), TsKind::Ts1);
    }

    #[test]
    fn kind_round_trips_through_ts_id_bit() {
        let ts1 = TsRecord::pad_pad(TsKind::Ts1);
        let ts2 = TsRecord::pad_pad(TsKind::Ts2);
        assert_eq!(ts1.kind(), TsKind::Ts1);
        assert_eq!(ts2.kind(), TsKind::Ts2);
        assert_ne!(ts1, ts2);
    }

    #[test]
    fn link_and_lane_round_trip() {
        let ts = TsRecord::new_with_raw_value(0)
            .with_link(Link {
                valid: true,
                number: 0xAA,
            })
            .with_lane(Lane {
                valid: true,
                number: u5::new(0x1A & 0x1F),
            });
        assert_eq!(ts.link(), Link { valid: true, number: 0xAA });
        assert_eq!(ts.lane().valid, true);
        assert_eq!(u8::from(ts.lane().number), 0x1A & 0x1F);
    }

    #[test]
    fn structural_equality_is_raw_value_equality() {
        let a = TsRecord::pad_pad(TsKind::Ts1).with_ctrl(Ctrl {
            reset: true,
            disable: false,
            loopback: false,
            unscramble: false,
        });
        let b = TsRecord::pad_pad(TsKind::Ts1).with_ctrl(Ctrl {
            reset: true,
            disable: false,
            loopback: false,
            unscramble: false,
        });
        let c = TsRecord::pad_pad(TsKind::Ts1).with_ctrl(Ctrl {
            reset: false,
            disable: false,
            loopback: false,
            unscramble: false,
        });
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
