//! The TX emitter: produces the outbound `COMMA · TS-body · ID×10` symbol stream (or
//! Electrical Idle) driven by a TS record supplied by the LTSSM.

use crate::engine::step_word;
use crate::lane::LaneOut;
use crate::symbol::{self, Symbol};
use crate::ts::{TsKind, TsRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Idle,
    TsLink,
    TsLane,
    TsFts,
    TsRate,
    TsCtrl,
    TsId(u8),
}

impl Default for TxState {
    fn default() -> Self {
        TxState::Idle
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TxSlot {
    symbol: Symbol,
    set_disp: bool,
    disp: bool,
    e_idle: bool,
}

fn plain(symbol: Symbol) -> TxSlot {
    TxSlot {
        symbol,
        set_disp: false,
        disp: false,
        e_idle: false,
    }
}

/// Result of a single tick of the TX emitter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxTick {
    /// At least one symbol this tick was the leading `COMMA` of a new TS.
    pub comma: bool,
}

/// Emits one TS (or one Electrical-Idle word) per 16-symbol cycle, `RATIO` symbols per tick.
///
/// Unlike [`crate::parser::RxParser`], this grammar is unconditional on the input symbol
/// stream: every state has exactly one applicable rule, selected only by `ts`/`e_idle`, so
/// there is no error output.
pub struct TxEmitter<const RATIO: usize> {
    state: TxState,
}

impl<const RATIO: usize> Default for TxEmitter<RATIO> {
    fn default() -> Self {
        Self {
            state: TxState::default(),
        }
    }
}

impl<const RATIO: usize> TxEmitter<RATIO> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the emitter by one tick, writing `RATIO` transmit symbols and sidebands into
    /// `lane_out`. `ts` is the LTSSM's current TX TS record; `e_idle` requests Electrical
    /// Idle instead of training sequences.
    pub fn tick(&mut self, ts: TsRecord, e_idle: bool, lane_out: &mut LaneOut<RATIO>) -> TxTick {
        let mut comma_any = false;
        let slots: [TxSlot; RATIO] = step_word([(); RATIO], |()| {
            let (slot, comma) = self.step(ts, e_idle);
            comma_any |= comma;
            slot
        });

        for (i, slot) in slots.into_iter().enumerate() {
            lane_out.tx_symbol[i] = slot.symbol;
            lane_out.tx_set_disp[i] = slot.set_disp;
            lane_out.tx_disp[i] = slot.disp;
            lane_out.tx_e_idle[i] = slot.e_idle;
        }

        TxTick { comma: comma_any }
    }

    fn step(&mut self, ts: TsRecord, e_idle: bool) -> (TxSlot, bool) {
        use TxState::*;

        let mut comma = false;
        let (next, slot) = match self.state {
            Idle if e_idle => (
                Idle,
                TxSlot {
                    e_idle: true,
                    ..TxSlot::default()
                },
            ),
            Idle if ts.valid() => {
                comma = true;
                (
                    TsLink,
                    TxSlot {
                        symbol: symbol::comma(),
                        set_disp: true,
                        disp: false,
                        e_idle: false,
                    },
                )
            }
            // Neither e_idle nor ts.valid: the totality fallback (SPEC_FULL.md §4.4 rule 3).
            Idle => (
                Idle,
                TxSlot {
                    e_idle: true,
                    ..TxSlot::default()
                },
            ),
            TsLink => {
                let sym = if ts.link().valid {
                    Symbol::d(ts.link().number, 0)
                } else {
                    symbol::pad()
                };
                (TsLane, plain(sym))
            }
            TsLane => {
                let sym = if ts.lane().valid {
                    Symbol::d(u8::from(ts.lane().number), 0)
                } else {
                    symbol::pad()
                };
                (TsFts, plain(sym))
            }
            TsFts => (TsRate, plain(Symbol::d(ts.n_fts(), 0))),
            TsRate => {
                let rate = ts.rate();
                let byte = rate.reserved as u8 | ((rate.gen1 as u8) << 1);
                (TsCtrl, plain(Symbol::d(byte, 0)))
            }
            TsCtrl => {
                let ctrl = ts.ctrl();
                let byte = ctrl.reset as u8
                    | ((ctrl.disable as u8) << 1)
                    | ((ctrl.loopback as u8) << 2)
                    | ((ctrl.unscramble as u8) << 3);
                (TsId(0), plain(Symbol::d(byte, 0)))
            }
            TsId(k) => {
                let sym = match ts.kind() {
                    TsKind::Ts1 => symbol::d10_2(),
                    TsKind::Ts2 => symbol::d5_2(),
                };
                let next = if k == 9 { Idle } else { TsId(k + 1) };
                (next, plain(sym))
            }
        };

        self.state = next;
        (slot, comma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lane::{LaneIn, LaneOut};
    use crate::parser::RxParser;
    use crate::ts::{Ctrl, Lane, Link, Rate};

    fn emit_one_ts(emitter: &mut TxEmitter<1>, ts: TsRecord) -> [Symbol; 16] {
        let mut out = [Symbol::default(); 16];
        for slot in out.iter_mut() {
            let mut lane_out = LaneOut::<1>::default();
            emitter.tick(ts, false, &mut lane_out);
            *slot = lane_out.tx_symbol[0];
        }
        out
    }

    #[test]
    fn idle_asserts_e_idle_and_drives_no_symbol() {
        let mut emitter = TxEmitter::<1>::new();
        let mut lane_out = LaneOut::<1>::default();
        let tick = emitter.tick(TsRecord::default(), true, &mut lane_out);
        assert!(!tick.comma);
        assert!(lane_out.tx_e_idle[0]);
    }

    #[test]
    fn idle_fallback_when_neither_e_idle_nor_ts_valid() {
        let mut emitter = TxEmitter::<1>::new();
        let mut lane_out = LaneOut::<1>::default();
        let tick = emitter.tick(TsRecord::default(), false, &mut lane_out);
        assert!(!tick.comma);
        assert!(lane_out.tx_e_idle[0]);
    }

    #[test]
    fn s6_ts_structure_is_sixteen_symbols_starting_with_forced_disparity_comma() {
        let mut emitter = TxEmitter::<1>::new();
        let ts = TsRecord::pad_pad(TsKind::Ts1).with_ctrl(Ctrl {
            reset: false,
            disable: false,
            loopback: false,
            unscramble: false,
        });
        let ts = ts.with_valid(true);

        let mut lane_out = LaneOut::<1>::default();
        let first = emitter.tick(ts, false, &mut lane_out);
        assert!(first.comma);
        assert_eq!(lane_out.tx_symbol[0].raw9(), symbol::comma().raw9());
        assert!(lane_out.tx_set_disp[0]);
        assert!(!lane_out.tx_disp[0]);

        for _ in 0..14 {
            emitter.tick(ts, false, &mut lane_out);
        }
        // 16th symbol (last ID) emitted, 17th tick wraps back to IDLE absent e_idle/ts.valid.
        emitter.tick(ts, false, &mut LaneOut::<1>::default());
        let mut wrap_out = LaneOut::<1>::default();
        emitter.tick(ts.with_valid(false), false, &mut wrap_out);
        assert!(wrap_out.tx_e_idle[0]);
    }

    #[test]
    fn round_trip_through_rx_parser_reconstructs_the_same_ts() {
        let tx_ts = TsRecord::default()
            .with_valid(true)
            .with_kind(TsKind::Ts1)
            .with_link(Link {
                valid: true,
                number: 0xAA,
            })
            .with_lane(Lane {
                valid: true,
                number: arbitrary_int::u5::new(0x1A & 0x1f),
            })
            .with_n_fts(0xFF)
            .with_rate(Rate {
                reserved: false,
                gen1: true,
            })
            .with_ctrl(Ctrl {
                reset: false,
                disable: false,
                loopback: false,
                unscramble: false,
            });

        let mut emitter = TxEmitter::<1>::new();
        let mut parser = RxParser::<1>::new();
        let mut lane_out = LaneOut::<1>::default();

        // Two full 16-symbol TSes are needed before the parser double-confirms.
        for _ in 0..2 {
            for _ in 0..16 {
                emitter.tick(tx_ts, false, &mut lane_out);
                let lane_in = LaneIn::<1> {
                    rx_symbol: [lane_out.tx_symbol[0]],
                    rx_valid: [true],
                    ..LaneIn::default()
                };
                let mut rx_lane_out = LaneOut::<1>::default();
                parser.tick(&lane_in, &mut rx_lane_out);
            }
        }

        assert!(parser.ts().valid());
        assert_eq!(parser.ts().link(), tx_ts.link());
        assert_eq!(parser.ts().lane().valid, tx_ts.lane().valid);
        assert_eq!(u8::from(parser.ts().lane().number), u8::from(tx_ts.lane().number));
        assert_eq!(parser.ts().n_fts(), tx_ts.n_fts());
        assert_eq!(parser.ts().kind(), tx_ts.kind());
    }
}
