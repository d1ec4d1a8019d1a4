//! The RX parser: recognises `COMMA · TS-body · ID×10` ordered sets (and the skip ordered
//! set that may appear in their place) in the decoded symbol stream.

use crate::engine::step_word;
use crate::error::EngineError;
use crate::lane::{LaneIn, LaneOut};
use crate::symbol::{self, Symbol};
use crate::ts::{Ctrl, Lane as LaneField, Link, Rate, TsKind, TsRecord};
use arbitrary_int::u5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    Comma,
    LinkSkp0,
    Skp1,
    Skp2,
    TsLane,
    TsFts,
    TsRate,
    TsCtrl,
    TsId(u8),
}

impl Default for RxState {
    fn default() -> Self {
        RxState::Comma
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RxStepResult {
    comma: bool,
    error: bool,
}

/// Result of a single tick of the RX parser, aggregated over the `RATIO` symbols processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxTick {
    /// At least one symbol this tick matched the leading `COMMA` rule.
    pub comma: bool,
    /// At least one symbol this tick matched no grammar rule.
    pub error: bool,
}

/// Recognises training sequences and skip ordered sets in a `RATIO`-symbol-per-tick stream.
///
/// Holds two TS accumulators: `z` (currently being received) and `y` (the previously
/// completed one). A publicly observable `ts` is only updated, with `valid` set, once two
/// consecutive TSes compare byte-identical — see [`RxParser::ts`].
pub struct RxParser<const RATIO: usize> {
    state: RxState,
    z: TsRecord,
    y: TsRecord,
    ts: TsRecord,
    ts_id_memo: Symbol,
    ts_inv: bool,
    /// Persistent polarity-invert level, toggled on each inverted-polarity ID and written into
    /// `LaneOut::rx_invert` every tick so it survives across the fresh `LaneOut` the caller
    /// constructs per tick.
    rx_invert: bool,
    last_error: Option<EngineError>,
}

impl<const RATIO: usize> Default for RxParser<RATIO> {
    fn default() -> Self {
        Self {
            state: RxState::default(),
            z: TsRecord::default(),
            y: TsRecord::default(),
            ts: TsRecord::default(),
            ts_id_memo: Symbol::default(),
            ts_inv: false,
            rx_invert: false,
            last_error: None,
        }
    }
}

impl<const RATIO: usize> RxParser<RATIO> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently published, double-confirmed training sequence.
    pub fn ts(&self) -> TsRecord {
        self.ts
    }

    /// The grammar error, if any, raised by the most recently processed symbol.
    pub fn last_error(&self) -> Option<EngineError> {
        self.last_error
    }

    /// Advances the parser by one tick's worth of `RATIO` symbols.
    ///
    /// Writes the parser's persistent [`LaneOut::rx_invert`] level into `lane_out` every tick,
    /// since the caller is expected to construct a fresh `LaneOut` each call.
    pub fn tick(&mut self, lane_in: &LaneIn<RATIO>, lane_out: &mut LaneOut<RATIO>) -> RxTick {
        let inputs: [(Symbol, bool); RATIO] =
            core::array::from_fn(|i| (lane_in.rx_symbol[i], lane_in.rx_valid[i]));

        let results: [RxStepResult; RATIO] = step_word(inputs, |(sym, valid)| {
            if !valid {
                self.state = RxState::Comma;
                return RxStepResult::default();
            }
            self.step(sym)
        });

        let mut tick = RxTick::default();
        for r in results {
            tick.comma |= r.comma;
            tick.error |= r.error;
        }
        lane_out.rx_invert = self.rx_invert;
        tick
    }

    fn step(&mut self, sym: Symbol) -> RxStepResult {
        use RxState::*;

        let raw = sym.raw9();
        let is_d = sym.is_data();
        let mut comma = false;

        let next = match self.state {
            Comma => {
                if raw == symbol::comma().raw9() {
                    comma = true;
                    self.y = self.z;
                    self.z = self.z.with_valid(true);
                    Some(LinkSkp0)
                } else {
                    None
                }
            }
            LinkSkp0 => {
                if raw == symbol::skip().raw9() {
                    Some(Skp1)
                } else if raw == symbol::pad().raw9() {
                    self.z = self.z.with_link(Link { valid: false, number: 0 });
                    Some(TsLane)
                } else if is_d {
                    self.z = self.z.with_link(Link {
                        valid: true,
                        number: sym.data(),
                    });
                    Some(TsLane)
                } else {
                    None
                }
            }
            Skp1 => (raw == symbol::skip().raw9()).then_some(Skp2),
            Skp2 => (raw == symbol::skip().raw9()).then_some(Comma),
            TsLane => {
                if raw == symbol::pad().raw9() {
                    self.z = self.z.with_lane(LaneField {
                        valid: false,
                        number: u5::new(0),
                    });
                    Some(TsFts)
                } else if is_d {
                    self.z = self.z.with_lane(LaneField {
                        valid: true,
                        number: u5::new(sym.data() & 0x1f),
                    });
                    Some(TsFts)
                } else {
                    None
                }
            }
            TsFts => {
                if is_d {
                    self.z = self.z.with_n_fts(sym.data());
                    Some(TsRate)
                } else {
                    None
                }
            }
            TsRate => {
                if is_d {
                    let byte = sym.data();
                    self.z = self.z.with_rate(Rate {
                        reserved: byte & 0x1 != 0,
                        gen1: byte & 0x2 != 0,
                    });
                    Some(TsCtrl)
                } else {
                    None
                }
            }
            TsCtrl => {
                if is_d {
                    let byte = sym.data();
                    self.z = self.z.with_ctrl(Ctrl {
                        reset: byte & 0x1 != 0,
                        disable: byte & 0x2 != 0,
                        loopback: byte & 0x4 != 0,
                        unscramble: byte & 0x8 != 0,
                    });
                    Some(TsId(0))
                } else {
                    None
                }
            }
            TsId(0) => {
                if raw == symbol::d10_2().raw9() {
                    self.ts_id_memo = sym;
                    self.ts_inv = false;
                    self.z = self.z.with_kind(TsKind::Ts1);
                    Some(TsId(1))
                } else if raw == symbol::d5_2().raw9() {
                    self.ts_id_memo = sym;
                    self.ts_inv = false;
                    self.z = self.z.with_kind(TsKind::Ts2);
                    Some(TsId(1))
                } else if raw == symbol::d21_5().raw9() {
                    self.ts_id_memo = sym;
                    self.ts_inv = true;
                    Some(TsId(1))
                } else if raw == symbol::d26_5().raw9() {
                    self.ts_id_memo = sym;
                    self.ts_inv = true;
                    Some(TsId(1))
                } else {
                    None
                }
            }
            TsId(k) if (1..=8).contains(&k) => {
                (raw == self.ts_id_memo.raw9()).then_some(TsId(k + 1))
            }
            TsId(9) => {
                if raw == self.ts_id_memo.raw9() {
                    self.ts = self.ts.with_valid(false);
                    if self.ts_inv {
                        self.rx_invert = !self.rx_invert;
                    } else if self.z == self.y {
                        self.ts = self.y;
                    }
                    Some(Comma)
                } else {
                    None
                }
            }
            TsId(_) => None,
        };

        match next {
            Some(state) => {
                self.state = state;
                self.last_error = None;
                RxStepResult { comma, error: false }
            }
            None => {
                self.state = Comma;
                self.z = self.z.with_valid(false);
                self.last_error = Some(EngineError::NoRuleMatched);
                RxStepResult { comma: false, error: true }
            }
        }
    }
}
