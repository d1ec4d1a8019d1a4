//! Link Training and Status State Machine: drives the TX TS record, consumes RX TS
//! observations and sidebands, and sequences sub-states with timers and TS counters.

use crate::config::Config;
use crate::emitter::TxEmitter;
use crate::lane::{LaneIn, LaneOut};
use crate::parser::RxParser;
use crate::ts::{Lane, Link, TsKind, TsRecord};
use arbitrary_int::u5;

/// The LTSSM sub-states this core implements, a subset of the PCIe Base Specification 2.1
/// LTSSM sufficient to bring an endpoint lane from Electrical Idle to `L0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LtssmState {
    DetectQuiet,
    DetectActive,
    PollingActive,
    PollingConfiguration,
    ConfigLinkwidthStart,
    ConfigLinkwidthAccept,
    ConfigLanenumWait,
    ConfigLanenumAccept,
    ConfigComplete,
    /// `L0`. Terminal in this core: no further transitions are driven from here.
    ConfigIdle,
}

/// Result of a single LTSSM tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LtssmTick {
    pub state: LtssmState,
    pub link_up: bool,
}

/// Drives a [`RxParser`] and [`TxEmitter`] pair through the sub-state table above.
///
/// Has exclusive write access to `tx.ts`, `tx.e_idle` and `lane.det_enable`; the RX parser it
/// owns retains exclusive write access to `lane.rx_invert` (see [`crate::parser::RxParser`]).
pub struct Ltssm<const RATIO: usize> {
    cfg: Config,
    state: LtssmState,
    timer: Option<u32>,
    rx_ts_count: u32,
    tx_ts_count: u32,
    tx_paced_armed: bool,
    adopted_link: u8,
    adopted_lane: u5,
    link_up: bool,
    tx_ts: TsRecord,
    tx_e_idle: bool,
    parser: RxParser<RATIO>,
    emitter: TxEmitter<RATIO>,
}

impl<const RATIO: usize> Ltssm<RATIO> {
    pub fn new(cfg: Config) -> Self {
        let mut ltssm = Self {
            cfg,
            state: LtssmState::DetectQuiet,
            timer: None,
            rx_ts_count: 0,
            tx_ts_count: 0,
            tx_paced_armed: false,
            adopted_link: 0,
            adopted_lane: u5::new(0),
            link_up: false,
            tx_ts: TsRecord::default(),
            tx_e_idle: true,
            parser: RxParser::new(),
            emitter: TxEmitter::new(),
        };
        ltssm.enter(LtssmState::DetectQuiet);
        ltssm
    }

    pub fn state(&self) -> LtssmState {
        self.state
    }

    pub fn link_up(&self) -> bool {
        self.link_up
    }

    /// Advances the LTSSM, its RX parser and its TX emitter by one tick.
    ///
    /// Outputs for this tick (the emitted symbols, `det_enable`) reflect the state as of the
    /// *start* of this tick; a transition detected this tick becomes visible to [`Ltssm::state`]
    /// immediately but only affects the emitted stream starting next tick, matching the
    /// edge-delayed `NextValue` semantics the rest of this core follows.
    pub fn tick(&mut self, lane_in: &LaneIn<RATIO>, lane_out: &mut LaneOut<RATIO>) -> LtssmTick {
        lane_out.rx_align = true;
        lane_out.det_enable = matches!(self.state, LtssmState::DetectActive);

        let timed_out = self.tick_timer();

        let tx_tick = self.emitter.tick(self.tx_ts, self.tx_e_idle, lane_out);
        if tx_tick.comma {
            log::trace!("ltssm: tx comma ({:?}, tx_ts_count={})", self.state, self.tx_ts_count);
            self.on_tx_comma();
        }

        let rx_tick = self.parser.tick(lane_in, lane_out);
        if rx_tick.comma {
            log::trace!("ltssm: rx comma ({:?}, rx_ts_count={})", self.state, self.rx_ts_count);
        }
        let observed = rx_tick.comma.then(|| self.parser.ts());

        if let Some(next) = self.evaluate(lane_in, observed, timed_out) {
            log::debug!("ltssm: {:?} -> {:?}", self.state, next);
            self.enter(next);
        }

        LtssmTick {
            state: self.state,
            link_up: self.link_up,
        }
    }

    fn tick_timer(&mut self) -> bool {
        match self.timer {
            Some(0) => true,
            Some(t) => {
                let t = t - 1;
                self.timer = Some(t);
                t == 0
            }
            None => false,
        }
    }

    fn on_tx_comma(&mut self) {
        use LtssmState::*;
        let paced = matches!(self.state, PollingConfiguration | ConfigComplete);
        if paced && !self.tx_paced_armed {
            return;
        }
        let clamp = match self.state {
            PollingActive => Config::POLLING_ACTIVE_MIN_TX_TS1,
            _ => Config::TX_TS_PACE_THRESHOLD,
        };
        self.tx_ts_count = (self.tx_ts_count + 1).min(clamp);
    }

    fn evaluate(
        &mut self,
        lane_in: &LaneIn<RATIO>,
        observed: Option<TsRecord>,
        timed_out: bool,
    ) -> Option<LtssmState> {
        use LtssmState::*;

        match self.state {
            DetectQuiet => {
                if timed_out || lane_in.rx_present {
                    Some(DetectActive)
                } else {
                    None
                }
            }

            DetectActive => {
                if lane_in.det_valid {
                    if lane_in.det_status {
                        Some(PollingActive)
                    } else {
                        Some(DetectQuiet)
                    }
                } else {
                    None
                }
            }

            PollingActive => {
                if let Some(ts) = observed {
                    if ts.valid() && ts.link_is_pad() && ts.lane_is_pad() {
                        self.rx_ts_count =
                            (self.rx_ts_count + 1).min(Config::RX_TS_ACCEPT_THRESHOLD);
                    } else {
                        self.rx_ts_count = 0;
                    }
                }
                if self.rx_ts_count >= Config::RX_TS_ACCEPT_THRESHOLD
                    && self.tx_ts_count >= Config::POLLING_ACTIVE_MIN_TX_TS1
                {
                    Some(PollingConfiguration)
                } else if timed_out {
                    Some(DetectQuiet)
                } else {
                    None
                }
            }

            PollingConfiguration => {
                if let Some(ts) = observed {
                    if ts.valid() && ts.kind() == TsKind::Ts2 && ts.link_is_pad() && ts.lane_is_pad()
                    {
                        self.rx_ts_count =
                            (self.rx_ts_count + 1).min(Config::RX_TS_ACCEPT_THRESHOLD);
                        self.tx_paced_armed = true;
                    } else {
                        self.rx_ts_count = 0;
                    }
                }
                if self.rx_ts_count >= Config::RX_TS_ACCEPT_THRESHOLD
                    && self.tx_ts_count >= Config::TX_TS_PACE_THRESHOLD
                {
                    Some(ConfigLinkwidthStart)
                } else if timed_out {
                    Some(DetectQuiet)
                } else {
                    None
                }
            }

            ConfigLinkwidthStart => {
                if let Some(ts) = observed {
                    if ts.valid() && ts.kind() == TsKind::Ts1 && !ts.link_is_pad() && ts.lane_is_pad()
                    {
                        self.adopted_link = ts.link().number;
                        return Some(ConfigLinkwidthAccept);
                    }
                }
                timed_out.then_some(DetectQuiet)
            }

            ConfigLinkwidthAccept => {
                if let Some(ts) = observed {
                    if ts.valid() && ts.kind() == TsKind::Ts1 {
                        if ts.link_is_pad() {
                            return Some(DetectQuiet);
                        }
                        if ts.link().number == self.adopted_link
                            && !ts.lane_is_pad()
                            && u8::from(ts.lane().number) == 0
                        {
                            self.adopted_lane = ts.lane().number;
                            return Some(ConfigLanenumWait);
                        }
                    }
                }
                timed_out.then_some(DetectQuiet)
            }

            ConfigLanenumWait => {
                if let Some(ts) = observed {
                    if ts.valid() {
                        if ts.kind() == TsKind::Ts1 && ts.link_is_pad() && ts.lane_is_pad() {
                            return Some(DetectQuiet);
                        }
                        if ts.kind() == TsKind::Ts2 {
                            return Some(ConfigLanenumAccept);
                        }
                        if ts.kind() == TsKind::Ts1
                            && !ts.lane_is_pad()
                            && ts.lane().number != self.adopted_lane
                        {
                            return Some(ConfigLanenumAccept);
                        }
                    }
                }
                timed_out.then_some(DetectQuiet)
            }

            ConfigLanenumAccept => {
                if let Some(ts) = observed {
                    if ts.valid() {
                        let link_matches = !ts.link_is_pad() && ts.link().number == self.adopted_link;
                        let lane_matches = !ts.lane_is_pad() && ts.lane().number == self.adopted_lane;
                        if ts.kind() == TsKind::Ts2 && link_matches && lane_matches {
                            return Some(ConfigComplete);
                        }
                        let pad_pad_ts1 = ts.kind() == TsKind::Ts1 && ts.link_is_pad() && ts.lane_is_pad();
                        let mismatch = ts.kind() == TsKind::Ts2 && !(link_matches && lane_matches);
                        if pad_pad_ts1 || mismatch {
                            return Some(DetectQuiet);
                        }
                    }
                }
                None
            }

            ConfigComplete => {
                if let Some(ts) = observed {
                    let link_matches = !ts.link_is_pad() && ts.link().number == self.adopted_link;
                    let lane_matches = !ts.lane_is_pad() && ts.lane().number == self.adopted_lane;
                    if ts.valid() && ts.kind() == TsKind::Ts2 && link_matches && lane_matches {
                        self.rx_ts_count = (self.rx_ts_count + 1).min(Config::RX_TS_ACCEPT_THRESHOLD);
                        self.tx_paced_armed = true;
                    } else {
                        self.rx_ts_count = 0;
                    }
                }
                if self.rx_ts_count >= Config::RX_TS_ACCEPT_THRESHOLD
                    && self.tx_ts_count >= Config::TX_TS_PACE_THRESHOLD
                {
                    Some(ConfigIdle)
                } else {
                    timed_out.then_some(DetectQuiet)
                }
            }

            ConfigIdle => None,
        }
    }

    fn enter(&mut self, state: LtssmState) {
        use LtssmState::*;

        self.state = state;
        self.rx_ts_count = 0;
        self.tx_ts_count = 0;
        self.tx_paced_armed = false;

        match state {
            DetectQuiet => {
                self.tx_e_idle = true;
                self.tx_ts = TsRecord::default();
                self.link_up = false;
                self.adopted_link = 0;
                self.adopted_lane = u5::new(0);
                self.timer = Some(self.cfg.detect_quiet_ticks());
            }
            DetectActive => {
                self.tx_e_idle = true;
                self.timer = None;
            }
            PollingActive => {
                self.tx_e_idle = false;
                self.tx_ts = TsRecord::pad_pad(TsKind::Ts1).with_valid(true);
                self.timer = Some(self.cfg.polling_active_ticks());
            }
            PollingConfiguration => {
                self.tx_e_idle = false;
                self.tx_ts = TsRecord::pad_pad(TsKind::Ts2).with_valid(true);
                self.timer = Some(self.cfg.polling_configuration_ticks());
            }
            ConfigLinkwidthStart => {
                self.tx_e_idle = false;
                self.tx_ts = TsRecord::pad_pad(TsKind::Ts1).with_valid(true);
                self.timer = Some(self.cfg.linkwidth_start_ticks());
            }
            ConfigLinkwidthAccept => {
                self.tx_ts = TsRecord::pad_pad(TsKind::Ts1)
                    .with_valid(true)
                    .with_link(Link {
                        valid: true,
                        number: self.adopted_link,
                    });
                self.timer = Some(self.cfg.linkwidth_accept_ticks());
            }
            ConfigLanenumWait => {
                self.tx_ts = TsRecord::pad_pad(TsKind::Ts1)
                    .with_valid(true)
                    .with_link(Link {
                        valid: true,
                        number: self.adopted_link,
                    });
                self.timer = Some(self.cfg.lanenum_wait_ticks());
            }
            ConfigLanenumAccept => {
                self.tx_ts = TsRecord::pad_pad(TsKind::Ts2)
                    .with_valid(true)
                    .with_link(Link {
                        valid: true,
                        number: self.adopted_link,
                    })
                    .with_lane(Lane {
                        valid: true,
                        number: self.adopted_lane,
                    });
                self.timer = None;
            }
            ConfigComplete => {
                self.tx_ts = TsRecord::pad_pad(TsKind::Ts2)
                    .with_valid(true)
                    .with_link(Link {
                        valid: true,
                        number: self.adopted_link,
                    })
                    .with_lane(Lane {
                        valid: true,
                        number: self.adopted_lane,
                    })
                    .with_n_fts(0xFF);
                self.timer = Some(self.cfg.complete_ticks());
            }
            ConfigIdle => {
                self.link_up = true;
                self.timer = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;

    #[test]
    fn detect_quiet_asserts_e_idle_every_tick_at_ratio_two() {
        let mut ltssm = Ltssm::<2>::new(Config::new(1000));
        let lane_in = LaneIn::<2>::default();
        let mut lane_out = LaneOut::<2>::default();
        ltssm.tick(&lane_in, &mut lane_out);
        assert_eq!(lane_out.tx_e_idle, [true, true]);
    }

    #[test]
    fn s5_ltssm_walks_to_polling_configuration() {
        let cfg = Config::new(1000);
        let mut ltssm = Ltssm::<1>::new(cfg);

        let mut loopback = Symbol::default();
        let mut reached = false;
        for _ in 0..20_000 {
            let lane_in = LaneIn::<1> {
                rx_symbol: [loopback],
                rx_valid: [true],
                rx_present: true,
                det_valid: true,
                det_status: true,
                ..LaneIn::default()
            };
            let mut lane_out = LaneOut::<1>::default();
            ltssm.tick(&lane_in, &mut lane_out);
            loopback = lane_out.tx_symbol[0];
            if ltssm.state() == LtssmState::PollingConfiguration {
                reached = true;
                break;
            }
        }
        assert!(reached, "LTSSM did not reach Polling.Configuration");
    }

    #[test]
    fn s6_polling_active_times_out_to_detect_quiet() {
        let cfg = Config::new(4);
        let mut ltssm = Ltssm::<1>::new(cfg);

        let mut lane_in = LaneIn::<1> {
            rx_present: true,
            det_valid: true,
            det_status: true,
            ..LaneIn::default()
        };
        let mut lane_out = LaneOut::<1>::default();
        ltssm.tick(&lane_in, &mut lane_out); // Detect.Quiet -> Detect.Active
        ltssm.tick(&lane_in, &mut lane_out); // Detect.Active -> Polling.Active
        assert_eq!(ltssm.state(), LtssmState::PollingActive);

        lane_in.rx_present = false;
        lane_in.rx_valid = [false];
        for _ in 0..cfg.polling_active_ticks() {
            ltssm.tick(&lane_in, &mut lane_out);
        }
        assert_eq!(ltssm.state(), LtssmState::DetectQuiet);

        let mut confirm_out = LaneOut::<1>::default();
        ltssm.tick(&lane_in, &mut confirm_out);
        assert!(confirm_out.tx_e_idle[0]);
    }
}
