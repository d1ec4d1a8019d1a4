//! PCI Express Gen1 (2.5 GT/s) x1 link-layer core: an 8b/10b symbol-level training sequence
//! parser and emitter, and the LTSSM that drives them from Electrical Idle to `L0`.
//!
//! This crate has no SERDES, no scrambler, and no data-link layer: it starts at already
//! 8b/10b-decoded [`symbol::Symbol`]s and stops at a trained, flow-controlled-nothing link.
//! Wiring a [`Phy`] to real hardware means feeding it `RATIO` decoded symbols per tick and
//! driving a real SERDES from its transmit symbols and sidebands.
#![no_std]

pub mod align;
pub mod config;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod lane;
pub mod ltssm;
pub mod parser;
pub mod symbol;
pub mod ts;

pub use config::Config;
pub use lane::{LaneIn, LaneOut};
pub use ltssm::{Ltssm, LtssmState};
pub use symbol::Symbol;
pub use ts::TsRecord;

/// Top-level PCIe Gen1 x1 PHY core: an [`align::Aligner`] feeding an [`Ltssm`], which in turn
/// owns the RX parser and TX emitter.
///
/// `RATIO` is the number of 8b/10b symbols exchanged with the lane per tick (1 or 2).
pub struct Phy<const RATIO: usize> {
    aligner: align::Aligner<RATIO>,
    ltssm: Ltssm<RATIO>,
}

impl<const RATIO: usize> Phy<RATIO> {
    pub fn new(cfg: Config) -> Self {
        Self {
            aligner: align::Aligner::new(),
            ltssm: Ltssm::new(cfg),
        }
    }

    pub fn state(&self) -> LtssmState {
        self.ltssm.state()
    }

    pub fn link_up(&self) -> bool {
        self.ltssm.link_up()
    }

    /// Advances the core by one tick.
    ///
    /// `lane_in.rx_symbol` is taken as the SERDES's raw, not-yet-comma-aligned symbols;
    /// `rx_locked`/`rx_aligned` are overwritten before use, since this core owns its own
    /// aligner rather than trusting a caller-supplied lock indication. Returns the `RATIO`
    /// transmit symbols and sidebands to drive out to the SERDES.
    pub fn tick(&mut self, lane_in: LaneIn<RATIO>) -> LaneOut<RATIO> {
        let mut lane_out = LaneOut::<RATIO>::default();

        // The LTSSM asserts `rx_align` unconditionally (see `Ltssm::tick`): comma-seeking is
        // always on in this core, so the aligner can run ahead of the LTSSM call that would
        // otherwise report that enable bit back.
        let aligned = self.aligner.tick(lane_in.rx_symbol, true);

        let lane_in = LaneIn::<RATIO> {
            rx_symbol: aligned,
            rx_locked: false,
            rx_aligned: true,
            ..lane_in
        };

        self.ltssm.tick(&lane_in, &mut lane_out);
        lane_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_phy_starts_in_detect_quiet_asserting_e_idle() {
        let mut phy = Phy::<1>::new(Config::new(1000));
        let lane_out = phy.tick(LaneIn::<1>::default());
        assert_eq!(phy.state(), LtssmState::DetectQuiet);
        assert!(!phy.link_up());
        assert!(lane_out.tx_e_idle[0]);
    }
}
