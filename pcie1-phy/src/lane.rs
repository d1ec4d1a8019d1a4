//! The gearbox-agnostic lane interface shared between the SERDES, the core, and its tests.
//!
//! [`LaneIn`] and [`LaneOut`] are plain value types: one tick's worth of symbols plus the
//! sideband signals the LTSSM and RX parser drive directly against the lane. `RATIO` is the
//! number of symbols exchanged per tick (1 or 2), mirroring the gearbox ratio a real SERDES
//! might run at either side of a clock-domain crossing.

use crate::symbol::Symbol;

/// One tick's worth of receive-side lane state: symbols from the SERDES plus sidebands.
///
/// `rx_valid[i] = false` means `rx_symbol[i]` must be ignored; it may hold a value outside
/// the 8b/10b symbol space.
#[derive(Debug, Clone, Copy)]
pub struct LaneIn<const RATIO: usize> {
    pub rx_symbol: [Symbol; RATIO],
    pub rx_valid: [bool; RATIO],
    pub rx_present: bool,
    pub rx_locked: bool,
    pub rx_aligned: bool,
    pub det_valid: bool,
    pub det_status: bool,
}

impl<const RATIO: usize> Default for LaneIn<RATIO> {
    fn default() -> Self {
        Self {
            rx_symbol: [Symbol::default(); RATIO],
            rx_valid: [false; RATIO],
            rx_present: false,
            rx_locked: false,
            rx_aligned: false,
            det_valid: false,
            det_status: false,
        }
    }
}

/// One tick's worth of transmit-side lane state and control outputs toward the SERDES.
#[derive(Debug, Clone, Copy)]
pub struct LaneOut<const RATIO: usize> {
    pub tx_symbol: [Symbol; RATIO],
    pub tx_set_disp: [bool; RATIO],
    pub tx_disp: [bool; RATIO],
    pub tx_e_idle: [bool; RATIO],
    /// Polarity-invert request, driven by the RX parser on a `D21.5`/`D26.5` TS ID match.
    pub rx_invert: bool,
    /// Comma-seek enable, driven by the LTSSM toward the symbol aligner.
    pub rx_align: bool,
    /// Receiver-detect handshake request, driven by the LTSSM during `Detect.Active`.
    pub det_enable: bool,
}

impl<const RATIO: usize> Default for LaneOut<RATIO> {
    fn default() -> Self {
        Self {
            tx_symbol: [Symbol::default(); RATIO],
            tx_set_disp: [false; RATIO],
            tx_disp: [false; RATIO],
            tx_e_idle: [false; RATIO],
            rx_invert: false,
            rx_align: false,
            det_enable: false,
        }
    }
}

impl<const RATIO: usize> LaneOut<RATIO> {
    /// Drives every transmit slot to Electrical Idle: no K/D symbol is asserted.
    pub fn all_e_idle() -> Self {
        Self {
            tx_e_idle: [true; RATIO],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rx_is_all_invalid() {
        let lane = LaneIn::<2>::default();
        assert_eq!(lane.rx_valid, [false, false]);
        assert!(!lane.rx_present);
    }

    #[test]
    fn all_e_idle_asserts_every_slot() {
        let lane = LaneOut::<2>::all_e_idle();
        assert_eq!(lane.tx_e_idle, [true, true]);
        assert_eq!(lane.tx_symbol, [Symbol::default(); 2]);
    }
}
