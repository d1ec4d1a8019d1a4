//! Comma-seeking symbol aligner (`SymbolSlip`).
//!
//! Out of scope for the real core (the SERDES typically owns this), but kept here as a
//! standalone stage so tests can drive the parser with an unaligned symbol stream, the way a
//! real lane would see commas land anywhere in a word before lock.

use crate::symbol::{self, Symbol};

/// Slides a `RATIO`-symbol-wide window over the incoming stream so that, once a comma is
/// seen and `en` is asserted, that comma lands at word position 0 on every subsequent tick.
///
/// Behaviour is unspecified if more than one comma appears in the same input word; this
/// implementation resolves ties by keeping the highest-indexed comma, but callers must not
/// rely on that.
pub struct Aligner<const RATIO: usize> {
    prev: [Symbol; RATIO],
    curr: [Symbol; RATIO],
    offset: usize,
}

impl<const RATIO: usize> Default for Aligner<RATIO> {
    fn default() -> Self {
        Self {
            prev: [Symbol::default(); RATIO],
            curr: [Symbol::default(); RATIO],
            offset: 0,
        }
    }
}

impl<const RATIO: usize> Aligner<RATIO> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The symbol-granular offset currently applied to the output window, in `[0, RATIO)`.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Shifts `input` into the window, re-seeks the comma if `en` and exactly one comma is
    /// present, and returns the `RATIO` symbols currently aligned to word position 0.
    pub fn tick(&mut self, input: [Symbol; RATIO], en: bool) -> [Symbol; RATIO] {
        let mut comma_count = 0usize;
        let mut comma_index = 0usize;
        for (n, sym) in input.iter().enumerate() {
            if sym.raw9() == symbol::comma().raw9() {
                comma_count += 1;
                comma_index = n;
            }
        }
        if en && comma_count == 1 {
            self.offset = comma_index;
        }

        self.prev = self.curr;
        self.curr = input;

        let mut out = [Symbol::default(); RATIO];
        for (i, slot) in out.iter_mut().enumerate() {
            let idx = self.offset + i;
            *slot = if idx < RATIO { self.prev[idx] } else { self.curr[idx - RATIO] };
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{d10_2, pad};

    #[test]
    fn locks_onto_comma_at_word_position_one() {
        let mut aligner = Aligner::<2>::new();
        // Word 0 carries no comma; word 1 has comma at position 1.
        aligner.tick([pad(), pad()], true);
        aligner.tick([pad(), symbol::comma()], true);
        assert_eq!(aligner.offset(), 1);
        // Once locked, subsequent words are rotated so the comma always lands at index 0.
        let out = aligner.tick([d10_2(), symbol::comma()], true);
        assert_eq!(out[0].raw9(), symbol::comma().raw9());
        assert_eq!(out[1].raw9(), d10_2().raw9());
    }

    #[test]
    fn disabled_freezes_offset_but_keeps_shifting() {
        let mut aligner = Aligner::<2>::new();
        aligner.tick([pad(), symbol::comma()], true);
        assert_eq!(aligner.offset(), 1);
        // A new comma at position 0 must be ignored while disabled.
        aligner.tick([symbol::comma(), pad()], false);
        assert_eq!(aligner.offset(), 1);
    }

    #[test]
    fn ratio_one_is_a_pass_through_once_locked() {
        let mut aligner = Aligner::<1>::new();
        aligner.tick([symbol::comma()], true);
        let out = aligner.tick([d10_2()], true);
        assert_eq!(out[0].raw9(), d10_2().raw9());
    }
}
