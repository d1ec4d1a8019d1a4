//! Shared substrate for the RX parser and TX emitter: stepping one word of `RATIO` symbols
//! through a rule-based grammar, one symbol at a time, within a single tick.
//!
//! The grammars this core implements (see [`crate::parser`] and [`crate::emitter`]) are
//! naturally expressed as a state machine whose rules sometimes need to look several symbols
//! ahead within the same tick — the TS ID match loop at `RATIO=2` learns the ID symbol from
//! position 0 and compares it against position 1 before the tick ends. Rather than
//! pre-enumerating every length-`RATIO` chain of rules at elaboration time, this
//! implementation evaluates rules sequentially, one symbol at a time, updating engine state
//! in place: because Rust executes a loop body strictly in order, a write made while handling
//! symbol `n` is trivially visible to the handling of symbol `n+1` in the same call — no
//! registered/combinational bypass distinction is needed in software.
//!
//! [`step_word`] is the common shape both [`crate::parser::RxParser`] and
//! [`crate::emitter::TxEmitter`] drive their per-tick loop through.

/// Feeds `inputs` through `step` one element at a time, in positional order, collecting one
/// result per element.
///
/// `step` is an `FnMut` specifically so it can mutate engine state (the current grammar
/// state, memory cells such as the learned TS ID symbol) between calls — that mutation is
/// what gives later symbols in the same word visibility into earlier symbols' effects. `I`
/// is typically `Symbol` for the TX emitter and `(Symbol, bool)` (symbol, rx_valid) for the
/// RX parser, which must also gate on per-symbol validity.
pub fn step_word<const RATIO: usize, I, T, F>(inputs: [I; RATIO], mut step: F) -> [T; RATIO]
where
    I: Copy,
    T: Copy + Default,
    F: FnMut(I) -> T,
{
    let mut out = [T::default(); RATIO];
    for (slot, input) in out.iter_mut().zip(inputs) {
        *slot = step(input);
    }
    out
}
