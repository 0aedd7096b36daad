//! Finite-automaton data model and construction algorithms.
//!
//! Automata flow one direction through this module:
//! pattern tree -> Thompson NFA -> determinized DFA -> tabled automaton.
//! The tabled form is the only one intended to outlive construction; it
//! is immutable and safely shared across concurrent matcher instances.
//!
//! # Module Organization
//!
//! - `nfa`: the generic (nondeterministic) automaton and its transforms
//! - `thompson`: pattern tree -> NFA fragments
//! - `dfa`: subset construction, totalization, minimization
//! - `tabled`: the dense runtime representation

mod dfa;
mod nfa;
mod tabled;
mod thompson;

pub use dfa::{determinize, minimize, Dfa, DfaState, DfaTransition};
pub use nfa::{Nfa, NfaEdge, NfaState};
pub use tabled::{AutomatonProperties, Samples, TabledAutomaton};
pub use thompson::{build_lexer_nfa, build_nfa};

/// A state identifier: an index into the owning automaton's state arena.
///
/// Transitions reference states by index, never by pointer, so cyclic
/// structures need no shared ownership.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StateId(pub(crate) u32);

impl StateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn new(index: usize) -> StateId {
        StateId(index as u32)
    }
}

/// Lowest character in the automaton alphabet.
pub const CHAR_MIN: char = '\0';

/// Highest character in the automaton alphabet.
pub const CHAR_MAX: char = char::MAX;

/// The scalar value after `c`, skipping the surrogate gap.
#[inline]
pub(crate) fn char_succ(c: char) -> Option<char> {
    match c {
        '\u{D7FF}' => Some('\u{E000}'),
        CHAR_MAX => None,
        _ => char::from_u32(c as u32 + 1),
    }
}

/// The scalar value before `c`, skipping the surrogate gap.
#[inline]
pub(crate) fn char_pred(c: char) -> Option<char> {
    match c {
        '\u{E000}' => Some('\u{D7FF}'),
        CHAR_MIN => None,
        _ => char::from_u32(c as u32 - 1),
    }
}
