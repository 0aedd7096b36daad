//! The matching engine: a resumable scan loop over a tabled automaton,
//! driven by a listener.
//!
//! The engine owns nothing but its scan state (current automaton state,
//! match start, a reported flag), so it is a cheap value type; the
//! automaton and the cursor stay with the caller. Two listener
//! callbacks steer every scan: `report_match` on landing in an
//! accepting state, `recover_mismatch` on landing in the error sink.
//! Either callback may suspend the scan by returning `true`; the engine
//! state stays intact, and a later `run` call continues exactly where
//! the scan stopped. A callback may also reposition the cursor, which
//! the engine treats as an instruction to restart matching at the new
//! offset.

use crate::automaton::{StateId, TabledAutomaton};
use crate::cursor::Cursor;
use crate::token::TokenType;

/// One match: a `[start, end)` character window, its text, and the
/// token type of the accepting state.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub token: TokenType,
}

impl Match {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Why `run` returned.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Step {
    /// A listener callback returned `true`. Engine state is intact and
    /// the scan can be resumed.
    Suspended,
    /// The cursor ran out of input.
    Exhausted,
}

/// Listener protocol for [`TableMatcher::run`]. Both callbacks return
/// `true` to suspend the scan and `false` to keep scanning, and may
/// move the cursor to restart matching elsewhere.
pub trait MatchListener<C: Cursor> {
    /// The scan reached an accepting state; the match spans `start` up
    /// to the cursor's current offset.
    fn report_match(&mut self, cursor: &mut C, start: usize, token: TokenType) -> bool;

    /// The scan fell into the error sink for the attempt begun at
    /// `start`. When the listener does not move the cursor, the engine
    /// applies the default recovery: restart one position past `start`.
    fn recover_mismatch(&mut self, _cursor: &mut C, _start: usize) -> bool {
        false
    }
}

/// The resumable scan loop.
pub struct TableMatcher<'a> {
    automaton: &'a TabledAutomaton,
    state: StateId,
    match_start: usize,
    reported: bool,
}

impl<'a> TableMatcher<'a> {
    pub fn new(automaton: &'a TabledAutomaton) -> TableMatcher<'a> {
        TableMatcher {
            automaton,
            state: automaton.start(),
            match_start: 0,
            reported: false,
        }
    }

    /// Restart matching with `at` as the new attempt start. The caller
    /// is responsible for positioning the cursor.
    pub fn reset(&mut self, at: usize) {
        self.state = self.automaton.start();
        self.match_start = at;
        self.reported = false;
    }

    #[inline]
    pub fn match_start(&self) -> usize {
        self.match_start
    }

    /// Scan until a listener suspends or the input runs out.
    ///
    /// Accepting states are reported before the next character is
    /// consumed, once per position; mismatch recovery always advances
    /// the attempt start by at least one position, so scans over
    /// automata that accept the empty string still terminate.
    pub fn run<C, L>(&mut self, cursor: &mut C, listener: &mut L) -> Step
    where
        C: Cursor,
        L: MatchListener<C>,
    {
        loop {
            if !self.reported {
                if let Some(token) = self.automaton.accept(self.state) {
                    if !token.is_error() {
                        self.reported = true;
                        let before = cursor.current();
                        let suspend = listener.report_match(cursor, self.match_start, token);
                        if cursor.current() != before {
                            self.reset(cursor.current());
                        }
                        if suspend {
                            return Step::Suspended;
                        }
                        continue;
                    }
                }
            }

            if self.automaton.is_error(self.state) {
                let before = cursor.current();
                let suspend = listener.recover_mismatch(cursor, self.match_start);
                if cursor.current() != before {
                    self.reset(cursor.current());
                } else {
                    let restart = (self.match_start + 1).min(cursor.len());
                    cursor.move_to(restart);
                    self.reset(restart);
                }
                if suspend {
                    return Step::Suspended;
                }
                continue;
            }

            match cursor.next() {
                Some(c) => {
                    self.state = self.automaton.step(self.state, c);
                    self.reported = false;
                }
                None => return Step::Exhausted,
            }
        }
    }
}

/// Captures the first reported match and suspends immediately.
#[derive(Default)]
pub struct ShortestMatch {
    found: Option<Match>,
}

impl ShortestMatch {
    pub fn new() -> ShortestMatch {
        ShortestMatch::default()
    }

    pub fn take(&mut self) -> Option<Match> {
        self.found.take()
    }
}

impl<C: Cursor> MatchListener<C> for ShortestMatch {
    fn report_match(&mut self, cursor: &mut C, start: usize, token: TokenType) -> bool {
        let end = cursor.current();
        self.found = Some(Match {
            start,
            end,
            text: cursor.slice(start, end),
            token,
        });
        true
    }

    fn recover_mismatch(&mut self, _cursor: &mut C, _start: usize) -> bool {
        true
    }
}

/// Accumulates the longest match at one start offset.
///
/// Reports at the same start replace the held match; a report at a
/// later start is buffered as the next candidate and suspends, so a
/// caller popping matches one at a time loses nothing.
#[derive(Default)]
pub struct LongestMatch {
    best: Option<Match>,
    pending: Option<Match>,
}

impl LongestMatch {
    pub fn new() -> LongestMatch {
        LongestMatch::default()
    }

    /// Pop the completed match, promoting any buffered candidate.
    pub fn take(&mut self) -> Option<Match> {
        let done = self.best.take();
        self.best = self.pending.take();
        done
    }
}

impl<C: Cursor> MatchListener<C> for LongestMatch {
    fn report_match(&mut self, cursor: &mut C, start: usize, token: TokenType) -> bool {
        let end = cursor.current();
        let found = Match {
            start,
            end,
            text: cursor.slice(start, end),
            token,
        };
        match &self.best {
            Some(best) if start > best.start => {
                self.pending = Some(found);
                true
            }
            _ => {
                self.best = Some(found);
                false
            }
        }
    }

    fn recover_mismatch(&mut self, _cursor: &mut C, _start: usize) -> bool {
        // A held match cannot be extended past a mismatch.
        self.best.is_some()
    }
}
