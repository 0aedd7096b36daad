//! Unanchored search without backtracking.
//!
//! Three automata derived from one pattern cooperate per match:
//!
//! 1. the *search* automaton (start self-loop added) runs forward and
//!    stops at the first offset where some match ends,
//! 2. the *reverse* automaton walks backward from that offset; its
//!    first accepting state marks the match start,
//! 3. the *complete* automaton runs forward from the start with the
//!    longest-match listener to settle the final end and token type.
//!
//! Every phase is a plain table walk, so search cost stays linear in
//! the input. Matches never overlap: each scan resumes at the previous
//! match end, one position later when the match was empty.

use std::sync::Arc;

use log::debug;

use super::engine::{LongestMatch, Match, MatchListener, TableMatcher};
use super::strategy::StringFinder;
use crate::automaton::{determinize, minimize, Nfa, TabledAutomaton};
use crate::cursor::Cursor;
use crate::token::TokenType;

fn tabled(nfa: &Nfa) -> TabledAutomaton {
    TabledAutomaton::from_dfa(&minimize(&determinize(nfa)))
}

/// The search/reverse/complete triple compiled from one pattern NFA.
/// Immutable; share it across finders with the wrapping [`Arc`].
#[derive(Debug)]
pub struct SearchAutomata {
    pub search: TabledAutomaton,
    pub reverse: TabledAutomaton,
    pub complete: TabledAutomaton,
}

impl SearchAutomata {
    pub fn new(nfa: &Nfa) -> SearchAutomata {
        let mut augmented = nfa.clone();
        augmented.add_start_self_loop();
        let automata = SearchAutomata {
            search: tabled(&augmented),
            reverse: tabled(&nfa.reverse()),
            complete: tabled(nfa),
        };
        debug!(
            "search automata: {}/{}/{} states",
            automata.search.state_count(),
            automata.reverse.state_count(),
            automata.complete.state_count()
        );
        automata
    }
}

/// Records the offset of the first accepting report and suspends.
#[derive(Default)]
struct FirstAccept {
    end: Option<usize>,
}

impl<C: Cursor> MatchListener<C> for FirstAccept {
    fn report_match(&mut self, cursor: &mut C, _start: usize, _token: TokenType) -> bool {
        self.end = Some(cursor.current());
        true
    }
}

/// Iterating unanchored search over one cursor.
pub struct Finder<C: Cursor> {
    automata: Arc<SearchAutomata>,
    cursor: C,
    next_scan: usize,
}

impl<C: Cursor> Finder<C> {
    pub fn new(automata: Arc<SearchAutomata>, cursor: C) -> Finder<C> {
        Finder {
            automata,
            cursor,
            next_scan: 0,
        }
    }

    /// Backward walk over the reverse automaton; the last accepting
    /// position visited is the earliest admissible start of a match
    /// ending at `end`, which keeps the search leftmost. Bounded below
    /// by `next_scan` so matches never reach into the previous one.
    fn scan_backward(&mut self, end: usize) -> Option<usize> {
        let automata = Arc::clone(&self.automata);
        let reverse = &automata.reverse;
        let mut state = reverse.start();
        let mut earliest = None;
        self.cursor.move_to(end);
        loop {
            if let Some(token) = reverse.accept(state) {
                if !token.is_error() {
                    earliest = Some(self.cursor.current());
                }
            }
            if self.cursor.current() <= self.next_scan {
                return earliest;
            }
            let c = match self.cursor.prev() {
                Some(c) => c,
                None => return earliest,
            };
            state = reverse.step(state, c);
            if reverse.is_error(state) {
                return earliest;
            }
        }
    }
}

impl<C: Cursor> StringFinder for Finder<C> {
    fn find_next(&mut self) -> Option<Match> {
        let automata = Arc::clone(&self.automata);
        loop {
            if self.next_scan > self.cursor.len() {
                return None;
            }

            // Phase 1: some match end at or after next_scan.
            self.cursor.move_to(self.next_scan);
            let mut matcher = TableMatcher::new(&automata.search);
            matcher.reset(self.next_scan);
            let mut first = FirstAccept::default();
            matcher.run(&mut self.cursor, &mut first);
            let end = first.end?;

            // Phase 2: the match start.
            let start = match self.scan_backward(end) {
                Some(start) => start,
                None => {
                    // No admissible start before the overlap bound;
                    // look for a later end.
                    self.next_scan = end + 1;
                    continue;
                }
            };

            // Phase 3: the true end, leftmost-longest.
            self.cursor.move_to(start);
            let mut matcher = TableMatcher::new(&automata.complete);
            matcher.reset(start);
            let mut longest = LongestMatch::new();
            matcher.run(&mut self.cursor, &mut longest);
            match longest.take() {
                Some(found) if found.start == start => {
                    self.next_scan = if found.is_empty() {
                        found.end + 1
                    } else {
                        found.end
                    };
                    return Some(found);
                }
                // The reverse automaton promised a match here; a miss
                // means the candidate end was stale, so move past it.
                _ => {
                    self.next_scan = end + 1;
                }
            }
        }
    }

    fn skip_to(&mut self, offset: usize) {
        if offset > self.next_scan {
            self.next_scan = offset;
        }
    }
}
