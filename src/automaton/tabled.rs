//! The dense runtime form of a deterministic automaton.
//!
//! Character intervals are compressed into equivalence classes: two
//! characters land in the same class when no state distinguishes them.
//! Transitions then live in one flat row-major table indexed by
//! `state * classes + class`, so a scan step is two array lookups with
//! no branching on intervals.
//!
//! The tabled form is immutable after construction and holds no per-run
//! state, so one instance can back any number of concurrent matchers.

use std::collections::VecDeque;
use std::fmt::Write as _;

use log::debug;

use super::dfa::Dfa;
use super::nfa::interval_boundaries;
use super::{char_succ, StateId, CHAR_MIN};
use crate::token::TokenType;

/// Structural classification of a tabled automaton, used by the search
/// strategy dispatch.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AutomatonProperties {
    /// The automaton is a simple chain accepting exactly one non-empty
    /// literal string.
    pub linear: bool,
    /// No cycles outside the error sink; the accepted language is
    /// finite and enumerable.
    pub acyclic: bool,
}

/// A totalized deterministic automaton in table form.
#[derive(Debug)]
pub struct TabledAutomaton {
    /// Lower bound of each character class, ascending; class `k` covers
    /// `relevant[k]` up to (not including) `relevant[k + 1]`.
    relevant: Vec<char>,
    /// Row-major transition table, `state_count * relevant.len()` wide.
    table: Vec<StateId>,
    accept: Vec<Option<TokenType>>,
    start: StateId,
    error: StateId,
    props: AutomatonProperties,
}

impl TabledAutomaton {
    pub fn from_dfa(dfa: &Dfa) -> TabledAutomaton {
        let mut total = dfa.clone();
        total.totalize();
        // totalize always materializes the sink
        let error = match total.error {
            Some(e) => e,
            None => unreachable!("totalized dfa has an error sink"),
        };
        let states = total.len();

        let mut relevant = vec![CHAR_MIN];
        interval_boundaries(
            (0..states).flat_map(|i| {
                total
                    .state(StateId::new(i))
                    .transitions
                    .iter()
                    .map(|t| (t.lo, t.hi))
            }),
            &mut relevant,
        );

        // Dense table over the boundary classes, then drop every class
        // whose column equals its left neighbor so the class partition
        // is the coarsest one the table respects.
        let classes_wide = relevant.len();
        let mut wide = Vec::with_capacity(states * classes_wide);
        for i in 0..states {
            let id = StateId::new(i);
            for &c in &relevant {
                match total.step(id, c) {
                    Some(t) => wide.push(t),
                    None => unreachable!("totalized dfa is total"),
                }
            }
        }
        let kept: Vec<usize> = (0..classes_wide)
            .filter(|&k| {
                k == 0
                    || (0..states)
                        .any(|i| wide[i * classes_wide + k] != wide[i * classes_wide + k - 1])
            })
            .collect();

        let mut table = Vec::with_capacity(states * kept.len());
        for i in 0..states {
            for &k in &kept {
                table.push(wide[i * classes_wide + k]);
            }
        }
        let relevant: Vec<char> = kept.iter().map(|&k| relevant[k]).collect();
        let accept: Vec<Option<TokenType>> =
            (0..states).map(|i| total.state(StateId::new(i)).token).collect();

        let mut tabled = TabledAutomaton {
            relevant,
            table,
            accept,
            start: total.start,
            error,
            props: AutomatonProperties {
                linear: false,
                acyclic: false,
            },
        };
        tabled.props = AutomatonProperties {
            linear: tabled.literal_walk().is_some(),
            acyclic: tabled.compute_acyclic(),
        };
        debug!(
            "tabled {} states x {} classes, {:?}",
            tabled.state_count(),
            tabled.class_count(),
            tabled.props
        );
        tabled
    }

    #[inline]
    pub fn start(&self) -> StateId {
        self.start
    }

    #[inline]
    pub fn error(&self) -> StateId {
        self.error
    }

    #[inline]
    pub fn state_count(&self) -> usize {
        self.accept.len()
    }

    #[inline]
    pub fn class_count(&self) -> usize {
        self.relevant.len()
    }

    #[inline]
    pub fn properties(&self) -> AutomatonProperties {
        self.props
    }

    /// The equivalence class of `c`.
    #[inline]
    pub fn char_class_of(&self, c: char) -> usize {
        // relevant[0] is CHAR_MIN, so the partition point is >= 1.
        self.relevant.partition_point(|&lo| lo <= c) - 1
    }

    /// Table lookup by precomputed class.
    #[inline]
    pub fn next(&self, state: StateId, class: usize) -> StateId {
        self.table[state.index() * self.relevant.len() + class]
    }

    /// Table lookup by character. Total: every character maps somewhere,
    /// if only to the error sink.
    #[inline]
    pub fn step(&self, state: StateId, c: char) -> StateId {
        self.next(state, self.char_class_of(c))
    }

    #[inline]
    pub fn accept(&self, state: StateId) -> Option<TokenType> {
        self.accept[state.index()]
    }

    #[inline]
    pub fn is_error(&self, state: StateId) -> bool {
        state == self.error
    }

    /// Replay `text` from the start state.
    pub fn find_state(&self, text: &str) -> StateId {
        let mut state = self.start;
        for c in text.chars() {
            state = self.step(state, c);
        }
        state
    }

    /// Shortest input string reaching `target`, by breadth-first search
    /// from the start state. `None` for the error sink and for ids
    /// outside the automaton.
    pub fn find_path_to(&self, target: StateId) -> Option<String> {
        if target.index() >= self.state_count() || target == self.error {
            return None;
        }
        let mut seen = vec![false; self.state_count()];
        let mut queue = VecDeque::new();
        seen[self.start.index()] = true;
        queue.push_back((self.start, String::new()));
        while let Some((state, path)) = queue.pop_front() {
            if state == target {
                return Some(path);
            }
            for (k, &lo) in self.relevant.iter().enumerate() {
                let next = self.next(state, k);
                if next == self.error || seen[next.index()] {
                    continue;
                }
                seen[next.index()] = true;
                let mut extended = path.clone();
                extended.push(lo);
                queue.push_back((next, extended));
            }
        }
        None
    }

    /// Lazily enumerate up to `limit` accepted strings in breadth-first
    /// (shortest-first) order. Finite when the automaton is acyclic;
    /// otherwise stops at the requested count.
    pub fn samples(&self, limit: usize) -> Samples<'_> {
        // Only expand states that can still reach an accept, so a
        // match-nothing automaton yields an empty sequence instead of
        // flooding the queue.
        let co_reachable = self.co_reachable();
        let mut queue = VecDeque::new();
        if co_reachable[self.start.index()] {
            queue.push_back((self.start, String::new()));
        }
        Samples {
            automaton: self,
            co_reachable,
            queue,
            remaining: limit,
        }
    }

    /// States from which some non-error accepting state is reachable.
    fn co_reachable(&self) -> Vec<bool> {
        let n = self.state_count();
        let classes = self.relevant.len();
        let mut incoming: Vec<Vec<StateId>> = vec![Vec::new(); n];
        for i in 0..n {
            for k in 0..classes {
                let t = self.table[i * classes + k];
                if t != self.error {
                    incoming[t.index()].push(StateId::new(i));
                }
            }
        }
        let mut mark = vec![false; n];
        let mut stack: Vec<StateId> = (0..n)
            .map(StateId::new)
            .filter(|&s| s != self.error && self.accept[s.index()].is_some())
            .collect();
        for &s in &stack {
            mark[s.index()] = true;
        }
        while let Some(s) = stack.pop() {
            for &p in &incoming[s.index()] {
                if !mark[p.index()] {
                    mark[p.index()] = true;
                    stack.push(p);
                }
            }
        }
        mark
    }

    /// If the automaton is a branch-free chain accepting exactly one
    /// non-empty literal, return that literal and its token type.
    pub fn literal_walk(&self) -> Option<(String, TokenType)> {
        let mut literal = String::new();
        let mut state = self.start;
        loop {
            // A chain never revisits a state; longer walks are cycles.
            if literal.chars().count() > self.state_count() {
                return None;
            }
            let mut exit = None;
            for (k, &lo) in self.relevant.iter().enumerate() {
                if self.next(state, k) == self.error {
                    continue;
                }
                if exit.is_some() {
                    return None; // branching
                }
                // The class must cover exactly one character.
                let single = match self.relevant.get(k + 1) {
                    Some(&next_lo) => char_succ(lo) == Some(next_lo),
                    None => char_succ(lo).is_none(),
                };
                if !single {
                    return None;
                }
                exit = Some((k, lo));
            }
            match exit {
                Some((k, c)) => {
                    if self.accept(state).is_some() {
                        return None; // accepts a proper prefix too
                    }
                    literal.push(c);
                    state = self.next(state, k);
                }
                None => {
                    return match self.accept(state) {
                        Some(t) if !t.is_error() && !literal.is_empty() => Some((literal, t)),
                        _ => None,
                    };
                }
            }
        }
    }

    fn compute_acyclic(&self) -> bool {
        // Iterative DFS with white/grey/black coloring; the error sink's
        // self-loop does not count as a cycle.
        const WHITE: u8 = 0;
        const GREY: u8 = 1;
        const BLACK: u8 = 2;
        let mut color = vec![WHITE; self.state_count()];
        color[self.error.index()] = BLACK;
        let mut stack: Vec<(StateId, usize)> = vec![(self.start, 0)];
        if self.start == self.error {
            return true;
        }
        color[self.start.index()] = GREY;
        while let Some(&mut (state, ref mut k)) = stack.last_mut() {
            if *k == self.relevant.len() {
                color[state.index()] = BLACK;
                stack.pop();
                continue;
            }
            let next = self.next(state, *k);
            *k += 1;
            match color[next.index()] {
                GREY => return false,
                WHITE => {
                    color[next.index()] = GREY;
                    stack.push((next, 0));
                }
                _ => {}
            }
        }
        true
    }

    /// Human-readable node/edge listing for diagnostics. The format is
    /// descriptive, not stable.
    pub fn export_graph(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "tabled: {} states, {} classes",
            self.state_count(),
            self.class_count()
        );
        for i in 0..self.state_count() {
            let id = StateId::new(i);
            let _ = write!(out, "state {i}");
            if id == self.start {
                let _ = write!(out, " [start]");
            }
            if id == self.error {
                let _ = write!(out, " [error]");
            }
            if let Some(t) = self.accept(id) {
                let _ = write!(out, " [accept {t:?}]");
            }
            let _ = writeln!(out);
            for (k, &lo) in self.relevant.iter().enumerate() {
                let target = self.next(id, k);
                if target == self.error {
                    continue;
                }
                let hi = match self.relevant.get(k + 1).and_then(|&n| super::char_pred(n)) {
                    Some(hi) => hi,
                    None => super::CHAR_MAX,
                };
                if hi > lo {
                    let _ = writeln!(out, "  {lo:?}..={hi:?} -> {}", target.0);
                } else {
                    let _ = writeln!(out, "  {lo:?} -> {}", target.0);
                }
            }
        }
        out
    }
}

/// Breadth-first enumeration of accepted strings, shortest first.
pub struct Samples<'a> {
    automaton: &'a TabledAutomaton,
    co_reachable: Vec<bool>,
    queue: VecDeque<(StateId, String)>,
    remaining: usize,
}

impl Iterator for Samples<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while self.remaining > 0 {
            let (state, prefix) = self.queue.pop_front()?;
            for (k, &lo) in self.automaton.relevant.iter().enumerate() {
                let next = self.automaton.next(state, k);
                if self.automaton.is_error(next) || !self.co_reachable[next.index()] {
                    continue;
                }
                let hi = match self.automaton.relevant.get(k + 1).and_then(|&n| super::char_pred(n))
                {
                    Some(hi) => hi,
                    None => super::CHAR_MAX,
                };
                // Every character of a class reaches the same target, so
                // capping the per-class expansion at the remaining sample
                // count cannot drop a string from a language that fits
                // under the limit.
                let mut budget = self.remaining;
                let mut c = lo;
                loop {
                    let mut extended = prefix.clone();
                    extended.push(c);
                    self.queue.push_back((next, extended));
                    budget -= 1;
                    if budget == 0 || c == hi {
                        break;
                    }
                    c = match super::char_succ(c) {
                        Some(s) => s,
                        None => break,
                    };
                }
            }
            if self.automaton.accept(state).is_some() {
                self.remaining -= 1;
                return Some(prefix);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ClassItem, Pattern};
    use crate::automaton::{build_nfa, determinize, minimize};

    fn tabled(pattern: &Pattern) -> TabledAutomaton {
        let nfa = build_nfa(Some(pattern), TokenType::Accept).unwrap();
        TabledAutomaton::from_dfa(&minimize(&determinize(&nfa)))
    }

    #[test]
    fn test_step_and_accept() {
        let auto = tabled(&Pattern::literal("ab"));
        let s = auto.find_state("ab");
        assert_eq!(auto.accept(s), Some(TokenType::Accept));
        assert!(auto.is_error(auto.find_state("ax")));
        assert!(auto.accept(auto.find_state("a")).is_none());
    }

    #[test]
    fn test_lookup_is_total() {
        let auto = tabled(&Pattern::Range('a', 'f'));
        for i in 0..auto.state_count() {
            for k in 0..auto.class_count() {
                let t = auto.next(StateId::new(i), k);
                assert!(t.index() < auto.state_count());
            }
        }
    }

    #[test]
    fn test_char_classes_compress_ranges() {
        let auto = tabled(&Pattern::Range('a', 'z'));
        // below-range, in-range, above-range (per state behavior); the
        // merged partition stays tiny no matter the alphabet size.
        assert!(auto.class_count() <= 3, "got {} classes", auto.class_count());
        assert_eq!(auto.char_class_of('a'), auto.char_class_of('z'));
        assert_ne!(auto.char_class_of('a'), auto.char_class_of('A'));
    }

    #[test]
    fn test_find_path_to() {
        let auto = tabled(&Pattern::literal("abc"));
        let target = auto.find_state("ab");
        assert_eq!(auto.find_path_to(target), Some("ab".to_string()));
        assert_eq!(auto.find_path_to(auto.start()), Some(String::new()));
        assert_eq!(auto.find_path_to(auto.error()), None);
        assert_eq!(auto.find_path_to(StateId::new(9999)), None);
    }

    #[test]
    fn test_samples_shortest_first() {
        let auto = tabled(&Pattern::between(1, 3, Pattern::Char('a')));
        let samples: Vec<String> = auto.samples(10).collect();
        assert_eq!(samples, vec!["a", "aa", "aaa"]);
    }

    #[test]
    fn test_samples_cover_every_class_character() {
        // '0' and '1' share one char class after column merging; the
        // enumeration must still produce both strings.
        let auto = tabled(&Pattern::alt(vec![Pattern::Char('0'), Pattern::Char('1')]));
        let samples: Vec<String> = auto.samples(8).collect();
        assert_eq!(samples, vec!["0", "1"]);
    }

    #[test]
    fn test_samples_wide_class_respects_limit() {
        let auto = tabled(&Pattern::Range('a', 'z'));
        let samples: Vec<String> = auto.samples(5).collect();
        assert_eq!(samples, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_samples_bounded_on_cyclic() {
        let auto = tabled(&Pattern::plus(Pattern::Char('a')));
        let samples: Vec<String> = auto.samples(4).collect();
        assert_eq!(samples, vec!["a", "aa", "aaa", "aaaa"]);
    }

    #[test]
    fn test_samples_of_match_nothing() {
        let nfa = crate::automaton::Nfa::match_nothing();
        let auto = TabledAutomaton::from_dfa(&determinize(&nfa));
        assert_eq!(auto.samples(10).count(), 0);
    }

    #[test]
    fn test_properties_literal_chain() {
        let auto = tabled(&Pattern::literal("for"));
        let props = auto.properties();
        assert!(props.linear);
        assert!(props.acyclic);
        assert_eq!(
            auto.literal_walk(),
            Some(("for".to_string(), TokenType::Accept))
        );
    }

    #[test]
    fn test_properties_acyclic_not_linear() {
        let auto = tabled(&Pattern::alt(vec![
            Pattern::literal("cat"),
            Pattern::literal("dog"),
        ]));
        let props = auto.properties();
        assert!(!props.linear);
        assert!(props.acyclic);
        assert_eq!(auto.literal_walk(), None);
    }

    #[test]
    fn test_properties_cyclic() {
        let auto = tabled(&Pattern::star(Pattern::Char('x')));
        let props = auto.properties();
        assert!(!props.linear);
        assert!(!props.acyclic);
    }

    #[test]
    fn test_literal_walk_rejects_prefix_accepts() {
        // Accepts both "a" and "ab"; no single literal.
        let auto = tabled(&Pattern::seq(vec![
            Pattern::Char('a'),
            Pattern::optional(Pattern::Char('b')),
        ]));
        assert_eq!(auto.literal_walk(), None);
        assert!(!auto.properties().linear);
    }

    #[test]
    fn test_class_item_pattern() {
        let auto = tabled(&Pattern::class(vec![
            ClassItem::Char('_'),
            ClassItem::Range('a', 'z'),
        ]));
        assert!(auto.accept(auto.find_state("_")).is_some());
        assert!(auto.accept(auto.find_state("m")).is_some());
        assert!(auto.is_error(auto.find_state("A")));
    }

    #[test]
    fn test_export_graph_mentions_states() {
        let auto = tabled(&Pattern::Char('a'));
        let graph = auto.export_graph();
        assert!(graph.contains("[start]"));
        assert!(graph.contains("[error]"));
        assert!(graph.contains("[accept"));
    }
}
