//! The generic (nondeterministic) automaton.
//!
//! States live in an arena owned by the [`Nfa`]; transitions reference
//! states by [`StateId`] index, which allows the true cyclic structures
//! that `*` and `+` loops need without shared ownership. The graph is
//! mutable during construction only - every runtime form is derived from
//! it and the NFA is discarded afterwards.
//!
//! Traversal scratch (epsilon-closure stacks, seen bitmaps) lives in
//! [`ClosureScratch`], a reusable side buffer passed into the traversal
//! calls, never on the state records themselves.

use std::fmt;

use smallvec::SmallVec;

use super::{char_succ, StateId, CHAR_MAX, CHAR_MIN};
use crate::token::TokenType;

/// An outgoing transition of an NFA state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NfaEdge {
    /// Spontaneous transition consuming no input.
    Epsilon(StateId),
    /// Consume exactly this character.
    Exact(char, StateId),
    /// Consume any character in the inclusive range.
    Range(char, char, StateId),
}

impl NfaEdge {
    #[inline]
    pub fn target(self) -> StateId {
        match self {
            NfaEdge::Epsilon(t) | NfaEdge::Exact(_, t) | NfaEdge::Range(_, _, t) => t,
        }
    }

    #[inline]
    pub fn is_epsilon(self) -> bool {
        matches!(self, NfaEdge::Epsilon(_))
    }

    /// The character interval this edge consumes, if any.
    #[inline]
    pub fn interval(self) -> Option<(char, char)> {
        match self {
            NfaEdge::Epsilon(_) => None,
            NfaEdge::Exact(c, _) => Some((c, c)),
            NfaEdge::Range(lo, hi, _) => Some((lo, hi)),
        }
    }

    fn with_target(self, target: StateId) -> NfaEdge {
        match self {
            NfaEdge::Epsilon(_) => NfaEdge::Epsilon(target),
            NfaEdge::Exact(c, _) => NfaEdge::Exact(c, target),
            NfaEdge::Range(lo, hi, _) => NfaEdge::Range(lo, hi, target),
        }
    }
}

/// A state in the generic automaton.
#[derive(Clone, Default, Debug)]
pub struct NfaState {
    /// Accept label; absent on non-accepting states. Never the error
    /// sentinel.
    pub token: Option<TokenType>,
    /// Ordered outgoing transitions.
    pub edges: SmallVec<[NfaEdge; 4]>,
}

/// Reusable buffers for epsilon-closure computation.
///
/// Keeping these out of the automaton itself is what keeps a compiled
/// automaton free of per-run mutable state.
#[derive(Default)]
pub struct ClosureScratch {
    seen: Vec<bool>,
    stack: Vec<StateId>,
}

impl ClosureScratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_capacity(&mut self, states: usize) {
        if self.seen.len() < states {
            self.seen.resize(states, false);
        }
    }
}

/// The generic automaton: an arena of states plus a designated start.
///
/// Reachability is implied by graph connectivity; no separate index is
/// authoritative.
#[derive(Clone, Default, Debug)]
pub struct Nfa {
    states: Vec<NfaState>,
    pub start: StateId,
}

impl Nfa {
    /// An automaton with a single, non-accepting, edgeless start state.
    /// No path leads to an accepting state: this matches nothing.
    pub fn match_nothing() -> Nfa {
        Nfa {
            states: vec![NfaState::default()],
            start: StateId(0),
        }
    }

    /// An automaton whose start state accepts with zero consumed
    /// characters.
    pub fn match_empty(token: TokenType) -> Nfa {
        let mut nfa = Nfa::match_nothing();
        nfa.set_token(nfa.start, Some(token));
        nfa
    }

    /// Allocate a fresh state, returning its id.
    pub fn alloc(&mut self) -> StateId {
        let id = StateId::new(self.states.len());
        self.states.push(NfaState::default());
        id
    }

    #[inline]
    pub fn state(&self, id: StateId) -> &NfaState {
        &self.states[id.index()]
    }

    #[inline]
    pub fn state_mut(&mut self, id: StateId) -> &mut NfaState {
        &mut self.states[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn add_epsilon(&mut self, from: StateId, to: StateId) {
        self.state_mut(from).edges.push(NfaEdge::Epsilon(to));
    }

    pub fn add_exact(&mut self, from: StateId, c: char, to: StateId) {
        self.state_mut(from).edges.push(NfaEdge::Exact(c, to));
    }

    pub fn add_range(&mut self, from: StateId, lo: char, hi: char, to: StateId) {
        self.state_mut(from).edges.push(NfaEdge::Range(lo, hi, to));
    }

    pub fn set_token(&mut self, id: StateId, token: Option<TokenType>) {
        debug_assert!(
            token.map_or(true, |t| !t.is_error()),
            "accepting states never carry the error sentinel"
        );
        self.state_mut(id).token = token;
    }

    /// All states carrying an accept label.
    pub fn accepting_states(&self) -> Vec<StateId> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| s.token.is_some())
            .map(|(i, _)| StateId::new(i))
            .collect()
    }

    /// Append the epsilon closure of `start` (including `start`) to
    /// `out`, in discovery order.
    pub fn epsilon_closure(
        &self,
        start: StateId,
        scratch: &mut ClosureScratch,
        out: &mut Vec<StateId>,
    ) {
        scratch.ensure_capacity(self.states.len());
        let first = out.len();

        out.push(start);
        scratch.stack.push(start);
        scratch.seen[start.index()] = true;

        while let Some(id) = scratch.stack.pop() {
            for edge in &self.state(id).edges {
                if let NfaEdge::Epsilon(target) = *edge {
                    if !scratch.seen[target.index()] {
                        scratch.seen[target.index()] = true;
                        out.push(target);
                        scratch.stack.push(target);
                    }
                }
            }
        }

        // Reset the seen markers for the next call.
        for &id in &out[first..] {
            scratch.seen[id.index()] = false;
        }
    }

    /// Remove all epsilon edges.
    ///
    /// Each state takes over the character transitions of its entire
    /// epsilon closure, and its accept label becomes the algebra union
    /// of the labels across that closure.
    pub fn eliminate_epsilons(&mut self) {
        let mut scratch = ClosureScratch::new();
        let mut closure = Vec::new();
        let mut rewritten: Vec<(Option<TokenType>, SmallVec<[NfaEdge; 4]>)> =
            Vec::with_capacity(self.states.len());

        for i in 0..self.states.len() {
            closure.clear();
            self.epsilon_closure(StateId::new(i), &mut scratch, &mut closure);

            let mut token = None;
            let mut edges: SmallVec<[NfaEdge; 4]> = SmallVec::new();
            for &member in &closure {
                let state = self.state(member);
                token = TokenType::union_opt(token, state.token);
                for &edge in &state.edges {
                    if !edge.is_epsilon() {
                        edges.push(edge);
                    }
                }
            }
            rewritten.push((token, edges));
        }

        for (i, (token, edges)) in rewritten.into_iter().enumerate() {
            let state = &mut self.states[i];
            state.token = token;
            state.edges = edges;
        }
        self.dedupe_edges();
    }

    /// Drop duplicate transitions, preserving first-seen order.
    pub fn dedupe_edges(&mut self) {
        for state in &mut self.states {
            let mut kept: SmallVec<[NfaEdge; 4]> = SmallVec::new();
            for &edge in &state.edges {
                if !kept.contains(&edge) {
                    kept.push(edge);
                }
            }
            state.edges = kept;
        }
    }

    /// The reversed automaton: every edge flipped, a synthetic start
    /// epsilon-joined to each former accepting state, and the former
    /// start as the only accepting state.
    ///
    /// Labels do not survive reversal; the reverse automaton only ever
    /// answers "does an accepting path end here", which is all the
    /// match-boundary search needs.
    pub fn reverse(&self) -> Nfa {
        let mut rev = Nfa {
            states: (0..self.states.len())
                .map(|_| NfaState::default())
                .collect(),
            start: StateId(0),
        };

        for (i, state) in self.states.iter().enumerate() {
            let from = StateId::new(i);
            for &edge in &state.edges {
                let flipped = edge.with_target(from);
                rev.state_mut(edge.target()).edges.push(flipped);
            }
        }

        let old_start_accepting = self.state(self.start).token.is_some();
        rev.set_token(self.start, Some(TokenType::Accept));

        let entry = rev.alloc();
        for id in self.accepting_states() {
            rev.add_epsilon(entry, id);
        }
        // An accepting start means the empty string is in the language;
        // it stays in the language of the reversal.
        if old_start_accepting {
            rev.set_token(entry, Some(TokenType::Accept));
        }
        rev.start = entry;
        rev
    }

    /// Add a full-domain self-loop on the start state, turning a match
    /// automaton into a search automaton that also matches starting at
    /// any later offset.
    pub fn add_start_self_loop(&mut self) {
        let start = self.start;
        self.add_range(start, CHAR_MIN, CHAR_MAX, start);
    }

    /// States reachable from the start by any edge.
    pub fn reachable(&self) -> Vec<StateId> {
        let mut seen = vec![false; self.states.len()];
        let mut stack = vec![self.start];
        let mut out = Vec::new();
        seen[self.start.index()] = true;
        while let Some(id) = stack.pop() {
            out.push(id);
            for &edge in &self.state(id).edges {
                let t = edge.target();
                if !seen[t.index()] {
                    seen[t.index()] = true;
                    stack.push(t);
                }
            }
        }
        out
    }
}

impl fmt::Display for Nfa {
    /// Human-readable node/edge listing for diagnostics. The format is
    /// descriptive only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "nfa: {} states, start {}", self.states.len(), self.start.0)?;
        for (i, state) in self.states.iter().enumerate() {
            match state.token {
                Some(t) => writeln!(f, "  state {i} [accept {t:?}]")?,
                None => writeln!(f, "  state {i}")?,
            }
            for &edge in &state.edges {
                match edge {
                    NfaEdge::Epsilon(t) => writeln!(f, "    eps -> {}", t.0)?,
                    NfaEdge::Exact(c, t) => writeln!(f, "    {c:?} -> {}", t.0)?,
                    NfaEdge::Range(lo, hi, t) => {
                        writeln!(f, "    {lo:?}..={hi:?} -> {}", t.0)?
                    }
                }
            }
        }
        Ok(())
    }
}

/// Collect the sorted, deduplicated interval boundary points of a set of
/// edges: for every `[lo, hi]` interval, `lo` and the successor of `hi`.
/// Shared by determinization and char-class computation.
pub(crate) fn interval_boundaries(
    intervals: impl Iterator<Item = (char, char)>,
    out: &mut Vec<char>,
) {
    for (lo, hi) in intervals {
        out.push(lo);
        if let Some(next) = char_succ(hi) {
            out.push(next);
        }
    }
    out.sort_unstable();
    out.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_ab() -> Nfa {
        // start --a--> s1 --b--> s2 [accept]
        let mut nfa = Nfa::match_nothing();
        let s1 = nfa.alloc();
        let s2 = nfa.alloc();
        nfa.add_exact(nfa.start, 'a', s1);
        nfa.add_exact(s1, 'b', s2);
        nfa.set_token(s2, Some(TokenType::Accept));
        nfa
    }

    #[test]
    fn test_epsilon_closure_follows_chains() {
        let mut nfa = Nfa::match_nothing();
        let a = nfa.alloc();
        let b = nfa.alloc();
        let c = nfa.alloc();
        nfa.add_epsilon(nfa.start, a);
        nfa.add_epsilon(a, b);
        nfa.add_exact(b, 'x', c);

        let mut scratch = ClosureScratch::new();
        let mut closure = Vec::new();
        nfa.epsilon_closure(nfa.start, &mut scratch, &mut closure);
        assert_eq!(closure, vec![nfa.start, a, b]);
    }

    #[test]
    fn test_epsilon_closure_handles_cycles() {
        let mut nfa = Nfa::match_nothing();
        let a = nfa.alloc();
        nfa.add_epsilon(nfa.start, a);
        nfa.add_epsilon(a, nfa.start);

        let mut scratch = ClosureScratch::new();
        let mut closure = Vec::new();
        nfa.epsilon_closure(a, &mut scratch, &mut closure);
        assert_eq!(closure.len(), 2);
    }

    #[test]
    fn test_eliminate_epsilons_pulls_tokens_and_edges() {
        // start --eps--> a [accept], a --x--> b
        let mut nfa = Nfa::match_nothing();
        let a = nfa.alloc();
        let b = nfa.alloc();
        nfa.add_epsilon(nfa.start, a);
        nfa.add_exact(a, 'x', b);
        nfa.set_token(a, Some(TokenType::Label(1)));

        nfa.eliminate_epsilons();

        let start = nfa.state(nfa.start);
        assert_eq!(start.token, Some(TokenType::Label(1)));
        assert_eq!(start.edges.len(), 1);
        assert_eq!(start.edges[0], NfaEdge::Exact('x', b));
        assert!(nfa.states.iter().all(|s| s.edges.iter().all(|e| !e.is_epsilon())));
    }

    #[test]
    fn test_dedupe_edges() {
        let mut nfa = Nfa::match_nothing();
        let a = nfa.alloc();
        nfa.add_exact(nfa.start, 'x', a);
        nfa.add_exact(nfa.start, 'x', a);
        nfa.add_range(nfa.start, 'a', 'z', a);
        nfa.dedupe_edges();
        assert_eq!(nfa.state(nfa.start).edges.len(), 2);
    }

    #[test]
    fn test_reverse_flips_edges() {
        let nfa = chain_ab();
        let rev = nfa.reverse();

        // Synthetic entry has an epsilon to the former accept state.
        let entry = rev.state(rev.start);
        assert_eq!(entry.token, None);
        assert_eq!(entry.edges.len(), 1);
        let s2 = entry.edges[0].target();
        // s2 --b--> s1 --a--> old start [accept]
        assert_eq!(rev.state(s2).edges.len(), 1);
        let s1 = rev.state(s2).edges[0].target();
        assert_eq!(rev.state(s2).edges[0], NfaEdge::Exact('b', s1));
        let old_start = rev.state(s1).edges[0].target();
        assert_eq!(rev.state(s1).edges[0], NfaEdge::Exact('a', old_start));
        assert_eq!(rev.state(old_start).token, Some(TokenType::Accept));
    }

    #[test]
    fn test_reverse_of_empty_match_keeps_empty() {
        let nfa = Nfa::match_empty(TokenType::Accept);
        let rev = nfa.reverse();
        assert_eq!(rev.state(rev.start).token, Some(TokenType::Accept));
    }

    #[test]
    fn test_self_loop_augmentation() {
        let mut nfa = chain_ab();
        nfa.add_start_self_loop();
        let edges = &nfa.state(nfa.start).edges;
        assert!(edges
            .iter()
            .any(|e| matches!(e, NfaEdge::Range(CHAR_MIN, CHAR_MAX, t) if *t == nfa.start)));
    }

    #[test]
    fn test_clone_is_deep() {
        let nfa = chain_ab();
        let mut copy = nfa.clone();
        let extra = copy.alloc();
        copy.add_exact(copy.start, 'z', extra);
        assert_eq!(nfa.len() + 1, copy.len());
        assert_eq!(nfa.state(nfa.start).edges.len(), 1);
        assert_eq!(copy.state(copy.start).edges.len(), 2);
    }

    #[test]
    fn test_reachable() {
        let mut nfa = chain_ab();
        let orphan = nfa.alloc();
        let _ = orphan;
        assert_eq!(nfa.reachable().len(), 3);
    }

    #[test]
    fn test_interval_boundaries() {
        let mut out = Vec::new();
        interval_boundaries([('a', 'c'), ('b', 'z')].into_iter(), &mut out);
        assert_eq!(out, vec!['a', 'b', 'd', '{']);
    }
}
