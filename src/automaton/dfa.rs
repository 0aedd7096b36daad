//! The deterministic automaton and the transforms that produce it.
//!
//! Determinization is subset construction: a DFA state is the memoized
//! identity of a set of NFA states. Sets are canonicalized (sorted,
//! deduplicated, epsilon-closed) and interned in a hash map so identical
//! member sets always reuse the same DFA state - that is what keeps the
//! construction finite. Accept labels are combined with the token-type
//! algebra.
//!
//! Totalization adds the explicit error sink so every lookup is defined;
//! minimization is partition refinement seeded by accept label.

use std::fmt;

use log::debug;
use rustc_hash::FxHashMap;

use super::nfa::{interval_boundaries, ClosureScratch, Nfa};
use super::{char_pred, char_succ, StateId, CHAR_MAX, CHAR_MIN};
use crate::token::TokenType;

/// One transition interval of a DFA state. Intervals of a single state
/// are sorted and pairwise disjoint.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DfaTransition {
    pub lo: char,
    pub hi: char,
    pub target: StateId,
}

/// A state in the deterministic automaton.
#[derive(Clone, Default, Debug)]
pub struct DfaState {
    /// Accept label; the error sink carries `TokenType::Error`.
    pub token: Option<TokenType>,
    pub transitions: Vec<DfaTransition>,
}

/// The deterministic automaton. After [`Dfa::totalize`] the transition
/// function is total: every state covers the whole character domain and
/// `error` names the self-looping sink.
#[derive(Clone, Default, Debug)]
pub struct Dfa {
    states: Vec<DfaState>,
    pub start: StateId,
    pub error: Option<StateId>,
}

impl Dfa {
    #[inline]
    pub fn state(&self, id: StateId) -> &DfaState {
        &self.states[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn alloc(&mut self) -> StateId {
        let id = StateId::new(self.states.len());
        self.states.push(DfaState::default());
        id
    }

    /// Follow the transition for `c`, if one is defined.
    pub fn step(&self, from: StateId, c: char) -> Option<StateId> {
        self.state(from)
            .transitions
            .iter()
            .find(|t| t.lo <= c && c <= t.hi)
            .map(|t| t.target)
    }

    /// Replay `text` from the start state. `None` once a character has
    /// no defined transition (impossible after totalization).
    pub fn run(&self, text: &str) -> Option<StateId> {
        let mut state = self.start;
        for c in text.chars() {
            state = self.step(state, c)?;
        }
        Some(state)
    }

    /// Make the transition function total: any uncovered interval of any
    /// state is pointed at the error sink, which self-loops over the
    /// whole domain. Idempotent.
    pub fn totalize(&mut self) {
        let error = match self.error {
            Some(e) => e,
            None => {
                let e = self.alloc();
                self.states[e.index()].token = Some(TokenType::Error);
                self.error = Some(e);
                e
            }
        };

        for state in &mut self.states {
            state.transitions.sort_by_key(|t| t.lo);
            let mut filled = Vec::with_capacity(state.transitions.len() + 2);
            let mut next_lo = Some(CHAR_MIN);
            for &t in &state.transitions {
                if let Some(lo) = next_lo {
                    if lo < t.lo {
                        // lo < t.lo, so t.lo has a predecessor.
                        push_merged(&mut filled, lo, char_pred(t.lo).unwrap(), error);
                    }
                }
                push_merged(&mut filled, t.lo, t.hi, t.target);
                next_lo = char_succ(t.hi);
            }
            if let Some(lo) = next_lo {
                push_merged(&mut filled, lo, CHAR_MAX, error);
            }
            state.transitions = filled;
        }
    }
}

impl fmt::Display for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "dfa: {} states, start {}, error {:?}",
            self.states.len(),
            self.start.0,
            self.error.map(|e| e.0)
        )?;
        for (i, state) in self.states.iter().enumerate() {
            match state.token {
                Some(t) => writeln!(f, "  state {i} [accept {t:?}]")?,
                None => writeln!(f, "  state {i}")?,
            }
            for t in &state.transitions {
                writeln!(f, "    {:?}..={:?} -> {}", t.lo, t.hi, t.target.0)?;
            }
        }
        Ok(())
    }
}

/// Append a transition, coalescing with the previous one when the
/// intervals are contiguous and share a target.
fn push_merged(transitions: &mut Vec<DfaTransition>, lo: char, hi: char, target: StateId) {
    if let Some(last) = transitions.last_mut() {
        if last.target == target && char_succ(last.hi) == Some(lo) {
            last.hi = hi;
            return;
        }
    }
    transitions.push(DfaTransition { lo, hi, target });
}

/// Subset construction.
///
/// Works directly on an NFA with or without epsilon edges: member sets
/// are always epsilon-closed before being canonicalized.
pub fn determinize(nfa: &Nfa) -> Dfa {
    let mut scratch = ClosureScratch::new();
    let mut dfa = Dfa::default();

    // Interned member sets; the map is what guarantees termination.
    let mut memo: FxHashMap<Box<[StateId]>, StateId> = FxHashMap::default();
    let mut sets: Vec<Box<[StateId]>> = Vec::new();
    let mut worklist: Vec<StateId> = Vec::new();

    let mut start_set = Vec::new();
    nfa.epsilon_closure(nfa.start, &mut scratch, &mut start_set);
    let start = intern(
        nfa,
        start_set,
        &mut dfa,
        &mut memo,
        &mut sets,
        &mut worklist,
    );
    dfa.start = start;

    let mut bounds = Vec::new();
    while let Some(id) = worklist.pop() {
        let members = sets[id.index()].clone();

        bounds.clear();
        interval_boundaries(
            members
                .iter()
                .flat_map(|&m| nfa.state(m).edges.iter())
                .filter_map(|e| e.interval()),
            &mut bounds,
        );

        for (i, &lo) in bounds.iter().enumerate() {
            let hi = match bounds.get(i + 1) {
                // Boundaries are interval starts, so every later
                // boundary has a predecessor.
                Some(&next) => char_pred(next).unwrap(),
                None => CHAR_MAX,
            };

            let mut targets = Vec::new();
            for &m in members.iter() {
                for &edge in &nfa.state(m).edges {
                    if let Some((elo, ehi)) = edge.interval() {
                        if elo <= lo && lo <= ehi {
                            nfa.epsilon_closure(edge.target(), &mut scratch, &mut targets);
                        }
                    }
                }
            }
            if targets.is_empty() {
                continue;
            }
            let target = intern(nfa, targets, &mut dfa, &mut memo, &mut sets, &mut worklist);
            push_merged(&mut dfa.states[id.index()].transitions, lo, hi, target);
        }
    }

    debug!(
        "determinized {} nfa states into {} dfa states",
        nfa.len(),
        dfa.len()
    );
    dfa
}

/// Canonicalize a closed member set and map it to its DFA state,
/// creating one (with the algebra-combined accept label) on first sight.
fn intern(
    nfa: &Nfa,
    mut members: Vec<StateId>,
    dfa: &mut Dfa,
    memo: &mut FxHashMap<Box<[StateId]>, StateId>,
    sets: &mut Vec<Box<[StateId]>>,
    worklist: &mut Vec<StateId>,
) -> StateId {
    members.sort_unstable();
    members.dedup();
    let key: Box<[StateId]> = members.into_boxed_slice();

    if let Some(&id) = memo.get(&key) {
        return id;
    }

    let mut token = None;
    for &m in key.iter() {
        token = TokenType::union_opt(token, nfa.state(m).token);
    }

    let id = dfa.alloc();
    dfa.states[id.index()].token = token;
    memo.insert(key.clone(), id);
    sets.push(key);
    worklist.push(id);
    id
}

/// Partition-refinement minimization.
///
/// States are grouped by accept label, then groups are split whenever
/// two members disagree on the group of some transition target, until
/// the partition is stable. The input is totalized first so signatures
/// are comparable over a common char-class partition.
pub fn minimize(dfa: &Dfa) -> Dfa {
    let mut total = dfa.clone();
    total.totalize();
    let n = total.len();

    // Global char-class representatives: one probe char per interval of
    // the coarsest partition all transitions respect.
    let mut bounds = vec![CHAR_MIN];
    interval_boundaries(
        total
            .states
            .iter()
            .flat_map(|s| s.transitions.iter())
            .map(|t| (t.lo, t.hi)),
        &mut bounds,
    );

    // Seed the partition by accept label.
    let mut group: Vec<usize> = vec![0; n];
    {
        let mut by_token: FxHashMap<Option<TokenType>, usize> = FxHashMap::default();
        for (i, state) in total.states.iter().enumerate() {
            let next = by_token.len();
            group[i] = *by_token.entry(state.token).or_insert(next);
        }
    }
    let mut group_count = group.iter().max().map_or(0, |g| g + 1);

    loop {
        let mut sig_map: FxHashMap<(usize, Vec<usize>), usize> = FxHashMap::default();
        let mut next_group = vec![0; n];
        for (i, g) in next_group.iter_mut().enumerate() {
            // The table is total after totalize, so every probe lands.
            let sig: Vec<usize> = bounds
                .iter()
                .map(|&c| group[total.step(StateId::new(i), c).unwrap().index()])
                .collect();
            let key = (group[i], sig);
            let next = sig_map.len();
            *g = *sig_map.entry(key).or_insert(next);
        }
        let next_count = sig_map.len();
        group = next_group;
        if next_count == group_count {
            break;
        }
        group_count = next_count;
    }

    // Merge each final group into one state, keeping group numbering.
    let mut out = Dfa::default();
    for _ in 0..group_count {
        out.alloc();
    }
    let mut built = vec![false; group_count];
    for (i, state) in total.states.iter().enumerate() {
        let g = group[i];
        if built[g] {
            continue;
        }
        built[g] = true;
        out.states[g].token = state.token;
        let mut transitions = Vec::new();
        for &t in &state.transitions {
            push_merged(&mut transitions, t.lo, t.hi, StateId::new(group[t.target.index()]));
        }
        out.states[g].transitions = transitions;
    }
    out.start = StateId::new(group[total.start.index()]);
    out.error = total.error.map(|e| StateId::new(group[e.index()]));

    debug!("minimized {} dfa states into {}", n, out.len());
    out
}
