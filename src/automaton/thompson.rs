//! Thompson construction: pattern tree -> NFA.
//!
//! Every pattern node becomes a fragment with one entry and one exit
//! state, allocated in the automaton's shared arena and glued together
//! with epsilon edges. Quantifiers expand the way the fragment rules
//! require: bounded loops into mandatory copies followed by
//! independently skippable optional copies (a single shared skip would
//! break upper-bound counting), unbounded loops into `min - 1` plain
//! copies plus one loop-back copy.

use super::nfa::Nfa;
use super::StateId;
use crate::ast::{ClassItem, Pattern};
use crate::token::TokenType;
use crate::CompileError;

/// An NFA fragment under construction: one way in, one way out.
#[derive(Clone, Copy, Debug)]
struct Fragment {
    entry: StateId,
    exit: StateId,
}

/// Build an NFA for `pattern`, labeling the final accepting state with
/// `token`. A `None` pattern yields the match-nothing automaton.
pub fn build_nfa(pattern: Option<&Pattern>, token: TokenType) -> Result<Nfa, CompileError> {
    let Some(pattern) = pattern else {
        return Ok(Nfa::match_nothing());
    };
    let mut nfa = Nfa::default();
    let frag = build_fragment(&mut nfa, pattern)?;
    nfa.start = frag.entry;
    nfa.set_token(frag.exit, Some(token));
    Ok(nfa)
}

/// Build a single NFA for a set of labeled patterns: a fresh start state
/// epsilon-branches into each pattern's fragment, and each fragment's
/// exit carries its own token type. This is the lexer construction.
pub fn build_lexer_nfa(specs: &[(Pattern, TokenType)]) -> Result<Nfa, CompileError> {
    let mut nfa = Nfa::default();
    let start = nfa.alloc();
    nfa.start = start;
    for (pattern, token) in specs {
        let frag = build_fragment(&mut nfa, pattern)?;
        nfa.add_epsilon(start, frag.entry);
        nfa.set_token(frag.exit, Some(*token));
    }
    Ok(nfa)
}

fn build_fragment(nfa: &mut Nfa, pattern: &Pattern) -> Result<Fragment, CompileError> {
    match pattern {
        Pattern::Char(c) => Ok(leaf(nfa, |n, entry, exit| n.add_exact(entry, *c, exit))),
        Pattern::Range(lo, hi) => {
            if lo > hi {
                return Err(CompileError::InvalidRange { lo: *lo, hi: *hi });
            }
            Ok(leaf(nfa, |n, entry, exit| n.add_range(entry, *lo, *hi, exit)))
        }
        Pattern::Literal(s) => Ok(literal_fragment(nfa, s)),
        Pattern::Empty => Ok(empty_fragment(nfa)),
        Pattern::Group(inner) => build_fragment(nfa, inner),
        Pattern::Concat(parts) => {
            if parts.is_empty() {
                return Ok(empty_fragment(nfa));
            }
            let mut frags = Vec::with_capacity(parts.len());
            for part in parts {
                frags.push(build_fragment(nfa, part)?);
            }
            Ok(concat(nfa, &frags))
        }
        Pattern::Alternation(parts) => {
            let entry = nfa.alloc();
            let exit = nfa.alloc();
            for part in parts {
                let frag = build_fragment(nfa, part)?;
                nfa.add_epsilon(entry, frag.entry);
                nfa.add_epsilon(frag.exit, exit);
            }
            // Zero alternatives leave no path from entry to exit: the
            // fragment matches nothing.
            Ok(Fragment { entry, exit })
        }
        Pattern::Class(items) => {
            let entry = nfa.alloc();
            let exit = nfa.alloc();
            for item in items {
                let frag = match item {
                    ClassItem::Char(c) => leaf(nfa, |n, en, ex| n.add_exact(en, *c, ex)),
                    ClassItem::Range(lo, hi) => {
                        if lo > hi {
                            return Err(CompileError::InvalidRange { lo: *lo, hi: *hi });
                        }
                        leaf(nfa, |n, en, ex| n.add_range(en, *lo, *hi, ex))
                    }
                };
                nfa.add_epsilon(entry, frag.entry);
                nfa.add_epsilon(frag.exit, exit);
            }
            Ok(Fragment { entry, exit })
        }
        Pattern::Optional(inner) => {
            let frag = build_fragment(nfa, inner)?;
            Ok(optional(nfa, frag))
        }
        Pattern::Loop { min, max, inner } => build_loop(nfa, *min, *max, inner),
        Pattern::Complement(_) => Err(CompileError::UnsupportedConstruct("complement")),
        Pattern::Conjunction(_) => Err(CompileError::UnsupportedConstruct("conjunction")),
    }
}

fn leaf(nfa: &mut Nfa, edge: impl FnOnce(&mut Nfa, StateId, StateId)) -> Fragment {
    let entry = nfa.alloc();
    let exit = nfa.alloc();
    edge(nfa, entry, exit);
    Fragment { entry, exit }
}

/// A fragment whose entry is also its exit, consuming nothing.
fn empty_fragment(nfa: &mut Nfa) -> Fragment {
    let state = nfa.alloc();
    Fragment {
        entry: state,
        exit: state,
    }
}

fn literal_fragment(nfa: &mut Nfa, s: &str) -> Fragment {
    let entry = nfa.alloc();
    let mut current = entry;
    for c in s.chars() {
        let next = nfa.alloc();
        nfa.add_exact(current, c, next);
        current = next;
    }
    Fragment {
        entry,
        exit: current,
    }
}

/// Epsilon-link a sequence of fragments end to end.
fn concat(nfa: &mut Nfa, frags: &[Fragment]) -> Fragment {
    for pair in frags.windows(2) {
        nfa.add_epsilon(pair[0].exit, pair[1].entry);
    }
    Fragment {
        entry: frags[0].entry,
        exit: frags[frags.len() - 1].exit,
    }
}

/// Wrap a fragment so it may be skipped.
fn optional(nfa: &mut Nfa, frag: Fragment) -> Fragment {
    let entry = nfa.alloc();
    let exit = nfa.alloc();
    nfa.add_epsilon(entry, exit);
    nfa.add_epsilon(entry, frag.entry);
    nfa.add_epsilon(frag.exit, exit);
    Fragment { entry, exit }
}

/// Wrap a fragment in a Kleene star: zero or more passes.
fn star(nfa: &mut Nfa, frag: Fragment) -> Fragment {
    let entry = nfa.alloc();
    let exit = nfa.alloc();
    nfa.add_epsilon(entry, frag.entry);
    nfa.add_epsilon(entry, exit);
    nfa.add_epsilon(frag.exit, frag.entry);
    nfa.add_epsilon(frag.exit, exit);
    Fragment { entry, exit }
}

/// Wrap a fragment in a loop-back: one or more passes.
fn plus(nfa: &mut Nfa, frag: Fragment) -> Fragment {
    let entry = nfa.alloc();
    let exit = nfa.alloc();
    nfa.add_epsilon(entry, frag.entry);
    nfa.add_epsilon(frag.exit, frag.entry);
    nfa.add_epsilon(frag.exit, exit);
    Fragment { entry, exit }
}

fn build_loop(
    nfa: &mut Nfa,
    min: u32,
    max: Option<u32>,
    inner: &Pattern,
) -> Result<Fragment, CompileError> {
    match max {
        None => {
            // Unbounded: min-1 plain copies, then one loop-back copy
            // (or a star when the loop may be skipped entirely).
            if min == 0 {
                let frag = build_fragment(nfa, inner)?;
                return Ok(star(nfa, frag));
            }
            let mut frags = Vec::with_capacity(min as usize);
            for _ in 0..min - 1 {
                frags.push(build_fragment(nfa, inner)?);
            }
            let last = build_fragment(nfa, inner)?;
            frags.push(plus(nfa, last));
            Ok(concat(nfa, &frags))
        }
        Some(max) => {
            if min > max {
                return Err(CompileError::InvalidBounds { min, max });
            }
            if max == 0 {
                return Ok(empty_fragment(nfa));
            }
            // min mandatory copies, then max-min optional copies chained
            // so each is skippable on its own.
            let mut frags = Vec::with_capacity(max as usize);
            for _ in 0..min {
                frags.push(build_fragment(nfa, inner)?);
            }
            for _ in min..max {
                let frag = build_fragment(nfa, inner)?;
                frags.push(optional(nfa, frag));
            }
            Ok(concat(nfa, &frags))
        }
    }
}
