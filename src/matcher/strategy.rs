//! Performance dispatch for unanchored search.
//!
//! A compiled automaton that is just a literal chain is searched with
//! `memchr`'s substring search; a small finite language is searched as
//! a set of literals; everything else runs the full automaton triple.
//! All three paths produce identical match boundaries and token types.

use log::debug;
use memchr::memmem;

use super::engine::Match;
use crate::automaton::TabledAutomaton;
use crate::cursor::Cursor;
use crate::token::TokenType;

/// Cap on enumerating a finite language for the multi-literal path.
pub const MAX_ENUMERATED: usize = 32;

/// The search strategy chosen for a compiled automaton.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SearchPlan {
    /// The automaton accepts exactly one non-empty literal.
    Literal(String, TokenType),
    /// A finite language small enough to enumerate.
    MultiLiteral(Vec<(String, TokenType)>),
    /// Everything else: the reverse+complete automaton search.
    Automaton,
}

/// Pick the strategy for `automaton`. Purely a dispatch decision; the
/// match semantics do not depend on it.
pub fn plan(automaton: &TabledAutomaton) -> SearchPlan {
    let props = automaton.properties();
    if props.linear {
        if let Some((literal, token)) = automaton.literal_walk() {
            debug!("search plan: literal {literal:?}");
            return SearchPlan::Literal(literal, token);
        }
    }
    if props.acyclic {
        let samples: Vec<String> = automaton.samples(MAX_ENUMERATED + 1).collect();
        if !samples.is_empty()
            && samples.len() <= MAX_ENUMERATED
            && samples.iter().all(|s| !s.is_empty())
        {
            let mut literals = Vec::with_capacity(samples.len());
            for sample in samples {
                if let Some(token) = automaton.accept(automaton.find_state(&sample)) {
                    literals.push((sample, token));
                }
            }
            debug!("search plan: {} literals", literals.len());
            return SearchPlan::MultiLiteral(literals);
        }
    }
    debug!("search plan: automaton");
    SearchPlan::Automaton
}

/// One-match-at-a-time search, offsets in characters.
pub trait StringFinder {
    fn find_next(&mut self) -> Option<Match>;

    /// Never look at anything before `offset` again.
    fn skip_to(&mut self, offset: usize);
}

/// Byte offset of every character in `text`, with the total byte
/// length appended so lookups at the end stay in range.
fn char_starts(text: &str) -> Vec<usize> {
    let mut starts: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
    starts.push(text.len());
    starts
}

/// Maps a byte offset on a character boundary back to its character
/// index.
fn char_index(starts: &[usize], byte: usize) -> usize {
    match starts.binary_search(&byte) {
        Ok(i) => i,
        Err(i) => i,
    }
}

/// Substring search for the single-literal plan.
pub struct LiteralFinder {
    haystack: String,
    starts: Vec<usize>,
    finder: memmem::Finder<'static>,
    needle_bytes: usize,
    needle_chars: usize,
    literal: String,
    token: TokenType,
    pos: usize,
}

impl LiteralFinder {
    pub fn new<C: Cursor>(cursor: &C, literal: String, token: TokenType) -> LiteralFinder {
        let haystack = cursor.slice(0, cursor.len());
        let starts = char_starts(&haystack);
        LiteralFinder {
            starts,
            finder: memmem::Finder::new(literal.as_bytes()).into_owned(),
            needle_bytes: literal.len(),
            needle_chars: literal.chars().count(),
            literal,
            token,
            haystack,
            pos: 0,
        }
    }
}

impl StringFinder for LiteralFinder {
    fn find_next(&mut self) -> Option<Match> {
        // A valid UTF-8 needle only ever matches on char boundaries.
        let at = self.finder.find(&self.haystack.as_bytes()[self.pos..])? + self.pos;
        self.pos = at + self.needle_bytes;
        let start = char_index(&self.starts, at);
        Some(Match {
            start,
            end: start + self.needle_chars,
            text: self.literal.clone(),
            token: self.token,
        })
    }

    fn skip_to(&mut self, offset: usize) {
        let byte = self
            .starts
            .get(offset)
            .copied()
            .unwrap_or(self.haystack.len());
        if byte > self.pos {
            self.pos = byte;
        }
    }
}

/// Leftmost-longest search over a small literal set.
pub struct MultiLiteralFinder {
    haystack: String,
    starts: Vec<usize>,
    literals: Vec<(String, TokenType)>,
    pos: usize,
}

impl MultiLiteralFinder {
    pub fn new<C: Cursor>(cursor: &C, literals: Vec<(String, TokenType)>) -> MultiLiteralFinder {
        let haystack = cursor.slice(0, cursor.len());
        let starts = char_starts(&haystack);
        MultiLiteralFinder {
            starts,
            literals,
            haystack,
            pos: 0,
        }
    }
}

impl StringFinder for MultiLiteralFinder {
    fn find_next(&mut self) -> Option<Match> {
        // Earliest occurrence wins; on a tie the longest literal does.
        let mut best: Option<(usize, usize)> = None;
        for (i, (literal, _)) in self.literals.iter().enumerate() {
            let found = memmem::find(&self.haystack.as_bytes()[self.pos..], literal.as_bytes());
            let Some(at) = found.map(|f| f + self.pos) else {
                continue;
            };
            best = match best {
                Some((b, j))
                    if b < at || (b == at && self.literals[j].0.len() >= literal.len()) =>
                {
                    Some((b, j))
                }
                _ => Some((at, i)),
            };
        }
        let (at, i) = best?;
        let (literal, token) = &self.literals[i];
        self.pos = at + literal.len();
        let start = char_index(&self.starts, at);
        Some(Match {
            start,
            end: start + literal.chars().count(),
            text: literal.clone(),
            token: *token,
        })
    }

    fn skip_to(&mut self, offset: usize) {
        let byte = self
            .starts
            .get(offset)
            .copied()
            .unwrap_or(self.haystack.len());
        if byte > self.pos {
            self.pos = byte;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Pattern;
    use crate::automaton::{build_nfa, determinize, minimize};
    use crate::cursor::TextCursor;

    fn tabled(pattern: &Pattern) -> TabledAutomaton {
        let nfa = build_nfa(Some(pattern), TokenType::Accept).unwrap();
        TabledAutomaton::from_dfa(&minimize(&determinize(&nfa)))
    }

    #[test]
    fn test_plan_literal() {
        let auto = tabled(&Pattern::literal("while"));
        assert_eq!(
            plan(&auto),
            SearchPlan::Literal("while".to_string(), TokenType::Accept)
        );
    }

    #[test]
    fn test_plan_multi_literal() {
        let auto = tabled(&Pattern::alt(vec![
            Pattern::literal("cat"),
            Pattern::literal("cow"),
        ]));
        match plan(&auto) {
            SearchPlan::MultiLiteral(literals) => {
                let mut words: Vec<&str> = literals.iter().map(|(s, _)| s.as_str()).collect();
                words.sort();
                assert_eq!(words, vec!["cat", "cow"]);
            }
            other => panic!("expected multi-literal plan, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_multi_literal_within_one_class() {
        // '0' and '1' end up in the same char class; both alternatives
        // must still reach the literal set.
        let auto = tabled(&Pattern::alt(vec![Pattern::Char('0'), Pattern::Char('1')]));
        match plan(&auto) {
            SearchPlan::MultiLiteral(literals) => {
                let mut words: Vec<&str> = literals.iter().map(|(s, _)| s.as_str()).collect();
                words.sort();
                assert_eq!(words, vec!["0", "1"]);
            }
            other => panic!("expected multi-literal plan, got {other:?}"),
        }
    }

    #[test]
    fn test_plan_automaton_for_cyclic() {
        let auto = tabled(&Pattern::plus(Pattern::Range('0', '9')));
        assert_eq!(plan(&auto), SearchPlan::Automaton);
    }

    #[test]
    fn test_plan_automaton_above_enumeration_cap() {
        // 2^6 = 64 distinct strings, past the cap.
        let bit = || Pattern::alt(vec![Pattern::Char('0'), Pattern::Char('1')]);
        let auto = tabled(&Pattern::seq((0..6).map(|_| bit()).collect()));
        assert_eq!(plan(&auto), SearchPlan::Automaton);
    }

    #[test]
    fn test_plan_automaton_when_empty_string_accepted() {
        let auto = tabled(&Pattern::optional(Pattern::Char('a')));
        assert_eq!(plan(&auto), SearchPlan::Automaton);
    }

    #[test]
    fn test_literal_finder() {
        let cursor = TextCursor::new("xabyabab");
        let mut f = LiteralFinder::new(&cursor, "ab".to_string(), TokenType::Accept);
        let spans: Vec<(usize, usize)> = std::iter::from_fn(|| f.find_next())
            .map(|m| (m.start, m.end))
            .collect();
        assert_eq!(spans, vec![(1, 3), (4, 6), (6, 8)]);
    }

    #[test]
    fn test_literal_finder_char_offsets() {
        let cursor = TextCursor::new("äöü-abc");
        let mut f = LiteralFinder::new(&cursor, "abc".to_string(), TokenType::Accept);
        let m = f.find_next().unwrap();
        assert_eq!((m.start, m.end), (4, 7));
        assert_eq!(m.text, "abc");
        assert_eq!(f.find_next(), None);
    }

    #[test]
    fn test_literal_finder_skip_to() {
        let cursor = TextCursor::new("ab ab");
        let mut f = LiteralFinder::new(&cursor, "ab".to_string(), TokenType::Accept);
        f.skip_to(1);
        let m = f.find_next().unwrap();
        assert_eq!((m.start, m.end), (3, 5));
    }

    #[test]
    fn test_multi_literal_leftmost_longest() {
        let cursor = TextCursor::new("xfoobar");
        let literals = vec![
            ("foo".to_string(), TokenType::Label(1)),
            ("foobar".to_string(), TokenType::Label(2)),
        ];
        let mut f = MultiLiteralFinder::new(&cursor, literals);
        let m = f.find_next().unwrap();
        assert_eq!((m.start, m.end, m.token), (1, 7, TokenType::Label(2)));
        assert_eq!(f.find_next(), None);
    }

    #[test]
    fn test_multi_literal_earliest_wins() {
        let cursor = TextCursor::new("bb aa");
        let literals = vec![
            ("aa".to_string(), TokenType::Label(1)),
            ("bb".to_string(), TokenType::Label(2)),
        ];
        let mut f = MultiLiteralFinder::new(&cursor, literals);
        assert_eq!(f.find_next().map(|m| m.token), Some(TokenType::Label(2)));
        assert_eq!(f.find_next().map(|m| m.token), Some(TokenType::Label(1)));
        assert_eq!(f.find_next(), None);
    }
}
