//! relex: finite-automaton pattern matching and tokenizing.
//!
//! Patterns arrive as an already-parsed [`Pattern`] tree and are
//! compiled down a fixed pipeline: Thompson NFA, subset-construction
//! DFA, minimization, and finally a dense tabled automaton. Matching is
//! table walks only; there is no backtracking, so scan time is linear
//! in the input no matter the pattern.
//!
//! Two front doors:
//!
//! - [`compile`] turns one pattern into a [`CompiledPattern`] for
//!   matching and unanchored search,
//! - [`LexerBuilder`] combines many labeled patterns into a [`Lexer`]
//!   whose tokenizer splits an input into a leftmost-longest token
//!   stream with explicit error tokens for unmatched regions.
//!
//! Compiled automata are immutable; wrap them once and share them
//! across as many concurrent matchers as needed.
//!
//! ```
//! use relex::{compile, Pattern};
//!
//! let number = compile(&Pattern::plus(Pattern::Range('0', '9'))).unwrap();
//! let m = number.find("order 1042, qty 7").unwrap();
//! assert_eq!((m.start, m.end, m.text.as_str()), (6, 10, "1042"));
//! ```

pub mod ast;
pub mod automaton;
pub mod cursor;
pub mod matcher;
pub mod token;
pub mod tokenizer;

use std::sync::Arc;

use log::debug;
use thiserror::Error;

pub use ast::{ClassItem, Pattern};
pub use automaton::TabledAutomaton;
pub use cursor::{Cursor, TextCursor};
pub use matcher::{Finder, Match, SearchPlan, StringFinder};
pub use token::{DefaultTokenFactory, Token, TokenFactory, TokenType};
pub use tokenizer::Tokenizer;

use automaton::{build_lexer_nfa, build_nfa, determinize, minimize};
use matcher::{
    LiteralFinder, LongestMatch, MultiLiteralFinder, SearchAutomata, ShortestMatch, TableMatcher,
};

/// Why a pattern tree failed to compile. Compilation is all-or-nothing;
/// no partial automaton survives an error.
#[derive(Error, Clone, PartialEq, Eq, Debug)]
pub enum CompileError {
    #[error("unsupported pattern construct: {0}")]
    UnsupportedConstruct(&'static str),
    #[error("invalid character range {lo:?}-{hi:?}")]
    InvalidRange { lo: char, hi: char },
    #[error("invalid repetition bounds {{{min},{max}}}")]
    InvalidBounds { min: u32, max: u32 },
}

/// A single pattern compiled for matching and search.
#[derive(Debug)]
pub struct CompiledPattern {
    automata: Arc<SearchAutomata>,
    plan: SearchPlan,
}

/// Compile one pattern; every match it reports carries
/// [`TokenType::Accept`].
pub fn compile(pattern: &Pattern) -> Result<CompiledPattern, CompileError> {
    let nfa = build_nfa(Some(pattern), TokenType::Accept)?;
    let automata = SearchAutomata::new(&nfa);
    let plan = matcher::plan(&automata.complete);
    debug!("compiled pattern with plan {plan:?}");
    Ok(CompiledPattern {
        automata: Arc::new(automata),
        plan,
    })
}

impl CompiledPattern {
    /// The forward tabled automaton.
    pub fn automaton(&self) -> &TabledAutomaton {
        &self.automata.complete
    }

    pub fn plan(&self) -> &SearchPlan {
        &self.plan
    }

    /// Does the whole of `text` match?
    pub fn is_match(&self, text: &str) -> bool {
        let automaton = self.automaton();
        automaton
            .accept(automaton.find_state(text))
            .map_or(false, |t| !t.is_error())
    }

    /// A one-match-at-a-time finder over `cursor`, dispatched to the
    /// cheapest strategy the compiled automaton admits.
    pub fn finder<C: Cursor + 'static>(&self, cursor: C) -> Box<dyn StringFinder> {
        match &self.plan {
            SearchPlan::Literal(literal, token) => {
                Box::new(LiteralFinder::new(&cursor, literal.clone(), *token))
            }
            SearchPlan::MultiLiteral(literals) => {
                Box::new(MultiLiteralFinder::new(&cursor, literals.clone()))
            }
            SearchPlan::Automaton => Box::new(Finder::new(Arc::clone(&self.automata), cursor)),
        }
    }

    /// First unanchored match in `text`.
    pub fn find(&self, text: &str) -> Option<Match> {
        self.finder(TextCursor::new(text)).find_next()
    }

    /// All non-overlapping unanchored matches, left to right.
    pub fn find_iter(&self, text: &str) -> impl Iterator<Item = Match> {
        let mut finder = self.finder(TextCursor::new(text));
        std::iter::from_fn(move || finder.find_next())
    }

    /// Shortest match anchored at the start of `text`.
    pub fn shortest_prefix(&self, text: &str) -> Option<Match> {
        let mut cursor = TextCursor::new(text);
        let mut matcher = TableMatcher::new(self.automaton());
        let mut listener = ShortestMatch::new();
        matcher.run(&mut cursor, &mut listener);
        listener.take().filter(|m| m.start == 0)
    }

    /// Longest match anchored at the start of `text`.
    pub fn longest_prefix(&self, text: &str) -> Option<Match> {
        let mut cursor = TextCursor::new(text);
        let mut matcher = TableMatcher::new(self.automaton());
        let mut listener = LongestMatch::new();
        matcher.run(&mut cursor, &mut listener);
        listener.take().filter(|m| m.start == 0)
    }
}

/// Accumulates labeled patterns into one lexer automaton.
pub struct LexerBuilder {
    specs: Vec<(Pattern, TokenType)>,
    error_type: TokenType,
}

impl Default for LexerBuilder {
    fn default() -> LexerBuilder {
        LexerBuilder::new()
    }
}

impl LexerBuilder {
    pub fn new() -> LexerBuilder {
        LexerBuilder {
            specs: Vec::new(),
            error_type: TokenType::Error,
        }
    }

    /// Add a pattern emitting tokens labeled `label`.
    pub fn token(mut self, pattern: Pattern, label: u32) -> LexerBuilder {
        self.specs.push((pattern, TokenType::Label(label)));
        self
    }

    /// Add a pattern whose matches are dropped from the token stream.
    pub fn ignore(mut self, pattern: Pattern, label: u32) -> LexerBuilder {
        self.specs.push((pattern, TokenType::Ignore(label)));
        self
    }

    /// Add a pattern with an explicit token type.
    pub fn pattern(mut self, pattern: Pattern, token: TokenType) -> LexerBuilder {
        self.specs.push((pattern, token));
        self
    }

    /// Label unmatched regions `Remainder(label)` instead of the plain
    /// error type.
    pub fn remainder(mut self, label: u32) -> LexerBuilder {
        self.error_type = TokenType::Remainder(label);
        self
    }

    pub fn build(self) -> Result<Lexer, CompileError> {
        let nfa = build_lexer_nfa(&self.specs)?;
        let automaton = TabledAutomaton::from_dfa(&minimize(&determinize(&nfa)));
        debug!(
            "built lexer automaton: {} patterns, {} states",
            self.specs.len(),
            automaton.state_count()
        );
        Ok(Lexer {
            automaton: Arc::new(automaton),
            error_type: self.error_type,
        })
    }
}

/// A compiled lexer; immutable and shareable.
pub struct Lexer {
    automaton: Arc<TabledAutomaton>,
    error_type: TokenType,
}

impl Lexer {
    pub fn automaton(&self) -> &TabledAutomaton {
        &self.automaton
    }

    /// Tokenize `text` into the crate's own [`Token`] values.
    pub fn tokenize(&self, text: &str) -> Tokenizer<'_, TextCursor, DefaultTokenFactory> {
        self.tokenize_with(TextCursor::new(text), DefaultTokenFactory)
    }

    /// Tokenize through a caller-supplied cursor and token factory.
    pub fn tokenize_with<C: Cursor, F: TokenFactory>(
        &self,
        cursor: C,
        factory: F,
    ) -> Tokenizer<'_, C, F> {
        Tokenizer::new(&self.automaton, cursor, factory, self.error_type)
    }
}
