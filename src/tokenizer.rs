//! Splitting an input into a token stream over a lexer automaton.
//!
//! The tokenizer wraps the matching engine with a listener that buffers
//! tokens: one engine step may have to emit an error token for an
//! unmatched gap and a real token before control returns, so emitted
//! tokens sit in a queue the iterator drains. Unmatched regions become
//! error tokens with a configurable type, ignored token types are
//! dropped on flush, and tokens themselves come from a caller-supplied
//! [`TokenFactory`].

use std::collections::VecDeque;

use crate::automaton::TabledAutomaton;
use crate::cursor::Cursor;
use crate::matcher::{MatchListener, Step, TableMatcher};
use crate::token::{TokenFactory, TokenType};

/// Listener that turns engine reports into queued tokens.
///
/// One match window `[start, end)` is tracked as *pending* until some
/// later report proves it cannot grow further, keeping the output
/// leftmost-longest without lookahead beyond the engine's own scan.
struct TokenSink<F: TokenFactory> {
    factory: F,
    queue: VecDeque<F::Token>,
    pending: Option<(usize, usize, TokenType)>,
    /// Everything before this offset has been emitted or dropped.
    flushed_to: usize,
    error_type: TokenType,
}

impl<F: TokenFactory> TokenSink<F> {
    fn new(factory: F, error_type: TokenType) -> TokenSink<F> {
        TokenSink {
            factory,
            queue: VecDeque::new(),
            pending: None,
            flushed_to: 0,
            error_type,
        }
    }

    /// Emit `[flushed_to, upto)` as an error token.
    fn flush_gap_to<C: Cursor>(&mut self, cursor: &C, upto: usize) {
        if upto > self.flushed_to {
            let text = cursor.slice(self.flushed_to, upto);
            self.queue
                .push_back(self.factory.create_token(&text, self.error_type));
            self.flushed_to = upto;
        }
    }

    /// Emit the pending match (and any gap before it). Ignored types
    /// and zero-width windows advance `flushed_to` without emitting.
    fn flush_pending<C: Cursor>(&mut self, cursor: &C) {
        if let Some((start, end, token)) = self.pending.take() {
            self.flush_gap_to(cursor, start);
            if !token.is_ignored() && end > start {
                let text = cursor.slice(start, end);
                self.queue
                    .push_back(self.factory.create_token(&text, token));
            }
            self.flushed_to = end.max(self.flushed_to);
        }
    }
}

impl<C: Cursor, F: TokenFactory> MatchListener<C> for TokenSink<F> {
    fn report_match(&mut self, cursor: &mut C, start: usize, token: TokenType) -> bool {
        let end = cursor.current();
        match self.pending {
            None => {
                self.pending = Some((start, end, token));
                false
            }
            // Longer match at the same start: extend in place.
            Some((ms, _, _)) if start == ms => {
                self.pending = Some((ms, end, token));
                false
            }
            // Strictly past the pending match: flush it, track the new
            // one, and suspend so the queue can drain.
            Some((_, me, _)) if start > me => {
                self.flush_pending(cursor);
                self.pending = Some((start, end, token));
                !self.queue.is_empty()
            }
            // Nested inside the pending window: the pending match
            // subsumes it. Continue scanning from the pending end.
            Some((_, me, _)) if end <= me => {
                cursor.move_to(me);
                false
            }
            // Overlapping tail: the pending match cannot grow anymore.
            Some(_) => {
                self.flush_pending(cursor);
                self.pending = Some((start, end, token));
                !self.queue.is_empty()
            }
        }
    }

    fn recover_mismatch(&mut self, cursor: &mut C, start: usize) -> bool {
        match self.pending {
            Some((_, me, _)) => {
                self.flush_pending(cursor);
                // Rescan behind the failed attempt, but never re-enter
                // the flushed region and always make progress.
                cursor.move_to(me.max(start + 1).min(cursor.len()));
                !self.queue.is_empty()
            }
            // Nothing pending: leave the default recovery to the
            // engine; the skipped region becomes a gap error later.
            None => false,
        }
    }
}

/// Token iterator over one cursor.
pub struct Tokenizer<'a, C: Cursor, F: TokenFactory> {
    matcher: TableMatcher<'a>,
    cursor: C,
    sink: TokenSink<F>,
    done: bool,
}

impl<'a, C: Cursor, F: TokenFactory> Tokenizer<'a, C, F> {
    pub fn new(
        automaton: &'a TabledAutomaton,
        cursor: C,
        factory: F,
        error_type: TokenType,
    ) -> Tokenizer<'a, C, F> {
        Tokenizer {
            matcher: TableMatcher::new(automaton),
            cursor,
            sink: TokenSink::new(factory, error_type),
            done: false,
        }
    }
}

impl<C: Cursor, F: TokenFactory> Iterator for Tokenizer<'_, C, F> {
    type Item = F::Token;

    fn next(&mut self) -> Option<F::Token> {
        loop {
            if let Some(token) = self.sink.queue.pop_front() {
                return Some(token);
            }
            if self.done {
                return None;
            }
            match self.matcher.run(&mut self.cursor, &mut self.sink) {
                Step::Suspended => {}
                Step::Exhausted => {
                    // Input ran out while trying to extend the pending
                    // match; the consumed tail was never matched on its
                    // own, so rescan it from the pending end.
                    if let Some((ms, me, _)) = self.sink.pending {
                        if me < self.cursor.len() {
                            self.sink.flush_pending(&self.cursor);
                            let resume = me.max(ms + 1).min(self.cursor.len());
                            self.cursor.move_to(resume);
                            self.matcher.reset(resume);
                            continue;
                        }
                    }
                    self.sink.flush_pending(&self.cursor);
                    let len = self.cursor.len();
                    self.sink.flush_gap_to(&self.cursor, len);
                    self.done = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Pattern;
    use crate::automaton::{build_lexer_nfa, determinize, minimize};
    use crate::cursor::TextCursor;
    use crate::token::{DefaultTokenFactory, Token};

    fn lexer_automaton(specs: &[(Pattern, TokenType)]) -> TabledAutomaton {
        let nfa = build_lexer_nfa(specs).unwrap();
        TabledAutomaton::from_dfa(&minimize(&determinize(&nfa)))
    }

    fn tokenize(automaton: &TabledAutomaton, text: &str, error_type: TokenType) -> Vec<Token> {
        Tokenizer::new(
            automaton,
            TextCursor::new(text),
            DefaultTokenFactory,
            error_type,
        )
        .collect()
    }

    fn tok(text: &str, token_type: TokenType) -> Token {
        Token {
            text: text.to_string(),
            token_type,
        }
    }

    #[test]
    fn test_trailing_remainder() {
        let auto = lexer_automaton(&[
            (Pattern::Char('a'), TokenType::Label(1)),
            (Pattern::Char('b'), TokenType::Label(2)),
        ]);
        let tokens = tokenize(&auto, "abc", TokenType::Remainder(9));
        assert_eq!(
            tokens,
            vec![
                tok("a", TokenType::Label(1)),
                tok("b", TokenType::Label(2)),
                tok("c", TokenType::Remainder(9)),
            ]
        );
    }

    #[test]
    fn test_ignored_tokens_are_dropped() {
        // ab*c and a share one label; lone b spans are dropped.
        let auto = lexer_automaton(&[
            (
                Pattern::seq(vec![
                    Pattern::Char('a'),
                    Pattern::star(Pattern::Char('b')),
                    Pattern::Char('c'),
                ]),
                TokenType::Label(1),
            ),
            (Pattern::Char('a'), TokenType::Label(1)),
            (Pattern::Char('b'), TokenType::Ignore(0)),
        ]);
        let tokens = tokenize(&auto, "abcbab", TokenType::Error);
        assert_eq!(
            tokens,
            vec![tok("abc", TokenType::Label(1)), tok("a", TokenType::Label(1))]
        );
    }

    #[test]
    fn test_leading_gap_becomes_error_token() {
        let auto = lexer_automaton(&[(Pattern::Char('a'), TokenType::Label(1))]);
        let tokens = tokenize(&auto, "xxa", TokenType::Error);
        assert_eq!(
            tokens,
            vec![tok("xx", TokenType::Error), tok("a", TokenType::Label(1))]
        );
    }

    #[test]
    fn test_longest_token_wins() {
        // The keyword label refines the generic identifier acceptance,
        // so "if" alone is the keyword while "iffy" stays an identifier.
        let auto = lexer_automaton(&[
            (Pattern::literal("if"), TokenType::Label(1)),
            (Pattern::plus(Pattern::Range('a', 'z')), TokenType::Accept),
        ]);
        let tokens = tokenize(&auto, "iffy if", TokenType::Error);
        assert_eq!(
            tokens,
            vec![
                tok("iffy", TokenType::Accept),
                tok(" ", TokenType::Error),
                tok("if", TokenType::Label(1)),
            ]
        );
    }

    #[test]
    fn test_failed_extension_rescans_tail() {
        // "ab" consumes input while trying to reach "abc"; on failure
        // the tail must still be tokenized on its own.
        let auto = lexer_automaton(&[
            (
                Pattern::alt(vec![Pattern::literal("abc"), Pattern::literal("ab")]),
                TokenType::Label(1),
            ),
            (Pattern::Char('x'), TokenType::Label(2)),
        ]);
        let tokens = tokenize(&auto, "abx", TokenType::Error);
        assert_eq!(
            tokens,
            vec![tok("ab", TokenType::Label(1)), tok("x", TokenType::Label(2))]
        );
    }

    #[test]
    fn test_unmatchable_input_is_one_error_token() {
        let auto = lexer_automaton(&[(Pattern::Char('a'), TokenType::Label(1))]);
        let tokens = tokenize(&auto, "zzz", TokenType::Error);
        assert_eq!(tokens, vec![tok("zzz", TokenType::Error)]);
    }

    #[test]
    fn test_empty_input() {
        let auto = lexer_automaton(&[(Pattern::Char('a'), TokenType::Label(1))]);
        assert!(tokenize(&auto, "", TokenType::Error).is_empty());
    }

    #[test]
    fn test_numbers_and_identifiers() {
        let auto = lexer_automaton(&[
            (Pattern::plus(Pattern::Range('0', '9')), TokenType::Label(1)),
            (Pattern::plus(Pattern::Range('a', 'z')), TokenType::Label(2)),
            (Pattern::Char(' '), TokenType::Ignore(0)),
        ]);
        let tokens = tokenize(&auto, "x1 42 abc", TokenType::Error);
        assert_eq!(
            tokens,
            vec![
                tok("x", TokenType::Label(2)),
                tok("1", TokenType::Label(1)),
                tok("42", TokenType::Label(1)),
                tok("abc", TokenType::Label(2)),
            ]
        );
    }
}
