//! Token types and the priority algebra used during determinization.
//!
//! When subset construction merges NFA states, their accept labels are
//! combined with [`TokenType::union`]. The algebra orders outcomes as
//! error > remainder > label/accept > ignore > indeterminate. Two labels
//! with no priority relation ("foreign" labels) combine to the explicit
//! [`TokenType::Indeterminate`] marker, which is propagated rather than
//! raised - callers that need a unique label per accepting state must
//! check for it.

/// The acceptance label attached to an automaton state or a match.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TokenType {
    /// The dedicated error sentinel. Only the totalization sink carries
    /// this; it is never a valid accept label.
    Error,
    /// Ambiguous label: two foreign labels co-occurred during
    /// determinization. Lowest priority, loses every union against a
    /// concrete accept label.
    Indeterminate,
    /// Generic unlabeled acceptance (single-pattern matchers).
    Accept,
    /// Accepting, but the tokenizer drops the span (whitespace, comments).
    Ignore(u32),
    /// Caller-supplied acceptance label.
    Label(u32),
    /// Catch-all label that wins unions against everything except the
    /// error sentinel. Used for fallback tokens ("everything not
    /// otherwise classified").
    Remainder(u32),
}

impl TokenType {
    /// Priority in the union ordering. Larger wins.
    #[inline]
    pub fn priority(self) -> u8 {
        match self {
            TokenType::Error => 4,
            TokenType::Remainder(_) => 3,
            TokenType::Accept | TokenType::Label(_) | TokenType::Ignore(_) => 2,
            TokenType::Indeterminate => 1,
        }
    }

    #[inline]
    pub fn is_error(self) -> bool {
        matches!(self, TokenType::Error)
    }

    #[inline]
    pub fn is_indeterminate(self) -> bool {
        matches!(self, TokenType::Indeterminate)
    }

    /// True for labels the tokenizer must drop instead of emitting.
    #[inline]
    pub fn is_ignored(self) -> bool {
        matches!(self, TokenType::Ignore(_))
    }

    /// True for any label that marks acceptance (everything but the error
    /// sentinel; `Indeterminate` still marks an accepting state, just one
    /// with an unresolved label).
    #[inline]
    pub fn is_accepting(self) -> bool {
        !self.is_error()
    }

    /// Combine two co-occurring labels, picking the dominant one.
    ///
    /// Commutative and idempotent. Foreign pairs (distinct labels of the
    /// same priority) yield `Indeterminate`.
    pub fn union(self, other: TokenType) -> TokenType {
        use TokenType::*;
        if self == other {
            return self;
        }
        match (self, other) {
            (Error, _) | (_, Error) => Error,
            // Distinct remainders are foreign; a single remainder wins.
            (Remainder(_), Remainder(_)) => Indeterminate,
            (r @ Remainder(_), _) | (_, r @ Remainder(_)) => r,
            (Indeterminate, t) | (t, Indeterminate) => t,
            // A specific label refines generic acceptance.
            (l @ Label(_), Accept) | (Accept, l @ Label(_)) => l,
            (Label(_), Label(_)) => Indeterminate,
            // Accept class dominates ignore class.
            (l @ Label(_), Ignore(_)) | (Ignore(_), l @ Label(_)) => l,
            (Accept, Ignore(_)) | (Ignore(_), Accept) | (Accept, Accept) => Accept,
            (Ignore(_), Ignore(_)) => Indeterminate,
        }
    }

    /// Union over optional labels; `None` means "not accepting" and is
    /// the identity.
    pub fn union_opt(a: Option<TokenType>, b: Option<TokenType>) -> Option<TokenType> {
        match (a, b) {
            (None, x) | (x, None) => x,
            (Some(a), Some(b)) => Some(a.union(b)),
        }
    }

    /// Symmetric intersection used when composite states merge. Labels
    /// carry no structure beyond priority, so this coincides with union.
    #[inline]
    pub fn intersect(self, other: TokenType) -> TokenType {
        self.union(other)
    }
}

/// The externally visible unit produced by the tokenizer: the matched
/// text plus its label. Immutable once built.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
    pub text: String,
    pub token_type: TokenType,
}

/// Creates tokens on behalf of the tokenizer. The tokenizer itself never
/// constructs tokens; supplying a factory lets callers produce their own
/// token representation.
pub trait TokenFactory {
    type Token;

    fn create_token(&self, text: &str, token_type: TokenType) -> Self::Token;
}

/// Factory producing the crate's own [`Token`] value.
#[derive(Clone, Copy, Default, Debug)]
pub struct DefaultTokenFactory;

impl TokenFactory for DefaultTokenFactory {
    type Token = Token;

    fn create_token(&self, text: &str, token_type: TokenType) -> Token {
        Token {
            text: text.to_string(),
            token_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_error_dominates() {
        assert_eq!(TokenType::Error.union(TokenType::Label(1)), TokenType::Error);
        assert_eq!(TokenType::Accept.union(TokenType::Error), TokenType::Error);
        assert_eq!(
            TokenType::Remainder(7).union(TokenType::Error),
            TokenType::Error
        );
    }

    #[test]
    fn test_union_identical() {
        assert_eq!(
            TokenType::Label(3).union(TokenType::Label(3)),
            TokenType::Label(3)
        );
        assert_eq!(
            TokenType::Ignore(2).union(TokenType::Ignore(2)),
            TokenType::Ignore(2)
        );
        assert_eq!(
            TokenType::Accept.union(TokenType::Accept),
            TokenType::Accept
        );
    }

    #[test]
    fn test_union_foreign_labels_are_indeterminate() {
        assert_eq!(
            TokenType::Label(1).union(TokenType::Label(2)),
            TokenType::Indeterminate
        );
        assert_eq!(
            TokenType::Ignore(1).union(TokenType::Ignore(2)),
            TokenType::Indeterminate
        );
    }

    #[test]
    fn test_union_accept_class_beats_ignore() {
        assert_eq!(
            TokenType::Label(1).union(TokenType::Ignore(9)),
            TokenType::Label(1)
        );
        assert_eq!(
            TokenType::Ignore(9).union(TokenType::Accept),
            TokenType::Accept
        );
    }

    #[test]
    fn test_union_remainder_wins() {
        assert_eq!(
            TokenType::Remainder(5).union(TokenType::Label(1)),
            TokenType::Remainder(5)
        );
        assert_eq!(
            TokenType::Ignore(1).union(TokenType::Remainder(5)),
            TokenType::Remainder(5)
        );
    }

    #[test]
    fn test_union_indeterminate_loses_to_concrete() {
        assert_eq!(
            TokenType::Indeterminate.union(TokenType::Label(4)),
            TokenType::Label(4)
        );
        assert_eq!(
            TokenType::Indeterminate.union(TokenType::Indeterminate),
            TokenType::Indeterminate
        );
    }

    #[test]
    fn test_union_commutative() {
        let types = [
            TokenType::Error,
            TokenType::Indeterminate,
            TokenType::Accept,
            TokenType::Ignore(1),
            TokenType::Label(1),
            TokenType::Label(2),
            TokenType::Remainder(3),
        ];
        for &a in &types {
            for &b in &types {
                assert_eq!(a.union(b), b.union(a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_priority_ordering_and_predicates() {
        assert!(TokenType::Error.priority() > TokenType::Remainder(0).priority());
        assert!(TokenType::Remainder(0).priority() > TokenType::Label(0).priority());
        assert!(TokenType::Label(0).priority() > TokenType::Indeterminate.priority());
        assert!(TokenType::Error.is_error());
        assert!(!TokenType::Error.is_accepting());
        assert!(TokenType::Indeterminate.is_accepting());
        assert!(TokenType::Indeterminate.is_indeterminate());
        assert!(TokenType::Ignore(3).is_ignored());
        // Labels carry no structure, so intersection and union agree.
        assert_eq!(
            TokenType::Label(1).intersect(TokenType::Accept),
            TokenType::Label(1).union(TokenType::Accept)
        );
    }

    #[test]
    fn test_union_opt_identity() {
        assert_eq!(TokenType::union_opt(None, None), None);
        assert_eq!(
            TokenType::union_opt(Some(TokenType::Accept), None),
            Some(TokenType::Accept)
        );
        assert_eq!(
            TokenType::union_opt(Some(TokenType::Label(1)), Some(TokenType::Label(2))),
            Some(TokenType::Indeterminate)
        );
    }
}
