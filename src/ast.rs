//! Pattern syntax tree consumed by the Thompson builder.
//!
//! Parsing text into this tree is an external concern; the builder takes
//! an already-built tree of typed nodes. Constructors below exist so
//! callers and tests can assemble trees without a parser.

/// A node in the pattern tree.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Pattern {
    /// Match any one of the alternatives.
    Alternation(Vec<Pattern>),
    /// Match each part in sequence.
    Concat(Vec<Pattern>),
    /// Repetition. `max: None` is an unbounded loop with minimum `min`;
    /// `max: Some(n)` is a bounded loop matching between `min` and `n`
    /// occurrences.
    Loop {
        min: u32,
        max: Option<u32>,
        inner: Box<Pattern>,
    },
    /// Zero or one occurrence.
    Optional(Box<Pattern>),
    /// A single character.
    Char(char),
    /// An inclusive character range.
    Range(char, char),
    /// An enumerated character class.
    Class(Vec<ClassItem>),
    /// Complement of the inner pattern. Not supported by the builder.
    Complement(Box<Pattern>),
    /// Conjunction of patterns. Not supported by the builder.
    Conjunction(Vec<Pattern>),
    /// Grouping; semantically transparent.
    Group(Box<Pattern>),
    /// A literal string, one chained character at a time.
    Literal(String),
    /// Matches the empty string.
    Empty,
}

/// One member of an enumerated character class.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClassItem {
    Char(char),
    Range(char, char),
}

impl Pattern {
    pub fn literal(s: &str) -> Pattern {
        Pattern::Literal(s.to_string())
    }

    pub fn alt(parts: Vec<Pattern>) -> Pattern {
        Pattern::Alternation(parts)
    }

    pub fn seq(parts: Vec<Pattern>) -> Pattern {
        Pattern::Concat(parts)
    }

    pub fn optional(inner: Pattern) -> Pattern {
        Pattern::Optional(Box::new(inner))
    }

    /// `inner{min,}`
    pub fn at_least(min: u32, inner: Pattern) -> Pattern {
        Pattern::Loop {
            min,
            max: None,
            inner: Box::new(inner),
        }
    }

    /// `inner{min,max}`
    pub fn between(min: u32, max: u32, inner: Pattern) -> Pattern {
        Pattern::Loop {
            min,
            max: Some(max),
            inner: Box::new(inner),
        }
    }

    /// `inner*`
    pub fn star(inner: Pattern) -> Pattern {
        Pattern::at_least(0, inner)
    }

    /// `inner+`
    pub fn plus(inner: Pattern) -> Pattern {
        Pattern::at_least(1, inner)
    }

    pub fn group(inner: Pattern) -> Pattern {
        Pattern::Group(Box::new(inner))
    }

    pub fn class(items: Vec<ClassItem>) -> Pattern {
        Pattern::Class(items)
    }
}
