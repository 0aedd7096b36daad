//! Scanning over a tabled automaton.
//!
//! - `engine`: the resumable table matcher and its listener protocol
//! - `finder`: unanchored search via the search/reverse/complete triple
//! - `strategy`: performance dispatch to literal fast paths

mod engine;
mod finder;
mod strategy;

pub use engine::{LongestMatch, Match, MatchListener, ShortestMatch, Step, TableMatcher};
pub use finder::{Finder, SearchAutomata};
pub use strategy::{plan, LiteralFinder, MultiLiteralFinder, SearchPlan, StringFinder};
