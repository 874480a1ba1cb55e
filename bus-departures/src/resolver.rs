//! Free-text stop resolution.
//!
//! Turns whatever the user typed into a canonical [`Stop`]. Matching runs in
//! three stages, each short-circuiting the next:
//!
//! 1. exact, case-sensitive equality with a gazetteer entry;
//! 2. case-insensitive substring of an entry (first entry in gazetteer order);
//! 3. Levenshtein distance of at most [`MAX_SUGGESTION_DISTANCE`].
//!
//! Only stage 1 yields [`ResolutionResult::Exact`]; the others are suggestions
//! the caller has to confirm.

use serde::Serialize;
use tracing::debug;

use crate::domain::{Gazetteer, Stop};

/// Inputs shorter than this (in characters) are never matched.
pub const MIN_INPUT_CHARS: usize = 4;

/// Largest edit distance still offered as a suggestion.
pub const MAX_SUGGESTION_DISTANCE: usize = 2;

/// Outcome of resolving user text against the gazetteer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "stop", rename_all = "snake_case")]
pub enum ResolutionResult {
    /// The text is a canonical stop name.
    Exact(Stop),
    /// Low-confidence match that needs confirmation.
    Suggestion(Stop),
    /// Too short, or nothing close enough.
    NotFound,
}

impl ResolutionResult {
    /// The matched stop, whether exact or suggested.
    pub fn stop(&self) -> Option<Stop> {
        match self {
            ResolutionResult::Exact(stop) | ResolutionResult::Suggestion(stop) => Some(*stop),
            ResolutionResult::NotFound => None,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, ResolutionResult::Exact(_))
    }
}

/// Matches free text against a gazetteer.
///
/// Holds lowercase copies of every entry so repeated lookups don't re-fold
/// case. Resolution is pure and takes `&self`, so one resolver can serve any
/// number of concurrent requests.
#[derive(Debug, Clone)]
pub struct StopResolver {
    entries: Vec<Entry>,
}

#[derive(Debug, Clone)]
struct Entry {
    stop: Stop,
    folded: String,
    full: Vec<char>,
    local: Option<Vec<char>>,
}

impl Entry {
    fn new(stop: Stop) -> Self {
        let local = stop
            .place()
            .map(|_| stop.local_name().to_lowercase().chars().collect());

        let folded = stop.name().to_lowercase();

        Self {
            stop,
            full: folded.chars().collect(),
            folded,
            local,
        }
    }

    /// Distance to the full name, or to the name without its place prefix
    /// when that is closer (people rarely type the town).
    fn distance(&self, input: &[char]) -> usize {
        let full = levenshtein(input, &self.full);
        match &self.local {
            Some(local) => full.min(levenshtein(input, local)),
            None => full,
        }
    }
}

impl StopResolver {
    pub fn new(gazetteer: &Gazetteer) -> Self {
        Self {
            entries: gazetteer.iter().map(Entry::new).collect(),
        }
    }

    /// Resolve user text to a stop.
    pub fn resolve(&self, text: &str) -> ResolutionResult {
        if text.chars().count() < MIN_INPUT_CHARS {
            debug!(input = text, "input too short to resolve");
            return ResolutionResult::NotFound;
        }

        if let Some(entry) = self.entries.iter().find(|e| e.stop.name() == text) {
            return ResolutionResult::Exact(entry.stop);
        }

        let folded = text.to_lowercase();

        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.folded.contains(&folded))
        {
            debug!(input = text, stop = %entry.stop, "substring match");
            return ResolutionResult::Suggestion(entry.stop);
        }

        let input: Vec<char> = folded.chars().collect();
        let mut best: Option<(usize, Stop)> = None;

        for entry in &self.entries {
            let distance = entry.distance(&input);
            // Strict comparison keeps the first entry on ties.
            if best.is_none_or(|(min, _)| distance < min) {
                best = Some((distance, entry.stop));
            }
        }

        match best {
            Some((distance, stop)) if distance <= MAX_SUGGESTION_DISTANCE => {
                debug!(input = text, stop = %stop, distance, "fuzzy match");
                ResolutionResult::Suggestion(stop)
            }
            _ => {
                debug!(input = text, "no stop matches");
                ResolutionResult::NotFound
            }
        }
    }
}

/// Classic edit distance with unit-cost insert, delete and substitute.
///
/// Keeps only the previous row of the table.
pub fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j]
            } else {
                1 + prev[j].min(prev[j + 1]).min(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Anything shorter than the minimum never matches
        #[test]
        fn short_inputs_never_match(s in "\\PC{0,3}") {
            prop_assert_eq!(resolver().resolve(&s), ResolutionResult::NotFound);
        }

        /// Resolution is deterministic
        #[test]
        fn deterministic(s in "[a-zA-Z ,]{0,20}") {
            let resolver = resolver();
            prop_assert_eq!(resolver.resolve(&s), resolver.resolve(&s));
        }

        /// Edit distance is symmetric and bounded by the longer length
        #[test]
        fn levenshtein_bounds(a in "[a-d]{0,8}", b in "[a-d]{0,8}") {
            let (a, b): (Vec<char>, Vec<char>) = (a.chars().collect(), b.chars().collect());
            let d = levenshtein(&a, &b);
            prop_assert_eq!(d, levenshtein(&b, &a));
            prop_assert!(d <= a.len().max(b.len()));
            prop_assert!(d >= a.len().abs_diff(b.len()));
        }

        /// Only exact input yields Exact
        #[test]
        fn exact_only_for_canonical_names(s in "[a-zA-Z ,]{4,20}") {
            let result = resolver().resolve(&s);
            if let ResolutionResult::Exact(stop) = result {
                prop_assert_eq!(stop.name(), s.as_str());
            }
        }
    }

    fn resolver() -> StopResolver {
        StopResolver::new(&Gazetteer::line())
    }
}
