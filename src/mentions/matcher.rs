//! Mention detection.
//!
//! A nick is mentioned when it appears as a whole word followed by a space,
//! either addressed (`alice: hi`) or inline (`tell alice about it`). Words are
//! compared after stripping one trailing `:` and normalizing, so `alice_: hi`
//! reaches `alice`. A nick that is the last word of a message is not a mention.

use std::collections::BTreeSet;

use crate::nick::normalize_nick;

/// The subset of `candidates` mentioned in `text`, in candidate order.
/// Candidates are expected to be normalized already.
pub fn mentioned_nicks<'a, I>(text: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let words: BTreeSet<&str> = followed_words(text)
        .map(|word| normalize_nick(word.strip_suffix(':').unwrap_or(word)))
        .filter(|word| !word.is_empty())
        .collect();

    candidates
        .into_iter()
        .filter(|nick| words.contains(nick.as_str()))
        .cloned()
        .collect()
}

/// Space-delimited words that have a space after them.
fn followed_words(text: &str) -> impl Iterator<Item = &str> {
    let mut words: Vec<&str> = text.split(' ').collect();
    // the final segment is never followed by a space
    words.pop();
    words.into_iter().filter(|w| !w.is_empty())
}
