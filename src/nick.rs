//! Nick normalization.
//!
//! IRC servers refuse a nick that is already taken, so clients retry with
//! `_` appended. `alice`, `alice_` and `alice__` are one identity for presence,
//! mentions and indexing.

/// Strip the trailing run of underscores from a nick.
pub fn normalize_nick(nick: &str) -> &str {
    nick.trim_end_matches('_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_trailing_underscores() {
        assert_eq!(normalize_nick("test"), "test");
        assert_eq!(normalize_nick("test_"), "test");
        assert_eq!(normalize_nick("test___"), "test");
    }

    #[test]
    fn keeps_inner_underscores() {
        assert_eq!(normalize_nick("snake_case_"), "snake_case");
        assert_eq!(normalize_nick("_lead"), "_lead");
    }

    #[test]
    fn is_idempotent() {
        for n in ["alice", "alice_", "a_b__", "", "___"] {
            assert_eq!(normalize_nick(normalize_nick(n)), normalize_nick(n));
        }
        assert_eq!(normalize_nick("alice_"), normalize_nick("alice"));
    }
}
