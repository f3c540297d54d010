//! SQLite-family grammar.

use super::Grammar;

/// Grammar for the SQLite dialect family.
///
/// Double-quote identifier quoting; `limit -1` stands in when an offset is
/// requested without a limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteGrammar;

impl SqliteGrammar {
    /// Creates the grammar.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Grammar for SqliteGrammar {
    fn quote_segment(&self, segment: &str) -> String {
        format!("\"{}\"", segment.replace('"', "\"\""))
    }

    fn offset_sentinel_limit(&self) -> &'static str {
        "-1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_segment() {
        let grammar = SqliteGrammar::new();
        assert_eq!(grammar.quote_segment("users"), "\"users\"");
        assert_eq!(grammar.quote_segment("we\"ird"), "\"we\"\"ird\"");
    }
}
