//! MySQL-family grammar.

use super::Grammar;

/// Grammar for the MySQL dialect family.
///
/// Backtick identifier quoting; a very large sentinel limit stands in when
/// an offset is requested without a limit, since the dialect refuses a bare
/// `offset` clause.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlGrammar;

impl MySqlGrammar {
    /// Creates the grammar.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Grammar for MySqlGrammar {
    fn quote_segment(&self, segment: &str) -> String {
        format!("`{}`", segment.replace('`', "``"))
    }

    fn offset_sentinel_limit(&self) -> &'static str {
        "18446744073709551615"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_segment() {
        let grammar = MySqlGrammar::new();
        assert_eq!(grammar.quote_segment("users"), "`users`");
        assert_eq!(grammar.quote_segment("we`ird"), "`we``ird`");
    }
}
