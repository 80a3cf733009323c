use std::fmt::{self, Display, Write as _};

/// MySQL truncates identifiers longer than this.
pub(crate) const MYSQL_IDENTIFIER_SIZE_LIMIT: usize = 64;

/// A MySQL identifier, backquoted on display.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Quoted<T>(pub(crate) T);

impl<T: Display> Display for Quoted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`", self.0)
    }
}

pub(crate) fn quoted<T: Display>(t: T) -> Quoted<T> {
    Quoted(t)
}

/// Index and constraint names are truncated to the identifier size limit
/// before they hit the server.
pub(crate) fn truncate_identifier(identifier: &str) -> &str {
    match identifier.char_indices().nth(MYSQL_IDENTIFIER_SIZE_LIMIT) {
        Some((idx, _)) => &identifier[..idx],
        None => identifier,
    }
}

pub(crate) trait IteratorJoin {
    fn join(self, sep: &str) -> String;
}

impl<T, I> IteratorJoin for I
where
    T: Display,
    I: Iterator<Item = T>,
{
    fn join(mut self, sep: &str) -> String {
        let (lower_bound, _) = self.size_hint();
        let mut out = String::with_capacity(sep.len() * lower_bound);

        if let Some(first_item) = self.next() {
            write!(out, "{first_item}").unwrap();
        }

        for item in self {
            out.push_str(sep);
            write!(out, "{item}").unwrap();
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_truncated_at_the_limit() {
        let long = "a".repeat(70);
        assert_eq!(truncate_identifier(&long).len(), 64);
        assert_eq!(truncate_identifier("book_isbn_key"), "book_isbn_key");
    }

    #[test]
    fn join_quoted_identifiers() {
        let joined = ["id", "isbn"].iter().map(quoted).join(", ");
        assert_eq!(joined, "`id`, `isbn`");
    }
}
