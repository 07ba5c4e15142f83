//! URL query string parser for `GET` targets.

use memchr::{memchr, memchr_iter};

/// URL query string parser.
///
/// Splits the string on `&` and keeps a parameter only when it has exactly
/// one `=` and a non-empty name. Everything else is dropped silently, the
/// request itself stays valid.
///
/// The input is expected to be already percent-decoded (the whole request
/// target is decoded before it is split), so no further decoding happens here.
///
/// # Examples
/// ```rust
/// use dual_web::query::Query;
///
/// let params = Query::parse("name=john&age=25&flag&=x&a=b=c&empty=");
///
/// assert_eq!(params, [
///     ("name".to_string(), "john".to_string()),
///     ("age".to_string(), "25".to_string()),
///     ("empty".to_string(), String::new()),
/// ]);
/// ```
pub struct Query;

impl Query {
    /// Parses a query string (without the leading `?`) into an ordered list.
    #[inline]
    pub fn parse(query: &str) -> Vec<(String, String)> {
        let mut result = Vec::new();
        Self::parse_into(&mut result, query);
        result
    }

    /// Appends the parameters of `query` to `result`, keeping duplicates.
    pub fn parse_into(result: &mut Vec<(String, String)>, query: &str) {
        let data = query.as_bytes();

        let mut start = 0;
        while start <= data.len() {
            let end = memchr(b'&', &data[start..])
                .map(|pos| start + pos)
                .unwrap_or(data.len());

            if let Some(pair) = Self::split_pair(&query[start..end]) {
                result.push(pair);
            }

            start = end + 1;
        }
    }

    #[inline]
    fn split_pair(part: &str) -> Option<(String, String)> {
        let mut iter = memchr_iter(b'=', part.as_bytes());

        let index = iter.next()?;
        if iter.next().is_some() || index == 0 {
            return None;
        }

        Some((part[..index].to_owned(), part[index + 1..].to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::pairs;

    #[test]
    fn basic() {
        let params = Query::parse("x=1&y=2");
        assert_eq!(pairs(&params), [("x", "1"), ("y", "2")]);
    }

    #[test]
    fn dropped_pairs() {
        #[rustfmt::skip]
        let cases = [
            ("flag",              vec![]),
            ("=val",              vec![]),
            ("a=b=c",             vec![]),
            ("",                  vec![]),
            ("&&",                vec![]),
            ("empty=",            vec![("empty", "")]),
            ("flag&key=value&=x", vec![("key", "value")]),
        ];

        for (query, expected) in cases {
            assert_eq!(pairs(&Query::parse(query)), expected, "{query:?}");
        }
    }

    #[test]
    fn duplicates_kept_in_order() {
        let params = Query::parse("a=1&b=2&a=3");
        assert_eq!(pairs(&params), [("a", "1"), ("b", "2"), ("a", "3")]);
    }

    #[test]
    fn parse_into_appends() {
        let mut collector = Vec::new();

        Query::parse_into(&mut collector, "a=1");
        Query::parse_into(&mut collector, "b=2");

        assert_eq!(pairs(&collector), [("a", "1"), ("b", "2")]);
    }
}
