//! Small helpers shared by the converters and column handling.

use once_cell::sync::Lazy;
use regex::Regex;

/// Wire datetime format: `YYYY-MM-DDTHH:MM:SSZ`.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Prefix marking private/meta fields, which are never requested or written.
pub const PRIVATE_PREFIX: char = '_';

static COMMA_OR_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\s*,\s*)+|\s+").expect("static regex is valid"));

/// Splits on runs of commas (optionally surrounded by whitespace) or runs of
/// whitespace, dropping empty tokens.
///
/// ```
/// use fbmap_typemap::util::comma_or_space_split;
///
/// assert_eq!(
///     comma_or_space_split(" asdf, ,, a   df , ,,   sad f,"),
///     vec!["asdf", "a", "df", "sad", "f"]
/// );
/// ```
pub fn comma_or_space_split(text: &str) -> Vec<&str> {
    COMMA_OR_SPACE
        .split(text)
        .filter(|token| !token.is_empty())
        .collect()
}

/// Returns true for field names reserved for private/meta data.
pub fn is_private_field(name: &str) -> bool {
    name.starts_with(PRIVATE_PREFIX)
}

/// Converts a boolean to its wire representation.
pub fn bool_to_string(b: bool) -> &'static str {
    if b { "true" } else { "false" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_or_space_split() {
        assert_eq!(comma_or_space_split("a,b,c"), vec!["a", "b", "c"]);
        assert_eq!(comma_or_space_split(" a ,  , b "), vec!["a", "b"]);
        assert_eq!(comma_or_space_split(",asdf,"), vec!["asdf"]);
        assert_eq!(comma_or_space_split(" asdf "), vec!["asdf"]);
        assert!(comma_or_space_split("").is_empty());
        assert!(comma_or_space_split(" , ,, ").is_empty());
    }

    #[test]
    fn test_split_is_idempotent_on_normalized_input() {
        let once = comma_or_space_split(" 1 ,2,,  3").join(",");
        assert_eq!(once, "1,2,3");
        assert_eq!(comma_or_space_split(&once).join(","), once);
    }

    #[test]
    fn test_is_private_field() {
        assert!(is_private_field("_cache"));
        assert!(!is_private_field("ixBug"));
    }

    #[test]
    fn test_bool_to_string() {
        assert_eq!(bool_to_string(true), "true");
        assert_eq!(bool_to_string(false), "false");
    }
}
