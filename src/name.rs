//! Target-format identifiers.
//!
//! Every name that reaches the target (variables, dimensions, attributes, groups, enumeration types)
//! passes through a [`NameSanitizer`].
//! Nested source names are first joined into an embedded name with [`NameSanitizer::embedded_name`].

use itertools::Itertools;

/// The name prefix used when the source dataset does not declare a container kind.
pub const DEFAULT_NAME_PREFIX: &str = "nc_";

/// The separator between components of an embedded name.
pub const DEFAULT_EMBED_SEPARATOR: &str = ".";

/// Converts arbitrary source names into legal target identifiers.
///
/// A legal identifier contains only ASCII letters, digits, and the characters `-+_.@`, and starts with an ASCII letter or `_`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSanitizer {
    prefix: String,
    separator: String,
}

impl Default for NameSanitizer {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_NAME_PREFIX.to_string(),
            separator: DEFAULT_EMBED_SEPARATOR.to_string(),
        }
    }
}

/// A name built from an embed path and a leaf name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedName {
    /// The sanitized name.
    pub name: String,
    /// The joined name before sanitization.
    pub original: String,
}

impl EmbeddedName {
    /// Returns true if sanitization changed the joined name.
    #[must_use]
    pub fn is_renamed(&self) -> bool {
        self.name != self.original
    }
}

impl NameSanitizer {
    /// Create a sanitizer with a `prefix` and embed `separator`.
    ///
    /// The prefix is itself made legal: illegal characters become `_`.
    /// If it is empty or does not start with a letter or `_`, [`DEFAULT_NAME_PREFIX`] is used instead.
    #[must_use]
    pub fn new(prefix: &str, separator: &str) -> Self {
        let prefix: String = prefix.chars().map(replace_illegal).collect();
        let prefix = if prefix.starts_with(is_legal_first) {
            prefix
        } else {
            DEFAULT_NAME_PREFIX.to_string()
        };
        Self {
            prefix,
            separator: separator.to_string(),
        }
    }

    /// Create a sanitizer whose prefix is derived from a source container kind.
    ///
    /// A container kind of `h5` gives the prefix `h5_`.
    /// Without a container kind, `fallback` is used.
    #[must_use]
    pub fn for_container(container_kind: Option<&str>, fallback: &str, separator: &str) -> Self {
        match container_kind {
            Some(kind) if !kind.is_empty() => Self::new(&format!("{kind}_"), separator),
            _ => Self::new(fallback, separator),
        }
    }

    /// The prefix prepended to names that do not start with a letter or `_`.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The embed path separator.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Sanitize `raw` into a legal identifier.
    ///
    /// Illegal characters are replaced by `_`, and the prefix is prepended if the first character is not a letter or `_`.
    /// The result is never empty, and sanitizing it again returns it unchanged.
    #[must_use]
    pub fn sanitize(&self, raw: &str) -> String {
        let replaced: String = raw.chars().map(replace_illegal).collect();
        if replaced.starts_with(is_legal_first) {
            replaced
        } else {
            format!("{}{replaced}", self.prefix)
        }
    }

    /// Join `embed` and `leaf` with the separator and sanitize the result.
    #[must_use]
    pub fn embedded_name<S: AsRef<str>>(&self, embed: &[S], leaf: &str) -> EmbeddedName {
        let original = if embed.is_empty() {
            leaf.to_string()
        } else {
            embed
                .iter()
                .map(AsRef::as_ref)
                .chain(std::iter::once(leaf))
                .join(&self.separator)
        };
        EmbeddedName {
            name: self.sanitize(&original),
            original,
        }
    }
}

/// Returns true if `c` may appear anywhere in an identifier.
#[must_use]
pub fn is_legal_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | '_' | '.' | '@')
}

fn is_legal_first(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn replace_illegal(c: char) -> char {
    if is_legal_char(c) {
        c
    } else {
        '_'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_illegal_characters() {
        let sanitizer = NameSanitizer::default();
        assert_eq!(sanitizer.sanitize("temp erature"), "temp_erature");
        assert_eq!(sanitizer.sanitize("a/b#c"), "a_b_c");
        assert_eq!(sanitizer.sanitize("ok-name+1.x@y"), "ok-name+1.x@y");
        assert_eq!(sanitizer.sanitize("µm"), "_m");
    }

    #[test]
    fn sanitize_prefixes_bad_first_character() {
        let sanitizer = NameSanitizer::default();
        assert_eq!(sanitizer.sanitize("2m_temp"), "nc_2m_temp");
        assert_eq!(sanitizer.sanitize(".hidden"), "nc_.hidden");
        assert_eq!(sanitizer.sanitize("_private"), "_private");
        assert_eq!(sanitizer.sanitize(""), "nc_");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let sanitizer = NameSanitizer::for_container(Some("h5"), DEFAULT_NAME_PREFIX, ".");
        for raw in ["", "1", "a b", "/x/y", "@home", "ünïcode", "Alpha.Point.s2", "-"] {
            let once = sanitizer.sanitize(raw);
            assert!(!once.is_empty());
            assert!(once.chars().all(is_legal_char));
            assert!(once.starts_with(is_legal_first));
            assert_eq!(sanitizer.sanitize(&once), once);
        }
    }

    #[test]
    fn container_prefix() {
        let sanitizer = NameSanitizer::for_container(Some("h5"), DEFAULT_NAME_PREFIX, ".");
        assert_eq!(sanitizer.prefix(), "h5_");
        assert_eq!(sanitizer.sanitize("3d"), "h5_3d");

        let sanitizer = NameSanitizer::for_container(Some("9 lives"), DEFAULT_NAME_PREFIX, ".");
        assert_eq!(sanitizer.prefix(), DEFAULT_NAME_PREFIX);

        let sanitizer = NameSanitizer::for_container(None, "xx_", ".");
        assert_eq!(sanitizer.prefix(), "xx_");
    }

    #[test]
    fn embedded_names() {
        let sanitizer = NameSanitizer::default();
        let name = sanitizer.embedded_name(&["Alpha", "Point"], "s2");
        assert_eq!(name.name, "Alpha.Point.s2");
        assert!(!name.is_renamed());

        let name = sanitizer.embedded_name::<&str>(&[], "sea surface");
        assert_eq!(name.name, "sea_surface");
        assert_eq!(name.original, "sea surface");
        assert!(name.is_renamed());

        let sanitizer = NameSanitizer::new("nc_", "_");
        assert_eq!(sanitizer.embedded_name(&["a"], "b").name, "a_b");
    }
}
