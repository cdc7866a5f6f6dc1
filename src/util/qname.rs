//! Qualified name handling.
//!
//! A qualified name is `prefix:local` or a bare `local`. Only a name with
//! exactly one colon and a non-empty part on each side is split; every other
//! string is taken whole as a local name with no prefix. Callers treat such a
//! name as "not qualified" rather than as an error.
//!
//! See <https://www.w3.org/TR/xml-names/#NT-QName>

/// Splits a qualified name into its prefix and local part.
///
/// # Examples
///
/// ```
/// use xmlpath::split_qname;
///
/// assert_eq!(split_qname("html:td"), (Some("html"), "td"));
/// assert_eq!(split_qname("mynewtag"), (None, "mynewtag"));
/// assert_eq!(split_qname("a:b:c"), (None, "a:b:c"));
/// ```
#[must_use]
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local))
            if !prefix.is_empty() && !local.is_empty() && !local.contains(':') =>
        {
            (Some(prefix), local)
        }
        _ => (None, qname),
    }
}

/// Joins an optional prefix and a local name back into a qualified name.
#[must_use]
pub fn join_qname(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{p}:{local}"),
        _ => local.to_string(),
    }
}

/// Returns `true` if `name` is usable as a namespace prefix: non-empty and
/// free of colons and whitespace.
#[must_use]
pub fn is_valid_prefix(name: &str) -> bool {
    !name.is_empty() && !name.contains(':') && !name.chars().any(char::is_whitespace)
}
