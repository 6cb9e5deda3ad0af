//! Display-name formatting helpers.

/// Title-case a string, treating spaces, hyphens, and underscores as word
/// boundaries.
pub(crate) fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_boundary = true;

    for ch in s.chars() {
        if at_boundary {
            out.extend(ch.to_uppercase());
        } else {
            out.extend(ch.to_lowercase());
        }
        at_boundary = matches!(ch, ' ' | '-' | '_');
    }

    out
}
