/// Reduce arbitrary user text to a safe directory segment.
///
/// Keeps alphanumerics, spaces, underscores and hyphens, then trims. An empty
/// result means the input is unusable as a section name.
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// A name is safe to join onto the storage root only if sanitizing leaves it
/// untouched.
pub fn is_valid_section_name(name: &str) -> bool {
    !name.is_empty() && sanitize(name) == name
}
