/// Turn a site display name into a filesystem-safe folder key.
///
/// Every character outside `[A-Za-z0-9_.-]` becomes `_`, one for one, so the
/// output has exactly as many characters as the input.
pub fn normalize(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}
