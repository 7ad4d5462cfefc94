//! Entity commands and repositories

pub mod board;
pub mod employee;
pub mod organization;
pub mod project;
pub mod ticket;

/// Capitalise each space-separated word and lower-case the rest
///
/// `"web PORTAL"` becomes `"Web Portal"`. Runs of spaces are kept.
pub fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Trim entries, drop empty ones and keep the first occurrence of each
pub(crate) fn normalize_set(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.trim().to_string();
        if !value.is_empty() && !out.contains(&value) {
            out.push(value);
        }
    }
    out
}
