//! Code-point level helpers shared by the dictionaries and the facilitator.

pub fn code_point_count(s: &str) -> usize {
    s.chars().count()
}

/// Lower-cases the first character only ("Hello" -> "hello", "NASA" -> "nASA").
pub fn decapitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// "hELLO" -> "Hello".
pub fn capitalize_first_and_downcase_rest(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn has_upper_case(word: &str) -> bool {
    word.chars().any(char::is_uppercase)
}

/// Splits on Unicode whitespace, dropping empty pieces.
pub fn split_on_whitespace(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}
