//! Prompt tokenization: the canonical comma-delimited string and its blocks.

/// Separator used when joining tokens back into the canonical string
pub const JOIN_SEPARATOR: &str = ", ";

/// Split a prompt on `,`, trimming each piece and dropping empty ones.
pub fn parse(source: &str) -> Vec<String> {
    source
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join tokens into the canonical string.
pub fn serialize<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(JOIN_SEPARATOR)
}

/// Canonicalize a prompt typed with either ASCII or full-width commas.
pub fn normalize(source: &str) -> String {
    serialize(&parse(&source.replace('，', ",")))
}

/// Whether the text holds any CJK unified ideograph
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}
