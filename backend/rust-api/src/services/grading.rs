/// Compares a submitted answer against the stored canonical one.
///
/// Both sides are trimmed. Canonical answers imported with surrounding double
/// quotes lose exactly one pair. The comparison ignores case.
pub fn is_answer_correct(submitted: &str, canonical: &str) -> bool {
    let submitted = submitted.trim();
    let canonical = strip_one_quote_pair(canonical.trim());

    submitted.to_lowercase() == canonical.to_lowercase()
}

fn strip_one_quote_pair(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
