const FENCE: &str = "```";

/// Strips a surrounding markdown code fence and whitespace from model output.
///
/// The opening fence may carry an info string such as `bibtex` (any case);
/// the whole fence line is dropped. Text without fences is only trimmed.
pub fn clean_response(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix(FENCE) {
        text = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            // Single line such as "```bibtex @article{...}```".
            None => strip_info_string(rest),
        };
    }

    let text = text.trim_end();
    let text = text.strip_suffix(FENCE).unwrap_or(text);
    text.trim().to_string()
}

fn strip_info_string(rest: &str) -> &str {
    let lang_len = "bibtex".len();
    match rest.get(..lang_len) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bibtex") => &rest[lang_len..],
        _ => rest,
    }
}
