use std::borrow::Cow;

/// Escapes the five characters that are significant in HTML text and in
/// single- or double-quoted attribute values.
pub fn escape(input: &str) -> Cow<'_, str> {
    let first = match input.find(|c: char| matches!(c, '&' | '<' | '>' | '"' | '\'')) {
        Some(index) => index,
        None => return Cow::Borrowed(input),
    };

    let mut escaped = String::with_capacity(input.len() + 16);
    escaped.push_str(&input[..first]);

    for c in input[first..].chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            c => escaped.push(c),
        }
    }

    Cow::Owned(escaped)
}
