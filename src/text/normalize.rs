/// Collapse every run of whitespace (including newlines) to a single ASCII
/// space, trimming none at the ends.
pub fn normalize_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_run = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Split `s` into word tokens: spaces are break characters that are dropped,
/// while each character in `{';', '!', '?'} ∪ extra_break_chars` is a break
/// character emitted as its own single-character token. Runs of any other
/// character between breaks form one token each.
pub fn tokenize(s: &str, extra_break_chars: &[char]) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    let is_break = |c: char| c == ';' || c == '!' || c == '?' || extra_break_chars.contains(&c);

    for c in s.chars() {
        if c == ' ' {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else if is_break(c) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(c.to_string());
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_runs_of_whitespace() {
        assert_eq!(normalize_whitespace("a\n\n  b\tc"), "a b c");
    }

    #[test]
    fn tokenizes_on_spaces_and_breaks() {
        assert_eq!(
            tokenize("Hello, world! Really?", &[',']),
            vec!["Hello", ",", "world", "!", "Really", "?"]
        );
    }

    #[test]
    fn empty_string_tokenizes_to_nothing() {
        assert!(tokenize("", &[]).is_empty());
    }
}
