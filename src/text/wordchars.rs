use std::collections::HashMap;

/// Intern each distinct token across `tokens_l` and `tokens_r` to a codepoint
/// index `>= 1` (index `0` in the vocabulary is an unused placeholder),
/// assigning indices in order of first appearance scanning `tokens_r` first
/// and then `tokens_l` — matching `diff_wordsToCharsMunge`'s processing
/// order. The returned strings' character-level diff is therefore a
/// word-level diff of the original token streams.
pub fn words_to_chars(tokens_l: &[String], tokens_r: &[String]) -> (String, String, Vec<String>) {
    let mut vocabulary = vec![String::new()];
    let mut index: HashMap<String, u32> = HashMap::new();

    let chars_r: String = tokens_r.iter().map(|t| intern(t, &mut vocabulary, &mut index)).collect();
    let chars_l: String = tokens_l.iter().map(|t| intern(t, &mut vocabulary, &mut index)).collect();

    (chars_l, chars_r, vocabulary)
}

fn intern(tok: &str, vocabulary: &mut Vec<String>, index: &mut HashMap<String, u32>) -> char {
    if let Some(&idx) = index.get(tok) {
        return char::from_u32(idx).expect("interned token index out of char range");
    }
    let idx = vocabulary.len() as u32;
    vocabulary.push(tok.to_string());
    index.insert(tok.to_string(), idx);
    char::from_u32(idx).expect("interned token index out of char range")
}

/// Invert [`words_to_chars`]: map each character back to its interned token.
pub fn chars_to_words(chars: &str, vocabulary: &[String]) -> Vec<String> {
    chars.chars().map(|c| vocabulary[c as usize].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interns_right_before_left() {
        let l = vec!["a".to_string(), "b".to_string()];
        let r = vec!["b".to_string(), "c".to_string()];
        let (cl, cr, vocab) = words_to_chars(&l, &r);
        assert_eq!(vocab, vec!["".to_string(), "b".to_string(), "c".to_string(), "a".to_string()]);
        assert_eq!(chars_to_words(&cl, &vocab), l);
        assert_eq!(chars_to_words(&cr, &vocab), r);
    }
}
