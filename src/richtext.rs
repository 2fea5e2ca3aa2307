//! Rich-text renderer (C9): diffs two placeholder-bearing strings and
//! produces a single placeholder-bearing string annotated with
//! `diff:insert`/`diff:delete`/`diff:insert-formatting`/`diff:delete-formatting`/
//! `diff:change-target` markers, preserving correct nesting.
//!
//! Grounded on `examples/original_source/src/markdowndiff/formatting.py`
//! (`_diff_rich_text`, `_get_content_and_states`, `_merge_states`,
//! `_insert_spacing`).

use std::collections::HashSet;

use crate::placeholder::{Kind, PlaceholderCodec};
use crate::text::{longest_common_subsequence, tokenize, words_to_chars};

/// Diff `old` against `new` (both possibly containing placeholder
/// codepoints) and return a merged placeholder-bearing string representing
/// the inline diff, ready for [`crate::placeholder::PlaceholderCodec::decode_fragment`].
pub fn diff_rich_text(old: &str, new: &str, codec: &mut PlaceholderCodec) -> String {
    let break_chars = codec.known_placeholders();
    let tokens_old = tokenize(old, &break_chars);
    let tokens_new = tokenize(new, &break_chars);

    let (words_old, states_old) = strip_to_words(&tokens_old, codec);
    let (words_new, states_new) = strip_to_words(&tokens_new, codec);

    let (cl, cr, _vocab) = words_to_chars(&words_old, &words_new);
    let cl_chars: Vec<char> = cl.chars().collect();
    let cr_chars: Vec<char> = cr.chars().collect();
    let pairs = longest_common_subsequence(&cl_chars, &cr_chars, |a, b| a == b);

    let ops = build_ops(&pairs, cl_chars.len(), cr_chars.len());

    let mut resolved = Vec::with_capacity(ops.len());
    for op in ops {
        resolved.push(resolve(op, &words_old, &states_old, &words_new, &states_new, codec));
    }

    linearize(&resolved, codec)
}

/// One aligned position in the output: either both sides agree on a token
/// (`Equal`), or only one side has it (`Insert`/`Delete`).
enum TokenOp {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

fn build_ops(pairs: &[(usize, usize)], len_l: usize, len_r: usize) -> Vec<TokenOp> {
    let mut ops = Vec::new();
    let mut li = 0;
    let mut ri = 0;
    for &(i, j) in pairs {
        while li < i {
            ops.push(TokenOp::Delete(li));
            li += 1;
        }
        while ri < j {
            ops.push(TokenOp::Insert(ri));
            ri += 1;
        }
        ops.push(TokenOp::Equal(li, ri));
        li += 1;
        ri += 1;
    }
    while li < len_l {
        ops.push(TokenOp::Delete(li));
        li += 1;
    }
    while ri < len_r {
        ops.push(TokenOp::Insert(ri));
        ri += 1;
    }
    ops
}

/// One output token: its literal text and the set of placeholder opens that
/// must be active around it.
struct Resolved {
    word: String,
    state: Vec<char>,
}

/// Strip non-`Single` placeholders out of a token stream into a running
/// nesting stack, yielding a pure word stream (single placeholders remain as
/// their own "word") plus, for each word, a snapshot of what's open at that
/// point.
fn strip_to_words(tokens: &[String], codec: &PlaceholderCodec) -> (Vec<String>, Vec<Vec<char>>) {
    let mut words = Vec::new();
    let mut states = Vec::new();
    let mut stack: Vec<char> = Vec::new();

    for tok in tokens {
        let mut chars = tok.chars();
        let only_char = chars.next().filter(|_| chars.next().is_none());
        match only_char.and_then(|c| codec.entry(c).map(|e| (c, e.kind))) {
            Some((c, Kind::Open)) => stack.push(c),
            Some((c, Kind::Close)) => {
                if let Some(pos) = stack.iter().rposition(|&open| codec.entry(open).and_then(|e| e.close_ref) == Some(c)) {
                    stack.remove(pos);
                }
            }
            _ => {
                words.push(tok.clone());
                states.push(stack.clone());
            }
        }
    }
    (words, states)
}

fn resolve(
    op: TokenOp,
    words_l: &[String],
    states_l: &[Vec<char>],
    words_r: &[String],
    states_r: &[Vec<char>],
    codec: &mut PlaceholderCodec,
) -> Resolved {
    match op {
        TokenOp::Delete(li) => {
            let mut state = states_l[li].clone();
            state.push(codec.delete_open);
            Resolved { word: words_l[li].clone(), state }
        }
        TokenOp::Insert(ri) => {
            let mut state = states_r[ri].clone();
            state.push(codec.insert_open);
            Resolved { word: words_r[ri].clone(), state }
        }
        TokenOp::Equal(li, ri) => {
            let state = merge_states(&states_l[li], &states_r[ri], codec);
            Resolved { word: words_l[li].clone(), state }
        }
    }
}

/// Merge the left and right formatting state at one matched token: common
/// opens pass through unchanged, side-only opens become derived
/// `*-formatting` placeholders (or, for a paired link-target change, a single
/// `diff:change-target` placeholder).
fn merge_states(state_l: &[char], state_r: &[char], codec: &mut PlaceholderCodec) -> Vec<char> {
    let set_l: HashSet<char> = state_l.iter().copied().collect();
    let set_r: HashSet<char> = state_r.iter().copied().collect();

    if set_l == set_r {
        return state_l.to_vec();
    }

    let common: Vec<char> = state_l.iter().copied().filter(|c| set_r.contains(c)).collect();
    let mut only_l: Vec<char> = state_l.iter().copied().filter(|c| !set_r.contains(c)).collect();
    let mut only_r: Vec<char> = state_r.iter().copied().filter(|c| !set_l.contains(c)).collect();

    let mut out = common;

    let link_pair = find_link_pair(&only_l, &only_r, codec);
    if let Some((l_open, r_open)) = link_pair {
        only_l.retain(|&c| c != l_open);
        only_r.retain(|&c| c != r_open);
        let old_href = codec.entry(l_open).and_then(|e| e.attributes.get("href")).cloned().unwrap_or_default();
        let new_href = codec.entry(r_open).and_then(|e| e.attributes.get("href")).cloned().unwrap_or_default();
        let marker = format!("{old_href} -> {new_href}");
        let (_, derived) = codec.get_modified_open(r_open, "diff:change-target", &marker);
        out.push(derived);
    }

    for c in only_l {
        let (_, derived) = codec.get_modified_open(c, "diff:delete-formatting", "true");
        out.push(derived);
    }
    for c in only_r {
        let (_, derived) = codec.get_modified_open(c, "diff:insert-formatting", "true");
        out.push(derived);
    }

    out
}

/// If `only_l` and `only_r` each contain exactly one `a`-tag open, pair them
/// for a link-target merge rather than surfacing an insert/delete pair.
fn find_link_pair(only_l: &[char], only_r: &[char], codec: &PlaceholderCodec) -> Option<(char, char)> {
    let is_link = |c: &char| codec.entry(*c).map(|e| e.tag == "a").unwrap_or(false);
    let mut ls = only_l.iter().copied().filter(is_link);
    let mut rs = only_r.iter().copied().filter(is_link);
    let l = ls.next()?;
    if ls.next().is_some() {
        return None;
    }
    let r = rs.next()?;
    if rs.next().is_some() {
        return None;
    }
    Some((l, r))
}

/// Walk the resolved token sequence, closing/reopening/opening placeholders
/// to respect LIFO stack discipline, and joining words with single spaces
/// (a pending space is suppressed before a close placeholder).
fn linearize(tokens: &[Resolved], codec: &PlaceholderCodec) -> String {
    let mut out = String::new();
    let mut stack: Vec<char> = Vec::new();
    let mut pending_space = false;

    for token in tokens {
        let target: HashSet<char> = token.state.iter().copied().collect();

        if let Some(lowest) = stack.iter().position(|c| !target.contains(c)) {
            let popped: Vec<char> = stack.split_off(lowest);
            for &c in popped.iter().rev() {
                let close = codec.entry(c).and_then(|e| e.close_ref).expect("open has close_ref");
                push_placeholder(&mut out, close, &mut pending_space, false);
            }
            for &c in &popped {
                if target.contains(&c) {
                    push_placeholder(&mut out, c, &mut pending_space, true);
                    stack.push(c);
                }
            }
        }

        let current: HashSet<char> = stack.iter().copied().collect();
        let mut new_opens: Vec<char> = target.iter().copied().filter(|c| !current.contains(c)).collect();
        new_opens.sort_by(|a, b| {
            let rank = |c: &char| codec.entry(*c).and_then(|e| e.class);
            rank(a).cmp(&rank(b)).then((*a as u32).cmp(&(*b as u32)))
        });
        for c in new_opens {
            push_placeholder(&mut out, c, &mut pending_space, true);
            stack.push(c);
        }

        if pending_space {
            out.push(' ');
        }
        out.push_str(&token.word);
        pending_space = true;
    }

    for &c in stack.iter().rev() {
        let close = codec.entry(c).and_then(|e| e.close_ref).expect("open has close_ref");
        out.push(close);
    }

    out
}

fn push_placeholder(out: &mut String, c: char, pending_space: &mut bool, is_open: bool) {
    if *pending_space {
        if is_open {
            out.push(' ');
        }
        *pending_space = false;
    }
    out.push(c);
}
