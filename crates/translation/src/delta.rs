/// Returns the suffix of `curr` past its longest common prefix with `prev`.
///
/// Streaming STT/MT output is overwhelmingly prefix-stable with tail
/// revision, so a prefix-only delta captures the animation signal in O(n).
/// The UI re-renders `full_text` for corrections and fades in the delta.
pub fn text_delta(prev: &str, curr: &str) -> String {
    curr[common_prefix_bytes(prev, curr)..].to_string()
}

/// Byte length of the longest common code-point prefix of `a` and `b`.
///
/// Comparison walks code points, never bytes, so a multi-byte sequence is
/// either wholly inside the prefix or wholly outside it.
fn common_prefix_bytes(a: &str, b: &str) -> usize {
    let mut len = 0;
    for (ca, cb) in a.chars().zip(b.chars()) {
        if ca != cb {
            break;
        }
        len += ca.len_utf8();
    }
    len
}
