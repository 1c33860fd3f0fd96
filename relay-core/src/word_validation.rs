/// Minimum length, in characters, of any word after the first.
pub const MIN_WORD_CHARS: usize = 2;

/// Word-chain rule: `candidate` is at least two characters long and starts
/// with the last character of `previous`.
///
/// Characters are Unicode scalar values. Nothing is trimmed, case folded or
/// normalized, so composed and decomposed Hangul do not match each other.
pub fn is_valid_word(previous: &str, candidate: &str) -> bool {
    if candidate.chars().count() < MIN_WORD_CHARS {
        return false;
    }

    match (previous.chars().last(), candidate.chars().next()) {
        (Some(last), Some(first)) => last == first,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_chain() {
        assert!(is_valid_word("사자", "자전차"));
        assert!(is_valid_word("apple", "egg"));
    }

    #[test]
    fn test_too_short() {
        assert!(!is_valid_word("사자", "자"));
        assert!(!is_valid_word("사자", "차"));
        assert!(!is_valid_word("사자", ""));
    }

    #[test]
    fn test_mismatched_first_char() {
        assert!(!is_valid_word("사자", "고양이"));
        assert!(!is_valid_word("apple", "banana"));
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        // "자자" is two chars but six bytes; "자" is one char but three bytes.
        assert!(is_valid_word("사자", "자자"));
        assert!(!is_valid_word("abc", "c"));
    }

    #[test]
    fn test_empty_previous_word() {
        assert!(!is_valid_word("", "자전거"));
    }

    #[test]
    fn test_no_normalization() {
        // Case is significant.
        assert!(!is_valid_word("apple", "Egg"));
        // Whitespace is significant.
        assert!(!is_valid_word("사자 ", "자전거"));
        assert!(!is_valid_word("사자", " 자전거"));
        // Decomposed jamo (ᄌ + ᅡ) does not match the composed syllable 자.
        assert!(!is_valid_word("사자", "\u{110C}\u{1161}전거"));
    }

    #[test]
    fn test_deterministic() {
        for _ in 0..3 {
            assert!(is_valid_word("기린", "린스"));
            assert!(!is_valid_word("기린", "사자"));
        }
    }
}
