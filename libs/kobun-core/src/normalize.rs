//! Canonical form of answer text.
//!
//! Both the answer key and the learner's input go through [`normalize`] with
//! the same [`FoldDirection`] before they are compared.

use crate::types::FoldDirection;

/// Punctuation removed before comparison: ideographic comma and full stop,
/// ASCII comma and period, full-width comma and period.
const STRIPPED_PUNCTUATION: &[char] = &['、', '。', ',', '.', '，', '．'];

/// Distance between a hiragana and the matching katakana codepoint.
const KANA_SHIFT: u32 = 0x60;

/// Hiragana codepoints that have a katakana twin 0x60 above: the letters
/// ぁ..ゖ and the iteration marks ゝゞゟ. The voicing marks U+309B/309C are
/// left out so that their shifted twins ー and ・ are never produced or folded.
const HIRAGANA_RANGES: [(u32, u32); 2] = [(0x3041, 0x3096), (0x309D, 0x309F)];

fn in_ranges(code: u32, offset: u32) -> bool {
    HIRAGANA_RANGES
        .iter()
        .any(|&(first, last)| (first + offset..=last + offset).contains(&code))
}

/// Normalize `text` into its canonical form.
///
/// Removes whitespace (including U+3000), strips [`STRIPPED_PUNCTUATION`],
/// folds kana in the given direction and lowercases. Total and idempotent.
pub fn normalize(text: &str, fold: FoldDirection) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .map(|c| fold_kana(c, fold))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Shift a single kana character across the hiragana/katakana blocks.
pub fn fold_kana(c: char, fold: FoldDirection) -> char {
    let code = c as u32;
    let shifted = match fold {
        FoldDirection::KatakanaToHiragana if in_ranges(code, KANA_SHIFT) => code - KANA_SHIFT,
        FoldDirection::HiraganaToKatakana if in_ranges(code, 0) => code + KANA_SHIFT,
        _ => return c,
    };
    char::from_u32(shifted).unwrap_or(c)
}
