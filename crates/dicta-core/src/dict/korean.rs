//! Korean decorator.
//!
//! Dictionaries store Hangul decomposed into standard (conjoining) jamo, so
//! the trie only branches over a few dozen letters instead of eleven
//! thousand syllables. Input is NFD-decomposed and compatibility jamo are
//! mapped to their conjoining equivalents; output is recomposed with NFC and
//! any jamo left standing alone are mapped back.

use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;

use super::{ComposedData, Dictionary, DictionaryType, SuggestedWordInfo, SuggestionOptions};
use crate::locale::Locale;
use crate::ngram::{NgramContext, WordInfo};

const COMPAT_CONSONANTS: &str = "ㄱㄲㄳㄴㄵㄶㄷㄸㄹㄺㄻㄼㄽㄾㄿㅀㅁㅂㅃㅄㅅㅆㅇㅈㅉㅊㅋㅌㅍㅎ";
const COMPAT_VOWELS: &str = "ㅏㅐㅑㅒㅓㅔㅕㅖㅗㅘㅙㅚㅛㅜㅝㅞㅟㅠㅡㅢㅣ";
/// Initial consonant for each compatibility consonant; `\0` where the
/// consonant cluster only exists as a final.
const CONVERT_INITIALS: &str =
    "ᄀᄁ\0ᄂ\0\0ᄃᄄᄅ\0\0\0\0\0\0\0ᄆᄇᄈ\0ᄉᄊᄋᄌᄍᄎᄏᄐᄑᄒ";
const CONVERT_MEDIALS: &str = "ᅡᅢᅣᅤᅥᅦᅧᅨᅩᅪᅫᅬᅭᅮᅯᅰᅱᅲᅳᅴᅵ";

fn convert(c: char, from: &str, to: &str) -> Option<char> {
    let index = from.chars().position(|f| f == c)?;
    to.chars().nth(index).filter(|&t| t != '\0')
}

pub fn process_input(input: &str) -> String {
    input
        .nfd()
        .map(|c| {
            convert(c, COMPAT_CONSONANTS, CONVERT_INITIALS)
                .or_else(|| convert(c, COMPAT_VOWELS, CONVERT_MEDIALS))
                .unwrap_or(c)
        })
        .collect()
}

pub fn process_output(output: &str) -> String {
    output
        .nfc()
        .map(|c| {
            if c == '\0' {
                return c;
            }
            convert(c, CONVERT_INITIALS, COMPAT_CONSONANTS)
                .or_else(|| convert(c, CONVERT_MEDIALS, COMPAT_VOWELS))
                .unwrap_or(c)
        })
        .collect()
}

fn process_context(ngram_context: &NgramContext) -> NgramContext {
    let words = ngram_context
        .words()
        .iter()
        .map(|info| match info {
            WordInfo::Word(w) => WordInfo::Word(process_input(w)),
            other => other.clone(),
        })
        .collect();
    NgramContext::with_max(ngram_context.max_prev_word_count(), words)
}

/// Wraps any dictionary holding Korean text in decomposed form.
pub struct KoreanDictionary {
    inner: Arc<dyn Dictionary>,
}

impl KoreanDictionary {
    pub fn new(inner: Arc<dyn Dictionary>) -> Self {
        Self { inner }
    }
}

impl Dictionary for KoreanDictionary {
    fn dict_type(&self) -> DictionaryType {
        self.inner.dict_type()
    }

    fn locale(&self) -> &Locale {
        self.inner.locale()
    }

    fn get_suggestions(
        &self,
        composed: &ComposedData,
        ngram_context: &NgramContext,
        options: &SuggestionOptions,
        session_id: usize,
        weight_for_locale: f32,
    ) -> Option<Vec<SuggestedWordInfo>> {
        let composed = ComposedData {
            typed_word: process_input(&composed.typed_word),
            is_batch_mode: composed.is_batch_mode,
        };
        let suggestions = self.inner.get_suggestions(
            &composed,
            &process_context(ngram_context),
            options,
            session_id,
            weight_for_locale,
        )?;
        Some(
            suggestions
                .into_iter()
                .map(|mut s| {
                    s.word = process_output(&s.word);
                    s
                })
                .collect(),
        )
    }

    fn is_in_dictionary(&self, word: &str) -> bool {
        self.inner.is_in_dictionary(&process_input(word))
    }

    fn get_frequency(&self, word: &str) -> i32 {
        self.inner.get_frequency(&process_input(word))
    }

    fn get_max_frequency_of_exact_matches(&self, word: &str) -> i32 {
        self.inner
            .get_max_frequency_of_exact_matches(&process_input(word))
    }

    fn is_valid_word(&self, word: &str) -> bool {
        self.inner.is_valid_word(&process_input(word))
    }

    fn same(&self, a: &str, b: &str) -> bool {
        self.inner.same(&process_input(a), &process_input(b))
    }

    fn should_auto_commit(&self, candidate: &SuggestedWordInfo) -> bool {
        self.inner.should_auto_commit(candidate)
    }

    fn is_initialized(&self) -> bool {
        self.inner.is_initialized()
    }

    fn is_user_specific(&self) -> bool {
        self.inner.is_user_specific()
    }

    fn on_finish_input(&self) {
        self.inner.on_finish_input();
    }

    fn close(&self) {
        self.inner.close();
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::dict::{BinaryDictionary, DictionaryHeader, ReadOnlyBinaryDictionary};

    #[test]
    fn decomposes_syllables_and_compat_jamo() {
        assert_eq!(process_input("한"), "\u{1112}\u{1161}\u{11AB}");
        assert_eq!(process_input("ㄱ"), "\u{1100}");
        assert_eq!(process_input("ㅏ"), "\u{1161}");
        // Final-only clusters have no initial form.
        assert_eq!(process_input("ㄳ"), "ㄳ");
        assert_eq!(process_input("abc"), "abc");
    }

    #[test]
    fn recomposes_output() {
        assert_eq!(process_output("\u{1112}\u{1161}\u{11AB}"), "한");
        assert_eq!(process_output("\u{1100}"), "ㄱ");
        assert_eq!(process_output("\u{1100}\u{1161}"), "가");
        assert_eq!(process_output(&process_input("한국어")), "한국어");
    }

    #[test]
    fn lookups_go_through_decomposition() {
        let header = DictionaryHeader::new("main:ko", &Locale::new("ko"), "1");
        let mut dict = BinaryDictionary::create_on_memory(header);
        for (word, freq) in [("한국", 180), ("한국어", 200), ("하늘", 120)] {
            dict.add_unigram_entry(&process_input(word), freq, None, false, false, -1);
        }
        let korean = KoreanDictionary::new(Arc::new(ReadOnlyBinaryDictionary::from_binary(
            dict,
            DictionaryType::Main,
        )));

        assert!(korean.is_in_dictionary("한국"));
        assert_eq!(korean.get_frequency("하늘"), 120);
        assert!(korean.same("한", "\u{1112}\u{1161}\u{11AB}"));

        // Typing the first jamo of the next syllable still matches.
        let words: Vec<_> = korean
            .get_suggestions(
                &ComposedData::typed("한ㄱ"),
                &NgramContext::empty(),
                &SuggestionOptions::default(),
                0,
                1.0,
            )
            .unwrap()
            .into_iter()
            .map(|s| s.word)
            .collect();
        assert_eq!(words, vec!["한국어", "한국"]);
    }

    #[test]
    fn compat_consonant_then_vowel_composes_a_syllable() {
        for c in COMPAT_CONSONANTS.chars() {
            let Some(initial) = convert(c, COMPAT_CONSONANTS, CONVERT_INITIALS) else {
                continue;
            };
            for v in COMPAT_VOWELS.chars() {
                let medial = convert(v, COMPAT_VOWELS, CONVERT_MEDIALS).unwrap();
                let code = 0xAC00 + (initial as u32 - 0x1100) * 588 + (medial as u32 - 0x1161) * 28;
                let syllable = char::from_u32(code).unwrap().to_string();
                assert_eq!(process_output(&process_input(&format!("{c}{v}"))), syllable);
            }
        }
        assert_eq!(process_output(&process_input("ㅎㅏㄴ")), "하ㄴ");
        assert_eq!(process_output(&process_input("ㄳㅏ")), "ㄳㅏ");
        assert_eq!(process_output(&process_input("가ㅏ")), "가ㅏ");
    }

    const SYLLABLES: &[&str] = &["가", "한", "국", "어", "값", "뷁", "의", "ㅎ"];

    fn hangul_piece() -> impl Strategy<Value = String> {
        prop_oneof![
            proptest::sample::select(SYLLABLES).prop_map(|s| s.to_string()),
            proptest::sample::select(COMPAT_CONSONANTS.chars().collect::<Vec<_>>())
                .prop_map(String::from),
            proptest::sample::select(COMPAT_VOWELS.chars().collect::<Vec<_>>())
                .prop_map(String::from),
        ]
    }

    /// A compatibility consonant with an initial form directly followed by a
    /// vowel composes into a syllable; those pairs are checked one by one in
    /// `compat_consonant_then_vowel_composes_a_syllable`.
    fn composes_across(s: &str) -> bool {
        let chars: Vec<char> = s.chars().collect();
        chars.windows(2).any(|w| {
            convert(w[0], COMPAT_CONSONANTS, CONVERT_INITIALS).is_some()
                && COMPAT_VOWELS.contains(w[1])
        })
    }

    proptest! {
        #[test]
        fn output_inverts_input(pieces in proptest::collection::vec(hangul_piece(), 0..8)) {
            let s: String = pieces.concat();
            prop_assume!(!composes_across(&s));
            let expected: String = s.nfc().collect();
            prop_assert_eq!(process_output(&process_input(&s)), expected);
        }
    }
}
