use dicta_core::dict::Dictionary;
use dicta_core::locale::Locale;
use dicta_core::ngram::{NgramContext, WordInfo};
use dicta_core::probability::{NOT_A_PROBABILITY, NOT_A_VALID_TIMESTAMP};

use super::Fixture;
use crate::InputEventType;

fn after(word: &str) -> NgramContext {
    NgramContext::from_words(vec![WordInfo::word(word)])
}

#[test]
fn test_auto_capitalized_word_is_learned_lowercase() {
    let fixture = Fixture::new();
    fixture.reset(&["en"]);
    fixture.learn("Hello", &NgramContext::beginning_of_sentence(), true);

    let history = fixture.history("en");
    assert!(history.get_frequency("hello") > 0);
    assert_eq!(history.get_frequency("Hello"), NOT_A_PROBABILITY);
}

#[test]
fn test_capitalized_only_word_keeps_case() {
    let fixture = Fixture::new();
    fixture.reset(&["en"]);
    fixture.learn("Paris", &NgramContext::beginning_of_sentence(), true);

    let history = fixture.history("en");
    assert!(history.get_frequency("Paris") > 0);
    assert_eq!(history.get_frequency("paris"), NOT_A_PROBABILITY);
}

#[test]
fn test_mid_sentence_capital_prefers_common_lowercase() {
    let fixture = Fixture::new();
    fixture.reset(&["en"]);
    fixture.learn("The", &after("said"), false);
    // Unknown words keep the case they were typed in.
    fixture.learn("Zorbly", &after("said"), false);

    let history = fixture.history("en");
    assert!(history.get_frequency("the") > 0);
    assert_eq!(history.get_frequency("The"), NOT_A_PROBABILITY);
    assert!(history.get_frequency("Zorbly") > 0);
}

#[test]
fn test_offensive_words_are_not_learned_when_blocked() {
    let fixture = Fixture::new();
    fixture.reset(&["en"]);
    fixture.learn("darn", &after("oh"), false);
    assert_eq!(fixture.history("en").get_frequency("darn"), NOT_A_PROBABILITY);

    fixture.facilitator.add_to_user_history(
        "darn",
        false,
        &after("oh"),
        NOT_A_VALID_TIMESTAMP,
        false,
    );
    fixture.facilitator.wait_for_pending_tasks();
    assert!(fixture.history("en").get_frequency("darn") > 0);
}

#[test]
fn test_phrase_is_learned_word_by_word() {
    let fixture = Fixture::new();
    fixture.reset(&["en"]);
    fixture.learn("hello world", &NgramContext::empty(), false);

    let history = fixture.history("en");
    assert!(history.get_frequency("hello") > 0);
    assert!(history.get_frequency("world") > 0);
    let dump = history.dump_all().unwrap();
    assert!(dump.ngrams.iter().any(|n| {
        n.target_word.word == "world" && n.ngram_context.nth_prev_word(1) == Some("hello")
    }));
}

#[test]
fn test_without_personalization_nothing_is_learned() {
    let fixture = Fixture::new();
    fixture
        .facilitator
        .reset_dictionaries(&crate::ResetOptions::new(Locale::new("en")), None);
    fixture.learn("zorbly", &after("a"), false);
    assert_eq!(fixture.history("en").get_frequency("zorbly"), NOT_A_PROBABILITY);
}

#[test]
fn test_unlearn_ignores_backspace() {
    let fixture = Fixture::new();
    fixture.reset(&["en"]);
    fixture.learn("zorbly", &after("a"), false);

    fixture
        .facilitator
        .unlearn_from_user_history("zorbly", InputEventType::Backspace);
    fixture.facilitator.wait_for_pending_tasks();
    assert!(fixture.history("en").get_frequency("zorbly") > 0);

    fixture
        .facilitator
        .unlearn_from_user_history("zorbly", InputEventType::Revert);
    fixture.facilitator.wait_for_pending_tasks();
    assert_eq!(fixture.history("en").get_frequency("zorbly"), NOT_A_PROBABILITY);
}

#[test]
fn test_confidence_follows_typed_language() {
    let fixture = Fixture::new();
    fixture.reset(&["en", "de"]);
    for _ in 0..3 {
        fixture.learn("danke", &after("ja"), false);
    }
    assert_eq!(
        fixture.facilitator.locales_and_confidences().as_deref(),
        Some("en 0, de 4")
    );
    assert_eq!(fixture.facilitator.current_locale(), Locale::new("de"));
    // History goes to the locale being typed.
    assert!(fixture.history("de").get_frequency("danke") > 0);

    fixture.facilitator.adjust_confidences("hello", false);
    fixture.facilitator.wait_for_pending_tasks();
    assert_eq!(
        fixture.facilitator.locales_and_confidences().as_deref(),
        Some("en 1, de 2")
    );
}

#[test]
fn test_repeated_unknown_word_is_promoted() {
    let fixture = Fixture::new();
    fixture.reset(&["en"]);
    fixture.facilitator.set_add_to_personal_dictionary(true);
    for _ in 0..4 {
        fixture.learn("zorbly", &after("a"), false);
    }
    assert!(!fixture.facilitator.is_valid_spelling_word("zorbly"));
    fixture.learn("zorbly", &after("a"), false);
    assert!(fixture.facilitator.is_valid_spelling_word("zorbly"));
}

#[test]
fn test_removed_main_word_is_blacklisted_until_typed() {
    let fixture = Fixture::new();
    fixture.reset(&["en"]);
    fixture.learn("help", &after("please"), false);

    fixture.facilitator.remove_word("help");
    fixture.facilitator.wait_for_pending_tasks();
    assert!(!fixture.facilitator.is_valid_spelling_word("help"));
    assert_eq!(fixture.history("en").get_frequency("help"), NOT_A_PROBABILITY);
    let blacklist = fixture.dir.path().join("files/blacklists/en.txt");
    assert_eq!(std::fs::read_to_string(&blacklist).unwrap(), "help\n");

    fixture.learn("help", &after("please"), false);
    assert!(fixture.facilitator.is_valid_spelling_word("help"));
    assert_eq!(std::fs::read_to_string(&blacklist).unwrap(), "");
}

#[test]
fn test_clear_history_forgets_everything() {
    let fixture = Fixture::new();
    fixture.reset(&["en"]);
    fixture.learn("zorbly", &after("a"), false);
    fixture.facilitator.clear_user_history_dictionary();
    fixture.facilitator.wait_for_pending_tasks();
    assert_eq!(fixture.history("en").get_frequency("zorbly"), NOT_A_PROBABILITY);
}

#[test]
fn test_spelling_cache_follows_learning() {
    let fixture = Fixture::new();
    fixture.facilitator.set_valid_spelling_word_cache(16);
    fixture.reset(&["en"]);
    assert!(fixture.facilitator.is_valid_spelling_word("help"));
    fixture.facilitator.remove_word("help");
    assert!(!fixture.facilitator.is_valid_spelling_word("help"));

    fixture.facilitator.set_add_to_personal_dictionary(true);
    for _ in 0..4 {
        fixture.learn("zorbly", &after("a"), false);
    }
    assert!(!fixture.facilitator.is_valid_spelling_word("zorbly"));
    // The cached answer is dropped once the word reaches the user dictionary.
    fixture.learn("zorbly", &after("a"), false);
    assert!(fixture.facilitator.is_valid_spelling_word("zorbly"));
}
