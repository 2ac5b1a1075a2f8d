use std::fs;

use crate::dict::{
    BinaryDictionary, ComposedData, Dictionary, DictionaryConfig, DictionaryType,
    ExpandableBinaryDictionary, LoadState, SuggestionOptions, UserBinaryDictionary,
    UserHistoryDictionary,
};
use crate::locale::Locale;
use crate::ngram::{NgramContext, WordInfo};
use crate::probability::NOT_A_PROBABILITY;

fn history(dir: &std::path::Path) -> ExpandableBinaryDictionary {
    UserHistoryDictionary::create(&Locale::new("en_US"), None, "", &DictionaryConfig::new(dir))
}

fn suggest(dict: &dyn Dictionary, typed: &str, ctx: &NgramContext) -> Vec<(String, i32)> {
    dict.get_suggestions(
        &ComposedData::typed(typed),
        ctx,
        &SuggestionOptions::default(),
        0,
        1.0,
    )
    .unwrap_or_default()
    .into_iter()
    .map(|s| (s.word, s.score))
    .collect()
}

#[test]
fn fresh_history_serves_inserted_unigram() {
    let dir = tempfile::tempdir().unwrap();
    let dict = history(dir.path());
    assert_eq!(dict.load_state(), LoadState::Unloaded);
    dict.add_unigram_entry("hello", 128, None, false, false, -1);
    dict.wait_for_pending_tasks();
    assert!(dict.is_initialized());

    let words = suggest(&dict, "hel", &NgramContext::empty());
    let (_, score) = words
        .iter()
        .find(|(w, _)| w == "hello")
        .expect("hello is suggested");
    assert!((0..=128).contains(score));
}

#[test]
fn over_long_words_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let dict = history(dir.path());
    dict.reload_dictionary_if_required();
    let long = "x".repeat(crate::DICTIONARY_MAX_WORD_LENGTH + 1);
    UserHistoryDictionary::add_to_dictionary(&dict, &NgramContext::empty(), &long, true, -1);
    dict.add_unigram_entry(&long, 10, None, false, false, -1);
    dict.wait_for_pending_tasks();
    let dump = dict.dump_all().unwrap();
    assert!(dump.words.is_empty());
    assert!(dump.ngrams.is_empty());
}

#[test]
fn history_learns_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    {
        let dict = history(dir.path());
        let ctx = NgramContext::from_words(vec![WordInfo::word("good")]);
        UserHistoryDictionary::add_to_dictionary(&dict, &ctx, "morning", false, -1);
        UserHistoryDictionary::add_to_dictionary(&dict, &ctx, "morning", false, -1);
        dict.flush();
        dict.wait_for_pending_tasks();
        // A ranking signal, not a spelling authority.
        assert!(dict.is_in_dictionary("morning"));
        assert!(!dict.is_valid_word("morning"));
    }

    let dict = history(dir.path());
    dict.reload_dictionary_if_required();
    dict.wait_for_pending_tasks();
    let freq = dict.get_frequency("morning");
    assert!((70..=80).contains(&freq), "frequency {freq}");

    let ctx = NgramContext::from_words(vec![WordInfo::word("good")]);
    let predictions = suggest(&dict, "", &ctx);
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0].0, "morning");
}

#[test]
fn corrupt_file_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let dict = history(dir.path());
    fs::write(dict.file(), b"not a dictionary").unwrap();
    dict.reload_dictionary_if_required();
    dict.wait_for_pending_tasks();
    assert!(dict.is_initialized());
    assert_eq!(dict.get_dictionary_stats().word_count, 0);
    let rebuilt = BinaryDictionary::open_file(dict.file()).unwrap();
    assert!(rebuilt.header().uses_forgetting_curve());
    assert!(rebuilt.header().has_historical_info());
}

#[test]
fn clear_drops_content_and_file() {
    let dir = tempfile::tempdir().unwrap();
    let dict = history(dir.path());
    UserHistoryDictionary::add_to_dictionary(&dict, &NgramContext::empty(), "hello", true, -1);
    dict.flush();
    dict.wait_for_pending_tasks();
    assert!(dict.file().exists());

    dict.clear();
    dict.wait_for_pending_tasks();
    assert!(!dict.file().exists());
    assert_eq!(dict.get_frequency("hello"), NOT_A_PROBABILITY);
}

#[test]
fn close_then_access_reloads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let dict = UserBinaryDictionary::create(
        &Locale::new("fr"),
        None,
        "",
        &DictionaryConfig::new(dir.path()),
    );
    dict.add_unigram_entry("bonjour", 200, None, false, false, -1);
    dict.close();
    dict.wait_for_pending_tasks();
    assert_eq!(dict.load_state(), LoadState::Unloaded);

    // The first read only queues the reload.
    let _ = dict.is_in_dictionary("bonjour");
    dict.wait_for_pending_tasks();
    assert!(dict.is_in_dictionary("bonjour"));
    assert!(dict.is_valid_word("bonjour"));
    assert_eq!(dict.dict_type(), DictionaryType::User);
}

#[test]
fn update_queued_right_after_close_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let dict = history(dir.path());
    dict.add_unigram_entry("hello", 128, None, false, false, -1);
    dict.wait_for_pending_tasks();

    dict.close();
    assert_eq!(dict.load_state(), LoadState::Unloaded);
    dict.update_entries_for_word(&NgramContext::empty(), "world", true, 1, -1);
    dict.wait_for_pending_tasks();

    assert_eq!(dict.load_state(), LoadState::Loaded);
    assert!(dict.is_in_dictionary("hello"));
    assert!(dict.is_in_dictionary("world"));
}

#[test]
fn locked_sequence_and_removal() {
    let dir = tempfile::tempdir().unwrap();
    let dict = history(dir.path());
    dict.update_locked(|w| {
        w.add_unigram_locked("alpha", 100, None, false, false, -1);
        w.add_unigram_locked("beta", 100, None, false, false, -1);
        w.add_ngram_entry_locked(
            &NgramContext::from_words(vec![WordInfo::word("alpha")]),
            "beta",
            50,
            -1,
        );
        w.run_gc_if_required_locked(true);
    });
    dict.remove_unigram_entry_dynamically("alpha");
    dict.wait_for_pending_tasks();

    let stats = dict.get_dictionary_stats();
    assert_eq!(stats.word_count, 1);
    assert_eq!(stats.ngram_count, 1);
    assert_eq!(stats.dict_type, DictionaryType::UserHistory);
    assert_eq!(stats.dict_name, "UserHistoryDictionary.en_US");

    dict.remove_ngram_entry_dynamically(
        &NgramContext::from_words(vec![WordInfo::word("alpha")]),
        "beta",
    );
    dict.wait_for_pending_tasks();
    assert_eq!(dict.get_dictionary_stats().ngram_count, 0);
}
