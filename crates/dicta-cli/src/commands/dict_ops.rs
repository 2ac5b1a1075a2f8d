use std::fs;
use std::path::Path;
use std::process;

use dicta_core::dict::clock;
use dicta_core::dict::{
    BinaryDictionary, ComposedData, DictionaryDump, DictionaryHeader, DictionaryType,
    SuggestedWordInfo, SuggestionOptions,
};
use dicta_core::locale::Locale;
use dicta_core::ngram::{NgramContext, WordInfo, BEGINNING_OF_SENTENCE_TAG};
use serde::Serialize;
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::word_list;

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

pub struct BuildOptions<'a> {
    pub locale: &'a str,
    pub id: Option<&'a str>,
    pub version: &'a str,
    pub description: Option<&'a str>,
}

pub fn build(input_file: &str, output_file: &str, opts: &BuildOptions) {
    let text = die!(
        fs::read_to_string(input_file),
        "Error reading {input_file}: {}"
    );
    let entries = die!(word_list::parse_word_list(&text), "Error: {}");

    let locale = Locale::new(opts.locale);
    let id = opts
        .id
        .map_or_else(|| format!("main:{}", locale.to_language_tag()), str::to_string);
    let mut header = DictionaryHeader::new(&id, &locale, opts.version)
        .with_attribute("date", clock::current_time().to_string());
    if let Some(description) = opts.description {
        header = header.with_attribute("description", description);
    }

    eprintln!("Building {id} from {} entries...", entries.len());
    let (dict, rejected) = word_list::build_dictionary(header, &entries);
    if rejected > 0 {
        eprintln!("  Skipped {rejected} empty or over-long entries");
    }
    die!(
        dict.flush(Path::new(output_file)),
        "Error writing dictionary: {}"
    );

    let file_size = fs::metadata(output_file).map(|m| m.len()).unwrap_or(0);
    eprintln!(
        "Wrote {output_file} ({} words, {} n-grams, {:.1} KB)",
        dict.unigram_count(),
        dict.ngram_count(),
        file_size as f64 / 1024.0
    );
}

fn open(dict_file: &str) -> BinaryDictionary {
    let dict = die!(
        BinaryDictionary::open_file(Path::new(dict_file)),
        "Error opening dictionary: {}"
    );
    debug!(
        path = dict_file,
        words = dict.unigram_count(),
        ngrams = dict.ngram_count(),
        "opened dictionary"
    );
    dict
}

pub fn info(dict_file: &str) {
    let dict = open(dict_file);
    let header = dict.header();
    let file_size = fs::metadata(dict_file).map(|m| m.len()).unwrap_or(0);

    println!("Dictionary: {dict_file}");
    println!("File size:  {:.1} KB", file_size as f64 / 1024.0);
    println!("Id:         {}", header.id());
    println!("Locale:     {}", header.locale());
    println!("Version:    {}", header.version());
    println!("Words:      {}", dict.unigram_count());
    println!("N-grams:    {}", dict.ngram_count());
    println!(
        "History:    {}",
        if header.uses_forgetting_curve() {
            "forgetting curve"
        } else {
            "static"
        }
    );
    println!();
    println!("Attributes:");
    for (key, value) in header.attributes() {
        println!("  {key} = {value}");
    }
}

#[derive(Serialize)]
struct WordRow<'a> {
    word: &'a str,
    probability: i32,
    timestamp: i32,
    level: i32,
    count: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    shortcuts: Vec<(&'a str, i32)>,
    not_a_word: bool,
    offensive: bool,
}

#[derive(Serialize)]
struct NgramRow<'a> {
    context: String,
    word: &'a str,
    probability: i32,
}

#[derive(Serialize)]
struct DumpRows<'a> {
    words: Vec<WordRow<'a>>,
    ngrams: Vec<NgramRow<'a>>,
}

fn dump_rows(dump: &DictionaryDump) -> DumpRows<'_> {
    let words = dump
        .words
        .iter()
        .map(|w| WordRow {
            word: &w.word,
            probability: w.probability_info.probability,
            timestamp: w.probability_info.timestamp,
            level: w.probability_info.level,
            count: w.probability_info.count,
            shortcuts: w
                .shortcuts
                .iter()
                .map(|s| (s.word.as_str(), s.probability()))
                .collect(),
            not_a_word: w.is_not_a_word,
            offensive: w.is_possibly_offensive,
        })
        .collect();
    let ngrams = dump
        .ngrams
        .iter()
        .map(|n| NgramRow {
            context: n.ngram_context.extract_prev_words_context(),
            word: &n.target_word.word,
            probability: n.target_word.probability(),
        })
        .collect();
    DumpRows { words, ngrams }
}

/// Text form of a dump: one word or n-gram per line, columns aligned on
/// display width so CJK words line up.
pub fn format_dump(dump: &DictionaryDump, with_history: bool) -> String {
    let rows = dump_rows(dump);
    let width = rows
        .words
        .iter()
        .map(|w| w.word.width())
        .chain(rows.ngrams.iter().map(|n| n.context.width() + 3 + n.word.width()))
        .max()
        .unwrap_or(0);
    let pad = |text: &str, shown: usize| format!("{text}{}", " ".repeat(width - shown));

    let mut out = String::new();
    for w in &rows.words {
        out.push_str(&format!("{}  {:>3}", pad(w.word, w.word.width()), w.probability));
        if with_history {
            out.push_str(&format!(
                "  ts={} level={} count={}",
                w.timestamp, w.level, w.count
            ));
        }
        for (target, freq) in &w.shortcuts {
            out.push_str(&format!("  shortcut={target}:{freq}"));
        }
        if w.not_a_word {
            out.push_str("  not_a_word");
        }
        if w.offensive {
            out.push_str("  offensive");
        }
        out.push('\n');
    }
    for n in &rows.ngrams {
        let edge = format!("{} → {}", n.context, n.word);
        let shown = n.context.width() + 3 + n.word.width();
        out.push_str(&format!("{}  {:>3}\n", pad(&edge, shown), n.probability));
    }
    out
}

fn print_dump(dict: &BinaryDictionary, now: i32, json: bool) {
    let dump = dict.dump_all(now);
    if json {
        let text = die!(
            serde_json::to_string_pretty(&dump_rows(&dump)),
            "Error encoding dump: {}"
        );
        println!("{text}");
        return;
    }
    print!(
        "{}",
        format_dump(&dump, dict.header().uses_forgetting_curve())
    );
    println!("---");
    println!("{} words, {} n-grams", dump.words.len(), dump.ngrams.len());
}

pub fn dump(dict_file: &str, json: bool) {
    let dict = open(dict_file);
    print_dump(&dict, clock::current_time(), json);
}

/// Dumps with the engine clock frozen at `timestamp`, showing what the
/// forgetting curve leaves of each entry at that moment.
pub fn decay(dict_file: &str, timestamp: i32, json: bool) {
    let dict = open(dict_file);
    if !dict.header().uses_forgetting_curve() {
        eprintln!("Note: {dict_file} has no forgetting curve; probabilities are static");
    }
    clock::set_current_time_for_test(Some(timestamp));
    print_dump(&dict, clock::current_time(), json);
    clock::set_current_time_for_test(None);
}

/// Oldest-first words as typed on the command line, `<S>` for a sentence
/// start.
pub fn context_from_args(prev_words: &[String]) -> NgramContext {
    if prev_words.is_empty() {
        return NgramContext::empty();
    }
    let words = prev_words
        .iter()
        .rev()
        .map(|w| {
            if w == BEGINNING_OF_SENTENCE_TAG {
                WordInfo::BeginningOfSentence
            } else {
                WordInfo::word(w.as_str())
            }
        })
        .collect();
    NgramContext::from_words(words)
}

pub fn format_suggestions(suggestions: &[SuggestedWordInfo]) -> String {
    let width = suggestions.iter().map(|s| s.word.width()).max().unwrap_or(0);
    let mut out = String::new();
    for (i, s) in suggestions.iter().enumerate() {
        let padding = " ".repeat(width - s.word.width());
        out.push_str(&format!(
            "{:>2}. {}{padding}  score={:<4} {:?}",
            i + 1,
            s.word,
            s.score,
            s.kind
        ));
        if s.auto_commit_confidence > 0 {
            out.push_str(&format!("  auto_commit={}", s.auto_commit_confidence));
        }
        out.push('\n');
    }
    out
}

pub struct SuggestOptions {
    pub n: usize,
    pub gesture: bool,
    pub block_offensive: bool,
    pub json: bool,
}

pub fn suggest(dict_file: &str, typed: &str, prev_words: &[String], opts: &SuggestOptions) {
    let dict = open(dict_file);
    let composed = if opts.gesture {
        ComposedData::batch(typed)
    } else {
        ComposedData::typed(typed)
    };
    let ngram_context = context_from_args(prev_words);
    let options = SuggestionOptions {
        block_offensive_words: opts.block_offensive,
        ..SuggestionOptions::default()
    };
    let mut suggestions =
        dict.get_suggestions(&composed, &ngram_context, &options, 0, 1.0, DictionaryType::Main);
    suggestions.truncate(opts.n);

    if opts.json {
        let text = die!(
            serde_json::to_string_pretty(&suggestions),
            "Error encoding suggestions: {}"
        );
        println!("{text}");
        return;
    }
    if suggestions.is_empty() {
        println!("(no suggestions)");
    } else {
        print!("{}", format_suggestions(&suggestions));
    }
}

#[cfg(test)]
mod tests {
    use dicta_core::dict::SuggestionKind;

    use super::*;
    use crate::word_list::{build_dictionary, parse_word_list};

    fn sample() -> BinaryDictionary {
        let entries = parse_word_list("hello\t180\nhelp\t150\nhello world\t60\n").unwrap();
        let header = DictionaryHeader::new("main:en", &Locale::new("en"), "1");
        build_dictionary(header, &entries).0
    }

    #[test]
    fn context_args_are_oldest_first() {
        let context = context_from_args(&["<S>".into(), "hello".into()]);
        assert_eq!(context.nth_prev_word(1), Some("hello"));
        assert!(context.is_nth_prev_word_beginning_of_sentence(2));
        assert!(!context_from_args(&[]).is_valid());
    }

    #[test]
    fn dump_lines_up_words_and_ngrams() {
        let text = format_dump(&sample().dump_all(0), false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec!["hello          180", "help           150", "hello → world   60"]
        );
    }

    #[test]
    fn suggestions_are_numbered() {
        let suggestions = vec![
            SuggestedWordInfo::new(
                "hello",
                180,
                SuggestionKind::Correction,
                DictionaryType::Main,
            ),
            SuggestedWordInfo::new("hi", 20, SuggestionKind::Completion, DictionaryType::Main),
        ];
        assert_eq!(
            format_suggestions(&suggestions),
            " 1. hello  score=180  Correction\n 2. hi     score=20   Completion\n"
        );
    }

    #[test]
    fn built_file_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/main_en.dict");
        sample().flush(&path).unwrap();
        let dict = BinaryDictionary::open_file(&path).unwrap();
        assert_eq!(dict.header().id(), "main:en");
        let suggestions = dict.get_suggestions(
            &ComposedData::typed("he"),
            &context_from_args(&[]),
            &SuggestionOptions::default(),
            0,
            1.0,
            DictionaryType::Main,
        );
        let words: Vec<_> = suggestions.iter().map(|s| s.word.as_str()).collect();
        assert_eq!(words, vec!["hello", "help"]);
    }
}
