use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dicta_core::dict::{
    BinaryDictionary, ComposedData, DictionaryHeader, DictionaryType, SuggestionOptions,
};
use dicta_core::locale::Locale;
use dicta_core::ngram::{NgramContext, WordInfo};

fn bench_dict() -> BinaryDictionary {
    let mut dict =
        BinaryDictionary::create_on_memory(DictionaryHeader::new("main:en", &Locale::new("en"), "1"));
    let stems = ["the", "ther", "thin", "this", "tho", "thr", "tha", "ma", "mo", "me"];
    for (i, stem) in stems.iter().enumerate() {
        for n in 0..500 {
            let word = format!("{stem}{n}");
            dict.add_unigram_entry(&word, ((i * 17 + n) % 255) as i32, None, false, false, -1);
        }
    }
    let ctx = NgramContext::from_words(vec![WordInfo::word("of")]);
    for n in 0..200 {
        dict.add_ngram_entry(&ctx, &format!("the{n}"), (n % 200) as i32, -1);
    }
    dict
}

fn bench_suggestions(c: &mut Criterion) {
    let dict = bench_dict();
    let options = SuggestionOptions::default();
    let mut group = c.benchmark_group("get_suggestions");

    for typed in ["t", "th", "the1", "ma49"] {
        group.bench_with_input(BenchmarkId::new("typed", typed), typed, |b, typed| {
            let composed = ComposedData::typed(typed);
            b.iter(|| {
                dict.get_suggestions(
                    black_box(&composed),
                    &NgramContext::empty(),
                    &options,
                    0,
                    1.0,
                    DictionaryType::Main,
                )
            })
        });
    }

    let ctx = NgramContext::from_words(vec![WordInfo::word("of")]);
    group.bench_function("prediction", |b| {
        let composed = ComposedData::typed("");
        b.iter(|| {
            dict.get_suggestions(
                black_box(&composed),
                &ctx,
                &options,
                0,
                1.0,
                DictionaryType::Main,
            )
        })
    });
    group.finish();
}

criterion_group!(benches, bench_suggestions);
criterion_main!(benches);
