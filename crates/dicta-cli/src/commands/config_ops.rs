use std::fs;
use std::process;

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

pub fn settings_export() {
    print!("{}", dicta_core::settings::default_toml());
}

pub fn settings_validate(file: &str) {
    let content = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let s = die!(
        dicta_core::settings::parse_settings_toml(&content),
        "Error: {}"
    );
    println!(
        "OK: history.half_life_hours={}, suggestions.max_results={}, spellcheck.max_sessions={}",
        s.history.half_life_hours, s.suggestions.max_results, s.spellcheck.max_sessions
    );
}
