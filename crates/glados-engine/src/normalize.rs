//! Text to model tokens
//!
//! English cleaning in the usual order: unicode punctuation folded to
//! ASCII, lower-casing, abbreviation and number expansion, whitespace
//! collapse. The result is mapped onto the voice model's symbol table.

use std::sync::LazyLock;

use regex::Regex;

/// Symbol table of the voice model; the index of a symbol is its id
pub const SYMBOLS: &str = "_-!'(),.:;? abcdefghijklmnopqrstuvwxyz";

/// Token ids ready for the inference backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens(Vec<i64>);

impl Tokens {
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<i64>> for Tokens {
    fn from(ids: Vec<i64>) -> Self {
        Self(ids)
    }
}

/// Converts raw text into model-ready tokens
///
/// Must be a pure function of its input.
pub trait TextNormalizer: Send + Sync {
    fn prepare(&self, text: &str) -> Tokens;
}

/// Character-level English normalizer
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishNormalizer;

impl TextNormalizer for EnglishNormalizer {
    fn prepare(&self, text: &str) -> Tokens {
        to_tokens(&clean(text))
    }
}

static ABBREVIATIONS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        ("mrs", "misess"),
        ("mr", "mister"),
        ("drs", "doctors"),
        ("dr", "doctor"),
        ("st", "saint"),
        ("co", "company"),
        ("jr", "junior"),
        ("maj", "major"),
        ("gen", "general"),
        ("rev", "reverend"),
        ("lt", "lieutenant"),
        ("hon", "honorable"),
        ("sgt", "sergeant"),
        ("capt", "captain"),
        ("esq", "esquire"),
        ("ltd", "limited"),
        ("col", "colonel"),
        ("ft", "fort"),
        ("vs", "versus"),
        ("etc", "et cetera"),
    ]
    .into_iter()
    .map(|(short, long)| {
        let pattern = Regex::new(&format!(r"\b{short}\.")).expect("must be valid regex");
        (pattern, long)
    })
    .collect()
});

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:,\d{3})*").expect("must be valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("must be valid regex"));

/// Normalized text, before symbol lookup
pub fn clean(text: &str) -> String {
    let mut text = fold_punctuation(text).to_lowercase();

    for (pattern, expansion) in ABBREVIATIONS.iter() {
        text = pattern.replace_all(&text, *expansion).into_owned();
    }

    let text = NUMBER.replace_all(&text, |captures: &regex::Captures<'_>| {
        let digits: String = captures[0].chars().filter(char::is_ascii_digit).collect();
        spell_digits(&digits)
    });

    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

fn fold_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '`' => '\'',
            '\u{201c}' | '\u{201d}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2026}' => '.',
            other => other,
        })
        .collect()
}

fn to_tokens(cleaned: &str) -> Tokens {
    cleaned
        .chars()
        .filter_map(|c| SYMBOLS.chars().position(|symbol| symbol == c))
        .filter_map(|id| i64::try_from(id).ok())
        .collect::<Vec<_>>()
        .into()
}

const ONES: [&str; 20] = [
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [(u64, &str); 3] = [(1_000_000_000, "billion"), (1_000_000, "million"), (1_000, "thousand")];

/// Spell a run of ASCII digits
///
/// Values that do not fit below a trillion, or carry leading zeros, are
/// read digit by digit.
fn spell_digits(digits: &str) -> String {
    let whole = digits.len() > 1 && digits.starts_with('0');

    match digits.parse::<u64>() {
        Ok(n) if !whole && n < 1_000_000_000_000 => spell_number(n),
        _ => digits
            .bytes()
            .map(|b| ONES[usize::from(b - b'0')])
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn spell_number(mut n: u64) -> String {
    if n == 0 {
        return ONES[0].to_string();
    }

    let mut words = Vec::new();

    for (scale, name) in SCALES {
        if n >= scale {
            words.push(spell_below_thousand(n / scale));
            words.push(name.to_string());
            n %= scale;
        }
    }

    if n > 0 {
        words.push(spell_below_thousand(n));
    }

    words.join(" ")
}

#[allow(clippy::cast_possible_truncation)]
fn spell_below_thousand(n: u64) -> String {
    let n = n as usize;
    let mut words = Vec::new();

    if n >= 100 {
        words.push(ONES[n / 100].to_string());
        words.push("hundred".to_string());
    }

    match n % 100 {
        0 => {}
        rest @ 1..=19 => words.push(ONES[rest].to_string()),
        rest if rest % 10 == 0 => words.push(TENS[rest / 10].to_string()),
        rest => words.push(format!("{}-{}", TENS[rest / 10], ONES[rest % 10])),
    }

    words.join(" ")
}
