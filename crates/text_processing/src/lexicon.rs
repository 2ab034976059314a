//! Word lists used for vocabulary-based language detection
//!
//! Entries are matched as whole lowercase tokens. Words that are also common
//! English words ("the", "do", "main", "sun") are left out of the Roman
//! lexicons so short English sentences do not score as Urdu.

/// High-frequency Roman Urdu function words, pronouns and copulas
pub const ROMAN_URDU: &[&str] = &[
    "kaise", "kese", "kaisey", "kesay", "aap", "mein", "theek", "thik", "theik", "shukriya",
    "shukria", "madad", "kya", "kar", "karo", "sakte", "sakta", "sakti", "mujhe", "mera", "meri",
    "hai", "hain", "hun", "hoon", "thi", "kyun", "kahan", "kaun", "acha", "achha", "bilkul",
    "zaroor", "yaqeen", "sach", "jhoot", "salam", "salaam", "alaikum", "khuda", "hafiz", "maaf",
    "kijiye", "barah", "karam", "awaz", "rahe", "jawab", "yahan", "koi", "masla", "nahi", "nahin",
    "phir", "koshish", "karein", "yaad", "dilao", "batao", "kal", "aaj", "ke", "ki", "ka", "ko",
    "se", "baad",
];

/// High-frequency Roman Pashto words
pub const ROMAN_PASHTO: &[&str] = &[
    "sta", "staso", "yast", "yaste", "kaw", "kawi", "kawe", "kawam", "kawalai", "kawale", "kawom",
    "kawem", "kawed", "kawal", "kawala", "kawalo", "dera", "khaire", "kha", "manana", "manena",
    "mehrbani", "sara", "komak", "murajat", "tsanga", "zma", "zama", "pas", "yadawal", "wakht",
];

/// Count distinct lexicon entries present among `tokens`
pub fn distinct_hits(tokens: &[String], lexicon: &[&str]) -> usize {
    lexicon
        .iter()
        .filter(|word| tokens.iter().any(|t| t == *word))
        .count()
}

/// Count tokens that belong to `lexicon` (with repetition)
pub fn token_hits(tokens: &[String], lexicon: &[&str]) -> usize {
    tokens
        .iter()
        .filter(|t| lexicon.contains(&t.as_str()))
        .count()
}
