use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE: Regex = Regex::new(r"[a-z0-9_]+").expect("valid regex");
}

/// Tokenize text into lowercase word tokens: maximal `[a-z0-9_]+` runs in
/// order of appearance. No stemming, no stopword removal.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    RE.find_iter(&lowered).map(|m| m.as_str().to_string()).collect()
}
