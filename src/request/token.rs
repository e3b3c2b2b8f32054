//! Correlation token sources
//!
//! Tokens only help a human pair up lines in interleaved output. They are not
//! guaranteed unique and nothing relies on them being so.

use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default token length
pub const TOKEN_LENGTH: usize = 6;

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";
const SYMBOLS: &str = "~`!@#$%^&*()_+-={}[]:\";'<>?,./|\\";

/// Produces one correlation token per request
pub trait TokenSource: Send + Sync {
    fn next_token(&self) -> String;
}

/// Character classes a token is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Charset {
    pub lower: bool,
    pub upper: bool,
    pub digits: bool,
    pub symbols: bool,
}

impl Charset {
    pub const ALPHANUMERIC: Charset = Charset {
        lower: true,
        upper: true,
        digits: true,
        symbols: false,
    };

    /// Parse class flags: `a` lower, `A` upper, `#` digits, `!` symbols
    pub fn parse(flags: &str) -> Self {
        Self {
            lower: flags.contains('a'),
            upper: flags.contains('A'),
            digits: flags.contains('#'),
            symbols: flags.contains('!'),
        }
    }

    /// Concatenated alphabet of the selected classes
    pub fn alphabet(&self) -> Vec<char> {
        let mut alphabet = String::new();
        if self.lower {
            alphabet.push_str(LOWER);
        }
        if self.upper {
            alphabet.push_str(UPPER);
        }
        if self.digits {
            alphabet.push_str(DIGITS);
        }
        if self.symbols {
            alphabet.push_str(SYMBOLS);
        }
        alphabet.chars().collect()
    }
}

/// Uniform random tokens over a charset's alphabet
#[derive(Debug, Clone)]
pub struct RandomTokenSource {
    length: usize,
    alphabet: Vec<char>,
}

impl RandomTokenSource {
    /// An empty charset falls back to alphanumerics
    pub fn new(length: usize, charset: Charset) -> Self {
        let mut alphabet = charset.alphabet();
        if alphabet.is_empty() {
            alphabet = Charset::ALPHANUMERIC.alphabet();
        }
        Self { length, alphabet }
    }
}

impl Default for RandomTokenSource {
    fn default() -> Self {
        Self::new(TOKEN_LENGTH, Charset::ALPHANUMERIC)
    }
}

impl TokenSource for RandomTokenSource {
    fn next_token(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.length)
            .map(|_| self.alphabet[rng.gen_range(0..self.alphabet.len())])
            .collect()
    }
}

/// Hands out a fixed list of tokens in order, cycling when exhausted
#[derive(Debug)]
pub struct FixedTokenSource {
    tokens: Vec<String>,
    next: AtomicUsize,
}

impl FixedTokenSource {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            next: AtomicUsize::new(0),
        }
    }
}

impl TokenSource for FixedTokenSource {
    fn next_token(&self) -> String {
        if self.tokens.is_empty() {
            return String::new();
        }
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        self.tokens[i % self.tokens.len()].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_tokens_are_alphanumeric() {
        let source = RandomTokenSource::default();
        for _ in 0..200 {
            let token = source.next_token();
            assert_eq!(token.len(), TOKEN_LENGTH);
            assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_random_tokens_rarely_collide() {
        let source = RandomTokenSource::default();
        let tokens: HashSet<String> = (0..1000).map(|_| source.next_token()).collect();
        // 62^6 possibilities; a handful of collisions would already be suspicious
        assert!(tokens.len() > 990);
    }

    #[test]
    fn test_charset_parse() {
        assert_eq!(Charset::parse("Aa#"), Charset::ALPHANUMERIC);
        assert_eq!(Charset::parse("#").alphabet().len(), 10);
        assert_eq!(Charset::parse("aA").alphabet().len(), 52);
        assert!(Charset::parse("").alphabet().is_empty());
    }

    #[test]
    fn test_digits_only_and_empty_fallback() {
        let digits = RandomTokenSource::new(8, Charset::parse("#"));
        let token = digits.next_token();
        assert_eq!(token.len(), 8);
        assert!(token.chars().all(|c| c.is_ascii_digit()));

        let fallback = RandomTokenSource::new(4, Charset::parse(""));
        assert!(fallback.next_token().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_fixed_tokens_cycle() {
        let source = FixedTokenSource::new(["one", "two"]);
        assert_eq!(source.next_token(), "one");
        assert_eq!(source.next_token(), "two");
        assert_eq!(source.next_token(), "one");
    }
}
