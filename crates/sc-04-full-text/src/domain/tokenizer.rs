//! # Tokenizer
//!
//! Splits a line into runs of one character class, with an extra split at
//! every lowercase-to-uppercase boundary inside a letter run
//! (`fooBarBaz` -> `foo`, `Bar`, `Baz`). Whitespace runs are dropped.
//!
//! Normalized form: lowercase, NFD with combining marks removed, then every
//! run of one repeated character collapsed to a single character.

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharClass {
    Letter,
    Digit,
    Whitespace,
    Symbol,
}

impl CharClass {
    pub fn of(c: char) -> Self {
        if c.is_alphabetic() {
            CharClass::Letter
        } else if c.is_numeric() {
            CharClass::Digit
        } else if c.is_whitespace() {
            CharClass::Whitespace
        } else {
            CharClass::Symbol
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Text as it appears in the line.
    pub text: String,
    pub normalized: String,
    pub class: CharClass,
}

/// Normalized tokens of one line, in line order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedLine {
    pub tokens: Vec<String>,
}

pub fn normalize(text: &str) -> String {
    let lowered: String = text.chars().flat_map(char::to_lowercase).collect();
    let mut out = String::with_capacity(lowered.len());
    let mut previous = None;
    for c in lowered.nfd().filter(|c| !is_combining_mark(*c)) {
        if previous != Some(c) {
            out.push(c);
            previous = Some(c);
        }
    }
    out
}

pub fn tokenize_one_line(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_class: Option<CharClass> = None;
    let mut previous_lower = false;

    for c in line.chars() {
        // Decomposed accents stay with the character they modify.
        let class = match current_class {
            Some(class) if is_combining_mark(c) => class,
            _ => CharClass::of(c),
        };

        let camel_boundary = class == CharClass::Letter && previous_lower && c.is_uppercase();
        if current_class != Some(class) || camel_boundary {
            flush(&mut tokens, &mut current, current_class);
            current_class = Some(class);
        }

        current.push(c);
        if !is_combining_mark(c) {
            previous_lower = c.is_lowercase();
        }
    }
    flush(&mut tokens, &mut current, current_class);
    tokens
}

fn flush(tokens: &mut Vec<Token>, current: &mut String, class: Option<CharClass>) {
    if current.is_empty() {
        return;
    }
    let text = std::mem::take(current);
    match class {
        Some(CharClass::Whitespace) | None => {}
        Some(class) => tokens.push(Token {
            normalized: normalize(&text),
            text,
            class,
        }),
    }
}

/// Tokenize every line, keeping only normalized text.
pub fn tokenize<S: AsRef<str>>(lines: &[S]) -> Vec<TokenizedLine> {
    lines
        .iter()
        .map(|line| TokenizedLine {
            tokens: tokenize_one_line(line.as_ref())
                .into_iter()
                .map(|token| token.normalized)
                .collect(),
        })
        .collect()
}
