//! Settings-string tokenizer.
//!
//! The grammar has four single-character delimiters: `,` `:` `[` `]`. Each
//! becomes its own token; every other run of characters (spaces elided)
//! accumulates into one token. There is no quoting or escaping.
//!
//! ```text
//! "max_split_size_mb:128, roundup_power2_divisions:[256:4,>:8]"
//!  -> [max_split_size_mb] [:] [128] [,] [roundup_power2_divisions] [:]
//!     [[] [256] [:] [4] [,] [>] [:] [8] []]
//! ```

/// Characters that always form a token by themselves.
pub(crate) const DELIMITERS: [char; 4] = [',', ':', '[', ']'];

/// Split `input` into tokens in a single pass.
pub(crate) fn lex(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending = String::new();

    for ch in input.chars() {
        if DELIMITERS.contains(&ch) {
            if !pending.is_empty() {
                tokens.push(std::mem::take(&mut pending));
            }
            tokens.push(ch.to_string());
        } else if ch != ' ' {
            pending.push(ch);
        }
    }
    if !pending.is_empty() {
        tokens.push(pending);
    }

    tokens
}
