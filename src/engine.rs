//! Settings grammar engine.
//!
//! Turning a settings string into `Settings` is a one-way pipeline:
//!
//! ```text
//! "max_split_size_mb:128,backend:native"
//!        │
//!        │  lex                          (lexer.rs)
//!        v
//! [max_split_size_mb] [:] [128] [,] [backend] [:] [native]
//!        │
//!        │  apply                        (driver.rs)
//!        │    - resolve key / alias      (keys.rs)
//!        │    - run option handler       (options.rs, divisions.rs)
//!        │    - require ',' between options
//!        v
//! Settings (mutated in place) + ParseReport
//! ```
//!
//! ## Responsibilities by module
//!
//! - `lexer.rs`: single-pass tokenizer for the `, : [ ]` delimiters.
//! - `keys.rs`: canonical option keys, deprecated spellings and the
//!   `OptionSet` bitflags used to track which options a pass touched.
//! - `options.rs`: scalar option handlers and shared token helpers.
//! - `divisions.rs`: the `roundup_power2_divisions` bucket table builder.
//! - `driver.rs`: the key/value walk, separator checks and warnings.
//!
//! ## Adding an option
//!
//! Add an `OptionKey` variant (name, flag, `ALL`), an `OptionSet` bit, a
//! handler returning the index of its last consumed token, and a dispatch arm
//! in `driver::apply`.
//!
//! ## Debugging
//!
//! Token and dispatch traces are emitted at `debug`/`trace` level; run with
//! `RUST_LOG=allocconf=trace` to see them.

#[path = "engine/divisions.rs"]
mod divisions;
#[path = "engine/driver.rs"]
mod driver;
#[path = "engine/keys.rs"]
mod keys;
#[path = "engine/lexer.rs"]
pub(crate) mod lexer;
#[path = "engine/options.rs"]
mod options;

pub(crate) use driver::apply;
