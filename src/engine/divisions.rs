//! `roundup_power2_divisions` table builder.
//!
//! The table has one division count per power-of-two size interval, from
//! 1 MiB up to 64 GiB. Two value syntaxes are accepted:
//!
//! ```text
//! roundup_power2_divisions:4                     every bucket = 4 (legacy)
//! roundup_power2_divisions:[256:1,512:2,>:8]     per-interval entries
//! ```
//!
//! In the list form, interval keys are sizes in MB. The first explicit entry
//! also back-fills every bucket below it; `>` fills every bucket above the most
//! recent explicit entry. Entries apply in order, so later ones overwrite:
//!
//! ```text
//! [256:1,512:2,>:8]
//!  bucket:  0 .. 7 | 8 | 9 | 10 .. 15
//!  value :  1 .. 1 | 1 | 2 |  8 .. 8
//! ```

use super::keys::OptionKey;
use super::options::{consume_token, option_value, parse_usize};
use crate::error::ConfigError;
use crate::settings::{MB, ROUNDUP_POWER2_INTERVALS, Settings, bucket_index};
use tracing::trace;

const OPTION: &str = "roundup_power2_divisions";

/// Applies list entries to a divisions table in order.
struct DivisionsBuilder<'s> {
    table: &'s mut [usize; ROUNDUP_POWER2_INTERVALS],
    last_index: usize,
    seen_interval: bool,
}

impl<'s> DivisionsBuilder<'s> {
    fn new(table: &'s mut [usize; ROUNDUP_POWER2_INTERVALS]) -> Self {
        Self { table, last_index: 0, seen_interval: false }
    }

    /// `K:V` entry. The first one also fills every bucket below `K`.
    fn set_interval(&mut self, interval_mb: usize, divisions: usize) {
        let index = interval_index(interval_mb);
        if !self.seen_interval {
            self.table[..index].fill(divisions);
            self.seen_interval = true;
        }
        self.table[index] = divisions;
        self.last_index = index;
        trace!(interval_mb, index, divisions, "roundup interval");
    }

    /// `>:V` entry: fill every bucket above the last explicit one.
    fn fill_above(&mut self, divisions: usize) {
        let from = (self.last_index + 1).min(ROUNDUP_POWER2_INTERVALS);
        self.table[from..].fill(divisions);
        trace!(from, divisions, "roundup suffix fill");
    }
}

/// Bucket for an interval key given in MB.
fn interval_index(interval_mb: usize) -> usize {
    bucket_index(interval_mb.ilog2() as usize + MB.ilog2() as usize)
}

fn check_division(value: usize) -> Result<usize, ConfigError> {
    if value == 0 || value.is_power_of_two() { Ok(value) } else { Err(ConfigError::InvalidDivision { value }) }
}

/// Parse `roundup_power2_divisions:<value>`; returns the index of the last token consumed.
pub(crate) fn parse_roundup_power2_divisions(
    settings: &mut Settings,
    tokens: &[String],
    i: usize,
) -> Result<usize, ConfigError> {
    let (mut i, value) = option_value(tokens, i, OptionKey::RoundupPower2Divisions)?;

    if value != "[" {
        let divisions = parse_usize(OPTION, value)?;
        if !divisions.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo { what: "roundup_power2_divisions", value: divisions });
        }
        settings.roundup_power2_divisions.fill(divisions);
        return Ok(i);
    }

    let mut builder = DivisionsBuilder::new(&mut settings.roundup_power2_divisions);
    loop {
        i += 1;
        let interval = tokens.get(i).ok_or(ConfigError::ExpectedToken { expected: ']' })?;
        if interval == "]" {
            return Ok(i);
        }

        consume_token(tokens, i + 1, ':')?;
        i += 2;
        let value = tokens.get(i).ok_or(ConfigError::MissingValue { option: OPTION })?;
        let divisions = check_division(parse_usize(OPTION, value)?)?;

        if interval == ">" {
            builder.fill_above(divisions);
        } else {
            let interval_mb = parse_usize(OPTION, interval)?;
            if !interval_mb.is_power_of_two() {
                return Err(ConfigError::NotPowerOfTwo { what: "roundup_power2_divisions interval", value: interval_mb });
            }
            builder.set_interval(interval_mb, divisions);
        }

        match tokens.get(i + 1).map(String::as_str) {
            Some("]") => return Ok(i + 1),
            Some(_) => {
                consume_token(tokens, i + 1, ',')?;
                i += 1;
            }
            None => return Err(ConfigError::ExpectedToken { expected: ']' }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::lexer::lex;

    fn table(input: &str) -> Result<[usize; ROUNDUP_POWER2_INTERVALS], ConfigError> {
        let tokens = lex(input);
        let mut settings = Settings::default();
        let last = parse_roundup_power2_divisions(&mut settings, &tokens, 0)?;
        assert_eq!(last, tokens.len() - 1, "list should be fully consumed");
        Ok(settings.roundup_power2_divisions)
    }

    #[test]
    fn scalar_fills_every_bucket() {
        assert_eq!(table("roundup_power2_divisions:128").unwrap(), [128; 16]);
    }

    #[test]
    fn scalar_must_be_power_of_two() {
        assert!(matches!(table("roundup_power2_divisions:3"), Err(ConfigError::NotPowerOfTwo { value: 3, .. })));
        assert!(matches!(table("roundup_power2_divisions:0"), Err(ConfigError::NotPowerOfTwo { value: 0, .. })));
    }

    #[test]
    fn first_interval_back_fills_and_suffix_fills_after_last() {
        let t = table("roundup_power2_divisions:[256:8,512:16,>:32]").unwrap();
        assert_eq!(&t[..9], &[8; 9]);
        assert_eq!(t[9], 16);
        assert_eq!(&t[10..], &[32; 6]);
    }

    #[test]
    fn later_entries_override_earlier_fills() {
        let t = table("roundup_power2_divisions:[>:4,1:2,2:0]").unwrap();
        // `>` with no explicit entry yet fills 1..=15, then 1 MB sets bucket 0.
        assert_eq!(t[0], 2);
        assert_eq!(t[1], 0);
        assert_eq!(&t[2..], &[4; 14]);
    }

    #[test]
    fn intervals_clamp_to_the_last_bucket() {
        let t = table("roundup_power2_divisions:[1048576:4]").unwrap();
        assert_eq!(&t[..], &[4; 16]);
        let t = table("roundup_power2_divisions:[32768:4,>:8]").unwrap();
        assert_eq!(&t[..], &[4; 16]);
    }

    #[test]
    fn zero_division_disables_a_bucket() {
        let t = table("roundup_power2_divisions:[64:0,>:1]").unwrap();
        assert_eq!(&t[..7], &[0; 7]);
        assert_eq!(&t[7..], &[1; 9]);
    }

    #[test]
    fn empty_and_trailing_comma_lists() {
        assert_eq!(table("roundup_power2_divisions:[]").unwrap(), [0; 16]);
        assert_eq!(table("roundup_power2_divisions:[2:4,]").unwrap()[1], 4);
    }

    #[test]
    fn malformed_lists_fail() {
        assert_eq!(table("roundup_power2_divisions:[256 8]"), Err(ConfigError::ExpectedToken { expected: ':' }));
        assert_eq!(table("roundup_power2_divisions:[256:8"), Err(ConfigError::ExpectedToken { expected: ']' }));
        // Spaces are elided, so the two entries collapse into one bogus division.
        assert_eq!(table("roundup_power2_divisions:[256:8 512:4]"), Err(ConfigError::InvalidDivision { value: 8512 }));
        assert_eq!(table("roundup_power2_divisions:[256:8:4]"), Err(ConfigError::ExpectedToken { expected: ',' }));
        assert_eq!(table("roundup_power2_divisions:[256:]"), Err(ConfigError::InvalidNumber {
            option: OPTION,
            value: "]".to_string()
        }));
        assert_eq!(table("roundup_power2_divisions:[256:"), Err(ConfigError::MissingValue { option: OPTION }));
    }

    #[test]
    fn interval_and_division_validation() {
        assert!(matches!(table("roundup_power2_divisions:[300:8]"), Err(ConfigError::NotPowerOfTwo { value: 300, .. })));
        assert!(matches!(table("roundup_power2_divisions:[0:8]"), Err(ConfigError::NotPowerOfTwo { value: 0, .. })));
        assert_eq!(table("roundup_power2_divisions:[256:6]"), Err(ConfigError::InvalidDivision { value: 6 }));
    }
}
