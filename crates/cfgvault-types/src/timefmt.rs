//! Self-describing timestamp patterns.
//!
//! Every record stores the pattern its `modified` value was rendered with
//! (`modifiedFormat`), so readers never guess. Patterns use the date-pattern
//! letters found in existing stores (`yyyy-MM-dd HH:mm:ss.SSS`) and are
//! translated to `chrono` strftime items. A pattern that already contains `%`
//! is taken as strftime verbatim.
//!
//! Supported letters:
//!
//! | letters        | meaning                     | strftime |
//! |----------------|-----------------------------|----------|
//! | `yyyy` / `yy`  | year                        | `%Y` / `%y` |
//! | `MM` / `MMM` / `MMMM` | month number / abbr / name | `%m` / `%b` / `%B` |
//! | `dd`           | day of month                | `%d`     |
//! | `HH`           | hour (0-23)                 | `%H`     |
//! | `hh` + `a`     | hour (1-12) + AM/PM         | `%I` `%p`|
//! | `mm`           | minute                      | `%M`     |
//! | `ss`           | second                      | `%S`     |
//! | `SSS` / `SSSSSS` / `SSSSSSSSS` | fraction     | `%3f` / `%6f` / `%9f` |
//! | `EEE` / `EEEE` | weekday abbr / name         | `%a` / `%A` |
//!
//! Text between single quotes is literal; `''` is a literal quote.
//!
//! Zone letters (`z`, `Z`, `X`) are rejected: timestamps here carry no
//! offset, so there is nothing to render for them. Fraction runs other than
//! three, six or nine `S` are rejected as well.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Result, TypeError};

/// Pattern written into `modifiedFormat` by default.
pub const DEFAULT_MODIFIED_FORMAT: &str = "yyyy-MM-dd HH:mm:ss.SSS";

/// Pattern of the millisecond-resolution base of a version id.
pub const VERSION_ID_FORMAT: &str = "yyyyMMddHHmmssSSS";

/// A validated timestamp pattern together with its strftime translation.
#[derive(Clone, PartialEq, Eq)]
pub struct TimestampFormat {
    pattern: String,
    strftime: String,
}

impl TimestampFormat {
    /// Translate `pattern`, failing on letters that have no strftime
    /// equivalent.
    ///
    /// Accepts the letters in the module table and nothing else. In
    /// particular zone fields (`z`, `Z`, `X`) and `S`/`SS` fractions fail
    /// with [`TypeError::InvalidFormat`]. A `%` strftime pattern must render
    /// a zoneless timestamp, so `%z` and `%Z` are rejected too.
    pub fn parse(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(TypeError::InvalidFormat {
                pattern: String::new(),
                reason: "pattern must not be empty".into(),
            });
        }
        let strftime = if pattern.contains('%') {
            pattern.to_string()
        } else {
            translate(pattern)?
        };
        check_renders(pattern, &strftime)?;
        Ok(Self {
            pattern: pattern.to_string(),
            strftime,
        })
    }

    /// The pattern as stored in `modifiedFormat`.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The equivalent strftime string.
    pub fn strftime(&self) -> &str {
        &self.strftime
    }

    /// Render a timestamp with this pattern.
    pub fn format(&self, at: &NaiveDateTime) -> String {
        at.format(&self.strftime).to_string()
    }

    /// Parse a timestamp rendered with this pattern.
    ///
    /// Date-only patterns resolve to midnight.
    pub fn parse_timestamp(&self, value: &str) -> Result<NaiveDateTime> {
        match NaiveDateTime::parse_from_str(value, &self.strftime) {
            Ok(at) => Ok(at),
            Err(full_err) => NaiveDate::parse_from_str(value, &self.strftime)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .ok_or_else(|| TypeError::InvalidTimestamp {
                    value: value.to_string(),
                    pattern: self.pattern.clone(),
                    reason: full_err.to_string(),
                }),
        }
    }
}

impl Default for TimestampFormat {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_MODIFIED_FORMAT.to_string(),
            strftime: "%Y-%m-%d %H:%M:%S.%3f".to_string(),
        }
    }
}

impl fmt::Debug for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimestampFormat({:?} => {:?})", self.pattern, self.strftime)
    }
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn translate(pattern: &str) -> Result<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if ch == '\'' {
            // Quoted literal; `''` is an escaped quote.
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            let mut j = i + 1;
            loop {
                match chars.get(j) {
                    None => {
                        return Err(unsupported(pattern, "unterminated quoted literal"));
                    }
                    Some('\'') if chars.get(j + 1) == Some(&'\'') => {
                        out.push('\'');
                        j += 2;
                    }
                    Some('\'') => break,
                    Some(&c) => {
                        push_literal(&mut out, c);
                        j += 1;
                    }
                }
            }
            i = j + 1;
            continue;
        }

        if !ch.is_ascii_alphabetic() {
            push_literal(&mut out, ch);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&c| c == ch).count();
        let item = match (ch, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1 | 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1 | 2) => "%d",
            ('H', 1 | 2) => "%H",
            ('h', 1 | 2) => "%I",
            ('m', 1 | 2) => "%M",
            ('s', 1 | 2) => "%S",
            ('S', 3) => "%3f",
            ('S', 6) => "%6f",
            ('S', 9) => "%9f",
            ('a', 1) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            _ => {
                let letters: String = std::iter::repeat(ch).take(run).collect();
                return Err(unsupported(pattern, &format!("unsupported field {letters:?}")));
            }
        };
        out.push_str(item);
        i += run;
    }

    Ok(out)
}

/// Render a fixed sample so items that need an offset, or malformed `%`
/// specifiers, fail here rather than when a record is written.
fn check_renders(pattern: &str, strftime: &str) -> Result<()> {
    use std::fmt::Write as _;

    let sample = NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| unsupported(pattern, "sample date out of range"))?;
    let mut out = String::new();
    write!(out, "{}", sample.format(strftime))
        .map_err(|_| unsupported(pattern, "pattern cannot render a zoneless timestamp"))
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

fn unsupported(pattern: &str, reason: &str) -> TypeError {
    TypeError::InvalidFormat {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    #[test]
    fn default_pattern_translates() {
        let fmt = TimestampFormat::parse(DEFAULT_MODIFIED_FORMAT).unwrap();
        assert_eq!(fmt.strftime(), "%Y-%m-%d %H:%M:%S.%3f");
        assert_eq!(fmt, TimestampFormat::default());
    }

    #[test]
    fn default_pattern_round_trips() {
        let fmt = TimestampFormat::default();
        let ts = at("2017-05-01 01:09:59.250");
        let rendered = fmt.format(&ts);
        assert_eq!(rendered, "2017-05-01 01:09:59.250");
        assert_eq!(fmt.parse_timestamp(&rendered).unwrap(), ts);
    }

    #[test]
    fn version_id_pattern_renders_compact_digits() {
        let fmt = TimestampFormat::parse(VERSION_ID_FORMAT).unwrap();
        assert_eq!(fmt.format(&at("2017-05-01 01:00:00.007")), "20170501010000007");
    }

    #[test]
    fn quoted_literals() {
        let fmt = TimestampFormat::parse("yyyy-MM-dd'T'HH:mm:ss").unwrap();
        assert_eq!(fmt.strftime(), "%Y-%m-%dT%H:%M:%S");
        assert_eq!(
            fmt.parse_timestamp("2017-05-01T01:10:00").unwrap(),
            at("2017-05-01 01:10:00.000")
        );

        let escaped = TimestampFormat::parse("HH 'o''clock'").unwrap();
        assert_eq!(escaped.strftime(), "%H o'clock");
    }

    #[test]
    fn strftime_patterns_pass_through() {
        let fmt = TimestampFormat::parse("%Y/%m/%d %H:%M").unwrap();
        assert_eq!(
            fmt.parse_timestamp("2017/05/01 01:30").unwrap(),
            at("2017-05-01 01:30:00.000")
        );
    }

    #[test]
    fn date_only_pattern_is_midnight() {
        let fmt = TimestampFormat::parse("yyyy-MM-dd").unwrap();
        assert_eq!(
            fmt.parse_timestamp("2017-05-01").unwrap(),
            at("2017-05-01 00:00:00.000")
        );
    }

    #[test]
    fn percent_is_escaped_in_literals() {
        assert_eq!(translate("yyyy'%'").unwrap(), "%Y%%");
        assert_eq!(translate("yyyy 100").unwrap(), "%Y 100");
    }

    #[test]
    fn rejects_unknown_letters() {
        let err = TimestampFormat::parse("yyyy-MM-dd Q").unwrap_err();
        assert!(matches!(err, TypeError::InvalidFormat { .. }));
        assert!(TimestampFormat::parse("").is_err());
        assert!(TimestampFormat::parse("yyyy 'open").is_err());
    }

    #[test]
    fn rejects_zone_and_short_fraction_letters() {
        for pattern in [
            "yyyy-MM-dd HH:mm:ssZ",
            "yyyy-MM-dd'T'HH:mm:ssXXX",
            "yyyy-MM-dd HH:mm:ss z",
            "HH:mm:ss.S",
            "HH:mm:ss.SS",
        ] {
            let err = TimestampFormat::parse(pattern).unwrap_err();
            assert!(
                matches!(err, TypeError::InvalidFormat { ref reason, .. } if reason.contains("unsupported field")),
                "{pattern}: {err}"
            );
        }
    }

    #[test]
    fn rejects_strftime_that_cannot_render() {
        for pattern in ["%Y-%m-%d %H:%M:%S%z", "%Y %Z", "%Y %Q"] {
            let err = TimestampFormat::parse(pattern).unwrap_err();
            assert!(matches!(err, TypeError::InvalidFormat { .. }), "{pattern}");
        }
        assert!(TimestampFormat::parse("%Y-%m-%d %H:%M:%S%.3f").is_ok());
    }

    #[test]
    fn mismatched_value_fails() {
        let fmt = TimestampFormat::default();
        let err = fmt.parse_timestamp("2017-05-01T01:00:00").unwrap_err();
        assert!(matches!(err, TypeError::InvalidTimestamp { .. }));
        assert!(fmt.parse_timestamp("garbage").is_err());
    }
}
