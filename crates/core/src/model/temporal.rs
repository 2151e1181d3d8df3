//! ISO 8601 parsing and rendering for date and datetime scalars.

use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Parse `YYYY-MM-DD`, allowing surrounding whitespace.
pub fn parse_date(s: &str) -> Option<Date> {
    let s = s.trim();
    if s.len() != 10 {
        return None;
    }
    calendar_date(s)
}

/// Parse `YYYY-MM-DD[Thh:mm:ss[.fraction](Z|+hh[[:]mm])]` and normalize to UTC.
///
/// A bare date is midnight UTC. Fractions beyond microseconds are truncated.
pub fn parse_datetime(s: &str) -> Option<OffsetDateTime> {
    let s = s.trim();
    if !s.is_ascii() || s.len() < 10 {
        return None;
    }
    let date = calendar_date(&s[..10])?;
    let rest = &s[10..];
    if rest.is_empty() {
        return Some(PrimitiveDateTime::new(date, Time::MIDNIGHT).assume_utc());
    }

    let rest = rest.strip_prefix('T')?;
    let clock = Time::parse(
        rest.get(..8)?,
        format_description!("[hour]:[minute]:[second]"),
    )
    .ok()?;
    let mut rest = &rest[8..];

    let mut micro = 0u32;
    if rest.starts_with('.') || rest.starts_with(',') {
        let frac: String = rest[1..].chars().take_while(char::is_ascii_digit).collect();
        if frac.is_empty() || frac.len() > 7 {
            return None;
        }
        let padded = format!("{:0<6}", &frac[..frac.len().min(6)]);
        micro = padded.parse().ok()?;
        rest = &rest[1 + frac.len()..];
    }

    let offset = if rest == "Z" {
        UtcOffset::UTC
    } else {
        let sign: i8 = match rest.as_bytes().first()? {
            b'+' => 1,
            b'-' => -1,
            _ => return None,
        };
        let body = &rest[1..];
        let off_hour = digits(body, 0, 2)? as i8;
        let off_minute = match body.len() {
            2 => 0,
            4 => digits(body, 2, 2)? as i8,
            5 => {
                expect_byte(body, 2, b':')?;
                digits(body, 3, 2)? as i8
            }
            _ => return None,
        };
        UtcOffset::from_hms(sign * off_hour, sign * off_minute, 0).ok()?
    };

    let time = clock.replace_microsecond(micro).ok()?;
    Some(
        PrimitiveDateTime::new(date, time)
            .assume_offset(offset)
            .to_offset(UtcOffset::UTC),
    )
}

pub fn format_date(d: Date) -> String {
    format!("{:04}-{:02}-{:02}", d.year(), d.month() as u8, d.day())
}

/// Render as `YYYY-MM-DDThh:mm:ss[.ffffff]+hh:mm`.
pub fn format_datetime(dt: OffsetDateTime) -> String {
    let mut out = format!(
        "{}T{:02}:{:02}:{:02}",
        format_date(dt.date()),
        dt.hour(),
        dt.minute(),
        dt.second()
    );
    if dt.microsecond() != 0 {
        out.push_str(&format!(".{:06}", dt.microsecond()));
    }
    let offset = dt.offset();
    let total = offset.whole_minutes();
    let sign = if total < 0 { '-' } else { '+' };
    let total = total.abs();
    out.push_str(&format!("{}{:02}:{:02}", sign, total / 60, total % 60));
    out
}

fn calendar_date(s: &str) -> Option<Date> {
    if !s.bytes().next()?.is_ascii_digit() {
        return None;
    }
    Date::parse(s, format_description!("[year]-[month]-[day]")).ok()
}

fn digits(s: &str, start: usize, len: usize) -> Option<u32> {
    let part = s.get(start..start + len)?;
    if !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn expect_byte(s: &str, at: usize, byte: u8) -> Option<()> {
    (s.as_bytes().get(at) == Some(&byte)).then_some(())
}
