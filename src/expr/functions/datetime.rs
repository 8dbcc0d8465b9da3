/// Date/time functions over `jiff`: `$now`, `$millis`, `$fromMillis`,
/// `$toMillis`, and the XPath-style date/time picture subset they share.
///
/// Supported picture components: `[Y]` year, `[M]` month, `[D]` day,
/// `[F]` weekday, `[H]` 24-hour, `[h]` 12-hour, `[m]` minute, `[s]`
/// second, `[f]` fractional seconds, `[P]` am/pm, `[Z]`/`[z]` timezone.
/// Digit presentations (`01`, `0001`) pad to their width, `N`/`Nn`/`n`
/// select upper/title/lower names, and a trailing `o` formats ordinals.
/// Timezone arguments are fixed `±HHMM` offsets. `$toMillis` parses
/// strictly against its picture and rejects mismatched input.
use jiff::Timestamp;
use jiff::Zoned;
use jiff::civil;
use jiff::tz::{Offset, TimeZone};

use crate::error::EvalError;
use crate::value::Value;

use super::arg_error;

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// `$now()` — ISO-8601 UTC with millisecond precision.
pub(super) fn now(_args: &[Value]) -> Result<Value, EvalError> {
    let zdt = Timestamp::now().to_zoned(TimeZone::UTC);
    Ok(Value::String(iso_format(&zdt)))
}

/// `$millis()` — Unix epoch milliseconds.
pub(super) fn millis(_args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(Timestamp::now().as_millisecond() as f64))
}

/// `$fromMillis(ms, picture?, tz?)`.
pub(super) fn from_millis(args: &[Value]) -> Result<Value, EvalError> {
    let Some(Value::Number(ms)) = args.first() else {
        return Err(arg_error("fromMillis", 1));
    };
    let offset = match args.get(2) {
        Some(Value::String(tz)) => parse_tz_offset(tz).ok_or_else(|| arg_error("fromMillis", 3))?,
        Some(Value::Undefined) | None => Offset::UTC,
        Some(_) => return Err(arg_error("fromMillis", 3)),
    };
    let ts = Timestamp::from_millisecond(ms.round_ties_even() as i64)
        .map_err(|_| arg_error("fromMillis", 1))?;
    let zdt = ts.to_zoned(TimeZone::fixed(offset));
    match args.get(1) {
        Some(Value::String(picture)) => {
            let parts = parse_picture(picture, "fromMillis")?;
            Ok(Value::String(format_picture(&zdt, &parts)?))
        }
        Some(Value::Undefined) | None => Ok(Value::String(iso_format(&zdt))),
        Some(_) => Err(arg_error("fromMillis", 2)),
    }
}

/// `$toMillis(timestamp, picture?, tz?)` — ISO-8601 without a picture.
pub(super) fn to_millis(args: &[Value]) -> Result<Value, EvalError> {
    let Some(Value::String(text)) = args.first() else {
        return Err(arg_error("toMillis", 1));
    };
    let default_offset = match args.get(2) {
        Some(Value::String(tz)) => parse_tz_offset(tz).ok_or_else(|| arg_error("toMillis", 3))?,
        Some(Value::Undefined) | None => Offset::UTC,
        Some(_) => return Err(arg_error("toMillis", 3)),
    };
    match args.get(1) {
        Some(Value::String(picture)) => {
            let parts = parse_picture(picture, "toMillis")?;
            parse_with_picture(text, &parts, default_offset)
                .map(|ms| Value::Number(ms as f64))
                .ok_or_else(|| arg_error("toMillis", 1))
        }
        Some(Value::Undefined) | None => parse_iso(text, default_offset)
            .map(|ms| Value::Number(ms as f64))
            .ok_or_else(|| arg_error("toMillis", 1)),
        Some(_) => Err(arg_error("toMillis", 2)),
    }
}

fn parse_iso(text: &str, default_offset: Offset) -> Option<i64> {
    if let Ok(ts) = text.parse::<Timestamp>() {
        return Some(ts.as_millisecond());
    }
    if let Ok(dt) = text.parse::<civil::DateTime>() {
        return dt
            .to_zoned(TimeZone::fixed(default_offset))
            .ok()
            .map(|z| z.timestamp().as_millisecond());
    }
    if let Ok(date) = text.parse::<civil::Date>() {
        return date
            .to_zoned(TimeZone::fixed(default_offset))
            .ok()
            .map(|z| z.timestamp().as_millisecond());
    }
    None
}

/// `±HHMM` or `±HH:MM`.
fn parse_tz_offset(text: &str) -> Option<Offset> {
    let (sign, rest) = match text.strip_prefix('+') {
        Some(rest) => (1i32, rest),
        None => (-1i32, text.strip_prefix('-')?),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    Offset::from_seconds(sign * (hours * 3600 + minutes * 60)).ok()
}

fn iso_format(zdt: &Zoned) -> String {
    let seconds = zdt.offset().seconds();
    let suffix = if seconds == 0 {
        "Z".to_string()
    } else {
        format_offset(seconds, true)
    };
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}{}",
        zdt.year(),
        zdt.month(),
        zdt.day(),
        zdt.hour(),
        zdt.minute(),
        zdt.second(),
        zdt.millisecond(),
        suffix
    )
}

fn format_offset(seconds: i32, colon: bool) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let abs = seconds.abs();
    let (h, m) = (abs / 3600, (abs % 3600) / 60);
    if colon {
        format!("{sign}{h:02}:{m:02}")
    } else {
        format!("{sign}{h:02}{m:02}")
    }
}

enum PicturePart {
    Literal(String),
    Token { component: char, presentation: String },
}

fn parse_picture(picture: &str, func: &str) -> Result<Vec<PicturePart>, EvalError> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = picture.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '[' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    literal.push('[');
                    continue;
                }
                if !literal.is_empty() {
                    parts.push(PicturePart::Literal(std::mem::take(&mut literal)));
                }
                let mut token = String::new();
                let mut closed = false;
                for t in chars.by_ref() {
                    if t == ']' {
                        closed = true;
                        break;
                    }
                    if !t.is_whitespace() {
                        token.push(t);
                    }
                }
                if !closed || token.is_empty() {
                    return Err(arg_error(func, 2));
                }
                let mut token_chars = token.chars();
                let component = token_chars.next().expect("token is non-empty");
                parts.push(PicturePart::Token {
                    component,
                    presentation: token_chars.collect(),
                });
            }
            ']' => {
                if chars.peek() == Some(&']') {
                    chars.next();
                }
                literal.push(']');
            }
            c => literal.push(c),
        }
    }
    if !literal.is_empty() {
        parts.push(PicturePart::Literal(literal));
    }
    Ok(parts)
}

/// Width from a digit presentation like `01` or `0001`; None when the
/// presentation is not digits.
fn digit_width(presentation: &str) -> Option<usize> {
    let trimmed = presentation.trim_end_matches('o');
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        Some(trimmed.len())
    } else {
        None
    }
}

fn ordinal_suffix(n: i64) -> &'static str {
    match (n % 10, n % 100) {
        (1, 11) | (2, 12) | (3, 13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

fn format_int(value: i64, presentation: &str, default_width: usize) -> String {
    let width = digit_width(presentation).unwrap_or(default_width);
    let mut out = format!("{value:0width$}");
    if presentation.ends_with('o') {
        out.push_str(ordinal_suffix(value));
    }
    out
}

fn format_name(name: &str, presentation: &str) -> String {
    match presentation {
        "N" => name.to_uppercase(),
        "n" => name.to_lowercase(),
        _ => name.to_string(),
    }
}

fn weekday_index(zdt: &Zoned) -> usize {
    zdt.weekday().to_monday_one_offset() as usize - 1
}

fn format_picture(zdt: &Zoned, parts: &[PicturePart]) -> Result<String, EvalError> {
    let mut out = String::new();
    for part in parts {
        match part {
            PicturePart::Literal(text) => out.push_str(text),
            PicturePart::Token {
                component,
                presentation,
            } => match component {
                'Y' => out.push_str(&format_int(zdt.year() as i64, presentation, 1)),
                'M' => {
                    if presentation.starts_with(['N', 'n']) {
                        out.push_str(&format_name(
                            MONTHS[zdt.month() as usize - 1],
                            presentation,
                        ));
                    } else {
                        out.push_str(&format_int(zdt.month() as i64, presentation, 1));
                    }
                }
                'D' => out.push_str(&format_int(zdt.day() as i64, presentation, 1)),
                'F' => {
                    if presentation.starts_with(['N', 'n']) || presentation.is_empty() {
                        out.push_str(&format_name(WEEKDAYS[weekday_index(zdt)], presentation));
                    } else {
                        out.push_str(&format_int(
                            weekday_index(zdt) as i64 + 1,
                            presentation,
                            1,
                        ));
                    }
                }
                'H' => out.push_str(&format_int(zdt.hour() as i64, presentation, 1)),
                'h' => {
                    let h12 = match zdt.hour() % 12 {
                        0 => 12,
                        h => h,
                    };
                    out.push_str(&format_int(h12 as i64, presentation, 1));
                }
                'm' => out.push_str(&format_int(zdt.minute() as i64, presentation, 2)),
                's' => out.push_str(&format_int(zdt.second() as i64, presentation, 2)),
                'f' => {
                    let width = digit_width(presentation).unwrap_or(3);
                    let millis = format!("{:03}", zdt.millisecond());
                    let digits: String = millis.chars().chain(std::iter::repeat('0')).take(width).collect();
                    out.push_str(&digits);
                }
                'P' => {
                    let marker = if zdt.hour() < 12 { "am" } else { "pm" };
                    out.push_str(&match presentation.as_str() {
                        "N" => marker.to_uppercase(),
                        "Nn" => {
                            let mut c = marker.chars();
                            c.next()
                                .map(|f| f.to_uppercase().collect::<String>() + c.as_str())
                                .unwrap_or_default()
                        }
                        _ => marker.to_string(),
                    });
                }
                'Z' => {
                    let colon = presentation != "0000";
                    out.push_str(&format_offset(zdt.offset().seconds(), colon));
                }
                'z' => {
                    out.push_str("GMT");
                    out.push_str(&format_offset(zdt.offset().seconds(), true));
                }
                _ => return Err(arg_error("fromMillis", 2)),
            },
        }
    }
    Ok(out)
}

/// Build a regex for the picture, match the input, and assemble the
/// timestamp. Returns None on any mismatch.
fn parse_with_picture(
    text: &str,
    parts: &[PicturePart],
    default_offset: Offset,
) -> Option<i64> {
    let mut pattern = String::from("^");
    let mut components: Vec<char> = Vec::new();
    for part in parts {
        match part {
            PicturePart::Literal(lit) => pattern.push_str(&regex::escape(lit)),
            PicturePart::Token {
                component,
                presentation,
            } => {
                components.push(*component);
                let group = match component {
                    'Y' => match digit_width(presentation) {
                        Some(w) => format!("(\\d{{{w}}})"),
                        None => "(\\d{1,4})".to_string(),
                    },
                    'M' | 'F' if presentation.starts_with(['N', 'n']) => {
                        "([A-Za-z]+)".to_string()
                    }
                    'M' | 'D' | 'H' | 'h' | 'm' | 's' => match digit_width(presentation) {
                        Some(w) => format!("(\\d{{{w}}})"),
                        None => "(\\d{1,2})".to_string(),
                    },
                    'F' => "(\\d)".to_string(),
                    'f' => {
                        let w = digit_width(presentation).unwrap_or(3);
                        format!("(\\d{{{w}}})")
                    }
                    'P' => "([AaPp][Mm])".to_string(),
                    'Z' => "([+-]\\d{2}:?\\d{2}|Z)".to_string(),
                    'z' => "(GMT[+-]\\d{2}:\\d{2})".to_string(),
                    _ => return None,
                };
                if presentation.ends_with('o') {
                    pattern.push_str(&group.replace(')', ")(?:st|nd|rd|th)"));
                } else {
                    pattern.push_str(&group);
                }
            }
        }
    }
    pattern.push('$');
    let re = regex::Regex::new(&pattern).ok()?;
    let caps = re.captures(text)?;

    let mut year: i16 = 1970;
    let mut month: i8 = 1;
    let mut day: i8 = 1;
    let mut hour: i8 = 0;
    let mut minute: i8 = 0;
    let mut second: i8 = 0;
    let mut millisecond: i64 = 0;
    let mut pm: Option<bool> = None;
    let mut offset = default_offset;

    for (i, component) in components.iter().enumerate() {
        let capture = caps.get(i + 1)?.as_str();
        match component {
            'Y' => year = capture.parse().ok()?,
            'M' => {
                month = if capture.chars().all(|c| c.is_ascii_digit()) {
                    capture.parse().ok()?
                } else {
                    (month_from_name(capture)? + 1) as i8
                }
            }
            'D' => day = capture.parse().ok()?,
            'F' => {} // Weekday is informational; the date fields decide.
            'H' | 'h' => hour = capture.parse().ok()?,
            'm' => minute = capture.parse().ok()?,
            's' => second = capture.parse().ok()?,
            'f' => {
                let scaled = format!("{capture:0<3}");
                millisecond = scaled[..3].parse().ok()?;
            }
            'P' => pm = Some(capture.to_ascii_lowercase().starts_with('p')),
            'Z' => {
                offset = if capture == "Z" {
                    Offset::UTC
                } else {
                    parse_tz_offset(capture)?
                }
            }
            'z' => offset = parse_tz_offset(capture.strip_prefix("GMT")?)?,
            _ => return None,
        }
    }

    if let Some(pm) = pm {
        if pm && hour < 12 {
            hour += 12;
        } else if !pm && hour == 12 {
            hour = 0;
        }
    }

    let dt = civil::DateTime::new(
        year,
        month,
        day,
        hour,
        minute,
        second,
        (millisecond * 1_000_000) as i32,
    )
    .ok()?;
    let zoned = dt.to_zoned(TimeZone::fixed(offset)).ok()?;
    Some(zoned.timestamp().as_millisecond())
}

fn month_from_name(name: &str) -> Option<usize> {
    let lower = name.to_lowercase();
    MONTHS
        .iter()
        .position(|m| m.to_lowercase() == lower || lower == m[..3].to_lowercase())
}
