/// `$formatNumber` (XPath 3.1 decimal format pictures) and `$formatBase`.
use crate::error::EvalError;
use crate::value::Value;

use super::arg_error;

/// The decimal-format properties a picture is interpreted against. The
/// defaults follow XPath; an options object overrides individual
/// properties, including a custom zero digit whose family is the ten
/// consecutive code points starting at it.
struct DecimalFormat {
    decimal_sep: char,
    grouping_sep: char,
    minus: char,
    percent: char,
    per_mille: char,
    zero: char,
    digit: char,
    pattern_sep: char,
    exp_sep: char,
}

impl Default for DecimalFormat {
    fn default() -> DecimalFormat {
        DecimalFormat {
            decimal_sep: '.',
            grouping_sep: ',',
            minus: '-',
            percent: '%',
            per_mille: '\u{2030}',
            zero: '0',
            digit: '#',
            pattern_sep: ';',
            exp_sep: 'e',
        }
    }
}

impl DecimalFormat {
    fn from_options(options: Option<&Value>) -> Result<DecimalFormat, EvalError> {
        let mut df = DecimalFormat::default();
        let Some(options) = options else {
            return Ok(df);
        };
        let Value::Object(pairs) = options else {
            if options.is_undefined() {
                return Ok(df);
            }
            return Err(arg_error("formatNumber", 3));
        };
        for (key, value) in pairs {
            let Value::String(text) = value else {
                return Err(arg_error("formatNumber", 3));
            };
            let single = || {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(arg_error("formatNumber", 3)),
                }
            };
            match key.as_str() {
                "decimal-separator" => df.decimal_sep = single()?,
                "grouping-separator" => df.grouping_sep = single()?,
                "minus-sign" => df.minus = single()?,
                "percent" => df.percent = single()?,
                "per-mille" => df.per_mille = single()?,
                "zero-digit" => df.zero = single()?,
                "digit" => df.digit = single()?,
                "pattern-separator" => df.pattern_sep = single()?,
                "exponent-separator" => df.exp_sep = single()?,
                // Infinity and NaN strings are accepted but unused: the
                // evaluator never produces either value.
                "infinity" | "NaN" => {}
                _ => return Err(arg_error("formatNumber", 3)),
            }
        }
        Ok(df)
    }

    fn is_family_digit(&self, c: char) -> bool {
        let zero = self.zero as u32;
        (zero..zero + 10).contains(&(c as u32))
    }

    fn to_family(&self, ascii_digits: &str) -> String {
        ascii_digits
            .chars()
            .map(|c| {
                if c.is_ascii_digit() {
                    char::from_u32(self.zero as u32 + (c as u32 - '0' as u32)).unwrap_or(c)
                } else {
                    c
                }
            })
            .collect()
    }
}

struct SubPicture {
    prefix: String,
    suffix: String,
    min_int: usize,
    grouping: Vec<usize>,
    regular_group: Option<usize>,
    min_frac: usize,
    max_frac: usize,
    /// Minimum digits of the exponent, when the picture has one.
    exponent: Option<usize>,
    scale: f64,
}

/// `$formatNumber(value, picture, options?)`.
pub(super) fn format_number(args: &[Value]) -> Result<Value, EvalError> {
    let Some(Value::Number(value)) = args.first() else {
        return Err(arg_error("formatNumber", 1));
    };
    let Some(Value::String(picture)) = args.get(1) else {
        return Err(arg_error("formatNumber", 2));
    };
    let df = DecimalFormat::from_options(args.get(2))?;

    let parts: Vec<&str> = picture.split(df.pattern_sep).collect();
    if parts.len() > 2 || parts.is_empty() {
        return Err(arg_error("formatNumber", 2));
    }
    let negative = *value < 0.0;
    let sub_src = if negative && parts.len() == 2 {
        parts[1]
    } else {
        parts[0]
    };
    let sub = analyze(sub_src, &df)?;
    let mut formatted = render(value.abs(), &sub, &df);
    // Without an explicit negative sub-picture, the default is the minus
    // sign prepended to the positive form.
    if negative && parts.len() == 1 {
        formatted.insert(0, df.minus);
    }
    Ok(Value::String(formatted))
}

fn analyze(sub: &str, df: &DecimalFormat) -> Result<SubPicture, EvalError> {
    let err = || arg_error("formatNumber", 2);
    let chars: Vec<char> = sub.chars().collect();
    let is_active = |c: char| c == df.digit || c == df.decimal_sep || c == df.grouping_sep || df.is_family_digit(c);

    let first_active = chars.iter().position(|&c| is_active(c)).ok_or_else(err)?;
    let mut last_active = chars.iter().rposition(|&c| is_active(c)).ok_or_else(err)?;

    // An exponent section: the exponent separator directly after the
    // mantissa, followed by family digits.
    let mut exponent = None;
    let mut mantissa_end = last_active;
    let mut i = first_active;
    let mut seen_decimal = false;
    while i <= last_active {
        if chars[i] == df.exp_sep && i > first_active {
            let digits = &chars[i + 1..=last_active];
            if !digits.is_empty() && digits.iter().all(|&c| df.is_family_digit(c)) {
                exponent = Some(digits.len());
                mantissa_end = i - 1;
                break;
            }
        }
        if chars[i] == df.decimal_sep {
            if seen_decimal {
                return Err(err());
            }
            seen_decimal = true;
        }
        i += 1;
    }

    let mut scale = 1.0;
    let mut prefix = String::new();
    for &c in &chars[..first_active] {
        if c == df.percent {
            scale = 100.0;
        } else if c == df.per_mille {
            scale = 1000.0;
        }
        prefix.push(c);
    }
    let mut suffix = String::new();
    for &c in &chars[last_active + 1..] {
        if c == df.percent {
            scale = 100.0;
        } else if c == df.per_mille {
            scale = 1000.0;
        }
        suffix.push(c);
    }

    let mantissa = &chars[first_active..=mantissa_end];
    let mut int_part: Vec<char> = Vec::new();
    let mut frac_part: Vec<char> = Vec::new();
    let mut in_frac = false;
    for &c in mantissa {
        if c == df.decimal_sep {
            in_frac = true;
        } else if in_frac {
            frac_part.push(c);
        } else {
            int_part.push(c);
        }
    }

    // Integer part, scanned from the right: count digit slots and record
    // grouping positions.
    let mut min_int = 0usize;
    let mut slots = 0usize;
    let mut grouping: Vec<usize> = Vec::new();
    let mut seen_required = false;
    for &c in int_part.iter().rev() {
        if c == df.grouping_sep {
            if grouping.last() == Some(&slots) || slots == 0 {
                return Err(err());
            }
            grouping.push(slots);
        } else if c == df.digit {
            // An optional digit may not follow a required digit.
            if seen_required {
                return Err(err());
            }
            slots += 1;
        } else if df.is_family_digit(c) {
            seen_required = true;
            min_int += 1;
            slots += 1;
        } else {
            return Err(err());
        }
    }

    let mut min_frac = 0usize;
    let mut max_frac = 0usize;
    let mut frac_optional = false;
    for &c in &frac_part {
        if c == df.grouping_sep {
            continue;
        }
        if c == df.digit {
            frac_optional = true;
            max_frac += 1;
        } else if df.is_family_digit(c) {
            // A required digit may not follow an optional one.
            if frac_optional {
                return Err(err());
            }
            min_frac += 1;
            max_frac += 1;
        } else {
            return Err(err());
        }
    }

    if slots == 0 && max_frac == 0 {
        return Err(err());
    }

    let regular_group = match grouping.as_slice() {
        [] => None,
        [first, rest @ ..] => {
            if rest
                .iter()
                .enumerate()
                .all(|(i, &p)| p == first * (i + 2))
            {
                Some(*first)
            } else {
                None
            }
        }
    };

    Ok(SubPicture {
        prefix,
        suffix,
        min_int,
        grouping,
        regular_group,
        min_frac,
        max_frac,
        exponent,
        scale,
    })
}

fn render(value: f64, sub: &SubPicture, df: &DecimalFormat) -> String {
    let scaled = value * sub.scale;

    let (mantissa, exp_value) = match sub.exponent {
        None => (scaled, 0i32),
        Some(_) => {
            if scaled == 0.0 {
                (0.0, 0)
            } else {
                let int_digits = sub.min_int.max(1) as i32;
                let e = scaled.abs().log10().floor() as i32 - (int_digits - 1);
                (scaled / 10f64.powi(e), e)
            }
        }
    };

    let fixed = format!("{:.*}", sub.max_frac, mantissa);
    let (int_digits, frac_digits) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (fixed, String::new()),
    };

    let mut frac_digits = frac_digits;
    while frac_digits.len() > sub.min_frac && frac_digits.ends_with('0') {
        frac_digits.pop();
    }

    let mut int_digits = int_digits;
    while int_digits.len() < sub.min_int {
        int_digits.insert(0, '0');
    }

    let grouped = group_integer(&int_digits, sub, df);

    let mut out = String::new();
    out.push_str(&sub.prefix);
    out.push_str(&df.to_family(&grouped));
    if !frac_digits.is_empty() {
        out.push(df.decimal_sep);
        out.push_str(&df.to_family(&frac_digits));
    }
    if let Some(min_exp) = sub.exponent {
        out.push(df.exp_sep);
        if exp_value < 0 {
            out.push(df.minus);
        }
        let digits = format!("{:0min_exp$}", exp_value.abs());
        out.push_str(&df.to_family(&digits));
    }
    out.push_str(&sub.suffix);
    out
}

fn group_integer(digits: &str, sub: &SubPicture, df: &DecimalFormat) -> String {
    if sub.grouping.is_empty() {
        return digits.to_string();
    }
    let chars: Vec<char> = digits.chars().collect();
    let mut out: Vec<char> = Vec::with_capacity(chars.len() + 4);
    for (from_right, &c) in chars.iter().rev().enumerate() {
        if from_right > 0 {
            let boundary = match sub.regular_group {
                Some(g) => from_right % g == 0,
                None => sub.grouping.contains(&from_right),
            };
            if boundary {
                out.push(df.grouping_sep);
            }
        }
        out.push(c);
    }
    out.reverse();
    out.into_iter().collect()
}

/// `$formatBase(value, radix?)` — radix between 2 and 36.
pub(super) fn format_base(args: &[Value]) -> Result<Value, EvalError> {
    let Some(Value::Number(value)) = args.first() else {
        return Err(arg_error("formatBase", 1));
    };
    let radix = match args.get(1) {
        Some(Value::Number(r)) => {
            let r = r.round_ties_even();
            if !(2.0..=36.0).contains(&r) {
                return Err(arg_error("formatBase", 2));
            }
            r as u64
        }
        Some(Value::Undefined) | None => 10,
        Some(_) => return Err(arg_error("formatBase", 2)),
    };
    let rounded = value.round_ties_even();
    let negative = rounded < 0.0;
    let mut n = rounded.abs() as u64;
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(n % radix) as usize]);
        n /= radix;
        if n == 0 {
            break;
        }
    }
    if negative {
        out.push(b'-');
    }
    out.reverse();
    Ok(Value::String(
        String::from_utf8(out).expect("digits are ASCII"),
    ))
}
