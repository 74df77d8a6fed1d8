// SPDX-License-Identifier: MIT

//! Runtime values for condition evaluation
//!
//! Content is authored against the browser checklist, so comparisons keep the
//! loose semantics authors rely on there: `5 == "5"` holds, `true == 1` holds,
//! `null` only equals `null`, and relational operators compare strings
//! lexically but everything else numerically.

use serde_json::Value;
use std::cmp::Ordering;

/// A value produced while evaluating a condition
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<Operand>),
}

impl From<&Value> for Operand {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Operand::Null,
            Value::Bool(b) => Operand::Bool(*b),
            Value::Number(n) => Operand::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Operand::Str(s.clone()),
            Value::Array(items) => Operand::List(items.iter().map(Operand::from).collect()),
            // objects only ever take part in comparisons through their primitive form
            Value::Object(_) => Operand::Str("[object Object]".to_string()),
        }
    }
}

impl From<bool> for Operand {
    fn from(b: bool) -> Self {
        Operand::Bool(b)
    }
}

impl From<f64> for Operand {
    fn from(n: f64) -> Self {
        Operand::Number(n)
    }
}

impl Operand {
    /// Truthiness: `false`, `0`, `NaN`, `""` and `null` are falsy
    pub fn truthy(&self) -> bool {
        match self {
            Operand::Null => false,
            Operand::Bool(b) => *b,
            Operand::Number(n) => *n != 0.0 && !n.is_nan(),
            Operand::Str(s) => !s.is_empty(),
            Operand::List(_) => true,
        }
    }

    /// Numeric conversion; unparseable text becomes `NaN`
    pub fn to_number(&self) -> f64 {
        match self {
            Operand::Null => 0.0,
            Operand::Bool(b) => f64::from(u8::from(*b)),
            Operand::Number(n) => *n,
            Operand::Str(s) => parse_number(s),
            Operand::List(_) => parse_number(&self.to_text()),
        }
    }

    /// Text conversion; lists join their items with commas
    pub fn to_text(&self) -> String {
        match self {
            Operand::Null => "null".to_string(),
            Operand::Bool(b) => b.to_string(),
            Operand::Number(n) => format_number(*n),
            Operand::Str(s) => s.clone(),
            Operand::List(items) => items
                .iter()
                .map(|i| match i {
                    Operand::Null => String::new(),
                    other => other.to_text(),
                })
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Lists collapse to their text form, everything else is already primitive
    fn to_primitive(&self) -> Operand {
        match self {
            Operand::List(_) => Operand::Str(self.to_text()),
            other => other.clone(),
        }
    }

    /// Type-coercing equality (`==`)
    pub fn loose_eq(&self, other: &Operand) -> bool {
        match (self, other) {
            (Operand::Null, Operand::Null) => true,
            (Operand::Null, _) | (_, Operand::Null) => false,
            (Operand::Bool(a), Operand::Bool(b)) => a == b,
            (Operand::Number(a), Operand::Number(b)) => a == b,
            (Operand::Str(a), Operand::Str(b)) => a == b,
            // two list literals are never the same list
            (Operand::List(_), Operand::List(_)) => false,
            (Operand::Number(n), Operand::Str(s)) | (Operand::Str(s), Operand::Number(n)) => {
                *n == parse_number(s)
            }
            (Operand::Bool(b), x) | (x, Operand::Bool(b)) => {
                Operand::Number(f64::from(u8::from(*b))).loose_eq(x)
            }
            (Operand::List(_), _) | (_, Operand::List(_)) => {
                self.to_primitive().loose_eq(&other.to_primitive())
            }
        }
    }

    /// Equality without coercion (`===`)
    pub fn strict_eq(&self, other: &Operand) -> bool {
        match (self, other) {
            (Operand::Null, Operand::Null) => true,
            (Operand::Bool(a), Operand::Bool(b)) => a == b,
            (Operand::Number(a), Operand::Number(b)) => a == b,
            (Operand::Str(a), Operand::Str(b)) => a == b,
            _ => false,
        }
    }

    /// Membership equality used by `in`: strict, except `NaN` matches `NaN`
    pub fn same_value_zero(&self, other: &Operand) -> bool {
        match (self, other) {
            (Operand::Number(a), Operand::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_eq(other),
        }
    }

    /// Relational ordering; `None` when either side is not comparable (`NaN`)
    pub fn compare(&self, other: &Operand) -> Option<Ordering> {
        match (self.to_primitive(), other.to_primitive()) {
            (Operand::Str(a), Operand::Str(b)) => Some(a.cmp(&b)),
            (a, b) => a.to_number().partial_cmp(&b.to_number()),
        }
    }

    /// `+`: concatenates when either side is text, adds otherwise
    pub fn add(&self, other: &Operand) -> Operand {
        let (a, b) = (self.to_primitive(), other.to_primitive());
        if matches!(a, Operand::Str(_)) || matches!(b, Operand::Str(_)) {
            Operand::Str(a.to_text() + &b.to_text())
        } else {
            Operand::Number(a.to_number() + b.to_number())
        }
    }

    /// 32-bit integer view used by `~`
    pub fn to_int32(&self) -> i32 {
        let n = self.to_number();
        if !n.is_finite() {
            return 0;
        }
        let wrapped = n.trunc().rem_euclid(4_294_967_296.0);
        // wrapped is in [0, 2^32) so the u32 cast is exact
        (wrapped as u32) as i32
    }
}

/// Parse text the way numeric coercion does: trimmed, empty is zero
fn parse_number(text: &str) -> f64 {
    let s = text.trim();
    if s.is_empty() {
        return 0.0;
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    // rust also accepts "inf" and "nan" spellings, which are not numbers here
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return f64::NAN;
    }
    s.parse::<f64>().unwrap_or(f64::NAN)
}

/// Number to text the way JavaScript prints it: plain decimals from
/// `1e-6` up to but excluding `1e21`, exponent form outside that range
fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        return text.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    // shortest round-trip digits, e.g. "1.25e-7"
    let scientific = format!("{:e}", n.abs());
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return n.to_string();
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return n.to_string();
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let len = digits.len() as i32;
    // position of the decimal point relative to the first digit
    let point = exponent + 1;

    let body = if (len..=21).contains(&point) {
        format!("{}{}", digits, "0".repeat((point - len) as usize))
    } else if (1..=21).contains(&point) {
        let (whole, fraction) = digits.split_at(point as usize);
        format!("{}.{}", whole, fraction)
    } else if (-5..=0).contains(&point) {
        format!("0.{}{}", "0".repeat(point.unsigned_abs() as usize), digits)
    } else {
        let (first, rest) = digits.split_at(1);
        let mantissa = if rest.is_empty() {
            first.to_string()
        } else {
            format!("{}.{}", first, rest)
        };
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{}", mantissa, sign, exponent.unsigned_abs())
    };

    if n < 0.0 {
        format!("-{}", body)
    } else {
        body
    }
}
