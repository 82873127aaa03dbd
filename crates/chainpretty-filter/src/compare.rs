//! Comparison operators, unit transforms and signed 256-bit numbers used by
//! the `arg` filter.

use alloy_primitives::{Address, B256, U256};
use chainpretty_core::{ArgValue, FilterConfigError};
use serde_json::Value;
use std::{cmp::Ordering, str::FromStr};

// ─── Operators ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    /// `lt`, `le`, `gt` and `ge` only make sense for numbers.
    pub fn is_ordering(&self) -> bool {
        !matches!(self, Operator::Eq | Operator::Ne)
    }

    pub fn holds(&self, ord: Ordering) -> bool {
        match self {
            Operator::Eq => ord == Ordering::Equal,
            Operator::Ne => ord != Ordering::Equal,
            Operator::Lt => ord == Ordering::Less,
            Operator::Le => ord != Ordering::Greater,
            Operator::Gt => ord == Ordering::Greater,
            Operator::Ge => ord != Ordering::Less,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
        }
    }
}

impl FromStr for Operator {
    type Err = FilterConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" | "==" => Ok(Operator::Eq),
            "ne" | "!=" => Ok(Operator::Ne),
            "lt" | "<" => Ok(Operator::Lt),
            "le" | "<=" => Ok(Operator::Le),
            "gt" | ">" => Ok(Operator::Gt),
            "ge" | ">=" => Ok(Operator::Ge),
            other => Err(FilterConfigError::UnknownOperator(other.to_string())),
        }
    }
}

// ─── Transforms ───────────────────────────────────────────────────────────────

/// Scaling applied to the configured value before comparing, so rules can
/// be written in token units (`"1"` with `wad` means 10^18).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transform {
    #[default]
    None,
    /// 6 decimals (USDC-style amounts)
    Amount,
    /// 18 decimals
    Wad,
    /// 27 decimals
    Ray,
}

impl Transform {
    pub fn decimals(&self) -> u32 {
        match self {
            Transform::None => 0,
            Transform::Amount => 6,
            Transform::Wad => 18,
            Transform::Ray => 27,
        }
    }
}

impl FromStr for Transform {
    type Err = FilterConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Transform::None),
            "amount" => Ok(Transform::Amount),
            "wad" => Ok(Transform::Wad),
            "ray" => Ok(Transform::Ray),
            other => Err(FilterConfigError::UnknownTransform(other.to_string())),
        }
    }
}

// ─── Numbers ──────────────────────────────────────────────────────────────────

/// Sign + magnitude integer covering both `uint256` and `int256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Number {
    negative: bool,
    magnitude: U256,
}

impl Number {
    pub fn new(negative: bool, magnitude: U256) -> Self {
        Self {
            negative: negative && !magnitude.is_zero(),
            magnitude,
        }
    }

    pub fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Uint(u) => Some(Self::new(false, *u)),
            ArgValue::Int(i) => Some(Self::new(i.is_negative(), i.unsigned_abs())),
            _ => None,
        }
    }

    /// Parse a configured JSON number or numeric string and scale it by
    /// `10^decimals`. Returns `None` if the value is not numeric.
    pub fn from_config(value: &Value, decimals: u32) -> Option<Result<Self, String>> {
        match value {
            Value::Number(n) => Some(parse_decimal(&n.to_string(), decimals)),
            Value::String(s) if looks_numeric(s) => Some(parse_decimal(s, decimals)),
            _ => None,
        }
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, false) => self.magnitude.cmp(&other.magnitude),
            (true, true) => other.magnitude.cmp(&self.magnitude),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn looks_numeric(s: &str) -> bool {
    let body = s.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(s);
    !body.is_empty()
        && body.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
}

/// Largest accepted `|exponent|` in a decimal literal.
const MAX_EXPONENT: i64 = 100;

/// Digits in `U256::MAX`.
const MAX_DIGITS: usize = 78;

/// Parse a decimal literal (`"12"`, `"1.5"`, `"-3"`, `"1e18"`) multiplied by
/// `10^decimals`. The result must be an integer.
pub fn parse_decimal(text: &str, decimals: u32) -> Result<Number, String> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (mantissa, exponent) = match body.find(|c: char| c == 'e' || c == 'E') {
        Some(i) => (
            &body[..i],
            body[i + 1..]
                .parse::<i64>()
                .map_err(|e| format!("bad exponent in '{text}': {e}"))?,
        ),
        None => (body, 0),
    };
    if exponent.abs() > MAX_EXPONENT {
        return Err(format!("exponent out of range in '{text}'"));
    }
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part)
    {
        return Err(format!("'{text}' is not a number"));
    }

    let mut digits = format!("{int_part}{frac_part}");
    let scale = decimals as i64 + exponent - frac_part.len() as i64;
    if scale >= 0 {
        let significant = digits.trim_start_matches('0').len();
        if significant == 0 {
            return Ok(Number::new(negative, U256::ZERO));
        }
        if significant + scale as usize > MAX_DIGITS {
            return Err(format!("'{text}' does not fit in 256 bits at {decimals} decimals"));
        }
        digits.extend(std::iter::repeat('0').take(scale as usize));
    } else {
        let cut = (-scale) as usize;
        let keep = digits.len().saturating_sub(cut);
        if digits[keep..].chars().any(|c| c != '0') {
            return Err(format!("'{text}' is not an integer at {decimals} decimals"));
        }
        digits.truncate(keep);
    }
    let trimmed = digits.trim_start_matches('0');
    let magnitude = if trimmed.is_empty() {
        U256::ZERO
    } else {
        U256::from_str_radix(trimmed, 10).map_err(|e| format!("'{text}': {e}"))?
    };
    Ok(Number::new(negative, magnitude))
}

// ─── Literal equality ─────────────────────────────────────────────────────────

/// Equality between a decoded argument and a non-numeric configured value.
pub fn literal_eq(arg: &ArgValue, expected: &Value) -> bool {
    match (arg, expected) {
        (ArgValue::Address(a), Value::String(s)) => s.parse::<Address>().map_or(false, |e| e == *a),
        (ArgValue::Hash(h), Value::String(s)) => s.parse::<B256>().map_or(false, |e| e == *h),
        (ArgValue::Bytes(b), Value::String(s)) => b.eq_ignore_ascii_case(s),
        (ArgValue::Str(v), Value::String(s)) => v == s,
        (ArgValue::Bool(v), Value::Bool(b)) => v == b,
        (other, expected) => serde_json::to_value(other).map_or(false, |v| &v == expected),
    }
}
