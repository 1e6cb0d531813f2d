//! Exact decimals held by decimal fields.
//!
//! [`Decimal`] keeps the coefficient and exponent it was written with, so
//! `1.50` stays `1.50`. Its range is the one of the store's 128-bit decimal:
//! at most 34 digits and an exponent in `EXPONENT_MIN..=EXPONENT_MAX`. Every
//! `Decimal` therefore converts to a [`bson::Decimal128`] without rounding.

use std::cmp::Ordering;
use std::fmt;

/// Largest coefficient representable in 34 decimal digits.
pub const MAX_COEFFICIENT: u128 = 9_999_999_999_999_999_999_999_999_999_999_999;
pub const MAX_DIGITS: usize = 34;
pub const EXPONENT_MIN: i32 = -6176;
pub const EXPONENT_MAX: i32 = 6111;

/// Decimal number `(-1)^negative * coefficient * 10^exponent`.
#[derive(Debug, Clone, Copy)]
pub struct Decimal {
    negative: bool,
    coefficient: u128,
    exponent: i32,
}

impl Decimal {
    /// Build a decimal from its parts.
    ///
    /// Returns `None` if the coefficient has more than 34 digits or the
    /// exponent is out of range.
    pub fn new(negative: bool, coefficient: u128, exponent: i32) -> Option<Self> {
        if coefficient > MAX_COEFFICIENT || !(EXPONENT_MIN..=EXPONENT_MAX).contains(&exponent) {
            return None;
        }
        Some(Self {
            negative,
            coefficient,
            exponent,
        })
    }

    pub fn from_i64(value: i64) -> Self {
        Self {
            negative: value < 0,
            coefficient: u128::from(value.unsigned_abs()),
            exponent: 0,
        }
    }

    /// Convert a float through its shortest round-tripping representation.
    ///
    /// NaN and infinities have no decimal form and yield `None`.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Self::parse(&format!("{:e}", value))
    }

    /// Parse plain (`-12.50`) or scientific (`1.25E+3`) notation.
    ///
    /// Trailing zeros are only dropped when needed to fit 34 digits. Input
    /// outside the representable range yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (negative, rest) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (mantissa, exp_adjust) = match rest.find(['e', 'E']) {
            Some(idx) => (&rest[..idx], rest[idx + 1..].parse::<i64>().ok()?),
            None => (rest, 0),
        };

        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return None;
        }

        let mut digits: String = int_part
            .chars()
            .chain(frac_part.chars())
            .skip_while(|c| *c == '0')
            .collect();
        let frac_len = i64::try_from(frac_part.len()).ok()?;
        let mut exponent = exp_adjust.checked_sub(frac_len)?;

        while digits.len() > MAX_DIGITS && digits.ends_with('0') {
            digits.pop();
            exponent = exponent.checked_add(1)?;
        }
        if digits.len() > MAX_DIGITS {
            return None;
        }

        let coefficient = if digits.is_empty() {
            0
        } else {
            digits.parse::<u128>().ok()?
        };
        let exponent = i32::try_from(exponent).ok()?;
        Self::new(negative, coefficient, exponent)
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn coefficient(&self) -> u128 {
        self.coefficient
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.coefficient == 0
    }

    fn digit_count(&self) -> u32 {
        match self.coefficient {
            0 => 1,
            c => c.ilog10() + 1,
        }
    }

    /// Exponent of the most significant digit.
    fn adjusted_exponent(&self) -> i64 {
        i64::from(self.exponent) + i64::from(self.digit_count()) - 1
    }

    fn signum(&self) -> i8 {
        match (self.is_zero(), self.negative) {
            (true, _) => 0,
            (false, true) => -1,
            (false, false) => 1,
        }
    }

    /// Compare by numeric value, ignoring representation (`1.0 == 1.00`).
    pub fn cmp_numeric(&self, other: &Self) -> Ordering {
        let sign = self.signum().cmp(&other.signum());
        if sign != Ordering::Equal || self.signum() == 0 {
            return sign;
        }

        let magnitude = self.cmp_magnitude(other);
        if self.negative {
            magnitude.reverse()
        } else {
            magnitude
        }
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        let adjusted = self.adjusted_exponent().cmp(&other.adjusted_exponent());
        if adjusted != Ordering::Equal {
            return adjusted;
        }
        // Same leading-digit position: scaling the coefficient with the larger
        // exponent keeps it within 34 digits.
        let (a, b) = match self.exponent.cmp(&other.exponent) {
            Ordering::Greater => {
                let scale = 10u128.pow((self.exponent - other.exponent) as u32);
                (self.coefficient.saturating_mul(scale), other.coefficient)
            }
            Ordering::Less => {
                let scale = 10u128.pow((other.exponent - self.exponent) as u32);
                (self.coefficient, other.coefficient.saturating_mul(scale))
            }
            Ordering::Equal => (self.coefficient, other.coefficient),
        };
        a.cmp(&b)
    }

    /// Wire form of the decimal.
    pub fn to_decimal128(&self) -> Option<bson::Decimal128> {
        self.to_string().parse().ok()
    }

    /// Internal form of a wire decimal. NaN and infinities yield `None`.
    pub fn from_decimal128(value: &bson::Decimal128) -> Option<Self> {
        Self::parse(&value.to_string())
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.cmp_numeric(other) == Ordering::Equal
    }
}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp_numeric(other))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.coefficient.to_string();
        let exponent = i64::from(self.exponent);
        let adjusted = self.adjusted_exponent();
        let sign = if self.negative { "-" } else { "" };

        if exponent <= 0 && adjusted >= -6 {
            if exponent == 0 {
                return write!(f, "{}{}", sign, digits);
            }
            let point = digits.len() as i64 + exponent;
            if point > 0 {
                let (int_part, frac_part) = digits.split_at(point as usize);
                write!(f, "{}{}.{}", sign, int_part, frac_part)
            } else {
                let zeros = "0".repeat((-point) as usize);
                write!(f, "{}0.{}{}", sign, zeros, digits)
            }
        } else {
            let (first, rest) = digits.split_at(1);
            let exp_sign = if adjusted >= 0 { "+" } else { "" };
            if rest.is_empty() {
                write!(f, "{}{}E{}{}", sign, first, exp_sign, adjusted)
            } else {
                write!(f, "{}{}.{}E{}{}", sign, first, rest, exp_sign, adjusted)
            }
        }
    }
}
