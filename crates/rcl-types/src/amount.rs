use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::currency::Currency;
use crate::error::TypeError;

const MIN_MANTISSA: u64 = 1_000_000_000_000_000;
const MAX_MANTISSA: u64 = 9_999_999_999_999_999;
const MIN_EXPONENT: i32 = -96;
const MAX_EXPONENT: i32 = 80;
const ZERO_EXPONENT: i32 = -100;

/// Digits kept when parsing decimal text; the rest are truncated.
const MAX_PARSE_DIGITS: usize = 32;

// ---------------------------------------------------------------------------
// Drops
// ---------------------------------------------------------------------------

/// Native amount in drops (one millionth of a whole unit).
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Drops(u64);

impl Drops {
    pub const ZERO: Self = Self(0);
    pub const PER_XRP: u64 = 1_000_000;

    pub const fn new(drops: u64) -> Self {
        Self(drops)
    }

    /// Whole units converted to drops.
    pub const fn from_xrp(xrp: u64) -> Self {
        Self(xrp.saturating_mul(Self::PER_XRP))
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

impl fmt::Debug for Drops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Drops({})", self.0)
    }
}

impl fmt::Display for Drops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// IouValue
// ---------------------------------------------------------------------------

/// Normalized decimal value of an issued currency.
///
/// Non-zero values keep a 16-digit mantissa in `[10^15, 10^16)` and an
/// exponent in `[-96, 80]`, so every value has exactly one representation and
/// derived equality and hashing are exact. Results below the smallest
/// exponent round to zero; above the largest they overflow.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IouValue {
    mantissa: u64,
    exponent: i32,
    negative: bool,
}

impl IouValue {
    pub const fn zero() -> Self {
        Self {
            mantissa: 0,
            exponent: ZERO_EXPONENT,
            negative: false,
        }
    }

    /// `mantissa * 10^exponent`, normalized.
    pub fn new(mantissa: u64, exponent: i32) -> Result<Self, TypeError> {
        Self::normalize(mantissa as u128, exponent, false)
    }

    pub fn from_integer(value: i64) -> Result<Self, TypeError> {
        Self::normalize(value.unsigned_abs() as u128, 0, value < 0)
    }

    fn normalize(mut mantissa: u128, mut exponent: i32, negative: bool) -> Result<Self, TypeError> {
        if mantissa == 0 {
            return Ok(Self::zero());
        }
        while mantissa < MIN_MANTISSA as u128 {
            mantissa *= 10;
            exponent -= 1;
        }
        while mantissa > MAX_MANTISSA as u128 {
            mantissa /= 10;
            exponent += 1;
        }
        if exponent > MAX_EXPONENT {
            return Err(TypeError::Overflow);
        }
        if exponent < MIN_EXPONENT {
            return Ok(Self::zero());
        }
        Ok(Self {
            mantissa: mantissa as u64,
            exponent,
            negative,
        })
    }

    pub fn mantissa(&self) -> u64 {
        self.mantissa
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    pub fn is_negative(&self) -> bool {
        self.negative && !self.is_zero()
    }

    /// -1, 0 or 1.
    pub fn signum(&self) -> i32 {
        if self.is_zero() {
            0
        } else if self.negative {
            -1
        } else {
            1
        }
    }

    pub fn negate(&self) -> Self {
        if self.is_zero() {
            return *self;
        }
        Self {
            negative: !self.negative,
            ..*self
        }
    }

    pub fn abs(&self) -> Self {
        Self {
            negative: false,
            ..*self
        }
    }

    fn signed_mantissa(&self) -> i128 {
        if self.negative {
            -(self.mantissa as i128)
        } else {
            self.mantissa as i128
        }
    }

    /// Sum of two values. The operand with the smaller exponent is truncated
    /// to the larger exponent before adding.
    pub fn checked_add(&self, other: &Self) -> Result<Self, TypeError> {
        if self.is_zero() {
            return Ok(*other);
        }
        if other.is_zero() {
            return Ok(*self);
        }
        let (mut va, mut ea) = (self.signed_mantissa(), self.exponent);
        let (mut vb, mut eb) = (other.signed_mantissa(), other.exponent);
        while ea < eb {
            va /= 10;
            ea += 1;
        }
        while eb < ea {
            vb /= 10;
            eb += 1;
        }
        let sum = va + vb;
        Self::normalize(sum.unsigned_abs(), ea, sum < 0)
    }

    pub fn checked_sub(&self, other: &Self) -> Result<Self, TypeError> {
        self.checked_add(&other.negate())
    }

    /// Quotient with 16 significant digits (truncated).
    pub fn checked_div(&self, denominator: &Self) -> Result<Self, TypeError> {
        if denominator.is_zero() {
            return Err(TypeError::DivisionByZero);
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }
        let scaled = self.mantissa as u128 * 10u128.pow(17) / denominator.mantissa as u128;
        Self::normalize(
            scaled,
            self.exponent - denominator.exponent - 17,
            self.negative != denominator.negative,
        )
    }
}

impl Default for IouValue {
    fn default() -> Self {
        Self::zero()
    }
}

impl Ord for IouValue {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.signum(), other.signum());
        if a != b {
            return a.cmp(&b);
        }
        if a == 0 {
            return Ordering::Equal;
        }
        let magnitude = self
            .exponent
            .cmp(&other.exponent)
            .then(self.mantissa.cmp(&other.mantissa));
        if a > 0 {
            magnitude
        } else {
            magnitude.reverse()
        }
    }
}

impl PartialOrd for IouValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for IouValue {
    type Err = TypeError;

    /// Parses `"1"`, `".3"`, `"-2.50"`, `"1.5e3"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidAmount(s.to_string());

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (number, exp_text) = match body.find(|c| c == 'e' || c == 'E') {
            Some(i) => (&body[..i], Some(&body[i + 1..])),
            None => (body, None),
        };
        let extra_exponent: i32 = match exp_text {
            Some(text) => text.parse().map_err(|_| invalid())?,
            None => 0,
        };
        let (int_part, frac_part) = number.split_once('.').unwrap_or((number, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let joined = format!("{int_part}{frac_part}");
        let digits = joined.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(Self::zero());
        }
        let mut exponent = extra_exponent - frac_part.len() as i32;
        let kept = if digits.len() > MAX_PARSE_DIGITS {
            exponent += (digits.len() - MAX_PARSE_DIGITS) as i32;
            &digits[..MAX_PARSE_DIGITS]
        } else {
            digits
        };
        let mantissa: u128 = kept.parse().map_err(|_| invalid())?;
        Self::normalize(mantissa, exponent, negative)
    }
}

impl fmt::Display for IouValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }
        let (mut mantissa, mut exponent) = (self.mantissa, self.exponent);
        while mantissa % 10 == 0 {
            mantissa /= 10;
            exponent += 1;
        }
        let sign = if self.negative { "-" } else { "" };
        let digits = mantissa.to_string();
        if exponent >= 0 {
            if exponent <= 20 {
                return write!(f, "{sign}{digits}{}", "0".repeat(exponent as usize));
            }
            return write!(f, "{sign}{digits}e{exponent}");
        }
        let point = digits.len() as i32 + exponent;
        if point > 0 {
            let (whole, frac) = digits.split_at(point as usize);
            write!(f, "{sign}{whole}.{frac}")
        } else if point > -20 {
            write!(f, "{sign}0.{}{digits}", "0".repeat((-point) as usize))
        } else {
            write!(f, "{sign}{digits}e{exponent}")
        }
    }
}

impl fmt::Debug for IouValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IouValue({self})")
    }
}

// ---------------------------------------------------------------------------
// Asset / Amount
// ---------------------------------------------------------------------------

/// What an amount is denominated in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Asset {
    Native,
    Issued { currency: Currency, issuer: AccountId },
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "XRP"),
            Self::Issued { currency, issuer } => write!(f, "{currency}/{issuer}"),
        }
    }
}

/// An issued-currency amount: value, currency and issuing account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssuedAmount {
    pub value: IouValue,
    pub currency: Currency,
    pub issuer: AccountId,
}

impl IssuedAmount {
    pub fn new(value: IouValue, currency: Currency, issuer: AccountId) -> Self {
        Self {
            value,
            currency,
            issuer,
        }
    }

    pub fn asset(&self) -> Asset {
        Asset::Issued {
            currency: self.currency,
            issuer: self.issuer,
        }
    }
}

/// A transaction amount: native drops or an issued currency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Amount {
    Native(Drops),
    Issued(IssuedAmount),
}

impl Amount {
    pub fn native(drops: u64) -> Self {
        Self::Native(Drops::new(drops))
    }

    /// Parse an issued amount such as `("0.1", "FOO", gateway)`.
    pub fn issued(value: &str, currency: &str, issuer: AccountId) -> Result<Self, TypeError> {
        Ok(Self::Issued(IssuedAmount::new(
            value.parse()?,
            Currency::from_code(currency)?,
            issuer,
        )))
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native(_))
    }

    pub fn asset(&self) -> Asset {
        match self {
            Self::Native(_) => Asset::Native,
            Self::Issued(issued) => issued.asset(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Self::Native(drops) => drops.is_zero(),
            Self::Issued(issued) => issued.value.is_zero(),
        }
    }

    /// Strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        match self {
            Self::Native(drops) => !drops.is_zero(),
            Self::Issued(issued) => issued.value.signum() > 0,
        }
    }

    /// The amount as a decimal value; native amounts count whole drops.
    pub fn rate_value(&self) -> Result<IouValue, TypeError> {
        match self {
            Self::Native(drops) => IouValue::new(drops.value(), 0),
            Self::Issued(issued) => Ok(issued.value),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native(drops) => write!(f, "{drops} drops"),
            Self::Issued(issued) => write!(f, "{} {}", issued.value, issued.asset()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> IouValue {
        s.parse().unwrap()
    }

    #[test]
    fn parses_fractional_values() {
        assert_eq!(v(".1").to_string(), "0.1");
        assert_eq!(v("0.3").to_string(), "0.3");
        assert_eq!(v("1").to_string(), "1");
        assert_eq!(v("-2.50").to_string(), "-2.5");
        assert_eq!(v("1.5e3").to_string(), "1500");
        assert_eq!(v("0.000").to_string(), "0");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<IouValue>().is_err());
        assert!(".".parse::<IouValue>().is_err());
        assert!("1.2.3".parse::<IouValue>().is_err());
        assert!("abc".parse::<IouValue>().is_err());
        assert!("1e".parse::<IouValue>().is_err());
    }

    #[test]
    fn representation_is_normalized() {
        let one = v("1");
        assert_eq!(one.mantissa(), 1_000_000_000_000_000);
        assert_eq!(one.exponent(), -15);
        assert_eq!(v("1.000"), one);
        assert_eq!(IouValue::from_integer(1).unwrap(), one);
    }

    #[test]
    fn addition_and_subtraction() {
        assert_eq!(v(".1").checked_add(&v(".2")).unwrap(), v(".3"));
        assert_eq!(v(".3").checked_sub(&v(".1")).unwrap(), v(".2"));
        assert_eq!(v(".1").checked_sub(&v(".3")).unwrap(), v("-.2"));
        assert!(v("5").checked_sub(&v("5")).unwrap().is_zero());
    }

    #[test]
    fn ordering_respects_sign_and_magnitude() {
        assert!(v("0.1") < v("0.2"));
        assert!(v("-1") < v("0"));
        assert!(v("-2") < v("-1"));
        assert!(v("10") > v("9.99"));
        assert_eq!(v("0").cmp(&IouValue::zero()), Ordering::Equal);
    }

    #[test]
    fn division_keeps_sixteen_digits() {
        let third = v("1").checked_div(&v("3")).unwrap();
        assert_eq!(third.mantissa(), 3_333_333_333_333_333);
        assert_eq!(third.exponent(), -16);
        assert_eq!(
            v("1").checked_div(&IouValue::zero()),
            Err(TypeError::DivisionByZero)
        );
    }

    #[test]
    fn overflow_and_underflow() {
        assert_eq!(IouValue::new(1, 100), Err(TypeError::Overflow));
        assert!(IouValue::new(1, -120).unwrap().is_zero());
    }

    #[test]
    fn negative_zero_is_zero() {
        assert_eq!(v("-0"), IouValue::zero());
        assert_eq!(IouValue::zero().negate(), IouValue::zero());
    }

    #[test]
    fn drops_arithmetic() {
        let a = Drops::from_xrp(5000);
        assert_eq!(a.value(), 5_000_000_000);
        assert_eq!(a.checked_sub(Drops::new(10)).unwrap().value(), 4_999_999_990);
        assert!(Drops::ZERO.checked_sub(Drops::new(1)).is_none());
    }

    #[test]
    fn amount_helpers() {
        let issuer = AccountId::from_public_key(b"gw");
        let foo = Amount::issued(".5", "FOO", issuer).unwrap();
        assert!(!foo.is_native());
        assert!(foo.is_positive());
        assert_eq!(
            foo.asset(),
            Asset::Issued {
                currency: Currency::from_code("FOO").unwrap(),
                issuer
            }
        );
        assert!(Amount::native(1).is_positive());
        assert!(Amount::native(0).is_zero());
        assert_eq!(Amount::native(25).rate_value().unwrap(), v("25"));
    }

    proptest::proptest! {
        #[test]
        fn integer_ordering_is_preserved(a in -1_000_000_000i64..1_000_000_000, b in -1_000_000_000i64..1_000_000_000) {
            let va = IouValue::from_integer(a).unwrap();
            let vb = IouValue::from_integer(b).unwrap();
            proptest::prop_assert_eq!(va.cmp(&vb), a.cmp(&b));
            proptest::prop_assert_eq!(va.checked_sub(&vb).unwrap(), IouValue::from_integer(a - b).unwrap());
        }
    }

    #[test]
    fn serde_roundtrip() {
        let value = v("-12.75");
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(serde_json::from_str::<IouValue>(&json).unwrap(), value);
    }
}
