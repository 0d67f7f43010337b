//! Arbitrary precision reals using dashu
//!
//! Uses dashu-float (DBig) for arbitrary precision decimal arithmetic and
//! carries an exactness flag alongside each value: field operations on exact
//! inputs stay exact, transcendentals are approximations. The flag drives the
//! truncation marker in short display strings.

use dashu_float::ops::{Abs, SquareRoot};
use dashu_float::DBig;
use dashu_int::IBig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error type for real-number operations
#[derive(Debug, Clone, Error)]
pub enum RealError {
    #[error("Invalid number format: {0}")]
    ParseError(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Domain error: {0}")]
    DomainError(String),

    #[error("Overflow: result too large")]
    Overflow,
}

/// Default working precision for calculations (decimal digits)
pub const DEFAULT_PRECISION: usize = 50;

/// Factorial arguments above this raise `Overflow` rather than grind forever.
const MAX_FACTORIAL: i64 = 20_000;

/// Integer exponents above this magnitude leave the exact-power fast path.
const MAX_EXACT_POW: i64 = 10_000;

/// Significant digits shown by [`Real::to_display`].
const DISPLAY_DIGITS: usize = 10;

/// Truncation marker appended to short display strings.
pub const ELLIPSIS: char = '…';

/// Arbitrary precision real number with exactness classification.
///
/// Built on dashu-float's DBig. A value is *exact* when it is known to equal
/// the mathematical result precisely (literals, sums/products of exact
/// values); anything that went through a rounded or transcendental operation
/// is approximate. All operations return Results or new values - never panic.
#[derive(Debug, Clone)]
pub struct Real {
    inner: DBig,
    exact: bool,
}

impl Real {
    // ========== Construction ==========

    /// Ensure a DBig has adequate precision for calculations
    fn with_work_precision(val: DBig) -> DBig {
        val.with_precision(DEFAULT_PRECISION).value()
    }

    fn exact_value(inner: DBig) -> Self {
        Self { inner, exact: true }
    }

    fn approx(inner: DBig) -> Self {
        Self { inner, exact: false }
    }

    /// Create from i64; always exact.
    pub fn from_i64(n: i64) -> Self {
        Self::exact_value(DBig::from(n))
    }

    /// Exact conversion from the parts of a numeric literal: whole-part
    /// digits, fraction-part digits, and a decimal exponent. Every decimal
    /// literal is exactly representable, so the result is exact.
    ///
    /// Empty digit strings are treated as zero; non-digit characters are a
    /// parse error.
    pub fn from_literal(whole: &str, frac: &str, exponent: i32) -> Result<Self, RealError> {
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(RealError::ParseError(format!("{whole}.{frac}")));
        }
        let digits = format!("{whole}{frac}");
        let significand: IBig = if digits.is_empty() {
            IBig::ZERO
        } else {
            digits
                .parse()
                .map_err(|_| RealError::ParseError(digits.clone()))?
        };
        let scale = exponent as isize - frac.len() as isize;
        Ok(Self::exact_value(DBig::from_parts(significand, scale)))
    }

    /// Parse from a decimal string: `[-]digits[.digits][e[-]digits]`.
    /// The parsed value is exact (it is precisely the number the string
    /// denotes).
    pub fn from_str(s: &str) -> Result<Self, RealError> {
        let s = s.trim();
        let err = || RealError::ParseError(s.to_string());

        let (negative, rest) = match s.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, s),
        };
        let (mantissa, exp_part) = match rest.split_once(['e', 'E']) {
            Some((m, e)) => (m, Some(e)),
            None => (rest, None),
        };
        let exponent: i32 = match exp_part {
            Some(e) => e.parse().map_err(|_| err())?,
            None => 0,
        };
        let (whole, frac) = match mantissa.split_once('.') {
            Some((w, f)) => (w, f),
            None => (mantissa, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        let value = Self::from_literal(whole, frac, exponent).map_err(|_| err())?;
        Ok(if negative { value.negate() } else { value })
    }

    // ========== Predicates ==========

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.inner == DBig::ZERO
    }

    /// Check if negative
    pub fn is_negative(&self) -> bool {
        self.inner < DBig::ZERO
    }

    /// Check if value is an integer
    pub fn is_integer(&self) -> bool {
        let floor_val = self.inner.clone().floor();
        self.inner == floor_val
    }

    /// Whether the value is known to be mathematically exact.
    pub fn is_exact(&self) -> bool {
        self.exact
    }

    // ========== Basic Arithmetic ==========

    /// Addition
    pub fn add(&self, other: &Self) -> Self {
        Self {
            inner: &self.inner + &other.inner,
            exact: self.exact && other.exact,
        }
    }

    /// Subtraction
    pub fn sub(&self, other: &Self) -> Self {
        Self {
            inner: &self.inner - &other.inner,
            exact: self.exact && other.exact,
        }
    }

    /// Multiplication
    pub fn mul(&self, other: &Self) -> Self {
        Self {
            inner: &self.inner * &other.inner,
            exact: self.exact && other.exact,
        }
    }

    /// Negation; preserves exactness.
    pub fn negate(&self) -> Self {
        Self {
            inner: -&self.inner,
            exact: self.exact,
        }
    }

    /// Safe division (returns Result, never panics). The quotient is exact
    /// only when multiplying back reproduces the dividend at working
    /// precision, i.e. the decimal expansion terminates.
    pub fn checked_div(&self, other: &Self) -> Result<Self, RealError> {
        if other.is_zero() {
            return Err(RealError::DivisionByZero);
        }
        let quotient =
            Self::with_work_precision(self.inner.clone()) / Self::with_work_precision(other.inner.clone());
        let exact = self.exact && other.exact && &quotient * &other.inner == self.inner;
        Ok(Self { inner: quotient, exact })
    }

    /// Real-valued power.
    ///
    /// Integer exponents of small magnitude take the exact repeated-squaring
    /// path; everything else routes through exp(y * ln|x|), with the sign
    /// restored for odd integer exponents. A negative base with a
    /// non-integer exponent is a domain error.
    pub fn pow(&self, exp: &Self) -> Result<Self, RealError> {
        if exp.is_zero() {
            return Ok(Self::from_i64(1));
        }
        if self.is_zero() {
            if exp.is_negative() {
                return Err(RealError::DivisionByZero);
            }
            return Ok(Self::from_i64(0));
        }
        if self.inner == DBig::ONE {
            return Ok(Self::from_i64(1));
        }

        let int_exp = if exp.is_integer() { exp.to_i64() } else { None };
        if let Some(e) = int_exp {
            if e.unsigned_abs() <= MAX_EXACT_POW as u64 {
                return self.pow_integer(e);
            }
        }
        if exp.is_integer() && int_exp.is_none() {
            // Integral but beyond i64: magnitude alone rules this out.
            return Err(RealError::Overflow);
        }

        if self.is_negative() {
            match int_exp {
                Some(e) => {
                    let magnitude = self.abs().pow_transcendental(exp);
                    Ok(if e % 2 != 0 { magnitude.negate() } else { magnitude })
                }
                None => Err(RealError::DomainError(
                    "negative base with non-integer exponent".to_string(),
                )),
            }
        } else {
            Ok(self.pow_transcendental(exp))
        }
    }

    /// Exact power by repeated squaring; negative exponents divide into one.
    fn pow_integer(&self, exp: i64) -> Result<Self, RealError> {
        let mut result = Self::from_i64(1);
        let mut base = self.clone();
        let mut e = exp.unsigned_abs();
        while e > 0 {
            if e & 1 == 1 {
                result = result.mul(&base);
            }
            base = base.mul(&base);
            e >>= 1;
        }
        if exp < 0 {
            Self::from_i64(1).checked_div(&result)
        } else {
            Ok(result)
        }
    }

    /// x^y = exp(y * ln(x)) for positive x. Always approximate.
    fn pow_transcendental(&self, exp: &Self) -> Self {
        let ln_x = Self::with_work_precision(self.inner.clone()).ln();
        let product = &ln_x * &Self::with_work_precision(exp.inner.clone());
        Self::approx(product.exp())
    }

    /// Squaring, the postfix x² operation.
    pub fn square(&self) -> Self {
        self.mul(self)
    }

    // ========== Transcendental Functions ==========

    /// Square root. Stays exact when the root is itself a terminating
    /// decimal (perfect squares and friends).
    pub fn sqrt(&self) -> Result<Self, RealError> {
        if self.is_negative() {
            return Err(RealError::DomainError(
                "square root of negative number".to_string(),
            ));
        }
        if self.is_zero() {
            return Ok(Self::from_i64(0));
        }
        let root = Self::with_work_precision(self.inner.clone()).sqrt();
        let exact = self.exact && &root * &root == self.inner;
        Ok(Self { inner: root, exact })
    }

    /// Natural logarithm
    pub fn ln(&self) -> Result<Self, RealError> {
        if self.inner <= DBig::ZERO {
            return Err(RealError::DomainError(
                "logarithm of non-positive number".to_string(),
            ));
        }
        if self.inner == DBig::ONE {
            return Ok(Self::from_i64(0));
        }
        Ok(Self::approx(Self::with_work_precision(self.inner.clone()).ln()))
    }

    /// Base-10 logarithm, via ln(x)/ln(10).
    pub fn log10(&self) -> Result<Self, RealError> {
        if self.inner == DBig::ONE {
            return Ok(Self::from_i64(0));
        }
        let ln_x = self.ln()?;
        let ln_10 = Self::from_i64(10).ln()?;
        let quotient = &ln_x.inner / &ln_10.inner;
        Ok(Self::approx(quotient))
    }

    /// Exponential function (e^x)
    pub fn exp(&self) -> Self {
        if self.is_zero() {
            return Self::from_i64(1);
        }
        Self::approx(Self::with_work_precision(self.inner.clone()).exp())
    }

    /// Reduce an angle into [0, 2π) before running a Taylor series.
    fn reduce_angle(x: DBig) -> DBig {
        let two_pi = &Self::pi().inner * &DBig::from(2);
        let turns = (&x / &two_pi).floor();
        &x - &(&turns * &two_pi)
    }

    /// Sine (Taylor series after argument reduction)
    pub fn sin(&self) -> Self {
        if self.is_zero() {
            return Self { inner: DBig::ZERO, exact: self.exact };
        }
        let x = Self::reduce_angle(Self::with_work_precision(self.inner.clone()));
        let x_squared = &x * &x;

        let mut sum = x.clone();
        let mut term = x;
        for k in 1..60i64 {
            let denom = DBig::from((2 * k) * (2 * k + 1));
            term = -&term * &x_squared / denom;
            sum = &sum + &term;
        }
        Self::approx(sum)
    }

    /// Cosine (Taylor series after argument reduction)
    pub fn cos(&self) -> Self {
        if self.is_zero() {
            return Self { inner: DBig::ONE, exact: self.exact };
        }
        let x = Self::reduce_angle(Self::with_work_precision(self.inner.clone()));
        let x_squared = &x * &x;

        let one = DBig::ONE.with_precision(DEFAULT_PRECISION).value();
        let mut sum = one.clone();
        let mut term = one;
        for k in 1..60i64 {
            let denom = DBig::from((2 * k - 1) * (2 * k));
            term = -&term * &x_squared / denom;
            sum = &sum + &term;
        }
        Self::approx(sum)
    }

    /// Tangent (sin/cos)
    pub fn tan(&self) -> Result<Self, RealError> {
        let cos_x = self.cos();
        if cos_x.is_zero() {
            return Err(RealError::DomainError(
                "tan undefined at odd multiples of π/2".to_string(),
            ));
        }
        self.sin().checked_div(&cos_x)
    }

    /// Arctangent.
    ///
    /// Large arguments are inverted (atan(x) = ±π/2 - atan(1/x)) and the
    /// remainder halved (atan(x) = 2·atan(x/(1+√(1+x²)))) until the Taylor
    /// series converges quickly.
    pub fn atan(&self) -> Self {
        if self.is_zero() {
            return Self { inner: DBig::ZERO, exact: self.exact };
        }
        if self.is_negative() {
            return self.negate().atan().negate();
        }

        let one = DBig::ONE.with_precision(DEFAULT_PRECISION).value();
        let mut x = Self::with_work_precision(self.inner.clone());
        let mut flipped = false;
        if x > one {
            x = &one / &x;
            flipped = true;
        }

        // Halve until x < 1/4; at most a handful of steps from x <= 1.
        let quarter = &one / &DBig::from(4);
        let mut halvings = 0u32;
        while x > quarter {
            let sqrt_term = (&one + &(&x * &x)).sqrt();
            x = &x / &(&one + &sqrt_term);
            halvings += 1;
        }

        let x_squared = &x * &x;
        let mut sum = x.clone();
        let mut power = x;
        for k in 1..80i64 {
            power = -&power * &x_squared;
            sum = &sum + &(&power / &DBig::from(2 * k + 1));
        }
        for _ in 0..halvings {
            sum = &sum * &DBig::from(2);
        }
        if flipped {
            let half_pi = &Self::pi().inner / &DBig::from(2);
            sum = &half_pi - &sum;
        }
        Self::approx(sum)
    }

    /// Arcsine; |x| <= 1 or a domain error.
    pub fn asin(&self) -> Result<Self, RealError> {
        let one = Self::from_i64(1);
        if self.abs().inner > one.inner {
            return Err(RealError::DomainError(
                "arcsine argument outside [-1, 1]".to_string(),
            ));
        }
        if self.is_zero() {
            return Ok(Self { inner: DBig::ZERO, exact: self.exact });
        }
        if self.abs().inner == one.inner {
            let half_pi = Self::approx(&Self::pi().inner / &DBig::from(2));
            return Ok(if self.is_negative() { half_pi.negate() } else { half_pi });
        }
        // asin(x) = atan(x / sqrt(1 - x²))
        let denom = one.sub(&self.square()).sqrt()?;
        Ok(self.checked_div(&denom)?.atan())
    }

    /// Arccosine; |x| <= 1 or a domain error.
    pub fn acos(&self) -> Result<Self, RealError> {
        let half_pi = Self::approx(&Self::pi().inner / &DBig::from(2));
        Ok(half_pi.sub(&self.asin()?))
    }

    /// Factorial; defined for nonnegative integers up to an overflow cap.
    pub fn factorial(&self) -> Result<Self, RealError> {
        if !self.is_integer() || self.is_negative() {
            return Err(RealError::DomainError(
                "factorial of a value that is not a nonnegative integer".to_string(),
            ));
        }
        let n = self.to_i64().ok_or(RealError::Overflow)?;
        if n > MAX_FACTORIAL {
            return Err(RealError::Overflow);
        }
        let mut product = IBig::from(1u8);
        for k in 2..=n {
            product = product * IBig::from(k);
        }
        Ok(Self {
            inner: DBig::from_parts(product, 0),
            exact: self.exact,
        })
    }

    // ========== Mathematical Constants ==========

    /// Pi - from a high-precision string constant. Approximate by nature.
    pub fn pi() -> Self {
        const PI_DIGITS: &str =
            "3.141592653589793238462643383279502884197169399375105820974944592307816406286208998628";
        let inner: DBig = PI_DIGITS[..DEFAULT_PRECISION + 2]
            .parse()
            .unwrap_or(DBig::ZERO);
        Self::approx(inner)
    }

    /// Euler's number e
    pub fn e() -> Self {
        Self::from_i64(1).exp()
    }

    /// Degrees-per-radian conversion factor, 180/π.
    pub fn degrees_per_radian() -> Self {
        let full_turn = Self::with_work_precision(DBig::from(180));
        Self::approx(&full_turn / &Self::pi().inner)
    }

    // ========== Other Operations ==========

    /// Absolute value
    pub fn abs(&self) -> Self {
        Self {
            inner: Abs::abs(self.inner.clone()),
            exact: self.exact,
        }
    }

    /// Try to convert to i64
    pub fn to_i64(&self) -> Option<i64> {
        if !self.is_integer() {
            return None;
        }
        let (significand, exponent) = self.inner.clone().into_repr().into_parts();
        let sig: i64 = significand.try_into().ok()?;
        if exponent == 0 {
            Some(sig)
        } else if (1..=18).contains(&exponent) {
            sig.checked_mul(10_i64.checked_pow(exponent as u32)?)
        } else if (-18..0).contains(&exponent) {
            let divisor = 10_i64.checked_pow((-exponent) as u32)?;
            (sig % divisor == 0).then(|| sig / divisor)
        } else {
            None
        }
    }

    // ========== Display ==========

    /// Decimal digit string and scale of the underlying representation:
    /// value = (-1)^negative * digits * 10^exponent.
    fn decimal_parts(&self) -> (bool, String, isize) {
        let (significand, exponent) = self.inner.clone().into_repr().into_parts();
        let negative = significand < IBig::ZERO;
        let digits = if negative {
            format!("{}", -significand)
        } else {
            format!("{significand}")
        };
        (negative, digits, exponent)
    }

    /// Short display string for UI surfaces. At most [`DISPLAY_DIGITS`]
    /// significant digits; a trailing `…` marks values that are approximate
    /// or had digits cut.
    pub fn to_display(&self) -> String {
        let (s, cut) = self.format_short();
        if cut || !self.exact {
            format!("{s}{ELLIPSIS}")
        } else {
            s
        }
    }

    fn format_short(&self) -> (String, bool) {
        if self.is_zero() {
            return ("0".to_string(), false);
        }
        let (negative, mut digits, mut exponent) = self.decimal_parts();

        let mut cut = false;
        if digits.len() > DISPLAY_DIGITS {
            exponent += (digits.len() - DISPLAY_DIGITS) as isize;
            digits.truncate(DISPLAY_DIGITS);
            cut = true;
        }
        // Trailing zeros fold into the exponent.
        while digits.len() > 1 && digits.ends_with('0') {
            digits.pop();
            exponent += 1;
        }

        let sign = if negative { "-" } else { "" };
        // Decimal point position counted from the left of the digit string.
        let point = digits.len() as isize + exponent;
        let body = if exponent >= 0 && point <= DISPLAY_DIGITS as isize {
            let zeros = "0".repeat(exponent as usize);
            format!("{digits}{zeros}")
        } else if exponent < 0 && point > 0 {
            let (whole, frac) = digits.split_at(point as usize);
            format!("{whole}.{frac}")
        } else if exponent < 0 && point > -(DISPLAY_DIGITS as isize) / 2 {
            let zeros = "0".repeat((-point) as usize);
            format!("0.{zeros}{digits}")
        } else {
            // Scientific notation for everything far from 1.
            let mantissa = if digits.len() == 1 {
                digits
            } else {
                format!("{}.{}", &digits[..1], &digits[1..])
            };
            format!("{mantissa}E{}", point - 1)
        };
        (format!("{sign}{body}"), cut)
    }

    /// Lossless string form, `[-]digits e exponent`; parseable by
    /// [`Real::from_str`]. Used by the serde representation.
    pub fn to_repr_string(&self) -> String {
        let (negative, digits, exponent) = self.decimal_parts();
        let sign = if negative { "-" } else { "" };
        format!("{sign}{digits}e{exponent}")
    }
}

// ========== Trait Implementations ==========

impl std::fmt::Display for Real {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_display())
    }
}

impl Serialize for Real {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_repr_string())
    }
}

impl<'de> Deserialize<'de> for Real {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl PartialEq for Real {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for Real {}

impl PartialOrd for Real {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Real {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.inner
            .partial_cmp(&other.inner)
            .unwrap_or(std::cmp::Ordering::Equal)
    }
}
