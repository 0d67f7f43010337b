//! Token model
//!
//! One expression element: a numeric literal under construction, an operator
//! or function reference, or a frozen prior evaluation result. Cloning a
//! token copies `Literal`s by value and shares `Operator`/`PreEvaluated`;
//! cloning a token sequence therefore gives exactly the
//! copy-literals/share-the-rest snapshot semantics the buffer relies on.

use crate::buffer::ExprBuffer;
use crate::key::Key;
use reckon_core::{Real, RealError, ELLIPSIS};
use std::rc::Rc;

/// Exponent digits stop being accepted beyond this magnitude.
const MAX_EXPONENT: i32 = 10_000;

/// One element of an expression buffer.
#[derive(Debug, Clone)]
pub enum Token {
    /// Numeric constant, mutable while it is the trailing token.
    Literal(Literal),
    /// Operator, function, parenthesis, or named constant. Immutable.
    Operator(Key),
    /// Frozen prior evaluation result. Immutable, shared by reference.
    PreEvaluated(Rc<PreEvaluated>),
}

impl Token {
    pub fn is_operator(&self) -> bool {
        matches!(self, Token::Operator(_))
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Literal(lit) => write!(f, "{lit}"),
            Token::Operator(key) => write!(f, "{key}"),
            Token::PreEvaluated(pre) => f.write_str(&pre.display),
        }
    }
}

/// Numeric-constant-under-construction.
///
/// Holds the keystrokes verbatim: whole-part digits, fraction digits, the
/// decimal point flag, and a scientific-notation exponent. The exponent is
/// nonzero only after an explicit [`Literal::set_exponent`]; while nonzero,
/// decimal-point and fraction edits are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Literal {
    whole: String,
    frac: String,
    point_seen: bool,
    exponent: i32,
}

impl Literal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from stored fields (codec path). Digit strings must be ASCII
    /// digits.
    pub fn from_parts(
        whole: String,
        point_seen: bool,
        frac: String,
        exponent: i32,
    ) -> Option<Self> {
        let digits_only =
            |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if !digits_only(&whole) || !digits_only(&frac) {
            return None;
        }
        Some(Self { whole, frac, point_seen, exponent })
    }

    /// Apply one digit or decimal-point keypress. Returns false and leaves
    /// the literal unchanged when the keypress is rejected: a second decimal
    /// point, a point after an exponent, or an exponent digit past the cap.
    pub fn push_key(&mut self, key: Key) -> bool {
        if key == Key::Point {
            if self.point_seen || self.exponent != 0 {
                return false;
            }
            self.point_seen = true;
            return true;
        }
        let Some(digit) = key.digit() else {
            return false;
        };
        if self.exponent != 0 {
            if self.exponent.abs() > MAX_EXPONENT {
                return false;
            }
            // Extend the exponent by one decimal digit in its sign direction.
            self.exponent = if self.exponent > 0 {
                10 * self.exponent + digit as i32
            } else {
                10 * self.exponent - digit as i32
            };
            return true;
        }
        if self.point_seen {
            self.frac.push(char::from(b'0' + digit as u8));
        } else {
            self.whole.push(char::from(b'0' + digit as u8));
        }
        true
    }

    /// Scientific-notation entry: set the exponent directly. Zero is a no-op.
    pub fn set_exponent(&mut self, exponent: i32) {
        if exponent != 0 {
            self.exponent = exponent;
        }
    }

    /// Undo one unit of entry: drop the last exponent digit, else the last
    /// fraction digit, else the decimal point, else the last whole digit.
    pub fn delete_unit(&mut self) {
        if self.exponent != 0 {
            self.exponent /= 10;
        } else if !self.frac.is_empty() {
            self.frac.pop();
        } else if self.point_seen {
            self.point_seen = false;
        } else {
            self.whole.pop();
        }
    }

    /// Empty iff no whole digits and no decimal point.
    pub fn is_empty(&self) -> bool {
        self.whole.is_empty() && !self.point_seen
    }

    pub fn whole(&self) -> &str {
        &self.whole
    }

    pub fn frac(&self) -> &str {
        &self.frac
    }

    pub fn point_seen(&self) -> bool {
        self.point_seen
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Exact numeric value of the digits typed so far.
    pub fn to_real(&self) -> Result<Real, RealError> {
        Real::from_literal(&self.whole, &self.frac, self.exponent)
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.whole)?;
        if self.point_seen {
            write!(f, ".{}", self.frac)?;
        }
        if self.exponent != 0 {
            write!(f, "E{}", self.exponent)?;
        }
        Ok(())
    }
}

/// Frozen prior evaluation result, with enough data to recompute it after
/// deserialization. Buffers reachable through this token are read-only.
#[derive(Debug)]
pub struct PreEvaluated {
    /// The evaluation result. Shared: identity of this allocation is the
    /// dedup key during serialization.
    pub value: Rc<Real>,
    /// The sub-expression that produced the value.
    pub expr: ExprBuffer,
    /// Degree mode the value was computed under.
    pub degree_mode: bool,
    /// Short display string, precomputed by the caller.
    pub display: String,
}

impl PreEvaluated {
    /// Whether the display string carries the truncation marker, i.e. shows
    /// fewer digits than the value has.
    pub fn is_abbreviated(&self) -> bool {
        self.display.contains(ELLIPSIS)
    }
}
