//! Expression evaluator
//!
//! Recursive descent over the token sequence, straight to a `Real` with no
//! intermediate parse tree. Precedence, highest first: unary (literals,
//! parens, functions, √), postfix suffixes (! ² %), power, sign, term
//! (with juxtaposition as multiplication), and finally addition/subtraction
//! with the calculator percent special case.

use crate::buffer::ExprBuffer;
use crate::key::Key;
use crate::token::Token;
use reckon_core::{Real, RealError};
use thiserror::Error;

/// Nesting bound for the descent; deeper input fails as a syntax error
/// instead of overflowing the stack.
const MAX_DEPTH: usize = 512;

/// Evaluation failure.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// Malformed or incomplete expression: unexpected end of tokens,
    /// unconsumed tokens after the parse, nesting too deep.
    #[error("syntax error in expression")]
    Syntax,
    /// Arithmetic failure from the numeric layer, propagated unmodified.
    #[error(transparent)]
    Arithmetic(#[from] RealError),
}

/// What evaluation runs under: the angle mode and how many leading tokens
/// are eligible. The prefix length excludes a trailing binary-operator run
/// so a half-typed expression still evaluates.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext {
    pub degree_mode: bool,
    pub prefix_len: usize,
}

impl ExprBuffer {
    /// Evaluate, tolerating a trailing run of binary operators.
    pub fn eval(&self, degree_mode: bool) -> Result<Real, EvalError> {
        self.eval_with_context(EvalContext {
            degree_mode,
            prefix_len: self.trailing_binary_start(),
        })
    }

    /// Evaluate exactly `ctx.prefix_len` leading tokens; anything less or
    /// more than a full parse of that prefix is a syntax error.
    pub fn eval_with_context(&self, ctx: EvalContext) -> Result<Real, EvalError> {
        let ev = Evaluator {
            tokens: self.tokens(),
            ctx,
        };
        let (pos, val) = ev.expr(0, 0)?;
        if pos != ctx.prefix_len {
            return Err(EvalError::Syntax);
        }
        Ok(val)
    }
}

struct Evaluator<'a> {
    tokens: &'a [Token],
    ctx: EvalContext,
}

/// Position of the first unconsumed token, plus the value so far.
type EvalStep = (usize, Real);

impl Evaluator<'_> {
    fn token(&self, i: usize) -> Result<&Token, EvalError> {
        if i >= self.ctx.prefix_len {
            return Err(EvalError::Syntax);
        }
        Ok(&self.tokens[i])
    }

    fn is_operator(&self, i: usize, key: Key) -> bool {
        i < self.ctx.prefix_len
            && matches!(&self.tokens[i], Token::Operator(k) if *k == key)
    }

    fn descend(&self, depth: usize) -> Result<usize, EvalError> {
        if depth >= MAX_DEPTH {
            return Err(EvalError::Syntax);
        }
        Ok(depth + 1)
    }

    fn to_radians(&self, x: Real) -> Result<Real, EvalError> {
        if self.ctx.degree_mode {
            Ok(x.checked_div(&Real::degrees_per_radian())?)
        } else {
            Ok(x)
        }
    }

    fn from_radians(&self, x: Real) -> Real {
        if self.ctx.degree_mode {
            x.mul(&Real::degrees_per_radian())
        } else {
            x
        }
    }

    fn apply_function(&self, key: Key, arg: Real) -> Result<Real, EvalError> {
        Ok(match key {
            Key::Sin => self.to_radians(arg)?.sin(),
            Key::Cos => self.to_radians(arg)?.cos(),
            Key::Tan => self.to_radians(arg)?.tan()?,
            Key::Asin => self.from_radians(arg.asin()?),
            Key::Acos => self.from_radians(arg.acos()?),
            Key::Atan => self.from_radians(arg.atan()),
            Key::Ln => arg.ln()?,
            Key::Log => arg.log10()?,
            Key::Exp => arg.exp(),
            _ => return Err(EvalError::Syntax),
        })
    }

    fn unary(&self, i: usize, depth: usize) -> Result<EvalStep, EvalError> {
        let depth = self.descend(depth)?;
        match self.token(i)? {
            Token::Literal(lit) => Ok((i + 1, lit.to_real()?)),
            Token::PreEvaluated(pre) => Ok((i + 1, (*pre.value).clone())),
            Token::Operator(op) => match op {
                Key::Pi => Ok((i + 1, Real::pi())),
                Key::E => Ok((i + 1, Real::e())),
                Key::Sqrt => {
                    // √ binds tighter than unary minus but still admits one.
                    if self.is_operator(i + 1, Key::Sub) {
                        let (pos, val) = self.unary(i + 2, depth)?;
                        Ok((pos, val.negate().sqrt()?))
                    } else {
                        let (pos, val) = self.unary(i + 1, depth)?;
                        Ok((pos, val.sqrt()?))
                    }
                }
                Key::LParen => {
                    let (mut pos, val) = self.expr(i + 1, depth)?;
                    if self.is_operator(pos, Key::RParen) {
                        pos += 1;
                    }
                    Ok((pos, val))
                }
                op if op.is_function() => {
                    if !self.is_operator(i + 1, Key::LParen) {
                        return Err(EvalError::Syntax);
                    }
                    let (mut pos, arg) = self.expr(i + 2, depth)?;
                    if self.is_operator(pos, Key::RParen) {
                        pos += 1;
                    }
                    Ok((pos, self.apply_function(*op, arg)?))
                }
                _ => Err(EvalError::Syntax),
            },
        }
    }

    /// Postfix suffixes fold left and repeat: `3!!` is (3!)!.
    fn suffix(&self, i: usize, depth: usize) -> Result<EvalStep, EvalError> {
        let (mut pos, mut val) = self.unary(i, depth)?;
        loop {
            if self.is_operator(pos, Key::Fact) {
                val = val.factorial()?;
            } else if self.is_operator(pos, Key::Square) {
                val = val.square();
            } else if self.is_operator(pos, Key::Percent) {
                val = val.checked_div(&Real::from_i64(100))?;
            } else {
                return Ok((pos, val));
            }
            pos += 1;
        }
    }

    /// Power is right-associative through the signed-factor recursion.
    fn factor(&self, i: usize, depth: usize) -> Result<EvalStep, EvalError> {
        let (mut pos, mut val) = self.suffix(i, depth)?;
        if self.is_operator(pos, Key::Pow) {
            let (exp_pos, exponent) = self.signed_factor(pos + 1, depth)?;
            pos = exp_pos;
            val = val.pow(&exponent)?;
        }
        Ok((pos, val))
    }

    fn signed_factor(&self, i: usize, depth: usize) -> Result<EvalStep, EvalError> {
        let depth = self.descend(depth)?;
        if self.is_operator(i, Key::Sub) {
            let (pos, val) = self.factor(i + 1, depth)?;
            Ok((pos, val.negate()))
        } else {
            self.factor(i, depth)
        }
    }

    /// Whether the token at `i` may open a new juxtaposed factor. A binary
    /// operator, a factorial, or a close paren cannot.
    fn can_start_factor(&self, i: usize) -> bool {
        if i >= self.ctx.prefix_len {
            return false;
        }
        match &self.tokens[i] {
            Token::Operator(op) => {
                !(op.is_binary() || *op == Key::Fact || *op == Key::RParen)
            }
            _ => true,
        }
    }

    fn term(&self, i: usize, depth: usize) -> Result<EvalStep, EvalError> {
        let (mut pos, mut val) = self.signed_factor(i, depth)?;
        loop {
            let (divide, next) = if self.is_operator(pos, Key::Mul) {
                (false, pos + 1)
            } else if self.is_operator(pos, Key::Div) {
                (true, pos + 1)
            } else if self.can_start_factor(pos) {
                // Juxtaposition: adjacent factors multiply.
                (false, pos)
            } else {
                return Ok((pos, val));
            };
            let (rhs_pos, rhs) = self.signed_factor(next, depth)?;
            val = if divide {
                val.checked_div(&rhs)?
            } else {
                val.mul(&rhs)
            };
            pos = rhs_pos;
        }
    }

    /// The percent special case: right after `+`/`−`, a bare
    /// literal-or-pre-evaluated operand followed by `%` and then nothing,
    /// another additive operator, or a close paren.
    fn is_percent_pattern(&self, pos: usize) -> bool {
        if pos + 1 >= self.ctx.prefix_len || !self.is_operator(pos + 1, Key::Percent) {
            return false;
        }
        if self.tokens[pos].is_operator() {
            return false;
        }
        if pos + 2 == self.ctx.prefix_len {
            return true;
        }
        match &self.tokens[pos + 2] {
            Token::Operator(op) => op.is_additive() || *op == Key::RParen,
            _ => false,
        }
    }

    fn expr(&self, i: usize, depth: usize) -> Result<EvalStep, EvalError> {
        let depth = self.descend(depth)?;
        let (mut pos, mut val) = self.term(i, depth)?;
        loop {
            let is_plus = self.is_operator(pos, Key::Add);
            if !is_plus && !self.is_operator(pos, Key::Sub) {
                return Ok((pos, val));
            }
            if self.is_percent_pattern(pos + 1) {
                // "A + N%" adjusts the running total: A × (1 ± N/100).
                let (operand_pos, operand) = self.unary(pos + 1, depth)?;
                let mut fraction = operand.checked_div(&Real::from_i64(100))?;
                if !is_plus {
                    fraction = fraction.negate();
                }
                val = val.mul(&Real::from_i64(1).add(&fraction));
                pos = operand_pos + 1; // consume the percent sign
            } else {
                let (rhs_pos, rhs) = self.term(pos + 1, depth)?;
                val = if is_plus { val.add(&rhs) } else { val.sub(&rhs) };
                pos = rhs_pos;
            }
        }
    }
}
