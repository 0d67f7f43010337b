//! Expression buffer
//!
//! An ordered, mutable token sequence built one keypress at a time. Only the
//! trailing token is ever edited in place; everything earlier is committed.
//! Buffers reachable from a `PreEvaluated` token are frozen snapshots and
//! must be treated as read-only.

use crate::key::Key;
use crate::token::{Literal, PreEvaluated, Token};
use reckon_core::Real;
use std::rc::Rc;

/// Ordered token sequence in left-to-right reading order.
#[derive(Debug, Clone, Default)]
pub struct ExprBuffer {
    tokens: Vec<Token>,
}

impl ExprBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn last_operator(&self) -> Option<Key> {
        match self.tokens.last() {
            Some(Token::Operator(key)) => Some(*key),
            _ => None,
        }
    }

    // ========== Edit Operations ==========

    /// Apply one keypress. Returns false when the edit is rejected; a
    /// rejected edit leaves the buffer unchanged.
    pub fn push_key(&mut self, key: Key) -> bool {
        // A non-prefix binary operator needs a left operand, and quietly
        // replaces any trailing binary operators already entered. Minus is
        // exempt: it appends as a unary prefix instead.
        if key.is_binary() && !key.is_prefix() {
            match self.last_operator() {
                _ if self.is_empty() => return false,
                Some(op)
                    if op == Key::LParen
                        || op.is_function()
                        || (op.is_prefix() && op != Key::Sub) =>
                {
                    return false;
                }
                _ => {}
            }
            while self.ends_with_binary_op() {
                self.tokens.pop();
            }
            self.tokens.push(Token::Operator(key));
            return true;
        }

        // Constant material extends the trailing literal, starting a fresh
        // one (behind an explicit multiplication, after a pre-evaluated
        // token) when the tail is not a literal.
        if key.digit().is_some() || key == Key::Point {
            if let Some(Token::Literal(lit)) = self.tokens.last_mut() {
                return lit.push_key(key);
            }
            if matches!(self.tokens.last(), Some(Token::PreEvaluated(_))) {
                self.tokens.push(Token::Operator(Key::Mul));
            }
            let mut lit = Literal::new();
            let accepted = lit.push_key(key);
            self.tokens.push(Token::Literal(lit));
            return accepted;
        }

        self.tokens.push(Token::Operator(key));
        true
    }

    /// Scientific-notation entry on the trailing literal. Zero is a no-op;
    /// rejected when the buffer does not end with a literal.
    pub fn add_exponent(&mut self, exponent: i32) -> bool {
        if exponent == 0 {
            return true;
        }
        match self.tokens.last_mut() {
            Some(Token::Literal(lit)) => {
                lit.set_exponent(exponent);
                true
            }
            _ => false,
        }
    }

    /// Undo one unit of entry: a trailing literal gives up one keystroke and
    /// stays if anything remains; otherwise the trailing token is removed.
    pub fn delete(&mut self) {
        if let Some(Token::Literal(lit)) = self.tokens.last_mut() {
            lit.delete_unit();
            if !lit.is_empty() {
                return;
            }
        }
        self.tokens.pop();
    }

    /// Drop any run of trailing `+`/`−` operators.
    pub fn remove_trailing_additive(&mut self) {
        while matches!(self.last_operator(), Some(op) if op.is_additive()) {
            self.tokens.pop();
        }
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    /// Concatenate another buffer onto this one (paste). Two adjacent
    /// non-operator tokens would read as one run, so an explicit
    /// multiplication is inserted at such a junction. The other buffer is
    /// not touched; literals are copied, the rest shared.
    pub fn concat(&mut self, other: &ExprBuffer) {
        if !self.is_empty()
            && !other.is_empty()
            && !matches!(self.tokens.last(), Some(t) if t.is_operator())
            && !matches!(other.tokens.first(), Some(t) if t.is_operator())
        {
            self.tokens.push(Token::Operator(Key::Mul));
        }
        self.tokens.extend(other.tokens.iter().cloned());
    }

    /// Collapse this buffer into a new single-token buffer holding a frozen
    /// snapshot of its content plus the already-computed value and display
    /// string. Does no evaluation itself; the caller guarantees the value
    /// was computed from exactly this content under `degree_mode`. O(size).
    pub fn abbreviate(&self, value: Rc<Real>, degree_mode: bool, display: String) -> ExprBuffer {
        let snapshot = ExprBuffer {
            tokens: self.tokens.clone(),
        };
        ExprBuffer {
            tokens: vec![Token::PreEvaluated(Rc::new(PreEvaluated {
                value,
                expr: snapshot,
                degree_mode,
                display,
            }))],
        }
    }

    // ========== Queries ==========

    pub fn ends_with_literal(&self) -> bool {
        matches!(self.tokens.last(), Some(Token::Literal(_)))
    }

    pub fn ends_with_binary_op(&self) -> bool {
        matches!(self.last_operator(), Some(op) if op.is_binary())
    }

    /// Exactly one literal token: a bare constant.
    pub fn is_single_literal(&self) -> bool {
        self.tokens.len() == 1 && matches!(self.tokens[0], Token::Literal(_))
    }

    /// Index of the first token of the trailing binary-operator run; equals
    /// `len()` when there is none. This is the prefix length evaluation
    /// uses, so a dangling binary operator never poisons the result.
    pub fn trailing_binary_start(&self) -> usize {
        let mut start = self.tokens.len();
        while start > 0 {
            match &self.tokens[start - 1] {
                Token::Operator(op) if op.is_binary() => start -= 1,
                _ => break,
            }
        }
        start
    }

    /// Whether evaluation would show the user anything beyond what they
    /// typed: any operator, or any abbreviated pre-evaluated value, ignoring
    /// a leading unary minus and the trailing binary-operator run.
    pub fn has_interesting_content(&self) -> bool {
        let end = self.trailing_binary_start();
        let mut start = 0;
        if end > start && matches!(self.tokens.first(), Some(Token::Operator(Key::Sub))) {
            // A leading minus is not by itself interesting.
            start += 1;
        }
        self.tokens[start..end].iter().any(|t| match t {
            Token::Operator(_) => true,
            Token::PreEvaluated(pre) => pre.is_abbreviated(),
            Token::Literal(_) => false,
        })
    }

    /// Whether any trig function appears anywhere; drives the degree/radian
    /// mode indicator.
    pub fn has_trig_function(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| matches!(t, Token::Operator(op) if op.is_trig()))
    }
}

impl std::fmt::Display for ExprBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for token in &self.tokens {
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_of(keys: &[Key]) -> ExprBuffer {
        let mut buf = ExprBuffer::new();
        for &key in keys {
            assert!(buf.push_key(key), "keypress {key:?} unexpectedly rejected");
        }
        buf
    }

    mod edit_tests {
        use super::*;
        use Key::*;

        #[test]
        fn test_binary_needs_left_operand() {
            let mut buf = ExprBuffer::new();
            assert!(!buf.push_key(Add), "no operand yet");
            assert!(buf.is_empty());

            let mut buf = buffer_of(&[LParen]);
            assert!(!buf.push_key(Mul), "open paren cannot precede ×");

            let mut buf = buffer_of(&[Sin]);
            assert!(!buf.push_key(Div), "function cannot precede ÷");

            let mut buf = buffer_of(&[Sqrt]);
            assert!(!buf.push_key(Add), "√ cannot precede +");
        }

        #[test]
        fn test_binary_operator_replacement() {
            let mut buf = buffer_of(&[D5, Add]);
            assert!(buf.push_key(Mul));
            assert_eq!(buf.to_string(), "5×", "+ replaced by ×");
        }

        #[test]
        fn test_minus_appends_as_unary_prefix() {
            let mut buf = buffer_of(&[D5, Add]);
            assert!(buf.push_key(Sub));
            assert_eq!(buf.to_string(), "5+−", "trailing − kept as unary minus");

            // A following × strips the whole binary run.
            assert!(buf.push_key(Mul));
            assert_eq!(buf.to_string(), "5×");
        }

        #[test]
        fn test_leading_minus_allowed() {
            let mut buf = ExprBuffer::new();
            assert!(buf.push_key(Sub));
            assert!(buf.push_key(D3));
            assert_eq!(buf.to_string(), "−3");
        }

        #[test]
        fn test_implicit_mul_after_pre_evaluated() {
            let base = buffer_of(&[D2, Add, D3]);
            let val = Rc::new(base.eval(false).unwrap());
            let mut buf = base.abbreviate(Rc::clone(&val), false, val.to_display());
            assert!(buf.push_key(D4));
            assert_eq!(buf.len(), 3, "pre-eval, implicit ×, new literal");
            assert!(matches!(buf.tokens()[1], Token::Operator(Mul)));
        }

        #[test]
        fn test_typing_then_deleting_restores_empty() {
            let keys = [D1, D2, Point, D3, Add, D4, Sqrt, D5];
            let mut buf = ExprBuffer::new();
            let mut accepted = 0;
            for &key in &keys {
                if buf.push_key(key) {
                    accepted += 1;
                }
            }
            for _ in 0..accepted {
                buf.delete();
            }
            assert!(buf.is_empty(), "n deletes after n accepted keypresses");
        }

        #[test]
        fn test_delete_on_empty_is_noop() {
            let mut buf = ExprBuffer::new();
            buf.delete();
            assert!(buf.is_empty());
        }

        #[test]
        fn test_delete_eats_literal_one_unit_at_a_time() {
            let mut buf = buffer_of(&[D1, D2, Add, D3, D4]);
            buf.delete();
            assert_eq!(buf.to_string(), "12+3");
            buf.delete();
            assert_eq!(buf.to_string(), "12+", "empty literal removed as a token");
            buf.delete();
            assert_eq!(buf.to_string(), "12");
        }

        #[test]
        fn test_add_exponent_targets_trailing_literal() {
            let mut buf = buffer_of(&[D2]);
            assert!(buf.add_exponent(8));
            assert_eq!(buf.to_string(), "2E8");

            let mut buf = buffer_of(&[D2, Add]);
            assert!(!buf.add_exponent(8), "no trailing literal");
            assert!(buf.add_exponent(0), "zero is a no-op, not a failure");
        }

        #[test]
        fn test_remove_trailing_additive() {
            let mut buf = buffer_of(&[D7, Add, Sub]);
            buf.remove_trailing_additive();
            assert_eq!(buf.to_string(), "7");

            let mut buf = buffer_of(&[D7, Mul]);
            buf.remove_trailing_additive();
            assert_eq!(buf.to_string(), "7×", "× is not additive");
        }

        #[test]
        fn test_clear() {
            let mut buf = buffer_of(&[D1, Add, D2]);
            buf.clear();
            assert!(buf.is_empty());
        }
    }

    mod concat_tests {
        use super::*;
        use Key::*;

        #[test]
        fn test_concat_inserts_implicit_mul() {
            let mut left = buffer_of(&[D2]);
            let right = buffer_of(&[D3]);
            left.concat(&right);
            assert_eq!(left.to_string(), "2×3");
        }

        #[test]
        fn test_concat_no_mul_when_junction_has_operator() {
            let mut left = buffer_of(&[D2, Add]);
            let right = buffer_of(&[D3]);
            left.concat(&right);
            assert_eq!(left.to_string(), "2+3");

            let mut left = buffer_of(&[D2]);
            let right = buffer_of(&[Sub, D3]);
            left.concat(&right);
            assert_eq!(left.to_string(), "2−3");
        }

        #[test]
        fn test_concat_leaves_source_untouched() {
            let mut left = buffer_of(&[D2]);
            let right = buffer_of(&[D3, Add, D4]);
            left.concat(&right);
            assert_eq!(right.to_string(), "3+4");
            // Editing the receiver afterwards must not reach the source.
            left.push_key(D9);
            assert_eq!(right.to_string(), "3+4");
        }
    }

    mod query_tests {
        use super::*;
        use Key::*;

        #[test]
        fn test_trailing_binary_start() {
            assert_eq!(buffer_of(&[D3, Add, D4]).trailing_binary_start(), 3);
            assert_eq!(buffer_of(&[D3, Add, D4, Add]).trailing_binary_start(), 3);
            assert_eq!(buffer_of(&[D3, Add, Sub]).trailing_binary_start(), 1);
            assert_eq!(ExprBuffer::new().trailing_binary_start(), 0);
        }

        #[test]
        fn test_is_single_literal() {
            assert!(buffer_of(&[D4, D2]).is_single_literal());
            assert!(!buffer_of(&[D4, Add]).is_single_literal());
            assert!(!ExprBuffer::new().is_single_literal());
        }

        #[test]
        fn test_ends_with_queries() {
            assert!(buffer_of(&[D1]).ends_with_literal());
            assert!(buffer_of(&[D1, Add]).ends_with_binary_op());
            assert!(!buffer_of(&[D1, Fact]).ends_with_binary_op());
        }

        #[test]
        fn test_has_interesting_content() {
            assert!(!buffer_of(&[D4, D2]).has_interesting_content(), "bare constant");
            assert!(
                !buffer_of(&[Sub, D4]).has_interesting_content(),
                "leading minus alone is not interesting"
            );
            assert!(
                !buffer_of(&[D4, Add]).has_interesting_content(),
                "trailing binary run is ignored"
            );
            assert!(buffer_of(&[D4, Add, D2]).has_interesting_content());
            assert!(buffer_of(&[Sub, D4, Fact]).has_interesting_content());
        }

        #[test]
        fn test_interesting_content_sees_abbreviated_pre_eval() {
            let third = buffer_of(&[D1, Div, D3]);
            let val = Rc::new(third.eval(false).unwrap());
            let abbreviated = third.abbreviate(Rc::clone(&val), false, val.to_display());
            assert!(
                abbreviated.has_interesting_content(),
                "a truncated result hides digits, so it is interesting"
            );

            let exact = buffer_of(&[D7]);
            let val = Rc::new(exact.eval(false).unwrap());
            let plain = exact.abbreviate(Rc::clone(&val), false, val.to_display());
            assert!(!plain.has_interesting_content());
        }

        #[test]
        fn test_has_trig_function() {
            assert!(buffer_of(&[Sin, LParen, D3, RParen]).has_trig_function());
            assert!(!buffer_of(&[Ln, LParen, D3, RParen]).has_trig_function());
        }
    }

    mod abbreviate_tests {
        use super::*;
        use Key::*;

        #[test]
        fn test_abbreviate_is_single_frozen_token() {
            let buf = buffer_of(&[D2, Add, D3]);
            let val = Rc::new(buf.eval(false).unwrap());
            let abbrev = buf.abbreviate(Rc::clone(&val), false, val.to_display());
            assert_eq!(abbrev.len(), 1);
            let Token::PreEvaluated(pre) = &abbrev.tokens()[0] else {
                panic!("expected a pre-evaluated token");
            };
            assert_eq!(pre.expr.to_string(), "2+3");
            assert!(Rc::ptr_eq(&pre.value, &val));
        }

        #[test]
        fn test_abbreviate_snapshot_is_isolated_from_source_edits() {
            let mut buf = buffer_of(&[D2, D0]);
            let val = Rc::new(buf.eval(false).unwrap());
            let abbrev = buf.abbreviate(Rc::clone(&val), false, val.to_display());
            buf.push_key(D9);
            let Token::PreEvaluated(pre) = &abbrev.tokens()[0] else {
                panic!("expected a pre-evaluated token");
            };
            assert_eq!(pre.expr.to_string(), "20", "snapshot keeps the literal as it was");
        }
    }
}
