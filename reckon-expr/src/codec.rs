//! Byte codec for expression buffers
//!
//! Layout: `i32` token count, then one record per token, each led by a
//! variant tag. All integers are little-endian; strings are `i32`
//! length-prefixed UTF-8; bools are one byte.
//!
//! Pre-evaluated tokens can nest entire sub-buffers, and the same result is
//! often embedded many times ("continue from last answer"), so each write
//! pass keeps a table from value identity to a back-reference index: the
//! first occurrence writes the full record, every later one just the index.
//! The read pass mirrors the table, re-running the evaluator once per fresh
//! index to repopulate the value. Both tables live in explicit per-pass
//! session objects; nothing leaks across passes.

use crate::buffer::ExprBuffer;
use crate::eval::{EvalContext, EvalError};
use crate::key::Key;
use crate::token::{Literal, PreEvaluated, Token};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::rc::Rc;
use thiserror::Error;

const TAG_CONSTANT: u8 = 0;
const TAG_OPERATOR: u8 = 1;
const TAG_PRE_EVAL: u8 = 2;

/// Strings longer than this are treated as corruption, not allocated.
const MAX_STRING_BYTES: i32 = 1 << 20;

/// Fatal format error: the stream does not decode to a buffer. Distinct
/// from both syntax and arithmetic evaluation failures.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("unrecognized token tag {0}")]
    BadTag(u8),

    #[error("unrecognized operator id {0}")]
    BadOperator(i32),

    #[error("invalid literal digits")]
    BadLiteral,

    #[error("back-reference to undefined index {0}")]
    BadBackref(i32),

    #[error("negative or oversized length field {0}")]
    BadLength(i32),

    #[error("invalid utf-8 in string field")]
    BadUtf8,

    #[error("stored subexpression failed to evaluate: {0}")]
    Reconstruct(#[source] EvalError),
}

/// One write pass. Create fresh per pass; a pass may span several buffers
/// (a history list) so shared values dedup across all of them.
#[derive(Debug, Default)]
pub struct WriteSession {
    /// Value identity (shared allocation) to back-reference index.
    indices: HashMap<usize, i32>,
}

impl WriteSession {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One read pass, mirroring [`WriteSession`]. Slots are reserved before
/// their record body is read so nested fresh indices line up with the
/// writer's allocation order.
#[derive(Debug, Default)]
pub struct ReadSession {
    slots: Vec<Option<Rc<PreEvaluated>>>,
}

impl ReadSession {
    pub fn new() -> Self {
        Self::default()
    }
}

// ========== Wire Primitives ==========

fn write_i32(w: &mut impl Write, v: i32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn read_i32(r: &mut impl Read) -> Result<i32, CodecError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn write_bool(w: &mut impl Write, v: bool) -> io::Result<()> {
    w.write_all(&[u8::from(v)])
}

fn read_u8(r: &mut impl Read) -> Result<u8, CodecError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_bool(r: &mut impl Read) -> Result<bool, CodecError> {
    Ok(read_u8(r)? != 0)
}

fn write_str(w: &mut impl Write, s: &str) -> io::Result<()> {
    write_i32(w, s.len() as i32)?;
    w.write_all(s.as_bytes())
}

fn read_str(r: &mut impl Read) -> Result<String, CodecError> {
    let len = read_i32(r)?;
    if !(0..=MAX_STRING_BYTES).contains(&len) {
        return Err(CodecError::BadLength(len));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| CodecError::BadUtf8)
}

// ========== Buffer Records ==========

/// Encode a buffer onto `w`, deduplicating pre-evaluated values through
/// `session`.
pub fn write_buffer(
    session: &mut WriteSession,
    w: &mut impl Write,
    buf: &ExprBuffer,
) -> Result<(), CodecError> {
    write_i32(w, buf.len() as i32)?;
    for token in buf.tokens() {
        match token {
            Token::Literal(lit) => {
                w.write_all(&[TAG_CONSTANT])?;
                write_str(w, lit.whole())?;
                write_bool(w, lit.point_seen())?;
                write_str(w, lit.frac())?;
                write_i32(w, lit.exponent())?;
            }
            Token::Operator(key) => {
                w.write_all(&[TAG_OPERATOR])?;
                write_i32(w, key.id())?;
            }
            Token::PreEvaluated(pre) => {
                w.write_all(&[TAG_PRE_EVAL])?;
                let identity = Rc::as_ptr(&pre.value) as usize;
                if let Some(&index) = session.indices.get(&identity) {
                    write_i32(w, index)?;
                } else {
                    let index = session.indices.len() as i32;
                    session.indices.insert(identity, index);
                    write_i32(w, index)?;
                    write_buffer(session, w, &pre.expr)?;
                    write_bool(w, pre.degree_mode)?;
                    write_str(w, &pre.display)?;
                }
            }
        }
    }
    Ok(())
}

/// Decode a buffer from `r`, resolving back-references through `session`.
/// Fresh pre-evaluated records re-run the evaluator over their stored
/// sub-buffer to rebuild the value.
pub fn read_buffer(
    session: &mut ReadSession,
    r: &mut impl Read,
) -> Result<ExprBuffer, CodecError> {
    let count = read_i32(r)?;
    if count < 0 {
        return Err(CodecError::BadLength(count));
    }
    let mut tokens = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let tag = read_u8(r)?;
        let token = match tag {
            TAG_CONSTANT => {
                let whole = read_str(r)?;
                let point_seen = read_bool(r)?;
                let frac = read_str(r)?;
                let exponent = read_i32(r)?;
                let lit = Literal::from_parts(whole, point_seen, frac, exponent)
                    .ok_or(CodecError::BadLiteral)?;
                Token::Literal(lit)
            }
            TAG_OPERATOR => {
                let id = read_i32(r)?;
                Token::Operator(Key::from_id(id).ok_or(CodecError::BadOperator(id))?)
            }
            TAG_PRE_EVAL => Token::PreEvaluated(read_pre_evaluated(session, r)?),
            other => return Err(CodecError::BadTag(other)),
        };
        tokens.push(token);
    }
    Ok(ExprBuffer::from_tokens(tokens))
}

fn read_pre_evaluated(
    session: &mut ReadSession,
    r: &mut impl Read,
) -> Result<Rc<PreEvaluated>, CodecError> {
    let index = read_i32(r)?;
    let slot = index as usize;
    if index >= 0 && slot < session.slots.len() {
        // A reserved-but-unfilled slot means the record references itself.
        return session.slots[slot]
            .clone()
            .ok_or(CodecError::BadBackref(index));
    }
    if index < 0 || slot != session.slots.len() {
        return Err(CodecError::BadBackref(index));
    }

    // First occurrence: reserve the slot before recursing so nested fresh
    // records take the indices the writer gave them.
    session.slots.push(None);
    let expr = read_buffer(session, r)?;
    let degree_mode = read_bool(r)?;
    let display = read_str(r)?;

    // Only successfully evaluated buffers are ever written, so a failure
    // here means the stream is corrupt.
    let value = expr
        .eval_with_context(EvalContext {
            degree_mode,
            prefix_len: expr.len(),
        })
        .map_err(CodecError::Reconstruct)?;

    let pre = Rc::new(PreEvaluated {
        value: Rc::new(value),
        expr,
        degree_mode,
        display,
    });
    session.slots[slot] = Some(Rc::clone(&pre));
    Ok(pre)
}

// ========== Whole-Stream Convenience ==========

/// Serialize one buffer as a standalone byte vector (fresh write pass).
pub fn to_bytes(buf: &ExprBuffer) -> Result<Vec<u8>, CodecError> {
    let mut session = WriteSession::new();
    let mut out = Vec::new();
    write_buffer(&mut session, &mut out, buf)?;
    Ok(out)
}

/// Deserialize one buffer from a standalone byte slice (fresh read pass).
pub fn from_bytes(bytes: &[u8]) -> Result<ExprBuffer, CodecError> {
    let mut session = ReadSession::new();
    let mut cursor = bytes;
    read_buffer(&mut session, &mut cursor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reckon_core::Real;

    fn buffer_of(keys: &[Key]) -> ExprBuffer {
        let mut buf = ExprBuffer::new();
        for &key in keys {
            assert!(buf.push_key(key), "keypress {key:?} unexpectedly rejected");
        }
        buf
    }

    fn abbreviated(keys: &[Key], degree_mode: bool) -> (ExprBuffer, Rc<Real>) {
        let buf = buffer_of(keys);
        let val = Rc::new(buf.eval(degree_mode).unwrap());
        let abbrev = buf.abbreviate(Rc::clone(&val), degree_mode, val.to_display());
        (abbrev, val)
    }

    mod round_trip_tests {
        use super::*;
        use Key::*;

        #[test]
        fn test_simple_round_trip() {
            let buf = buffer_of(&[D1, D2, Point, D5, Mul, LParen, D3, Add, D4, RParen]);
            let restored = from_bytes(&to_bytes(&buf).unwrap()).unwrap();
            assert_eq!(restored.to_string(), buf.to_string());
            assert_eq!(restored.eval(false).unwrap(), buf.eval(false).unwrap());
        }

        #[test]
        fn test_literal_exponent_round_trip() {
            let mut buf = buffer_of(&[D2, Point, D5]);
            assert!(buf.add_exponent(-12));
            let restored = from_bytes(&to_bytes(&buf).unwrap()).unwrap();
            assert_eq!(restored.to_string(), "2.5E-12");
            assert_eq!(restored.eval(false).unwrap(), buf.eval(false).unwrap());
        }

        #[test]
        fn test_trailing_operator_round_trip() {
            // A dangling binary operator serializes and still evaluates.
            let buf = buffer_of(&[D3, Add, D4, Add]);
            let restored = from_bytes(&to_bytes(&buf).unwrap()).unwrap();
            assert_eq!(restored.len(), 4);
            assert_eq!(restored.eval(false).unwrap().to_i64(), Some(7));
        }

        #[test]
        fn test_pre_evaluated_round_trip_recomputes_value() {
            let (abbrev, val) = abbreviated(&[D2, Add, D3], false);
            let mut outer = abbrev;
            outer.push_key(Mul);
            outer.push_key(D4);

            let restored = from_bytes(&to_bytes(&outer).unwrap()).unwrap();
            assert_eq!(restored.eval(false).unwrap().to_i64(), Some(20));

            let Token::PreEvaluated(pre) = &restored.tokens()[0] else {
                panic!("expected a pre-evaluated token");
            };
            assert_eq!(*pre.value, *val, "value recomputed from the sub-buffer");
            assert_eq!(pre.expr.to_string(), "2+3");
        }

        #[test]
        fn test_degree_mode_survives_round_trip() {
            // sin(30) abbreviated under degree mode must reconstruct to 0.5,
            // not to sin(30 radians).
            let (abbrev, val) = abbreviated(&[Sin, LParen, D3, D0, RParen], true);
            let restored = from_bytes(&to_bytes(&abbrev).unwrap()).unwrap();
            let Token::PreEvaluated(pre) = &restored.tokens()[0] else {
                panic!("expected a pre-evaluated token");
            };
            assert!(pre.degree_mode);
            assert_eq!(*pre.value, *val);
        }

        #[test]
        fn test_nested_pre_evaluated_round_trip() {
            // Abbreviate, embed, abbreviate again: two table entries deep.
            let (inner, _) = abbreviated(&[D2, Add, D3], false);
            let mut middle = inner;
            middle.push_key(Mul);
            middle.push_key(D4);
            let val = Rc::new(middle.eval(false).unwrap());
            let outer_abbrev = middle.abbreviate(Rc::clone(&val), false, val.to_display());
            let mut outer = outer_abbrev;
            outer.push_key(Add);
            outer.push_key(D1);

            let restored = from_bytes(&to_bytes(&outer).unwrap()).unwrap();
            assert_eq!(restored.eval(false).unwrap().to_i64(), Some(21));
        }
    }

    mod dedup_tests {
        use super::*;
        use Key::*;

        #[test]
        fn test_shared_value_written_once() {
            let (abbrev, _) = abbreviated(&[D2, Add, D3], false);

            // "ans + ans + ans + ans": four references to one value.
            let mut buf = ExprBuffer::new();
            let mut single = ExprBuffer::new();
            single.concat(&abbrev);
            for i in 0..4 {
                if i > 0 {
                    buf.push_key(Add);
                }
                buf.concat(&single);
            }

            let four = to_bytes(&buf).unwrap();
            assert_eq!(buf.eval(false).unwrap().to_i64(), Some(20));

            // Size must grow by a few bytes per extra reference, not by a
            // whole sub-buffer record.
            let mut two = ExprBuffer::new();
            two.concat(&single);
            two.push_key(Add);
            two.concat(&single);
            let two_bytes = to_bytes(&two).unwrap();
            let per_reference = 4 + 1 + 1 + 4; // +, tag, backref
            assert!(
                four.len() <= two_bytes.len() + 2 * (per_reference + 8),
                "repeat references must serialize as bare indices: {} vs {}",
                four.len(),
                two_bytes.len()
            );

            let restored = from_bytes(&four).unwrap();
            assert_eq!(restored.eval(false).unwrap().to_i64(), Some(20));

            // All four restored tokens share one allocation.
            let shared: Vec<&Rc<PreEvaluated>> = restored
                .tokens()
                .iter()
                .filter_map(|t| match t {
                    Token::PreEvaluated(p) => Some(p),
                    _ => None,
                })
                .collect();
            assert_eq!(shared.len(), 4);
            assert!(shared.iter().all(|p| Rc::ptr_eq(p, shared[0])));
        }

        #[test]
        fn test_distinct_values_get_distinct_indices() {
            let (a, _) = abbreviated(&[D2, Add, D3], false);
            let (b, _) = abbreviated(&[D1, D0], false);
            let mut buf = ExprBuffer::new();
            buf.concat(&a);
            buf.push_key(Add);
            buf.concat(&b);

            let restored = from_bytes(&to_bytes(&buf).unwrap()).unwrap();
            assert_eq!(restored.eval(false).unwrap().to_i64(), Some(15));
        }

        #[test]
        fn test_sessions_do_not_leak_across_passes() {
            let (abbrev, _) = abbreviated(&[D7], false);
            let bytes = to_bytes(&abbrev).unwrap();
            // Each standalone pass starts its table at index zero, so the
            // same stream decodes twice in a row.
            let first = from_bytes(&bytes).unwrap();
            let second = from_bytes(&bytes).unwrap();
            assert_eq!(first.eval(false).unwrap(), second.eval(false).unwrap());
        }

        #[test]
        fn test_one_session_spans_buffers() {
            let (abbrev, _) = abbreviated(&[D2, Add, D3], false);

            let mut session = WriteSession::new();
            let mut out = Vec::new();
            write_buffer(&mut session, &mut out, &abbrev).unwrap();
            let after_first = out.len();
            write_buffer(&mut session, &mut out, &abbrev).unwrap();
            let second_size = out.len() - after_first;
            assert!(
                second_size < after_first,
                "second buffer in the same pass reuses the table entry"
            );

            let mut read = ReadSession::new();
            let mut cursor = &out[..];
            let first = read_buffer(&mut read, &mut cursor).unwrap();
            let second = read_buffer(&mut read, &mut cursor).unwrap();
            assert_eq!(first.eval(false).unwrap(), second.eval(false).unwrap());
        }
    }

    mod corruption_tests {
        use super::*;
        use Key::*;

        #[test]
        fn test_bad_tag() {
            let mut bytes = to_bytes(&buffer_of(&[D1])).unwrap();
            bytes[4] = 9; // first token tag
            assert!(matches!(from_bytes(&bytes), Err(CodecError::BadTag(9))));
        }

        #[test]
        fn test_bad_operator_id() {
            let mut bytes = to_bytes(&buffer_of(&[D1, Add])).unwrap();
            // The operator id is the last i32 of the stream.
            let n = bytes.len();
            bytes[n - 4..].copy_from_slice(&999i32.to_le_bytes());
            assert!(matches!(
                from_bytes(&bytes),
                Err(CodecError::BadOperator(999))
            ));
        }

        #[test]
        fn test_bad_backref() {
            let (abbrev, _) = abbreviated(&[D7], false);
            let mut bytes = to_bytes(&abbrev).unwrap();
            // Backref index sits right after count and tag; 5 is undefined.
            bytes[5..9].copy_from_slice(&5i32.to_le_bytes());
            assert!(matches!(
                from_bytes(&bytes),
                Err(CodecError::BadBackref(5))
            ));
        }

        #[test]
        fn test_truncated_stream() {
            let bytes = to_bytes(&buffer_of(&[D1, Add, D2])).unwrap();
            let result = from_bytes(&bytes[..bytes.len() - 3]);
            assert!(matches!(result, Err(CodecError::Io(_))));
        }

        #[test]
        fn test_negative_count() {
            let bytes = (-1i32).to_le_bytes();
            assert!(matches!(
                from_bytes(&bytes),
                Err(CodecError::BadLength(-1))
            ));
        }
    }
}
