//! Reckon Expr - incrementally-editable expression engine
//!
//! An expression is a token sequence built one keypress at a time:
//! - `Key`: the keypad catalog (operator ids, classification, labels)
//! - `Token` / `Literal` / `PreEvaluated`: one expression element
//! - `ExprBuffer`: the editable sequence plus its edit operations
//! - evaluation: recursive descent straight to a `reckon_core::Real`
//! - codec: byte serialization with per-pass value deduplication
//!
//! Buffers are not internally synchronized; callers serialize edits and
//! evaluation themselves, and run evaluation off latency-sensitive threads
//! (pathological inputs can take arbitrarily long).

mod buffer;
mod codec;
mod eval;
mod key;
mod token;

pub use buffer::ExprBuffer;
pub use codec::{
    from_bytes, read_buffer, to_bytes, write_buffer, CodecError, ReadSession, WriteSession,
};
pub use eval::{EvalContext, EvalError};
pub use key::Key;
pub use token::{Literal, PreEvaluated, Token};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{EvalError, ExprBuffer, Key, Token};
    pub use reckon_core::{Real, RealError};
}
