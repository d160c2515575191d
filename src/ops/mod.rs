//! Operations built on the expression engine
//!
//! ```text
//! lazy                         eager
//! ────                         ─────
//! + - * / neg                  eval / eval_with        → Tensor
//! abs sqrt square exp cast     sum / reduce (_with)    → scalar
//!   └─ n_operator nodes        matmul (_with)          → Tensor
//! ```
//!
//! The arithmetic operators and unary functions only build expression nodes.
//! Everything in the right-hand column walks its operands at once; the
//! `_with` variants take an [`ExecutionPolicy`](crate::runtime::ExecutionPolicy)
//! and split the work into disjoint tasks on its pool.

mod arithmetic;
mod eval;
mod matmul;
mod reduce;

pub use arithmetic::{abs, add, cast, div, exp, mul, neg, sqrt, square, sub};
pub use eval::{Evaluate, PARALLEL_GRAIN, eval, eval_with};
pub use matmul::{matmul, matmul_output_shape, matmul_with, matmul_with_plan};
pub use reduce::{reduce, reduce_with, sum, sum_with};
