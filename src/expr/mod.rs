//! Lazy elementwise expressions
//!
//! An expression node owns an element function and a tuple of operands
//! (tensors, scalars promoted to 0-d tensors, or other nodes) together with
//! the descriptor of their broadcast shape. Nothing is computed until the
//! node is traversed: by iteration, by [`crate::ops::eval`], or by
//! [`a_operator`] writing into a tensor.
//!
//! Traversal uses one of two strategies, picked once per pass by
//! [`Strategy::select`]:
//!
//! - a flat [`ExprIndexer`] when every leaf is dense in the node's order and
//!   nothing is broadcast,
//! - an [`ExprWalker`] moving one child walker per operand in lockstep
//!   otherwise.
//!
//! ```
//! use ndexpr::prelude::*;
//!
//! let a = Tensor::from_slice(&[1.0f64, 2.0, 3.0], &[3]);
//! let b = Tensor::from_slice(&[10.0f64, 20.0], &[2, 1]);
//! let node = n_operator(|x: f64, y: f64| x + y, (&a, &b)).unwrap();
//! assert_eq!(node.shape(), &[2, 3]);
//! assert_eq!(node.to_vec(), vec![11.0, 12.0, 13.0, 21.0, 22.0, 23.0]);
//! ```

mod core;
mod evaluator;
pub mod functors;
mod operand;
mod operator;

pub use self::core::{Expression, OperandTuple, UnaryExpression};
pub use evaluator::{
    DerefMap, ExprIndexer, ExprWalker, IndexerTuple, Strategy, UnaryIndexer, UnaryWalker,
    WalkerTuple,
};
pub use functors::{AssignOp, BindLhs, BindRhs, ElementFn};
pub use operand::{IntoOperand, Operand, TensorLike, TensorSlots};
pub use operator::{Operands, a_operator, n_operator};
