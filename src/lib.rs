//! # ndexpr
//!
//! **Lazy broadcasting expressions and cache-blocked matmul over dense
//! n-dimensional arrays.**
//!
//! ndexpr provides a strided tensor type with NumPy broadcasting semantics,
//! an expression-template engine that evaluates elementwise operations over
//! any number of operands without temporaries, and a BLIS-style matrix
//! multiplication with runtime-selected SIMD micro-kernels.
//!
//! ## Features
//!
//! - **Tensors**: shared, 64-byte aligned storage with zero-copy views
//!   (`broadcast_to`, `transpose`, `reshape`) in row- or column-major order
//! - **Lazy expressions**: `n_operator` and the arithmetic operators build
//!   nodes that are walked only when evaluated, reduced or iterated
//! - **In-place updates**: `a_operator` broadcasts a source onto a tensor
//! - **Matmul**: batched, broadcast, cache-blocked, AVX2+FMA for f32/f64
//! - **Parallelism**: an explicit `WorkerPool` passed through an
//!   `ExecutionPolicy`, never a global pool
//!
//! ## Quick Start
//!
//! ```rust
//! use ndexpr::prelude::*;
//!
//! let a = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
//! let b = Tensor::from_slice(&[10.0f32, 20.0, 30.0], &[3]);
//!
//! let c = (&a + &b)?;                    // lazy, shape [2, 3]
//! assert_eq!(c.sum(), 141.0);
//!
//! let d = matmul(&a, &a.transpose())?;   // [2, 3] · [3, 2]
//! assert_eq!(d.to_vec(), vec![14.0, 32.0, 32.0, 77.0]);
//!
//! let pool = WorkerPool::new(PoolConfig::with_workers(2))?;
//! let e = c.eval_with(&ExecutionPolicy::Parallel(&pool));
//! assert_eq!(e.to_vec(), vec![11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);
//! # Ok::<(), ndexpr::error::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `simd` (default): AVX2+FMA matmul micro-kernels, selected at runtime

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod dtype;
pub mod error;
pub mod expr;
pub mod ops;
pub mod runtime;
pub mod tensor;
pub mod walker;

/// Prelude module for convenient imports
///
/// ```
/// use ndexpr::prelude::*;
/// ```
pub mod prelude {
    pub use crate::dtype::{DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::expr::{Operand, a_operator, n_operator};
    pub use crate::ops::{Evaluate, matmul, matmul_with};
    pub use crate::runtime::{ExecutionPolicy, PoolConfig, WorkerPool};
    pub use crate::tensor::{Layout, Order, Tensor};
}
