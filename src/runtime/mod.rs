//! Execution runtime for eager operations
//!
//! ```text
//! runtime
//! ├── WorkerPool       (explicitly constructed, bounded job queue)
//! ├── ExecutionPolicy  (Sequential or Parallel(&WorkerPool))
//! └── cpu::kernels     (cache-blocked matmul, SIMD micro-kernels)
//! ```
//!
//! There is no global pool. Parallel entry points such as
//! [`crate::ops::matmul_with`] and [`crate::ops::eval_with`] take the policy
//! as an argument.

pub mod cpu;
mod policy;
mod pool;

pub use policy::{ExecutionPolicy, split_range};
pub use pool::{PoolConfig, Scope, WorkerPool};
