//! Materialising operands into owned tensors

use super::reduce;
use crate::dtype::Element;
use crate::expr::{Operand, Strategy};
use crate::runtime::{ExecutionPolicy, split_range};
use crate::tensor::{Layout, Storage, Tensor};

/// Minimum number of elements per task of a parallel traversal
pub const PARALLEL_GRAIN: usize = 4096;

/// Evaluate every element of `operand` into a new dense tensor
///
/// The result has the operand's shape and is laid out in the operand's
/// order, so a trivial operand is copied through its flat indexer.
pub fn eval<O>(operand: &O) -> Tensor<O::Item>
where
    O: Operand,
    O::Item: Element,
{
    let (shape, order, size) = (operand.shape(), operand.order(), operand.size());
    let mut storage = Storage::zeroed(size);
    if let Some(out) = storage.as_mut_slice() {
        Strategy::select(operand).fold_range(shape, order, 0..size, 0, |i, x| {
            out[i] = x;
            i + 1
        });
    }
    Tensor::from_parts(storage, Layout::contiguous_with_order(shape, order))
}

/// [`eval`] split into contiguous ranges of the output, one task each
///
/// Operands smaller than two [`PARALLEL_GRAIN`]s, and the sequential
/// policy, run on the calling thread.
pub fn eval_with<O>(policy: &ExecutionPolicy<'_>, operand: &O) -> Tensor<O::Item>
where
    O: Operand + Sync,
    O::Item: Element,
{
    let size = operand.size();
    let tasks = policy.tasks_for(size, PARALLEL_GRAIN);
    let pool = match policy.pool() {
        Some(pool) if tasks > 1 => pool,
        _ => return eval(operand),
    };

    let (shape, order) = (operand.shape(), operand.order());
    log::debug!("eval {:?} in {} tasks", shape, tasks);

    let mut storage = Storage::zeroed(size);
    if let Some(data) = storage.as_mut_slice() {
        pool.scope(|s| {
            let mut rest = data;
            for range in split_range(size, tasks) {
                let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
                rest = tail;
                s.spawn(move || {
                    Strategy::select(operand).fold_range(shape, order, range, 0, |i, x| {
                        chunk[i] = x;
                        i + 1
                    });
                });
            }
        });
    }
    Tensor::from_parts(storage, Layout::contiguous_with_order(shape, order))
}

/// Eager consumers available on every operand
///
/// ```
/// use ndexpr::prelude::*;
///
/// let a = Tensor::from_slice(&[1.0f64, 2.0, 3.0], &[3]);
/// let b = Tensor::from_slice(&[10.0f64], &[1]);
/// let node = (&a * &b).unwrap();
/// assert_eq!(node.sum(), 60.0);
/// assert_eq!(node.eval().to_vec(), vec![10.0, 20.0, 30.0]);
/// ```
pub trait Evaluate: Operand<Item: Element> + Sized {
    /// See [`eval`]
    fn eval(&self) -> Tensor<Self::Item> {
        eval(self)
    }

    /// See [`eval_with`]
    fn eval_with(&self, policy: &ExecutionPolicy<'_>) -> Tensor<Self::Item>
    where
        Self: Sync,
    {
        eval_with(policy, self)
    }

    /// Elements in row-major logical order
    fn to_vec(&self) -> Vec<Self::Item> {
        self.iter().collect()
    }

    /// See [`sum`](super::sum)
    fn sum(&self) -> Self::Item {
        reduce::sum(self)
    }
}

impl<O> Evaluate for O
where
    O: Operand,
    O::Item: Element,
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::n_operator;
    use crate::runtime::WorkerPool;
    use crate::tensor::{Order, STORAGE_ALIGN};

    #[test]
    fn test_eval_broadcast_node() {
        let a = Tensor::from_slice(&[1i32, 2, 3, 4, 5, 6], &[2, 3]);
        let b = Tensor::from_slice(&[10i32, 20, 30], &[3]);
        let node = n_operator(|x: i32, y: i32| x + y, (&a, &b)).unwrap();
        let out = eval(&node);
        assert_eq!(out.shape(), &[2, 3]);
        assert!(out.is_contiguous());
        assert_eq!(out.to_vec(), vec![11, 22, 33, 14, 25, 36]);
    }

    #[test]
    fn test_eval_fills_one_aligned_buffer() {
        let a = Tensor::from_slice(&[1.0f64, 2.0, 3.0], &[3, 1]);
        let b = Tensor::from_slice(&[0.5f64, 4.0], &[2]);
        let out = eval(&n_operator(|x: f64, y: f64| x * y, (&a, &b)).unwrap());
        assert_eq!(out.storage().ref_count(), 1);
        assert_eq!(out.storage().len(), 6);
        assert_eq!(out.storage().as_ptr() as usize % STORAGE_ALIGN, 0);
        assert_eq!(out.storage().as_slice(), &[0.5, 4.0, 1.0, 8.0, 1.5, 12.0]);
    }

    #[test]
    fn test_eval_keeps_column_major_order() {
        let data = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let f = Tensor::from_slice_with_order(&data, &[2, 3], Order::ColumnMajor).unwrap();
        let node = n_operator(|x: f32, y: f32| x * y, (&f, &f)).unwrap();
        assert!(node.is_trivial());
        let out = node.eval();
        assert_eq!(out.order(), Order::ColumnMajor);
        assert_eq!(out.to_vec(), f.iter().map(|x| x * x).collect::<Vec<_>>());
    }

    #[test]
    fn test_eval_zero_dim() {
        let s = Tensor::scalar(7u8);
        let out = eval(&s);
        assert_eq!(out.ndim(), 0);
        assert_eq!(out.item().unwrap(), 7);
    }

    #[test]
    fn test_parallel_eval_matches() {
        let n = 3 * PARALLEL_GRAIN + 17;
        let a: Vec<i64> = (0..n as i64).collect();
        let a = Tensor::from_slice(&a, &[n]);
        let b = Tensor::from_slice(&[2i64], &[1]);
        let node = n_operator(|x: i64, y: i64| x * y - 1, (&a, &b)).unwrap();

        let pool = WorkerPool::with_workers(3).unwrap();
        let par = eval_with(&ExecutionPolicy::Parallel(&pool), &node);
        assert_eq!(par.to_vec(), eval(&node).to_vec());
        assert_eq!(par.to_vec()[n - 1], 2 * (n as i64 - 1) - 1);
    }

    #[test]
    fn test_small_parallel_eval_runs_inline() {
        let a = Tensor::from_slice(&[1u32, 2, 3], &[3]);
        let pool = WorkerPool::with_workers(2).unwrap();
        let out = a.eval_with(&ExecutionPolicy::Parallel(&pool));
        assert_eq!(out.to_vec(), vec![1, 2, 3]);
        assert_ne!(out.id(), a.id());
    }
}
