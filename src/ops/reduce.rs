//! Whole-operand reductions
//!
//! Elements are folded in the operand's own traversal order. The parallel
//! variants fold one contiguous range per task and combine the partial
//! results in task order, so a given pool size always yields the same bits.

use super::eval::PARALLEL_GRAIN;
use crate::dtype::Element;
use crate::expr::{Operand, Strategy};
use crate::runtime::{ExecutionPolicy, split_range};

/// Fold every element of `operand` into `init` with `f`
///
/// `init` must be an identity of `f` for the parallel variant to agree with
/// this one.
pub fn reduce<O, F>(operand: &O, init: O::Item, f: F) -> O::Item
where
    O: Operand,
    O::Item: Element,
    F: Fn(O::Item, O::Item) -> O::Item,
{
    let size = operand.size();
    Strategy::select(operand).fold_range(operand.shape(), operand.order(), 0..size, init, f)
}

/// [`reduce`] over contiguous ranges, one task each, partials combined in
/// task order
pub fn reduce_with<O, F>(policy: &ExecutionPolicy<'_>, operand: &O, init: O::Item, f: F) -> O::Item
where
    O: Operand + Sync,
    O::Item: Element,
    F: Fn(O::Item, O::Item) -> O::Item + Sync,
{
    let size = operand.size();
    let tasks = policy.tasks_for(size, PARALLEL_GRAIN);
    let pool = match policy.pool() {
        Some(pool) if tasks > 1 => pool,
        _ => return reduce(operand, init, f),
    };

    let (shape, order) = (operand.shape(), operand.order());
    log::debug!("reduce {:?} in {} tasks", shape, tasks);

    let mut partials = vec![init; tasks];
    pool.scope(|s| {
        let f = &f;
        for (slot, range) in partials.iter_mut().zip(split_range(size, tasks)) {
            s.spawn(move || {
                *slot = Strategy::select(operand).fold_range(shape, order, range, init, f);
            });
        }
    });
    partials.into_iter().fold(init, f)
}

/// Sum of all elements
pub fn sum<O>(operand: &O) -> O::Item
where
    O: Operand,
    O::Item: Element,
{
    reduce(operand, <O::Item as Element>::zero(), |a, b| a + b)
}

/// [`sum`] split across the policy's pool
pub fn sum_with<O>(policy: &ExecutionPolicy<'_>, operand: &O) -> O::Item
where
    O: Operand + Sync,
    O::Item: Element,
{
    reduce_with(policy, operand, <O::Item as Element>::zero(), |a, b| a + b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::n_operator;
    use crate::expr::functors::Square;
    use crate::runtime::WorkerPool;
    use crate::tensor::Tensor;
    use rstest::rstest;

    #[test]
    fn test_sum_of_node() {
        let a = Tensor::from_slice(&[1i32, 2, 3, 4], &[2, 2]);
        let b = Tensor::from_slice(&[10i32, 100], &[2, 1]);
        let node = n_operator(|x: i32, y: i32| x * y, (&a, &b)).unwrap();
        assert_eq!(sum(&node), 10 + 20 + 300 + 400);
    }

    #[test]
    fn test_reduce_max_of_transposed() {
        let a = Tensor::from_slice(&[3i16, -8, 11, 0, 7, 2], &[2, 3]).transpose();
        assert_eq!(reduce(&a, i16::MIN, |x, y| x.max(y)), 11);
        assert_eq!(reduce(&a, i16::MAX, |x, y| x.min(y)), -8);
    }

    #[test]
    fn test_empty_sum_is_zero() {
        let a = Tensor::<f64>::zeros(&[3, 0]);
        assert_eq!(sum(&a), 0.0);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(5)]
    fn test_parallel_sum_exact_for_integers(#[case] workers: usize) {
        let n = 4 * PARALLEL_GRAIN + 3;
        let data: Vec<u64> = (0..n as u64).collect();
        let a = Tensor::from_slice(&data, &[n]);
        let node = n_operator(Square, (&a,)).unwrap();

        let pool = WorkerPool::with_workers(workers).unwrap();
        let expected: u64 = data.iter().map(|x| x * x).sum();
        assert_eq!(sum_with(&ExecutionPolicy::Parallel(&pool), &node), expected);
    }

    #[test]
    fn test_parallel_float_sum_is_deterministic() {
        let n = 6 * PARALLEL_GRAIN;
        let data: Vec<f32> = (0..n).map(|i| 1.0 / (i as f32 + 1.0)).collect();
        let a = Tensor::from_slice(&data, &[n]);
        let pool = WorkerPool::with_workers(4).unwrap();
        let policy = ExecutionPolicy::Parallel(&pool);

        let first = sum_with(&policy, &a);
        for _ in 0..5 {
            assert_eq!(sum_with(&policy, &a).to_bits(), first.to_bits());
        }
        assert!((first - sum(&a)).abs() < 1e-3);
    }
}
