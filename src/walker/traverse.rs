//! Multi-index drivers that move walkers through an index space

use super::Walker;
use crate::tensor::{Order, Shape};
use smallvec::SmallVec;
use std::iter::FusedIterator;

type Index = SmallVec<[usize; 4]>;

/// Double-ended iterator driving a walker over a shape in a given order
///
/// Two copies of the walker are kept, one at the front and one at the back,
/// so `next_back` is as cheap as `next`. Each step moves a walker along the
/// fastest axis and carries into slower axes with `reset`/`reset_back`.
#[derive(Clone, Debug)]
pub struct Traverser<W> {
    front: W,
    back: W,
    shape: Shape,
    /// Axes from fastest to slowest varying
    axes: Index,
    front_index: Index,
    back_index: Index,
    front_pos: usize,
    /// Exclusive end of the remaining range
    back_pos: usize,
}

impl<W: Walker + Clone> Traverser<W> {
    /// Traverse `shape` with `walker`, which must have `shape.len()` axes
    /// and sit at the origin
    pub fn new(walker: W, shape: &[usize], order: Order) -> Self {
        let shape = Shape::from(shape);
        let ndim = shape.len();
        let axes: Index = match order {
            Order::RowMajor => (0..ndim).rev().collect(),
            Order::ColumnMajor => (0..ndim).collect(),
        };
        let size = shape.size();

        let front = walker.clone();
        let mut back = walker;
        let mut back_index: Index = std::iter::repeat_n(0, ndim).collect();
        if size > 0 {
            for axis in 0..ndim {
                back.reset_back(axis);
                back.step_back(axis);
                back_index[axis] = shape[axis] - 1;
            }
        }

        Self {
            front,
            back,
            shape,
            axes,
            front_index: std::iter::repeat_n(0, ndim).collect(),
            back_index,
            front_pos: 0,
            back_pos: size,
        }
    }
}

impl<W: Walker> Traverser<W> {
    /// Flat position of the next element `next()` yields
    pub fn position(&self) -> usize {
        self.front_pos
    }

    /// Jump the front of the traversal to flat position `pos`
    ///
    /// Positions past the back end empty the iterator.
    pub fn seek(&mut self, pos: usize) {
        if pos >= self.back_pos {
            self.front_pos = self.back_pos;
            return;
        }
        let target = self.unravel(pos);
        for (axis, (&to, from)) in target.iter().zip(self.front_index.iter_mut()).enumerate() {
            if to != *from {
                self.front.walk(axis, to as isize - *from as isize);
                *from = to;
            }
        }
        self.front_pos = pos;
    }

    /// Move the back end so that the last element yielded is `pos - 1`
    fn seek_back(&mut self, end: usize) {
        if end <= self.front_pos {
            self.back_pos = self.front_pos;
            return;
        }
        let target = self.unravel(end - 1);
        for (axis, (&to, from)) in target.iter().zip(self.back_index.iter_mut()).enumerate() {
            if to != *from {
                self.back.walk(axis, to as isize - *from as isize);
                *from = to;
            }
        }
        self.back_pos = end;
    }

    fn unravel(&self, mut pos: usize) -> Index {
        let mut index: Index = std::iter::repeat_n(0, self.shape.len()).collect();
        for &axis in &self.axes {
            let dim = self.shape[axis];
            index[axis] = pos % dim;
            pos /= dim;
        }
        index
    }

    #[inline]
    fn advance_front(&mut self) {
        for &axis in &self.axes {
            let i = &mut self.front_index[axis];
            if *i + 1 < self.shape[axis] {
                *i += 1;
                self.front.step(axis);
                return;
            }
            *i = 0;
            self.front.reset(axis);
        }
    }

    #[inline]
    fn retreat_back(&mut self) {
        for &axis in &self.axes {
            let i = &mut self.back_index[axis];
            if *i > 0 {
                *i -= 1;
                self.back.step_back(axis);
                return;
            }
            *i = self.shape[axis] - 1;
            self.back.reset_back(axis);
            self.back.step_back(axis);
        }
    }
}

impl<W: Walker> Iterator for Traverser<W> {
    type Item = W::Item;

    #[inline]
    fn next(&mut self) -> Option<W::Item> {
        if self.front_pos >= self.back_pos {
            return None;
        }
        let item = self.front.get();
        self.front_pos += 1;
        self.advance_front();
        Some(item)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back_pos - self.front_pos;
        (len, Some(len))
    }

    fn nth(&mut self, n: usize) -> Option<W::Item> {
        match self.front_pos.checked_add(n) {
            Some(pos) => self.seek(pos),
            None => self.front_pos = self.back_pos,
        }
        self.next()
    }
}

impl<W: Walker> DoubleEndedIterator for Traverser<W> {
    #[inline]
    fn next_back(&mut self) -> Option<W::Item> {
        if self.front_pos >= self.back_pos {
            return None;
        }
        let item = self.back.get();
        self.back_pos -= 1;
        self.retreat_back();
        Some(item)
    }

    fn nth_back(&mut self, n: usize) -> Option<W::Item> {
        let end = self.back_pos.saturating_sub(n);
        self.seek_back(end);
        self.next_back()
    }
}

impl<W: Walker> ExactSizeIterator for Traverser<W> {}

impl<W: Walker> FusedIterator for Traverser<W> {}

/// Forward-only row-major counter over a shape
///
/// Used where several walkers with different dimensionalities must visit the
/// same outer index space in lockstep (the matmul batch loop): every change
/// of the multi-index is reported as `(axis, steps)` moves.
#[derive(Clone, Debug)]
pub struct RangeTraverser {
    shape: Shape,
    index: Index,
    remaining: usize,
}

impl RangeTraverser {
    /// Counter positioned at the first index of `shape`
    pub fn new(shape: &[usize]) -> Self {
        let shape = Shape::from(shape);
        let remaining = shape.size();
        Self {
            index: std::iter::repeat_n(0, shape.len()).collect(),
            shape,
            remaining,
        }
    }

    /// Current multi-index
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    /// Positions left, including the current one
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Advance to the next index, reporting every axis move to `walk`
    ///
    /// Returns false (without moving) once the range is exhausted.
    pub fn advance(&mut self, mut walk: impl FnMut(usize, isize)) -> bool {
        if self.remaining <= 1 {
            self.remaining = 0;
            return false;
        }
        self.remaining -= 1;
        for axis in (0..self.shape.len()).rev() {
            let i = &mut self.index[axis];
            if *i + 1 < self.shape[axis] {
                *i += 1;
                walk(axis, 1);
                return true;
            }
            walk(axis, -(*i as isize));
            *i = 0;
        }
        true
    }
}
