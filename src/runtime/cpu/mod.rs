//! CPU compute kernels

pub mod kernels;
