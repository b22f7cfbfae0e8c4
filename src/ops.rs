//! # ops
//!
//! Small operations shared by the scanner, the pipeline and the derived-dataset tools.

use std::ops::Range;

use crate::error::{DatasetError, Result};

/// Outcome of checking that a sequence takes a single distinct value.
#[derive(Clone, Debug, PartialEq)]
pub enum Uniformity<T> {
    /// Every element equals this value.
    Uniform(T),
    /// Distinct values, in order of first appearance.
    Inconsistent(Vec<T>),
    /// The sequence was empty.
    Empty,
}

impl<T> Uniformity<T> {
    /// Return the uniform value, if any.
    pub fn uniform(self) -> Option<T> {
        match self {
            Uniformity::Uniform(value) => Some(value),
            _ => None,
        }
    }
}

/// Collect the distinct values of `values` and report whether there is exactly one.
pub fn uniform_value<T, I>(values: I) -> Uniformity<T>
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    let mut distinct: Vec<T> = vec![];
    for value in values {
        if !distinct.contains(&value) {
            distinct.push(value);
        }
    }
    match distinct.len() {
        0 => Uniformity::Empty,
        1 => distinct.pop().map_or(Uniformity::Empty, Uniformity::Uniform),
        _ => Uniformity::Inconsistent(distinct),
    }
}

/// Partition `0..len` into consecutive ranges of `batch_size`; the last one holds the remainder.
pub fn batch_ranges(len: usize, batch_size: usize) -> impl Iterator<Item = Range<usize>> {
    let batch_size = batch_size.max(1);
    (0..len)
        .step_by(batch_size)
        .map(move |start| start..usize::min(start + batch_size, len))
}

/// Fail with [`DatasetError::IndexOutOfRange`] on the first index past `length`.
pub fn check_indices(indices: &[usize], length: usize) -> Result<()> {
    match indices.iter().find(|&&index| index >= length) {
        Some(&index) => Err(DatasetError::IndexOutOfRange { index, length }),
        None => Ok(()),
    }
}

/// Gather `values[indices[k]]` for every `k`.
pub fn gather<T: Clone>(values: &[T], indices: &[usize]) -> Result<Vec<T>> {
    check_indices(indices, values.len())?;
    Ok(indices.iter().map(|&i| values[i].clone()).collect())
}
