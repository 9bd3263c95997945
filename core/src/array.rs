//! `ArrayOf<T>`: array decoding for any object-decodable element type.

use std::ops::Deref;

use crate::error::DecodeError;
use crate::json::{ArrayDecodable, Decodable, JsonObject};

/// A decoded top-level JSON array.
///
/// Elements keep the order of the payload. The sequence is read-only; use
/// `into_vec` to take ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayOf<T> {
    items: Vec<T>,
}

impl<T> ArrayOf<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T> Deref for ArrayOf<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> IntoIterator for ArrayOf<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a ArrayOf<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Decodable> ArrayDecodable for ArrayOf<T> {
    /// Decodes every element in order and stops at the first failure.
    fn decode_array(items: Vec<JsonObject>) -> Result<Self, DecodeError> {
        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                T::decode(item).map_err(|source| DecodeError::Element {
                    index,
                    source: Box::new(source),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ArrayOf { items })
    }
}
