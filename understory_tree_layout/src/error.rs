// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contract violations reported by [`TreeLayout`](crate::TreeLayout).

use alloc::string::String;

/// A misuse of the [`TreeLayout`](crate::TreeLayout) API.
///
/// Every variant carries the name of the operation that was called (`op`).
/// None of these are recoverable runtime conditions; they indicate a bug in
/// the caller.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum LayoutError {
    /// A root is already registered.
    #[error("{op}: a root is already registered")]
    DuplicateRoot {
        /// Offending operation.
        op: &'static str,
    },
    /// The key is already registered.
    #[error("{op}: key {key} is already registered")]
    DuplicateKey {
        /// Offending operation.
        op: &'static str,
        /// `Debug` rendering of the key.
        key: String,
    },
    /// The object is already registered (by identity).
    #[error("{op}: object is already registered under key {key}")]
    DuplicateObject {
        /// Offending operation.
        op: &'static str,
        /// `Debug` rendering of the key the object is registered under.
        key: String,
    },
    /// The parent object passed to an insertion is not registered.
    #[error("{op}: parent object is not registered")]
    UnregisteredParent {
        /// Offending operation.
        op: &'static str,
    },
    /// The object passed to a query is not registered.
    #[error("{op}: object is not registered")]
    UnregisteredObject {
        /// Offending operation.
        op: &'static str,
    },
}

impl LayoutError {
    /// Name of the operation that reported this error.
    pub fn op(&self) -> &'static str {
        match self {
            Self::DuplicateRoot { op }
            | Self::DuplicateKey { op, .. }
            | Self::DuplicateObject { op, .. }
            | Self::UnregisteredParent { op }
            | Self::UnregisteredObject { op } => op,
        }
    }
}
