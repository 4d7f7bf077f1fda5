// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by the [`Network`](crate::Network).

use understory_tree_layout::LayoutError;

/// A misuse of the network API, or a registry violation surfaced by it.
///
/// Like [`LayoutError`], these describe caller bugs. Under
/// [`ContractPolicy::Panic`](crate::ContractPolicy::Panic) the network panics
/// instead of returning them.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum NetworkError {
    /// Violation reported by the underlying layout.
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// The operation needs a built root member.
    #[error("{op}: the root member has not been built")]
    RootNotBuilt {
        /// Offending operation.
        op: &'static str,
    },
    /// The member passed to an operation is not registered.
    #[error("{op}: member {key} is not registered")]
    UnregisteredMember {
        /// Offending operation.
        op: &'static str,
        /// `Debug` rendering of the member's own key.
        key: String,
    },
    /// No member is registered under the key.
    #[error("{op}: no member is registered under key {key}")]
    UnresolvedKey {
        /// Offending operation.
        op: &'static str,
        /// `Debug` rendering of the key.
        key: String,
    },
    /// A builder produced a member whose key differs from the builder's key.
    #[error("{op}: builder key {builder} does not match member key {member}")]
    KeyMismatch {
        /// Offending operation.
        op: &'static str,
        /// `Debug` rendering of the builder's key.
        builder: String,
        /// `Debug` rendering of the member's own key.
        member: String,
    },
    /// An event line was driven out of order.
    #[error("{op}: event line is not in a state that allows this step")]
    CorruptLine {
        /// Offending operation.
        op: &'static str,
    },
    /// The network behind an operator has been dropped.
    #[error("network has been dropped")]
    NetworkDropped,
}

impl NetworkError {
    /// Name of the operation that reported this error, if there is one.
    pub fn op(&self) -> Option<&'static str> {
        match self {
            Self::Layout(e) => Some(e.op()),
            Self::RootNotBuilt { op }
            | Self::UnregisteredMember { op, .. }
            | Self::UnresolvedKey { op, .. }
            | Self::KeyMismatch { op, .. }
            | Self::CorruptLine { op } => Some(op),
            Self::NetworkDropped => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_errors_pass_through() {
        let e = NetworkError::from(LayoutError::UnregisteredParent { op: "save" });
        assert_eq!(e.op(), Some("save"));
        assert_eq!(e.to_string(), "save: parent object is not registered");
    }

    #[test]
    fn messages_name_the_operation() {
        let e = NetworkError::UnresolvedKey {
            op: "process_member",
            key: "\"x\"".into(),
        };
        assert_eq!(
            e.to_string(),
            "process_member: no member is registered under key \"x\""
        );
        assert_eq!(NetworkError::NetworkDropped.op(), None);
    }
}
