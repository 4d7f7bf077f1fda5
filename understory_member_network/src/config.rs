// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Network configuration.

/// What the network does when a caller violates an operation's contract.
///
/// The default is [`ContractPolicy::Panic`] in builds with debug assertions
/// and [`ContractPolicy::Return`] otherwise.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ContractPolicy {
    /// Log the violation at `error` level and return it as a
    /// [`NetworkError`](crate::NetworkError).
    Return,
    /// Log the violation, then panic with its message.
    Panic,
}

impl Default for ContractPolicy {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Panic
        } else {
            Self::Return
        }
    }
}

/// Tunables for a [`Network`](crate::Network).
///
/// ```
/// use understory_member_network::{ContractPolicy, NetworkConfig};
///
/// let cfg = NetworkConfig::default().with_contract_policy(ContractPolicy::Panic);
/// assert_eq!(cfg.contract_policy, ContractPolicy::Panic);
/// ```
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct NetworkConfig {
    /// Reaction to contract violations.
    pub contract_policy: ContractPolicy,
}

impl NetworkConfig {
    /// Replace the contract policy.
    #[must_use]
    pub const fn with_contract_policy(mut self, policy: ContractPolicy) -> Self {
        self.contract_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_follows_debug_assertions() {
        let expected = if cfg!(debug_assertions) {
            ContractPolicy::Panic
        } else {
            ContractPolicy::Return
        };
        assert_eq!(ContractPolicy::default(), expected);
        assert_eq!(NetworkConfig::default().contract_policy, expected);
    }
}
