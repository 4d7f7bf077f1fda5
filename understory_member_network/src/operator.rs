// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Weak handle from a member back to the network that owns it.

use core::any::Any;
use core::fmt::Debug;
use std::rc::{Rc, Weak};

use crate::error::NetworkError;
use crate::line::Termination;
use crate::network::{Network, Shared};
use crate::types::{Event, Member, MemberBuilder, MemberKey, MemberRef};

/// Handle a member uses to reach its owning [`Network`].
///
/// Bound by the network when the member is built and cleared when it is
/// disposed. The handle is weak: members never keep the network alive, and
/// every forwarding method fails with [`NetworkError::NetworkDropped`] once
/// the network is gone.
pub struct Operator<K> {
    shared: Weak<Shared<K>>,
}

impl<K> Clone for Operator<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<K> Debug for Operator<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Operator")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

impl<K> Operator<K> {
    pub(crate) fn new(shared: &Rc<Shared<K>>) -> Self {
        Self {
            shared: Rc::downgrade(shared),
        }
    }

    /// True if both operators point at the same network.
    pub fn same_network(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.shared, &other.shared)
    }
}

impl<K: MemberKey> Operator<K> {
    /// Upgrade to a strong network handle.
    pub fn network(&self) -> Result<Network<K>, NetworkError> {
        self.shared
            .upgrade()
            .map(Network::from_shared)
            .ok_or(NetworkError::NetworkDropped)
    }

    /// See [`Network::notify_event`].
    pub async fn notify_event(
        &self,
        member: &dyn Member<K>,
        event: Event,
        cause: Option<Event>,
    ) -> Result<Termination<K>, NetworkError> {
        self.network()?.notify_event(member, event, cause).await
    }

    /// See [`Network::process_member`].
    pub async fn process_member(
        &self,
        parent: &dyn Member<K>,
        child: &K,
        event: Event,
    ) -> Result<(), NetworkError> {
        self.network()?.process_member(parent, child, event).await
    }

    /// See [`Network::acquire_event`]. `None` as well if the network is gone.
    pub async fn acquire_event<E: Any>(&self, child: &K) -> Option<Rc<E>> {
        self.network().ok()?.acquire_event::<E>(child).await
    }

    /// See [`Network::build_member_sync`].
    pub fn build_member_sync<B: MemberBuilder<K>>(
        &self,
        source: &dyn Member<K>,
        builder: B,
    ) -> Result<MemberRef<K>, NetworkError> {
        self.network()?.build_member_sync(source, builder)
    }

    /// See [`Network::build_member_async`].
    pub async fn build_member_async<B: MemberBuilder<K>>(
        &self,
        source: &dyn Member<K>,
        builder: B,
    ) -> Result<MemberRef<K>, NetworkError> {
        self.network()?.build_member_async(source, builder).await
    }

    /// See [`Network::dispose_member`].
    pub fn dispose_member(&self, key: &K) -> Result<usize, NetworkError> {
        Ok(self.network()?.dispose_member(key))
    }
}
