// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Member Network: a tree of members that build, dispose, and
//! pass events to each other.
//!
//! ## Overview
//!
//! A [`Network`] owns a [`TreeLayout`](understory_tree_layout::TreeLayout) of
//! [`Member`]s. Each member has a stable key, a [`MemberLife`] driven by the
//! network, and an [`Operator`] handle back to the network.
//!
//! Events move in two directions:
//!
//! - Downward: [`Network::process_member`] hands an event to one child
//!   directly. [`Network::acquire_event`] asks a child to produce one.
//! - Upward: [`Network::notify_event`] lets a member handle an event, then
//!   walks its ancestors with an [`EventLine`]. Each ancestor may translate the
//!   event and pass it on, or halt the line.
//!
//! ## Scheduling
//!
//! Everything runs on one thread. Members are `Rc`-shared and their async
//! methods are not required to be `Send`. An event line yields to the
//! scheduler before every hop, so concurrent lines interleave one generation
//! at a time. Any single-threaded executor works; the tests use tokio's
//! current-thread runtime.
//!
//! ## Errors
//!
//! Misuse (events before the root is built, unknown members or keys, event
//! lines driven out of order, registry violations) is reported as a
//! [`NetworkError`] naming the operation. Under [`ContractPolicy::Panic`],
//! the default in builds with debug assertions, the network panics instead.
//!
//! ## Minimal example
//!
//! ```
//! use std::rc::Rc;
//! use understory_member_network::{
//!     Event, Member, MemberCore, MemberRef, Network, Termination, builder,
//! };
//!
//! struct Node(MemberCore<&'static str>);
//!
//! #[async_trait::async_trait(?Send)]
//! impl Member<&'static str> for Node {
//!     fn core(&self) -> &MemberCore<&'static str> {
//!         &self.0
//!     }
//!     async fn handle(&self, _event: Event, _cause: Option<Event>) {}
//!     async fn handle_report(&self, event: Event, _child: &&'static str) -> Option<Event> {
//!         Some(event)
//!     }
//! }
//!
//! fn node(key: &'static str) -> MemberRef<&'static str> {
//!     Rc::new(Node(MemberCore::new(key)))
//! }
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! rt.block_on(async {
//!     let net = Network::new();
//!     net.build_root_member(builder("root", node)).await.unwrap();
//!     let root = net.member(&"root").unwrap();
//!     let leaf = net.build_member_sync(&*root, builder("leaf", node)).unwrap();
//!
//!     let end = net.notify_event(&*leaf, Event::new(1_u8), None).await.unwrap();
//!     assert_eq!(end, Termination::RootReached { root: "root", hops: 1 });
//!
//!     assert_eq!(net.dispose_member(&"leaf"), 1);
//! });
//! ```

mod config;
mod error;
mod line;
mod network;
mod operator;
mod types;

#[cfg(test)]
mod testing;

pub use config::{ContractPolicy, NetworkConfig};
pub use error::NetworkError;
pub use line::{EventLine, Step, Termination};
pub use network::Network;
pub use operator::Operator;
pub use types::{
    Event, FnBuilder, Member, MemberBuilder, MemberCore, MemberKey, MemberLife, MemberRef,
    builder,
};
