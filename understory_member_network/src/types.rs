// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for the network: events, lifecycle, member and builder contracts.
//!
//! ## Overview
//!
//! These types describe what the [`Network`](crate::Network) requires from the
//! nodes it manages. Concrete members embed a [`MemberCore`] and implement
//! [`Member`]; the network and the layout never depend on concrete types.

use core::any::{Any, TypeId};
use core::cell::{Cell, RefCell};
use core::fmt::Debug;
use std::rc::Rc;

use async_trait::async_trait;

use crate::operator::Operator;

/// Bounds every member key satisfies.
///
/// Keys are ordered (the layout keys its map by them), cheap to clone, and
/// printable for diagnostics.
pub trait MemberKey: Ord + Clone + Debug + 'static {}

impl<K: Ord + Clone + Debug + 'static> MemberKey for K {}

/// Shared handle to a member, as stored by the network.
pub type MemberRef<K> = Rc<dyn Member<K>>;

/// A type-erased event.
///
/// Events are cheap to clone: clones share one allocation. Handlers inspect
/// them with [`Event::downcast_ref`] or [`Event::is`].
#[derive(Clone)]
pub struct Event {
    value: Rc<dyn Any>,
    type_name: &'static str,
}

impl Event {
    /// Wrap a value as an event.
    pub fn new<E: Any>(value: E) -> Self {
        Self {
            value: Rc::new(value),
            type_name: core::any::type_name::<E>(),
        }
    }

    /// True if the event carries an `E`.
    pub fn is<E: Any>(&self) -> bool {
        self.value.is::<E>()
    }

    /// Borrow the payload as an `E`.
    pub fn downcast_ref<E: Any>(&self) -> Option<&E> {
        self.value.downcast_ref::<E>()
    }

    /// Share the payload as an `Rc<E>`.
    pub fn downcast<E: Any>(&self) -> Option<Rc<E>> {
        Rc::clone(&self.value).downcast::<E>().ok()
    }

    /// [`TypeId`] of the payload.
    pub fn kind(&self) -> TypeId {
        (*self.value).type_id()
    }

    /// Type name of the payload, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl Debug for Event {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Event").field(&self.type_name).finish()
    }
}

/// Lifecycle state of a member.
///
/// Driven only by the [`Network`](crate::Network):
/// - synchronous builds go from `Absence` straight to `Init`;
/// - asynchronous builds pass through `Initializing` while `init_async` runs;
/// - disposal returns the member to `Absence`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum MemberLife {
    /// Not built, or disposed.
    #[default]
    Absence,
    /// Registered; asynchronous initialization in progress.
    Initializing,
    /// Registered and initialized.
    Init,
}

/// Bookkeeping every member embeds: key, lifecycle state, and operator.
///
/// The lifecycle state and operator are written by the network only.
pub struct MemberCore<K> {
    key: K,
    life: Cell<MemberLife>,
    operator: RefCell<Option<Operator<K>>>,
}

impl<K> MemberCore<K> {
    /// Create the core for a member registered under `key`.
    pub fn new(key: K) -> Self {
        Self {
            key,
            life: Cell::new(MemberLife::Absence),
            operator: RefCell::new(None),
        }
    }

    /// Identity key.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Current lifecycle state.
    pub fn life(&self) -> MemberLife {
        self.life.get()
    }

    /// Operator of the network currently owning the member.
    pub fn operator(&self) -> Option<Operator<K>> {
        self.operator.borrow().clone()
    }

    pub(crate) fn set_life(&self, life: MemberLife) {
        self.life.set(life);
    }

    pub(crate) fn bind(&self, operator: Option<Operator<K>>) {
        *self.operator.borrow_mut() = operator;
    }
}

impl<K: Debug> Debug for MemberCore<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemberCore")
            .field("key", &self.key)
            .field("life", &self.life.get())
            .field("bound", &self.operator.borrow().is_some())
            .finish()
    }
}

/// A node of the network.
///
/// Implementors embed a [`MemberCore`] and return it from [`Member::core`];
/// the remaining accessors are provided.
///
/// Contract:
/// - never change the lifecycle state directly;
/// - [`Member::handle`] is not called before initialization completes.
///
/// All async methods may suspend. They run on the caller's thread; members
/// are not required to be `Send`.
#[async_trait(?Send)]
pub trait Member<K>: 'static {
    /// Embedded bookkeeping.
    fn core(&self) -> &MemberCore<K>;

    /// Identity key.
    fn key(&self) -> &K {
        self.core().key()
    }

    /// Current lifecycle state.
    fn life(&self) -> MemberLife {
        self.core().life()
    }

    /// Operator of the owning network, once built.
    fn operator(&self) -> Option<Operator<K>> {
        self.core().operator()
    }

    /// Synchronous initialization, run by
    /// [`Network::build_member_sync`](crate::Network::build_member_sync).
    fn init(&self) {}

    /// Asynchronous initialization, run by
    /// [`Network::build_root_member`](crate::Network::build_root_member) and
    /// [`Network::build_member_async`](crate::Network::build_member_async).
    ///
    /// Defaults to [`Member::init`].
    async fn init_async(&self) {
        self.init();
    }

    /// Release resources. Called once when the member's subtree is disposed.
    fn dispose(&self) {}

    /// Process an event, either one this member originates (bubbling start)
    /// or a command pushed down by its parent (`cause` is `None`).
    async fn handle(&self, event: Event, cause: Option<Event>);

    /// React to an event bubbling up from the direct child `child`.
    ///
    /// Return the event to keep bubbling, or `None` to halt the chain.
    /// The default halts.
    async fn handle_report(&self, event: Event, child: &K) -> Option<Event> {
        let _ = (event, child);
        None
    }

    /// Produce an event of the requested kind on demand, if this member can.
    async fn report(&self, kind: TypeId) -> Option<Event> {
        let _ = kind;
        None
    }
}

/// Factory for a member: supplies its key and constructs it on demand.
pub trait MemberBuilder<K> {
    /// Key the member will be registered under.
    fn key(&self) -> K;

    /// Construct the member.
    fn build(self) -> MemberRef<K>;
}

/// A [`MemberBuilder`] backed by a closure.
///
/// Created with [`builder`].
pub struct FnBuilder<K, F> {
    key: K,
    build: F,
}

impl<K: Debug, F> Debug for FnBuilder<K, F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnBuilder")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Build members from a key and a closure receiving that key.
///
/// ```
/// use understory_member_network::{builder, Event, Member, MemberBuilder, MemberCore};
/// use std::rc::Rc;
///
/// struct Leaf(MemberCore<u32>);
///
/// #[async_trait::async_trait(?Send)]
/// impl Member<u32> for Leaf {
///     fn core(&self) -> &MemberCore<u32> { &self.0 }
///     async fn handle(&self, _event: Event, _cause: Option<Event>) {}
/// }
///
/// let b = builder(7, |key| Rc::new(Leaf(MemberCore::new(key))));
/// assert_eq!(b.key(), 7);
/// assert_eq!(*b.build().key(), 7);
/// ```
pub fn builder<K, F>(key: K, build: F) -> FnBuilder<K, F>
where
    K: Clone,
    F: FnOnce(K) -> MemberRef<K>,
{
    FnBuilder { key, build }
}

impl<K, F> MemberBuilder<K> for FnBuilder<K, F>
where
    K: Clone,
    F: FnOnce(K) -> MemberRef<K>,
{
    fn key(&self) -> K {
        self.key.clone()
    }

    fn build(self) -> MemberRef<K> {
        (self.build)(self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ping(u8);

    #[test]
    fn event_downcasts_by_type() {
        let e = Event::new(Ping(3));
        assert!(e.is::<Ping>());
        assert!(!e.is::<u8>());
        assert_eq!(e.downcast_ref::<Ping>(), Some(&Ping(3)));
        assert_eq!(e.downcast::<Ping>().as_deref(), Some(&Ping(3)));
        assert!(e.downcast::<String>().is_none());
        assert_eq!(e.kind(), TypeId::of::<Ping>());
        assert!(e.type_name().ends_with("Ping"));
    }

    #[test]
    fn event_clones_share_payload() {
        let e = Event::new(String::from("shared"));
        let c = e.clone();
        let a = e.downcast::<String>().unwrap();
        let b = c.downcast::<String>().unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn core_starts_absent_and_unbound() {
        let core = MemberCore::new("k");
        assert_eq!(*core.key(), "k");
        assert_eq!(core.life(), MemberLife::Absence);
        assert!(core.operator().is_none());
        core.set_life(MemberLife::Init);
        assert_eq!(core.life(), MemberLife::Init);
    }
}
