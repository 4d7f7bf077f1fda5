// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The lifecycle orchestrator: builds and disposes members, moves events.

use core::any::{Any, TypeId};
use core::cell::{Cell, RefCell};
use core::fmt::Debug;
use std::rc::Rc;

use understory_tree_layout::{LayoutError, ObjectId, TreeLayout};

use crate::config::{ContractPolicy, NetworkConfig};
use crate::error::NetworkError;
use crate::line::{EventLine, Termination};
use crate::operator::Operator;
use crate::types::{Event, Member, MemberBuilder, MemberKey, MemberLife, MemberRef};

/// Progress of the one-time root build.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum RootState {
    Unbuilt,
    /// Registered; `init_async` has not completed yet.
    Building,
    Built,
}

pub(crate) struct Shared<K> {
    pub(crate) layout: RefCell<TreeLayout<K, MemberRef<K>>>,
    root: Cell<RootState>,
    config: Cell<NetworkConfig>,
}

/// Owner of a member tree.
///
/// `Network` is a cheap, clonable handle; clones share one tree. It is the
/// only mutator of its [`TreeLayout`]. Members reach it through the
/// [`Operator`] bound to them at build time.
///
/// ## Usage
///
/// - Build the root once with [`Network::build_root_member`].
/// - Grow the tree with [`Network::build_member_sync`] or
///   [`Network::build_member_async`], naming the parent member.
/// - Shrink it with [`Network::dispose_member`].
/// - Bubble events upward with [`Network::notify_event`], push commands
///   downward with [`Network::process_member`], and pull values with
///   [`Network::acquire_event`].
///
/// The layout is never borrowed across an `.await` or a member callback, so
/// members may call back into the network from any of their methods.
pub struct Network<K> {
    shared: Rc<Shared<K>>,
}

impl<K> Clone for Network<K> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<K: Debug> Debug for Network<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Network")
            .field("root", &self.shared.root.get())
            .field("layout", &self.shared.layout.try_borrow().ok())
            .field("config", &self.shared.config.get())
            .finish()
    }
}

impl<K: MemberKey> Default for Network<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: MemberKey> Network<K> {
    /// Create an empty network with the default configuration.
    pub fn new() -> Self {
        Self::with_config(NetworkConfig::default())
    }

    /// Create an empty network with `config`.
    pub fn with_config(config: NetworkConfig) -> Self {
        Self {
            shared: Rc::new(Shared {
                layout: RefCell::new(TreeLayout::new()),
                root: Cell::new(RootState::Unbuilt),
                config: Cell::new(config),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Rc<Shared<K>>) -> Self {
        Self { shared }
    }

    /// Current configuration.
    pub fn config(&self) -> NetworkConfig {
        self.shared.config.get()
    }

    /// Change how contract violations are reported.
    pub fn set_contract_policy(&self, policy: ContractPolicy) {
        let config = self.config().with_contract_policy(policy);
        self.shared.config.set(config);
    }

    /// A weak handle to this network.
    pub fn operator(&self) -> Operator<K> {
        Operator::new(&self.shared)
    }

    // --- queries ---

    /// True once the root member has finished initializing.
    ///
    /// Stays true after the root is disposed; the root is built only once.
    pub fn is_root_built(&self) -> bool {
        self.shared.root.get() == RootState::Built
    }

    /// Key of the root member, while it is registered.
    pub fn root_key(&self) -> Option<K> {
        self.shared.layout.borrow().root_key().cloned()
    }

    /// Number of registered members.
    pub fn len(&self) -> usize {
        self.shared.layout.borrow().len()
    }

    /// True if no member is registered.
    pub fn is_empty(&self) -> bool {
        self.shared.layout.borrow().is_empty()
    }

    /// True if a member is registered under `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.shared.layout.borrow().contains_key(key)
    }

    /// Member registered under `key`.
    pub fn member(&self, key: &K) -> Option<MemberRef<K>> {
        self.shared.layout.borrow().object_of(key).cloned()
    }

    /// Key of the parent of the member registered under `key`.
    pub fn parent_key(&self, key: &K) -> Option<K> {
        self.shared.layout.borrow().parent_key_of(key).cloned()
    }

    /// Every registered key, in pre-order.
    pub fn keys(&self) -> Vec<K> {
        self.shared
            .layout
            .borrow()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    // --- building ---

    /// Build and initialize the root member.
    ///
    /// Only the first call has an effect. Calls made while that first build
    /// is still initializing, or after it finished, return `Ok(())` without
    /// constructing anything. The root is set to
    /// [`MemberLife::Initializing`] during `init_async`, then to
    /// [`MemberLife::Init`].
    pub async fn build_root_member<B: MemberBuilder<K>>(
        &self,
        builder: B,
    ) -> Result<(), NetworkError> {
        if self.shared.root.get() != RootState::Unbuilt {
            tracing::trace!(state = ?self.shared.root.get(), "root build skipped");
            return Ok(());
        }
        let key = builder.key();
        let member = builder.build();
        self.check_key("build_root_member", &key, &member)?;
        self.shared
            .layout
            .borrow_mut()
            .save_root(key.clone(), Rc::clone(&member))
            .map_err(|e| self.violation(e.into()))?;
        self.shared.root.set(RootState::Building);
        self.attach(&member);
        member.core().set_life(MemberLife::Initializing);
        member.init_async().await;
        finish_init(&member);
        self.shared.root.set(RootState::Built);
        tracing::debug!(key = ?key, "root member built");
        Ok(())
    }

    /// Build a member under `source` and initialize it synchronously.
    ///
    /// The member goes straight from [`MemberLife::Absence`] to
    /// [`MemberLife::Init`]. Fails if `source` is not registered, or if the
    /// new key or member is.
    pub fn build_member_sync<B: MemberBuilder<K>>(
        &self,
        source: &dyn Member<K>,
        builder: B,
    ) -> Result<MemberRef<K>, NetworkError> {
        let member = self.register("build_member_sync", source, builder)?;
        member.init();
        member.core().set_life(MemberLife::Init);
        tracing::debug!(key = ?member.key(), "member built");
        Ok(member)
    }

    /// Build a member under `source` and initialize it asynchronously.
    ///
    /// The member is [`MemberLife::Initializing`] from registration until
    /// `init_async` completes, then [`MemberLife::Init`].
    pub async fn build_member_async<B: MemberBuilder<K>>(
        &self,
        source: &dyn Member<K>,
        builder: B,
    ) -> Result<MemberRef<K>, NetworkError> {
        let member = self.register("build_member_async", source, builder)?;
        member.core().set_life(MemberLife::Initializing);
        member.init_async().await;
        finish_init(&member);
        tracing::debug!(key = ?member.key(), "member built");
        Ok(member)
    }

    /// Dispose the member under `key` and its whole subtree.
    ///
    /// Every removed member gets [`Member::dispose`], is set to
    /// [`MemberLife::Absence`] and loses its operator, in pre-order (the
    /// member itself first). Returns how many members were disposed; an
    /// absent key disposes nothing.
    pub fn dispose_member(&self, key: &K) -> usize {
        let mut removed = Vec::new();
        let count = self
            .shared
            .layout
            .borrow_mut()
            .remove_by_key(key, |m| removed.push(m));
        for member in removed {
            member.dispose();
            member.core().set_life(MemberLife::Absence);
            member.core().bind(None);
        }
        if count > 0 {
            tracing::debug!(key = ?key, count, "members disposed");
        }
        count
    }

    // --- events ---

    /// Bubble `event` upward, starting with `member` handling it.
    ///
    /// Runs one [`EventLine`] to completion and returns how it ended. Fails
    /// if the root is not built yet or `member` is not registered.
    pub async fn notify_event(
        &self,
        member: &dyn Member<K>,
        event: Event,
        cause: Option<Event>,
    ) -> Result<Termination<K>, NetworkError> {
        const OP: &str = "notify_event";
        self.ensure_root_built(OP)?;
        let Some(origin) = self.resolve(member) else {
            return Err(self.violation(NetworkError::UnregisteredMember {
                op: OP,
                key: format!("{:?}", member.key()),
            }));
        };
        let mut line = EventLine::new(self);
        line.start(origin, event, cause).await?;
        line.run().await
    }

    /// Send `event` straight to the child under `child`, without bubbling.
    ///
    /// The child's [`Member::handle`] runs with no cause. Fails if the root
    /// is not built yet or `child` is not registered.
    pub async fn process_member(
        &self,
        parent: &dyn Member<K>,
        child: &K,
        event: Event,
    ) -> Result<(), NetworkError> {
        const OP: &str = "process_member";
        self.ensure_root_built(OP)?;
        let Some(target) = self.member(child) else {
            return Err(self.violation(NetworkError::UnresolvedKey {
                op: OP,
                key: format!("{child:?}"),
            }));
        };
        tracing::trace!(from = ?parent.key(), to = ?child, event = event.type_name(), "processing");
        target.handle(event, None).await;
        Ok(())
    }

    /// Ask the child under `child` for an event of type `E`.
    ///
    /// Returns `None` if `child` is not registered, declines, or answers with
    /// a different type.
    pub async fn acquire_event<E: Any>(&self, child: &K) -> Option<Rc<E>> {
        let target = self.member(child)?;
        target.report(TypeId::of::<E>()).await?.downcast::<E>()
    }

    // --- internals ---

    /// Log a contract violation and apply the configured policy.
    pub(crate) fn violation(&self, err: NetworkError) -> NetworkError {
        tracing::error!(op = err.op(), %err, "contract violation");
        if self.config().contract_policy == ContractPolicy::Panic {
            panic!("{err}");
        }
        err
    }

    pub(crate) fn parent_of(
        &self,
        member: &MemberRef<K>,
    ) -> Result<Option<MemberRef<K>>, NetworkError> {
        let layout = self.shared.layout.borrow();
        match layout.parent_of(member) {
            Ok(parent) => Ok(parent.cloned()),
            Err(e) => Err(self.violation(e.into())),
        }
    }

    /// The member must carry the key its builder announced.
    fn check_key(
        &self,
        op: &'static str,
        key: &K,
        member: &MemberRef<K>,
    ) -> Result<(), NetworkError> {
        if member.key() == key {
            return Ok(());
        }
        Err(self.violation(NetworkError::KeyMismatch {
            op,
            builder: format!("{key:?}"),
            member: format!("{:?}", member.key()),
        }))
    }

    fn ensure_root_built(&self, op: &'static str) -> Result<(), NetworkError> {
        if self.is_root_built() {
            Ok(())
        } else {
            Err(self.violation(NetworkError::RootNotBuilt { op }))
        }
    }

    fn resolve(&self, member: &dyn Member<K>) -> Option<MemberRef<K>> {
        self.shared
            .layout
            .borrow()
            .object_by_identity(ObjectId::of_ref(member))
            .cloned()
    }

    /// Construct a member and save it under `source`.
    fn register<B: MemberBuilder<K>>(
        &self,
        op: &'static str,
        source: &dyn Member<K>,
        builder: B,
    ) -> Result<MemberRef<K>, NetworkError> {
        let Some(parent) = self.resolve(source) else {
            return Err(self.violation(LayoutError::UnregisteredParent { op }.into()));
        };
        let key = builder.key();
        let member = builder.build();
        self.check_key(op, &key, &member)?;
        let saved = self
            .shared
            .layout
            .borrow_mut()
            .save(key, Rc::clone(&member), &parent);
        saved.map_err(|e| self.violation(e.into()))?;
        self.attach(&member);
        Ok(member)
    }

    fn attach(&self, member: &MemberRef<K>) {
        member.core().bind(Some(self.operator()));
    }
}

/// Mark `member` initialized, unless it was disposed while initializing.
fn finish_init<K: 'static>(member: &MemberRef<K>) {
    if member.life() == MemberLife::Initializing {
        member.core().set_life(MemberLife::Init);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Key, Probe, entries, log, probe, returning};

    async fn rooted(log: &crate::testing::Log) -> (Network<Key>, MemberRef<Key>) {
        let net = returning();
        net.build_root_member(probe("R", log)).await.unwrap();
        let root = net.member(&"R").unwrap();
        (net, root)
    }

    #[tokio::test]
    async fn root_build_is_idempotent() {
        let log = log();
        let (net, root) = rooted(&log).await;
        net.build_root_member(probe("R2", &log)).await.unwrap();

        assert_eq!(entries(&log), ["init_async R Initializing"]);
        assert_eq!(net.root_key(), Some("R"));
        assert_eq!(net.len(), 1);
        assert_eq!(root.life(), MemberLife::Init);
        assert!(net.is_root_built());
    }

    #[tokio::test]
    async fn root_build_skips_calls_made_while_initializing() {
        let log = log();
        let net: Network<Key> = Network::new();
        let (a, b) = tokio::join!(
            net.build_root_member(Probe::new("R", &log).slow().into_builder()),
            net.build_root_member(probe("R2", &log)),
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(entries(&log), ["init_async R Initializing"]);
        assert_eq!(net.keys(), ["R"]);
    }

    #[tokio::test]
    async fn root_is_not_rebuilt_after_disposal() {
        let log = log();
        let (net, root) = rooted(&log).await;
        assert_eq!(net.dispose_member(&"R"), 1);
        assert_eq!(root.life(), MemberLife::Absence);
        assert!(net.is_empty());

        net.build_root_member(probe("R2", &log)).await.unwrap();
        assert!(net.is_empty());
        assert!(net.is_root_built());
    }

    #[tokio::test]
    async fn sync_build_registers_and_initializes() {
        let log = log();
        let (net, root) = rooted(&log).await;
        let a = net.build_member_sync(&*root, probe("A", &log)).unwrap();

        assert_eq!(a.life(), MemberLife::Init);
        assert_eq!(net.parent_key(&"A"), Some("R"));
        assert!(a.operator().is_some());
        assert!(a.operator().unwrap().same_network(&net.operator()));
        assert_eq!(entries(&log).last().unwrap(), "init A");
    }

    #[tokio::test]
    async fn async_build_is_initializing_during_init() {
        let log = log();
        let (net, root) = rooted(&log).await;
        let a = net
            .build_member_async(&*root, Probe::new("A", &log).slow().into_builder())
            .await
            .unwrap();

        assert_eq!(entries(&log).last().unwrap(), "init_async A Initializing");
        assert_eq!(a.life(), MemberLife::Init);
    }

    #[tokio::test]
    async fn build_reports_registry_violations() {
        let log = log();
        let (net, root) = rooted(&log).await;
        let stray = Probe::new("S", &log);

        let Err(err) = net.build_member_sync(&stray, probe("A", &log)) else {
            panic!("build under an unregistered source succeeded");
        };
        assert_eq!(
            err,
            NetworkError::Layout(LayoutError::UnregisteredParent {
                op: "build_member_sync"
            })
        );

        net.build_member_sync(&*root, probe("A", &log)).unwrap();
        let Err(err) = net.build_member_async(&*root, probe("A", &log)).await else {
            panic!("duplicate key was accepted");
        };
        assert!(matches!(
            err,
            NetworkError::Layout(LayoutError::DuplicateKey { op: "save", .. })
        ));
        assert_eq!(net.len(), 2);
    }

    #[tokio::test]
    async fn dispose_tears_down_subtree_in_order() {
        let log = log();
        let (net, root) = rooted(&log).await;
        let a = net.build_member_sync(&*root, probe("A", &log)).unwrap();
        let b = net.build_member_sync(&*a, probe("B", &log)).unwrap();
        let c = net.build_member_sync(&*root, probe("C", &log)).unwrap();
        log.borrow_mut().clear();

        assert_eq!(net.dispose_member(&"A"), 2);
        assert_eq!(entries(&log), ["dispose A", "dispose B"]);
        for m in [&a, &b] {
            assert_eq!(m.life(), MemberLife::Absence);
            assert!(m.operator().is_none());
        }
        assert_eq!(c.life(), MemberLife::Init);
        assert_eq!(net.keys(), ["R", "C"]);

        assert_eq!(net.dispose_member(&"A"), 0);
        assert_eq!(entries(&log).len(), 2);
    }

    #[tokio::test]
    async fn process_member_pushes_down_without_cause() {
        let log = log();
        let (net, root) = rooted(&log).await;
        net.build_member_sync(&*root, probe("A", &log)).unwrap();
        log.borrow_mut().clear();

        net.process_member(&*root, &"A", Event::new(4_u32))
            .await
            .unwrap();
        assert_eq!(entries(&log), ["enter A:4", "handle A:4"]);

        let err = net
            .process_member(&*root, &"missing", Event::new(()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NetworkError::UnresolvedKey {
                op: "process_member",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn acquire_event_matches_requested_type() {
        let log = log();
        let (net, root) = rooted(&log).await;
        net.build_member_sync(&*root, Probe::new("A", &log).reporting(7).into_builder())
            .unwrap();
        net.build_member_sync(&*root, probe("B", &log)).unwrap();

        assert_eq!(net.acquire_event::<u32>(&"A").await.as_deref(), Some(&7));
        assert!(net.acquire_event::<String>(&"A").await.is_none());
        assert!(net.acquire_event::<u32>(&"B").await.is_none());
        assert!(net.acquire_event::<u32>(&"missing").await.is_none());
    }

    #[tokio::test]
    async fn events_need_a_built_root() {
        let log = log();
        let net = returning();
        let stray = Probe::new("S", &log);

        let err = net
            .notify_event(&stray, Event::new(()), None)
            .await
            .unwrap_err();
        assert_eq!(err, NetworkError::RootNotBuilt { op: "notify_event" });
        let err = net
            .process_member(&stray, &"S", Event::new(()))
            .await
            .unwrap_err();
        assert_eq!(err, NetworkError::RootNotBuilt { op: "process_member" });
        assert!(entries(&log).is_empty());
    }

    #[tokio::test]
    async fn notify_requires_registered_member() {
        let log = log();
        let (net, _root) = rooted(&log).await;
        let stray = Probe::new("S", &log);

        let err = net
            .notify_event(&stray, Event::new(()), None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            NetworkError::UnregisteredMember {
                op: "notify_event",
                key: "\"S\"".into(),
            }
        );
    }

    #[tokio::test]
    async fn operator_outlives_network_without_keeping_it() {
        let log = log();
        let (net, root) = rooted(&log).await;
        let op = root.operator().unwrap();
        assert!(op.network().is_ok());

        drop(net);
        drop(root);
        assert_eq!(op.network().unwrap_err(), NetworkError::NetworkDropped);
        assert_eq!(op.dispose_member(&"R"), Err(NetworkError::NetworkDropped));
    }

    #[tokio::test]
    #[should_panic(expected = "build_member_sync: parent object is not registered")]
    async fn panic_policy_panics_on_violation() {
        let log = log();
        let (net, _root) = rooted(&log).await;
        net.set_contract_policy(ContractPolicy::Panic);
        let stray = Probe::new("S", &log);
        let _ = net.build_member_sync(&stray, probe("A", &log));
    }

    #[cfg(debug_assertions)]
    #[tokio::test]
    #[should_panic(expected = "notify_event: member \"S\" is not registered")]
    async fn debug_builds_panic_by_default() {
        let log = log();
        let net = Network::new();
        net.build_root_member(probe("R", &log)).await.unwrap();
        let stray = Probe::new("S", &log);
        let _ = net.notify_event(&stray, Event::new(()), None).await;
    }

    #[tokio::test]
    async fn builder_and_member_keys_must_agree() {
        let log = log();
        let (net, root) = rooted(&log).await;
        let lying = {
            let log = Rc::clone(&log);
            crate::types::builder("A", move |_| -> MemberRef<Key> {
                Rc::new(Probe::new("B", &log))
            })
        };

        let Err(err) = net.build_member_sync(&*root, lying) else {
            panic!("mismatched keys were accepted");
        };
        assert_eq!(
            err,
            NetworkError::KeyMismatch {
                op: "build_member_sync",
                builder: "\"A\"".into(),
                member: "\"B\"".into(),
            }
        );
        assert_eq!(net.keys(), ["R"]);
    }

    #[tokio::test]
    async fn member_disposed_while_initializing_stays_absent() {
        let log = log();
        let (net, root) = rooted(&log).await;

        let (built, disposed) = tokio::join!(
            net.build_member_async(&*root, Probe::new("A", &log).slow().into_builder()),
            async {
                tokio::task::yield_now().await;
                net.dispose_member(&"A")
            },
        );
        let Ok(a) = built else {
            panic!("async build failed");
        };
        assert_eq!(disposed, 1);
        assert_eq!(a.life(), MemberLife::Absence);
        assert!(a.operator().is_none());
        assert!(!net.contains(&"A"));
    }
}
