// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording member used by the unit tests.

use core::any::TypeId;
use core::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;

use crate::config::{ContractPolicy, NetworkConfig};
use crate::network::Network;
use crate::types::{Event, FnBuilder, Member, MemberCore, MemberRef, builder};

pub(crate) type Key = &'static str;
pub(crate) type Log = Rc<RefCell<Vec<String>>>;

pub(crate) fn log() -> Log {
    Rc::default()
}

pub(crate) fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

/// Network that returns contract violations instead of panicking.
pub(crate) fn returning() -> Network<Key> {
    Network::with_config(NetworkConfig::default().with_contract_policy(ContractPolicy::Return))
}

/// Member that appends every call it receives to a shared log.
///
/// `u32` events are logged with their value (`"report B<-C:30"`).
pub(crate) struct Probe {
    core: MemberCore<Key>,
    log: Log,
    halt: bool,
    scale: Option<u32>,
    slow: bool,
    report: Option<u32>,
}

impl Probe {
    pub(crate) fn new(key: Key, log: &Log) -> Self {
        Self {
            core: MemberCore::new(key),
            log: Rc::clone(log),
            halt: false,
            scale: None,
            slow: false,
            report: None,
        }
    }

    /// Return `None` from `handle_report`.
    pub(crate) fn halting(mut self) -> Self {
        self.halt = true;
        self
    }

    /// Multiply bubbled `u32` events by `factor`.
    pub(crate) fn scaling(mut self, factor: u32) -> Self {
        self.scale = Some(factor);
        self
    }

    /// Suspend inside every async call.
    pub(crate) fn slow(mut self) -> Self {
        self.slow = true;
        self
    }

    /// Answer `u32` report requests with `value`.
    pub(crate) fn reporting(mut self, value: u32) -> Self {
        self.report = Some(value);
        self
    }

    pub(crate) fn into_builder(self) -> FnBuilder<Key, impl FnOnce(Key) -> MemberRef<Key>> {
        builder(*self.core.key(), move |_| -> MemberRef<Key> { Rc::new(self) })
    }

    fn push(&self, entry: String) {
        self.log.borrow_mut().push(entry);
    }

    async fn pause(&self) {
        if self.slow {
            tokio::task::yield_now().await;
            tokio::task::yield_now().await;
        }
    }
}

/// Builder for a plain [`Probe`].
pub(crate) fn probe(key: Key, log: &Log) -> FnBuilder<Key, impl FnOnce(Key) -> MemberRef<Key>> {
    Probe::new(key, log).into_builder()
}

fn describe(event: &Event) -> String {
    match event.downcast_ref::<u32>() {
        Some(v) => format!(":{v}"),
        None => String::new(),
    }
}

#[async_trait(?Send)]
impl Member<Key> for Probe {
    fn core(&self) -> &MemberCore<Key> {
        &self.core
    }

    fn init(&self) {
        self.push(format!("init {}", self.key()));
    }

    async fn init_async(&self) {
        self.push(format!("init_async {} {:?}", self.key(), self.life()));
        self.pause().await;
    }

    fn dispose(&self) {
        self.push(format!("dispose {}", self.key()));
    }

    async fn handle(&self, event: Event, cause: Option<Event>) {
        let tag = if cause.is_some() { " (caused)" } else { "" };
        self.push(format!("enter {}{}{tag}", self.key(), describe(&event)));
        self.pause().await;
        self.push(format!("handle {}{}{tag}", self.key(), describe(&event)));
    }

    async fn handle_report(&self, event: Event, child: &Key) -> Option<Event> {
        self.pause().await;
        self.push(format!("report {}<-{child}{}", self.key(), describe(&event)));
        if self.halt {
            return None;
        }
        match (self.scale, event.downcast_ref::<u32>()) {
            (Some(factor), Some(v)) => Some(Event::new(v * factor)),
            _ => Some(event),
        }
    }

    async fn report(&self, kind: TypeId) -> Option<Event> {
        self.pause().await;
        (kind == TypeId::of::<u32>())
            .then_some(self.report)
            .flatten()
            .map(Event::new)
    }
}
