// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Member network: a small form.
//!
//! `app` owns `form`, which owns two text fields. Members build their own
//! children during `init_async`. The demo then:
//! - edits a field and bubbles the edit up (the form translates it, the app
//!   halts the line);
//! - pulls a field's value with `acquire_event`;
//! - pushes a reset down from the app with `process_member`;
//! - disposes the form subtree.
//!
//! Run:
//! - `cargo run -p understory_demos --example network_form`
//! - `RUST_LOG=trace cargo run -p understory_demos --example network_form`

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;
use understory_member_network::{
    Event, Member, MemberCore, MemberRef, Network, NetworkError, builder,
};

type Key = &'static str;

#[derive(Debug)]
struct Edited(String);

#[derive(Debug)]
struct FormChanged {
    dirty: Vec<Key>,
}

#[derive(Debug)]
struct Reset;

struct App {
    core: MemberCore<Key>,
}

#[async_trait(?Send)]
impl Member<Key> for App {
    fn core(&self) -> &MemberCore<Key> {
        &self.core
    }

    async fn init_async(&self) {
        let Some(op) = self.operator() else { return };
        let form = builder("form", |key| -> MemberRef<Key> { Rc::new(Form::new(key)) });
        if let Err(err) = op.build_member_async(self, form).await {
            tracing::error!(%err, "building form");
        }
    }

    async fn handle(&self, event: Event, _cause: Option<Event>) {
        tracing::info!(event = event.type_name(), "app handled");
    }

    async fn handle_report(&self, event: Event, child: &Key) -> Option<Event> {
        if let Some(changed) = event.downcast_ref::<FormChanged>() {
            println!("app: {child} changed, dirty fields {:?}", changed.dirty);
        }
        None
    }
}

struct Form {
    core: MemberCore<Key>,
    fields: RefCell<Vec<Key>>,
    dirty: RefCell<BTreeSet<Key>>,
}

impl Form {
    fn new(key: Key) -> Self {
        Self {
            core: MemberCore::new(key),
            fields: RefCell::default(),
            dirty: RefCell::default(),
        }
    }
}

#[async_trait(?Send)]
impl Member<Key> for Form {
    fn core(&self) -> &MemberCore<Key> {
        &self.core
    }

    async fn init_async(&self) {
        let Some(op) = self.operator() else { return };
        for name in ["name", "email"] {
            let field = builder(name, |key| -> MemberRef<Key> { Rc::new(Field::new(key)) });
            match op.build_member_sync(self, field) {
                Ok(_) => self.fields.borrow_mut().push(name),
                Err(err) => tracing::error!(%err, name, "building field"),
            }
        }
    }

    async fn handle(&self, event: Event, _cause: Option<Event>) {
        if !event.is::<Reset>() {
            return;
        }
        self.dirty.borrow_mut().clear();
        let Some(op) = self.operator() else { return };
        let fields = self.fields.borrow().clone();
        for field in fields {
            if let Err(err) = op.process_member(self, &field, event.clone()).await {
                tracing::warn!(%err, field, "reset skipped");
            }
        }
    }

    async fn handle_report(&self, event: Event, child: &Key) -> Option<Event> {
        event.downcast_ref::<Edited>()?;
        self.dirty.borrow_mut().insert(*child);
        let dirty = self.dirty.borrow().iter().copied().collect();
        Some(Event::new(FormChanged { dirty }))
    }

    fn dispose(&self) {
        println!("form: disposed with {} dirty", self.dirty.borrow().len());
    }
}

struct Field {
    core: MemberCore<Key>,
    value: RefCell<String>,
}

impl Field {
    fn new(key: Key) -> Self {
        Self {
            core: MemberCore::new(key),
            value: RefCell::default(),
        }
    }
}

#[async_trait(?Send)]
impl Member<Key> for Field {
    fn core(&self) -> &MemberCore<Key> {
        &self.core
    }

    async fn handle(&self, event: Event, _cause: Option<Event>) {
        if let Some(Edited(text)) = event.downcast_ref::<Edited>() {
            *self.value.borrow_mut() = text.clone();
        } else if event.is::<Reset>() {
            self.value.borrow_mut().clear();
        }
    }

    async fn report(&self, kind: TypeId) -> Option<Event> {
        (kind == TypeId::of::<String>()).then(|| Event::new(self.value.borrow().clone()))
    }

    fn dispose(&self) {
        println!("{}: disposed", self.key());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), NetworkError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let net = Network::new();
    net.build_root_member(builder("app", |key| -> MemberRef<Key> {
        Rc::new(App {
            core: MemberCore::new(key),
        })
    }))
    .await?;
    println!("members: {:?}", net.keys());

    let name = net.member(&"name").expect("form builds its fields");
    let end = net
        .notify_event(&*name, Event::new(Edited("Ada".into())), None)
        .await?;
    println!("line ended: {end:?}");

    let value = net.acquire_event::<String>(&"name").await;
    println!("name = {value:?}");

    let app = net.member(&"app").expect("root is registered");
    net.process_member(&*app, &"form", Event::new(Reset)).await?;
    println!("name after reset = {:?}", net.acquire_event::<String>(&"name").await);

    let disposed = net.dispose_member(&"form");
    println!("disposed {disposed}, members: {:?}", net.keys());
    Ok(())
}
