// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Member network: event lines.
//!
//! Two branches under one root bubble events at the same time; the printed
//! trace shows the lines taking turns one hop at a time. A third line is then
//! stepped by hand with `EventLine::start` and `EventLine::hop`.
//!
//! Run:
//! - `cargo run -p understory_demos --example network_lines`

use std::rc::Rc;

use async_trait::async_trait;
use understory_member_network::{
    ContractPolicy, Event, EventLine, Member, MemberCore, MemberRef, Network, NetworkConfig,
    NetworkError, Step, builder,
};

type Key = u32;

/// Adds its own key to every `u32` passing through.
struct Adder {
    core: MemberCore<Key>,
}

fn adder(key: Key) -> MemberRef<Key> {
    Rc::new(Adder {
        core: MemberCore::new(key),
    })
}

#[async_trait(?Send)]
impl Member<Key> for Adder {
    fn core(&self) -> &MemberCore<Key> {
        &self.core
    }

    async fn handle(&self, event: Event, _cause: Option<Event>) {
        println!("  {} handles {:?}", self.key(), event.downcast_ref::<u32>());
    }

    async fn handle_report(&self, event: Event, child: &Key) -> Option<Event> {
        let sum = *event.downcast_ref::<u32>()? + self.key();
        println!("  {} <- {child}: {sum}", self.key());
        Some(Event::new(sum))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), NetworkError> {
    // Report the out-of-order hop below as an error instead of panicking.
    let net = Network::with_config(
        NetworkConfig::default().with_contract_policy(ContractPolicy::Return),
    );
    net.build_root_member(builder(1, adder)).await?;

    // 1 <- 10 <- 100 <- 1000 and 1 <- 20 <- 200 <- 2000
    let mut leaves = Vec::new();
    for branch in [10, 20] {
        let mut parent = net.member(&1).expect("root is registered");
        for key in [branch, branch * 10, branch * 100] {
            parent = net.build_member_sync(&*parent, builder(key, adder))?;
        }
        leaves.push(parent);
    }

    println!("== two lines ==");
    let (left, right) = tokio::join!(
        net.notify_event(&*leaves[0], Event::new(0_u32), None),
        net.notify_event(&*leaves[1], Event::new(0_u32), None),
    );
    println!("left: {:?}\nright: {:?}", left?, right?);

    println!("== stepped line ==");
    let mut line = EventLine::new(&net);
    line.start(Rc::clone(&leaves[0]), Event::new(5_u32), None)
        .await?;
    while let Step::Continue = line.hop().await? {
        println!("  (after hop {})", line.hops());
    }
    println!("ended: {:?}", line.termination());

    // A finished line refuses further hops.
    if let Err(err) = line.hop().await {
        println!("extra hop: {err}");
    }
    Ok(())
}
