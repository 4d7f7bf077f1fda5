// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Upward event bubbling, one ancestor at a time.
//!
//! An [`EventLine`] is a single-use state machine:
//!
//! ```text
//! Idle --start--> Bubbling(origin, event) --hop--> Bubbling(parent, event') --hop--> ... --> Terminated
//! ```
//!
//! Each hop asks the current member's parent to translate the event with
//! [`Member::handle_report`](crate::Member::handle_report). The line ends when
//! the root is reached or an ancestor returns `None`. [`EventLine::run`]
//! drives the hops in a loop and yields to the scheduler before each one, so
//! long chains neither grow the stack nor starve other tasks.

use core::fmt::Debug;

use crate::error::NetworkError;
use crate::network::Network;
use crate::types::{Event, MemberKey, MemberRef};

/// How an [`EventLine`] ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Termination<K> {
    /// The event reached the root; no ancestor is left to report to.
    RootReached {
        /// Key of the last member that handled the event.
        root: K,
        /// Ancestors visited.
        hops: usize,
    },
    /// An ancestor declined to propagate the event further.
    Halted {
        /// Key of the ancestor that returned `None`.
        at: K,
        /// Ancestors visited, including `at`.
        hops: usize,
    },
}

impl<K> Termination<K> {
    /// Ancestors visited before the line ended.
    pub fn hops(&self) -> usize {
        match self {
            Self::RootReached { hops, .. } | Self::Halted { hops, .. } => *hops,
        }
    }
}

/// Outcome of a single [`EventLine::hop`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Step<K> {
    /// The parent translated the event; more hops follow.
    Continue,
    /// The line is finished.
    Done(Termination<K>),
}

enum LineState<K> {
    Idle,
    /// `member` has handled `event`; its parent is next.
    Bubbling { member: MemberRef<K>, event: Event },
    Terminated(Termination<K>),
}

/// One bubbling of one event, from an origin member toward the root.
///
/// Usually driven by [`Network::notify_event`]. Driving it by hand with
/// [`EventLine::start`] and [`EventLine::hop`] gives control over each step.
pub struct EventLine<K> {
    network: Network<K>,
    state: LineState<K>,
    hops: usize,
}

impl<K: Debug + 'static> Debug for EventLine<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut s = f.debug_struct("EventLine");
        match &self.state {
            LineState::Idle => s.field("state", &"Idle"),
            LineState::Bubbling { member, event } => s
                .field("at", member.key())
                .field("event", event),
            LineState::Terminated(t) => s.field("terminated", t),
        };
        s.field("hops", &self.hops).finish()
    }
}

impl<K: MemberKey> EventLine<K> {
    /// Create an idle line on `network`.
    pub fn new(network: &Network<K>) -> Self {
        Self {
            network: network.clone(),
            state: LineState::Idle,
            hops: 0,
        }
    }

    /// Ancestors visited so far.
    pub fn hops(&self) -> usize {
        self.hops
    }

    /// How the line ended, once it has.
    pub fn termination(&self) -> Option<&Termination<K>> {
        match &self.state {
            LineState::Terminated(t) => Some(t),
            _ => None,
        }
    }

    /// True once the line has ended.
    pub fn is_terminated(&self) -> bool {
        matches!(self.state, LineState::Terminated(_))
    }

    /// Let `origin` handle `event`, then record it as the first bubbling step.
    ///
    /// Fails with [`NetworkError::CorruptLine`] unless the line is idle.
    pub async fn start(
        &mut self,
        origin: MemberRef<K>,
        event: Event,
        cause: Option<Event>,
    ) -> Result<(), NetworkError> {
        if !matches!(self.state, LineState::Idle) {
            return Err(self.corrupt("start"));
        }
        tracing::trace!(origin = ?origin.key(), event = event.type_name(), "line started");
        origin.handle(event.clone(), cause).await;
        self.state = LineState::Bubbling {
            member: origin,
            event,
        };
        Ok(())
    }

    /// Report the current event to the current member's parent.
    ///
    /// Fails with [`NetworkError::CorruptLine`] if the line was not started
    /// or already ended, and with a layout error if the current member was
    /// disposed since the previous step.
    pub async fn hop(&mut self) -> Result<Step<K>, NetworkError> {
        let LineState::Bubbling { member, event } =
            core::mem::replace(&mut self.state, LineState::Idle)
        else {
            return Err(self.corrupt("hop"));
        };
        let parent = match self.network.parent_of(&member) {
            Ok(parent) => parent,
            Err(e) => {
                self.state = LineState::Bubbling { member, event };
                return Err(e);
            }
        };
        let Some(parent) = parent else {
            return Ok(self.terminate(Termination::RootReached {
                root: member.key().clone(),
                hops: self.hops,
            }));
        };

        self.hops += 1;
        let child = member.key().clone();
        tracing::trace!(from = ?child, to = ?parent.key(), hop = self.hops, "line hop");
        match parent.handle_report(event, &child).await {
            Some(event) => {
                self.state = LineState::Bubbling {
                    member: parent,
                    event,
                };
                Ok(Step::Continue)
            }
            None => Ok(self.terminate(Termination::Halted {
                at: parent.key().clone(),
                hops: self.hops,
            })),
        }
    }

    /// Hop until the line ends, yielding to the scheduler before every hop.
    pub async fn run(&mut self) -> Result<Termination<K>, NetworkError> {
        loop {
            tokio::task::yield_now().await;
            if let Step::Done(termination) = self.hop().await? {
                return Ok(termination);
            }
        }
    }

    fn terminate(&mut self, termination: Termination<K>) -> Step<K> {
        tracing::debug!(outcome = ?termination, "line terminated");
        self.state = LineState::Terminated(termination.clone());
        Step::Done(termination)
    }

    fn corrupt(&self, op: &'static str) -> NetworkError {
        self.network.violation(NetworkError::CorruptLine { op })
    }
}
