//! The hub actor: single owner of all shared chat state.
//!
//! One task owns the session index, the membership indices, and the
//! per-channel subscription bookkeeping. Nothing else ever touches those maps;
//! every other task talks to the actor through bounded command queues. That
//! exclusivity is the whole concurrency story — there are no locks here.
//!
//! Chat messages are never delivered locally on publish. They go out to the
//! bus and come back through the channel's subscription task, so every
//! instance (the sender's included) observes the same bus-defined order per
//! channel.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::{channel_topic, Bus, BusSubscription, MEMBERSHIP_TOPIC};
use crate::config::{Config, OverflowPolicy};
use crate::error::{HubError, HubResult};
use crate::hub::propagator;
use crate::models::{Identity, Membership, Message};

const COMMAND_QUEUE_CAPACITY: usize = 10;

/// A connected session as the actor sees it: identity, the memberships known
/// for it, the sender side of its bounded outbound queue, and a shutdown
/// signal its reader listens on. Dropping the entry closes both channels,
/// which stops the writer (queue closed) and the reader (shutdown closed), so
/// removal from the session index tears the whole connection down.
#[derive(Debug, Clone)]
pub(crate) struct SessionEntry {
    pub(crate) identity: Identity,
    pub(crate) memberships: Vec<Membership>,
    pub(crate) outbound: mpsc::Sender<Message>,
    pub(crate) shutdown: mpsc::Sender<()>,
}

/// Per-channel subscription state: how many local memberships are bound to
/// the channel, and the task draining its bus topic. The task exists iff
/// `subscribers > 0`.
struct ChannelSubscription {
    subscribers: usize,
    task: JoinHandle<()>,
}

/// The actor itself. Constructed by [`Hub::spawn`] and moved into its task.
pub struct Hub {
    server_name: String,
    overflow_policy: OverflowPolicy,
    bus: Arc<dyn Bus>,
    /// user id -> connected session.
    sessions: HashMap<i64, SessionEntry>,
    /// membership id -> membership, for every membership of a connected session.
    memberships: HashMap<i64, Membership>,
    /// channel id -> membership ids, the fan-out index.
    channel_members: HashMap<i64, HashSet<i64>>,
    /// channel id -> subscription state.
    subscriptions: HashMap<i64, ChannelSubscription>,
    /// Sender cloned into every channel subscription task.
    inbound_tx: mpsc::Sender<Message>,
}

/// Cloneable handle to a running hub. All interaction with the actor goes
/// through this.
#[derive(Clone)]
pub struct HubHandle {
    register_tx: mpsc::Sender<SessionEntry>,
    unregister_tx: mpsc::Sender<i64>,
    outbound_tx: mpsc::Sender<Message>,
    bus: Arc<dyn Bus>,
    pub(crate) session_queue_capacity: usize,
}

impl Hub {
    /// Spawn the hub actor and the membership propagator, returning the
    /// handle. The membership topic is subscribed before this returns.
    pub async fn spawn(config: Config, bus: Arc<dyn Bus>) -> HubHandle {
        let (register_tx, register_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (unregister_tx, unregister_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (membership_tx, membership_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);

        let handle = HubHandle {
            register_tx,
            unregister_tx,
            outbound_tx,
            bus: bus.clone(),
            session_queue_capacity: config.session_queue_capacity,
        };

        let membership_sub = match bus.subscribe(MEMBERSHIP_TOPIC).await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(error = %e, "membership topic subscription failed");
                BusSubscription::closed()
            }
        };

        let hub = Hub::new(&config, bus, inbound_tx);
        tokio::spawn(propagator::run(membership_sub, membership_tx));
        tokio::spawn(hub.run(
            register_rx,
            unregister_rx,
            inbound_rx,
            outbound_rx,
            membership_rx,
        ));

        handle
    }

    fn new(config: &Config, bus: Arc<dyn Bus>, inbound_tx: mpsc::Sender<Message>) -> Self {
        Self {
            server_name: config.server_name.clone(),
            overflow_policy: config.overflow_policy,
            bus,
            sessions: HashMap::new(),
            memberships: HashMap::new(),
            channel_members: HashMap::new(),
            subscriptions: HashMap::new(),
            inbound_tx,
        }
    }

    async fn run(
        mut self,
        mut register_rx: mpsc::Receiver<SessionEntry>,
        mut unregister_rx: mpsc::Receiver<i64>,
        mut inbound_rx: mpsc::Receiver<Message>,
        mut outbound_rx: mpsc::Receiver<Message>,
        mut membership_rx: mpsc::Receiver<Membership>,
    ) {
        loop {
            tokio::select! {
                Some(entry) = register_rx.recv() => self.register_session(entry).await,
                Some(session_id) = unregister_rx.recv() => self.unregister_session(session_id).await,
                Some(message) = inbound_rx.recv() => self.deliver_inbound(message).await,
                Some(message) = outbound_rx.recv() => self.publish_outbound(&message).await,
                Some(membership) = membership_rx.recv() => self.apply_remote_membership(membership).await,
                else => break,
            }
        }
        debug!("hub actor stopped");
    }

    /// Index a new session and bring up its channel subscriptions. Idempotent:
    /// a second registration for the same user id is ignored.
    async fn register_session(&mut self, entry: SessionEntry) {
        let user_id = entry.identity.user_id;
        if self.sessions.contains_key(&user_id) {
            debug!(user_id, "session already registered");
            return;
        }

        info!(user_id, username = %entry.identity.username, "session registered");
        let memberships = entry.memberships.clone();
        self.sessions.insert(user_id, entry);

        for membership in memberships {
            self.add_subscription(&membership).await;
            let notice = format!("user connected to server {}", self.server_name);
            self.publish_notice(membership.channel_id, user_id, notice)
                .await;
        }
    }

    /// Drop a session and release its channel subscriptions. Unknown ids are
    /// a benign no-op (the reader always fires this on exit, even after a
    /// disconnect-on-overflow already removed the session).
    async fn unregister_session(&mut self, session_id: i64) {
        let Some(entry) = self.sessions.get(&session_id) else {
            debug!(user_id = session_id, "unregister for unknown session");
            return;
        };

        let memberships = entry.memberships.clone();
        for membership in &memberships {
            let notice = format!("user disconnected from server {}", self.server_name);
            self.publish_notice(membership.channel_id, session_id, notice)
                .await;
            self.remove_subscription(membership);
        }

        self.sessions.remove(&session_id);
        info!(user_id = session_id, "session unregistered");
    }

    /// Publish a message on its channel's bus topic. This is the only path a
    /// chat message takes toward delivery; local fan-out happens when it comes
    /// back through [`Hub::deliver_inbound`].
    async fn publish_outbound(&self, message: &Message) {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(channel_id = message.channel_id, error = %e, "failed to encode message");
                return;
            }
        };

        let topic = channel_topic(message.channel_id);
        if let Err(e) = self.bus.publish(&topic, &payload).await {
            warn!(topic = %topic, error = %e, "bus publish failed, dropping message");
        }
    }

    /// Fan a message arriving off the bus out to every local member of its
    /// channel. Never blocks on a slow session: the configured overflow
    /// policy decides between dropping the message and dropping the session.
    async fn deliver_inbound(&mut self, message: Message) {
        let Some(member_ids) = self.channel_members.get(&message.channel_id) else {
            debug!(channel_id = message.channel_id, "no local members for channel");
            return;
        };

        let mut delivered = HashSet::new();
        let mut overflowed = Vec::new();
        for membership_id in member_ids {
            let Some(membership) = self.memberships.get(membership_id) else {
                continue;
            };
            let Some(entry) = self.sessions.get(&membership.user_id) else {
                continue;
            };
            // A user can hold several memberships on one channel; one copy.
            if !delivered.insert(membership.user_id) {
                continue;
            }

            match entry.outbound.try_send(message.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => match self.overflow_policy {
                    OverflowPolicy::DropNew => {
                        warn!(
                            user_id = membership.user_id,
                            channel_id = message.channel_id,
                            "outbound queue full, dropping message for session"
                        );
                    }
                    OverflowPolicy::Disconnect => {
                        warn!(
                            user_id = membership.user_id,
                            channel_id = message.channel_id,
                            "outbound queue full, disconnecting slow session"
                        );
                        overflowed.push(membership.user_id);
                    }
                },
                // Writer already gone; the reader's unregister will clean up.
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }

        for user_id in overflowed {
            self.unregister_session(user_id).await;
        }
    }

    /// Apply a membership update arriving off the membership topic. Ignored
    /// when the user has no session here; idempotent under at-least-once
    /// redelivery.
    async fn apply_remote_membership(&mut self, membership: Membership) {
        if self.memberships.contains_key(&membership.id) {
            debug!(membership_id = membership.id, "membership already applied");
            return;
        }
        let Some(entry) = self.sessions.get_mut(&membership.user_id) else {
            return;
        };

        entry.memberships.push(membership.clone());
        self.add_subscription(&membership).await;
        info!(
            membership_id = membership.id,
            user_id = membership.user_id,
            channel_id = membership.channel_id,
            "remote membership applied"
        );

        self.publish_notice(
            membership.channel_id,
            membership.user_id,
            "user joined the channel".to_string(),
        )
        .await;
    }

    /// Synthetic join/leave notice, attributed to the session's display name
    /// and round-tripped through the bus like any other message.
    async fn publish_notice(&self, channel_id: i64, user_id: i64, content: String) {
        let Some(entry) = self.sessions.get(&user_id) else {
            return;
        };
        let message = Message {
            content,
            channel_id,
            username: entry.identity.username.clone(),
        };
        self.publish_outbound(&message).await;
    }

    /// Index a membership and bump its channel's subscription refcount,
    /// starting the channel's bus subscription on 0 -> 1. The subscription is
    /// live before this returns, so a notice published right after it is
    /// already round-trippable.
    async fn add_subscription(&mut self, membership: &Membership) {
        if self.memberships.contains_key(&membership.id) {
            return;
        }
        self.memberships.insert(membership.id, membership.clone());
        self.channel_members
            .entry(membership.channel_id)
            .or_default()
            .insert(membership.id);

        match self.subscriptions.get_mut(&membership.channel_id) {
            Some(subscription) => subscription.subscribers += 1,
            None => {
                let topic = channel_topic(membership.channel_id);
                let subscription = match self.bus.subscribe(&topic).await {
                    Ok(subscription) => subscription,
                    Err(e) => {
                        warn!(channel_id = membership.channel_id, error = %e, "channel subscription failed");
                        BusSubscription::closed()
                    }
                };
                let task = Self::spawn_multiplexer(
                    membership.channel_id,
                    subscription,
                    self.inbound_tx.clone(),
                );
                self.subscriptions.insert(
                    membership.channel_id,
                    ChannelSubscription {
                        subscribers: 1,
                        task,
                    },
                );
                info!(channel_id = membership.channel_id, "channel subscription started");
            }
        }
    }

    /// Drop a membership from the indices and decrement the refcount, tearing
    /// the channel's bus subscription down on 1 -> 0.
    fn remove_subscription(&mut self, membership: &Membership) {
        if self.memberships.remove(&membership.id).is_none() {
            return;
        }
        if let Some(members) = self.channel_members.get_mut(&membership.channel_id) {
            members.remove(&membership.id);
            if members.is_empty() {
                self.channel_members.remove(&membership.channel_id);
            }
        }

        if let Some(subscription) = self.subscriptions.get_mut(&membership.channel_id) {
            subscription.subscribers -= 1;
            if subscription.subscribers == 0 {
                let subscription = self
                    .subscriptions
                    .remove(&membership.channel_id)
                    .expect("subscription present");
                subscription.task.abort();
                info!(channel_id = membership.channel_id, "channel subscription torn down");
            }
        }
    }

    /// One task per active channel: block on the channel topic, decode each
    /// payload, and hand it to the actor's inbound queue. Lives exactly as
    /// long as its [`ChannelSubscription`]; the actor aborts it on teardown.
    fn spawn_multiplexer(
        channel_id: i64,
        mut subscription: BusSubscription,
        inbound: mpsc::Sender<Message>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(payload) = subscription.recv().await {
                let message: Message = match serde_json::from_str(&payload) {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(channel_id, error = %e, "dropping malformed bus payload");
                        continue;
                    }
                };
                if inbound.send(message).await.is_err() {
                    return;
                }
            }
        })
    }
}

impl HubHandle {
    pub(crate) async fn register(&self, entry: SessionEntry) -> HubResult<()> {
        self.register_tx
            .send(entry)
            .await
            .map_err(|_| HubError::HubClosed)
    }

    /// Remove a session by user id. Safe to call for sessions the hub no
    /// longer knows about.
    pub async fn unregister(&self, session_id: i64) -> HubResult<()> {
        self.unregister_tx
            .send(session_id)
            .await
            .map_err(|_| HubError::HubClosed)
    }

    /// Queue a validated client message for publication on its channel topic.
    pub async fn publish_outbound(&self, message: Message) -> HubResult<()> {
        self.outbound_tx
            .send(message)
            .await
            .map_err(|_| HubError::HubClosed)
    }

    /// Publish a freshly persisted membership on the membership topic. Every
    /// instance — this one included — picks it up off the bus and activates a
    /// matching local session. Call this after the membership is persisted.
    pub async fn announce_membership(&self, membership: &Membership) -> HubResult<()> {
        let payload = serde_json::to_string(membership)?;
        self.bus.publish(MEMBERSHIP_TOPIC, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;
    use std::time::Duration;

    fn test_config() -> Config {
        Config {
            server_name: "test-server".to_string(),
            ..Config::default()
        }
    }

    fn entry(user_id: i64, username: &str, memberships: Vec<Membership>) -> (SessionEntry, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(8);
        let (shutdown, _) = mpsc::channel(1);
        (
            SessionEntry {
                identity: Identity {
                    user_id,
                    username: username.to_string(),
                },
                memberships,
                outbound: tx,
                shutdown,
            },
            rx,
        )
    }

    fn membership(id: i64, user_id: i64, channel_id: i64) -> Membership {
        Membership {
            id,
            user_id,
            channel_id,
        }
    }

    /// Actor under direct control: commands are method calls, no actor task.
    /// The inbound queue receiver is dropped, so multiplexer tasks spawned by
    /// subscriptions exit on their own; these tests drive delivery directly.
    fn test_hub(bus: &MemoryBus) -> Hub {
        let (inbound_tx, _) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        Hub::new(&test_config(), Arc::new(bus.clone()), inbound_tx)
    }

    impl Hub {
        /// A bus subscription task exists for a channel iff its refcount > 0,
        /// and the refcount equals the number of indexed memberships.
        fn assert_subscription_invariant(&self) {
            for (channel_id, subscription) in &self.subscriptions {
                assert!(subscription.subscribers > 0, "zero-refcount subscription kept");
                assert_eq!(
                    subscription.subscribers,
                    self.channel_members.get(channel_id).map_or(0, HashSet::len),
                    "refcount diverged from member index for channel {channel_id}"
                );
            }
            for channel_id in self.channel_members.keys() {
                assert!(
                    self.subscriptions.contains_key(channel_id),
                    "members without a subscription on channel {channel_id}"
                );
            }
        }
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let bus = MemoryBus::new();
        let mut hub = test_hub(&bus);

        let (first, _rx1) = entry(1, "alice", vec![membership(10, 1, 5)]);
        let (second, _rx2) = entry(1, "alice", vec![membership(10, 1, 5)]);

        hub.register_session(first).await;
        hub.register_session(second).await;

        assert_eq!(hub.sessions.len(), 1);
        assert_eq!(hub.subscriptions.get(&5).unwrap().subscribers, 1);
        hub.assert_subscription_invariant();
    }

    #[tokio::test]
    async fn refcount_tracks_joins_and_leaves() {
        let bus = MemoryBus::new();
        let mut hub = test_hub(&bus);

        let (alice, _arx) = entry(1, "alice", vec![membership(10, 1, 5)]);
        let (bob, _brx) = entry(2, "bob", vec![membership(11, 2, 5), membership(12, 2, 6)]);

        hub.register_session(alice).await;
        hub.assert_subscription_invariant();
        hub.register_session(bob).await;
        hub.assert_subscription_invariant();

        assert_eq!(hub.subscriptions.get(&5).unwrap().subscribers, 2);
        assert_eq!(hub.subscriptions.get(&6).unwrap().subscribers, 1);

        hub.unregister_session(2).await;
        hub.assert_subscription_invariant();
        assert_eq!(hub.subscriptions.get(&5).unwrap().subscribers, 1);
        assert!(!hub.subscriptions.contains_key(&6));

        hub.unregister_session(1).await;
        hub.assert_subscription_invariant();
        assert!(hub.subscriptions.is_empty());
        assert!(hub.memberships.is_empty());
        assert!(hub.channel_members.is_empty());
    }

    #[tokio::test]
    async fn unregister_unknown_session_is_noop() {
        let bus = MemoryBus::new();
        let mut hub = test_hub(&bus);

        let (alice, _rx) = entry(1, "alice", vec![membership(10, 1, 5)]);
        hub.register_session(alice).await;

        hub.unregister_session(99).await;
        assert_eq!(hub.sessions.len(), 1);
        hub.assert_subscription_invariant();
    }

    #[tokio::test]
    async fn deliver_fans_out_to_channel_members_only() {
        let bus = MemoryBus::new();
        let mut hub = test_hub(&bus);

        let (alice, mut alice_rx) = entry(1, "alice", vec![membership(10, 1, 5)]);
        let (bob, mut bob_rx) = entry(2, "bob", vec![membership(11, 2, 5)]);
        let (carol, mut carol_rx) = entry(3, "carol", vec![membership(12, 3, 6)]);

        hub.register_session(alice).await;
        hub.register_session(bob).await;
        hub.register_session(carol).await;

        let message = Message {
            content: "hi".to_string(),
            channel_id: 5,
            username: "alice".to_string(),
        };
        hub.deliver_inbound(message.clone()).await;

        assert_eq!(alice_rx.try_recv().unwrap(), message);
        assert_eq!(bob_rx.try_recv().unwrap(), message);
        assert!(carol_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn deliver_to_empty_channel_reaches_nobody() {
        let bus = MemoryBus::new();
        let mut hub = test_hub(&bus);

        let (alice, mut alice_rx) = entry(1, "alice", vec![membership(10, 1, 9)]);
        hub.register_session(alice).await;
        hub.unregister_session(1).await;
        assert!(!hub.subscriptions.contains_key(&9));

        hub.deliver_inbound(Message {
            content: "ghost".to_string(),
            channel_id: 9,
            username: "alice".to_string(),
        })
        .await;
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn overflow_drop_new_keeps_session() {
        let bus = MemoryBus::new();
        let mut hub = test_hub(&bus);

        let (tx, mut rx) = mpsc::channel(1);
        let (shutdown, _shutdown_rx) = mpsc::channel(1);
        hub.register_session(SessionEntry {
            identity: Identity {
                user_id: 1,
                username: "alice".to_string(),
            },
            memberships: vec![membership(10, 1, 5)],
            outbound: tx,
            shutdown,
        })
        .await;

        let message = Message {
            content: "x".to_string(),
            channel_id: 5,
            username: "alice".to_string(),
        };
        hub.deliver_inbound(message.clone()).await;
        hub.deliver_inbound(message.clone()).await; // queue full, dropped

        assert!(hub.sessions.contains_key(&1));
        assert_eq!(rx.try_recv().unwrap(), message);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn overflow_disconnect_removes_session() {
        let bus = MemoryBus::new();
        let config = Config {
            overflow_policy: OverflowPolicy::Disconnect,
            ..test_config()
        };
        let (inbound_tx, _) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let mut hub = Hub::new(&config, Arc::new(bus.clone()), inbound_tx);

        let (tx, _rx) = mpsc::channel(1);
        let (shutdown, mut shutdown_rx) = mpsc::channel(1);
        hub.register_session(SessionEntry {
            identity: Identity {
                user_id: 1,
                username: "alice".to_string(),
            },
            memberships: vec![membership(10, 1, 5)],
            outbound: tx,
            shutdown,
        })
        .await;

        let message = Message {
            content: "x".to_string(),
            channel_id: 5,
            username: "alice".to_string(),
        };
        hub.deliver_inbound(message.clone()).await;
        hub.deliver_inbound(message).await;

        assert!(hub.sessions.is_empty());
        assert!(hub.subscriptions.is_empty());
        hub.assert_subscription_invariant();
        // dropping the entry closed the shutdown channel, stopping the reader
        assert_eq!(shutdown_rx.recv().await, None);
    }

    #[tokio::test]
    async fn duplicate_memberships_deliver_one_copy() {
        let bus = MemoryBus::new();
        let mut hub = test_hub(&bus);

        let (alice, mut alice_rx) = entry(
            1,
            "alice",
            vec![membership(10, 1, 5), membership(11, 1, 5)],
        );
        hub.register_session(alice).await;
        assert_eq!(hub.subscriptions.get(&5).unwrap().subscribers, 2);

        let message = Message {
            content: "hi".to_string(),
            channel_id: 5,
            username: "alice".to_string(),
        };
        hub.deliver_inbound(message.clone()).await;

        assert_eq!(alice_rx.try_recv().unwrap(), message);
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn remote_membership_for_unknown_user_is_ignored() {
        let bus = MemoryBus::new();
        let mut hub = test_hub(&bus);

        hub.apply_remote_membership(membership(10, 7, 5)).await;
        assert!(hub.memberships.is_empty());
        assert!(hub.subscriptions.is_empty());
    }

    #[tokio::test]
    async fn remote_membership_activates_session_and_announces_join() {
        let bus = MemoryBus::new();
        let mut hub = test_hub(&bus);

        let (charlie, _rx) = entry(3, "charlie", vec![]);
        hub.register_session(charlie).await;

        // observe channel 7's topic directly
        let mut topic = bus.subscribe(&channel_topic(7)).await.unwrap();

        hub.apply_remote_membership(membership(20, 3, 7)).await;
        assert_eq!(hub.subscriptions.get(&7).unwrap().subscribers, 1);
        assert_eq!(hub.sessions.get(&3).unwrap().memberships.len(), 1);
        hub.assert_subscription_invariant();

        let payload = tokio::time::timeout(Duration::from_secs(1), topic.recv())
            .await
            .unwrap()
            .unwrap();
        let notice: Message = serde_json::from_str(&payload).unwrap();
        assert_eq!(notice.content, "user joined the channel");
        assert_eq!(notice.channel_id, 7);
        assert_eq!(notice.username, "charlie");
    }

    #[tokio::test]
    async fn remote_membership_is_idempotent() {
        let bus = MemoryBus::new();
        let mut hub = test_hub(&bus);

        let (charlie, _rx) = entry(3, "charlie", vec![]);
        hub.register_session(charlie).await;

        hub.apply_remote_membership(membership(20, 3, 7)).await;
        hub.apply_remote_membership(membership(20, 3, 7)).await;

        assert_eq!(hub.subscriptions.get(&7).unwrap().subscribers, 1);
        assert_eq!(hub.sessions.get(&3).unwrap().memberships.len(), 1);
        hub.assert_subscription_invariant();
    }

    #[tokio::test]
    async fn connect_notice_reaches_the_bus() {
        let bus = MemoryBus::new();
        let mut hub = test_hub(&bus);

        let mut topic = bus.subscribe(&channel_topic(5)).await.unwrap();
        let (alice, _rx) = entry(1, "alice", vec![membership(10, 1, 5)]);
        hub.register_session(alice).await;

        let payload = tokio::time::timeout(Duration::from_secs(1), topic.recv())
            .await
            .unwrap()
            .unwrap();
        let notice: Message = serde_json::from_str(&payload).unwrap();
        assert_eq!(notice.content, "user connected to server test-server");
        assert_eq!(notice.username, "alice");
    }
}
