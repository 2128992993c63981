//! Channel and membership persistence, consumed by the hub's embedding layer.
//!
//! The core never talks to storage itself: the embedding layer reads a
//! connecting user's memberships here before calling
//! [`HubHandle::connect`], and announces newly persisted memberships with
//! [`HubHandle::announce_membership`]. Real deployments implement
//! [`Repository`] over their database; [`MemoryRepository`] backs tests and
//! single-process embedders.
//!
//! [`HubHandle::connect`]: crate::hub::HubHandle::connect
//! [`HubHandle::announce_membership`]: crate::hub::HubHandle::announce_membership

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::HubResult;
use crate::models::{Channel, Membership};

/// Channel and membership persistence operations.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_channel(&self, name: &str) -> HubResult<Channel>;
    async fn get_channel_by_id(&self, channel_id: i64) -> HubResult<Option<Channel>>;
    async fn get_channels(&self) -> HubResult<Vec<Channel>>;
    async fn create_membership(&self, user_id: i64, channel_id: i64) -> HubResult<Membership>;
    async fn get_memberships_by_user_id(&self, user_id: i64) -> HubResult<Vec<Membership>>;
}

/// In-memory repository with sequential ids.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    channels: HashMap<i64, Channel>,
    memberships: Vec<Membership>,
    next_channel_id: i64,
    next_membership_id: i64,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_channel(&self, name: &str) -> HubResult<Channel> {
        let mut state = self.inner.lock().await;
        state.next_channel_id += 1;
        let channel = Channel {
            id: state.next_channel_id,
            name: name.to_string(),
        };
        state.channels.insert(channel.id, channel.clone());
        Ok(channel)
    }

    async fn get_channel_by_id(&self, channel_id: i64) -> HubResult<Option<Channel>> {
        let state = self.inner.lock().await;
        Ok(state.channels.get(&channel_id).cloned())
    }

    async fn get_channels(&self) -> HubResult<Vec<Channel>> {
        let state = self.inner.lock().await;
        let mut channels: Vec<Channel> = state.channels.values().cloned().collect();
        channels.sort_by_key(|c| c.id);
        Ok(channels)
    }

    async fn create_membership(&self, user_id: i64, channel_id: i64) -> HubResult<Membership> {
        let mut state = self.inner.lock().await;
        state.next_membership_id += 1;
        let membership = Membership {
            id: state.next_membership_id,
            user_id,
            channel_id,
        };
        state.memberships.push(membership.clone());
        Ok(membership)
    }

    async fn get_memberships_by_user_id(&self, user_id: i64) -> HubResult<Vec<Membership>> {
        let state = self.inner.lock().await;
        Ok(state
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_fetch_channel() {
        let repo = MemoryRepository::new();
        let created = repo.create_channel("general").await.unwrap();
        assert_eq!(created.id, 1);

        let fetched = repo.get_channel_by_id(created.id).await.unwrap();
        assert_eq!(fetched, Some(created));
        assert_eq!(repo.get_channel_by_id(99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn memberships_by_user() {
        let repo = MemoryRepository::new();
        let general = repo.create_channel("general").await.unwrap();
        let random = repo.create_channel("random").await.unwrap();

        repo.create_membership(1, general.id).await.unwrap();
        repo.create_membership(1, random.id).await.unwrap();
        repo.create_membership(2, general.id).await.unwrap();

        let memberships = repo.get_memberships_by_user_id(1).await.unwrap();
        assert_eq!(memberships.len(), 2);
        assert!(memberships.iter().all(|m| m.user_id == 1));
    }
}
