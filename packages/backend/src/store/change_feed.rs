use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Set(Value),
    Deleted,
}

/// Snapshot pushed to listeners after every committed write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChange {
    pub path: String,
    pub change: ChangeKind,
    pub committed_at: DateTime<Utc>,
    /// Document removed by a delete; kept server side for listener filtering.
    #[serde(skip)]
    pub previous: Option<Value>,
}

impl DocumentChange {
    pub fn set(path: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            change: ChangeKind::Set(value),
            committed_at: Utc::now(),
            previous: None,
        }
    }

    pub fn deleted(path: impl Into<String>, previous: Value) -> Self {
        Self {
            path: path.into(),
            change: ChangeKind::Deleted,
            committed_at: Utc::now(),
            previous: Some(previous),
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.change {
            ChangeKind::Set(value) => Some(value),
            ChangeKind::Deleted => None,
        }
    }

    /// Field of the written document, or of the removed one for deletes.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.value().or(self.previous.as_ref())?.get(name)
    }
}

type SubscriberId = String;

struct Subscriber {
    prefix: String,
    sender: broadcast::Sender<DocumentChange>,
}

/// Fan-out of committed document changes to prefix-filtered listeners.
pub struct ChangeFeed {
    subscribers: RwLock<HashMap<SubscriberId, Subscriber>>,
    change_count: RwLock<u64>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            change_count: RwLock::new(0),
        }
    }

    pub async fn publish(&self, changes: Vec<DocumentChange>) {
        if changes.is_empty() {
            return;
        }

        {
            let mut count = self.change_count.write().await;
            *count += changes.len() as u64;
        }

        let mut closed = Vec::new();
        {
            let subscribers = self.subscribers.read().await;
            for (id, subscriber) in subscribers.iter() {
                for change in changes.iter().filter(|c| c.path.starts_with(&subscriber.prefix)) {
                    if subscriber.sender.send(change.clone()).is_err() {
                        closed.push(id.clone());
                        break;
                    }
                }
            }
        }

        if !closed.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in &closed {
                subscribers.remove(id);
            }
            debug!(removed = closed.len(), "Pruned closed listeners");
        }
    }

    pub async fn subscribe(&self, prefix: impl Into<String>) -> (SubscriberId, broadcast::Receiver<DocumentChange>) {
        let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);
        let subscriber_id = uuid::Uuid::new_v4().to_string();
        let prefix = prefix.into();

        debug!(subscriber_id = %subscriber_id, prefix = %prefix, "Listener attached");

        let mut subscribers = self.subscribers.write().await;
        subscribers.insert(subscriber_id.clone(), Subscriber { prefix, sender });

        (subscriber_id, receiver)
    }

    pub async fn unsubscribe(&self, subscriber_id: &str) {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.remove(subscriber_id).is_some() {
            debug!(subscriber_id = %subscriber_id, "Listener detached");
        }
    }

    pub async fn listener_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    pub async fn change_count(&self) -> u64 {
        *self.change_count.read().await
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Detaches its listener when dropped, e.g. when an SSE client disconnects.
pub struct ListenerGuard {
    feed: Arc<ChangeFeed>,
    subscriber_id: String,
}

impl ListenerGuard {
    pub fn new(feed: Arc<ChangeFeed>, subscriber_id: String) -> Self {
        Self { feed, subscriber_id }
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let feed = Arc::clone(&self.feed);
        let id = std::mem::take(&mut self.subscriber_id);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                feed.unsubscribe(&id).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prefix_filtering() {
        let feed = ChangeFeed::new();
        let (_, mut users) = feed.subscribe("artifacts/app/users/u1/").await;
        let (_, mut public) = feed.subscribe("artifacts/app/public/").await;

        feed.publish(vec![
            DocumentChange::set("artifacts/app/users/u1/profile/data", serde_json::json!({"xp": 1})),
            DocumentChange::deleted("artifacts/app/public/data/missions/m1", serde_json::json!({"studentId": "u1"})),
        ])
        .await;

        let change = users.recv().await.unwrap();
        assert_eq!(change.path, "artifacts/app/users/u1/profile/data");
        assert_eq!(change.value().unwrap()["xp"], 1);
        assert!(users.try_recv().is_err());

        let change = public.recv().await.unwrap();
        assert!(change.value().is_none());
        assert_eq!(feed.change_count().await, 2);
    }

    #[tokio::test]
    async fn test_closed_listeners_are_pruned() {
        let feed = ChangeFeed::new();
        let (_, receiver) = feed.subscribe("a/").await;
        drop(receiver);
        assert_eq!(feed.listener_count().await, 1);

        feed.publish(vec![DocumentChange::deleted("a/b", serde_json::json!({}))]).await;
        assert_eq!(feed.listener_count().await, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let feed = ChangeFeed::new();
        let (id, _receiver) = feed.subscribe("a/").await;
        feed.unsubscribe(&id).await;
        assert_eq!(feed.listener_count().await, 0);
    }
}
