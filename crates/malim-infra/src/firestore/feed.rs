//! Live "published products" feed built on polling.
//!
//! The REST API has no push channel, so the feed re-runs the published query
//! on an interval and publishes the full collection whenever it differs from
//! the last delivery. Errors are published too; the next successful poll is
//! always delivered so the consumer can clear its error state. The task ends
//! when the subscriber drops its `ProductFeed`.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use malim_core::catalog::{FeedPublisher, ProductStore};
use malim_types::catalog::Product;

/// Poll `store` every `interval` and push changes to `publisher`.
pub async fn poll_published<S: ProductStore>(store: S, interval: Duration, publisher: FeedPublisher) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last: Option<Vec<Product>> = None;

    loop {
        tokio::select! {
            _ = publisher.closed() => break,
            _ = ticker.tick() => {}
        }

        let delivered = match store.query_published().await {
            Ok(products) if last.as_ref() == Some(&products) => continue,
            Ok(products) => {
                debug!(count = products.len(), "published catalog changed");
                last = Some(products.clone());
                publisher.publish(Ok(products)).await
            }
            Err(err) => {
                warn!(error = %err, "catalog poll failed");
                last = None;
                publisher.publish(Err(err)).await
            }
        };
        if !delivered {
            break;
        }
    }
    debug!("published catalog feed stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use malim_core::catalog::ProductFeed;
    use malim_types::error::StoreError;

    /// Store whose published query walks through a script, repeating the last entry.
    #[derive(Clone)]
    struct ScriptedStore {
        script: Arc<Mutex<VecDeque<Result<Vec<Product>, StoreError>>>>,
        polls: Arc<Mutex<usize>>,
    }

    impl ScriptedStore {
        fn new(script: Vec<Result<Vec<Product>, StoreError>>) -> Self {
            Self {
                script: Arc::new(Mutex::new(script.into())),
                polls: Arc::default(),
            }
        }
    }

    impl ProductStore for ScriptedStore {
        async fn query_published(&self) -> Result<Vec<Product>, StoreError> {
            *self.polls.lock().unwrap() += 1;
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap()
            }
        }

        fn subscribe_published(&self) -> Result<ProductFeed, StoreError> {
            unimplemented!("not used by the poller")
        }

        async fn get_one(&self, _id: &str) -> Result<Product, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn get_many(&self, _ids: &[String]) -> Result<Vec<Product>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn product(id: &str) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": "Prenda",
            "publicPrice": 100,
            "publishOnline": true,
        }))
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_only_changes_and_recovers_after_errors() {
        let store = ScriptedStore::new(vec![
            Ok(vec![product("A")]),
            Ok(vec![product("A")]),
            Err(StoreError::Connection("offline".to_string())),
            Ok(vec![product("A")]),
            Ok(vec![product("A"), product("B")]),
        ]);
        let (publisher, mut feed) = ProductFeed::channel(8);
        tokio::spawn(poll_published(store.clone(), Duration::from_secs(30), publisher));

        let first = feed.recv().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
        assert!(matches!(feed.recv().await, Some(Err(StoreError::Connection(_)))));
        // Same content as before the error, delivered again.
        assert_eq!(feed.recv().await.unwrap().unwrap().len(), 1);
        assert_eq!(feed.recv().await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_subscriber_drops() {
        let store = ScriptedStore::new(vec![Ok(vec![product("A")])]);
        let (publisher, mut feed) = ProductFeed::channel(1);
        let task = tokio::spawn(poll_published(store.clone(), Duration::from_secs(30), publisher));

        assert!(feed.recv().await.is_some());
        drop(feed);

        task.await.unwrap();
        let polls = *store.polls.lock().unwrap();
        assert!(polls >= 1);
    }
}
