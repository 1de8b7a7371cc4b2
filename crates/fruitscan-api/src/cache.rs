//! Last detection cache.

use std::sync::Arc;

use tokio::sync::RwLock;

use fruitscan_models::DetectedFruitSet;

/// Single slot holding the fruit set of the most recently completed detect call.
///
/// Writers take the lock one at a time, so a reader always sees the whole
/// result of one completed call.
#[derive(Debug, Clone, Default)]
pub struct LastDetectionCache {
    slot: Arc<RwLock<DetectedFruitSet>>,
}

impl LastDetectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents; empty before the first successful detect.
    pub async fn get(&self) -> DetectedFruitSet {
        self.slot.read().await.clone()
    }

    /// Replace the contents with a freshly completed result.
    pub async fn store(&self, fruits: DetectedFruitSet) {
        *self.slot.write().await = fruits;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_starts_empty() {
        let cache = LastDetectionCache::new();
        assert!(cache.get().await.is_empty());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = LastDetectionCache::new();
        cache.store(["Banana (কলা)"].into_iter().collect()).await;
        cache.store(["Apple (আপেল)"].into_iter().collect()).await;

        assert_eq!(cache.get().await.joined(), "Apple (আপেল)");
    }

    #[tokio::test]
    async fn test_clones_share_slot() {
        let cache = LastDetectionCache::new();
        let handle = cache.clone();
        handle.store(["Orange (কমলা)"].into_iter().collect()).await;

        assert!(cache.get().await.contains("Orange (কমলা)"));
    }

    #[tokio::test]
    async fn test_concurrent_writers_leave_one_whole_result() {
        let cache = LastDetectionCache::new();
        let sets: Vec<DetectedFruitSet> = vec![
            ["Apple (আপেল)", "Banana (কলা)"].into_iter().collect(),
            ["Mango (আম)", "Orange (কমলা)"].into_iter().collect(),
        ];

        let tasks: Vec<_> = sets
            .iter()
            .cloned()
            .map(|set| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.store(set).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let result = cache.get().await;
        assert!(sets.contains(&result));
    }
}
