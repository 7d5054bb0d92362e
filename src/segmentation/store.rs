use std::collections::HashMap;
use std::sync::Arc;

use log::warn;
use tokio::sync::Mutex;

use crate::models::Segment;

/// Ordered, append-mostly collection of finalized segments.
///
/// Cloning yields another handle to the same collection. Appends come from
/// the serialized ingest path; translation write-backs from any task.
pub struct SegmentStore {
    inner: Arc<Mutex<Vec<Segment>>>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn append(&self, segment: Segment) {
        let mut segments = self.inner.lock().await;
        if let Some(last) = segments.last() {
            if segment.started_at < last.started_at {
                warn!(
                    "segment {} starts before its predecessor {}; keeping arrival order",
                    segment.id, last.id
                );
            }
        }
        segments.push(segment);
    }

    /// Set the translation of the segment with `id`.
    ///
    /// Returns `false` when no such segment exists, e.g. it was merged away
    /// by the post-session pass.
    pub async fn patch_translation(&self, id: &str, translation: String) -> bool {
        let mut segments = self.inner.lock().await;
        match segments.iter_mut().find(|segment| segment.id == id) {
            Some(segment) => {
                segment.translation = translation;
                true
            }
            None => false,
        }
    }

    /// Texts of the last `count` segments, oldest first.
    pub async fn recent_texts(&self, count: usize) -> Vec<String> {
        let segments = self.inner.lock().await;
        let start = segments.len().saturating_sub(count);
        segments[start..]
            .iter()
            .map(|segment| segment.text.clone())
            .collect()
    }

    pub async fn snapshot(&self) -> Vec<Segment> {
        self.inner.lock().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Segment> {
        self.inner
            .lock()
            .await
            .iter()
            .find(|segment| segment.id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Swap in a re-consolidated list.
    ///
    /// Segments that survive under the same id keep any translation that was
    /// patched into the live store after `replacement` was computed.
    pub async fn replace(&self, mut replacement: Vec<Segment>) {
        let mut segments = self.inner.lock().await;
        let live: HashMap<&str, &str> = segments
            .iter()
            .filter(|segment| !segment.translation.is_empty())
            .map(|segment| (segment.id.as_str(), segment.translation.as_str()))
            .collect();

        for segment in replacement.iter_mut() {
            if segment.translation.is_empty() {
                if let Some(translation) = live.get(segment.id.as_str()) {
                    segment.translation = translation.to_string();
                }
            }
        }

        *segments = replacement;
    }

    pub async fn clear(&self) {
        self.inner.lock().await.clear();
    }
}

impl Default for SegmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SegmentStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
