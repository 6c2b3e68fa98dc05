use indexmap::IndexMap;
use thiserror::Error;
use tracing::trace;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Resource '{0}' released more times than it was demanded")]
    NotDemanded(String),
}

/// Reference-counted demand/release bookkeeping for host resources.
///
/// Demands stack: a resource stays loaded until it has been released as
/// many times as it was demanded.
#[derive(Debug, Default, Clone)]
pub struct ResourceTracker {
    counts: IndexMap<String, usize>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new demand count.
    pub fn demand(&mut self, resource: &str) -> usize {
        let count = self.counts.entry(resource.to_string()).or_insert(0);
        *count += 1;
        trace!(resource, count = *count, "demand");
        *count
    }

    /// Returns the remaining demand count; the resource unloads at zero.
    pub fn release(&mut self, resource: &str) -> Result<usize, ResourceError> {
        let Some(count) = self.counts.get_mut(resource) else {
            return Err(ResourceError::NotDemanded(resource.to_string()));
        };
        *count -= 1;
        let remaining = *count;
        if remaining == 0 {
            self.counts.shift_remove(resource);
        }
        trace!(resource, remaining, "release");
        Ok(remaining)
    }

    pub fn is_loaded(&self, resource: &str) -> bool {
        self.counts.contains_key(resource)
    }

    pub fn count(&self, resource: &str) -> usize {
        self.counts.get(resource).copied().unwrap_or(0)
    }

    pub fn loaded(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demands_stack() {
        let mut tracker = ResourceTracker::new();
        tracker.demand("forest");
        tracker.demand("forest");
        assert_eq!(tracker.release("forest").unwrap(), 1);
        assert!(tracker.is_loaded("forest"));
        assert_eq!(tracker.release("forest").unwrap(), 0);
        assert!(!tracker.is_loaded("forest"));
    }

    #[test]
    fn release_below_zero_fails() {
        let mut tracker = ResourceTracker::new();
        assert_eq!(
            tracker.release("forest"),
            Err(ResourceError::NotDemanded("forest".to_string()))
        );
        tracker.demand("forest");
        tracker.release("forest").unwrap();
        assert!(tracker.release("forest").is_err());
        assert_eq!(tracker.count("forest"), 0);
    }
}
