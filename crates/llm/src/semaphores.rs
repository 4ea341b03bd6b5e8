//! Per-provider global concurrency semaphores. Created on first use and
//! live for the process lifetime (spec §9 "Global mutable state").

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::provider::Provider;

static REGISTRY: Lazy<Mutex<HashMap<Provider, Arc<Semaphore>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Returns the process-wide semaphore for `provider`, creating it with
/// `permits` the first time it is requested. Subsequent calls ignore
/// `permits` and return the existing semaphore (its size is fixed at
/// process start, matching the spec's singleton-per-provider model).
pub fn semaphore_for(provider: Provider, permits: usize) -> Arc<Semaphore> {
    let mut registry = REGISTRY.lock();
    registry
        .entry(provider)
        .or_insert_with(|| Arc::new(Semaphore::new(permits.max(1))))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_provider_returns_same_semaphore() {
        let a = semaphore_for(Provider::OpenAi, 16);
        let b = semaphore_for(Provider::OpenAi, 4);
        assert_eq!(a.available_permits(), b.available_permits());
    }
}
