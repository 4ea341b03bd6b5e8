//! Per-job cancellation tokens, keyed by job id.
//!
//! `cancel_job` must be observable by a `process_job` call running on a
//! different task, so tokens live in a shared registry rather than on the
//! `Orchestrator` caller's stack.

use std::collections::HashMap;

use parking_lot::RwLock;

use claw_llm::CancelToken;

#[derive(Default)]
pub struct CancelRegistry {
    tokens: RwLock<HashMap<String, CancelToken>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fresh token for `job_id`, replacing any stale one left
    /// over from a prior run.
    pub fn register(&self, job_id: &str) -> CancelToken {
        let token = CancelToken::default();
        self.tokens.write().insert(job_id.to_string(), token.clone());
        token
    }

    pub fn cancel(&self, job_id: &str) -> bool {
        match self.tokens.read().get(job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, job_id: &str) {
        self.tokens.write().remove(job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_of_unknown_job_is_a_no_op_reported_as_false() {
        let registry = CancelRegistry::new();
        assert!(!registry.cancel("missing"));
    }

    #[test]
    fn registered_token_observes_cancel() {
        let registry = CancelRegistry::new();
        let token = registry.register("job-1");
        assert!(!token.is_cancelled());
        assert!(registry.cancel("job-1"));
        assert!(token.is_cancelled());
    }
}
