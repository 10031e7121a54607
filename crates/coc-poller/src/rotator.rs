//! Round-robin token selection shared by every loop

use std::sync::atomic::{AtomicUsize, Ordering};

use common::Secret;
use tracing::info;

use crate::error::{Error, Result};

/// Fixed pool of API tokens with a single global cursor.
///
/// The cursor advances once per dispatched request regardless of which loop
/// issued it, so load spreads evenly across tokens.
#[derive(Debug)]
pub struct CredentialRotator {
    tokens: Vec<Secret<String>>,
    next_index: AtomicUsize,
}

impl CredentialRotator {
    /// Fails with `Error::Config` when `tokens` is empty.
    pub fn new(tokens: Vec<Secret<String>>) -> Result<Self> {
        if tokens.is_empty() {
            return Err(Error::Config("at least one API token is required".into()));
        }
        info!(tokens = tokens.len(), "credential rotator initialized");
        Ok(Self {
            tokens,
            next_index: AtomicUsize::new(0),
        })
    }

    /// Token at the cursor; the cursor then advances, wrapping at the end.
    pub fn next(&self) -> &Secret<String> {
        let n = self.tokens.len();
        let idx = self
            .next_index
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |i| Some((i + 1) % n))
            .unwrap_or_else(|i| i);
        &self.tokens[idx]
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotator(tokens: &[&str]) -> CredentialRotator {
        CredentialRotator::new(tokens.iter().map(|t| Secret::from(*t)).collect()).unwrap()
    }

    #[test]
    fn cycles_through_tokens() {
        let rotator = rotator(&["a", "b"]);
        let picks: Vec<&str> = (0..5).map(|_| rotator.next().expose().as_str()).collect();
        assert_eq!(picks, vec!["a", "b", "a", "b", "a"]);
    }

    #[test]
    fn each_token_once_per_cycle() {
        let rotator = rotator(&["a", "b", "c", "d"]);
        for _ in 0..3 {
            let mut cycle: Vec<String> = (0..4).map(|_| rotator.next().expose().clone()).collect();
            cycle.sort();
            assert_eq!(cycle, vec!["a", "b", "c", "d"]);
        }
    }

    #[test]
    fn single_token_always_selected() {
        let rotator = rotator(&["only"]);
        for _ in 0..3 {
            assert_eq!(rotator.next().expose(), "only");
        }
    }

    #[test]
    fn empty_pool_is_config_error() {
        let err = CredentialRotator::new(vec![]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn shared_across_threads() {
        let rotator = std::sync::Arc::new(rotator(&["a", "b"]));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let rotator = rotator.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| rotator.next().expose().clone())
                        .filter(|t| t == "a")
                        .count()
                })
            })
            .collect();
        let a_count: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(a_count, 100);
    }
}
