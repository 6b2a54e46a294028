//! Generation counter + invocation tokens.
//! Every `run` and every `cancel` advances the generation; a token whose
//! generation has been passed is superseded and its outcome is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

/// Monotonic generation counter shared by all invocations of one controller.
/// Advancing cancels the previous generation's root token and issues a fresh one.
pub struct InvocationCounter {
    current_token: RwLock<CancellationToken>,
    generation: AtomicU64,
}

impl InvocationCounter {
    pub fn new() -> Self {
        Self {
            current_token: RwLock::new(CancellationToken::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Cancel every outstanding token, advance, return the new generation and its child token.
    pub fn next(&self) -> (u64, CancellationToken) {
        let mut token_guard = self.current_token.write();
        // bump first so woken waiters already observe themselves as superseded
        let gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        token_guard.cancel();
        let new_root = CancellationToken::new();
        let child = new_root.child_token();
        *token_guard = new_root;
        (gen, child)
    }

    /// Read current generation.
    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Default for InvocationCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Issue a token for a brand-new generation.
pub(crate) fn issue(counter: &Arc<InvocationCounter>) -> InvocationToken {
    let (id, token) = counter.next();
    InvocationToken {
        counter: Arc::clone(counter),
        id,
        token,
    }
}

/// Invocation-scoped context handed to the task function.
/// Immutable; `is_superseded` is a live query against the counter.
#[derive(Clone)]
pub struct InvocationToken {
    counter: Arc<InvocationCounter>,
    id: u64,
    token: CancellationToken,
}

impl InvocationToken {
    /// Generation this invocation was started with.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True once any later `run` or `cancel` has begun. Never flips back.
    #[inline]
    pub fn is_superseded(&self) -> bool {
        self.counter.current() > self.id
    }

    /// Cooperative checkpoint for task bodies; same as [`Self::is_superseded`].
    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.is_superseded()
    }

    /// Resolves once this invocation is superseded.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.token
    }
}

impl std::fmt::Debug for InvocationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationToken")
            .field("id", &self.id)
            .field("superseded", &self.is_superseded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn counter_is_strictly_increasing() {
        let counter = InvocationCounter::new();
        assert_eq!(counter.current(), 0);
        let (a, _) = counter.next();
        let (b, _) = counter.next();
        assert_eq!(a, 1);
        assert_eq!(b, 2);
        assert_eq!(counter.current(), 2);
    }

    #[test]
    fn token_is_superseded_by_any_later_generation() {
        let counter = Arc::new(InvocationCounter::new());
        let first = issue(&counter);
        assert!(!first.is_superseded());

        let second = issue(&counter);
        assert!(first.is_superseded());
        assert!(first.is_canceled());
        assert!(!second.is_superseded());

        counter.next();
        assert!(second.is_superseded());
    }

    #[test]
    fn advancing_cancels_previous_child_token() {
        let counter = Arc::new(InvocationCounter::new());
        let first = issue(&counter);
        assert!(!first.cancellation_token().is_cancelled());
        let second = issue(&counter);
        assert!(first.cancellation_token().is_cancelled());
        assert!(!second.cancellation_token().is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_on_supersession() {
        let counter = Arc::new(InvocationCounter::new());
        let token = issue(&counter);
        let waiter = token.clone();

        let bump = Arc::clone(&counter);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            bump.next();
        });

        tokio::time::timeout(Duration::from_secs(1), waiter.cancelled())
            .await
            .expect("cancelled() should resolve once superseded");
        assert!(token.is_superseded());
    }
}
