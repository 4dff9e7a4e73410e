//! Round-robin issuance of client codes with a TTL quarantine for
//! rate-limited ones. Pure in-memory state, no I/O, no errors.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tracing::warn;

/// Identifier selecting which backend credential slot serves an AI request.
pub type Code = u32;

/// Public handle to the rotator. Cloning shares the underlying pool.
#[derive(Clone)]
pub struct KeyRotator {
    inner: std::sync::Arc<std::sync::Mutex<RotatorInner>>,
}

struct RotatorInner {
    queue: VecDeque<Code>,       // rotates via pop-front/push-back
    blacklist: HashMap<Code, Instant>, // code -> quarantine expiry
    ttl: Duration,
}

impl KeyRotator {
    /// Build the pool in the given order.
    ///
    /// # Panics
    ///
    /// Panics on an empty pool; every later operation relies on a non-empty
    /// queue. `Settings::validate` reports the same condition as a
    /// `SettingsError::EmptyPool` before a rotator is built from config.
    pub fn new(codes: Vec<Code>, ttl: Duration) -> Self {
        assert!(!codes.is_empty(), "no codes configured");
        Self {
            inner: std::sync::Arc::new(std::sync::Mutex::new(RotatorInner {
                queue: codes.into(),
                blacklist: HashMap::new(),
                ttl,
            })),
        }
    }

    /// Rotate the queue left by a random offset so concurrent sessions
    /// spread their first code across the pool. Called once at boot.
    pub fn init_offset(&self) {
        use rand::Rng;
        let mut inner = self.inner.lock().unwrap();
        let offset = rand::thread_rng().gen_range(0..inner.queue.len());
        for _ in 0..offset {
            if let Some(code) = inner.queue.pop_front() {
                inner.queue.push_back(code);
            }
        }
    }

    /// Issue the next usable code under round-robin discipline. A blocked
    /// head is still rotated to the tail but skipped; if every code is
    /// blocked, the head is returned anyway so callers are never left
    /// without a code.
    pub fn next(&self) -> Code {
        self.next_at(Instant::now())
    }

    pub fn next_at(&self, now: Instant) -> Code {
        let mut inner = self.inner.lock().unwrap();
        for _ in 0..inner.queue.len() {
            let code = inner.queue.pop_front().expect("key pool is never empty");
            inner.queue.push_back(code);
            if !inner.blocked_at(code, now) {
                return code;
            }
        }
        let fallback = *inner.queue.front().expect("key pool is never empty");
        warn!(code = fallback, "every code is quarantined, degrading to least recently tried");
        fallback
    }

    /// Quarantine a code for the default TTL.
    pub fn block(&self, code: Code) {
        let ttl = self.inner.lock().unwrap().ttl;
        self.block_at(code, ttl, Instant::now());
    }

    /// Quarantine a code for a specific span. Re-blocking overwrites the
    /// expiry with the new one, it does not take the max of old and new.
    pub fn block_for(&self, code: Code, ttl: Duration) {
        self.block_at(code, ttl, Instant::now());
    }

    pub fn block_at(&self, code: Code, ttl: Duration, now: Instant) {
        let mut inner = self.inner.lock().unwrap();
        inner.blacklist.insert(code, now + ttl);
    }

    pub fn is_blocked(&self, code: Code) -> bool {
        self.is_blocked_at(code, Instant::now())
    }

    pub fn is_blocked_at(&self, code: Code, now: Instant) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.blocked_at(code, now)
    }

    /// Demote a code to the tail without issuing it, e.g. after a caller
    /// used a fixed refresh-control code obtained out of band.
    pub fn touch(&self, code: Code) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(pos) = inner.queue.iter().position(|&c| c == code) {
            inner.queue.remove(pos);
            inner.queue.push_back(code);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the queue in rotation order, for logging and tests.
    pub fn codes(&self) -> Vec<Code> {
        self.inner.lock().unwrap().queue.iter().copied().collect()
    }
}

impl Default for KeyRotator {
    fn default() -> Self {
        Self::new(vec![1, 2, 3], Duration::from_secs(3600))
    }
}

impl RotatorInner {
    // Lazy expiry: a past-expiry entry is purged on lookup.
    fn blocked_at(&mut self, code: Code, now: Instant) -> bool {
        match self.blacklist.get(&code) {
            Some(&until) if now > until => {
                self.blacklist.remove(&code);
                false
            }
            Some(_) => true,
            None => false,
        }
    }
}
