//! Bounded blocking calls.
//!
//! The call runs on a detached thread. When the limit elapses the caller gets
//! [`TimeoutError::Elapsed`] immediately; the thread is left to finish on its
//! own and its result is discarded.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeoutError {
    #[error("call did not finish within {0:?}")]
    Elapsed(Duration),

    #[error("call panicked")]
    Panicked,

    #[error("spawning call thread: {0}")]
    Spawn(String),
}

pub fn call_with_timeout<T, F>(name: &str, limit: Duration, f: F) -> Result<T, TimeoutError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            // The receiver is gone once the caller has timed out.
            let _ = tx.send(f());
        })
        .map_err(|e| TimeoutError::Spawn(e.to_string()))?;

    match rx.recv_timeout(limit) {
        Ok(value) => Ok(value),
        Err(RecvTimeoutError::Timeout) => Err(TimeoutError::Elapsed(limit)),
        Err(RecvTimeoutError::Disconnected) => Err(TimeoutError::Panicked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_value_in_time() {
        let v = call_with_timeout("fast", Duration::from_secs(5), || 7).unwrap();
        assert_eq!(v, 7);
    }

    #[test]
    fn slow_call_elapses() {
        let limit = Duration::from_millis(20);
        let err = call_with_timeout("slow", limit, || {
            thread::sleep(Duration::from_millis(500));
        })
        .unwrap_err();
        assert_eq!(err, TimeoutError::Elapsed(limit));
    }

    #[test]
    fn panic_is_reported() {
        let err = call_with_timeout("boom", Duration::from_secs(5), || -> u8 {
            panic!("boom");
        })
        .unwrap_err();
        assert_eq!(err, TimeoutError::Panicked);
    }
}
