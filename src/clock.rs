use std::time::{SystemTime, UNIX_EPOCH};

/// Time source injected into codecs so decode logic is deterministic under test.
pub trait Clock: Send + Sync {
    fn now_ns(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ns(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the unix epoch")
            .as_nanos() as i64
    }
}
