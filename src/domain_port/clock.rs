use chrono::{DateTime, Utc};

/// Wall-clock source shared by the codec, the token service and the memory
/// cache so every expiry comparison reads the same time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
