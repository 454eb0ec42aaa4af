use std::time::Duration;

#[cfg(loom)]
pub use loom::sync::atomic::{fence, AtomicPtr, AtomicUsize, Ordering};
#[cfg(not(loom))]
pub use std::sync::atomic::{fence, AtomicPtr, AtomicUsize, Ordering};

#[cfg(not(loom))]
pub use antidote::Mutex;

#[cfg(loom)]
#[derive(Debug, Default)]
pub struct Mutex<T>(loom::sync::Mutex<T>);

#[cfg(loom)]
impl<T> Mutex<T> {
    pub fn new(t: T) -> Self {
        Self(loom::sync::Mutex::new(t))
    }

    pub fn lock(&self) -> loom::sync::MutexGuard<'_, T> {
        self.0.lock().unwrap()
    }
}

/// Short back-off between polls of a slot that has not quiesced yet.
/// Under loom this becomes a yield so the model explores the other threads.
///
/// 轮询尚未静止的槽位之间的短暂退避。
/// 在 loom 下这变成一次 yield，让模型去探索其他线程。
#[cfg(not(loom))]
#[inline]
pub fn pause(interval: Duration) {
    std::thread::sleep(interval);
}

#[cfg(loom)]
#[inline]
pub fn pause(_interval: Duration) {
    loom::thread::yield_now();
}
