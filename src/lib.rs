//! Lock-free safe memory reclamation for read-mostly shared snapshots.
//!
//! One atomic pointer references an immutable snapshot; many reader threads
//! dereference it on a hot path; an occasional writer swaps in a fresh
//! snapshot and must destroy the old one without racing still-active
//! readers. This crate provides two primitives that solve the "when is it
//! safe to destroy" problem at two different design points:
//!
//! - [`Protector`]: striped per-thread access counters. Readers increment
//!   a cache-line-exclusive counter around each access; the writer swaps
//!   the pointer and then drains every counter once. Pair it with
//!   [`ProtectedPtr`] for the composed writer protocol.
//! - [`SnapshotGuardian`]: classical hazard-pointer protection over a
//!   double-buffered snapshot pair. Readers announce the exact snapshot
//!   they dereference; the publisher flips a version selector and waits
//!   until no announcement targets the retired buffer.
//!
//! Readers are wait-free on the fast path in both designs and can never
//! fail; writers poll with a short sleep back-off and may block while
//! readers are active. All reclamation-critical stores use sequentially
//! consistent ordering: the correctness argument of both protocols is a
//! statement about the single total order of SeqCst operations, and does
//! not survive weakening to release/acquire.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use swmr_protect::{Protector, ProtectedPtr};
//!
//! let protector = Arc::new(Protector::new());
//! let shared = Arc::new(ProtectedPtr::new(0u64));
//!
//! let readers: Vec<_> = (0..4)
//!     .map(|_| {
//!         let protector = Arc::clone(&protector);
//!         let shared = Arc::clone(&shared);
//!         thread::spawn(move || {
//!             for _ in 0..1000 {
//!                 let guard = protector.acquire();
//!                 let _value = shared.load(&guard);
//!             }
//!         })
//!     })
//!     .collect();
//!
//! // The single writer: swap, drain, destroy, packaged by store().
//! for n in 1..=10 {
//!     shared.store(Some(Box::new(n)), &protector);
//! }
//!
//! for reader in readers {
//!     reader.join().unwrap();
//! }
//! ```
//!
//! 面向读多写少共享快照的无锁安全内存回收。
//! [`Protector`] 使用条带化的每线程访问计数器；[`SnapshotGuardian`]
//! 在双缓冲快照对上使用经典的冒险指针保护。两种设计下读者的快路径
//! 都是 wait-free 且永不失败；写者以短暂休眠退避进行轮询。
//! 所有回收关键的存储都使用顺序一致的内存序。

mod guard;
mod guardian;
mod hazard;
mod protector;
mod ptr;
mod slot;
mod sync;

pub use guard::AccessGuard;
pub use guardian::{GuardianBuilder, SnapshotGuardian, SnapshotLease};
pub use protector::{Protector, ProtectorBuilder};
pub use ptr::ProtectedPtr;

#[cfg(all(test, not(loom)))]
mod tests;
