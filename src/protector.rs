use crate::guard::AccessGuard;
use crate::slot::{thread_ordinal, CounterSlot, DEFAULT_SLOTS};
use crate::sync::{pause, Ordering};
use std::time::Duration;

/// How long the writer sleeps between polls of a slot that is still held.
/// 写者在轮询仍被持有的槽位之间休眠的时长。
pub(crate) const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(250);

/// Builder for configuring a [`Protector`].
///
/// - `slots`: width of the counter table (≥ 1). Size it to the expected
///   maximum number of concurrent reader threads; more threads than slots
///   stay correct but share counters.
/// - `poll_interval`: back-off between drain polls.
///
/// # Example
/// ```
/// use swmr_protect::Protector;
///
/// let protector = Protector::builder()
///     .slots(8)
///     .poll_interval(std::time::Duration::from_micros(50))
///     .build();
/// ```
///
/// 用于配置 [`Protector`] 的构建器。
pub struct ProtectorBuilder {
    slots: usize,
    poll_interval: Duration,
}

impl ProtectorBuilder {
    /// Create a new builder with default settings.
    /// 创建一个带有默认设置的新构建器。
    #[inline]
    pub fn new() -> Self {
        Self {
            slots: DEFAULT_SLOTS,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the number of counter slots. Must be at least 1.
    ///
    /// Default: `64`
    ///
    /// 设置计数器槽位的数量。必须至少为 1。
    #[inline]
    pub fn slots(mut self, slots: usize) -> Self {
        assert!(slots >= 1, "BUG: a Protector needs at least one slot");
        self.slots = slots;
        self
    }

    /// Set the sleep interval used while draining.
    ///
    /// Default: `250µs`
    ///
    /// 设置排空时使用的休眠间隔。
    #[inline]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Build the `Protector` with the configured settings.
    /// 使用配置的设置构建 `Protector`。
    #[inline]
    pub fn build(self) -> Protector {
        let slots = (0..self.slots).map(|_| CounterSlot::new()).collect();
        Protector {
            slots,
            poll_interval: self.poll_interval,
        }
    }
}

impl Default for ProtectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A striped-counter protector for read-mostly shared state.
///
/// Readers mark themselves active by incrementing a per-thread counter slot
/// ([`acquire()`](Protector::acquire)); a writer observes quiescence by
/// waiting until every slot has been seen at zero ([`drain()`](Protector::drain)).
/// The counters say nothing about *which* snapshot a reader is using; the
/// writer protocol supplies that:
///
/// 1. Construct the new snapshot.
/// 2. Swap the shared pointer from old to new (one `SeqCst` exchange).
/// 3. Call `drain()`.
/// 4. Destroy the old snapshot.
///
/// [`ProtectedPtr`](crate::ProtectedPtr) packages exactly this sequence.
///
/// Every counter update and the pointer swap are sequentially consistent,
/// so they fall into one total order that all threads agree on. A reader
/// that dereferences the old snapshot incremented its slot before it loaded
/// the pointer, hence before the swap; the writer's drain therefore cannot
/// miss that increment, and seeing the slot at zero once means every such
/// reader has released. Slots do not need to be zero simultaneously.
///
/// Writer mutual exclusion is external: callers must serialise the
/// swap/drain/destroy sequence themselves (e.g. by owning the writer role
/// on one thread). Reader acquire/release is wait-free and never fails.
///
/// 面向读多写少共享状态的条带计数器保护器。
/// 读者通过递增每线程的计数器槽位（[`acquire()`](Protector::acquire)）标记
/// 自己活跃；写者通过等待每个槽位都被观察到为零（[`drain()`](Protector::drain)）
/// 来确认静止。计数器本身不记录读者正在使用*哪个*快照，由写者协议补足：
/// 构造新快照 → 以一次 `SeqCst` 交换替换共享指针 → `drain()` → 销毁旧快照。
/// 所有计数器更新与指针交换都是顺序一致的，因此处于所有线程一致认可的
/// 单一全序中：任何解引用旧快照的读者，其递增先于其指针加载、从而先于
/// 交换；写者的排空必然观察到该递增。各槽位无需同时为零。
/// 写者互斥由外部提供；读者的获取/释放是 wait-free 的且永不失败。
pub struct Protector {
    slots: Box<[CounterSlot]>,
    poll_interval: Duration,
}

impl Protector {
    /// Create a protector with the default table width (64 slots).
    /// 创建一个具有默认表宽（64 个槽位）的保护器。
    #[inline]
    pub fn new() -> Self {
        ProtectorBuilder::new().build()
    }

    /// Create a protector with `slots` counter slots.
    /// 创建一个具有 `slots` 个计数器槽位的保护器。
    #[inline]
    pub fn with_slots(slots: usize) -> Self {
        ProtectorBuilder::new().slots(slots).build()
    }

    /// Create a builder for configuring the protector.
    /// 创建一个用于配置保护器的构建器。
    #[inline]
    pub fn builder() -> ProtectorBuilder {
        ProtectorBuilder::new()
    }

    /// Mark the calling thread active and return the guard that ends the
    /// access when dropped.
    ///
    /// The thread's slot is chosen on its first acquire anywhere in the
    /// process and stays stable afterwards (see the slot-sharing note on
    /// [`ProtectorBuilder::slots`]). The increment is one sequentially
    /// consistent RMW; it is wait-free and cannot fail. Acquire is
    /// reentrant: a thread may hold any number of guards, each counted
    /// independently.
    ///
    /// 标记调用线程为活跃，并返回在 drop 时结束本次访问的守卫。
    /// 线程的槽位在其于进程内首次 acquire 时选定，此后保持稳定。
    /// 递增是一次顺序一致的 RMW，wait-free 且不会失败。
    /// acquire 可重入：一个线程可以持有任意数量的守卫，
    /// 每个都被独立计数。
    #[inline]
    pub fn acquire(&self) -> AccessGuard<'_> {
        let slot = &self.slots[thread_ordinal() % self.slots.len()];
        slot.outstanding.fetch_add(1, Ordering::SeqCst);
        AccessGuard::new(slot)
    }

    /// Wait until every slot has been observed at zero at least once during
    /// this call.
    ///
    /// This is the writer's quiescence barrier: once it returns, no reader
    /// that could still dereference a snapshot retired *before* the call's
    /// pointer swap remains active. Polls each slot in order with a short
    /// sleep back-off; returns immediately when no readers are active.
    ///
    /// Liveness depends on readers releasing their guards. A guard held
    /// forever stalls the drain indefinitely; there is no timeout.
    ///
    /// 等待直到每个槽位在本次调用期间至少被观察到一次为零。
    /// 这是写者的静止屏障：一旦返回，任何仍可能解引用在本次调用的指针
    /// 交换*之前*退休的快照的读者都已不再活跃。按顺序轮询每个槽位并以
    /// 短暂休眠退避；没有活跃读者时立即返回。
    /// 活性取决于读者释放其守卫。被永久持有的守卫会使排空无限期停滞；
    /// 没有超时。
    pub fn drain(&self) {
        for slot in self.slots.iter() {
            while slot.outstanding.load(Ordering::SeqCst) != 0 {
                pause(self.poll_interval);
            }
        }
    }

    /// Total outstanding guards across all slots. Test introspection only;
    /// the value is stale the moment it is computed.
    #[cfg(test)]
    pub(crate) fn outstanding(&self) -> usize {
        self.slots
            .iter()
            .map(|slot| slot.outstanding.load(Ordering::SeqCst))
            .sum()
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

impl Default for Protector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Protector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Protector")
            .field("slots", &self.slots.len())
            .finish_non_exhaustive()
    }
}
