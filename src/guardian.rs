use crate::hazard::{HazardTable, PaddedPtr};
use crate::protector::DEFAULT_POLL_INTERVAL;
use crate::sync::{fence, pause, AtomicUsize, Mutex, Ordering};
use std::marker::PhantomData;
use std::time::Duration;

/// Default hazard-table width, sized for the expected maximum number of
/// concurrent reader threads.
/// 冒险表的默认宽度，按预期的最大并发读者线程数确定。
const DEFAULT_MAX_THREADS: usize = 64;

/// Builder for configuring a [`SnapshotGuardian`].
///
/// - `max_threads`: hazard-table width; reader thread ids must stay in
///   `[0, max_threads)`.
/// - `poll_interval`: back-off between hazard-table scans while retiring.
///
/// # Example
/// ```
/// use swmr_protect::SnapshotGuardian;
///
/// let guardian: SnapshotGuardian<u64> = SnapshotGuardian::builder()
///     .max_threads(8)
///     .poll_interval(std::time::Duration::from_micros(50))
///     .build();
/// ```
///
/// 用于配置 [`SnapshotGuardian`] 的构建器。
pub struct GuardianBuilder<T> {
    max_threads: usize,
    poll_interval: Duration,
    _marker: PhantomData<T>,
}

impl<T> GuardianBuilder<T> {
    /// Create a new builder with default settings.
    /// 创建一个带有默认设置的新构建器。
    #[inline]
    pub fn new() -> Self {
        Self {
            max_threads: DEFAULT_MAX_THREADS,
            poll_interval: DEFAULT_POLL_INTERVAL,
            _marker: PhantomData,
        }
    }

    /// Set the hazard-table width. Must be at least 1.
    ///
    /// Default: `64`
    ///
    /// 设置冒险表的宽度。必须至少为 1。
    #[inline]
    pub fn max_threads(mut self, max_threads: usize) -> Self {
        assert!(
            max_threads >= 1,
            "BUG: a SnapshotGuardian needs at least one hazard slot"
        );
        self.max_threads = max_threads;
        self
    }

    /// Set the sleep interval used while waiting out hazards.
    ///
    /// Default: `250µs`
    ///
    /// 设置等待冒险指针清除时使用的休眠间隔。
    #[inline]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Build the `SnapshotGuardian` with the configured settings. It starts
    /// empty; leases observe `None` until the first publish.
    ///
    /// 使用配置的设置构建 `SnapshotGuardian`。它初始为空；
    /// 在首次发布之前，租约观察到 `None`。
    pub fn build(self) -> SnapshotGuardian<T> {
        SnapshotGuardian {
            buffers: [PaddedPtr::null(), PaddedPtr::null()],
            version: AtomicUsize::new(0),
            hazards: HazardTable::new(self.max_threads),
            publish_lock: Mutex::new(()),
            poll_interval: self.poll_interval,
            _marker: PhantomData,
        }
    }
}

impl<T> Default for GuardianBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A self-contained snapshot publisher with hazard-pointer protection.
///
/// The guardian owns a double-buffered pair of snapshot pointers and a
/// version selector: at any instant the selected buffer holds the live
/// snapshot, the other belongs to the publisher. Readers take leases
/// ([`lease()`](SnapshotGuardian::lease)); the publisher installs a
/// replacement and retires the displaced snapshot
/// ([`publish()`](SnapshotGuardian::publish)), destroying it only after the
/// hazard table shows no thread still dereferencing it.
///
/// The correctness hinge is that the reader's hazard announcement and the
/// publisher's version flip are both sequentially consistent, so they fall
/// into one total order every thread agrees on. If a reader re-reads the
/// version unchanged after announcing, its announcement precedes the flip
/// in that order, and the publisher, which scans hazards only after its
/// own flip, is then guaranteed to see it. If the flip won instead, the
/// re-read differs and the reader retries against the new version. Neither
/// side can be weakened to release/acquire: the two stores are to different
/// locations and only the SeqCst total order relates them.
///
/// Reader thread ids are caller-assigned, opaque, and must be stable and in
/// range `[0, max_threads)`; out-of-range ids panic. Publishers are
/// serialised by an internal mutex, so `publish` may be called from any
/// thread. Publishing may block arbitrarily while readers hold leases on
/// the displaced snapshot; there is no timeout.
///
/// 带冒险指针保护的自足式快照发布器。
/// 守护者拥有一对双缓冲快照指针和一个版本选择器：任一时刻被选中的
/// 缓冲持有活动快照，另一半属于发布者。读者获取租约
/// （[`lease()`](SnapshotGuardian::lease)）；发布者安装替换并退休被换下
/// 的快照（[`publish()`](SnapshotGuardian::publish)），只有当冒险表显示
/// 没有线程仍在解引用它时才将其销毁。
/// 正确性的关键在于：读者的冒险公告与发布者的版本翻转都是顺序一致
/// 的，因而处于所有线程一致认可的单一全序中。若读者公告后重读版本未
/// 变，则其公告在该全序中先于翻转，而只在自身翻转之后才扫描冒险表
/// 的发布者必然看到它。若翻转先行，重读便会不同，读者针对新版本重试。
/// 两侧都不可弱化为 release/acquire：两个存储位于不同位置，
/// 只有 SeqCst 全序将它们关联。
/// 读者线程 id 由调用者指定、对守护者不透明，必须稳定且处于
/// `[0, max_threads)` 之内；越界的 id 会 panic。发布者由内部互斥锁
/// 串行化。发布可能在读者持有被换下快照的租约期间任意阻塞；没有超时。
pub struct SnapshotGuardian<T> {
    /// The snapshot pair; `buffers[version]` is live, the other half is
    /// null or mid-retirement and owned by the publisher.
    buffers: [PaddedPtr<T>; 2],
    /// Version selector, 0 or 1.
    version: AtomicUsize,
    hazards: HazardTable<T>,
    publish_lock: Mutex<()>,
    poll_interval: Duration,
    _marker: PhantomData<*mut T>,
}

unsafe impl<T: Send + Sync> Send for SnapshotGuardian<T> {}
unsafe impl<T: Send + Sync> Sync for SnapshotGuardian<T> {}

impl<T: Send + Sync + 'static> SnapshotGuardian<T> {
    /// Create a guardian with the default hazard-table width (64 threads).
    /// 创建一个具有默认冒险表宽度（64 线程）的守护者。
    #[inline]
    pub fn new() -> Self {
        GuardianBuilder::new().build()
    }

    /// Create a guardian admitting reader ids in `[0, max_threads)`.
    /// 创建一个接受 `[0, max_threads)` 范围内读者 id 的守护者。
    #[inline]
    pub fn with_max_threads(max_threads: usize) -> Self {
        GuardianBuilder::new().max_threads(max_threads).build()
    }

    /// Create a builder for configuring the guardian.
    /// 创建一个用于配置守护者的构建器。
    #[inline]
    pub fn builder() -> GuardianBuilder<T> {
        GuardianBuilder::new()
    }

    /// Take a lease on the current snapshot for reader `thread_id`.
    ///
    /// Announces the snapshot in the thread's hazard slot, then confirms
    /// the version did not flip underneath; on a lost race it withdraws and
    /// retries. Wait-free in the common case: a retry needs a concurrent
    /// publish to have hit exactly the announcement window. The lease
    /// withdraws the announcement when dropped; until then the publisher
    /// will not destroy the leased snapshot.
    ///
    /// # Panics
    /// If `thread_id` is outside `[0, max_threads)`.
    ///
    /// 为读者 `thread_id` 获取当前快照的租约。
    /// 在该线程的冒险槽位中公告快照，然后确认版本没有在此期间翻转；
    /// 若竞争失败则撤回并重试。常见情形下是 wait-free 的：重试要求
    /// 并发发布恰好命中公告窗口。租约在 drop 时撤回公告；
    /// 在此之前发布者不会销毁被租用的快照。
    pub fn lease(&self, thread_id: usize) -> SnapshotLease<'_, T> {
        assert!(
            thread_id < self.hazards.len(),
            "BUG: reader thread id {} out of range (max_threads = {})",
            thread_id,
            self.hazards.len()
        );

        loop {
            // Acquire pairs with the SeqCst flip in publish(): seeing the
            // new version implies seeing the replacement stored just
            // before it.
            let version = self.version.load(Ordering::Acquire);
            let snapshot = self.buffers[version].ptr.load(Ordering::Relaxed);
            self.hazards.announce(thread_id, snapshot);
            // Pairs with the fence after the version flip in publish():
            // either this fence orders the announcement before the
            // publisher's scan, or the publisher's fence orders the flip
            // before the re-read below, which then fails and retries.
            fence(Ordering::SeqCst);
            if self.version.load(Ordering::Relaxed) != version {
                // A publish slipped between the buffer load and the
                // announcement; the announced pointer may already be
                // retired. Withdraw and race again.
                self.hazards.withdraw(thread_id);
                continue;
            }
            return SnapshotLease {
                guardian: self,
                thread_id,
                snapshot,
            };
        }
    }

    /// Publish `replacement` as the live snapshot and destroy the one it
    /// displaces once no lease still references it.
    ///
    /// Stores the replacement into the inactive buffer, flips the version
    /// selector (SeqCst, the commit point), then polls the hazard table
    /// until the retired pointer is unreferenced and drops it. `None`
    /// publishes an empty snapshot: subsequent leases observe `None`, and
    /// the prior snapshot is still retired and destroyed.
    ///
    /// 将 `replacement` 发布为活动快照，并在没有租约仍引用被换下的
    /// 快照后将其销毁。把替换存入非活动缓冲，翻转版本选择器
    /// （SeqCst，即提交点），然后轮询冒险表直到退休指针不再被引用并将
    /// 其释放。`None` 发布空快照：其后的租约观察到 `None`，
    /// 先前的快照仍会被退休并销毁。
    pub fn publish(&self, replacement: Option<Box<T>>) {
        let _lock = self.publish_lock.lock();

        let old_version = self.version.load(Ordering::Relaxed);
        let new_ptr = replacement.map_or(std::ptr::null_mut(), Box::into_raw);
        // Relaxed is enough for the buffer store: the SeqCst flip below is
        // what readers synchronise on, and it orders this store before any
        // load that observes the new version.
        self.buffers[1 - old_version].ptr.store(new_ptr, Ordering::Relaxed);
        self.version.store(1 - old_version, Ordering::SeqCst);
        // Pairs with the fence in lease(): any announcement the scan below
        // may miss was made by a reader whose version re-read is ordered
        // after the flip, so that reader withdraws and retries.
        fence(Ordering::SeqCst);

        // From here the displaced snapshot is invisible to new leases; only
        // readers that announced it before the flip can still hold it.
        let retired = self.buffers[old_version].ptr.load(Ordering::Relaxed);
        if !retired.is_null() {
            self.wait_until_unreferenced(retired);
            // SAFETY: the flip removed `retired` from shared view, and the
            // scan saw every hazard slot off it afterwards; any reader that
            // announced it pre-flip has withdrawn.
            unsafe {
                drop(Box::from_raw(retired));
            }
        }
        self.buffers[old_version]
            .ptr
            .store(std::ptr::null_mut(), Ordering::Relaxed);
    }

    fn wait_until_unreferenced(&self, retired: *const T) {
        while self.hazards.is_referenced(retired) {
            pause(self.poll_interval);
        }
    }

    /// Test introspection: whether `thread_id`'s hazard slot is empty.
    #[cfg(test)]
    pub(crate) fn hazard_is_clear(&self, thread_id: usize) -> bool {
        self.hazards.is_clear(thread_id)
    }
}

impl<T: Send + Sync + 'static> Default for SnapshotGuardian<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SnapshotGuardian<T> {
    /// Waits for hazards to clear from the live snapshot, then destroys it.
    ///
    /// Leases borrow the guardian, so safe code cannot reach this drop
    /// while one is live; the wait covers a lease leaked with
    /// `mem::forget`, whose announcement would otherwise still stand.
    ///
    /// 等待活动快照上的冒险指针清除，然后销毁它。
    /// 租约借用守护者，安全代码无法在租约存活时执行本 drop；
    /// 这里的等待覆盖被 `mem::forget` 泄漏的租约，
    /// 其公告否则仍会存在。
    fn drop(&mut self) {
        let version = self.version.load(Ordering::Relaxed);
        let live = self.buffers[version].ptr.load(Ordering::Relaxed);
        if !live.is_null() {
            while self.hazards.is_referenced(live) {
                pause(self.poll_interval);
            }
            unsafe {
                drop(Box::from_raw(live));
            }
            self.buffers[version]
                .ptr
                .store(std::ptr::null_mut(), Ordering::Relaxed);
        }
    }
}

impl<T> std::fmt::Debug for SnapshotGuardian<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotGuardian")
            .field("version", &self.version.load(Ordering::Relaxed))
            .field("max_threads", &self.hazards.len())
            .finish_non_exhaustive()
    }
}

/// A reader's outstanding claim on one snapshot of a [`SnapshotGuardian`].
///
/// Obtained from [`SnapshotGuardian::lease()`]. While the lease is alive the
/// publisher will not destroy the snapshot it refers to;
/// [`get()`](SnapshotLease::get) borrows the snapshot for at most the
/// lease's lifetime. Dropping the lease withdraws the hazard announcement
/// on every exit path, so an early return or panic cannot leave a stale
/// hazard standing. Move-only: each lease is exactly one announcement.
///
/// 读者对 [`SnapshotGuardian`] 某一快照的未释放主张。
/// 通过 [`SnapshotGuardian::lease()`] 获得。租约存活期间，发布者不会
/// 销毁其指向的快照；[`get()`](SnapshotLease::get) 借出快照，至多到
/// 租约的生命周期为止。drop 租约会在每条退出路径上撤回冒险公告，
/// 因此提前返回或 panic 不会留下陈旧的冒险指针。仅移动：
/// 每个租约恰好对应一次公告。
#[must_use]
pub struct SnapshotLease<'a, T> {
    guardian: &'a SnapshotGuardian<T>,
    thread_id: usize,
    snapshot: *const T,
}

impl<T> SnapshotLease<'_, T> {
    /// The leased snapshot, or `None` when the live snapshot was empty at
    /// lease time (before any publish, or after a null publish).
    ///
    /// 被租用的快照；若租约建立时活动快照为空（任何发布之前，
    /// 或空发布之后）则为 `None`。
    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: the hazard announcement for `snapshot` stands until this
        // lease drops, so the publisher cannot have destroyed it.
        unsafe { self.snapshot.as_ref() }
    }
}

impl<T> Drop for SnapshotLease<'_, T> {
    #[inline]
    fn drop(&mut self) {
        self.guardian.hazards.withdraw(self.thread_id);
    }
}

impl<T> std::fmt::Debug for SnapshotLease<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotLease")
            .field("thread_id", &self.thread_id)
            .finish_non_exhaustive()
    }
}
