use crate::sync::{AtomicPtr, Ordering};

/// An atomic snapshot pointer padded to a full cache line.
///
/// Used both for the two halves of the double-buffered snapshot pair and
/// for every hazard slot, so that a thread publishing its hazard never
/// invalidates the line another thread is spinning on.
///
/// 填充到整个缓存行的原子快照指针。
/// 既用于双缓冲快照对的两半，也用于每个冒险槽位，
/// 使一个线程发布其冒险指针时不会使另一线程正在自旋的缓存行失效。
#[repr(align(64))]
pub(crate) struct PaddedPtr<T> {
    pub(crate) ptr: AtomicPtr<T>,
}

impl<T> PaddedPtr<T> {
    pub(crate) fn null() -> Self {
        Self {
            ptr: AtomicPtr::new(std::ptr::null_mut()),
        }
    }
}

/// One announcement cell per thread: while thread `id` is dereferencing a
/// snapshot, `slots[id]` holds that snapshot's pointer.
///
/// 每个线程一个公告单元：当线程 `id` 正在解引用某个快照时，
/// `slots[id]` 保存该快照的指针。
pub(crate) struct HazardTable<T> {
    slots: Box<[PaddedPtr<T>]>,
}

impl<T> HazardTable<T> {
    pub(crate) fn new(threads: usize) -> Self {
        Self {
            slots: (0..threads).map(|_| PaddedPtr::null()).collect(),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    /// Announce `ptr` as thread `id`'s current dereference target. SeqCst:
    /// the publish protocol relies on this store and the version flip
    /// falling into one total order.
    ///
    /// 宣告 `ptr` 为线程 `id` 当前的解引用目标。SeqCst：
    /// 发布协议依赖此存储与版本翻转处于同一全序之中。
    #[inline]
    pub(crate) fn announce(&self, id: usize, ptr: *mut T) {
        self.slots[id].ptr.store(ptr, Ordering::SeqCst);
    }

    /// Withdraw thread `id`'s announcement.
    /// 撤回线程 `id` 的公告。
    #[inline]
    pub(crate) fn withdraw(&self, id: usize) {
        self.slots[id].ptr.store(std::ptr::null_mut(), Ordering::SeqCst);
    }

    /// Whether any thread currently announces `ptr`. Relaxed loads suffice:
    /// the scan is already ordered after the version flip by SeqCst, and a
    /// false "still referenced" answer only delays the writer one poll.
    ///
    /// 是否有任何线程当前公告着 `ptr`。Relaxed 加载已足够：
    /// 扫描已由 SeqCst 排在版本翻转之后，而错误的"仍被引用"
    /// 只会让写者多等一次轮询。
    pub(crate) fn is_referenced(&self, ptr: *const T) -> bool {
        self.slots.iter().any(|slot| {
            let announced = slot.ptr.load(Ordering::Relaxed);
            !announced.is_null() && std::ptr::eq(announced, ptr)
        })
    }

    /// Test introspection: true when `id` announces nothing.
    #[cfg(test)]
    pub(crate) fn is_clear(&self, id: usize) -> bool {
        self.slots[id].ptr.load(Ordering::SeqCst).is_null()
    }
}
