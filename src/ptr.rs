use crate::guard::AccessGuard;
use crate::protector::Protector;
use crate::sync::{AtomicPtr, Ordering};
use std::marker::PhantomData;

/// A shared snapshot pointer protected by a [`Protector`].
///
/// `ProtectedPtr<T>` is an atomic pointer that many readers load on the hot
/// path (via [`load()`](ProtectedPtr::load) while holding an
/// [`AccessGuard`]) and an occasional writer replaces (via
/// [`store()`](ProtectedPtr::store)). The store runs the full writer
/// protocol: swap the pointer with sequentially consistent ordering, drain
/// the protector, then destroy the snapshot that was displaced. Readers
/// never block and never observe a destroyed snapshot.
///
/// **Safety contract**:
/// - Readers must hold an `AccessGuard` from the *same* `Protector` that
///   writers pass to `store()`. The returned reference is bound to the
///   guard's lifetime, so it cannot outlive the access.
/// - Writers must be externally serialised: `store()` assumes one writer
///   at a time. Two concurrent writers are misuse and may drain forever
///   against each other's readers.
///
/// **Typical usage**:
/// ```
/// use swmr_protect::{Protector, ProtectedPtr};
///
/// let protector = Protector::new();
/// let shared = ProtectedPtr::new(41i32);
///
/// // Reader:
/// let guard = protector.acquire();
/// assert_eq!(shared.load(&guard).copied(), Some(41));
/// drop(guard);
///
/// // Writer:
/// shared.store(Some(Box::new(42)), &protector);
/// ```
///
/// 由 [`Protector`] 保护的共享快照指针。
/// `ProtectedPtr<T>` 是一个原子指针：许多读者在热路径上加载它
/// （持有 [`AccessGuard`] 调用 [`load()`](ProtectedPtr::load)），
/// 偶尔的写者替换它（[`store()`](ProtectedPtr::store)）。
/// store 执行完整的写者协议：以顺序一致的交换替换指针、排空保护器、
/// 然后销毁被替换下的快照。读者永不阻塞，也永远不会观察到已销毁的快照。
/// **安全合约**：读者必须持有来自*同一个* `Protector` 的守卫；
/// 返回的引用被绑定到守卫的生命周期。写者必须由外部串行化。
pub struct ProtectedPtr<T> {
    ptr: AtomicPtr<T>,
    _marker: PhantomData<*mut T>,
}

unsafe impl<T: Send + Sync> Send for ProtectedPtr<T> {}
unsafe impl<T: Send + Sync> Sync for ProtectedPtr<T> {}

impl<T: Send + Sync + 'static> ProtectedPtr<T> {
    /// Create a new protected pointer, initialized with the given value.
    /// 创建一个新的受保护指针，初始化为给定的值。
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            ptr: AtomicPtr::new(Box::into_raw(Box::new(value))),
            _marker: PhantomData,
        }
    }

    /// Create a protected pointer that holds no snapshot yet.
    /// 创建一个尚未持有任何快照的受保护指针。
    #[inline]
    pub fn null() -> Self {
        Self {
            ptr: AtomicPtr::new(std::ptr::null_mut()),
            _marker: PhantomData,
        }
    }

    /// Reader load: the current snapshot, or `None` if a null replacement
    /// has been published (or nothing was ever stored).
    ///
    /// The guard is what makes this sound: the reader's slot counter was
    /// incremented (SeqCst) before this load, so a writer that swaps the
    /// pointer afterwards will wait in `drain()` until the guard drops.
    /// The reference's lifetime is bound to the guard, which makes the
    /// "release before the writer may destroy" rule a compile-time fact.
    ///
    /// 读者加载：当前快照；若已发布空替换（或从未存储过）则为 `None`。
    /// 守卫使其安全：读者的槽位计数在本次加载之前已被递增（SeqCst），
    /// 因此之后交换指针的写者会在 `drain()` 中等待守卫被 drop。
    /// 引用的生命周期被绑定到守卫，使"先释放、写者才可销毁"成为
    /// 编译期事实。
    #[inline]
    pub fn load<'g>(&self, _guard: &'g AccessGuard<'_>) -> Option<&'g T> {
        // SeqCst, like the swap in store(): reading the pre-swap snapshot
        // then places this load before the swap in the total order, and the
        // guard's increment before it in turn, so the writer's drain cannot
        // miss the increment.
        let ptr = self.ptr.load(Ordering::SeqCst);
        // SAFETY: any writer retiring `ptr` swapped it out after the
        // guard's increment in the SeqCst total order, so its drain
        // observes the increment and defers destruction until the guard
        // (and with it this reference) is gone.
        unsafe { ptr.as_ref() }
    }

    /// Writer store: publish `replacement` and destroy the old snapshot
    /// once no reader can still observe it.
    ///
    /// Passing `None` publishes a null pointer; readers from then on see
    /// `None`, and the prior snapshot is still retired and destroyed. The
    /// call blocks in `drain()` for as long as any pre-swap reader holds a
    /// guard. Single-writer discipline is the caller's responsibility.
    ///
    /// 写者存储：发布 `replacement`，并在没有读者还能观察到旧快照后
    /// 将其销毁。传入 `None` 会发布空指针；此后读者看到 `None`，
    /// 先前的快照仍会被退休并销毁。只要任何交换前的读者还持有守卫，
    /// 本调用就会在 `drain()` 中阻塞。单写者纪律由调用者负责。
    pub fn store(&self, replacement: Option<Box<T>>, protector: &Protector) {
        let new_ptr = replacement.map_or(std::ptr::null_mut(), Box::into_raw);
        let old_ptr = self.ptr.swap(new_ptr, Ordering::SeqCst);

        if !old_ptr.is_null() {
            protector.drain();
            // SAFETY: the swap above removed `old_ptr` from shared view and
            // the drain observed every slot at zero afterwards, so every
            // reader that loaded `old_ptr` has released its guard.
            unsafe {
                drop(Box::from_raw(old_ptr));
            }
        }
    }
}

impl<T> std::fmt::Debug for ProtectedPtr<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ptr = self.ptr.load(Ordering::Relaxed);
        f.debug_tuple("ProtectedPtr").field(&ptr).finish()
    }
}

impl<T> Drop for ProtectedPtr<T> {
    /// Frees the final snapshot. By the time the pointer can be dropped no
    /// guard-bound reference into it can exist, so no drain is needed.
    ///
    /// 释放最后的快照。当指针可以被 drop 时，任何绑定到守卫的引用都
    /// 已不存在，因此无需排空。
    #[inline]
    fn drop(&mut self) {
        let ptr = self.ptr.load(Ordering::Relaxed);
        if !ptr.is_null() {
            unsafe {
                drop(Box::from_raw(ptr));
            }
        }
    }
}
