use crate::slot::CounterSlot;
use crate::sync::Ordering;

/// A guard representing one outstanding read-side access to a [`Protector`].
///
/// `AccessGuard` is obtained from [`Protector::acquire()`] and releases the
/// access exactly once, when dropped. Because release happens in `Drop`, it
/// runs on every exit path (normal return, early `return`, `?`, or panic),
/// so a reader cannot leave its slot counter elevated by accident.
///
/// The guard is move-only: moving it transfers the release duty and leaves
/// nothing behind in the source. It is not `Clone`; every guard corresponds
/// to exactly one counter increment, and re-acquiring is as cheap as cloning
/// would be.
///
/// [`Protector`]: crate::Protector
/// [`Protector::acquire()`]: crate::Protector::acquire
///
/// 代表对 [`Protector`] 的一次未释放读侧访问的守卫。
/// `AccessGuard` 通过 [`Protector::acquire()`] 获得，并在被 drop 时
/// 恰好释放一次访问。由于释放发生在 `Drop` 中，它会在每条退出路径上
/// 运行（正常返回、提前 `return`、`?` 或 panic），因此读者不可能
/// 意外地让其槽位计数器保持升高。
/// 守卫是仅移动的：移动它会转移释放职责，源处不留任何东西。
/// 它不是 `Clone` 的：每个守卫恰好对应一次计数器递增。
#[must_use]
pub struct AccessGuard<'a> {
    slot: &'a CounterSlot,
}

impl<'a> AccessGuard<'a> {
    /// The caller has already incremented `slot`; the new guard owns the
    /// matching decrement.
    pub(crate) fn new(slot: &'a CounterSlot) -> Self {
        AccessGuard { slot }
    }
}

impl Drop for AccessGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        // SeqCst keeps the decrement in the same total order as the
        // writer's pointer swap; see the drain protocol in `Protector`.
        self.slot.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for AccessGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGuard").finish_non_exhaustive()
    }
}
