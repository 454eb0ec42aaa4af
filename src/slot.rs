use crate::sync::AtomicUsize;
use std::cell::Cell;

/// Default width of a slot table, sized for the expected maximum number of
/// concurrent reader threads.
/// 槽位表的默认宽度，按预期的最大并发读者线程数确定。
pub(crate) const DEFAULT_SLOTS: usize = 64;

/// Sentinel meaning "this thread has not been handed an ordinal yet".
/// 表示"此线程尚未获得序号"的哨兵值。
const UNASSIGNED: usize = usize::MAX;

/// A per-thread counter of outstanding read guards, padded out to its own
/// cache line so concurrent increments by different threads never contend
/// on the same line.
///
/// 每线程的未释放读守卫计数器，填充到独占的缓存行，
/// 使不同线程的并发递增不会在同一缓存行上竞争。
#[derive(Debug)]
#[repr(align(64))]
pub(crate) struct CounterSlot {
    /// Number of guards currently held against this slot.
    /// 当前针对此槽位持有的守卫数量。
    pub(crate) outstanding: AtomicUsize,
}

impl CounterSlot {
    pub(crate) fn new() -> Self {
        Self {
            outstanding: AtomicUsize::new(0),
        }
    }
}

// The ordinal cursor is deliberately a plain std atomic even under loom:
// assignment happens once per thread and is not part of the checked
// reclamation protocol.
static NEXT_ORDINAL: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

thread_local! {
    static THREAD_ORDINAL: Cell<usize> = const { Cell::new(UNASSIGNED) };
}

/// Return this thread's process-wide ordinal, assigning one on first use.
///
/// The ordinal is stable for the thread's lifetime and shared across every
/// protector instance in the process: a thread maps to `ordinal % n` in any
/// table of width `n`. Handing out ordinals by fetch-add keeps the cursor
/// race-free; reduction happens at the table, so two threads may share a
/// slot once more than `n` distinct threads have appeared. Sharing is
/// harmless for correctness and only costs cache locality.
///
/// 返回此线程在进程范围内的序号，首次使用时分配。
/// 序号在线程生命周期内保持稳定，并由进程中的所有保护器实例共享：
/// 线程在宽度为 `n` 的表中映射到 `ordinal % n`。
/// 通过 fetch-add 发放序号使游标无竞争；取模在表处进行，
/// 因此当出现超过 `n` 个不同线程后，两个线程可能共享一个槽位。
/// 共享对正确性无害，只损失缓存局部性。
pub(crate) fn thread_ordinal() -> usize {
    THREAD_ORDINAL.with(|ordinal| {
        let mut id = ordinal.get();
        if id == UNASSIGNED {
            id = NEXT_ORDINAL.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            ordinal.set(id);
        }
        id
    })
}
