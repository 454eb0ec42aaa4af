/// 单元测试入口
/// 按教材式分组：基础、并发、生命周期、边界情况

mod basic_tests;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// 测试负载：携带编号，Drop 时翻转存活标志并累加销毁计数
/// 用于验证"没有读者会观察到已销毁的快照"和"每个快照恰好销毁一次"
pub(crate) struct Sample {
    pub(crate) nr: usize,
    intact: AtomicBool,
    drops: Arc<AtomicUsize>,
}

impl Sample {
    pub(crate) fn new(nr: usize, drops: &Arc<AtomicUsize>) -> Self {
        Sample {
            nr,
            intact: AtomicBool::new(true),
            drops: Arc::clone(drops),
        }
    }

    /// 快照仍然存活（析构函数尚未运行）
    pub(crate) fn is_intact(&self) -> bool {
        self.intact.load(Ordering::SeqCst)
    }
}

impl Drop for Sample {
    fn drop(&mut self) {
        self.intact.store(false, Ordering::SeqCst);
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// 新建一个销毁计数器
pub(crate) fn drop_counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

/// 读取销毁计数
pub(crate) fn drops(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}
