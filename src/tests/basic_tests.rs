/// 基础测试模块
/// 测试核心功能的正确性

use super::{drop_counter, drops, Sample};
use crate::{ProtectedPtr, Protector, SnapshotGuardian};
use std::time::Duration;

/// 测试1: 创建 Protector 并验证默认配置
#[test]
fn test_create_protector_with_defaults() {
    let protector = Protector::new();

    // 默认 64 个槽位，且初始时没有未释放的守卫
    assert_eq!(protector.slot_count(), 64);
    assert_eq!(protector.outstanding(), 0);
}

/// 测试2: acquire 后 drop，计数器回到零
#[test]
fn test_acquire_then_drop_restores_counter() {
    let protector = Protector::new();

    {
        let _guard = protector.acquire();
        assert_eq!(protector.outstanding(), 1);
    }
    // 守卫在这里被 drop

    assert_eq!(protector.outstanding(), 0);
}

/// 测试3: 同一线程持有多个守卫（可重入）
#[test]
fn test_reentrant_acquire() {
    let protector = Protector::new();

    let guard1 = protector.acquire();
    let guard2 = protector.acquire();
    let guard3 = protector.acquire();
    assert_eq!(protector.outstanding(), 3);

    drop(guard2);
    assert_eq!(protector.outstanding(), 2);

    drop(guard1);
    drop(guard3);
    assert_eq!(protector.outstanding(), 0);
}

/// 测试4: 创建 ProtectedPtr 并读取初始值
#[test]
fn test_protected_ptr_create_and_load() {
    let protector = Protector::new();
    let shared = ProtectedPtr::new(42i32);

    let guard = protector.acquire();
    assert_eq!(shared.load(&guard).copied(), Some(42));
}

/// 测试5: 写者存储新值后读者观察到新值
#[test]
fn test_protected_ptr_store() {
    let protector = Protector::new();
    let shared = ProtectedPtr::new(10i32);

    {
        let guard = protector.acquire();
        assert_eq!(shared.load(&guard).copied(), Some(10));
    }

    shared.store(Some(Box::new(20)), &protector);

    {
        let guard = protector.acquire();
        assert_eq!(shared.load(&guard).copied(), Some(20));
    }
}

/// 测试6: 存储会销毁被替换下的快照，且恰好一次
#[test]
fn test_store_destroys_displaced_snapshot() {
    let counter = drop_counter();
    let protector = Protector::new();
    let shared = ProtectedPtr::new(Sample::new(0, &counter));

    shared.store(Some(Box::new(Sample::new(1, &counter))), &protector);
    assert_eq!(drops(&counter), 1);

    shared.store(Some(Box::new(Sample::new(2, &counter))), &protector);
    assert_eq!(drops(&counter), 2);

    // 最终快照在 ProtectedPtr drop 时销毁
    drop(shared);
    assert_eq!(drops(&counter), 3);
}

/// 测试7: 没有活跃读者时 drain 立即返回
#[test]
fn test_drain_with_no_readers_is_immediate() {
    let protector = Protector::new();

    // 重复调用也应每次都立即返回
    protector.drain();
    protector.drain();
    protector.drain();
}

/// 测试8: 多个 Protector 实例互不阻塞
/// 线程的槽位序号是进程级共享的，但计数器表是每实例一张
#[test]
fn test_multiple_protector_instances_are_independent() {
    let protector_a = Protector::new();
    let protector_b = Protector::new();

    let _guard_a = protector_a.acquire();

    // A 上持有守卫不会让 B 的 drain 等待
    protector_b.drain();
    assert_eq!(protector_b.outstanding(), 0);
    assert_eq!(protector_a.outstanding(), 1);
}

/// 测试9: 创建 SnapshotGuardian，首次租约观察到空
#[test]
fn test_guardian_initial_lease_is_none() {
    let guardian: SnapshotGuardian<i32> = SnapshotGuardian::new();

    let lease = guardian.lease(0);
    assert!(lease.get().is_none());
}

/// 测试10: publish 后租约观察到新快照
#[test]
fn test_guardian_publish_then_lease() {
    let guardian = SnapshotGuardian::new();

    guardian.publish(Some(Box::new(7i32)));

    let lease = guardian.lease(0);
    assert_eq!(lease.get().copied(), Some(7));
}

/// 测试11: 租约 drop 后冒险槽位清空
#[test]
fn test_lease_drop_clears_hazard() {
    let guardian = SnapshotGuardian::new();
    guardian.publish(Some(Box::new(1i32)));

    {
        let lease = guardian.lease(3);
        assert!(lease.get().is_some());
        assert!(!guardian.hazard_is_clear(3));
    }
    // 租约在这里被 drop

    assert!(guardian.hazard_is_clear(3));
}

/// 测试12: publish 替换会销毁旧快照，且恰好一次
#[test]
fn test_publish_destroys_displaced_snapshot() {
    let counter = drop_counter();
    let guardian = SnapshotGuardian::new();

    guardian.publish(Some(Box::new(Sample::new(0, &counter))));
    guardian.publish(Some(Box::new(Sample::new(1, &counter))));
    assert_eq!(drops(&counter), 1);

    guardian.publish(Some(Box::new(Sample::new(2, &counter))));
    assert_eq!(drops(&counter), 2);

    drop(guardian);
    assert_eq!(drops(&counter), 3);
}

/// 测试13: publish(None) 退休旧快照，读者此后观察到空
#[test]
fn test_publish_null_retires_previous() {
    let counter = drop_counter();
    let guardian = SnapshotGuardian::new();

    guardian.publish(Some(Box::new(Sample::new(0, &counter))));
    guardian.publish(None);
    assert_eq!(drops(&counter), 1);

    let lease = guardian.lease(0);
    assert!(lease.get().is_none());
}

/// 测试14: 构建器配置生效
#[test]
fn test_builder_configuration() {
    let protector = Protector::builder()
        .slots(8)
        .poll_interval(Duration::from_micros(50))
        .build();
    assert_eq!(protector.slot_count(), 8);

    let guardian: SnapshotGuardian<u64> = SnapshotGuardian::builder()
        .max_threads(4)
        .poll_interval(Duration::from_micros(50))
        .build();
    // 合法 id 范围是 [0, 4)
    let _lease = guardian.lease(3);
}

/// 测试15: 字符串与结构体类型的负载
#[test]
fn test_payload_types() {
    #[derive(Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    let protector = Protector::new();
    let text = ProtectedPtr::new(String::from("hello"));
    let point = ProtectedPtr::new(Point { x: 10, y: 20 });

    let guard = protector.acquire();
    assert_eq!(text.load(&guard).map(String::as_str), Some("hello"));
    let p = point.load(&guard).unwrap();
    assert_eq!(p.x, 10);
    assert_eq!(p.y, 20);
}
