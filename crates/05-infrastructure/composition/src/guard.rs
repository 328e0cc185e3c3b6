//! 状态切换互斥标志

use std::sync::atomic::{AtomicBool, Ordering};

/// 状态切换互斥标志
///
/// "加载中" 和 "卸载中" 两个标志相互独立。标志由 [`InProgress`] 持有，
/// 离开作用域时自动释放，任何错误路径都不会让标志卡住。
#[derive(Debug, Default)]
pub struct TransitionGuard {
    loading: AtomicBool,
    unloading: AtomicBool,
}

/// 已获取的标志，drop 时释放
#[derive(Debug)]
#[must_use = "标志在 InProgress 被丢弃时立即释放"]
pub struct InProgress<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl TransitionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试获取加载标志，已在加载时返回 `None`
    pub fn try_begin_load(&self) -> Option<InProgress<'_>> {
        Self::acquire(&self.loading)
    }

    /// 尝试获取卸载标志，已在卸载时返回 `None`
    pub fn try_begin_unload(&self) -> Option<InProgress<'_>> {
        Self::acquire(&self.unloading)
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_unloading(&self) -> bool {
        self.unloading.load(Ordering::SeqCst)
    }

    fn acquire(flag: &AtomicBool) -> Option<InProgress<'_>> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InProgress { flag })
    }
}
