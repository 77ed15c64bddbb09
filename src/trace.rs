//! トレースカテゴリ制御
//!
//! ログ出力のうち高頻度なものをカテゴリ単位でオン/オフする。
//! 出力自体は log クレート経由で行い、ここではマスクだけを管理する。

use bitflags::bitflags;
use std::sync::atomic::{AtomicU32, Ordering};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TraceMask: u32 {
        /// 命令実行
        const CPU     = 0b0001;
        /// ソフトスイッチの変化
        const SWITCH  = 0b0010;
        /// トラップ（BRK/illegal/trap address）
        const TRAP    = 0b0100;
        /// コンソール入出力
        const CONSOLE = 0b1000;
    }
}

static TRACE_MASK: AtomicU32 = AtomicU32::new(0);

/// トレースマスクを設定
pub fn set_trace_mask(mask: TraceMask) {
    TRACE_MASK.store(mask.bits(), Ordering::Relaxed);
}

/// 指定カテゴリが有効か
pub fn enabled(mask: TraceMask) -> bool {
    TraceMask::from_bits_truncate(TRACE_MASK.load(Ordering::Relaxed)).intersects(mask)
}
