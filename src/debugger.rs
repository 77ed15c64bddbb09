//! デバッグコントローラ
//!
//! BRK/不正オペコードトラップ、割り込みによるブレークイン、再開を扱う
//! 小さな状態機械。CPUコアのステップ関数をラップする側（apple2）から
//! 命令境界ごとに参照される。
//!
//! 割り込みシグナルの数え方は実機デバッガの流儀に従う:
//! 1回目はエミュレートされた機械へのCtrl-C配送、未消費のまま2回目が
//! 来たらデバッガへ直接入る。3回目は強制終了。

use crate::cpu::Trap;

/// 停止理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakReason {
    /// BRK命令
    Brk,
    /// 不正オペコード（strictモード時のBRK扱い）
    IllegalOp(u8),
    /// 外部割り込み（キーボードブレーク）
    Interrupt,
}

/// デバッグコントローラの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugState {
    Running,
    Halted(BreakReason),
    Exited(i32),
}

/// デバッグセッション
///
/// トラップで生成され、continueで破棄される一時状態（停止時のPCを含む）。
#[derive(Debug)]
pub struct Debugger {
    state: DebugState,
    /// 停止時点のPC
    halt_pc: Option<u16>,
    /// 未消費の割り込みシグナル数
    sigint_count: u32,
}

impl Default for Debugger {
    fn default() -> Self {
        Self::new()
    }
}

impl Debugger {
    pub fn new() -> Self {
        Debugger {
            state: DebugState::Running,
            halt_pc: None,
            sigint_count: 0,
        }
    }

    pub fn state(&self) -> &DebugState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, DebugState::Running)
    }

    pub fn halt_pc(&self) -> Option<u16> {
        self.halt_pc
    }

    /// 外部割り込みシグナルを受信
    ///
    /// 命令境界でのチェックはapple2側の責務。ここではカウントのみ行い、
    /// 3回目で即時終了状態に入る。
    pub fn signal_interrupt(&mut self) {
        self.sigint_count += 1;
        if self.sigint_count >= 3 {
            self.state = DebugState::Exited(2);
        }
    }

    /// 命令境界での割り込み処理
    ///
    /// 戻り値はエミュレートされた機械に配送すべきキー（Ctrl-C）。
    /// シグナルが2回溜まっていた場合はキー配送ではなくデバッガに入る。
    pub fn poll_interrupt(&mut self, pc: u16) -> Option<u8> {
        if self.sigint_count >= 2 {
            self.sigint_count = 0;
            self.enter(BreakReason::Interrupt, pc);
            return None;
        }
        if self.sigint_count == 1 {
            self.sigint_count = 0;
            return Some(0x83); // Apple ][のCtrl-C
        }
        None
    }

    /// 即時ブレークイン（シングルステップ等、ハーネス主導の停止）
    pub fn break_in(&mut self, pc: u16) {
        self.enter(BreakReason::Interrupt, pc);
    }

    /// CPUトラップによる停止
    pub fn on_trap(&mut self, trap: Trap, pc: u16) {
        let reason = match trap {
            Trap::Brk => BreakReason::Brk,
            Trap::IllegalOp(op) => BreakReason::IllegalOp(op),
        };
        self.enter(reason, pc);
    }

    fn enter(&mut self, reason: BreakReason, pc: u16) {
        log::info!("debugger entered: {:?} at ${:04X}", reason, pc);
        self.state = DebugState::Halted(reason);
        self.halt_pc = Some(pc);
    }

    /// 実行再開（continueコマンド相当）
    pub fn resume(&mut self) {
        if let DebugState::Halted(_) = self.state {
            self.state = DebugState::Running;
            self.halt_pc = None;
        }
    }

    /// ハーネス側の判断による終了（trapアドレス到達、die-on-brk等）
    pub fn exit(&mut self, code: i32) {
        self.state = DebugState::Exited(code);
    }
}
