//! Apple II エミュレータ統合
//!
//! CPU、メモリ、デバッグコントローラを結合し、ハーネス向けAPI
//! （step / poke / peek / interrupt / boot）を公開する。
//! 画面に向かうバイトはすべて文字パイプラインを一度だけ通る。

use std::collections::VecDeque;

use crate::charset;
use crate::config::Config;
use crate::cpu::{Cpu, IllegalPolicy, MemoryBus, Trap};
use crate::debugger::{DebugState, Debugger};
use crate::machine::MachineProfile;
use crate::memory::Memory;
use crate::trace::{self, TraceMask};

/// Monitor ROMの文字出力ルーチン COUT1
///
/// PCがここに到達した時点でアキュムレータの値を出力として扱う。
pub const LOC_COUT1: u16 = 0xFDF0;

/// 1フレームあたりのサイクル数（60Hz）
pub const CYCLES_PER_FRAME: u64 = 17030;

/// Apple IIエミュレータのメイン構造体
pub struct Apple2 {
    /// 6502/65C02 CPU
    pub cpu: Cpu,
    /// メモリシステム
    pub memory: Memory,
    /// デバッグコントローラ
    pub debugger: Debugger,
    /// 機種プロファイル
    pub profile: &'static MachineProfile,
    /// 累積サイクル数
    pub total_cycles: u64,
    /// 累積命令数
    pub instr_count: u64,
    /// BRK/不正オペコードで終了する
    pub die_on_brk: bool,
    /// 成功トラップアドレス
    pub trap_success: Option<u16>,
    /// 失敗トラップアドレス
    pub trap_failure: Option<u16>,
    /// COUT1フックを有効にする
    pub console_hook: bool,
    /// キー未入力のまま$C000が読まれた回数（入力待ち検出用）
    pub key_polls: u64,
    /// コンソール入力キュー（Apple内部表現）
    input: VecDeque<u8>,
    /// コンソール出力バッファ（表示バイト）
    output: Vec<u8>,
}

/// メモリバスの実装（キーボード入力の供給を含む）
impl MemoryBus for Apple2 {
    fn read(&mut self, address: u16) -> u8 {
        match address {
            // キーボードデータ ($C000-$C00F)
            // ストローブが空いていれば入力キューから次のキーを供給する
            0xC000..=0xC00F => {
                if !self.memory.has_key_strobe() {
                    match self.input.pop_front() {
                        Some(key) => self.memory.set_key(key),
                        None => self.key_polls += 1,
                    }
                }
                self.memory.read(address)
            }
            _ => self.memory.read(address),
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory.write(address, value);
    }
}

impl Apple2 {
    /// 新しいエミュレータインスタンスを作成
    ///
    /// ROMは未ロードの状態。boot()がスタブROMを補う。
    pub fn new(profile: &'static MachineProfile) -> Self {
        Apple2 {
            cpu: Cpu::new(profile.cpu_type),
            memory: Memory::new(profile.model),
            debugger: Debugger::new(),
            profile,
            total_cycles: 0,
            instr_count: 0,
            die_on_brk: false,
            trap_success: None,
            trap_failure: None,
            console_hook: true,
            key_polls: 0,
            input: VecDeque::new(),
            output: Vec::new(),
        }
    }

    /// 設定からエミュレータを構築
    ///
    /// 機種名の解決に失敗した場合はエラー（CPU構築前に報告される）。
    pub fn from_config(config: &Config) -> Result<Self, String> {
        let profile = MachineProfile::lookup(&config.machine)?;
        let mut emu = Apple2::new(profile);
        emu.die_on_brk = config.die_on_brk;
        emu.trap_success = config.trap_success;
        emu.trap_failure = config.trap_failure;
        if config.die_on_brk {
            emu.cpu.illegal_policy = IllegalPolicy::TreatAsBrk;
        }
        Ok(emu)
    }

    /// ROMイメージをロード
    pub fn load_rom(&mut self, rom_data: &[u8]) {
        self.memory.load_rom(rom_data);
    }

    /// ブート: ROM未ロードならスタブROMを使い、リセットする
    pub fn boot(&mut self) {
        if self.memory.rom.is_empty() {
            log::info!(
                "No ROM image loaded; using built-in stub ROM for \"{}\"",
                self.profile.name
            );
            let rom = self.profile.stub_rom();
            self.memory.load_rom(&rom);
        }
        self.reset();
    }

    /// エミュレータをリセット
    ///
    /// ソフトスイッチを電源投入状態に戻し、リセットベクターからPCを設定。
    pub fn reset(&mut self) {
        self.memory.switches = Default::default();
        // CPUを一時的に取り出してリセット（バスにはself全体を渡す）
        let mut cpu = std::mem::take(&mut self.cpu);
        cpu.reset(self);
        self.cpu = cpu;
    }

    /// テスト・ハーネス用の副作用なし読み取り（PEEK相当）
    pub fn peek(&self, address: u16) -> u8 {
        self.memory.read_sneaky(address)
    }

    /// テスト・ハーネス用の副作用なし書き込み（POKE相当）
    pub fn poke(&mut self, address: u16, value: u8) {
        self.memory.write_sneaky(address, value);
    }

    /// 外部割り込み（キーボードブレーク）を注入
    ///
    /// 実際の配送は次の命令境界で行われる。
    pub fn interrupt(&mut self) {
        self.debugger.signal_interrupt();
    }

    /// コンソール入力をホストASCIIで投入
    pub fn feed_input(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.input.push_back(charset::from_ascii(b, self.profile));
        }
    }

    /// 入力キューが空か
    pub fn input_empty(&self) -> bool {
        self.input.is_empty() && !self.memory.has_key_strobe()
    }

    /// 溜まったコンソール出力を取り出す
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// COUT1フック: アキュムレータのバイトを文字パイプラインへ通す
    fn vidout(&mut self) {
        let c = charset::display_byte(self.cpu.regs.a, &self.memory.switches, self.profile);
        if charset::is_printable(c) || c < 0x20 {
            if trace::enabled(TraceMask::CONSOLE) {
                log::debug!("COUT ${:02X} -> ${:02X}", self.cpu.regs.a, c);
            }
            self.output.push(c);
        }
    }

    /// 1命令を実行し、デバッグコントローラの状態を返す
    ///
    /// 割り込み配送・トラップアドレス判定・COUTフックはすべて
    /// 命令境界（実行前）に行われる。命令の途中で中断されることはない。
    pub fn step(&mut self) -> &DebugState {
        if !self.debugger.is_running() {
            return self.debugger.state();
        }

        let pc = self.cpu.regs.pc;

        // 割り込みチェックは唯一のサスペンションポイント
        if let Some(key) = self.debugger.poll_interrupt(pc) {
            self.memory.set_key(key);
        }
        if !self.debugger.is_running() {
            return self.debugger.state();
        }

        // トラップアドレス（成功/失敗）
        if self.trap_success == Some(pc) {
            log::info!(".-= !!! REPORT SUCCESS !!! =-.");
            self.debugger.exit(0);
            return self.debugger.state();
        }
        if self.trap_failure == Some(pc) {
            log::error!("*** ERROR TRAP REACHED ***");
            log::error!("Instr #: {}", self.instr_count);
            log::error!("Failed testcase: {:02X}", self.memory.read_sneaky(0x0200));
            self.debugger.exit(3);
            return self.debugger.state();
        }

        // 文字出力フック
        if self.console_hook && pc == LOC_COUT1 {
            self.vidout();
        }

        // CPUを一時的に取り出して実行
        let mut cpu = std::mem::take(&mut self.cpu);
        let cycles = cpu.step(self);
        self.cpu = cpu;
        self.total_cycles += cycles as u64;
        self.instr_count += 1;

        if let Some(t) = self.cpu.take_trap() {
            if trace::enabled(TraceMask::TRAP) {
                log::debug!("trap {:?} at ${:04X}", t, pc);
            }
            self.debugger.on_trap(t, pc);
            if self.die_on_brk {
                match t {
                    Trap::Brk => log::error!("BRK (--die-on-brk)"),
                    Trap::IllegalOp(op) => {
                        log::error!("ILLEGAL OP ${:02X} (--die-on-brk)", op)
                    }
                }
                self.print_state();
                self.debugger.exit(3);
            }
        }

        self.debugger.state()
    }

    /// 停止するか命令数上限に達するまで実行
    pub fn run_until_halt(&mut self, max_instructions: u64) -> &DebugState {
        for _ in 0..max_instructions {
            if !self.debugger.is_running() {
                break;
            }
            self.step();
        }
        self.debugger.state()
    }

    /// 指定サイクル数だけ実行
    pub fn run_cycles(&mut self, target_cycles: u64) {
        let start = self.total_cycles;
        while self.debugger.is_running() && (self.total_cycles - start) < target_cycles {
            self.step();
        }
    }

    /// CPU状態をログへ出力
    pub fn print_state(&self) {
        let r = &self.cpu.regs;
        log::error!(
            "  PC=${:04X} A=${:02X} X=${:02X} Y=${:02X} SP=${:02X} P=${:02X}",
            r.pc, r.a, r.x, r.y, r.sp, r.status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::IllegalPolicy;
    use crate::debugger::{BreakReason, DebugState};
    use crate::machine::{APPLE_II_PLUS, APPLE_IIE, APPLE_IIE_ENHANCED};

    /// プログラムを$0300に置いてブート済みのエミュレータを返す
    fn boot_with_program(profile: &'static MachineProfile, program: &[u8]) -> Apple2 {
        let mut emu = Apple2::new(profile);
        emu.boot();
        for (i, &b) in program.iter().enumerate() {
            emu.poke(0x0300 + i as u16, b);
        }
        emu.cpu.regs.pc = 0x0300;
        emu
    }

    // ProDOSのBCDフラグ判別列: SED; CLD; LDA #$99; CLC; ADC #$01;
    // STA $0310; BRK
    const BCD_PROBE: &[u8] = &[
        0xF8, 0xD8, 0xA9, 0x99, 0x18, 0x69, 0x01, 0x8D, 0x10, 0x03, 0x00,
    ];

    #[test]
    fn test_bcd_probe_enhanced_yields_9a() {
        let mut emu = boot_with_program(&APPLE_IIE_ENHANCED, BCD_PROBE);
        emu.run_until_halt(100);
        assert_eq!(emu.peek(0x0310), 0x9A);
    }

    #[test]
    fn test_bcd_probe_plus_yields_00() {
        let mut emu = boot_with_program(&APPLE_II_PLUS, BCD_PROBE);
        emu.run_until_halt(100);
        assert_eq!(emu.peek(0x0310), 0x00);
    }

    #[test]
    fn test_bcd_probe_twoey_yields_00() {
        let mut emu = boot_with_program(&APPLE_IIE, BCD_PROBE);
        emu.run_until_halt(100);
        assert_eq!(emu.peek(0x0310), 0x00);
    }

    #[test]
    fn test_rom_id_bytes_enhanced() {
        let mut emu = Apple2::new(&APPLE_IIE_ENHANCED);
        emu.boot();
        // PEEK(64435)=6, PEEK(64448)=224
        assert_eq!(emu.peek(64435), 6);
        assert_eq!(emu.peek(64448), 224);
        assert_eq!(emu.peek(64447), 0); // $FBBF
    }

    #[test]
    fn test_rom_id_bytes_twoey() {
        let mut emu = Apple2::new(&APPLE_IIE);
        emu.boot();
        assert_eq!(emu.peek(64435), 6);
        assert_eq!(emu.peek(64448), 234);
    }

    #[test]
    fn test_rom_id_bytes_plus_not_enhanced() {
        let mut emu = Apple2::new(&APPLE_II_PLUS);
        emu.boot();
        assert!(!(emu.peek(64435) == 6 && emu.peek(64448) == 224));
    }

    /// "Hello"をCOUT経由で出力するプログラムを生成
    fn print_program(text: &[u8]) -> Vec<u8> {
        let mut p = Vec::new();
        for &c in text {
            p.push(0xA9); // LDA #c（高ビット付き、COUTの呼び出し規約）
            p.push(c | 0x80);
            p.push(0x20); // JSR $FDF0
            p.push(0xF0);
            p.push(0xFD);
        }
        p.push(0x00); // BRK
        p
    }

    #[test]
    fn test_print_hello_with_mousetext() {
        let program = print_program(b"Hello");
        let mut emu = boot_with_program(&APPLE_IIE_ENHANCED, &program);
        emu.memory.write(0xC00F, 0); // ALTCHAR on
        emu.run_until_halt(200);
        assert_eq!(emu.take_output(), b"@ello");
    }

    #[test]
    fn test_print_hello_without_altchar_folds_to_uppercase() {
        let program = print_program(b"Hello");
        let mut emu = boot_with_program(&APPLE_IIE_ENHANCED, &program);
        emu.run_until_halt(200);
        assert_eq!(emu.take_output(), b"HELLO");
    }

    #[test]
    fn test_print_mixed_case_with_mousetext() {
        let program = print_program(b"HeLLo");
        let mut emu = boot_with_program(&APPLE_IIE_ENHANCED, &program);
        emu.memory.write(0xC00F, 0);
        emu.run_until_halt(200);
        assert_eq!(emu.take_output(), b"@e@@o");
    }

    #[test]
    fn test_print_lowercase_on_plus_always_uppercase() {
        let program = print_program(b"hello");
        let mut emu = boot_with_program(&APPLE_II_PLUS, &program);
        emu.memory.write(0xC00F, 0); // ][+では無視される
        emu.run_until_halt(200);
        assert_eq!(emu.take_output(), b"HELLO");
    }

    #[test]
    fn test_altchar_toggle_through_bus() {
        let mut emu = boot_with_program(&APPLE_IIE_ENHANCED, &print_program(b"HELLO"));
        emu.memory.write(0xC00F, 0);
        emu.run_until_halt(200);
        assert_eq!(emu.take_output(), b"@@@@@");

        // 再度、ALTCHARオフで
        let mut emu = boot_with_program(&APPLE_IIE_ENHANCED, &print_program(b"HELLO"));
        emu.memory.write(0xC00F, 0);
        emu.memory.write(0xC00E, 0); // 最後の書き込みが勝つ
        emu.run_until_halt(200);
        assert_eq!(emu.take_output(), b"HELLO");
    }

    #[test]
    fn test_brk_halts_debugger() {
        let mut emu = boot_with_program(&APPLE_II_PLUS, &[0xEA, 0x00]);
        let state = emu.run_until_halt(10);
        assert_eq!(*state, DebugState::Halted(BreakReason::Brk));
        // 停止時のPCはBRK命令の位置
        assert_eq!(emu.debugger.halt_pc(), Some(0x0301));
    }

    #[test]
    fn test_resume_after_brk() {
        let mut emu = boot_with_program(&APPLE_II_PLUS, &[0x00]);
        emu.run_until_halt(10);
        assert!(matches!(emu.debugger.state(), DebugState::Halted(_)));
        emu.debugger.resume();
        // 再開後はBRKベクター先（スタブROMのループ）を実行し続ける
        let state = emu.run_until_halt(10);
        assert_eq!(*state, DebugState::Running);
        assert_eq!(emu.cpu.regs.pc & 0xFF00, 0xFA00);
    }

    #[test]
    fn test_die_on_brk_exits() {
        let mut emu = boot_with_program(&APPLE_II_PLUS, &[0x00]);
        emu.die_on_brk = true;
        let state = emu.run_until_halt(10);
        assert_eq!(*state, DebugState::Exited(3));
    }

    #[test]
    fn test_trap_success() {
        // NOP 3つのあとのアドレスに成功トラップ
        let mut emu = boot_with_program(&APPLE_II_PLUS, &[0xEA, 0xEA, 0xEA]);
        emu.trap_success = Some(0x0303);
        let state = emu.run_until_halt(10);
        assert_eq!(*state, DebugState::Exited(0));
    }

    #[test]
    fn test_trap_failure() {
        let mut emu = boot_with_program(&APPLE_II_PLUS, &[0xEA, 0xEA]);
        emu.trap_failure = Some(0x0302);
        let state = emu.run_until_halt(10);
        assert_eq!(*state, DebugState::Exited(3));
    }

    // illegal_opsの回帰テストで使う「BRK扱いであるべき」オペコード群
    const ILLEGAL_OPS_6502: &[u8] = &[
        0x04, 0x0C, 0x12, 0x14, 0x1C, 0x32, 0x34, 0x3C, 0x52, 0x5A,
        0x64, 0x72, 0x74, 0x7A, 0x7C, 0x80, 0x89, 0x92, 0x9C, 0x9E,
        0xB2, 0xDA, 0xF2, 0xFA,
    ];

    #[test]
    fn test_illegal_opcode_strict_mode_halts() {
        for &op in ILLEGAL_OPS_6502 {
            let mut emu = boot_with_program(&APPLE_II_PLUS, &[op, 0xEA, 0xEA, 0xEA]);
            emu.cpu.illegal_policy = IllegalPolicy::TreatAsBrk;
            // 不正命令の直後に成功トラップを置いても到達してはならない
            emu.trap_success = Some(0x0303);
            let state = emu.run_until_halt(10);
            assert_eq!(
                *state,
                DebugState::Halted(BreakReason::IllegalOp(op)),
                "opcode ${:02X} should halt as illegal",
                op
            );
        }
    }

    #[test]
    fn test_illegal_opcode_default_mode_is_harmless() {
        for &op in ILLEGAL_OPS_6502 {
            let mut emu = boot_with_program(&APPLE_II_PLUS, &[op, 0x00, 0x00, 0x00]);
            emu.cpu.regs.a = 0x42;
            emu.cpu.regs.x = 0x43;
            emu.cpu.regs.y = 0x44;
            let sp = emu.cpu.regs.sp;
            emu.step();
            assert_eq!(emu.cpu.regs.a, 0x42, "opcode ${:02X} corrupted A", op);
            assert_eq!(emu.cpu.regs.x, 0x43, "opcode ${:02X} corrupted X", op);
            assert_eq!(emu.cpu.regs.y, 0x44, "opcode ${:02X} corrupted Y", op);
            assert_eq!(emu.cpu.regs.sp, sp, "opcode ${:02X} corrupted SP", op);
            assert!(emu.debugger.is_running());
        }
    }

    #[test]
    fn test_keyboard_input_queue() {
        // LDA $C000; BPL -5; STA $0310; STA $C010; BRK
        let program = [
            0xAD, 0x00, 0xC0, // LDA $C000
            0x10, 0xFB,       // BPL -5
            0x8D, 0x10, 0x03, // STA $0310
            0x8D, 0x10, 0xC0, // STA $C010 (ストローブクリア)
            0x00,             // BRK
        ];
        let mut emu = boot_with_program(&APPLE_IIE_ENHANCED, &program);
        emu.feed_input(b"A");
        emu.run_until_halt(100);
        assert_eq!(emu.peek(0x0310), b'A' | 0x80);
        assert!(emu.input_empty());
    }

    #[test]
    fn test_keyboard_read_without_input_reports_no_key() {
        // LDA $C000; STA $0310; BRK
        let program = [0xAD, 0x00, 0xC0, 0x8D, 0x10, 0x03, 0x00];
        let mut emu = boot_with_program(&APPLE_IIE_ENHANCED, &program);
        emu.run_until_halt(10);
        // 入力なし: bit7はクリアされている
        assert_eq!(emu.peek(0x0310) & 0x80, 0);
        assert!(matches!(emu.debugger.state(), DebugState::Halted(BreakReason::Brk)));
    }

    #[test]
    fn test_single_interrupt_becomes_ctrl_c_keypress() {
        let mut emu = boot_with_program(&APPLE_IIE_ENHANCED, &[0xEA, 0xEA, 0xEA, 0x00]);
        emu.interrupt();
        emu.step();
        // Ctrl-C ($83) がキーボードに現れる
        assert_eq!(emu.memory.read_sneaky(0xC000), 0x83);
        assert!(emu.debugger.is_running());
    }

    #[test]
    fn test_double_interrupt_enters_debugger() {
        let mut emu = boot_with_program(&APPLE_IIE_ENHANCED, &[0xEA, 0xEA, 0xEA, 0x00]);
        emu.interrupt();
        emu.interrupt();
        let state = emu.step();
        assert_eq!(*state, DebugState::Halted(BreakReason::Interrupt));
        // 命令は実行されていない（境界でのみ配送される）
        assert_eq!(emu.cpu.regs.pc, 0x0300);
    }

    #[test]
    fn test_unknown_machine_fails_before_construction() {
        let mut config = Config::default();
        config.machine = "pear".to_string();
        assert!(Apple2::from_config(&config).is_err());
    }

    #[test]
    fn test_from_config_applies_policies() {
        let mut config = Config::default();
        config.machine = "plus".to_string();
        config.die_on_brk = true;
        config.trap_success = Some(0x0003);
        let emu = Apple2::from_config(&config).unwrap();
        assert!(emu.die_on_brk);
        assert_eq!(emu.cpu.illegal_policy, IllegalPolicy::TreatAsBrk);
        assert_eq!(emu.trap_success, Some(3));
        assert_eq!(emu.profile.name, "plus");
    }

    #[test]
    fn test_reset_restores_poweron_switches() {
        let mut emu = Apple2::new(&APPLE_IIE_ENHANCED);
        emu.boot();
        emu.memory.write(0xC00F, 0);
        assert!(emu.memory.switches.alt_char);
        emu.reset();
        assert!(!emu.memory.switches.alt_char);
        assert!(emu.memory.switches.text_mode);
        // リセットベクターからPCが設定される
        assert_eq!(emu.cpu.regs.pc, 0xFA62);
    }
}
