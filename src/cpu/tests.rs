//! CPUコアのテスト
//!
//! 6502/65C02の命令セマンティクス、フラグ計算、機種間差異を検証する。

use super::{flags, Cpu, CpuType, IllegalPolicy, Trap};
use crate::test_cpu::TestMemory;

/// プログラムを$0300に置いたCPU+メモリを返す
fn setup(cpu_type: CpuType, program: &[u8]) -> (Cpu, TestMemory) {
    let mut cpu = Cpu::new(cpu_type);
    let mut memory = TestMemory::new();
    memory.load(0x0300, program);
    cpu.regs.pc = 0x0300;
    cpu.regs.sp = 0xFF;
    (cpu, memory)
}

fn run(cpu: &mut Cpu, memory: &mut TestMemory, instructions: usize) {
    for _ in 0..instructions {
        cpu.step(memory);
    }
}

//--------------------------------------------------
// INC A / DEC A
//--------------------------------------------------

#[test]
fn test_inc_a_dec_a_roundtrip_all_values() {
    // INC A; DEC A は全256値で元に戻る（0と255のラップを含む）
    for a in 0..=255u8 {
        let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0x1A, 0x3A]);
        cpu.regs.a = a;
        run(&mut cpu, &mut memory, 2);
        assert_eq!(cpu.regs.a, a, "INC A; DEC A failed for {}", a);
    }
}

#[test]
fn test_inc_a_wraps_and_sets_flags() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0x1A]);
    cpu.regs.a = 0xFF;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.regs.get_flag(flags::ZERO));
    assert!(!cpu.regs.get_flag(flags::NEGATIVE));

    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0x1A]);
    cpu.regs.a = 0x7F;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.a, 0x80);
    assert!(cpu.regs.get_flag(flags::NEGATIVE));
}

#[test]
fn test_dec_a_wraps() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0x3A]);
    cpu.regs.a = 0x00;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.a, 0xFF);
    assert!(cpu.regs.get_flag(flags::NEGATIVE));
}

#[test]
fn test_inc_a_is_nop_on_6502() {
    // 0x1Aは6502では文書化されたNOPと完全に同じ振る舞い
    let (mut cpu_nop, mut mem_nop) = setup(CpuType::Cpu6502, &[0xEA]);
    let (mut cpu_1a, mut mem_1a) = setup(CpuType::Cpu6502, &[0x1A]);
    for cpu in [&mut cpu_nop, &mut cpu_1a] {
        cpu.regs.a = 0x42;
        cpu.regs.status = flags::UNUSED | flags::CARRY;
    }
    let cycles_nop = cpu_nop.step(&mut mem_nop);
    let cycles_1a = cpu_1a.step(&mut mem_1a);
    assert_eq!(cpu_1a.regs.a, cpu_nop.regs.a);
    assert_eq!(cpu_1a.regs.status, cpu_nop.regs.status);
    assert_eq!(cpu_1a.regs.pc, cpu_nop.regs.pc);
    assert_eq!(cycles_1a, cycles_nop);
}

#[test]
fn test_dec_a_is_nop_on_6502() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0x3A]);
    cpu.regs.a = 0x2A;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.a, 0x2A);
    assert_eq!(cpu.regs.pc, 0x0301);
}

//--------------------------------------------------
// STZ
//--------------------------------------------------

#[test]
fn test_stz_zeropage() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0x64, 0x32]);
    memory.ram[0x32] = 0x7B;
    let status = cpu.regs.status;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(memory.ram[0x32], 0x00);
    // フラグは変化しない
    assert_eq!(cpu.regs.status, status);
}

#[test]
fn test_stz_all_addressing_modes() {
    // STZ zp,X
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0x74, 0x37]);
    cpu.regs.x = 5;
    memory.ram[0x3C] = 0x63;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(memory.ram[0x3C], 0x00);

    // STZ abs
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0x9C, 0xE8, 0x03]);
    memory.ram[0x03E8] = 0xDE;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(memory.ram[0x03E8], 0x00);

    // STZ abs,X
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0x9E, 0xE8, 0x03]);
    cpu.regs.x = 10;
    memory.ram[0x03F2] = 0x6F;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(memory.ram[0x03F2], 0x00);
}

#[test]
fn test_stz_is_nop_on_6502() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0x64, 0x32]);
    memory.ram[0x32] = 0x7B;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(memory.ram[0x32], 0x7B);
    // 未文書NOPとして2バイト消費
    assert_eq!(cpu.regs.pc, 0x0302);
}

//--------------------------------------------------
// BRA
//--------------------------------------------------

#[test]
fn test_bra_forward() {
    // BRA +2; LDA #$63; LDA #$2A
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0x80, 0x02, 0xA9, 0x63, 0xA9, 0x2A]);
    cpu.regs.a = 0;
    run(&mut cpu, &mut memory, 2);
    // LDA #$63 を飛び越える
    assert_eq!(cpu.regs.a, 0x2A);
}

#[test]
fn test_bra_backward() {
    // $0300: NOP; $0301: BRA -3 -> $0300
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0xEA, 0x80, 0xFD]);
    run(&mut cpu, &mut memory, 2);
    assert_eq!(cpu.regs.pc, 0x0300);
}

#[test]
fn test_bra_is_2byte_nop_on_6502() {
    // 6502では0x80は2バイトの未文書NOP: 飛ばず、次の命令が実行される
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0x80, 0x02, 0xA9, 0x63, 0xA9, 0x2A]);
    run(&mut cpu, &mut memory, 3);
    assert_eq!(cpu.regs.a, 0x2A); // NOP, LDA #$63, LDA #$2A
}

//--------------------------------------------------
// PHX / PHY / PLX / PLY
//--------------------------------------------------

#[test]
fn test_phx_plx() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0xDA, 0xA2, 0x00, 0xFA]);
    cpu.regs.x = 0x7B;
    run(&mut cpu, &mut memory, 1);
    // PHAと同じ場所（$0100 | SP）に積まれる
    assert_eq!(memory.ram[0x01FF], 0x7B);
    assert_eq!(cpu.regs.sp, 0xFE);
    run(&mut cpu, &mut memory, 2); // LDX #0; PLX
    assert_eq!(cpu.regs.x, 0x7B);
    assert_eq!(cpu.regs.sp, 0xFF);
}

#[test]
fn test_phy_ply() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0x5A, 0xA0, 0x00, 0x7A]);
    cpu.regs.y = 0x57;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(memory.ram[0x01FF], 0x57);
    run(&mut cpu, &mut memory, 2);
    assert_eq!(cpu.regs.y, 0x57);
}

#[test]
fn test_stack_stays_in_page_one() {
    // SP=0x00でプッシュすると0xFFにラップする（ページ1の外に出ない）
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0xDA]);
    cpu.regs.sp = 0x00;
    cpu.regs.x = 0x99;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(memory.ram[0x0100], 0x99);
    assert_eq!(cpu.regs.sp, 0xFF);
}

#[test]
fn test_phx_is_nop_on_6502() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xDA]);
    memory.ram[0x01FF] = 0x63;
    cpu.regs.x = 0x7B;
    run(&mut cpu, &mut memory, 1);
    // スタックは変化しない
    assert_eq!(memory.ram[0x01FF], 0x63);
    assert_eq!(cpu.regs.sp, 0xFF);
}

//--------------------------------------------------
// BIT
//--------------------------------------------------

#[test]
fn test_bit_immediate_only_sets_zero() {
    // A=0x55, BIT #0xAA -> Z=1、N/Vは変化しない
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0x89, 0xAA]);
    cpu.regs.a = 0x55;
    cpu.regs.set_flag(flags::NEGATIVE, true);
    cpu.regs.set_flag(flags::OVERFLOW, true);
    run(&mut cpu, &mut memory, 1);
    assert!(cpu.regs.get_flag(flags::ZERO));
    // メモリオペランド版と異なりbit7/6は転送されない
    assert!(cpu.regs.get_flag(flags::NEGATIVE));
    assert!(cpu.regs.get_flag(flags::OVERFLOW));
}

#[test]
fn test_bit_memory_transfers_bits_to_nv() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0x24, 0x40]);
    memory.ram[0x40] = 0xC0; // bit7=1, bit6=1
    cpu.regs.a = 0xFF;
    run(&mut cpu, &mut memory, 1);
    assert!(cpu.regs.get_flag(flags::NEGATIVE));
    assert!(cpu.regs.get_flag(flags::OVERFLOW));
    assert!(!cpu.regs.get_flag(flags::ZERO));
}

//--------------------------------------------------
// Decimal mode
//--------------------------------------------------

/// SED; CLD; LDA #$99; CLC; ADC #$01
const BCD_PROBE: &[u8] = &[0xF8, 0xD8, 0xA9, 0x99, 0x18, 0x69, 0x01];

#[test]
fn test_bcd_probe_6502() {
    // 6502: SED直後のCLDは無効、ADCは10進で$99+$01=$00
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, BCD_PROBE);
    run(&mut cpu, &mut memory, 5);
    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.regs.get_flag(flags::CARRY));
}

#[test]
fn test_bcd_probe_65c02() {
    // 65C02: CLDが効くため2進加算で$9A
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, BCD_PROBE);
    run(&mut cpu, &mut memory, 5);
    assert_eq!(cpu.regs.a, 0x9A);
}

#[test]
fn test_cld_alone_clears_decimal_on_6502() {
    // SEDの直後でなければCLDは通常どおり働く
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xF8, 0xEA, 0xD8]);
    run(&mut cpu, &mut memory, 3);
    assert!(!cpu.regs.get_flag(flags::DECIMAL));
}

#[test]
fn test_decimal_adc_with_carry_out() {
    // 10進: $58 + $46 = $04 キャリーあり
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xF8, 0xA9, 0x58, 0x18, 0x69, 0x46]);
    run(&mut cpu, &mut memory, 4);
    assert_eq!(cpu.regs.a, 0x04);
    assert!(cpu.regs.get_flag(flags::CARRY));
}

#[test]
fn test_decimal_adc_no_carry() {
    // 10進: $12 + $34 = $46
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xF8, 0xA9, 0x12, 0x18, 0x69, 0x34]);
    run(&mut cpu, &mut memory, 4);
    assert_eq!(cpu.regs.a, 0x46);
    assert!(!cpu.regs.get_flag(flags::CARRY));
}

#[test]
fn test_decimal_adc_65c02_zero_flag_from_result() {
    // 65C02は補正後の結果からZを計算: $99+$01=$00 -> Z=1
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0xF8, 0xA9, 0x99, 0x18, 0x69, 0x01]);
    run(&mut cpu, &mut memory, 4);
    assert_eq!(cpu.regs.a, 0x00);
    assert!(cpu.regs.get_flag(flags::ZERO));
    assert!(cpu.regs.get_flag(flags::CARRY));
}

#[test]
fn test_decimal_sbc() {
    // 10進: $50 - $25 = $25（ボローなし）
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xF8, 0xA9, 0x50, 0x38, 0xE9, 0x25]);
    run(&mut cpu, &mut memory, 4);
    assert_eq!(cpu.regs.a, 0x25);
    assert!(cpu.regs.get_flag(flags::CARRY));

    // 10進: $25 - $50 = $75（ボロー発生）
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xF8, 0xA9, 0x25, 0x38, 0xE9, 0x50]);
    run(&mut cpu, &mut memory, 4);
    assert_eq!(cpu.regs.a, 0x75);
    assert!(!cpu.regs.get_flag(flags::CARRY));
}

//--------------------------------------------------
// Binary arithmetic flags
//--------------------------------------------------

#[test]
fn test_adc_overflow_flag() {
    // $7F + $01 = $80: 符号オーバーフロー
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xA9, 0x7F, 0x18, 0x69, 0x01]);
    run(&mut cpu, &mut memory, 3);
    assert_eq!(cpu.regs.a, 0x80);
    assert!(cpu.regs.get_flag(flags::OVERFLOW));
    assert!(cpu.regs.get_flag(flags::NEGATIVE));
    assert!(!cpu.regs.get_flag(flags::CARRY));
}

#[test]
fn test_adc_carry_chain() {
    // $FF + $01 + C=1 = $01, C=1
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xA9, 0xFF, 0x38, 0x69, 0x01]);
    run(&mut cpu, &mut memory, 3);
    assert_eq!(cpu.regs.a, 0x01);
    assert!(cpu.regs.get_flag(flags::CARRY));
}

#[test]
fn test_sbc_borrow() {
    // $10 - $20 = $F0, ボローでC=0
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xA9, 0x10, 0x38, 0xE9, 0x20]);
    run(&mut cpu, &mut memory, 3);
    assert_eq!(cpu.regs.a, 0xF0);
    assert!(!cpu.regs.get_flag(flags::CARRY));
    assert!(cpu.regs.get_flag(flags::NEGATIVE));
}

#[test]
fn test_cmp_flags() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xA9, 0x40, 0xC9, 0x40]);
    run(&mut cpu, &mut memory, 2);
    assert!(cpu.regs.get_flag(flags::ZERO));
    assert!(cpu.regs.get_flag(flags::CARRY));
}

//--------------------------------------------------
// Jumps and subroutines
//--------------------------------------------------

#[test]
fn test_jsr_rts_roundtrip() {
    // JSR $0310; (at $0310) RTS; 戻り先は$0303
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0x20, 0x10, 0x03]);
    memory.ram[0x0310] = 0x60;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.pc, 0x0310);
    // JSRは次命令-1（$0302）をプッシュする
    assert_eq!(memory.ram[0x01FF], 0x03);
    assert_eq!(memory.ram[0x01FE], 0x02);
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.pc, 0x0303);
    assert_eq!(cpu.regs.sp, 0xFF);
}

#[test]
fn test_jmp_indirect_page_boundary_bug() {
    // ($04FF)経由のJMP: 6502は上位バイトを$0400から読む（ページ内ラップ）
    let program = [0x6C, 0xFF, 0x04];
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &program);
    memory.ram[0x04FF] = 0x34;
    memory.ram[0x0500] = 0x12; // 正しい上位バイト
    memory.ram[0x0400] = 0x99; // バグで読まれる上位バイト
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.pc, 0x9934);

    // 65C02ではバグが修正されている
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &program);
    memory.ram[0x04FF] = 0x34;
    memory.ram[0x0500] = 0x12;
    memory.ram[0x0400] = 0x99;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.pc, 0x1234);
}

#[test]
fn test_jmp_absolute_x_65c02() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0x7C, 0x10, 0x03]);
    cpu.regs.x = 2;
    memory.ram[0x0312] = 0x78;
    memory.ram[0x0313] = 0x56;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.pc, 0x5678);
}

//--------------------------------------------------
// BRK / RTI / interrupts
//--------------------------------------------------

#[test]
fn test_brk_pushes_state_and_vectors() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0x00]);
    memory.ram[0xFFFE] = 0x40;
    memory.ram[0xFFFF] = 0xFA;
    cpu.regs.status = flags::UNUSED | flags::CARRY;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.pc, 0xFA40);
    assert!(cpu.regs.get_flag(flags::IRQ_DISABLE));
    // BRKは2バイト命令: $0302がプッシュされる
    assert_eq!(memory.ram[0x01FF], 0x03);
    assert_eq!(memory.ram[0x01FE], 0x02);
    // プッシュされたフラグはBセット
    assert_ne!(memory.ram[0x01FD] & flags::BREAK, 0);
    assert_eq!(cpu.take_trap(), Some(Trap::Brk));
}

#[test]
fn test_irq_checked_at_instruction_boundary() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0x58, 0xEA, 0xEA]); // CLI; NOP; NOP
    memory.ram[0xFFFE] = 0x00;
    memory.ram[0xFFFF] = 0x90;
    run(&mut cpu, &mut memory, 1); // CLI
    cpu.irq_pending = true;
    run(&mut cpu, &mut memory, 1); // 境界でIRQ処理
    assert_eq!(cpu.regs.pc, 0x9000);
}

#[test]
fn test_irq_masked_by_sei() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0x78, 0xEA]); // SEI; NOP
    run(&mut cpu, &mut memory, 1);
    cpu.irq_pending = true;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.pc, 0x0302); // NOPが実行された
}

#[test]
fn test_rti_restores_flags_and_pc() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0x40]);
    // スタックに status, lo, hi を積んでおく
    cpu.regs.sp = 0xFC;
    memory.ram[0x01FD] = flags::CARRY | flags::BREAK; // Bは捨てられる
    memory.ram[0x01FE] = 0x34;
    memory.ram[0x01FF] = 0x12;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.pc, 0x1234);
    assert!(cpu.regs.get_flag(flags::CARRY));
    assert!(!cpu.regs.get_flag(flags::BREAK));
    assert!(cpu.regs.get_flag(flags::UNUSED));
}

//--------------------------------------------------
// Undefined opcodes (6502)
//--------------------------------------------------

#[test]
fn test_undefined_1byte_nops() {
    for op in [0x1A, 0x3A, 0x5A, 0x7A, 0xDA, 0xFA] {
        let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[op]);
        run(&mut cpu, &mut memory, 1);
        assert_eq!(cpu.regs.pc, 0x0301, "opcode ${:02X} should be 1-byte", op);
    }
}

#[test]
fn test_undefined_2byte_nops() {
    for op in [0x80, 0x82, 0x89, 0xC2, 0xE2, 0x04, 0x44, 0x64, 0x14, 0x34, 0x54, 0x74, 0xD4, 0xF4] {
        let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[op, 0xFF]);
        run(&mut cpu, &mut memory, 1);
        assert_eq!(cpu.regs.pc, 0x0302, "opcode ${:02X} should be 2-byte", op);
    }
}

#[test]
fn test_undefined_3byte_nops() {
    for op in [0x0C, 0x1C, 0x3C, 0x5C, 0x7C, 0xDC, 0xFC] {
        let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[op, 0xFF, 0xFF]);
        run(&mut cpu, &mut memory, 1);
        assert_eq!(cpu.regs.pc, 0x0303, "opcode ${:02X} should be 3-byte", op);
    }
}

#[test]
fn test_undefined_strict_mode_behaves_as_brk() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0x32]);
    cpu.illegal_policy = IllegalPolicy::TreatAsBrk;
    memory.ram[0xFFFE] = 0x40;
    memory.ram[0xFFFF] = 0xFA;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.pc, 0xFA40);
    assert!(cpu.regs.get_flag(flags::IRQ_DISABLE));
    assert_eq!(cpu.take_trap(), Some(Trap::IllegalOp(0x32)));
}

#[test]
fn test_undefined_is_nop_on_65c02() {
    // 65C02では未割り当てバイトはNOP（ここでは1バイトグループの$03）
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0x03]);
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.pc, 0x0301);
}

//--------------------------------------------------
// TRB / TSB
//--------------------------------------------------

#[test]
fn test_trb_tsb() {
    // TSB $40: メモリにAのビットを立てる
    let (mut cpu, mut memory) = setup(CpuType::Cpu65C02, &[0x04, 0x40, 0x14, 0x40]);
    memory.ram[0x40] = 0b0011_0000;
    cpu.regs.a = 0b0000_1100;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(memory.ram[0x40], 0b0011_1100);
    assert!(cpu.regs.get_flag(flags::ZERO)); // A & 元の値 = 0

    // TRB $40: Aのビットを落とす
    run(&mut cpu, &mut memory, 1);
    assert_eq!(memory.ram[0x40], 0b0011_0000);
}

//--------------------------------------------------
// Register wraparound
//--------------------------------------------------

#[test]
fn test_index_register_wraparound() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xE8, 0xC8]); // INX; INY
    cpu.regs.x = 0xFF;
    cpu.regs.y = 0xFF;
    run(&mut cpu, &mut memory, 2);
    assert_eq!(cpu.regs.x, 0x00);
    assert_eq!(cpu.regs.y, 0x00);
}

#[test]
fn test_pc_wraps_at_64k() {
    let mut cpu = Cpu::new(CpuType::Cpu6502);
    let mut memory = TestMemory::new();
    memory.ram[0xFFFF] = 0xEA; // NOP
    cpu.regs.pc = 0xFFFF;
    cpu.step(&mut memory);
    assert_eq!(cpu.regs.pc, 0x0000);
}

#[test]
fn test_zeropage_x_wraps_in_page_zero() {
    // LDA $FF,X with X=2 は$01を読む（$101ではない）
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xB5, 0xFF]);
    cpu.regs.x = 2;
    memory.ram[0x01] = 0x77;
    memory.ram[0x0101] = 0x33;
    run(&mut cpu, &mut memory, 1);
    assert_eq!(cpu.regs.a, 0x77);
}

//--------------------------------------------------
// PHP / PLP
//--------------------------------------------------

#[test]
fn test_php_plp() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0x08, 0x28]);
    cpu.regs.status = flags::UNUSED | flags::CARRY | flags::NEGATIVE;
    run(&mut cpu, &mut memory, 1);
    // PHPはBとUNUSEDをセットして積む
    assert_eq!(
        memory.ram[0x01FF],
        flags::UNUSED | flags::CARRY | flags::NEGATIVE | flags::BREAK
    );
    cpu.regs.status = flags::UNUSED;
    run(&mut cpu, &mut memory, 1);
    // PLPはBを落として復元する
    assert!(cpu.regs.get_flag(flags::CARRY));
    assert!(cpu.regs.get_flag(flags::NEGATIVE));
    assert!(!cpu.regs.get_flag(flags::BREAK));
}

//--------------------------------------------------
// Branches
//--------------------------------------------------

#[test]
fn test_conditional_branches() {
    // BEQ taken
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xA9, 0x00, 0xF0, 0x02, 0xA9, 0x63]);
    run(&mut cpu, &mut memory, 2);
    assert_eq!(cpu.regs.pc, 0x0306);

    // BNE not taken
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xA9, 0x00, 0xD0, 0x02, 0xA9, 0x63]);
    run(&mut cpu, &mut memory, 2);
    assert_eq!(cpu.regs.pc, 0x0304);
}

#[test]
fn test_branch_negative_offset() {
    let (mut cpu, mut memory) = setup(CpuType::Cpu6502, &[0xEA, 0x18, 0x90, 0xFC]); // NOP; CLC; BCC -4
    run(&mut cpu, &mut memory, 3);
    assert_eq!(cpu.regs.pc, 0x0300);
}
