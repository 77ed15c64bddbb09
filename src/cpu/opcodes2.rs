//! オペコードの実装（パート2）
//!
//! 比較/インクリメント/論理/シフト/分岐/ジャンプ/フラグ/BRK と
//! 未定義オペコードの処理を実装

use super::{Cpu, MemoryBus, flags, CpuType, IllegalPolicy, Trap};

impl Cpu {
    //--------------------------------------------------
    // Compare Instructions
    //--------------------------------------------------
    fn do_compare(&mut self, register: u8, value: u8) {
        let result = register.wrapping_sub(value);
        self.regs.set_flag(flags::CARRY, register >= value);
        self.regs.update_zero_negative_flags(result);
    }

    pub(super) fn cmp_immediate<M: MemoryBus>(&mut self, memory: &mut M) {
        let value = self.get_immediate(memory);
        self.do_compare(self.regs.a, value);
    }

    pub(super) fn cmp_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_compare(self.regs.a, value);
    }

    pub(super) fn cmp_zeropage_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_x_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_compare(self.regs.a, value);
    }

    pub(super) fn cmp_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_compare(self.regs.a, value);
    }

    pub(super) fn cmp_absolute_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_x_addr(memory, false);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_compare(self.regs.a, value);
    }

    pub(super) fn cmp_absolute_y<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_y_addr(memory, false);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_compare(self.regs.a, value);
    }

    pub(super) fn cmp_indirect_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_indirect_x_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_compare(self.regs.a, value);
    }

    pub(super) fn cmp_indirect_y<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_indirect_y_addr(memory, false);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_compare(self.regs.a, value);
    }

    pub(super) fn cmp_indirect<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_indirect_zp_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_compare(self.regs.a, value);
    }

    pub(super) fn cpx_immediate<M: MemoryBus>(&mut self, memory: &mut M) {
        let value = self.get_immediate(memory);
        self.do_compare(self.regs.x, value);
    }

    pub(super) fn cpx_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_compare(self.regs.x, value);
    }

    pub(super) fn cpx_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_compare(self.regs.x, value);
    }

    pub(super) fn cpy_immediate<M: MemoryBus>(&mut self, memory: &mut M) {
        let value = self.get_immediate(memory);
        self.do_compare(self.regs.y, value);
    }

    pub(super) fn cpy_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_compare(self.regs.y, value);
    }

    pub(super) fn cpy_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_compare(self.regs.y, value);
    }

    //--------------------------------------------------
    // Increment/Decrement Memory
    //--------------------------------------------------
    pub(super) fn inc_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr).wrapping_add(1);
        memory.write(addr, value);
        self.cycles += 3;
        self.regs.update_zero_negative_flags(value);
    }

    pub(super) fn inc_zeropage_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_x_addr(memory);
        let value = memory.read(addr).wrapping_add(1);
        memory.write(addr, value);
        self.cycles += 3;
        self.regs.update_zero_negative_flags(value);
    }

    pub(super) fn inc_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr).wrapping_add(1);
        memory.write(addr, value);
        self.cycles += 3;
        self.regs.update_zero_negative_flags(value);
    }

    pub(super) fn inc_absolute_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_x_addr(memory, true);
        let value = memory.read(addr).wrapping_add(1);
        memory.write(addr, value);
        self.cycles += 3;
        self.regs.update_zero_negative_flags(value);
    }

    pub(super) fn dec_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr).wrapping_sub(1);
        memory.write(addr, value);
        self.cycles += 3;
        self.regs.update_zero_negative_flags(value);
    }

    pub(super) fn dec_zeropage_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_x_addr(memory);
        let value = memory.read(addr).wrapping_sub(1);
        memory.write(addr, value);
        self.cycles += 3;
        self.regs.update_zero_negative_flags(value);
    }

    pub(super) fn dec_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr).wrapping_sub(1);
        memory.write(addr, value);
        self.cycles += 3;
        self.regs.update_zero_negative_flags(value);
    }

    pub(super) fn dec_absolute_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_x_addr(memory, true);
        let value = memory.read(addr).wrapping_sub(1);
        memory.write(addr, value);
        self.cycles += 3;
        self.regs.update_zero_negative_flags(value);
    }

    pub(super) fn inx(&mut self) {
        self.regs.x = self.regs.x.wrapping_add(1);
        self.regs.update_zero_negative_flags(self.regs.x);
        self.cycles += 1;
    }

    pub(super) fn iny(&mut self) {
        self.regs.y = self.regs.y.wrapping_add(1);
        self.regs.update_zero_negative_flags(self.regs.y);
        self.cycles += 1;
    }

    pub(super) fn dex(&mut self) {
        self.regs.x = self.regs.x.wrapping_sub(1);
        self.regs.update_zero_negative_flags(self.regs.x);
        self.cycles += 1;
    }

    pub(super) fn dey(&mut self) {
        self.regs.y = self.regs.y.wrapping_sub(1);
        self.regs.update_zero_negative_flags(self.regs.y);
        self.cycles += 1;
    }

    // INC A / DEC A (65C02)
    // メモリオペランドではなくアキュムレータを直接増減する

    pub(super) fn ina(&mut self) {
        self.regs.a = self.regs.a.wrapping_add(1);
        self.regs.update_zero_negative_flags(self.regs.a);
        self.cycles += 1;
    }

    pub(super) fn dea(&mut self) {
        self.regs.a = self.regs.a.wrapping_sub(1);
        self.regs.update_zero_negative_flags(self.regs.a);
        self.cycles += 1;
    }

    //--------------------------------------------------
    // Logical - AND / ORA / EOR
    //--------------------------------------------------
    fn do_and(&mut self, value: u8) {
        self.regs.a &= value;
        self.regs.update_zero_negative_flags(self.regs.a);
    }

    fn do_ora(&mut self, value: u8) {
        self.regs.a |= value;
        self.regs.update_zero_negative_flags(self.regs.a);
    }

    fn do_eor(&mut self, value: u8) {
        self.regs.a ^= value;
        self.regs.update_zero_negative_flags(self.regs.a);
    }

    pub(super) fn and_immediate<M: MemoryBus>(&mut self, memory: &mut M) {
        let value = self.get_immediate(memory);
        self.do_and(value);
    }

    pub(super) fn and_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_and(value);
    }

    pub(super) fn and_zeropage_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_x_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_and(value);
    }

    pub(super) fn and_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_and(value);
    }

    pub(super) fn and_absolute_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_x_addr(memory, false);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_and(value);
    }

    pub(super) fn and_absolute_y<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_y_addr(memory, false);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_and(value);
    }

    pub(super) fn and_indirect_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_indirect_x_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_and(value);
    }

    pub(super) fn and_indirect_y<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_indirect_y_addr(memory, false);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_and(value);
    }

    pub(super) fn and_indirect<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_indirect_zp_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_and(value);
    }

    pub(super) fn ora_immediate<M: MemoryBus>(&mut self, memory: &mut M) {
        let value = self.get_immediate(memory);
        self.do_ora(value);
    }

    pub(super) fn ora_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_ora(value);
    }

    pub(super) fn ora_zeropage_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_x_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_ora(value);
    }

    pub(super) fn ora_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_ora(value);
    }

    pub(super) fn ora_absolute_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_x_addr(memory, false);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_ora(value);
    }

    pub(super) fn ora_absolute_y<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_y_addr(memory, false);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_ora(value);
    }

    pub(super) fn ora_indirect_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_indirect_x_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_ora(value);
    }

    pub(super) fn ora_indirect_y<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_indirect_y_addr(memory, false);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_ora(value);
    }

    pub(super) fn ora_indirect<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_indirect_zp_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_ora(value);
    }

    pub(super) fn eor_immediate<M: MemoryBus>(&mut self, memory: &mut M) {
        let value = self.get_immediate(memory);
        self.do_eor(value);
    }

    pub(super) fn eor_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_eor(value);
    }

    pub(super) fn eor_zeropage_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_x_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_eor(value);
    }

    pub(super) fn eor_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_eor(value);
    }

    pub(super) fn eor_absolute_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_x_addr(memory, false);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_eor(value);
    }

    pub(super) fn eor_absolute_y<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_y_addr(memory, false);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_eor(value);
    }

    pub(super) fn eor_indirect_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_indirect_x_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_eor(value);
    }

    pub(super) fn eor_indirect_y<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_indirect_y_addr(memory, false);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_eor(value);
    }

    pub(super) fn eor_indirect<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_indirect_zp_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_eor(value);
    }

    //--------------------------------------------------
    // Shifts - ASL / LSR / ROL / ROR
    //--------------------------------------------------
    fn do_asl(&mut self, value: u8) -> u8 {
        self.regs.set_flag(flags::CARRY, (value & 0x80) != 0);
        let result = value << 1;
        self.regs.update_zero_negative_flags(result);
        result
    }

    fn do_lsr(&mut self, value: u8) -> u8 {
        self.regs.set_flag(flags::CARRY, (value & 0x01) != 0);
        let result = value >> 1;
        self.regs.update_zero_negative_flags(result);
        result
    }

    fn do_rol(&mut self, value: u8) -> u8 {
        let carry_in = if self.regs.get_flag(flags::CARRY) { 1 } else { 0 };
        self.regs.set_flag(flags::CARRY, (value & 0x80) != 0);
        let result = (value << 1) | carry_in;
        self.regs.update_zero_negative_flags(result);
        result
    }

    fn do_ror(&mut self, value: u8) -> u8 {
        let carry_in = if self.regs.get_flag(flags::CARRY) { 0x80 } else { 0 };
        self.regs.set_flag(flags::CARRY, (value & 0x01) != 0);
        let result = (value >> 1) | carry_in;
        self.regs.update_zero_negative_flags(result);
        result
    }

    pub(super) fn asl_accumulator(&mut self) {
        self.regs.a = self.do_asl(self.regs.a);
        self.cycles += 1;
    }

    pub(super) fn asl_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr);
        let result = self.do_asl(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn asl_zeropage_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_x_addr(memory);
        let value = memory.read(addr);
        let result = self.do_asl(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn asl_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr);
        let result = self.do_asl(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn asl_absolute_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_x_addr(memory, true);
        let value = memory.read(addr);
        let result = self.do_asl(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn lsr_accumulator(&mut self) {
        self.regs.a = self.do_lsr(self.regs.a);
        self.cycles += 1;
    }

    pub(super) fn lsr_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr);
        let result = self.do_lsr(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn lsr_zeropage_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_x_addr(memory);
        let value = memory.read(addr);
        let result = self.do_lsr(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn lsr_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr);
        let result = self.do_lsr(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn lsr_absolute_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_x_addr(memory, true);
        let value = memory.read(addr);
        let result = self.do_lsr(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn rol_accumulator(&mut self) {
        self.regs.a = self.do_rol(self.regs.a);
        self.cycles += 1;
    }

    pub(super) fn rol_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr);
        let result = self.do_rol(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn rol_zeropage_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_x_addr(memory);
        let value = memory.read(addr);
        let result = self.do_rol(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn rol_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr);
        let result = self.do_rol(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn rol_absolute_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_x_addr(memory, true);
        let value = memory.read(addr);
        let result = self.do_rol(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn ror_accumulator(&mut self) {
        self.regs.a = self.do_ror(self.regs.a);
        self.cycles += 1;
    }

    pub(super) fn ror_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr);
        let result = self.do_ror(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn ror_zeropage_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_x_addr(memory);
        let value = memory.read(addr);
        let result = self.do_ror(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn ror_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr);
        let result = self.do_ror(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    pub(super) fn ror_absolute_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_x_addr(memory, true);
        let value = memory.read(addr);
        let result = self.do_ror(value);
        memory.write(addr, result);
        self.cycles += 3;
    }

    //--------------------------------------------------
    // BIT test
    //--------------------------------------------------
    /// メモリオペランドのBIT: bit7/6をN/Vに転送し、A AND MからZを設定
    fn do_bit(&mut self, value: u8) {
        self.regs.set_flag(flags::NEGATIVE, (value & 0x80) != 0);
        self.regs.set_flag(flags::OVERFLOW, (value & 0x40) != 0);
        self.regs.set_flag(flags::ZERO, (self.regs.a & value) == 0);
    }

    pub(super) fn bit_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_bit(value);
    }

    pub(super) fn bit_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_bit(value);
    }

    /// BIT #immediate (65C02)
    /// メモリオペランド版と異なりZフラグのみ変化し、N/Vは転送しない
    pub(super) fn bit_immediate<M: MemoryBus>(&mut self, memory: &mut M) {
        let value = self.get_immediate(memory);
        self.regs.set_flag(flags::ZERO, (self.regs.a & value) == 0);
    }

    pub(super) fn bit_zeropage_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_x_addr(memory);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_bit(value);
    }

    pub(super) fn bit_absolute_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_x_addr(memory, false);
        let value = memory.read(addr);
        self.cycles += 1;
        self.do_bit(value);
    }

    //--------------------------------------------------
    // TRB / TSB (65C02)
    //--------------------------------------------------
    pub(super) fn trb_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr);
        self.regs.set_flag(flags::ZERO, (self.regs.a & value) == 0);
        memory.write(addr, value & !self.regs.a);
        self.cycles += 3;
    }

    pub(super) fn trb_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr);
        self.regs.set_flag(flags::ZERO, (self.regs.a & value) == 0);
        memory.write(addr, value & !self.regs.a);
        self.cycles += 3;
    }

    pub(super) fn tsb_zeropage<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_zeropage_addr(memory);
        let value = memory.read(addr);
        self.regs.set_flag(flags::ZERO, (self.regs.a & value) == 0);
        memory.write(addr, value | self.regs.a);
        self.cycles += 3;
    }

    pub(super) fn tsb_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        let value = memory.read(addr);
        self.regs.set_flag(flags::ZERO, (self.regs.a & value) == 0);
        memory.write(addr, value | self.regs.a);
        self.cycles += 3;
    }

    //--------------------------------------------------
    // Branch Instructions
    //--------------------------------------------------
    pub(super) fn bpl<M: MemoryBus>(&mut self, memory: &mut M) {
        let condition = !self.regs.get_flag(flags::NEGATIVE);
        self.branch(memory, condition);
    }

    pub(super) fn bmi<M: MemoryBus>(&mut self, memory: &mut M) {
        let condition = self.regs.get_flag(flags::NEGATIVE);
        self.branch(memory, condition);
    }

    pub(super) fn bvc<M: MemoryBus>(&mut self, memory: &mut M) {
        let condition = !self.regs.get_flag(flags::OVERFLOW);
        self.branch(memory, condition);
    }

    pub(super) fn bvs<M: MemoryBus>(&mut self, memory: &mut M) {
        let condition = self.regs.get_flag(flags::OVERFLOW);
        self.branch(memory, condition);
    }

    pub(super) fn bcc<M: MemoryBus>(&mut self, memory: &mut M) {
        let condition = !self.regs.get_flag(flags::CARRY);
        self.branch(memory, condition);
    }

    pub(super) fn bcs<M: MemoryBus>(&mut self, memory: &mut M) {
        let condition = self.regs.get_flag(flags::CARRY);
        self.branch(memory, condition);
    }

    pub(super) fn bne<M: MemoryBus>(&mut self, memory: &mut M) {
        let condition = !self.regs.get_flag(flags::ZERO);
        self.branch(memory, condition);
    }

    pub(super) fn beq<M: MemoryBus>(&mut self, memory: &mut M) {
        let condition = self.regs.get_flag(flags::ZERO);
        self.branch(memory, condition);
    }

    /// BRA - Branch Always (65C02)
    /// 条件分岐と同じオフセット規則の無条件相対分岐
    pub(super) fn bra<M: MemoryBus>(&mut self, memory: &mut M) {
        self.branch(memory, true);
    }

    //--------------------------------------------------
    // Jump/Call
    //--------------------------------------------------
    pub(super) fn jmp_absolute<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.get_absolute_addr(memory);
        self.regs.pc = addr;
    }

    pub(super) fn jmp_indirect<M: MemoryBus>(&mut self, memory: &mut M) {
        let ptr = self.get_absolute_addr(memory);
        let low = memory.read(ptr) as u16;
        // NMOSのページ境界バグ: 上位バイトはページ内でラップして読む
        // 65C02では修正されている
        let high_addr = if self.cpu_type == CpuType::Cpu6502 {
            (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)
        } else {
            ptr.wrapping_add(1)
        };
        let high = memory.read(high_addr) as u16;
        self.regs.pc = (high << 8) | low;
        self.cycles += 2;
    }

    /// JMP (abs,X) (65C02)
    pub(super) fn jmp_absolute_x<M: MemoryBus>(&mut self, memory: &mut M) {
        let base = self.get_absolute_addr(memory);
        let ptr = base.wrapping_add(self.regs.x as u16);
        let low = memory.read(ptr) as u16;
        let high = memory.read(ptr.wrapping_add(1)) as u16;
        self.regs.pc = (high << 8) | low;
        self.cycles += 2;
    }

    pub(super) fn jsr<M: MemoryBus>(&mut self, memory: &mut M) {
        let low = memory.read(self.regs.pc) as u16;
        self.regs.pc = self.regs.pc.wrapping_add(1);
        // JSRは次命令アドレス-1をプッシュする
        let return_addr = self.regs.pc;
        self.push_word(memory, return_addr);
        let high = memory.read(self.regs.pc) as u16;
        self.regs.pc = (high << 8) | low;
        self.cycles += 5;
    }

    pub(super) fn rts<M: MemoryBus>(&mut self, memory: &mut M) {
        let addr = self.pop_word(memory);
        self.regs.pc = addr.wrapping_add(1);
        self.cycles += 5;
    }

    //--------------------------------------------------
    // Interrupts - BRK / RTI
    //--------------------------------------------------
    /// BRK - ソフトウェア割り込み
    ///
    /// PC+1（パディングバイトの次）とフラグ（Bセット）をプッシュし、
    /// $FFFE/$FFFFのベクターへジャンプする。トラップとして上位へ報告。
    pub(super) fn brk<M: MemoryBus>(&mut self, memory: &mut M) {
        // パディングバイトを読み飛ばす
        self.regs.pc = self.regs.pc.wrapping_add(1);
        self.push_word(memory, self.regs.pc);
        let status = self.regs.status | flags::BREAK | flags::UNUSED;
        self.push_byte(memory, status);
        self.regs.set_flag(flags::IRQ_DISABLE, true);
        if self.cpu_type == CpuType::Cpu65C02 {
            self.regs.set_flag(flags::DECIMAL, false);
        }
        let low = memory.read(0xFFFE) as u16;
        let high = memory.read(0xFFFF) as u16;
        self.regs.pc = (high << 8) | low;
        self.cycles += 6;
        self.trap = Some(Trap::Brk);
    }

    pub(super) fn rti<M: MemoryBus>(&mut self, memory: &mut M) {
        let status = self.pop_byte(memory);
        // Bフラグは無視、UNUSEDは常にセット
        self.regs.status = (status & !flags::BREAK) | flags::UNUSED;
        self.regs.pc = self.pop_word(memory);
        self.cycles += 5;
    }

    //--------------------------------------------------
    // Flag Instructions
    //--------------------------------------------------
    pub(super) fn clc(&mut self) {
        self.regs.set_flag(flags::CARRY, false);
        self.cycles += 1;
    }

    pub(super) fn sec(&mut self) {
        self.regs.set_flag(flags::CARRY, true);
        self.cycles += 1;
    }

    pub(super) fn cli(&mut self) {
        self.regs.set_flag(flags::IRQ_DISABLE, false);
        self.cycles += 1;
    }

    pub(super) fn sei(&mut self) {
        self.regs.set_flag(flags::IRQ_DISABLE, true);
        self.cycles += 1;
    }

    pub(super) fn clv(&mut self) {
        self.regs.set_flag(flags::OVERFLOW, false);
        self.cycles += 1;
    }

    /// CLD - Clear Decimal
    ///
    /// NMOS 6502では SED の直後に実行された CLD が無効になる。
    /// ProDOS等のCPU判別ルーチン（SED;CLD;ADC列）が依存する実機挙動で、
    /// 修正してはならない。65C02では常にクリアされる。
    pub(super) fn cld(&mut self) {
        let swallowed =
            self.cpu_type == CpuType::Cpu6502 && self.prev_opcode == 0xF8;
        if !swallowed {
            self.regs.set_flag(flags::DECIMAL, false);
        }
        self.cycles += 1;
    }

    pub(super) fn sed(&mut self) {
        self.regs.set_flag(flags::DECIMAL, true);
        self.cycles += 1;
    }

    //--------------------------------------------------
    // NOP
    //--------------------------------------------------
    pub(super) fn nop(&mut self) {
        self.cycles += 1;
    }

    //--------------------------------------------------
    // Undefined opcodes
    //--------------------------------------------------
    /// アクティブなCPUに定義のないオペコードの処理
    ///
    /// 65C02: 実機ではすべてNOP（複数バイトのグループはmod.rsで処理済み、
    /// ここに来るのは1バイトNOP）。
    ///
    /// 6502: 既定ではNMOSの未文書NOPとして、文書化されたオペランド長だけ
    /// PCを進める。strictモードではBRKと同一のシーケンスを実行し、
    /// IllegalOpトラップとして報告する。
    pub(super) fn undefined_opcode<M: MemoryBus>(&mut self, memory: &mut M, opcode: u8) {
        if self.cpu_type == CpuType::Cpu65C02 {
            self.cycles += 1;
            return;
        }

        match self.illegal_policy {
            IllegalPolicy::TreatAsBrk => {
                log::debug!(
                    "illegal opcode ${:02X} at ${:04X} (treating as BRK)",
                    opcode,
                    self.regs.pc.wrapping_sub(1)
                );
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.push_word(memory, self.regs.pc);
                let status = self.regs.status | flags::BREAK | flags::UNUSED;
                self.push_byte(memory, status);
                self.regs.set_flag(flags::IRQ_DISABLE, true);
                let low = memory.read(0xFFFE) as u16;
                let high = memory.read(0xFFFF) as u16;
                self.regs.pc = (high << 8) | low;
                self.cycles += 6;
                self.trap = Some(Trap::IllegalOp(opcode));
            }
            IllegalPolicy::BestEffort => {
                // レジスタ・メモリには触れず、オペランド長だけ消費する
                let len = undoc_operand_len(opcode);
                for _ in 0..len {
                    let _ = self.fetch_byte(memory);
                }
                self.cycles += 1;
            }
        }
    }
}

/// NMOS未文書NOPのオペランドバイト数
///
/// $80等の即値グループは2バイト、$0C等の絶対グループは3バイト命令。
/// JAM系は安全のため1バイトNOP扱い。
fn undoc_operand_len(opcode: u8) -> u16 {
    match opcode {
        // 2バイト: 即値スタイル
        0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 => 1,
        // 2バイト: ゼロページスタイル
        0x04 | 0x44 | 0x64 => 1,
        // 2バイト: ゼロページ,Xスタイル
        0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 => 1,
        // 3バイト: 絶対スタイル
        0x0C => 2,
        // 3バイト: 絶対,Xスタイル
        0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => 2,
        // 3バイト: 絶対,X/Yの不安定ストア列
        0x9C | 0x9E => 2,
        _ => match opcode & 0x1F {
            // (zp,x) / zp 系の2バイト命令に相当する列
            0x03 | 0x07 | 0x13 | 0x17 => 1,
            // abs 系の3バイト命令に相当する列
            0x0F | 0x1B | 0x1F => 2,
            _ => 0,
        },
    }
}
