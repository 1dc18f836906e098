use crate::core::{Bus, BusMaster};
use crate::cpu::z80::{ExecState, Flag, IndexMode, Z80};

impl Z80 {
    // --- Flag Helpers ---

    pub(crate) fn get_parity(val: u8) -> bool {
        val.count_ones() % 2 == 0
    }

    fn update_flags_logic(&mut self, result: u8, is_and: bool) {
        let mut f = 0;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(result) { f |= Flag::PV as u8; }
        if is_and { f |= Flag::H as u8; } // AND sets H, others clear it
        // N is 0, C is 0

        // Undocumented X/Y
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }

    fn do_add(&mut self, val: u8, carry_in: bool) {
        let a = self.a;
        let c_val = if carry_in && (self.f & Flag::C as u8) != 0 { 1 } else { 0 };
        let result_u16 = (a as u16) + (val as u16) + (c_val as u16);
        let result = result_u16 as u8;

        let mut f = 0;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        // H: ((A & 0xF) + (val & 0xF) + c) > 0xF
        if ((a & 0xF) + (val & 0xF) + (c_val as u8)) > 0xF { f |= Flag::H as u8; }
        // P/V: Overflow = (op1 ^ res) & (op2 ^ res) & 0x80
        if ((a ^ result) & (val ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        // N: 0
        // C: result > 0xFF
        if result_u16 > 0xFF { f |= Flag::C as u8; }

        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.a = result;
        self.f = f;
    }

    fn do_sub(&mut self, val: u8, carry_in: bool) {
        let a = self.a;
        let c_val = if carry_in && (self.f & Flag::C as u8) != 0 { 1 } else { 0 };
        let result_u16 = (a as u16).wrapping_sub(val as u16).wrapping_sub(c_val as u16);
        let result = result_u16 as u8;

        let mut f = Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        // H: (A & 0xF) < ((val & 0xF) + c)
        if (a & 0xF) < ((val & 0xF) + (c_val as u8)) { f |= Flag::H as u8; }
        // P/V: Overflow = (op1 ^ op2) & (op1 ^ res) & 0x80
        if ((a ^ val) & (a ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        // C: Borrow
        if result_u16 > 0xFF { f |= Flag::C as u8; }

        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.a = result;
        self.f = f;
    }

    fn do_cp(&mut self, val: u8) {
        let a = self.a;
        let result_u16 = (a as u16).wrapping_sub(val as u16);
        let result = result_u16 as u8;

        let mut f = Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (a & 0xF) < (val & 0xF) { f |= Flag::H as u8; }
        if ((a ^ val) & (a ^ result) & 0x80) != 0 { f |= Flag::PV as u8; }
        if result_u16 > 0xFF { f |= Flag::C as u8; }

        // X/Y come from the operand for CP, not result (usually)
        // But standard behavior often copies from operand.
        // For now, let's use operand bits 3 and 5.
        f |= val & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
    }

    fn perform_alu_op(&mut self, op: u8, val: u8) {
        match op {
            0 => self.do_add(val, false), // ADD
            1 => self.do_add(val, true),  // ADC
            2 => self.do_sub(val, false), // SUB
            3 => self.do_sub(val, true),  // SBC
            4 => { self.a &= val; self.update_flags_logic(self.a, true); }, // AND
            5 => { self.a ^= val; self.update_flags_logic(self.a, false); }, // XOR
            6 => { self.a |= val; self.update_flags_logic(self.a, false); }, // OR
            7 => self.do_cp(val),         // CP
            _ => unreachable!(),
        }
    }

    // --- Instructions ---

    /// ALU A, r
    /// ADD, ADC, SUB, SBC, AND, XOR, OR, CP
    /// Opcode mask: 10 xxx zzz
    pub fn op_alu_r<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        opcode: u8,
        cycle: u8,
        bus: &mut B,
        master: BusMaster,
    ) {
        let alu_op = (opcode >> 3) & 0x07;
        let r = opcode & 0x07;

        if r == 6 {
            if self.index_mode == IndexMode::HL {
                // ALU A, (HL) — 7 T: cycles 1-4 (cycle 0 is the shared M1 overhead)
                match cycle {
                    1 | 3 => self.state = ExecState::Execute(opcode, cycle + 1),
                    2 => {
                        let addr = self.get_hl();
                        let val = bus.read(master, addr);
                        self.perform_alu_op(alu_op, val);
                        self.state = ExecState::Execute(opcode, 3);
                    }
                    4 => self.state = ExecState::Fetch,
                    _ => unreachable!(),
                }
            } else {
                // ALU A, (IX+d) — 19 T: cycles 1-12
                // 1=pad, 2=read d, 3=pad, 4-8=internal, 9=pad, 10=read (IX+d), 11=pad, 12=done
                match cycle {
                    1 | 3 | 4 | 5 | 6 | 7 | 8 | 9 | 11 => {
                        self.state = ExecState::Execute(opcode, cycle + 1);
                    }
                    2 => {
                        self.temp_data = bus.read(master, self.pc);
                        self.pc = self.pc.wrapping_add(1);
                        self.state = ExecState::Execute(opcode, 3);
                    }
                    10 => {
                        let addr = self.get_index_addr();
                        self.memptr = addr;
                        let val = bus.read(master, addr);
                        self.perform_alu_op(alu_op, val);
                        self.state = ExecState::Execute(opcode, 11);
                    }
                    12 => self.state = ExecState::Fetch,
                    _ => unreachable!(),
                }
            }
        } else {
            // ALU A, r (respects HX/LX/HY/LY substitution under DD/FD)
            let val = self.get_reg8_ix(r);
            self.perform_alu_op(alu_op, val);
            self.state = ExecState::Fetch;
        }
    }

    /// ALU A, n
    /// Opcode mask: 11 xxx 110
    pub fn op_alu_n<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        opcode: u8,
        cycle: u8,
        bus: &mut B,
        master: BusMaster,
    ) {
        let alu_op = (opcode >> 3) & 0x07;

        if cycle == 0 {
            let val = bus.read(master, self.pc);
            self.pc = self.pc.wrapping_add(1);
            self.perform_alu_op(alu_op, val);
            self.state = ExecState::Fetch;
        }
    }

    /// INC/DEC r
    /// Opcode mask: 00 rrr 10x
    pub fn op_inc_dec_r<B: Bus<Address = u16, Data = u8> + ?Sized>(
        &mut self,
        opcode: u8,
        cycle: u8,
        bus: &mut B,
        master: BusMaster,
    ) {
        let r = (opcode >> 3) & 0x07;
        let is_dec = (opcode & 0x01) != 0;

        if r == 6 {
            if self.index_mode == IndexMode::HL {
                // INC/DEC (HL) — 11 T: cycles 1-7 (MR + 1 internal + MW)
                match cycle {
                    1 | 3 | 4 | 5 | 6 => self.state = ExecState::Execute(opcode, cycle + 1),
                    2 => {
                        let addr = self.get_hl();
                        self.temp_data = bus.read(master, addr);
                        self.temp_addr = addr;
                        self.state = ExecState::Execute(opcode, 3);
                    }
                    7 => {
                        let result = if is_dec {
                            self.calc_dec_flags(self.temp_data)
                        } else {
                            self.calc_inc_flags(self.temp_data)
                        };
                        bus.write(master, self.temp_addr, result);
                        self.state = ExecState::Fetch;
                    }
                    _ => unreachable!(),
                }
            } else {
                // INC/DEC (IX+d) — 23 T: cycles 1-19
                // 1=pad, 2=read d, 3=pad, 4-8=internal(5),
                // 9=pad, 10=read val, 11=pad, 12=internal, 13=write, 14-18? keep compact
                match cycle {
                    1 | 3 | 4 | 5 | 6 | 7 | 8 | 9 | 11 | 12 => {
                        self.state = ExecState::Execute(opcode, cycle + 1);
                    }
                    2 => {
                        self.temp_data = bus.read(master, self.pc);
                        self.pc = self.pc.wrapping_add(1);
                        self.state = ExecState::Execute(opcode, 3);
                    }
                    10 => {
                        let addr = self.get_index_addr();
                        self.temp_addr = addr;
                        self.memptr = addr;
                        self.temp_data = bus.read(master, addr);
                        self.state = ExecState::Execute(opcode, 11);
                    }
                    13 => {
                        let result = if is_dec {
                            self.calc_dec_flags(self.temp_data)
                        } else {
                            self.calc_inc_flags(self.temp_data)
                        };
                        bus.write(master, self.temp_addr, result);
                        self.state = ExecState::Execute(opcode, 14);
                    }
                    14 => self.state = ExecState::Fetch,
                    _ => unreachable!(),
                }
            }
        } else {
            // INC/DEC r (respects HX/LX/HY/LY substitution under DD/FD)
            let val = self.get_reg8_ix(r);
            let result = if is_dec {
                self.calc_dec_flags(val)
            } else {
                self.calc_inc_flags(val)
            };
            self.set_reg8_ix(r, result);
            self.state = ExecState::Fetch;
        }
    }

    /// INC/DEC rr (BC/DE/HL(IX/IY)/SP) — 6 T: 4 M1 + 2 internal. No flags.
    /// Opcode mask: 00 pp 0011 (INC), 00 pp 1011 (DEC)
    pub fn op_inc_dec_rr(&mut self, opcode: u8, cycle: u8) {
        let p = (opcode >> 4) & 0x03;
        let is_dec = (opcode & 0x08) != 0;
        match cycle {
            1 => self.state = ExecState::Execute(opcode, 2),
            2 => {
                let val = self.get_rp(p);
                let result = if is_dec { val.wrapping_sub(1) } else { val.wrapping_add(1) };
                self.set_rp(p, result);
                self.state = ExecState::Fetch;
            }
            _ => unreachable!(),
        }
    }

    /// ADD HL,rr (0x09/0x19/0x29/0x39) — 11 T: 4 M1 + 7 internal.
    /// S, Z, PV unaffected; H/C from the 16-bit add; N=0; Y/X from result high byte.
    /// WZ = HL (before the add) + 1.
    pub fn op_add_hl_rr(&mut self, opcode: u8, cycle: u8) {
        let p = (opcode >> 4) & 0x03;
        match cycle {
            1 | 2 | 3 | 4 | 5 | 6 => self.state = ExecState::Execute(opcode, cycle + 1),
            7 => {
                let hl = self.get_rp(2);
                let rr = self.get_rp(p);
                self.memptr = hl.wrapping_add(1);
                let result = (hl as u32) + (rr as u32);

                let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
                if ((hl & 0x0FFF) + (rr & 0x0FFF)) > 0x0FFF { f |= Flag::H as u8; }
                if result > 0xFFFF { f |= Flag::C as u8; }
                // N is 0
                let result16 = result as u16;
                f |= ((result16 >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
                self.f = f;

                self.set_rp(2, result16);
                self.state = ExecState::Fetch;
            }
            _ => unreachable!(),
        }
    }

    fn do_adc16(&mut self, hl: u16, rr: u16) -> u16 {
        let carry_in = if (self.f & Flag::C as u8) != 0 { 1u32 } else { 0 };
        let result = (hl as u32) + (rr as u32) + carry_in;
        let result16 = result as u16;

        let mut f = 0;
        if result16 == 0 { f |= Flag::Z as u8; }
        if (result16 & 0x8000) != 0 { f |= Flag::S as u8; }
        if ((hl & 0x0FFF) + (rr & 0x0FFF) + carry_in as u16) > 0x0FFF { f |= Flag::H as u8; }
        if ((hl ^ result16) & (rr ^ result16) & 0x8000) != 0 { f |= Flag::PV as u8; }
        if result > 0xFFFF { f |= Flag::C as u8; }
        f |= ((result16 >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        result16
    }

    fn do_sbc16(&mut self, hl: u16, rr: u16) -> u16 {
        let carry_in = if (self.f & Flag::C as u8) != 0 { 1i32 } else { 0 };
        let result = (hl as i32) - (rr as i32) - carry_in;
        let result16 = result as u16;

        let mut f = Flag::N as u8;
        if result16 == 0 { f |= Flag::Z as u8; }
        if (result16 & 0x8000) != 0 { f |= Flag::S as u8; }
        if (hl & 0x0FFF) < ((rr & 0x0FFF) + carry_in as u16) { f |= Flag::H as u8; }
        if ((hl ^ rr) & (hl ^ result16) & 0x8000) != 0 { f |= Flag::PV as u8; }
        if result < 0 { f |= Flag::C as u8; }
        f |= ((result16 >> 8) as u8) & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        result16
    }

    /// ADC HL,rr (ED-prefixed) — 15 T: 8 fixed + 7 internal.
    /// WZ = HL (before the add) + 1.
    pub fn op_adc_hl_rr(&mut self, opcode: u8, cycle: u8) {
        let p = (opcode >> 4) & 0x03;
        match cycle {
            0 | 1 | 2 | 3 | 4 | 5 => self.state = ExecState::ExecuteED(opcode, cycle + 1),
            6 => {
                let hl = self.get_rp(2);
                let rr = self.get_rp(p);
                self.memptr = hl.wrapping_add(1);
                let result = self.do_adc16(hl, rr);
                self.set_rp(2, result);
                self.state = ExecState::Fetch;
            }
            _ => unreachable!(),
        }
    }

    /// SBC HL,rr (ED-prefixed) — 15 T: 8 fixed + 7 internal.
    /// WZ = HL (before the subtract) + 1.
    pub fn op_sbc_hl_rr(&mut self, opcode: u8, cycle: u8) {
        let p = (opcode >> 4) & 0x03;
        match cycle {
            0 | 1 | 2 | 3 | 4 | 5 => self.state = ExecState::ExecuteED(opcode, cycle + 1),
            6 => {
                let hl = self.get_rp(2);
                let rr = self.get_rp(p);
                self.memptr = hl.wrapping_add(1);
                let result = self.do_sbc16(hl, rr);
                self.set_rp(2, result);
                self.state = ExecState::Fetch;
            }
            _ => unreachable!(),
        }
    }

    /// RLCA — 4 T. C = old bit 7, A rotated left circular. S/Z/PV unaffected.
    pub fn op_rlca(&mut self) {
        let carry = (self.a & 0x80) != 0;
        self.a = self.a.rotate_left(1);
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if carry { f |= Flag::C as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.state = ExecState::Fetch;
    }

    /// RRCA — 4 T. C = old bit 0, A rotated right circular. S/Z/PV unaffected.
    pub fn op_rrca(&mut self) {
        let carry = (self.a & 0x01) != 0;
        self.a = self.a.rotate_right(1);
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if carry { f |= Flag::C as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.state = ExecState::Fetch;
    }

    /// RLA — 4 T. A rotated left through carry. S/Z/PV unaffected.
    pub fn op_rla(&mut self) {
        let carry_in = (self.f & Flag::C as u8) != 0;
        let carry_out = (self.a & 0x80) != 0;
        self.a = (self.a << 1) | (carry_in as u8);
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if carry_out { f |= Flag::C as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.state = ExecState::Fetch;
    }

    /// RRA — 4 T. A rotated right through carry. S/Z/PV unaffected.
    pub fn op_rra(&mut self) {
        let carry_in = (self.f & Flag::C as u8) != 0;
        let carry_out = (self.a & 0x01) != 0;
        self.a = (self.a >> 1) | ((carry_in as u8) << 7);
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8);
        if carry_out { f |= Flag::C as u8; }
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.state = ExecState::Fetch;
    }

    /// DAA — 4 T. BCD-corrects A following the previous ALU op (tracked via N/H/C).
    pub fn op_daa(&mut self) {
        let a = self.a;
        let n = (self.f & Flag::N as u8) != 0;
        let h = (self.f & Flag::H as u8) != 0;
        let c = (self.f & Flag::C as u8) != 0;

        let mut correction: u8 = 0;
        let mut carry_out = c;

        if h || (a & 0x0F) > 9 {
            correction |= 0x06;
        }
        if c || a > 0x99 {
            correction |= 0x60;
            carry_out = true;
        }

        let new_a = if n { a.wrapping_sub(correction) } else { a.wrapping_add(correction) };
        let half_carry_out = if n {
            h && (a & 0x0F) < 6
        } else {
            (a & 0x0F) + (correction & 0x0F) > 0x0F
        };

        let mut f = self.f & Flag::N as u8;
        if new_a == 0 { f |= Flag::Z as u8; }
        if (new_a & 0x80) != 0 { f |= Flag::S as u8; }
        if Self::get_parity(new_a) { f |= Flag::PV as u8; }
        if half_carry_out { f |= Flag::H as u8; }
        if carry_out { f |= Flag::C as u8; }
        f |= new_a & (Flag::X as u8 | Flag::Y as u8);

        self.a = new_a;
        self.f = f;
        self.state = ExecState::Fetch;
    }

    /// CPL — 4 T. A = !A. H=1, N=1; S/Z/PV/C unchanged; Y/X from new A.
    pub fn op_cpl(&mut self) {
        self.a = !self.a;
        let mut f = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::PV as u8 | Flag::C as u8);
        f |= Flag::H as u8 | Flag::N as u8;
        f |= self.a & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        self.state = ExecState::Fetch;
    }

    /// SCF — 4 T. Sets carry; Y/X copied unconditionally from A (no Q-flip-flop modeling).
    pub fn op_scf(&mut self) {
        let keep = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::Y as u8 | Flag::X as u8 | Flag::PV as u8);
        self.f = keep | Flag::C as u8 | (self.a & (Flag::Y as u8 | Flag::X as u8));
        self.state = ExecState::Fetch;
    }

    /// CCF — 4 T. Complements carry (old C moves into H); Y/X copied unconditionally from A.
    pub fn op_ccf(&mut self) {
        let keep = self.f & (Flag::S as u8 | Flag::Z as u8 | Flag::Y as u8 | Flag::X as u8 | Flag::PV as u8 | Flag::C as u8);
        let old_c_to_h = (self.f & Flag::C as u8) << 4;
        self.f = (keep | old_c_to_h | (self.a & (Flag::Y as u8 | Flag::X as u8))) ^ Flag::C as u8;
        self.state = ExecState::Fetch;
    }

    /// NEG (ED prefix) — 8 T, fixed cost only. A = 0 - A.
    pub fn op_neg(&mut self) {
        let a = self.a;
        let result = 0u8.wrapping_sub(a);

        let mut f = Flag::N as u8;
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (a & 0x0F) != 0 { f |= Flag::H as u8; }
        if a == 0x80 { f |= Flag::PV as u8; }
        if a != 0 { f |= Flag::C as u8; }
        f |= result & (Flag::X as u8 | Flag::Y as u8);

        self.a = result;
        self.f = f;
        self.state = ExecState::Fetch;
    }

    fn calc_inc_flags(&mut self, val: u8) -> u8 {
        let result = val.wrapping_add(1);
        let mut f = self.f & Flag::C as u8; // Preserve C
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (val & 0xF) == 0xF { f |= Flag::H as u8; }
        if val == 0x7F { f |= Flag::PV as u8; } // Overflow 7F -> 80
        // N is 0
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        result
    }

    fn calc_dec_flags(&mut self, val: u8) -> u8 {
        let result = val.wrapping_sub(1);
        let mut f = (self.f & Flag::C as u8) | Flag::N as u8; // Preserve C, Set N
        if result == 0 { f |= Flag::Z as u8; }
        if (result & 0x80) != 0 { f |= Flag::S as u8; }
        if (val & 0xF) == 0x0 { f |= Flag::H as u8; } // Borrow from bit 4
        if val == 0x80 { f |= Flag::PV as u8; } // Overflow 80 -> 7F
        f |= result & (Flag::X as u8 | Flag::Y as u8);
        self.f = f;
        result
    }
}