//! Instruction encoder: one [`axis_mir::Instr`] in, one machine-code
//! sequence out.
//!
//! This file owns every REX/ModRM/SIB decision the compiler makes. A few
//! choices, applied uniformly, keep it small:
//!
//! - Locals are always addressed `[rbp+disp32]` - `mod=10`, never the
//!   shorter `mod=01` disp8 form, so a function's frame can grow without
//!   forcing a second encoding path once a disp stops fitting in a byte.
//! - Indirect loads/stores (`[base]` / `[base+index]`) always use `disp=0`
//!   and never address through `rbp`/`rsp`, so the `mod=00`/RIP-relative and
//!   `mod=00`/SIB-escape special cases never collide with a real local.
//! - 8-bit operands are only ever `al`/`cl`/`dl`/`bl`/`r8b`-`r15b` - the
//!   `spl`/`bpl`/`sil`/`dil` encodings (which require a REX prefix just to
//!   select a different register file) never come up.
//!
//! Every ALU `reg,reg` opcode in the Intel manual's `Ev,Gv` family encodes
//! the destination as `r/m` and the source as `reg` - this file sticks to
//! that direction throughout so one block of modrm-building code serves
//! `add`/`sub`/`and`/`or`/`xor`/`cmp`/`test`/`mov`.

use axis_mir::{Cond, Instr, Reg, Width};
use axis_util::Symbol;

use crate::reloc::RelocKind;

fn reg_num(r: Reg) -> u8 {
    use Reg::*;
    match r {
        Rax => 0,
        Rcx => 1,
        Rdx => 2,
        Rbx => 3,
        Rsp => 4,
        Rbp => 5,
        Rsi => 6,
        Rdi => 7,
        R8 => 8,
        R9 => 9,
        R10 => 10,
        R11 => 11,
        R12 => 12,
        R13 => 13,
        R14 => 14,
        R15 => 15,
    }
}

fn low3(r: Reg) -> u8 {
    reg_num(r) & 0x07
}

fn is_ext(r: Reg) -> bool {
    reg_num(r) >= 8
}

fn rex_byte(w: bool, r: bool, x: bool, b: bool) -> u8 {
    0x40 | ((w as u8) << 3) | ((r as u8) << 2) | ((x as u8) << 1) | (b as u8)
}

fn push_rex(out: &mut Vec<u8>, w: bool, r: bool, x: bool, b: bool) {
    if w || r || x || b {
        out.push(rex_byte(w, r, x, b));
    }
}

fn push_opsize_prefix(out: &mut Vec<u8>, width: Width) {
    if width == Width::B2 {
        out.push(0x66);
    }
}

fn modrm(mode: u8, reg: u8, rm: u8) -> u8 {
    (mode << 6) | ((reg & 0x7) << 3) | (rm & 0x7)
}

/// `[rbp+disp32]` - always the 4-byte-displacement ModRM form (§ above).
fn push_mem_rbp(out: &mut Vec<u8>, reg_field: u8, disp: i32) {
    out.push(modrm(0b10, reg_field, low3(Reg::Rbp)));
    out.extend_from_slice(&disp.to_le_bytes());
}

/// `[base]` or `[base+index]`, `disp=0`. Never called with `base`/`index`
/// equal to `rbp` or `rsp`.
fn push_mem_indirect(out: &mut Vec<u8>, reg_field: u8, base: Reg, index: Option<Reg>) {
    match index {
        None => out.push(modrm(0b00, reg_field, low3(base))),
        Some(ix) => {
            out.push(modrm(0b00, reg_field, 0b100));
            out.push((0b00 << 6) | (low3(ix) << 3) | low3(base));
        }
    }
}

/// `[rip+disp32]`, `reg_field` is the destination register.
fn push_mem_rip(out: &mut Vec<u8>, reg_field: u8, disp: i32) {
    out.push(modrm(0b00, reg_field, 0b101));
    out.extend_from_slice(&disp.to_le_bytes());
}

fn cond_tttn(cond: Cond) -> u8 {
    match cond {
        Cond::Eq => 0x4,
        Cond::Ne => 0x5,
        Cond::Lt => 0xC,
        Cond::Le => 0xE,
        Cond::Gt => 0xF,
        Cond::Ge => 0xD,
        Cond::Below => 0x2,
        Cond::BelowEq => 0x6,
        Cond::Above => 0x7,
        Cond::AboveEq => 0x3,
    }
}

/// Whether a conditional/unconditional jump used its optimistic short
/// (`rel8`) form or had to be relaxed to the long (`rel32`) one. Decided by
/// [`crate::assembler::layout_function`] before any real bytes get emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpForm {
    Short,
    Long,
}

/// One encoded instruction: its bytes, and - if it referenced a `.rodata`
/// or `.bss` symbol - where in those bytes the patchable field starts.
pub struct EncodedInstr {
    pub bytes: Vec<u8>,
    pub data_ref: Option<(u32, Symbol, RelocKind)>,
}

fn plain(bytes: Vec<u8>) -> EncodedInstr {
    EncodedInstr { bytes, data_ref: None }
}

/// Encode one instruction. `form` only matters for [`Instr::Jmp`]/
/// [`Instr::Jcc`]; `jump_disp` is the `target - next_instruction` byte
/// displacement for `Jmp`/`Jcc`/`Call`, ignored otherwise. Passing `0` for
/// `jump_disp` still yields a correctly-*sized* encoding, which is what the
/// layout pass relies on when it doesn't yet know real addresses.
pub fn encode(instr: &Instr, form: JumpForm, jump_disp: i32) -> EncodedInstr {
    match instr {
        Instr::Label(_) => plain(Vec::new()),

        Instr::Push(r) => {
            let mut out = Vec::new();
            if is_ext(*r) {
                out.push(rex_byte(false, false, false, true));
            }
            out.push(0x50 + low3(*r));
            plain(out)
        }
        Instr::Pop(r) => {
            let mut out = Vec::new();
            if is_ext(*r) {
                out.push(rex_byte(false, false, false, true));
            }
            out.push(0x58 + low3(*r));
            plain(out)
        }

        Instr::SubRspImm { imm } => {
            let mut out = Vec::new();
            out.push(rex_byte(true, false, false, false));
            out.push(0x81);
            out.push(modrm(0b11, 0x5, low3(Reg::Rsp)));
            out.extend_from_slice(&imm.to_le_bytes());
            plain(out)
        }

        Instr::LoadLocal { dst, disp, width, signed } => plain(encode_load_local(*dst, *disp, *width, *signed)),
        Instr::StoreLocal { disp, width, src } => plain(encode_store_local(*disp, *width, *src)),
        Instr::LoadIndirect { dst, base, index, width, signed } => plain(encode_load_indirect(*dst, *base, *index, *width, *signed)),
        Instr::StoreIndirect { base, index, width, src } => plain(encode_store_indirect(*base, *index, *width, *src)),

        Instr::LeaLocal { dst, disp } => {
            let mut out = Vec::new();
            push_rex(&mut out, true, is_ext(*dst), false, false);
            out.push(0x8D);
            push_mem_rbp(&mut out, low3(*dst), *disp);
            plain(out)
        }
        Instr::LeaRip { dst, label } => {
            let mut out = Vec::new();
            push_rex(&mut out, true, is_ext(*dst), false, false);
            out.push(0x8D);
            let field_offset = out.len() as u32;
            push_mem_rip(&mut out, low3(*dst), 0);
            EncodedInstr { bytes: out, data_ref: Some((field_offset, *label, RelocKind::Pc32)) }
        }

        Instr::MovReg { dst, src, width } => plain(encode_mov_rr(*dst, *src, *width)),
        Instr::MovImm32 { dst, imm } => {
            let mut out = Vec::new();
            if is_ext(*dst) {
                out.push(rex_byte(false, false, false, true));
            }
            out.push(0xB8 + low3(*dst));
            out.extend_from_slice(&imm.to_le_bytes());
            plain(out)
        }
        Instr::MovAbsImm { dst, imm } => {
            let mut out = Vec::new();
            out.push(rex_byte(true, false, false, is_ext(*dst)));
            out.push(0xB8 + low3(*dst));
            out.extend_from_slice(&imm.to_le_bytes());
            plain(out)
        }
        Instr::MovAbsLabel { dst, label } => {
            let mut out = Vec::new();
            out.push(rex_byte(true, false, false, is_ext(*dst)));
            out.push(0xB8 + low3(*dst));
            let field_offset = out.len() as u32;
            out.extend_from_slice(&0i64.to_le_bytes());
            EncodedInstr { bytes: out, data_ref: Some((field_offset, *label, RelocKind::Abs64)) }
        }

        Instr::Movsx32 { dst, src, width } => plain(encode_movx(*dst, *src, *width, true)),
        Instr::Movzx32 { dst, src, width } => plain(encode_movx(*dst, *src, *width, false)),
        Instr::Movsxd64 { dst, src } => {
            let mut out = Vec::new();
            push_rex(&mut out, true, is_ext(*dst), false, is_ext(*src));
            out.push(0x63);
            out.push(modrm(0b11, low3(*dst), low3(*src)));
            plain(out)
        }

        Instr::Add { dst, src, width } => plain(encode_alu_rr(0x00, 0x01, *dst, *src, *width)),
        Instr::Or { dst, src, width } => plain(encode_alu_rr(0x08, 0x09, *dst, *src, *width)),
        Instr::And { dst, src, width } => plain(encode_alu_rr(0x20, 0x21, *dst, *src, *width)),
        Instr::Sub { dst, src, width } => plain(encode_alu_rr(0x28, 0x29, *dst, *src, *width)),
        Instr::Xor { dst, src, width } => plain(encode_alu_rr(0x30, 0x31, *dst, *src, *width)),
        Instr::Cmp { lhs, rhs, width } => plain(encode_alu_rr(0x38, 0x39, *lhs, *rhs, *width)),
        Instr::Test { lhs, rhs, width } => plain(encode_alu_rr(0x84, 0x85, *lhs, *rhs, *width)),

        Instr::Shl { dst, width } => plain(encode_shift_cl(0x4, *dst, *width)),
        Instr::Shr { dst, width } => plain(encode_shift_cl(0x5, *dst, *width)),
        Instr::Sar { dst, width } => plain(encode_shift_cl(0x7, *dst, *width)),
        Instr::Neg { dst, width } => plain(encode_grp3(0x3, *dst, *width)),
        Instr::Not { dst, width } => plain(encode_grp3(0x2, *dst, *width)),

        Instr::Imul { dst, src, width } => {
            let mut out = Vec::new();
            push_opsize_prefix(&mut out, *width);
            push_rex(&mut out, *width == Width::B8, is_ext(*dst), false, is_ext(*src));
            out.push(0x0F);
            out.push(0xAF);
            out.push(modrm(0b11, low3(*dst), low3(*src)));
            plain(out)
        }
        Instr::Idiv { src, width } => plain(encode_grp3(0x7, *src, *width)),
        Instr::Div { src, width } => plain(encode_grp3(0x6, *src, *width)),
        Instr::Cdq => plain(vec![0x99]),
        Instr::Cqo => plain(vec![0x48, 0x99]),
        Instr::ZeroHigh { width } => {
            let w = if *width == Width::B8 { Width::B8 } else { Width::B4 };
            plain(encode_alu_rr(0x30, 0x31, Reg::Rdx, Reg::Rdx, w))
        }

        Instr::Setcc { cond, dst } => {
            let mut out = Vec::new();
            if is_ext(*dst) {
                out.push(rex_byte(false, false, false, true));
            }
            out.push(0x0F);
            out.push(0x90 | cond_tttn(*cond));
            out.push(modrm(0b11, 0, low3(*dst)));
            plain(out)
        }

        Instr::Jmp(_) => plain(encode_jmp(form, jump_disp)),
        Instr::Jcc { cond, .. } => plain(encode_jcc(*cond, form, jump_disp)),
        Instr::Call(_) => {
            let mut out = Vec::new();
            out.push(0xE8);
            out.extend_from_slice(&jump_disp.to_le_bytes());
            plain(out)
        }
        Instr::Ret => plain(vec![0xC3]),
        Instr::Syscall => plain(vec![0x0F, 0x05]),
    }
}

fn encode_alu_rr(op8: u8, op_rest: u8, dst: Reg, src: Reg, width: Width) -> Vec<u8> {
    let mut out = Vec::new();
    push_opsize_prefix(&mut out, width);
    push_rex(&mut out, width == Width::B8, is_ext(src), false, is_ext(dst));
    out.push(if width == Width::B1 { op8 } else { op_rest });
    out.push(modrm(0b11, low3(src), low3(dst)));
    out
}

fn encode_mov_rr(dst: Reg, src: Reg, width: Width) -> Vec<u8> {
    let mut out = Vec::new();
    push_opsize_prefix(&mut out, width);
    push_rex(&mut out, width == Width::B8, is_ext(src), false, is_ext(dst));
    out.push(if width == Width::B1 { 0x88 } else { 0x89 });
    out.push(modrm(0b11, low3(src), low3(dst)));
    out
}

fn movx_opcode(signed: bool, width: Width) -> u8 {
    match (signed, width) {
        (true, Width::B1) => 0xBE,
        (true, Width::B2) => 0xBF,
        (false, Width::B1) => 0xB6,
        (false, Width::B2) => 0xB7,
        _ => panic!("movsx/movzx only apply to 1- or 2-byte operands"),
    }
}

fn encode_movx(dst: Reg, src: Reg, width: Width, signed: bool) -> Vec<u8> {
    let mut out = Vec::new();
    push_rex(&mut out, false, is_ext(dst), false, is_ext(src));
    out.push(0x0F);
    out.push(movx_opcode(signed, width));
    out.push(modrm(0b11, low3(dst), low3(src)));
    out
}

fn encode_shift_cl(ext: u8, dst: Reg, width: Width) -> Vec<u8> {
    let mut out = Vec::new();
    push_opsize_prefix(&mut out, width);
    push_rex(&mut out, width == Width::B8, false, false, is_ext(dst));
    out.push(if width == Width::B1 { 0xD2 } else { 0xD3 });
    out.push(modrm(0b11, ext, low3(dst)));
    out
}

fn encode_grp3(ext: u8, reg: Reg, width: Width) -> Vec<u8> {
    let mut out = Vec::new();
    push_opsize_prefix(&mut out, width);
    push_rex(&mut out, width == Width::B8, false, false, is_ext(reg));
    out.push(if width == Width::B1 { 0xF6 } else { 0xF7 });
    out.push(modrm(0b11, ext, low3(reg)));
    out
}

fn encode_jcc(cond: Cond, form: JumpForm, disp: i32) -> Vec<u8> {
    let tttn = cond_tttn(cond);
    let mut out = Vec::new();
    match form {
        JumpForm::Short => {
            out.push(0x70 | tttn);
            out.push(disp as i8 as u8);
        }
        JumpForm::Long => {
            out.push(0x0F);
            out.push(0x80 | tttn);
            out.extend_from_slice(&disp.to_le_bytes());
        }
    }
    out
}

fn encode_jmp(form: JumpForm, disp: i32) -> Vec<u8> {
    let mut out = Vec::new();
    match form {
        JumpForm::Short => {
            out.push(0xEB);
            out.push(disp as i8 as u8);
        }
        JumpForm::Long => {
            out.push(0xE9);
            out.extend_from_slice(&disp.to_le_bytes());
        }
    }
    out
}

fn encode_load_local(dst: Reg, disp: i32, width: Width, signed: bool) -> Vec<u8> {
    let mut out = Vec::new();
    match width {
        Width::B8 => {
            push_rex(&mut out, true, is_ext(dst), false, false);
            out.push(0x8B);
            push_mem_rbp(&mut out, low3(dst), disp);
        }
        Width::B4 => {
            push_rex(&mut out, false, is_ext(dst), false, false);
            out.push(0x8B);
            push_mem_rbp(&mut out, low3(dst), disp);
        }
        Width::B1 | Width::B2 => {
            push_rex(&mut out, false, is_ext(dst), false, false);
            out.push(0x0F);
            out.push(movx_opcode(signed, width));
            push_mem_rbp(&mut out, low3(dst), disp);
        }
    }
    out
}

fn encode_store_local(disp: i32, width: Width, src: Reg) -> Vec<u8> {
    let mut out = Vec::new();
    push_opsize_prefix(&mut out, width);
    push_rex(&mut out, width == Width::B8, is_ext(src), false, false);
    out.push(if width == Width::B1 { 0x88 } else { 0x89 });
    push_mem_rbp(&mut out, low3(src), disp);
    out
}

fn encode_load_indirect(dst: Reg, base: Reg, index: Option<Reg>, width: Width, signed: bool) -> Vec<u8> {
    let idx_ext = index.map(is_ext).unwrap_or(false);
    let mut out = Vec::new();
    match width {
        Width::B8 => {
            push_rex(&mut out, true, is_ext(dst), idx_ext, is_ext(base));
            out.push(0x8B);
            push_mem_indirect(&mut out, low3(dst), base, index);
        }
        Width::B4 => {
            push_rex(&mut out, false, is_ext(dst), idx_ext, is_ext(base));
            out.push(0x8B);
            push_mem_indirect(&mut out, low3(dst), base, index);
        }
        Width::B1 | Width::B2 => {
            push_rex(&mut out, false, is_ext(dst), idx_ext, is_ext(base));
            out.push(0x0F);
            out.push(movx_opcode(signed, width));
            push_mem_indirect(&mut out, low3(dst), base, index);
        }
    }
    out
}

fn encode_store_indirect(base: Reg, index: Option<Reg>, width: Width, src: Reg) -> Vec<u8> {
    let idx_ext = index.map(is_ext).unwrap_or(false);
    let mut out = Vec::new();
    push_opsize_prefix(&mut out, width);
    push_rex(&mut out, width == Width::B8, is_ext(src), idx_ext, is_ext(base));
    out.push(if width == Width::B1 { 0x88 } else { 0x89 });
    push_mem_indirect(&mut out, low3(src), base, index);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ret_and_syscall_are_single_and_double_byte() {
        assert_eq!(encode(&Instr::Ret, JumpForm::Short, 0).bytes, vec![0xC3]);
        assert_eq!(encode(&Instr::Syscall, JumpForm::Short, 0).bytes, vec![0x0F, 0x05]);
    }

    #[test]
    fn push_pop_extended_register_carries_rex_b() {
        let push = encode(&Instr::Push(Reg::R12), JumpForm::Short, 0);
        assert_eq!(push.bytes, vec![0x41, 0x54]);
        let pop = encode(&Instr::Pop(Reg::Rax), JumpForm::Short, 0);
        assert_eq!(pop.bytes, vec![0x58]);
    }

    #[test]
    fn sub_rsp_imm_is_rex_w_group1() {
        let enc = encode(&Instr::SubRspImm { imm: 48 }, JumpForm::Short, 0);
        assert_eq!(enc.bytes[0], 0x48);
        assert_eq!(enc.bytes[1], 0x81);
        assert_eq!(enc.bytes[2], modrm(0b11, 5, 4));
        assert_eq!(&enc.bytes[3..7], &48i32.to_le_bytes());
    }

    #[test]
    fn movabs_label_reserves_eight_placeholder_bytes_and_a_relocation() {
        let label = Symbol::intern("axis_lir_encode_test_string");
        let enc = encode(&Instr::MovAbsLabel { dst: Reg::R10, label }, JumpForm::Short, 0);
        assert_eq!(enc.bytes.len(), 10); // REX.WB + opcode + 8-byte imm
        let (offset, sym, kind) = enc.data_ref.expect("movabs to a label must produce a data_ref");
        assert_eq!(offset, 2);
        assert_eq!(sym, label);
        assert_eq!(kind, RelocKind::Abs64);
    }

    #[test]
    fn short_jcc_is_two_bytes_long_jcc_is_six() {
        let short = encode(&Instr::Jcc { cond: Cond::Eq, target: Symbol::intern("axis_lir_encode_test_l1") }, JumpForm::Short, 5);
        assert_eq!(short.bytes.len(), 2);
        let long = encode(&Instr::Jcc { cond: Cond::Eq, target: Symbol::intern("axis_lir_encode_test_l2") }, JumpForm::Long, 5);
        assert_eq!(long.bytes.len(), 6);
    }

    #[test]
    fn call_is_always_five_bytes() {
        let enc = encode(&Instr::Call(Symbol::intern("axis_lir_encode_test_fn")), JumpForm::Short, 123);
        assert_eq!(enc.bytes.len(), 5);
        assert_eq!(enc.bytes[0], 0xE8);
        assert_eq!(&enc.bytes[1..5], &123i32.to_le_bytes());
    }
}
