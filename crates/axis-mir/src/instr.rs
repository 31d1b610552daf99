//! The abstract x86-64 instruction set (§6.2 of the language contract).
//!
//! This is what the code generator ([`crate::lower`]) emits and what the
//! assembler (`axis-lir`) consumes. Every operand that addresses memory is
//! either `[rbp+disp]` (a local, resolved purely within one function - no
//! relocation needed) or `[reg]` with `disp=0` (an indirect load through a
//! pointer a prior instruction computed, typically the result of
//! [`Instr::MovAbsLabel`]). Nothing here carries byte offsets or opcodes -
//! that's the encoder's job.

use axis_util::Symbol;

/// General-purpose x86-64 registers, named by their 64-bit form. The
/// encoder derives the correctly-sized alias (`al`/`ax`/`eax`/`rax`, ...)
/// from a register plus a [`Width`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl Reg {
    /// The System V AMD64 integer argument registers, in order.
    pub const ARG_REGS: [Reg; 6] = [Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9];
}

/// Operand width in bytes, matching the storage/register width table in
/// §4.4 of the language contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    B1,
    B2,
    B4,
    B8,
}

impl Width {
    pub fn from_bytes(n: i32) -> Width {
        match n {
            1 => Width::B1,
            2 => Width::B2,
            4 => Width::B4,
            8 => Width::B8,
            other => panic!("no register width for a {other}-byte value"),
        }
    }

    pub fn bytes(self) -> i32 {
        match self {
            Width::B1 => 1,
            Width::B2 => 2,
            Width::B4 => 4,
            Width::B8 => 8,
        }
    }
}

/// Condition codes for `setcc`/`jcc`, split by signedness the way the
/// codegen picks them (`setl`/`setb`, etc. - see §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    /// Signed less-than / unsigned below, depending on which `Cond` the
    /// caller picked - AXIS never mixes signedness within one comparison,
    /// so the codegen simply chooses `Lt` for signed operands and `Below`
    /// for unsigned ones.
    Lt,
    Le,
    Gt,
    Ge,
    Below,
    BelowEq,
    Above,
    AboveEq,
}

/// One abstract x86-64 instruction. Labels are [`Symbol`]s: function-local
/// control-flow labels (`.L<fn>_<n>`), function entry labels (the function
/// name itself, or `_start`), or data labels (`.L.str.N`, `_read_failed`).
#[derive(Debug, Clone)]
pub enum Instr {
    Push(Reg),
    Pop(Reg),

    /// `sub rsp, imm32` - the one place codegen needs an immediate ALU
    /// operand, since the frame size is only known once per function and
    /// isn't worth threading through a register just to keep every other
    /// ALU op reg-to-reg.
    SubRspImm { imm: i32 },

    /// `mov`/`movsx`/`movzx` `dst <- [rbp+disp]`, sized and signedness
    /// chosen by `width`/`signed`. Widths below 8 always load into the
    /// 32-bit alias of `dst` (sign- or zero-extended); width 8 loads the
    /// full 64-bit register.
    LoadLocal { dst: Reg, disp: i32, width: Width, signed: bool },
    /// `mov [rbp+disp], src` using the sized store alias for `width`.
    StoreLocal { disp: i32, width: Width, src: Reg },

    /// `mov dst, [base+index]` (index optional) / `movsx`/`movzx`, for
    /// reading through a pointer a prior instruction materialized (the
    /// read/readln buffer, or the `_read_failed` flag once its address is
    /// loaded). Never used for `rbp`-relative locals - use
    /// [`Instr::LoadLocal`] for those.
    LoadIndirect { dst: Reg, base: Reg, index: Option<Reg>, width: Width, signed: bool },
    StoreIndirect { base: Reg, index: Option<Reg>, width: Width, src: Reg },

    /// `lea dst, [rbp+disp]` - the address of a local, never a relocation
    /// (purely intra-function).
    LeaLocal { dst: Reg, disp: i32 },
    /// `lea dst, [rip+label]` - available per the assembler's instruction
    /// table (§6.2) and supported by the encoder, but the code generator
    /// always reaches for [`Instr::MovAbsLabel`] to address static data (see
    /// DESIGN.md); kept so the encoder's PC-relative-32 relocation path has
    /// a producer to round-trip against in tests.
    LeaRip { dst: Reg, label: Symbol },

    MovReg { dst: Reg, src: Reg, width: Width },
    /// `mov <32-bit alias of dst>, imm32` - zero-extends the upper 32 bits
    /// of the 64-bit register, which is exactly right for non-negative
    /// values that fit in `i32`.
    MovImm32 { dst: Reg, imm: i32 },
    /// `movabs dst, imm64` - the only encoding that can materialize an
    /// arbitrary 64-bit immediate (negative values included).
    MovAbsImm { dst: Reg, imm: i64 },
    /// `movabs dst, <addr of label>` - absolute-64 relocation against a
    /// `.rodata` or `.bss` symbol.
    MovAbsLabel { dst: Reg, label: Symbol },

    /// Sign-extend the low byte/word of `src` into the 32-bit alias of
    /// `dst` (`movsx eax, al` / `movsx eax, ax`).
    Movsx32 { dst: Reg, src: Reg, width: Width },
    /// Zero-extend the low byte/word of `src` into the 32-bit alias of
    /// `dst` (`movzx eax, al` / `movzx eax, ax`).
    Movzx32 { dst: Reg, src: Reg, width: Width },
    /// `movsxd dst, <32-bit alias of src>` - widens a 4-byte value to 8.
    Movsxd64 { dst: Reg, src: Reg },

    Add { dst: Reg, src: Reg, width: Width },
    Sub { dst: Reg, src: Reg, width: Width },
    And { dst: Reg, src: Reg, width: Width },
    Or { dst: Reg, src: Reg, width: Width },
    Xor { dst: Reg, src: Reg, width: Width },
    /// Shift count is always `cl`, per the ABI-free convention this
    /// compiler uses internally (§4.4).
    Shl { dst: Reg, width: Width },
    Shr { dst: Reg, width: Width },
    Sar { dst: Reg, width: Width },
    Neg { dst: Reg, width: Width },
    Not { dst: Reg, width: Width },

    /// `imul dst, src` at the given width (two-operand form).
    Imul { dst: Reg, src: Reg, width: Width },
    /// Signed divide: `rax`/`eax`/... is the implicit dividend, `src` the
    /// divisor; quotient lands in `rax`/`eax`, remainder in `rdx`/`edx`.
    /// The codegen emits `Cdq`/`Cqo` immediately before this as needed.
    Idiv { src: Reg, width: Width },
    /// Unsigned divide - same register convention as `Idiv`.
    Div { src: Reg, width: Width },
    /// Sign-extend `eax` into `edx:eax` ahead of a 32-bit `idiv`.
    Cdq,
    /// Sign-extend `rax` into `rdx:rax` ahead of a 64-bit `idiv`.
    Cqo,
    /// Zero `edx`/`rdx` ahead of an unsigned `div` (there is no dedicated
    /// "zero-extend" opcode for unsigned division - the codegen just
    /// clears the high half directly).
    ZeroHigh { width: Width },

    Cmp { lhs: Reg, rhs: Reg, width: Width },
    Test { lhs: Reg, rhs: Reg, width: Width },
    /// `setcc al` followed implicitly by the caller's `movzx eax, al` where
    /// needed - `Setcc` itself only ever targets the 8-bit alias.
    Setcc { cond: Cond, dst: Reg },

    Jmp(Symbol),
    Jcc { cond: Cond, target: Symbol },
    Call(Symbol),
    Ret,
    Syscall,

    /// Defines `label` at the current position. Every label the codegen
    /// emits must be the target of [`Instr::Label`] exactly once - the
    /// assembler's label-uniqueness invariant (§8.4) is enforced here, not
    /// downstream.
    Label(Symbol),
}
