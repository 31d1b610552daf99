//! System V AMD64 calling convention constants (§4.4).
//!
//! AXIS functions only ever use the integer/pointer argument class - there
//! is no floating point (see the Non-goals in §1) - so this is a single
//! six-register table plus the return register.

use crate::instr::Reg;

/// Integer/pointer return register, narrowed to `al`/`eax` by the caller
/// when the return type is smaller than 8 bytes.
pub const RETURN_REG: Reg = Reg::Rax;

/// Scratch register codegen reaches for when it needs to hold the LHS
/// popped off the naive expression stack (§4.4). `rbx` is callee-saved and
/// otherwise untouched by codegen, but that never matters here: the LHS is
/// always popped back out of it before the function returns or calls
/// anything else that could observe it, so there is nothing to spill or
/// restore (see DESIGN.md for the `rbx`-vs-`rcx` call).
pub const SCRATCH_REG: Reg = Reg::Rbx;

/// Maximum parameter count codegen supports - the language contract caps
/// this at the width of the argument-register table (§4.2).
pub const MAX_PARAMS: usize = Reg::ARG_REGS.len();
