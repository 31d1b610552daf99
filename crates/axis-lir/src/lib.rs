//! axis-lir - the assembler.
//!
//! Turns a lowered [`axis_mir::Module`] into raw `.text` bytes plus the
//! relocations `axis-gen` needs to patch in `.rodata`/`.bss` addresses once
//! it has decided where those sections live. No ELF or raw-binary framing
//! happens here - that's `axis-gen`.

pub mod assembler;
pub mod encode;
pub mod reloc;

pub use assembler::{assemble, AssembledText};
pub use encode::{encode, EncodedInstr, JumpForm};
pub use reloc::{RelocKind, RelocTarget, Relocation};
