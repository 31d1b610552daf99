//! Relocation records the assembler can't resolve on its own.
//!
//! Everything inside `.text` - calls, conditional jumps, the function
//! prologue's stack reservation - is self-contained: by the time the whole
//! module has been laid out, every code address is known. The one thing the
//! assembler genuinely cannot resolve by itself is a reference to `.rodata`
//! or `.bss`, because those sections are only placed once `.text`'s final
//! size is known (§4.6). [`Relocation`] records what to patch once that
//! layout decision is made - `axis-gen` is the consumer.

use axis_util::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocKind {
    /// An 8-byte absolute address, produced by `movabs` (§6.2).
    Abs64,
    /// A 4-byte `target - next_instruction` displacement, produced by
    /// `lea reg, [rip+disp32]`.
    Pc32,
}

/// Where a relocation's symbol ultimately resolves to, once section layout
/// is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocTarget {
    /// Byte offset of a string's first byte within the concatenated
    /// `.rodata` blob.
    Rodata(u32),
    /// The single `_read_failed` flag byte (§3).
    Bss,
}

/// A patch site within the assembled `.text` bytes.
#[derive(Debug, Clone)]
pub struct Relocation {
    /// Byte offset from the start of `.text` where the patchable field
    /// begins.
    pub text_offset: u32,
    pub kind: RelocKind,
    pub target: RelocTarget,
}
