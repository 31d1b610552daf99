//! Shared section layout: assemble `.text`, build `.rodata`, patch every
//! relocation the assembler left behind, and hand both formats
//! ([`crate::elf`], [`crate::raw`]) the same three byte ranges.
//!
//! `.bss` needs no allocation pass of its own - the whole program carries
//! exactly one static byte, `_read_failed` (§3), so it's simplest to treat
//! it as a single zero byte appended after `.rodata` rather than build out
//! a general-purpose bss allocator for one flag.

use axis_lir::{assemble, RelocKind, RelocTarget};
use axis_mir::Module;
use axis_util::{FxHashMap, Symbol};

/// Virtual address Linux maps the program at (§4.6).
pub const BASE_VADDR: u64 = 0x400000;
/// File offset (and vaddr offset from `BASE_VADDR`) where `.text` starts -
/// one page in, past the ELF + program headers.
pub const TEXT_FILE_OFFSET: u64 = 0x1000;
/// `.text`'s - and therefore `_start`'s - virtual address.
pub const TEXT_VADDR: u64 = BASE_VADDR + TEXT_FILE_OFFSET;

pub struct Image {
    pub text: Vec<u8>,
    pub rodata: Vec<u8>,
    /// `_read_failed`'s single initial value - always zero; the emitted
    /// program's own code sets it to 1 on a failed parse.
    pub bss_byte: u8,
}

fn build_rodata(module: &Module) -> (Vec<u8>, FxHashMap<Symbol, u32>) {
    let mut rodata = Vec::new();
    let mut offsets = FxHashMap::default();
    for s in &module.strings {
        offsets.insert(s.label, rodata.len() as u32);
        rodata.extend_from_slice(&s.bytes);
        rodata.push(0); // null terminator, per §3
    }
    (rodata, offsets)
}

pub fn build_image(module: &Module) -> Image {
    let (rodata, rodata_offsets) = build_rodata(module);
    let read_failed = Symbol::intern(Module::READ_FAILED_SYMBOL);

    let data_symbol = |label: Symbol| -> RelocTarget {
        if label == read_failed {
            RelocTarget::Bss
        } else {
            let offset = *rodata_offsets
                .get(&label)
                .unwrap_or_else(|| panic!("relocation against undefined data symbol `{}`", label.as_str()));
            RelocTarget::Rodata(offset)
        }
    };

    let assembled = assemble(module, TEXT_VADDR, data_symbol);
    let mut text = assembled.bytes;

    let rodata_vaddr = TEXT_VADDR + text.len() as u64;
    let bss_vaddr = rodata_vaddr + rodata.len() as u64;

    for reloc in &assembled.relocations {
        let target_addr = match reloc.target {
            RelocTarget::Rodata(offset) => rodata_vaddr + offset as u64,
            RelocTarget::Bss => bss_vaddr,
        };
        let at = reloc.text_offset as usize;
        match reloc.kind {
            RelocKind::Abs64 => {
                text[at..at + 8].copy_from_slice(&target_addr.to_le_bytes());
            }
            RelocKind::Pc32 => {
                let next_instr_addr = TEXT_VADDR + (at as u64) + 4;
                let disp = (target_addr as i64 - next_instr_addr as i64) as i32;
                text[at..at + 4].copy_from_slice(&disp.to_le_bytes());
            }
        }
    }

    Image { text, rodata, bss_byte: 0 }
}
