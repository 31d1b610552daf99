//! ELF64 executable writer (§4.6).
//!
//! One `PT_LOAD` segment covers the entire file: headers, `.text`,
//! `.rodata`, and the single `.bss` byte all load as one `R|X` region at a
//! fixed virtual base. There is no section header table - the loader never
//! looks at one, and nothing downstream of this compiler reads this file
//! back in, so it would be pure ceremony.

use axis_mir::Module;

use crate::layout::{build_image, BASE_VADDR, TEXT_FILE_OFFSET, TEXT_VADDR};

const ELF_HEADER_SIZE: u64 = 64;
const PROGRAM_HEADER_SIZE: u64 = 56;

const ET_EXEC: u16 = 2;
const EM_X86_64: u16 = 62;
const PT_LOAD: u32 = 1;
/// `PF_X | PF_R` - the segment is never writable (§4.6: "simple model").
/// A program that uses `read()`/`readln()`/`readchar()` writes to the
/// `_read_failed` byte at runtime; under this flag set that write faults.
/// The specification is explicit about the flag choice rather than listing
/// it as an open ambiguity, so the writer follows it as given - see
/// DESIGN.md.
const PF_R_X: u32 = 5;

/// Build a complete ELF64 executable for `module`.
pub fn build_elf(module: &Module) -> Vec<u8> {
    let image = build_image(module);
    let total_size = TEXT_FILE_OFFSET + image.text.len() as u64 + image.rodata.len() as u64 + 1;

    let mut out = Vec::with_capacity(total_size as usize);

    // e_ident
    out.extend_from_slice(&[0x7f, b'E', b'L', b'F']);
    out.push(2); // EI_CLASS: ELFCLASS64
    out.push(1); // EI_DATA: ELFDATA2LSB
    out.push(1); // EI_VERSION: EV_CURRENT
    out.push(0); // EI_OSABI: ELFOSABI_SYSV
    out.extend_from_slice(&[0u8; 8]); // EI_ABIVERSION + EI_PAD

    out.extend_from_slice(&ET_EXEC.to_le_bytes());
    out.extend_from_slice(&EM_X86_64.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes()); // e_version
    out.extend_from_slice(&TEXT_VADDR.to_le_bytes()); // e_entry
    out.extend_from_slice(&ELF_HEADER_SIZE.to_le_bytes()); // e_phoff
    out.extend_from_slice(&0u64.to_le_bytes()); // e_shoff
    out.extend_from_slice(&0u32.to_le_bytes()); // e_flags
    out.extend_from_slice(&(ELF_HEADER_SIZE as u16).to_le_bytes()); // e_ehsize
    out.extend_from_slice(&(PROGRAM_HEADER_SIZE as u16).to_le_bytes()); // e_phentsize
    out.extend_from_slice(&1u16.to_le_bytes()); // e_phnum
    out.extend_from_slice(&0u16.to_le_bytes()); // e_shentsize
    out.extend_from_slice(&0u16.to_le_bytes()); // e_shnum
    out.extend_from_slice(&0u16.to_le_bytes()); // e_shstrndx
    assert_eq!(out.len() as u64, ELF_HEADER_SIZE);

    out.extend_from_slice(&PT_LOAD.to_le_bytes());
    out.extend_from_slice(&PF_R_X.to_le_bytes());
    out.extend_from_slice(&0u64.to_le_bytes()); // p_offset
    out.extend_from_slice(&BASE_VADDR.to_le_bytes()); // p_vaddr
    out.extend_from_slice(&BASE_VADDR.to_le_bytes()); // p_paddr
    out.extend_from_slice(&total_size.to_le_bytes()); // p_filesz
    out.extend_from_slice(&total_size.to_le_bytes()); // p_memsz
    out.extend_from_slice(&0x1000u64.to_le_bytes()); // p_align
    assert_eq!(out.len() as u64, ELF_HEADER_SIZE + PROGRAM_HEADER_SIZE);

    out.resize(TEXT_FILE_OFFSET as usize, 0);
    out.extend_from_slice(&image.text);
    out.extend_from_slice(&image.rodata);
    out.push(image.bss_byte);

    debug_assert_eq!(out.len() as u64, total_size);
    out
}

#[cfg(test)]
mod tests {
    use axis_mir::{Function, Instr};
    use axis_util::Symbol;

    use super::*;

    fn trivial_module() -> Module {
        let start = Symbol::intern("axis_gen_elf_test_start");
        Module {
            functions: vec![Function { name: start, instrs: vec![Instr::Label(start), Instr::MovImm32 { dst: axis_mir::Reg::Rax, imm: 60 }, Instr::Syscall] }],
            strings: vec![],
        }
    }

    #[test]
    fn header_fields_match_the_fixed_layout() {
        let bytes = build_elf(&trivial_module());
        assert_eq!(&bytes[0..4], &[0x7f, b'E', b'L', b'F']);
        assert_eq!(bytes[4], 2); // 64-bit
        assert_eq!(bytes[5], 1); // little endian
        assert_eq!(u16::from_le_bytes([bytes[16], bytes[17]]), ET_EXEC);
        assert_eq!(u16::from_le_bytes([bytes[18], bytes[19]]), EM_X86_64);
        let entry = u64::from_le_bytes(bytes[24..32].try_into().unwrap());
        assert_eq!(entry, 0x401000);
    }

    #[test]
    fn program_header_filesz_equals_memsz() {
        let bytes = build_elf(&trivial_module());
        let phoff = 64usize;
        let filesz = u64::from_le_bytes(bytes[phoff + 32..phoff + 40].try_into().unwrap());
        let memsz = u64::from_le_bytes(bytes[phoff + 40..phoff + 48].try_into().unwrap());
        assert_eq!(filesz, memsz);
        assert_eq!(filesz, bytes.len() as u64);
    }

    #[test]
    fn text_begins_exactly_one_page_in() {
        let bytes = build_elf(&trivial_module());
        // mov eax,60 (5 bytes) + syscall (2 bytes) + the bss flag byte.
        assert_eq!(bytes.len(), 0x1000 + 5 + 2 + 1);
        // every byte between the program header and 0x1000 is padding.
        assert!(bytes[120..0x1000].iter().all(|b| *b == 0));
    }
}
