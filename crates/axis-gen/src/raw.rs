//! Raw binary writer - the default output format (§6.4): `[_start || code
//! || rodata]` with no ELF framing at all. Useful for inspecting the
//! assembler's output directly (`objdump -D -b binary -m i386:x86-64`)
//! without an ELF container in the way.
//!
//! The `.bss` flag byte isn't part of the bracketed `[_start || code ||
//! rodata]` description, but the same relocations that address it in the
//! ELF build address it here too, so it's still appended - a raw blob with
//! a dangling absolute reference past its own end would be strictly worse
//! for inspection, not simpler.

use axis_mir::Module;

use crate::layout::build_image;

pub fn build_raw(module: &Module) -> Vec<u8> {
    let image = build_image(module);
    let mut out = image.text;
    out.extend_from_slice(&image.rodata);
    out.push(image.bss_byte);
    out
}

#[cfg(test)]
mod tests {
    use axis_mir::{Function, Instr, Reg};
    use axis_util::Symbol;

    use super::*;

    #[test]
    fn raw_output_has_no_elf_magic() {
        let start = Symbol::intern("axis_gen_raw_test_start");
        let module = Module {
            functions: vec![Function { name: start, instrs: vec![Instr::Label(start), Instr::MovImm32 { dst: Reg::Rax, imm: 60 }, Instr::Syscall] }],
            strings: vec![],
        };
        let bytes = build_raw(&module);
        assert_ne!(&bytes[0..4.min(bytes.len())], &[0x7f, b'E', b'L', b'F']);
        assert_eq!(bytes.len(), 5 + 2 + 1);
    }
}
