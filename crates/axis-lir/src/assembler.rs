//! Two-pass assembler: per-function sizing and label placement, then a
//! final encode pass once every function's absolute address is known.
//!
//! Jumps only ever target a label within the *same* function (every
//! control-flow label the code generator emits is function-scoped), so the
//! short/long relaxation in [`layout_function`] can run one function at a
//! time against a local `base_addr` of zero - a function's own internal
//! layout never depends on where it ends up sitting in `.text`. `call`
//! targets are a different function's entry label, which is why they're
//! resolved in a second pass over the whole module, after every function's
//! size - and therefore its address - is fixed.

use axis_mir::{Function, Instr, Module};
use axis_util::{FxHashMap, Symbol};

use crate::encode::{encode, JumpForm};
use crate::reloc::{RelocTarget, Relocation};

struct FuncLayout {
    size: u32,
    local_labels: FxHashMap<Symbol, u32>,
    forms: Vec<JumpForm>,
}

fn jump_target(instr: &Instr) -> Option<Symbol> {
    match instr {
        Instr::Jmp(target) => Some(*target),
        Instr::Jcc { target, .. } => Some(*target),
        _ => None,
    }
}

/// Decide the short-vs-long form of every jump in `f` and compute the
/// function's total encoded size, by repeatedly sizing the function and
/// widening any short jump whose displacement no longer fits in an `i8`.
/// Sizes only ever grow as jumps widen, so this terminates: each iteration
/// either leaves every form unchanged (done) or flips at least one jump
/// from `Short` to `Long` for good.
fn layout_function(f: &Function) -> FuncLayout {
    let mut forms = vec![JumpForm::Short; f.instrs.len()];

    loop {
        let mut offset = 0u32;
        let mut local_labels = FxHashMap::default();
        let mut sizes = vec![0u32; f.instrs.len()];
        for (i, instr) in f.instrs.iter().enumerate() {
            if let Instr::Label(l) = instr {
                local_labels.insert(*l, offset);
                continue;
            }
            let size = encode(instr, forms[i], 0).bytes.len() as u32;
            sizes[i] = size;
            offset += size;
        }

        let mut changed = false;
        let mut cursor = 0u32;
        for (i, instr) in f.instrs.iter().enumerate() {
            if matches!(instr, Instr::Label(_)) {
                continue;
            }
            let next_offset = cursor + sizes[i];
            if forms[i] == JumpForm::Short {
                if let Some(target) = jump_target(instr) {
                    let target_offset = *local_labels
                        .get(&target)
                        .unwrap_or_else(|| panic!("undefined label `{}` in function `{}`", target.as_str(), f.name.as_str()));
                    let disp = target_offset as i64 - next_offset as i64;
                    if disp < i8::MIN as i64 || disp > i8::MAX as i64 {
                        forms[i] = JumpForm::Long;
                        changed = true;
                    }
                }
            }
            cursor = next_offset;
        }

        if !changed {
            return FuncLayout { size: offset, local_labels, forms };
        }
    }
}

/// The assembled `.text` section plus every `.rodata`/`.bss` reference it
/// still needs patched, and the absolute address each function ended up
/// at (handy for `axis-gen` to resolve the entry point).
pub struct AssembledText {
    pub bytes: Vec<u8>,
    pub relocations: Vec<Relocation>,
    pub function_addrs: FxHashMap<Symbol, u64>,
}

/// Assemble every function in `module` into one contiguous `.text` blob
/// starting at `text_base`. `data_symbol` resolves a label to where it'll
/// live once `.rodata`/`.bss` are laid out - the assembler itself never
/// computes that, since it depends on `.text`'s total size.
pub fn assemble(module: &Module, text_base: u64, data_symbol: impl Fn(Symbol) -> RelocTarget) -> AssembledText {
    let layouts: Vec<FuncLayout> = module.functions.iter().map(layout_function).collect();

    let mut function_addrs = FxHashMap::default();
    let mut addr = text_base;
    for (f, layout) in module.functions.iter().zip(&layouts) {
        function_addrs.insert(f.name, addr);
        addr += layout.size as u64;
    }

    let mut bytes = Vec::new();
    let mut relocations = Vec::new();
    let mut addr = text_base;

    for (f, layout) in module.functions.iter().zip(&layouts) {
        let func_start = addr;
        for (i, instr) in f.instrs.iter().enumerate() {
            if matches!(instr, Instr::Label(_)) {
                continue;
            }
            let form = layout.forms[i];

            let size = encode(instr, form, 0).bytes.len() as u64;
            let next_addr = addr + size;

            let disp: i32 = match instr {
                Instr::Jmp(target) | Instr::Jcc { target, .. } => {
                    let target_addr =
                        func_start + *layout.local_labels.get(target).expect("layout_function already validated every jump target") as u64;
                    (target_addr as i64 - next_addr as i64) as i32
                }
                Instr::Call(callee) => {
                    let target_addr = *function_addrs
                        .get(callee)
                        .unwrap_or_else(|| panic!("call to undefined function `{}`", callee.as_str()));
                    (target_addr as i64 - next_addr as i64) as i32
                }
                _ => 0,
            };

            let encoded = encode(instr, form, disp);
            if let Some((field_offset, symbol, kind)) = encoded.data_ref {
                let text_offset = (addr - text_base) as u32 + field_offset;
                relocations.push(Relocation { text_offset, kind, target: data_symbol(symbol) });
            }
            bytes.extend_from_slice(&encoded.bytes);
            addr = next_addr;
        }
    }

    AssembledText { bytes, relocations, function_addrs }
}

#[cfg(test)]
mod tests {
    use axis_mir::{Cond, Reg, Width};
    use axis_util::Symbol;

    use super::*;

    fn no_data(_: Symbol) -> RelocTarget {
        panic!("test module has no data references")
    }

    #[test]
    fn empty_function_list_assembles_to_nothing() {
        let module = Module::new();
        let out = assemble(&module, 0x401000, no_data);
        assert!(out.bytes.is_empty());
        assert!(out.relocations.is_empty());
    }

    #[test]
    fn two_functions_get_distinct_non_overlapping_addresses() {
        let a = Function { name: Symbol::intern("axis_lir_asm_test_a"), instrs: vec![Instr::Label(Symbol::intern("axis_lir_asm_test_a")), Instr::Ret] };
        let b = Function { name: Symbol::intern("axis_lir_asm_test_b"), instrs: vec![Instr::Label(Symbol::intern("axis_lir_asm_test_b")), Instr::Ret] };
        let module = Module { functions: vec![a, b], strings: vec![] };
        let out = assemble(&module, 0x401000, no_data);
        assert_eq!(out.bytes, vec![0xC3, 0xC3]);
        assert_eq!(*out.function_addrs.get(&Symbol::intern("axis_lir_asm_test_a")).unwrap(), 0x401000);
        assert_eq!(*out.function_addrs.get(&Symbol::intern("axis_lir_asm_test_b")).unwrap(), 0x401001);
    }

    #[test]
    fn backward_jcc_resolves_to_a_negative_short_displacement() {
        let top = Symbol::intern("axis_lir_asm_test_top");
        let f = Function {
            name: Symbol::intern("axis_lir_asm_test_loop"),
            instrs: vec![
                Instr::Label(top),
                Instr::Test { lhs: Reg::Rax, rhs: Reg::Rax, width: Width::B4 },
                Instr::Jcc { cond: Cond::Ne, target: top },
                Instr::Ret,
            ],
        };
        let module = Module { functions: vec![f], strings: vec![] };
        let out = assemble(&module, 0x401000, no_data);
        // test(2) + jcc-short(2) + ret(1) = 5 bytes; jcc's rel8 is -4 (back to offset 0).
        assert_eq!(out.bytes.len(), 5);
        assert_eq!(out.bytes[3] as i8, -4);
    }

    #[test]
    fn call_resolves_to_the_callees_function_address() {
        let callee = Symbol::intern("axis_lir_asm_test_callee");
        let caller_name = Symbol::intern("axis_lir_asm_test_caller");
        let a = Function { name: caller_name, instrs: vec![Instr::Label(caller_name), Instr::Call(callee), Instr::Ret] };
        let b = Function { name: callee, instrs: vec![Instr::Label(callee), Instr::Ret] };
        let module = Module { functions: vec![a, b], strings: vec![] };
        let out = assemble(&module, 0x401000, no_data);
        // caller: call(5) + ret(1) = 6 bytes, starting at 0x401000; callee starts at 0x401006.
        let rel32 = i32::from_le_bytes(out.bytes[1..5].try_into().unwrap());
        let next_instr_addr = 0x401000i64 + 5;
        assert_eq!(0x401006i64, next_instr_addr + rel32 as i64);
    }
}
