//! axis-mir - the code generator's abstract instruction layer.
//!
//! Lowers the semantic analyzer's annotated tree into a flat stream of
//! [`instr::Instr`]s plus the data the assembler needs alongside them
//! ([`module::Module`]). Nothing here knows how an instruction is encoded
//! into bytes or how sections end up in an ELF file - that's `axis-lir` and
//! `axis-gen`.

pub mod abi;
pub mod instr;
pub mod lower;
pub mod module;

pub use instr::{Cond, Instr, Reg, Width};
pub use lower::lower_program;
pub use module::{Function, Module, StringData};

#[cfg(test)]
mod tests {
    use axis_lex::Lexer;
    use axis_par::Parser;
    use axis_sem::Analyzer;
    use axis_util::{FileId, Handler};

    use super::*;

    fn lower_source(src: &str) -> Module {
        let file = FileId(0);
        let mut handler = Handler::new();
        let tokens = Lexer::new(src, file, "<test>", &mut handler).tokenize();
        assert!(!handler.has_errors(), "lex errors: {:?}", handler.diagnostics());
        let ast = Parser::new(tokens, file, "<test>", &mut handler).parse_program();
        assert!(!handler.has_errors(), "lex/parse errors: {:?}", handler.diagnostics());
        let hir = Analyzer::new(file, "<test>", &mut handler).analyze(&ast);
        assert!(!handler.has_errors(), "semantic errors: {:?}", handler.diagnostics());
        lower_program(&hir)
    }

    fn find<'m>(module: &'m Module, name: &str) -> &'m Function {
        module.functions.iter().find(|f| f.name.as_str() == name).unwrap_or_else(|| panic!("no function `{name}` in lowered module"))
    }

    #[test]
    fn every_label_is_defined_exactly_once() {
        let module = lower_source(
            "func main() -> i32:\n    x: i32 = 1\n    when x == 1:\n        give 0\n    else:\n        give 1\n",
        );
        for f in &module.functions {
            let mut seen = std::collections::HashSet::new();
            for i in &f.instrs {
                if let Instr::Label(l) = i {
                    assert!(seen.insert(*l), "label `{}` defined twice in `{}`", l.as_str(), f.name.as_str());
                }
            }
        }
    }

    #[test]
    fn start_stub_is_five_instructions() {
        let module = lower_source("func main() -> i32:\n    give 0\n");
        let start = find(&module, "_start");
        assert_eq!(start.instrs.len(), 6); // label + 5 real instructions
        assert!(matches!(start.instrs[0], Instr::Label(_)));
        assert!(matches!(start.instrs[5], Instr::Syscall));
    }

    #[test]
    fn function_prologue_reserves_a_16_byte_aligned_frame() {
        let module = lower_source("func main() -> i32:\n    a: i32 = 1\n    give a\n");
        let main = find(&module, "main");
        let sub = main.instrs.iter().find_map(|i| match i {
            Instr::SubRspImm { imm } => Some(*imm),
            _ => None,
        });
        let imm = sub.expect("prologue must reserve stack space");
        assert_eq!(imm % 16, 0);
        assert!(imm >= 16); // at least the scratch buffer
    }

    #[test]
    fn recursive_call_pops_args_in_reverse_push_order() {
        let module = lower_source(
            "func fact(n: i32) -> i32:\n    when n <= 1:\n        give 1\n    give n * fact(n - 1)\n\nfunc main() -> i32:\n    give fact(5)\n",
        );
        let fact = find(&module, "fact");
        let call_idx = fact.instrs.iter().position(|i| matches!(i, Instr::Call(_))).expect("fact must call itself");
        assert!(matches!(fact.instrs[call_idx - 1], Instr::Pop(Reg::Rdi)));
    }

    #[test]
    fn division_never_uses_rdx_as_the_explicit_divisor() {
        let module = lower_source("func main() -> i32:\n    a: i32 = 10\n    b: i32 = 3\n    give a / b\n");
        let main = find(&module, "main");
        for i in &main.instrs {
            if let Instr::Idiv { src, .. } | Instr::Div { src, .. } = i {
                assert_ne!(*src, Reg::Rdx, "idiv/div must never divide by the register holding the dividend's high half");
                assert_ne!(*src, Reg::Rax);
            }
        }
    }
}
