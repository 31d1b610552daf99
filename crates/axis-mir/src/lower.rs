//! Lowers the semantic analyzer's annotated tree ([`axis_sem::hir`]) into
//! this crate's abstract instruction stream (§4.4 of the language contract:
//! stack-frame layout, the naive push/pop expression discipline, and the
//! `read`/`write` builtin syscall sequences).

use axis_par::ast::{BinOp, BuiltinKind, ReadToKind, UnOp};
use axis_sem::hir;
use axis_sem::Type;
use axis_util::Symbol;

use crate::abi::SCRATCH_REG;
use crate::instr::{Cond, Instr, Reg, Width};
use crate::module::{Function, Module, StringData};

/// Bytes reserved below every function's own locals for the `write`/`read`
/// scratch buffer. `i64::MIN` renders as 20 digits plus a sign (21 bytes);
/// 32 leaves headroom for the `write`/`writeln` call without touching the
/// newline-write path, which uses its own single byte at the same address.
const SCRATCH_SIZE: i32 = 32;

pub fn lower_program(program: &hir::Program) -> Module {
    let mut module = Module::new();
    for s in &program.strings {
        module.strings.push(StringData { label: s.label, bytes: s.bytes.as_str().as_bytes().to_vec() });
    }
    for func in &program.funcs {
        module.functions.push(lower_func(func));
    }
    module.functions.push(lower_start());
    module
}

/// The fixed 16-byte process entry point (§4.4): zero `edi`, call `main`,
/// move its return value into the exit-status register, and exit.
fn lower_start() -> Function {
    use Reg::*;
    let instrs = vec![
        Instr::Label(Symbol::intern("_start")),
        Instr::Xor { dst: Rdi, src: Rdi, width: Width::B4 },
        Instr::Call(Symbol::intern("main")),
        Instr::MovReg { dst: Rdi, src: Rax, width: Width::B4 },
        Instr::MovImm32 { dst: Rax, imm: 60 },
        Instr::Syscall,
    ];
    Function { name: Symbol::intern("_start"), instrs }
}

fn align16(n: i32) -> i32 {
    (n + 15) & !15
}

struct LoopLabels {
    continue_label: Symbol,
    break_label: Symbol,
}

/// One function's worth of lowering state. Nothing here survives past the
/// function boundary - every label is function-local.
struct FuncLower {
    instrs: Vec<Instr>,
    label_counter: u32,
    fn_name: Symbol,
    ret_label: Symbol,
    loop_stack: Vec<LoopLabels>,
    /// `rbp`-relative offset of the scratch buffer's first (lowest-address)
    /// byte.
    scratch_base: i32,
}

fn lower_func(func: &hir::Func) -> Function {
    let total_frame = align16(func.frame_size + SCRATCH_SIZE);
    let scratch_base = -(func.frame_size + SCRATCH_SIZE);
    let ret_label = Symbol::intern(&format!(".L{}_ret", func.name.as_str()));

    let mut fl = FuncLower {
        instrs: Vec::new(),
        label_counter: 0,
        fn_name: func.name,
        ret_label,
        loop_stack: Vec::new(),
        scratch_base,
    };

    fl.push(Instr::Label(func.name));
    fl.push(Instr::Push(Reg::Rbp));
    fl.push(Instr::MovReg { dst: Reg::Rbp, src: Reg::Rsp, width: Width::B8 });
    fl.push(Instr::SubRspImm { imm: total_frame });
    for (i, p) in func.params.iter().enumerate() {
        fl.push(Instr::StoreLocal { disp: p.offset, width: Width::from_bytes(p.ty.size()), src: Reg::ARG_REGS[i] });
    }

    fl.lower_block(&func.body);

    fl.push(Instr::Label(ret_label));
    fl.push(Instr::MovReg { dst: Reg::Rsp, src: Reg::Rbp, width: Width::B8 });
    fl.push(Instr::Pop(Reg::Rbp));
    fl.push(Instr::Ret);

    Function { name: func.name, instrs: fl.instrs }
}

/// The three read-family operations, unified because they share the
/// mmap-then-read prelude and differ only in how much to read and what to
/// do with the bytes afterward.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ReadOp {
    Read,
    ReadLn,
    ReadChar,
}

impl FuncLower {
    fn push(&mut self, i: Instr) {
        self.instrs.push(i);
    }

    fn fresh_label(&mut self) -> Symbol {
        self.label_counter += 1;
        Symbol::intern(&format!(".L{}_{}", self.fn_name.as_str(), self.label_counter))
    }

    fn lower_block(&mut self, block: &hir::Block) {
        for stmt in &block.stmts {
            self.lower_stmt(stmt);
        }
    }

    fn lower_stmt(&mut self, stmt: &hir::Stmt) {
        match stmt {
            hir::Stmt::VarDecl { offset, ty, init, .. } => {
                self.lower_expr(init);
                self.push(Instr::StoreLocal { disp: *offset, width: Width::from_bytes(ty.size()), src: Reg::Rax });
            }
            hir::Stmt::Assign { offset, ty, value, .. } => {
                self.lower_expr(value);
                self.push(Instr::StoreLocal { disp: *offset, width: Width::from_bytes(ty.size()), src: Reg::Rax });
            }
            hir::Stmt::If { cond, then_block, else_block } => self.lower_if(cond, then_block, else_block.as_ref()),
            hir::Stmt::While { cond, body } => self.lower_while(cond, body),
            hir::Stmt::Loop { body } => self.lower_loop(body),
            hir::Stmt::Break => {
                let target = self.loop_stack.last().expect("break outside a loop").break_label;
                self.push(Instr::Jmp(target));
            }
            hir::Stmt::Continue => {
                let target = self.loop_stack.last().expect("continue outside a loop").continue_label;
                self.push(Instr::Jmp(target));
            }
            hir::Stmt::Return { value } => {
                if let Some(v) = value {
                    self.lower_expr(v);
                }
                let ret = self.ret_label;
                self.push(Instr::Jmp(ret));
            }
            hir::Stmt::ExprStmt { call } => self.lower_expr(call),
            hir::Stmt::Write { value, newline } => self.lower_write(value, *newline),
            hir::Stmt::ReadTo { offset, ty, kind, .. } => self.lower_read_to(*offset, *ty, kind),
        }
    }

    fn lower_if(&mut self, cond: &hir::Expr, then_block: &hir::Block, else_block: Option<&hir::Block>) {
        let else_label = self.fresh_label();
        self.lower_expr(cond);
        self.push(Instr::Test { lhs: Reg::Rax, rhs: Reg::Rax, width: Width::B1 });
        self.push(Instr::Jcc { cond: Cond::Eq, target: else_label });
        self.lower_block(then_block);
        match else_block {
            Some(eb) => {
                let end_label = self.fresh_label();
                self.push(Instr::Jmp(end_label));
                self.push(Instr::Label(else_label));
                self.lower_block(eb);
                self.push(Instr::Label(end_label));
            }
            None => self.push(Instr::Label(else_label)),
        }
    }

    fn lower_while(&mut self, cond: &hir::Expr, body: &hir::Block) {
        let start = self.fresh_label();
        let end = self.fresh_label();
        self.push(Instr::Label(start));
        self.lower_expr(cond);
        self.push(Instr::Test { lhs: Reg::Rax, rhs: Reg::Rax, width: Width::B1 });
        self.push(Instr::Jcc { cond: Cond::Eq, target: end });
        self.loop_stack.push(LoopLabels { continue_label: start, break_label: end });
        self.lower_block(body);
        self.loop_stack.pop();
        self.push(Instr::Jmp(start));
        self.push(Instr::Label(end));
    }

    fn lower_loop(&mut self, body: &hir::Block) {
        let start = self.fresh_label();
        let end = self.fresh_label();
        self.push(Instr::Label(start));
        self.loop_stack.push(LoopLabels { continue_label: start, break_label: end });
        self.lower_block(body);
        self.loop_stack.pop();
        self.push(Instr::Jmp(start));
        self.push(Instr::Label(end));
    }

    // -- expressions ---------------------------------------------------

    /// Lowers `e`, leaving the result in `rax` at `e.ty()`'s natural width.
    fn lower_expr(&mut self, e: &hir::Expr) {
        match e {
            hir::Expr::IntLit { value, ty } => self.lower_int_lit(*value, *ty),
            hir::Expr::BoolLit { value } => {
                self.push(Instr::MovImm32 { dst: Reg::Rax, imm: if *value { 1 } else { 0 } });
            }
            hir::Expr::StrLit { label, .. } => {
                self.push(Instr::MovAbsLabel { dst: Reg::Rax, label: *label });
            }
            hir::Expr::Ident { offset, ty, .. } => {
                self.push(Instr::LoadLocal {
                    dst: Reg::Rax,
                    disp: *offset,
                    width: Width::from_bytes(ty.size()),
                    signed: ty.is_signed(),
                });
            }
            hir::Expr::Unary { op, operand, ty } => self.lower_unary(*op, operand, *ty),
            hir::Expr::Binary { op, lhs, rhs, .. } => self.lower_binary(*op, lhs, rhs),
            hir::Expr::Call { callee, args, .. } => self.lower_call(*callee, args),
            hir::Expr::BuiltinCall { kind, .. } => self.lower_builtin_expr(*kind),
        }
    }

    fn lower_int_lit(&mut self, value: u64, ty: Type) {
        if ty.size() == 8 {
            self.push(Instr::MovAbsImm { dst: Reg::Rax, imm: value as i64 });
        } else {
            self.push(Instr::MovImm32 { dst: Reg::Rax, imm: value as i32 });
        }
    }

    fn lower_unary(&mut self, op: UnOp, operand: &hir::Expr, ty: Type) {
        self.lower_expr(operand);
        match op {
            UnOp::Neg => {
                let w = Width::from_bytes(ty.size());
                self.push(Instr::Neg { dst: Reg::Rax, width: w });
            }
            UnOp::Not => {
                self.push(Instr::Test { lhs: Reg::Rax, rhs: Reg::Rax, width: Width::B1 });
                self.push(Instr::Setcc { cond: Cond::Eq, dst: Reg::Rax });
                self.push(Instr::Movzx32 { dst: Reg::Rax, src: Reg::Rax, width: Width::B1 });
            }
        }
    }

    /// Evaluates `lhs` then `rhs` (pushing the former around the latter's
    /// evaluation), leaving `rhs` in `rax` and `lhs` in [`SCRATCH_REG`] -
    /// every operator below starts from that convention.
    fn lower_binary(&mut self, op: BinOp, lhs: &hir::Expr, rhs: &hir::Expr) {
        self.lower_expr(lhs);
        self.push(Instr::Push(Reg::Rax));
        self.lower_expr(rhs);
        self.push(Instr::Pop(SCRATCH_REG));

        let operand_ty = lhs.ty();
        let w = Width::from_bytes(operand_ty.size().max(1));
        let signed = operand_ty.is_signed();

        match op {
            BinOp::Add => self.push(Instr::Add { dst: Reg::Rax, src: SCRATCH_REG, width: w }),
            BinOp::BitAnd => self.push(Instr::And { dst: Reg::Rax, src: SCRATCH_REG, width: w }),
            BinOp::BitOr => self.push(Instr::Or { dst: Reg::Rax, src: SCRATCH_REG, width: w }),
            BinOp::BitXor => self.push(Instr::Xor { dst: Reg::Rax, src: SCRATCH_REG, width: w }),
            BinOp::Mul => self.push(Instr::Imul { dst: Reg::Rax, src: SCRATCH_REG, width: w }),
            BinOp::Sub => {
                // scratch = lhs, rax = rhs; want lhs - rhs.
                self.push(Instr::Sub { dst: SCRATCH_REG, src: Reg::Rax, width: w });
                self.push(Instr::MovReg { dst: Reg::Rax, src: SCRATCH_REG, width: Width::B8 });
            }
            BinOp::Div | BinOp::Rem => self.lower_div_rem(op, operand_ty),
            BinOp::Shl | BinOp::Shr => self.lower_shift(op, signed, w),
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                self.lower_compare(op, signed, w)
            }
        }
    }

    /// rax = rhs (divisor), scratch = lhs (dividend) on entry.
    fn lower_div_rem(&mut self, op: BinOp, ty: Type) {
        self.push(Instr::MovReg { dst: Reg::Rdi, src: Reg::Rax, width: Width::B8 });
        self.push(Instr::MovReg { dst: Reg::Rax, src: SCRATCH_REG, width: Width::B8 });

        let natural_w = Width::from_bytes(ty.size());
        let signed = ty.is_signed();
        // The ISA table only gives us cdq/cqo, not cbw/cwd - narrower
        // operands get re-widened from their true alias and divided at
        // 32 bits; the narrower caller only ever reads the low bytes back.
        if matches!(natural_w, Width::B1 | Width::B2) {
            if signed {
                self.push(Instr::Movsx32 { dst: Reg::Rax, src: Reg::Rax, width: natural_w });
                self.push(Instr::Movsx32 { dst: Reg::Rdi, src: Reg::Rdi, width: natural_w });
            } else {
                self.push(Instr::Movzx32 { dst: Reg::Rax, src: Reg::Rax, width: natural_w });
                self.push(Instr::Movzx32 { dst: Reg::Rdi, src: Reg::Rdi, width: natural_w });
            }
        }
        let op_w = if matches!(natural_w, Width::B1 | Width::B2) { Width::B4 } else { natural_w };

        if signed {
            self.push(if op_w == Width::B8 { Instr::Cqo } else { Instr::Cdq });
            self.push(Instr::Idiv { src: Reg::Rdi, width: op_w });
        } else {
            self.push(Instr::ZeroHigh { width: op_w });
            self.push(Instr::Div { src: Reg::Rdi, width: op_w });
        }
        if matches!(op, BinOp::Rem) {
            self.push(Instr::MovReg { dst: Reg::Rax, src: Reg::Rdx, width: op_w });
        }
    }

    /// rax = shift count (rhs), scratch = value (lhs) on entry.
    fn lower_shift(&mut self, op: BinOp, signed: bool, w: Width) {
        self.push(Instr::MovReg { dst: Reg::Rdi, src: Reg::Rax, width: Width::B8 }); // stash count
        self.push(Instr::MovReg { dst: Reg::Rax, src: SCRATCH_REG, width: Width::B8 }); // value -> rax
        self.push(Instr::MovReg { dst: Reg::Rcx, src: Reg::Rdi, width: Width::B8 }); // count -> cl
        match op {
            BinOp::Shl => self.push(Instr::Shl { dst: Reg::Rax, width: w }),
            // `>>` is arithmetic for signed operands, logical for unsigned.
            BinOp::Shr if signed => self.push(Instr::Sar { dst: Reg::Rax, width: w }),
            BinOp::Shr => self.push(Instr::Shr { dst: Reg::Rax, width: w }),
            _ => unreachable!("lower_shift called with a non-shift operator"),
        }
    }

    /// rax = rhs, scratch = lhs on entry.
    fn lower_compare(&mut self, op: BinOp, signed: bool, w: Width) {
        self.push(Instr::Cmp { lhs: SCRATCH_REG, rhs: Reg::Rax, width: w });
        let cond = match (op, signed) {
            (BinOp::Eq, _) => Cond::Eq,
            (BinOp::Ne, _) => Cond::Ne,
            (BinOp::Lt, true) => Cond::Lt,
            (BinOp::Lt, false) => Cond::Below,
            (BinOp::Le, true) => Cond::Le,
            (BinOp::Le, false) => Cond::BelowEq,
            (BinOp::Gt, true) => Cond::Gt,
            (BinOp::Gt, false) => Cond::Above,
            (BinOp::Ge, true) => Cond::Ge,
            (BinOp::Ge, false) => Cond::AboveEq,
            _ => unreachable!("lower_compare called with a non-comparison operator"),
        };
        self.push(Instr::Setcc { cond, dst: Reg::Rax });
        self.push(Instr::Movzx32 { dst: Reg::Rax, src: Reg::Rax, width: Width::B1 });
    }

    fn lower_call(&mut self, callee: Symbol, args: &[hir::Expr]) {
        for a in args {
            self.lower_expr(a);
            self.push(Instr::Push(Reg::Rax));
        }
        for i in (0..args.len()).rev() {
            self.push(Instr::Pop(Reg::ARG_REGS[i]));
        }
        self.push(Instr::Call(callee));
    }

    fn lower_builtin_expr(&mut self, kind: BuiltinKind) {
        match kind {
            BuiltinKind::ReadFailed => self.emit_load_read_failed_flag(),
            BuiltinKind::Read => self.lower_read(ReadOp::Read, false),
            BuiltinKind::ReadLn => self.lower_read(ReadOp::ReadLn, false),
            BuiltinKind::ReadChar => self.lower_read(ReadOp::ReadChar, false),
        }
    }

    fn lower_read_to(&mut self, offset: i32, ty: Type, kind: &ReadToKind) {
        let want_str = ty == Type::Str;
        match kind {
            ReadToKind::Read => self.lower_read(ReadOp::Read, want_str),
            ReadToKind::ReadLn => self.lower_read(ReadOp::ReadLn, want_str),
            ReadToKind::Char => self.lower_read(ReadOp::ReadChar, false),
        }
        self.push(Instr::StoreLocal { disp: offset, width: Width::from_bytes(ty.size()), src: Reg::Rax });
    }

    fn emit_load_read_failed_flag(&mut self) {
        self.push(Instr::MovAbsLabel { dst: Reg::Rax, label: Symbol::intern(Module::READ_FAILED_SYMBOL) });
        self.push(Instr::LoadIndirect { dst: Reg::Rax, base: Reg::Rax, index: None, width: Width::B1, signed: false });
    }

    // -- read/readln/readchar ------------------------------------------

    /// `mmap` a one-shot 4096-byte anonymous buffer, then `read` into it.
    /// Leaves the buffer base in `r10` and the byte count `read()` returned
    /// in `r11`.
    fn emit_mmap_and_read(&mut self, read_len: i32) {
        use Reg::*;
        self.push(Instr::Xor { dst: Rdi, src: Rdi, width: Width::B8 }); // addr = NULL
        self.push(Instr::MovImm32 { dst: Rsi, imm: 4096 }); // length
        self.push(Instr::MovImm32 { dst: Rdx, imm: 0x3 }); // PROT_READ|PROT_WRITE
        self.push(Instr::MovImm32 { dst: R10, imm: 0x22 }); // MAP_PRIVATE|MAP_ANONYMOUS
        self.push(Instr::MovAbsImm { dst: R8, imm: -1 }); // fd
        self.push(Instr::Xor { dst: R9, src: R9, width: Width::B8 }); // offset
        self.push(Instr::MovImm32 { dst: Rax, imm: 9 }); // SYS_mmap
        self.push(Instr::Syscall);
        self.push(Instr::MovReg { dst: R10, src: Rax, width: Width::B8 }); // buffer base

        self.push(Instr::Xor { dst: Rdi, src: Rdi, width: Width::B8 }); // fd = stdin
        self.push(Instr::MovReg { dst: Rsi, src: R10, width: Width::B8 });
        self.push(Instr::MovImm32 { dst: Rdx, imm: read_len });
        self.push(Instr::MovImm32 { dst: Rax, imm: 0 }); // SYS_read
        self.push(Instr::Syscall);
        self.push(Instr::MovReg { dst: R11, src: Rax, width: Width::B8 }); // bytes read
    }

    fn lower_read(&mut self, op: ReadOp, want_str: bool) {
        let read_len = if op == ReadOp::ReadChar { 1 } else { 4096 };
        self.emit_mmap_and_read(read_len);
        match op {
            ReadOp::ReadChar => {
                self.push(Instr::LoadIndirect {
                    dst: Reg::Rax,
                    base: Reg::R10,
                    index: None,
                    width: Width::B1,
                    signed: false,
                });
            }
            ReadOp::Read | ReadOp::ReadLn => {
                if op == ReadOp::ReadLn {
                    self.emit_truncate_at_newline();
                }
                if want_str {
                    self.emit_null_terminate_and_return_ptr();
                } else {
                    self.emit_parse_decimal();
                }
            }
        }
    }

    /// Shrinks `r11` (the valid byte count) to the offset of the first
    /// `\n` within `[r10, r10+r11)`, leaving it unchanged if none is found.
    fn emit_truncate_at_newline(&mut self) {
        use Reg::*;
        let scan = self.fresh_label();
        let found = self.fresh_label();
        let done = self.fresh_label();

        self.push(Instr::Xor { dst: R9, src: R9, width: Width::B8 });
        self.push(Instr::Label(scan));
        self.push(Instr::Cmp { lhs: R9, rhs: R11, width: Width::B8 });
        self.push(Instr::Jcc { cond: Cond::Ge, target: done });
        self.push(Instr::LoadIndirect { dst: Rdi, base: R10, index: Some(R9), width: Width::B1, signed: false });
        self.push(Instr::MovImm32 { dst: Rdx, imm: b'\n' as i32 });
        self.push(Instr::Cmp { lhs: Rdi, rhs: Rdx, width: Width::B4 });
        self.push(Instr::Jcc { cond: Cond::Eq, target: found });
        self.push(Instr::MovImm32 { dst: R8, imm: 1 });
        self.push(Instr::Add { dst: R9, src: R8, width: Width::B8 });
        self.push(Instr::Jmp(scan));
        self.push(Instr::Label(found));
        self.push(Instr::MovReg { dst: R11, src: R9, width: Width::B8 });
        self.push(Instr::Label(done));
    }

    /// Overwrites the byte at `r10[r11]` with a null terminator and returns
    /// the buffer pointer in `rax`. Safe because the mmap'd page is always
    /// 4096 bytes regardless of how much `read` actually filled.
    fn emit_null_terminate_and_return_ptr(&mut self) {
        use Reg::*;
        self.push(Instr::MovReg { dst: R9, src: R10, width: Width::B8 });
        self.push(Instr::Add { dst: R9, src: R11, width: Width::B8 });
        self.push(Instr::Xor { dst: Rdx, src: Rdx, width: Width::B8 });
        self.push(Instr::StoreIndirect { base: R9, index: None, width: Width::B1, src: Rdx });
        self.push(Instr::MovReg { dst: Rax, src: R10, width: Width::B8 });
    }

    /// Parses `[r10, r10+r11)` as a (possibly `-`-prefixed) decimal integer
    /// into `rax`, setting `_read_failed` to reflect whether at least one
    /// digit was consumed.
    fn emit_parse_decimal(&mut self) {
        use Reg::*;
        let fail = self.fresh_label();
        let not_neg = self.fresh_label();
        let loop_start = self.fresh_label();
        let loop_end = self.fresh_label();
        let succeed = self.fresh_label();
        let end = self.fresh_label();

        // r9 = index, rsi = negative flag, rdi = digits-seen flag, rax = accumulator.
        self.push(Instr::Xor { dst: R9, src: R9, width: Width::B8 });
        self.push(Instr::Xor { dst: Rsi, src: Rsi, width: Width::B8 });
        self.push(Instr::Xor { dst: Rdi, src: Rdi, width: Width::B8 });
        self.push(Instr::Xor { dst: Rax, src: Rax, width: Width::B8 });

        self.push(Instr::Test { lhs: R11, rhs: R11, width: Width::B8 });
        self.push(Instr::Jcc { cond: Cond::Le, target: fail });

        self.push(Instr::LoadIndirect { dst: Rcx, base: R10, index: Some(R9), width: Width::B1, signed: false });
        self.push(Instr::MovImm32 { dst: Rdx, imm: b'-' as i32 });
        self.push(Instr::Cmp { lhs: Rcx, rhs: Rdx, width: Width::B4 });
        self.push(Instr::Jcc { cond: Cond::Ne, target: not_neg });
        self.push(Instr::MovImm32 { dst: Rsi, imm: 1 });
        self.push(Instr::MovImm32 { dst: R8, imm: 1 });
        self.push(Instr::Add { dst: R9, src: R8, width: Width::B8 });
        self.push(Instr::Label(not_neg));

        self.push(Instr::Label(loop_start));
        self.push(Instr::Cmp { lhs: R9, rhs: R11, width: Width::B8 });
        self.push(Instr::Jcc { cond: Cond::Ge, target: loop_end });
        self.push(Instr::LoadIndirect { dst: Rcx, base: R10, index: Some(R9), width: Width::B1, signed: false });
        self.push(Instr::MovImm32 { dst: Rdx, imm: b'0' as i32 });
        self.push(Instr::Cmp { lhs: Rcx, rhs: Rdx, width: Width::B4 });
        self.push(Instr::Jcc { cond: Cond::Lt, target: loop_end });
        self.push(Instr::MovImm32 { dst: Rdx, imm: b'9' as i32 });
        self.push(Instr::Cmp { lhs: Rcx, rhs: Rdx, width: Width::B4 });
        self.push(Instr::Jcc { cond: Cond::Gt, target: loop_end });

        self.push(Instr::MovImm32 { dst: Rdx, imm: b'0' as i32 });
        self.push(Instr::Sub { dst: Rcx, src: Rdx, width: Width::B8 }); // digit value
        self.push(Instr::MovImm32 { dst: Rdx, imm: 10 });
        self.push(Instr::Imul { dst: Rax, src: Rdx, width: Width::B8 });
        self.push(Instr::Add { dst: Rax, src: Rcx, width: Width::B8 });
        self.push(Instr::MovImm32 { dst: R8, imm: 1 });
        self.push(Instr::Add { dst: R9, src: R8, width: Width::B8 });
        self.push(Instr::MovImm32 { dst: Rdi, imm: 1 });
        self.push(Instr::Jmp(loop_start));
        self.push(Instr::Label(loop_end));

        self.push(Instr::Test { lhs: Rdi, rhs: Rdi, width: Width::B8 });
        self.push(Instr::Jcc { cond: Cond::Eq, target: fail });

        self.push(Instr::Test { lhs: Rsi, rhs: Rsi, width: Width::B8 });
        self.push(Instr::Jcc { cond: Cond::Eq, target: succeed });
        self.push(Instr::Neg { dst: Rax, width: Width::B8 });
        self.push(Instr::Jmp(succeed));

        self.push(Instr::Label(fail));
        self.push(Instr::Xor { dst: Rax, src: Rax, width: Width::B8 });
        self.emit_set_read_failed(1);
        self.push(Instr::Jmp(end));

        self.push(Instr::Label(succeed));
        self.emit_set_read_failed(0);

        self.push(Instr::Label(end));
    }

    fn emit_set_read_failed(&mut self, flag: i32) {
        use Reg::*;
        self.push(Instr::MovAbsLabel { dst: R9, label: Symbol::intern(Module::READ_FAILED_SYMBOL) });
        self.push(Instr::MovImm32 { dst: R8, imm: flag });
        self.push(Instr::StoreIndirect { base: R9, index: None, width: Width::B1, src: R8 });
    }

    // -- write/writeln --------------------------------------------------

    fn lower_write(&mut self, value: &hir::Expr, newline: bool) {
        self.lower_expr(value);
        match value.ty() {
            Type::Str => self.lower_write_str(value, newline),
            ty => self.lower_write_int(ty, newline),
        }
    }

    fn lower_write_str(&mut self, value: &hir::Expr, newline: bool) {
        use Reg::*;
        self.push(Instr::MovReg { dst: Rsi, src: Rax, width: Width::B8 });
        if let hir::Expr::StrLit { bytes, .. } = value {
            self.push(Instr::MovImm32 { dst: Rdx, imm: bytes.as_str().len() as i32 });
        } else {
            self.emit_strlen();
        }
        self.push(Instr::MovImm32 { dst: Rdi, imm: 1 });
        self.push(Instr::MovImm32 { dst: Rax, imm: 1 });
        self.push(Instr::Syscall);
        if newline {
            self.emit_write_newline_byte();
        }
    }

    /// Computes the length of the null-terminated string at `rsi` into
    /// `rdx`. Never used on string literals (their length is known at
    /// compile time) - only on `str` locals, which are always
    /// null-terminated by construction (§3).
    fn emit_strlen(&mut self) {
        use Reg::*;
        let scan = self.fresh_label();
        let done = self.fresh_label();
        self.push(Instr::Xor { dst: R9, src: R9, width: Width::B8 });
        self.push(Instr::Label(scan));
        self.push(Instr::LoadIndirect { dst: R8, base: Rsi, index: Some(R9), width: Width::B1, signed: false });
        self.push(Instr::Test { lhs: R8, rhs: R8, width: Width::B1 });
        self.push(Instr::Jcc { cond: Cond::Eq, target: done });
        self.push(Instr::MovImm32 { dst: R8, imm: 1 });
        self.push(Instr::Add { dst: R9, src: R8, width: Width::B8 });
        self.push(Instr::Jmp(scan));
        self.push(Instr::Label(done));
        self.push(Instr::MovReg { dst: Rdx, src: R9, width: Width::B8 });
    }

    /// Writes a lone `\n` from the scratch buffer rather than appending it
    /// to the string just written - the string may point into `.rodata`,
    /// which this binary never maps writable.
    fn emit_write_newline_byte(&mut self) {
        use Reg::*;
        self.push(Instr::LeaLocal { dst: R10, disp: self.scratch_base });
        self.push(Instr::MovImm32 { dst: R8, imm: b'\n' as i32 });
        self.push(Instr::StoreIndirect { base: R10, index: None, width: Width::B1, src: R8 });
        self.push(Instr::MovReg { dst: Rsi, src: R10, width: Width::B8 });
        self.push(Instr::MovImm32 { dst: Rdx, imm: 1 });
        self.push(Instr::MovImm32 { dst: Rdi, imm: 1 });
        self.push(Instr::MovImm32 { dst: Rax, imm: 1 });
        self.push(Instr::Syscall);
    }

    fn widen_to_64(&mut self, ty: Type) {
        let w = Width::from_bytes(ty.size().max(1));
        match w {
            Width::B8 => {}
            Width::B4 => {
                if ty.is_signed() {
                    self.push(Instr::Movsxd64 { dst: Reg::Rax, src: Reg::Rax });
                }
                // Unsigned: any 32-bit write already zeroed the upper half.
            }
            Width::B1 | Width::B2 => {
                if ty.is_signed() {
                    self.push(Instr::Movsx32 { dst: Reg::Rax, src: Reg::Rax, width: w });
                    self.push(Instr::Movsxd64 { dst: Reg::Rax, src: Reg::Rax });
                } else {
                    self.push(Instr::Movzx32 { dst: Reg::Rax, src: Reg::Rax, width: w });
                }
            }
        }
    }

    /// Renders the integer in `rax` into the scratch buffer, building it
    /// from the last byte backward (division peels off the least
    /// significant digit first), then issues one `write` syscall.
    fn lower_write_int(&mut self, ty: Type, newline: bool) {
        use Reg::*;
        self.widen_to_64(ty);
        let signed = ty.is_signed();

        self.push(Instr::LeaLocal { dst: R10, disp: self.scratch_base });
        self.push(Instr::MovImm32 { dst: R9, imm: SCRATCH_SIZE - 1 });
        self.push(Instr::Xor { dst: Rsi, src: Rsi, width: Width::B8 }); // negative flag

        if signed {
            let is_pos = self.fresh_label();
            self.push(Instr::Test { lhs: Rax, rhs: Rax, width: Width::B8 });
            self.push(Instr::Jcc { cond: Cond::Ge, target: is_pos });
            self.push(Instr::Neg { dst: Rax, width: Width::B8 });
            self.push(Instr::MovImm32 { dst: Rsi, imm: 1 });
            self.push(Instr::Label(is_pos));
        }

        let nonzero = self.fresh_label();
        let digits_done = self.fresh_label();
        self.push(Instr::Test { lhs: Rax, rhs: Rax, width: Width::B8 });
        self.push(Instr::Jcc { cond: Cond::Ne, target: nonzero });
        self.push(Instr::MovImm32 { dst: Rcx, imm: b'0' as i32 });
        self.push(Instr::StoreIndirect { base: R10, index: Some(R9), width: Width::B1, src: Rcx });
        self.push(Instr::MovImm32 { dst: R8, imm: 1 });
        self.push(Instr::Sub { dst: R9, src: R8, width: Width::B8 });
        self.push(Instr::Jmp(digits_done));

        self.push(Instr::Label(nonzero));
        let digit_loop = self.fresh_label();
        let digit_loop_end = self.fresh_label();
        self.push(Instr::Label(digit_loop));
        self.push(Instr::Test { lhs: Rax, rhs: Rax, width: Width::B8 });
        self.push(Instr::Jcc { cond: Cond::Eq, target: digit_loop_end });
        self.push(Instr::MovImm32 { dst: Rcx, imm: 10 }); // divisor - never rdx, which cdq/cqo clobbers
        if signed {
            self.push(Instr::Cqo);
            self.push(Instr::Idiv { src: Rcx, width: Width::B8 });
        } else {
            self.push(Instr::ZeroHigh { width: Width::B8 });
            self.push(Instr::Div { src: Rcx, width: Width::B8 });
        }
        self.push(Instr::MovImm32 { dst: Rcx, imm: b'0' as i32 });
        self.push(Instr::Add { dst: Rdx, src: Rcx, width: Width::B8 });
        self.push(Instr::StoreIndirect { base: R10, index: Some(R9), width: Width::B1, src: Rdx });
        self.push(Instr::MovImm32 { dst: R8, imm: 1 });
        self.push(Instr::Sub { dst: R9, src: R8, width: Width::B8 });
        self.push(Instr::Jmp(digit_loop));
        self.push(Instr::Label(digit_loop_end));
        self.push(Instr::Label(digits_done));

        if signed {
            let no_sign = self.fresh_label();
            self.push(Instr::Test { lhs: Rsi, rhs: Rsi, width: Width::B8 });
            self.push(Instr::Jcc { cond: Cond::Eq, target: no_sign });
            self.push(Instr::MovImm32 { dst: Rcx, imm: b'-' as i32 });
            self.push(Instr::StoreIndirect { base: R10, index: Some(R9), width: Width::B1, src: Rcx });
            self.push(Instr::MovImm32 { dst: R8, imm: 1 });
            self.push(Instr::Sub { dst: R9, src: R8, width: Width::B8 });
            self.push(Instr::Label(no_sign));
        }

        // r9 sits one before the first written byte; advance to it, then
        // compute the pointer and length the write syscall needs.
        self.push(Instr::MovImm32 { dst: R8, imm: 1 });
        self.push(Instr::Add { dst: R9, src: R8, width: Width::B8 });
        self.push(Instr::MovImm32 { dst: Rdx, imm: SCRATCH_SIZE });
        self.push(Instr::Sub { dst: Rdx, src: R9, width: Width::B8 });
        self.push(Instr::Add { dst: R10, src: R9, width: Width::B8 });
        self.push(Instr::MovReg { dst: Rsi, src: R10, width: Width::B8 });
        self.push(Instr::MovImm32 { dst: Rdi, imm: 1 });
        self.push(Instr::MovImm32 { dst: Rax, imm: 1 });
        self.push(Instr::Syscall);

        if newline {
            self.emit_write_newline_byte();
        }
    }
}
