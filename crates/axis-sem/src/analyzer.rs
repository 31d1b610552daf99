//! The semantic analyzer: one AST walk producing the annotated [`hir`] tree.
//!
//! Binds parameters and locals to frame offsets, type-checks every
//! expression bottom-up, and interns string literals into a per-module
//! table. See the module-level type-checking rules in [`crate::types`] and
//! the frame-layout rules in [`crate::frame`].

use axis_par::ast::{self, BinOp, BuiltinKind, ReadToKind, UnOp};
use axis_util::{Diagnostic, DiagnosticKind, FileId, Handler, Location, Span, Symbol};

use crate::frame::FrameBuilder;
use crate::hir;
use crate::scope::{FuncSig, FuncTable, ScopeStack, VarEntry};
use crate::types::Type;

pub struct Analyzer<'a> {
    handler: &'a mut Handler,
    file: FileId,
    file_name: String,
    funcs: FuncTable,
    strings: Vec<hir::StringEntry>,
    next_string_id: u32,
}

/// Tracks which labels `break`/`continue` should target; codegen assigns
/// the actual label names, the analyzer only needs to know a loop is live.
struct LoopCtx {
    depth: u32,
}

impl<'a> Analyzer<'a> {
    pub fn new(file: FileId, file_name: impl Into<String>, handler: &'a mut Handler) -> Self {
        Analyzer {
            handler,
            file,
            file_name: file_name.into(),
            funcs: FuncTable::new(),
            strings: Vec::new(),
            next_string_id: 0,
        }
    }

    pub fn analyze(mut self, program: &ast::Program) -> hir::Program {
        for func in &program.funcs {
            let sig = FuncSig {
                params: func.params.iter().map(|p| Type::from(p.ty)).collect(),
                ret: Type::from(func.ret_type),
            };
            if !self.funcs.declare(func.name, sig) {
                self.error(DiagnosticKind::NameError, func.span, format!("function `{}` redeclared", func.name.as_str()));
            }
        }

        let mut funcs = Vec::new();
        for func in &program.funcs {
            funcs.push(self.analyze_func(func));
        }

        hir::Program { funcs, strings: self.strings }
    }

    fn error(&mut self, kind: DiagnosticKind, span: Span, message: impl Into<String>) {
        self.handler.emit(Diagnostic::error(kind, Location::from_span(self.file_name.clone(), span), message));
    }

    fn intern_string(&mut self, bytes: Symbol) -> Symbol {
        if let Some(existing) = self.strings.iter().find(|e| e.bytes == bytes) {
            return existing.label;
        }
        let label = Symbol::intern(&format!(".L.str.{}", self.next_string_id));
        self.next_string_id += 1;
        self.strings.push(hir::StringEntry { label, bytes });
        label
    }

    fn analyze_func(&mut self, func: &ast::FuncDecl) -> hir::Func {
        let mut scope = ScopeStack::new();
        let mut frame = FrameBuilder::new();
        let ret = Type::from(func.ret_type);

        let mut params = Vec::with_capacity(func.params.len());
        for p in &func.params {
            let ty = Type::from(p.ty);
            let offset = frame.allocate(ty.size().max(1));
            if !scope.declare(p.name, VarEntry { ty, offset }) {
                self.error(DiagnosticKind::NameError, p.span, format!("parameter `{}` redeclared", p.name.as_str()));
            }
            params.push(hir::ParamLayout { name: p.name, ty, offset });
        }

        let body = self.analyze_block(&func.body, &mut scope, &mut frame, ret, &mut LoopCtx { depth: 0 });
        let frame_size = frame.finish();

        hir::Func { name: func.name, params, ret, frame_size, body }
    }

    fn analyze_block(
        &mut self,
        block: &ast::Block,
        scope: &mut ScopeStack,
        frame: &mut FrameBuilder,
        ret_ty: Type,
        loop_ctx: &mut LoopCtx,
    ) -> hir::Block {
        scope.push();
        let mut stmts = Vec::with_capacity(block.stmts.len());
        for stmt in &block.stmts {
            if let Some(s) = self.analyze_stmt(stmt, scope, frame, ret_ty, loop_ctx) {
                stmts.push(s);
            }
        }
        scope.pop();
        hir::Block { stmts }
    }

    fn analyze_stmt(
        &mut self,
        stmt: &ast::Stmt,
        scope: &mut ScopeStack,
        frame: &mut FrameBuilder,
        ret_ty: Type,
        loop_ctx: &mut LoopCtx,
    ) -> Option<hir::Stmt> {
        match stmt {
            ast::Stmt::VarDecl { name, ty, init, span } => {
                let declared = Type::from(*ty);
                let init_hir = self.analyze_expr_expecting(init, scope, Some(declared))?;
                self.expect_type(declared, init_hir.ty(), *span, "variable initializer");
                let offset = frame.allocate(declared.size().max(1));
                if !scope.declare(*name, VarEntry { ty: declared, offset }) {
                    self.error(DiagnosticKind::NameError, *span, format!("`{}` already declared in this scope", name.as_str()));
                }
                Some(hir::Stmt::VarDecl { name: *name, offset, ty: declared, init: init_hir })
            }
            ast::Stmt::Assign { name, value, span } => {
                let entry = self.resolve_or_error(*name, *span, scope)?;
                let value_hir = self.analyze_expr_expecting(value, scope, Some(entry.ty))?;
                self.expect_type(entry.ty, value_hir.ty(), *span, "assignment");
                Some(hir::Stmt::Assign { name: *name, offset: entry.offset, ty: entry.ty, value: value_hir })
            }
            ast::Stmt::If { cond, then_block, else_block, span } => {
                let cond_hir = self.analyze_expr(cond, scope)?;
                self.expect_type(Type::Bool, cond_hir.ty(), *span, "`when` condition");
                let then_hir = self.analyze_block(then_block, scope, frame, ret_ty, loop_ctx);
                let else_hir = else_block.as_ref().map(|b| self.analyze_block(b, scope, frame, ret_ty, loop_ctx));
                Some(hir::Stmt::If { cond: cond_hir, then_block: then_hir, else_block: else_hir })
            }
            ast::Stmt::While { cond, body, span } => {
                let cond_hir = self.analyze_expr(cond, scope)?;
                self.expect_type(Type::Bool, cond_hir.ty(), *span, "`while` condition");
                loop_ctx.depth += 1;
                let body_hir = self.analyze_block(body, scope, frame, ret_ty, loop_ctx);
                loop_ctx.depth -= 1;
                Some(hir::Stmt::While { cond: cond_hir, body: body_hir })
            }
            ast::Stmt::Loop { body, .. } => {
                loop_ctx.depth += 1;
                let body_hir = self.analyze_block(body, scope, frame, ret_ty, loop_ctx);
                loop_ctx.depth -= 1;
                Some(hir::Stmt::Loop { body: body_hir })
            }
            ast::Stmt::Break { span } => {
                if loop_ctx.depth == 0 {
                    self.error(DiagnosticKind::ParseError, *span, "`break` outside of a loop");
                }
                Some(hir::Stmt::Break)
            }
            ast::Stmt::Continue { span } => {
                if loop_ctx.depth == 0 {
                    self.error(DiagnosticKind::ParseError, *span, "`continue` outside of a loop");
                }
                Some(hir::Stmt::Continue)
            }
            ast::Stmt::Return { value, span } => match (value, ret_ty) {
                (None, Type::Void) => Some(hir::Stmt::Return { value: None }),
                (None, expected) => {
                    self.error(DiagnosticKind::TypeError, *span, format!("expected `{expected}` return value, found bare `give`"));
                    Some(hir::Stmt::Return { value: None })
                }
                (Some(_), Type::Void) => {
                    self.error(DiagnosticKind::TypeError, *span, "function returns `void`; `give` must be bare");
                    None
                }
                (Some(e), expected) => {
                    let e_hir = self.analyze_expr_expecting(e, scope, Some(expected))?;
                    self.expect_type(expected, e_hir.ty(), *span, "`give`");
                    Some(hir::Stmt::Return { value: Some(e_hir) })
                }
            },
            ast::Stmt::ExprStmt { call, .. } => {
                let call_hir = self.analyze_expr(call, scope)?;
                Some(hir::Stmt::ExprStmt { call: call_hir })
            }
            ast::Stmt::Write { value, newline, .. } => {
                let value_hir = self.analyze_expr(value, scope)?;
                Some(hir::Stmt::Write { value: value_hir, newline: *newline })
            }
            ast::Stmt::ReadTo { target, kind, span } => {
                let entry = self.resolve_or_error(*target, *span, scope)?;
                if matches!(kind, ReadToKind::Read | ReadToKind::ReadLn) && !entry.ty.is_integer() && entry.ty != Type::Str {
                    self.error(
                        DiagnosticKind::TypeError,
                        *span,
                        format!("cannot read into a `{}`", entry.ty),
                    );
                }
                Some(hir::Stmt::ReadTo { name: *target, offset: entry.offset, ty: entry.ty, kind: kind.clone() })
            }
        }
    }

    fn resolve_or_error(&mut self, name: Symbol, span: Span, scope: &ScopeStack) -> Option<VarEntry> {
        match scope.resolve(name) {
            Some(e) => Some(e),
            None => {
                self.error(DiagnosticKind::NameError, span, format!("undefined identifier `{}`", name.as_str()));
                None
            }
        }
    }

    fn expect_type(&mut self, expected: Type, actual: Type, span: Span, context: &str) {
        if expected != actual {
            self.error(
                DiagnosticKind::TypeError,
                span,
                format!("{context}: expected `{expected}`, found `{actual}`"),
            );
        }
    }

    /// Convenience entry point for call sites that have no contextual type
    /// to propagate into a bare integer literal (e.g. `write`'s argument).
    fn analyze_expr(&mut self, expr: &ast::Expr, scope: &ScopeStack) -> Option<hir::Expr> {
        self.analyze_expr_expecting(expr, scope, None)
    }

    /// Like [`Self::analyze_expr`], but `expected` - when the surrounding
    /// context pins down a concrete type (a `VarDecl`'s declared type, an
    /// `Assign`'s target, a `give`'s return type, a call argument's
    /// parameter type) - lets a bare [`ast::Expr::IntLit`] take that type
    /// directly instead of falling back to the untyped default. This is
    /// what makes `x: u8 = 5` type-check: without a hint, `5` would default
    /// to `i32` and never match `u8`.
    fn analyze_expr_expecting(&mut self, expr: &ast::Expr, scope: &ScopeStack, expected: Option<Type>) -> Option<hir::Expr> {
        match expr {
            ast::Expr::IntLit { value, span } => {
                let ty = match expected {
                    Some(exp) if exp.is_integer() => exp,
                    _ => infer_int_literal_type(*value),
                };
                if let Some((lo, hi)) = ty.int_range() {
                    let v = *value as i128;
                    if v < lo || v > hi {
                        self.error(DiagnosticKind::RangeError, *span, format!("integer literal `{value}` out of range for `{ty}`"));
                    }
                }
                Some(hir::Expr::IntLit { value: *value, ty })
            }
            ast::Expr::BoolLit { value, .. } => Some(hir::Expr::BoolLit { value: *value }),
            ast::Expr::StrLit { value, .. } => {
                let label = self.intern_string(*value);
                Some(hir::Expr::StrLit { label, bytes: *value })
            }
            ast::Expr::Ident { name, span } => {
                let entry = self.resolve_or_error(*name, *span, scope)?;
                Some(hir::Expr::Ident { name: *name, offset: entry.offset, ty: entry.ty })
            }
            ast::Expr::Unary { op, operand, span } => {
                let operand_hir = match op {
                    // `!`'s operand must be `bool` regardless of the
                    // surrounding expected type, which describes the
                    // result, not the operand.
                    UnOp::Not => self.analyze_expr_expecting(operand, scope, Some(Type::Bool))?,
                    // `-`'s result type is the operand's type, so any
                    // expected type propagates straight through.
                    UnOp::Neg => self.analyze_expr_expecting(operand, scope, expected)?,
                };
                let ty = operand_hir.ty();
                match op {
                    UnOp::Not => self.expect_type(Type::Bool, ty, *span, "`!`"),
                    UnOp::Neg => {
                        if !ty.is_signed() {
                            self.error(DiagnosticKind::TypeError, *span, format!("unary `-` requires a signed integer, found `{ty}`"));
                        }
                    }
                }
                Some(hir::Expr::Unary { op: *op, operand: Box::new(operand_hir), ty })
            }
            ast::Expr::Binary { op, lhs, rhs, span } => self.analyze_binary(*op, lhs, rhs, *span, scope, expected),
            ast::Expr::Call { callee, args, span } => {
                let sig = match self.funcs.get(*callee).cloned() {
                    Some(sig) => sig,
                    None => {
                        self.error(DiagnosticKind::NameError, *span, format!("undefined function `{}`", callee.as_str()));
                        return None;
                    }
                };
                if sig.params.len() != args.len() {
                    self.error(
                        DiagnosticKind::ArityError,
                        *span,
                        format!("`{}` expects {} argument(s), found {}", callee.as_str(), sig.params.len(), args.len()),
                    );
                }
                let mut arg_hirs = Vec::with_capacity(args.len());
                for (i, arg) in args.iter().enumerate() {
                    let expected_param = sig.params.get(i).copied();
                    let arg_hir = self.analyze_expr_expecting(arg, scope, expected_param)?;
                    if let Some(expected_param) = expected_param {
                        self.expect_type(expected_param, arg_hir.ty(), *span, "call argument");
                    }
                    arg_hirs.push(arg_hir);
                }
                Some(hir::Expr::Call { callee: *callee, args: arg_hirs, ty: sig.ret })
            }
            ast::Expr::BuiltinCall { kind, args, span } => {
                let mut arg_hirs = Vec::with_capacity(args.len());
                for arg in args {
                    arg_hirs.push(self.analyze_expr(arg, scope)?);
                }
                if !arg_hirs.is_empty() {
                    self.error(DiagnosticKind::ArityError, *span, "built-in I/O calls take no arguments");
                }
                let ty = match kind {
                    BuiltinKind::ReadFailed => Type::Bool,
                    BuiltinKind::Read | BuiltinKind::ReadLn | BuiltinKind::ReadChar => Type::I64,
                };
                Some(hir::Expr::BuiltinCall { kind: *kind, args: arg_hirs, ty })
            }
        }
    }

    /// Analyzes both operands, letting `expected` (the surrounding
    /// context's target type, if any) seed the left-hand side and then
    /// letting the left-hand side's resolved type seed the right-hand
    /// side - so `x: u8 = 1 + 2` and `when n == 200:` (`n: u8`) both
    /// resolve their literal operands to `u8` instead of the untyped
    /// default, without either operand needing to be a variable.
    fn analyze_binary(&mut self, op: BinOp, lhs: &ast::Expr, rhs: &ast::Expr, span: Span, scope: &ScopeStack, expected: Option<Type>) -> Option<hir::Expr> {
        let lhs_expected = match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => expected,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => None,
        };
        let lhs_hir = self.analyze_expr_expecting(lhs, scope, lhs_expected)?;
        // A shift count is never typed from the shifted value - `x << 2`
        // shifting an `i64` doesn't make `2` an `i64`. A bare literal count
        // still needs *some* hint though, or it defaults to signed `i32` and
        // trips the unsigned-shift-amount check below on the common case of
        // a literal count; `u32` gives it one without affecting a count
        // that's already a named variable (its own declared type wins).
        let rhs_expected = if matches!(op, BinOp::Shl | BinOp::Shr) { Some(Type::U32) } else { Some(lhs_hir.ty()) };
        let rhs_hir = self.analyze_expr_expecting(rhs, scope, rhs_expected)?;
        let (lty, rty) = (lhs_hir.ty(), rhs_hir.ty());

        let ty = match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                if !lty.is_integer() || !rty.is_integer() {
                    self.error(DiagnosticKind::TypeError, span, format!("arithmetic/bitwise operators require integer operands, found `{lty}` and `{rty}`"));
                } else if lty != rty {
                    self.error(
                        DiagnosticKind::TypeError,
                        span,
                        format!("arithmetic/bitwise operators require matching operand types; found `{lty}` and `{rty}` (mixed-sign operands are never coerced)"),
                    );
                }
                lty
            }
            BinOp::Shl | BinOp::Shr => {
                if !lty.is_integer() {
                    self.error(DiagnosticKind::TypeError, span, format!("shift requires an integer left-hand side, found `{lty}`"));
                }
                if !rty.is_integer() {
                    self.error(DiagnosticKind::TypeError, span, format!("shift amount must be an unsigned integer, found `{rty}`"));
                } else if rty.is_signed() {
                    self.error(DiagnosticKind::TypeError, span, format!("shift amount must be an unsigned integer, found `{rty}`"));
                }
                lty
            }
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                if lty != rty {
                    self.error(DiagnosticKind::TypeError, span, format!("comparison requires matching operand types; found `{lty}` and `{rty}`"));
                }
                Type::Bool
            }
        };
        Some(hir::Expr::Binary { op, lhs: Box::new(lhs_hir), rhs: Box::new(rhs_hir), ty })
    }
}

/// Literals with no surrounding context default to `i32`; a literal used
/// where a wider or unsigned type is expected is re-checked for range at
/// its use site by `expect_type`'s caller and by [`Type::int_range`] here.
fn infer_int_literal_type(value: u64) -> Type {
    if value <= i32::MAX as u64 {
        Type::I32
    } else {
        Type::I64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axis_lex::Lexer;
    use axis_par::Parser;

    fn analyze(src: &str) -> (hir::Program, bool) {
        let mut lex_handler = Handler::new();
        let tokens = Lexer::new(src, FileId(0), "t.ax", &mut lex_handler).tokenize();
        let mut parse_handler = Handler::new();
        let program = Parser::new(tokens, FileId(0), "t.ax", &mut parse_handler).parse_program();
        let mut handler = Handler::new();
        let hir = Analyzer::new(FileId(0), "t.ax", &mut handler).analyze(&program);
        (hir, handler.has_errors())
    }

    #[test]
    fn literal_var_decl_adopts_the_declared_type() {
        let (hir, errs) = analyze("func main() -> i32:\n    x: u8 = 200\n    give 0\n");
        assert!(!errs);
        match &hir.funcs[0].body.stmts[0] {
            hir::Stmt::VarDecl { init: hir::Expr::IntLit { ty, .. }, .. } => assert_eq!(*ty, Type::U8),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn literal_out_of_range_for_declared_type_is_a_range_error() {
        let (_, errs) = analyze("func main() -> i32:\n    x: u8 = 300\n    give 0\n");
        assert!(errs);
    }

    #[test]
    fn literal_operand_in_binary_expr_adopts_the_other_operands_type() {
        let (hir, errs) = analyze("func main() -> u8:\n    x: u8 = 1\n    give x + 2\n");
        assert!(!errs);
        match &hir.funcs[0].body.stmts[1] {
            hir::Stmt::Return { value: Some(hir::Expr::Binary { rhs, .. }), .. } => {
                assert_eq!(rhs.ty(), Type::U8);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn redeclaration_in_the_same_scope_is_a_name_error() {
        let (_, errs) = analyze("func main() -> i32:\n    x: i32 = 1\n    x: i32 = 2\n    give x\n");
        assert!(errs);
    }

    #[test]
    fn undefined_identifier_is_a_name_error() {
        let (_, errs) = analyze("func main() -> i32:\n    give y\n");
        assert!(errs);
    }

    #[test]
    fn mixed_sign_division_is_rejected_not_coerced() {
        let (_, errs) = analyze("func main() -> i32:\n    a: i32 = 1\n    b: u32 = 2\n    give a / b\n");
        assert!(errs);
    }

    #[test]
    fn call_argument_count_mismatch_is_an_arity_error() {
        let (_, errs) = analyze("func f(a: i32) -> i32:\n    give a\nfunc main() -> i32:\n    give f(1, 2)\n");
        assert!(errs);
    }

    #[test]
    fn signed_shift_amount_is_rejected() {
        let (_, errs) = analyze("func main() -> i32:\n    n: i32 = 1\n    s: i32 = 2\n    give n << s\n");
        assert!(errs);
    }

    #[test]
    fn unsigned_shift_amount_is_accepted() {
        let (_, errs) = analyze("func main() -> i32:\n    n: i32 = 1\n    s: u32 = 2\n    give n << s\n");
        assert!(!errs);
    }

    #[test]
    fn frame_size_is_always_a_multiple_of_sixteen() {
        let (hir, errs) = analyze("func main() -> i32:\n    a: i8 = 1\n    b: i64 = 2\n    give 0\n");
        assert!(!errs);
        assert_eq!(hir.funcs[0].frame_size % 16, 0);
    }
}
