//! Recursive-descent parser: token stream -> [`Program`].
//!
//! Expression precedence, low to high (§4.2 of the language contract):
//! comparison (non-associative) -> bitwise or -> xor -> and -> shift ->
//! additive -> multiplicative -> unary -> primary.

use axis_lex::{Keyword, Op, Punct, Token, TokenKind};
use axis_util::{Diagnostic, DiagnosticKind, FileId, Handler, Location, Span, Symbol};

use crate::ast::*;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    handler: &'a mut Handler,
    file: FileId,
    file_name: String,
}

type PResult<T> = Result<T, ()>;

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, file: FileId, file_name: impl Into<String>, handler: &'a mut Handler) -> Self {
        Parser { tokens, pos: 0, handler, file, file_name: file_name.into() }
    }

    pub fn parse_program(mut self) -> Program {
        let mode = self.parse_mode_directive();
        let mut funcs = Vec::new();
        while !self.at_eof() {
            match self.parse_func() {
                Ok(f) => funcs.push(f),
                Err(()) => self.recover_to_next_func(),
            }
        }
        Program { mode, funcs }
    }

    // ---- cursor helpers ---------------------------------------------------

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> PResult<Span> {
        if self.check(kind) {
            Ok(self.bump().span)
        } else {
            self.error_here(format!("expected {what}, found {:?}", self.peek()));
            Err(())
        }
    }

    fn error_here(&mut self, message: impl Into<String>) {
        let span = self.peek_span();
        self.handler.emit(Diagnostic::error(
            DiagnosticKind::ParseError,
            Location::from_span(self.file_name.clone(), span),
            message,
        ));
    }

    /// After a malformed function, skip to the next plausible `func`
    /// keyword at top level so one syntax error doesn't cascade into one
    /// diagnostic per remaining token.
    fn recover_to_next_func(&mut self) {
        loop {
            if self.at_eof() {
                return;
            }
            if matches!(self.peek(), TokenKind::Keyword(Keyword::Func)) {
                return;
            }
            self.bump();
        }
    }

    fn ident_text(&mut self, what: &str) -> PResult<Symbol> {
        if let TokenKind::Ident(sym) = *self.peek() {
            self.bump();
            Ok(sym)
        } else {
            self.error_here(format!("expected {what}, found {:?}", self.peek()));
            Err(())
        }
    }

    fn parse_type_name(&mut self) -> PResult<TypeName> {
        let sym = self.ident_text("a type name")?;
        TypeName::from_str(sym.as_str()).ok_or_else(|| {
            self.error_here(format!("unknown type `{}`", sym.as_str()));
        })
    }

    // ---- top level ----------------------------------------------------------

    fn parse_mode_directive(&mut self) -> Option<CompileMode> {
        if matches!(self.peek(), TokenKind::Keyword(Keyword::Mode)) {
            self.bump();
            let sym_span = self.peek_span();
            let sym = match self.ident_text("a mode name") {
                Ok(s) => s,
                Err(()) => return None,
            };
            let mode = match sym.as_str() {
                "compile" => CompileMode::Compile,
                // `script` is a real mode the grammar recognizes, but this
                // core only ever handles `compile` (§4.2: "script is an
                // out-of-scope collaborator") - it's rejected here rather
                // than threaded through as a `Program.mode` that nothing
                // downstream would ever check.
                "script" => {
                    self.handler.emit(Diagnostic::error(
                        DiagnosticKind::ParseError,
                        Location::from_span(self.file_name.clone(), sym_span),
                        "`mode script` is an out-of-scope collaborator; this compiler only builds `mode compile` sources",
                    ));
                    self.eat(&TokenKind::Newline);
                    return None;
                }
                other => {
                    self.error_here(format!("unknown mode `{other}`"));
                    return None;
                }
            };
            self.eat(&TokenKind::Newline);
            Some(mode)
        } else {
            None
        }
    }

    fn parse_func(&mut self) -> PResult<FuncDecl> {
        let start_span = self.expect(&TokenKind::Keyword(Keyword::Func), "`func`")?;
        let name = self.ident_text("a function name")?;
        self.expect(&TokenKind::Punct(Punct::LParen), "`(`")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::Punct(Punct::RParen)) {
            loop {
                let pname = self.ident_text("a parameter name")?;
                let pspan = self.peek_span();
                self.expect(&TokenKind::Punct(Punct::Colon), "`:`")?;
                let ty = self.parse_type_name()?;
                params.push(Param { name: pname, ty, span: pspan });
                if !self.eat(&TokenKind::Punct(Punct::Comma)) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::Punct(Punct::RParen), "`)`")?;
        self.expect(&TokenKind::Op(Op::Arrow), "`->`")?;
        let ret_type = self.parse_type_name()?;
        if params.len() > 6 {
            self.error_here("functions may take at most 6 parameters");
        }
        self.expect(&TokenKind::Punct(Punct::Colon), "`:`")?;
        self.expect(&TokenKind::Newline, "end of line")?;
        let body = self.parse_indented_block()?;
        Ok(FuncDecl { name, params, ret_type, body, span: start_span })
    }

    fn parse_indented_block(&mut self) -> PResult<Block> {
        self.expect(&TokenKind::Indent, "an indented block")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.at_eof() {
            match self.parse_stmt() {
                Ok(s) => stmts.push(s),
                Err(()) => self.recover_to_next_stmt(),
            }
        }
        self.expect(&TokenKind::Dedent, "dedent")?;
        Ok(Block { stmts })
    }

    fn recover_to_next_stmt(&mut self) {
        while !self.at_eof() && !self.check(&TokenKind::Newline) && !self.check(&TokenKind::Dedent) {
            self.bump();
        }
        self.eat(&TokenKind::Newline);
    }

    // ---- statements -----------------------------------------------------------

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let span = self.peek_span();
        match self.peek().clone() {
            TokenKind::Keyword(Keyword::When) => self.parse_if(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::Loop) | TokenKind::Keyword(Keyword::Repeat) => self.parse_loop(),
            TokenKind::Keyword(Keyword::Break) => {
                self.bump();
                self.expect(&TokenKind::Newline, "end of line")?;
                Ok(Stmt::Break { span })
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.bump();
                self.expect(&TokenKind::Newline, "end of line")?;
                Ok(Stmt::Continue { span })
            }
            TokenKind::Keyword(Keyword::Give) => self.parse_return(),
            TokenKind::Ident(sym) => self.parse_ident_led_stmt(sym, span),
            other => {
                self.error_here(format!("unexpected token {other:?} at start of statement"));
                Err(())
            }
        }
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let span = self.bump().span; // `when`
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::Punct(Punct::Colon), "`:`")?;
        self.expect(&TokenKind::Newline, "end of line")?;
        let then_block = self.parse_indented_block()?;
        let else_block = if matches!(self.peek(), TokenKind::Keyword(Keyword::Else)) {
            self.bump();
            self.expect(&TokenKind::Punct(Punct::Colon), "`:`")?;
            self.expect(&TokenKind::Newline, "end of line")?;
            Some(self.parse_indented_block()?)
        } else {
            None
        };
        Ok(Stmt::If { cond, then_block, else_block, span })
    }

    fn parse_while(&mut self) -> PResult<Stmt> {
        let span = self.bump().span;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::Punct(Punct::Colon), "`:`")?;
        self.expect(&TokenKind::Newline, "end of line")?;
        let body = self.parse_indented_block()?;
        Ok(Stmt::While { cond, body, span })
    }

    fn parse_loop(&mut self) -> PResult<Stmt> {
        let span = self.bump().span; // `loop` or `repeat`
        self.expect(&TokenKind::Punct(Punct::Colon), "`:`")?;
        self.expect(&TokenKind::Newline, "end of line")?;
        let body = self.parse_indented_block()?;
        Ok(Stmt::Loop { body, span })
    }

    fn parse_return(&mut self) -> PResult<Stmt> {
        let span = self.bump().span; // `give`
        let value = if self.check(&TokenKind::Newline) { None } else { Some(self.parse_expr()?) };
        self.expect(&TokenKind::Newline, "end of line")?;
        Ok(Stmt::Return { value, span })
    }

    /// Dispatches on an identifier-led statement: `NAME : TYPE = expr`
    /// (declaration), `NAME = expr` (assignment, possibly sugared into
    /// [`Stmt::ReadTo`] when the RHS is a bare `read`/`readln`/`readchar`
    /// call), or a bare call (`write(...)`, `writeln(...)`, any other call).
    fn parse_ident_led_stmt(&mut self, name: Symbol, span: Span) -> PResult<Stmt> {
        self.bump(); // the identifier
        match self.peek().clone() {
            TokenKind::Punct(Punct::Colon) => {
                self.bump();
                let ty = self.parse_type_name()?;
                self.expect(&TokenKind::Op(Op::Eq), "`=`")?;
                let init = self.parse_expr()?;
                self.expect(&TokenKind::Newline, "end of line")?;
                Ok(Stmt::VarDecl { name, ty, init, span })
            }
            TokenKind::Op(Op::Eq) => {
                self.bump();
                if let Some(kind) = self.try_read_builtin_kind() {
                    self.expect(&TokenKind::Punct(Punct::LParen), "`(`")?;
                    self.expect(&TokenKind::Punct(Punct::RParen), "`)`")?;
                    self.expect(&TokenKind::Newline, "end of line")?;
                    return Ok(Stmt::ReadTo { target: name, kind, span });
                }
                let value = self.parse_expr()?;
                self.expect(&TokenKind::Newline, "end of line")?;
                Ok(Stmt::Assign { name, value, span })
            }
            TokenKind::Punct(Punct::LParen) => {
                let call = self.parse_call_tail(name, span)?;
                if let Some((value, newline)) = self.as_write_call(&call, name) {
                    self.expect(&TokenKind::Newline, "end of line")?;
                    return Ok(Stmt::Write { value, newline, span });
                }
                self.expect(&TokenKind::Newline, "end of line")?;
                Ok(Stmt::ExprStmt { call, span })
            }
            other => {
                self.error_here(format!("expected `:`, `=`, or `(` after identifier, found {other:?}"));
                Err(())
            }
        }
    }

    fn try_read_builtin_kind(&mut self) -> Option<ReadToKind> {
        if let TokenKind::Ident(sym) = self.peek() {
            let next_is_call = matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Punct(Punct::LParen)));
            if next_is_call {
                return match sym.as_str() {
                    "read" => {
                        self.bump();
                        Some(ReadToKind::Read)
                    }
                    "readln" => {
                        self.bump();
                        Some(ReadToKind::ReadLn)
                    }
                    "readchar" => {
                        self.bump();
                        Some(ReadToKind::Char)
                    }
                    _ => None,
                };
            }
        }
        None
    }

    fn as_write_call(&self, call: &Expr, callee: Symbol) -> Option<(Expr, bool)> {
        match callee.as_str() {
            "write" => match call {
                Expr::Call { args, .. } if args.len() == 1 => Some((args[0].clone(), false)),
                _ => None,
            },
            "writeln" => match call {
                Expr::Call { args, .. } if args.len() == 1 => Some((args[0].clone(), true)),
                _ => None,
            },
            _ => None,
        }
    }

    // ---- expressions ------------------------------------------------------------

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let lhs = self.parse_bitor()?;
        if let Some(op) = comparison_op(self.peek()) {
            let span = self.peek_span();
            self.bump();
            let rhs = self.parse_bitor()?;
            if comparison_op(self.peek()).is_some() {
                self.error_here("comparison operators do not chain; parenthesize if this is intentional");
                return Err(());
            }
            return Ok(Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span });
        }
        Ok(lhs)
    }

    fn parse_bitor(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_bitxor()?;
        while self.check(&TokenKind::Op(Op::Pipe)) {
            let span = self.peek_span();
            self.bump();
            let rhs = self.parse_bitxor()?;
            lhs = Expr::Binary { op: BinOp::BitOr, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_bitxor(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_bitand()?;
        while self.check(&TokenKind::Op(Op::Caret)) {
            let span = self.peek_span();
            self.bump();
            let rhs = self.parse_bitand()?;
            lhs = Expr::Binary { op: BinOp::BitXor, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_bitand(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_shift()?;
        while self.check(&TokenKind::Op(Op::Amp)) {
            let span = self.peek_span();
            self.bump();
            let rhs = self.parse_shift()?;
            lhs = Expr::Binary { op: BinOp::BitAnd, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                TokenKind::Op(Op::Shl) => BinOp::Shl,
                TokenKind::Op(Op::Shr) => BinOp::Shr,
                _ => break,
            };
            let span = self.peek_span();
            self.bump();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Op(Op::Plus) => BinOp::Add,
                TokenKind::Op(Op::Minus) => BinOp::Sub,
                _ => break,
            };
            let span = self.peek_span();
            self.bump();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Op(Op::Star) => BinOp::Mul,
                TokenKind::Op(Op::Slash) => BinOp::Div,
                TokenKind::Op(Op::Percent) => BinOp::Rem,
                _ => break,
            };
            let span = self.peek_span();
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), span };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let span = self.peek_span();
        let op = match self.peek() {
            TokenKind::Op(Op::Minus) => Some(UnOp::Neg),
            TokenKind::Op(Op::Bang) => Some(UnOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary { op, operand: Box::new(operand), span });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let span = self.peek_span();
        match self.peek().clone() {
            TokenKind::Int { value, .. } => {
                self.bump();
                Ok(Expr::IntLit { value, span })
            }
            TokenKind::Keyword(Keyword::True) => {
                self.bump();
                Ok(Expr::BoolLit { value: true, span })
            }
            TokenKind::Keyword(Keyword::False) => {
                self.bump();
                Ok(Expr::BoolLit { value: false, span })
            }
            TokenKind::Str(sym) => {
                self.bump();
                Ok(Expr::StrLit { value: sym, span })
            }
            TokenKind::Punct(Punct::LParen) => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(&TokenKind::Punct(Punct::RParen), "`)`")?;
                Ok(inner)
            }
            TokenKind::Ident(sym) => {
                self.bump();
                if self.check(&TokenKind::Punct(Punct::LParen)) {
                    self.parse_call_tail(sym, span)
                } else {
                    Ok(Expr::Ident { name: sym, span })
                }
            }
            other => {
                self.error_here(format!("expected an expression, found {other:?}"));
                Err(())
            }
        }
    }

    fn parse_call_tail(&mut self, callee: Symbol, span: Span) -> PResult<Expr> {
        self.expect(&TokenKind::Punct(Punct::LParen), "`(`")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::Punct(Punct::RParen)) {
            loop {
                args.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Punct(Punct::Comma)) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::Punct(Punct::RParen), "`)`")?;

        if let Some(kind) = builtin_kind(callee.as_str()) {
            return Ok(Expr::BuiltinCall { kind, args, span });
        }
        Ok(Expr::Call { callee, args, span })
    }
}

fn comparison_op(kind: &TokenKind) -> Option<BinOp> {
    Some(match kind {
        TokenKind::Op(Op::EqEq) => BinOp::Eq,
        TokenKind::Op(Op::Ne) => BinOp::Ne,
        TokenKind::Op(Op::Lt) => BinOp::Lt,
        TokenKind::Op(Op::Le) => BinOp::Le,
        TokenKind::Op(Op::Gt) => BinOp::Gt,
        TokenKind::Op(Op::Ge) => BinOp::Ge,
        _ => return None,
    })
}

fn builtin_kind(name: &str) -> Option<BuiltinKind> {
    Some(match name {
        "read" => BuiltinKind::Read,
        "readln" => BuiltinKind::ReadLn,
        "readchar" => BuiltinKind::ReadChar,
        "read_failed" => BuiltinKind::ReadFailed,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axis_lex::Lexer;

    fn parse(src: &str) -> (Program, bool) {
        let mut lex_handler = Handler::new();
        let tokens = Lexer::new(src, FileId(0), "t.ax", &mut lex_handler).tokenize();
        let mut handler = Handler::new();
        let program = Parser::new(tokens, FileId(0), "t.ax", &mut handler).parse_program();
        (program, handler.has_errors())
    }

    #[test]
    fn parses_minimal_main() {
        let (prog, errs) = parse("func main() -> i32:\n    give 42\n");
        assert!(!errs);
        assert_eq!(prog.funcs.len(), 1);
        assert_eq!(prog.funcs[0].name.as_str(), "main");
    }

    #[test]
    fn parses_mode_compile_directive() {
        let (prog, errs) = parse("mode compile\nfunc main() -> i32:\n    give 0\n");
        assert!(!errs);
        assert_eq!(prog.mode, Some(CompileMode::Compile));
    }

    #[test]
    fn rejects_mode_script_as_out_of_scope() {
        let (_, errs) = parse("mode script\nfunc main() -> i32:\n    give 0\n");
        assert!(errs);
    }

    #[test]
    fn rejects_chained_comparisons() {
        let (_, errs) = parse("func main() -> i32:\n    when 1 < 2 < 3:\n        give 1\n    give 0\n");
        assert!(errs);
    }

    #[test]
    fn parses_var_decl_and_while_and_assign() {
        let (prog, errs) = parse(
            "func main() -> i32:\n    i: i32 = 0\n    while i < 10:\n        i = i + 1\n    give i\n",
        );
        assert!(!errs);
        let body = &prog.funcs[0].body.stmts;
        assert!(matches!(body[0], Stmt::VarDecl { .. }));
        assert!(matches!(body[1], Stmt::While { .. }));
    }

    #[test]
    fn parses_write_and_writeln_as_dedicated_statements() {
        let (prog, errs) = parse("func main() -> i32:\n    write(1)\n    writeln(2)\n    give 0\n");
        assert!(!errs);
        assert!(matches!(prog.funcs[0].body.stmts[0], Stmt::Write { newline: false, .. }));
        assert!(matches!(prog.funcs[0].body.stmts[1], Stmt::Write { newline: true, .. }));
    }

    #[test]
    fn parses_read_assignment_as_read_to() {
        let (prog, errs) = parse("func main() -> i32:\n    n: i32 = 0\n    n = readln()\n    give n\n");
        assert!(!errs);
        assert!(matches!(prog.funcs[0].body.stmts[1], Stmt::ReadTo { kind: ReadToKind::ReadLn, .. }));
    }

    #[test]
    fn enforces_bitwise_precedence_or_lowest_and_highest() {
        let (prog, errs) = parse("func main() -> i32:\n    give 1 | 2 ^ 3 & 4\n");
        assert!(!errs);
        match &prog.funcs[0].body.stmts[0] {
            Stmt::Return { value: Some(Expr::Binary { op: BinOp::BitOr, rhs, .. }), .. } => {
                assert!(matches!(**rhs, Expr::Binary { op: BinOp::BitXor, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
