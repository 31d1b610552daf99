//! The AST produced by the parser.
//!
//! A closed set of tagged variants, never an open-ended dynamic-dispatch
//! tree - every downstream visitor (the semantic analyzer, the code
//! generator) is an exhaustive match, which the compiler itself checks for
//! coverage.

use axis_util::{Span, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Bool,
    Str,
    Ptr,
    Void,
}

impl TypeName {
    pub fn from_str(s: &str) -> Option<TypeName> {
        Some(match s {
            "i8" => TypeName::I8,
            "i16" => TypeName::I16,
            "i32" => TypeName::I32,
            "i64" => TypeName::I64,
            "u8" => TypeName::U8,
            "u16" => TypeName::U16,
            "u32" => TypeName::U32,
            "u64" => TypeName::U64,
            "bool" => TypeName::Bool,
            "str" => TypeName::Str,
            "ptr" => TypeName::Ptr,
            "void" => TypeName::Void,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Read,
    ReadLn,
    ReadChar,
    ReadFailed,
}

#[derive(Debug, Clone)]
pub enum Expr {
    IntLit { value: u64, span: Span },
    BoolLit { value: bool, span: Span },
    StrLit { value: Symbol, span: Span },
    Ident { name: Symbol, span: Span },
    Unary { op: UnOp, operand: Box<Expr>, span: Span },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr>, span: Span },
    Call { callee: Symbol, args: Vec<Expr>, span: Span },
    BuiltinCall { kind: BuiltinKind, args: Vec<Expr>, span: Span },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::IntLit { span, .. }
            | Expr::BoolLit { span, .. }
            | Expr::StrLit { span, .. }
            | Expr::Ident { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Call { span, .. }
            | Expr::BuiltinCall { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ReadToKind {
    /// `read()`: parses the destination's declared integer type from the
    /// whole buffer, or captures it raw when the destination is `str`.
    Read,
    /// `readln()`: same, but truncated at the first newline.
    ReadLn,
    Char,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    VarDecl { name: Symbol, ty: TypeName, init: Expr, span: Span },
    Assign { name: Symbol, value: Expr, span: Span },
    If { cond: Expr, then_block: Block, else_block: Option<Block>, span: Span },
    While { cond: Expr, body: Block, span: Span },
    Loop { body: Block, span: Span },
    Break { span: Span },
    Continue { span: Span },
    Return { value: Option<Expr>, span: Span },
    ExprStmt { call: Expr, span: Span },
    Write { value: Expr, newline: bool, span: Span },
    ReadTo { target: Symbol, kind: ReadToKind, span: Span },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::Loop { span, .. }
            | Stmt::Break { span }
            | Stmt::Continue { span }
            | Stmt::Return { span, .. }
            | Stmt::ExprStmt { span, .. }
            | Stmt::Write { span, .. }
            | Stmt::ReadTo { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Symbol,
    pub ty: TypeName,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: Symbol,
    pub params: Vec<Param>,
    pub ret_type: TypeName,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileMode {
    Compile,
    Script,
}

#[derive(Debug, Clone)]
pub struct Program {
    pub mode: Option<CompileMode>,
    pub funcs: Vec<FuncDecl>,
}
