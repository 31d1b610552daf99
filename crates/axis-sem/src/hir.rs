//! The annotated AST: the parser's [`axis_par::ast`] tree plus everything
//! the semantic analyzer resolves - every expression's [`Type`], every
//! variable reference's frame offset, and each function's final frame
//! size. This is what the code generator (`axis-mir`) consumes; it never
//! looks at `axis_par::ast` directly.

use axis_par::ast::{BinOp, BuiltinKind, ReadToKind, UnOp};
use axis_util::Symbol;

use crate::types::Type;

#[derive(Debug, Clone)]
pub enum Expr {
    IntLit { value: u64, ty: Type },
    BoolLit { value: bool },
    /// `label` is the fresh `.L.str.N`-style symbol assigned in
    /// [`crate::StringTable`]; `bytes` is the original interned content,
    /// kept for length computation without touching the table again.
    StrLit { label: Symbol, bytes: Symbol },
    Ident { name: Symbol, offset: i32, ty: Type },
    Unary { op: UnOp, operand: Box<Expr>, ty: Type },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr>, ty: Type },
    Call { callee: Symbol, args: Vec<Expr>, ty: Type },
    BuiltinCall { kind: BuiltinKind, args: Vec<Expr>, ty: Type },
}

impl Expr {
    pub fn ty(&self) -> Type {
        match self {
            Expr::IntLit { ty, .. }
            | Expr::Ident { ty, .. }
            | Expr::Unary { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Call { ty, .. }
            | Expr::BuiltinCall { ty, .. } => *ty,
            Expr::BoolLit { .. } => Type::Bool,
            Expr::StrLit { .. } => Type::Str,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    VarDecl { name: Symbol, offset: i32, ty: Type, init: Expr },
    Assign { name: Symbol, offset: i32, ty: Type, value: Expr },
    If { cond: Expr, then_block: Block, else_block: Option<Block> },
    While { cond: Expr, body: Block },
    Loop { body: Block },
    Break,
    Continue,
    Return { value: Option<Expr> },
    ExprStmt { call: Expr },
    Write { value: Expr, newline: bool },
    ReadTo { name: Symbol, offset: i32, ty: Type, kind: ReadToKind },
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ParamLayout {
    pub name: Symbol,
    pub ty: Type,
    pub offset: i32,
}

#[derive(Debug, Clone)]
pub struct Func {
    pub name: Symbol,
    pub params: Vec<ParamLayout>,
    pub ret: Type,
    pub frame_size: i32,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct StringEntry {
    pub label: Symbol,
    pub bytes: Symbol,
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub funcs: Vec<Func>,
    pub strings: Vec<StringEntry>,
}
