//! Lexical scoping: file -> function -> block, first hit wins.

use axis_util::{FxHashMap, Symbol};
use indexmap::IndexMap;

use crate::types::Type;

#[derive(Debug, Clone, Copy)]
pub struct VarEntry {
    pub ty: Type,
    pub offset: i32,
}

#[derive(Debug, Clone)]
pub struct FuncSig {
    pub params: Vec<Type>,
    pub ret: Type,
}

/// One nested scope. Blocks and function bodies each push a `Rib`; lookups
/// walk outward through `parent` until a binding is found or the chain is
/// exhausted.
struct Rib {
    bindings: FxHashMap<Symbol, VarEntry>,
}

pub struct ScopeStack {
    ribs: Vec<Rib>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack { ribs: vec![Rib { bindings: FxHashMap::default() }] }
    }

    pub fn push(&mut self) {
        self.ribs.push(Rib { bindings: FxHashMap::default() });
    }

    pub fn pop(&mut self) {
        self.ribs.pop();
    }

    /// Binds `name` in the *current* (innermost) scope only. Returns
    /// `false` if `name` is already bound there - a redeclaration in the
    /// same block, which the caller reports as a `NameError`.
    pub fn declare(&mut self, name: Symbol, entry: VarEntry) -> bool {
        let rib = self.ribs.last_mut().expect("scope stack never empty");
        if rib.bindings.contains_key(&name) {
            return false;
        }
        rib.bindings.insert(name, entry);
        true
    }

    pub fn resolve(&self, name: Symbol) -> Option<VarEntry> {
        self.ribs.iter().rev().find_map(|rib| rib.bindings.get(&name).copied())
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Module-level function table, keyed in declaration order so diagnostics
/// and later codegen both see a stable iteration order.
#[derive(Default)]
pub struct FuncTable {
    funcs: IndexMap<Symbol, FuncSig>,
}

impl FuncTable {
    pub fn new() -> Self {
        FuncTable::default()
    }

    pub fn declare(&mut self, name: Symbol, sig: FuncSig) -> bool {
        if self.funcs.contains_key(&name) {
            return false;
        }
        self.funcs.insert(name, sig);
        true
    }

    pub fn get(&self, name: Symbol) -> Option<&FuncSig> {
        self.funcs.get(&name)
    }
}
