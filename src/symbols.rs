use std::collections::HashMap;

use crate::vm::Segment;

/// The category of a Jack identifier, which fixes both its scope and the
/// VM segment it lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Static,
    Field,
    Argument,
    Local,
}

impl SymbolKind {
    /// The VM segment a variable of this kind is stored in.
    pub fn segment(self) -> Segment {
        match self {
            SymbolKind::Static => Segment::Static,
            SymbolKind::Field => Segment::This,
            SymbolKind::Argument => Segment::Argument,
            SymbolKind::Local => Segment::Local,
        }
    }

    fn index(self) -> usize {
        match self {
            SymbolKind::Static => 0,
            SymbolKind::Field => 1,
            SymbolKind::Argument => 2,
            SymbolKind::Local => 3,
        }
    }

    fn is_class_scope(self) -> bool {
        matches!(self, SymbolKind::Static | SymbolKind::Field)
    }
}

#[derive(Clone, Debug)]
pub struct Symbol {
    pub ty: String,
    pub kind: SymbolKind,
    pub index: u16,
}

/// Two-scope symbol table: class scope persists for the whole class,
/// subroutine scope is reset on entry to each subroutine. Per-kind counters
/// drive index assignment.
#[derive(Default)]
pub struct SymbolTable {
    class_scope: HashMap<String, Symbol>,
    subroutine_scope: HashMap<String, Symbol>,
    counts: [u16; 4],
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the subroutine scope and reset the argument and local
    /// counters. Class-scope state is untouched.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.counts[SymbolKind::Argument.index()] = 0;
        self.counts[SymbolKind::Local.index()] = 0;
    }

    /// Define a new identifier, assigning the next running index for its
    /// kind. Callers must not redefine a name within one scope.
    pub fn define(&mut self, name: &str, ty: &str, kind: SymbolKind) {
        let index = self.counts[kind.index()];
        self.counts[kind.index()] += 1;
        let symbol = Symbol {
            ty: ty.to_string(),
            kind,
            index,
        };
        let scope = if kind.is_class_scope() {
            &mut self.class_scope
        } else {
            &mut self.subroutine_scope
        };
        let prev = scope.insert(name.to_string(), symbol);
        debug_assert!(prev.is_none(), "redefinition of '{}'", name);
    }

    /// Look up a name, subroutine scope first.
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    pub fn kind_of(&self, name: &str) -> Option<SymbolKind> {
        self.get(name).map(|s| s.kind)
    }

    /// Type of a defined name. Call only after `kind_of` returned `Some`.
    pub fn type_of(&self, name: &str) -> &str {
        &self.get(name).expect("type_of on undefined name").ty
    }

    /// Index of a defined name. Call only after `kind_of` returned `Some`.
    pub fn index_of(&self, name: &str) -> u16 {
        self.get(name).expect("index_of on undefined name").index
    }

    /// Number of names of the given kind in the current scope.
    pub fn var_count(&self, kind: SymbolKind) -> u16 {
        self.counts[kind.index()]
    }
}
