use std::collections::HashMap;

use crate::{
    codegen::vm,
    error::CompileError,
};

// region: Context

/// Context information regarding the class (module) currently
/// being compiled.
#[derive(Debug)]
pub struct ModuleContext {
    pub class_name: String,
    pub scope: SymbolTable,
    pub labels: LabelCounters,
    pub output: vm::VMModule,
}

impl ModuleContext {
    pub fn new() -> Self {
        Self {
            class_name: String::new(),
            scope: SymbolTable::new(),
            labels: LabelCounters::new(),
            output: vm::VMModule::new(),
        }
    }
}

// endregion

// region: Symbol Table

/// Declaration category of an identifier, determining
/// its memory segment and its index counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Kind {
    Static,
    Field,
    Argument,
    Local,
}

impl Kind {
    pub const fn is_class_scope(self) -> bool {
        matches!(self, Self::Static | Self::Field)
    }

    /// VM memory segment a variable of this kind lives in.
    /// Fields are addressed relative to the current object.
    pub const fn segment(self) -> vm::Segment {
        match self {
            Self::Static => vm::Segment::Static,
            Self::Field => vm::Segment::This,
            Self::Argument => vm::Segment::Argument,
            Self::Local => vm::Segment::Local,
        }
    }
}

/// Everything the engine needs to know about a defined identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableContext {
    pub type_name: String,
    pub kind: Kind,
    pub index: usize,
}

impl VariableContext {
    /// Helper function for performing a `push`
    /// action with the variable's segment and index.
    pub fn push(&self) -> vm::VMInstruction {
        vm::push(self.kind.segment(), self.index)
    }

    /// Helper function for performing a `pop`
    /// action with the variable's segment and index.
    pub fn pop(&self) -> vm::VMInstruction {
        vm::pop(self.kind.segment(), self.index)
    }
}

type Name = String;

/// Two-scope identifier registry: Static/Field entries live for the
/// whole class, Argument/Local entries for a single subroutine.
/// Lookups check the subroutine scope first, so subroutine-level
/// names shadow class-level ones.
#[derive(Debug)]
pub struct SymbolTable {
    class_scope: HashMap<Name, VariableContext>,
    subroutine_scope: HashMap<Name, VariableContext>,
    counters: KindCounters,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            class_scope: HashMap::new(),
            subroutine_scope: HashMap::new(),
            counters: KindCounters::new(),
        }
    }

    /// Clear the subroutine scope and zero its counters;
    /// the class scope and its counters are untouched.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.counters.reset(Kind::Argument);
        self.counters.reset(Kind::Local);
    }

    /// Register a new identifier, assigning it the next available
    /// index for its kind.
    ///
    /// Redefinition is checked against the scope the kind implies,
    /// so a subroutine-level name may shadow a class-level one.
    pub fn define(
        &mut self,
        name: &str,
        type_name: &str,
        kind: Kind,
    ) -> Result<VariableContext, CompileError> {
        if self.scope_of(kind).contains_key(name) {
            return Err(CompileError::VariableAlreadyInScope(name.to_string()));
        }

        let context = VariableContext {
            type_name: type_name.to_string(),
            kind,
            index: self.counters.next_index(kind),
        };

        self.scope_of_mut(kind)
            .insert(name.to_string(), context.clone());

        Ok(context)
    }

    /// Number of identifiers of the given kind defined in the
    /// currently active scopes (reads the counters, not the maps).
    pub fn var_count(&self, kind: Kind) -> usize {
        self.counters.count(kind)
    }

    /// Search both scopes for the given identifier,
    /// subroutine scope first.
    pub fn search_variable(&self, name: &str) -> Option<&VariableContext> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    /// Non-failing existence probe, used to disambiguate a bare
    /// identifier from a same-class subroutine call.
    pub fn contains(&self, name: &str) -> bool {
        self.search_variable(name).is_some()
    }

    pub fn kind_of(&self, name: &str) -> Result<Kind, CompileError> {
        self.lookup(name).map(|context| context.kind)
    }

    pub fn type_of(&self, name: &str) -> Result<&str, CompileError> {
        self.lookup(name).map(|context| context.type_name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Result<usize, CompileError> {
        self.lookup(name).map(|context| context.index)
    }

    fn lookup(&self, name: &str) -> Result<&VariableContext, CompileError> {
        self.search_variable(name)
            .ok_or_else(|| CompileError::VariableNotInScope(name.to_string()))
    }

    const fn scope_of(&self, kind: Kind) -> &HashMap<Name, VariableContext> {
        if kind.is_class_scope() {
            &self.class_scope
        } else {
            &self.subroutine_scope
        }
    }

    fn scope_of_mut(&mut self, kind: Kind) -> &mut HashMap<Name, VariableContext> {
        if kind.is_class_scope() {
            &mut self.class_scope
        } else {
            &mut self.subroutine_scope
        }
    }
}

/// Dense per-kind index counters; indices start at 0 and are
/// never reused or renumbered.
#[derive(Debug)]
struct KindCounters {
    counts: HashMap<Kind, usize>,
}

impl KindCounters {
    fn new() -> Self {
        Self {
            counts: HashMap::new(),
        }
    }

    /// Get the next free index for the kind and advance its counter.
    fn next_index(&mut self, kind: Kind) -> usize {
        let count = self.counts.entry(kind).or_default();
        let index = *count;
        *count += 1;

        index
    }

    fn count(&self, kind: Kind) -> usize {
        self.counts.get(&kind).copied().unwrap_or_default()
    }

    fn reset(&mut self, kind: Kind) {
        self.counts.remove(&kind);
    }
}

// endregion

// region: Label Counters

/// Numeric suffixes for `if`/`while` branch labels, local to one
/// subroutine compilation so that the uniqueness of generated labels
/// does not depend on compilation order.
#[derive(Debug, Default)]
pub struct LabelCounters {
    if_count: usize,
    while_count: usize,
}

impl LabelCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero both counters; performed at every subroutine entry.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn next_if(&mut self) -> usize {
        let suffix = self.if_count;
        self.if_count += 1;

        suffix
    }

    pub fn next_while(&mut self) -> usize {
        let suffix = self.while_count;
        self.while_count += 1;

        suffix
    }
}

// endregion
