use crate::{codegen::vm, error::CompileError};

/// Alias for grammar routines that produce a sequence
/// of VM instructions.
pub type FallableInstructions = Result<Vec<vm::VMInstruction>, CompileError>;
