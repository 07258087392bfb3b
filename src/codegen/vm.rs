//! Model of the textual VM instruction set the compiler emits.
//!
//! Instructions are collected into per-subroutine blocks, and the blocks
//! into a per-class module; emission order is semantically significant
//! (stack discipline), so both are strictly append-only.

// region: VMModule

#[derive(Debug)]
pub struct VMModule {
    blocks: Vec<VMInstructionBlock>,
}

impl VMModule {
    pub const fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    pub fn add_block(&mut self, block: VMInstructionBlock) {
        self.blocks.push(block);
    }

    pub fn compile(self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for VMModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let blocks = self
            .blocks
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        write!(f, "{}", blocks.join("\n"))
    }
}

// endregion

// region: VMInstructionBlock

#[derive(Debug)]
pub struct VMInstructionBlock {
    instructions: Vec<VMInstruction>,
}

impl VMInstructionBlock {
    #[cfg(test)]
    pub fn compile(self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for VMInstructionBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let instructions = self
            .instructions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        write!(f, "{}", instructions.join("\n"))
    }
}

impl From<Vec<VMInstruction>> for VMInstructionBlock {
    fn from(instructions: Vec<VMInstruction>) -> Self {
        Self { instructions }
    }
}

// endregion

// region: VMInstruction

// region: VMInstruction utility functions

/// Utility function for the `push` VM instruction.
pub fn push(segment: Segment, i: usize) -> VMInstruction {
    VMInstruction::Push(segment, i)
}

/// Utility function for the `pop` VM instruction.
pub fn pop(segment: Segment, i: usize) -> VMInstruction {
    VMInstruction::Pop(segment, i)
}

/// Utility function for the `command` VM instruction.
pub fn command(command: VMCommand) -> VMInstruction {
    VMInstruction::Command(command)
}

/// Utility function for the `return` VM instruction.
pub fn vm_return() -> VMInstruction {
    VMInstruction::Command(VMCommand::Return)
}

/// Utility function for the `label` VM instruction.
pub fn label<S: Into<String>>(label_action: LabelAction, label: S) -> VMInstruction {
    VMInstruction::Label(label_action, label.into())
}

/// Utility function for the `function` VM instruction.
pub fn function<S: Into<String>>(function_name: S, variable_count: usize) -> VMInstruction {
    VMInstruction::Function(function_name.into(), variable_count)
}

/// Utility function for the `call` VM instruction.
pub fn call<S: Into<String>>(function_name: S, argument_count: usize) -> VMInstruction {
    VMInstruction::Call(function_name.into(), argument_count)
}

// endregion

/// The `Class.subroutine` naming convention - the sole
/// cross-unit linkage mechanism of the VM target.
pub fn mangled_name(class_name: &str, subroutine_name: &str) -> String {
    format!("{class_name}.{subroutine_name}")
}

type Index = usize;
type Label = String;
type Count = usize;
type FunctionName = String;

#[derive(Debug, Clone)]
pub enum VMInstruction {
    Push(Segment, Index),
    Pop(Segment, Index),
    Command(VMCommand),
    Label(LabelAction, Label),
    Function(FunctionName, Count),
    Call(FunctionName, Count),
}

impl std::fmt::Display for VMInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push(segment, i) => write!(f, "push {segment} {i}"),
            Self::Pop(segment, i) => write!(f, "pop {segment} {i}"),
            Self::Command(command) => write!(f, "{command}"),
            Self::Label(label_action, label) => write!(f, "{label_action} {label}"),
            Self::Function(function_name, variable_count) => {
                write!(f, "function {function_name} {variable_count}")
            }
            Self::Call(function_name, argument_count) => {
                write!(f, "call {function_name} {argument_count}")
            }
        }
    }
}

#[derive(Debug, strum::Display, Clone, Copy)]
#[strum(serialize_all = "kebab-case")]
pub enum VMCommand {
    Add,
    Sub,
    Neg,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
    // the target spells the shift commands without a separator
    #[strum(serialize = "shiftleft")]
    ShiftLeft,
    #[strum(serialize = "shiftright")]
    ShiftRight,
    Return,
}

#[derive(Debug, strum::Display, Clone, Copy)]
#[strum(serialize_all = "kebab-case")]
pub enum LabelAction {
    Label,
    Goto,
    IfGoto,
}

#[derive(Debug, strum::Display, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "kebab-case")]
pub enum Segment {
    Local,
    Argument,
    Static,
    Constant,
    This,
    That,
    Pointer,
    Temp,
}

// endregion
