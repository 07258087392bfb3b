//! Logic for lowering Jack source to Hack VM instructions in a single
//! recursive-descent walk - no intermediate syntax tree is built; each
//! grammar routine consumes tokens and produces instructions directly.

use context::ModuleContext;

use crate::{
    error::CompileError,
    fileio::{input::SourceFile, output::OutputFile},
    tokenizer::Tokenizer,
};

pub mod context;
mod declarations;
pub mod error;
mod expression;
mod statements;
mod subroutine_call;
mod tokens;
pub mod vm;

/// Compile a single source unit (one class per file) into its
/// VM instruction stream.
///
/// Every unit gets a fresh tokenizer and context - no state crosses
/// files except the `Class.subroutine` naming convention.
pub fn compile_module(source_file: &SourceFile) -> Result<OutputFile, CompileError> {
    let mut tokenizer = Tokenizer::new(source_file.content())?;
    // load the first token; an empty unit is an error
    tokenizer.advance()?;

    let mut module_context = ModuleContext::new();
    declarations::compile_class(&mut tokenizer, &mut module_context)?;

    Ok(OutputFile::new(
        module_context.class_name,
        module_context.output.compile(),
    ))
}
