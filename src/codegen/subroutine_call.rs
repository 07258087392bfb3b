//! Compilation of subroutine calls, including the three-way
//! classification of the callee.
//!
//! On seeing `name` (possibly followed by `.member`), the call site is
//! one of:
//! - a *method call on a variable* - `name` is in scope and a `.`
//!   follows; the variable is pushed as the receiver and the callee is
//!   resolved through its declared type,
//! - an *implicit method call on the current object* - `name` is not in
//!   scope and no `.` follows; the current `this` is the receiver,
//! - a *function or constructor call* - `name` is not in scope and a
//!   `.` follows; `name` is a class name and there is no receiver.
//!
//! The classification is computed once per call site, from the symbol
//! table's `contains` probe and a single token of lookahead.

use crate::{
    codegen::{
        context::ModuleContext,
        error::FallableInstructions,
        expression,
        tokens::{advance_or_end, expect_identifier, expect_symbol, is_symbol},
        vm,
    },
    tokenizer::Tokenizer,
};

#[derive(Debug, PartialEq, Eq)]
enum CallKind {
    MethodOnVariable,
    ImplicitMethodOnSelf,
    FunctionOrConstructor,
}

const fn determine_call_kind(name_is_in_scope: bool, dot_follows: bool) -> CallKind {
    if dot_follows {
        if name_is_in_scope {
            CallKind::MethodOnVariable
        } else {
            CallKind::FunctionOrConstructor
        }
    } else {
        // a bare name in call position is always a subroutine
        // of the enclosing class
        CallKind::ImplicitMethodOnSelf
    }
}

/// Compile a subroutine call whose leading identifier (`name`) has
/// already been consumed; the current token is `.` or `(`. Leaves the
/// callee's return value on the stack.
pub fn compile(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
    name: String,
) -> FallableInstructions {
    let dot_follows = is_symbol(tokenizer, '.');

    let member = if dot_follows {
        advance_or_end(tokenizer)?;
        Some(expect_identifier(tokenizer)?)
    } else {
        None
    };

    let call_kind = determine_call_kind(module_context.scope.contains(&name), dot_follows);

    // a method call passes its receiver as an extra, zeroth argument
    let mut receiver_instructions = Vec::new();
    let mut receiver_count = 0;

    let (class_name, subroutine_name) = match call_kind {
        CallKind::MethodOnVariable => {
            let kind = module_context.scope.kind_of(&name)?;
            let index = module_context.scope.index_of(&name)?;

            receiver_instructions.push(vm::push(kind.segment(), index));
            receiver_count = 1;

            // the callee is resolved through the receiver's declared type
            (
                module_context.scope.type_of(&name)?.to_string(),
                member.expect("call classification requires a member name"),
            )
        }
        CallKind::ImplicitMethodOnSelf => {
            receiver_instructions.push(vm::push(vm::Segment::Pointer, 0));
            receiver_count = 1;

            (module_context.class_name.clone(), name)
        }
        CallKind::FunctionOrConstructor => (
            name,
            member.expect("call classification requires a member name"),
        ),
    };

    expect_symbol(tokenizer, '(')?;
    let (argument_instructions, argument_count) =
        expression::compile_list(tokenizer, module_context)?;
    expect_symbol(tokenizer, ')')?;

    let call = vec![vm::call(
        vm::mangled_name(&class_name, &subroutine_name),
        receiver_count + argument_count,
    )];

    Ok([receiver_instructions, argument_instructions, call].concat())
}
