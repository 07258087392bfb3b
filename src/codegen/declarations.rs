//! Compilation of the declaration productions: `class`,
//! `classVarDec`, `subroutineDec`, `parameterList` and `varDec`.

use crate::{
    codegen::{
        context::{Kind, ModuleContext},
        error::FallableInstructions,
        statements,
        tokens::{
            advance_or_end, current_keyword, expect_identifier, expect_keyword, expect_symbol,
            expect_type, is_keyword, is_symbol, unexpected,
        },
        vm,
    },
    error::{CompileError, FallableAction},
    tokenizer::{Keyword, Tokenizer},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubroutineKind {
    Constructor,
    Function,
    Method,
}

/// Compile one complete class - the grammar's top-level production.
pub fn compile_class(tokenizer: &mut Tokenizer, module_context: &mut ModuleContext) -> FallableAction {
    expect_keyword(tokenizer, Keyword::Class)?;
    module_context.class_name = expect_identifier(tokenizer)?;
    expect_symbol(tokenizer, '{')?;

    while matches!(
        current_keyword(tokenizer),
        Some(Keyword::Static | Keyword::Field)
    ) {
        compile_class_var_dec(tokenizer, module_context)?;
    }

    while matches!(
        current_keyword(tokenizer),
        Some(Keyword::Constructor | Keyword::Function | Keyword::Method)
    ) {
        let instructions = compile_subroutine(tokenizer, module_context)?;
        module_context.output.add_block(instructions.into());
    }

    expect_symbol(tokenizer, '}')
}

fn compile_class_var_dec(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
) -> FallableAction {
    let kind = if is_keyword(tokenizer, Keyword::Static) {
        Kind::Static
    } else {
        Kind::Field
    };
    advance_or_end(tokenizer)?;

    compile_variable_declaration(tokenizer, module_context, kind)?;

    Ok(())
}

/// Compile `type name (, name)* ;`, defining each name with the given
/// kind and returning how many were defined.
fn compile_variable_declaration(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
    kind: Kind,
) -> Result<usize, CompileError> {
    let type_name = expect_type(tokenizer)?;
    let mut count = 0;

    loop {
        let name = expect_identifier(tokenizer)?;
        module_context.scope.define(&name, &type_name, kind)?;
        count += 1;

        if !is_symbol(tokenizer, ',') {
            break;
        }
        advance_or_end(tokenizer)?;
    }

    expect_symbol(tokenizer, ';')?;

    Ok(count)
}

fn compile_subroutine(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
) -> FallableInstructions {
    let subroutine_kind = match current_keyword(tokenizer) {
        Some(Keyword::Constructor) => SubroutineKind::Constructor,
        Some(Keyword::Function) => SubroutineKind::Function,
        Some(Keyword::Method) => SubroutineKind::Method,
        _ => {
            return Err(unexpected(
                "`constructor`, `function` or `method`",
                tokenizer.current_token()?,
            ))
        }
    };
    advance_or_end(tokenizer)?;

    module_context.scope.start_subroutine();
    module_context.labels.reset();

    // a method's receiver is always argument 0, so its explicit
    // parameters start at index 1
    if subroutine_kind == SubroutineKind::Method {
        let class_name = module_context.class_name.clone();
        module_context.scope.define("this", &class_name, Kind::Argument)?;
    }

    // return type (`void` or a type); only its well-formedness matters
    if is_keyword(tokenizer, Keyword::Void) {
        advance_or_end(tokenizer)?;
    } else {
        expect_type(tokenizer)?;
    }

    let subroutine_name = expect_identifier(tokenizer)?;
    log::debug!("compiling subroutine `{subroutine_name}`");

    expect_symbol(tokenizer, '(')?;
    compile_parameter_list(tokenizer, module_context)?;
    expect_symbol(tokenizer, ')')?;

    expect_symbol(tokenizer, '{')?;

    let mut local_count = 0;
    while is_keyword(tokenizer, Keyword::Var) {
        advance_or_end(tokenizer)?;
        local_count += compile_variable_declaration(tokenizer, module_context, Kind::Local)?;
    }

    let declaration = vec![vm::function(
        vm::mangled_name(&module_context.class_name, &subroutine_name),
        local_count,
    )];
    let prologue = compile_prologue(subroutine_kind, module_context);

    // the grammar guarantees the body ends in a `return`,
    // so nothing follows the statements
    let body = statements::compile(tokenizer, module_context)?;
    expect_symbol(tokenizer, '}')?;

    Ok([declaration, prologue, body].concat())
}

/// Subroutine-kind-specific setup of the `this` pointer, emitted
/// between the function declaration and the body.
fn compile_prologue(
    subroutine_kind: SubroutineKind,
    module_context: &ModuleContext,
) -> Vec<vm::VMInstruction> {
    match subroutine_kind {
        // anchor `this` to the passed receiver
        SubroutineKind::Method => vec![
            vm::push(vm::Segment::Argument, 0),
            vm::pop(vm::Segment::Pointer, 0),
        ],
        // allocate the new object and anchor `this` to it
        SubroutineKind::Constructor => vec![
            vm::push(
                vm::Segment::Constant,
                module_context.scope.var_count(Kind::Field),
            ),
            vm::call("Memory.alloc", 1),
            vm::pop(vm::Segment::Pointer, 0),
        ],
        SubroutineKind::Function => Vec::new(),
    }
}

fn compile_parameter_list(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
) -> FallableAction {
    if is_symbol(tokenizer, ')') {
        return Ok(());
    }

    loop {
        let type_name = expect_type(tokenizer)?;
        let name = expect_identifier(tokenizer)?;
        module_context
            .scope
            .define(&name, &type_name, Kind::Argument)?;

        if !is_symbol(tokenizer, ',') {
            break;
        }
        advance_or_end(tokenizer)?;
    }

    Ok(())
}
