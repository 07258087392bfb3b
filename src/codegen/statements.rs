//! Compilation of statement sequences: `let`, `if`, `while`, `do`
//! and `return`, each consuming its own terminator.

use crate::{
    codegen::{
        context::ModuleContext,
        error::FallableInstructions,
        expression, subroutine_call,
        tokens::{
            advance_or_end, current_keyword, expect_identifier, expect_keyword, expect_symbol,
            is_keyword, is_symbol,
        },
        vm,
    },
    error::CompileError,
    tokenizer::{Keyword, Tokenizer},
};

/// Compile a (possibly empty) run of statements, not including the
/// enclosing braces.
pub fn compile(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
) -> FallableInstructions {
    let mut instructions = Vec::new();

    loop {
        let statement = match current_keyword(tokenizer) {
            Some(Keyword::Let) => compile_let(tokenizer, module_context)?,
            Some(Keyword::If) => compile_if(tokenizer, module_context)?,
            Some(Keyword::While) => compile_while(tokenizer, module_context)?,
            Some(Keyword::Do) => compile_do(tokenizer, module_context)?,
            Some(Keyword::Return) => compile_return(tokenizer, module_context)?,
            _ => break,
        };

        instructions.extend(statement);
    }

    Ok(instructions)
}

fn compile_let(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
) -> FallableInstructions {
    expect_keyword(tokenizer, Keyword::Let)?;
    let variable_name = expect_identifier(tokenizer)?;

    let Some(variable_context) = module_context.scope.search_variable(&variable_name) else {
        return Err(CompileError::VariableNotInScope(variable_name));
    };
    let variable_context = variable_context.clone();

    let instructions = if is_symbol(tokenizer, '[') {
        // pending element address, kept below the right-hand value
        let address =
            expression::compile_array_address(tokenizer, module_context, &variable_context)?;

        expect_symbol(tokenizer, '=')?;
        let value = expression::compile(tokenizer, module_context)?;

        // stash the value, restore the address into `that`, store
        // indirectly - this way the right-hand expression was free to
        // perform array accesses of its own without clobbering the
        // pending address
        let indirect_store = vec![
            vm::pop(vm::Segment::Temp, 0),
            vm::pop(vm::Segment::Pointer, 1),
            vm::push(vm::Segment::Temp, 0),
            vm::pop(vm::Segment::That, 0),
        ];

        [address, value, indirect_store].concat()
    } else {
        expect_symbol(tokenizer, '=')?;
        let value = expression::compile(tokenizer, module_context)?;

        [value, vec![variable_context.pop()]].concat()
    };

    expect_symbol(tokenizer, ';')?;

    Ok(instructions)
}

fn compile_if(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
) -> FallableInstructions {
    // fresh numeric suffix per `if`, so nested and sibling
    // conditionals never collide
    let suffix = module_context.labels.next_if();
    let true_label = format!("IF_TRUE{suffix}");
    let false_label = format!("IF_FALSE{suffix}");
    let end_label = format!("IF_END{suffix}");

    expect_keyword(tokenizer, Keyword::If)?;
    expect_symbol(tokenizer, '(')?;
    let condition = expression::compile(tokenizer, module_context)?;
    expect_symbol(tokenizer, ')')?;

    let branch = vec![
        vm::label(vm::LabelAction::IfGoto, true_label.clone()),
        vm::label(vm::LabelAction::Goto, false_label.clone()),
        vm::label(vm::LabelAction::Label, true_label),
    ];

    expect_symbol(tokenizer, '{')?;
    let then_statements = compile(tokenizer, module_context)?;
    expect_symbol(tokenizer, '}')?;

    let closing = if is_keyword(tokenizer, Keyword::Else) {
        advance_or_end(tokenizer)?;

        expect_symbol(tokenizer, '{')?;
        let else_statements = compile(tokenizer, module_context)?;
        expect_symbol(tokenizer, '}')?;

        [
            vec![
                vm::label(vm::LabelAction::Goto, end_label.clone()),
                vm::label(vm::LabelAction::Label, false_label),
            ],
            else_statements,
            vec![vm::label(vm::LabelAction::Label, end_label)],
        ]
        .concat()
    } else {
        // no `else` - the "false" label doubles as the reconvergence
        // point and the end label is not needed
        vec![vm::label(vm::LabelAction::Label, false_label)]
    };

    Ok([condition, branch, then_statements, closing].concat())
}

fn compile_while(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
) -> FallableInstructions {
    let suffix = module_context.labels.next_while();
    let test_label = format!("WHILE_EXP{suffix}");
    let end_label = format!("WHILE_END{suffix}");

    expect_keyword(tokenizer, Keyword::While)?;
    expect_symbol(tokenizer, '(')?;
    let condition = expression::compile(tokenizer, module_context)?;
    expect_symbol(tokenizer, ')')?;

    // jump out on the negated condition
    let test = vec![
        vm::command(vm::VMCommand::Not),
        vm::label(vm::LabelAction::IfGoto, end_label.clone()),
    ];

    expect_symbol(tokenizer, '{')?;
    let body = compile(tokenizer, module_context)?;
    expect_symbol(tokenizer, '}')?;

    Ok([
        vec![vm::label(vm::LabelAction::Label, test_label.clone())],
        condition,
        test,
        body,
        vec![
            vm::label(vm::LabelAction::Goto, test_label),
            vm::label(vm::LabelAction::Label, end_label),
        ],
    ]
    .concat())
}

fn compile_do(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
) -> FallableInstructions {
    expect_keyword(tokenizer, Keyword::Do)?;

    let name = expect_identifier(tokenizer)?;
    let call = subroutine_call::compile(tokenizer, module_context, name)?;

    expect_symbol(tokenizer, ';')?;

    // `do` ignores the result, but the callee always leaves one
    // value on the stack - discard it
    Ok([call, vec![vm::pop(vm::Segment::Temp, 0)]].concat())
}

fn compile_return(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
) -> FallableInstructions {
    expect_keyword(tokenizer, Keyword::Return)?;

    // void subroutines still push a dummy value - the calling
    // convention always leaves exactly one value for the caller
    let value = if is_symbol(tokenizer, ';') {
        vec![vm::push(vm::Segment::Constant, 0)]
    } else {
        expression::compile(tokenizer, module_context)?
    };

    expect_symbol(tokenizer, ';')?;

    Ok([value, vec![vm::vm_return()]].concat())
}

#[cfg(test)]
mod tests {
    use crate::codegen::context::Kind;

    use super::*;

    fn compile_source(
        source: &str,
        module_context: &mut ModuleContext,
    ) -> Result<String, CompileError> {
        let mut tokenizer = Tokenizer::new(source)?;
        tokenizer.advance()?;

        let instructions = compile(&mut tokenizer, module_context)?;

        Ok(vm::VMInstructionBlock::from(instructions).compile())
    }

    #[test]
    fn test_let_statement() {
        let mut module_context = ModuleContext::new();
        assert!(module_context.scope.define("x", "int", Kind::Local).is_ok());

        let expected = ["push constant 5", "pop local 0"].join("\n");

        assert_eq!(
            compile_source("let x = 5;", &mut module_context),
            Ok(expected)
        );

        assert!(matches!(
            compile_source("let missing = 5;", &mut module_context),
            Err(CompileError::VariableNotInScope(_))
        ));
    }

    #[test]
    fn test_let_statement_with_array_target() {
        let mut module_context = ModuleContext::new();
        assert!(module_context
            .scope
            .define("a", "Array", Kind::Local)
            .is_ok());
        assert!(module_context.scope.define("i", "int", Kind::Local).is_ok());

        // the right-hand side may itself read the array without
        // clobbering the pending element address
        let expected = [
            "push local 1",
            "push local 0",
            "add",
            "push constant 0",
            "push local 0",
            "add",
            "pop pointer 1",
            "push that 0",
            "pop temp 0",
            "pop pointer 1",
            "push temp 0",
            "pop that 0",
        ]
        .join("\n");

        assert_eq!(
            compile_source("let a[i] = a[0];", &mut module_context),
            Ok(expected)
        );
    }

    #[test]
    fn test_if_statement_without_else() {
        let mut module_context = ModuleContext::new();
        assert!(module_context.scope.define("x", "int", Kind::Local).is_ok());

        let expected = [
            "push local 0",
            "if-goto IF_TRUE0",
            "goto IF_FALSE0",
            "label IF_TRUE0",
            "push constant 1",
            "pop local 0",
            "label IF_FALSE0",
        ]
        .join("\n");

        assert_eq!(
            compile_source("if (x) { let x = 1; }", &mut module_context),
            Ok(expected)
        );
    }

    #[test]
    fn test_if_statement_with_else() {
        let mut module_context = ModuleContext::new();
        assert!(module_context.scope.define("x", "int", Kind::Local).is_ok());

        let expected = [
            "push local 0",
            "if-goto IF_TRUE0",
            "goto IF_FALSE0",
            "label IF_TRUE0",
            "push constant 1",
            "pop local 0",
            "goto IF_END0",
            "label IF_FALSE0",
            "push constant 2",
            "pop local 0",
            "label IF_END0",
        ]
        .join("\n");

        assert_eq!(
            compile_source(
                "if (x) { let x = 1; } else { let x = 2; }",
                &mut module_context
            ),
            Ok(expected)
        );
    }

    #[test]
    fn test_sibling_while_loops_get_distinct_labels() {
        let mut module_context = ModuleContext::new();
        assert!(module_context.scope.define("x", "int", Kind::Local).is_ok());

        let expected = [
            "label WHILE_EXP0",
            "push local 0",
            "not",
            "if-goto WHILE_END0",
            "goto WHILE_EXP0",
            "label WHILE_END0",
            "label WHILE_EXP1",
            "push local 0",
            "not",
            "if-goto WHILE_END1",
            "goto WHILE_EXP1",
            "label WHILE_END1",
        ]
        .join("\n");

        assert_eq!(
            compile_source("while (x) { } while (x) { }", &mut module_context),
            Ok(expected)
        );
    }

    #[test]
    fn test_do_statement_discards_the_result() {
        let mut module_context = ModuleContext::new();
        module_context.class_name = "Main".to_string();

        let expected = [
            "push constant 3",
            "call Output.printInt 1",
            "pop temp 0",
        ]
        .join("\n");

        assert_eq!(
            compile_source("do Output.printInt(3);", &mut module_context),
            Ok(expected)
        );
    }

    #[test]
    fn test_return_statements() {
        let mut module_context = ModuleContext::new();

        let expected = ["push constant 0", "return"].join("\n");
        assert_eq!(compile_source("return;", &mut module_context), Ok(expected));

        let expected = ["push constant 8", "return"].join("\n");
        assert_eq!(
            compile_source("return 8;", &mut module_context),
            Ok(expected)
        );
    }

    /// Net number of values an instruction sequence leaves
    /// on the stack.
    fn stack_effect(listing: &str) -> isize {
        listing
            .lines()
            .map(|line| {
                let mut parts = line.split_whitespace();

                match parts.next().expect("instruction should not be empty") {
                    "push" => 1,
                    "pop" | "if-goto" | "return" => -1,
                    "add" | "sub" | "eq" | "gt" | "lt" | "and" | "or" => -1,
                    "neg" | "not" | "shiftleft" | "shiftright" | "label" | "goto" => 0,
                    "call" => {
                        let argument_count: isize = parts
                            .nth(1)
                            .and_then(|count| count.parse().ok())
                            .expect("a call should carry an argument count");

                        1 - argument_count
                    }
                    other => panic!("unhandled instruction: {other}"),
                }
            })
            .sum()
    }

    #[test]
    fn test_statements_are_stack_balanced() {
        let mut module_context = ModuleContext::new();
        module_context.class_name = "Main".to_string();
        assert!(module_context
            .scope
            .define("a", "Array", Kind::Local)
            .is_ok());
        assert!(module_context.scope.define("i", "int", Kind::Local).is_ok());

        let source = "
            let i = 0;
            while (i < 3) {
                let a[i] = i * 2;
                let i = i + 1;
            }
            if (a[0] = 0) {
                do Output.printString(\"none\");
            } else {
                do Output.printInt(a[0]);
            }
            return a[i - 1];
        ";

        let listing =
            compile_source(source, &mut module_context).expect("statements should compile");

        // every statement is stack-neutral, so the full body nets zero
        // and the slice before `return` nets exactly the return value
        assert_eq!(stack_effect(&listing), 0);

        let (before_return, _) = listing
            .rsplit_once("\nreturn")
            .expect("body should end in a return");
        assert_eq!(stack_effect(before_return), 1);
    }
}
