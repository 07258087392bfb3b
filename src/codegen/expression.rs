//! Compilation of `expression`, `term` and `expressionList`.
//!
//! Evaluation is strictly left-to-right with no operator precedence:
//! `term (op term)*`, each operator emitted right after its right
//! operand (postfix, stack order). Grouping comes only from explicit
//! parentheses in the source.

use phf::phf_map;

use crate::{
    codegen::{
        context::{ModuleContext, VariableContext},
        error::FallableInstructions,
        subroutine_call,
        tokens::{advance_or_end, current_keyword, expect_symbol, is_symbol, unexpected},
        vm,
    },
    error::CompileError,
    tokenizer::{Keyword, TokenKind, Tokenizer},
};

/// Largest value an integer constant may denote (the target
/// machine's word is 16-bit, constants are unsigned).
const MAX_INTEGER_CONSTANT: usize = 32767;

/// How a source-level operator is realized on the stack machine.
///
/// Multiplication and division have no native VM command and lower
/// to runtime calls instead.
#[derive(Debug, Clone, Copy)]
enum OperatorLowering {
    Command(vm::VMCommand),
    RuntimeCall(&'static str, usize),
}

impl OperatorLowering {
    fn instruction(self) -> vm::VMInstruction {
        match self {
            Self::Command(command) => vm::command(command),
            Self::RuntimeCall(function_name, argument_count) => {
                vm::call(function_name, argument_count)
            }
        }
    }
}

static BINARY_OPERATORS: phf::Map<&'static str, OperatorLowering> = phf_map! {
    "+" => OperatorLowering::Command(vm::VMCommand::Add),
    "-" => OperatorLowering::Command(vm::VMCommand::Sub),
    "*" => OperatorLowering::RuntimeCall("Math.multiply", 2),
    "/" => OperatorLowering::RuntimeCall("Math.divide", 2),
    "&" => OperatorLowering::Command(vm::VMCommand::And),
    "|" => OperatorLowering::Command(vm::VMCommand::Or),
    "<" => OperatorLowering::Command(vm::VMCommand::Lt),
    ">" => OperatorLowering::Command(vm::VMCommand::Gt),
    "=" => OperatorLowering::Command(vm::VMCommand::Eq),
};

static UNARY_OPERATORS: phf::Map<&'static str, OperatorLowering> = phf_map! {
    "-" => OperatorLowering::Command(vm::VMCommand::Neg),
    "~" => OperatorLowering::Command(vm::VMCommand::Not),
    "^" => OperatorLowering::Command(vm::VMCommand::ShiftLeft),
    "#" => OperatorLowering::Command(vm::VMCommand::ShiftRight),
};

/// Compile a full expression, leaving its value on the stack.
pub fn compile(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
) -> FallableInstructions {
    let mut instructions = compile_term(tokenizer, module_context)?;

    while let Some(lowering) = current_binary_operator(tokenizer) {
        advance_or_end(tokenizer)?;

        instructions.extend(compile_term(tokenizer, module_context)?);
        instructions.push(lowering.instruction());
    }

    Ok(instructions)
}

/// Compile a (possibly empty) comma-separated list of expressions,
/// returning the instructions along with the number of expressions.
pub fn compile_list(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
) -> Result<(Vec<vm::VMInstruction>, usize), CompileError> {
    let mut instructions = Vec::new();
    let mut count = 0;

    // the list is always enclosed in parentheses, so a closing `)`
    // right away means there are no expressions at all
    if !is_symbol(tokenizer, ')') {
        loop {
            instructions.extend(compile(tokenizer, module_context)?);
            count += 1;

            if !is_symbol(tokenizer, ',') {
                break;
            }
            advance_or_end(tokenizer)?;
        }
    }

    Ok((instructions, count))
}

/// Evaluate an array element's address: index expression plus the
/// array variable's base. Expects the current token to be `[`; the
/// computed address is left on the stack for the caller to consume
/// (dereference on reads, indirect store on writes).
pub fn compile_array_address(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
    variable_context: &VariableContext,
) -> FallableInstructions {
    expect_symbol(tokenizer, '[')?;
    let mut instructions = compile(tokenizer, module_context)?;
    expect_symbol(tokenizer, ']')?;

    instructions.push(variable_context.push());
    instructions.push(vm::command(vm::VMCommand::Add));

    Ok(instructions)
}

fn current_binary_operator(tokenizer: &Tokenizer) -> Option<OperatorLowering> {
    let token = tokenizer.current_token().ok()?;

    if token.kind == TokenKind::Symbol {
        BINARY_OPERATORS.get(&token.lexeme).copied()
    } else {
        None
    }
}

fn compile_term(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
) -> FallableInstructions {
    let token = tokenizer.current_token()?.clone();

    match token.kind {
        TokenKind::IntegerConstant => {
            let value = token
                .lexeme
                .parse::<usize>()
                .ok()
                .filter(|&value| value <= MAX_INTEGER_CONSTANT)
                .ok_or(CompileError::IntegerOutOfRange {
                    literal: token.lexeme.clone(),
                    span: token.span.clone(),
                })?;

            advance_or_end(tokenizer)?;

            Ok(vec![vm::push(vm::Segment::Constant, value)])
        }
        TokenKind::StringConstant => {
            advance_or_end(tokenizer)?;

            Ok(compile_string_constant(&token.lexeme))
        }
        TokenKind::Keyword => {
            let instructions = match current_keyword(tokenizer) {
                // `true` is the all-ones word
                Some(Keyword::True) => vec![
                    vm::push(vm::Segment::Constant, 0),
                    vm::command(vm::VMCommand::Not),
                ],
                Some(Keyword::False | Keyword::Null) => {
                    vec![vm::push(vm::Segment::Constant, 0)]
                }
                Some(Keyword::This) => vec![vm::push(vm::Segment::Pointer, 0)],
                _ => return Err(unexpected("a term", &token)),
            };

            advance_or_end(tokenizer)?;

            Ok(instructions)
        }
        TokenKind::Symbol => {
            if is_symbol(tokenizer, '(') {
                advance_or_end(tokenizer)?;
                let instructions = compile(tokenizer, module_context)?;
                expect_symbol(tokenizer, ')')?;

                return Ok(instructions);
            }

            let Some(lowering) = UNARY_OPERATORS.get(&token.lexeme).copied() else {
                return Err(unexpected("a term", &token));
            };

            advance_or_end(tokenizer)?;

            let mut instructions = compile_term(tokenizer, module_context)?;
            instructions.push(lowering.instruction());

            Ok(instructions)
        }
        TokenKind::Identifier => {
            advance_or_end(tokenizer)?;

            // one token of lookahead distinguishes an array entry,
            // a subroutine call and a plain variable
            if is_symbol(tokenizer, '[') {
                compile_array_read(tokenizer, module_context, &token.lexeme)
            } else if is_symbol(tokenizer, '(') || is_symbol(tokenizer, '.') {
                subroutine_call::compile(tokenizer, module_context, token.lexeme)
            } else {
                let Some(variable_context) =
                    module_context.scope.search_variable(&token.lexeme)
                else {
                    return Err(CompileError::VariableNotInScope(token.lexeme));
                };

                Ok(vec![variable_context.push()])
            }
        }
    }
}

fn compile_array_read(
    tokenizer: &mut Tokenizer,
    module_context: &mut ModuleContext,
    variable_name: &str,
) -> FallableInstructions {
    let Some(variable_context) = module_context.scope.search_variable(variable_name) else {
        return Err(CompileError::VariableNotInScope(variable_name.to_string()));
    };
    let variable_context = variable_context.clone();

    let address = compile_array_address(tokenizer, module_context, &variable_context)?;

    let dereference = vec![
        vm::pop(vm::Segment::Pointer, 1),
        vm::push(vm::Segment::That, 0),
    ];

    Ok([address, dereference].concat())
}

fn compile_string_constant(s: &str) -> Vec<vm::VMInstruction> {
    let string_init = vec![
        vm::push(vm::Segment::Constant, s.chars().count()),
        vm::call("String.new", 1),
    ];

    // one runtime call per character
    let string_population = s
        .chars()
        .flat_map(|c| {
            vec![
                vm::push(vm::Segment::Constant, character_code(c)),
                vm::call("String.appendChar", 2),
            ]
        })
        .collect();

    [string_init, string_population].concat()
}

fn character_code(c: char) -> usize {
    c as usize
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
    fn test_integer_constant() {
        let mut module_context = ModuleContext::new();

        assert_eq!(
            compile_source("17", &mut module_context),
            Ok("push constant 17".to_string())
        );

        assert!(matches!(
            compile_source("32768", &mut module_context),
            Err(CompileError::IntegerOutOfRange { .. })
        ));
    }

    #[test]
    fn test_keyword_constants() {
        let mut module_context = ModuleContext::new();

        let expected = ["push constant 0", "not"].join("\n");
        assert_eq!(compile_source("true", &mut module_context), Ok(expected));

        assert_eq!(
            compile_source("false", &mut module_context),
            Ok("push constant 0".to_string())
        );
        assert_eq!(
            compile_source("null", &mut module_context),
            Ok("push constant 0".to_string())
        );
        assert_eq!(
            compile_source("this", &mut module_context),
            Ok("push pointer 0".to_string())
        );
    }

    #[test]
    fn test_string_constant() {
        let mut module_context = ModuleContext::new();

        let expected = [
            "push constant 3",
            "call String.new 1",
            "push constant 102",
            "call String.appendChar 2",
            "push constant 105",
            "call String.appendChar 2",
            "push constant 110",
            "call String.appendChar 2",
        ]
        .join("\n");

        assert_eq!(
            compile_source("\"fin\"", &mut module_context),
            Ok(expected)
        );
    }

    #[test]
    fn test_string_constant_with_multi_byte_characters() {
        let mut module_context = ModuleContext::new();

        // "è" is two bytes but one character - the reported length
        // and the appended code both follow characters, not bytes
        let expected = [
            "push constant 2",
            "call String.new 1",
            "push constant 232",
            "call String.appendChar 2",
            "push constant 65",
            "call String.appendChar 2",
        ]
        .join("\n");

        assert_eq!(
            compile_source("\"\u{e8}A\"", &mut module_context),
            Ok(expected)
        );
    }

    #[test]
    fn test_left_to_right_evaluation_without_precedence() {
        let mut module_context = ModuleContext::new();

        let expected = [
            "push constant 1",
            "push constant 2",
            "add",
            "push constant 3",
            "call Math.multiply 2",
        ]
        .join("\n");

        assert_eq!(
            compile_source("1 + 2 * 3", &mut module_context),
            Ok(expected)
        );
    }

    #[test]
    fn test_explicit_grouping() {
        let mut module_context = ModuleContext::new();

        let expected = [
            "push constant 1",
            "push constant 2",
            "push constant 3",
            "call Math.multiply 2",
            "add",
        ]
        .join("\n");

        assert_eq!(
            compile_source("1 + (2 * 3)", &mut module_context),
            Ok(expected)
        );
    }

    #[test]
    fn test_unary_operators() {
        let mut module_context = ModuleContext::new();

        let expected = ["push constant 5", "neg"].join("\n");
        assert_eq!(compile_source("-5", &mut module_context), Ok(expected));

        let expected = [
            "push constant 1",
            "push constant 2",
            "lt",
            "not",
        ]
        .join("\n");
        assert_eq!(
            compile_source("~(1 < 2)", &mut module_context),
            Ok(expected)
        );
    }

    #[test]
    fn test_shift_operators() {
        let mut module_context = ModuleContext::new();
        assert!(module_context.scope.define("x", "int", Kind::Local).is_ok());

        let expected = ["push local 0", "shiftleft"].join("\n");
        assert_eq!(compile_source("^x", &mut module_context), Ok(expected));

        let expected = ["push local 0", "shiftright"].join("\n");
        assert_eq!(compile_source("#x", &mut module_context), Ok(expected));
    }

    #[test]
    fn test_variable_resolution() {
        let mut module_context = ModuleContext::new();
        assert!(module_context
            .scope
            .define("size", "int", Kind::Field)
            .is_ok());

        let expected = ["push this 0", "push constant 1", "add"].join("\n");
        assert_eq!(
            compile_source("size + 1", &mut module_context),
            Ok(expected)
        );

        assert!(matches!(
            compile_source("missing", &mut module_context),
            Err(CompileError::VariableNotInScope(_))
        ));
    }

    #[test]
    fn test_array_read() {
        let mut module_context = ModuleContext::new();
        assert!(module_context
            .scope
            .define("values", "Array", Kind::Local)
            .is_ok());

        let expected = [
            "push constant 2",
            "push local 0",
            "add",
            "pop pointer 1",
            "push that 0",
        ]
        .join("\n");

        assert_eq!(
            compile_source("values[2]", &mut module_context),
            Ok(expected)
        );
    }
}
