//! Reducción del árbol sintáctico a representación intermedia.
//!
//! Cada sentencia se recorre en post-orden: los hijos de un nodo
//! dejan sus valores en la pila antes de que el nodo los consuma.
//! Esta fase es también la que verifica que el lado izquierdo de
//! toda asignación sea una variable, por lo cual un programa que
//! la supera siempre puede emitirse.
//!
//! El recorrido usa una pila explícita de tareas, ya que la
//! profundidad de un árbol no está acotada.

use thiserror::Error;
use tracing::debug;

use crate::{
    ir::{self, Instruction},
    parse::{self, Expr},
    source::Located,
};

pub type Semantic<T> = Result<T, Located<SemanticError>>;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("left side of assignment isn't a variable")]
    NotAnLvalue,
}

/// Destino de instrucciones generadas.
trait Sink {
    fn push(&mut self, instruction: Instruction);
}

impl Sink for Vec<Instruction> {
    fn push(&mut self, instruction: Instruction) {
        Vec::push(self, instruction)
    }
}

impl parse::Ast {
    /// Genera el programa en representación intermedia.
    ///
    /// El resultado de cada sentencia se descarta al terminarla; el
    /// último valor descartado es el resultado del programa. Un
    /// programa vacío tiene resultado cero.
    pub fn lower(&self) -> Semantic<ir::Program> {
        let mut code = Vec::new();

        for statement in self.statements() {
            eval(&mut code, statement)?;
            code.push(Instruction::Discard);
        }

        if code.is_empty() {
            code.push(Instruction::Push(0));
            code.push(Instruction::Discard);
        }

        debug!(instructions = code.len(), "lowered");
        Ok(ir::Program { code })
    }
}

/// Trabajo pendiente durante el recorrido.
enum Task<'a> {
    Eval(&'a Located<Expr>),
    Emit(Instruction),
}

/// Deja en la pila el valor de una expresión.
///
/// Los errores se detectan en el mismo orden que en un recorrido
/// recursivo de izquierda a derecha.
fn eval<S: Sink>(sink: &mut S, expr: &Located<Expr>) -> Semantic<()> {
    let mut tasks = vec![Task::Eval(expr)];

    while let Some(task) = tasks.pop() {
        let expr = match task {
            Task::Emit(instruction) => {
                sink.push(instruction);
                continue;
            }

            Task::Eval(expr) => expr,
        };

        // Las tareas se apilan en orden inverso de ejecución
        match expr.as_ref() {
            Expr::Integer(value) => sink.push(Instruction::Push(*value)),

            Expr::Variable(slot) => {
                sink.push(Instruction::PushAddress(*slot));
                sink.push(Instruction::Load);
            }

            Expr::Assign(target, value) => {
                address(sink, target)?;
                tasks.push(Task::Emit(Instruction::Store));
                tasks.push(Task::Eval(value));
            }

            Expr::Binary(lhs, op, rhs) => {
                tasks.push(Task::Emit(Instruction::Binary(*op)));
                tasks.push(Task::Eval(rhs));
                tasks.push(Task::Eval(lhs));
            }
        }
    }

    Ok(())
}

/// Deja en la pila la dirección de un lvalue.
fn address<S: Sink>(sink: &mut S, expr: &Located<Expr>) -> Semantic<()> {
    match expr.as_ref() {
        Expr::Variable(slot) => {
            sink.push(Instruction::PushAddress(*slot));
            Ok(())
        }

        _ => Err(Located::at(
            SemanticError::NotAnLvalue,
            expr.location().clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::Slot,
        lex::tokenize,
        parse::{parse, BinOp},
        source::Source,
    };
    use Instruction::*;

    fn lower(text: &str) -> Semantic<ir::Program> {
        let source = Source::new("<test>", text);
        let tokens = tokenize(&source).unwrap();
        parse(&tokens).unwrap().lower()
    }

    fn slot(name: char) -> Slot {
        Slot::from_name(name).unwrap()
    }

    #[test]
    fn binary_operands_in_post_order() {
        let program = lower("1-2;").unwrap();
        assert_eq!(
            program.code,
            vec![Push(1), Push(2), Binary(BinOp::Sub), Discard]
        );
    }

    #[test]
    fn reads_load_through_the_address() {
        let program = lower("c;").unwrap();
        assert_eq!(program.code, vec![PushAddress(slot('c')), Load, Discard]);
    }

    #[test]
    fn assignment_pushes_target_address_first() {
        let program = lower("a=b=5;").unwrap();
        assert_eq!(
            program.code,
            vec![
                PushAddress(slot('a')),
                PushAddress(slot('b')),
                Push(5),
                Store,
                Store,
                Discard
            ]
        );
    }

    #[test]
    fn every_statement_is_discarded() {
        let program = lower("1;2;3;").unwrap();
        let discards = program.code.iter().filter(|i| **i == Discard).count();
        assert_eq!(discards, 3);
        assert_eq!(program.code.last(), Some(&Discard));
    }

    #[test]
    fn empty_program_yields_zero() {
        assert_eq!(lower("").unwrap().code, vec![Push(0), Discard]);
    }

    #[test]
    fn non_variable_targets_are_rejected() {
        let error = lower("1=2;").unwrap_err();
        assert_eq!(*error.val(), SemanticError::NotAnLvalue);
        assert_eq!(error.location().offset(), 0);

        let error = lower("a=1; (a+1)=2;").unwrap_err();
        assert_eq!(error.location().text(), "(a+1)");
        assert_eq!(error.location().offset(), 5);
    }

    #[test]
    fn nested_invalid_targets_are_found() {
        let error = lower("a = 1 = 2;").unwrap_err();
        assert_eq!(error.location().text(), "1");
    }

    #[test]
    fn leftmost_invalid_target_wins() {
        let error = lower("(1=2) + (3=4);").unwrap_err();
        assert_eq!(error.location().text(), "1");

        let error = lower("(a=(1=2)) * (3=4);").unwrap_err();
        assert_eq!(error.location().offset(), 4);
    }

    #[test]
    fn deep_trees_lower_without_recursion() {
        let depth = 200_000;
        let text = format!("{}1;", "-".repeat(depth));
        let program = lower(&text).unwrap();

        // Un cero y una resta por signo, más el literal y el descarte
        assert_eq!(program.code.len(), 2 * depth + 2);
        assert_eq!(program.code[depth], Push(1));
        assert_eq!(program.code.last(), Some(&Discard));
    }
}
