//! Emisión de código ensamblador.
//!
//! Traduce un [`Program`] a texto de ensamblador x86-64. Cada
//! instrucción de la máquina de pila se expande a una secuencia fija
//! de instrucciones reales que se comunican únicamente por medio de
//! la pila de hardware, utilizando `rax` y `rdi` como registros de
//! trabajo.

use crate::{
    dialect::{Dialect, Operand, Reg::*, Syntax},
    ir::{Instruction, Program, Slot, FRAME_SIZE},
    parse::BinOp,
};

use std::{
    io::{self, Write},
    marker::PhantomData,
};

/// Símbolo de entrada del programa generado.
const ENTRY: &str = "main";

/// Escribe un programa completo, incluyendo prólogo y epílogo.
pub fn emit<W: Write>(program: &Program, dialect: Dialect, output: &mut W) -> io::Result<()> {
    dispatch_dialect!(S: dialect => Context::<S, W>::new(output).program(program))
}

struct Context<'a, S, W> {
    output: &'a mut W,
    syntax: PhantomData<S>,
}

impl<'a, S: Syntax, W: Write> Context<'a, S, W> {
    fn new(output: &'a mut W) -> Self {
        Context {
            output,
            syntax: PhantomData,
        }
    }

    fn program(mut self, program: &Program) -> io::Result<()> {
        if let Some(directive) = S::DIRECTIVE {
            writeln!(self.output, "{}", directive)?;
        }

        writeln!(self.output, ".globl {0}\n{0}:", ENTRY)?;

        // Prólogo, crea un stack frame con espacio para todas las variables
        emit!(self, "push", Rbp)?;
        emit!(self, "mov", Rbp, Rsp)?;
        emit!(self, "sub", Rsp, FRAME_SIZE)?;
        writeln!(self.output)?;

        for instruction in &program.code {
            self.put_instruction(instruction)?;
        }

        // Epílogo, el resultado de la última sentencia ya está en rax
        emit!(self, "mov", Rsp, Rbp)?;
        emit!(self, "pop", Rbp)?;
        emit!(self, "ret")?;

        self.output.flush()
    }

    fn put_instruction(&mut self, instruction: &Instruction) -> io::Result<()> {
        use Instruction::*;

        match instruction {
            Push(value) => self.push_const(*value),
            PushAddress(slot) => self.push_address(*slot),

            Load => {
                emit!(self, "pop", Rax)?;
                emit!(self, "mov", Rax, Operand::Deref(Rax))?;
                emit!(self, "push", Rax)
            }

            Store => {
                emit!(self, "pop", Rdi)?;
                emit!(self, "pop", Rax)?;
                emit!(self, "mov", Operand::Deref(Rax), Rdi)?;
                emit!(self, "push", Rdi)
            }

            Binary(op) => {
                emit!(self, "pop", Rdi)?;
                emit!(self, "pop", Rax)?;
                self.binary(*op)?;
                emit!(self, "push", Rax)
            }

            // Fin de sentencia, el valor queda en rax
            Discard => {
                emit!(self, "pop", Rax)?;
                writeln!(self.output)
            }
        }
    }

    fn push_const(&mut self, value: i64) -> io::Result<()> {
        // `push` solo acepta inmediatos de 32 bits con extensión de signo
        if i32::try_from(value).is_ok() {
            emit!(self, "push", value)
        } else {
            emit!(self, "movabs", Rax, value)?;
            emit!(self, "push", Rax)
        }
    }

    fn push_address(&mut self, slot: Slot) -> io::Result<()> {
        emit!(self, "mov", Rax, Rbp)?;
        emit!(self, "sub", Rax, slot.offset())?;
        emit!(self, "push", Rax)
    }

    /// Aplica `rax op rdi`, dejando el resultado en rax.
    fn binary(&mut self, op: BinOp) -> io::Result<()> {
        use BinOp::*;

        let set = match op {
            Add => return emit!(self, "add", Rax, Rdi),
            Sub => return emit!(self, "sub", Rax, Rdi),
            Mul => return emit!(self, "imul", Rax, Rdi),
            Div => {
                emit!(self, "cqo")?;
                return emit!(self, "idiv", Rdi);
            }

            Equal => "sete",
            NotEqual => "setne",
            Less => "setl",
            LessOrEqual => "setle",
        };

        emit!(self, "cmp", Rax, Rdi)?;
        emit!(self, set, Al)?;
        emit!(self, "movzb", Rax, Al)
    }

    fn instruction(&mut self, mnemonic: &'static str, operands: &[Operand]) -> io::Result<()> {
        let mnemonic = S::mnemonic(mnemonic);
        if operands.is_empty() {
            return writeln!(self.output, "\t{}", mnemonic);
        }

        let mut operands: Vec<_> = operands.iter().map(|&operand| S::operand(operand)).collect();
        if S::SOURCE_FIRST {
            operands.reverse();
        }

        writeln!(self.output, "\t{:8}{}", mnemonic, operands.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Instruction::*;

    fn render(code: Vec<Instruction>, dialect: Dialect) -> String {
        let mut output = Vec::new();
        emit(&Program { code }, dialect, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    fn lines(text: &str) -> Vec<String> {
        text.lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect()
    }

    #[test]
    fn intel_prologue_and_epilogue() {
        let text = render(vec![Push(42), Discard], Dialect::Intel);
        assert_eq!(
            lines(&text),
            vec![
                ".intel_syntax noprefix",
                ".globl main",
                "main:",
                "push rbp",
                "mov rbp, rsp",
                "sub rsp, 208",
                "push 42",
                "pop rax",
                "mov rsp, rbp",
                "pop rbp",
                "ret",
            ]
        );
    }

    #[test]
    fn att_reverses_operands() {
        let text = render(vec![Push(1), Discard], Dialect::Att);
        let lines = lines(&text);

        assert_eq!(lines[0], ".globl main");
        assert!(lines.contains(&"mov %rsp, %rbp".to_owned()));
        assert!(lines.contains(&"sub $208, %rsp".to_owned()));
        assert!(lines.contains(&"push $1".to_owned()));
    }

    #[test]
    fn variable_access() {
        let b = Slot::from_name('b').unwrap();
        let text = render(vec![PushAddress(b), Load, Discard], Dialect::Intel);

        let lines = lines(&text);
        let body = &lines[6..lines.len() - 3];
        assert_eq!(
            body,
            &[
                "mov rax, rbp",
                "sub rax, 16",
                "push rax",
                "pop rax",
                "mov rax, [rax]",
                "push rax",
                "pop rax",
            ]
        );
    }

    #[test]
    fn store_keeps_value() {
        let text = render(vec![Store], Dialect::Att);
        let lines = lines(&text);
        let body = &lines[5..lines.len() - 3];
        assert_eq!(
            body,
            &["pop %rdi", "pop %rax", "mov %rdi, (%rax)", "push %rdi"]
        );
    }

    #[test]
    fn comparisons_produce_booleans() {
        let text = render(vec![Binary(BinOp::LessOrEqual)], Dialect::Intel);
        let lines = lines(&text);
        let body = &lines[6..lines.len() - 3];
        assert_eq!(
            body,
            &[
                "pop rdi",
                "pop rax",
                "cmp rax, rdi",
                "setle al",
                "movzb rax, al",
                "push rax",
            ]
        );
    }

    #[test]
    fn division_sign_extends() {
        let text = render(vec![Binary(BinOp::Div)], Dialect::Att);
        assert!(text.contains("\tcqto\n"));
        assert!(text.contains("idiv    %rdi"));
    }

    #[test]
    fn wide_literals_go_through_rax() {
        let text = render(vec![Push(1 << 40), Discard], Dialect::Intel);
        assert!(text.contains("movabs  rax, 1099511627776"));
        assert!(!text.contains("push    1099511627776"));
    }
}
