//! Intérprete de referencia para la representación intermedia.
//!
//! Ejecuta un [`ir::Program`] con la misma semántica que el código
//! emitido: una pila de evaluación, 26 slots de una palabra y un
//! acumulador que conserva el último valor descartado. Las direcciones
//! de slots se modelan como desplazamientos negativos respecto a la
//! base del frame, igual que `rbp - offset`.

use crate::{
    ir::{self, Instruction, Slot, SLOT_COUNT, WORD_SIZE},
    parse::BinOp,
};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("division overflow")]
    DivisionOverflow,

    #[error("evaluation stack underflow at instruction {0}")]
    StackUnderflow(usize),

    #[error("address {0} does not name a variable slot")]
    BadAddress(i64),
}

/// Estado de ejecución.
#[derive(Debug, Clone)]
pub struct Machine {
    stack: Vec<i64>,
    slots: [i64; SLOT_COUNT as usize],
    accumulator: i64,
}

impl Default for Machine {
    fn default() -> Self {
        Machine {
            stack: Vec::new(),
            slots: [0; SLOT_COUNT as usize],
            accumulator: 0,
        }
    }
}

impl Machine {
    /// Ejecuta un programa completo y retorna su resultado.
    pub fn run(&mut self, program: &ir::Program) -> Result<i64, RuntimeError> {
        for (index, instruction) in program.code.iter().enumerate() {
            self.step(index, *instruction)?;
        }

        Ok(self.accumulator)
    }

    /// Lee el valor actual de una variable.
    pub fn slot(&self, slot: Slot) -> i64 {
        self.slots[slot.index()]
    }

    fn step(&mut self, index: usize, instruction: Instruction) -> Result<(), RuntimeError> {
        use Instruction::*;

        match instruction {
            Push(value) => self.stack.push(value),
            PushAddress(slot) => self.stack.push(-(slot.offset() as i64)),

            Load => {
                let address = self.pop(index)?;
                let value = self.slots[slot_at(address)?];
                self.stack.push(value);
            }

            Store => {
                let value = self.pop(index)?;
                let address = self.pop(index)?;
                self.slots[slot_at(address)?] = value;
                self.stack.push(value);
            }

            Binary(op) => {
                let rhs = self.pop(index)?;
                let lhs = self.pop(index)?;
                self.stack.push(apply(op, lhs, rhs)?);
            }

            Discard => self.accumulator = self.pop(index)?,
        }

        Ok(())
    }

    fn pop(&mut self, index: usize) -> Result<i64, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow(index))
    }
}

/// Aplica un operador con la semántica de x86-64: aritmética modular,
/// división truncada hacia cero que falla en los mismos casos que `idiv`.
fn apply(op: BinOp, lhs: i64, rhs: i64) -> Result<i64, RuntimeError> {
    use BinOp::*;

    let result = match op {
        Add => lhs.wrapping_add(rhs),
        Sub => lhs.wrapping_sub(rhs),
        Mul => lhs.wrapping_mul(rhs),
        Div => match (lhs, rhs) {
            (_, 0) => return Err(RuntimeError::DivisionByZero),
            (i64::MIN, -1) => return Err(RuntimeError::DivisionOverflow),
            _ => lhs / rhs,
        },

        Equal => (lhs == rhs) as i64,
        NotEqual => (lhs != rhs) as i64,
        Less => (lhs < rhs) as i64,
        LessOrEqual => (lhs <= rhs) as i64,
    };

    Ok(result)
}

fn slot_at(address: i64) -> Result<usize, RuntimeError> {
    let word = WORD_SIZE as i64;
    let offset = address.wrapping_neg();

    if offset % word != 0 || !(1..=SLOT_COUNT as i64).contains(&(offset / word)) {
        return Err(RuntimeError::BadAddress(address));
    }

    Ok((offset / word - 1) as usize)
}
