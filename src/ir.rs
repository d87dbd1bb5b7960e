//! Representación intermedia.
//!
//! Un programa se reduce a una secuencia plana de instrucciones para
//! una máquina de pila. Cada instrucción consume sus operandos de la
//! pila de evaluación y deja ahí su resultado, por lo cual no existe
//! asignación de registros.

use crate::parse::BinOp;
use std::fmt::{self, Display};

/// Tamaño de una palabra de máquina, en bytes.
pub const WORD_SIZE: u32 = 8;

/// Cantidad de variables posibles, una por letra minúscula.
pub const SLOT_COUNT: u32 = 26;

/// Espacio que reserva el prólogo para todas las variables.
pub const FRAME_SIZE: u32 = SLOT_COUNT * WORD_SIZE;

/// Espacio de almacenamiento de una variable.
///
/// Cada letra corresponde siempre al mismo slot, ubicado a
/// `(letra - 'a' + 1) * WORD_SIZE` bytes por debajo del frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Slot(u8);

impl Slot {
    /// Resuelve el slot de una variable. Solo `'a'..='z'` son válidas.
    pub fn from_name(name: char) -> Option<Slot> {
        if name.is_ascii_lowercase() {
            Some(Slot(name as u8 - b'a'))
        } else {
            None
        }
    }

    /// Letra de la variable.
    pub fn name(self) -> char {
        (b'a' + self.0) as char
    }

    /// Índice del slot, de 0 a 25.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Desplazamiento en bytes por debajo del frame.
    pub fn offset(self) -> u32 {
        (self.0 as u32 + 1) * WORD_SIZE
    }
}

impl Display for Slot {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub code: Vec<Instruction>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Apila una constante.
    Push(i64),

    /// Apila la dirección de un slot (lvalue).
    PushAddress(Slot),

    /// Reemplaza una dirección en el tope por el valor que contiene.
    Load,

    /// Desapila un valor y una dirección, almacena el valor en la
    /// dirección y vuelve a apilar el valor.
    Store,

    /// Desapila `rhs` y luego `lhs`, apila `lhs op rhs`.
    Binary(BinOp),

    /// Desapila el resultado de una sentencia hacia el acumulador.
    Discard,
}

impl Display for Instruction {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match self {
            Push(value) => write!(fmt, "push {}", value),
            PushAddress(slot) => write!(fmt, "addr {}", slot),
            Load => fmt.write_str("load"),
            Store => fmt.write_str("store"),
            Binary(op) => write!(fmt, "binary {}", op),
            Discard => fmt.write_str("discard"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_distinct_and_stable() {
        let offsets: Vec<_> = ('a'..='z')
            .map(|name| Slot::from_name(name).unwrap().offset())
            .collect();

        assert_eq!(offsets.first(), Some(&8));
        assert_eq!(offsets.last(), Some(&FRAME_SIZE));
        assert!(offsets.windows(2).all(|pair| pair[1] == pair[0] + WORD_SIZE));
    }

    #[test]
    fn only_lowercase_letters_have_slots() {
        assert_eq!(Slot::from_name('q').map(Slot::name), Some('q'));
        assert_eq!(Slot::from_name('A'), None);
        assert_eq!(Slot::from_name('1'), None);
    }
}
