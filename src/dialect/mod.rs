//! Dialectos de ensamblador.
//!
//! El código generado es siempre x86-64, pero puede escribirse en
//! sintaxis Intel o AT&T. Cada dialecto implementa [`Syntax`], la cual
//! define cómo se deletrean registros, operandos inmediatos, accesos
//! a memoria y el orden de operandos. En general, debe utilizarse la
//! macro `dispatch_dialect!()` para acceder a estas implementaciones.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use thiserror::Error;
use unicase::Ascii as NoCase;

mod att;
mod intel;

pub use att::Att;
pub use intel::Intel;

/// Dialecto de ensamblador.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dialect {
    Intel,
    Att,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown assembly syntax `{0}`, expected `intel` or `att`")]
pub struct UnknownDialect(String);

impl Display for Dialect {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Intel => fmt.write_str("intel"),
            Dialect::Att => fmt.write_str("att"),
        }
    }
}

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        const DIALECTS: &[(NoCase<&str>, Dialect)] = &[
            (NoCase::new("intel"), Dialect::Intel),
            (NoCase::new("att"),   Dialect::Att),
            (NoCase::new("at&t"),  Dialect::Att),
        ];

        DIALECTS
            .iter()
            .find(|&&(name, _)| name == NoCase::new(string))
            .map(|&(_, dialect)| dialect)
            .ok_or_else(|| UnknownDialect(string.to_owned()))
    }
}

/// Registros que utiliza el generador de código.
///
/// `rax` funge como acumulador y `rdi` como segundo operando.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reg {
    Rax,
    Rdi,
    Rbp,
    Rsp,
    Al,
}

impl Reg {
    pub fn name(self) -> &'static str {
        match self {
            Reg::Rax => "rax",
            Reg::Rdi => "rdi",
            Reg::Rbp => "rbp",
            Reg::Rsp => "rsp",
            Reg::Al => "al",
        }
    }
}

/// Operando de una instrucción.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operand {
    Reg(Reg),
    Imm(i64),

    /// Palabra en la dirección contenida por un registro.
    Deref(Reg),
}

impl From<Reg> for Operand {
    fn from(reg: Reg) -> Self {
        Operand::Reg(reg)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Imm(value)
    }
}

impl From<u32> for Operand {
    fn from(value: u32) -> Self {
        Operand::Imm(value as i64)
    }
}

/// Ortografía de un dialecto.
///
/// El generador de código siempre describe instrucciones en orden
/// Intel (destino primero); cada dialecto se encarga de reordenar.
pub trait Syntax {
    /// Directiva que selecciona el dialecto en el ensamblador, si aplica.
    const DIRECTIVE: Option<&'static str>;

    /// Los operandos se escriben con la fuente primero.
    const SOURCE_FIRST: bool;

    /// Nombre de una instrucción en este dialecto.
    fn mnemonic(mnemonic: &'static str) -> &'static str {
        mnemonic
    }

    /// Escribe un operando.
    fn operand(operand: Operand) -> String;
}
