//! Compilador de expresiones aritméticas a ensamblador x86-64.
//!
//! # Front end
//! Cada programa deriva de un único texto fuente, descrito por
//! [`source::Source`]. Este texto se somete primero a análisis léxico
//! en [`lex`], de lo cual se obtiene un flujo de tokens. El flujo de
//! tokens se dispone en un AST por medio de análisis sintáctico en
//! [`parse`]. El árbol sintáctico se reduce en [`semantic`] a la
//! representación intermedia de una máquina de pila descrita en
//! [`ir`], con lo cual concluyen las fases delanteras del compilador.
//!
//! # Back end
//! La representación intermedia se traduce a texto ensamblador en
//! [`target`], en cualquiera de los dialectos soportados. El texto
//! puede escribirse tal cual o entregarse a [`link`] para producir
//! un ejecutable. Alternativamente, [`vm`] ejecuta la representación
//! intermedia directamente.
//!
//! # Errores
//! Cada fase se detiene en su primer error. [`compile()`] reúne los
//! errores de todas las fases en [`error::Diagnostics`].

#[macro_use]
mod macros;

pub mod error;
pub mod ir;
pub mod lex;
pub mod link;
pub mod parse;
pub mod semantic;
pub mod source;
pub mod vm;

mod codegen;
mod dialect;

use std::rc::Rc;

use error::Diagnostics;
use source::Source;

/// Emisión de código.
///
/// Este módulo reexporta suficientes ítems internos relacionados a generación de código para
/// traducir IR a texto ensamblador en algún dialecto en específico.
pub mod target {
    pub use crate::codegen::emit;
    pub use crate::dialect::{Dialect, UnknownDialect};
}

/// Ejecuta todas las fases delanteras sobre un origen.
///
/// Un programa que se obtiene de aquí siempre puede emitirse.
pub fn compile(source: &Rc<Source>) -> Result<ir::Program, Diagnostics> {
    let tokens = lex::tokenize(source)
        .map_err(|error| Diagnostics::from(error).kind("Lexical error"))?;

    let ast = parse::parse(&tokens)
        .map_err(|error| Diagnostics::from(error).kind("Syntax error"))?;

    ast.lower()
        .map_err(|error| Diagnostics::from(error).kind("Semantic error"))
}
