//! Reporte de errores de compilación.
//!
//! Un error con ubicación se presenta como la línea de código fuente
//! donde ocurrió, seguida de una línea con un `^` bajo el byte exacto
//! y el mensaje:
//!
//! ```text
//! 1+;
//!   ^ expected a number
//! ```

use crate::source::{Located, Location};
use std::{
    error::Error,
    fmt::{self, Debug, Display},
};

mod sealed {
    pub trait Sealed {}
}

pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

/// Error fatal de compilación, listo para mostrarse.
pub struct Diagnostics {
    kind: &'static str,
    error: Box<dyn 'static + LocatedError>,
}

impl Diagnostics {
    /// Clasifica el error (léxico, sintáctico, semántico).
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }

    /// Obtiene la clasificación del error.
    pub fn kind_name(&self) -> &'static str {
        self.kind
    }

    /// Obtiene la ubicación del error.
    pub fn location(&self) -> &Location {
        self.error.location()
    }

    /// Mensaje del error, sin contexto de fuente.
    pub fn message(&self) -> String {
        self.error.source().to_string()
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            kind: "error",
            error: Box::new(error),
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self.error.location();
        let (line, column) = location.source().line_at(location.offset());

        writeln!(fmt, "{}", line)?;
        writeln!(fmt, "{:column$}^ {}", "", self.error.source(), column = column)
    }
}

impl Debug for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "{}: {} at {}",
            self.kind,
            self.error.source(),
            self.error.location()
        )
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("something broke")]
    struct Broken;

    fn diagnose(text: &str, offset: usize) -> Diagnostics {
        let source = Source::new("<test>", text);
        let location = Location::new(&source, offset..offset);
        Diagnostics::from(Located::at(Broken, location)).kind("Test error")
    }

    #[test]
    fn caret_under_offset() {
        assert_eq!(diagnose("1+;", 2).to_string(), "1+;\n  ^ something broke\n");
        assert_eq!(diagnose("x", 0).to_string(), "x\n^ something broke\n");
    }

    #[test]
    fn caret_past_the_end() {
        assert_eq!(diagnose("1+2", 3).to_string(), "1+2\n   ^ something broke\n");
    }

    #[test]
    fn only_the_offending_line_is_shown() {
        let diagnostics = diagnose("a=1;\nb=*;\n", 7);
        assert_eq!(diagnostics.to_string(), "b=*;\n  ^ something broke\n");
    }

    #[test]
    fn kind_and_message() {
        let diagnostics = diagnose("1", 0);
        assert_eq!(diagnostics.kind_name(), "Test error");
        assert_eq!(diagnostics.message(), "something broke");
        assert_eq!(diagnostics.location().offset(), 0);
    }
}
