//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone el texto de un
//! [`Source`] en unidades léxicas denominadas tokens, recorriéndolo una
//! sola vez de izquierda a derecha. Los espacios en blanco se descartan
//! durante esta operación. Cada token emitido está asociado a una
//! ubicación en el código fuente original, lo cual permite rastrear
//! errores tanto en los mismos como en constructos de fases posteriores.
//!
//! # Contenido de un token
//! Operadores y puntuación se identifican por el hecho de lo que son y no
//! incluyen lexemas; el texto original siempre puede recuperarse a partir
//! de [`Location::text()`]. Los identificadores son una única letra
//! minúscula y las constantes literales se resuelven a sus valores.
//!
//! # Reglas importantes del lenguaje
//! - Los operadores de dos caracteres (`==`, `!=`, `<=`, `>=`) tienen
//!   prioridad sobre los de un carácter.
//! - `ab` son dos identificadores consecutivos, no uno.
//! - Todo flujo de tokens termina en [`Token::Eof`], lo cual garantiza
//!   [`Tokens`].
//!
//! # Errores
//! El lexer se detiene en el primer error.

use crate::source::{Located, Location, Source};
use std::{
    fmt::{self, Display},
    ops::Deref,
    rc::Rc,
    vec,
};

use thiserror::Error;
use tracing::{debug, trace};

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexerError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("invalid token")]
    BadChar,

    /// Una constante entera no cabe en 64 bits con signo.
    ///
    /// Se reporta en el primer byte después de la constante y con el
    /// mismo mensaje que un carácter inválido.
    #[error("invalid token")]
    IntOverflow,
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir completamente
/// a una entidad léxica en el programa fuente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Variable de una letra.
    Id(char),

    /// Literal de entero.
    IntLiteral(i64),

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `/`
    Slash,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `<`
    Less,

    /// `<=`
    LessEqual,

    /// `>`
    Greater,

    /// `>=`
    GreaterEqual,

    /// `==`
    Equal,

    /// `!=`
    NotEqual,

    /// `=`
    Assign,

    /// `;`
    Semicolon,

    /// Fin de entrada.
    Eof,
}

/// Categoría léxica de un token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Reserved,
    Identifier,
    Number,
    Eof,
}

impl Token {
    /// Obtiene la categoría léxica.
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Id(_) => TokenKind::Identifier,
            Token::IntLiteral(_) => TokenKind::Number,
            Token::Eof => TokenKind::Eof,
            _ => TokenKind::Reserved,
        }
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Id(name) => write!(fmt, "{}", name),
            IntLiteral(integer) => write!(fmt, "{}", integer),
            Plus => fmt.write_str("+"),
            Minus => fmt.write_str("-"),
            Times => fmt.write_str("*"),
            Slash => fmt.write_str("/"),
            OpenParen => fmt.write_str("("),
            CloseParen => fmt.write_str(")"),
            Less => fmt.write_str("<"),
            LessEqual => fmt.write_str("<="),
            Greater => fmt.write_str(">"),
            GreaterEqual => fmt.write_str(">="),
            Equal => fmt.write_str("=="),
            NotEqual => fmt.write_str("!="),
            Assign => fmt.write_str("="),
            Semicolon => fmt.write_str(";"),
            Eof => fmt.write_str("end of input"),
        }
    }
}

/// Escáner sobre el texto de un origen.
///
/// El lexer es un iterador que emite tokens hasta [`Token::Eof`],
/// inclusive, o hasta el primer error. Luego de cualquiera de
/// los dos no emite nada más.
pub struct Lexer {
    source: Rc<Source>,
    next: usize,
    done: bool,
}

impl Lexer {
    /// Crea un lexer posicionado al inicio de un origen.
    pub fn new(source: &Rc<Source>) -> Self {
        Lexer {
            source: Rc::clone(source),
            next: 0,
            done: false,
        }
    }

    /// Intenta construir un siguiente token.
    ///
    /// Retorna el token junto con su rango en bytes, o el error
    /// junto con el desplazamiento donde ocurrió.
    fn lex(&mut self) -> Result<(Token, usize, usize), (LexerError, usize)> {
        use Token::*;

        let bytes = self.source.text().as_bytes();

        // Se descartan espacios en blanco, `\v` incluido
        while self.next < bytes.len() && char::from(bytes[self.next]).is_whitespace() {
            self.next += 1;
        }

        let start = self.next;
        let (c, lookahead) = match bytes.get(start) {
            None => return Ok((Eof, start, start)),
            Some(&c) => (c, bytes.get(start + 1).copied()),
        };

        // Switch table principal; los pares se prueban antes que los
        // operadores de un solo carácter
        let (token, length) = match (c, lookahead) {
            (b'=', Some(b'=')) => (Equal, 2),
            (b'!', Some(b'=')) => (NotEqual, 2),
            (b'<', Some(b'=')) => (LessEqual, 2),
            (b'>', Some(b'=')) => (GreaterEqual, 2),

            (b'+', _) => (Plus, 1),
            (b'-', _) => (Minus, 1),
            (b'*', _) => (Times, 1),
            (b'/', _) => (Slash, 1),
            (b'(', _) => (OpenParen, 1),
            (b')', _) => (CloseParen, 1),
            (b'<', _) => (Less, 1),
            (b'>', _) => (Greater, 1),
            (b'=', _) => (Assign, 1),
            (b';', _) => (Semicolon, 1),

            (c, _) if c.is_ascii_lowercase() => (Id(c as char), 1),

            // Acumulación dígito por dígito de constantes enteras
            (c, _) if c.is_ascii_digit() => {
                let digits = bytes[start..]
                    .iter()
                    .take_while(|digit| digit.is_ascii_digit())
                    .count();

                let value = bytes[start..start + digits]
                    .iter()
                    .try_fold(0i64, |accumulated, digit| {
                        accumulated
                            .checked_mul(10)
                            .and_then(|n| n.checked_add((digit - b'0') as i64))
                    })
                    .ok_or((LexerError::IntOverflow, start + digits))?;

                (IntLiteral(value), digits)
            }

            _ => return Err((LexerError::BadChar, start)),
        };

        self.next = start + length;
        Ok((token, start, self.next))
    }
}

impl Iterator for Lexer {
    type Item = Result<Located<Token>, Located<LexerError>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.lex() {
            Ok((token, start, end)) => {
                self.done = token == Token::Eof;

                let location = Location::new(&self.source, start..end);
                trace!(%token, %location, "token");

                Some(Ok(Located::at(token, location)))
            }

            Err((error, offset)) => {
                self.done = true;

                let width = self.source.text()[offset..]
                    .chars()
                    .next()
                    .map_or(0, char::len_utf8);

                let location = Location::new(&self.source, offset..offset + width);
                Some(Err(Located::at(error, location)))
            }
        }
    }
}

/// Flujo completo de tokens de un origen.
///
/// Solo [`tokenize()`] construye flujos, por lo cual todo flujo
/// termina en [`Token::Eof`] y nunca está vacío.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokens(Vec<Located<Token>>);

impl Deref for Tokens {
    type Target = [Located<Token>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for Tokens {
    type Item = Located<Token>;
    type IntoIter = vec::IntoIter<Located<Token>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Reduce un origen completo a una secuencia de tokens terminada en
/// [`Token::Eof`], o al primer error léxico encontrado.
pub fn tokenize(source: &Rc<Source>) -> Result<Tokens, Located<LexerError>> {
    let tokens = Lexer::new(source).collect::<Result<Vec<_>, _>>()?;
    debug!(source = source.name(), tokens = tokens.len(), "tokenized");

    Ok(Tokens(tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use Token::*;

    fn tokens(text: &str) -> Vec<Token> {
        let source = Source::new("<test>", text);
        tokenize(&source)
            .expect("lexical error")
            .into_iter()
            .map(Located::into_inner)
            .collect()
    }

    fn error(text: &str) -> (LexerError, usize) {
        let source = Source::new("<test>", text);
        let error = tokenize(&source).expect_err("expected a lexical error");
        (error.val().clone(), error.location().offset())
    }

    #[test]
    fn two_character_operators_win() {
        assert_eq!(
            tokens("a<=b>=c==d!=e"),
            vec![
                Id('a'),
                LessEqual,
                Id('b'),
                GreaterEqual,
                Id('c'),
                Equal,
                Id('d'),
                NotEqual,
                Id('e'),
                Eof
            ]
        );
    }

    #[test]
    fn single_character_punctuation() {
        assert_eq!(
            tokens("+-*/()<>=;"),
            vec![
                Plus, Minus, Times, Slash, OpenParen, CloseParen, Less, Greater, Assign, Semicolon,
                Eof
            ]
        );
    }

    #[test]
    fn numbers_and_whitespace() {
        assert_eq!(
            tokens("  12 +\t345\n;"),
            vec![IntLiteral(12), Plus, IntLiteral(345), Semicolon, Eof]
        );
    }

    #[test]
    fn identifiers_are_one_letter() {
        assert_eq!(tokens("ab"), vec![Id('a'), Id('b'), Eof]);
    }

    #[test]
    fn empty_input_is_just_eof() {
        assert_eq!(tokens(""), vec![Eof]);
        assert_eq!(tokens("   "), vec![Eof]);
    }

    #[test]
    fn locations_track_byte_offsets() {
        let source = Source::new("<test>", " 10 <= x;");
        let tokens = tokenize(&source).unwrap();

        let offsets: Vec<_> = tokens.iter().map(|t| t.location().offset()).collect();
        assert_eq!(offsets, vec![1, 4, 7, 8, 9]);

        let texts: Vec<_> = tokens.iter().map(|t| t.location().text()).collect();
        assert_eq!(texts, vec!["10", "<=", "x", ";", ""]);
    }

    #[test]
    fn token_kinds() {
        assert_eq!(Plus.kind(), TokenKind::Reserved);
        assert_eq!(Id('q').kind(), TokenKind::Identifier);
        assert_eq!(IntLiteral(7).kind(), TokenKind::Number);
        assert_eq!(Eof.kind(), TokenKind::Eof);
    }

    #[test]
    fn bad_characters() {
        assert_eq!(error("1 + @"), (LexerError::BadChar, 4));
        assert_eq!(error("!1"), (LexerError::BadChar, 0));
        assert_eq!(error("A=1;"), (LexerError::BadChar, 0));
        assert_eq!(error("1+é"), (LexerError::BadChar, 2));
    }

    #[test]
    fn literal_overflow() {
        assert_eq!(error("1+99999999999999999999;"), (LexerError::IntOverflow, 22));
        assert_eq!(error("9223372036854775808"), (LexerError::IntOverflow, 19));
        assert_eq!(tokens("9223372036854775807"), vec![IntLiteral(i64::MAX), Eof]);
        assert_eq!(LexerError::IntOverflow.to_string(), "invalid token");
    }

    #[test]
    fn overflow_at_end_of_input_has_empty_location() {
        let source = Source::new("<test>", "99999999999999999999");
        let error = tokenize(&source).unwrap_err();

        assert_eq!(error.location().offset(), 20);
        assert!(error.location().is_empty());
        assert_eq!(error.location().len(), 0);
    }

    #[test]
    fn every_ascii_space_is_skipped() {
        assert_eq!(tokens("1;\x0b"), vec![IntLiteral(1), Semicolon, Eof]);
        assert_eq!(tokens("\x0c1\r\n;"), vec![IntLiteral(1), Semicolon, Eof]);
    }

    #[test]
    fn streams_always_end_in_eof() {
        let source = Source::new("<test>", "a;");
        let tokens = tokenize(&source).unwrap();

        assert_eq!(tokens.len(), 3);
        assert_eq!(*tokens[2].val(), Eof);
        assert_eq!(tokens[2].location().len(), 0);
    }

    #[test]
    fn lexer_stops_after_error() {
        let source = Source::new("<test>", "1 $ 2");
        let mut lexer = Lexer::new(&source);

        assert!(matches!(lexer.next(), Some(Ok(_))));
        assert!(matches!(lexer.next(), Some(Err(_))));
        assert!(lexer.next().is_none());
    }

    #[test]
    fn tokenizing_is_repeatable() {
        let source = Source::new("<test>", "a = b = 5; a >= 3 * (b - 1);");
        assert_eq!(tokenize(&source).unwrap(), tokenize(&source).unwrap());
    }
}
