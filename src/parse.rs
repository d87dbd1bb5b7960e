//! Análisis sintáctico.
//!
//! Parser descendente recursivo con una función por regla de la
//! gramática, de menor a mayor precedencia:
//!
//! ```text
//! program        = statement*
//! statement      = expression ";"
//! expression     = assignment
//! assignment     = equality ("=" assignment)?
//! equality       = relational (("==" | "!=") relational)*
//! relational     = additive (("<" | "<=" | ">" | ">=") additive)*
//! additive       = multiplicative (("+" | "-") multiplicative)*
//! multiplicative = unary (("*" | "/") unary)*
//! unary          = ("+" | "-") unary | primary
//! primary        = number | identifier | "(" expression ")"
//! ```
//!
//! Toda ambigüedad se resuelve con un único token de lookahead, por
//! lo cual no hay backtracking. `>` y `>=` se reescriben como `<` y
//! `<=` con operandos invertidos, y `-x` como `0 - x`.
//!
//! # Profundidad
//! Solamente los paréntesis anidan llamadas del parser; las demás
//! reglas iteran. Los paréntesis admiten hasta [`MAX_NESTING`] niveles.
//! Los árboles resultantes pueden ser arbitrariamente profundos, por lo
//! cual ni su destrucción ni las fases posteriores los recorren de
//! forma recursiva.

use std::{
    fmt::{self, Display},
    mem,
};
use thiserror::Error;
use tracing::debug;

use crate::{
    ir::Slot,
    lex::{Token, Tokens},
    source::{Located, Location},
};

/// Árbol sintáctico de un programa: sentencias en orden de ejecución.
#[derive(Debug)]
pub struct Ast(Vec<Located<Expr>>);

impl Ast {
    /// Sentencias del programa, en orden de fuente.
    pub fn statements(&self) -> &[Located<Expr>] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Integer(i64),
    Variable(Slot),
    Binary(Box<Located<Expr>>, BinOp, Box<Located<Expr>>),
    Assign(Box<Located<Expr>>, Box<Located<Expr>>),
}

impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach(self, &mut pending);

        while let Some(node) = pending.pop() {
            let mut expr = node.into_inner();
            detach(&mut expr, &mut pending);
        }
    }
}

/// Desprende los hijos compuestos de un nodo, dejando hojas en su lugar.
fn detach(expr: &mut Expr, pending: &mut Vec<Located<Expr>>) {
    if let Expr::Binary(lhs, _, rhs) | Expr::Assign(lhs, rhs) = expr {
        for child in [lhs, rhs] {
            if matches!(child.val(), Expr::Binary(..) | Expr::Assign(..)) {
                let leaf = Located::at(Expr::Integer(0), child.location().clone());
                pending.push(mem::replace(&mut **child, leaf));
            }
        }
    }
}

/// Operador binario.
///
/// No existen variantes para `>` ni `>=`: el parser nunca las construye.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
}

impl Display for BinOp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinOp::*;

        let string = match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            LessOrEqual => "<=",
        };

        fmt.write_str(string)
    }
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("expected {0}")]
    Expected(Token),

    #[error("expected a number")]
    ExpectedNumber,

    #[error("parentheses nested deeper than {} levels", MAX_NESTING)]
    TooDeep,
}

/// Máximo de paréntesis abiertos a la vez.
pub const MAX_NESTING: usize = 256;

/// Construye el árbol sintáctico a partir de un flujo de tokens.
///
/// El flujo proviene de [`crate::lex::tokenize()`].
pub fn parse(tokens: &Tokens) -> Result<Ast, Located<ParserError>> {
    let mut parser = Parser::new(tokens);
    let ast = parser.program()?;

    debug!(statements = ast.0.len(), "parsed");
    Ok(ast)
}

type Parse<T> = Result<T, Located<ParserError>>;

/// Cursor sobre el flujo de tokens.
///
/// Nunca avanza más allá del último token, el cual siempre es
/// [`Token::Eof`].
struct Parser<'a> {
    tokens: &'a Tokens,
    position: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a Tokens) -> Self {
        Parser {
            tokens,
            position: 0,
            depth: 0,
        }
    }

    fn program(&mut self) -> Parse<Ast> {
        let mut statements = Vec::new();
        while !self.at_eof() {
            statements.push(self.statement()?);
        }

        Ok(Ast(statements))
    }

    fn statement(&mut self) -> Parse<Located<Expr>> {
        let expr = self.expression()?;
        self.expect(Token::Semicolon)?;

        Ok(expr)
    }

    fn expression(&mut self) -> Parse<Located<Expr>> {
        self.assignment()
    }

    fn assignment(&mut self) -> Parse<Located<Expr>> {
        let mut value = self.equality()?;
        let mut targets = Vec::new();

        while self.consume(Token::Assign) {
            let next = self.equality()?;
            targets.push(mem::replace(&mut value, next));
        }

        // Asociatividad derecha: `a = b = c` es `a = (b = c)`
        while let Some(target) = targets.pop() {
            value = assign(target, value);
        }

        Ok(value)
    }

    fn equality(&mut self) -> Parse<Located<Expr>> {
        let mut node = self.relational()?;

        loop {
            node = if self.consume(Token::Equal) {
                binary(node, BinOp::Equal, self.relational()?)
            } else if self.consume(Token::NotEqual) {
                binary(node, BinOp::NotEqual, self.relational()?)
            } else {
                break Ok(node);
            }
        }
    }

    fn relational(&mut self) -> Parse<Located<Expr>> {
        let mut node = self.additive()?;

        loop {
            node = if self.consume(Token::Less) {
                binary(node, BinOp::Less, self.additive()?)
            } else if self.consume(Token::LessEqual) {
                binary(node, BinOp::LessOrEqual, self.additive()?)
            } else if self.consume(Token::Greater) {
                binary(self.additive()?, BinOp::Less, node)
            } else if self.consume(Token::GreaterEqual) {
                binary(self.additive()?, BinOp::LessOrEqual, node)
            } else {
                break Ok(node);
            }
        }
    }

    fn additive(&mut self) -> Parse<Located<Expr>> {
        let mut node = self.multiplicative()?;

        loop {
            node = if self.consume(Token::Plus) {
                binary(node, BinOp::Add, self.multiplicative()?)
            } else if self.consume(Token::Minus) {
                binary(node, BinOp::Sub, self.multiplicative()?)
            } else {
                break Ok(node);
            }
        }
    }

    fn multiplicative(&mut self) -> Parse<Located<Expr>> {
        let mut node = self.unary()?;

        loop {
            node = if self.consume(Token::Times) {
                binary(node, BinOp::Mul, self.unary()?)
            } else if self.consume(Token::Slash) {
                binary(node, BinOp::Div, self.unary()?)
            } else {
                break Ok(node);
            }
        }
    }

    fn unary(&mut self) -> Parse<Located<Expr>> {
        let mut negations = Vec::new();

        loop {
            let sign = self.peek().location().clone();
            if self.consume(Token::Minus) {
                negations.push(sign);
            } else if !self.consume(Token::Plus) {
                break;
            }
        }

        let mut node = self.primary()?;
        while let Some(sign) = negations.pop() {
            // El cero sintético ocupa la posición del signo
            let zero = Located::at(Expr::Integer(0), sign);
            node = binary(zero, BinOp::Sub, node);
        }

        Ok(node)
    }

    fn primary(&mut self) -> Parse<Located<Expr>> {
        let open = self.peek().location().clone();
        if *self.peek().val() == Token::OpenParen && self.depth >= MAX_NESTING {
            return self.fail(ParserError::TooDeep);
        }

        if self.consume(Token::OpenParen) {
            self.depth += 1;
            let inner = self.expression()?.into_inner();
            self.depth -= 1;

            let close = self.peek().location().clone();
            self.expect(Token::CloseParen)?;

            return Ok(Located::at(inner, Location::span(open, &close)));
        }

        let (location, token) = self.peek().clone().split();
        match token {
            // El lexer solo produce identificadores en 'a'..='z'
            Token::Id(name) => match Slot::from_name(name) {
                Some(slot) => {
                    self.advance();
                    Ok(Located::at(Expr::Variable(slot), location))
                }

                None => self.fail(ParserError::ExpectedNumber),
            },

            Token::IntLiteral(value) => {
                self.advance();
                Ok(Located::at(Expr::Integer(value), location))
            }

            _ => self.fail(ParserError::ExpectedNumber),
        }
    }

    /// Avanza solamente si el token actual es exactamente el esperado.
    fn consume(&mut self, token: Token) -> bool {
        if *self.peek().val() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Parse<()> {
        if self.consume(token) {
            Ok(())
        } else {
            self.fail(ParserError::Expected(token))
        }
    }

    fn at_eof(&self) -> bool {
        *self.peek().val() == Token::Eof
    }

    fn peek(&self) -> &'a Located<Token> {
        &self.tokens[self.position]
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn fail<T>(&self, error: ParserError) -> Parse<T> {
        Err(Located::at(error, self.peek().location().clone()))
    }
}

fn binary(lhs: Located<Expr>, op: BinOp, rhs: Located<Expr>) -> Located<Expr> {
    let location = span_of(&lhs, &rhs);
    Located::at(Expr::Binary(Box::new(lhs), op, Box::new(rhs)), location)
}

fn assign(target: Located<Expr>, value: Located<Expr>) -> Located<Expr> {
    let location = span_of(&target, &value);
    Located::at(Expr::Assign(Box::new(target), Box::new(value)), location)
}

/// Ubicación que cubre a ambos operandos, sin importar su orden en fuente.
fn span_of(a: &Located<Expr>, b: &Located<Expr>) -> Location {
    let (first, last) = if a.location().offset() <= b.location().offset() {
        (a, b)
    } else {
        (b, a)
    };

    Location::span(first.location().clone(), last.location())
}
