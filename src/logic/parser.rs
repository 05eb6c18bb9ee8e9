//! Recursive-descent parser for first-order formulas.
//!
//! Precedence, loosest first: `<->`, `->` (right associative), `|`, `&`,
//! prefix negation. A quantifier body extends as far to the right as possible,
//! so `all x.P(x) & Q(x)` quantifies over the whole conjunction.
//!
//! Identifiers bound by an enclosing quantifier parse as variables; any other
//! identifier in term position is a constant.

use super::formula::Formula;
use super::lexer::{tokenize, Spanned, Token};
use super::term::Term;
use crate::error::FormulaError;

/// Parse a single closed or open formula from `source`.
pub fn parse_formula(source: &str) -> Result<Formula, FormulaError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        bound: Vec::new(),
    };
    let formula = parser.formula()?;
    if parser.peek() != &Token::Eof {
        return Err(parser.error(format!(
            "unexpected {} after complete formula",
            parser.peek().describe()
        )));
    }
    Ok(formula)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    /// Variables bound by enclosing quantifiers, innermost last.
    bound: Vec<String>,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        // tokenize always ends with Eof, and advance never moves past it.
        &self.tokens[self.pos].token
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if token != Token::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected {}, found {}",
                expected.describe(),
                self.peek().describe()
            )))
        }
    }

    fn error(&self, message: String) -> FormulaError {
        let spanned = &self.tokens[self.pos];
        FormulaError::Parse {
            message,
            src: self.source.to_string(),
            span: (spanned.start, spanned.end - spanned.start).into(),
        }
    }

    // -----------------------------------------------------------------------
    // Connectives
    // -----------------------------------------------------------------------

    fn formula(&mut self) -> Result<Formula, FormulaError> {
        let mut left = self.implication()?;
        while self.eat(&Token::Iff) {
            let right = self.implication()?;
            left = Formula::iff(left, right);
        }
        Ok(left)
    }

    fn implication(&mut self) -> Result<Formula, FormulaError> {
        let left = self.disjunction()?;
        if self.eat(&Token::Implies) {
            let right = self.implication()?;
            return Ok(Formula::implies(left, right));
        }
        Ok(left)
    }

    fn disjunction(&mut self) -> Result<Formula, FormulaError> {
        let mut left = self.conjunction()?;
        while self.eat(&Token::Or) {
            let right = self.conjunction()?;
            left = Formula::or(left, right);
        }
        Ok(left)
    }

    fn conjunction(&mut self) -> Result<Formula, FormulaError> {
        let mut left = self.unary()?;
        while self.eat(&Token::And) {
            let right = self.unary()?;
            left = Formula::and(left, right);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Formula, FormulaError> {
        match self.peek() {
            Token::Not => {
                self.advance();
                Ok(Formula::not(self.unary()?))
            }
            Token::Forall | Token::Exists => self.quantified(),
            _ => self.primary(),
        }
    }

    fn quantified(&mut self) -> Result<Formula, FormulaError> {
        let universal = self.advance() == Token::Forall;
        let mut vars = Vec::new();
        loop {
            match self.peek().clone() {
                Token::Ident(name) => {
                    self.advance();
                    vars.push(name);
                    self.eat(&Token::Comma);
                }
                Token::Dot if !vars.is_empty() => {
                    self.advance();
                    break;
                }
                other => {
                    return Err(self.error(format!(
                        "expected a quantified variable or `.`, found {}",
                        other.describe()
                    )));
                }
            }
        }

        let depth = self.bound.len();
        self.bound.extend(vars.iter().cloned());
        let body = self.formula();
        self.bound.truncate(depth);
        let body = body?;

        Ok(vars.into_iter().rev().fold(body, |acc, var| {
            if universal {
                Formula::forall(var, acc)
            } else {
                Formula::exists(var, acc)
            }
        }))
    }

    // -----------------------------------------------------------------------
    // Atoms and terms
    // -----------------------------------------------------------------------

    fn primary(&mut self) -> Result<Formula, FormulaError> {
        match self.peek().clone() {
            Token::LParen => {
                self.advance();
                let inner = self.formula()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                self.advance();
                let args = if self.peek() == &Token::LParen {
                    self.arguments()?
                } else {
                    Vec::new()
                };
                match self.peek() {
                    Token::Eq => {
                        self.advance();
                        let left = self.make_term(name, args);
                        let right = self.term()?;
                        Ok(Formula::eq(left, right))
                    }
                    Token::Neq => {
                        self.advance();
                        let left = self.make_term(name, args);
                        let right = self.term()?;
                        Ok(Formula::not(Formula::eq(left, right)))
                    }
                    _ => Ok(Formula::atom(name, args)),
                }
            }
            other => Err(self.error(format!("expected a formula, found {}", other.describe()))),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Term>, FormulaError> {
        self.expect(Token::LParen)?;
        let mut args = vec![self.term()?];
        while self.eat(&Token::Comma) {
            args.push(self.term()?);
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    fn term(&mut self) -> Result<Term, FormulaError> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                let args = if self.peek() == &Token::LParen {
                    self.arguments()?
                } else {
                    Vec::new()
                };
                Ok(self.make_term(name, args))
            }
            other => Err(self.error(format!("expected a term, found {}", other.describe()))),
        }
    }

    fn make_term(&self, name: String, args: Vec<Term>) -> Term {
        if args.is_empty() && self.bound.contains(&name) {
            Term::Var(name)
        } else {
            Term::App(name, args)
        }
    }
}
