use crate::ast::*;
use crate::lexer::{Span, Token, TokenKind};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token: expected {expected}, found {found} at position {span:?}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    #[error("Unexpected end of file")]
    UnexpectedEof,
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("No objective given, expected a `max:` or `min:` line")]
    MissingObjective,
    #[error("Second objective at position {0:?}")]
    DuplicateObjective(Span),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(source: &str) -> Result<Program, ParseError> {
        let tokens = crate::lexer::Lexer::tokenize(source);
        let mut parser = Parser::new(tokens);
        parser.parse_program()
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.tokens
            .get(self.pos + offset)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    /// Skip statement separators: blank lines, `;` and comments
    fn skip_separators(&mut self) {
        while matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Comment
        ) {
            self.advance();
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.current() {
            Some(t) if t.kind != TokenKind::Eof => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: if t.text.is_empty() {
                    format!("{:?}", t.kind)
                } else {
                    format!("{:?} `{}`", t.kind, t.text)
                },
                span: t.span,
            },
            _ => ParseError::UnexpectedEof,
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        match self.current().cloned() {
            Some(t) if t.kind == kind => {
                self.advance();
                Ok(t)
            }
            _ => Err(self.unexpected(&format!("{:?}", kind))),
        }
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut objective: Option<Objective> = None;
        let mut constraints = Vec::new();

        loop {
            self.skip_separators();

            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Max | TokenKind::Min => {
                    let parsed = self.parse_objective()?;
                    if objective.is_some() {
                        return Err(ParseError::DuplicateObjective(parsed.span));
                    }
                    objective = Some(parsed);
                }
                TokenKind::Ident | TokenKind::Number | TokenKind::Plus | TokenKind::Minus => {
                    constraints.push(self.parse_constraint()?);
                }
                _ => return Err(self.unexpected("objective or constraint")),
            }

            self.end_of_statement()?;
        }

        let objective = objective.ok_or(ParseError::MissingObjective)?;
        log::debug!(
            "Parsed {:?} objective with {} constraints",
            objective.sense,
            constraints.len()
        );
        Ok(Program {
            objective,
            constraints,
        })
    }

    fn end_of_statement(&self) -> Result<(), ParseError> {
        match self.peek_kind() {
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Comment | TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("end of line")),
        }
    }

    fn parse_objective(&mut self) -> Result<Objective, ParseError> {
        let (sense, start) = match self.current() {
            Some(t) if t.kind == TokenKind::Max => (Sense::Maximize, t.span),
            Some(t) if t.kind == TokenKind::Min => (Sense::Minimize, t.span),
            _ => return Err(self.unexpected("max or min")),
        };
        self.advance();
        self.expect(TokenKind::Colon)?;

        let (terms, end) = self.parse_linear_expr()?;

        Ok(Objective {
            span: start.merge(end),
            sense,
            terms,
        })
    }

    fn parse_constraint(&mut self) -> Result<Constraint, ParseError> {
        let start = self.current().map(|t| t.span).unwrap_or(Span::new(0, 0));

        let mut name = None;
        if self.peek_kind() == TokenKind::Ident && self.peek_kind_at(1) == TokenKind::Colon {
            name = self.advance().map(|t| t.text.clone());
            self.advance(); // colon
        }

        let (terms, _) = self.parse_linear_expr()?;

        let op = match self.peek_kind() {
            TokenKind::Le => ConstraintOp::Le,
            TokenKind::Ge => ConstraintOp::Ge,
            TokenKind::Eq => ConstraintOp::Eq,
            _ => return Err(self.unexpected("<=, >= or =")),
        };
        self.advance();

        let (rhs, end) = self.parse_signed_number()?;

        Ok(Constraint {
            span: start.merge(end),
            name,
            terms,
            op,
            rhs,
        })
    }

    /// `term { (+|-) term }`, returning the span of the last term
    fn parse_linear_expr(&mut self) -> Result<(Vec<Term>, Span), ParseError> {
        let mut terms = Vec::new();

        let mut sign = match self.peek_kind() {
            TokenKind::Minus => {
                self.advance();
                -1.0
            }
            TokenKind::Plus => {
                self.advance();
                1.0
            }
            _ => 1.0,
        };

        loop {
            let (term, span) = self.parse_term(sign)?;
            terms.push(term);

            sign = match self.peek_kind() {
                TokenKind::Plus => 1.0,
                TokenKind::Minus => -1.0,
                _ => return Ok((terms, span)),
            };
            self.advance();
        }
    }

    /// `[number] [*] ident`
    fn parse_term(&mut self, sign: f64) -> Result<(Term, Span), ParseError> {
        let mut coefficient = 1.0;
        if self.peek_kind() == TokenKind::Number {
            let token = self.expect(TokenKind::Number)?;
            coefficient = parse_number(&token.text)?;
            if self.peek_kind() == TokenKind::Star {
                self.advance();
            }
        }

        let ident = self.expect(TokenKind::Ident).map_err(|_| self.unexpected("variable"))?;

        Ok((
            Term {
                coefficient: sign * coefficient,
                variable: ident.text,
            },
            ident.span,
        ))
    }

    fn parse_signed_number(&mut self) -> Result<(f64, Span), ParseError> {
        let sign = match self.peek_kind() {
            TokenKind::Minus => {
                self.advance();
                -1.0
            }
            TokenKind::Plus => {
                self.advance();
                1.0
            }
            _ => 1.0,
        };
        let token = self.expect(TokenKind::Number).map_err(|_| self.unexpected("number"))?;
        Ok((sign * parse_number(&token.text)?, token.span))
    }
}

fn parse_number(text: &str) -> Result<f64, ParseError> {
    text.parse()
        .map_err(|_| ParseError::InvalidNumber(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn term(coefficient: f64, variable: &str) -> Term {
        Term {
            coefficient,
            variable: variable.to_string(),
        }
    }

    #[test]
    fn test_parse_program() {
        let source = r#"
# classic two-variable problem
max: 3x + 2y
x + y <= 4
x + 3y <= 6
"#;
        let program = Parser::parse(source).unwrap();
        assert_eq!(program.objective.sense, Sense::Maximize);
        assert_eq!(program.objective.terms, vec![term(3.0, "x"), term(2.0, "y")]);
        assert_eq!(program.constraints.len(), 2);
        assert_eq!(program.constraints[1].terms, vec![term(1.0, "x"), term(3.0, "y")]);
        assert_eq!(program.constraints[1].op, ConstraintOp::Le);
        assert_eq!(program.constraints[1].rhs, 6.0);
        assert_eq!(program.constraints[1].name, None);
    }

    #[test]
    fn test_parse_signs_and_star() {
        let program = Parser::parse("minimize: -2 * a + 0.5b - c\n").unwrap();
        assert_eq!(program.objective.sense, Sense::Minimize);
        assert_eq!(
            program.objective.terms,
            vec![term(-2.0, "a"), term(0.5, "b"), term(-1.0, "c")]
        );
    }

    #[test]
    fn test_parse_named_constraint_and_semicolons() {
        let program = Parser::parse("max: x; cap: x + y >= -2; x == 1").unwrap();
        assert_eq!(program.constraints[0].name.as_deref(), Some("cap"));
        assert_eq!(program.constraints[0].op, ConstraintOp::Ge);
        assert_eq!(program.constraints[0].rhs, -2.0);
        assert_eq!(program.constraints[1].op, ConstraintOp::Eq);
    }

    #[test]
    fn test_objective_may_follow_constraints() {
        let program = Parser::parse("x <= 1 // bound\nmax: x").unwrap();
        assert_eq!(program.constraints.len(), 1);
        assert_eq!(program.objective.terms, vec![term(1.0, "x")]);
    }

    #[test]
    fn test_spans_cover_statement() {
        let program = Parser::parse("max: x\ncap: x <= 10").unwrap();
        assert_eq!(program.objective.span, Span::new(0, 6));
        assert_eq!(program.constraints[0].span, Span::new(7, 19));
    }

    #[test]
    fn test_missing_objective() {
        assert_eq!(Parser::parse("x <= 1").unwrap_err(), ParseError::MissingObjective);
        assert_eq!(Parser::parse("").unwrap_err(), ParseError::MissingObjective);
    }

    #[test]
    fn test_duplicate_objective() {
        let err = Parser::parse("max: x\nmin: y").unwrap_err();
        assert!(matches!(err, ParseError::DuplicateObjective(_)));
    }

    #[test]
    fn test_strict_comparison_rejected() {
        let err = Parser::parse("max: x\nx < 4").unwrap_err();
        match err {
            ParseError::UnexpectedToken { expected, found, .. } => {
                assert_eq!(expected, "<=, >= or =");
                assert_eq!(found, "Error `<`");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_exponent_coefficient() {
        let program = Parser::parse("max: 1e3x\nx <= 2.5e-1").unwrap();
        assert_eq!(program.objective.terms, vec![term(1000.0, "x")]);
        assert_eq!(program.constraints[0].rhs, 0.25);
    }

    #[test]
    fn test_missing_operator() {
        let err = Parser::parse("max: x\nx + y 4").unwrap_err();
        match err {
            ParseError::UnexpectedToken { expected, .. } => assert_eq!(expected, "<=, >= or ="),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_constant_on_left_side() {
        let err = Parser::parse("max: x\nx + 4 <= 4").unwrap_err();
        match err {
            ParseError::UnexpectedToken { expected, .. } => assert_eq!(expected, "variable"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_trailing_garbage() {
        let err = Parser::parse("max: x y").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_unexpected_eof() {
        assert_eq!(Parser::parse("max: x\nx <=").unwrap_err(), ParseError::UnexpectedEof);
    }
}
