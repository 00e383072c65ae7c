//! Arithmetic evaluation for fully substituted formula bodies.
//!
//! By the time text reaches this module every cell reference and range
//! function has been replaced by a number, so the accepted language is
//! tiny and nothing here can call back into the host.
//!
//! # BNF Grammar
//!
//! ```bnf
//! Expression ::= Term ( ( "+" | "-" ) Term )*
//! Term       ::= Unary ( ( "*" | "/" ) Unary )*
//! Unary      ::= ( "+" | "-" ) Unary | Primary
//! Primary    ::= Number | "(" Expression ")"
//! Number     ::= [0-9]+ ( "." [0-9]* )? | "." [0-9]+
//! ```

use super::errors::ArithmeticError;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Open,
    Close,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {n}"),
            Token::Plus => f.write_str("'+'"),
            Token::Minus => f.write_str("'-'"),
            Token::Star => f.write_str("'*'"),
            Token::Slash => f.write_str("'/'"),
            Token::Open => f.write_str("'('"),
            Token::Close => f.write_str("')'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn apply(self, lhs: f64, rhs: f64) -> Result<f64, ArithmeticError> {
        match self {
            BinaryOp::Add => Ok(lhs + rhs),
            BinaryOp::Sub => Ok(lhs - rhs),
            BinaryOp::Mul => Ok(lhs * rhs),
            BinaryOp::Div if rhs == 0.0 => Err(ArithmeticError::DivisionByZero),
            BinaryOp::Div => Ok(lhs / rhs),
        }
    }
}

/// Parsed arithmetic. Unary plus leaves no node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Neg(Box<Expr>),
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

impl Expr {
    /// Evaluates the tree. Every intermediate result must be finite.
    pub fn evaluate(&self) -> Result<f64, ArithmeticError> {
        let value = match self {
            Expr::Number(n) => *n,
            Expr::Neg(inner) => -inner.evaluate()?,
            Expr::Binary { op, lhs, rhs } => op.apply(lhs.evaluate()?, rhs.evaluate()?)?,
        };
        if value.is_finite() { Ok(value) } else { Err(ArithmeticError::NonFinite) }
    }
}

/// Splits `input` into tokens. Anything outside the grammar is rejected here.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ArithmeticError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        let token = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' | '.' => {
                tokens.push(Token::Number(read_number(&mut chars)?));
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::Open,
            ')' => Token::Close,
            other => return Err(ArithmeticError::UnexpectedChar(other)),
        };
        chars.next();
        tokens.push(token);
    }

    Ok(tokens)
}

fn read_number(chars: &mut Peekable<Chars<'_>>) -> Result<f64, ArithmeticError> {
    let mut text = String::new();
    while let Some(&ch) = chars.peek() {
        if !(ch.is_ascii_digit() || ch == '.') {
            break;
        }
        text.push(ch);
        chars.next();
    }
    // Rejects "." and "1.2.3".
    text.parse::<f64>().map_err(|_| ArithmeticError::InvalidNumber(text))
}

fn additive(token: Token) -> Option<BinaryOp> {
    match token {
        Token::Plus => Some(BinaryOp::Add),
        Token::Minus => Some(BinaryOp::Sub),
        _ => None,
    }
}

fn multiplicative(token: Token) -> Option<BinaryOp> {
    match token {
        Token::Star => Some(BinaryOp::Mul),
        Token::Slash => Some(BinaryOp::Div),
        _ => None,
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn unexpected(token: Option<Token>) -> ArithmeticError {
        match token {
            Some(token) => ArithmeticError::UnexpectedToken(token.to_string()),
            None => ArithmeticError::UnexpectedToken("end of input".to_string()),
        }
    }

    fn expression(&mut self) -> Result<Expr, ArithmeticError> {
        let mut lhs = self.term()?;
        while let Some(op) = self.peek().and_then(additive) {
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ArithmeticError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek().and_then(multiplicative) {
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ArithmeticError> {
        match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(Expr::Neg(Box::new(self.unary()?)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, ArithmeticError> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Open) => {
                let inner = self.expression()?;
                match self.bump() {
                    Some(Token::Close) => Ok(inner),
                    other => Err(Self::unexpected(other)),
                }
            }
            other => Err(Self::unexpected(other)),
        }
    }
}

/// Parses a complete expression; trailing tokens are an error.
pub fn parse(input: &str) -> Result<Expr, ArithmeticError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ArithmeticError::Empty);
    }

    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let expr = parser.expression()?;
    match parser.peek() {
        None => Ok(expr),
        trailing => Err(Parser::unexpected(trailing)),
    }
}

pub fn evaluate_arithmetic(input: &str) -> Result<f64, ArithmeticError> {
    parse(input)?.evaluate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize(" 42*(2.75 - .5)/7. ").unwrap(),
            vec![
                Token::Number(42.0),
                Token::Star,
                Token::Open,
                Token::Number(2.75),
                Token::Minus,
                Token::Number(0.5),
                Token::Close,
                Token::Slash,
                Token::Number(7.0),
            ]
        );
    }

    #[test]
    fn test_rejects_everything_outside_the_grammar() {
        assert_eq!(tokenize("A1"), Err(ArithmeticError::UnexpectedChar('A')));
        for input in ["2^3", "1%2", "1,2", "alert(1)", "1.2.3", "."] {
            assert!(parse(input).is_err(), "{input} should be rejected");
        }
    }

    #[test]
    fn test_precedence() {
        let expr = parse("2 + 3 * 4").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                lhs: Box::new(Expr::Number(2.0)),
                rhs: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    lhs: Box::new(Expr::Number(3.0)),
                    rhs: Box::new(Expr::Number(4.0)),
                }),
            }
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(evaluate_arithmetic("2+3"), Ok(5.0));
        assert_eq!(evaluate_arithmetic("10-3-2"), Ok(5.0));
        assert_eq!(evaluate_arithmetic("2*3+4"), Ok(10.0));
        assert_eq!(evaluate_arithmetic("2*(3+4)"), Ok(14.0));
        assert_eq!(evaluate_arithmetic("12/4/3"), Ok(1.0));
        assert_eq!(evaluate_arithmetic(" ( 1 + 1 ) * ( 2 ) "), Ok(4.0));
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(evaluate_arithmetic("-5+10"), Ok(5.0));
        assert_eq!(evaluate_arithmetic("5--3"), Ok(8.0));
        assert_eq!(evaluate_arithmetic("-(2*3)"), Ok(-6.0));
        assert_eq!(evaluate_arithmetic("+4"), Ok(4.0));
        assert_eq!(parse("+4").unwrap(), Expr::Number(4.0));
    }

    #[test]
    fn test_errors() {
        assert_eq!(evaluate_arithmetic(""), Err(ArithmeticError::Empty));
        assert_eq!(evaluate_arithmetic("   "), Err(ArithmeticError::Empty));
        assert_eq!(evaluate_arithmetic("1/0"), Err(ArithmeticError::DivisionByZero));
        assert_eq!(evaluate_arithmetic("1/(2-2)"), Err(ArithmeticError::DivisionByZero));
        assert!(matches!(evaluate_arithmetic("(1+2"), Err(ArithmeticError::UnexpectedToken(_))));
        assert!(evaluate_arithmetic("1+").is_err());
        assert!(evaluate_arithmetic("*2").is_err());
        assert!(evaluate_arithmetic("1 2").is_err());
    }

    #[test]
    fn test_overflow_is_not_finite() {
        let huge = format!("{}*{}", "9".repeat(200), "9".repeat(200));
        assert_eq!(evaluate_arithmetic(&huge), Err(ArithmeticError::NonFinite));
    }
}
