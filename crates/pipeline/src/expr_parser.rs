// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! A small recursive-descent parser from raw TQL expression text (as captured by
//! `grammar.pest`'s `raw_expr` rule) to `tql_df_expr::Expr` (§3.4). Precedence, low to high:
//! `or`, `and`, `not`, comparison, primary.

use crate::error::Error;
use tql_df_expr::{BoolOp, CompareOp, Expr};
use tql_df_value::Value;

/// Parses one expression from `source`, consuming the whole input.
pub fn parse_expr(source: &str) -> Result<Expr, Error> {
    let tokens = tokenize(source)?;
    let mut parser = ExprParser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(Error::ParseError(format!(
            "unexpected trailing input in expression `{source}` at token {:?}",
            parser.tokens.get(parser.pos)
        )));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    String(String),
    Number(f64),
    IsInt(bool),
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

fn tokenize(source: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '"' => {
                let mut out = String::new();
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        out.push(chars[i + 1]);
                        i += 2;
                    } else {
                        out.push(chars[i]);
                        i += 1;
                    }
                }
                i += 1; // closing quote
                tokens.push(Token::String(out));
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Eq);
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ne);
                i += 2;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Le);
                i += 2;
            }
            '<' => {
                tokens.push(Token::Lt);
                i += 1;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Ge);
                i += 2;
            }
            '>' => {
                tokens.push(Token::Gt);
                i += 1;
            }
            c if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) => {
                let start = i;
                i += 1;
                let mut is_int = true;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    if chars[i] == '.' {
                        is_int = false;
                    }
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| Error::ParseError(format!("invalid number `{text}`")))?;
                tokens.push(Token::Number(value));
                tokens.push(Token::IsInt(is_int));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Ident(word),
                });
            }
            other => return Err(Error::ParseError(format!("unexpected character `{other}` in expression"))),
        }
    }
    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            let _ = self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::new(tql_df_expr::ExprKind::BoolOp(BoolOp::Or, Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_not()?;
        while matches!(self.peek(), Some(Token::And)) {
            let _ = self.advance();
            let rhs = self.parse_not()?;
            lhs = Expr::new(tql_df_expr::ExprKind::BoolOp(BoolOp::And, Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, Error> {
        if matches!(self.peek(), Some(Token::Not)) {
            let _ = self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::new(tql_df_expr::ExprKind::Not(Box::new(inner))));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, Error> {
        let lhs = self.parse_primary()?;
        let op = match self.peek() {
            Some(Token::Eq) => Some(CompareOp::Eq),
            Some(Token::Ne) => Some(CompareOp::Ne),
            Some(Token::Lt) => Some(CompareOp::Lt),
            Some(Token::Le) => Some(CompareOp::Le),
            Some(Token::Gt) => Some(CompareOp::Gt),
            Some(Token::Ge) => Some(CompareOp::Ge),
            _ => None,
        };
        let Some(op) = op else {
            return Ok(lhs);
        };
        let _ = self.advance();
        let rhs = self.parse_primary()?;
        Ok(Expr::new(tql_df_expr::ExprKind::Compare(op, Box::new(lhs), Box::new(rhs))))
    }

    /// Parses a primary expression, then absorbs any trailing `.method(args)` calls by
    /// desugaring `recv.method(a, b)` into `call("method", [recv, a, b])` (§8 scenario 6).
    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_atom()?;
        while matches!(self.peek(), Some(Token::Dot)) {
            let _ = self.advance();
            let Some(Token::Ident(method)) = self.advance() else {
                return Err(Error::ParseError("expected method name after `.`".to_string()));
            };
            if matches!(self.peek(), Some(Token::LParen)) {
                let mut args = vec![expr];
                args.extend(self.parse_call_args()?);
                expr = Expr::new(tql_df_expr::ExprKind::Call(method, args));
            } else {
                // Plain field access chained onto a non-field-path base collapses into a
                // longer field path only when `expr` itself is already one; otherwise treat
                // the dotted name as a call with zero arguments for symmetry.
                expr = match expr.kind {
                    tql_df_expr::ExprKind::FieldPath(mut segments) => {
                        segments.push(method);
                        Expr::new(tql_df_expr::ExprKind::FieldPath(segments))
                    }
                    _ => Expr::new(tql_df_expr::ExprKind::Call(method, vec![expr])),
                };
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, Error> {
        let _ = self.advance(); // '('
        let mut args = Vec::new();
        if !matches!(self.peek(), Some(Token::RParen)) {
            args.push(self.parse_or()?);
            while matches!(self.peek(), Some(Token::Comma)) {
                let _ = self.advance();
                args.push(self.parse_or()?);
            }
        }
        match self.advance() {
            Some(Token::RParen) => Ok(args),
            other => Err(Error::ParseError(format!("expected `)`, found {other:?}"))),
        }
    }

    fn parse_atom(&mut self) -> Result<Expr, Error> {
        match self.advance() {
            Some(Token::String(s)) => Ok(Expr::literal(Value::String(s))),
            Some(Token::Number(n)) => {
                let is_int = matches!(self.peek(), Some(Token::IsInt(true)));
                let _ = self.advance(); // IsInt marker
                if is_int {
                    Ok(Expr::literal(Value::Int64(n as i64)))
                } else {
                    Ok(Expr::literal(Value::Double(n)))
                }
            }
            Some(Token::Ident(name)) if name == "true" => Ok(Expr::literal(Value::Bool(true))),
            Some(Token::Ident(name)) if name == "false" => Ok(Expr::literal(Value::Bool(false))),
            Some(Token::Ident(name)) if name == "null" => Ok(Expr::literal(Value::Null)),
            Some(Token::Ident(name)) if matches!(self.peek(), Some(Token::LParen)) => {
                let args = self.parse_call_args()?;
                Ok(Expr::new(tql_df_expr::ExprKind::Call(name, args)))
            }
            Some(Token::Ident(name)) => Ok(Expr::field_path([name])),
            Some(Token::LBracket) => {
                let mut entries = Vec::new();
                if !matches!(self.peek(), Some(Token::RBracket)) {
                    entries.push(tql_df_expr::ListEntry::Element(self.parse_or()?));
                    while matches!(self.peek(), Some(Token::Comma)) {
                        let _ = self.advance();
                        entries.push(tql_df_expr::ListEntry::Element(self.parse_or()?));
                    }
                }
                match self.advance() {
                    Some(Token::RBracket) => Ok(Expr::new(tql_df_expr::ExprKind::List(entries))),
                    other => Err(Error::ParseError(format!("expected `]`, found {other:?}"))),
                }
            }
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    other => Err(Error::ParseError(format!("expected `)`, found {other:?}"))),
                }
            }
            other => Err(Error::ParseError(format!("unexpected token {other:?} in expression"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_field_path() {
        let expr = parse_expr("src.ip").unwrap();
        assert_eq!(expr, Expr::field_path(["src", "ip"]));
    }

    #[test]
    fn parses_comparison() {
        let expr = parse_expr("x > 1").unwrap();
        assert!(matches!(expr.kind, tql_df_expr::ExprKind::Compare(CompareOp::Gt, _, _)));
    }

    #[test]
    fn parses_function_call() {
        let expr = parse_expr("int(x)").unwrap();
        assert_eq!(expr, Expr::call("int", vec![Expr::field_path(["x"])]));
    }

    #[test]
    fn desugars_method_call_syntax() {
        let expr = parse_expr(r#"s.starts_with("f")"#).unwrap();
        assert_eq!(
            expr,
            Expr::call("starts_with", vec![Expr::field_path(["s"]), Expr::literal(Value::String("f".to_string()))])
        );
    }

    #[test]
    fn parses_boolean_combinators() {
        let expr = parse_expr("a > 1 and not b == 2").unwrap();
        assert!(matches!(expr.kind, tql_df_expr::ExprKind::BoolOp(BoolOp::And, _, _)));
    }

    #[test]
    fn parses_list_literal() {
        let expr = parse_expr("[1, 2, 3]").unwrap();
        assert!(matches!(expr.kind, tql_df_expr::ExprKind::List(entries) if entries.len() == 3));
    }
}
