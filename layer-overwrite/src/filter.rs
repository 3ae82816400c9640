//! Row filter: a small where-clause dialect evaluated against attribute maps.
//!
//! Supported:
//! - `1=1` or an empty string (every row)
//! - `FIELD = 'text'`, `FIELD <> 3`, `<`, `<=`, `>`, `>=`, `!=`
//! - `FIELD IS NULL`, `FIELD IS NOT NULL`
//! - `FIELD IN ('a', 'b', 3)`
//! - any of the above joined with `AND` (keywords are case-insensitive)
//!
//! Comparisons against NULL or a missing field are false, as in SQL.

use std::{cmp::Ordering, fmt, str::FromStr};

use serde_json::{Map, Value};

use crate::errors::FilterError;

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Field(String),
    Literal(Literal),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Compare(Operand, CompareOp, Operand),
    IsNull { field: String, negated: bool },
    In { operand: Operand, values: Vec<Literal> },
}

/// Parsed row filter. `RowFilter::default()` matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFilter {
    source: String,
    conditions: Vec<Condition>,
}

impl RowFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn parse(expr: &str) -> Result<Self, FilterError> {
        let tokens = tokenize(expr)?;
        let mut parser = Parser { tokens, pos: 0 };
        let conditions = parser.conditions()?;
        Ok(Self {
            source: expr.trim().to_string(),
            conditions,
        })
    }

    pub fn matches(&self, attributes: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|c| eval(c, attributes))
    }
}

impl FromStr for RowFilter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, FilterError> {
        Self::parse(s)
    }
}

impl fmt::Display for RowFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source.is_empty() {
            f.write_str("1=1")
        } else {
            f.write_str(&self.source)
        }
    }
}

/* ------------------------------------------------------------------------- */
/* Evaluation                                                                */
/* ------------------------------------------------------------------------- */

#[derive(Debug, PartialEq)]
enum Scalar<'a> {
    Null,
    Number(f64),
    Text(&'a str),
}

fn resolve<'a>(operand: &'a Operand, attrs: &'a Map<String, Value>) -> Scalar<'a> {
    match operand {
        Operand::Literal(lit) => literal_scalar(lit),
        Operand::Field(name) => match attrs.get(name) {
            None | Some(Value::Null) => Scalar::Null,
            Some(Value::Number(n)) => n.as_f64().map_or(Scalar::Null, Scalar::Number),
            Some(Value::String(s)) => Scalar::Text(s),
            Some(Value::Bool(b)) => Scalar::Number(if *b { 1.0 } else { 0.0 }),
            Some(_) => Scalar::Null,
        },
    }
}

fn literal_scalar(lit: &Literal) -> Scalar<'_> {
    match lit {
        Literal::Text(s) => Scalar::Text(s),
        Literal::Number(n) => Scalar::Number(*n),
    }
}

fn compare(a: &Scalar<'_>, b: &Scalar<'_>) -> Option<Ordering> {
    match (a, b) {
        (Scalar::Number(x), Scalar::Number(y)) => x.partial_cmp(y),
        (Scalar::Text(x), Scalar::Text(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn eval(cond: &Condition, attrs: &Map<String, Value>) -> bool {
    match cond {
        Condition::Compare(lhs, op, rhs) => {
            let Some(ord) = compare(&resolve(lhs, attrs), &resolve(rhs, attrs)) else {
                return false;
            };
            match op {
                CompareOp::Eq => ord == Ordering::Equal,
                CompareOp::Ne => ord != Ordering::Equal,
                CompareOp::Lt => ord == Ordering::Less,
                CompareOp::Le => ord != Ordering::Greater,
                CompareOp::Gt => ord == Ordering::Greater,
                CompareOp::Ge => ord != Ordering::Less,
            }
        }
        Condition::IsNull { field, negated } => {
            let is_null = matches!(attrs.get(field), None | Some(Value::Null));
            is_null != *negated
        }
        Condition::In { operand, values } => {
            let v = resolve(operand, attrs);
            values
                .iter()
                .any(|lit| compare(&v, &literal_scalar(lit)) == Some(Ordering::Equal))
        }
    }
}

/* ------------------------------------------------------------------------- */
/* Tokenizer                                                                 */
/* ------------------------------------------------------------------------- */

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Text(String),
    Op(CompareOp),
    LParen,
    RParen,
    Comma,
}

fn tokenize(expr: &str) -> Result<Vec<(Token, usize)>, FilterError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                out.push((Token::LParen, start));
                i += 1;
            }
            ')' => {
                out.push((Token::RParen, start));
                i += 1;
            }
            ',' => {
                out.push((Token::Comma, start));
                i += 1;
            }
            '\'' => {
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(FilterError::UnterminatedString(start)),
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            text.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            text.push(*ch);
                            i += 1;
                        }
                    }
                }
                out.push((Token::Text(text), start));
            }
            '=' => {
                out.push((Token::Op(CompareOp::Eq), start));
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                out.push((Token::Op(CompareOp::Ne), start));
                i += 2;
            }
            '<' => {
                let (op, len) = match chars.get(i + 1) {
                    Some('>') => (CompareOp::Ne, 2),
                    Some('=') => (CompareOp::Le, 2),
                    _ => (CompareOp::Lt, 1),
                };
                out.push((Token::Op(op), start));
                i += len;
            }
            '>' => {
                let (op, len) = match chars.get(i + 1) {
                    Some('=') => (CompareOp::Ge, 2),
                    _ => (CompareOp::Gt, 1),
                };
                out.push((Token::Op(op), start));
                i += len;
            }
            c if c.is_ascii_digit() || c == '-' || c == '.' => {
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                let n = raw
                    .parse::<f64>()
                    .map_err(|_| FilterError::InvalidNumber(raw.clone()))?;
                out.push((Token::Number(n), start));
            }
            c if c.is_alphanumeric() || c == '_' => {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                out.push((Token::Ident(raw), start));
            }
            other => {
                return Err(FilterError::UnexpectedToken {
                    token: other.to_string(),
                    pos: start,
                });
            }
        }
    }
    Ok(out)
}

/* ------------------------------------------------------------------------- */
/* Parser                                                                    */
/* ------------------------------------------------------------------------- */

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Result<(Token, usize), FilterError> {
        let t = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(FilterError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(t)
    }

    fn unexpected(token: &Token, pos: usize) -> FilterError {
        FilterError::UnexpectedToken {
            token: format!("{token:?}"),
            pos,
        }
    }

    fn peek_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(kw))
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), FilterError> {
        let (t, pos) = self.next()?;
        match &t {
            Token::Ident(s) if s.eq_ignore_ascii_case(kw) => Ok(()),
            _ => Err(Self::unexpected(&t, pos)),
        }
    }

    fn conditions(&mut self) -> Result<Vec<Condition>, FilterError> {
        let mut out = Vec::new();
        if self.peek().is_none() {
            return Ok(out);
        }
        loop {
            out.push(self.condition()?);
            match self.peek() {
                None => break,
                Some(_) if self.peek_keyword("AND") => {
                    self.pos += 1;
                }
                Some(_) => {
                    let (t, pos) = self.next()?;
                    return Err(Self::unexpected(&t, pos));
                }
            }
        }
        Ok(out)
    }

    fn operand(&mut self) -> Result<Operand, FilterError> {
        let (t, pos) = self.next()?;
        match t {
            Token::Ident(name) => Ok(Operand::Field(name)),
            Token::Number(n) => Ok(Operand::Literal(Literal::Number(n))),
            Token::Text(s) => Ok(Operand::Literal(Literal::Text(s))),
            other => Err(Self::unexpected(&other, pos)),
        }
    }

    fn literal(&mut self) -> Result<Literal, FilterError> {
        let (t, pos) = self.next()?;
        match t {
            Token::Number(n) => Ok(Literal::Number(n)),
            Token::Text(s) => Ok(Literal::Text(s)),
            other => Err(Self::unexpected(&other, pos)),
        }
    }

    fn condition(&mut self) -> Result<Condition, FilterError> {
        let lhs = self.operand()?;

        if self.peek_keyword("IS") {
            self.pos += 1;
            let negated = self.peek_keyword("NOT");
            if negated {
                self.pos += 1;
            }
            self.expect_keyword("NULL")?;
            return match lhs {
                Operand::Field(field) => Ok(Condition::IsNull { field, negated }),
                Operand::Literal(_) => Err(FilterError::UnexpectedToken {
                    token: "IS".into(),
                    pos: self.tokens[self.pos - 1].1,
                }),
            };
        }

        if self.peek_keyword("IN") {
            self.pos += 1;
            let (t, pos) = self.next()?;
            if t != Token::LParen {
                return Err(Self::unexpected(&t, pos));
            }
            let mut values = vec![self.literal()?];
            loop {
                let (t, pos) = self.next()?;
                match t {
                    Token::Comma => values.push(self.literal()?),
                    Token::RParen => break,
                    other => return Err(Self::unexpected(&other, pos)),
                }
            }
            return Ok(Condition::In {
                operand: lhs,
                values,
            });
        }

        let (t, pos) = self.next()?;
        let Token::Op(op) = t else {
            return Err(Self::unexpected(&t, pos));
        };
        let rhs = self.operand()?;
        Ok(Condition::Compare(lhs, op, rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_and_tautology_match_everything() {
        let row = attrs(json!({ "A": 1 }));
        assert!(RowFilter::parse("").unwrap().matches(&row));
        assert!(RowFilter::parse("1=1").unwrap().matches(&row));
        assert!(RowFilter::all().matches(&row));
        assert_eq!(RowFilter::all().to_string(), "1=1");
    }

    #[test]
    fn text_and_number_comparisons() {
        let row = attrs(json!({ "STATUS": "ACTIVE", "AREA_HA": 12.5 }));
        assert!(RowFilter::parse("STATUS = 'ACTIVE'").unwrap().matches(&row));
        assert!(!RowFilter::parse("STATUS <> 'ACTIVE'").unwrap().matches(&row));
        assert!(RowFilter::parse("AREA_HA >= 12.5").unwrap().matches(&row));
        assert!(!RowFilter::parse("AREA_HA < 10").unwrap().matches(&row));
        assert!(
            RowFilter::parse("status = 'ACTIVE' and AREA_HA > 1")
                .map(|f| !f.matches(&row))
                .unwrap(),
            "field names are case-sensitive, so `status` is missing"
        );
        assert!(
            RowFilter::parse("STATUS = 'ACTIVE' and AREA_HA > 1")
                .unwrap()
                .matches(&row)
        );
    }

    #[test]
    fn null_semantics() {
        let row = attrs(json!({ "A": null, "B": "x" }));
        assert!(RowFilter::parse("A IS NULL").unwrap().matches(&row));
        assert!(RowFilter::parse("MISSING is null").unwrap().matches(&row));
        assert!(RowFilter::parse("B IS NOT NULL").unwrap().matches(&row));
        assert!(!RowFilter::parse("A = 'x'").unwrap().matches(&row));
        assert!(!RowFilter::parse("A <> 'x'").unwrap().matches(&row));
    }

    #[test]
    fn in_list_and_escaped_quote() {
        let row = attrs(json!({ "NAME": "O'Hara", "ZONE": 3 }));
        assert!(RowFilter::parse("NAME IN ('Smith', 'O''Hara')").unwrap().matches(&row));
        assert!(RowFilter::parse("ZONE IN (1, 2, 3)").unwrap().matches(&row));
        assert!(!RowFilter::parse("ZONE IN (4)").unwrap().matches(&row));
    }

    #[test]
    fn negative_numbers_parse() {
        let row = attrs(json!({ "X": -5 }));
        assert!(RowFilter::parse("X = -5").unwrap().matches(&row));
        assert!(RowFilter::parse("X < -1.5").unwrap().matches(&row));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(
            RowFilter::parse("NAME = 'open").unwrap_err(),
            FilterError::UnterminatedString(7)
        );
        assert_eq!(RowFilter::parse("NAME =").unwrap_err(), FilterError::UnexpectedEnd);
        assert!(matches!(
            RowFilter::parse("A = 1 OR B = 2").unwrap_err(),
            FilterError::UnexpectedToken { .. }
        ));
        assert!(matches!(
            RowFilter::parse("A ~ 1").unwrap_err(),
            FilterError::UnexpectedToken { .. }
        ));
    }
}
