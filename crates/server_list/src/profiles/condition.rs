//! Profile condition expressions.
//!
//! ```text
//! expr       := and (("or" | "||") and)*
//! and        := unary (("and" | "&&") unary)*
//! unary      := "!" unary | "(" expr ")" | comparison
//! comparison := operand (op operand)?
//! op         := "==" | "=" | "!=" | "~=" | "!~" | "<" | "<=" | ">" | ">="
//! ```
//!
//! Operands are quoted strings, `${domain field}` placeholders, bare words, or any
//! adjacent mix of these. `~=` and `!~` compare ignoring ASCII case. Relational
//! operators compare as integers when both sides are integers and by length
//! otherwise. A lone operand is true when it reads `true`.

use crate::error::{ConditionError, ConditionResult};
use crate::placeholders::PlaceholderSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    NotEq,
    EqIgnoreCase,
    NotEqIgnoreCase,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Quoted(String),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Operand(Vec<Part>),
    Op(CompareOp),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Expr {
    Value(Vec<Part>),
    Compare(Vec<Part>, CompareOp, Vec<Part>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// A parsed condition, reusable across pings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    source: String,
    expr: Expr,
}

impl Condition {
    pub fn parse(source: &str) -> ConditionResult<Self> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ConditionError::Empty);
        }
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if let Some(token) = parser.tokens.get(parser.pos) {
            return Err(ConditionError::UnexpectedToken(
                describe(token),
                parser.pos,
            ));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, set: &PlaceholderSet) -> ConditionResult<bool> {
        eval(&self.expr, set)
    }
}

/// Parses and evaluates `source` against `set`.
pub fn evaluate(source: &str, set: &PlaceholderSet) -> ConditionResult<bool> {
    Condition::parse(source)?.evaluate(set)
}

fn describe(token: &Token) -> String {
    match token {
        Token::Operand(_) => "operand".to_string(),
        Token::Op(op) => format!("{:?}", op),
        Token::And => "and".to_string(),
        Token::Or => "or".to_string(),
        Token::Not => "!".to_string(),
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
    }
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '=' | '!' | '<' | '>' | '~' | '&' | '|' | '\'' | '"')
}

fn tokenize(source: &str) -> ConditionResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let (token, width) = match (c, next) {
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('=', Some('=')) => (Token::Op(CompareOp::Eq), 2),
            ('=', _) => (Token::Op(CompareOp::Eq), 1),
            ('!', Some('=')) => (Token::Op(CompareOp::NotEq), 2),
            ('!', Some('~')) => (Token::Op(CompareOp::NotEqIgnoreCase), 2),
            ('!', _) => (Token::Not, 1),
            ('~', Some('=')) => (Token::Op(CompareOp::EqIgnoreCase), 2),
            ('<', Some('=')) => (Token::Op(CompareOp::LessEq), 2),
            ('<', _) => (Token::Op(CompareOp::Less), 1),
            ('>', Some('=')) => (Token::Op(CompareOp::GreaterEq), 2),
            ('>', _) => (Token::Op(CompareOp::Greater), 1),
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            ('~' | '&' | '|', _) => {
                return Err(ConditionError::UnexpectedToken(c.to_string(), i));
            }
            _ => {
                let (parts, end) = read_operand(&chars, i)?;
                i = end;
                tokens.push(keyword(parts));
                continue;
            }
        };
        tokens.push(token);
        i += width;
    }

    Ok(tokens)
}

fn keyword(parts: Vec<Part>) -> Token {
    if let [Part::Literal(word)] = parts.as_slice() {
        if word.eq_ignore_ascii_case("and") {
            return Token::And;
        }
        if word.eq_ignore_ascii_case("or") {
            return Token::Or;
        }
    }
    Token::Operand(parts)
}

/// Reads adjacent literal, quoted and placeholder pieces into one operand.
fn read_operand(chars: &[char], start: usize) -> ConditionResult<(Vec<Part>, usize)> {
    let mut parts = Vec::new();
    let mut i = start;

    while i < chars.len() {
        let c = chars[i];
        if c == '\'' || c == '"' {
            let close = chars[i + 1..]
                .iter()
                .position(|&q| q == c)
                .ok_or(ConditionError::UnterminatedString(i))?;
            let text: String = chars[i + 1..i + 1 + close].iter().collect();
            parts.push(Part::Quoted(text));
            i += close + 2;
        } else if c == '$' && chars.get(i + 1) == Some(&'{') {
            let close = chars[i..]
                .iter()
                .position(|&b| b == '}')
                .ok_or(ConditionError::UnterminatedPlaceholder(i))?;
            parts.push(Part::Placeholder(chars[i..=i + close].iter().collect()));
            i += close + 1;
        } else if is_delimiter(c) {
            break;
        } else {
            let mut word = String::new();
            while i < chars.len() && !is_delimiter(chars[i]) && !(chars[i] == '$' && chars.get(i + 1) == Some(&'{')) {
                word.push(chars[i]);
                i += 1;
            }
            parts.push(Part::Literal(word));
        }
    }

    Ok((parts, i))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_or(&mut self) -> ConditionResult<Expr> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ConditionResult<Expr> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ConditionResult<Expr> {
        let position = self.pos;
        match self.next() {
            Some(Token::Not) => Ok(Expr::Not(Box::new(self.parse_unary()?))),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ConditionError::UnexpectedToken(describe(&other), self.pos - 1)),
                    None => Err(ConditionError::UnexpectedEnd),
                }
            }
            Some(Token::Operand(left)) => {
                if let Some(Token::Op(op)) = self.peek().cloned() {
                    self.pos += 1;
                    match self.next() {
                        Some(Token::Operand(right)) => Ok(Expr::Compare(left, op, right)),
                        Some(other) => Err(ConditionError::UnexpectedToken(describe(&other), self.pos - 1)),
                        None => Err(ConditionError::UnexpectedEnd),
                    }
                } else {
                    Ok(Expr::Value(left))
                }
            }
            Some(other) => Err(ConditionError::UnexpectedToken(describe(&other), position)),
            None => Err(ConditionError::UnexpectedEnd),
        }
    }
}

fn resolve(parts: &[Part], set: &PlaceholderSet) -> ConditionResult<String> {
    let mut out = String::new();
    for part in parts {
        match part {
            Part::Literal(text) | Part::Quoted(text) => out.push_str(text),
            Part::Placeholder(token) => match set.get(token) {
                Some(value) => out.push_str(&value.to_string()),
                None => return Err(ConditionError::UnresolvedPlaceholder(token.clone())),
            },
        }
    }
    Ok(out)
}

fn eval(expr: &Expr, set: &PlaceholderSet) -> ConditionResult<bool> {
    match expr {
        Expr::Value(parts) => Ok(resolve(parts, set)?.trim().eq_ignore_ascii_case("true")),
        Expr::Not(inner) => Ok(!eval(inner, set)?),
        Expr::And(left, right) => Ok(eval(left, set)? && eval(right, set)?),
        Expr::Or(left, right) => Ok(eval(left, set)? || eval(right, set)?),
        Expr::Compare(left, op, right) => {
            let left = resolve(left, set)?;
            let right = resolve(right, set)?;
            Ok(compare(&left, *op, &right))
        }
    }
}

fn compare(left: &str, op: CompareOp, right: &str) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::NotEq => left != right,
        CompareOp::EqIgnoreCase => left.eq_ignore_ascii_case(right),
        CompareOp::NotEqIgnoreCase => !left.eq_ignore_ascii_case(right),
        _ => {
            let ordering = match (left.trim().parse::<i64>(), right.trim().parse::<i64>()) {
                (Ok(l), Ok(r)) => l.cmp(&r),
                _ => left.chars().count().cmp(&right.chars().count()),
            };
            match op {
                CompareOp::Less => ordering.is_lt(),
                CompareOp::LessEq => ordering.is_le(),
                CompareOp::Greater => ordering.is_gt(),
                _ => ordering.is_ge(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholders::{PlaceholderSource, PlayerContext, ServerContext};

    fn set() -> PlaceholderSet {
        let player = PlayerContext::new("Andre_601", 763);
        let server = ServerContext::new(5, 20, Some("Play.Example.net".into()));
        player.placeholders().merge(&server.placeholders())
    }

    fn check(source: &str) -> bool {
        evaluate(source, &set()).unwrap_or_else(|e| panic!("{} failed: {}", source, e))
    }

    #[test]
    fn test_equality_operators() {
        assert!(check("${player name} == Andre_601"));
        assert!(check("${player name} = Andre_601"));
        assert!(!check("${player name} == andre_601"));
        assert!(check("${player name} ~= andre_601"));
        assert!(check("${player name} != Steve"));
        assert!(check("${server host} !~ other.net"));
        assert!(check("${server host} ~= play.example.net"));
    }

    #[test]
    fn test_relational_operators() {
        assert!(check("${server playersOnline} < ${server playersMax}"));
        assert!(check("${server playersOnline} >= 5"));
        assert!(!check("${server playersOnline} > 5"));
        // 9 < 10 numerically even though "9" > "10" as text
        assert!(check("9 < 10"));
        // non numbers compare by length
        assert!(check("abc > ab"));
        assert!(check("${player name} <= 'nine char'"));
    }

    #[test]
    fn test_boolean_logic() {
        assert!(check("${player protocol} >= 760 and ${server playersOnline} < 10"));
        assert!(check("${player name} == Steve || ${player name} == Andre_601"));
        assert!(!check("!(${player name} == Andre_601)"));
        assert!(check("!${player hasPlayedBefore}"));
        assert!(check("true"));
        assert!(!check("false"));
        // and binds tighter than or
        assert!(check("true or false and false"));
        assert!(!check("(true or false) and false"));
    }

    #[test]
    fn test_quoted_and_concatenated_operands() {
        assert!(check("'${player name}' == '${player name}'"));
        assert!(check("${player name}_x == Andre_601_x"));
        assert!(check("\"and\" == 'and'"));
        assert!(check("'a b' == \"a b\""));
    }

    #[test]
    fn test_short_circuit_skips_unresolved() {
        assert!(!check("false and ${player missing} == x"));
        assert!(check("true or ${player missing} == x"));
    }

    #[test]
    fn test_errors() {
        let set = set();
        assert_eq!(evaluate("", &set), Err(ConditionError::Empty));
        assert_eq!(evaluate("${player name} ==", &set), Err(ConditionError::UnexpectedEnd));
        assert_eq!(
            evaluate("${player missing} == x", &set),
            Err(ConditionError::UnresolvedPlaceholder("${player missing}".into()))
        );
        assert!(matches!(evaluate("'open", &set), Err(ConditionError::UnterminatedString(0))));
        assert!(matches!(evaluate("${player name", &set), Err(ConditionError::UnterminatedPlaceholder(0))));
        assert!(matches!(evaluate("(true", &set), Err(ConditionError::UnexpectedEnd)));
        assert!(matches!(evaluate("true )", &set), Err(ConditionError::UnexpectedToken(_, 1))));
        assert!(matches!(evaluate("a == == b", &set), Err(ConditionError::UnexpectedToken(_, _))));
        assert!(matches!(evaluate("a & b", &set), Err(ConditionError::UnexpectedToken(_, 2))));
    }

    #[test]
    fn test_parsed_condition_is_reusable() {
        let condition = Condition::parse("${server playersOnline} > 3").unwrap();
        assert_eq!(condition.source(), "${server playersOnline} > 3");
        assert!(condition.evaluate(&set()).unwrap());
        let empty_server = ServerContext::new(1, 20, None).placeholders();
        assert!(!condition.evaluate(&empty_server).unwrap());
    }
}
