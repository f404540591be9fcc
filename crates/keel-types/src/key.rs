//! Primary-key declarations.
//!
//! Entities declare their key with a small grammar:
//!
//! ```text
//! tag        := setting ("," setting)*
//! setting    := "name" "=" IDENT | "primaryKey" "=" key
//! key        := IDENT | "(" key_list ")"
//! key_list   := partition ("," clustering)*
//! partition  := IDENT | "(" IDENT ("," IDENT)* ")"
//! clustering := IDENT ["asc" | "desc"]
//! ```
//!
//! `primaryKey=Id` and `primaryKey=(Id)` both declare a single partition
//! component. `((A, B), C desc)` declares a composite partition key `A, B`
//! and a descending clustering component `C`. Clustering components default
//! to ascending.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// Direction of a clustering component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// One clustering component.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusteringKey {
    pub name: String,
    pub order: SortOrder,
}

impl ClusteringKey {
    pub fn new(name: impl Into<String>, order: SortOrder) -> Self {
        Self {
            name: name.into(),
            order,
        }
    }

    pub fn descending(&self) -> bool {
        self.order == SortOrder::Desc
    }
}

/// Ordered partition components followed by ordered clustering components.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub partition_keys: Vec<String>,
    pub clustering_keys: Vec<ClusteringKey>,
}

impl PrimaryKey {
    /// A key with a single partition component and no clustering.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            partition_keys: vec![name.into()],
            clustering_keys: Vec::new(),
        }
    }

    /// Parse the part after `primaryKey=`, e.g. `((A, B), C desc)`.
    pub fn parse(text: &str) -> TypeResult<Self> {
        let mut parser = Parser::new(text)?;
        let key = parser.key()?;
        parser.expect_end()?;
        Ok(key)
    }

    /// All key component names, partition first.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.partition_keys
            .iter()
            .map(String::as_str)
            .chain(self.clustering_keys.iter().map(|c| c.name.as_str()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields().any(|f| f == name)
    }

    pub fn len(&self) -> usize {
        self.partition_keys.len() + self.clustering_keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partition_keys.is_empty()
    }
}

impl FromStr for PrimaryKey {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Canonical rendering, accepted back by [`PrimaryKey::parse`].
impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        if self.partition_keys.len() == 1 {
            f.write_str(&self.partition_keys[0])?;
        } else {
            write!(f, "({})", self.partition_keys.join(", "))?;
        }
        for c in &self.clustering_keys {
            write!(f, ", {}", c.name)?;
            if c.descending() {
                f.write_str(" desc")?;
            }
        }
        f.write_str(")")
    }
}

/// A full entity declaration tag: optional name override plus primary key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityTag {
    pub name: Option<String>,
    pub primary_key: PrimaryKey,
}

impl EntityTag {
    /// Parse `name=foo, primaryKey=(...)`. The primary key is required.
    pub fn parse(tag: &str) -> TypeResult<Self> {
        let mut parser = Parser::new(tag)?;
        let mut name = None;
        let mut primary_key = None;

        loop {
            let (offset, setting) = parser.ident()?;
            parser.expect(Token::Eq)?;
            match setting.as_str() {
                "name" if name.is_none() => name = Some(parser.ident()?.1),
                "primaryKey" if primary_key.is_none() => primary_key = Some(parser.key()?),
                "name" | "primaryKey" => {
                    return Err(key_error(offset, format!("duplicate setting {setting:?}")));
                }
                other => {
                    return Err(key_error(offset, format!("unknown setting {other:?}")));
                }
            }
            if !parser.eat(&Token::Comma) {
                break;
            }
        }
        parser.expect_end()?;

        let primary_key =
            primary_key.ok_or_else(|| key_error(0, "missing primaryKey setting".into()))?;
        Ok(Self { name, primary_key })
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Ident(String),
    LParen,
    RParen,
    Comma,
    Eq,
    End,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "identifier {s:?}"),
            Token::LParen => f.write_str("'('"),
            Token::RParen => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
            Token::Eq => f.write_str("'='"),
            Token::End => f.write_str("end of input"),
        }
    }
}

fn key_error(offset: usize, message: String) -> TypeError {
    TypeError::KeySpec { offset, message }
}

fn tokenize(input: &str) -> TypeResult<Vec<(usize, Token)>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, ch)) = chars.peek() {
        let token = match ch {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '=' => Token::Eq,
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !(c.is_ascii_alphanumeric() || c == '_') {
                        break;
                    }
                    ident.push(c);
                    chars.next();
                }
                tokens.push((offset, Token::Ident(ident)));
                continue;
            }
            other => return Err(key_error(offset, format!("unexpected character {other:?}"))),
        };
        chars.next();
        tokens.push((offset, token));
    }

    tokens.push((input.len(), Token::End));
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> TypeResult<Self> {
        Ok(Self {
            tokens: tokenize(input)?,
            pos: 0,
        })
    }

    fn peek(&self) -> &(usize, Token) {
        // The token list always ends with `End`, and `End` is never consumed.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> (usize, Token) {
        let tok = self.peek().clone();
        if tok.1 != Token::End {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if &self.peek().1 == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> TypeResult<()> {
        let (offset, found) = self.advance();
        if found == expected {
            Ok(())
        } else {
            Err(key_error(offset, format!("expected {expected}, found {found}")))
        }
    }

    fn expect_end(&mut self) -> TypeResult<()> {
        let (offset, found) = self.peek().clone();
        if found == Token::End {
            Ok(())
        } else {
            Err(key_error(offset, format!("unexpected trailing {found}")))
        }
    }

    fn ident(&mut self) -> TypeResult<(usize, String)> {
        match self.advance() {
            (offset, Token::Ident(name)) => Ok((offset, name)),
            (offset, found) => Err(key_error(offset, format!("expected identifier, found {found}"))),
        }
    }

    /// `key := IDENT | "(" key_list ")"`
    fn key(&mut self) -> TypeResult<PrimaryKey> {
        let start = self.peek().0;
        let key = if self.eat(&Token::LParen) {
            let key = self.key_list()?;
            self.expect(Token::RParen)?;
            key
        } else {
            let (_, name) = self.ident()?;
            PrimaryKey::single(name)
        };
        check_unique(&key, start)?;
        Ok(key)
    }

    /// `key_list := partition ("," clustering)*`
    fn key_list(&mut self) -> TypeResult<PrimaryKey> {
        let partition_keys = self.partition()?;
        let mut clustering_keys = Vec::new();
        while self.eat(&Token::Comma) {
            clustering_keys.push(self.clustering()?);
        }
        Ok(PrimaryKey {
            partition_keys,
            clustering_keys,
        })
    }

    /// `partition := IDENT | "(" IDENT ("," IDENT)* ")"`
    fn partition(&mut self) -> TypeResult<Vec<String>> {
        if self.eat(&Token::LParen) {
            let mut names = vec![self.ident()?.1];
            while self.eat(&Token::Comma) {
                names.push(self.ident()?.1);
            }
            self.expect(Token::RParen)?;
            return Ok(names);
        }

        let (_, name) = self.ident()?;
        if let (offset, Token::Ident(word)) = self.peek().clone() {
            if parse_order(&word).is_some() {
                return Err(key_error(
                    offset,
                    format!("partition component {name:?} cannot have a sort order"),
                ));
            }
        }
        Ok(vec![name])
    }

    /// `clustering := IDENT ["asc" | "desc"]`
    fn clustering(&mut self) -> TypeResult<ClusteringKey> {
        let (_, name) = self.ident()?;
        let order = match self.peek().clone() {
            (offset, Token::Ident(word)) => {
                let order = parse_order(&word).ok_or_else(|| {
                    key_error(offset, format!("expected 'asc' or 'desc', found {word:?}"))
                })?;
                self.advance();
                order
            }
            _ => SortOrder::Asc,
        };
        Ok(ClusteringKey { name, order })
    }
}

fn parse_order(word: &str) -> Option<SortOrder> {
    if word.eq_ignore_ascii_case("asc") {
        Some(SortOrder::Asc)
    } else if word.eq_ignore_ascii_case("desc") {
        Some(SortOrder::Desc)
    } else {
        None
    }
}

fn check_unique(key: &PrimaryKey, offset: usize) -> TypeResult<()> {
    let mut seen = std::collections::HashSet::new();
    for name in key.fields() {
        if !seen.insert(name) {
            return Err(key_error(offset, format!("duplicate key component {name:?}")));
        }
    }
    Ok(())
}
