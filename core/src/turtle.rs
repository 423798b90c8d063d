//! Turtle serialization of a [`Graph`].
//!
//! The writer groups triples by subject and abbreviates IRIs in the `db`,
//! `rdf`, `rdfs` and `xsd` namespaces to prefixed names when the local part
//! is a plain identifier; everything else is written as `<...>`.
//!
//! The reader accepts the subset of Turtle that the writer produces, plus
//! object lists (`,`), comments, bare booleans and bare integers. It exists
//! so that written files can be checked against the in-memory graph.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io;

use thiserror::Error;

use crate::naming::is_turtle_local_name;
use crate::rdf::{DB_NS, Graph, Literal, RDF_NS, RDFS_NS, Term, Triple};
use crate::types::{DataType, XSD_NS};

const PREFIXES: [(&str, &str); 4] = [
    ("db", DB_NS),
    ("rdf", RDF_NS),
    ("rdfs", RDFS_NS),
    ("xsd", XSD_NS),
];

/// Errors from reading or writing Turtle.
#[derive(Debug, Error)]
pub enum TurtleError {
    /// Input does not follow the supported grammar.
    #[error("turtle syntax error at line {line}: {message}")]
    Syntax {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },

    /// A prefixed name used a prefix that was never declared.
    #[error("undefined prefix '{0}'")]
    UndefinedPrefix(String),

    /// The output sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Renders `graph` as a Turtle document.
///
/// Subjects appear in sorted order; within a subject `rdf:type` comes
/// first, written as `a`.
pub fn to_turtle_string(graph: &Graph) -> String {
    let mut out = String::new();
    for (prefix, ns) in PREFIXES {
        let _ = writeln!(out, "@prefix {prefix}: <{ns}> .");
    }

    let rdf_type = format!("{RDF_NS}type");
    let mut groups: Vec<Vec<&Triple>> = Vec::new();
    for triple in graph.iter() {
        match groups.last_mut() {
            Some(group) if group[0].subject == triple.subject => group.push(triple),
            _ => groups.push(vec![triple]),
        }
    }

    for mut group in groups {
        group.sort_by_key(|t| t.predicate != rdf_type);
        out.push('\n');
        out.push_str(&format_iri(&group[0].subject));
        for (i, triple) in group.iter().enumerate() {
            out.push_str(if i == 0 { " " } else { " ;\n    " });
            if triple.predicate == rdf_type {
                out.push('a');
            } else {
                out.push_str(&format_iri(&triple.predicate));
            }
            out.push(' ');
            out.push_str(&format_term(&triple.object));
        }
        out.push_str(" .\n");
    }
    out
}

/// Writes `graph` as Turtle to `writer`.
///
/// # Errors
///
/// Returns [`TurtleError::Io`] if the writer fails.
pub fn write_turtle(graph: &Graph, mut writer: impl io::Write) -> Result<(), TurtleError> {
    writer.write_all(to_turtle_string(graph).as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn format_iri(iri: &str) -> String {
    for (prefix, ns) in PREFIXES {
        if let Some(local) = iri.strip_prefix(ns) {
            if is_turtle_local_name(local) {
                return format!("{prefix}:{local}");
            }
        }
    }
    let mut out = String::with_capacity(iri.len() + 2);
    out.push('<');
    for ch in iri.chars() {
        if ch <= ' ' || matches!(ch, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\') {
            let _ = write!(out, "\\u{:04X}", ch as u32);
        } else {
            out.push(ch);
        }
    }
    out.push('>');
    out
}

fn format_term(term: &Term) -> String {
    match term {
        Term::Iri(iri) => format_iri(iri),
        Term::Literal(lit) => {
            let mut out = String::with_capacity(lit.lexical.len() + 2);
            out.push('"');
            for ch in lit.lexical.chars() {
                match ch {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    '\u{8}' => out.push_str("\\b"),
                    '\u{c}' => out.push_str("\\f"),
                    c if (c as u32) < 0x20 || c == '\u{7f}' => {
                        let _ = write!(out, "\\u{:04X}", c as u32);
                    }
                    c => out.push(c),
                }
            }
            out.push('"');
            if let Some(datatype) = &lit.datatype {
                out.push_str("^^");
                out.push_str(&format_iri(datatype));
            }
            out
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    PrefixDirective,
    Iri(String),
    PrefixedName(String, String),
    A,
    String(String),
    DatatypeMarker,
    Boolean(bool),
    Integer(String),
    Dot,
    Semicolon,
    Comma,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> TurtleError {
        TurtleError::Syntax {
            line: self.line,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn tokens(mut self) -> Result<Vec<(Token, usize)>, TurtleError> {
        let mut tokens = Vec::new();
        while let Some(ch) = self.peek() {
            let line = self.line;
            match ch {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '#' => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                '<' => {
                    self.bump();
                    let iri = self.read_iri()?;
                    tokens.push((Token::Iri(iri), line));
                }
                '"' => {
                    self.bump();
                    let value = self.read_string()?;
                    tokens.push((Token::String(value), line));
                }
                '^' => {
                    self.bump();
                    if self.bump() != Some('^') {
                        return Err(self.error("expected '^^'"));
                    }
                    tokens.push((Token::DatatypeMarker, line));
                }
                '.' => {
                    self.bump();
                    tokens.push((Token::Dot, line));
                }
                ';' => {
                    self.bump();
                    tokens.push((Token::Semicolon, line));
                }
                ',' => {
                    self.bump();
                    tokens.push((Token::Comma, line));
                }
                '@' => {
                    self.bump();
                    let word = self.read_word();
                    if word != "prefix" {
                        return Err(self.error(format!("unsupported directive '@{word}'")));
                    }
                    tokens.push((Token::PrefixDirective, line));
                }
                _ => {
                    let word = self.read_word();
                    if word.is_empty() {
                        return Err(self.error(format!("unexpected character '{ch}'")));
                    }
                    tokens.push((self.classify_word(word)?, line));
                }
            }
        }
        Ok(tokens)
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, ';' | ',' | '<' | '"' | '#' | '^') {
                break;
            }
            // A trailing dot terminates the statement rather than the name.
            if c == '.' && self.peek_next().is_none_or(|n| !is_name_char(n)) {
                break;
            }
            word.push(c);
            self.bump();
        }
        word
    }

    fn classify_word(&self, word: String) -> Result<Token, TurtleError> {
        match word.as_str() {
            "a" => return Ok(Token::A),
            "true" => return Ok(Token::Boolean(true)),
            "false" => return Ok(Token::Boolean(false)),
            _ => {}
        }
        let digits = word.strip_prefix(['+', '-']).unwrap_or(word.as_str());
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Token::Integer(word));
        }
        match word.split_once(':') {
            Some((prefix, local)) => Ok(Token::PrefixedName(prefix.to_string(), local.to_string())),
            None => Err(self.error(format!("unexpected token '{word}'"))),
        }
    }

    fn read_iri(&mut self) -> Result<String, TurtleError> {
        let mut iri = String::new();
        loop {
            match self.bump() {
                Some('>') => return Ok(iri),
                Some('\\') => iri.push(self.read_unicode_escape()?),
                Some(c) if c <= ' ' => return Err(self.error("whitespace in IRI")),
                Some(c) => iri.push(c),
                None => return Err(self.error("unterminated IRI")),
            }
        }
    }

    fn read_string(&mut self) -> Result<String, TurtleError> {
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(value),
                Some('\\') => match self.peek() {
                    Some('u' | 'U') => value.push(self.read_unicode_escape()?),
                    Some(c) => {
                        self.bump();
                        value.push(match c {
                            'n' => '\n',
                            'r' => '\r',
                            't' => '\t',
                            'b' => '\u{8}',
                            'f' => '\u{c}',
                            '"' => '"',
                            '\'' => '\'',
                            '\\' => '\\',
                            other => {
                                return Err(self.error(format!("invalid escape '\\{other}'")));
                            }
                        });
                    }
                    None => return Err(self.error("unterminated string")),
                },
                Some('\n') => return Err(self.error("newline in string literal")),
                Some(c) => value.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    /// Reads `uXXXX` or `UXXXXXXXX` after a backslash.
    fn read_unicode_escape(&mut self) -> Result<char, TurtleError> {
        let width = match self.bump() {
            Some('u') => 4,
            Some('U') => 8,
            _ => return Err(self.error("expected unicode escape")),
        };
        let mut hex = String::with_capacity(width);
        for _ in 0..width {
            match self.bump() {
                Some(c) if c.is_ascii_hexdigit() => hex.push(c),
                _ => return Err(self.error("invalid unicode escape")),
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error("invalid code point"))
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '%' | '.')
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    prefixes: HashMap<String, String>,
}

impl Parser {
    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn error(&self, message: impl Into<String>) -> TurtleError {
        let line = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .or_else(|| self.tokens.last())
            .map_or(1, |(_, line)| *line);
        TurtleError::Syntax {
            line,
            message: message.into(),
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), TurtleError> {
        match self.next() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(self.error(format!("expected {expected:?}, found {token:?}"))),
            None => Err(self.error(format!("expected {expected:?}, found end of input"))),
        }
    }

    fn expand(&self, prefix: &str, local: &str) -> Result<String, TurtleError> {
        self.prefixes
            .get(prefix)
            .map(|ns| format!("{ns}{local}"))
            .ok_or_else(|| TurtleError::UndefinedPrefix(prefix.to_string()))
    }

    fn iri(&mut self) -> Result<String, TurtleError> {
        match self.next() {
            Some(Token::Iri(iri)) => Ok(iri),
            Some(Token::PrefixedName(prefix, local)) => self.expand(&prefix, &local),
            Some(token) => Err(self.error(format!("expected IRI, found {token:?}"))),
            None => Err(self.error("expected IRI, found end of input")),
        }
    }

    fn verb(&mut self) -> Result<String, TurtleError> {
        if self.peek() == Some(&Token::A) {
            self.pos += 1;
            return Ok(format!("{RDF_NS}type"));
        }
        self.iri()
    }

    fn object(&mut self) -> Result<Term, TurtleError> {
        match self.peek().cloned() {
            Some(Token::String(lexical)) => {
                self.pos += 1;
                if self.peek() == Some(&Token::DatatypeMarker) {
                    self.pos += 1;
                    let datatype = self.iri()?;
                    Ok(Literal::typed(lexical, datatype).into())
                } else {
                    Ok(Literal::plain(lexical).into())
                }
            }
            Some(Token::Boolean(value)) => {
                self.pos += 1;
                Ok(Literal::boolean(value).into())
            }
            Some(Token::Integer(lexical)) => {
                self.pos += 1;
                Ok(Literal::typed(lexical, DataType::Integer.xsd_iri()).into())
            }
            _ => Ok(Term::Iri(self.iri()?)),
        }
    }

    fn prefix_directive(&mut self) -> Result<(), TurtleError> {
        let prefix = match self.next() {
            Some(Token::PrefixedName(prefix, local)) if local.is_empty() => prefix,
            _ => return Err(self.error("expected prefix name after @prefix")),
        };
        let ns = match self.next() {
            Some(Token::Iri(ns)) => ns,
            _ => return Err(self.error("expected namespace IRI")),
        };
        self.expect(&Token::Dot)?;
        self.prefixes.insert(prefix, ns);
        Ok(())
    }

    fn statement(&mut self, graph: &mut Graph) -> Result<(), TurtleError> {
        let subject = self.iri()?;
        loop {
            let predicate = self.verb()?;
            loop {
                let object = self.object()?;
                graph.insert(Triple::new(&subject, &predicate, object));
                if self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            match self.next() {
                Some(Token::Semicolon) => {
                    // Trailing ';' before the terminating '.'.
                    if self.peek() == Some(&Token::Dot) {
                        self.pos += 1;
                        return Ok(());
                    }
                }
                Some(Token::Dot) => return Ok(()),
                Some(token) => return Err(self.error(format!("expected ';' or '.', found {token:?}"))),
                None => return Err(self.error("unterminated statement")),
            }
        }
    }
}

/// Parses a Turtle document into a [`Graph`].
///
/// # Errors
///
/// Returns [`TurtleError::Syntax`] for input outside the supported subset
/// and [`TurtleError::UndefinedPrefix`] for undeclared prefixes.
pub fn parse_turtle(input: &str) -> Result<Graph, TurtleError> {
    let tokens = Lexer::new(input).tokens()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        prefixes: HashMap::new(),
    };
    let mut graph = Graph::new();
    while let Some(token) = parser.peek() {
        if *token == Token::PrefixDirective {
            parser.pos += 1;
            parser.prefix_directive()?;
        } else {
            parser.statement(&mut graph)?;
        }
    }
    Ok(graph)
}
