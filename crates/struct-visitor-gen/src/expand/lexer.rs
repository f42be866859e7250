use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use super::ExpandError;

const PUNCT_3: &[&str] = &["...", "<<=", ">>="];
const PUNCT_2: &[&str] = &[
    "##", "::", "->", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "++", "--", "+=", "-=", "*=",
    "/=", "%=", "&=", "|=", "^=",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Char,
    Punct,
    /// Stands in for an empty argument next to `##`, removed before rescanning.
    Placemarker,
}

/// Macro names a token may no longer expand to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HideSet(Rc<BTreeSet<Rc<str>>>);

impl HideSet {
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn with(&self, name: &Rc<str>) -> Self {
        if self.contains(name) {
            return self.clone();
        }
        let mut set = (*self.0).clone();
        set.insert(Rc::clone(name));
        Self(Rc::new(set))
    }

    pub fn union(&self, other: &Self) -> Self {
        if other.0.is_subset(&self.0) {
            return self.clone();
        }
        Self(Rc::new(self.0.union(&other.0).cloned().collect()))
    }

    pub fn intersection(&self, other: &Self) -> Self {
        Self(Rc::new(self.0.intersection(&other.0).cloned().collect()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: Rc<str>,
    /// Preceded by whitespace in the source. Only stringification looks at this.
    pub space_before: bool,
    pub hide: HideSet,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, text: &str, space_before: bool) -> Self {
        Self {
            kind,
            text: Rc::from(text),
            space_before,
            hide: HideSet::default(),
        }
    }

    pub(crate) fn placemarker() -> Self {
        Self::new(TokenKind::Placemarker, "", false)
    }

    pub fn is_punct(&self, punct: &str) -> bool {
        self.kind == TokenKind::Punct && &*self.text == punct
    }

    pub fn is_ident(&self, ident: &str) -> bool {
        self.kind == TokenKind::Ident && &*self.text == ident
    }

    pub fn ident(&self) -> Option<&str> {
        (self.kind == TokenKind::Ident).then_some(&*self.text)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Replaces comments with a single space and joins backslash-continued lines, leaving one
/// logical line per directive. Newlines inside block comments are kept so line structure holds.
pub fn logical_lines(source: &str) -> Result<Vec<String>, ExpandError> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                current.push(c);
                let mut escaped = false;
                loop {
                    let Some(next) = chars.next() else {
                        return Err(ExpandError::UnterminatedLiteral(current));
                    };
                    if next == '\n' {
                        return Err(ExpandError::UnterminatedLiteral(current));
                    }
                    current.push(next);
                    match next {
                        '\\' if !escaped => escaped = true,
                        _ if next == c && !escaped => break,
                        _ => escaped = false,
                    }
                }
            }
            '/' if chars.peek() == Some(&'/') => {
                while chars.peek().is_some_and(|next| *next != '\n') {
                    chars.next();
                }
                current.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut closed = false;
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        closed = true;
                        break;
                    }
                    if next == '\n' {
                        lines.push(std::mem::take(&mut current));
                    }
                    prev = next;
                }
                if !closed {
                    return Err(ExpandError::UnterminatedComment);
                }
                current.push(' ');
            }
            '\\' if matches!(chars.peek(), Some('\n' | '\r')) => {
                if chars.next() == Some('\r') && chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\n' => lines.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    Ok(lines)
}

/// Splits one comment-free logical line into preprocessing tokens.
pub fn lex(line: &str) -> Result<Vec<Token>, ExpandError> {
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut space_before = false;

    while pos < bytes.len() {
        let b = bytes[pos];

        if b.is_ascii_whitespace() {
            space_before = true;
            pos += 1;
            continue;
        }

        let start = pos;
        let kind = if b.is_ascii_alphabetic() || b == b'_' {
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            TokenKind::Ident
        } else if b.is_ascii_digit()
            || (b == b'.' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit))
        {
            pos += 1;
            while pos < bytes.len() {
                let c = bytes[pos];
                if matches!(c, b'+' | b'-') && matches!(bytes[pos - 1], b'e' | b'E' | b'p' | b'P') {
                    pos += 1;
                } else if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' {
                    pos += 1;
                } else {
                    break;
                }
            }
            TokenKind::Number
        } else if b == b'"' || b == b'\'' {
            pos += 1;
            let mut closed = false;
            while pos < bytes.len() {
                match bytes[pos] {
                    b'\\' => pos += 2,
                    c if c == b => {
                        pos += 1;
                        closed = true;
                        break;
                    }
                    _ => pos += 1,
                }
            }
            if !closed {
                return Err(ExpandError::UnterminatedLiteral(line[start..].to_owned()));
            }
            if b == b'"' {
                TokenKind::Str
            } else {
                TokenKind::Char
            }
        } else {
            let rest = &line[pos..];
            let len = PUNCT_3
                .iter()
                .chain(PUNCT_2)
                .find(|punct| rest.starts_with(**punct))
                .map(|punct| punct.len())
                .unwrap_or_else(|| rest.chars().next().map_or(1, char::len_utf8));
            pos += len;
            TokenKind::Punct
        };

        tokens.push(Token::new(kind, &line[start..pos], space_before));
        space_before = false;
    }

    Ok(tokens)
}

/// Renders tokens with one space between them, except around `(`, `)`, `,`, `.` and the like,
/// so that expansions compare as plain strings.
pub fn render(tokens: &[Token]) -> String {
    let mut dst = String::new();
    let mut prev: Option<&Token> = None;

    for token in tokens.iter().filter(|t| t.kind != TokenKind::Placemarker) {
        if let Some(prev) = prev {
            let glued_to_prev = matches!(&*token.text, "," | ")" | "." | ";" | "]")
                && token.kind == TokenKind::Punct;
            let glued_to_next = matches!(&*prev.text, "(" | "." | "[" | "#")
                && prev.kind == TokenKind::Punct;
            let call = token.is_punct("(") && prev.kind == TokenKind::Ident;

            if !(glued_to_prev || glued_to_next || call) {
                dst.push(' ');
            }
        }
        dst.push_str(&token.text);
        prev = Some(token);
    }

    dst
}
