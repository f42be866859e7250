//! A small model of the C preprocessor's macro expansion.
//!
//! Covers what the generated header relies on: object and function-like `#define`, `#undef`,
//! variadic parameters with `__VA_ARGS__` and `__VA_OPT__`, `#` and `##`, and rescanning with
//! hide sets so a macro never re-expands inside its own replacement. Every other directive is
//! skipped. This is enough to follow an entry macro call through counting, pasting and arity
//! dispatch down to the glue macros, and to show where dispatch fails.
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

mod lexer;
mod macros;

pub use lexer::{Token, TokenKind};
pub(crate) use lexer::lex;
use lexer::{HideSet, logical_lines, render};
use macros::MacroDef;

use crate::dispatch::DispatchTable;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpandError {
    #[error("unterminated literal: {0}")]
    UnterminatedLiteral(String),
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("malformed #define: {0}")]
    MalformedDefine(String),
    #[error("'#' in the body of {macro_name} is not followed by a parameter")]
    StrayStringize { macro_name: String },
    #[error("'##' cannot start or end the body of {macro_name}")]
    PasteAtEdge { macro_name: String },
    #[error("unterminated __VA_OPT__ in {macro_name}")]
    UnterminatedVaOpt { macro_name: String },
    #[error("unterminated call to {macro_name}")]
    UnterminatedCall { macro_name: String },
    #[error("{macro_name} takes {expected} argument(s), got {found}")]
    ArgumentCount {
        macro_name: String,
        expected: usize,
        found: usize,
    },
    #[error("pasting '{lhs}' and '{rhs}' does not give a valid token")]
    InvalidPaste { lhs: String, rhs: String },
    #[error("{call} does not name a generated arity macro")]
    UnresolvedDispatch { call: String },
}

#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    macros: HashMap<Rc<str>, MacroDef>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects the `#define`s and `#undef`s of a header.
    pub fn load(&mut self, source: &str) -> Result<(), ExpandError> {
        for line in logical_lines(source)? {
            let tokens = lex(&line)?;

            let [hash, directive, rest @ ..] = tokens.as_slice() else {
                continue;
            };

            if !hash.is_punct("#") {
                continue;
            }

            match directive.ident() {
                Some("define") => {
                    let def = MacroDef::parse(rest, &line)?;
                    if self.macros.contains_key(&def.name) {
                        tracing::debug!(message = "macro redefined", name = %def.name);
                    }
                    self.macros.insert(Rc::clone(&def.name), def);
                }
                Some("undef") => {
                    if let Some(name) = rest.first().and_then(Token::ident) {
                        self.macros.remove(name);
                    }
                }
                _ => (),
            }
        }

        Ok(())
    }

    /// Defines a single macro, given everything after `#define`.
    pub fn define(&mut self, definition: &str) -> Result<(), ExpandError> {
        self.load(&format!("#define {definition}"))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Fully macro-expands `source`.
    pub fn expand(&self, source: &str) -> Result<Expansion, ExpandError> {
        let mut tokens = Vec::new();
        for line in logical_lines(source)? {
            let mut line_tokens = lex(&line)?;
            if let Some(first) = line_tokens.first_mut() {
                first.space_before = !tokens.is_empty();
            }
            tokens.extend(line_tokens);
        }

        Ok(Expansion {
            source: tokens.clone(),
            tokens: self.expand_tokens(tokens)?,
        })
    }

    fn lookup(&self, token: &Token) -> Option<&MacroDef> {
        let name = token.ident()?;
        if token.hide.contains(name) {
            return None;
        }
        self.macros.get(name)
    }

    pub(crate) fn expand_tokens(&self, tokens: Vec<Token>) -> Result<Vec<Token>, ExpandError> {
        let mut input = VecDeque::from(tokens);
        let mut output = Vec::with_capacity(input.len());

        while let Some(token) = input.pop_front() {
            let Some(def) = self.lookup(&token) else {
                output.push(token);
                continue;
            };

            let replacement = match def.params {
                None => {
                    let hide = token.hide.with(&def.name);
                    def.substitute(self, &[], &hide)?
                }
                Some(_) => {
                    if !input.front().is_some_and(|next| next.is_punct("(")) {
                        output.push(token);
                        continue;
                    }
                    input.pop_front();

                    let (args, rparen) = collect_args(&mut input, &def.name)?;
                    let hide = token.hide.intersection(&rparen.hide).with(&def.name);
                    let args = def.bind(args)?;
                    def.substitute(self, &args, &hide)?
                }
            };

            let mut replacement = replacement;
            if let Some(first) = replacement.first_mut() {
                first.space_before = token.space_before;
            }

            for token in replacement.into_iter().rev() {
                input.push_front(token);
            }
        }

        Ok(output)
    }
}

/// Splits the tokens following a call's `(` into top-level arguments, consuming through the
/// matching `)`.
fn collect_args(
    input: &mut VecDeque<Token>,
    macro_name: &str,
) -> Result<(Vec<Vec<Token>>, Token), ExpandError> {
    let mut args = vec![Vec::new()];
    let mut depth = 0_usize;

    while let Some(token) = input.pop_front() {
        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            if depth == 0 {
                return Ok((args, token));
            }
            depth -= 1;
        } else if token.is_punct(",") && depth == 0 {
            args.push(Vec::new());
            continue;
        }

        if let Some(current) = args.last_mut() {
            current.push(token);
        }
    }

    Err(ExpandError::UnterminatedCall {
        macro_name: macro_name.to_owned(),
    })
}

/// The tokens after a call's `(`, up to the matching `)` or the end of input.
fn call_args(tokens: &[Token]) -> &[Token] {
    let mut depth = 0_usize;
    for (idx, token) in tokens.iter().enumerate() {
        if token.is_punct("(") {
            depth += 1;
        } else if token.is_punct(")") {
            if depth == 0 {
                return &tokens[..idx];
            }
            depth -= 1;
        }
    }
    tokens
}

/// The fully expanded token stream of a call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    source: Vec<Token>,
    tokens: Vec<Token>,
}

impl Expansion {
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Identifiers left followed by `(`. After expansion these are calls to something the
    /// preprocessor doesn't know: functions, or macros that were never defined.
    pub fn calls(&self) -> impl Iterator<Item = &str> + '_ {
        self.tokens
            .windows(2)
            .filter(|pair| pair[1].is_punct("("))
            .filter_map(|pair| pair[0].ident())
    }

    /// Field counts of the entry macro calls in the unexpanded source, in order.
    fn entry_field_counts<'s>(&'s self, entry: &'s str) -> impl Iterator<Item = usize> + 's {
        self.source
            .windows(2)
            .enumerate()
            .filter(move |(_, pair)| pair[0].is_ident(entry) && pair[1].is_punct("("))
            .map(move |(idx, _)| DispatchTable::count_fields(call_args(&self.source[idx + 2..])))
    }

    /// Fails if an entry macro call has a field count outside the generated range, or if the
    /// expansion still calls a prefixed macro that isn't part of the header.
    ///
    /// The count is checked on the call site itself. With too many fields the entry macro pastes
    /// a field onto the prefix, and a field such as `_START` lands on a macro that does exist.
    pub fn check_dispatch(&self, dispatch: &DispatchTable<'_>) -> Result<(), ExpandError> {
        let names = dispatch.names();

        for count in self.entry_field_counts(names.entry()) {
            if dispatch.resolve(count).is_err() {
                return Err(ExpandError::UnresolvedDispatch {
                    call: format!("{}{count}", names.entry()),
                });
            }
        }

        match self.calls().find(|call| names.is_dispatch_target(call)) {
            Some(call) => Err(ExpandError::UnresolvedDispatch {
                call: call.to_owned(),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Expansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(&self.tokens))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pp(defs: &[&str]) -> Preprocessor {
        let mut pp = Preprocessor::new();
        for def in defs {
            pp.define(def).unwrap();
        }
        pp
    }

    fn expand(pp: &Preprocessor, src: &str) -> String {
        pp.expand(src).unwrap().to_string()
    }

    #[test]
    fn object_and_function_like() {
        let pp = pp(&["ONE 1", "ADD(a, b) (a + b)"]);
        assert_eq!(expand(&pp, "ADD(ONE, 2)"), "(1 + 2)");
        assert_eq!(expand(&pp, "ADD"), "ADD");
    }

    #[test]
    fn self_reference_does_not_recurse() {
        let pp = pp(&["foo foo + 1", "f(x) f(x) * 2"]);
        assert_eq!(expand(&pp, "foo"), "foo + 1");
        assert_eq!(expand(&pp, "f(3)"), "f(3) * 2");
    }

    #[test]
    fn stringize() {
        let pp = pp(&["STR(x) #x"]);
        assert_eq!(expand(&pp, "STR(field_1)"), "\"field_1\"");
        assert_eq!(expand(&pp, "STR(a  +   b)"), "\"a + b\"");
        assert_eq!(expand(&pp, r#"STR("q")"#), r#""\"q\"""#);
    }

    #[test]
    fn paste_needs_two_steps_to_see_expanded_operands() {
        let pp = pp(&[
            "THREE 3",
            "CAT_IMPL(a, b) a##b",
            "CAT(a, b) CAT_IMPL(a, b)",
        ]);
        assert_eq!(expand(&pp, "CAT_IMPL(V, THREE)"), "VTHREE");
        assert_eq!(expand(&pp, "CAT(V, THREE)"), "V3");
    }

    #[test]
    fn paste_with_empty_operand() {
        let pp = pp(&["CAT(a, b) a##b"]);
        assert_eq!(expand(&pp, "CAT(, x)"), "x");
        assert_eq!(expand(&pp, "CAT(x, )"), "x");
        assert_eq!(expand(&pp, "CAT(,)"), "");
    }

    #[test]
    fn invalid_paste() {
        let pp = pp(&["CAT(a, b) a##b"]);
        assert!(matches!(
            pp.expand("CAT(., x)"),
            Err(ExpandError::InvalidPaste { .. })
        ));
    }

    #[test]
    fn va_opt() {
        let pp = pp(&["F(a, ...) f(a __VA_OPT__(,) __VA_ARGS__)"]);
        assert_eq!(expand(&pp, "F(1)"), "f(1)");
        assert_eq!(expand(&pp, "F(1, 2, 3)"), "f(1, 2, 3)");
    }

    #[test]
    fn argument_count_is_checked() {
        let pp = pp(&["TWO(a, b) a b"]);
        assert_eq!(
            pp.expand("TWO(1)"),
            Err(ExpandError::ArgumentCount {
                macro_name: "TWO".to_owned(),
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn unterminated_call() {
        let pp = pp(&["F(a) a"]);
        assert!(matches!(
            pp.expand("F(1, (2)"),
            Err(ExpandError::UnterminatedCall { .. })
        ));
    }

    #[test]
    fn call_can_span_replacement_boundary() {
        let pp = pp(&["NAME f", "f(x) [x]"]);
        assert_eq!(expand(&pp, "NAME(1)"), "[1]");
    }

    #[test]
    fn load_skips_other_directives_and_honors_undef() {
        let mut pp = Preprocessor::new();
        pp.load("#ifndef GUARD\n#define GUARD\n#define A 1\n#undef A\n#endif\nint x;\n")
            .unwrap();
        assert!(pp.is_defined("GUARD"));
        assert!(!pp.is_defined("A"));
        assert_eq!(pp.len(), 1);
    }

    #[test]
    fn call_args_stop_at_matching_paren() {
        let tokens = lex("a, (b, c)) d").unwrap();
        let args = call_args(&tokens);
        assert_eq!(render(args), "a, (b, c)");
        assert_eq!(DispatchTable::count_fields(args), 1);
    }

    #[test]
    fn calls_lists_unexpanded_invocations() {
        let pp = pp(&["G(x) h(x) k"]);
        let expansion = pp.expand("G(1)").unwrap();
        assert_eq!(expansion.calls().collect::<Vec<_>>(), vec!["h"]);
    }
}
