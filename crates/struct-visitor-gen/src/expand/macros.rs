use std::rc::Rc;

use super::lexer::{HideSet, Token, TokenKind, lex};
use super::{ExpandError, Preprocessor};

const VA_ARGS: &str = "__VA_ARGS__";
const VA_OPT: &str = "__VA_OPT__";

#[derive(Debug, Clone)]
pub(super) struct MacroDef {
    pub name: Rc<str>,
    /// `None` for object-like macros.
    pub params: Option<Vec<Rc<str>>>,
    pub variadic: bool,
    body: Vec<Token>,
}

impl MacroDef {
    /// Parses the tokens following `#define`.
    pub fn parse(tokens: &[Token], line: &str) -> Result<Self, ExpandError> {
        let malformed = || ExpandError::MalformedDefine(line.trim().to_owned());

        let (name_token, rest) = tokens.split_first().ok_or_else(malformed)?;
        let name: Rc<str> = name_token.ident().map(Rc::from).ok_or_else(malformed)?;

        // Only a '(' directly after the name opens a parameter list.
        let function_like = rest
            .first()
            .is_some_and(|token| token.is_punct("(") && !token.space_before);

        if !function_like {
            return Ok(Self {
                name,
                params: None,
                variadic: false,
                body: rest.to_vec(),
            });
        }

        let mut params = Vec::new();
        let mut variadic = false;
        let mut idx = 1;

        loop {
            let token = rest.get(idx).ok_or_else(malformed)?;
            idx += 1;

            if token.is_punct(")") && params.is_empty() {
                break;
            }

            if token.is_punct("...") {
                variadic = true;
                if !rest.get(idx).is_some_and(|t| t.is_punct(")")) {
                    return Err(malformed());
                }
                idx += 1;
                break;
            }

            let param = token.ident().ok_or_else(malformed)?;
            if param == VA_ARGS || params.iter().any(|existing: &Rc<str>| &**existing == param) {
                return Err(malformed());
            }
            params.push(Rc::from(param));

            let separator = rest.get(idx).ok_or_else(malformed)?;
            idx += 1;
            if separator.is_punct(")") {
                break;
            }
            if !separator.is_punct(",") {
                return Err(malformed());
            }
        }

        let def = Self {
            name,
            params: Some(params),
            variadic,
            body: rest[idx..].to_vec(),
        };
        def.check_body()?;
        Ok(def)
    }

    fn check_body(&self) -> Result<(), ExpandError> {
        let body = &self.body;

        if body.first().is_some_and(|t| t.is_punct("##"))
            || body.last().is_some_and(|t| t.is_punct("##"))
        {
            return Err(ExpandError::PasteAtEdge {
                macro_name: self.name.to_string(),
            });
        }

        for (idx, token) in body.iter().enumerate() {
            if token.is_punct("#")
                && body
                    .get(idx + 1)
                    .and_then(|next| self.param_index(next))
                    .is_none()
            {
                return Err(ExpandError::StrayStringize {
                    macro_name: self.name.to_string(),
                });
            }

            if self.variadic && token.is_ident(VA_OPT) {
                self.va_opt_group(body, idx + 1)?;
            }
        }

        Ok(())
    }

    fn param_index(&self, token: &Token) -> Option<usize> {
        let params = self.params.as_ref()?;
        let ident = token.ident()?;

        if self.variadic && ident == VA_ARGS {
            return Some(params.len());
        }

        params.iter().position(|param| &**param == ident)
    }

    /// Lines arguments up with parameters. For variadic macros the trailing arguments are
    /// rejoined with commas into one final argument, which may be empty.
    pub fn bind(&self, args: Vec<Vec<Token>>) -> Result<Vec<Vec<Token>>, ExpandError> {
        let named = self.params.as_ref().map_or(0, Vec::len);
        let found = args.len();

        let count_error = || ExpandError::ArgumentCount {
            macro_name: self.name.to_string(),
            expected: named,
            found,
        };

        if self.variadic {
            if found < named {
                return Err(count_error());
            }

            let mut args = args.into_iter();
            let mut bound = args.by_ref().take(named).collect::<Vec<_>>();

            let mut va_args = Vec::new();
            for (idx, arg) in args.enumerate() {
                if idx > 0 {
                    va_args.push(Token::new(TokenKind::Punct, ",", false));
                }
                va_args.extend(arg);
            }
            bound.push(va_args);

            return Ok(bound);
        }

        // `F()` passes one empty argument, which is what a parameterless macro expects.
        if named == 0 && found == 1 && args[0].is_empty() {
            return Ok(Vec::new());
        }

        if found == named {
            Ok(args)
        } else {
            Err(count_error())
        }
    }

    /// Produces the replacement list for one invocation, with `hide` added to every token.
    pub fn substitute(
        &self,
        pp: &Preprocessor,
        args: &[Vec<Token>],
        hide: &HideSet,
    ) -> Result<Vec<Token>, ExpandError> {
        let mut out = self.substitute_range(pp, &self.body, args)?;

        out.retain(|token| token.kind != TokenKind::Placemarker);
        for token in out.iter_mut() {
            token.hide = token.hide.union(hide);
        }

        Ok(out)
    }

    fn substitute_range(
        &self,
        pp: &Preprocessor,
        body: &[Token],
        args: &[Vec<Token>],
    ) -> Result<Vec<Token>, ExpandError> {
        let function_like = self.params.is_some();
        let mut out: Vec<Token> = Vec::with_capacity(body.len());
        let mut idx = 0;

        while idx < body.len() {
            let token = &body[idx];

            if function_like && token.is_punct("#") {
                let arg = body
                    .get(idx + 1)
                    .and_then(|next| self.param_index(next))
                    .and_then(|param| args.get(param))
                    .ok_or_else(|| ExpandError::StrayStringize {
                        macro_name: self.name.to_string(),
                    })?;

                let mut literal = stringize(arg);
                literal.space_before = token.space_before;
                out.push(literal);
                idx += 2;
                continue;
            }

            if self.variadic && token.is_ident(VA_OPT) {
                let (group, next) = self.va_opt_group(body, idx + 1)?;
                let va_args_empty = args.last().is_none_or(Vec::is_empty);

                if va_args_empty {
                    out.push(Token::placemarker());
                } else {
                    out.extend(self.substitute_range(pp, group, args)?);
                }

                idx = next;
                continue;
            }

            if token.is_punct("##") {
                let Some(rhs_token) = body.get(idx + 1) else {
                    return Err(ExpandError::PasteAtEdge {
                        macro_name: self.name.to_string(),
                    });
                };

                let mut rhs = match self.param_index(rhs_token).and_then(|p| args.get(p)) {
                    Some(arg) if arg.is_empty() => vec![Token::placemarker()],
                    Some(arg) => arg.clone(),
                    None => vec![rhs_token.clone()],
                }
                .into_iter();

                let lhs = out.pop().unwrap_or_else(Token::placemarker);
                let first = rhs.next().unwrap_or_else(Token::placemarker);

                out.push(paste(lhs, first)?);
                out.extend(rhs);
                idx += 2;
                continue;
            }

            if let Some(arg) = self.param_index(token).and_then(|p| args.get(p)) {
                let pasted = body.get(idx + 1).is_some_and(|next| next.is_punct("##"));

                if pasted {
                    if arg.is_empty() {
                        out.push(Token::placemarker());
                    } else {
                        out.extend(arg.iter().cloned());
                    }
                } else {
                    let mut expanded = pp.expand_tokens(arg.clone())?;
                    if let Some(first) = expanded.first_mut() {
                        first.space_before = token.space_before;
                    }
                    out.extend(expanded);
                }

                idx += 1;
                continue;
            }

            out.push(token.clone());
            idx += 1;
        }

        Ok(out)
    }

    /// The tokens between the parentheses following `__VA_OPT__`, and the index after the
    /// closing one.
    fn va_opt_group<'b>(
        &self,
        body: &'b [Token],
        open: usize,
    ) -> Result<(&'b [Token], usize), ExpandError> {
        let unterminated = || ExpandError::UnterminatedVaOpt {
            macro_name: self.name.to_string(),
        };

        if !body.get(open).is_some_and(|t| t.is_punct("(")) {
            return Err(unterminated());
        }

        let mut depth = 0_usize;
        for (idx, token) in body.iter().enumerate().skip(open + 1) {
            if token.is_punct("(") {
                depth += 1;
            } else if token.is_punct(")") {
                if depth == 0 {
                    return Ok((&body[open + 1..idx], idx + 1));
                }
                depth -= 1;
            }
        }

        Err(unterminated())
    }
}

fn stringize(arg: &[Token]) -> Token {
    let mut text = String::from("\"");

    for (idx, token) in arg.iter().enumerate() {
        if idx > 0 && token.space_before {
            text.push(' ');
        }

        match token.kind {
            TokenKind::Str | TokenKind::Char => {
                for c in token.text.chars() {
                    if matches!(c, '"' | '\\') {
                        text.push('\\');
                    }
                    text.push(c);
                }
            }
            _ => text.push_str(&token.text),
        }
    }

    text.push('"');
    Token::new(TokenKind::Str, &text, false)
}

fn paste(lhs: Token, rhs: Token) -> Result<Token, ExpandError> {
    match (lhs.kind, rhs.kind) {
        (TokenKind::Placemarker, _) => return Ok(rhs),
        (_, TokenKind::Placemarker) => return Ok(lhs),
        _ => (),
    }

    let joined = format!("{}{}", lhs.text, rhs.text);
    let invalid = || ExpandError::InvalidPaste {
        lhs: lhs.text.to_string(),
        rhs: rhs.text.to_string(),
    };

    match lex(&joined).map_err(|_| invalid())?.as_mut_slice() {
        [single] => {
            let mut token = single.clone();
            token.space_before = lhs.space_before;
            Ok(token)
        }
        _ => Err(invalid()),
    }
}
