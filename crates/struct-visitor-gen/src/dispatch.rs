//! The arity-independent half of the header: argument counting, two-step concatenation and the
//! `PREFIX(S, ...)` entry point.
//!
//! ```c
//! #define STRUCT_VISITABLE_ARG_N(_1, _2, _3, N, ...) N
//! #define STRUCT_VISITABLE_NARG(...) STRUCT_VISITABLE_ARG_N(__VA_ARGS__ __VA_OPT__(,) 3, 2, 1, 0)
//! #define STRUCT_VISITABLE_CONCAT(a, b) STRUCT_VISITABLE_CONCAT_IMPL(a, b)
//! #define STRUCT_VISITABLE_CONCAT_IMPL(a, b) a##b
//! #define STRUCT_VISITABLE(S, ...) \
//!     STRUCT_VISITABLE_CONCAT(STRUCT_VISITABLE, STRUCT_VISITABLE_NARG(__VA_ARGS__))(S __VA_OPT__(,) __VA_ARGS__)
//! ```
//!
//! `__VA_OPT__` lets an empty field list count as 0 rather than 1. More than `max` fields shifts
//! a field token into the count position, which pastes into an undefined `PREFIX<field>` macro
//! and fails the build at the call site.
use genco::Tokens;
use genco::lang::C;
use genco::prelude::FormatInto;

use crate::arity::MaxArity;
use crate::error::DispatchError;
use crate::expand::Token;
use crate::fields::comma_list;
use crate::lint::{LintStyle, Operators};
use crate::names::{MacroNames, STRUCT_PARAM};

#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a> {
    names: &'a MacroNames,
    max: MaxArity,
    lint: LintStyle,
}

impl<'a> Dispatcher<'a> {
    pub fn new(names: &'a MacroNames, max: MaxArity, lint: LintStyle) -> Self {
        Self { names, max, lint }
    }

    /// `ARG_N(_1, ..., _MAX, N, ...) N`: the (MAX + 1)-th argument.
    pub fn arg_counter(&self) -> String {
        let placeholders = (1..=self.max.get()).map(|idx| format!("_{idx}"));
        let params = comma_list(placeholders.chain(["N".to_owned(), "...".to_owned()]));
        format!("{}({params}) N", self.names.arg_n())
    }

    /// `NARG(...) ARG_N(__VA_ARGS__ __VA_OPT__(,) MAX, ..., 1, 0)`.
    pub fn arg_count(&self) -> String {
        let padding = comma_list((0..=self.max.get()).rev().map(|n| n.to_string()));
        format!(
            "{}(...) {}(__VA_ARGS__ __VA_OPT__(,) {padding})",
            self.names.narg(),
            self.names.arg_n()
        )
    }

    /// Expands its arguments before handing them to [`Self::concat_impl`].
    pub fn concat(&self) -> String {
        format!("{}(a, b) {}(a, b)", self.names.concat(), self.names.concat_impl())
    }

    pub fn concat_impl(&self) -> String {
        format!("{}(a, b) a##b", self.names.concat_impl())
    }

    pub fn entry(&self) -> (String, String) {
        let entry = self.names.entry();
        let signature = format!("{entry}({STRUCT_PARAM}, ...)");
        let body = format!(
            "{}({entry}, {}(__VA_ARGS__))({STRUCT_PARAM} __VA_OPT__(,) __VA_ARGS__)",
            self.names.concat(),
            self.names.narg(),
        );
        (signature, body)
    }

    fn define(&self, tokens: &mut Tokens<C>, definition: String, ops: Operators) {
        self.lint.open(tokens, ops);
        tokens.append(format!("#define {definition}"));
        tokens.push();
        self.lint.close(tokens, ops);
    }
}

impl FormatInto<C> for Dispatcher<'_> {
    fn format_into(self, tokens: &mut Tokens<C>) {
        self.define(tokens, self.arg_counter(), Operators::None);
        self.define(tokens, self.arg_count(), Operators::None);
        tokens.line();

        self.define(tokens, self.concat(), Operators::None);
        self.define(tokens, self.concat_impl(), Operators::StringizeOrPaste);
        tokens.line();

        let (signature, body) = self.entry();
        self.lint.open(tokens, Operators::None);
        tokens.append(format!("#define {signature} \\"));
        tokens.push();
        tokens.indent();
        tokens.append(body);
        tokens.push();
        tokens.unindent();
        self.lint.close(tokens, Operators::None);
    }
}

/// Rust-side model of what the emitted dispatch resolves to.
#[derive(Debug, Clone, Copy)]
pub struct DispatchTable<'a> {
    names: &'a MacroNames,
    max: MaxArity,
}

impl<'a> DispatchTable<'a> {
    pub fn new(names: &'a MacroNames, max: MaxArity) -> Self {
        Self { names, max }
    }

    pub fn names(&self) -> &'a MacroNames {
        self.names
    }

    /// The arity macro an entry call with `count` fields lands on.
    pub fn resolve(&self, count: usize) -> Result<String, DispatchError> {
        if count == 0 {
            return Err(DispatchError::NoFields);
        }

        self.max
            .resolve(count)
            .map(|arity| self.names.arity(arity))
            .ok_or(DispatchError::OutOfRange {
                count,
                max: self.max.get(),
            })
    }

    /// Counts the fields following the struct name of an entry call argument list, e.g.
    /// `Point, x, y, z` has 3. Only parentheses group, as in the preprocessor, and commas inside
    /// literals are part of the literal.
    pub fn count_fields(args: &[Token]) -> usize {
        let mut depth = 0_usize;
        let mut commas = 0;
        for token in args {
            if token.is_punct("(") {
                depth += 1;
            } else if token.is_punct(")") {
                depth = depth.saturating_sub(1);
            } else if token.is_punct(",") && depth == 0 {
                commas += 1;
            }
        }
        commas
    }
}
