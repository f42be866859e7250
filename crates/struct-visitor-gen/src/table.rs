//! The per-arity half of the header.
//!
//! For each arity `N` this emits
//!
//! ```c
//! #define STRUCT_VISITABLE2(S, F1, F2) \
//!     STRUCT_VISITABLE_START(S, 2) \
//!     STRUCT_VISITABLE_FIELD_NAMES(#F1, #F2) \
//!     STRUCT_VISITABLE_FIELD_VALUES(s.F1, s.F2) \
//!     STRUCT_VISITABLE_END(S)
//! ```
use genco::Tokens;
use genco::lang::C;
use genco::prelude::FormatInto;

use crate::arity::{Arity, MaxArity};
use crate::fields::{FieldList, comma_list};
use crate::lint::{LintStyle, Operators};
use crate::names::{MacroNames, STRUCT_PARAM};

const CONTINUATION: &str = " \\";

#[derive(Debug, Clone)]
pub struct ArityMacro<'a> {
    names: &'a MacroNames,
    arity: Arity,
    fields: FieldList<'a>,
}

impl<'a> ArityMacro<'a> {
    pub fn new(names: &'a MacroNames, arity: Arity) -> Self {
        Self {
            names,
            arity,
            fields: FieldList::new(arity, names.receiver()),
        }
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn name(&self) -> String {
        self.names.arity(self.arity)
    }

    pub fn fields(&self) -> &FieldList<'a> {
        &self.fields
    }

    /// `NAME(S, F1, ..., FN)`.
    pub fn signature(&self) -> String {
        let params = std::iter::once(STRUCT_PARAM).chain(self.fields.params());
        format!("{}({})", self.name(), comma_list(params))
    }

    /// Body lines, without continuation markers.
    pub fn body(&self) -> [String; 4] {
        let glue = self.names.glue();
        [
            format!("{}({STRUCT_PARAM}, {})", glue.start, self.arity),
            format!("{}({})", glue.field_names, comma_list(self.fields.names())),
            format!("{}({})", glue.field_values, comma_list(self.fields.values())),
            format!("{}({STRUCT_PARAM})", glue.end),
        ]
    }

    pub(crate) fn format_with(&self, lint: LintStyle, tokens: &mut Tokens<C>) {
        lint.open(tokens, Operators::StringizeOrPaste);

        tokens.append(format!("#define {}{CONTINUATION}", self.signature()));
        tokens.push();

        let body = self.body();
        let last = body.len() - 1;

        tokens.indent();
        for (idx, line) in body.into_iter().enumerate() {
            if idx == last {
                tokens.append(line);
            } else {
                tokens.append(format!("{line}{CONTINUATION}"));
            }
            tokens.push();
        }
        tokens.unindent();

        lint.close(tokens, Operators::StringizeOrPaste);
    }
}

impl FormatInto<C> for ArityMacro<'_> {
    fn format_into(self, tokens: &mut Tokens<C>) {
        self.format_with(LintStyle::Plain, tokens);
    }
}

/// Every arity macro from `max` down to 1, one blank line apart.
#[derive(Debug, Clone, Copy)]
pub struct ArityTable<'a> {
    names: &'a MacroNames,
    max: MaxArity,
    lint: LintStyle,
}

impl<'a> ArityTable<'a> {
    pub fn new(names: &'a MacroNames, max: MaxArity, lint: LintStyle) -> Self {
        Self { names, max, lint }
    }

    pub fn macros(&self) -> impl Iterator<Item = ArityMacro<'a>> + 'a {
        let names = self.names;
        self.max
            .descending()
            .map(move |arity| ArityMacro::new(names, arity))
    }
}

impl FormatInto<C> for ArityTable<'_> {
    fn format_into(self, tokens: &mut Tokens<C>) {
        for arity_macro in self.macros() {
            arity_macro.format_with(self.lint, tokens);
            tokens.line();
        }

        tracing::debug!(
            message = "emitted arity table",
            max = self.max.get(),
            prefix = self.names.entry()
        );
    }
}
