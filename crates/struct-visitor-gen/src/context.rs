use std::io::Write;

use genco::Tokens;
use genco::lang::C;
use genco::prelude::FormatInto;

use crate::arity::MaxArity;
use crate::dispatch::{DispatchTable, Dispatcher};
use crate::error::GenError;
use crate::lint::LintStyle;
use crate::names::MacroNames;
use crate::table::ArityTable;

/// Validated inputs for one header.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    names: &'a MacroNames,
    max: MaxArity,
    lint: LintStyle,
    include_guard: Option<&'a str>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        names: &'a MacroNames,
        max: MaxArity,
        lint: LintStyle,
        include_guard: Option<&'a str>,
    ) -> Result<Self, GenError> {
        names.validate()?;

        if let Some(guard) = include_guard {
            names.check_additional(guard)?;
        }

        Ok(Self {
            names,
            max,
            lint,
            include_guard,
        })
    }

    pub fn names(&self) -> &MacroNames {
        self.names
    }

    pub fn max_arity(&self) -> MaxArity {
        self.max
    }

    pub fn table(&self) -> ArityTable<'a> {
        ArityTable::new(self.names, self.max, self.lint)
    }

    pub fn dispatcher(&self) -> Dispatcher<'a> {
        Dispatcher::new(self.names, self.max, self.lint)
    }

    pub fn dispatch_table(&self) -> DispatchTable<'a> {
        DispatchTable::new(self.names, self.max)
    }

    fn tokens(&self) -> Tokens<C> {
        let mut tokens = Tokens::new();

        if let Some(guard) = self.include_guard {
            tokens.append(format!("#ifndef {guard}"));
            tokens.push();
            tokens.append(format!("#define {guard}"));
            tokens.line();
        }

        self.table().format_into(&mut tokens);
        self.dispatcher().format_into(&mut tokens);

        if let Some(guard) = self.include_guard {
            tokens.line();
            tokens.append(format!("#endif  // {guard}"));
            tokens.push();
        }

        tokens
    }

    /// Renders the complete header. Nothing is written anywhere until this has succeeded.
    pub fn render(&self) -> Result<String, GenError> {
        let body = self.tokens().to_file_string()?;

        let mut dst = String::with_capacity(body.len() + 128);
        dst.push_str("// @generated by struct-visitor-gen, do not edit.\n");
        dst.push_str(&format!(
            "// Visits structs with 1 to {} fields through {}(S, ...).\n\n",
            self.max,
            self.names.entry()
        ));
        dst.push_str(&body);

        if !dst.ends_with('\n') {
            dst.push('\n');
        }

        Ok(dst)
    }

    pub fn write_out<W: Write>(&self, writer: &mut W) -> Result<(), GenError> {
        let rendered = self.render()?;
        writer.write_all(rendered.as_bytes())?;
        writer.flush()?;

        tracing::info!(
            message = "wrote visitor header",
            max_arity = self.max.get(),
            bytes = rendered.len()
        );
        Ok(())
    }
}
