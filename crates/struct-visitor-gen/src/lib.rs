//! Generator for the preprocessor macro table behind `STRUCT_VISITABLE(Type, fields...)`.
//!
//! The emitted header defines one macro per field count from the configured maximum down to 1,
//! plus a dispatcher that counts the fields at a call site and forwards to the matching macro.
//! Each arity macro hands the struct name, field count, stringified field names and field value
//! expressions to four glue macros that the consuming code defines.
//!
//! ```no_run
//! struct_visitor_gen::CodeGenConfig::new()
//!     .max_arity(struct_visitor_gen::MaxArity::try_from(50_usize)?)
//!     .output_file("visitor_generated.h")
//!     .generate()?;
//! # Ok::<(), struct_visitor_gen::GenError>(())
//! ```
use std::io::Write;
use std::path::Path;

mod arity;
mod context;
mod dispatch;
mod error;
pub mod expand;
mod fields;
mod lint;
mod names;
mod table;

pub use arity::{Arity, MaxArity};
pub use context::Context;
pub use dispatch::{DispatchTable, Dispatcher};
pub use error::{DispatchError, Error, GenError};
pub use fields::{Field, FieldList};
pub use lint::{LintStyle, Preset};
pub use names::{DEFAULT_PREFIX, DEFAULT_RECEIVER, GlueMacros, MacroNames};
pub use table::{ArityMacro, ArityTable};

use expand::Preprocessor;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CodeGenConfig<P = ()> {
    max_arity: MaxArity,
    names: MacroNames,
    lint_style: LintStyle,
    include_guard: Option<String>,
    output_path: P,
}

impl CodeGenConfig<()> {
    pub fn new() -> Self {
        Self {
            ..Default::default()
        }
    }

    pub fn from_preset(preset: Preset) -> Self {
        Self::new()
            .max_arity(preset.max_arity())
            .lint_style(preset.lint_style())
    }

    pub fn output_file<P>(self, output_path: P) -> CodeGenConfig<P> {
        CodeGenConfig {
            max_arity: self.max_arity,
            names: self.names,
            lint_style: self.lint_style,
            include_guard: self.include_guard,
            output_path,
        }
    }
}

impl<P> CodeGenConfig<P> {
    pub fn max_arity(mut self, max_arity: MaxArity) -> Self {
        self.max_arity = max_arity;
        self
    }

    /// Sets the entry macro name. Helper names are rederived from it, and so are the glue names
    /// unless they were set with [`Self::glue`].
    pub fn prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        let custom_glue = *self.names.glue() != GlueMacros::for_prefix(self.names.entry());

        let mut names = MacroNames::new(prefix).with_receiver(self.names.receiver());
        if custom_glue {
            names = names.with_glue(self.names.glue().clone());
        }

        self.names = names;
        self
    }

    pub fn glue(mut self, glue: GlueMacros) -> Self {
        self.names = self.names.with_glue(glue);
        self
    }

    pub fn receiver<S: Into<String>>(mut self, receiver: S) -> Self {
        self.names = self.names.with_receiver(receiver);
        self
    }

    pub fn lint_style(mut self, lint_style: LintStyle) -> Self {
        self.lint_style = lint_style;
        self
    }

    pub fn include_guard<S: Into<String>>(mut self, guard: S) -> Self {
        self.include_guard = Some(guard.into());
        self
    }

    pub fn names(&self) -> &MacroNames {
        &self.names
    }

    pub fn get_max_arity(&self) -> MaxArity {
        self.max_arity
    }

    /// Validates the configured names and returns the generation context.
    pub fn context(&self) -> Result<Context<'_>, GenError> {
        Context::new(
            &self.names,
            self.max_arity,
            self.lint_style,
            self.include_guard.as_deref(),
        )
    }

    pub fn render(&self) -> Result<String, GenError> {
        self.context()?.render()
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), GenError> {
        self.context()?.write_out(writer)
    }

    /// A preprocessor with the generated header already loaded, ready for glue definitions and
    /// call sites.
    pub fn preprocessor(&self) -> Result<Preprocessor, Error> {
        let header = self.render()?;
        let mut pp = Preprocessor::new();
        pp.load(&header)?;
        Ok(pp)
    }
}

impl<P> CodeGenConfig<P>
where
    P: AsRef<Path>,
{
    /// Renders the header, then writes it to the output file in one go. A config error leaves any
    /// existing file untouched.
    pub fn generate(self) -> Result<(), GenError> {
        let rendered = self.render()?;
        let output_path = self.output_path.as_ref();

        std::fs::write(output_path, rendered.as_bytes())?;

        tracing::info!(
            message = "generated visitor header",
            path = %output_path.display(),
            max_arity = self.max_arity.get(),
        );
        Ok(())
    }
}
