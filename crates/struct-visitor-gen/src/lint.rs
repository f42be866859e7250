use genco::Tokens;
use genco::lang::C;

use crate::arity::MaxArity;

const COVERITY_DEFINE: &str = "// coverity[autosar_cpp14_a16_0_1_violation]";
const COVERITY_OPERATORS: &str = "// coverity[autosar_cpp14_m16_3_2_violation]";

const KW_DEFINE: &str = "MISRA.DEFINE.FUNC";
const KW_OPERATORS: &str = "MISRA.DEFINE.SHARP";
const KW_JUSTIFICATION: &str = "Function-like macro required for static struct visitation";

/// Static analysis suppression comments attached to each `#define`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum LintStyle {
    /// No annotations.
    #[default]
    Plain,
    /// `// coverity[...]` line comments ahead of the definition.
    Coverity,
    /// `/* KW_SUPPRESS_START/END */` block comments around the definition.
    Klocwork,
}

/// Whether a definition uses `#` or `##`, which both analyzers flag separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operators {
    None,
    StringizeOrPaste,
}

impl LintStyle {
    pub(crate) fn open(self, tokens: &mut Tokens<C>, ops: Operators) {
        match self {
            Self::Plain => (),
            Self::Coverity => {
                comment_line(tokens, COVERITY_DEFINE);
                if ops == Operators::StringizeOrPaste {
                    comment_line(tokens, COVERITY_OPERATORS);
                }
            }
            Self::Klocwork => {
                comment_line(tokens, kw_comment("START", KW_DEFINE));
                if ops == Operators::StringizeOrPaste {
                    comment_line(tokens, kw_comment("START", KW_OPERATORS));
                }
            }
        }
    }

    pub(crate) fn close(self, tokens: &mut Tokens<C>, ops: Operators) {
        if self == Self::Klocwork {
            if ops == Operators::StringizeOrPaste {
                comment_line(tokens, kw_comment("END", KW_OPERATORS));
            }
            comment_line(tokens, kw_comment("END", KW_DEFINE));
        }
    }
}

fn kw_comment(edge: &str, rule: &str) -> String {
    format!("/* KW_SUPPRESS_{edge}:{rule}: {KW_JUSTIFICATION} */")
}

fn comment_line<S: Into<String>>(tokens: &mut Tokens<C>, text: S) {
    tokens.append(text.into());
    tokens.push();
}

/// The two generator configurations in use: one table sized for 64 fields annotated for
/// Coverity, one sized for 50 fields annotated for Klocwork.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Preset {
    Max64,
    Max50,
}

impl Preset {
    pub fn max_arity(self) -> MaxArity {
        let max: usize = match self {
            Self::Max64 => 64,
            Self::Max50 => 50,
        };

        MaxArity::try_from(max).unwrap_or_default()
    }

    pub fn lint_style(self) -> LintStyle {
        match self {
            Self::Max64 => LintStyle::Coverity,
            Self::Max50 => LintStyle::Klocwork,
        }
    }
}
