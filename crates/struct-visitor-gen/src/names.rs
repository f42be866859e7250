//! Identifiers used in the generated header.
//!
//! Everything hangs off a single prefix. The entry macro is the prefix itself, the arity macros
//! are the prefix followed by the arity, and the helpers and glue macros are the prefix followed
//! by an underscore suffix. [`MacroNames::validate`] rejects configurations where any of those
//! could shadow one another, or where a name would be captured by a macro parameter.
use std::collections::HashSet;

use crate::arity::Arity;
use crate::error::GenError;

pub const DEFAULT_PREFIX: &str = "STRUCT_VISITABLE";
pub const DEFAULT_RECEIVER: &str = "s";

/// Struct name parameter of the entry and arity macros.
pub(crate) const STRUCT_PARAM: &str = "S";

const RESERVED: &[&str] = &["__VA_ARGS__", "__VA_OPT__", "defined"];

/// The four externally supplied macros each arity macro delegates to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlueMacros {
    /// Called as `start(S, N)`.
    pub start: String,
    /// Called with the stringified field names.
    pub field_names: String,
    /// Called with the field value expressions.
    pub field_values: String,
    /// Called as `end(S)`.
    pub end: String,
}

impl GlueMacros {
    pub fn for_prefix(prefix: &str) -> Self {
        Self {
            start: format!("{prefix}_START"),
            field_names: format!("{prefix}_FIELD_NAMES"),
            field_values: format!("{prefix}_FIELD_VALUES"),
            end: format!("{prefix}_END"),
        }
    }

    fn iter(&self) -> impl Iterator<Item = &str> {
        [
            self.start.as_str(),
            self.field_names.as_str(),
            self.field_values.as_str(),
            self.end.as_str(),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MacroNames {
    prefix: String,
    glue: GlueMacros,
    receiver: String,
}

impl Default for MacroNames {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl MacroNames {
    pub fn new<S: Into<String>>(prefix: S) -> Self {
        let prefix = prefix.into();
        Self {
            glue: GlueMacros::for_prefix(&prefix),
            receiver: DEFAULT_RECEIVER.to_owned(),
            prefix,
        }
    }

    pub fn with_glue(mut self, glue: GlueMacros) -> Self {
        self.glue = glue;
        self
    }

    pub fn with_receiver<S: Into<String>>(mut self, receiver: S) -> Self {
        self.receiver = receiver.into();
        self
    }

    /// The arity-agnostic entry macro.
    pub fn entry(&self) -> &str {
        &self.prefix
    }

    pub fn glue(&self) -> &GlueMacros {
        &self.glue
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn arity(&self, arity: Arity) -> String {
        format!("{}{arity}", self.prefix)
    }

    pub fn arg_n(&self) -> String {
        format!("{}_ARG_N", self.prefix)
    }

    pub fn narg(&self) -> String {
        format!("{}_NARG", self.prefix)
    }

    pub fn concat(&self) -> String {
        format!("{}_CONCAT", self.prefix)
    }

    pub fn concat_impl(&self) -> String {
        format!("{}_CONCAT_IMPL", self.prefix)
    }

    fn helpers(&self) -> [String; 4] {
        [self.arg_n(), self.narg(), self.concat(), self.concat_impl()]
    }

    /// Every macro the header defines, apart from the arity macros.
    pub fn defined(&self) -> Vec<String> {
        let mut names = vec![self.prefix.clone()];
        names.extend(self.glue.iter().map(str::to_owned));
        names.extend(self.helpers());
        names
    }

    /// True for `PREFIX` followed by digits only, the shape of every arity macro.
    pub fn is_arity_shaped(&self, name: &str) -> bool {
        name.strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    }

    /// True if `name` is something the entry macro could have pasted together: prefixed, but not
    /// the entry macro, a helper or a glue macro.
    pub fn is_dispatch_target(&self, name: &str) -> bool {
        name.len() > self.prefix.len()
            && name.starts_with(self.prefix.as_str())
            && !self.glue.iter().any(|glue| glue == name)
            && !self.helpers().iter().any(|helper| helper == name)
    }

    pub fn validate(&self) -> Result<(), GenError> {
        let mut seen = HashSet::new();
        for name in self.defined() {
            check_identifier(&name)?;

            if is_parameter_name(&name) {
                return Err(GenError::ParameterCollision { name });
            }

            if self.is_arity_shaped(&name) {
                return Err(GenError::ArityNameCollision { name });
            }

            if !seen.insert(name.clone()) {
                return Err(GenError::NameCollision { name });
            }
        }

        match self.check_additional(&self.receiver) {
            Err(GenError::NameCollision { name }) | Err(GenError::ArityNameCollision { name }) => {
                Err(GenError::ReceiverCollision { name })
            }
            other => other,
        }
    }

    /// Checks that an identifier outside the macro set, such as an include guard, can share the
    /// header without being captured or shadowed.
    pub fn check_additional(&self, name: &str) -> Result<(), GenError> {
        check_identifier(name)?;

        if is_parameter_name(name) {
            return Err(GenError::ParameterCollision {
                name: name.to_owned(),
            });
        }

        if self.is_arity_shaped(name) {
            return Err(GenError::ArityNameCollision {
                name: name.to_owned(),
            });
        }

        if self.defined().iter().any(|defined| defined == name) {
            return Err(GenError::NameCollision {
                name: name.to_owned(),
            });
        }

        Ok(())
    }
}

fn check_identifier(name: &str) -> Result<(), GenError> {
    let mut chars = name.chars();

    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED.contains(&name);

    if valid {
        Ok(())
    } else {
        Err(GenError::InvalidIdentifier {
            name: name.to_owned(),
        })
    }
}

/// Names that appear as parameters in some generated macro: `S`, `F<n>` in the arity macros,
/// `a`/`b` in the concatenation pair and `_<n>`/`N` in the argument counter. A macro or receiver
/// with one of these names would be substituted away inside the body that references it.
pub(crate) fn is_parameter_name(name: &str) -> bool {
    fn numbered(name: &str, lead: char) -> bool {
        name.strip_prefix(lead)
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    }

    matches!(name, STRUCT_PARAM | "N" | "a" | "b") || numbered(name, 'F') || numbered(name, '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_names_validate() {
        MacroNames::default().validate().unwrap();
    }

    #[test]
    fn derived_names() {
        let names = MacroNames::new("VISITABLE");
        assert_eq!(names.entry(), "VISITABLE");
        assert_eq!(names.arity(Arity::new(12).unwrap()), "VISITABLE12");
        assert_eq!(names.narg(), "VISITABLE_NARG");
        assert_eq!(names.glue().field_values, "VISITABLE_FIELD_VALUES");
    }

    #[test]
    fn glue_shaped_like_an_arity_macro() {
        let mut glue = GlueMacros::for_prefix("VISITABLE");
        glue.end = "VISITABLE2".to_owned();
        let err = MacroNames::new("VISITABLE")
            .with_glue(glue)
            .validate()
            .unwrap_err();
        assert!(matches!(err, GenError::ArityNameCollision { name } if name == "VISITABLE2"));
    }

    #[test]
    fn duplicate_glue() {
        let mut glue = GlueMacros::for_prefix("VISITABLE");
        glue.end = glue.start.clone();
        let err = MacroNames::new("VISITABLE")
            .with_glue(glue)
            .validate()
            .unwrap_err();
        assert!(matches!(err, GenError::NameCollision { .. }));
    }

    #[test]
    fn glue_colliding_with_helper() {
        let mut glue = GlueMacros::for_prefix("VISITABLE");
        glue.start = "VISITABLE_NARG".to_owned();
        assert!(matches!(
            MacroNames::new("VISITABLE").with_glue(glue).validate(),
            Err(GenError::NameCollision { .. })
        ));
    }

    #[test]
    fn receiver_collisions() {
        for receiver in ["S", "F3", "a", "_12"] {
            assert!(
                matches!(
                    MacroNames::default().with_receiver(receiver).validate(),
                    Err(GenError::ParameterCollision { .. })
                ),
                "{receiver}"
            );
        }

        assert!(matches!(
            MacroNames::default()
                .with_receiver("STRUCT_VISITABLE_END")
                .validate(),
            Err(GenError::ReceiverCollision { .. })
        ));
    }

    #[test]
    fn prefix_must_be_identifier() {
        for prefix in ["", "1ABC", "A-B", "__VA_ARGS__"] {
            assert!(matches!(
                MacroNames::new(prefix).validate(),
                Err(GenError::InvalidIdentifier { .. })
            ));
        }
        assert!(matches!(
            MacroNames::new("S").validate(),
            Err(GenError::ParameterCollision { .. })
        ));
    }

    #[test]
    fn dispatch_targets() {
        let names = MacroNames::default();
        assert!(names.is_dispatch_target("STRUCT_VISITABLE3"));
        assert!(names.is_dispatch_target("STRUCT_VISITABLE0"));
        assert!(names.is_dispatch_target("STRUCT_VISITABLEf65"));
        assert!(!names.is_dispatch_target("STRUCT_VISITABLE"));
        assert!(!names.is_dispatch_target("STRUCT_VISITABLE_START"));
        assert!(!names.is_dispatch_target("STRUCT_VISITABLE_NARG"));
        assert!(!names.is_dispatch_target("OTHER3"));
    }
}
