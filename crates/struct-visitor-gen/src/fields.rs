//! The ordered field list behind one arity macro.
//!
//! Names and values are two views over the same `Vec<Field>`, so the i-th name and the i-th
//! value always come from the same parameter.
use crate::arity::Arity;

/// One positional field parameter, `F<index>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    param: String,
}

impl Field {
    fn new(index: usize) -> Self {
        Self {
            param: format!("F{index}"),
        }
    }

    pub fn param(&self) -> &str {
        &self.param
    }

    /// `#F<i>`, stringified by the preprocessor into the field name.
    pub fn name_literal(&self) -> String {
        format!("#{}", self.param)
    }

    /// `<receiver>.F<i>`.
    pub fn value_expr(&self, receiver: &str) -> String {
        format!("{receiver}.{}", self.param)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldList<'a> {
    receiver: &'a str,
    fields: Vec<Field>,
}

impl<'a> FieldList<'a> {
    pub fn new(arity: Arity, receiver: &'a str) -> Self {
        Self {
            receiver,
            fields: (1..=arity.get()).map(Field::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    pub fn params(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(Field::param)
    }

    pub fn names(&self) -> impl Iterator<Item = String> + '_ {
        self.fields.iter().map(Field::name_literal)
    }

    pub fn values(&self) -> impl Iterator<Item = String> + '_ {
        self.fields.iter().map(|field| field.value_expr(self.receiver))
    }
}

impl<'a, 'b> IntoIterator for &'b FieldList<'a> {
    type Item = &'b Field;
    type IntoIter = std::slice::Iter<'b, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Joins items with `", "`. An empty or single item list never gets a separator.
pub(crate) fn comma_list<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut dst = String::new();
    for (idx, item) in items.into_iter().enumerate() {
        if idx > 0 {
            dst.push_str(", ");
        }
        dst.push_str(item.as_ref());
    }
    dst
}
