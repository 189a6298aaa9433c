use crate::schema::ModelError;
use crate::selection::Selection;
use crate::selection::plan::Direction;

/// Shorthand read options for `Driver::get`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursor {
    pub fields: Option<Vec<String>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub sort: Vec<(String, Direction)>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(ToString::to_string).collect());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn sort(mut self, field: &str, direction: Direction) -> Self {
        self.sort.push((field.to_string(), direction));
        self
    }

    /// Apply the options to a selection.
    pub fn apply(self, mut selection: Selection) -> Result<Selection, ModelError> {
        if let Some(fields) = &self.fields {
            let fields = fields.iter().map(String::as_str).collect::<Vec<_>>();
            selection = selection.project(&fields)?;
        }
        for (field, direction) in &self.sort {
            selection = selection.order_by(field, *direction);
        }
        if let Some(limit) = self.limit {
            selection = selection.limit(limit);
        }
        if let Some(offset) = self.offset {
            selection = selection.offset(offset);
        }
        Ok(selection)
    }
}

impl From<Vec<&str>> for Cursor {
    fn from(fields: Vec<&str>) -> Self {
        Self::new().fields(&fields)
    }
}

impl From<&[&str]> for Cursor {
    fn from(fields: &[&str]) -> Self {
        Self::new().fields(fields)
    }
}
