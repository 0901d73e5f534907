//! Presentation model of the profile as the viewer shows it.
//!
//! The document carries everything the rasterizer draws: the title, one
//! labelled block per non-blank field in the fixed field order, and a footer
//! stating when the document was generated.

use std::fmt;

use chrono::NaiveDate;

use crate::record::{Field, ProfileRecord};

/// Title printed at the top of every profile.
pub const DOCUMENT_TITLE: &str = "Professional Profile";

/// How a block's value is laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueStyle {
    /// Larger single-paragraph value.
    Prominent,
    /// Running text that keeps its line breaks.
    Preformatted,
}

/// A labelled field value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldBlock {
    field: Field,
    value: String,
}

impl FieldBlock {
    fn new(field: Field, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    pub fn field(&self) -> Field {
        self.field
    }

    /// Heading shown above the value.
    pub fn label(&self) -> &'static str {
        self.field.display_label()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn style(&self) -> ValueStyle {
        match self.field {
            Field::Description => ValueStyle::Preformatted,
            _ => ValueStyle::Prominent,
        }
    }
}

/// The rendered profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileDocument {
    title: String,
    blocks: Vec<FieldBlock>,
    generated_on: NaiveDate,
}

impl ProfileDocument {
    /// Builds the document for `record`, skipping blank fields.
    pub fn from_record(record: &ProfileRecord, generated_on: NaiveDate) -> Self {
        let blocks = record
            .filled_fields()
            .map(|(field, value)| FieldBlock::new(field, value))
            .collect();

        Self {
            title: DOCUMENT_TITLE.to_owned(),
            blocks,
            generated_on,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn blocks(&self) -> &[FieldBlock] {
        &self.blocks
    }

    /// Returns the block for `field` if the field was rendered.
    pub fn block(&self, field: Field) -> Option<&FieldBlock> {
        self.blocks.iter().find(|block| block.field == field)
    }

    pub fn generated_on(&self) -> NaiveDate {
        self.generated_on
    }

    /// Footer line, e.g. `Generated on January 5, 2025`.
    pub fn footer(&self) -> String {
        format!("Generated on {}", long_date(self.generated_on))
    }
}

impl fmt::Display for ProfileDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "=".repeat(self.title.chars().count()))?;
        for block in &self.blocks {
            writeln!(f)?;
            writeln!(f, "{}", block.label())?;
            for line in block.value.lines() {
                writeln!(f, "  {line}")?;
            }
        }
        writeln!(f)?;
        write!(f, "{}", self.footer())
    }
}

/// Formats `date` the long US way, e.g. `January 5, 2025`.
pub fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}
