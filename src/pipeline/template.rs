//! Output column layout
//!
//! A template is a CSV file whose header row names the output columns in
//! order. Rows are projected onto it at export: unknown row fields are left
//! out and missing columns come out empty.

use std::path::Path;

use super::errors::{PipelineError, PipelineResult};
use crate::config::Goal;

/// Columns of an admission schedule import
pub const ADMISSION_COLUMNS: &[&str] = &[
    "id",
    "university_id",
    "name",
    "slug",
    "description",
    "start_date",
    "end_date",
    "url",
    "is_active",
    "created_at",
    "updated_at",
];

/// Columns of an institution profile import
pub const PROFILE_COLUMNS: &[&str] = &[
    "id",
    "university_code",
    "name",
    "slug",
    "short_name",
    "description",
    "logo",
    "type",
    "status",
    "accreditation",
    "website",
    "email",
    "phone",
    "whatsapp",
    "facebook",
    "instagram",
    "twitter",
    "youtube",
    "address",
    "province_name",
    "city_name",
    "postal_code",
    "cover",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    columns: Vec<String>,
}

impl Template {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Built-in column set for a goal
    #[must_use]
    pub fn default_for(goal: Goal) -> Self {
        let columns = match goal {
            Goal::Admission => ADMISSION_COLUMNS,
            Goal::Profile => PROFILE_COLUMNS,
        };
        Self::new(columns.iter().map(|c| (*c).to_string()).collect())
    }

    /// Read the header row of a template CSV
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be parsed or its header is empty.
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| PipelineError::csv(path, e))?;

        let columns: Vec<String> = reader
            .headers()
            .map_err(|e| PipelineError::csv(path, e))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();

        if columns.is_empty() {
            return Err(PipelineError::EmptyTemplate(path.to_path_buf()));
        }
        Ok(Self::new(columns))
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn header_defines_columns() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"\xef\xbb\xbfid,name , slug\n").expect("write");
        let template = Template::load(file.path()).expect("template");
        assert_eq!(template.columns(), ["id", "name", "slug"]);
        assert!(template.has_column("slug"));
    }

    #[test]
    fn defaults_per_goal() {
        assert!(Template::default_for(Goal::Admission).has_column("end_date"));
        assert!(Template::default_for(Goal::Profile).has_column("whatsapp"));
    }
}
