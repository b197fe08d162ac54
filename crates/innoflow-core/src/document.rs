use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A file attached to an idea's process instance. Contents live on the
/// backend; the client only lists, uploads, downloads and deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub file_name: String,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub upload_date: Option<NaiveDateTime>,
}

impl Document {
    /// Stored names carry a unique prefix followed by `_`.
    pub fn display_name(&self) -> &str {
        match self.file_name.split_once('_') {
            Some((_, rest)) if !rest.is_empty() => rest,
            _ => &self.file_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> Document {
        Document {
            id: 1,
            file_name: name.into(),
            file_type: None,
            upload_date: None,
        }
    }

    #[test]
    fn display_name_strips_storage_prefix() {
        assert_eq!(doc("3f2a_business_plan.pdf").display_name(), "business_plan.pdf");
        assert_eq!(doc("plain.pdf").display_name(), "plain.pdf");
        assert_eq!(doc("trailing_").display_name(), "trailing_");
    }
}
