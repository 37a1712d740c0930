use std::collections::HashMap;

/// One data row of a sheet
///
/// Columns are addressed by their trimmed header. Missing columns read as an
/// empty string, the same as blank cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestCase {
    /// 1-based data row number, for messages
    pub row: usize,
    fields: HashMap<String, String>,
}

impl TestCase {
    pub fn new(row: usize, fields: HashMap<String, String>) -> Self {
        Self { row, fields }
    }

    /// Build a case from `(column, value)` pairs
    pub fn from_pairs<'a>(row: usize, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.trim().to_string(), v.to_string()))
            .collect();
        Self { row, fields }
    }

    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    /// `test_id`, or `<prefix>-UNKNOWN` when blank
    pub fn test_id(&self, prefix: char) -> String {
        match self.get("test_id").trim() {
            "" => format!("{}-UNKNOWN", prefix),
            id => id.to_string(),
        }
    }

    /// Raw `expected_result` cell
    pub fn expected(&self) -> &str {
        self.get("expected_result")
    }

    /// True when every cell is blank
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.trim().is_empty())
    }
}

/// Named group of cases driving one flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub cases: Vec<TestCase>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_read_empty() {
        let case = TestCase::from_pairs(1, [("username", "alice")]);
        assert_eq!(case.get("username"), "alice");
        assert_eq!(case.get("password"), "");
    }

    #[test]
    fn test_id_fallback() {
        let case = TestCase::from_pairs(3, [("test_id", "  ")]);
        assert_eq!(case.test_id('S'), "S-UNKNOWN");
        let case = TestCase::from_pairs(3, [("test_id", " L-01 ")]);
        assert_eq!(case.test_id('L'), "L-01");
    }
}
