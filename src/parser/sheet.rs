//! Test-data loading
//!
//! A data source is a directory holding one `<sheet>.csv` per flow, a single
//! CSV file whose stem names the sheet, or a workbook whose tabs are the
//! sheets.

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::types::{Sheet, TestCase};
use super::workbook::{is_workbook, load_workbook};

/// Load every sheet found at `path`
pub fn load_sheets(path: &Path) -> Result<Vec<Sheet>> {
    if !path.exists() {
        anyhow::bail!("Data source not found: {}", path.display());
    }

    if path.is_file() && is_workbook(path) {
        return load_workbook(path);
    }

    let files = if path.is_dir() {
        collect_csv_files(path)
    } else {
        vec![path.to_path_buf()]
    };

    if files.is_empty() {
        anyhow::bail!("No CSV sheets found in {}", path.display());
    }

    files.iter().map(|file| load_sheet(file)).collect()
}

/// Load one CSV file as a sheet named after its stem
pub fn load_sheet(path: &Path) -> Result<Sheet> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.trim().to_lowercase())
        .with_context(|| format!("Invalid sheet file name: {}", path.display()))?;

    let file = File::open(path)
        .with_context(|| format!("Failed to open data file {}", path.display()))?;
    let cases = read_cases(file).with_context(|| format!("Failed to parse {}", path.display()))?;

    info!("Loaded {} rows from sheet '{}'", cases.len(), name);
    Ok(Sheet { name, cases })
}

/// Parse CSV rows into cases, trimming headers and skipping blank rows
pub fn read_cases<R: std::io::Read>(reader: R) -> Result<Vec<TestCase>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let mut cases = Vec::new();
    for (idx, result) in rdr.deserialize().enumerate() {
        let record: HashMap<String, String> =
            result.with_context(|| format!("Failed to parse CSV data row {}", idx + 1))?;
        let case = TestCase::new(idx + 1, record);
        if case.is_blank() {
            debug!("Skipping blank row {}", idx + 1);
            continue;
        }
        cases.push(case);
    }
    Ok(cases)
}

fn collect_csv_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .map(|s| s.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_headers_are_trimmed() {
        let data = " test_id , username ,expected_result\nL-01,alice, PASS\n";
        let cases = read_cases(data.as_bytes()).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].get("username"), "alice");
        assert_eq!(cases[0].expected(), " PASS");
    }

    #[test]
    fn test_blank_rows_skipped() {
        let data = "test_id,username\nL-01,alice\n,\nL-02,bob\n";
        let cases = read_cases(data.as_bytes()).unwrap();
        let ids: Vec<String> = cases.iter().map(|c| c.test_id('L')).collect();
        assert_eq!(ids, vec!["L-01", "L-02"]);
    }

    #[test]
    fn test_load_directory_of_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let mut login = File::create(dir.path().join("Login.csv")).unwrap();
        writeln!(login, "test_id,username,password,expected_result").unwrap();
        writeln!(login, "L-01,alice,secret,PASS").unwrap();
        let mut contact = File::create(dir.path().join("contact.csv")).unwrap();
        writeln!(contact, "test_id,email,expected_result").unwrap();
        writeln!(contact, "C-01,a@b.c,PASS").unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();

        let sheets = load_sheets(dir.path()).unwrap();

        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["login", "contact"]);
        assert_eq!(sheets[0].cases[0].get("password"), "secret");
    }

    #[test]
    fn test_single_file_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signup.csv");
        std::fs::write(&path, "test_id,username,expected_result\nS-01,GENERATE_user,PASS\n").unwrap();

        let sheets = load_sheets(&path).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "signup");
    }

    #[test]
    fn test_workbook_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_data.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let contact = workbook.add_worksheet();
        contact.set_name("Contact").unwrap();
        contact.write_string(0, 0, "test_id").unwrap();
        contact.write_string(0, 1, " email ").unwrap();
        contact.write_string(1, 0, "C-01").unwrap();
        contact.write_string(1, 1, "a@b.c").unwrap();
        workbook.save(&path).unwrap();

        let sheets = load_sheets(&path).unwrap();

        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "contact");
        assert_eq!(sheets[0].cases[0].get("email"), "a@b.c");
    }

    #[test]
    fn test_missing_source() {
        assert!(load_sheets(Path::new("/nonexistent/data")).is_err());
    }
}
