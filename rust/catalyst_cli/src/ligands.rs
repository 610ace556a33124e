use std::path::Path;

use crate::errors::CliError;

/// One ligand m/z per line. Blank lines are skipped; any other line that is
/// not a float rejects the whole list.
pub fn parse_ligand_list(text: &str, path: &Path) -> Result<Vec<f64>, CliError> {
    let mut mzs = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mz = line.parse::<f64>().map_err(|_| CliError::LigandList {
            path: path.to_path_buf(),
            line_number: idx + 1,
            line: line.to_string(),
        })?;
        mzs.push(mz);
    }
    Ok(mzs)
}

pub fn read_ligand_list(path: &Path) -> Result<Vec<f64>, CliError> {
    let text = std::fs::read_to_string(path)?;
    parse_ligand_list(&text, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ligands() {
        let mzs = parse_ligand_list("301.12\n\n  455.5 \n1200\n", Path::new("l.txt")).unwrap();
        assert_eq!(mzs, vec![301.12, 455.5, 1200.0]);
    }

    #[test]
    fn test_bad_line_rejects_list() {
        let err = parse_ligand_list("301.12\nabc\n455.5\n", Path::new("l.txt")).unwrap_err();
        match err {
            CliError::LigandList { line_number, line, .. } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "abc");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
