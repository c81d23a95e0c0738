use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};

/// Load a class-index to label map.
///
/// `.json` files hold `{ "label": index }` as written by the training export;
/// anything else is read as one label per line, indexed from zero.
pub fn load_class_mapping(file_path: impl AsRef<Path>) -> Result<HashMap<usize, String>> {
    let path = file_path.as_ref();
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let mapping = if is_json {
        let file = File::open(path)?;
        let raw: HashMap<String, usize> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Labels(format!("{}: {}", path.display(), e)))?;
        invert_label_indices(raw)?
    } else {
        let reader = BufReader::new(File::open(path)?);
        let mut labels = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let name = line.trim();
            if !name.is_empty() {
                labels.push(name.to_string());
            }
        }
        labels.into_iter().enumerate().collect()
    };

    if mapping.is_empty() {
        return Err(Error::Labels(format!("{}: no labels", path.display())));
    }
    tracing::info!(path = %path.display(), classes = mapping.len(), "Loaded class mapping");
    Ok(mapping)
}

fn invert_label_indices(raw: HashMap<String, usize>) -> Result<HashMap<usize, String>> {
    let mut mapping = HashMap::with_capacity(raw.len());
    for (label, idx) in raw {
        if let Some(previous) = mapping.insert(idx, label.clone()) {
            return Err(Error::Labels(format!(
                "index {} assigned to both {:?} and {:?}",
                idx, previous, label
            )));
        }
    }
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_mapping_is_inverted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disease_classes.json");
        std::fs::write(
            &path,
            r#"{"diseased cotton leaf": 0, "diseased cotton plant": 1, "fresh cotton leaf": 2}"#,
        )
        .unwrap();

        let mapping = load_class_mapping(&path).unwrap();
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping[&1], "diseased cotton plant");
    }

    #[test]
    fn test_text_mapping_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "healthy\n\n  rust \nblight\n").unwrap();

        let mapping = load_class_mapping(&path).unwrap();
        assert_eq!(mapping[&0], "healthy");
        assert_eq!(mapping[&1], "rust");
        assert_eq!(mapping[&2], "blight");
    }

    #[test]
    fn test_duplicate_index_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.json");
        std::fs::write(&path, r#"{"a": 0, "b": 0}"#).unwrap();
        assert!(matches!(load_class_mapping(&path), Err(Error::Labels(_))));
    }

    #[test]
    fn test_empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "\n\n").unwrap();
        assert!(matches!(load_class_mapping(&path), Err(Error::Labels(_))));
    }
}
