use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const VALID_EXTS: [&str; 3] = ["jpg", "png", "jpeg"];

/// Files directly inside `dir`, sorted by path. Not recursive.
pub fn get_all_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

pub fn is_valid_image(path: &Path) -> bool {
    let ext_valid = extension(path).is_some_and(|ext| VALID_EXTS.contains(&ext.as_str()));

    // Zero-byte files would only fail later as empty uploads.
    let size_valid = match fs::metadata(path) {
        Ok(metadata) => metadata.len() != 0,
        Err(_) => false,
    };

    ext_valid && size_valid
}

/// Declared media type for an upload read from disk.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    match extension(path)?.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("a/leaf.PNG")), Some("image/png"));
        assert_eq!(content_type_for(Path::new("soil.jpeg")), Some("image/jpeg"));
        assert_eq!(content_type_for(Path::new("notes.txt")), None);
        assert_eq!(content_type_for(Path::new("README")), None);
    }

    #[test]
    fn test_listing_filters_images() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.png"), [1u8]).unwrap();
        fs::write(dir.path().join("a.jpg"), [1u8]).unwrap();
        fs::write(dir.path().join("empty.png"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), [1u8]).unwrap();
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let files = get_all_files(dir.path()).unwrap();
        assert_eq!(files.len(), 4);

        let images: Vec<_> = files.into_iter().filter(|p| is_valid_image(p)).collect();
        assert_eq!(images, vec![dir.path().join("a.jpg"), dir.path().join("b.png")]);
    }

    #[test]
    fn test_missing_dir_is_empty() {
        assert!(get_all_files(Path::new("no/such/dir")).unwrap().is_empty());
    }
}
