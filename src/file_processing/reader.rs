use crate::errors::AppError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Maximum allowed file size (10 MB).
const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const TEXT_EXTENSIONS: [&str; 21] = [
    "txt", "rs", "ts", "js", "go", "json", "py", "cpp", "c", "h", "hpp", "css", "html", "md",
    "yaml", "yml", "toml", "xml", "tsx", "jsx", "sql",
];

/// Reads the selected files into one context string, each under a
/// `--- path ---` header.
pub async fn build_context(paths: &[PathBuf]) -> Result<String, AppError> {
    let mut context = String::new();
    for path in paths {
        let metadata = fs::metadata(path).await?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(AppError::InvalidInput(format!(
                "File too large: {} (max {} bytes)",
                path.display(),
                MAX_FILE_SIZE
            )));
        }

        let contents = fs::read_to_string(path).await?;
        context.push_str(&format!("--- {} ---\n", path.display()));
        context.push_str(contents.trim_end());
        context.push_str("\n\n");
    }
    log::debug!("Built context from {} file(s)", paths.len());
    Ok(context.trim_end().to_string())
}

/// Gets a list of context files, filtering out ignored paths.
pub fn get_context_files(paths: &[String], ignore_paths: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let ignored: HashSet<_> = ignore_paths.iter().map(PathBuf::from).collect();

    for path in paths {
        let path = PathBuf::from(path);
        if is_ignored(&path, &ignored) {
            continue;
        }
        if path.is_file() {
            files.push(path);
        } else if path.is_dir() {
            files.extend(get_directory_text_files(&path, &ignored));
        } else {
            log::warn!("Skipping missing context path: {}", path.display());
        }
    }
    files
}

/// Checks if a path should be ignored.
fn is_ignored(path: &Path, ignored: &HashSet<PathBuf>) -> bool {
    ignored
        .iter()
        .any(|ignored_path| path.starts_with(ignored_path))
}

/// Recursively gets all text files in a directory, in a stable order.
fn get_directory_text_files(directory: &Path, ignored: &HashSet<PathBuf>) -> Vec<PathBuf> {
    WalkDir::new(directory)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry.path(), ignored))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| TEXT_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn collects_text_files_and_honors_ignores() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("target")).unwrap();
        std::fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
        std::fs::write(root.join("src/logo.png"), [0u8, 1, 2]).unwrap();
        std::fs::write(root.join("target/out.txt"), "skip me").unwrap();

        let files = get_context_files(
            &[root.display().to_string()],
            &[root.join("target").display().to_string()],
        );

        assert_eq!(files, vec![root.join("src/main.rs")]);

        let context = build_context(&files).await.unwrap();
        assert_eq!(
            context,
            format!("--- {} ---\nfn main() {{}}", root.join("src/main.rs").display())
        );
    }
}
