use crate::artifacts::{all_files, normalize_path};
use crate::errors::AppError;
use crate::models::{CodeStructBlock, TreeNode};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;
use tokio::fs;
use zip::write::FileOptions;
use zip::ZipWriter;

/// One archive entry. Folders only appear when nothing else creates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEntry {
    File { path: String, content: String },
    Folder { path: String },
}

/// Lists what an export of `tree` contains. Files named by `structure` that
/// have no content block become empty entries.
pub fn export_entries(tree: &[CodeStructBlock], structure: &[TreeNode]) -> Vec<ExportEntry> {
    let mut entries: Vec<ExportEntry> = all_files(tree)
        .into_iter()
        .map(|file| ExportEntry::File {
            path: file.path,
            content: file.content.to_string(),
        })
        .collect();

    let mut known: HashSet<String> = entries
        .iter()
        .map(|entry| match entry {
            ExportEntry::File { path, .. } | ExportEntry::Folder { path } => path.clone(),
        })
        .collect();
    collect_structure(structure, "", &mut known, &mut entries);
    entries
}

fn collect_structure(
    nodes: &[TreeNode],
    prefix: &str,
    known: &mut HashSet<String>,
    entries: &mut Vec<ExportEntry>,
) {
    for node in nodes {
        let path = normalize_path(&format!("{}/{}", prefix, node.name)).join("/");
        if path.is_empty() {
            continue;
        }
        if node.is_folder() {
            let before = entries.len();
            collect_structure(node.children(), &path, known, entries);
            let has_files = known.iter().any(|k| k.starts_with(&format!("{}/", path)));
            if entries.len() == before && !has_files && known.insert(path.clone()) {
                entries.push(ExportEntry::Folder { path });
            }
        } else if known.insert(path.clone()) {
            entries.push(ExportEntry::File {
                path,
                content: String::new(),
            });
        }
    }
}

/// Builds a zip archive reproducing the folder hierarchy of `tree`.
pub fn zip_bytes(tree: &[CodeStructBlock], structure: &[TreeNode]) -> Result<Vec<u8>, AppError> {
    let mut buffer = Vec::new();
    let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
    let options = FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for entry in export_entries(tree, structure) {
        match entry {
            ExportEntry::File { path, content } => {
                zip.start_file(path, options)?;
                zip.write_all(content.as_bytes())?;
            }
            ExportEntry::Folder { path } => {
                zip.add_directory(path, options)?;
            }
        }
    }

    zip.finish()?;
    drop(zip);
    Ok(buffer)
}

/// Writes the archive to `destination`, returning the number of entries.
pub async fn export_zip(
    tree: &[CodeStructBlock],
    structure: &[TreeNode],
    destination: &Path,
) -> Result<usize, AppError> {
    let count = export_entries(tree, structure).len();
    let bytes = zip_bytes(tree, structure)?;
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(destination, bytes).await?;
    log::info!("Exported {} entries to {}", count, destination.display());
    Ok(count)
}

/// Materializes every file of `tree` under `directory`.
pub async fn write_tree(tree: &[CodeStructBlock], directory: &Path) -> Result<usize, AppError> {
    let files = all_files(tree);
    for file in &files {
        let target = directory.join(&file.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, file.content).await?;
        log::debug!("Wrote {}", target.display());
    }
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeKind;
    use std::io::Read;
    use zip::ZipArchive;

    fn sample_tree() -> Vec<CodeStructBlock> {
        vec![CodeStructBlock::folder(
            "src",
            vec![CodeStructBlock::file("App.tsx", "tsx", "export default function App() {}")],
        )]
    }

    fn sample_structure() -> Vec<TreeNode> {
        let mut src = TreeNode::folder("src", 0, None);
        src.children = Some(vec![
            TreeNode::file("App.tsx", 1, None),
            TreeNode::file("index.css", 1, None),
            TreeNode::folder("assets", 1, None),
        ]);
        vec![src]
    }

    #[test]
    fn unresolved_structure_entries_are_empty() {
        let entries = export_entries(&sample_tree(), &sample_structure());

        assert_eq!(
            entries,
            vec![
                ExportEntry::File {
                    path: "src/App.tsx".to_string(),
                    content: "export default function App() {}".to_string()
                },
                ExportEntry::File {
                    path: "src/index.css".to_string(),
                    content: String::new()
                },
                ExportEntry::Folder {
                    path: "src/assets".to_string()
                },
            ]
        );
        assert_eq!(sample_structure()[0].kind, NodeKind::Folder);
    }

    #[test]
    fn archive_reproduces_hierarchy() {
        let bytes = zip_bytes(&sample_tree(), &[]).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        assert_eq!(archive.len(), 1);
        let mut file = archive.by_name("src/App.tsx").unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert_eq!(content, "export default function App() {}");
    }

    #[tokio::test]
    async fn writes_tree_to_directory() {
        let dir = tempfile::tempdir().unwrap();

        let written = write_tree(&sample_tree(), dir.path()).await.unwrap();

        assert_eq!(written, 1);
        let content = std::fs::read_to_string(dir.path().join("src/App.tsx")).unwrap();
        assert_eq!(content, "export default function App() {}");
    }
}
