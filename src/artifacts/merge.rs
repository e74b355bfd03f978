use crate::artifacts::transformer::normalize_path;
use crate::models::{CodeStructBlock, FileEntry};

/// Folds `incoming` into `accumulated`, returning a fresh tree.
///
/// Files only in `accumulated` survive untouched, files in both take the
/// incoming content and language, folders in both merge recursively, and
/// anything only in `incoming` is added. When a file and a folder meet at the
/// same name the incoming node wins. The result never shares structure with
/// either input.
pub fn merge(accumulated: &[CodeStructBlock], incoming: &[CodeStructBlock]) -> Vec<CodeStructBlock> {
    let mut merged = accumulated.to_vec();
    for node in incoming {
        merge_node(&mut merged, node);
    }
    merged
}

fn merge_node(siblings: &mut Vec<CodeStructBlock>, incoming: &CodeStructBlock) {
    let Some(index) = siblings.iter().position(|n| n.name() == incoming.name()) else {
        siblings.push(incoming.clone());
        return;
    };

    match (&mut siblings[index], incoming) {
        (
            CodeStructBlock::Folder { children, .. },
            CodeStructBlock::Folder {
                children: incoming_children,
                ..
            },
        ) => {
            for child in incoming_children {
                merge_node(children, child);
            }
        }
        (existing, _) => *existing = incoming.clone(),
    }
}

/// Flattens a tree into its file leaves, in pre-order.
pub fn all_files(tree: &[CodeStructBlock]) -> Vec<FileEntry<'_>> {
    let mut files = Vec::new();
    collect_files(tree, "", &mut files);
    files
}

fn collect_files<'a>(nodes: &'a [CodeStructBlock], prefix: &str, out: &mut Vec<FileEntry<'a>>) {
    for node in nodes {
        let path = if prefix.is_empty() {
            node.name().to_string()
        } else {
            format!("{}/{}", prefix, node.name())
        };
        match node {
            CodeStructBlock::File {
                language, content, ..
            } => out.push(FileEntry {
                path,
                language,
                content,
            }),
            CodeStructBlock::Folder { children, .. } => collect_files(children, &path, out),
        }
    }
}

/// Looks up a file leaf by path.
pub fn find_file<'a>(tree: &'a [CodeStructBlock], path: &str) -> Option<&'a CodeStructBlock> {
    let segments = normalize_path(path);
    let (last, folders) = segments.split_last()?;

    let mut level = tree;
    for segment in folders {
        match level.iter().find(|n| n.name() == segment) {
            Some(CodeStructBlock::Folder { children, .. }) => level = children,
            _ => return None,
        }
    }

    level
        .iter()
        .find(|n| n.name() == last && !n.is_folder())
}

/// Replaces the content of an existing file in place. Returns `false` when
/// the path does not name a file.
pub fn update_file(tree: &mut [CodeStructBlock], path: &str, new_content: &str) -> bool {
    let segments = normalize_path(path);
    update_in(tree, &segments, new_content)
}

fn update_in(nodes: &mut [CodeStructBlock], segments: &[String], new_content: &str) -> bool {
    let Some((name, rest)) = segments.split_first() else {
        return false;
    };
    let Some(node) = nodes.iter_mut().find(|n| n.name() == name) else {
        return false;
    };

    match node {
        CodeStructBlock::File { content, .. } if rest.is_empty() => {
            *content = new_content.to_string();
            true
        }
        CodeStructBlock::Folder { children, .. } if !rest.is_empty() => {
            update_in(children, rest, new_content)
        }
        _ => false,
    }
}
