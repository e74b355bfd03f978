use crate::models::{CodeStructBlock, ContentBlock};

/// Builds a file-system shaped tree from flat extracted blocks.
///
/// Later blocks win when two blocks land on the same path, and a file and a
/// folder competing for one name resolve to whichever was written last.
pub fn transform(blocks: &[ContentBlock]) -> Vec<CodeStructBlock> {
    let mut tree = Vec::new();
    let mut unnamed = 0;

    for block in blocks {
        let segments = match block.filename.as_deref().map(normalize_path) {
            Some(segments) if !segments.is_empty() => segments,
            _ => {
                unnamed += 1;
                vec![format!(
                    "snippet-{}.{}",
                    unnamed,
                    extension_for_language(&block.language)
                )]
            }
        };

        let language = segments
            .last()
            .and_then(|name| language_for_filename(name))
            .map(str::to_string)
            .unwrap_or_else(|| block.language.clone());

        insert_file(&mut tree, &segments, &language, &block.content);
    }

    tree
}

/// Splits a path into canonical segments: `\` reads as `/`, empty and `.`
/// segments vanish, `..` pops the previous segment.
pub fn normalize_path(path: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment.trim() {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }
    segments
}

/// Walks or creates folders for all but the last segment, then writes the leaf.
pub(crate) fn insert_file(
    nodes: &mut Vec<CodeStructBlock>,
    segments: &[String],
    language: &str,
    content: &str,
) {
    let Some((name, rest)) = segments.split_first() else {
        return;
    };

    let position = nodes.iter().position(|n| n.name() == name);

    if rest.is_empty() {
        let leaf = CodeStructBlock::file(name.as_str(), language, content);
        match position {
            Some(i) => nodes[i] = leaf,
            None => nodes.push(leaf),
        }
        return;
    }

    let index = match position {
        Some(i) if nodes[i].is_folder() => i,
        Some(i) => {
            nodes[i] = CodeStructBlock::folder(name.as_str(), Vec::new());
            i
        }
        None => {
            nodes.push(CodeStructBlock::folder(name.as_str(), Vec::new()));
            nodes.len() - 1
        }
    };

    if let CodeStructBlock::Folder { children, .. } = &mut nodes[index] {
        insert_file(children, rest, language, content);
    }
}

/// Maps a filename's extension to a language tag.
pub fn language_for_filename(filename: &str) -> Option<&'static str> {
    let (_, ext) = filename.rsplit_once('.')?;
    let language = match ext.to_ascii_lowercase().as_str() {
        "tsx" => "tsx",
        "jsx" => "jsx",
        "ts" | "mts" | "cts" => "typescript",
        "js" | "mjs" | "cjs" => "javascript",
        "py" => "python",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "rb" => "ruby",
        "php" => "php",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        "cs" => "csharp",
        "swift" => "swift",
        "kt" => "kotlin",
        "css" => "css",
        "scss" => "scss",
        "html" | "htm" => "html",
        "json" => "json",
        "md" | "markdown" => "markdown",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "sql" => "sql",
        "sh" | "bash" => "bash",
        "txt" => "text",
        _ => return None,
    };
    Some(language)
}

/// Picks an extension for a synthesized snippet name.
fn extension_for_language(language: &str) -> &'static str {
    match language.to_ascii_lowercase().as_str() {
        "tsx" => "tsx",
        "jsx" => "jsx",
        "ts" | "typescript" => "ts",
        "js" | "javascript" => "js",
        "py" | "python" => "py",
        "rs" | "rust" => "rs",
        "go" => "go",
        "css" => "css",
        "html" => "html",
        "json" => "json",
        "md" | "markdown" | "medium" | "twitter" | "threads" | "linkedin" => "md",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "sh" | "bash" | "shell" => "sh",
        "sql" => "sql",
        _ => "txt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(language: &str, filename: Option<&str>, content: &str) -> ContentBlock {
        ContentBlock::new(language, filename.map(str::to_string), content)
    }

    #[test]
    fn nests_paths_and_reuses_folders() {
        let tree = transform(&[
            block("tsx", Some("src/components/App.tsx"), "app"),
            block("ts", Some("src/hooks/useX.ts"), "hook"),
            block("css", Some("src/components/App.css"), "styles"),
        ]);

        assert_eq!(tree.len(), 1);
        let CodeStructBlock::Folder { filename, children } = &tree[0] else {
            panic!("expected folder");
        };
        assert_eq!(filename, "src");
        let names: Vec<_> = children.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["components", "hooks"]);

        let CodeStructBlock::Folder { children: components, .. } = &children[0] else {
            panic!("expected folder");
        };
        assert_eq!(components.len(), 2);
    }

    #[test]
    fn extension_overrides_fence_language() {
        let tree = transform(&[block("javascript", Some("main.ts"), "let x = 1;")]);

        assert_eq!(tree, vec![CodeStructBlock::file("main.ts", "typescript", "let x = 1;")]);
    }

    #[test]
    fn unknown_extension_keeps_fence_language() {
        let tree = transform(&[block("dockerfile", Some("Dockerfile"), "FROM rust")]);

        assert_eq!(tree, vec![CodeStructBlock::file("Dockerfile", "dockerfile", "FROM rust")]);
    }

    #[test]
    fn unnamed_blocks_get_synthesized_names() {
        let tree = transform(&[
            block("python", None, "print(1)"),
            block("text", None, "notes"),
        ]);

        let names: Vec<_> = tree.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["snippet-1.py", "snippet-2.txt"]);
    }

    #[test]
    fn equivalent_paths_land_on_one_leaf() {
        let tree = transform(&[
            block("ts", Some("./src/a.ts"), "first"),
            block("ts", Some("src\\lib/../a.ts"), "second"),
        ]);

        assert_eq!(
            tree,
            vec![CodeStructBlock::folder(
                "src",
                vec![CodeStructBlock::file("a.ts", "typescript", "second")]
            )]
        );
    }

    #[test]
    fn later_folder_replaces_file_of_same_name() {
        let tree = transform(&[
            block("text", Some("docs"), "flat"),
            block("md", Some("docs/intro.md"), "# intro"),
        ]);

        assert_eq!(tree.len(), 1);
        assert!(tree[0].is_folder());
    }

    #[test]
    fn normalizes_segments() {
        assert_eq!(normalize_path("a/./b//c/../d.ts"), vec!["a", "b", "d.ts"]);
        assert!(normalize_path("./").is_empty());
    }
}
