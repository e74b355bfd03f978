//! Project-tree recognition for assistant replies.
//!
//! Replies describe layouts either with box-drawing trees (`├──`, `│`) or with
//! indented names where a trailing `/` marks a folder. Both are read line by
//! line with a parent stack; anything unrecognized is skipped.

use crate::artifacts::reasoning::strip_reasoning;
use crate::models::TreeNode;
use once_cell::sync::Lazy;
use regex::Regex;

static GLYPH_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix>[│|\s]*?)(?:├──|└──|├─|└─|\|--|\+--|`--|\\--)[─-]*\s*(?P<rest>.*)$")
        .unwrap()
});

static INDENTED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<indent>[ \t]*)(?:[-*+]\s+)?(?P<name>[^/\s#][^\s#/]*)(?P<slash>/)?\s*(?:#\s*(?P<comment>.*))?$",
    )
    .unwrap()
});

/// Parses the project structure described in `text`.
pub fn parse_structure(text: &str) -> Vec<TreeNode> {
    let text = strip_reasoning(text);
    let mut builder = TreeBuilder::default();
    let mut fence = FenceState::Outside;
    // Depth added to glyph lines hanging directly under an indented-form root
    // like `src/`.
    let mut glyph_base = 0;
    // Whether the previous non-blank line was placed in a tree.
    let mut in_tree = false;

    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if line.trim_start().starts_with("```") {
            fence = fence.toggle(line.trim_start().trim_start_matches('`'));
            glyph_base = 0;
            in_tree = false;
            continue;
        }
        if fence == FenceState::FileBody {
            continue;
        }
        // `│` spacer rows between branches
        if line.chars().all(|c| c == '│' || c == '|' || c.is_whitespace()) {
            continue;
        }

        if let Some(caps) = GLYPH_LINE.captures(line) {
            let (name, comment) = split_comment(&caps["rest"]);
            if let Some((name, is_folder)) = entry_name(name) {
                let depth = glyph_base + continuation_columns(&caps["prefix"]);
                builder.place(make_node(name, is_folder, depth, comment), depth);
                in_tree = true;
                continue;
            }
        } else if let Some(caps) = INDENTED_LINE.captures(line) {
            let name = &caps["name"];
            let is_folder = caps.name("slash").is_some();
            let depth = indent_width(&caps["indent"]) / 2;
            if looks_like_entry(name, is_folder, in_tree && depth > 0) {
                let comment = caps
                    .name("comment")
                    .map(|c| c.as_str().trim().to_string())
                    .filter(|c| !c.is_empty());
                glyph_base = if is_folder { depth + 1 } else { 0 };
                builder.place(make_node(name, is_folder, depth, comment), depth);
                in_tree = true;
                continue;
            }
        }

        glyph_base = 0;
        in_tree = false;
    }

    let tree = builder.finish();
    log::debug!("parsed {} root structure node(s)", tree.len());
    tree
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FenceState {
    Outside,
    /// Inside a fence without a filename; may hold a tree.
    Body,
    /// Inside a fence that carries a file's content.
    FileBody,
}

impl FenceState {
    fn toggle(self, info: &str) -> Self {
        match self {
            FenceState::Outside => {
                let tokens: Vec<&str> = info.split_whitespace().collect();
                let names_file = match tokens.as_slice() {
                    [] => false,
                    [single] => single.contains('.') || single.contains('/'),
                    _ => true,
                };
                if names_file {
                    FenceState::FileBody
                } else {
                    FenceState::Body
                }
            }
            FenceState::Body | FenceState::FileBody => FenceState::Outside,
        }
    }
}

fn make_node(name: &str, is_folder: bool, depth: usize, comment: Option<String>) -> TreeNode {
    if is_folder {
        TreeNode::folder(name, depth, comment)
    } else {
        TreeNode::file(name, depth, comment)
    }
}

/// Splits `name  # comment` into its parts.
fn split_comment(rest: &str) -> (&str, Option<String>) {
    match rest.split_once('#') {
        Some((name, comment)) => {
            let comment = comment.trim();
            let comment = (!comment.is_empty()).then(|| comment.to_string());
            (name.trim(), comment)
        }
        None => (rest.trim(), None),
    }
}

/// Cleans a glyph-line name; a trailing `/` marks a folder.
fn entry_name(raw: &str) -> Option<(&str, bool)> {
    let raw = raw.trim().trim_matches('`').trim_matches('*').trim();
    let (name, is_folder) = match raw.strip_suffix('/') {
        Some(stripped) => (stripped.trim_end(), true),
        None => (raw, false),
    };
    // Table rules and separator rows also start with `|--`.
    if name.contains('|') || !name.chars().any(char::is_alphanumeric) {
        None
    } else {
        Some((name, is_folder))
    }
}

/// Extensionless files common enough to recognize outside a tree.
const BARE_FILENAMES: [&str; 12] = [
    "Dockerfile",
    "Containerfile",
    "Makefile",
    "Justfile",
    "Procfile",
    "Gemfile",
    "Rakefile",
    "Jenkinsfile",
    "LICENSE",
    "README",
    "CHANGELOG",
    "CODEOWNERS",
];

/// Keeps prose and code out of indented-form trees: names are limited to
/// path-like characters, and files need an extension (or a leading dot)
/// unless they are well known or nested under a tree line just read.
fn looks_like_entry(name: &str, is_folder: bool, nested: bool) -> bool {
    let path_like = name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '@' | '+' | '[' | ']'));
    if !path_like {
        return false;
    }
    if is_folder || nested || BARE_FILENAMES.contains(&name) {
        return true;
    }
    match name.rsplit_once('.') {
        Some((_, ext)) => !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}

fn indent_width(indent: &str) -> usize {
    indent.chars().map(|c| if c == '\t' { 2 } else { 1 }).sum()
}

/// Counts the continuation columns in a glyph prefix. Each `│`/`|` is one
/// column (with up to three padding spaces); blank columns left under a last
/// branch count once per four spaces.
fn continuation_columns(prefix: &str) -> usize {
    let chars: Vec<char> = prefix.chars().collect();
    let mut columns = 0;
    let mut blank_run = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        if c == '│' || c == '|' {
            columns += (blank_run + 1) / 4 + 1;
            blank_run = 0;
            let mut padding = 0;
            while i < chars.len() && padding < 3 && chars[i].is_whitespace() && chars[i] != '\t' {
                i += 1;
                padding += 1;
            }
            continue;
        }
        blank_run += if c == '\t' { 4 } else { 1 };
    }

    columns + (blank_run + 1) / 4
}

/// Flat arena assembled into nested nodes at the end.
#[derive(Default)]
struct TreeBuilder {
    nodes: Vec<TreeNode>,
    kids: Vec<Vec<usize>>,
    roots: Vec<usize>,
    /// Most recent folder at each depth.
    stack: Vec<usize>,
}

impl TreeBuilder {
    fn place(&mut self, node: TreeNode, depth: usize) {
        let parent = if depth == 0 {
            None
        } else {
            match self.stack.get(depth - 1) {
                Some(&parent) => Some(parent),
                None => return,
            }
        };

        let is_folder = node.is_folder();
        let index = self.nodes.len();
        self.nodes.push(node);
        self.kids.push(Vec::new());

        match parent {
            Some(parent) => self.kids[parent].push(index),
            None => self.roots.push(index),
        }

        if is_folder {
            self.stack.truncate(depth);
            self.stack.push(index);
        }
    }

    fn finish(self) -> Vec<TreeNode> {
        self.roots.iter().map(|&root| self.assemble(root)).collect()
    }

    fn assemble(&self, index: usize) -> TreeNode {
        let mut node = self.nodes[index].clone();
        if node.is_folder() {
            node.children = Some(self.kids[index].iter().map(|&k| self.assemble(k)).collect());
        }
        node
    }
}
