use crate::models::ContentBlock;
use once_cell::sync::Lazy;
use regex::Regex;

/// Opening fence with its info string, the body, and a closing fence on its own line.
static FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^[ \t]*```(?P<info>[^\r\n`]*)\r?\n(?P<body>.*?)^[ \t]*```[ \t]*\r?$").unwrap()
});

static PLATFORM_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\*\*Platform:(?:\*\*)?[ \t]*(?P<name>X \(Twitter\)|(?:Medium|Threads|LinkedIn|Twitter|X)\b)(?:\*\*)?",
    )
    .unwrap()
});

/// Publishing targets recognized in content-generation replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Medium,
    Twitter,
    Threads,
    LinkedIn,
}

impl Platform {
    fn from_label(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "medium" => Some(Platform::Medium),
            "x (twitter)" | "x" | "twitter" => Some(Platform::Twitter),
            "threads" => Some(Platform::Threads),
            "linkedin" => Some(Platform::LinkedIn),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Platform::Medium => "medium",
            Platform::Twitter => "twitter",
            Platform::Threads => "threads",
            Platform::LinkedIn => "linkedin",
        }
    }

    pub fn filename(self) -> String {
        format!("{}-content.md", self.key())
    }
}

/// Scans `text` for fenced blocks, then for platform sections.
///
/// This is a best-effort scan: malformed or unterminated fences simply produce
/// no block, so it is safe to call on a reply that is still streaming.
pub fn extract_blocks(text: &str) -> Vec<ContentBlock> {
    let mut blocks = extract_fenced(text);
    blocks.extend(extract_platform_sections(text));
    blocks
}

fn extract_fenced(text: &str) -> Vec<ContentBlock> {
    FENCE
        .captures_iter(text)
        .map(|caps| {
            let (language, filename) = parse_info(&caps["info"]);
            ContentBlock {
                language,
                filename,
                content: caps["body"].trim().replace("\r\n", "\n"),
            }
        })
        .collect()
}

/// Splits a fence info string into language and filename.
fn parse_info(info: &str) -> (String, Option<String>) {
    let mut tokens = info.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (None, _) => ("text".to_string(), None),
        (Some(lang), Some(file)) => (lang.to_string(), Some(file.to_string())),
        // ```src/App.tsx names the file without a language
        (Some(single), None) if single.contains('/') || single.contains('.') => {
            ("text".to_string(), Some(single.to_string()))
        }
        (Some(lang), None) => (lang.to_string(), None),
    }
}

fn extract_platform_sections(text: &str) -> Vec<ContentBlock> {
    let markers: Vec<_> = PLATFORM_MARKER.captures_iter(text).collect();
    let mut blocks = Vec::new();

    for (i, caps) in markers.iter().enumerate() {
        let Some(platform) = Platform::from_label(&caps["name"]) else {
            continue;
        };
        let start = caps.get(0).map_or(0, |m| m.end());
        let end = markers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        let content = text[start..end].trim();
        if content.is_empty() {
            continue;
        }
        blocks.push(ContentBlock::new(
            platform.key(),
            Some(platform.filename()),
            content,
        ));
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_language_and_filename() {
        let blocks = extract_blocks("```tsx App.tsx\nexport default function App(){}\n```");

        assert_eq!(
            blocks,
            vec![ContentBlock::new(
                "tsx",
                Some("App.tsx".to_string()),
                "export default function App(){}"
            )]
        );
    }

    #[test]
    fn reads_crlf_replies() {
        let blocks =
            extract_blocks("```tsx App.tsx\r\nconst a = 1;\r\nexport default a;\r\n```\r\n");

        assert_eq!(
            blocks,
            vec![ContentBlock::new(
                "tsx",
                Some("App.tsx".to_string()),
                "const a = 1;\nexport default a;"
            )]
        );
    }

    #[test]
    fn defaults_language_to_text() {
        let blocks = extract_blocks("intro\n```\nplain body\n```\n");

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, "text");
        assert_eq!(blocks[0].filename, None);
        assert_eq!(blocks[0].content, "plain body");
    }

    #[test]
    fn keeps_document_order() {
        let text = "```ts a.ts\nconst a = 1;\n```\nthen\n```css b.css\nbody {}\n```";
        let blocks = extract_blocks(text);

        let names: Vec<_> = blocks.iter().map(|b| b.filename.clone().unwrap()).collect();
        assert_eq!(names, vec!["a.ts", "b.css"]);
    }

    #[test]
    fn single_path_token_is_a_filename() {
        let blocks = extract_blocks("```src/util.ts\nexport const x = 1;\n```");

        assert_eq!(blocks[0].language, "text");
        assert_eq!(blocks[0].filename.as_deref(), Some("src/util.ts"));
    }

    #[test]
    fn unterminated_fence_yields_nothing_yet() {
        let text = "```ts a.ts\nconst a = 1;\n```\n```tsx b.tsx\nexport default function B() {";
        let blocks = extract_blocks(text);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].filename.as_deref(), Some("a.ts"));
    }

    #[test]
    fn no_fences_or_markers_is_empty() {
        assert!(extract_blocks("nothing to see here").is_empty());
        assert!(extract_blocks("").is_empty());
    }

    #[test]
    fn platform_sections_follow_fenced_blocks() {
        let text = "**Platform:** Medium\nLong form post.\n\n```md notes.md\n# notes\n```\n**Platform:** X (Twitter)\nShort post\n**Platform: LinkedIn**\nProfessional post";
        let blocks = extract_blocks(text);

        assert_eq!(blocks[0].filename.as_deref(), Some("notes.md"));

        let platforms: Vec<_> = blocks[1..]
            .iter()
            .map(|b| (b.language.as_str(), b.filename.as_deref().unwrap()))
            .collect();
        assert_eq!(
            platforms,
            vec![
                ("medium", "medium-content.md"),
                ("twitter", "twitter-content.md"),
                ("linkedin", "linkedin-content.md"),
            ]
        );
        assert_eq!(blocks[2].content, "Short post");
        assert!(blocks[1].content.starts_with("Long form post."));
    }
}
