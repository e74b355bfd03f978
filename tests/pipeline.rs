use proptest::prelude::*;
use std::collections::HashMap;
use trellis::artifacts::{all_files, extract_blocks, merge, run, transform, Workspace};
use trellis::models::{CodeStructBlock, ContentBlock, MessageStatus, NodeKind};
use trellis::session::ChatSession;

const FIRST_REPLY: &str = r#"<think>
The user wants a counter. Maybe ```ts scratch.ts
let nope = 1;
```
</think>
Here is the layout:

```
counter/
├── package.json
└── src/
    ├── App.tsx      # root component
    └── components/
        └── Counter.tsx
```

```json counter/package.json
{ "name": "counter" }
```

```tsx counter/src/App.tsx
import Counter from './components/Counter';
export default function App() {
  return <Counter />;
}
```

```tsx counter/src/components/Counter.tsx
export default function Counter() {
  return <button>+1</button>;
}
```
"#;

const SECOND_REPLY: &str = r#"Updated the counter and added a hook.

```tsx counter/src/components/Counter.tsx
import useCount from '../hooks/useCount';
export default function Counter() {
  return <button>+2</button>;
}
```

```ts counter/src/hooks/useCount.ts
export default function useCount() {}
```
"#;

fn conversation() -> ChatSession {
    let mut session = ChatSession::new();
    for (prompt, reply) in [("make a counter", FIRST_REPLY), ("count by two", SECOND_REPLY)] {
        let ticket = session.begin_request(prompt);
        let chars: Vec<char> = reply.chars().collect();
        for chunk in chars.chunks(37) {
            session.apply_chunk(&ticket, &chunk.iter().collect::<String>());
        }
        session.complete(&ticket);
    }
    session
}

#[test]
fn conversation_builds_structure_and_versions() {
    let session = conversation();
    let workspace = session.workspace();

    let structure = workspace.structure();
    assert_eq!(structure.len(), 1);
    assert_eq!(structure[0].name, "counter");
    let src = structure[0].child("src").unwrap();
    assert_eq!(src.kind, NodeKind::Folder);
    assert_eq!(
        src.child("App.tsx").unwrap().comment.as_deref(),
        Some("root component")
    );
    assert!(src.child("components").unwrap().child("Counter.tsx").is_some());

    let versions = workspace.versions();
    assert_eq!(versions.len(), 2);

    let first: Vec<_> = all_files(&versions[0].code_blocks).into_iter().map(|f| f.path).collect();
    assert_eq!(
        first,
        vec![
            "snippet-1.txt",
            "counter/package.json",
            "counter/src/App.tsx",
            "counter/src/components/Counter.tsx",
        ]
    );

    let latest = all_files(&versions[1].code_blocks);
    assert_eq!(latest.len(), 5);
    let counter = latest
        .iter()
        .find(|f| f.path == "counter/src/components/Counter.tsx")
        .unwrap();
    assert!(counter.content.contains("+2"));
    assert!(latest.iter().all(|f| !f.content.contains("nope")));
}

#[test]
fn chunked_streaming_matches_whole_reply() {
    let session = conversation();
    let whole = run(session.messages());

    for message in session.messages() {
        assert_eq!(message.status, MessageStatus::Complete);
    }
    assert_eq!(whole.history.len(), 2);
    assert_eq!(
        extract_blocks(&session.messages()[3].content).len(),
        2
    );
}

#[test]
fn pinned_version_survives_new_replies() {
    let mut session = conversation();
    session.pin_version(Some("v1-m1".to_string()));

    let ticket = session.begin_request("add a readme");
    session.apply_chunk(&ticket, "```md README.md\n# counter\n```");
    session.complete(&ticket);

    let workspace: Workspace = session.workspace();
    assert_eq!(workspace.versions().len(), 3);
    assert_eq!(workspace.active().unwrap().id, "v1-m1");
}

fn path() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(prop::sample::select(vec!["src", "lib", "docs"]), 0..3),
        prop::sample::select(vec!["a.ts", "b.md", "c.rs"]),
    )
        .prop_map(|(mut parts, file)| {
            parts.push(file);
            parts.join("/")
        })
}

fn block() -> impl Strategy<Value = ContentBlock> {
    (path(), "[a-z ]{0,12}").prop_map(|(path, content)| ContentBlock::new("text", Some(path), content))
}

proptest! {
    #[test]
    fn flattening_reproduces_last_written_content(blocks in prop::collection::vec(block(), 0..12)) {
        let tree = transform(&blocks);

        let mut expected = HashMap::new();
        for block in &blocks {
            expected.insert(block.filename.clone().unwrap_or_default(), block.content.trim().to_string());
        }
        let actual: HashMap<String, String> = all_files(&tree)
            .into_iter()
            .map(|f| (f.path, f.content.trim().to_string()))
            .collect();

        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn merging_replies_equals_transforming_them_together(
        first in prop::collection::vec(block(), 0..8),
        second in prop::collection::vec(block(), 0..8),
    ) {
        let folded = merge(&transform(&first), &transform(&second));

        let mut together = first.clone();
        together.extend(second);
        prop_assert_eq!(folded, transform(&together));
    }

    #[test]
    fn merging_nothing_changes_nothing(blocks in prop::collection::vec(block(), 0..8)) {
        let tree: Vec<CodeStructBlock> = transform(&blocks);
        prop_assert_eq!(merge(&tree, &[]), tree);
    }
}
