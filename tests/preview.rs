use trellis::artifacts::{extract_blocks, transform};
use trellis::preview::{ModuleLoader, PreviewHost, RenderState, VirtualModule};

const REPLY: &str = r#"
```tsx web/src/App.tsx
import Layout from './layout';
import Card from './components/Card';

interface AppProps {
  title?: string;
}

export default function App({ title }: AppProps) {
  return (
    <Layout>
      <Card label={title ?? "Don't panic"} />
    </Layout>
  );
}
```

```tsx web/src/layout/index.tsx
export default function Layout({ children }) {
  return <main>{children}</main>;
}
```

```tsx web/src/components/Card.tsx
const Card = ({ label }: { label: string }) => <div className="card">{label}</div>;
export default Card;
```

```css web/src/index.css
.card { padding: 4px; }
```
"#;

#[test]
fn mounts_the_reply_as_a_component_outline() {
    let tree = transform(&extract_blocks(REPLY));
    let mut host = PreviewHost::default();

    let state = host.render(&tree, None);

    assert_eq!(
        state,
        &RenderState::Mounted {
            entry: "web/src/App.tsx".to_string(),
            markup: concat!(
                "<App data-module=\"web/src/App.tsx\">\n",
                "  <Layout data-module=\"web/src/layout/index.tsx\" />\n",
                "  <Card data-module=\"web/src/components/Card.tsx\" />\n",
                "</App>\n",
            )
            .to_string(),
        }
    );
}

#[test]
fn runtime_failure_reports_the_import_chain() {
    let broken = REPLY.replace(
        "export default Card;",
        "throw new Error(\"Card is broken\");\nexport default Card;",
    );
    let tree = transform(&extract_blocks(&broken));
    let mut host = PreviewHost::default();

    let state = host.render(&tree, Some("web/src/App.tsx")).clone();

    assert_eq!(
        state,
        RenderState::Error {
            message: "web/src/components/Card.tsx: Card is broken".to_string(),
            stack: vec![
                "web/src/App.tsx".to_string(),
                "web/src/components/Card.tsx".to_string(),
            ],
        }
    );

    // A fixed tree renders cleanly afterwards.
    let fixed = transform(&extract_blocks(REPLY));
    assert!(matches!(host.render(&fixed, None), RenderState::Mounted { .. }));
}

#[test]
fn loader_reports_unregistered_modules() {
    let mut loader = ModuleLoader::default();
    loader.register_modules(&[VirtualModule::new(
        "App.tsx",
        "import Missing from './Missing';\nexport default function App() { return <Missing />; }",
    )]);

    let err = loader.require("App.tsx").unwrap_err();
    assert_eq!(err.to_string(), "module not found: Missing");
    assert_eq!(loader.import_chain(), ["App.tsx"]);
}
