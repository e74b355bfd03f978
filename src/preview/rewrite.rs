use crate::artifacts::normalize_path;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// `import Name from './relative/path'`, with either quote style.
static DEFAULT_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)^(?P<indent>[ \t]*)import\s+(?P<name>[A-Za-z_$][\w$]*)\s+from\s+['"](?P<path>\.{1,2}/[^'"]+)['"][ \t]*;?"#,
    )
    .unwrap()
});

/// Resolves `specifier` against the directory of `importer`, segment by segment.
pub fn resolve_relative(importer: &str, specifier: &str) -> String {
    let mut segments = normalize_path(importer);
    segments.pop();

    for segment in specifier.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other.to_string()),
        }
    }

    segments.join("/")
}

/// Turns relative default imports into calls on the loader's resolver.
/// Bare imports (`react`, `lodash`) are left for the host to provide.
pub fn rewrite_imports(filename: &str, source: &str) -> String {
    DEFAULT_IMPORT
        .replace_all(source, |caps: &Captures| {
            format!(
                "{}const {} = __require(\"{}\");",
                &caps["indent"],
                &caps["name"],
                resolve_relative(filename, &caps["path"])
            )
        })
        .into_owned()
}
