use crate::models::{CodeStructBlock, TreeNode, Version};
use crate::preview::RenderState;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Manages CLI display and output formatting.
pub struct CliDisplayManager {
    spinner: Option<ProgressBar>,
}

impl Default for CliDisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CliDisplayManager {
    pub fn new() -> Self {
        CliDisplayManager { spinner: None }
    }

    pub fn print_header(&self) {
        println!("\n{}", "╭──────────────────────╮".bright_green());
        println!(
            "{}",
            format!("│  🌿 Trellis v{:<8}│", env!("CARGO_PKG_VERSION"))
                .bright_green()
                .bold()
        );
        println!("{}\n", "╰──────────────────────╯".bright_green());
    }

    pub fn print_context_start(&self, file_count: usize) {
        self.print_section(
            "📁",
            "[1/3] Gathering Context",
            &format!("Found {} context file(s)", file_count),
        );
    }

    pub fn print_request_start(&self, mode: &str) {
        self.print_section("⚓", "[2/3] Querying Backend", &format!("Mode: {}", mode));
    }

    pub fn print_results_start(&self) {
        self.print_section("🧩", "[3/3] Building Artifacts", "");
    }

    pub fn print_reply(&self, reply: &str) {
        println!();
        for line in reply.lines() {
            println!("   {}", line);
        }
        println!();
    }

    /// Prints a backend failure the way it was recorded in the conversation.
    pub fn print_failure(&self, message: &str) {
        println!("   {} {}", "✗".bright_red(), message.bright_red());
    }

    pub fn print_footer(&self, versions: usize, files: usize, duration: Duration) {
        println!();
        println!(
            "{}",
            format!("⚡ {} version(s), {} file(s) in the active version", versions, files)
                .bright_white()
                .dimmed(),
        );
        println!(
            "{}",
            format!("⚡ Completed in {:.2?}", duration)
                .bright_white()
                .dimmed(),
        );
        println!();
    }

    pub fn print_structure(&self, structure: &[TreeNode], placeholder: bool) {
        let title = if placeholder {
            "Project Structure (placeholder)"
        } else {
            "Project Structure"
        };
        self.print_section("🌳", title, "");
        print!("{}", indent(&render_structure(structure)));
    }

    pub fn print_code_tree(&self, version: &Version, tree: &[CodeStructBlock]) {
        self.print_section("📦", &format!("{} ({})", version.name, version.id), "");
        print!("{}", indent(&render_code_tree(tree)));
    }

    pub fn print_versions(&self, versions: &[Version], active: Option<&str>) {
        self.print_section("🕘", "Versions", "");
        if versions.is_empty() {
            self.print_info("No versions yet");
            return;
        }
        for version in versions {
            let marker = if Some(version.id.as_str()) == active {
                "●".bright_green()
            } else {
                "○".bright_white()
            };
            let files = crate::artifacts::all_files(&version.code_blocks).len();
            println!(
                "   {} {} {} {}",
                marker,
                version.name.bright_cyan(),
                format!("[{}]", version.id).dimmed(),
                format!(
                    "{} file(s), {}",
                    files,
                    version.timestamp.format("%Y-%m-%d %H:%M:%S")
                )
                .italic()
            );
        }
    }

    pub fn print_render_state(&self, state: &RenderState) {
        match state {
            RenderState::Empty => self.print_info("Nothing to preview"),
            RenderState::Mounted { entry, markup } => {
                self.print_section("🖼", &format!("Preview of {}", entry), "");
                print!("{}", indent(markup));
            }
            RenderState::Error { message, stack } => {
                self.print_section("🖼", "Preview failed", "");
                self.print_failure(message);
                for frame in stack.iter().rev() {
                    println!("     {} {}", "at".dimmed(), frame.dimmed());
                }
            }
        }
    }

    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template(&format!(
            "   {} {{spinner}} {{msg}}",
            "→".bright_white()
        )) {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.set_message(message.italic().bright_white().to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    pub fn update_spinner(&self, message: &str) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(message.italic().bright_white().to_string());
        }
    }

    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    pub fn print_section(&self, icon: &str, title: &str, description: &str) {
        println!("{} {}", icon.bright_yellow(), title.bright_cyan().bold());
        if !description.is_empty() {
            println!(
                "   {} {}",
                "→".bright_white(),
                description.italic().bright_white()
            );
        }
    }

    pub fn print_info(&self, message: &str) {
        println!(
            "   {} {}",
            "→".bright_white(),
            message.italic().bright_white()
        );
    }
}

fn indent(text: &str) -> String {
    text.lines().map(|line| format!("   {}\n", line)).collect()
}

/// Draws parsed structure with box-drawing connectors; folders get a
/// trailing `/` and comments follow a `#`.
pub fn render_structure(nodes: &[TreeNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        out.push_str(&structure_label(node));
        out.push('\n');
        draw_structure(node.children(), "", &mut out);
    }
    out
}

fn structure_label(node: &TreeNode) -> String {
    let mut label = node.name.clone();
    if node.is_folder() {
        label.push('/');
    }
    if let Some(comment) = &node.comment {
        label.push_str(&format!("  # {}", comment));
    }
    label
}

fn draw_structure(nodes: &[TreeNode], prefix: &str, out: &mut String) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let (branch, continuation) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
        out.push_str(&format!("{}{}{}\n", prefix, branch, structure_label(node)));
        draw_structure(node.children(), &format!("{}{}", prefix, continuation), out);
    }
}

/// Draws a version tree the same way, with each file's language.
pub fn render_code_tree(nodes: &[CodeStructBlock]) -> String {
    let mut out = String::new();
    draw_code(nodes, "", &mut out);
    out
}

fn draw_code(nodes: &[CodeStructBlock], prefix: &str, out: &mut String) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let (branch, continuation) = if last { ("└── ", "    ") } else { ("├── ", "│   ") };
        match node {
            CodeStructBlock::File {
                filename, language, ..
            } => out.push_str(&format!("{}{}{} ({})\n", prefix, branch, filename, language)),
            CodeStructBlock::Folder { filename, children } => {
                out.push_str(&format!("{}{}{}/\n", prefix, branch, filename));
                draw_code(children, &format!("{}{}", prefix, continuation), out);
            }
        }
    }
}
