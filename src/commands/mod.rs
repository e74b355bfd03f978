use crate::artifacts::{all_files, find_file, normalize_path, strip_reasoning, FileEdit, Workspace};
use crate::cli::display::CliDisplayManager;
use crate::errors::AppError;
use crate::file_processing::{store, writer};
use crate::models::{CodeStructBlock, FileEntry, TreeNode, Version};
use crate::preview::PreviewHost;
use crate::session::ChatSession;
use crate::utils::config::{read_config, session_path, write_config, Config, Mode};
use similar::TextDiff;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Config plus the conversation saved next to it.
pub struct Loaded {
    pub config: Config,
    pub session_path: PathBuf,
    pub session: ChatSession,
}

pub async fn load() -> Result<Loaded, AppError> {
    let config = read_config()?;
    let session_path = session_path(&config);
    let session = store::load_session(&session_path).await?;
    Ok(Loaded {
        config,
        session_path,
        session,
    })
}

/// The requested version, or the active one.
pub fn resolve_version<'a>(workspace: &'a Workspace, key: Option<&str>) -> Result<&'a Version, AppError> {
    match key {
        Some(key) => workspace
            .lookup(key)
            .ok_or_else(|| AppError::VersionNotFound(key.to_string())),
        None => workspace.active().ok_or(AppError::NoVersions),
    }
}

/// Prints the structure and the active version after a reply.
pub fn print_artifacts(display: &CliDisplayManager, workspace: &Workspace) {
    display.print_structure(workspace.structure(), !workspace.state().has_structure);
    if let Some(active) = workspace.active() {
        display.print_code_tree(active, workspace.working_tree());
    }
}

/// Handles the config subcommand
pub async fn handle_config_subcommand(
    set_backend_url: Option<String>,
    set_log_level: Option<String>,
    set_output_directory: Option<String>,
    set_retries: Option<u32>,
    set_stream: Option<bool>,
    set_session_file: Option<String>,
) -> Result<(), AppError> {
    let mut config = read_config()?;

    if let Some(backend_url) = set_backend_url {
        config.backend_url = backend_url.clone();
        println!("Backend URL set to {}", backend_url);
    }

    if let Some(log_level) = set_log_level {
        config.log_level = log_level.clone();
        println!("Log level set to {}", log_level);
    }

    if let Some(output_directory) = set_output_directory {
        config.output_directory = output_directory.clone();
        println!("Output directory set to {}", output_directory);
    }

    if let Some(retries) = set_retries {
        config.retries = retries;
        println!("Retries set to {}", retries);
    }

    if let Some(stream) = set_stream {
        config.stream = stream;
        println!("Streaming set to {}", stream);
    }

    if let Some(session_file) = set_session_file {
        config.session_file = session_file.clone();
        println!("Session file set to {}", session_file);
    }

    crate::utils::config::validate_config(&config)?;
    write_config(&config)?;
    Ok(())
}

/// Handles the model-config subcommand
pub async fn handle_model_config_subcommand(
    set_api_key: Option<String>,
    set_system_prompt: Option<String>,
    set_mode: Option<String>,
) -> Result<(), AppError> {
    let mut config = read_config()?;

    if let Some(api_key) = set_api_key {
        config.api_key = Some(api_key).filter(|k| !k.trim().is_empty());
        println!("API key set");
    }

    if let Some(system_prompt) = set_system_prompt {
        config.system_prompt = system_prompt.clone();
        println!("System prompt set to: {}", system_prompt);
    }

    if let Some(mode) = set_mode {
        config.mode = mode.parse::<Mode>()?;
        println!("Mode set to: {}", config.mode);
    }

    write_config(&config)?;
    Ok(())
}

/// Records a reply read from a file or stdin as a completed exchange.
pub async fn handle_ingest_subcommand(file: &str, prompt: &str) -> Result<(), AppError> {
    let mut loaded = load().await?;
    let reply = read_input(file).await?;

    let ticket = loaded.session.begin_request(prompt);
    loaded.session.apply_chunk(&ticket, &reply);
    loaded.session.complete(&ticket);
    store::save_session(&loaded.session_path, &loaded.session).await?;

    let display = CliDisplayManager::new();
    let workspace = loaded.session.workspace();
    display.print_info(&format!(
        "Ingested {} bytes; {} version(s) now",
        reply.len(),
        workspace.versions().len()
    ));
    print_artifacts(&display, &workspace);
    Ok(())
}

pub async fn handle_tree_subcommand(version: Option<String>) -> Result<(), AppError> {
    let loaded = load().await?;
    let workspace = loaded.session.workspace();
    let display = CliDisplayManager::new();

    display.print_structure(workspace.structure(), !workspace.state().has_structure);
    match resolve_version(&workspace, version.as_deref()) {
        Ok(version) => display.print_code_tree(version, &version.code_blocks),
        Err(AppError::NoVersions) => display.print_info("No versions yet"),
        Err(e) => return Err(e),
    }
    Ok(())
}

pub async fn handle_versions_subcommand(select: Option<String>) -> Result<(), AppError> {
    let mut loaded = load().await?;
    let mut workspace = loaded.session.workspace();
    let display = CliDisplayManager::new();

    if let Some(key) = select {
        if key.eq_ignore_ascii_case("latest") {
            workspace.follow_latest();
            loaded.session.pin_version(None);
            display.print_info("Following the latest version");
        } else {
            if !workspace.select(&key) {
                return Err(AppError::VersionNotFound(key));
            }
            let active = resolve_version(&workspace, None)?;
            let is_latest = workspace.versions().last().map(|v| &v.id) == Some(&active.id);
            loaded
                .session
                .pin_version((!is_latest).then(|| active.id.clone()));
            display.print_info(&format!("Active version set to {}", active.name));
        }
        store::save_session(&loaded.session_path, &loaded.session).await?;
    }

    display.print_versions(
        workspace.versions(),
        workspace.active().map(|v| v.id.as_str()),
    );
    Ok(())
}

pub async fn handle_show_subcommand(path: &str, version: Option<String>) -> Result<(), AppError> {
    let loaded = load().await?;
    let workspace = loaded.session.workspace();
    let version = resolve_version(&workspace, version.as_deref())?;

    match find_file(&version.code_blocks, path) {
        Some(CodeStructBlock::File { content, .. }) => {
            println!("{}", content);
            Ok(())
        }
        _ => Err(AppError::FileNotFound(path.to_string())),
    }
}

pub async fn handle_edit_subcommand(path: &str, from_file: &str) -> Result<(), AppError> {
    let mut loaded = load().await?;
    let mut workspace = loaded.session.workspace();
    let version_id = resolve_version(&workspace, None)?.id.clone();
    let content = read_input(from_file).await?;

    if !workspace.edit(path, &content) {
        return Err(AppError::FileNotFound(path.to_string()));
    }
    workspace.write_back();

    loaded.session.record_edit(FileEdit {
        version_id: version_id.clone(),
        path: normalize_path(path).join("/"),
        content,
    });
    store::save_session(&loaded.session_path, &loaded.session).await?;
    println!("Updated {} in {}", path, version_id);
    Ok(())
}

pub async fn handle_diff_subcommand(
    from: &str,
    to: Option<String>,
    path: Option<String>,
) -> Result<(), AppError> {
    let loaded = load().await?;
    let workspace = loaded.session.workspace();
    let old = resolve_version(&workspace, Some(from))?;
    let new = resolve_version(&workspace, to.as_deref())?;

    let diff = diff_versions(old, new, path.as_deref())?;
    if diff.is_empty() {
        println!("No differences between {} and {}", old.id, new.id);
    } else {
        print!("{}", diff);
    }
    Ok(())
}

/// Unified diff of every file that differs between two versions.
pub fn diff_versions(old: &Version, new: &Version, only: Option<&str>) -> Result<String, AppError> {
    let old_files = all_files(&old.code_blocks);
    let new_files = all_files(&new.code_blocks);

    let mut paths: Vec<&str> = old_files.iter().map(|f| f.path.as_str()).collect();
    for file in &new_files {
        if !paths.contains(&file.path.as_str()) {
            paths.push(&file.path);
        }
    }

    if let Some(only) = only {
        let only = normalize_path(only).join("/");
        if !paths.contains(&only.as_str()) {
            return Err(AppError::FileNotFound(only));
        }
        paths.retain(|p| *p == only);
    }

    let content_of = |files: &[FileEntry<'_>], path: &str| {
        files
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.content.to_string())
    };

    let mut out = String::new();
    for path in paths {
        let before = content_of(old_files.as_slice(), path);
        let after = content_of(new_files.as_slice(), path);
        if before == after {
            continue;
        }
        let old_label = match before {
            Some(_) => format!("{}/{}", old.id, path),
            None => "/dev/null".to_string(),
        };
        let new_label = match after {
            Some(_) => format!("{}/{}", new.id, path),
            None => "/dev/null".to_string(),
        };
        let before = before.unwrap_or_default();
        let after = after.unwrap_or_default();
        let diff = TextDiff::from_lines(&before, &after);
        out.push_str(
            &diff
                .unified_diff()
                .context_radius(3)
                .header(&old_label, &new_label)
                .to_string(),
        );
    }
    Ok(out)
}

pub async fn handle_export_subcommand(
    output: Option<String>,
    version: Option<String>,
) -> Result<(), AppError> {
    let loaded = load().await?;
    let workspace = loaded.session.workspace();
    let version = resolve_version(&workspace, version.as_deref())?;

    let destination = match output {
        Some(output) => PathBuf::from(output),
        None => Path::new(&loaded.config.output_directory)
            .join(format!("trellis-{}.zip", version.id)),
    };
    let structure: &[TreeNode] = if workspace.state().has_structure {
        workspace.structure()
    } else {
        &[]
    };

    let count = writer::export_zip(&version.code_blocks, structure, &destination).await?;
    println!("Exported {} entries to {}", count, destination.display());
    Ok(())
}

pub async fn handle_write_subcommand(
    directory: Option<String>,
    version: Option<String>,
) -> Result<(), AppError> {
    let loaded = load().await?;
    let workspace = loaded.session.workspace();
    let version = resolve_version(&workspace, version.as_deref())?;

    let directory = match directory {
        Some(directory) => PathBuf::from(directory),
        None => Path::new(&loaded.config.output_directory).join("trellis.output"),
    };
    let count = writer::write_tree(&version.code_blocks, &directory).await?;
    println!("Wrote {} file(s) to {}", count, directory.display());
    Ok(())
}

pub async fn handle_preview_subcommand(
    entry: Option<String>,
    version: Option<String>,
) -> Result<(), AppError> {
    let loaded = load().await?;
    let workspace = loaded.session.workspace();
    let version = resolve_version(&workspace, version.as_deref())?;

    let mut host = PreviewHost::default();
    let state = host.render(&version.code_blocks, entry.as_deref());
    CliDisplayManager::new().print_render_state(state);
    Ok(())
}

pub async fn handle_reset_subcommand() -> Result<(), AppError> {
    let config = read_config()?;
    let path = session_path(&config);
    if store::remove_session(&path).await? {
        println!("Conversation cleared");
    } else {
        println!("No conversation to clear");
    }
    Ok(())
}

/// Reads a file, or stdin for `-`.
async fn read_input(source: &str) -> Result<String, AppError> {
    if source == "-" {
        let mut input = String::new();
        tokio::io::stdin().read_to_string(&mut input).await?;
        return Ok(input);
    }
    Ok(tokio::fs::read_to_string(source).await?)
}

/// The reply text without reasoning regions, as shown to the user.
pub fn visible_reply(reply: &str) -> String {
    strip_reasoning(reply).trim().to_string()
}
