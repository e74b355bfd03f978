use clap::Parser;
use std::time::{Duration, Instant};
use trellis::api::config::{CODE_SYSTEM_PROMPT, CONTENT_SYSTEM_PROMPT};
use trellis::api::{BackendError, GenerationClient};
use trellis::artifacts::{all_files, extract_blocks, strip_reasoning};
use trellis::cli::args::{Args, Commands};
use trellis::cli::display::CliDisplayManager;
use trellis::commands;
use trellis::errors::AppError;
use trellis::file_processing::{reader, store};
use trellis::session::{compose_prompt, ChatSession, RequestTicket};
use trellis::utils::config::{read_config, session_path, Config, Mode};
use trellis::utils::logger;

/// The main entry point of the application
#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();
    let start_time = Instant::now();

    if let Some(command) = args.command.clone() {
        let config = read_config()?;
        logger::setup_logger(&config);
        return handle_subcommand(command).await;
    }

    let prompt = args.prompt.clone().ok_or(AppError::MissingPrompt)?;
    let config = read_config()?;
    logger::setup_logger(&config);

    let mode = match &args.mode {
        Some(mode) => mode.parse::<Mode>()?,
        None => config.mode,
    };
    let stream = config.stream && !args.no_stream;

    let mut display_manager = CliDisplayManager::new();
    display_manager.print_header();

    let context_files = reader::get_context_files(&args.paths, &args.ignore);
    display_manager.print_context_start(context_files.len());
    let context = reader::build_context(&context_files).await?;

    let session_path = session_path(&config);
    let mut session = store::load_session(&session_path).await?;

    display_manager.print_request_start(&mode.to_string());
    let ticket = session.begin_request(&prompt);
    store::save_session(&session_path, &session).await?;

    let client = GenerationClient::new(&config.backend_url, config.api_key.clone());
    let instructions = system_instructions(mode, &config);

    display_manager.start_spinner("Waiting for the backend");
    let outcome = request_reply(
        &client,
        &mut session,
        &ticket,
        &display_manager,
        &config,
        stream,
        &instructions,
        &prompt,
        &context,
    )
    .await;
    display_manager.stop_spinner();

    match outcome {
        Ok(()) => {
            session.complete(&ticket);
        }
        Err(e) => {
            session.fail(&ticket, &e);
        }
    }
    store::save_session(&session_path, &session).await?;

    let reply = session
        .message(ticket.message_id())
        .map(|m| (m.content.clone(), m.status));
    display_manager.print_results_start();
    match reply {
        Some((content, trellis::models::MessageStatus::Failed)) => {
            display_manager.print_failure(&content);
        }
        Some((content, _)) => display_manager.print_reply(&commands::visible_reply(&content)),
        None => {}
    }

    let workspace = session.workspace();
    commands::print_artifacts(&display_manager, &workspace);

    let file_count = workspace
        .active()
        .map(|v| all_files(&v.code_blocks).len())
        .unwrap_or(0);
    display_manager.print_footer(workspace.versions().len(), file_count, start_time.elapsed());

    Ok(())
}

/// Built-in instructions for the mode, followed by the user's own.
fn system_instructions(mode: Mode, config: &Config) -> String {
    let base = match mode {
        Mode::Code => CODE_SYSTEM_PROMPT,
        Mode::Content => CONTENT_SYSTEM_PROMPT,
    };
    format!("{}\n{}", base.trim(), config.system_prompt.trim())
}

/// Sends the request, retrying transient failures. Streamed text goes
/// straight into the session under `ticket`.
#[allow(clippy::too_many_arguments)]
async fn request_reply(
    client: &GenerationClient,
    session: &mut ChatSession,
    ticket: &RequestTicket,
    display_manager: &CliDisplayManager,
    config: &Config,
    stream: bool,
    instructions: &str,
    prompt: &str,
    context: &str,
) -> Result<(), BackendError> {
    let mut retries = config.retries;

    loop {
        let result = if stream {
            let full_prompt = compose_prompt(instructions, prompt, context);
            client
                .stream(&full_prompt, |chunk| {
                    if session.apply_chunk(ticket, chunk) {
                        let text = session
                            .message(ticket.message_id())
                            .map(|m| strip_reasoning(&m.content))
                            .unwrap_or_default();
                        display_manager.update_spinner(&format!(
                            "Receiving reply ({} bytes, {} block(s))",
                            text.len(),
                            extract_blocks(&text).len()
                        ));
                    }
                })
                .await
                .map(|_| ())
        } else {
            let message = compose_prompt(instructions, prompt, "");
            client.generate(&message, context).await.map(|reply| {
                session.apply_chunk(ticket, &reply);
            })
        };

        match result {
            Ok(()) => return Ok(()),
            Err(e) if retries > 0 && e.is_retryable() => {
                retries -= 1;
                log::warn!("Backend call failed, retries left: {} ({})", retries, e);
                session.reset_reply(ticket);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn handle_subcommand(command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Config {
            set_backend_url,
            set_log_level,
            set_output_directory,
            set_retries,
            set_stream,
            set_session_file,
        } => {
            commands::handle_config_subcommand(
                set_backend_url,
                set_log_level,
                set_output_directory,
                set_retries,
                set_stream,
                set_session_file,
            )
            .await
        }
        Commands::ModelConfig {
            set_api_key,
            set_system_prompt,
            set_mode,
        } => commands::handle_model_config_subcommand(set_api_key, set_system_prompt, set_mode).await,
        Commands::Ingest { file, prompt } => commands::handle_ingest_subcommand(&file, &prompt).await,
        Commands::Tree { version } => commands::handle_tree_subcommand(version).await,
        Commands::Versions { select } => commands::handle_versions_subcommand(select).await,
        Commands::Show { path, version } => commands::handle_show_subcommand(&path, version).await,
        Commands::Edit { path, from_file } => commands::handle_edit_subcommand(&path, &from_file).await,
        Commands::Diff { from, to, path } => commands::handle_diff_subcommand(&from, to, path).await,
        Commands::Export { output, version } => {
            commands::handle_export_subcommand(output, version).await
        }
        Commands::Write { directory, version } => {
            commands::handle_write_subcommand(directory, version).await
        }
        Commands::Preview { entry, version } => {
            commands::handle_preview_subcommand(entry, version).await
        }
        Commands::Reset => commands::handle_reset_subcommand().await,
    }
}
