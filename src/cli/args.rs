use clap::{Parser, Subcommand};

/// CLI arguments for the Trellis application.
#[derive(Parser, Debug, PartialEq, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Prompt for the AI.
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Files or directories sent along as context.
    #[arg(short = 'c', long, num_args = 1.., value_delimiter = '&')]
    pub paths: Vec<String>,

    /// Paths to files or directories to ignore.
    #[arg(short, long, num_args = 1.., value_delimiter = '&')]
    pub ignore: Vec<String>,

    /// Override the configured mode (code or content) for this request.
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Wait for the whole reply instead of streaming it.
    #[arg(long)]
    pub no_stream: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for the Trellis application.
#[derive(Subcommand, Debug, PartialEq, Clone)]
pub enum Commands {
    /// Manage configuration options.
    Config {
        /// Set the generation backend URL.
        #[arg(long)]
        set_backend_url: Option<String>,

        /// Set the log level (debug, info, warn, error).
        #[arg(long)]
        set_log_level: Option<String>,

        /// Set the output directory.
        #[arg(long)]
        set_output_directory: Option<String>,

        /// Set the maximum number of retries for backend calls.
        #[arg(long)]
        set_retries: Option<u32>,

        /// Stream replies (true) or wait for them in full (false).
        #[arg(long)]
        set_stream: Option<bool>,

        /// Set where the conversation is saved.
        #[arg(long)]
        set_session_file: Option<String>,
    },

    /// Manage model configuration options.
    ModelConfig {
        /// Set the API key forwarded to the backend.
        #[arg(long)]
        set_api_key: Option<String>,

        /// Set extra instructions sent before every prompt.
        #[arg(long)]
        set_system_prompt: Option<String>,

        /// Set the generation mode (code or content).
        #[arg(long)]
        set_mode: Option<String>,
    },

    /// Add a reply from a file (or `-` for stdin) as if the backend sent it.
    Ingest {
        file: String,

        /// Prompt recorded alongside the reply.
        #[arg(short, long, default_value = "(ingested reply)")]
        prompt: String,
    },

    /// Print the project structure and the files of a version.
    Tree {
        /// Version id or number (defaults to the active version).
        #[arg(short, long)]
        version: Option<String>,
    },

    /// List versions, or pin one as active.
    Versions {
        /// Pin a version; `latest` follows new versions again.
        #[arg(long)]
        select: Option<String>,
    },

    /// Print a file of a version.
    Show {
        path: String,

        #[arg(short, long)]
        version: Option<String>,
    },

    /// Replace a file's content in the active version.
    Edit {
        path: String,

        /// File holding the new content (`-` for stdin).
        #[arg(long)]
        from_file: String,
    },

    /// Unified diff between two versions.
    Diff {
        from: String,

        /// Defaults to the active version.
        to: Option<String>,

        /// Limit the diff to one file.
        #[arg(long)]
        path: Option<String>,
    },

    /// Export a version as a zip archive.
    Export {
        #[arg(short, long)]
        output: Option<String>,

        #[arg(short, long)]
        version: Option<String>,
    },

    /// Write a version's files to a directory.
    Write {
        directory: Option<String>,

        #[arg(short, long)]
        version: Option<String>,
    },

    /// Load a version's components and print the mounted outline.
    Preview {
        /// File to mount (defaults to the first component file).
        #[arg(short, long)]
        entry: Option<String>,

        #[arg(short, long)]
        version: Option<String>,
    },

    /// Forget the conversation and all versions.
    Reset,
}
