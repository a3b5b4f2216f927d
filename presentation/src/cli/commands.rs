//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for council results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Every stage: expert answers, peer reviews, synthesis
    Full,
    /// Only the final synthesis
    Synthesis,
    /// JSON output (one event per line when streaming)
    Json,
}

impl From<OutputFormat> for council_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Full => council_domain::OutputFormat::Full,
            OutputFormat::Synthesis => council_domain::OutputFormat::Synthesis,
            OutputFormat::Json => council_domain::OutputFormat::Json,
        }
    }
}

/// CLI arguments for llm-council
#[derive(Parser, Debug)]
#[command(name = "llm-council")]
#[command(author, version, about = "LLM Council - several models answer, rank each other, and synthesize")]
#[command(long_about = r#"
llm-council asks a council of language models one question.

The run has three stages:
1. Expert answers: every backend of the domain answers in parallel
2. Peer review: each backend ranks every other backend's answer
3. Synthesis: the backend with the best mean rank writes the final answer

Configuration files are loaded from (in priority order):
1. COUNCIL_* environment variables
2. --config <path>     Explicit config file
3. ./council.toml      Project-level config
4. ~/.config/llm-council/config.toml   Global config

Example:
  llm-council "What is hypertension?" -d healthcare
  llm-council --stream -o full "How should I size an emergency fund?" -d finance
"#)]
pub struct Cli {
    /// The question to ask the council
    #[arg(required_unless_present = "show_config")]
    pub question: Option<String>,

    /// Knowledge domain selecting the backends and system prompt
    #[arg(short, long, default_value = "general")]
    pub domain: String,

    /// Conversation id recorded in transcripts and used for rate limiting
    #[arg(long, value_name = "ID")]
    pub conversation_id: Option<String>,

    /// Stream the synthesis token by token
    #[arg(long)]
    pub stream: bool,

    /// Output format (defaults to [output].format, then "synthesis")
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Directory for daily-rolling diagnostic log files
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}
