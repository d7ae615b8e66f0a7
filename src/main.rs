use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "llm-doc-translator",
    version,
    about = "Extract text from images and PDFs and translate it with Gemini"
)]
struct Cli {
    /// Address to bind
    #[arg(long = "host", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short = 'p', long = "port", env = "PORT", default_value_t = 7860)]
    port: u16,

    /// API key (overrides GEMINI_API_KEY / GOOGLE_API_KEY)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Skip the startup request that checks the model API
    #[arg(long = "skip-api-check")]
    skip_api_check: bool,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    llm_doc_translator::logging::init(cli.verbose)?;
    let config = llm_doc_translator::Config {
        host: cli.host,
        port: cli.port,
        key: cli.key,
        settings_path: cli.read_settings,
        skip_api_check: cli.skip_api_check,
    };
    llm_doc_translator::run(config).await
}
