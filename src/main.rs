//! inpage-translator 命令行入口

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use inpage_translator::core::{
    print_error_message, print_info_message, read_input, write_output, PageOptions, PageProcessor,
};
use inpage_translator::env::{core as env_core, EnvVar};
use inpage_translator::messaging::Message;
use inpage_translator::translation::config::config_file_exists;
use inpage_translator::translation::{
    check_connection, BackendRouter, ConfigManager, ConfigOverrides, Provider, SettingsStore,
    TranslationError, TranslationResult,
};

#[derive(Parser)]
#[command(author, version, about = "Translate HTML pages in place", long_about = None)]
struct Args {
    /// Settings file (TOML or JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Translation provider: local or cloud
    #[arg(long, global = true)]
    provider: Option<Provider>,

    /// Target language, e.g. Chinese
    #[arg(short, long, global = true)]
    target_language: Option<String>,

    /// Model of the active provider
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Endpoint URL of the active provider
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Input document encoding
    #[arg(short, long, global = true)]
    encoding: Option<String>,

    /// Suppress summary output
    #[arg(short, long, global = true)]
    silent: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a whole page and write the result
    Page {
        /// Input HTML file, or - for stdin
        input: String,

        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply host messages to a page in order and print one response per line
    Messages {
        /// Input HTML file, or - for stdin
        input: String,

        /// JSON messages, e.g. {"action":"translatePage"}
        #[arg(required = true)]
        messages: Vec<String>,

        /// Write the resulting document to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check the connection to the configured provider
    Check,

    /// Write an example settings file
    InitConfig {
        path: PathBuf,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    let no_color = env_core::NoColor::get_or_default(false);

    setup_logging(no_color);

    if let Err(e) = run(args, no_color).await {
        print_error_message(&format!("Error: {}", e), no_color);
        process::exit(1);
    }
}

async fn run(args: Args, no_color: bool) -> TranslationResult<()> {
    let settings = build_settings(&args);

    match args.command {
        Commands::Page { input, output } => {
            let processor = build_processor(&args.encoding, args.silent, settings)?;
            let data = read_input(&input)?;
            let (document, _report) = processor.translate_page(&data).await?;
            write_output(output.as_deref(), &document)?;
        }
        Commands::Messages {
            input,
            messages,
            output,
        } => {
            let messages = messages
                .iter()
                .map(|json| Message::parse(json))
                .collect::<TranslationResult<Vec<_>>>()?;

            let processor = build_processor(&args.encoding, args.silent, settings)?;
            let data = read_input(&input)?;
            let (document, responses) = processor.apply_messages(&data, messages).await?;

            for response in &responses {
                println!("{}", response.to_json()?);
            }
            if let Some(path) = output {
                write_output(Some(&path), &document)?;
            }
        }
        Commands::Check => {
            if args.config.is_none() && !config_file_exists() {
                debug!("未找到配置文件，使用默认设置与环境变量");
            }
            let config = settings.load()?;
            config.validate()?;
            debug!(
                "检查 {:?} 服务: {} ({})",
                config.provider,
                config.active_endpoint(),
                config.active_model()
            );

            let report = check_connection(&config).await;
            if report.ok {
                print_info_message(&format!("✅ {}", report.message));
            } else {
                return Err(TranslationError::BackendUnreachable(report.message));
            }
        }
        Commands::InitConfig { path } => {
            ConfigManager::generate_example_config(&path)?;
            if !args.silent {
                print_info_message(&format!("Example settings written to {}", path.display()));
            }
        }
    }

    Ok(())
}

fn build_settings(args: &Args) -> Arc<dyn SettingsStore> {
    let overrides = ConfigOverrides {
        provider: args.provider,
        target_language: args.target_language.clone(),
        model_name: args.model.clone(),
        endpoint_url: args.endpoint.clone(),
    };

    let config_path = args
        .config
        .clone()
        .or_else(|| env_core::ConfigPath::get().ok().map(PathBuf::from));
    let manager = match config_path {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };

    Arc::new(manager.with_overrides(overrides))
}

fn build_processor(
    encoding: &Option<String>,
    silent: bool,
    settings: Arc<dyn SettingsStore>,
) -> TranslationResult<PageProcessor> {
    let backend = Arc::new(BackendRouter::new(settings.clone())?);
    let options = PageOptions {
        encoding: encoding.clone(),
        silent,
    };
    Ok(PageProcessor::new(options, backend, settings))
}

/// 日志输出到标准错误，标准输出留给文档与响应
fn setup_logging(no_color: bool) {
    let log_level = match env_core::LogLevel::get() {
        Ok(level) => level,
        Err(e) => {
            print_error_message(&e.to_string(), no_color);
            "info".to_string()
        }
    };

    let filter = EnvFilter::try_new(format!("inpage_translator={}", log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(!no_color);

    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init()
    {
        error!("Failed to initialize logging: {}", e);
    }
}
