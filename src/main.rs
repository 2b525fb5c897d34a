use anyhow::{Context, bail};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use auto_check::cli::VerbosityLevel;
use auto_check::{
    AUTO_CHECK_TAG, AutoCheckFactory, Cli, ConfigManager, EventKind, HttpTransport, InputElement,
    Output, TransportConfig, define_auto_check, registry,
};

fn init_tracing(verbosity: VerbosityLevel) {
    let default_level = match verbosity {
        VerbosityLevel::Quiet => "auto_check=error",
        VerbosityLevel::Normal => "auto_check=warn",
        VerbosityLevel::Verbose => "auto_check=debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();
    let config = ConfigManager::load_config(&cli)
        .await
        .context("failed to load configuration")?;
    init_tracing(config.output.verbosity());

    let transport = HttpTransport::new(TransportConfig::from(&config.network))?;
    let factory = AutoCheckFactory::new(Arc::new(transport))
        .with_debounce(ConfigManager::get_debounce_duration(&config));
    let registry = registry::global();
    define_auto_check(registry, factory);

    let element = registry.create(AUTO_CHECK_TAG)?;
    element.configure(&config.element)?;
    if element.src().is_empty() {
        bail!("missing src: pass --src, set AUTO_CHECK_SRC, or add it to the config file");
    }
    if element.csrf().is_empty() {
        bail!("missing csrf: pass --csrf, set AUTO_CHECK_CSRF, or add it to the config file");
    }
    tracing::debug!(src = %element.src(), "auto-check ready");

    let output = Arc::new(Output::new(
        config.output.format.into(),
        config.output.verbosity(),
    ));
    for kind in EventKind::ALL {
        if kind == EventKind::Input || !output.shows(kind) {
            continue;
        }
        let output = output.clone();
        element.add_event_listener(kind, move |event| {
            if let Some(line) = output.format_event(event) {
                println!("{}", line);
            }
        });
    }

    let input = InputElement::new();
    element.attach(input.clone());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        input.type_value(line);
    }

    element.settled().await;
    element.detach();

    Ok(())
}
