use std::sync::Arc;

use futures_util::future::join_all;
use parley_common::config::{CONFIG_LOCATION, ParleyConfig};
use parley_common::util::tracing_init;
use parley_core::command::builtin::register_builtins;
use parley_core::command::misc::register_misc;
use parley_core::command::registry::CommandRegistry;
use parley_core::console::{ConsoleTransport, parse_line};
use parley_core::directory::OpenDirectory;
use parley_core::gateway_handler::dispatcher::{DispatchOptions, Dispatcher, Services};
use parley_core::settings::{MemorySettings, Settings};
use parley_database::DatabaseHandler;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ParleyConfig::load(CONFIG_LOCATION)?;
    tracing_init(&config.logging.filter);

    info!("Initialising");
    let settings: Arc<dyn Settings> = match &config.database {
        Some(database) => Arc::new(DatabaseHandler::new(database.to_url(), database.to_url_safe()).await?),
        None => {
            info!("No database configured, settings will not persist");
            Arc::new(MemorySettings::new())
        },
    };

    let registry = CommandRegistry::new(settings);
    register_builtins(&registry)?;
    register_misc(&registry)?;
    info!("Registered {} commands", registry.commands().len());

    let services = Services {
        transport: Arc::new(ConsoleTransport::new()),
        directory: Arc::new(OpenDirectory),
    };
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(registry),
        services,
        DispatchOptions::from_config(&config),
    )?);

    info!("Reading messages from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut message_id = 0;
    let mut running = Vec::new();
    while let Some(line) = lines.next_line().await? {
        message_id += 1;
        match parse_line(&line, message_id) {
            Some(invocation) => running.push(dispatcher.spawn(invocation)),
            None => debug!("skipping unparseable line {line:?}"),
        }
        running.retain(|handle| !handle.is_finished());
    }

    info!("Input closed, waiting for {} running invocations", running.len());
    join_all(running).await;
    dispatcher.shutdown();
    debug!("{}", dispatcher.metrics().gather()?);
    Ok(())
}
