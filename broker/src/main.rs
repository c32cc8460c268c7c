use std::{sync::Arc, thread, time::Duration};

use broker::{Broker, BrokerConfig, BrokerError};
use clap::{arg, command, value_parser};
use shared_structures::Message;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let matches = command!()
        .arg(arg!(-c --config <PATH> "Properties file with broker settings, e.g. default.partition.count=3").required(false))
        .arg(arg!(-p --partitions <COUNT> "Default partition count for new topics, overrides the config file").required(false).value_parser(value_parser!(usize)))
        .arg(arg!(-t --topic <TOPIC> "The topic producers push messages onto").required(false).default_value("notifications"))
        .arg(arg!(--producers <COUNT> "How many producer threads to run").required(false).default_value("4").value_parser(value_parser!(usize)))
        .arg(arg!(-m --messages <COUNT> "How many messages each producer sends").required(false).default_value("1000").value_parser(value_parser!(usize)))
        .get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => BrokerConfig::from_properties(path).map_err(|e| e.to_string())?,
        None => BrokerConfig::default(),
    };

    if let Some(partitions) = matches.get_one::<usize>("partitions") {
        config.default_partition_count = *partitions;
    }

    let topic = matches
        .get_one::<String>("topic")
        .cloned()
        .ok_or("topic is required")?;
    let producers = matches.get_one::<usize>("producers").copied().unwrap_or(4);
    let messages = matches.get_one::<usize>("messages").copied().unwrap_or(1000);

    let broker = Arc::new(Broker::with_config(config).map_err(|e| e.to_string())?);

    let handles: Vec<_> = (0..producers)
        .map(|producer| {
            let broker = broker.clone();
            let topic = topic.clone();
            thread::spawn(move || {
                for i in 0..messages {
                    let message = Message::new(
                        format!("producer-{}", producer),
                        format!("message {} from producer {}", i, producer),
                    );
                    if let Err(e) = broker.produce(&topic, message) {
                        error!(producer, "produce failed: {}", e);
                        return;
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle
            .join()
            .map_err(|_| "a producer thread panicked".to_string())?;
    }

    info!(topic = %topic, produced = producers * messages, "producers finished");

    let consumed = drain(&broker, &topic)?;

    info!(topic = %topic, consumed, "topic drained");

    let metadata = broker.metadata().map_err(|e| e.to_string())?;
    let metadata = serde_json::to_string_pretty(&metadata).map_err(|e| e.to_string())?;

    println!("{}", metadata);

    Ok(())
}

// Consumes until a full round over the partitions comes back empty.
fn drain(broker: &Broker, topic: &str) -> Result<usize, String> {
    let partition_count = broker
        .topic(topic)
        .map(|t| t.partition_count())
        .unwrap_or(broker.config().default_partition_count);

    let mut consumed = 0;
    let mut empty_in_a_row = 0;

    while empty_in_a_row < partition_count {
        match broker.consume(topic) {
            Ok(_) => {
                consumed += 1;
                empty_in_a_row = 0;
            }
            Err(e) if e.is_retryable() => {
                empty_in_a_row += 1;
                thread::sleep(Duration::from_millis(1));
            }
            Err(BrokerError::CleanedMessage { offset, earliest }) => {
                info!(offset, earliest, "skipped cleaned messages");
            }
            Err(e) => return Err(e.to_string()),
        }
    }

    Ok(consumed)
}
