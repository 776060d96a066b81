use clap::{Parser, Subcommand};
use log::{error, info, warn};
use pi_alarm_adapter::config::{self, Config, GpioMode};
use pi_alarm_adapter::error::Result;
use pi_alarm_adapter::input::SensorSimulator;
use pi_alarm_adapter::input::gpio::line_provider;
use pi_alarm_adapter::mqtt::{MqttTransport, Publisher};
use pi_alarm_adapter::sensors::{SensorMonitor, SensorRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::time::MissedTickBehavior;

#[derive(Parser)]
#[command(
    name = "pi-alarm-adapter",
    version,
    about = "Publish GPIO contact sensor changes to MQTT"
)]
struct Cli {
    /// Config file (default: ~/.pi-alarm-adapter/config.toml)
    #[arg(long, short, global = true, env = "PI_ALARM_CONFIG")]
    config: Option<PathBuf>,

    /// Do not touch GPIO; simulate sensor traffic instead
    #[arg(long)]
    mock: bool,

    /// Seconds between two sensor polls
    #[arg(long)]
    poll_interval: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write a template config file
    Init,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("LOG_LEVEL", "info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    // Load .env file before the runtime spawns its worker threads
    config::load_dotenv();
    init_logger();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };
    runtime.block_on(start());
}

async fn start() {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    if let Some(Command::Init) = cli.command {
        match Config::write_template(&config_path) {
            Ok(()) => info!("Configuration template written to {}", config_path.display()),
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    info!("pi-alarm-adapter is starting...");

    let mut config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    if cli.mock {
        config.gpio.mode = GpioMode::Mock;
    }
    if let Some(secs) = cli.poll_interval {
        config.monitor.poll_interval_secs = secs.max(1);
    }

    info!("Configuration loaded from {}:", config_path.display());
    info!(
        "  MQTT broker: {}:{}",
        config.mqtt.broker_host, config.mqtt.broker_port
    );
    info!("  GPIO mode: {:?} ({})", config.gpio.mode, config.gpio.chip.display());
    info!("  Sensors: {}", config.sensors.len());

    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let registry = Arc::new(SensorRegistry::from_names(&config.sensors)?);
    if registry.is_empty() {
        warn!("No sensors configured, nothing will be published");
    }

    let transport = Arc::new(MqttTransport::new(config.mqtt.clone()));
    let publisher = Arc::new(Publisher::new(transport));
    publisher.connect().await?;

    let real_hardware = config.gpio.is_real_hardware();
    let mut monitor = SensorMonitor::new(
        registry.clone(),
        line_provider(&config.gpio),
        publisher.clone(),
        real_hardware,
    )
    .with_debounce(config.monitor.debounce());
    monitor.connect();

    let simulator = SensorSimulator::new(registry, publisher.clone(), &config.simulation);
    if !real_hardware {
        simulator.start().await;
    }

    info!("pi-alarm-adapter is running, press Ctrl+C to exit");

    let mut ticker = tokio::time::interval(config.monitor.poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match monitor.poll().await {
                    Ok(transitions) => {
                        for transition in transitions {
                            if let Err(e) = transition.delivery {
                                warn!("{}", e);
                            }
                        }
                    }
                    Err(e) => error!("Sensor poll failed: {}", e),
                }
            }
            result = &mut shutdown => {
                match result {
                    Ok(()) => info!("Received shutdown signal"),
                    Err(e) => error!("Failed to listen for shutdown signal: {}", e),
                }
                break;
            }
        }
    }

    simulator.stop().await;
    monitor.close();
    publisher.disconnect().await?;

    info!("pi-alarm-adapter stopped");
    Ok(())
}
