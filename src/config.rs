use crate::error::{AlarmError, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for (key, value) in parse_dotenv(&content) {
        // Only set if not already set (env vars take precedence)
        if std::env::var(key).is_err() {
            // SAFETY: called from `main` before the tokio runtime and its worker threads exist
            unsafe { std::env::set_var(key, value) };
        }
    }
}

fn parse_dotenv(content: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Find the first '=' and split there
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = &value[1..value.len() - 1];
            }

            pairs.push((key, value));
        }
    }
    pairs
}

/// Default config location: `~/.pi-alarm-adapter/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pi-alarm-adapter")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub gpio: GpioConfig,
    /// Sensor name -> line id, as written in the config file.
    #[serde(default)]
    pub sensors: BTreeMap<String, u32>,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "pi-alarm-adapter".to_string(),
            username: None,
            password: None,
            keep_alive_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpioMode {
    /// Physical lines are sampled.
    Real,
    /// No hardware access; the simulator produces all traffic.
    Mock,
}

impl GpioMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "real" => Some(GpioMode::Real),
            "mock" => Some(GpioMode::Mock),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpioConfig {
    pub mode: GpioMode,
    pub chip: PathBuf,
}

impl GpioConfig {
    pub fn is_real_hardware(&self) -> bool {
        self.mode == GpioMode::Real
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            mode: GpioMode::Real,
            chip: PathBuf::from("/dev/gpiochip0"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub warm_up_secs: u64,
    pub interval_secs: u64,
}

impl SimulationConfig {
    pub fn warm_up(&self) -> Duration {
        Duration::from_secs(self.warm_up_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            warm_up_secs: 10,
            interval_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_secs: u64,
    pub debounce_ms: u64,
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            debounce_ms: 50,
        }
    }
}

const TEMPLATE: &str = r#"# pi-alarm-adapter configuration

[mqtt]
broker_host = "localhost"
broker_port = 1883
client_id = "pi-alarm-adapter"
# username = "alarm"
# password = "secret"
keep_alive_secs = 120

[gpio]
# "real" samples the GPIO chip, "mock" runs the sensor simulator instead
mode = "real"
chip = "/dev/gpiochip0"

# sensor name = GPIO line number
[sensors]
# front_door = 17
# kitchen_window = 27

[simulation]
warm_up_secs = 10
interval_secs = 30

[monitor]
poll_interval_secs = 10
debounce_ms = 50
"#;

impl Config {
    /// Load the config file at `path` and apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Load `path`, apply overrides from `lookup`, then validate the result.
    pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if !path.exists() {
            return Err(AlarmError::ConfigNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.apply_env_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a config document without environment overrides.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.mqtt.broker_host.is_empty() {
            return Err(AlarmError::Config("mqtt.broker_host is empty".to_string()));
        }
        if self.monitor.poll_interval_secs == 0 {
            return Err(AlarmError::Config(
                "monitor.poll_interval_secs must be positive".to_string(),
            ));
        }
        if self.simulation.interval_secs == 0 {
            return Err(AlarmError::Config(
                "simulation.interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply overrides from an environment lookup (`std::env::var` in production).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("MQTT_BROKER_HOST") {
            self.mqtt.broker_host = host;
        }
        if let Some(port) = lookup("MQTT_BROKER_PORT") {
            match port.parse() {
                Ok(p) => self.mqtt.broker_port = p,
                Err(_) => warn!("Ignoring invalid MQTT_BROKER_PORT: {}", port),
            }
        }
        if let Some(client_id) = lookup("MQTT_CLIENT_ID") {
            self.mqtt.client_id = client_id;
        }
        if let Some(username) = lookup("MQTT_USERNAME") {
            self.mqtt.username = Some(username);
        }
        if let Some(password) = lookup("MQTT_PASSWORD") {
            self.mqtt.password = Some(password);
        }
        if let Some(mode) = lookup("GPIO_MODE") {
            match GpioMode::parse(&mode) {
                Some(m) => self.gpio.mode = m,
                None => warn!("Ignoring invalid GPIO_MODE: {}", mode),
            }
        }
        if let Some(chip) = lookup("GPIO_CHIP") {
            self.gpio.chip = PathBuf::from(chip);
        }
    }

    /// Write a commented template to `path`. Refuses to overwrite an existing file.
    pub fn write_template(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(AlarmError::Config(format!("{} already exists", path.display())));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, TEMPLATE)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_for_empty_file() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.mqtt.broker_host, "localhost");
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.mqtt.keep_alive_secs, 120);
        assert_eq!(config.gpio.mode, GpioMode::Real);
        assert!(config.sensors.is_empty());
        assert_eq!(config.simulation.warm_up(), Duration::from_secs(10));
        assert_eq!(config.simulation.interval(), Duration::from_secs(30));
        assert_eq!(config.monitor.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.monitor.debounce(), Duration::from_millis(50));
    }

    #[test]
    fn test_parses_sensors_and_mqtt() {
        let config = Config::from_toml(
            r#"
            [mqtt]
            broker_host = "10.0.0.2"
            username = "alarm"
            password = "pw"

            [gpio]
            mode = "mock"

            [sensors]
            porta = 5
            finestra = 6
            "#,
        )
        .unwrap();

        assert_eq!(config.mqtt.broker_host, "10.0.0.2");
        assert_eq!(config.mqtt.username.as_deref(), Some("alarm"));
        assert!(!config.gpio.is_real_hardware());
        assert_eq!(config.sensors.get("porta"), Some(&5));
        assert_eq!(config.sensors.get("finestra"), Some(&6));
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let result = Config::from_toml("[monitor]\npoll_interval_secs = 0\n");
        assert!(matches!(result, Err(AlarmError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MQTT_BROKER_HOST", "broker.lan"),
            ("MQTT_BROKER_PORT", "8883"),
            ("MQTT_PASSWORD", "secret"),
            ("GPIO_MODE", "MOCK"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.mqtt.broker_host, "broker.lan");
        assert_eq!(config.mqtt.broker_port, 8883);
        assert_eq!(config.mqtt.password.as_deref(), Some("secret"));
        assert_eq!(config.mqtt.username, None);
        assert_eq!(config.gpio.mode, GpioMode::Mock);
    }

    #[test]
    fn test_invalid_env_overrides_are_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            "MQTT_BROKER_PORT" => Some("not-a-port".to_string()),
            "GPIO_MODE" => Some("sometimes".to_string()),
            _ => None,
        });
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.gpio.mode, GpioMode::Real);
    }

    #[test]
    fn test_parse_dotenv() {
        let content = "# comment\n\nMQTT_USERNAME = alarm user\nMQTT_PASSWORD=\"quoted\"\nbogus\n";
        let pairs = parse_dotenv(content);
        assert_eq!(
            pairs,
            vec![("MQTT_USERNAME", "alarm user"), ("MQTT_PASSWORD", "quoted")]
        );
    }

    #[test]
    fn test_empty_host_override_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[mqtt]\nbroker_host = \"10.0.0.2\"\n").unwrap();

        let result = Config::load_with_env(&path, |key| match key {
            "MQTT_BROKER_HOST" => Some(String::new()),
            _ => None,
        });
        assert!(matches!(result, Err(AlarmError::Config(_))));

        let config = Config::load_with_env(&path, |_| None).unwrap();
        assert_eq!(config.mqtt.broker_host, "10.0.0.2");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(matches!(
            Config::load(&path),
            Err(AlarmError::ConfigNotFound(p)) if p == path
        ));
    }

    #[test]
    fn test_template_round_trips_and_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::write_template(&path).unwrap();
        let config = Config::from_toml(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.gpio.chip, PathBuf::from("/dev/gpiochip0"));

        assert!(Config::write_template(&path).is_err());
    }
}
