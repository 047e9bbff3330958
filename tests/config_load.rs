use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use status_sync::config::config_path;
use status_sync::{CaseSensitivity, ConfigError, CycleId, InMemoryTransport, Settings};

const CONFIG: &str = r#"
discord:
  token: "file-token"
  guildId: "100"
  channelId: 900
uptimeKuma:
  url: "https://kuma.example/metrics"
  apiKey: "file-key"
updateInterval: 30
monitors:
  caseSensitive: false
  sections:
    - title: Core
      filters:
        - api
        - regex: "^db-"
    - title: Edge
      filters:
        - CDN
"#;

fn write_config(dir: &TempDir, text: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    fs::write(&path, text).unwrap();
    path
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn loads_file_with_env_overrides() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, CONFIG);

    let settings = Settings::load(&path, env_from(&[("DISCORD_TOKEN", "env-token")])).unwrap();

    assert_eq!(settings.discord.token, "env-token");
    assert_eq!(settings.discord.channel.as_str(), "900");
    assert_eq!(settings.feed.api_key.as_deref(), Some("file-key"));
    assert_eq!(settings.update_interval, Duration::from_secs(30));
    assert_eq!(settings.case_sensitivity, CaseSensitivity::Insensitive);
    let titles: Vec<_> = settings.categories.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Core", "Edge"]);
}

#[test]
fn config_path_comes_from_env() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, CONFIG);
    let path_str = path.to_string_lossy().into_owned();

    let env = env_from(&[("CONFIG_PATH", path_str.as_str())]);
    let resolved = config_path(&env);
    assert_eq!(resolved, path);
    assert!(Settings::load(&resolved, &env).is_ok());
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = TempDir::new().unwrap();
    let err = Settings::load(&dir.path().join("absent.yaml"), env_from(&[])).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }), "got {err:?}");
}

#[test]
fn invalid_regex_is_rejected_at_load() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, &CONFIG.replace("^db-", "(db"));

    let err = Settings::load(&path, env_from(&[])).unwrap_err();
    match err {
        ConfigError::InvalidRegex { category, pattern, .. } => {
            assert_eq!(category, "Core");
            assert_eq!(pattern, "(db");
        }
        other => panic!("expected invalid regex, got {other:?}"),
    }
}

#[tokio::test]
async fn loaded_settings_drive_a_cycle() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, CONFIG);
    let settings = Settings::load(&path, env_from(&[])).unwrap();

    let reconciler = settings.reconciler();
    let transport = InMemoryTransport::new(settings.discord.guild.clone(), settings.discord.channel.clone());
    let mut state = reconciler.initial_state();
    let feed = "monitor_status{monitor_name=\"API\"} 1\nmonitor_status{monitor_name=\"DB-main\"} 2\n";

    let report = reconciler.run_cycle(&transport, feed, &mut state, CycleId::new()).await;

    assert_eq!(report.sent(), 1);
    assert_eq!(report.skipped(), 1);
    let message = state.tracked("Core").unwrap();
    let summary = transport.message(message).unwrap();
    assert_eq!(summary.body, "🟢 | API\n🟡 | DB-main");
    assert_eq!(summary.link, "https://kuma.example/metrics");
}
