use chartdeck::settings::Settings;
use tempfile::tempdir;

#[test]
fn missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let settings = Settings::load(path.to_str().unwrap()).unwrap();
    assert_eq!(settings, Settings::default());
}

#[test]
fn save_and_reload_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let path = path.to_str().unwrap();

    let settings = Settings {
        api_base_url: "https://analytics.example.com/api".into(),
        auth_token: Some("token".into()),
        query_limit: 100,
        log_file: Some("logs/chartdeck.log".into()),
        dashboards_dir: Some("dashboards".into()),
        ..Settings::default()
    };
    settings.save(path).unwrap();

    let loaded = Settings::load(path).unwrap();
    assert_eq!(loaded, settings);
    assert_eq!(
        loaded.log_path(),
        Some(std::path::PathBuf::from("logs/chartdeck.log"))
    );
    let client = loaded.client_config().unwrap();
    assert_eq!(client.base_url.as_str(), "https://analytics.example.com/api/");
    assert_eq!(client.timeout, std::time::Duration::from_secs(30));
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(Settings::load(path.to_str().unwrap()).is_err());
}
