use audioout::AoConfig;
use serde_json::json;

#[test]
fn test_defaults() {
    let config = AoConfig::default();

    assert_eq!(config.device(), None);
    assert_eq!(config.mixer_device, "default");
    assert_eq!(config.mixer_name, "Master");
    assert_eq!(config.mixer_index, 0);
    assert!(config.block);
    assert!(!config.resample);
    assert!(!config.non_interleaved);
}

#[test]
fn test_from_json_kebab_case_keys() {
    let config = AoConfig::from_json(json!({
        "device": "hw:0",
        "mixer-device": "hw:0",
        "mixer-name": "PCM",
        "mixer-index": 2,
        "block": false,
        "resample": true,
        "non-interleaved": true
    }))
    .unwrap();

    assert_eq!(config.device(), Some("hw:0"));
    assert_eq!(config.mixer_device, "hw:0");
    assert_eq!(config.mixer_name, "PCM");
    assert_eq!(config.mixer_index, 2);
    assert!(!config.block);
    assert!(config.resample);
    assert!(config.non_interleaved);
}

#[test]
fn test_missing_keys_take_defaults() {
    let config = AoConfig::from_json(json!({ "resample": true })).unwrap();

    assert!(config.resample);
    assert!(config.block);
    assert_eq!(config.mixer_name, "Master");
}

#[test]
fn test_mixer_index_range() {
    assert!(AoConfig::from_json(json!({ "mixer-index": 99 })).is_ok());

    let err = AoConfig::from_json(json!({ "mixer-index": 100 })).unwrap_err();
    assert!(err.to_string().contains("mixer-index"));
}

#[test]
fn test_rejects_bad_values() {
    assert!(AoConfig::from_json(json!({ "block": "yes" })).is_err());
    assert!(AoConfig::from_json(json!({ "mixer-name": "" })).is_err());
}

#[test]
fn test_round_trips_through_json() {
    let config = AoConfig {
        device: "plug:surround51".into(),
        ..Default::default()
    };
    let value = serde_json::to_value(&config).unwrap();

    assert_eq!(value["device"], "plug:surround51");
    assert_eq!(AoConfig::from_json(value).unwrap(), config);
}
