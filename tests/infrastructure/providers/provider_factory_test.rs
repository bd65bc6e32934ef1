use vidgen::infrastructure::providers::{ALIYUN_DEFAULT_MODELS, ProviderFactory};
use vidgen::presentation::config::{ProviderSettings, ProvidersSettings};

#[test]
fn given_default_settings_when_creating_adapters_then_both_providers_with_default_models() {
    let adapters = ProviderFactory::create_all(&ProvidersSettings::default()).unwrap();

    let names: Vec<&str> = adapters
        .iter()
        .map(|a| a.descriptor().provider_name())
        .collect();
    assert_eq!(names, vec!["aliyun", "zhipuai"]);
    assert_eq!(
        adapters[0].descriptor().supported_models().count(),
        ALIYUN_DEFAULT_MODELS.len()
    );
}

#[test]
fn given_model_override_when_creating_adapters_then_only_listed_models_are_served() {
    let settings = ProvidersSettings {
        aliyun: ProviderSettings {
            api_key: "sk-test".to_string(),
            supported_models: Some(vec!["wanx2.1-t2v-turbo".to_string()]),
            ..ProviderSettings::default()
        },
        ..ProvidersSettings::default()
    };

    let adapters = ProviderFactory::create_all(&settings).unwrap();

    let aliyun = adapters[0].descriptor();
    assert_eq!(
        aliyun.supported_models().collect::<Vec<_>>(),
        vec!["wanx2.1-t2v-turbo"]
    );
    assert!(!aliyun.supports("wanx2.1-i2v-plus"));
}

#[test]
fn given_empty_model_override_when_creating_adapters_then_defaults_are_kept() {
    let settings = ProvidersSettings {
        zhipuai: ProviderSettings {
            supported_models: Some(Vec::new()),
            ..ProviderSettings::default()
        },
        ..ProvidersSettings::default()
    };

    let adapters = ProviderFactory::create_all(&settings).unwrap();

    assert!(adapters[1].descriptor().supports("cogvideox-2"));
}
