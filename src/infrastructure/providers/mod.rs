mod aliyun_adapter;
mod provider_factory;
mod provider_http;
mod zhipuai_adapter;

pub use aliyun_adapter::{
    ALIYUN_DEFAULT_BASE_URL, ALIYUN_DEFAULT_MODELS, ALIYUN_PROVIDER, AliyunAdapter,
};
pub use provider_factory::{ProviderFactory, ProviderFactoryError};
pub use zhipuai_adapter::{
    ZHIPUAI_DEFAULT_BASE_URL, ZHIPUAI_DEFAULT_MODELS, ZHIPUAI_PROVIDER, ZhipuAiAdapter,
};
