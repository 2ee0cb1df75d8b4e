pub mod config;
pub mod normalizer;
pub mod orchestrator;
pub mod speech;
pub mod transport;
pub mod types;

pub use config::{
    ClientSettings, Endpoints, ProviderConfig, ProviderPreset, SpeechProviderPreset,
};
pub use orchestrator::retry::RetryPolicy;
pub use orchestrator::AssistClient;
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, Transport};
pub use types::{AssistError, GrammarCheckResult, TranslationResult};

pub use tokio_util::sync::CancellationToken;
