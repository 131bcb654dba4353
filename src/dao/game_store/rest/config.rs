/// Runtime configuration describing how to reach the REST store.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL; `rest/v1/...` is appended.
    pub base_url: String,
    /// Anonymous key, if the store requires one.
    pub api_key: Option<String>,
}

impl RestConfig {
    /// Construct a configuration from the store base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }

    /// Attach the anonymous API key sent as `apikey` and bearer token.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}
