use serde_json::{Map, Value};

/// Default address of a local Ollama server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default model, one that supports tool calling.
pub const DEFAULT_MODEL: &str = "llama3.2:latest";

/// Builder for [`OllamaConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OllamaConfigBuilder {
    model: Option<String>,
    base_url: Option<String>,
    options: Map<String, Value>,
    format: Option<Value>,
    keep_alive: Option<Value>,
    stream: bool,
}

impl OllamaConfigBuilder {
    /// Creates a builder with every setting at its default.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets a custom base URL, e.g. `http://127.0.0.1:11434`.
    #[inline]
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets one model option such as `seed` or `temperature`.
    #[inline]
    pub fn with_option<K: Into<String>, V: Into<Value>>(
        mut self,
        key: K,
        value: V,
    ) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Requests a response format, either `"json"` or a JSON schema.
    #[inline]
    pub fn with_format<V: Into<Value>>(mut self, format: V) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Controls how long the model stays loaded after a request, e.g.
    /// `"5m"` or a number of seconds.
    #[inline]
    pub fn with_keep_alive<V: Into<Value>>(mut self, keep_alive: V) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    /// Receives the reply as a stream of chunks instead of one object.
    #[inline]
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> OllamaConfig {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        OllamaConfig {
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url.trim_end_matches('/').to_owned(),
            options: self.options,
            format: self.format,
            keep_alive: self.keep_alive,
            stream: self.stream,
        }
    }
}

/// Configuration for the Ollama provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OllamaConfig {
    pub(crate) model: String,
    pub(crate) base_url: String,
    pub(crate) options: Map<String, Value>,
    pub(crate) format: Option<Value>,
    pub(crate) keep_alive: Option<Value>,
    pub(crate) stream: bool,
}

impl OllamaConfig {
    /// Returns the model name.
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Returns the base URL, without a trailing slash.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = OllamaConfigBuilder::new().build();
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert!(config.options.is_empty());
        assert!(!config.stream);
    }

    #[test]
    fn test_overrides() {
        let config = OllamaConfigBuilder::new()
            .with_model("gemma3:4b")
            .with_base_url("http://gpu-box:11434/")
            .with_option("seed", 256)
            .with_option("temperature", 0)
            .with_keep_alive("10m")
            .with_stream(true)
            .build();
        assert_eq!(config.model(), "gemma3:4b");
        assert_eq!(config.base_url(), "http://gpu-box:11434");
        assert_eq!(config.options["seed"], json!(256));
        assert_eq!(config.keep_alive, Some(json!("10m")));
        assert!(config.stream);
    }
}
