//! `${KEY}` / `${KEY:default}` expansion for annotation string fields.
//!
//! Resolution order for each token: process configuration, then environment
//! variables, then the literal default, then the empty string. Replacement is
//! literal and happens in a single pass; a replacement value that itself
//! contains `${` is never re-expanded.

use crate::errors::PipelineError;
use std::collections::HashMap;

/// A key/value lookup the resolver consults.
///
/// Both the process configuration and the environment are injected through
/// this trait so tests can pin values instead of mutating process state.
pub trait ConfigProvider: Send + Sync {
    /// Value for `key`, if set.
    fn get(&self, key: &str) -> Option<String>;
}

/// Static map-backed provider (process configuration, test fixtures).
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new(values: HashMap<String, String>) -> Self {
        MapConfig { values }
    }

    pub fn empty() -> Self {
        MapConfig::default()
    }
}

impl ConfigProvider for MapConfig {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Provider backed by the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigProvider for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Expands `${KEY:default}` tokens against a configuration and an
/// environment provider.
pub struct PlaceholderResolver {
    config: Box<dyn ConfigProvider>,
    env: Box<dyn ConfigProvider>,
}

impl PlaceholderResolver {
    pub fn new(config: Box<dyn ConfigProvider>, env: Box<dyn ConfigProvider>) -> Self {
        PlaceholderResolver { config, env }
    }

    /// Resolver over the real process environment with the given
    /// configuration map (typically the manifest's `config:` section).
    pub fn with_config(values: HashMap<String, String>) -> Self {
        PlaceholderResolver::new(Box::new(MapConfig::new(values)), Box::new(EnvConfig))
    }

    /// Resolver over the real process environment and no configuration.
    pub fn from_process() -> Self {
        PlaceholderResolver::with_config(HashMap::new())
    }

    fn lookup(&self, key: &str, default: Option<&str>) -> String {
        self.config
            .get(key)
            .or_else(|| self.env.get(key))
            .or_else(|| default.map(String::from))
            .unwrap_or_default()
    }

    /// Expand every `${KEY}` / `${KEY:default}` token in `input`.
    ///
    /// Inputs without a `${` token are returned unchanged (the resolver is
    /// idempotent on them). An unclosed token is an error.
    pub fn resolve(&self, input: &str) -> Result<String, PipelineError> {
        if !input.contains("${") {
            return Ok(input.to_string());
        }
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let token_body = &rest[start + 2..];
            let end = token_body
                .find('}')
                .ok_or_else(|| PipelineError::MalformedPlaceholder {
                    input: input.to_string(),
                })?;
            let token = &token_body[..end];
            let (key, default) = match token.split_once(':') {
                Some((k, d)) => (k, Some(d)),
                None => (token, None),
            };
            out.push_str(&self.lookup(key, default));
            rest = &token_body[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(config: &[(&str, &str)], env: &[(&str, &str)]) -> PlaceholderResolver {
        let to_map = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>()
        };
        PlaceholderResolver::new(
            Box::new(MapConfig::new(to_map(config))),
            Box::new(MapConfig::new(to_map(env))),
        )
    }

    #[test]
    fn untokenized_input_is_unchanged() {
        let r = resolver(&[], &[]);
        assert_eq!(r.resolve("plain value").unwrap(), "plain value");
        // idempotent: resolving twice gives the same string
        let once = r.resolve("a $ sign but no token").unwrap();
        assert_eq!(r.resolve(&once).unwrap(), once);
    }

    #[test]
    fn config_wins_over_env_and_default() {
        let r = resolver(&[("SPEC", "/cfg.yaml")], &[("SPEC", "/env.yaml")]);
        assert_eq!(r.resolve("${SPEC:/default.yaml}").unwrap(), "/cfg.yaml");
    }

    #[test]
    fn env_wins_over_default() {
        let r = resolver(&[], &[("SPEC_PATH", "/etc/x.yaml")]);
        assert_eq!(
            r.resolve("${SPEC_PATH:/tmp/default.yaml}").unwrap(),
            "/etc/x.yaml"
        );
    }

    #[test]
    fn default_applies_when_nothing_is_set() {
        let r = resolver(&[], &[]);
        assert_eq!(r.resolve("${MISSING:fallback}").unwrap(), "fallback");
        assert_eq!(r.resolve("${MISSING}").unwrap(), "");
    }

    #[test]
    fn replacement_is_literal() {
        let r = resolver(&[("K", "a$b\\c")], &[]);
        assert_eq!(r.resolve("x-${K}-y").unwrap(), "x-a$b\\c-y");
    }

    #[test]
    fn no_nested_interpolation() {
        let r = resolver(&[("OUTER", "${INNER}"), ("INNER", "boom")], &[]);
        assert_eq!(r.resolve("${OUTER}").unwrap(), "${INNER}");
    }

    #[test]
    fn multiple_tokens_in_one_string() {
        let r = resolver(&[("A", "1"), ("B", "2")], &[]);
        assert_eq!(r.resolve("${A}/${B}/${C:3}").unwrap(), "1/2/3");
    }

    #[test]
    fn unclosed_token_fails() {
        let r = resolver(&[], &[]);
        let err = r.resolve("prefix ${OPEN").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedPlaceholder { .. }));
    }

    #[test]
    fn empty_default_is_allowed() {
        let r = resolver(&[], &[]);
        assert_eq!(r.resolve("a${K:}b").unwrap(), "ab");
    }
}
