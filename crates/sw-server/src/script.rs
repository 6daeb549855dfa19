//! Client script delivery and web-client injection.
//!
//! The browser engine ships embedded in the binary. A file configured under
//! `client.script_path` replaces it (useful while iterating on the script
//! without rebuilding). Every response is prefixed with a settings object
//! derived from [`EngineConfig`] so both engines share one set of tunables.

use std::path::PathBuf;

use serde_json::json;

use sw_core::config::{ClientConfig, EngineConfig};

const EMBEDDED_SCRIPT: &str = include_str!("../assets/client.js");

/// Marks an injected tag so repeated runs can find it.
pub const INJECTION_MARKER: &str = "<!-- skipwarden client -->";

/// Path the script is served under.
pub const SCRIPT_ROUTE: &str = "/client-script";

#[derive(Debug)]
pub struct ClientScript {
    body: String,
    source: Option<PathBuf>,
}

impl ClientScript {
    /// Load the override file if one is configured and readable, else the
    /// embedded script.
    pub fn load(config: &ClientConfig) -> Self {
        if let Some(ref path) = config.script_path {
            match std::fs::read_to_string(path) {
                Ok(body) => {
                    tracing::info!("Serving client script from {}", path.display());
                    return Self {
                        body,
                        source: Some(path.clone()),
                    };
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to read client script {}: {e}; using embedded script",
                        path.display()
                    );
                }
            }
        }
        Self::embedded()
    }

    pub fn embedded() -> Self {
        Self {
            body: EMBEDDED_SCRIPT.to_string(),
            source: None,
        }
    }

    /// The override file, when one is in use.
    pub fn source(&self) -> Option<&PathBuf> {
        self.source.as_ref()
    }

    /// Script text with the settings prelude for `server_url`.
    pub fn render(&self, engine: &EngineConfig, server_url: &str) -> String {
        let settings = json!({
            "serverUrl": server_url.trim_end_matches('/'),
            "skipBufferSecs": engine.skip_buffer_secs,
            "cooldownMs": engine.cooldown_ms,
            "noticeMs": engine.notice_ms,
            "showNotice": engine.show_notice,
            "addressPollMs": engine.address_poll_ms,
            "scanIntervalMs": engine.scan_interval_ms,
            "defaultReason": engine.default_reason,
            "preferenceKey": engine.preference_key,
        });
        format!("window.__skipwarden = {settings};\n{}", self.body)
    }
}

/// Outcome of [`inject_script_tag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injection {
    /// The tag was added; holds the new document.
    Inserted(String),
    AlreadyPresent,
    NoBodyTag,
}

/// Insert a `<script>` reference to `script_url` before the last closing
/// body tag, unless the document already references the client script.
pub fn inject_script_tag(html: &str, script_url: &str) -> Injection {
    if html.contains(INJECTION_MARKER) || html.contains(script_url) {
        return Injection::AlreadyPresent;
    }

    // ASCII lowercasing keeps byte offsets aligned with the original.
    let Some(at) = html.to_ascii_lowercase().rfind("</body>") else {
        return Injection::NoBodyTag;
    };

    let mut out = String::with_capacity(html.len() + script_url.len() + 64);
    out.push_str(&html[..at]);
    out.push_str(INJECTION_MARKER);
    out.push_str(&format!("<script src=\"{script_url}\" defer></script>"));
    out.push_str(&html[at..]);
    Injection::Inserted(out)
}

/// Absolute script URL for a server reachable at `base_url`.
pub fn script_url(base_url: &str) -> String {
    format!("{}{SCRIPT_ROUTE}", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://media.local:8080/client-script";

    #[test]
    fn inserts_before_closing_body() {
        let html = "<html><body><div id=app></div></body></html>";
        let Injection::Inserted(out) = inject_script_tag(html, URL) else {
            panic!("expected insertion");
        };
        assert!(out.ends_with(
            "<script src=\"http://media.local:8080/client-script\" defer></script></body></html>"
        ));
        assert!(out.contains(INJECTION_MARKER));
    }

    #[test]
    fn second_run_is_a_no_op() {
        let html = "<html><body></body></html>";
        let Injection::Inserted(once) = inject_script_tag(html, URL) else {
            panic!("expected insertion");
        };
        assert_eq!(inject_script_tag(&once, URL), Injection::AlreadyPresent);
        assert_eq!(once.matches("<script").count(), 1);
    }

    #[test]
    fn uses_last_body_tag_case_insensitively() {
        let html = "<body><template></body></template></BODY>";
        let Injection::Inserted(out) = inject_script_tag(html, URL) else {
            panic!("expected insertion");
        };
        assert!(out.starts_with("<body><template></body></template>"));
        assert!(out.ends_with("</script></BODY>"));
    }

    #[test]
    fn missing_body_is_reported() {
        assert_eq!(inject_script_tag("<html></html>", URL), Injection::NoBodyTag);
    }

    #[test]
    fn render_prefixes_settings() {
        let script = ClientScript::embedded();
        let out = script.render(&EngineConfig::default(), "http://srv:8080/");
        let first = out.lines().next().unwrap();
        assert!(first.starts_with("window.__skipwarden = {"));
        assert!(first.contains("\"serverUrl\":\"http://srv:8080\""));
        assert!(first.contains("\"cooldownMs\":1500"));
        assert!(first.contains("\"defaultReason\":\"Restricted Content\""));
        assert!(first.contains("\"showNotice\":true"));
    }

    #[test]
    fn render_carries_notice_switch() {
        let engine = EngineConfig {
            show_notice: false,
            ..Default::default()
        };
        let out = ClientScript::embedded().render(&engine, "http://x");
        assert!(out.lines().next().unwrap().contains("\"showNotice\":false"));
    }

    #[test]
    fn override_file_replaces_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.js");
        std::fs::write(&path, "console.log('custom');").unwrap();

        let script = ClientScript::load(&ClientConfig {
            script_path: Some(path.clone()),
        });
        assert_eq!(script.source(), Some(&path));
        assert!(script
            .render(&EngineConfig::default(), "http://x")
            .ends_with("console.log('custom');"));
    }

    #[test]
    fn unreadable_override_falls_back() {
        let script = ClientScript::load(&ClientConfig {
            script_path: Some("/nonexistent/skipwarden.js".into()),
        });
        assert!(script.source().is_none());
    }

    #[test]
    fn script_url_joins_route() {
        assert_eq!(script_url("http://a:1/"), "http://a:1/client-script");
    }
}
