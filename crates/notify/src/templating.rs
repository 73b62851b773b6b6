//! Minijinja template rendering for alert notifications.
//!
//! Renders notification subject and body templates using minijinja, with
//! access to the alert row that triggered the notification.
//!
//! Templates are arbitrary strings (not pre-registered), so a fresh
//! [`minijinja::Environment`] is created per render call.

use crate::traits::NotifyError;

/// Context data available to notification templates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TemplateContext {
    /// The alert row that triggered this notification.
    pub alert: AlertContext,
    /// Current timestamp in ISO 8601 format.
    pub now: String,
}

/// Alert fields exposed to templates, mirroring `painmine_store::alert::Alert`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AlertContext {
    pub id: i64,
    pub alert_type: String,
    pub cluster_id: Option<i64>,
    pub topic_canonical: Option<String>,
    pub message: String,
    pub payload: Option<serde_json::Value>,
}

/// Renders notification templates using minijinja.
///
/// A fresh [`minijinja::Environment`] is created per render call since
/// templates are dynamic strings, not pre-registered files.
#[derive(Debug)]
pub struct TemplateRenderer {
    _private: (),
}

impl TemplateRenderer {
    /// Create a new template renderer.
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Build a configured minijinja environment with custom filters and globals.
    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();

        env.add_filter("round", round_filter);
        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);
        env.add_function("env", env_function);

        env
    }

    /// Render a template string with the given context.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template is invalid or
    /// rendering fails (e.g., type errors, undefined variables in strict mode).
    pub fn render(&self, template_str: &str, ctx: &TemplateContext) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Validate that a template string parses without errors.
    ///
    /// This does not evaluate the template — it only checks syntax.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Template`] if the template has syntax errors.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Custom filter: round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

/// Custom filter: lowercase a string.
fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

/// Custom filter: uppercase a string.
fn upper_filter(value: String) -> String {
    value.to_uppercase()
}

/// Global function: read an environment variable by name.
///
/// Returns the variable value, or an empty string if not found
/// (with a warning logged via tracing).
fn env_function(name: String) -> String {
    match std::env::var(&name) {
        Ok(val) => val,
        Err(_) => {
            tracing::warn!(var = %name, "environment variable not found, returning empty string");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_context() -> TemplateContext {
        TemplateContext {
            alert: AlertContext {
                id: 42,
                alert_type: "spike".to_string(),
                cluster_id: Some(7),
                topic_canonical: Some("invoice delays".to_string()),
                message: "\"invoice delays\" is spiking: 18 new mentions today".to_string(),
                payload: None,
            },
            now: "2026-02-16T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn render_basic_template() {
        let renderer = TemplateRenderer::new();
        let ctx = sample_context();

        let template = "Alert [{{ alert.alert_type }}]: {{ alert.message }}";
        let result = renderer.render(template, &ctx).unwrap();
        assert_eq!(result, "Alert [spike]: \"invoice delays\" is spiking: 18 new mentions today");
    }

    #[test]
    fn render_upper_lower_filters() {
        let renderer = TemplateRenderer::new();
        let ctx = sample_context();

        assert_eq!(renderer.render("{{ alert.alert_type | upper }}", &ctx).unwrap(), "SPIKE");
        assert_eq!(renderer.render("{{ alert.alert_type | lower }}", &ctx).unwrap(), "spike");
    }

    #[test]
    fn render_env_function() {
        std::env::set_var("PAINMINE_NOTIFY_TEST_VAR", "hello_notify");

        let renderer = TemplateRenderer::new();
        let ctx = sample_context();

        let template = "Env: {{ env('PAINMINE_NOTIFY_TEST_VAR') }}";
        let result = renderer.render(template, &ctx).unwrap();
        assert_eq!(result, "Env: hello_notify");

        std::env::remove_var("PAINMINE_NOTIFY_TEST_VAR");
    }

    #[test]
    fn render_env_missing_returns_empty() {
        let renderer = TemplateRenderer::new();
        let ctx = sample_context();

        let template = "Env: [{{ env('DEFINITELY_NOT_SET_XYZ') }}]";
        let result = renderer.render(template, &ctx).unwrap();
        assert_eq!(result, "Env: []");
    }

    #[test]
    fn invalid_template_produces_error() {
        let renderer = TemplateRenderer::new();
        let ctx = sample_context();

        let result = renderer.render("{{ unclosed", &ctx);
        assert!(result.is_err());
        match result.unwrap_err() {
            NotifyError::Template(msg) => assert!(!msg.is_empty()),
            other => panic!("expected Template error, got: {other:?}"),
        }
    }

    #[test]
    fn render_optional_fields_render_as_none() {
        let renderer = TemplateRenderer::new();
        let mut ctx = sample_context();
        ctx.alert.cluster_id = None;

        let result = renderer.render("Cluster: {{ alert.cluster_id }}", &ctx).unwrap();
        assert_eq!(result, "Cluster: none");
    }

    #[test]
    fn validate_invalid_template() {
        let renderer = TemplateRenderer::new();
        assert!(renderer.validate("{{ unclosed").is_err());
    }
}
