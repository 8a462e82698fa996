//! Read-only store of the templates compiled into the binary

use std::collections::HashMap;

use serde::Serialize;

use super::engine::CompiledTemplate;
use super::front_matter::split_front_matter;
use super::{RenderError, RenderedMessage, TemplateResult};

/// Templates shipped with the service, keyed by file name
const BUNDLED: &[(&str, &str)] = &[("alert.txt", include_str!("../../templates/alert.txt"))];

pub struct TemplateStore {
    templates: HashMap<String, CompiledTemplate>,
}

impl TemplateStore {
    /// Compile every bundled template
    pub fn bundled() -> TemplateResult<Self> {
        Self::from_sources(BUNDLED.iter().copied())
    }

    /// Compile templates from `(name, source)` pairs
    pub fn from_sources<'a, I>(sources: I) -> TemplateResult<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let templates = sources
            .into_iter()
            .map(|(name, source)| {
                let compiled = CompiledTemplate::compile(source)
                    .map_err(|e| RenderError::Syntax(format!("{}: {}", name, e)))?;
                Ok((name.to_string(), compiled))
            })
            .collect::<TemplateResult<HashMap<_, _>>>()?;

        tracing::debug!(count = templates.len(), "Templates compiled");
        Ok(Self { templates })
    }

    /// Check if a template exists
    pub fn exists(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Render a template and split its front-matter header from the body
    pub fn render<C: Serialize>(&self, name: &str, context: &C) -> TemplateResult<RenderedMessage> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| RenderError::NotFound(name.to_string()))?;

        let context =
            serde_json::to_value(context).map_err(|e| RenderError::Execution(e.to_string()))?;
        let rendered = template.execute(&context)?;
        let (header, body) = split_front_matter(&rendered)?;

        Ok(RenderedMessage { header, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alert_context(is_new: bool) -> serde_json::Value {
        json!({
            "event": {
                "UID": "evt-1",
                "DTSTART": "20240115T093000Z",
                "DTEND": "20240115T113000Z",
                "DESCRIPTION": "TD Réseaux\\nGroupe 2",
                "LOCATION": "Salle B204",
                "LAST-MODIFIED": ""
            },
            "isNew": is_new
        })
    }

    #[test]
    fn test_bundled_alert_template() {
        let store = TemplateStore::bundled().unwrap();
        assert!(store.exists("alert.txt"));

        let rendered = store.render("alert.txt", &alert_context(true)).unwrap();
        assert_eq!(rendered.subject(), "Nouveau cours le 15/01/2024 09:30");
        assert!(rendered.body.contains("Début : 15/01/2024 09:30"));
        assert!(rendered.body.contains("Fin : 15/01/2024 11:30"));
        assert!(rendered.body.contains("Lieu : Salle B204"));
        assert!(rendered.body.contains("TD Réseaux\nGroupe 2"));
        assert!(!rendered.body.contains("subject:"));
        assert!(!rendered.body.starts_with("---"));
    }

    #[test]
    fn test_bundled_alert_template_update() {
        let store = TemplateStore::bundled().unwrap();
        let rendered = store.render("alert.txt", &alert_context(false)).unwrap();
        assert_eq!(rendered.subject(), "Cours modifié le 15/01/2024 09:30");
        assert!(rendered.body.contains("a été modifié"));
    }

    #[test]
    fn test_subject_survives_quotes_and_backslashes() {
        let store = TemplateStore::bundled().unwrap();
        let mut context = alert_context(true);
        context["event"]["DTSTART"] = json!(r#"TBD "salle" C:\d"#);

        let rendered = store.render("alert.txt", &context).unwrap();
        assert_eq!(rendered.subject(), r#"Nouveau cours le TBD "salle" C:\d"#);
        assert!(rendered.body.contains(r#"Début : TBD "salle" C:\d"#));
    }

    #[test]
    fn test_unknown_template() {
        let store = TemplateStore::bundled().unwrap();
        let err = store.render("../../etc/passwd", &alert_context(true)).unwrap_err();
        assert!(matches!(err, RenderError::NotFound(_)));
    }

    #[test]
    fn test_missing_context_field() {
        let store = TemplateStore::bundled().unwrap();
        let err = store.render("alert.txt", &json!({"isNew": true})).unwrap_err();
        assert!(matches!(err, RenderError::Execution(_)));
    }

    #[test]
    fn test_template_without_front_matter() {
        let store = TemplateStore::from_sources([("plain.txt", "Hello {{name}}")]).unwrap();
        let err = store.render("plain.txt", &json!({"name": "x"})).unwrap_err();
        assert!(matches!(err, RenderError::FrontMatter(_)));
    }

    #[test]
    fn test_invalid_source_is_rejected() {
        let result = TemplateStore::from_sources([("broken.txt", "{{#if a}}")]);
        assert!(matches!(result, Err(RenderError::Syntax(msg)) if msg.starts_with("broken.txt")));
    }
}
