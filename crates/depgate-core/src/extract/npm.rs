use serde_json::Value;

use super::{Declared, DependencyExtractor};

/// `package.json`: `dependencies`, plus `devDependencies` when enabled.
pub struct NpmExtractor {
    include_dev: bool,
}

impl NpmExtractor {
    pub fn new(include_dev: bool) -> Self {
        Self { include_dev }
    }
}

impl DependencyExtractor for NpmExtractor {
    fn ecosystem(&self) -> &'static str {
        "npm"
    }

    fn supports(&self, file_name: &str) -> bool {
        file_name == "package.json"
    }

    fn declared(&self, content: &str) -> Vec<Declared> {
        if content.trim().is_empty() {
            return Vec::new();
        }
        let json: Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "unparseable package.json");
                return Vec::new();
            }
        };

        let mut sections = vec!["dependencies"];
        if self.include_dev {
            sections.push("devDependencies");
        }

        let mut out = Vec::new();
        for section in sections {
            let Some(deps) = json.get(section).and_then(Value::as_object) else {
                continue;
            };
            for (name, version) in deps {
                let version = match version {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                out.push((name.clone(), version));
            }
        }
        out
    }
}
