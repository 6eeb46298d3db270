use regex::Regex;
use std::sync::OnceLock;

use super::{Declared, DependencyExtractor};

static DEPENDENCY_RE: OnceLock<Regex> = OnceLock::new();

// implementation 'group:artifact:version' or implementation("group:artifact:version")
fn dependency_re() -> &'static Regex {
    DEPENDENCY_RE.get_or_init(|| {
        Regex::new(
            r#"(?:implementation|api|compile|testImplementation|runtimeOnly|compileOnly)\s*[(\s]*['"]([^:'"]+):([^:'"]+)(?::([^'"]+))?['"]"#,
        )
        .unwrap()
    })
}

/// `build.gradle` and `build.gradle.kts` string-notation dependencies.
pub struct GradleExtractor;

impl DependencyExtractor for GradleExtractor {
    fn ecosystem(&self) -> &'static str {
        "gradle"
    }

    fn supports(&self, file_name: &str) -> bool {
        file_name == "build.gradle" || file_name == "build.gradle.kts"
    }

    fn declared(&self, content: &str) -> Vec<Declared> {
        dependency_re()
            .captures_iter(content)
            .map(|caps| {
                let group = caps[1].trim();
                let artifact = caps[2].trim();
                let version = caps.get(3).map(|m| m.as_str().trim()).unwrap_or_default();
                (format!("{group}:{artifact}"), version.to_string())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groovy_and_kotlin_notation() {
        let build = r#"
dependencies {
    implementation 'com.google.guava:guava:32.1.2-jre'
    testImplementation("org.junit.jupiter:junit-jupiter:5.10.0")
    compileOnly "org.projectlombok:lombok"
}
"#;
        assert_eq!(
            GradleExtractor.declared(build),
            vec![
                ("com.google.guava:guava".to_string(), "32.1.2-jre".to_string()),
                (
                    "org.junit.jupiter:junit-jupiter".to_string(),
                    "5.10.0".to_string()
                ),
                ("org.projectlombok:lombok".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn only_added_lines_are_new() {
        let before = "dependencies {\n    api 'a:b:1'\n}\n";
        let after = "dependencies {\n    api 'a:b:2'\n    runtimeOnly 'c:d:3'\n}\n";
        let obs = GradleExtractor.extract("build.gradle", after, before);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].name, "c:d");
        assert_eq!(obs[0].version, "3");
        assert_eq!(obs[0].ecosystem, "gradle");
    }

    #[test]
    fn ignores_other_files() {
        assert!(!GradleExtractor.supports("settings.gradle"));
    }
}
