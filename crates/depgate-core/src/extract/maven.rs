use regex::Regex;
use std::sync::OnceLock;

use super::{Declared, DependencyExtractor};

static DEPENDENCY_RE: OnceLock<Regex> = OnceLock::new();

fn dependency_re() -> &'static Regex {
    DEPENDENCY_RE.get_or_init(|| {
        Regex::new(
            r"(?s)<dependency>\s*<groupId>([^<]+)</groupId>\s*<artifactId>([^<]+)</artifactId>\s*(?:<version>([^<]+)</version>)?",
        )
        .unwrap()
    })
}

/// `pom.xml`: `<dependency>` blocks, named `groupId:artifactId`.
pub struct MavenExtractor;

impl DependencyExtractor for MavenExtractor {
    fn ecosystem(&self) -> &'static str {
        "maven"
    }

    fn supports(&self, file_name: &str) -> bool {
        file_name == "pom.xml"
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

    const POM: &str = r#"
<project>
  <dependencies>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13.2</version>
    </dependency>
    <dependency>
      <groupId> org.slf4j </groupId>
      <artifactId>slf4j-api</artifactId>
    </dependency>
  </dependencies>
</project>"#;

    #[test]
    fn names_are_group_and_artifact() {
        assert_eq!(
            MavenExtractor.declared(POM),
            vec![
                ("junit:junit".to_string(), "4.13.2".to_string()),
                ("org.slf4j:slf4j-api".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn version_bump_is_not_new() {
        let bumped = POM.replace("4.13.2", "4.13.3");
        assert!(MavenExtractor.extract("pom.xml", &bumped, POM).is_empty());
    }
}
