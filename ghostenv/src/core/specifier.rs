//! Package specifier helpers.
//!
//! A specifier is a distribution name optionally followed by extras, version
//! constraints, environment markers or a direct reference
//! (`name[extra]>=1.0; python_version > "3.8"`, `name @ https://...`).

use std::sync::LazyLock;

use regex::Regex;

static DISTRIBUTION_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:$|[\[(=<>!~;@,\s])")
        .expect("distribution name regex")
});

/// Bare distribution name of `spec`, with extras and constraints stripped.
///
/// Returns `None` for inputs that do not start with a name, such as paths
/// (`./pkg`) or VCS/URL references (`git+https://...`).
pub fn distribution_name(spec: &str) -> Option<&str> {
    DISTRIBUTION_NAME
        .captures(spec)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Import targets for the requested specifiers, in request order, deduplicated.
pub fn import_targets<S: AsRef<str>>(specs: &[S]) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for spec in specs {
        if let Some(name) = distribution_name(spec.as_ref())
            && !targets.iter().any(|t| t == name)
        {
            targets.push(name.to_string());
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_version_constraints() {
        assert_eq!(distribution_name("requests>=2.0"), Some("requests"));
        assert_eq!(distribution_name("numpy==1.26.4"), Some("numpy"));
        assert_eq!(distribution_name("flask~=3.0"), Some("flask"));
        assert_eq!(distribution_name("attrs!=21.1"), Some("attrs"));
        assert_eq!(distribution_name("six<2"), Some("six"));
    }

    #[test]
    fn strips_extras() {
        assert_eq!(distribution_name("pkg[extra]==1.0"), Some("pkg"));
        assert_eq!(distribution_name("uvicorn[standard]"), Some("uvicorn"));
    }

    #[test]
    fn strips_markers_and_direct_references() {
        assert_eq!(
            distribution_name("tomli; python_version < \"3.11\""),
            Some("tomli")
        );
        assert_eq!(
            distribution_name("mylib @ https://example.com/mylib-1.0.tar.gz"),
            Some("mylib")
        );
        assert_eq!(distribution_name("  pandas  "), Some("pandas"));
    }

    #[test]
    fn bare_name_is_unchanged() {
        assert_eq!(distribution_name("requests"), Some("requests"));
        assert_eq!(distribution_name("x"), Some("x"));
        assert_eq!(distribution_name("zope.interface"), Some("zope.interface"));
    }

    #[test]
    fn rejects_paths_and_urls() {
        assert_eq!(distribution_name("./local-pkg"), None);
        assert_eq!(distribution_name("/abs/path/pkg.whl"), None);
        assert_eq!(distribution_name("git+https://github.com/x/y"), None);
        assert_eq!(distribution_name(""), None);
    }

    #[test]
    fn import_targets_dedupes_in_order() {
        let specs = ["requests>=2.0", "pkg[extra]==1.0", "requests", "./skip-me"];
        assert_eq!(import_targets(&specs), vec!["requests", "pkg"]);
    }
}
