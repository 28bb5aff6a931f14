use crate::tree::{node::dotted, ConfigNode};
use crate::{Result, TreeConfigError};
use tracing::{debug, warn};

/// Replaces every `%a.b.c%` token in the option values of `config` by the
/// value of the option `a.b.c`.
///
/// Options are resolved in [`ConfigNode::suboptions`] order and written back
/// as soon as they are resolved, so later options reuse resolved text.
/// Referenced options may contain references themselves; each chain may be
/// at most `option count - 1` steps deep, which stops circular references.
pub fn resolve_references(config: &ConfigNode, reference_char: char) -> Result<()> {
    let keylists = config.suboptions();
    let budget = keylists.len().saturating_sub(1);
    let resolver = Resolver {
        config,
        reference_char,
    };

    for keylist in &keylists {
        resolver.resolve_keylist(keylist, budget)?;
    }

    debug!(options = keylists.len(), "Resolved cross-references");
    Ok(())
}

/// Dotted keylists referenced by `value`, in order of appearance.
///
/// ```
/// use treeconf::format::extract_references;
///
/// assert_eq!(extract_references("%a%-%b.c%", '%'), vec!["a", "b.c"]);
/// assert!(extract_references("100%", '%').is_empty());
/// ```
pub fn extract_references(value: &str, reference_char: char) -> Vec<String> {
    if value.chars().count() <= 2 || !value.contains(reference_char) {
        return Vec::new();
    }
    value
        .split(reference_char)
        .enumerate()
        .filter(|(index, part)| index % 2 == 1 && !part.is_empty())
        .map(|(_, part)| part.to_string())
        .collect()
}

struct Resolver<'a> {
    config: &'a ConfigNode,
    reference_char: char,
}

impl Resolver<'_> {
    fn resolve_keylist<K: AsRef<str>>(&self, keylist: &[K], budget: usize) -> Result<String> {
        let value = self.config.get_str(keylist)?;
        let resolved = self.resolve_value(keylist, value, budget)?;
        self.config.set(keylist, resolved.as_str(), false)?;
        Ok(resolved)
    }

    fn resolve_value<K: AsRef<str>>(
        &self,
        keylist: &[K],
        mut value: String,
        budget: usize,
    ) -> Result<String> {
        let references = extract_references(&value, self.reference_char);
        if references.is_empty() {
            return Ok(value);
        }
        if budget == 0 {
            warn!(option = %dotted(keylist), "Cross-reference chain too deep or circular");
            return Err(TreeConfigError::CrossReference {
                keylist: dotted(keylist),
            });
        }

        for reference in references {
            let target: Vec<&str> = reference.split('.').collect();
            let substitute = self.resolve_keylist(&target, budget - 1)?;
            let token = format!("{0}{1}{0}", self.reference_char, reference);
            value = value.replace(&token, &substitute);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(options: &[(&str, &str)]) -> ConfigNode {
        let config = ConfigNode::new();
        for (key, value) in options {
            let keylist: Vec<&str> = key.split('.').collect();
            config.set(&keylist, *value, true).unwrap();
        }
        config
    }

    #[test]
    fn test_simple_references() {
        let config = config(&[("a", "x"), ("b", "y"), ("c", "%a%-%b%")]);
        resolve_references(&config, '%').unwrap();
        assert_eq!(config.get_str(&["c"]).unwrap(), "x-y");
    }

    #[test]
    fn test_chained_references_are_resolved_in_place() {
        let config = config(&[
            ("first", "%paths.home%/data"),
            ("paths.home", "%paths.root%/home"),
            ("paths.root", "/srv"),
        ]);
        resolve_references(&config, '%').unwrap();
        assert_eq!(config.get_str(&["first"]).unwrap(), "/srv/home/data");
        assert_eq!(config.get_str(&["paths", "home"]).unwrap(), "/srv/home");
    }

    #[test]
    fn test_circular_references_fail() {
        let config = config(&[("a", "%b%"), ("b", "%a%")]);
        assert!(matches!(
            resolve_references(&config, '%'),
            Err(TreeConfigError::CrossReference { .. })
        ));
    }

    #[test]
    fn test_self_reference_fails() {
        let config = config(&[("a", "%a%")]);
        assert!(matches!(
            resolve_references(&config, '%'),
            Err(TreeConfigError::CrossReference { keylist }) if keylist == "a"
        ));
    }

    #[test]
    fn test_missing_reference_is_key_not_found() {
        let config = config(&[("a", "%missing.key%"), ("b", "1")]);
        assert!(matches!(
            resolve_references(&config, '%'),
            Err(TreeConfigError::KeyNotFound { keylist }) if keylist == "missing"
        ));
    }

    #[test]
    fn test_reference_to_section_is_an_error() {
        let config = config(&[("a", "%s%"), ("s.x", "1")]);
        assert!(matches!(
            resolve_references(&config, '%'),
            Err(TreeConfigError::NotALeaf { .. })
        ));
    }

    #[test]
    fn test_lone_reference_char_is_plain_text() {
        let config = config(&[("ratio", "50 %")]);
        resolve_references(&config, '%').unwrap();
        assert_eq!(config.get_str(&["ratio"]).unwrap(), "50 %");
    }

    #[test]
    fn test_custom_reference_char() {
        let config = config(&[("a", "x"), ("b", "$a$ and %a%")]);
        resolve_references(&config, '$').unwrap();
        assert_eq!(config.get_str(&["b"]).unwrap(), "x and %a%");
    }
}
