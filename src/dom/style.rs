use indexmap::IndexMap;
use std::fmt;

/// Ordered `property: value` pairs of an inline `style` attribute
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleDeclaration {
    properties: IndexMap<String, String>,
}

impl StyleDeclaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `style` attribute value. Malformed entries are skipped.
    pub fn parse(style: &str) -> Self {
        let properties = style
            .split(';')
            .filter_map(|decl| {
                let (name, value) = decl.split_once(':')?;
                let name = name.trim().to_ascii_lowercase();
                let value = value.trim();
                if name.is_empty() || value.is_empty() {
                    None
                } else {
                    Some((name, value.to_string()))
                }
            })
            .collect();
        Self { properties }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties.get(property).map(String::as_str)
    }

    /// Set a property, keeping its original position when it already exists
    pub fn set(&mut self, property: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(property.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// `display: none` or `visibility: hidden`
    pub fn hides_element(&self) -> bool {
        self.get("display")
            .is_some_and(|v| v.eq_ignore_ascii_case("none"))
            || self
                .get("visibility")
                .is_some_and(|v| v.eq_ignore_ascii_case("hidden"))
    }
}

impl fmt::Display for StyleDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.properties {
            write!(f, "{}:{};", name, value)?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StyleDeclaration {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize() {
        let style = StyleDeclaration::parse(" color: red ; FONT-SIZE:12px;;bogus; :x ");
        assert_eq!(style.len(), 2);
        assert_eq!(style.get("color"), Some("red"));
        assert_eq!(style.get("font-size"), Some("12px"));
        assert_eq!(style.to_string(), "color:red;font-size:12px;");
    }

    #[test]
    fn test_set_keeps_position() {
        let mut style = StyleDeclaration::parse("color:red;display:block");
        style.set("color", "blue");
        style.set("text-decoration", "underline");
        assert_eq!(style.to_string(), "color:blue;display:block;text-decoration:underline;");
    }

    #[test]
    fn test_values_with_colons_survive() {
        let style = StyleDeclaration::parse("background-image:url(http://x/y.png)");
        assert_eq!(style.get("background-image"), Some("url(http://x/y.png)"));
    }

    #[test]
    fn test_hides_element() {
        assert!(StyleDeclaration::parse("display:none").hides_element());
        assert!(StyleDeclaration::parse("visibility: HIDDEN").hides_element());
        assert!(!StyleDeclaration::parse("display:block;visibility:visible").hides_element());
    }
}
