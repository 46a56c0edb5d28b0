use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static BOX_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:::box(\{.*?\})?\s*$").expect("valid box start pattern"));

static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)="([^"]+)""#).expect("valid attribute pattern"));

/// Attributes carried by a `:::box{...}` marker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoxAttributes {
    pub theme: Option<String>,
    pub radius: Option<String>,
}

impl BoxAttributes {
    /// Render as the marker suffix: `{theme="dark",radius="8px"}`, or nothing
    /// when neither attribute is set.
    pub fn to_marker_suffix(&self) -> String {
        let mut parts = Vec::new();
        if let Some(theme) = &self.theme {
            parts.push(format!("theme=\"{theme}\""));
        }
        if let Some(radius) = &self.radius {
            parts.push(format!("radius=\"{radius}\""));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!("{{{}}}", parts.join(","))
        }
    }
}

/// Collect every `key="value"` pair from an attribute block. Braces are
/// optional and later duplicates win.
pub fn parse_attributes(block: &str) -> BTreeMap<String, String> {
    let inner = block.trim().trim_start_matches('{').trim_end_matches('}');
    ATTRIBUTE
        .captures_iter(inner)
        .map(|captures| (captures[1].to_string(), captures[2].to_string()))
        .collect()
}

/// Box attributes from an attribute block; unknown keys are ignored
pub fn parse_box_attributes(block: Option<&str>) -> BoxAttributes {
    let Some(block) = block else {
        return BoxAttributes::default();
    };
    let mut attributes = parse_attributes(block);
    BoxAttributes {
        theme: attributes.remove("theme"),
        radius: attributes.remove("radius"),
    }
}

/// Match a whole line against the box opening marker
pub fn match_box_start(line: &str) -> Option<BoxAttributes> {
    let captures = BOX_START.captures(line)?;
    Some(parse_box_attributes(captures.get(1).map(|m| m.as_str())))
}

pub fn is_box_end(line: &str) -> bool {
    line.trim_end() == ":::"
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(":::box", Some(BoxAttributes::default()))]
    #[case(":::box  ", Some(BoxAttributes::default()))]
    #[case(r#":::box{theme="dark"}"#, Some(BoxAttributes { theme: Some("dark".into()), radius: None }))]
    #[case(
        r#":::box{radius="10px",theme="light",shadow="yes"}"#,
        Some(BoxAttributes { theme: Some("light".into()), radius: Some("10px".into()) })
    )]
    #[case(":::boxes", None)]
    #[case("text :::box", None)]
    fn test_match_box_start(#[case] line: &str, #[case] expected: Option<BoxAttributes>) {
        assert_eq!(match_box_start(line), expected);
    }

    #[test]
    fn test_empty_values_are_not_attributes() {
        assert!(parse_attributes(r#"{theme=""}"#).is_empty());
    }

    #[test]
    fn test_marker_suffix() {
        assert_eq!(BoxAttributes::default().to_marker_suffix(), "");
        let attrs = BoxAttributes {
            theme: Some("dark".into()),
            radius: Some("4px".into()),
        };
        assert_eq!(attrs.to_marker_suffix(), r#"{theme="dark",radius="4px"}"#);
    }

    #[test]
    fn test_box_end() {
        assert!(is_box_end(":::"));
        assert!(!is_box_end(":::box"));
        assert!(!is_box_end("a:::"));
    }
}
