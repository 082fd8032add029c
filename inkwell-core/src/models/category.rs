use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Category and tag names: trimmed, non-empty, at most 64 characters.
pub fn validate_label(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    if name.chars().count() > 64 {
        return Err("Name cannot exceed 64 characters".to_string());
    }
    if name.contains('/') {
        return Err("Name cannot contain '/'".to_string());
    }
    Ok(())
}

/// Split a comma separated tag field into unique names, keeping first-seen order.
pub fn parse_tag_list(input: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for raw in input.split([',', '，']) {
        let name = raw.trim();
        if validate_label(name).is_err() {
            continue;
        }
        if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_tag_list() {
        assert_eq!(
            parse_tag_list("rust, web ,, Rust，async"),
            vec!["rust".to_string(), "web".to_string(), "async".to_string()]
        );
        assert!(parse_tag_list(" , ").is_empty());
    }

    #[test]
    fn test_validate_label() {
        assert!(validate_label("Programming").is_ok());
        assert!(validate_label("  ").is_err());
        assert!(validate_label("a/b").is_err());
        assert!(validate_label(&"x".repeat(65)).is_err());
    }
}
