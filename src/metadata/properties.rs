//! Key/value property-file codec.
//!
//! The metadata store keeps one `.properties` file per logical record. The
//! format is Java-properties compatible for the subset the store emits:
//! `key=value` lines, `#`/`!` comments, backslash escapes for `\`, `=`, `:`,
//! whitespace in keys and control characters in values. Output is
//! deterministic (sorted keys), which keeps rewrites diffable.

use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// Load a property file, returning an empty map when the file is absent
/// (read-or-create semantics).
pub async fn load(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(parse(&content))
}

/// Write a property map, creating parent directories as needed.
pub async fn store(path: &Path, properties: &BTreeMap<String, String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut out = String::new();
    for (key, value) in properties {
        out.push_str(&escape_key(key));
        out.push('=');
        out.push_str(&escape_value(value));
        out.push('\n');
    }

    let mut file = fs::File::create(path).await?;
    file.write_all(out.as_bytes()).await?;
    file.sync_all().await?;
    Ok(())
}

/// Parse property-file content into a map.
pub fn parse(content: &str) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }
        if let Some((key, value)) = split_line(trimmed) {
            properties.insert(key, value);
        }
    }
    properties
}

/// Split a line at the first unescaped `=` or `:`, unescaping both halves.
fn split_line(line: &str) -> Option<(String, String)> {
    let mut key = String::new();
    let mut chars = line.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => key.push(unescape_char(escaped)),
                None => return None,
            },
            '=' | ':' => {
                let value = unescape_value(&line[i + 1..]);
                return Some((key, value));
            }
            _ => key.push(c),
        }
    }
    // Key with no separator maps to the empty value
    Some((key, String::new()))
}

fn unescape_char(c: char) -> char {
    match c {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        other => other,
    }
}

fn unescape_value(raw: &str) -> String {
    let mut value = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                value.push(unescape_char(escaped));
            }
        } else {
            value.push(c);
        }
    }
    value
}

fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '=' => out.push_str("\\="),
            ':' => out.push_str("\\:"),
            ' ' => out.push_str("\\ "),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let props = parse("a=1\nb=2\n# comment\n\nc:3\n");
        assert_eq!(props.get("a").unwrap(), "1");
        assert_eq!(props.get("b").unwrap(), "2");
        assert_eq!(props.get("c").unwrap(), "3");
        assert_eq!(props.len(), 3);
    }

    #[test]
    fn test_escaped_keys_round_trip() {
        let mut props = BTreeMap::new();
        props.insert(
            "artifact:size:test-1.0.jar".to_string(),
            "1024".to_string(),
        );
        props.insert("plain".to_string(), "a=b:c".to_string());

        let mut out = String::new();
        for (k, v) in &props {
            out.push_str(&escape_key(k));
            out.push('=');
            out.push_str(&escape_value(v));
            out.push('\n');
        }
        assert_eq!(parse(&out), props);
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let props = load(&dir.path().join("absent.properties")).await.unwrap();
        assert!(props.is_empty());
    }

    #[tokio::test]
    async fn test_store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("test.properties");
        let mut props = BTreeMap::new();
        props.insert("artifact:version:x.jar".to_string(), "1.0".to_string());
        store(&path, &props).await.unwrap();
        assert_eq!(load(&path).await.unwrap(), props);
    }
}
