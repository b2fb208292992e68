//! INI-style run configuration files.
//!
//! ```text
//! [data]
//! stations = 8518750   # The Battery
//! days     = 3
//! offline
//! ```
//!
//! Option names are lower-cased, `#` starts an inline comment, and values
//! that read as numbers are returned as numbers.

use anyhow::{Context, Result, bail};
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::strip_quotes;

#[derive(Debug, Clone, PartialEq)]
pub enum IniValue {
    Number(f64),
    Text(String),
}

impl IniValue {
    fn from_raw(raw: &str) -> Self {
        match raw.parse::<f64>() {
            Ok(n) => IniValue::Number(n),
            Err(_) => IniValue::Text(raw.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            IniValue::Number(n) => Some(*n),
            IniValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            IniValue::Text(s) => Some(s),
            IniValue::Number(_) => None,
        }
    }
}

pub type Section = BTreeMap<String, IniValue>;
pub type Ini = BTreeMap<String, Section>;

pub fn load(path: &Path) -> Result<Ini> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(&text).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse(text: &str) -> Result<Ini> {
    let mut ini = Ini::new();
    let mut current: Option<String> = None;

    for (n, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            ini.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }

        let Some(section) = current.as_ref() else {
            bail!("line {}: option outside of any section", n + 1);
        };

        let (key, value) = match line.find(['=', ':']) {
            Some(idx) => (&line[..idx], strip_quotes(&line[idx + 1..])),
            None => (line, ""),
        };
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            bail!("line {}: missing option name", n + 1);
        }

        ini.entry(section.clone())
            .or_default()
            .insert(key, IniValue::from_raw(value));
    }

    Ok(ini)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_and_values() {
        let ini = parse(
            "; run settings\n\
             [Data]\n\
             Stations = 8518750   # The Battery\n\
             days: 3\n\
             datum = MSL\n\
             offline\n\
             \n\
             [paths]\n\
             tmp = \"/tmp/coops\"\n",
        )
        .unwrap();

        let data = &ini["Data"];
        assert_eq!(data["stations"], IniValue::Number(8518750.0));
        assert_eq!(data["days"].as_f64(), Some(3.0));
        assert_eq!(data["datum"].as_text(), Some("MSL"));
        assert_eq!(data["offline"], IniValue::Text(String::new()));
        assert_eq!(ini["paths"]["tmp"].as_text(), Some("/tmp/coops"));
    }

    #[test]
    fn option_before_section_is_rejected() {
        assert!(parse("days = 3\n[data]\n").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("run.ini");
        std::fs::write(&path, "[a]\nb = c\n").unwrap();
        let ini = load(&path).unwrap();
        assert_eq!(ini["a"]["b"].as_text(), Some("c"));
    }
}
