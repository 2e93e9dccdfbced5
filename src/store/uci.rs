//! Parser for OpenWrt UCI configuration text.
//!
//! Two textual forms are understood:
//!
//! - the **file form** found under `/etc/config/`:
//!
//!   ```text
//!   config servers 'cfg034f1d'
//!       option transport 'vless'
//!       list fake_dns_domain_names 'example.com'
//!   ```
//!
//! - the **export form** printed by `uci show <package>`:
//!
//!   ```text
//!   xray_core.cfg034f1d=servers
//!   xray_core.cfg034f1d.transport='vless'
//!   ```
//!
//! Anonymous sections in the file form get the name libuci generates when
//! it loads the package, `cfg<seq><hash>`, so telemetry tags carrying those
//! ids resolve against either form. See [`anonymous_name`].

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result, bail};

// ---------------------------------------------------------------------------
// Parsed model
// ---------------------------------------------------------------------------

/// Value of a single option inside a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Single(String),
    List(Vec<String>),
}

/// One `config` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section type, e.g. `servers` or `general`.
    pub kind: String,
    /// Section name; either explicit or generated as libuci does.
    pub name: String,
    options: BTreeMap<String, OptionValue>,
}

impl Section {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            options: BTreeMap::new(),
        }
    }

    /// Scalar value of `key`. A list answers with its first element.
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.options.get(key)? {
            OptionValue::Single(v) => Some(v.as_str()),
            OptionValue::List(items) => items.first().map(String::as_str),
        }
    }

    /// Every value of `key`. A scalar answers as a one-element list.
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        match self.options.get(key) {
            Some(OptionValue::Single(v)) => vec![v.as_str()],
            Some(OptionValue::List(items)) => items.iter().map(String::as_str).collect(),
            None => Vec::new(),
        }
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options
            .insert(key.into(), OptionValue::Single(value.into()));
    }

    pub fn push_list(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.options.entry(key.into()) {
            std::collections::btree_map::Entry::Occupied(mut slot) => {
                match slot.get_mut() {
                    OptionValue::List(items) => items.push(value),
                    // `list` after `option` of the same name replaces it, as uci does
                    single @ OptionValue::Single(_) => *single = OptionValue::List(vec![value]),
                }
            }
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(OptionValue::List(vec![value]));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Parse UCI text in either form, detected from the first meaningful line.
pub fn parse(text: &str) -> Result<Vec<Section>> {
    let first = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'));

    match first {
        None => Ok(Vec::new()),
        Some(line) if is_file_form_keyword(line) => parse_file_form(text),
        Some(_) => parse_export_form(text),
    }
}

fn is_file_form_keyword(line: &str) -> bool {
    let keyword = line.split_whitespace().next().unwrap_or("");
    matches!(keyword, "config" | "package" | "option" | "list")
}

// ---------------------------------------------------------------------------
// File form
// ---------------------------------------------------------------------------

fn parse_file_form(text: &str) -> Result<Vec<Section>> {
    let mut sections: Vec<Section> = Vec::new();
    // Option names of the last section in first-seen order, for naming it.
    let mut order: Vec<String> = Vec::new();
    let mut open_anonymous = false;
    let mut anonymous_seq = 0;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let words = tokenize(raw).with_context(|| format!("line {line_no}: bad quoting"))?;
        let Some((keyword, args)) = words.split_first() else {
            continue;
        };

        match keyword.as_str() {
            "package" => {}
            "config" => {
                let Some(kind) = args.first() else {
                    bail!("line {line_no}: `config` needs a section type");
                };
                if open_anonymous && let Some(last) = sections.last_mut() {
                    last.name = anonymous_name(anonymous_seq, last, &order);
                }
                order.clear();
                open_anonymous = args.get(1).is_none();
                if open_anonymous {
                    anonymous_seq += 1;
                }
                let name = args.get(1).cloned().unwrap_or_default();
                sections.push(Section::new(kind.clone(), name));
            }
            "option" | "list" => {
                let Some(section) = sections.last_mut() else {
                    bail!("line {line_no}: `{keyword}` outside of a config section");
                };
                let (Some(key), Some(value)) = (args.first(), args.get(1)) else {
                    bail!("line {line_no}: `{keyword}` needs a name and a value");
                };
                if !order.contains(key) {
                    order.push(key.clone());
                }
                if keyword == "option" {
                    section.set_option(key.clone(), value.clone());
                } else {
                    section.push_list(key.clone(), value.clone());
                }
            }
            other => bail!("line {line_no}: unknown keyword `{other}`"),
        }
    }

    if open_anonymous && let Some(last) = sections.last_mut() {
        last.name = anonymous_name(anonymous_seq, last, &order);
    }

    Ok(sections)
}

/// The name libuci gives an anonymous section when loading a package:
/// `cfg%02x%04x` of the 1-based anonymous sequence number and a djb hash
/// over the type, then each option name and, for scalar options, its value,
/// in file order. List values do not take part.
pub fn anonymous_name(seq: usize, section: &Section, order: &[String]) -> String {
    let mut hash = djb_hash(5381, &section.kind);
    for key in order {
        hash = djb_hash(hash, key);
        if let Some(OptionValue::Single(value)) = section.options.get(key) {
            hash = djb_hash(hash, value);
        }
    }
    format!("cfg{seq:02x}{:04x}", hash % (1 << 16))
}

fn djb_hash(seed: u32, text: &str) -> u32 {
    let hash = text.bytes().fold(seed, |h, b| {
        h.wrapping_shl(5).wrapping_add(h).wrapping_add(u32::from(b))
    });
    hash & 0x7FFF_FFFF
}

// ---------------------------------------------------------------------------
// Export form (`uci show`)
// ---------------------------------------------------------------------------

fn parse_export_form(text: &str) -> Result<Vec<Section>> {
    let mut sections: Vec<Section> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((path, value)) = line.split_once('=') else {
            bail!("line {line_no}: expected `path=value`");
        };
        let parts: Vec<&str> = path.split('.').collect();
        let values = tokenize(value).with_context(|| format!("line {line_no}: bad quoting"))?;

        match parts.as_slice() {
            [_package, name] => {
                let Some(kind) = values.first() else {
                    bail!("line {line_no}: section `{name}` has no type");
                };
                by_name.insert(name.to_string(), sections.len());
                sections.push(Section::new(kind.clone(), *name));
            }
            [_package, name, key] => {
                let Some(&pos) = by_name.get(*name) else {
                    bail!("line {line_no}: option for undeclared section `{name}`");
                };
                let section = &mut sections[pos];
                match values.as_slice() {
                    [] => section.set_option(*key, ""),
                    [single] => section.set_option(*key, single.clone()),
                    many => {
                        for item in many {
                            section.push_list(*key, item.clone());
                        }
                    }
                }
            }
            _ => bail!("line {line_no}: malformed path `{path}`"),
        }
    }

    Ok(sections)
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Split a line into shell-like words.
///
/// Single quotes are literal, double quotes honour backslash escapes, and
/// adjacent quoted pieces join into one word (`'it'\''s'` → `it's`). An
/// unquoted `#` starts a comment.
fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '#' if !in_word => break,
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => bail!("unterminated single quote"),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c) => current.push(c),
                            None => bail!("dangling escape"),
                        },
                        Some(c) => current.push(c),
                        None => bail!("unterminated double quote"),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    None => bail!("dangling escape"),
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_handles_quote_styles() {
        assert_eq!(
            tokenize("option alias 'my server'").unwrap(),
            vec!["option", "alias", "my server"]
        );
        assert_eq!(
            tokenize(r#"option alias "a \"b\"""#).unwrap(),
            vec!["option", "alias", "a \"b\""]
        );
        assert_eq!(tokenize(r"'it'\''s'").unwrap(), vec!["it's"]);
    }

    #[test]
    fn tokenize_strips_comments() {
        assert_eq!(
            tokenize("option port 443 # https").unwrap(),
            vec!["option", "port", "443"]
        );
        assert_eq!(tokenize("option tag 'a#b'").unwrap(), vec!["option", "tag", "a#b"]);
    }

    #[test]
    fn tokenize_rejects_unterminated_quote() {
        assert!(tokenize("option alias 'oops").is_err());
    }

    #[test]
    fn parses_file_form() {
        let text = r#"
package xray_core

config general
	option metrics_server_enable '1'
	option socks_port '1090'

config servers 'cfg034f1d'
	option transport 'vless'
	option server '1.2.3.4'
	option server_port '443'

config fakedns
	list fake_dns_domain_names 'a.com'
	list fake_dns_domain_names 'b.com'
"#;
        let sections = parse(text).unwrap();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].kind, "general");
        assert_eq!(sections[0].name, "cfg015098");
        assert_eq!(sections[0].get("socks_port"), Some("1090"));
        assert_eq!(sections[1].name, "cfg034f1d");
        assert_eq!(sections[1].get("server"), Some("1.2.3.4"));
        assert_eq!(sections[2].name, "cfg021fa6");
        assert_eq!(sections[2].get_list("fake_dns_domain_names"), vec!["a.com", "b.com"]);
    }

    #[test]
    fn anonymous_names_follow_libuci() {
        let text = "config servers\nconfig general\nconfig servers\n";
        let sections = parse(text).unwrap();
        assert_eq!(sections[0].name, "cfg014a8f");
        assert_eq!(sections[1].name, "cfg02f223");
        // same content, different sequence number
        assert_eq!(sections[2].name, "cfg034a8f");
    }

    #[test]
    fn anonymous_name_hashes_options_in_file_order() {
        let text = "\
config servers 'named'
config servers
	option transport 'vless'
	option server '198.51.100.7'
	option server_port '443'
";
        let sections = parse(text).unwrap();
        assert_eq!(sections[0].name, "named");
        // named sections do not advance the sequence
        assert_eq!(sections[1].name, "cfg01b130");

        let reordered = "config servers\n\toption server '198.51.100.7'\n\toption transport 'vless'\n\toption server_port '443'\n";
        assert_ne!(parse(reordered).unwrap()[0].name, "cfg01b130");
    }

    #[test]
    fn file_form_reports_line_numbers() {
        let err = parse("config general\n\toption\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));

        let err = parse("option orphan 'x'\n").unwrap_err();
        assert!(err.to_string().contains("outside of a config section"));

        let err = parse("config general\nbogus a b\n").unwrap_err();
        assert!(err.to_string().contains("unknown keyword"));
    }

    #[test]
    fn parses_export_form() {
        let text = "\
xray_core.cfg01a2b3=general
xray_core.cfg01a2b3.metrics_server_port='19999'
xray_core.cfg9f8e7d=fakedns
xray_core.cfg9f8e7d.fake_dns_domain_names='a.com' 'b.com' 'c.com'
xray_core.cfg111111=servers
xray_core.cfg111111.alias='it'\\''s mine'
";
        let sections = parse(text).unwrap();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].get("metrics_server_port"), Some("19999"));
        assert_eq!(sections[1].name, "cfg9f8e7d");
        assert_eq!(sections[1].get_list("fake_dns_domain_names").len(), 3);
        assert_eq!(sections[2].get("alias"), Some("it's mine"));
    }

    #[test]
    fn export_form_rejects_undeclared_section() {
        let err = parse("xray_core.cfgabc.server='1.1.1.1'\n").unwrap_err();
        assert!(err.to_string().contains("undeclared section"));
    }

    #[test]
    fn empty_text_has_no_sections() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("# only a comment\n\n").unwrap().is_empty());
    }

    #[test]
    fn list_after_option_replaces_it() {
        let mut section = Section::new("fakedns", "x");
        section.set_option("fake_dns_domain_names", "old.com");
        section.push_list("fake_dns_domain_names", "new.com");
        assert_eq!(section.get_list("fake_dns_domain_names"), vec!["new.com"]);
    }
}
