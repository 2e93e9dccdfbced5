//! Display fragments produced by the describers.
//!
//! A [`Description`] is an ordered list of fragments. Adjacent fragments are
//! separated by a single space when rendered; the separator is not stored.

use std::fmt;

use serde::Serialize;

/// Shown in place of an elided badge value.
pub const ELLIPSIS: &str = "…";

/// Badge payload: either a resolved value or an elision marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum BadgeValue {
    Shown(String),
    Elided,
}

/// A short labelled summary with an optional longer tooltip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub name: Option<String>,
    pub value: BadgeValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

impl Badge {
    /// `{ name: value }`
    pub fn named(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: BadgeValue::Shown(value.into()),
            tooltip: None,
        }
    }

    /// `{ name … }`
    pub fn elided(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: BadgeValue::Elided,
            tooltip: None,
        }
    }

    /// `{ value }`
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            name: None,
            value: BadgeValue::Shown(value.into()),
            tooltip: None,
        }
    }

    /// `{ … }`
    pub fn opaque() -> Self {
        Self {
            name: None,
            value: BadgeValue::Elided,
            tooltip: None,
        }
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    pub fn is_elided(&self) -> bool {
        self.value == BadgeValue::Elided
    }

    /// The label without braces, e.g. `listen: 0.0.0.0:1080` or `tcp …`.
    pub fn label(&self) -> String {
        match (&self.name, &self.value) {
            (Some(name), BadgeValue::Shown(value)) => format!("{name}: {value}"),
            (Some(name), BadgeValue::Elided) => format!("{name} {ELLIPSIS}"),
            (None, BadgeValue::Shown(value)) => value.clone(),
            (None, BadgeValue::Elided) => ELLIPSIS.to_string(),
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {} }}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fragment {
    Text { text: String },
    Badge(Badge),
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_badge(&self) -> Option<&Badge> {
        match self {
            Self::Badge(badge) => Some(badge),
            Self::Text { .. } => None,
        }
    }
}

impl From<Badge> for Fragment {
    fn from(badge: Badge) -> Self {
        Self::Badge(badge)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { text } => f.write_str(text),
            Self::Badge(badge) => badge.fmt(f),
        }
    }
}

/// Ordered fragments describing one identifier or table cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Description(Vec<Fragment>);

impl Description {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self(vec![Fragment::text(text)])
    }

    pub fn push(&mut self, fragment: impl Into<Fragment>) {
        self.0.push(fragment.into());
    }

    pub fn with(mut self, fragment: impl Into<Fragment>) -> Self {
        self.push(fragment);
        self
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.0
    }

    pub fn badges(&self) -> impl Iterator<Item = &Badge> {
        self.0.iter().filter_map(Fragment::as_badge)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Render as HTML: text is escaped, badges become tooltip spans.
    pub fn to_html(&self) -> String {
        self.0
            .iter()
            .map(fragment_html)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<Vec<Fragment>> for Description {
    fn from(fragments: Vec<Fragment>) -> Self {
        Self(fragments)
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, fragment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            fragment.fmt(f)?;
        }
        Ok(())
    }
}

fn fragment_html(fragment: &Fragment) -> String {
    match fragment {
        Fragment::Text { text } => escape_html(text),
        Fragment::Badge(badge) => {
            let body = match (&badge.name, &badge.value) {
                (Some(name), BadgeValue::Shown(value)) => {
                    format!("{}: <strong>{}</strong>", escape_html(name), escape_html(value))
                }
                (Some(name), BadgeValue::Elided) => {
                    format!("{} <strong>{ELLIPSIS}</strong>", escape_html(name))
                }
                (None, BadgeValue::Shown(value)) => format!("<strong>{}</strong>", escape_html(value)),
                (None, BadgeValue::Elided) => format!("<strong>{ELLIPSIS}</strong>"),
            };
            match &badge.tooltip {
                Some(tip) => format!(
                    "<span class=\"badge\" data-tooltip=\"{}\">{{ {body} }}</span>",
                    escape_html(tip)
                ),
                None => format!("<span class=\"badge\">{{ {body} }}</span>"),
            }
        }
    }
}

/// Minimal HTML escaping for text and attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badge_labels() {
        assert_eq!(Badge::named("listen", "0.0.0.0:1080").label(), "listen: 0.0.0.0:1080");
        assert_eq!(Badge::elided("tcp").label(), "tcp …");
        assert_eq!(Badge::value("direct").to_string(), "{ direct }");
        assert_eq!(Badge::opaque().to_string(), "{ … }");
    }

    #[test]
    fn description_joins_with_spaces() {
        let desc = Description::text("socks_inbound").with(Badge::named("listen", "x"));
        assert_eq!(desc.to_string(), "socks_inbound { listen: x }");
    }

    #[test]
    fn html_escapes_text_and_tooltips() {
        let desc = Description::text("a<b")
            .with(Badge::value("v&w").with_tooltip("3 domains\n\"q\""));
        let html = desc.to_html();
        assert!(html.starts_with("a&lt;b "));
        assert!(html.contains("<strong>v&amp;w</strong>"));
        assert!(html.contains("data-tooltip=\"3 domains\n&quot;q&quot;\""));
    }

    #[test]
    fn serializes_fragments() {
        let desc = Description::text("t").with(Badge::elided("fake_dns").with_tooltip("x"));
        let json = serde_json::to_string(&desc).unwrap();
        assert_eq!(
            json,
            r#"[{"type":"text","text":"t"},{"type":"badge","name":"fake_dns","value":{"kind":"elided"},"tooltip":"x"}]"#
        );
    }
}
