//! Selector syntax shared by page drivers
//!
//! Supported forms:
//! - plain CSS (`#login`, `form > button.primary`), optionally prefixed `css=`
//! - `xpath=//button[1]` or a bare expression starting with `//`
//! - `text=Sign in` (substring) / `text="Sign in"` (exact)
//! - `role=button[name="Sign in"]` / `role=textbox`
//! - `id=login`

use crate::errors::ActionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorExpr {
    Css(String),
    XPath(String),
    Text { content: String, exact: bool },
    Role { role: String, name: Option<String> },
    Id(String),
}

impl SelectorExpr {
    pub fn parse(raw: &str) -> Result<Self, ActionError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ActionError::InvalidSelector("empty selector".to_string()));
        }

        if let Some(rest) = trimmed.strip_prefix("css=") {
            return non_empty(rest, "css").map(SelectorExpr::Css);
        }
        if let Some(rest) = trimmed.strip_prefix("xpath=") {
            return non_empty(rest, "xpath").map(SelectorExpr::XPath);
        }
        if trimmed.starts_with("//") || trimmed.starts_with("(//") {
            return Ok(SelectorExpr::XPath(trimmed.to_string()));
        }
        if let Some(rest) = trimmed.strip_prefix("text=") {
            let rest = non_empty(rest, "text")?;
            return Ok(match strip_quotes(&rest) {
                Some(inner) => SelectorExpr::Text {
                    content: inner.to_string(),
                    exact: true,
                },
                None => SelectorExpr::Text {
                    content: rest,
                    exact: false,
                },
            });
        }
        if let Some(rest) = trimmed.strip_prefix("role=") {
            return parse_role(rest);
        }
        if let Some(rest) = trimmed.strip_prefix("id=") {
            return non_empty(rest, "id").map(SelectorExpr::Id);
        }

        Ok(SelectorExpr::Css(trimmed.to_string()))
    }

    /// Strategy label used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            SelectorExpr::Css(_) => "css",
            SelectorExpr::XPath(_) => "xpath",
            SelectorExpr::Text { .. } => "text",
            SelectorExpr::Role { .. } => "role",
            SelectorExpr::Id(_) => "id",
        }
    }
}

fn non_empty(value: &str, kind: &str) -> Result<String, ActionError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ActionError::InvalidSelector(format!(
            "{} selector has no body",
            kind
        )));
    }
    Ok(value.to_string())
}

fn strip_quotes(value: &str) -> Option<&str> {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return Some(&value[1..value.len() - 1]);
        }
    }
    None
}

fn parse_role(rest: &str) -> Result<SelectorExpr, ActionError> {
    let rest = non_empty(rest, "role")?;
    let Some(open) = rest.find('[') else {
        return Ok(SelectorExpr::Role {
            role: rest,
            name: None,
        });
    };

    let role = rest[..open].trim().to_string();
    let attrs = rest[open..].trim();
    if role.is_empty() || !attrs.ends_with(']') {
        return Err(ActionError::InvalidSelector(format!(
            "malformed role selector: {}",
            rest
        )));
    }

    let body = attrs[1..attrs.len() - 1].trim();
    let Some(value) = body.strip_prefix("name") else {
        return Err(ActionError::InvalidSelector(format!(
            "unsupported role attribute: {}",
            body
        )));
    };
    let value = value.trim_start();
    let Some(value) = value.strip_prefix('=') else {
        return Err(ActionError::InvalidSelector(format!(
            "malformed role selector: {}",
            rest
        )));
    };
    let value = value.trim();
    let name = strip_quotes(value).unwrap_or(value).to_string();

    Ok(SelectorExpr::Role {
        role,
        name: Some(name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_selectors_are_css() {
        assert_eq!(
            SelectorExpr::parse(" #new-login ").unwrap(),
            SelectorExpr::Css("#new-login".into())
        );
        assert_eq!(
            SelectorExpr::parse("css=form button").unwrap(),
            SelectorExpr::Css("form button".into())
        );
    }

    #[test]
    fn xpath_forms() {
        assert_eq!(
            SelectorExpr::parse("xpath=//input[@name='q']").unwrap(),
            SelectorExpr::XPath("//input[@name='q']".into())
        );
        assert_eq!(SelectorExpr::parse("//a").unwrap().kind(), "xpath");
    }

    #[test]
    fn text_quotes_mean_exact() {
        assert_eq!(
            SelectorExpr::parse("text=\"Sign in\"").unwrap(),
            SelectorExpr::Text {
                content: "Sign in".into(),
                exact: true
            }
        );
        assert_eq!(
            SelectorExpr::parse("text=Sign").unwrap(),
            SelectorExpr::Text {
                content: "Sign".into(),
                exact: false
            }
        );
    }

    #[test]
    fn role_with_and_without_name() {
        assert_eq!(
            SelectorExpr::parse("role=button[name=\"Log in\"]").unwrap(),
            SelectorExpr::Role {
                role: "button".into(),
                name: Some("Log in".into())
            }
        );
        assert_eq!(
            SelectorExpr::parse("role=textbox").unwrap(),
            SelectorExpr::Role {
                role: "textbox".into(),
                name: None
            }
        );
        assert!(SelectorExpr::parse("role=button[label=x]").is_err());
        assert!(SelectorExpr::parse("role=[name=x]").is_err());
    }

    #[test]
    fn empty_bodies_are_rejected() {
        assert!(SelectorExpr::parse("").is_err());
        assert!(SelectorExpr::parse("text=").is_err());
        assert!(SelectorExpr::parse("id= ").is_err());
    }
}
