//! Built-in static page renderer.
//!
//! Understands two route templates: `"page"` (view model with `title` and
//! `content`, optional `published`) and `"redirect"` (view model with
//! `target`, a slug).

use quick_xml::escape::escape;
use serde_json::Value;
use vellum_core::{
  collab::{BoxError, SiteRenderer},
  slug,
};

use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct BasicRenderer {
  /// Name appended to every `<title>`.
  pub site_name: String,
}

fn field<'a>(model: &'a Value, name: &'static str) -> Result<&'a str> {
  model
    .get(name)
    .and_then(Value::as_str)
    .ok_or(Error::MissingField(name))
}

impl BasicRenderer {
  pub fn new(site_name: impl Into<String>) -> Self {
    Self { site_name: site_name.into() }
  }

  pub fn render_page(&self, model: &Value) -> Result<String> {
    let title = field(model, "title")?;
    let content = field(model, "content")?;
    let published = model
      .get("published")
      .and_then(Value::as_str)
      .map(|p| format!("\n<meta name=\"published\" content=\"{}\">", escape(p)))
      .unwrap_or_default();

    let full_title = if self.site_name.is_empty() {
      escape(title).into_owned()
    } else {
      format!("{} | {}", escape(title), escape(&self.site_name))
    };

    Ok(format!(
      "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{full_title}</title>{published}\n</head>\n<body>\n{content}\n</body>\n</html>\n"
    ))
  }

  pub fn render_redirect(&self, model: &Value) -> Result<String> {
    let target = slug::route_path(field(model, "target")?);
    let target = escape(&target);
    Ok(format!(
      "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<meta http-equiv=\"refresh\" content=\"0; url={target}\">\n<link rel=\"canonical\" href=\"{target}\">\n</head>\n<body>\n<a href=\"{target}\">{target}</a>\n</body>\n</html>\n"
    ))
  }
}

impl SiteRenderer for BasicRenderer {
  async fn render(&self, route: &str, model: &Value) -> Result<String, BoxError> {
    let html = match route {
      "page" => self.render_page(model)?,
      "redirect" => self.render_redirect(model)?,
      other => return Err(Error::UnknownRoute(other.to_owned()).into()),
    };
    Ok(html)
  }
}
