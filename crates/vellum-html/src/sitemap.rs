//! `sitemap.xml` and `robots.txt` generation.

use std::io::Cursor;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::{
  Writer,
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use vellum_core::slug;

use crate::{Error, Result};

const NS_SITEMAP: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// One `<url>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
  pub slug:    String,
  pub lastmod: DateTime<Utc>,
}

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn write(w: &mut XmlWriter, event: Event<'_>) -> Result<()> {
  w.write_event(event).map_err(|e| Error::Write(e.to_string()))
}

fn write_text_elem(w: &mut XmlWriter, tag: &str, text: &str) -> Result<()> {
  write(w, Event::Start(BytesStart::new(tag)))?;
  write(w, Event::Text(BytesText::new(text)))?;
  write(w, Event::End(BytesEnd::new(tag)))
}

/// Render a sitemap for `entries` rooted at `site_url`.
pub fn sitemap(site_url: &str, entries: &[SitemapEntry]) -> Result<String> {
  let base = site_url.trim_end_matches('/');
  let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

  write(&mut w, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
  let mut urlset = BytesStart::new("urlset");
  urlset.push_attribute(("xmlns", NS_SITEMAP));
  write(&mut w, Event::Start(urlset))?;

  for entry in entries {
    write(&mut w, Event::Start(BytesStart::new("url")))?;
    write_text_elem(&mut w, "loc", &format!("{base}{}", slug::route_path(&entry.slug)))?;
    write_text_elem(
      &mut w,
      "lastmod",
      &entry.lastmod.to_rfc3339_opts(SecondsFormat::Secs, true),
    )?;
    write(&mut w, Event::End(BytesEnd::new("url")))?;
  }

  write(&mut w, Event::End(BytesEnd::new("urlset")))?;
  String::from_utf8(w.into_inner().into_inner()).map_err(|e| Error::Write(e.to_string()))
}

/// `robots.txt` allowing everything and pointing at the sitemap.
pub fn robots(site_url: &str) -> String {
  format!(
    "User-agent: *\nAllow: /\nSitemap: {}/sitemap.xml\n",
    site_url.trim_end_matches('/')
  )
}
