//! Editable-region id assignment.
//!
//! An editable region is any element carrying `contenteditable` or an
//! existing [`REGION_ATTR`]. [`normalize`] gives every region a unique id,
//! keeping ids that are already present and unique, and strips editor-only
//! markup: the `contenteditable` and `spellcheck` attributes, any
//! `data-editor-*` attribute, and `<editor-*>` elements with their contents.
//! Everything else is copied through byte for byte, so a second pass finds
//! nothing to change.

use std::{collections::HashSet, io::Cursor};

use quick_xml::{
  Writer,
  events::{BytesStart, Event, attributes::Attribute},
};
use uuid::Uuid;
use vellum_core::collab::{BoxError, Sanitizer};

use crate::{Error, Result, lenient_reader};

/// Attribute holding a region's stable id.
pub const REGION_ATTR: &str = "data-region-id";

const EDITOR_ATTRS: &[&str] = &["contenteditable", "spellcheck"];
const EDITOR_ATTR_PREFIX: &str = "data-editor-";
const EDITOR_ELEMENT_PREFIX: &[u8] = b"editor-";

fn is_editor_attr(key: &str) -> bool {
  EDITOR_ATTRS.contains(&key) || key.starts_with(EDITOR_ATTR_PREFIX)
}

/// Assign region ids and strip editor markup. Idempotent.
pub fn normalize(html: &str) -> Result<String> {
  let mut reader = lenient_reader(html);
  let mut writer = Writer::new(Cursor::new(Vec::new()));
  let mut seen: HashSet<String> = HashSet::new();
  // Name and nesting depth of the editor element being dropped. Only tags
  // with that name count, since void elements inside it never close.
  let mut skipping: Option<(Vec<u8>, usize)> = None;

  loop {
    let event = reader
      .read_event()
      .map_err(|e| Error::Parse(e.to_string()))?;

    if let Some((name, depth)) = skipping.as_mut() {
      match event {
        Event::Start(ref e) if e.name().as_ref() == name.as_slice() => *depth += 1,
        Event::End(ref e) if e.name().as_ref() == name.as_slice() => *depth -= 1,
        Event::Eof => break,
        _ => {}
      }
      if *depth == 0 {
        skipping = None;
      }
      continue;
    }

    let out = match event {
      Event::Eof => break,
      Event::Start(ref e) if e.name().as_ref().starts_with(EDITOR_ELEMENT_PREFIX) => {
        skipping = Some((e.name().as_ref().to_vec(), 1));
        continue;
      }
      Event::Empty(ref e) if e.name().as_ref().starts_with(EDITOR_ELEMENT_PREFIX) => {
        continue;
      }
      Event::Start(e) => Event::Start(annotate(e, &mut seen)?),
      Event::Empty(e) => Event::Empty(annotate(e, &mut seen)?),
      other => other,
    };

    writer
      .write_event(out)
      .map_err(|e| Error::Write(e.to_string()))?;
  }

  String::from_utf8(writer.into_inner().into_inner())
    .map_err(|e| Error::Write(e.to_string()))
}

/// Rebuild `start` if it is a region or carries editor attributes; otherwise
/// return it unchanged.
fn annotate<'a>(start: BytesStart<'a>, seen: &mut HashSet<String>) -> Result<BytesStart<'a>> {
  let mut is_region = false;
  let mut existing_id: Option<String> = None;
  let mut needs_rewrite = false;

  for attr in start.html_attributes() {
    let attr = attr.map_err(|e| Error::Parse(e.to_string()))?;
    let key = std::str::from_utf8(attr.key.as_ref())
      .map_err(|e| Error::Parse(e.to_string()))?;
    if key == REGION_ATTR {
      is_region = true;
      existing_id = Some(String::from_utf8_lossy(&attr.value).into_owned());
    } else if is_editor_attr(key) {
      needs_rewrite = true;
      if key == "contenteditable" {
        is_region = true;
      }
    }
  }

  if !is_region && !needs_rewrite {
    return Ok(start);
  }

  let id = match existing_id {
    Some(id) if !id.is_empty() && !seen.contains(&id) => {
      if !needs_rewrite {
        seen.insert(id);
        return Ok(start);
      }
      id
    }
    _ => fresh_id(seen),
  };

  let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
  let mut rebuilt = BytesStart::new(name);
  for attr in start.html_attributes() {
    let attr: Attribute<'_> = attr.map_err(|e| Error::Parse(e.to_string()))?;
    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
    if key == REGION_ATTR || is_editor_attr(&key) {
      continue;
    }
    rebuilt.push_attribute(attr);
  }
  if is_region {
    rebuilt.push_attribute((REGION_ATTR, id.as_str()));
    seen.insert(id);
  }
  Ok(rebuilt.into_owned())
}

fn fresh_id(seen: &HashSet<String>) -> String {
  loop {
    let id = Uuid::new_v4().simple().to_string();
    if !seen.contains(&id) {
      return id;
    }
  }
}

/// The region ids present in `html`, in document order.
pub fn region_ids(html: &str) -> Result<Vec<String>> {
  let mut reader = lenient_reader(html);
  let mut ids = Vec::new();

  loop {
    match reader.read_event() {
      Ok(Event::Start(ref e) | Event::Empty(ref e)) => {
        for attr in e.html_attributes().flatten() {
          if attr.key.as_ref() == REGION_ATTR.as_bytes() {
            ids.push(String::from_utf8_lossy(&attr.value).into_owned());
          }
        }
      }
      Ok(Event::Eof) => break,
      Err(e) => return Err(Error::Parse(e.to_string())),
      _ => {}
    }
  }

  Ok(ids)
}

/// [`Sanitizer`] backed by [`normalize`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionNormalizer;

impl Sanitizer for RegionNormalizer {
  fn normalize(&self, html: &str) -> Result<String, BoxError> {
    Ok(normalize(html)?)
  }
}

#[cfg(test)]
mod tests {
  use proptest::prelude::*;

  use super::*;

  #[test]
  fn assigns_ids_to_editable_regions() {
    let html = r#"<div contenteditable="true"><p>Hello</p></div><p>plain</p>"#;
    let out = normalize(html).unwrap();
    let ids = region_ids(&out).unwrap();

    assert_eq!(ids.len(), 1);
    assert!(!out.contains("contenteditable"));
    assert!(out.contains("<p>plain</p>"));
  }

  #[test]
  fn keeps_existing_unique_ids() {
    let html = r#"<section data-region-id="intro"><p>Hi</p></section>"#;
    assert_eq!(normalize(html).unwrap(), html);
  }

  #[test]
  fn replaces_duplicate_ids() {
    let html = r#"<div data-region-id="a">1</div><div data-region-id="a">2</div>"#;
    let ids = region_ids(&normalize(html).unwrap()).unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], "a");
    assert_ne!(ids[1], "a");
  }

  #[test]
  fn strips_editor_markup() {
    let html = r#"<p data-editor-toolbar="x" class="lead">Text<editor-cursor><b>|</b></editor-cursor></p><br>"#;
    let out = normalize(html).unwrap();
    assert_eq!(out, r#"<p class="lead">Text</p><br>"#);
  }

  #[test]
  fn void_elements_inside_editor_markup_do_not_swallow_content() {
    let html = r#"<div><editor-cursor><br></editor-cursor><p>Keep me</p></div><p>Tail</p>"#;
    assert_eq!(normalize(html).unwrap(), "<div><p>Keep me</p></div><p>Tail</p>");

    let html = r#"<p>Before<editor-cursor><br></editor-cursor></p><p>Keep me</p>"#;
    assert_eq!(normalize(html).unwrap(), "<p>Before</p><p>Keep me</p>");

    let html = r#"<editor-a><editor-a><img src="x.png"></editor-a>x</editor-a><p>After</p>"#;
    assert_eq!(normalize(html).unwrap(), "<p>After</p>");
  }

  #[test]
  fn rejects_broken_markup() {
    assert!(normalize("<p class=\"unterminated>").is_err());
  }

  /// A fragment piece: its markup, text that must survive normalisation,
  /// and how many closing tags it contributes to the output.
  type Piece = (String, String, usize);

  const CURSOR: &str = r#"<editor-cursor><br><img src="c.png"><b>|</b></editor-cursor>"#;

  fn piece() -> impl Strategy<Value = Piece> {
    let tag = prop::sample::select(vec!["div", "p", "section", "span"]);
    let id = prop::option::of(prop::sample::select(vec!["a", "b", "c", ""]));
    let text = "[a-z ]{0,8}";
    let element = (tag, id, any::<bool>(), any::<bool>(), text, any::<bool>()).prop_map(
      |(tag, id, editable, spell, text, cursor)| {
        let mut attrs = String::new();
        if let Some(id) = id {
          attrs.push_str(&format!(r#" data-region-id="{id}""#));
        }
        if editable {
          attrs.push_str(r#" contenteditable="true""#);
        }
        if spell {
          attrs.push_str(r#" spellcheck="false""#);
        }
        let inner = if cursor { CURSOR } else { "" };
        (format!("<{tag}{attrs}>{inner}{text}</{tag}>"), text, 1)
      },
    );
    let void = prop::sample::select(vec!["<br>", r#"<img src="a.png">"#, "<hr/>"])
      .prop_map(|tag| (tag.to_owned(), String::new(), 0));
    let cursor = Just((CURSOR.to_owned(), String::new(), 0));

    prop_oneof![4 => element, 1 => void, 1 => cursor]
  }

  fn fragment() -> impl Strategy<Value = (String, Vec<String>, usize)> {
    prop::collection::vec(piece(), 0..8).prop_map(|pieces| {
      let html: String = pieces.iter().map(|(html, ..)| html.as_str()).collect();
      let closings: usize = pieces.iter().map(|(.., n)| n).sum();
      let texts: Vec<String> = pieces.into_iter().map(|(_, text, _)| text).collect();
      (html, texts, closings)
    })
  }

  proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn normalize_is_idempotent((html, texts, closings) in fragment()) {
      let once = normalize(&html).unwrap();
      let twice = normalize(&once).unwrap();
      prop_assert_eq!(&once, &twice);

      let ids = region_ids(&once).unwrap();
      let unique: HashSet<_> = ids.iter().collect();
      prop_assert_eq!(unique.len(), ids.len());
      prop_assert!(ids.iter().all(|id| !id.is_empty()));

      prop_assert!(!once.contains("editor-"));
      prop_assert_eq!(once.matches("</").count(), closings);
      for text in &texts {
        prop_assert!(once.contains(text.as_str()), "lost {:?} in {:?}", text, once);
      }
    }
  }
}
