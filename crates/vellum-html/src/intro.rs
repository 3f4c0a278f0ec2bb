//! Intro snippet extraction for catalog listings.

use quick_xml::events::Event;

use crate::{Error, Result, lenient_reader};

const MAX_INTRO_CHARS: usize = 512;

/// Plain text of the first `<p>` with non-whitespace content, collapsed to
/// single spaces and capped at 512 characters. Returns an empty string when
/// no such paragraph exists.
pub fn intro(html: &str) -> Result<String> {
  let mut reader = lenient_reader(html);
  let mut depth = 0usize;
  let mut text = String::new();

  loop {
    match reader.read_event() {
      Ok(Event::Start(ref e)) if e.name().as_ref().eq_ignore_ascii_case(b"p") => {
        depth += 1;
      }
      Ok(Event::End(ref e)) if e.name().as_ref().eq_ignore_ascii_case(b"p") => {
        if depth > 0 {
          depth -= 1;
          if depth == 0 && !text.trim().is_empty() {
            break;
          }
          if depth == 0 {
            text.clear();
          }
        }
      }
      Ok(Event::Text(ref e)) if depth > 0 => {
        // Named HTML entities such as `&nbsp;` are not XML; keep them raw.
        match e.unescape() {
          Ok(chunk) => text.push_str(&chunk),
          Err(_) => text.push_str(&String::from_utf8_lossy(e)),
        }
      }
      Ok(Event::CData(ref e)) if depth > 0 => {
        text.push_str(&String::from_utf8_lossy(e));
      }
      Ok(Event::Eof) => break,
      Err(e) => return Err(Error::Parse(e.to_string())),
      _ => {}
    }
  }

  Ok(
    text
      .split_whitespace()
      .collect::<Vec<_>>()
      .join(" ")
      .chars()
      .take(MAX_INTRO_CHARS)
      .collect(),
  )
}
