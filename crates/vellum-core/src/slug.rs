//! Slug rules: derivation from titles, hierarchy by path segment, and the
//! paths a slug maps to in exports and caches.
//!
//! Hierarchy is purely positional: `about/team` is a child of `about` because
//! its first segment equals `about`. Matching always respects segment
//! boundaries, so `category` is never treated as a child of `cat`.

use crate::{PageNumber, page::ROOT_SLUG};

/// Derive a slug from a title: trimmed, lowercased, spaces replaced by
/// underscores, with surrounding separators removed.
pub fn normalize(title: &str) -> String {
  title
    .trim()
    .to_lowercase()
    .split('/')
    .map(|segment| segment.trim().replace(' ', "_"))
    .filter(|segment| !segment.is_empty())
    .collect::<Vec<_>>()
    .join("/")
}

/// The slug with its last segment removed, or `None` for top-level slugs.
pub fn parent(slug: &str) -> Option<&str> {
  slug.rfind('/').map(|idx| &slug[..idx])
}

/// Whether `candidate` lies strictly below `ancestor` in the hierarchy.
pub fn is_descendant(ancestor: &str, candidate: &str) -> bool {
  candidate
    .strip_prefix(ancestor)
    .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
}

/// Half-open lexicographic range `[lower, upper)` containing exactly the
/// descendants of `slug`. `'0'` is the code point after `'/'`, so the range
/// stops at the segment boundary.
pub fn descendant_range(slug: &str) -> (String, String) {
  (format!("{slug}/"), format!("{slug}0"))
}

/// Move `slug` from below `old` to below `new`. Returns `None` when `slug` is
/// not a descendant of `old`.
pub fn rebase(slug: &str, old: &str, new: &str) -> Option<String> {
  if !is_descendant(old, slug) {
    return None;
  }
  Some(format!("{new}{}", &slug[old.len()..]))
}

/// Rewrite the leading segments of a descendant's `title` that correspond to
/// `old_slug` with `new_title`, keeping the remaining segments verbatim.
pub fn rebase_title(title: &str, old_slug: &str, new_title: &str) -> Option<String> {
  if !is_descendant(old_slug, &normalize(title)) {
    return None;
  }
  let depth = old_slug.split('/').count();
  let rest = title.trim().splitn(depth + 1, '/').nth(depth)?;
  Some(format!("{}/{}", new_title.trim(), rest))
}

/// Public URL path for a slug; the home page is served at `/`.
pub fn route_path(slug: &str) -> String {
  if slug == ROOT_SLUG {
    "/".to_owned()
  } else {
    format!("/{slug}")
  }
}

/// Blob path of the static HTML export for a slug.
pub fn export_path(slug: &str) -> String {
  if slug == ROOT_SLUG {
    "index.html".to_owned()
  } else {
    format!("{slug}/index.html")
  }
}

/// URL folder holding a page's uploaded assets.
pub fn asset_folder(page_number: PageNumber) -> String {
  format!("/pub/articles/{page_number}/")
}

/// Title used when restoring a page whose title is taken: `"{title} {n}"`.
pub fn disambiguate(title: &str, n: u32) -> String {
  format!("{} {n}", title.trim())
}
