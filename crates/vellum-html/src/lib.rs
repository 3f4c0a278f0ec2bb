//! HTML toolkit for Vellum: region-id normalisation, intro extraction,
//! static page rendering and sitemap generation.
//!
//! Pure and synchronous apart from the [`SiteRenderer`] impl; no database
//! dependencies. Markup is processed as an event stream with `quick-xml`
//! configured leniently (end tag names are not checked) so that editor HTML
//! with void elements such as `<br>` passes through untouched.
//!
//! [`SiteRenderer`]: vellum_core::collab::SiteRenderer

pub mod error;
mod intro;
mod regions;
mod render;
mod sitemap;

pub use error::{Error, Result};
pub use intro::intro;
pub use regions::{REGION_ATTR, RegionNormalizer, normalize, region_ids};
pub use render::BasicRenderer;
pub use sitemap::{SitemapEntry, robots, sitemap};

fn lenient_reader(html: &str) -> quick_xml::Reader<&[u8]> {
  let mut reader = quick_xml::Reader::from_str(html);
  let config = reader.config_mut();
  config.check_end_names = false;
  config.allow_unmatched_ends = true;
  reader
}
