//! Engine tests against an in-memory SQLite store and recording fakes for
//! the collaborators.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
  },
};

use bytes::Bytes;
use chrono::{Duration, Utc};
use serde_json::Value;
use vellum_core::{
  PageNumber,
  catalog::{LivePage, Permission, ReservedSlug},
  collab::{
    BlobStore, BoxError, CachePurger, Directory, Notifier, PurgeOutcome, Services,
  },
  page::{DocumentEdit, ROOT_SLUG, StatusCode},
  schedule::PageState,
  store::PageStore,
};
use vellum_html::{BasicRenderer, RegionNormalizer};
use vellum_store_sqlite::SqliteStore;

use crate::{Engine, EngineConfig};

// ─── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorded {
  purges:     Mutex<Vec<Vec<String>>>,
  fail_purge: AtomicBool,
  blobs:      Mutex<HashMap<String, String>>,
  events:     Mutex<Vec<(String, Value)>>,
}

/// Shared recorder standing in for the purger, blob store, notifier and
/// directory.
#[derive(Clone, Default)]
struct Fake(Arc<Recorded>);

impl Fake {
  fn purged(&self) -> Vec<Vec<String>> { self.0.purges.lock().unwrap().clone() }

  fn purged_paths(&self) -> Vec<String> {
    let mut paths: Vec<String> = self.purged().into_iter().flatten().collect();
    paths.sort();
    paths.dedup();
    paths
  }

  fn blob(&self, path: &str) -> Option<String> {
    self.0.blobs.lock().unwrap().get(path).cloned()
  }

  fn events(&self, name: &str) -> Vec<Value> {
    self
      .0
      .events
      .lock()
      .unwrap()
      .iter()
      .filter(|(event, _)| event == name)
      .map(|(_, payload)| payload.clone())
      .collect()
  }

  fn fail_purges(&self, fail: bool) { self.0.fail_purge.store(fail, Ordering::SeqCst); }

  fn reset(&self) {
    self.0.purges.lock().unwrap().clear();
    self.0.events.lock().unwrap().clear();
  }
}

impl CachePurger for Fake {
  async fn purge(&self, paths: Vec<String>) -> Result<PurgeOutcome, BoxError> {
    if self.0.fail_purge.load(Ordering::SeqCst) {
      return Err("cdn unavailable".into());
    }
    self.0.purges.lock().unwrap().push(paths);
    Ok(PurgeOutcome {
      success:              true,
      message:              "ok".into(),
      estimated_flush_secs: Some(5),
    })
  }
}

impl BlobStore for Fake {
  async fn write(&self, path: String, bytes: Bytes, _content_type: String) -> Result<(), BoxError> {
    let text = String::from_utf8(bytes.to_vec())?;
    self.0.blobs.lock().unwrap().insert(path, text);
    Ok(())
  }

  async fn delete(&self, path: String) -> Result<(), BoxError> {
    self.0.blobs.lock().unwrap().remove(&path);
    Ok(())
  }
}

impl Notifier for Fake {
  fn broadcast(&self, event: &str, payload: Value) {
    self.0.events.lock().unwrap().push((event.to_owned(), payload));
  }
}

impl Directory for Fake {
  async fn display_name(&self, principal_id: &str) -> Result<Option<String>, BoxError> {
    Ok((principal_id == "alice").then(|| "Alice Example".to_owned()))
  }
}

type TestServices = Services<Fake, BasicRenderer, Fake, RegionNormalizer, Fake, Fake>;
type TestEngine = Engine<SqliteStore, TestServices>;

async fn engine_with(config: EngineConfig) -> (TestEngine, Fake) {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  let fake = Fake::default();
  let services = Services {
    purger:    fake.clone(),
    renderer:  BasicRenderer::new("Test Site"),
    blobs:     fake.clone(),
    sanitizer: RegionNormalizer,
    notifier:  fake.clone(),
    directory: fake.clone(),
  };
  (Engine::new(Arc::new(store), Arc::new(services), config), fake)
}

async fn engine() -> (TestEngine, Fake) {
  engine_with(EngineConfig {
    site_url: "https://example.com".into(),
    static_export: true,
    ..EngineConfig::default()
  })
  .await
}

/// An engine that already has its home page.
async fn engine_with_home() -> (TestEngine, Fake) {
  let (engine, fake) = engine().await;
  engine.create_document("Home", "alice", None).await.unwrap();
  fake.reset();
  (engine, fake)
}

async fn publish_now(engine: &TestEngine, title: &str) -> PageNumber {
  let doc = engine.create_document(title, "alice", None).await.unwrap();
  engine.publish(doc.id, None).await.unwrap();
  doc.page_number
}

async fn edit(
  engine: &TestEngine,
  page: PageNumber,
  title: &str,
  content: &str,
) -> vellum_core::page::Document {
  let latest = engine.list_versions(page).await.unwrap().pop().unwrap();
  let mut edit = DocumentEdit::from_document(&latest);
  edit.title = title.into();
  edit.content = content.into();
  engine.save_document(edit, "bob").await.unwrap()
}

async fn live_rows(engine: &TestEngine, page: PageNumber) -> Vec<LivePage> {
  engine.store().live_pages(page).await.unwrap()
}

// ─── Creation ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_page_becomes_live_home_page() {
  let (engine, fake) = engine().await;
  let home = engine.create_document("Home", "alice", None).await.unwrap();

  assert_eq!(home.slug, ROOT_SLUG);
  assert_eq!(home.version_number, 1);
  assert!(home.published.is_some());
  assert_eq!(engine.page_state(home.page_number).await.unwrap(), PageState::Live);

  let live = engine.resolve_live(ROOT_SLUG, Utc::now()).await.unwrap().unwrap();
  assert_eq!(live.id, home.id);
  assert!(fake.blob("index.html").unwrap().contains("<title>Home | Test Site</title>"));
  assert_eq!(fake.purged_paths(), vec!["/".to_owned()]);
}

#[tokio::test]
async fn later_pages_start_as_drafts() {
  let (engine, _fake) = engine_with_home().await;
  let about = engine.create_document("About", "alice", None).await.unwrap();

  assert_eq!(about.slug, "about");
  assert!(about.published.is_none());
  assert_eq!(engine.page_state(about.page_number).await.unwrap(), PageState::Draft);
  assert!(live_rows(&engine, about.page_number).await.is_empty());

  let entry = engine.catalog_entry(about.page_number).await.unwrap().unwrap();
  assert_eq!(entry.slug, "about");
  assert_eq!(entry.published, None);
  assert_eq!(entry.author_name.as_deref(), Some("Alice Example"));
  assert_eq!(entry.intro, "This page is under construction.");
}

#[tokio::test]
async fn template_content_seeds_new_page() {
  let (engine, _fake) = engine_with_home().await;
  let template = engine
    .add_template("Landing", "<section contenteditable=\"true\"><p>Hello</p></section>")
    .await
    .unwrap();
  let doc = engine
    .create_document("Launch", "alice", Some(template.id))
    .await
    .unwrap();

  assert_eq!(doc.template_id, Some(template.id));
  assert!(doc.content.contains("<p>Hello</p>"));
  assert!(!doc.content.contains("contenteditable"));

  let missing = engine
    .create_document("Other", "alice", Some(uuid::Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(missing.is_not_found());
}

// ─── Validation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn conflicting_titles_are_rejected() {
  let (engine, _fake) = engine_with_home().await;
  engine.create_document("About", "alice", None).await.unwrap();

  for title in ["About", "about", "Admin", "api/v2", "pub/logo", "Root"] {
    let err = engine.create_document(title, "alice", None).await.unwrap_err();
    assert!(err.is_slug_conflict(), "{title}: {err}");
    assert!(err.is_user_visible());
  }

  let err = engine.create_document("  / ", "alice", None).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(vellum_core::Error::InvalidTitle(_))
  ));
}

#[tokio::test]
async fn reserved_paths_can_be_managed() {
  let (engine, _fake) = engine_with_home().await;

  engine
    .add_reserved_slug(ReservedSlug {
      path:            "shop".into(),
      cosmos_required: false,
      notes:           None,
    })
    .await
    .unwrap();
  assert!(engine.create_document("Shop", "alice", None).await.unwrap_err().is_slug_conflict());

  assert!(engine.remove_reserved_slug("shop").await.unwrap());
  engine.create_document("Shop", "alice", None).await.unwrap();

  assert!(engine.remove_reserved_slug("admin").await.unwrap_err().is_forbidden());
}

// ─── Publication ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn publishing_purges_and_exports() {
  let (engine, fake) = engine_with_home().await;
  let about = engine.create_document("About", "alice", None).await.unwrap();
  fake.reset();

  let published = engine.publish(about.id, None).await.unwrap();
  assert!(published.published.is_some());
  assert_eq!(fake.purged(), vec![vec!["/about".to_owned()]]);

  let export = fake.blob("about/index.html").unwrap();
  assert!(export.contains("This page is under construction."));
  let sitemap = fake.blob("sitemap.xml").unwrap();
  assert!(sitemap.contains("<loc>https://example.com/about</loc>"));
  assert!(sitemap.contains("<loc>https://example.com/</loc>"));
  let toc: Value = serde_json::from_str(&fake.blob("toc.json").unwrap()).unwrap();
  assert_eq!(toc.as_array().unwrap().len(), 2);
  assert!(fake.blob("robots.txt").unwrap().contains("sitemap.xml"));

  let entry = engine.catalog_entry(about.page_number).await.unwrap().unwrap();
  assert_eq!(entry.published, published.published);
}

#[tokio::test]
async fn asset_folder_is_purged_when_configured() {
  let (engine, fake) = engine_with(EngineConfig {
    purge_asset_folders: true,
    ..EngineConfig::default()
  })
  .await;
  engine.create_document("Home", "alice", None).await.unwrap();
  let page = publish_now(&engine, "About").await;

  assert!(fake.purged_paths().contains(&format!("/pub/articles/{page}/")));
  assert!(fake.blob("about/index.html").is_none());
}

#[tokio::test]
async fn saving_a_published_version_creates_a_new_one() {
  let (engine, _fake) = engine_with_home().await;
  let page = publish_now(&engine, "About").await;
  let v1 = engine.list_versions(page).await.unwrap().remove(0);

  let v2 = edit(&engine, page, "About", "<p>Second</p>").await;
  assert_eq!(v2.version_number, 2);
  assert_ne!(v2.id, v1.id);
  assert!(v2.published.is_none());
  assert_eq!(engine.get_document(v1.id).await.unwrap().content, v1.content);

  let v2 = engine.publish(v2.id, None).await.unwrap();
  let v1 = engine.get_document(v1.id).await.unwrap();
  assert_eq!(v1.expires, v2.published);
  assert_eq!(v2.expires, None);

  let live = engine.resolve_live("about", Utc::now()).await.unwrap().unwrap();
  assert_eq!(live.id, v2.id);
}

#[tokio::test]
async fn drafts_are_edited_in_place() {
  let (engine, fake) = engine_with_home().await;
  let about = engine.create_document("About", "alice", None).await.unwrap();

  let saved = edit(&engine, about.page_number, "About", "<p>Draft two</p>").await;
  assert_eq!(saved.id, about.id);
  assert_eq!(saved.version_number, 1);
  assert_eq!(saved.author_id, "bob");
  assert_eq!(engine.list_versions(about.page_number).await.unwrap().len(), 1);

  let events = fake.events("page_saved");
  assert_eq!(events.len(), 1);
  assert_eq!(events[0]["page_number"], about.page_number);
}

#[tokio::test]
async fn save_with_publish_date_publishes() {
  let (engine, _fake) = engine_with_home().await;
  let about = engine.create_document("About", "alice", None).await.unwrap();

  let mut change = DocumentEdit::from_document(&about);
  change.published = Some(Utc::now());
  let saved = engine.save_document(change, "alice").await.unwrap();

  assert!(saved.published.is_some());
  assert_eq!(engine.page_state(about.page_number).await.unwrap(), PageState::Live);
}

#[tokio::test]
async fn scheduled_publish_keeps_current_version_live() {
  let (engine, _fake) = engine_with_home().await;
  let page = publish_now(&engine, "About").await;
  let v1 = engine.list_versions(page).await.unwrap().remove(0);
  let v2 = edit(&engine, page, "About", "<p>Later</p>").await;

  let at = Utc::now() + Duration::hours(1);
  let v2 = engine.publish(v2.id, Some(at)).await.unwrap();
  let v1 = engine.get_document(v1.id).await.unwrap();

  assert!(v1.published.is_some());
  assert_eq!(v1.expires, Some(at));
  assert_eq!(v2.published, Some(at));

  let now = Utc::now();
  assert_eq!(engine.resolve_live("about", now).await.unwrap().unwrap().id, v1.id);
  assert_eq!(
    engine.resolve_live("about", at + Duration::minutes(1)).await.unwrap().unwrap().id,
    v2.id
  );
  assert_eq!(live_rows(&engine, page).await.len(), 2);
  assert_eq!(engine.page_state(page).await.unwrap(), PageState::Live);
}

#[tokio::test]
async fn future_publish_of_draft_page_is_scheduled() {
  let (engine, fake) = engine_with_home().await;
  let about = engine.create_document("About", "alice", None).await.unwrap();
  let at = Utc::now() + Duration::days(2);

  engine.publish(about.id, Some(at)).await.unwrap();
  assert_eq!(engine.page_state(about.page_number).await.unwrap(), PageState::Scheduled);
  assert!(engine.resolve_live("about", Utc::now()).await.unwrap().is_none());
  assert!(fake.blob("about/index.html").is_none());

  let entry = engine.catalog_entry(about.page_number).await.unwrap().unwrap();
  assert_eq!(entry.published, Some(at));
}

#[tokio::test]
async fn republishing_leaves_one_open_version() {
  let (engine, _fake) = engine_with_home().await;
  let page = publish_now(&engine, "About").await;
  for n in 0..4 {
    let draft = edit(&engine, page, "About", &format!("<p>{n}</p>")).await;
    engine.publish(draft.id, None).await.unwrap();
  }

  let versions = engine.list_versions(page).await.unwrap();
  let open = versions
    .iter()
    .filter(|v| v.published.is_some() && v.expires.is_none())
    .count();
  assert_eq!(open, 1);
  let numbers: Vec<u32> = versions.iter().map(|v| v.version_number).collect();
  assert_eq!(numbers, (1..=5).collect::<Vec<_>>());
}

#[tokio::test]
async fn unpublish_takes_page_offline() {
  let (engine, fake) = engine_with_home().await;
  let page = publish_now(&engine, "About").await;
  fake.reset();

  engine.unpublish(page).await.unwrap();
  assert!(live_rows(&engine, page).await.is_empty());
  assert_eq!(engine.page_state(page).await.unwrap(), PageState::Draft);
  assert!(fake.blob("about/index.html").is_none());
  assert_eq!(fake.purged_paths(), vec!["/about".to_owned()]);
  assert_eq!(engine.catalog_entry(page).await.unwrap().unwrap().published, None);
}

#[tokio::test]
async fn home_page_cannot_be_unpublished_or_trashed() {
  let (engine, _fake) = engine_with_home().await;
  assert!(engine.unpublish(1).await.unwrap_err().is_forbidden());
  assert!(engine.trash(1).await.unwrap_err().is_forbidden());
  assert!(engine.purge_page(1).await.unwrap_err().is_forbidden());
  assert_eq!(engine.page_state(1).await.unwrap(), PageState::Live);
}

#[tokio::test]
async fn unknown_pages_are_not_found() {
  let (engine, _fake) = engine_with_home().await;
  assert!(engine.list_versions(42).await.unwrap_err().is_not_found());
  assert!(engine.trash(42).await.unwrap_err().is_not_found());
  assert!(engine.get_document(uuid::Uuid::new_v4()).await.unwrap_err().is_not_found());
}

// ─── Versions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn new_version_copies_content_into_a_draft() {
  let (engine, _fake) = engine_with_home().await;
  let page = publish_now(&engine, "About").await;
  let v1 = engine.list_versions(page).await.unwrap().remove(0);
  edit(&engine, page, "About", "<p>Second</p>").await;

  let v3 = engine.new_version(v1.id, "carol").await.unwrap();
  assert_eq!(v3.version_number, 3);
  assert_eq!(v3.content, v1.content);
  assert!(v3.published.is_none());
  assert_eq!(v3.author_id, "carol");
}

#[tokio::test]
async fn concurrent_versions_stay_gapless() {
  let (engine, _fake) = engine_with_home().await;
  let about = engine.create_document("About", "alice", None).await.unwrap();
  let id = about.id;

  let handles: Vec<_> = (0..10)
    .map(|_| {
      let engine = engine.clone();
      tokio::spawn(async move { engine.new_version(id, "alice").await.unwrap() })
    })
    .collect();
  for handle in handles {
    handle.await.unwrap();
  }

  let numbers: Vec<u32> = engine
    .list_versions(about.page_number)
    .await
    .unwrap()
    .iter()
    .map(|v| v.version_number)
    .collect();
  assert_eq!(numbers, (1..=11).collect::<Vec<_>>());
}

#[tokio::test]
async fn saving_broadcasts_region_ids() {
  let (engine, fake) = engine_with_home().await;
  let about = engine.create_document("About", "alice", None).await.unwrap();
  edit(
    &engine,
    about.page_number,
    "About",
    "<div data-region-id=\"intro\"><p>Hi</p></div><div contenteditable=\"true\">x</div>",
  )
  .await;

  let events = fake.events("page_saved");
  let regions = events[0]["regions"].as_array().unwrap();
  assert_eq!(regions.len(), 2);
  assert_eq!(regions[0], "intro");
}

// ─── Rename ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn renaming_published_page_leaves_redirect() {
  let (engine, fake) = engine_with_home().await;
  let page = publish_now(&engine, "About").await;
  fake.reset();

  let saved = edit(&engine, page, "About Us", "<p>Us</p>").await;
  assert_eq!(saved.slug, "about_us");

  let redirects = engine.store().redirects_involving("about").await.unwrap();
  assert_eq!(redirects.len(), 1);
  assert_eq!(redirects[0].content, "about_us");
  assert_eq!(redirects[0].status, StatusCode::Redirect);

  let now = Utc::now();
  let old = engine.resolve_live("about", now).await.unwrap().unwrap();
  assert!(old.is_redirect());
  assert_eq!(old.content, "about_us");
  let new = engine.resolve_live("about_us", now).await.unwrap().unwrap();
  assert_eq!(new.page_number, page);

  let purged = fake.purged_paths();
  assert!(purged.contains(&"/about".to_owned()));
  assert!(purged.contains(&"/about_us".to_owned()));
  assert!(fake.blob("about/index.html").unwrap().contains("url=/about_us"));
}

#[tokio::test]
async fn renaming_a_draft_leaves_no_redirect() {
  let (engine, _fake) = engine_with_home().await;
  let about = engine.create_document("About", "alice", None).await.unwrap();
  edit(&engine, about.page_number, "Company", "<p>x</p>").await;

  assert!(engine.store().redirects_involving("about").await.unwrap().is_empty());
  let entry = engine.catalog_entry(about.page_number).await.unwrap().unwrap();
  assert_eq!(entry.slug, "company");
}

#[tokio::test]
async fn rename_cascades_to_descendants() {
  let (engine, _fake) = engine_with_home().await;
  let parent = engine.create_document("A", "alice", None).await.unwrap();
  let child = engine.create_document("A/Child", "alice", None).await.unwrap();
  let lookalike = engine.create_document("AB", "alice", None).await.unwrap();
  assert_eq!(child.slug, "a/child");

  edit(&engine, parent.page_number, "B", "<p>b</p>").await;

  let child = engine.get_document(child.id).await.unwrap();
  assert_eq!(child.slug, "b/child");
  assert_eq!(child.title, "B/Child");
  assert_eq!(engine.get_document(lookalike.id).await.unwrap().slug, "ab");
  assert_eq!(
    engine.catalog_entry(child.page_number).await.unwrap().unwrap().slug,
    "b/child"
  );
}

#[tokio::test]
async fn renaming_home_page_keeps_root_slug() {
  let (engine, _fake) = engine_with_home().await;
  let saved = edit(&engine, 1, "Welcome", "<p>Hi</p>").await;

  assert_eq!(saved.slug, ROOT_SLUG);
  assert_eq!(saved.title, "Welcome");
  assert!(engine.store().redirects_involving(ROOT_SLUG).await.unwrap().is_empty());
}

#[tokio::test]
async fn home_page_rename_only_checks_the_title() {
  let (engine, _fake) = engine_with_home().await;
  engine.create_document("About Us", "alice", None).await.unwrap();

  let saved = edit(&engine, 1, "About_Us", "<p>Hi</p>").await;
  assert_eq!(saved.slug, ROOT_SLUG);
  let saved = edit(&engine, 1, "Root", "<p>Hi</p>").await;
  assert_eq!(saved.title, "Root");
  assert_eq!(saved.slug, ROOT_SLUG);

  let latest = engine.list_versions(1).await.unwrap().pop().unwrap();
  let mut taken = DocumentEdit::from_document(&latest);
  taken.title = "about us".into();
  let err = engine.save_document(taken, "bob").await.unwrap_err();
  assert!(err.is_slug_conflict(), "{err}");
}

#[tokio::test]
async fn rename_onto_an_occupied_child_slug_is_rejected() {
  let (engine, _fake) = engine_with_home().await;
  let a = publish_now(&engine, "A").await;
  let a_child = engine.create_document("A/Child", "alice", None).await.unwrap();
  let b_child = engine.create_document("B/Child", "alice", None).await.unwrap();

  let latest = engine.list_versions(a).await.unwrap().pop().unwrap();
  let mut rename = DocumentEdit::from_document(&latest);
  rename.title = "B".into();
  let err = engine.save_document(rename, "bob").await.unwrap_err();
  assert!(err.is_slug_conflict(), "{err}");

  // Nothing moved and no version was written.
  assert_eq!(engine.list_versions(a).await.unwrap().len(), 1);
  assert_eq!(engine.list_versions(a).await.unwrap()[0].slug, "a");
  assert_eq!(engine.get_document(a_child.id).await.unwrap().slug, "a/child");
  assert_eq!(engine.get_document(b_child.id).await.unwrap().slug, "b/child");
  assert!(engine.store().redirects_involving("a").await.unwrap().is_empty());
}

#[tokio::test]
async fn renaming_back_replaces_stale_redirect() {
  let (engine, _fake) = engine_with_home().await;
  let page = publish_now(&engine, "About").await;
  edit(&engine, page, "About Us", "<p>1</p>").await;
  edit(&engine, page, "About", "<p>2</p>").await;

  let now = Utc::now();
  let live = engine.resolve_live("about", now).await.unwrap().unwrap();
  assert!(!live.is_redirect());
  assert_eq!(live.page_number, page);

  // about -> about_us was dropped; about_us -> about remains.
  let redirects = engine.store().redirects_involving("about_us").await.unwrap();
  assert_eq!(redirects.len(), 1);
  assert_eq!(redirects[0].slug, "about_us");
  assert_eq!(redirects[0].content, "about");
}

// ─── Trash ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn trashing_removes_live_view() {
  let (engine, fake) = engine_with_home().await;
  let page = publish_now(&engine, "About").await;

  engine.trash(page).await.unwrap();
  assert!(live_rows(&engine, page).await.is_empty());
  assert!(engine.catalog_entry(page).await.unwrap().is_none());
  assert!(fake.blob("about/index.html").is_none());
  assert!(
    engine
      .list_versions(page)
      .await
      .unwrap()
      .iter()
      .all(|v| v.status == StatusCode::Deleted)
  );

  // The slug is free again.
  engine.create_document("About", "alice", None).await.unwrap();
}

#[tokio::test]
async fn restore_disambiguates_taken_title() {
  let (engine, _fake) = engine_with_home().await;
  let page = publish_now(&engine, "Blog").await;
  engine.trash(page).await.unwrap();
  engine.create_document("Blog", "alice", None).await.unwrap();

  let restored = engine.restore(page, "bob").await.unwrap();
  assert_eq!(restored.title, "Blog 2");
  assert_eq!(restored.slug, "blog_2");
  assert_eq!(restored.status, StatusCode::Active);
  assert_eq!(restored.author_id, "bob");
  assert_eq!(engine.page_state(page).await.unwrap(), PageState::Draft);
  assert!(engine.catalog_entry(page).await.unwrap().is_some());
}

#[tokio::test]
async fn restore_keeps_free_title() {
  let (engine, _fake) = engine_with_home().await;
  let page = publish_now(&engine, "Blog").await;
  engine.trash(page).await.unwrap();

  let restored = engine.restore(page, "bob").await.unwrap();
  assert_eq!(restored.slug, "blog");
  assert!(restored.published.is_none());
  assert!(engine.restore(page, "bob").await.unwrap_err().is_forbidden());
}

#[tokio::test]
async fn purge_requires_trash() {
  let (engine, _fake) = engine_with_home().await;
  let page = publish_now(&engine, "About").await;

  assert!(engine.purge_page(page).await.unwrap_err().is_forbidden());
  engine.trash(page).await.unwrap();
  engine.purge_page(page).await.unwrap();
  assert!(engine.list_versions(page).await.unwrap_err().is_not_found());
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn permissions_survive_catalog_refresh() {
  let (engine, _fake) = engine_with_home().await;
  let about = engine.create_document("About", "alice", None).await.unwrap();
  let perms = vec![Permission {
    principal_id: "editors".into(),
    is_role:      true,
    permission:   "edit".into(),
  }];

  engine.set_permissions(about.page_number, perms.clone()).await.unwrap();
  edit(&engine, about.page_number, "About", "<p>New intro</p>").await;

  let entry = engine.catalog_entry(about.page_number).await.unwrap().unwrap();
  assert_eq!(entry.permissions, perms);
  assert_eq!(entry.intro, "New intro");
}

// ─── Sweep ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sweep_recreates_missing_catalog_entry() {
  let (engine, _fake) = engine_with_home().await;
  let page = publish_now(&engine, "About").await;
  engine.store().delete_catalog_entry(page).await.unwrap();

  let report = engine.check_catalog_entries().await.unwrap();
  assert_eq!(report.catalog_created, 1);
  assert_eq!(report.failures, 0);
  assert!(engine.catalog_entry(page).await.unwrap().is_some());

  let again = engine.check_catalog_entries().await.unwrap();
  assert!(again.is_clean(), "{again:?}");
}

#[tokio::test]
async fn sweep_restores_missing_live_rows_and_drops_orphans() {
  let (engine, _fake) = engine_with_home().await;
  let page = publish_now(&engine, "About").await;
  engine.store().delete_live_pages(page, true).await.unwrap();

  let mut orphan = live_rows(&engine, 1).await.remove(0);
  orphan.id = uuid::Uuid::new_v4();
  orphan.page_number = 99;
  orphan.slug = "ghost".into();
  engine.store().insert_live_page(orphan).await.unwrap();

  let report = engine.check_catalog_entries().await.unwrap();
  assert_eq!(report.live_repaired, 1);
  assert_eq!(report.live_removed, 1);
  assert_eq!(live_rows(&engine, page).await.len(), 1);
  assert!(engine.resolve_live("ghost", Utc::now()).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_purge_is_retried_by_sweep() {
  let (engine, fake) = engine_with_home().await;
  fake.fail_purges(true);
  let page = publish_now(&engine, "About").await;
  assert!(fake.purged().is_empty());
  assert_eq!(engine.page_state(page).await.unwrap(), PageState::Live);

  fake.fail_purges(false);
  let report = engine.check_catalog_entries().await.unwrap();
  assert_eq!(report.purges_retried, 1);
  assert_eq!(fake.purged(), vec![vec!["/about".to_owned()]]);

  let again = engine.check_catalog_entries().await.unwrap();
  assert_eq!(again.purges_retried, 0);
}
