use contenthub_core::{
    ContentKind, DirAssetStore, FeedService, FileNoteLog, NoteLog, DEFAULT_ASSET_URL_PREFIX,
};
use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};

fn write_asset_with_mtime(dir: &Path, name: &str, modified: SystemTime) {
    let path = dir.join(name);
    std::fs::write(&path, b"bytes").unwrap();
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(modified)
        .unwrap();
}

fn service(root: &Path) -> FeedService<FileNoteLog, DirAssetStore> {
    FeedService::new(
        FileNoteLog::new(root.join("data.txt")),
        DirAssetStore::new(root.join("assets")),
        DEFAULT_ASSET_URL_PREFIX,
    )
}

fn contents<'a>(items: impl Iterator<Item = &'a contenthub_core::FeedItem>) -> Vec<&'a str> {
    items.map(|item| item.content.as_str()).collect()
}

#[test]
fn fresh_deployment_renders_empty_feed() {
    let dir = tempfile::tempdir().unwrap();
    let feed = service(dir.path()).build_feed().unwrap();
    assert!(feed.is_empty());
}

#[test]
fn notes_are_listed_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let log = FileNoteLog::new(dir.path().join("data.txt"));
    log.append("Old Text").unwrap();
    log.append("New Text").unwrap();

    let feed = service(dir.path()).build_feed().unwrap();
    assert_eq!(contents(feed.texts()), vec!["New Text", "Old Text"]);
    assert!(feed.texts().all(|item| item.mime_type.is_none()));
}

#[test]
fn reverse_order_holds_for_many_notes() {
    let dir = tempfile::tempdir().unwrap();
    let log = FileNoteLog::new(dir.path().join("data.txt"));
    for idx in 0..25 {
        log.append(&format!("note {idx}")).unwrap();
    }

    let feed = service(dir.path()).build_feed().unwrap();
    let expected = (0..25)
        .rev()
        .map(|idx| format!("note {idx}"))
        .collect::<Vec<_>>();
    let actual = feed
        .texts()
        .map(|item| item.content.clone())
        .collect::<Vec<_>>();
    assert_eq!(actual, expected);
}

#[test]
fn media_are_listed_by_modification_time_descending() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    std::fs::create_dir(&assets).unwrap();

    let now = SystemTime::now();
    write_asset_with_mtime(&assets, "new.jpg", now);
    write_asset_with_mtime(&assets, "old.png", now - Duration::from_secs(3600));

    let feed = service(dir.path()).build_feed().unwrap();
    assert_eq!(contents(feed.media()), vec!["new.jpg", "old.png"]);

    let new_item = &feed.items()[0];
    assert_eq!(new_item.kind, ContentKind::Image);
    assert_eq!(new_item.mime_type.as_deref(), Some("image/jpeg"));
    assert_eq!(feed.items()[1].mime_type.as_deref(), Some("image/png"));
}

#[test]
fn texts_precede_media_regardless_of_recency() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    std::fs::create_dir(&assets).unwrap();
    write_asset_with_mtime(&assets, "clip.mp4", SystemTime::now() + Duration::from_secs(60));
    FileNoteLog::new(dir.path().join("data.txt"))
        .append("older than the clip")
        .unwrap();

    let feed = service(dir.path()).build_feed().unwrap();
    let kinds = feed.items().iter().map(|item| item.kind).collect::<Vec<_>>();
    assert_eq!(kinds, vec![ContentKind::Text, ContentKind::Video]);
}

#[test]
fn unclassifiable_files_are_left_out_of_the_feed() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    std::fs::create_dir(&assets).unwrap();
    std::fs::write(assets.join("notes.txt"), b"stray").unwrap();
    std::fs::write(assets.join("cat.png"), b"png").unwrap();

    let feed = service(dir.path()).build_feed().unwrap();
    assert_eq!(contents(feed.media()), vec!["cat.png"]);
}

#[test]
fn note_matching_asset_name_links_to_asset() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    std::fs::create_dir(&assets).unwrap();
    std::fs::write(assets.join("new.jpg"), b"jpg").unwrap();

    let log = FileNoteLog::new(dir.path().join("data.txt"));
    log.append("new.jpg").unwrap();
    log.append("unrelated note").unwrap();

    let feed = service(dir.path()).build_feed().unwrap();
    let texts = feed.texts().collect::<Vec<_>>();
    assert_eq!(texts[0].content, "unrelated note");
    assert!(texts[0].link_target.is_none());
    assert_eq!(texts[1].content, "new.jpg");
    assert_eq!(
        texts[1].link_target.as_deref(),
        Some("/hub/assets/new.jpg")
    );
}

#[test]
fn link_matching_is_exact_string() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    std::fs::create_dir(&assets).unwrap();
    std::fs::write(assets.join("new.jpg"), b"jpg").unwrap();

    let log = FileNoteLog::new(dir.path().join("data.txt"));
    log.append("NEW.JPG").unwrap();
    log.append("new.jpeg").unwrap();
    log.append("new").unwrap();

    let feed = service(dir.path()).build_feed().unwrap();
    assert!(feed.texts().all(|item| item.link_target.is_none()));
}

#[test]
fn padded_note_is_shown_verbatim_and_does_not_link() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    std::fs::create_dir(&assets).unwrap();
    std::fs::write(assets.join("new.jpg"), b"jpg").unwrap();

    let log = FileNoteLog::new(dir.path().join("data.txt"));
    log.append(" new.jpg").unwrap();

    let feed = service(dir.path()).build_feed().unwrap();
    assert_eq!(contents(feed.texts()), vec![" new.jpg"]);
    assert!(feed.texts().all(|item| item.link_target.is_none()));
}

#[test]
fn repeated_reads_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    std::fs::create_dir(&assets).unwrap();
    let same_time = SystemTime::now();
    write_asset_with_mtime(&assets, "b.png", same_time);
    write_asset_with_mtime(&assets, "a.png", same_time);
    FileNoteLog::new(dir.path().join("data.txt"))
        .append("a.png")
        .unwrap();

    let service = service(dir.path());
    let first = service.build_feed().unwrap();
    let second = service.build_feed().unwrap();
    assert_eq!(first, second);
    assert_eq!(contents(first.media()), vec!["a.png", "b.png"]);
}

#[test]
fn feed_serializes_as_flat_item_array() {
    let dir = tempfile::tempdir().unwrap();
    let assets = dir.path().join("assets");
    std::fs::create_dir(&assets).unwrap();
    std::fs::write(assets.join("clip.mov"), b"mov").unwrap();
    FileNoteLog::new(dir.path().join("data.txt"))
        .append("hello")
        .unwrap();

    let feed = service(dir.path()).build_feed().unwrap();
    let json = serde_json::to_value(&feed).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            { "kind": "text", "content": "hello" },
            { "kind": "video", "content": "clip.mov", "mime_type": "video/quicktime" }
        ])
    );
}
