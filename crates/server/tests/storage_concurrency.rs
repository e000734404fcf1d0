//! Readers running alongside writers must always see a whole document.

mod common;

use std::sync::Arc;

use common::data_dir_with_pages;
use koma_core::annotation::{AnnotationDraft, AnnotationType};
use koma_core::geometry::BoundingBox;
use koma_server::storage::PageStore;

const PAGE: &str = "p1";

fn draft(text: &str) -> AnnotationDraft {
    AnnotationDraft {
        image_id: PAGE.to_string(),
        kind: AnnotationType::Dialogue,
        subtype: None,
        order: None,
        bbox: BoundingBox::new(10.0, 10.0, 60.0, 40.0),
        text: text.to_string(),
        character_id: None,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reads_never_observe_a_partial_write() {
    let dir = data_dir_with_pages(&[PAGE]);
    let store = Arc::new(PageStore::new(dir.path()));
    let created = store.create(&draft("")).await.unwrap();

    let writer = {
        let store = Arc::clone(&store);
        let id = created.id.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                let text = "吹き出し".repeat(i % 40 + 1);
                store.update(PAGE, &id, &draft(&text)).await.unwrap();
            }
        })
    };

    let mut reads = 0usize;
    while !writer.is_finished() {
        let page = store.page(PAGE).await.expect("page read during write");
        assert_eq!(page.annotations.len(), 1);
        let listing = store.list_pages().await.unwrap();
        assert!(listing[0].has_annotation);
        reads += 1;
    }
    writer.await.unwrap();

    assert!(reads > 0);
    let page = store.page(PAGE).await.unwrap();
    assert_eq!(page.annotations[0].text, "吹き出し".repeat(199 % 40 + 1));
}

#[tokio::test]
async fn saving_leaves_no_staging_files() {
    let dir = data_dir_with_pages(&[PAGE]);
    let store = PageStore::new(dir.path());
    store.create(&draft("やあ")).await.unwrap();
    store.update_summary(PAGE, "summary").await.unwrap();

    let names: Vec<String> = std::fs::read_dir(store.annotations_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec![format!("{PAGE}.json")]);
}
