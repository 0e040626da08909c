mod common;

use std::collections::HashSet;

use common::*;
use repo2notion_core::config::ContentLimits;
use repo2notion_core::contract::ContentBlock;
use repo2notion_core::error::SyncError;
use repo2notion_core::local::LocalSourceTree;
use repo2notion_core::summarise::OVERSIZED_INPUT_TEXT;
use repo2notion_core::synchronise::{synchronise, SkipReason, SkippedEntry};
use tempfile::tempdir;

fn heading(text: &str) -> ContentBlock {
    ContentBlock::Heading {
        text: text.to_string(),
    }
}

fn code(language: &str, items: &[&str]) -> ContentBlock {
    ContentBlock::Code {
        language: language.to_string(),
        rich_text: items.iter().map(|s| s.to_string()).collect(),
    }
}

#[tokio::test]
async fn test_python_file_is_mirrored_and_text_file_skipped() {
    let dir = tempdir().unwrap();
    let source_code = "x = 1\n".repeat(300);
    assert_eq!(source_code.chars().count(), 1800);
    write_tree(dir.path(), &[("a.py", &source_code), ("b.txt", "notes")]);

    let config = sync_config();
    let pages = repository(&config);
    let report = synchronise(
        &config,
        &LocalSourceTree::new(dir.path()),
        &pages,
        &summariser(),
    )
    .await
    .expect("sync should succeed");

    let root_pages = pages.store().pages_under(ROOT_PAGE);
    assert_eq!(root_pages.len(), 1);
    let (page_id, title) = &root_pages[0];
    assert_eq!(title, "a.py");
    assert_eq!(
        pages.store().blocks_of(page_id),
        vec![
            heading("Summary"),
            code("markdown", &[SUMMARY]),
            heading("Source"),
            code("python", &[&source_code]),
        ]
    );

    assert!(report.is_clean());
    assert_eq!(report.files.len(), 1);
    assert_eq!(
        report.skipped,
        vec![SkippedEntry {
            path: "b.txt".to_string(),
            reason: SkipReason::DisallowedExtension,
        }]
    );
}

#[tokio::test]
async fn test_resync_of_unchanged_tree_converges() {
    let dir = tempdir().unwrap();
    write_tree(
        dir.path(),
        &[
            ("src/app.py", "def main():\n    pass\n"),
            ("src/util/helpers.sh", "echo hi\n"),
            ("README.md", "# readme\n"),
            ("index.js", "console.log(1);\n"),
        ],
    );
    let source = LocalSourceTree::new(dir.path());
    let config = sync_config();
    let pages = repository(&config);
    let summariser = summariser();

    let first = synchronise(&config, &source, &pages, &summariser)
        .await
        .unwrap();
    let snapshot = pages.store().dump(ROOT_PAGE);

    let second = synchronise(&config, &source, &pages, &summariser)
        .await
        .unwrap();

    assert_eq!(pages.store().dump(ROOT_PAGE), snapshot);
    assert_eq!(first.files, second.files, "page ids must be reused");
    assert_eq!(first.directories, second.directories);

    let titles: Vec<String> = snapshot.iter().map(|(path, _)| path.clone()).collect();
    assert_eq!(
        titles,
        vec!["index.js", "src", "src/app.py", "src/util", "src/util/helpers.sh"]
    );
}

#[tokio::test]
async fn test_hidden_and_ineligible_directories_get_no_page() {
    let dir = tempdir().unwrap();
    write_tree(
        dir.path(),
        &[
            (".github/workflows/ci.sh", "cargo test\n"),
            ("docs/guide.md", "# guide\n"),
            ("docs/img/logo.svg", "<svg/>"),
            ("src/main.ts", "export {};\n"),
        ],
    );

    let config = sync_config();
    let pages = repository(&config);
    let report = synchronise(
        &config,
        &LocalSourceTree::new(dir.path()),
        &pages,
        &summariser(),
    )
    .await
    .unwrap();

    let titles: Vec<String> = pages
        .store()
        .dump(ROOT_PAGE)
        .into_iter()
        .map(|(path, _)| path)
        .collect();
    assert_eq!(titles, vec!["src", "src/main.ts"]);
    assert_eq!(
        report.skipped,
        vec![
            SkippedEntry {
                path: ".github".to_string(),
                reason: SkipReason::Hidden,
            },
            SkippedEntry {
                path: "docs".to_string(),
                reason: SkipReason::NoEligibleFiles,
            },
        ]
    );
}

#[tokio::test]
async fn test_hidden_entries_are_mirrored_when_not_skipped() {
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[(".scripts/setup.sh", "make\n")]);

    let config = repo2notion_core::config::SyncConfig {
        skip_hidden: false,
        ..sync_config()
    };
    let pages = repository(&config);
    synchronise(
        &config,
        &LocalSourceTree::new(dir.path()),
        &pages,
        &summariser(),
    )
    .await
    .unwrap();

    let titles: Vec<String> = pages
        .store()
        .dump(ROOT_PAGE)
        .into_iter()
        .map(|(path, _)| path)
        .collect();
    assert_eq!(titles, vec![".scripts", ".scripts/setup.sh"]);
}

#[tokio::test]
async fn test_failing_file_does_not_stop_siblings() {
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[("a.py", "a = 1\n"), ("b.py", "b = 2\n")]);
    let source = FlakySource {
        inner: LocalSourceTree::new(dir.path()),
        unreadable: HashSet::from(["a.py".to_string()]),
    };

    let config = sync_config();
    let pages = repository(&config);
    let report = synchronise(&config, &source, &pages, &summariser())
        .await
        .expect("per-entry failures are not fatal");

    assert!(!report.is_clean());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, "a.py");
    assert!(report.failures[0].error.contains("permission denied"));
    let synced: Vec<&str> = report.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(synced, vec!["b.py"]);
}

#[tokio::test]
async fn test_failing_directory_skips_its_subtree_only() {
    let dir = tempdir().unwrap();
    write_tree(dir.path(), &[("lib/x.py", "x = 1\n"), ("top.py", "y = 2\n")]);

    let config = sync_config();
    let pages = repository(&config);
    pages.store().fail_create("lib");
    let report = synchronise(
        &config,
        &LocalSourceTree::new(dir.path()),
        &pages,
        &summariser(),
    )
    .await
    .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, "lib");
    let titles: Vec<String> = pages
        .store()
        .pages_under(ROOT_PAGE)
        .into_iter()
        .map(|(_, title)| title)
        .collect();
    assert_eq!(titles, vec!["top.py"]);
}

#[tokio::test]
async fn test_unreadable_root_is_fatal() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let config = sync_config();
    let pages = repository(&config);
    let result = synchronise(
        &config,
        &LocalSourceTree::new(missing),
        &pages,
        &summariser(),
    )
    .await;

    assert!(matches!(result, Err(SyncError::RootListing(_))));
    assert!(pages.store().pages_under(ROOT_PAGE).is_empty());
}

#[tokio::test]
async fn test_empty_root_page_id_is_rejected() {
    let dir = tempdir().unwrap();
    let config = repo2notion_core::config::SyncConfig {
        root_page_id: "  ".to_string(),
        ..sync_config()
    };
    let pages = repository(&config);
    let result = synchronise(
        &config,
        &LocalSourceTree::new(dir.path()),
        &pages,
        &summariser(),
    )
    .await;

    assert!(matches!(result, Err(SyncError::Config(_))));
}

#[tokio::test]
async fn test_large_file_respects_every_content_limit() {
    let dir = tempdir().unwrap();
    let line = format!("{}\n", "#".repeat(999));
    let source_code = line.repeat(250);
    write_tree(dir.path(), &[("big.sh", &source_code)]);

    let config = repo2notion_core::config::SyncConfig {
        limits: ContentLimits {
            max_items_per_block: 2,
            ..ContentLimits::default()
        },
        ..sync_config()
    };
    let pages = repository(&config);
    synchronise(
        &config,
        &LocalSourceTree::new(dir.path()),
        &pages,
        &summariser(),
    )
    .await
    .unwrap();

    // 250 one-line segments, two per block: 125 code blocks plus the summary section and a heading.
    assert_eq!(pages.store().append_request_sizes(), vec![50, 50, 28]);

    let (page_id, _) = pages.store().pages_under(ROOT_PAGE).remove(0);
    let blocks = pages.store().blocks_of(&page_id);
    assert_eq!(blocks[1], code("markdown", &[OVERSIZED_INPUT_TEXT]));

    let mut rebuilt = String::new();
    for block in &blocks[3..] {
        match block {
            ContentBlock::Code {
                language,
                rich_text,
            } => {
                assert_eq!(language, "bash");
                assert!(rich_text.len() <= 2);
                for item in rich_text {
                    assert!(item.encode_utf16().count() <= 1990);
                    rebuilt.push_str(item);
                }
            }
            other => panic!("unexpected block in source section: {other:?}"),
        }
    }
    assert_eq!(rebuilt, source_code);
}

#[tokio::test]
async fn test_emoji_heavy_file_stays_within_segment_ceiling() {
    let dir = tempdir().unwrap();
    let source_code = format!("# {}\n", "🚀".repeat(3000));
    write_tree(dir.path(), &[("rocket.py", &source_code)]);

    let config = sync_config();
    let pages = repository(&config);
    synchronise(
        &config,
        &LocalSourceTree::new(dir.path()),
        &pages,
        &summariser(),
    )
    .await
    .unwrap();

    let (page_id, _) = pages.store().pages_under(ROOT_PAGE).remove(0);
    let mut rebuilt = String::new();
    for block in &pages.store().blocks_of(&page_id)[3..] {
        if let ContentBlock::Code { rich_text, .. } = block {
            for item in rich_text {
                assert!(item.encode_utf16().count() <= 1990, "segment too long for the remote");
                rebuilt.push_str(item);
            }
        }
    }
    assert_eq!(rebuilt, source_code);
}

#[tokio::test]
async fn test_directory_with_only_nested_eligible_files_gets_pages() {
    let dir = tempdir().unwrap();
    write_tree(
        dir.path(),
        &[
            ("outer/readme.txt", "not mirrored"),
            ("outer/inner/deep.py", "x = 1\n"),
        ],
    );

    let config = sync_config();
    let pages = repository(&config);
    let report = synchronise(
        &config,
        &LocalSourceTree::new(dir.path()),
        &pages,
        &summariser(),
    )
    .await
    .unwrap();

    let titles: Vec<String> = pages
        .store()
        .dump(ROOT_PAGE)
        .into_iter()
        .map(|(path, _)| path)
        .collect();
    assert_eq!(titles, vec!["outer", "outer/inner", "outer/inner/deep.py"]);
    let directories: Vec<&str> = report.directories.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(directories, vec!["outer", "outer/inner"]);
    assert_eq!(
        report.skipped,
        vec![SkippedEntry {
            path: "outer/readme.txt".to_string(),
            reason: SkipReason::DisallowedExtension,
        }]
    );
}
