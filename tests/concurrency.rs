//! Concurrency tests: several handles writing one repository.
//!
//! Each thread opens its own `Wiki`, as separate processes would, and the
//! handles coordinate only through page locks and ref compare-and-swap.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use wikifork::core::config::{ConfigFile, WikiConfig};
use wikifork::core::page::Metadata;
use wikifork::core::types::{Identity, PageName};
use wikifork::wiki::{ForkManager, History, Requester, Wiki, WikiError};

fn editor(n: usize) -> Requester {
    Requester::editor(Identity::new(format!("editor{n}@example.org")).unwrap())
}

fn open(path: &Path, config: &WikiConfig) -> Wiki {
    Wiki::open_with_config(path, config.clone()).expect("failed to open wiki")
}

#[test]
fn concurrent_writers_to_one_page_all_land() {
    const THREADS: usize = 4;
    const WRITES: usize = 3;

    let dir = TempDir::new().unwrap();
    let config = Wiki::init(dir.path(), None).unwrap().config().clone();
    let home = PageName::new("Home").unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|n| {
            let path = dir.path().to_path_buf();
            let config = config.clone();
            let home = home.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let wiki = open(&path, &config);
                let forks = ForkManager::new(&wiki);
                barrier.wait();
                for i in 0..WRITES {
                    forks
                        .submit(
                            &home,
                            &editor(n),
                            &format!("writer {n} edit {i}\n"),
                            &Metadata::new(),
                            None,
                        )
                        .expect("write failed");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer panicked");
    }

    let wiki = open(dir.path(), &config);
    let history = History::canonical(&wiki);
    let entries = wiki.index(wiki.canonical()).entries(&home).unwrap();
    assert_eq!(entries.len(), THREADS * WRITES);
    let unique: HashSet<_> = entries.iter().collect();
    assert_eq!(unique.len(), entries.len());

    let mut log = wiki
        .revisions()
        .log(wiki.canonical(), &home, None, 0)
        .unwrap();
    log.reverse();
    assert_eq!(entries, log);
    assert_eq!(history.length(&home).unwrap(), THREADS * WRITES);
}

#[test]
fn concurrent_writers_to_different_pages_keep_each_other() {
    const THREADS: usize = 4;

    let dir = TempDir::new().unwrap();
    let config = Wiki::init(dir.path(), None).unwrap().config().clone();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|n| {
            let path = dir.path().to_path_buf();
            let config = config.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let wiki = open(&path, &config);
                let page = PageName::new(format!("Page{n}")).unwrap();
                barrier.wait();
                ForkManager::new(&wiki)
                    .submit(&page, &editor(n), "text\n", &Metadata::new(), None)
                    .expect("write failed");
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer panicked");
    }

    let wiki = open(dir.path(), &config);
    let pages = wiki.revisions().list_pages(wiki.canonical()).unwrap();
    assert_eq!(pages.len(), THREADS);
}

#[test]
fn held_lock_times_out_as_store_error() {
    let dir = TempDir::new().unwrap();
    let file = ConfigFile {
        lock_timeout_ms: Some(100),
        ..Default::default()
    };
    let holder = Wiki::init(dir.path(), Some(&file)).unwrap();
    let home = PageName::new("Home").unwrap();
    let _held = holder.locks().acquire(&home, holder.canonical()).unwrap();

    let writer = open(dir.path(), holder.config());
    assert_eq!(writer.config().lock_timeout, Duration::from_millis(100));
    let result = ForkManager::new(&writer).submit(
        &home,
        &editor(0),
        "blocked\n",
        &Metadata::new(),
        None,
    );
    assert!(matches!(result, Err(WikiError::StoreIo(_))));
    assert!(holder
        .revisions()
        .list_pages(holder.canonical())
        .unwrap()
        .is_empty());
}

#[test]
fn lock_is_released_after_write() {
    let dir = TempDir::new().unwrap();
    let wiki = Wiki::init(dir.path(), None).unwrap();
    let home = PageName::new("Home").unwrap();
    ForkManager::new(&wiki)
        .submit(&home, &editor(0), "text\n", &Metadata::new(), None)
        .unwrap();

    let lock = wiki.locks().try_acquire(&home, wiki.canonical()).unwrap();
    assert!(lock.is_some());
}
