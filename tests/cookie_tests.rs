use std::fs;
use std::time::Duration;

use checkplugin::{CheckError, Cookie, LogTail, StorageError};
use tempfile::TempDir;

fn state_file(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("check-x.json")
}

#[test]
fn test_round_trip_through_commit_and_fresh_open() {
    let dir = TempDir::new().unwrap();
    let path = state_file(&dir);

    let mut cookie = Cookie::open(&path).unwrap();
    assert!(cookie.is_empty());
    cookie.insert("offset", 42);
    cookie.commit().unwrap();
    cookie.close();

    let reopened = Cookie::open(&path).unwrap();
    assert_eq!(reopened.get::<u64>("offset"), Some(42));
}

#[test]
fn test_uncommitted_changes_are_discarded() {
    let dir = TempDir::new().unwrap();
    let path = state_file(&dir);

    let mut cookie = Cookie::open(&path).unwrap();
    cookie.insert("offset", 42);
    cookie.close();

    let reopened = Cookie::open(&path).unwrap();
    assert_eq!(reopened.get::<u64>("offset"), None);
}

#[test]
fn test_multiple_commits_overwrite() {
    let dir = TempDir::new().unwrap();
    let path = state_file(&dir);

    let mut cookie = Cookie::open(&path).unwrap();
    cookie.insert("key", 1);
    cookie.commit().unwrap();
    cookie.insert("key", 2);
    cookie.commit().unwrap();
    cookie.close();

    assert!(fs::read_to_string(&path).unwrap().contains("\"key\":2"));
}

#[test]
fn test_state_file_is_plain_json_with_trailing_newline() {
    let dir = TempDir::new().unwrap();
    let path = state_file(&dir);

    let mut cookie = Cookie::open(&path).unwrap();
    cookie.insert("hello", "world");
    cookie.commit().unwrap();
    cookie.close();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "{\"hello\":\"world\"}\n"
    );
}

#[test]
fn test_reads_record_written_by_an_earlier_version() {
    let dir = TempDir::new().unwrap();
    let path = state_file(&dir);
    fs::write(&path, "{\"hello\": \"world\"}\n").unwrap();

    let cookie = Cookie::open(&path).unwrap();
    assert_eq!(cookie.get::<String>("hello").as_deref(), Some("world"));
}

#[test]
fn test_corrupt_record_is_surfaced_and_truncated() {
    let dir = TempDir::new().unwrap();
    let path = state_file(&dir);
    fs::write(&path, "{{{").unwrap();

    match Cookie::open(&path) {
        Err(StorageError::Corrupt { .. }) => {}
        other => panic!("expected Corrupt, got {:?}", other.map(|_| ())),
    }
    // The damaged record was truncated so the next run starts clean.
    assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    assert!(Cookie::open(&path).is_ok());
}

#[test]
fn test_non_object_record_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let path = state_file(&dir);
    fs::write(&path, "[1, 2, 3]\n").unwrap();

    assert!(matches!(
        Cookie::open(&path),
        Err(StorageError::Corrupt { .. })
    ));
}

#[cfg(unix)]
#[test]
fn test_second_open_fails_within_bounded_wait() {
    let dir = TempDir::new().unwrap();
    let path = state_file(&dir);

    let first = Cookie::open(&path).unwrap();
    let second = Cookie::open_with_lock_wait(&path, Duration::from_millis(300));
    assert!(matches!(second, Err(StorageError::Locked { .. })));
    drop(first);

    // Released on drop: the next open succeeds.
    assert!(Cookie::open_with_lock_wait(&path, Duration::from_millis(300)).is_ok());
}

#[cfg(unix)]
#[test]
fn test_close_releases_the_lock() {
    let dir = TempDir::new().unwrap();
    let path = state_file(&dir);

    let mut first = Cookie::open(&path).unwrap();
    first.close();
    assert!(Cookie::open_with_lock_wait(&path, Duration::from_millis(300)).is_ok());
}

#[test]
fn test_with_open_commits_on_success() {
    let dir = TempDir::new().unwrap();
    let path = state_file(&dir);

    Cookie::with_open::<_, StorageError, _>(&path, |cookie| {
        cookie.insert("runs", 1);
        Ok(())
    })
    .unwrap();

    assert_eq!(Cookie::open(&path).unwrap().get::<u64>("runs"), Some(1));
}

#[test]
fn test_with_open_discards_on_failure() {
    let dir = TempDir::new().unwrap();
    let path = state_file(&dir);

    let outcome: Result<(), CheckError> = Cookie::with_open(&path, |cookie| {
        cookie.insert("runs", 1);
        Err(CheckError::acquisition("measurement failed"))
    });
    assert!(outcome.is_err());

    assert_eq!(Cookie::open(&path).unwrap().get::<u64>("runs"), None);
}

#[test]
fn test_oblivious_cookie_leaves_no_trace() {
    let dir = TempDir::new().unwrap();

    let mut cookie = Cookie::oblivious();
    cookie.insert("key", 1);
    cookie.commit().unwrap();
    cookie.close();

    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

fn scan_counting_lines(logfile: &std::path::Path, cookie: Cookie) -> u64 {
    LogTail::new(logfile, cookie)
        .scan(|lines| {
            let mut count = 0;
            while lines.next_line()?.is_some() {
                count += 1;
            }
            Ok(count)
        })
        .unwrap()
}

#[test]
fn test_logtail_resumes_where_the_last_run_stopped() {
    let dir = TempDir::new().unwrap();
    let logfile = dir.path().join("app.log");
    let cookie_path = dir.path().join("state.json");

    fs::write(&logfile, "one\ntwo\n").unwrap();
    let count = scan_counting_lines(&logfile, Cookie::open(&cookie_path).unwrap());
    assert_eq!(count, 2);

    let mut contents = fs::read(&logfile).unwrap();
    contents.extend_from_slice(b"three\n");
    fs::write(&logfile, contents).unwrap();

    let count = scan_counting_lines(&logfile, Cookie::open(&cookie_path).unwrap());
    assert_eq!(count, 1);
}

#[test]
fn test_logtail_rereads_truncated_file() {
    let dir = TempDir::new().unwrap();
    let logfile = dir.path().join("app.log");
    let cookie_path = dir.path().join("state.json");

    fs::write(&logfile, "one\ntwo\nthree\n").unwrap();
    assert_eq!(
        scan_counting_lines(&logfile, Cookie::open(&cookie_path).unwrap()),
        3
    );

    // Rotation: the file shrank below the saved position.
    fs::write(&logfile, "one\n").unwrap();
    assert_eq!(
        scan_counting_lines(&logfile, Cookie::open(&cookie_path).unwrap()),
        1
    );
}

#[test]
fn test_logtail_does_not_advance_on_failure() {
    let dir = TempDir::new().unwrap();
    let logfile = dir.path().join("app.log");
    let cookie_path = dir.path().join("state.json");

    fs::write(&logfile, "one\ntwo\n").unwrap();
    let failed: Result<(), CheckError> = LogTail::new(&logfile, Cookie::open(&cookie_path).unwrap())
        .scan(|lines| {
            lines.next_line()?;
            Err(CheckError::acquisition("parser choked"))
        });
    assert!(failed.is_err());

    // The position was not committed, so all lines come back.
    assert_eq!(
        scan_counting_lines(&logfile, Cookie::open(&cookie_path).unwrap()),
        2
    );
}
