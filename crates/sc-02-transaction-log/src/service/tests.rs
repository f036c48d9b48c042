//! # Transaction Log Tests

use super::*;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn log_path(dir: &TempDir) -> PathBuf {
    dir.path().join("data").join("transaction_log.bin")
}

fn open_log(dir: &TempDir) -> TransactionLog {
    TransactionLog::open(log_path(dir)).unwrap()
}

#[test]
fn test_new_log_has_header_only() {
    let dir = TempDir::new().unwrap();
    let log = open_log(&dir);

    assert_eq!(log.pending_count(), 0);
    assert_eq!(fs::metadata(log_path(&dir)).unwrap().len(), HEADER_SIZE);
}

#[test]
fn test_process_in_order() {
    let dir = TempDir::new().unwrap();
    let log = open_log(&dir);
    let first = log.new_transaction(b"first", 0).unwrap();
    let second = log.new_transaction(b"second", 0).unwrap();
    assert!(second > first);

    let tx = log.start_processing().unwrap().unwrap();
    assert_eq!(tx.id, first);
    assert_eq!(tx.data, b"first");
    assert_eq!(tx.status, TransactionStatus::Processing);
    log.end_processing(&tx).unwrap();

    let tx = log.start_processing().unwrap().unwrap();
    assert_eq!(tx.id, second);
    log.end_processing(&tx).unwrap();

    assert_eq!(log.pending_count(), 0);
    drop(log);
    assert_eq!(open_log(&dir).pending_count(), 0);
}

#[test]
fn test_crash_during_processing_is_replayed() {
    let dir = TempDir::new().unwrap();
    let id;
    {
        let log = open_log(&dir);
        id = log.new_transaction(b"payload", 0).unwrap();
        let tx = log.start_processing().unwrap().unwrap();
        assert_eq!(tx.status, TransactionStatus::Processing);
        // Dropped without end_processing.
    }

    let log = open_log(&dir);
    let pending = log.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, id);
    assert_eq!(pending[0].status, TransactionStatus::ToProcess);

    let tx = log.start_processing().unwrap().unwrap();
    assert_eq!(tx.id, id);
    assert_eq!(tx.data, b"payload");
}

#[test]
fn test_ids_keep_growing_after_reopen() {
    let dir = TempDir::new().unwrap();
    let before = {
        let log = open_log(&dir);
        log.new_transaction(b"a", 0).unwrap()
    };
    let log = open_log(&dir);
    assert!(log.new_transaction(b"b", 0).unwrap() > before);
}

#[test]
fn test_delay_is_respected() {
    let dir = TempDir::new().unwrap();
    let log = open_log(&dir);
    log.new_transaction(b"later", 100).unwrap();

    let tx = log.start_processing().unwrap().unwrap();

    let waited = SystemTime::now().duration_since(tx.enqueued_at()).unwrap();
    assert!(waited >= Duration::from_millis(100), "waited {:?}", waited);
}

#[test]
fn test_cancel_before_start() {
    let dir = TempDir::new().unwrap();
    let log = open_log(&dir);
    log.new_transaction(b"two-stage", 1_000).unwrap();

    log.cancel_transaction().unwrap();

    assert_eq!(log.pending_count(), 0);
    drop(log);
    assert_eq!(open_log(&dir).pending_count(), 0);
}

#[test]
fn test_cancel_wakes_sleeping_consumer() {
    let dir = TempDir::new().unwrap();
    let log = Arc::new(open_log(&dir));
    log.new_transaction(b"two-stage", 10_000).unwrap();

    let consumer = {
        let log = Arc::clone(&log);
        thread::spawn(move || {
            let started = Instant::now();
            let result = log.start_processing().unwrap();
            (result, started.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(50));
    log.cancel_transaction().unwrap();

    let (result, elapsed) = consumer.join().unwrap();
    assert!(result.is_none());
    assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);
}

#[test]
fn test_cancel_requires_delayed_head() {
    let dir = TempDir::new().unwrap();
    let log = open_log(&dir);

    // Empty queue: no-op.
    log.cancel_transaction().unwrap();

    let id = log.new_transaction(b"now", 0).unwrap();
    assert!(matches!(
        log.cancel_transaction(),
        Err(TransactionLogError::NotDelayed { id: found }) if found == id
    ));
}

#[test]
fn test_consumer_waits_for_new_transaction() {
    let dir = TempDir::new().unwrap();
    let log = Arc::new(open_log(&dir));

    let consumer = {
        let log = Arc::clone(&log);
        thread::spawn(move || log.start_processing().unwrap())
    };
    thread::sleep(Duration::from_millis(30));
    let id = log.new_transaction(b"wake up", 0).unwrap();

    let tx = consumer.join().unwrap().unwrap();
    assert_eq!(tx.id, id);
}

#[test]
fn test_dispose_releases_consumer() {
    let dir = TempDir::new().unwrap();
    let log = Arc::new(open_log(&dir));

    let consumer = {
        let log = Arc::clone(&log);
        thread::spawn(move || log.start_processing().unwrap())
    };
    thread::sleep(Duration::from_millis(30));
    log.dispose();

    assert!(consumer.join().unwrap().is_none());
    assert!(matches!(
        log.new_transaction(b"x", 0),
        Err(TransactionLogError::Disposed)
    ));
}

#[test]
fn test_end_processing_checks_head() {
    let dir = TempDir::new().unwrap();
    let log = open_log(&dir);
    log.new_transaction(b"a", 0).unwrap();
    log.new_transaction(b"b", 0).unwrap();
    let head = log.start_processing().unwrap().unwrap();

    let mut other = head.clone();
    other.id += 1;
    assert!(matches!(
        log.end_processing(&other),
        Err(TransactionLogError::UnexpectedHead { .. })
    ));

    log.end_processing(&head).unwrap();
    let next = log.pending()[0].clone();
    assert!(matches!(
        log.end_processing(&next),
        Err(TransactionLogError::InvalidTransition {
            from: TransactionStatus::ToProcess,
            ..
        })
    ));
}

#[test]
fn test_retried_transaction_keeps_head_position() {
    let dir = TempDir::new().unwrap();
    let failed;
    let later;
    {
        let log = open_log(&dir);
        failed = log.new_transaction(b"fails", 0).unwrap();
        later = log.new_transaction(b"works", 0).unwrap();

        let tx = log.start_processing().unwrap().unwrap();
        log.retry_processing(&tx).unwrap();
        assert_eq!(log.pending_count(), 2);
        assert_eq!(log.pending()[0].status, TransactionStatus::ToProcess);

        // The retried transaction comes back before anything logged later.
        let tx = log.start_processing().unwrap().unwrap();
        assert_eq!(tx.id, failed);
        log.retry_processing(&tx).unwrap();
    }

    let log = open_log(&dir);
    let pending = log.pending();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].id, failed);
    assert_eq!(pending[0].status, TransactionStatus::ToProcess);
    assert_eq!(pending[1].id, later);
}

#[test]
fn test_retry_requires_processing_head() {
    let dir = TempDir::new().unwrap();
    let log = open_log(&dir);
    log.new_transaction(b"a", 0).unwrap();
    let head = log.pending()[0].clone();

    assert!(matches!(
        log.retry_processing(&head),
        Err(TransactionLogError::InvalidTransition {
            from: TransactionStatus::ToProcess,
            ..
        })
    ));
}

#[test]
fn test_clear_log() {
    let dir = TempDir::new().unwrap();
    let log = open_log(&dir);
    log.new_transaction(b"a", 0).unwrap();

    assert!(matches!(
        log.clear_log(),
        Err(TransactionLogError::PendingTransactions { count: 1 })
    ));

    let tx = log.start_processing().unwrap().unwrap();
    log.end_processing(&tx).unwrap();
    log.clear_log().unwrap();

    assert_eq!(fs::metadata(log_path(&dir)).unwrap().len(), HEADER_SIZE);
    log.new_transaction(b"b", 0).unwrap();
    drop(log);
    assert_eq!(open_log(&dir).pending_count(), 1);
}

#[test]
fn test_wait_until_empty() {
    let dir = TempDir::new().unwrap();
    let log = Arc::new(open_log(&dir));
    log.new_transaction(b"a", 0).unwrap();
    assert!(!log.wait_until_empty(Some(Duration::from_millis(20))));

    let consumer = {
        let log = Arc::clone(&log);
        thread::spawn(move || {
            let tx = log.start_processing().unwrap().unwrap();
            thread::sleep(Duration::from_millis(20));
            log.end_processing(&tx).unwrap();
        })
    };

    assert!(log.wait_until_empty(Some(Duration::from_secs(10))));
    consumer.join().unwrap();
}

#[test]
fn test_torn_append_is_discarded() {
    let dir = TempDir::new().unwrap();
    {
        let log = open_log(&dir);
        log.new_transaction(b"complete", 0).unwrap();
    }
    let clean_len = fs::metadata(log_path(&dir)).unwrap().len();
    {
        let mut file = OpenOptions::new().append(true).open(log_path(&dir)).unwrap();
        file.write_all(&[0, 0, 0, 0, 1, 2, 3]).unwrap();
    }

    let log = open_log(&dir);

    assert_eq!(log.pending_count(), 1);
    assert_eq!(fs::metadata(log_path(&dir)).unwrap().len(), clean_len);
}

#[test]
fn test_corrupted_record_fails_open() {
    let dir = TempDir::new().unwrap();
    {
        let log = open_log(&dir);
        log.new_transaction(b"complete", 0).unwrap();
    }
    let len = fs::metadata(log_path(&dir)).unwrap().len();
    {
        let mut file = OpenOptions::new().write(true).open(log_path(&dir)).unwrap();
        file.seek(SeekFrom::Start(len - 8)).unwrap();
        file.write_all(&[0u8; 8]).unwrap();
    }

    assert!(matches!(
        TransactionLog::open(log_path(&dir)),
        Err(TransactionLogError::Corrupted { .. })
    ));
}
