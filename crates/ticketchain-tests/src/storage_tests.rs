//! Storage contract tests shared by the backends.

use ticketchain_consensus::{Hash, TicketType};
use ticketchain_state::{columns, read_undo, ticket_key, StakeNode, StateError, TicketStore};
use ticketchain_storage::{with_read_tx, ColumnFamily, MemoryDatabase, Storage, WriteBatch};
use std::sync::Arc;
use std::thread;

fn exercise_batches(storage: &dyn Storage) {
    let mut batch = WriteBatch::new();
    batch.put(ColumnFamily::TicketUndo, b"a".to_vec(), b"1".to_vec());
    batch.put(ColumnFamily::TicketUndo, b"b".to_vec(), b"2".to_vec());
    batch.delete(ColumnFamily::TicketUndo, b"a".to_vec());
    storage.write_batch(batch).unwrap();

    assert!(storage.get(ColumnFamily::TicketUndo, b"a").unwrap().is_none());
    assert_eq!(storage.get(ColumnFamily::TicketUndo, b"b").unwrap(), Some(b"2".to_vec()));
    assert!(storage.contains(ColumnFamily::TicketUndo, b"b").unwrap());
    assert!(!storage.contains(ColumnFamily::NewTickets, b"b").unwrap());
}

#[test]
fn test_memory_batches() {
    exercise_batches(&MemoryDatabase::new());
}

#[cfg(feature = "rocksdb")]
#[test]
fn test_rocksdb_batches() {
    let db = crate::harness::TestDatabase::new();
    exercise_batches(&*db);
}

#[test]
fn test_concurrent_read_transactions() {
    let storage = Arc::new(MemoryDatabase::new());
    let store = TicketStore::new(storage.clone());
    let block = Hash::digest(b"block");
    store.put(TicketType::Regular, &block, &StakeNode::genesis()).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let storage = Arc::clone(&storage);
            thread::spawn(move || {
                with_read_tx(storage.as_ref(), |tx| read_undo(tx, TicketType::Regular, &block))
                    .unwrap()
                    .map(|undo| undo.len())
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(0));
    }
}

#[test]
fn test_corrupt_ticket_data_is_a_serialization_error() {
    let storage = MemoryDatabase::new();
    let block = Hash::digest(b"block");
    storage
        .put(columns::TICKET_UNDO, &ticket_key(TicketType::Ai, &block), &[1, 2, 3])
        .unwrap();
    let result = with_read_tx(&storage, |tx| read_undo(tx, TicketType::Ai, &block));
    assert!(matches!(result, Err(StateError::Serialization(_))));
}
