use anyhow::Result;
use ironbeam_mongo::testing::{numbered_column_spec, numbered_documents};
use ironbeam_mongo::{ConnectionManager, ErrorKind, FakeMongoStore, MongoSource, MongoSplit};

#[test]
fn leases_share_one_client() -> Result<()> {
    let store = FakeMongoStore::with_documents(numbered_documents(4));
    let manager = ConnectionManager::new(store.connector());
    assert!(!manager.is_connected());

    let a = manager.acquire()?;
    let b = manager.acquire()?;
    assert_eq!(store.connect_count(), 1);
    assert_eq!(store.live_clients(), 1);
    assert_eq!(manager.active_leases(), 2);
    assert!(manager.is_connected());

    drop(a);
    assert_eq!(manager.active_leases(), 1);
    assert_eq!(b.count_documents(None)?, 4, "remaining lease still usable");

    drop(b);
    assert_eq!(manager.active_leases(), 0);
    assert_eq!(store.live_clients(), 0);
    assert!(!manager.is_connected());
    Ok(())
}

#[test]
fn reconnects_after_last_lease_is_released() -> Result<()> {
    let store = FakeMongoStore::new();
    let manager = ConnectionManager::new(store.connector());
    drop(manager.acquire()?);
    drop(manager.acquire()?);
    assert_eq!(store.connect_count(), 2);
    Ok(())
}

#[test]
fn refused_connect_is_connection_error() {
    let store = FakeMongoStore::new();
    store.refuse_connections(true);
    let manager = ConnectionManager::new(store.connector());
    let err = manager.acquire().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Connection);
    assert_eq!(manager.active_leases(), 0);
}

#[test]
fn closing_one_reader_leaves_the_other_reading() -> Result<()> {
    let store = FakeMongoStore::with_documents(numbered_documents(20));
    let source = MongoSource::new(numbered_column_spec()?, None, store.connector())?;

    let mut first = source.create_reader();
    let mut second = source.create_reader();
    first.open(MongoSplit::new(0, 10))?;
    second.open(MongoSplit::new(10, 10))?;
    assert_eq!(source.connections().active_leases(), 2);

    first.next_row()?;
    first.close();
    assert_eq!(source.connections().active_leases(), 1);
    assert_eq!(store.live_clients(), 1);

    let mut read = 0;
    while second.has_next() {
        second.next_row()?;
        read += 1;
    }
    assert_eq!(read, 10);

    second.close();
    assert_eq!(store.live_clients(), 0);
    assert_eq!(store.connect_count(), 1);
    Ok(())
}
