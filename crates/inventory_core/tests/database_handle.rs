// The global handle is process-wide, so this binary holds a single test.

use inventory_core::{
    first_snapshot, get_database, get_database_async, DatabaseContext, DbError, Item, ItemRepository,
};
use std::sync::{Arc, Barrier};
use std::thread;

#[tokio::test(flavor = "multi_thread")]
async fn global_database_is_created_once_and_bound_to_its_directory() {
    let dir = tempfile::tempdir().unwrap();
    let context = DatabaseContext::new(dir.path().join("app-data"));

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let context = context.clone();
            thread::spawn(move || {
                barrier.wait();
                let database = get_database(&context).unwrap();
                database as *const _ as usize
            })
        })
        .collect();
    let addresses: Vec<usize> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));

    let database = get_database(&context).unwrap();
    assert!(context.database_path().exists());
    let from_async = get_database_async(context.clone()).await.unwrap();
    assert!(std::ptr::eq(database, from_async));
    database
        .item_dao()
        .insert(&Item::new(1, "Apples", 10.0, 20))
        .await
        .unwrap();
    let items = first_snapshot(get_database(&context).unwrap().item_dao().get_all_items())
        .await
        .unwrap();
    assert_eq!(items, vec![Item::new(1, "Apples", 10.0, 20)]);

    let other = DatabaseContext::new(dir.path().join("elsewhere"));
    let err = get_database(&other).unwrap_err();
    assert!(matches!(err, DbError::AlreadyInitialized { .. }));
    let err = get_database_async(other).await.unwrap_err();
    assert!(matches!(err, DbError::AlreadyInitialized { .. }));
}
