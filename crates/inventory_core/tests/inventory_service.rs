use inventory_core::{
    first_snapshot, InventoryDatabase, InventoryService, Item, ItemValidationError, RepoError,
    SqliteItemRepository,
};

fn service() -> (InventoryDatabase, InventoryService<SqliteItemRepository>) {
    let database = InventoryDatabase::in_memory().unwrap();
    let service = InventoryService::new(database.item_dao());
    (database, service)
}

#[tokio::test]
async fn add_item_rejects_invalid_items_before_writing() {
    let (_database, service) = service();

    let err = service
        .add_item(&Item::new(1, "", 1.0, 1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ItemValidationError::EmptyName)
    ));

    let err = service
        .add_item(&Item::new(1, "Apples", 1.0, -1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ItemValidationError::NegativeQuantity(-1))
    ));

    assert!(first_snapshot(service.items()).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_item_validates_and_replaces() {
    let (_database, service) = service();
    service
        .add_item(&Item::new(1, "Apples", 10.0, 20))
        .await
        .unwrap();

    let err = service
        .update_item(&Item::new(1, "Apples", -2.0, 20))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));

    service
        .update_item(&Item::new(1, "Apples", 12.0, 18))
        .await
        .unwrap();
    assert_eq!(
        service.find_item(1).await.unwrap(),
        Some(Item::new(1, "Apples", 12.0, 18))
    );
}

#[tokio::test]
async fn sell_one_decrements_quantity_until_out_of_stock() {
    let (_database, service) = service();
    service
        .add_item(&Item::new(1, "Apples", 10.0, 2))
        .await
        .unwrap();

    assert_eq!(service.sell_one(1).await.unwrap().quantity, 1);
    assert!(service.is_in_stock(1).await.unwrap());
    assert_eq!(service.sell_one(1).await.unwrap().quantity, 0);
    assert!(!service.is_in_stock(1).await.unwrap());

    let err = service.sell_one(1).await.unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ItemValidationError::OutOfStock(1))
    ));
    assert_eq!(
        first_snapshot(service.item(1)).await.unwrap(),
        vec![Item::new(1, "Apples", 10.0, 0)]
    );
}

#[tokio::test]
async fn sell_one_of_unknown_item_is_not_found() {
    let (_database, service) = service();

    let err = service.sell_one(7).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound(7)));
    assert!(!service.is_in_stock(7).await.unwrap());
}

#[tokio::test]
async fn remove_item_deletes_exact_record() {
    let (_database, service) = service();
    let item = Item::new(1, "Apples", 10.0, 20);
    service.add_item(&item).await.unwrap();

    service.remove_item(&item).await.unwrap();

    assert_eq!(service.find_item(1).await.unwrap(), None);
}
