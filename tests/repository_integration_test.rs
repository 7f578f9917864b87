// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 客户主数据窄写入通道 + 运单单事务批量写入
// ==========================================

mod test_helpers;

use freight_intake::domain::{Customer, CustomerPatch};
use freight_intake::logging;
use freight_intake::repository::{
    CustomerRepository, CustomerRepositoryImpl, RepositoryError, ShipmentRepository,
    ShipmentRepositoryImpl,
};
use std::sync::{Arc, Mutex};

// ==========================================
// 客户主数据
// ==========================================

#[tokio::test]
async fn test_upsert_and_list_customers() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");

    let repo = test_helpers::seed_customers(&db_path, &test_helpers::sample_customers())
        .await
        .expect("Failed to seed customers");

    let customers = repo.list_customers().await.expect("list failed");
    assert_eq!(customers.len(), 3);

    let go = repo
        .find_by_id("C-GO")
        .await
        .expect("find failed")
        .expect("C-GO missing");
    assert_eq!(go.name, "고관영");
    assert_eq!(go.phone.as_deref(), Some("070 985 209"));

    assert!(repo.find_by_id("C-NONE").await.expect("find failed").is_none());
}

#[tokio::test]
async fn test_upsert_replaces_by_id() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = CustomerRepositoryImpl::new(&db_path).expect("repo");

    let customer = Customer::new("C1", "이수진").with_region("BKK");
    repo.upsert_customer(&customer).await.expect("insert");

    let mut updated = customer.clone();
    updated.pod_code = Some(7);
    updated.discount_percent = Some(5.0);
    repo.upsert_customer(&updated).await.expect("replace");

    let customers = repo.list_customers().await.expect("list");
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].pod_code, Some(7));
    assert_eq!(customers[0].discount_percent, Some(5.0));
}

#[tokio::test]
async fn test_normalized_name_is_unique() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = CustomerRepositoryImpl::new(&db_path).expect("repo");

    repo.upsert_customer(&Customer::new("C1", "Kim Min-Su"))
        .await
        .expect("insert");

    // 标准化后同为 "kimminsu"
    let err = repo
        .upsert_customer(&Customer::new("C2", "kim minsu"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
}

#[tokio::test]
async fn test_empty_name_rejected() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = CustomerRepositoryImpl::new(&db_path).expect("repo");

    let err = repo
        .upsert_customer(&Customer::new("C1", " (BKK) "))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ValidationError(_)));
}

#[tokio::test]
async fn test_update_customer_fields_patches_only_given_fields() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = test_helpers::seed_customers(&db_path, &test_helpers::sample_customers())
        .await
        .expect("seed");

    let patch = CustomerPatch {
        region: Some("Toul Kork".to_string()),
        ..Default::default()
    };
    repo.update_customer_fields("C-GO", &patch)
        .await
        .expect("update");

    let go = repo.find_by_id("C-GO").await.expect("find").expect("missing");
    assert_eq!(go.region.as_deref(), Some("Toul Kork"));
    assert_eq!(go.phone.as_deref(), Some("070 985 209"));
}

#[tokio::test]
async fn test_update_missing_customer_is_not_found() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let repo = CustomerRepositoryImpl::new(&db_path).expect("repo");

    let err = repo
        .update_customer_fields("C-NONE", &CustomerPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));
}

// ==========================================
// 运单
// ==========================================

#[tokio::test]
async fn test_commit_shipments_and_list_by_voyage() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_customers(&db_path, &test_helpers::sample_customers())
        .await
        .expect("seed");
    let repo = ShipmentRepositoryImpl::new(&db_path, 500).expect("repo");

    let batch = vec![
        test_helpers::shipment(3, "C-GO", "V1"),
        test_helpers::shipment(2, "C-MR", "V1"),
        test_helpers::shipment(2, "C-KIM", "V2"),
    ];
    let saved = repo.commit_shipments(&batch).await.expect("commit");
    assert_eq!(saved, 3);

    let v1 = repo.list_by_voyage("V1").await.expect("list");
    assert_eq!(v1.len(), 2);
    assert_eq!(v1[0].row_index, 2);
    assert_eq!(v1[0].customer_id, "C-MR");
    assert_eq!(repo.count_shipments().await.expect("count"), 3);
}

#[tokio::test]
async fn test_batch_over_limit_rejected_whole() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_customers(&db_path, &test_helpers::sample_customers())
        .await
        .expect("seed");
    let repo = ShipmentRepositoryImpl::new(&db_path, 2).expect("repo");
    assert_eq!(repo.max_batch_size(), 2);

    let batch: Vec<_> = (1..=3)
        .map(|i| test_helpers::shipment(i, "C-GO", "V1"))
        .collect();
    let err = repo.commit_shipments(&batch).await.unwrap_err();
    assert!(matches!(err, RepositoryError::BatchTooLarge { size: 3, limit: 2 }));
    assert_eq!(repo.count_shipments().await.expect("count"), 0);
}

#[tokio::test]
async fn test_failed_row_rolls_back_batch() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_customers(&db_path, &test_helpers::sample_customers())
        .await
        .expect("seed");
    let repo = ShipmentRepositoryImpl::new(&db_path, 500).expect("repo");

    // 第二行引用不存在的客户
    let batch = vec![
        test_helpers::shipment(1, "C-GO", "V1"),
        test_helpers::shipment(2, "C-NONE", "V1"),
    ];
    let err = repo.commit_shipments(&batch).await.unwrap_err();
    assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));

    let conn = test_helpers::open_test_connection(&db_path).expect("open");
    assert_eq!(test_helpers::count_shipments(&conn).expect("count"), 0);
}

#[tokio::test]
async fn test_transaction_begin_failure_is_reported() {
    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let conn = test_helpers::open_test_connection(&db_path).expect("open");
    conn.execute_batch("BEGIN").expect("begin");
    let conn = Arc::new(Mutex::new(conn));
    let repo = ShipmentRepositoryImpl::from_connection(conn, 500);

    // 连接上已有未结束事务,无法再开启
    let err = repo
        .commit_shipments(&[test_helpers::shipment(1, "C-GO", "V1")])
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::DatabaseTransactionError(_)));
}
