// ==========================================
// 对账端到端测试
// ==========================================
// 测试目标: 粘贴 → 匹配 → 人工裁决 → 提交 → 主数据/运单落库
// 后端: 临时 SQLite(客户表 + 运单表)
// ==========================================

mod test_helpers;

use freight_intake::api::{ApiError, ImportApi};
use freight_intake::domain::{
    ConflictField, ConflictResolution, FieldEdit, MatchStatus, NewCustomerDraft, StagingRecord,
};
use freight_intake::logging;
use freight_intake::repository::{
    CustomerRepository, CustomerRepositoryImpl, ShipmentRepository, ShipmentRepositoryImpl,
};

async fn setup() -> (tempfile::NamedTempFile, String, ImportApi) {
    logging::init_test();
    let (temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    test_helpers::seed_customers(&db_path, &test_helpers::sample_customers())
        .await
        .expect("Failed to seed customers");
    let api = ImportApi::open(&db_path).await.expect("Failed to open api");
    (temp_file, db_path, api)
}

fn by_row(records: &[StagingRecord], row_index: usize) -> &StagingRecord {
    records
        .iter()
        .find(|r| r.row_index() == row_index)
        .expect("row missing")
}

// ==========================================
// 场景 A: 表头 + 完全一致 / 括号后缀
// ==========================================

#[tokio::test]
async fn test_scenario_a_verified_rows_commit() {
    let (_temp_file, db_path, api) = setup().await;

    let raw = "이름\tContact\t동네\n고관영\t070 985 209\tBKK\n명랑방콕\t092 240 030\tBKK";
    let opened = api
        .open_session(raw, Some("V-A".to_string()))
        .await
        .expect("open session");
    assert!(opened.has_header);
    assert_eq!(opened.record_count, 2);

    let records = api.list_records().await.expect("list");
    let first = by_row(&records, 2);
    assert_eq!(first.match_status, MatchStatus::Verified);
    assert_eq!(first.matched_customer.as_ref().map(|c| c.id.as_str()), Some("C-GO"));
    assert!(first.confidence.score >= 0.95);

    let second = by_row(&records, 3);
    assert_eq!(second.match_status, MatchStatus::Verified);
    assert_eq!(second.matched_customer.as_ref().map(|c| c.id.as_str()), Some("C-MR"));

    let committed = api.commit().await.expect("commit");
    assert_eq!(committed.outcome.saved_count, 2);
    assert_eq!(committed.outcome.batch_count, 1);
    assert!(committed.outcome.errors.is_empty());
    assert_eq!(committed.remaining, 0);

    let shipments = ShipmentRepositoryImpl::new(&db_path, 500).expect("repo");
    let saved = shipments.list_by_voyage("V-A").await.expect("list");
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].customer_id, "C-GO");
    assert_eq!(saved[1].customer_name, "명랑방콕(BKK)");
}

// ==========================================
// 场景 B: 同电话不同格式 → 同一重复组
// ==========================================

#[tokio::test]
async fn test_scenario_b_shared_phone_group() {
    let (_temp_file, db_path, api) = setup().await;

    let raw = "이름\t연락처\t수량\n홍길동\t010-1234-5678\t2\n최영호\t010 1234 5678\t3";
    api.open_session(raw, Some("V-B".to_string()))
        .await
        .expect("open session");

    let groups = api.list_groups().await.expect("groups");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].member_row_indices, vec![2, 3]);
    assert_eq!(groups[0].merged_quantity, 5);
    assert_eq!(groups[0].primary_row_index, 2);

    let records = api.list_records().await.expect("list");
    let primary = by_row(&records, 2).clone();
    assert_eq!(primary.match_status, MatchStatus::NewCustomer);
    let member = by_row(&records, 3);
    assert_eq!(member.match_status, MatchStatus::Duplicate);
    assert!(!member.is_selected);

    // 重复行不能被勾选
    let err = api.set_selected(&member.staging_id, true).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));

    // 为主行登记新客户 → 主行 VERIFIED,成员继承客户
    let registered = api
        .register_customer(&primary.staging_id, NewCustomerDraft::default())
        .await
        .expect("register");
    assert_eq!(registered.linked_staging_ids, vec![primary.staging_id.clone()]);

    let records = api.list_records().await.expect("list");
    assert_eq!(by_row(&records, 2).match_status, MatchStatus::Verified);
    let member = by_row(&records, 3);
    assert_eq!(member.match_status, MatchStatus::Duplicate);
    assert_eq!(
        member.matched_customer.as_ref().map(|c| c.id.as_str()),
        Some(registered.customer.id.as_str())
    );

    // 主行按合并数量落库,成员不单独落库
    let committed = api.commit().await.expect("commit");
    assert_eq!(committed.outcome.saved_count, 1);
    assert_eq!(committed.remaining, 1);

    let shipments = ShipmentRepositoryImpl::new(&db_path, 500).expect("repo");
    let saved = shipments.list_by_voyage("V-B").await.expect("list");
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].qty, 5);
    assert_eq!(saved[0].customer_name, "홍길동");
}

#[tokio::test]
async fn test_member_phone_edit_leaves_group() {
    let (_temp_file, _db_path, api) = setup().await;

    let raw = "이름\t연락처\t수량\n홍길동\t010-1234-5678\t2\n최영호\t010 1234 5678\t3\n박영희\t01012345678\t1";
    api.open_session(raw, None).await.expect("open session");
    assert_eq!(api.list_groups().await.expect("groups")[0].merged_quantity, 6);

    let records = api.list_records().await.expect("list");
    let member = by_row(&records, 3).clone();
    let edited = api
        .edit(
            &member.staging_id,
            FieldEdit {
                phone: Some("010-9999-0000".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("edit");
    assert!(edited.duplicate_group_id.is_none());
    assert_ne!(edited.match_status, MatchStatus::Duplicate);

    let groups = api.list_groups().await.expect("groups");
    assert_eq!(groups[0].member_row_indices, vec![2, 4]);
    assert_eq!(groups[0].merged_quantity, 3);
}

// ==========================================
// 场景 C: 姓名命中但地区不一致 → CONFLICT
// ==========================================

const CONFLICT_MANIFEST: &str = "이름\tContact\t동네\n고관영\t070 985 209\tToul Kork";

async fn open_conflict(api: &ImportApi) -> StagingRecord {
    api.open_session(CONFLICT_MANIFEST, Some("V-C".to_string()))
        .await
        .expect("open session");
    let records = api.list_records().await.expect("list");
    let record = records[0].clone();

    assert_eq!(record.match_status, MatchStatus::Conflict);
    assert!(!record.is_resolved);
    let conflict = record.conflict.as_ref().expect("conflict info");
    assert!(conflict.has_field(ConflictField::Region));
    assert!(!conflict.has_field(ConflictField::Phone));
    let diff = &conflict.fields[0];
    assert_eq!(diff.master_value.as_deref(), Some("BKK"));
    assert_eq!(diff.imported_value, "Toul Kork");
    record
}

#[tokio::test]
async fn test_scenario_c_pending_conflict_blocks_commit() {
    let (_temp_file, db_path, api) = setup().await;
    open_conflict(&api).await;

    let committed = api.commit().await.expect("commit");
    assert_eq!(committed.outcome.batch_count, 0);
    assert_eq!(committed.remaining, 1);

    let conn = test_helpers::open_test_connection(&db_path).expect("open");
    assert_eq!(test_helpers::count_shipments(&conn).expect("count"), 0);
}

#[tokio::test]
async fn test_scenario_c_use_once_keeps_master() {
    let (_temp_file, db_path, api) = setup().await;
    let record = open_conflict(&api).await;

    let resolved = api
        .resolve_conflict(&record.staging_id, ConflictResolution::UseOnce)
        .await
        .expect("resolve");
    assert!(resolved.is_resolved);

    let committed = api.commit().await.expect("commit");
    assert_eq!(committed.outcome.saved_count, 1);
    assert_eq!(committed.outcome.master_updates, 0);

    let customers = CustomerRepositoryImpl::new(&db_path).expect("repo");
    let go = customers.find_by_id("C-GO").await.expect("find").expect("missing");
    assert_eq!(go.region.as_deref(), Some("BKK"));

    let shipments = ShipmentRepositoryImpl::new(&db_path, 500).expect("repo");
    let saved = shipments.list_by_voyage("V-C").await.expect("list");
    assert_eq!(saved[0].region.as_deref(), Some("Toul Kork"));
}

#[tokio::test]
async fn test_scenario_c_update_master_overwrites() {
    let (_temp_file, db_path, api) = setup().await;
    let record = open_conflict(&api).await;

    api.resolve_conflict(&record.staging_id, ConflictResolution::UpdateMaster)
        .await
        .expect("resolve");

    let committed = api.commit().await.expect("commit");
    assert_eq!(committed.outcome.saved_count, 1);
    assert_eq!(committed.outcome.master_updates, 1);

    let customers = CustomerRepositoryImpl::new(&db_path).expect("repo");
    let go = customers.find_by_id("C-GO").await.expect("find").expect("missing");
    assert_eq!(go.region.as_deref(), Some("Toul Kork"));
    assert_eq!(go.phone.as_deref(), Some("070 985 209"));
}

#[tokio::test]
async fn test_pending_is_not_a_resolution() {
    let (_temp_file, _db_path, api) = setup().await;
    let record = open_conflict(&api).await;

    let err = api
        .resolve_conflict(&record.staging_id, ConflictResolution::Pending)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

// ==========================================
// 登记新客户 / 相似候选
// ==========================================

#[tokio::test]
async fn test_register_links_same_name_rows() {
    let (_temp_file, db_path, api) = setup().await;

    let raw = "이름\t연락처\n이수진\t010-7000-1000\n이수진\t010-7000-2000\n박영희\t010-7000-3000";
    api.open_session(raw, None).await.expect("open session");
    let records = api.list_records().await.expect("list");
    assert!(records.iter().all(|r| r.match_status == MatchStatus::NewCustomer));

    let source = by_row(&records, 2).clone();
    let registered = api
        .register_customer(
            &source.staging_id,
            NewCustomerDraft {
                region: Some("BKK".to_string()),
                pod_code: Some(3),
                ..Default::default()
            },
        )
        .await
        .expect("register");
    assert_eq!(registered.linked_staging_ids.len(), 2);
    assert_eq!(registered.customer.phone.as_deref(), Some("010-7000-1000"));

    let records = api.list_records().await.expect("list");
    assert_eq!(by_row(&records, 3).match_status, MatchStatus::Verified);
    assert_eq!(by_row(&records, 4).match_status, MatchStatus::NewCustomer);

    let repo = CustomerRepositoryImpl::new(&db_path).expect("repo");
    let stored = repo
        .find_by_id(&registered.customer.id)
        .await
        .expect("find")
        .expect("missing");
    assert_eq!(stored.pod_code, Some(3));
}

#[tokio::test]
async fn test_similar_candidate_selection() {
    let (_temp_file, _db_path, api) = setup().await;

    // "명랑방콕" 的错拼 + 地区一致 → 相似候选
    let raw = "이름\t동네\n명랑방곡\tBKK";
    api.open_session(raw, None).await.expect("open session");
    let record = api.list_records().await.expect("list")[0].clone();

    assert_eq!(record.match_status, MatchStatus::Similar);
    assert!(!record.is_commit_eligible());
    assert!(record.confidence.score >= 0.70 && record.confidence.score < 0.95);
    assert_eq!(
        record.similar_candidates.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
        vec!["C-MR"]
    );

    let chosen = api
        .select_candidate(&record.staging_id, "C-MR")
        .await
        .expect("select");
    assert_eq!(chosen.match_status, MatchStatus::Verified);
    assert!(chosen.is_commit_eligible());

    // 仅 SIMILAR 可选候选
    let err = api
        .select_candidate(&record.staging_id, "C-MR")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
}

#[tokio::test]
async fn test_discard_and_rematch_all() {
    let (_temp_file, _db_path, api) = setup().await;

    let raw = "이름\t연락처\n고관영\t070 985 209\n홍길동\t010-8000-1000";
    api.open_session(raw, None).await.expect("open session");
    let records = api.list_records().await.expect("list");
    let stranger = by_row(&records, 3).clone();

    // 改名为已有客户后全量重新匹配 → 与第一行同名,按姓名去重
    api.edit(
        &stranger.staging_id,
        FieldEdit {
            name: Some("고관영".to_string()),
            ..Default::default()
        },
    )
    .await
    .expect("edit");
    let all = api.rematch_all().await.expect("rematch all");
    assert_eq!(by_row(&all, 3).match_status, MatchStatus::Duplicate);

    api.discard(&stranger.staging_id).await.expect("discard");
    assert_eq!(api.list_records().await.expect("list").len(), 1);
    assert!(matches!(
        api.get_record(&stranger.staging_id).await,
        Err(ApiError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_rematch_all_folds_quantity_into_first_row() {
    let (_temp_file, db_path, api) = setup().await;

    // 第 3 行与第 1 行同名,同时是电话组主行
    let raw = "이름\t연락처\t수량\n고관영\t070 985 209\t1\n고관영\t010-3333-4444\t2\n김철수\t010-3333-4444\t5";
    api.open_session(raw, Some("V-F".to_string()))
        .await
        .expect("open session");
    assert_eq!(api.list_groups().await.expect("groups").len(), 1);

    let all = api.rematch_all().await.expect("rematch all");
    assert_eq!(by_row(&all, 2).match_status, MatchStatus::Verified);
    assert_eq!(by_row(&all, 3).match_status, MatchStatus::Duplicate);
    assert_eq!(by_row(&all, 4).match_status, MatchStatus::NewCustomer);
    assert!(api.list_groups().await.expect("groups").is_empty());

    let summary = api.session_summary().await.expect("summary");
    assert!(summary.last().expect("summary line").ends_with('3'));

    let committed = api.commit().await.expect("commit");
    assert_eq!(committed.outcome.saved_count, 1);
    assert_eq!(committed.remaining, 1);

    // 剩余行登记后提交,全部数量落库
    let rest = api.list_records().await.expect("list")[0].clone();
    api.register_customer(&rest.staging_id, NewCustomerDraft::default())
        .await
        .expect("register");
    api.commit().await.expect("commit");

    let shipments = ShipmentRepositoryImpl::new(&db_path, 500).expect("repo");
    let saved = shipments.list_by_voyage("V-F").await.expect("list");
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].customer_id, "C-GO");
    assert_eq!(saved[0].qty, 3);
    assert_eq!(saved[1].qty, 5);
    assert_eq!(saved.iter().map(|s| s.qty).sum::<u32>(), 8);
}

#[tokio::test]
async fn test_register_with_other_name_still_links_source() {
    let (_temp_file, _db_path, api) = setup().await;

    api.open_session("이름\n홍길동", None).await.expect("open session");
    let source = api.list_records().await.expect("list")[0].clone();

    let registered = api
        .register_customer(
            &source.staging_id,
            NewCustomerDraft {
                name: Some("Hong Gildong".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("register");
    assert_eq!(registered.linked_staging_ids, vec![source.staging_id.clone()]);

    let record = api.get_record(&source.staging_id).await.expect("get");
    assert_eq!(record.match_status, MatchStatus::Verified);
    assert!(record.is_commit_eligible());
}
