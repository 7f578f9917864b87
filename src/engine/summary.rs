// ==========================================
// 货运集拼导入核心 - 结果摘要
// ==========================================
// 职责: 解析/提交结果 → 面向操作员的摘要文本
// 规则: 计数 + 前 3 个问题标识(行号 / 客户 ID),不输出原始错误结构
// ==========================================

use crate::domain::staging::CommitOutcome;
use crate::domain::types::MatchStatus;
use crate::engine::staging_session::StagingSession;
use crate::i18n::{t, t_with_args};

/// 摘要中列出的问题标识数量
const SAMPLE_LIMIT: usize = 3;

/// 取前 SAMPLE_LIMIT 个标识,超出部分以 "..." 表示
pub fn first_identifiers<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: ToString,
{
    let mut iter = items.into_iter();
    let head: Vec<String> = iter.by_ref().take(SAMPLE_LIMIT).map(|s| s.to_string()).collect();
    let mut text = head.join(", ");
    if iter.next().is_some() {
        text.push_str(", ...");
    }
    text
}

/// 会话摘要(解析 + 状态分布)
pub fn session_summary(session: &StagingSession) -> Vec<String> {
    let header = if session.has_header() {
        t("summary.header_yes")
    } else {
        t("summary.header_no")
    };

    let mut lines = vec![t_with_args(
        "summary.parse",
        &[
            ("rows", &session.len().to_string()),
            ("header", &header),
            ("warnings", &session.warnings().len().to_string()),
        ],
    )];

    if !session.warnings().is_empty() {
        lines.push(t_with_args(
            "summary.parse_warnings",
            &[("items", &first_identifiers(session.warnings()))],
        ));
    }

    let counts = session.status_counts();
    let count = |s: MatchStatus| counts.get(&s).copied().unwrap_or(0).to_string();
    lines.push(t_with_args(
        "summary.status",
        &[
            ("verified", &count(MatchStatus::Verified)),
            ("conflict", &count(MatchStatus::Conflict)),
            ("similar", &count(MatchStatus::Similar)),
            ("new_customer", &count(MatchStatus::NewCustomer)),
            ("duplicate", &count(MatchStatus::Duplicate)),
        ],
    ));

    let groups = session.groups().len();
    if groups > 0 {
        lines.push(t_with_args("summary.groups", &[("groups", &groups.to_string())]));
    }

    let folded = session.folded_rows();
    if !folded.is_empty() {
        lines.push(t_with_args(
            "summary.name_folded",
            &[
                ("count", &folded.len().to_string()),
                ("rows", &first_identifiers(&folded)),
            ],
        ));
    }
    lines
}

/// 提交摘要
pub fn commit_summary(outcome: &CommitOutcome) -> Vec<String> {
    if outcome.batch_count == 0 {
        return vec![t("summary.nothing_to_commit")];
    }

    let mut lines = vec![t_with_args(
        "summary.commit_ok",
        &[
            ("saved", &outcome.saved_count.to_string()),
            ("batches", &outcome.batch_count.to_string()),
        ],
    )];

    if !outcome.errors.is_empty() {
        lines.push(t_with_args(
            "summary.commit_failed",
            &[
                ("failed", &outcome.errors.len().to_string()),
                ("rows", &first_identifiers(outcome.errors.iter().map(|e| e.row_index))),
            ],
        ));
    }

    if outcome.master_updates > 0 {
        lines.push(t_with_args(
            "summary.master_updated",
            &[("count", &outcome.master_updates.to_string())],
        ));
    }

    if !outcome.master_update_failures.is_empty() {
        lines.push(t_with_args(
            "summary.master_failed",
            &[
                ("count", &outcome.master_update_failures.len().to_string()),
                ("ids", &first_identifiers(&outcome.master_update_failures)),
            ],
        ));
    }
    lines
}
