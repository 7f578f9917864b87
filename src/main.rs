// ==========================================
// 货运集拼导入核心 - 命令行入口
// ==========================================
// 用法:
//   freight-intake <manifest.txt> [db_path] [--commit] [--voyage <id>]
//                  [--lang <zh-CN|en>] [--json-log] [--json]
//
// 说明: 按 SQLite 客户表对账舱单文件,输出摘要;
//       --commit 时提交所有已确认记录(冲突/相似/新客户仍需人工裁决)
//       --json 时以 JSON 输出会话/提交响应,供脚本消费
// ==========================================

use anyhow::{bail, Context};
use freight_intake::api::ImportApi;
use freight_intake::{db, i18n, logging, MatchStatus};
use std::collections::BTreeMap;

struct CliArgs {
    manifest_path: String,
    db_path: String,
    commit: bool,
    voyage_id: Option<String>,
    lang: Option<String>,
    json_log: bool,
    json: bool,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut positional = Vec::new();
    let mut commit = false;
    let mut voyage_id = None;
    let mut lang = None;
    let mut json_log = false;
    let mut json = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--commit" => commit = true,
            "--json-log" => json_log = true,
            "--json" => json = true,
            "--voyage" => voyage_id = Some(args.next().context("--voyage 缺少参数")?),
            "--lang" => lang = Some(args.next().context("--lang 缺少参数")?),
            other if other.starts_with("--") => bail!("未知参数: {}", other),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let Some(manifest_path) = positional.next() else {
        bail!("用法: freight-intake <manifest.txt> [db_path] [--commit] [--voyage <id>] [--lang <zh-CN|en>] [--json-log] [--json]");
    };
    let db_path = positional.next().unwrap_or_else(db::default_db_path);

    Ok(CliArgs {
        manifest_path,
        db_path,
        commit,
        voyage_id,
        lang,
        json_log,
        json,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    if args.json_log {
        logging::init_json();
    } else {
        logging::init();
    }
    if let Some(lang) = &args.lang {
        i18n::set_locale(lang);
    }

    tracing::info!("==================================================");
    tracing::info!("{} v{}", freight_intake::APP_NAME, freight_intake::VERSION);
    tracing::info!("使用数据库: {}", args.db_path);
    tracing::info!("==================================================");

    let raw = std::fs::read_to_string(&args.manifest_path)
        .with_context(|| format!("读取舱单失败: {}", args.manifest_path))?;

    let api = ImportApi::open(&args.db_path)
        .await
        .context("初始化导入API失败")?;

    let opened = api
        .open_session(&raw, args.voyage_id.clone())
        .await
        .context("建立对账会话失败")?;
    let records = api.list_records().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&opened)?);
        if args.commit {
            let committed = api.commit().await.context("提交失败")?;
            println!("{}", serde_json::to_string_pretty(&committed)?);
        }
        return Ok(());
    }

    for line in &opened.summary {
        println!("{}", line);
    }

    // 待人工裁决的行: 按状态列出行号
    let mut pending: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for record in &records {
        if record.match_status.needs_review() {
            pending
                .entry(record.match_status.to_string())
                .or_default()
                .push(record.row_index());
        }
    }
    for (status, rows) in &pending {
        println!(
            "{}: {}",
            status,
            freight_intake::engine::summary::first_identifiers(rows)
        );
    }

    if !args.commit {
        return Ok(());
    }

    let verified = records
        .iter()
        .filter(|r| r.match_status == MatchStatus::Verified)
        .count();
    tracing::info!(verified, "开始提交已确认记录");

    let committed = api.commit().await.context("提交失败")?;
    for line in &committed.summary {
        println!("{}", line);
    }
    if !committed.outcome.errors.is_empty() {
        bail!("{} 行提交失败", committed.outcome.errors.len());
    }
    Ok(())
}
