use anyhow::{Context, Result};
use tasksync::config::Config;
use tasksync::constants::DEFAULT_PAGE_SIZE;
use tasksync::logger;
use tasksync::storage;
use tasksync::sync::filter::paginate;

const USAGE: &str = "\
Usage: tasksync <command>

Commands:
  status             Show queue counters
  list <owner-id> [page]
                     List visible tasks of an owner, a page at a time
  failed             List operations parked as failed
  retry [op-id]      Reset one failed operation, or all of them
  clear-failed       Drop every failed operation
  init-config        Write a default config file";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprintln!("{USAGE}");
        return Ok(());
    };

    if command == "init-config" {
        return Config::generate_default_config(Config::get_default_config_path()?);
    }

    let config = Config::load()?;
    logger::init_logging(&config.logging)?;
    let (tasks, queue) = storage::open(&config).await?;

    match command {
        "status" => {
            let status = queue.get_real_queue_status().await?;
            println!("📋 Sync queue");
            println!("  pending: {}", status.pending);
            println!("  failed:  {}", status.failed);
            println!("  total:   {}", status.total);
        }
        "list" => {
            let owner = args.get(1).context("list needs an owner id")?;
            let page = match args.get(2) {
                Some(page) => page.parse().with_context(|| format!("Invalid page: {page}"))?,
                None => 1,
            };
            let listed = paginate(&tasks.get_all_tasks(owner).await?, page, DEFAULT_PAGE_SIZE);
            for task in &listed.items {
                let marker = if task.needs_sync { "*" } else { " " };
                println!("{marker} {:<32} {:?} {}", task.local_id, task.status, task.title);
            }
            println!(
                "Page {}/{} ({} tasks{})",
                listed.page,
                listed.total_pages.max(1),
                listed.total_items,
                if listed.has_more { ", more available" } else { "" }
            );
        }
        "failed" => {
            for op in queue.get_failed_operations().await? {
                println!(
                    "#{:<5} {:<6} {} (retries {}/{}, queued {})",
                    op.id, op.operation_type, op.entity_id, op.retry_count, op.max_retries, op.created_at
                );
            }
        }
        "retry" => {
            let reset = match args.get(1) {
                Some(id) => {
                    let id: i32 = id.parse().with_context(|| format!("Invalid operation id: {id}"))?;
                    queue.reset_failed_operation(id).await?
                }
                None => queue.reset_all_failed_operations().await?,
            };
            println!("🔄 Reset {reset} operations; they will be retried on the next sync pass");
        }
        "clear-failed" => {
            let cleared = queue.clear_failed_operations().await?;
            println!("🧹 Cleared {cleared} failed operations");
        }
        other => {
            eprintln!("❌ Unknown command: {other}\n\n{USAGE}");
        }
    }

    Ok(())
}
