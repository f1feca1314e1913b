//! Mirror example
//!
//! Syncs the collection catalog, lists the known collections and mirrors one
//! subtree, or resumes an earlier task by id.
//!
//! ```text
//! cargo run --example mirror -- <catalog-url> [collection] [path]
//! cargo run --example mirror -- <catalog-url> --resume <task-id>
//! ```
//!
//! Set `MIRROR_PROXY=socks5h://127.0.0.1:9050` to route through a SOCKS proxy
//! and `RUST_LOG=collection_mirror=debug` for detailed logs. With
//! `MIRROR_EXPORT=catalog.json` the fetched catalog is also saved to disk.

use collection_mirror::{CollectionMirror, Config, Event, TaskId, run_with_shutdown};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(catalog_url) = args.first() else {
        eprintln!("usage: mirror <catalog-url> [collection] [path] | --resume <task-id>");
        std::process::exit(2);
    };

    let mut config = Config::default();
    config.remote.catalog_url = Some(catalog_url.clone());
    config.remote.proxy = std::env::var("MIRROR_PROXY").ok();

    let mirror = CollectionMirror::new(config).await?;

    let mut events = mirror.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::DirectoryListed {
                    path, files_found, ..
                } => println!("  listed {} ({} files so far)", path, files_found),
                Event::TaskCreated { task_id, total } => {
                    println!("✓ Task {} registered with {} files", task_id, total)
                }
                Event::FileDownloaded {
                    remote_path, bytes, ..
                } => println!("  ✓ {} ({} bytes)", remote_path, bytes),
                Event::FileFailed {
                    remote_path, error, ..
                } => println!("  ✗ {}: {}", remote_path, error),
                Event::TaskFinished { report } => println!(
                    "Done: {}/{} succeeded, {} pending{}",
                    report.succeeded,
                    report.total,
                    report.failed,
                    if report.cancelled { " (interrupted)" } else { "" }
                ),
            }
        }
    });

    if args.get(1).map(String::as_str) == Some("--resume") {
        let Some(task_id) = args.get(2) else {
            eprintln!("--resume needs a task id");
            std::process::exit(2);
        };
        let task_id = TaskId::from(task_id.as_str());
        run_with_shutdown(&mirror, mirror.resume_task(&task_id)).await?;
        return Ok(());
    }

    let added = mirror.sync_catalog().await?;
    println!("Catalog synced, {} new collections", added.len());

    if let Ok(export) = std::env::var("MIRROR_EXPORT") {
        let exported = mirror.export_catalog(std::path::Path::new(&export)).await?;
        println!("Catalog with {} entries written to {}", exported.len(), export);
    }

    for collection in mirror.list_collections().await? {
        println!(
            "{:>6}  {:<40} {:>14} bytes  {}",
            collection.id,
            collection.name,
            collection.size,
            collection.timestamp().format("%Y-%m-%d %H:%M")
        );
    }

    let Some(name) = args.get(1) else {
        return Ok(());
    };
    let root = args.get(2).map(String::as_str).unwrap_or("/");

    let collection = mirror.find_collection(name).await?;
    let report = run_with_shutdown(&mirror, mirror.download_tree(&collection, root)).await?;

    if let Some(task_id) = report.task_id.filter(|_| report.failed > 0) {
        println!(
            "{} files still pending; resume with: --resume {}",
            report.failed, task_id
        );
    }

    Ok(())
}
