use std::path::Path;

use {
    anyhow::{Result, bail},
    clap::Subcommand,
    courier_engine::IdentifierCache,
};

#[derive(Subcommand)]
pub enum CacheAction {
    /// Show every cached asset key and its provider file id.
    List {
        /// Print the entries as a JSON object.
        #[arg(long)]
        json: bool,
    },
    /// Forget every cached file id. Assets are uploaded again on next send.
    Clear,
}

pub async fn handle_cache(action: CacheAction, config: Option<&Path>) -> Result<()> {
    let (config, _) = courier_config::load(config)?;
    let Some(path) = config.engine.cache_path else {
        bail!("no engine.cache_path configured; file ids are only kept in memory");
    };
    let cache = IdentifierCache::open(&path).await;

    match action {
        CacheAction::List { json } => {
            let entries = cache.entries();
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No cached file ids in {}.", path.display());
            } else {
                let width = entries.keys().map(String::len).max().unwrap_or(0);
                for (key, id) in &entries {
                    println!("  {key:<width$}  {id}");
                }
            }
        },
        CacheAction::Clear => {
            let removed = cache.clear().await;
            println!("Removed {removed} cached file id(s) from {}.", path.display());
        },
    }

    Ok(())
}
