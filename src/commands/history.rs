//! `vigil history`: inspect the append-only run log.

use anyhow::Result;
use colored::Colorize;
use std::fs;

use crate::config::Config;
use crate::history::RunHistoryStore;

pub fn execute(config: &Config, limit: usize) -> Result<i32> {
    let store = RunHistoryStore::new(&config.history_path);

    match fs::read_to_string(store.path()) {
        Ok(content) => {
            let lines: Vec<&str> = content.lines().collect();
            let skip = lines.len().saturating_sub(limit);
            println!("{}", "Recorded runs".bold());
            for line in &lines[skip..] {
                let colored_line = if line.contains("Result: success") {
                    line.green().to_string()
                } else {
                    line.red().to_string()
                };
                println!("  {colored_line}");
            }
        }
        Err(_) => {
            println!("No run history at {}", store.path().display());
        }
    }

    println!("Next run: #{}", store.next_run_count());
    Ok(0)
}
