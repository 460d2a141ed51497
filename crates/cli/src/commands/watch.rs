//! Follow backend log lines and task progress until interrupted

use super::Globals;
use crate::output::print_info;
use airshipui_client::views::task::Task;
use anyhow::Result;
use colored::Colorize;
use std::collections::HashMap;

/// Progress line for a task, e.g. "ISO generation [2/5] running: copying".
fn task_line(task: &Task) -> String {
    let progress = &task.progress;
    format!(
        "{} [{}/{}] {}: {}",
        task.name,
        progress.current_step,
        progress.total_steps,
        if task.running { "running" } else { "finished" },
        progress.message
    )
}

/// New log lines since `seen`, given the panel and the total ever appended.
fn new_lines<'a>(log: &'a [String], total: u64, seen: u64) -> &'a [String] {
    let fresh = total.saturating_sub(seen) as usize;
    &log[log.len().saturating_sub(fresh)..]
}

pub async fn execute(globals: &Globals) -> Result<()> {
    let console = globals.open(&globals.config.auth.home_route).await?;
    print_info(&format!(
        "Watching {}, press Ctrl-C to stop",
        globals.config.endpoint
    ));

    let mut log_changes = console.shell.revision().subscribe();
    let mut task_changes = console.tasks.revision().subscribe();
    let mut seen_lines = 0u64;
    let mut shown: HashMap<String, String> = HashMap::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = log_changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let shell = console.shell.snapshot();
                let log: Vec<String> = shell.log.into_iter().collect();
                for line in new_lines(&log, shell.total_lines, seen_lines) {
                    println!("{} {}", "log".dimmed(), line);
                }
                seen_lines = shell.total_lines;
            }
            changed = task_changes.changed() => {
                if changed.is_err() {
                    break;
                }
                for task in console.tasks.tasks() {
                    let line = task_line(&task);
                    if shown.get(&task.id) != Some(&line) {
                        println!("{} {}", "task".cyan(), line);
                        shown.insert(task.id.clone(), line);
                    }
                }
            }
        }
    }

    console.close().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use airshipui_common::TaskProgress;

    #[test]
    fn test_new_lines_handles_rotation() {
        let log: Vec<String> = ["c", "d", "e"].iter().map(|s| s.to_string()).collect();
        // five lines ever appended, two already printed, panel holds the last three
        assert_eq!(new_lines(&log, 5, 2), &log[..]);
        assert_eq!(new_lines(&log, 5, 4), &log[2..]);
        assert!(new_lines(&log, 5, 5).is_empty());
        // more missed than the panel holds
        assert_eq!(new_lines(&log, 10, 0), &log[..]);
    }

    #[test]
    fn test_task_line() {
        let task = Task {
            id: "t1".to_string(),
            name: "ISO generation".to_string(),
            running: true,
            progress: TaskProgress {
                total_steps: 5,
                current_step: 2,
                message: "copying".to_string(),
                ..Default::default()
            },
        };
        assert_eq!(task_line(&task), "ISO generation [2/5] running: copying");
    }
}
