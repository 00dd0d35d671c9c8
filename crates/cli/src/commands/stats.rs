use crate::commands::{load_config, runtime, CommandResult, StepFailure, EXIT_DATABASE, EXIT_STORE};
use serde::Serialize;
use smashbot_core::{ItemKey, VoteStore, VoteTally};
use smashbot_db::{connect, SqlVoteStore};

#[derive(Debug, Serialize)]
struct ItemStats {
    item: String,
    smashes: u64,
    passes: u64,
    total: u64,
}

impl From<(ItemKey, VoteTally)> for ItemStats {
    fn from((key, tally): (ItemKey, VoteTally)) -> Self {
        Self { item: key.0, smashes: tally.approve, passes: tally.reject, total: tally.total() }
    }
}

#[derive(Debug, Serialize)]
struct StatsReport {
    command: &'static str,
    status: &'static str,
    items: Vec<ItemStats>,
}

pub fn run(json_output: bool) -> CommandResult {
    let config = match load_config("stats") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("stats") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DATABASE))?;
        let tallies = SqlVoteStore::new(pool.clone())
            .list()
            .await
            .map_err(|error| ("store", error.to_string(), EXIT_STORE))?;
        pool.close().await;
        Ok::<Vec<(ItemKey, VoteTally)>, StepFailure>(tallies)
    });

    let tallies = match result {
        Ok(tallies) => tallies,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("stats", error_class, message, exit_code);
        }
    };

    let report = StatsReport {
        command: "stats",
        status: "ok",
        items: tallies.into_iter().map(ItemStats::from).collect(),
    };
    let output = if json_output {
        match serde_json::to_string_pretty(&report) {
            Ok(output) => output,
            Err(error) => {
                return CommandResult::failure("stats", "serialization", error.to_string(), 1);
            }
        }
    } else {
        render_human(&report)
    };

    CommandResult { exit_code: 0, output }
}

fn render_human(report: &StatsReport) -> String {
    if report.items.is_empty() {
        return "no vote records yet; run `smashbot sync` first".to_owned();
    }

    let width = report.items.iter().map(|stats| stats.item.len()).max().unwrap_or(0).max(4);
    let mut lines =
        vec![format!("{:<width$}  {:>7}  {:>6}  {:>6}", "item", "smashes", "passes", "total")];
    for stats in &report.items {
        lines.push(format!(
            "{:<width$}  {:>7}  {:>6}  {:>6}",
            stats.item, stats.smashes, stats.passes, stats.total
        ));
    }
    lines.join("\n")
}
