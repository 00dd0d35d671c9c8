use crate::commands::{
    load_config, runtime, CommandResult, StepFailure, EXIT_CATALOG, EXIT_DATABASE,
    EXIT_MIGRATION, EXIT_STORE,
};
use smashbot_core::Catalog;
use smashbot_db::{connect, migrations, reconcile_catalog, SqlVoteStore};

/// Safe to repeat: existing counts are never reset.
pub fn run() -> CommandResult {
    let config = match load_config("sync") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let catalog = match Catalog::load(&config.catalog.path) {
        Ok(catalog) => catalog,
        Err(error) => {
            return CommandResult::failure("sync", "catalog", error.to_string(), EXIT_CATALOG);
        }
    };
    let runtime = match runtime("sync") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DATABASE))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

        let store = SqlVoteStore::new(pool.clone());
        let report = reconcile_catalog(&store, &catalog)
            .await
            .map_err(|error| ("store", error.to_string(), EXIT_STORE))?;
        pool.close().await;
        Ok::<usize, StepFailure>(report.checked)
    });

    match result {
        Ok(checked) => CommandResult::success(
            "sync",
            format!("ensured vote records for {checked} catalog items"),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("sync", error_class, message, exit_code)
        }
    }
}
