//! `migrate` subcommand.

use sea_orm::DbErr;

use crate::cli::args::{MigrateAction, MigrateArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::Database;

/// Connect without applying migrations, then run the requested action.
pub async fn execute(args: MigrateArgs, config: Config) -> AppResult<()> {
    let db = Database::connect_without_migrations(&config)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;

    run(&db, args.action).await
}

/// Apply one migration action to an open database.
pub async fn run(db: &Database, action: MigrateAction) -> AppResult<()> {
    let outcome = match action {
        MigrateAction::Status => return print_status(db).await,
        MigrateAction::Up => db.run_migrations().await,
        MigrateAction::Down => db.rollback_migration().await,
        MigrateAction::Fresh => {
            tracing::warn!("Dropping all tables before re-applying migrations");
            db.fresh_migrations().await
        }
    };

    outcome.map_err(|e| failed(action, e))?;
    tracing::info!(?action, "Migration finished");
    Ok(())
}

/// One `name: applied|pending` line per known migration.
async fn print_status(db: &Database) -> AppResult<()> {
    let status = db
        .migration_status()
        .await
        .map_err(|e| failed(MigrateAction::Status, e))?;

    for (name, applied) in &status {
        println!("{}: {}", name, if *applied { "applied" } else { "pending" });
    }

    let pending = status.iter().filter(|(_, applied)| !applied).count();
    tracing::info!(total = status.len(), pending, "Migration status");
    Ok(())
}

fn failed(action: MigrateAction, err: DbErr) -> AppError {
    AppError::internal(format!("Migration {:?} failed: {}", action, err))
}
