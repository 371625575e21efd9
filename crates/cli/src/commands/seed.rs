use crate::commands::{bootstrap, CommandResult};
use shopfront_db::repositories::{SqlCategoryRepository, SqlProductRepository};
use shopfront_db::{connect_with_settings, migrations, SeedDataset};

pub fn run() -> CommandResult {
    let (config, runtime) = match bootstrap("seed") {
        Ok(parts) => parts,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let dataset = SeedDataset::demo();
        let products = SqlProductRepository::new(pool.clone());
        let categories = SqlCategoryRepository::new(pool.clone());
        let created = dataset
            .apply(&products, &categories)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 6u8))?;

        let total = dataset.products.len();
        pool.close().await;
        Ok::<String, (&'static str, String, u8)>(seed_summary(created, total))
    });

    match result {
        Ok(message) => CommandResult::success("seed", message),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

fn seed_summary(created: usize, total: usize) -> String {
    if created == 0 {
        format!("demo catalog already present ({total} products); nothing to do")
    } else {
        format!("seeded {created} of {total} demo products")
    }
}
