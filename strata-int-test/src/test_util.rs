use std::time::Instant;

use strata::config::SeedConfig;
use strata::errors::{ErrorKind, StrataError, StrataResult};
use strata::migration::{MigrationRegistry, MigrationRunner};
use strata::store::memory::InMemoryStore;
use strata::store::Store;

/// Runs `test` between `before` and `after`, reporting failures with
/// the test context id.
///
/// `after` runs even when the test fails. Tests run on the current thread.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> StrataResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> StrataResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> StrataResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    let start_time = Instant::now();

    let result = std::panic::catch_unwind(|| {
        let ctx = before().map_err(|e| format!("Before run failed: {:?}", e))?;
        let id = ctx.id().to_string();
        match test(ctx.clone()) {
            Ok(_) => after(ctx).map_err(|e| format!("[{}] After run failed: {:?}", id, e)),
            Err(e) => {
                let _ = after(ctx);
                Err(format!("[{}] Test failed: {:?}", id, e))
            }
        }
    });

    let elapsed = start_time.elapsed();
    match result {
        Ok(Ok(())) => log::debug!("Test passed in {:?}", elapsed),
        Ok(Err(e)) => {
            eprintln!("\n==================== TEST FAILED ====================");
            eprintln!("{}", e);
            eprintln!("=====================================================\n");
            panic!("Test failed after {:?}: {}", elapsed, e);
        }
        Err(panic_err) => {
            let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            panic!("Test panicked after {:?}: {}", elapsed, err_msg);
        }
    }
}

/// A fresh in-memory store plus the seed configuration used against it.
#[derive(Clone)]
pub struct TestContext {
    id: String,
    store: Store,
    config: SeedConfig,
}

impl TestContext {
    pub fn new(store: Store, config: SeedConfig) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            store,
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn store(&self) -> Store {
        self.store.clone()
    }

    pub fn config(&self) -> &SeedConfig {
        &self.config
    }

    /// Runner over this context's store with the bootstrap migrations.
    pub fn bootstrap_runner(&self) -> StrataResult<MigrationRunner> {
        let mut registry = MigrationRegistry::new();
        strata::migrations::register(&mut registry, &self.config)?;
        Ok(self.runner(registry))
    }

    pub fn runner(&self, registry: MigrationRegistry) -> MigrationRunner {
        MigrationRunner::new(self.store.clone(), registry)
    }
}

pub fn create_test_context() -> StrataResult<TestContext> {
    let config = SeedConfig::default()
        .with_admin_email("admin@strata.test")
        .with_admin_password("integration-secret");
    Ok(TestContext::new(InMemoryStore::new()?.into_store(), config))
}

/// Checks that no migration run left the lock behind.
pub fn cleanup(ctx: TestContext) -> StrataResult<()> {
    match ctx.store().migration_lock_holder()? {
        None => Ok(()),
        Some(holder) => Err(StrataError::new(
            &format!("Migration lock still held by {}", holder),
            ErrorKind::InternalError,
        )),
    }
}
