use retail_sim_store::{SchemaSetup, SessionFactory, SqlitePool};

pub fn run(pool: &SqlitePool, reset: bool) -> anyhow::Result<()> {
    let mut session = pool.acquire()?;
    session.prepare_reference_tables(reset)?;
    session.prepare_receipt_tables(reset)?;
    println!(
        "Schema ready at {}{}",
        pool.config().path.display(),
        if reset { " (reset)" } else { "" }
    );
    Ok(())
}
