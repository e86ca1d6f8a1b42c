use task_pool::{SpawnResult, TaskPool};
use std::time::Instant;


fn main() -> SpawnResult<()> {
    env_logger::init();

    let now = Instant::now();
    let pool = TaskPool::default_pool()?;

    let handles = (0..100_000u64)
        .map(|i| pool.spawn(move || i * 2))
        .collect::<SpawnResult<Vec<_>>>()?;

    pool.set_num_threads(pool.num_threads() * 2)?;

    let mut sum = 0u64;
    for handle in handles {
        sum += handle.wait()?;
    }

    pool.shutdown();
    println!("sum: {}, elapsed: {:?}", sum, now.elapsed());
    Ok(())
}
