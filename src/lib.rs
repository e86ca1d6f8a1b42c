//! Пул потоков фиксированного размера с future-based результатами
//! 
//! # Features
//! - Общая FIFO очередь, опционально ограниченная (отказ `QueueFull` вместо блокировки)
//! - Задачи с результатом, с ошибкой и fire-and-forget
//! - Изменение числа воркеров на лету без потери задач
//! - Graceful shutdown: очередь дорабатывается до конца
//! - Паники задач не останавливают воркеры

pub mod config;
pub mod errors;
pub mod handle;
pub mod pool;
pub mod result;

pub use config::Config;
pub use errors::SpawnError;
pub use handle::{HandleState, JoinHandle, SharedHandle};
pub use pool::TaskPool;
pub use result::SpawnResult;
