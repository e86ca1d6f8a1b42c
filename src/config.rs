use super::{
    errors::SpawnError,
    result::SpawnResult,
};


/// Конфигурация пула потоков
#[derive(Debug, Clone)]
pub struct Config {
    pub num_threads: usize,
    /// `None` - очередь без ограничения
    pub max_pending: Option<usize>,
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: num_cpus::get(),
            max_pending: None,
            thread_name_prefix: "task-pool".to_string(),
            stack_size: None,
        }
    }
}

impl Config {
    pub fn cpu_bound() -> Self {
        let num_cpus = num_cpus::get();
        Self {
            num_threads: num_cpus,
            max_pending: Some(num_cpus * 1024),
            ..Default::default()
        }
    }

    pub fn io_bound() -> Self {
        Self {
            num_threads: num_cpus::get() * 2,
            max_pending: None,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> SpawnResult<()> {
        check_num_threads(self.num_threads)?;
        if self.max_pending == Some(0) {
            return Err(SpawnError::InvalidConfiguration(
                "max_pending must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[inline]
pub(crate) fn check_num_threads(num_threads: usize) -> SpawnResult<()> {
    if num_threads == 0 {
        return Err(SpawnError::InvalidConfiguration(
            "need at least 1 worker thread".into(),
        ));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_uses_hardware_threads() {
        let config = Config::default();
        assert_eq!(config.num_threads, num_cpus::get());
        assert!(config.max_pending.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn presets_are_valid() {
        assert!(Config::cpu_bound().validate().is_ok());
        assert!(Config::io_bound().validate().is_ok());
        assert_eq!(Config::io_bound().num_threads, num_cpus::get() * 2);
    }

    #[test]
    fn zero_threads_rejected() {
        let config = Config { num_threads: 0, ..Default::default() };
        assert!(matches!(
            config.validate(),
            Err(SpawnError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn zero_queue_bound_rejected() {
        let config = Config { max_pending: Some(0), ..Default::default() };
        assert!(matches!(
            config.validate(),
            Err(SpawnError::InvalidConfiguration(_))
        ));
    }
}
