use clap::Args;
use simple_error::{SimpleResult, bail};

#[derive(Args, Default)]
pub struct SharedSettings {
    /// Number of threads to use for external alignment and sorting tools. Defaults to all logical
    /// cpus detected.
    ///
    /// Gap support evaluation itself always runs on a single thread.
    ///
    #[arg(long = "threads", global = true, value_name = "THREAD_COUNT")]
    thread_count_option: Option<usize>,

    /// This value will be filled in by thread_count_option
    #[arg(hide = true, default_value_t = 0)]
    pub thread_count: usize,

    /// Overwrite an existing output directory
    #[arg(long, global = true)]
    pub clobber: bool,

    /// Turn on extra debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

pub fn validate_and_fix_shared_settings(
    mut settings: SharedSettings,
) -> SimpleResult<SharedSettings> {
    settings.thread_count = match settings.thread_count_option {
        Some(count) => {
            if count == 0 {
                bail!("--threads argument must be greater than 0");
            }
            count
        }
        None => num_cpus::get(),
    };

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_count() {
        let settings = validate_and_fix_shared_settings(SharedSettings::default()).unwrap();
        assert!(settings.thread_count > 0);

        let settings = SharedSettings {
            thread_count_option: Some(3),
            ..Default::default()
        };
        let settings = validate_and_fix_shared_settings(settings).unwrap();
        assert_eq!(settings.thread_count, 3);

        let settings = SharedSettings {
            thread_count_option: Some(0),
            ..Default::default()
        };
        assert!(validate_and_fix_shared_settings(settings).is_err());
    }
}
