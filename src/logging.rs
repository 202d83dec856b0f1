use tracing_subscriber::{fmt, EnvFilter};

/// Logs go to stderr; stdout carries protocol traffic only.
pub fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn default_directive(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "info"
    }
}

#[cfg(test)]
mod tests {
    use super::default_directive;

    #[test]
    fn debug_flag_lowers_the_default_level() {
        assert_eq!(default_directive(true), "debug");
        assert_eq!(default_directive(false), "info");
    }
}
