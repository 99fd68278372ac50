use anyhow::Result;
use outcall_config::Config;

pub fn check_config(config: &Config) -> Result<()> {
    let url = config.collector_url();
    if !matches!(url.scheme(), "http" | "https") {
        anyhow::bail!(
            "collector url must use http or https, got \"{}\"",
            url.scheme()
        );
    }

    if url.host_str().is_none() {
        anyhow::bail!("collector url \"{url}\" has no host");
    }

    if config.http_timeout().is_zero() {
        anyhow::bail!("`collector.timeout` must be greater than zero");
    }

    if config.http_connection_timeout().is_zero() {
        anyhow::bail!("`collector.connection_timeout` must be greater than zero");
    }

    Ok(())
}

/// Print start-up infos to the log.
pub fn dump_start_infos(config: &Config) {
    if config.path().as_os_str().is_empty() {
        outcall_log::info!("starting capture without config folder");
    } else {
        outcall_log::info!(
            "starting capture from config folder {}",
            config.path().display()
        );
    }

    outcall_log::info!("  collector: {}", config.collector_url());
    outcall_log::info!("  log body: {}", config.log_body());
    outcall_log::debug!("  debug: {}", config.debug());
    outcall_log::debug!(
        "  timeouts: {}s, connect {}s",
        config.http_timeout().as_secs(),
        config.http_connection_timeout().as_secs()
    );
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config(collector: serde_json::Value) -> Config {
        Config::from_json_value(json!({
            "application_id": "app-1",
            "collector": collector,
        }))
        .unwrap()
    }

    #[test]
    fn test_check_default_config() {
        let config = Config::from_json_value(json!({"application_id": "app-1"})).unwrap();
        assert!(check_config(&config).is_ok());
    }

    #[test]
    fn test_check_config_scheme() {
        let config = config(json!({"url": "ftp://collector.example.com"}));
        let error = check_config(&config).unwrap_err();
        assert_eq!(
            error.to_string(),
            "collector url must use http or https, got \"ftp\""
        );
    }

    #[test]
    fn test_check_config_timeout() {
        let config = config(json!({"timeout": 0}));
        assert!(check_config(&config).is_err());
    }

    #[test]
    fn test_check_config_connection_timeout() {
        let config = config(json!({"connection_timeout": 0}));
        let error = check_config(&config).unwrap_err();
        assert_eq!(
            error.to_string(),
            "`collector.connection_timeout` must be greater than zero"
        );
    }
}
