use gemchat_config::Config;

/// Strategy for displaying the effective configuration.
///
/// The API key is masked.
#[derive(Debug, Clone, Copy)]
pub struct InfoStrategy;

impl super::CommandStrategy for InfoStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        println!("=== gemchat Configuration ===\n");

        println!("Provider:");
        let api_key = config.require_api_key().map_or_else(|_| "(not set)".to_string(), mask_key);
        println!("  API key: {api_key}");
        println!("  Model: {}", config.provider.model);
        println!("  Base URL: {}", config.provider.base_url);
        println!();

        println!("Server:");
        println!("  Bind: {}", config.server.bind);
        println!();

        println!("Retry:");
        println!("  Max attempts: {}", config.retry.max_attempts);
        println!("  Rate-limit delay: {}s", config.retry.rate_limit_delay_secs);
        println!();

        println!("Sessions:");
        println!("  Idle TTL: {}s", config.session.idle_ttl_secs);
        println!("  Sweep interval: {}s", config.session.sweep_interval_secs);

        Ok(())
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "***".to_string()
    }
}
