use gemchat_config::{API_KEY_ENV, Config};

/// Strategy for initializing the configuration.
///
/// Creates the default configuration file at `~/gemchat/config.json`.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config_path = Config::create_config()?;

        println!("✅ Created config file at: {}", config_path.display());
        println!();
        println!("📝 Next steps:");
        println!("   1. Put {API_KEY_ENV}=<your key> in the environment or a .env file");
        println!("   2. Run 'gemchat serve' and open the printed address");
        println!();
        Ok(())
    }
}
