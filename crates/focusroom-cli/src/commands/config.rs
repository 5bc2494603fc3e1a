use clap::Subcommand;
use focusroom_core::{ConfigError, Settings};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "timer.work_duration", "notifications.sound_volume")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List {
        /// Print the whole document as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let settings = Settings::load()?;
            let value = settings
                .get(&key)
                .ok_or_else(|| ConfigError::UnknownKey(key.clone()))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut settings = Settings::load()?;
            settings.set(&key, &value)?;
            settings.save()?;
            println!("ok");
        }
        ConfigAction::List { json } => {
            let settings = Settings::load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                for (key, value) in settings.entries() {
                    println!("{key} = {value}");
                }
            }
        }
        ConfigAction::Reset => {
            let settings = Settings::default();
            settings.save()?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}
