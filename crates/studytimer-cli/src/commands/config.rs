//! `config.toml` inspection and editing.
//!
//! Keys are dotted paths into the file's sections: `timer.*` (session and
//! rest lengths), `storage.*` (open timeout, memory-only mode), `tags.*`
//! (default tag list) and `notifications.*` (sound and terminal bell).

use clap::Subcommand;
use studytimer_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value
    Get {
        /// Dotted key, e.g. "timer.total_minutes" or "storage.force_memory"
        key: String,
    },
    /// Change one value and save; rejected if the timer could not run with it
    Set {
        /// Dotted key, e.g. "timer.rest_max_minutes"
        key: String,
        /// New value; "tags.defaults" takes a comma-separated list
        value: String,
    },
    /// Print the whole configuration
    List {
        /// Print as TOML, the on-disk format, instead of JSON
        #[arg(long)]
        toml: bool,
    },
    /// Overwrite the file with the default session, rest and tag settings
    Reset,
    /// Print where the config file lives
    Path,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            // Echo the stored form, e.g. a trimmed list or a parsed number.
            let stored = config.get(&key).unwrap_or(value);
            println!("{key} = {stored}");
        }
        ConfigAction::List { toml } => {
            let config = Config::load()?;
            if toml {
                print!("{}", toml::to_string_pretty(&config)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("defaults written to {}", Config::path()?.display());
        }
        ConfigAction::Path => println!("{}", Config::path()?.display()),
    }
    Ok(())
}
