use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# quotedeck configuration

# Directory for the quote store (default: platform data dir + /quotedeck)
# data_dir: ~/.local/share/quotedeck

remote:
  # Base URL of the posts endpoint
  server_url: https://jsonplaceholder.typicode.com
  # Items requested per fetch
  fetch_limit: 10

sync:
  # Sync after add/remove/import
  auto_sync: false
  # Seconds between cycles in 'quotedeck sync watch'
  interval_secs: 20
  # remote-wins or manual
  conflict_policy: remote-wins
"#;

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        cli_config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!();

                        println!("remote.server_url: {}", config.server_url.value);
                        println!("  source: {}", config.server_url.source);
                        println!("remote.fetch_limit: {}", config.fetch_limit);
                        println!();

                        println!("sync.auto_sync: {}", config.sync.auto_sync);
                        println!("sync.interval_secs: {}", config.sync.interval_secs);
                        println!(
                            "sync.conflict_policy: {}",
                            serde_json::to_value(config.sync.conflict_policy)?
                                .as_str()
                                .unwrap_or_default()
                        );
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = cli_config_path.unwrap_or_else(Config::default_config_path);

                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'quotedeck config show' to view current configuration.");
                    return Ok(());
                }

                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(&config_path)?;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSource;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, DEFAULT_CONFIG).unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.server_url.source, ConfigSource::File);
        assert_eq!(config.fetch_limit, 10);
        assert_eq!(config.sync.interval_secs, 20);
    }

    #[test]
    fn test_init_writes_to_given_path() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.yaml");
        let config = Config::load(Some(config_path.clone())).unwrap();

        let cmd = ConfigCommand {
            command: ConfigSubcommand::Init,
        };
        cmd.run(&config, Some(config_path.clone())).unwrap();

        assert_eq!(fs::read_to_string(&config_path).unwrap(), DEFAULT_CONFIG);
    }
}
