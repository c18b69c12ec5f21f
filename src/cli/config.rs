use crate::config::Config;
use std::fs;
use std::path::PathBuf;

/// Generate a starter config file from the built-in defaults.
pub fn init(stdout: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_content = render_default_config()?;

    if stdout {
        print!("{}", config_content);
        return Ok(());
    }

    let config_path = match dirs::home_dir() {
        Some(home_dir) => home_dir.join(".config/flightlake/config.yml"),
        None => PathBuf::from("/etc/flightlake/config.yml"),
    };

    if config_path.exists() {
        eprintln!(
            "Error: config file already exists at {}",
            config_path.display()
        );
        eprintln!("Remove it first or use --stdout to print the config");
        std::process::exit(1);
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&config_path, config_content)?;

    println!("Config file written to {}", config_path.display());
    Ok(())
}

fn render_default_config() -> Result<String, serde_yaml::Error> {
    let yaml = serde_yaml::to_string(&Config::default())?;
    Ok(format!(
        "# flightlake configuration\n\
         # Paths may start with ~; string values may reference environment\n\
         # variables with the $env syntax.\n\
         {}",
        yaml
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_rendered_default_config_parses_back() {
        let yaml = render_default_config().unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.replicator.batch_size, 10_000);
        assert_eq!(parsed.operational.table, "routes_ops");
    }
}
