// ABOUTME: Config scaffolding for new fleets.
// ABOUTME: Creates fleetup.yml template files.

use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::rollout::Backoff;

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let yaml = generate_template_yaml(&Config::template());
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn millis(d: Duration) -> String {
    format!("{}ms", d.as_millis())
}

fn backoff_yaml(indent: &str, name: &str, b: &Backoff) -> String {
    format!(
        "{indent}{name}:\n{indent}  duration: {}\n{indent}  factor: {}\n{indent}  jitter: {}\n{indent}  steps: {}\n",
        millis(b.duration),
        b.factor,
        b.jitter,
        b.steps
    )
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"contracts:
  # The only contract upgrades may move the fleet to
  supported: {}
  # Contract that cannot handle several instances of one provider
  legacy: {}
webhook_namespace: {}
state: {}
releases: {}
drain:
{}{}{}"#,
        config.contracts.supported,
        config.contracts.legacy,
        config.webhook_namespace,
        config.state.display(),
        config.releases.display(),
        backoff_yaml("  ", "write", &config.drain.write),
        backoff_yaml("  ", "scale_to_zero", &config.drain.scale_to_zero),
        backoff_yaml("", "fetch", &config.fetch),
    )
}
