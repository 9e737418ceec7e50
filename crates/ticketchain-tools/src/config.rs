//! Chain parameter loading.

use anyhow::{Context, Result};
use std::path::Path;
use ticketchain_consensus::{ChainParams, ChainParamsConfig, Network};

/// Load parameters from an optional TOML file.
///
/// Without a file the preset of `network` (mainnet by default) is used. With
/// a file, `network` replaces the base network named in it.
pub fn load_params(config_path: Option<&Path>, network: Option<Network>) -> Result<ChainParams> {
    let Some(path) = config_path else {
        return Ok(ChainParams::for_network(network.unwrap_or_default()));
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let mut config: ChainParamsConfig =
        toml::from_str(&content).context("Failed to parse config file")?;
    if let Some(network) = network {
        config.network = network;
    }
    ChainParams::from_config(&config).context("Invalid chain parameters")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_preset_without_file() {
        let params = load_params(None, None).unwrap();
        assert_eq!(params.network, Network::Mainnet);
        let params = load_params(None, Some(Network::Simnet)).unwrap();
        assert_eq!(params.network, Network::Simnet);
    }

    #[test]
    fn test_file_overrides() {
        let file = write_config(
            r#"
network = "testnet"
target_time_per_block = 60

[tickets]
tickets_per_block = 3
"#,
        );
        let params = load_params(Some(file.path()), None).unwrap();
        assert_eq!(params.network, Network::Testnet);
        assert_eq!(params.target_time_per_block, 60);
        assert_eq!(params.tickets.tickets_per_block, 3);

        let params = load_params(Some(file.path()), Some(Network::Simnet)).unwrap();
        assert_eq!(params.network, Network::Simnet);
    }

    #[test]
    fn test_invalid_file() {
        let file = write_config("retarget_adjustment_factor = 0\n");
        let err = load_params(Some(file.path()), None).unwrap_err();
        assert!(format!("{:#}", err).contains("retarget_adjustment_factor"));

        assert!(load_params(Some(Path::new("/nonexistent/ticketchain.toml")), None).is_err());
    }
}
