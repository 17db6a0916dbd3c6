use super::*;
use anyhow::{anyhow, Result};

/// Validate the complete configuration
pub fn validate_config(config: &FixtureConfig) -> Result<()> {
    validate_server(config)?;
    validate_network(config)?;

    if config.memory_limit == 0 {
        return Err(anyhow!("Memory limit must be greater than 0"));
    }

    if let Some(ref folder) = config.cert_folder {
        if folder.as_os_str().is_empty() {
            return Err(anyhow!("Certificate folder cannot be empty when set"));
        }
    }

    Ok(())
}

/// Validate server binary and command name
fn validate_server(config: &FixtureConfig) -> Result<()> {
    if config.server_bin.trim().is_empty() {
        return Err(anyhow!("Server binary path cannot be empty"));
    }

    let name = &config.server_name;
    if name.trim().is_empty() {
        return Err(anyhow!("Server command name cannot be empty"));
    }

    // `ps -C` matches the bare command name, never a path
    if name.contains('/') {
        return Err(anyhow!(
            "Server command name must not contain a path separator: {}",
            name
        ));
    }

    if name.chars().any(char::is_whitespace) {
        return Err(anyhow!("Server command name cannot contain whitespace: {:?}", name));
    }

    Ok(())
}

/// Validate addresses and port
fn validate_network(config: &FixtureConfig) -> Result<()> {
    if config.port == 0 {
        return Err(anyhow!("Port must be between 1 and 65535, got: {}", config.port));
    }

    if config.ipv4_addr.trim().is_empty() {
        return Err(anyhow!("IPv4 address cannot be empty"));
    }

    if config.ipv6_addr.trim().is_empty() {
        return Err(anyhow!("IPv6 address cannot be empty"));
    }

    Ok(())
}
