//! Command handlers for the longread CLI

use std::sync::Arc;
use std::time::Duration;

use longread_ble::open_radios;
use longread_core::{
    Coordinator, DeviceInfoProvider, DiscoveredIdentity, HostDeviceInfo, IdentityRecord,
    PermissionPolicy, StartOutcome, StaticPermissionGate,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::Commands;
use crate::config::AppConfig;
use crate::error::{CliError, Result};

/// One discovered peer as printed by `run`
#[derive(Serialize)]
struct FoundPeer<'a> {
    address: &'a str,
    name: Option<&'a str>,
    rssi: Option<i16>,
    identity: &'a IdentityRecord,
}

/// Command dispatcher for handling CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI command
    pub async fn execute(command: Commands, config: AppConfig) -> Result<()> {
        match command {
            Commands::Run { duration } => {
                Self::handle_run_command(config, duration.map(Duration::from_secs)).await
            }
            Commands::Permissions { api_level } => {
                let level = api_level.unwrap_or(config.platform.api_level);
                for line in permission_report(level) {
                    println!("{}", line);
                }
                Ok(())
            }
            Commands::Identity => {
                println!("{}", identity_json(&config)?);
                Ok(())
            }
        }
    }

    /// Run the identity exchange until Ctrl-C or the optional duration elapses
    async fn handle_run_command(config: AppConfig, duration: Option<Duration>) -> Result<()> {
        let (central, peripheral) = open_radios(&config.ble).await?;
        let (coordinator, mut identities) = Coordinator::new(
            central,
            peripheral,
            Arc::new(StaticPermissionGate::new(config.platform.permissions_granted)),
            Arc::new(HostDeviceInfo::new(config.engine.identity.clone())),
            &config.engine,
            config.platform.api_level,
        )?;

        match coordinator.start().await? {
            StartOutcome::Started { advertising } => {
                info!(advertising, "Identity exchange running");
            }
            StartOutcome::PermissionsRequested => {
                coordinator.cleanup().await;
                let missing = coordinator
                    .permission_policy()
                    .identifiers()
                    .into_iter()
                    .map(String::from)
                    .collect();
                return Err(CliError::PermissionsMissing(missing));
            }
        }

        let deadline = async {
            match duration {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        let result = loop {
            tokio::select! {
                found = identities.recv() => match found {
                    Some(found) => {
                        if let Err(e) = print_found_peer(&found) {
                            break Err(e);
                        }
                    }
                    None => break Ok(()),
                },
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        warn!("Failed to listen for Ctrl-C: {}", e);
                    }
                    info!("Interrupted, shutting down");
                    break Ok(());
                }
                _ = &mut deadline => {
                    info!("Run duration elapsed, shutting down");
                    break Ok(());
                }
            }
        };

        coordinator.cleanup().await;
        result
    }
}

fn print_found_peer(found: &DiscoveredIdentity) -> Result<()> {
    let line = serde_json::to_string(&FoundPeer {
        address: &found.address,
        name: found.name.as_deref(),
        rssi: found.rssi,
        identity: &found.identity,
    })?;
    println!("{}", line);
    Ok(())
}

/// Lines describing the permission policy for a platform version
pub fn permission_report(api_level: u32) -> Vec<String> {
    let policy = PermissionPolicy::for_api_level(api_level);
    let mut lines = vec![format!("API level {}: {:?}", api_level, policy)];
    lines.extend(policy.identifiers().into_iter().map(|id| format!("  {}", id)));
    lines
}

/// Pretty-printed identity record this device would serve right now
pub fn identity_json(config: &AppConfig) -> Result<String> {
    let info = HostDeviceInfo::new(config.engine.identity.clone()).device_info();
    let record = IdentityRecord::synthesize(
        config.engine.identity.sequence,
        config.engine.identity.privacy_level,
        info,
    );
    Ok(serde_json::to_string_pretty(&record)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_report_lists_identifiers() {
        let report = permission_report(33);
        assert_eq!(report[0], "API level 33: NearbyDevices");
        assert!(report
            .iter()
            .any(|line| line.trim() == "android.permission.BLUETOOTH_SCAN"));
    }

    #[test]
    fn test_permission_report_for_legacy_platform() {
        let report = permission_report(21);
        assert_eq!(report[0], "API level 21: InstallTime");
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_identity_json_uses_configured_values() {
        let mut config = AppConfig::default();
        config.engine.identity.device_name = "Field Unit 7".to_string();
        config.engine.identity.os_version = Some("14".to_string());

        let json = identity_json(&config).unwrap();
        let record = IdentityRecord::from_json(&json).unwrap();

        assert_eq!(record.device_name, "Field Unit 7");
        assert_eq!(record.os_version, "14");
        assert_eq!(record.sequence, 1);
        assert_eq!(record.privacy_level, 1);
    }
}
