//! Admin-action URLs for gateways and their SMSC links.
//!
//! The monitor never calls these itself; it hands them to the dashboard.

use reqwest::Url;

use crate::config::{ConfigError, InstanceConfig};

/// Gateway-wide admin commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Suspend,
    Isolate,
    Resume,
    FlushDlr,
    Shutdown,
    Restart,
    GracefulRestart,
}

impl AdminAction {
    pub const ALL: [AdminAction; 7] = [
        AdminAction::Suspend,
        AdminAction::Isolate,
        AdminAction::Resume,
        AdminAction::FlushDlr,
        AdminAction::Shutdown,
        AdminAction::Restart,
        AdminAction::GracefulRestart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdminAction::Suspend => "suspend",
            AdminAction::Isolate => "isolate",
            AdminAction::Resume => "resume",
            AdminAction::FlushDlr => "flush-dlr",
            AdminAction::Shutdown => "shutdown",
            AdminAction::Restart => "restart",
            AdminAction::GracefulRestart => "graceful-restart",
        }
    }
}

/// Per-link admin commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmscAction {
    Stop,
    Start,
    Remove,
    Add,
}

impl SmscAction {
    pub const ALL: [SmscAction; 4] = [
        SmscAction::Stop,
        SmscAction::Start,
        SmscAction::Remove,
        SmscAction::Add,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SmscAction::Stop => "stop-smsc",
            SmscAction::Start => "start-smsc",
            SmscAction::Remove => "remove-smsc",
            SmscAction::Add => "add-smsc",
        }
    }

    /// Short label for link lists.
    pub fn label(&self) -> &'static str {
        match self {
            SmscAction::Stop => "stop",
            SmscAction::Start => "start",
            SmscAction::Remove => "remove",
            SmscAction::Add => "add",
        }
    }
}

/// `{base_url}/{action}?password={admin_password}`
pub fn admin_url(instance: &InstanceConfig, action: AdminAction) -> Result<Url, ConfigError> {
    let mut url = instance.endpoint(action.as_str())?;
    url.query_pairs_mut()
        .append_pair("password", &instance.admin_password);
    Ok(url)
}

/// `{base_url}/{action}?smsc={admin_id}&password={admin_password}`
pub fn smsc_admin_url(
    instance: &InstanceConfig,
    action: SmscAction,
    admin_id: &str,
) -> Result<Url, ConfigError> {
    let mut url = instance.endpoint(action.as_str())?;
    url.query_pairs_mut()
        .append_pair("smsc", admin_id)
        .append_pair("password", &instance.admin_password);
    Ok(url)
}
