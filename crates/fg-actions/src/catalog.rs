// catalog.rs: Built-in fleet administration actions.

use crate::definition::{ActionDefinition, ParamType};

/// The standard action catalog for a managed fleet: services, alerts,
/// databases, credentials, and users.
pub fn fleet_catalog() -> Vec<ActionDefinition> {
    use ParamType::{Boolean, Integer, String};

    vec![
        ActionDefinition::new("infra.restart", "Restart a service by ID")
            .param("service_id", String)
            .optional("user_email", String),
        ActionDefinition::new("alert.resolve", "Resolve an alert by ID")
            .param("alert_id", String)
            .param("resolution_note", String)
            .optional("user_email", String),
        ActionDefinition::new("alert.create", "Raise a new alert")
            .param("type", String)
            .param("msg", String)
            .param("severity", String)
            .optional("resource_id", String),
        ActionDefinition::new("data.backup", "Create a backup of a database")
            .param("db_id", String),
        ActionDefinition::new("data.restore", "Restore a database from backup")
            .param("db_id", String)
            .param("backup_id", String),
        ActionDefinition::new("data.wipe", "Wipe all data from a database")
            .param("db_id", String)
            .param("confirm", Boolean),
        ActionDefinition::new("security.rotate_keys", "Rotate API keys for a service or user")
            .param("target_id", String),
        ActionDefinition::new("security.lock_account", "Lock a user account")
            .param("user_id", String),
        ActionDefinition::new("security.unlock_account", "Unlock a user account")
            .param("user_id", String),
        ActionDefinition::new("security.audit_log", "Fetch recent security audit entries")
            .optional("limit", Integer),
        ActionDefinition::new("user.create", "Create a new user")
            .param("agent_id", String)
            .param("user_id", String)
            .param("name", String)
            .param("email", String)
            .optional("role", String),
        ActionDefinition::new("user.revoke", "Revoke (delete) a user")
            .param("agent_id", String)
            .param("user_id", String),
        ActionDefinition::new("user.change_role", "Change a user's role")
            .param("agent_id", String)
            .param("user_id", String)
            .param("new_role", String),
        ActionDefinition::new("user.reset_password", "Reset a user's password")
            .param("agent_id", String)
            .param("user_id", String),
    ]
}
