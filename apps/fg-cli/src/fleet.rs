// fleet.rs: In-memory demo fleet behind the executor boundary.
//
// Stands in for real infrastructure so `fleetgate run` can show a plan
// going all the way through the gateway. Seeded with a few services, one
// database, and three users (one per role).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use fg_actions::{
    ActionError, ActionHandler, BlockingHandler, HandlerError, HandlerRegistry, Params,
};

#[derive(Debug, Clone, Serialize)]
struct Service {
    id: String,
    name: String,
    status: String,
    health: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    restarted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
struct Database {
    id: String,
    name: String,
    status: String,
    size_mb: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_backup: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
struct User {
    id: String,
    name: String,
    email: String,
    role: String,
    locked: bool,
}

#[derive(Debug, Clone, Serialize)]
struct Alert {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    msg: String,
    severity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource_id: Option<String>,
    resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution_note: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct FleetState {
    services: BTreeMap<String, Service>,
    databases: BTreeMap<String, Database>,
    users: BTreeMap<String, User>,
    alerts: Vec<Alert>,
    audit: Vec<Value>,
}

impl FleetState {
    fn record(&mut self, event: &str, detail: Value) {
        self.audit.push(json!({
            "event": event,
            "at": Utc::now(),
            "detail": detail,
        }));
    }
}

#[derive(Debug, Default)]
pub struct DemoFleet {
    state: Mutex<FleetState>,
}

type Op = fn(&DemoFleet, &Params) -> Result<Value, HandlerError>;

impl DemoFleet {
    pub fn seeded() -> Self {
        let mut state = FleetState::default();
        for (id, name) in [
            ("auth", "Authentication Service"),
            ("payments", "Payments Service"),
            ("db", "Database Service"),
        ] {
            state.services.insert(
                id.to_string(),
                Service {
                    id: id.to_string(),
                    name: name.to_string(),
                    status: "running".to_string(),
                    health: "healthy".to_string(),
                    restarted_at: None,
                },
            );
        }
        state.databases.insert(
            "prod_db".to_string(),
            Database {
                id: "prod_db".to_string(),
                name: "Production Database".to_string(),
                status: "healthy".to_string(),
                size_mb: 1024,
                last_backup: None,
            },
        );
        for (id, role) in [("root", "superadmin"), ("alice", "admin"), ("bob", "junior")] {
            state.users.insert(
                id.to_string(),
                User {
                    id: id.to_string(),
                    name: capitalize(id),
                    email: format!("{}@fleet.local", id),
                    role: role.to_string(),
                    locked: false,
                },
            );
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Register a handler for every action in the fleet catalog.
    pub fn handlers(self: &Arc<Self>) -> Result<HandlerRegistry, ActionError> {
        let ops: [(&str, Op); 14] = [
            ("infra.restart", DemoFleet::restart_service),
            ("alert.resolve", DemoFleet::resolve_alert),
            ("alert.create", DemoFleet::create_alert),
            ("data.backup", DemoFleet::backup_database),
            ("data.restore", DemoFleet::restore_database),
            ("data.wipe", DemoFleet::wipe_database),
            ("security.rotate_keys", DemoFleet::rotate_keys),
            ("security.lock_account", DemoFleet::lock_account),
            ("security.unlock_account", DemoFleet::unlock_account),
            ("security.audit_log", DemoFleet::audit_log),
            ("user.create", DemoFleet::create_user),
            ("user.revoke", DemoFleet::revoke_user),
            ("user.change_role", DemoFleet::change_role),
            ("user.reset_password", DemoFleet::reset_password),
        ];

        let mut registry = HandlerRegistry::new();
        for (action, op) in ops {
            registry.register(action, bind(self, op))?;
        }
        Ok(registry)
    }

    fn lock(&self) -> Result<MutexGuard<'_, FleetState>, HandlerError> {
        self.state
            .lock()
            .map_err(|_| HandlerError::Failed("fleet state lock poisoned".into()))
    }

    fn restart_service(&self, p: &Params) -> Result<Value, HandlerError> {
        let id = required_str(p, "service_id")?;
        let mut state = self.lock()?;
        let service = state
            .services
            .get_mut(id)
            .ok_or_else(|| not_found("service", id))?;
        service.status = "running".to_string();
        service.health = "healthy".to_string();
        service.restarted_at = Some(Utc::now());
        let snapshot = service.clone();
        state.record("infra.restarted", json!({"service_id": id}));
        Ok(json!({
            "status": "success",
            "message": format!("Service '{}' restarted", id),
            "service": snapshot,
        }))
    }

    fn resolve_alert(&self, p: &Params) -> Result<Value, HandlerError> {
        let id = required_str(p, "alert_id")?;
        let note = required_str(p, "resolution_note")?;
        let mut state = self.lock()?;
        let alert = state
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| not_found("alert", id))?;
        if alert.resolved {
            return Err(HandlerError::Conflict(format!("alert {} already resolved", id)));
        }
        alert.resolved = true;
        alert.resolution_note = Some(note.to_string());
        let snapshot = alert.clone();
        state.record("alert.resolved", json!({"alert_id": id}));
        Ok(json!({"status": "resolved", "alert": snapshot}))
    }

    fn create_alert(&self, p: &Params) -> Result<Value, HandlerError> {
        let mut state = self.lock()?;
        let alert = Alert {
            id: format!("alert_{}", state.alerts.len() + 1),
            kind: required_str(p, "type")?.to_string(),
            msg: required_str(p, "msg")?.to_string(),
            severity: required_str(p, "severity")?.to_string(),
            resource_id: optional_str(p, "resource_id").map(str::to_string),
            resolved: false,
            resolution_note: None,
            created_at: Utc::now(),
        };
        state.alerts.push(alert.clone());
        state.record("alert.created", json!({"alert_id": alert.id}));
        Ok(json!({"status": "created", "alert": alert}))
    }

    fn backup_database(&self, p: &Params) -> Result<Value, HandlerError> {
        let id = required_str(p, "db_id")?;
        let mut state = self.lock()?;
        let db = state
            .databases
            .get_mut(id)
            .ok_or_else(|| not_found("database", id))?;
        let now = Utc::now();
        db.last_backup = Some(now);
        let backup_id = format!("bk_{}_{}", id, now.format("%Y%m%d%H%M%S"));
        state.record("data.backed_up", json!({"db_id": id, "backup_id": backup_id}));
        Ok(json!({"status": "success", "db_id": id, "backup_id": backup_id, "timestamp": now}))
    }

    fn restore_database(&self, p: &Params) -> Result<Value, HandlerError> {
        let id = required_str(p, "db_id")?;
        let backup_id = required_str(p, "backup_id")?;
        let mut state = self.lock()?;
        let db = state
            .databases
            .get_mut(id)
            .ok_or_else(|| not_found("database", id))?;
        db.status = "healthy".to_string();
        state.record("data.restored", json!({"db_id": id, "backup_id": backup_id}));
        Ok(json!({"status": "restored", "db_id": id}))
    }

    fn wipe_database(&self, p: &Params) -> Result<Value, HandlerError> {
        let id = required_str(p, "db_id")?;
        if !p.get("confirm").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(json!({"status": "aborted", "reason": "Confirmation required"}));
        }
        let mut state = self.lock()?;
        let db = state
            .databases
            .get_mut(id)
            .ok_or_else(|| not_found("database", id))?;
        db.size_mb = 0;
        db.status = "empty".to_string();
        state.record("data.wiped", json!({"db_id": id}));
        Ok(json!({"status": "wiped", "db_id": id}))
    }

    fn rotate_keys(&self, p: &Params) -> Result<Value, HandlerError> {
        let target = required_str(p, "target_id")?;
        let key = uuid::Uuid::new_v4().simple().to_string();
        let mut state = self.lock()?;
        state.record("security.keys_rotated", json!({"target_id": target}));
        Ok(json!({
            "status": "rotated",
            "target_id": target,
            "new_key_hint": format!("{}***", &key[..4]),
        }))
    }

    fn lock_account(&self, p: &Params) -> Result<Value, HandlerError> {
        self.set_locked(p, true)
    }

    fn unlock_account(&self, p: &Params) -> Result<Value, HandlerError> {
        self.set_locked(p, false)
    }

    fn set_locked(&self, p: &Params, locked: bool) -> Result<Value, HandlerError> {
        let id = required_str(p, "user_id")?;
        let mut state = self.lock()?;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| not_found("user", id))?;
        user.locked = locked;
        let (event, status) = if locked {
            ("security.account_locked", "locked")
        } else {
            ("security.account_unlocked", "unlocked")
        };
        state.record(event, json!({"user_id": id}));
        Ok(json!({"status": status, "user_id": id}))
    }

    fn audit_log(&self, p: &Params) -> Result<Value, HandlerError> {
        let limit = p.get("limit").and_then(Value::as_u64).unwrap_or(50) as usize;
        let state = self.lock()?;
        let skip = state.audit.len().saturating_sub(limit);
        Ok(json!({"logs": &state.audit[skip..]}))
    }

    fn create_user(&self, p: &Params) -> Result<Value, HandlerError> {
        let id = required_str(p, "user_id")?;
        let mut state = self.lock()?;
        if state.users.contains_key(id) {
            return Err(HandlerError::Conflict(format!("user {} already exists", id)));
        }
        let user = User {
            id: id.to_string(),
            name: required_str(p, "name")?.to_string(),
            email: required_str(p, "email")?.to_string(),
            role: optional_str(p, "role").unwrap_or("junior").to_string(),
            locked: false,
        };
        state.users.insert(id.to_string(), user.clone());
        state.record("user.created", json!({"user_id": id, "by": p.get("agent_id")}));
        Ok(json!({"status": "created", "user": user}))
    }

    fn revoke_user(&self, p: &Params) -> Result<Value, HandlerError> {
        let id = required_str(p, "user_id")?;
        let mut state = self.lock()?;
        state.users.remove(id).ok_or_else(|| not_found("user", id))?;
        state.record("user.revoked", json!({"user_id": id, "by": p.get("agent_id")}));
        Ok(json!({"status": "revoked", "user_id": id}))
    }

    fn change_role(&self, p: &Params) -> Result<Value, HandlerError> {
        let id = required_str(p, "user_id")?;
        let role = required_str(p, "new_role")?;
        let mut state = self.lock()?;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| not_found("user", id))?;
        let old_role = std::mem::replace(&mut user.role, role.to_string());
        state.record(
            "user.role_changed",
            json!({"user_id": id, "from": old_role, "to": role}),
        );
        Ok(json!({"status": "updated", "user_id": id, "old_role": old_role, "new_role": role}))
    }

    fn reset_password(&self, p: &Params) -> Result<Value, HandlerError> {
        let id = required_str(p, "user_id")?;
        let mut state = self.lock()?;
        if !state.users.contains_key(id) {
            return Err(not_found("user", id));
        }
        state.record("user.password_reset", json!({"user_id": id}));
        Ok(json!({"status": "reset", "user_id": id}))
    }
}

fn bind(fleet: &Arc<DemoFleet>, op: Op) -> Arc<dyn ActionHandler> {
    let fleet = fleet.clone();
    Arc::new(BlockingHandler::new(move |p: &Params| op(&fleet, p)))
}

fn required_str<'a>(p: &'a Params, name: &str) -> Result<&'a str, HandlerError> {
    optional_str(p, name).ok_or_else(|| HandlerError::InvalidInput(format!("missing {}", name)))
}

fn optional_str<'a>(p: &'a Params, name: &str) -> Option<&'a str> {
    p.get(name).and_then(Value::as_str)
}

fn not_found(kind: &str, id: &str) -> HandlerError {
    HandlerError::NotFound {
        kind: kind.to_string(),
        id: id.to_string(),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
