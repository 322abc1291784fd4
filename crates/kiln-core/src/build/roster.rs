//! The fixed agent roster used by orchestrated builds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{KilnError, Result};

/// Number of roles a roster must define.
pub const ROSTER_SIZE: u8 = 20;

/// Id of the agent that plans and integrates every build.
pub const MASTER_AGENT_ID: u8 = 20;

/// Maximum characters of a task prompt shown as `current_task`.
const TASK_PREVIEW_CHARS: usize = 50;

/// An immutable roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRole {
    pub id: u8,
    pub role: String,
    pub team: String,
}

impl AgentRole {
    pub fn new(id: u8, role: impl Into<String>, team: impl Into<String>) -> Self {
        Self {
            id,
            role: role.into(),
            team: team.into(),
        }
    }
}

const DEFAULT_ROLES: [(u8, &str, &str); 20] = [
    (1, "Project Structure Architect", "Architecture"),
    (2, "Framework Setup Specialist", "Architecture"),
    (3, "Dependency Manager", "Architecture"),
    (4, "UI Component Builder", "Frontend"),
    (5, "Screen & Layout Designer", "Frontend"),
    (6, "Interaction Logic Developer", "Frontend"),
    (7, "API Developer", "Backend"),
    (8, "Database Architect", "Backend"),
    (9, "Server Logic Specialist", "Backend"),
    (10, "Web Build Compiler", "Build"),
    (11, "Android Build Specialist", "Build"),
    (12, "iOS Build Specialist", "Build"),
    (13, "Syntax Validator", "Testing"),
    (14, "Runtime Tester", "Testing"),
    (15, "Feature Validator", "Testing"),
    (16, "Error Detector", "Debug"),
    (17, "Auto-Fix Engineer", "Debug"),
    (18, "Revalidation Specialist", "Debug"),
    (19, "Performance Optimizer", "Optimization"),
    (20, "Master Orchestrator", "Control"),
];

/// A validated set of 20 roles with ids `1..=20`, ordered by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Roster {
    roles: Vec<AgentRole>,
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            roles: DEFAULT_ROLES
                .iter()
                .map(|(id, role, team)| AgentRole::new(*id, *role, *team))
                .collect(),
        }
    }
}

impl Roster {
    /// Validates a roster override. Every id in `1..=20` must appear exactly once.
    pub fn new(mut roles: Vec<AgentRole>) -> Result<Self> {
        let ids: BTreeSet<u8> = roles.iter().map(|r| r.id).collect();
        let expected: BTreeSet<u8> = (1..=ROSTER_SIZE).collect();
        if roles.len() != usize::from(ROSTER_SIZE) || ids != expected {
            return Err(KilnError::config(format!(
                "roster must define ids 1..={} exactly once (got {} roles)",
                ROSTER_SIZE,
                roles.len()
            )));
        }
        if let Some(blank) = roles.iter().find(|r| r.role.trim().is_empty()) {
            return Err(KilnError::config(format!(
                "roster entry {} has an empty role",
                blank.id
            )));
        }
        roles.sort_by_key(|r| r.id);
        Ok(Self { roles })
    }

    pub fn get(&self, id: u8) -> Option<&AgentRole> {
        self.roles.iter().find(|r| r.id == id)
    }

    pub fn roles(&self) -> &[AgentRole] {
        &self.roles
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

impl<'de> Deserialize<'de> for Roster {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let roles = Vec::<AgentRole>::deserialize(deserializer)?;
        Roster::new(roles).map_err(serde::de::Error::custom)
    }
}

/// Lifecycle of one agent within a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Working,
    Completed,
    Error,
}

/// Observable per-build state of one roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: u8,
    pub role: String,
    pub team: String,
    pub status: AgentStatus,
    pub current_task: Option<String>,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl From<&AgentRole> for AgentDescriptor {
    fn from(role: &AgentRole) -> Self {
        Self {
            id: role.id,
            role: role.role.clone(),
            team: role.team.clone(),
            status: AgentStatus::Idle,
            current_task: None,
            output: None,
            error: None,
        }
    }
}

impl AgentDescriptor {
    /// Moves to `Working` with a shortened task preview.
    pub fn start(&mut self, task: &str) {
        let preview: String = task.chars().take(TASK_PREVIEW_CHARS).collect();
        self.status = AgentStatus::Working;
        self.current_task = Some(format!("{preview}..."));
    }

    pub fn complete(&mut self, output: impl Into<String>) {
        self.status = AgentStatus::Completed;
        self.output = Some(output.into());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = AgentStatus::Error;
        self.error = Some(error.into());
    }

    pub fn is_working(&self) -> bool {
        self.status == AgentStatus::Working
    }

    pub fn is_completed(&self) -> bool {
        self.status == AgentStatus::Completed
    }
}
