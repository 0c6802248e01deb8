//! Robot store: CRUD access to the `robot` table on top of the request executors
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::db::binder::{self, no_params};
use crate::core::db::logger::{QueryLogger, TracingLogger};
use crate::core::db::pool::ConnectionProvider;
use crate::core::db::request::RequestExecutor;
use crate::core::{DataAccessError, Result};

const ROBOT_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS robot (
    robotID INTEGER PRIMARY KEY AUTOINCREMENT,
    robot TEXT NOT NULL UNIQUE,
    host TEXT NOT NULL DEFAULT '',
    port TEXT NOT NULL DEFAULT '',
    platform TEXT NOT NULL DEFAULT '',
    active BOOLEAN NOT NULL DEFAULT 1,
    description TEXT NOT NULL DEFAULT '',
    dateCreated TEXT NOT NULL
)"#;

const ROBOT_COLUMNS: &str = "robotID, robot, host, port, platform, active, description, dateCreated";

/// Columns a criteria search may sort on.
const SORTABLE_COLUMNS: [&str; 6] = ["robotID", "robot", "host", "platform", "active", "description"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Robot {
    pub robot_id: i64,
    pub robot: String,
    pub host: String,
    pub port: String,
    pub platform: String,
    pub active: bool,
    pub description: String,
    pub date_created: String,
}

impl Robot {
    pub fn new(robot: &str, host: &str, port: &str) -> Self {
        Self {
            robot_id: 0, // Will be set by database
            robot: robot.to_string(),
            host: host.to_string(),
            port: port.to_string(),
            platform: String::new(),
            active: true,
            description: String::new(),
            date_created: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Robot {
            robot_id: row.get("robotID")?,
            robot: row.get("robot")?,
            host: row.get("host")?,
            port: row.get("port")?,
            platform: row.get("platform")?,
            active: row.get("active")?,
            description: row.get("description")?,
            date_created: row.get("dateCreated")?,
        })
    }
}

/// Paging, sorting and filtering for [`RobotStore::read_by_criteria`].
#[derive(Debug, Clone, Default)]
pub struct RobotCriteria {
    pub start: usize,
    /// Maximum number of robots returned, 0 for no limit
    pub length: usize,
    pub sort_column: Option<String>,
    pub descending: bool,
    /// Substring matched against robot name, host and description
    pub search: Option<String>,
}

pub struct RobotStore<P, L = TracingLogger> {
    executor: RequestExecutor<P, L>,
}

impl<P: ConnectionProvider> RobotStore<P, TracingLogger> {
    pub fn new(provider: P) -> Self {
        Self::with_executor(RequestExecutor::new(provider))
    }
}

impl<P: ConnectionProvider, L: QueryLogger> RobotStore<P, L> {
    pub fn with_executor(executor: RequestExecutor<P, L>) -> Self {
        Self { executor }
    }

    /// Create the `robot` table if missing
    pub fn init(&self) -> std::result::Result<(), DataAccessError> {
        self.executor.execute_update(ROBOT_TABLE_SQL, no_params)?;
        Ok(())
    }

    /// Look a robot up by its technical id
    pub fn read_by_key_tech(&self, robot_id: i64) -> std::result::Result<Option<Robot>, DataAccessError> {
        self.executor.execute_query(
            &format!("SELECT {} FROM robot WHERE robotID = ?1", ROBOT_COLUMNS),
            |b| b.bind(1, robot_id),
            Robot::from_row,
        )
    }

    /// Look a robot up by its unique name
    pub fn read_by_key(&self, robot: &str) -> std::result::Result<Option<Robot>, DataAccessError> {
        self.executor.execute_query(
            &format!("SELECT {} FROM robot WHERE robot = ?1", ROBOT_COLUMNS),
            |b| b.bind(1, robot),
            Robot::from_row,
        )
    }

    /// All robots ordered by name
    pub fn read_all(&self) -> std::result::Result<Vec<Robot>, DataAccessError> {
        self.read_by_criteria(&RobotCriteria::default())
    }

    pub fn read_by_criteria(&self, criteria: &RobotCriteria) -> std::result::Result<Vec<Robot>, DataAccessError> {
        let sort_column = criteria
            .sort_column
            .as_deref()
            .filter(|column| SORTABLE_COLUMNS.contains(column))
            .unwrap_or("robot");
        let direction = if criteria.descending { "DESC" } else { "ASC" };

        let mut sql = format!("SELECT {} FROM robot", ROBOT_COLUMNS);
        let mut params = Vec::new();
        if let Some(search) = criteria.search.as_deref().filter(|s| !s.is_empty()) {
            sql.push_str(" WHERE robot LIKE ?1 OR host LIKE ?1 OR description LIKE ?1");
            params.push(Value::Text(format!("%{}%", search)));
        }
        sql.push_str(&format!(
            " ORDER BY {} {} LIMIT ?{} OFFSET ?{}",
            sort_column,
            direction,
            params.len() + 1,
            params.len() + 2
        ));
        // SQLite treats a negative limit as unbounded
        let limit = match criteria.length {
            0 => -1,
            length => i64::try_from(length).unwrap_or(-1),
        };
        params.push(Value::Integer(limit));
        params.push(Value::Integer(i64::try_from(criteria.start).unwrap_or(i64::MAX)));

        debug!("Reading robots with {:?}", criteria);
        self.executor
            .execute_query_list(&sql, binder::values(params), Robot::from_row)
    }

    /// Insert a new robot; a name already in use is a duplicate entry
    pub fn create(&self, robot: &Robot) -> std::result::Result<(), DataAccessError> {
        self.executor.execute_update(
            "INSERT INTO robot (robot, host, port, platform, active, description, dateCreated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            |b| {
                b.bind_all(&[
                    &robot.robot,
                    &robot.host,
                    &robot.port,
                    &robot.platform,
                    &robot.active,
                    &robot.description,
                    &robot.date_created,
                ])
            },
        )?;
        debug!("Created robot {}", robot.robot);
        Ok(())
    }

    /// Update every column of the robot identified by `robot_id`
    pub fn update(&self, robot: &Robot) -> std::result::Result<usize, DataAccessError> {
        self.executor.execute_update(
            "UPDATE robot SET robot = ?1, host = ?2, port = ?3, platform = ?4, active = ?5, description = ?6
             WHERE robotID = ?7",
            |b| {
                b.bind_all(&[
                    &robot.robot,
                    &robot.host,
                    &robot.port,
                    &robot.platform,
                    &robot.active,
                    &robot.description,
                    &robot.robot_id,
                ])
            },
        )
    }

    pub fn delete(&self, robot: &Robot) -> std::result::Result<usize, DataAccessError> {
        self.executor
            .execute_update("DELETE FROM robot WHERE robotID = ?1", |b| b.bind(1, robot.robot_id))
    }
}
