//! MySQL adapter for the engine.
//!
//! One plain `MySqlConnection` per target rather than a pool: a pool would
//! quietly re-establish lost sessions, while the monitor only connects once
//! and afterwards reports failing queries.

use std::time::Duration;

use async_trait::async_trait;
use common::errors::{AppError, AppResult};
use common::models::{Process, Target};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{ConnectOptions, Connection, Executor, Row};

use crate::engine::{Connector, ProcessSource};

/// Session-listing query.
pub const PROCESSLIST_QUERY: &str = "SHOW FULL PROCESSLIST";

/// Column order of the processlist result.
const COLUMNS: [&str; 8] = ["Id", "User", "Host", "db", "Command", "Time", "State", "Info"];

/// Opens MySQL sessions.
pub struct MySqlConnector {
    database: String,
    connect_timeout: Duration,
}

impl MySqlConnector {
    pub fn new(database: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            database: database.into(),
            connect_timeout,
        }
    }

    fn options(&self, target: &Target) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&target.address)
            .port(target.port)
            .username(&target.username)
            .password(&target.password)
            .database(&self.database)
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    type Session = MySqlSession;

    async fn connect(&self, target: &Target) -> AppResult<MySqlSession> {
        let options = self.options(target);
        let attempt = async {
            let mut conn = options.connect().await?;
            conn.ping().await?;
            Ok::<_, sqlx::Error>(conn)
        };

        let connect_error = |message: String| AppError::Connect {
            target: target.name.clone(),
            message,
        };
        match tokio::time::timeout(self.connect_timeout, attempt).await {
            Ok(Ok(conn)) => Ok(MySqlSession {
                target: target.name.clone(),
                conn,
            }),
            Ok(Err(e)) => Err(connect_error(e.to_string())),
            Err(_) => Err(connect_error(format!(
                "timed out after {}s",
                self.connect_timeout.as_secs()
            ))),
        }
    }
}

/// A live session to one target.
pub struct MySqlSession {
    target: String,
    conn: MySqlConnection,
}

#[async_trait]
impl ProcessSource for MySqlSession {
    async fn list_processes(&mut self) -> AppResult<Vec<AppResult<Process>>> {
        // A plain &str carries no arguments, so it goes over the text protocol.
        let rows = Executor::fetch_all(&mut self.conn, PROCESSLIST_QUERY)
            .await
            .map_err(|e| AppError::Query {
                target: self.target.clone(),
                message: e.to_string(),
            })?;

        Ok(rows
            .iter()
            .map(|row| {
                parse_row(row).map_err(|message| AppError::RowParse {
                    target: self.target.clone(),
                    message,
                })
            })
            .collect())
    }
}

/// Positional column access, as far as the processlist needs it.
trait RowColumns {
    fn column_count(&self) -> usize;
    fn unsigned(&self, idx: usize) -> Result<u64, String>;
    fn signed(&self, idx: usize) -> Result<i64, String>;
    fn text(&self, idx: usize) -> Result<Option<String>, String>;
    fn bytes(&self, idx: usize) -> Result<Option<Vec<u8>>, String>;
}

impl RowColumns for MySqlRow {
    fn column_count(&self) -> usize {
        Row::len(self)
    }

    fn unsigned(&self, idx: usize) -> Result<u64, String> {
        self.try_get(idx).map_err(|e| e.to_string())
    }

    fn signed(&self, idx: usize) -> Result<i64, String> {
        self.try_get(idx).map_err(|e| e.to_string())
    }

    fn text(&self, idx: usize) -> Result<Option<String>, String> {
        self.try_get(idx).map_err(|e| e.to_string())
    }

    fn bytes(&self, idx: usize) -> Result<Option<Vec<u8>>, String> {
        self.try_get(idx).map_err(|e| e.to_string())
    }
}

fn parse_row<R: RowColumns>(row: &R) -> Result<Process, String> {
    if row.column_count() < COLUMNS.len() {
        return Err(format!(
            "expected {} columns, got {}",
            COLUMNS.len(),
            row.column_count()
        ));
    }

    Ok(Process {
        id: column_u64(row, 0)?,
        user: column_text(row, 1)?,
        host: column_text(row, 2)?,
        db: column_opt_text(row, 3)?,
        command: column_text(row, 4)?,
        time: column_i64(row, 5)?,
        state: column_opt_text(row, 6)?,
        info: column_opt_text(row, 7)?,
    })
}

fn column_error(idx: usize, e: String) -> String {
    format!("column {}: {}", COLUMNS[idx], e)
}

// Integer widths and signedness differ between server versions and forks.

fn column_u64<R: RowColumns>(row: &R, idx: usize) -> Result<u64, String> {
    if let Ok(v) = row.unsigned(idx) {
        return Ok(v);
    }
    let v = row.signed(idx).map_err(|e| column_error(idx, e))?;
    u64::try_from(v).map_err(|_| format!("column {}: negative value {}", COLUMNS[idx], v))
}

fn column_i64<R: RowColumns>(row: &R, idx: usize) -> Result<i64, String> {
    if let Ok(v) = row.signed(idx) {
        return Ok(v);
    }
    let v = row.unsigned(idx).map_err(|e| column_error(idx, e))?;
    Ok(i64::try_from(v).unwrap_or(i64::MAX))
}

// Some servers report processlist text with a binary collation.

fn column_opt_text<R: RowColumns>(row: &R, idx: usize) -> Result<Option<String>, String> {
    if let Ok(v) = row.text(idx) {
        return Ok(v);
    }
    let raw = row.bytes(idx).map_err(|e| column_error(idx, e))?;
    Ok(raw.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}

fn column_text<R: RowColumns>(row: &R, idx: usize) -> Result<String, String> {
    column_opt_text(row, idx)?.ok_or_else(|| format!("column {}: unexpected NULL", COLUMNS[idx]))
}

#[cfg(test)]
mod tests {
    use super::*;

    enum Cell {
        Unsigned(u64),
        Signed(i64),
        Text(&'static str),
        Bytes(&'static [u8]),
        Null,
    }

    struct FakeRow(Vec<Cell>);

    const MISMATCH: &str = "mismatched types";

    impl RowColumns for FakeRow {
        fn column_count(&self) -> usize {
            self.0.len()
        }

        fn unsigned(&self, idx: usize) -> Result<u64, String> {
            match self.0[idx] {
                Cell::Unsigned(v) => Ok(v),
                _ => Err(MISMATCH.into()),
            }
        }

        fn signed(&self, idx: usize) -> Result<i64, String> {
            match self.0[idx] {
                Cell::Signed(v) => Ok(v),
                _ => Err(MISMATCH.into()),
            }
        }

        fn text(&self, idx: usize) -> Result<Option<String>, String> {
            match self.0[idx] {
                Cell::Text(v) => Ok(Some(v.to_string())),
                Cell::Null => Ok(None),
                _ => Err(MISMATCH.into()),
            }
        }

        fn bytes(&self, idx: usize) -> Result<Option<Vec<u8>>, String> {
            match self.0[idx] {
                Cell::Bytes(v) => Ok(Some(v.to_vec())),
                Cell::Null => Ok(None),
                _ => Err(MISMATCH.into()),
            }
        }
    }

    fn sleeping_row(id: Cell, time: Cell) -> FakeRow {
        FakeRow(vec![
            id,
            Cell::Text("root"),
            Cell::Text("localhost"),
            Cell::Null,
            Cell::Text("Sleep"),
            time,
            Cell::Null,
            Cell::Null,
        ])
    }

    #[test]
    fn test_null_state_and_info_stay_empty() {
        let process = parse_row(&sleeping_row(Cell::Unsigned(4), Cell::Signed(33363))).unwrap();
        assert_eq!(process.id, 4);
        assert_eq!(process.time, 33363);
        assert_eq!(process.db, None);
        assert_eq!(process.state, None);
        assert_eq!(process.info, None);
        assert_eq!(process.state_or_empty(), "");
        assert_eq!(process.info_or_empty(), "");
    }

    #[test]
    fn test_integer_signedness_falls_back() {
        let process = parse_row(&sleeping_row(Cell::Signed(26), Cell::Unsigned(7))).unwrap();
        assert_eq!(process.id, 26);
        assert_eq!(process.time, 7);

        let huge = parse_row(&sleeping_row(Cell::Unsigned(1), Cell::Unsigned(u64::MAX))).unwrap();
        assert_eq!(huge.time, i64::MAX);
    }

    #[test]
    fn test_negative_id_is_rejected() {
        let err = parse_row(&sleeping_row(Cell::Signed(-1), Cell::Signed(0))).unwrap_err();
        assert_eq!(err, "column Id: negative value -1");
    }

    #[test]
    fn test_binary_text_is_decoded_lossily() {
        let row = FakeRow(vec![
            Cell::Unsigned(26),
            Cell::Bytes(b"root"),
            Cell::Bytes(b"10.0.0.7:40312"),
            Cell::Bytes(b"shop"),
            Cell::Text("Query"),
            Cell::Signed(0),
            Cell::Bytes(b"executing"),
            Cell::Bytes(b"SELECT '\xff'"),
        ]);
        let process = parse_row(&row).unwrap();
        assert_eq!(process.user, "root");
        assert_eq!(process.db.as_deref(), Some("shop"));
        assert_eq!(process.state.as_deref(), Some("executing"));
        assert_eq!(process.info.as_deref(), Some("SELECT '\u{fffd}'"));
    }

    #[test]
    fn test_null_user_and_short_rows_are_row_errors() {
        let mut row = sleeping_row(Cell::Unsigned(1), Cell::Signed(0));
        row.0[1] = Cell::Null;
        assert_eq!(parse_row(&row).unwrap_err(), "column User: unexpected NULL");

        let short = FakeRow(vec![Cell::Unsigned(1), Cell::Text("root")]);
        assert_eq!(parse_row(&short).unwrap_err(), "expected 8 columns, got 2");
    }

    #[test]
    fn test_mismatched_column_names_the_column() {
        let row = sleeping_row(Cell::Text("abc"), Cell::Signed(0));
        assert_eq!(parse_row(&row).unwrap_err(), "column Id: mismatched types");
    }

    #[test]
    fn test_options_use_target_fields() {
        let connector = MySqlConnector::new("mysql", Duration::from_secs(1));
        let target = Target::new("db1", "10.0.0.5", "monitor", "pw").with_port(3307);
        let options = connector.options(&target);
        assert_eq!(options.get_host(), "10.0.0.5");
        assert_eq!(options.get_port(), 3307);
        assert_eq!(options.get_username(), "monitor");
        assert_eq!(options.get_database(), Some("mysql"));
    }

    #[tokio::test]
    async fn test_refused_connection_is_connect_failure() {
        let connector = MySqlConnector::new("mysql", Duration::from_secs(2));
        // Port 1 on loopback: refused (or timed out), never a MySQL server.
        let target = Target::new("nowhere", "127.0.0.1", "monitor", "pw").with_port(1);
        match connector.connect(&target).await {
            Err(AppError::Connect { target, .. }) => assert_eq!(target, "nowhere"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("connected to port 1"),
        }
    }

    /// Needs a reachable server: MMTOP_TEST_MYSQL_HOST, _PORT, _USER, _PASSWORD.
    #[tokio::test]
    #[ignore]
    async fn test_lists_processes_on_live_server() {
        let env = |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.into());
        let port = env("MMTOP_TEST_MYSQL_PORT", "3306").parse().unwrap();
        let target = Target::new(
            "live",
            env("MMTOP_TEST_MYSQL_HOST", "127.0.0.1"),
            env("MMTOP_TEST_MYSQL_USER", "root"),
            env("MMTOP_TEST_MYSQL_PASSWORD", ""),
        )
        .with_port(port);

        let connector = MySqlConnector::new("mysql", Duration::from_secs(5));
        let mut session = connector.connect(&target).await.unwrap();
        let rows = session.list_processes().await.unwrap();

        let processes: Vec<_> = rows.into_iter().map(Result::unwrap).collect();
        // Our own session is running the processlist query.
        assert!(processes
            .iter()
            .any(|p| p.info_or_empty().contains(PROCESSLIST_QUERY)));
    }
}
