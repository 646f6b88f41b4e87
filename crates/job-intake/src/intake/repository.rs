use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};

use super::domain::{ApplicantDetails, Application, ApplicationId, NewApplication, PaymentStatus};

/// Idempotent DDL executed whenever a repository is opened.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS applications (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name       TEXT NOT NULL,
    email           TEXT NOT NULL,
    phone           TEXT NOT NULL,
    gender          TEXT NOT NULL,
    dob             TEXT NOT NULL,
    bio             TEXT NOT NULL,
    resume_filename TEXT NOT NULL,
    payment_id      TEXT,
    payment_status  TEXT NOT NULL DEFAULT 'pending'
                    CHECK (payment_status IN ('pending', 'success')),
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS applications_created_idx ON applications(created_at);
";

/// Append-only storage for submitted applications.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError>;
    /// All applications, most recently created first.
    fn list_recent(&self) -> Result<Vec<Application>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("stored row is unreadable: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::FromSqlConversionFailure(_, _, source) => {
                Self::Corrupt(source.to_string())
            }
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// SQLite-backed repository. Each statement runs under a single connection
/// lock, so an insert is atomic with respect to concurrent requests.
pub struct SqliteApplicationRepository {
    connection: Mutex<Connection>,
}

impl SqliteApplicationRepository {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let connection = Connection::open(path)?;
        Self::with_connection(connection)
    }

    pub fn in_memory() -> Result<Self, RepositoryError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> Result<Self, RepositoryError> {
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.connection
            .lock()
            .map_err(|_| RepositoryError::Unavailable("connection mutex poisoned".to_string()))
    }
}

impl ApplicationRepository for SqliteApplicationRepository {
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError> {
        let stamp = encode_timestamp(&Utc::now());
        let NewApplication {
            details,
            resume_filename,
            payment_id,
            payment_status,
        } = application;

        let connection = self.lock()?;
        connection.execute(
            "INSERT INTO applications (full_name, email, phone, gender, dob, bio, \
             resume_filename, payment_id, payment_status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                details.full_name,
                details.email,
                details.phone,
                details.gender,
                details.dob,
                details.bio,
                resume_filename,
                payment_id,
                payment_status.label(),
                stamp,
            ],
        )?;
        let id = ApplicationId(connection.last_insert_rowid());

        Ok(Application {
            id,
            details,
            resume_filename,
            payment_id,
            payment_status,
            created_at: decode_timestamp(&stamp)?,
        })
    }

    fn list_recent(&self) -> Result<Vec<Application>, RepositoryError> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(
            "SELECT id, full_name, email, phone, gender, dob, bio, resume_filename, \
             payment_id, payment_status, created_at \
             FROM applications ORDER BY created_at DESC, id DESC",
        )?;

        let rows = statement.query_map([], read_row)?;
        let mut applications = Vec::new();
        for row in rows {
            applications.push(row?);
        }
        Ok(applications)
    }
}

/// Fixed-width RFC 3339 so lexical order in SQL matches chronological order.
fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| RepositoryError::Corrupt(format!("created_at '{raw}': {err}")))
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<Application> {
    let status_label: String = row.get(9)?;
    let payment_status = PaymentStatus::from_label(&status_label).ok_or_else(|| {
        conversion_error(9, format!("unknown payment status '{status_label}'"))
    })?;

    let created_raw: String = row.get(10)?;
    let created_at = decode_timestamp(&created_raw)
        .map_err(|err| conversion_error(10, err.to_string()))?;

    Ok(Application {
        id: ApplicationId(row.get(0)?),
        details: ApplicantDetails {
            full_name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            gender: row.get(4)?,
            dob: row.get(5)?,
            bio: row.get(6)?,
        },
        resume_filename: row.get(7)?,
        payment_id: row.get(8)?,
        payment_status,
        created_at,
    })
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, message)),
    )
}
