//! Criminal record repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crime_track_core::CriminalId;

use super::{CriminalStore, RepositoryError};
use crate::models::{Criminal, CriminalSearch};

const CRIMINAL_COLUMNS: &str = "id, name, alias, statement, image, image_id, inmate_number, dob, \
                                gender, nationality, address, identification_number, height, \
                                weight, eye_color, hair_color, arrest_date, arrest_location, \
                                charges, status, sealed, created_at, updated_at";

/// Case-insensitive regex match of `$1` against every searchable column.
const SEARCH_FILTER: &str = "name ~* $1 OR statement ~* $1 OR alias ~* $1 OR gender ~* $1 \
                             OR nationality ~* $1 OR address ~* $1 \
                             OR identification_number ~* $1 OR height ~* $1 OR weight ~* $1 \
                             OR eye_color ~* $1 OR hair_color ~* $1 OR arrest_date ~* $1 \
                             OR arrest_location ~* $1 OR charges ~* $1 OR status ~* $1";

/// Internal row type for `PostgreSQL` criminal queries.
#[derive(Debug, sqlx::FromRow)]
struct CriminalRow {
    id: i32,
    name: String,
    alias: Option<String>,
    statement: Option<String>,
    image: Option<String>,
    image_id: Option<String>,
    inmate_number: Option<i32>,
    dob: Option<String>,
    gender: Option<String>,
    nationality: Option<String>,
    address: Option<String>,
    identification_number: Option<String>,
    height: Option<String>,
    weight: Option<String>,
    eye_color: Option<String>,
    hair_color: Option<String>,
    arrest_date: Option<String>,
    arrest_location: Option<String>,
    charges: Option<String>,
    status: Option<String>,
    sealed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CriminalRow> for Criminal {
    fn from(row: CriminalRow) -> Self {
        Self {
            id: CriminalId::new(row.id),
            name: row.name,
            alias: row.alias,
            statement: row.statement,
            image: row.image,
            image_id: row.image_id,
            inmate_number: row.inmate_number,
            dob: row.dob,
            gender: row.gender,
            nationality: row.nationality,
            address: row.address,
            identification_number: row.identification_number,
            height: row.height,
            weight: row.weight,
            eye_color: row.eye_color,
            hair_color: row.hair_color,
            arrest_date: row.arrest_date,
            arrest_location: row.arrest_location,
            charges: row.charges,
            status: row.status,
            sealed: row.sealed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `PostgreSQL`-backed [`CriminalStore`].
#[derive(Clone)]
pub struct CriminalRepository {
    pool: PgPool,
}

impl CriminalRepository {
    /// Create a new criminal repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CriminalStore for CriminalRepository {
    async fn list(
        &self,
        search: Option<&CriminalSearch>,
    ) -> Result<Vec<Criminal>, RepositoryError> {
        let rows = match search {
            Some(search) => {
                sqlx::query_as::<_, CriminalRow>(&format!(
                    "SELECT {CRIMINAL_COLUMNS} FROM criminals \
                     WHERE {SEARCH_FILTER} \
                     ORDER BY updated_at DESC"
                ))
                .bind(search.pattern())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, CriminalRow>(&format!(
                    "SELECT {CRIMINAL_COLUMNS} FROM criminals ORDER BY updated_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(Criminal::from).collect())
    }

    async fn find_by_id(&self, id: CriminalId) -> Result<Option<Criminal>, RepositoryError> {
        let row = sqlx::query_as::<_, CriminalRow>(&format!(
            "SELECT {CRIMINAL_COLUMNS} FROM criminals WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Criminal::from))
    }

    async fn create(&self, name: &str) -> Result<Criminal, RepositoryError> {
        let row = sqlx::query_as::<_, CriminalRow>(&format!(
            "INSERT INTO criminals (name) VALUES ($1) RETURNING {CRIMINAL_COLUMNS}"
        ))
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn save(&self, criminal: &Criminal) -> Result<Criminal, RepositoryError> {
        let row = sqlx::query_as::<_, CriminalRow>(&format!(
            "UPDATE criminals SET \
                 name = $2, alias = $3, statement = $4, image = $5, image_id = $6, \
                 inmate_number = $7, dob = $8, gender = $9, nationality = $10, address = $11, \
                 identification_number = $12, height = $13, weight = $14, eye_color = $15, \
                 hair_color = $16, arrest_date = $17, arrest_location = $18, charges = $19, \
                 status = $20, sealed = $21, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {CRIMINAL_COLUMNS}"
        ))
        .bind(criminal.id)
        .bind(&criminal.name)
        .bind(criminal.alias.as_deref())
        .bind(criminal.statement.as_deref())
        .bind(criminal.image.as_deref())
        .bind(criminal.image_id.as_deref())
        .bind(criminal.inmate_number)
        .bind(criminal.dob.as_deref())
        .bind(criminal.gender.as_deref())
        .bind(criminal.nationality.as_deref())
        .bind(criminal.address.as_deref())
        .bind(criminal.identification_number.as_deref())
        .bind(criminal.height.as_deref())
        .bind(criminal.weight.as_deref())
        .bind(criminal.eye_color.as_deref())
        .bind(criminal.hair_color.as_deref())
        .bind(criminal.arrest_date.as_deref())
        .bind(criminal.arrest_location.as_deref())
        .bind(criminal.charges.as_deref())
        .bind(criminal.status.as_deref())
        .bind(criminal.sealed)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    async fn delete(&self, id: CriminalId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM criminals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
