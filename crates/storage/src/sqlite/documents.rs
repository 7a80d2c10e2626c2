use chrono::Utc;
use serde_json::Value;

use super::SqliteDataSource;
use super::mapping::{conn, id_to_i64, into_fields, map_document_row};
use crate::repository::{Collection, RemoteDataSource, StorageError};

#[async_trait::async_trait]
impl RemoteDataSource for SqliteDataSource {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, body FROM documents
            WHERE collection = ?1
            ORDER BY id ASC
            ",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in rows {
            docs.push(map_document_row(&row)?);
        }
        Ok(docs)
    }

    async fn get(&self, collection: Collection, id: u64) -> Result<Value, StorageError> {
        let row = sqlx::query("SELECT id, body FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(collection.as_str())
            .bind(id_to_i64(id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => map_document_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn create(&self, collection: Collection, entity: Value) -> Result<Value, StorageError> {
        let mut fields = into_fields(entity, &format!("{collection} entity"))?;
        let requested = fields.remove("id").and_then(|v| v.as_u64());

        let mut tx = self.pool.begin().await.map_err(conn)?;
        let id = match requested {
            Some(id) => id_to_i64(id)?,
            None => {
                let max: i64 = sqlx::query_scalar(
                    "SELECT COALESCE(MAX(id), 0) FROM documents WHERE collection = ?1",
                )
                .bind(collection.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(conn)?;
                max + 1
            }
        };

        let body = serde_json::to_string(&fields)?;
        let res = sqlx::query(
            r"
            INSERT INTO documents (collection, id, body, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(collection, id) DO NOTHING
            ",
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(body)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }
        tx.commit().await.map_err(conn)?;

        fields.insert("id".into(), Value::from(id));
        Ok(Value::Object(fields))
    }

    async fn update(
        &self,
        collection: Collection,
        id: u64,
        patch: Value,
    ) -> Result<Value, StorageError> {
        let patch = into_fields(patch, "patch")?;
        let key = id_to_i64(id)?;

        let mut tx = self.pool.begin().await.map_err(conn)?;
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection.as_str())
                .bind(key)
                .fetch_optional(&mut *tx)
                .await
                .map_err(conn)?;
        let body = body.ok_or(StorageError::NotFound)?;

        let mut fields = into_fields(serde_json::from_str(&body)?, "stored document")?;
        for (name, value) in patch {
            if name != "id" {
                fields.insert(name, value);
            }
        }

        sqlx::query(
            r"
            UPDATE documents SET body = ?3, updated_at = ?4
            WHERE collection = ?1 AND id = ?2
            ",
        )
        .bind(collection.as_str())
        .bind(key)
        .bind(serde_json::to_string(&fields)?)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;
        tx.commit().await.map_err(conn)?;

        fields.insert("id".into(), Value::from(id));
        Ok(Value::Object(fields))
    }

    async fn delete(&self, collection: Collection, id: u64) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
            .bind(collection.as_str())
            .bind(id_to_i64(id)?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
