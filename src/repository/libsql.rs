//! Relational persistence over libsql.
//!
//! Five-table schema: users, sources (unique per user+url), facts, entities
//! with a separate attributes table, and research sessions with their
//! fact/entity link tables. Trust levels and entity types are
//! CHECK-constrained so invalid values are rejected at the database as
//! well as at the type level.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use libsql::{Builder, Connection, Database, Row};
use std::collections::HashMap;

use crate::domain::{Entity, Fact, ResearchSession, Source, TrustLevel, User};
use crate::repository::{SourceRepository, UserRepository, WorldModelRepository};
use crate::types::{AppError, Result};

pub struct LibsqlRepositories {
    db: Database,
}

fn db_err(context: &str, err: impl std::fmt::Display) -> AppError {
    AppError::Database(format!("{}: {}", context, err))
}

fn is_unique_violation(err: &libsql::Error) -> bool {
    err.to_string().contains("UNIQUE constraint failed")
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

impl LibsqlRepositories {
    /// Open a local database file (or `:memory:`) and initialize the
    /// schema.
    pub async fn new_local(path: &str) -> Result<Self> {
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| db_err("open database", e))?;

        let repos = Self { db };
        repos.initialize_schema().await?;
        Ok(repos)
    }

    /// Connect to a remote database and initialize the schema.
    pub async fn new_remote(url: String, auth_token: String) -> Result<Self> {
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| db_err("connect to database", e))?;

        let repos = Self { db };
        repos.initialize_schema().await?;
        Ok(repos)
    }

    fn connection(&self) -> Result<Connection> {
        self.db.connect().map_err(|e| db_err("get connection", e))
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection()?;

        let statements = [
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                principal_id INTEGER UNIQUE NOT NULL,
                display_name TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS sources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                url TEXT NOT NULL,
                name TEXT NOT NULL,
                trust_level TEXT NOT NULL CHECK (trust_level IN ('high', 'medium', 'low')),
                is_user_added INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE (user_id, url),
                FOREIGN KEY (user_id) REFERENCES users(id)
            )",
            "CREATE TABLE IF NOT EXISTS facts (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                content TEXT NOT NULL,
                source_url TEXT,
                confidence REAL NOT NULL,
                extracted_at INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS entities (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                entity_type TEXT NOT NULL CHECK (entity_type IN ('company', 'person', 'concept', 'product', 'market')),
                first_seen_at INTEGER NOT NULL,
                last_seen_at INTEGER NOT NULL,
                UNIQUE (user_id, name)
            )",
            "CREATE TABLE IF NOT EXISTS entity_attributes (
                entity_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (entity_id, key),
                FOREIGN KEY (entity_id) REFERENCES entities(id)
            )",
            "CREATE TABLE IF NOT EXISTS research_sessions (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                question TEXT NOT NULL,
                strategy TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS session_facts (
                session_id TEXT NOT NULL,
                fact_id TEXT NOT NULL,
                PRIMARY KEY (session_id, fact_id)
            )",
            "CREATE TABLE IF NOT EXISTS session_entities (
                session_id TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                PRIMARY KEY (session_id, entity_id)
            )",
        ];

        for sql in statements {
            conn.execute(sql, ())
                .await
                .map_err(|e| db_err("create schema", e))?;
        }

        Ok(())
    }

    fn row_to_user(row: &Row) -> Result<User> {
        Ok(User {
            id: row.get::<i64>(0).map_err(|e| db_err("read user", e))?,
            principal_id: row.get::<i64>(1).map_err(|e| db_err("read user", e))?,
            display_name: row.get::<String>(2).map_err(|e| db_err("read user", e))?,
            created_at: timestamp(row.get::<i64>(3).map_err(|e| db_err("read user", e))?),
        })
    }

    fn row_to_source(row: &Row) -> Result<Source> {
        let trust: String = row.get::<String>(4).map_err(|e| db_err("read source", e))?;
        Ok(Source {
            id: row.get::<i64>(0).map_err(|e| db_err("read source", e))?,
            user_id: row.get::<i64>(1).map_err(|e| db_err("read source", e))?,
            url: row.get::<String>(2).map_err(|e| db_err("read source", e))?,
            name: row.get::<String>(3).map_err(|e| db_err("read source", e))?,
            trust_level: trust.parse::<TrustLevel>()?,
            is_user_added: row.get::<i64>(5).map_err(|e| db_err("read source", e))? != 0,
            created_at: timestamp(row.get::<i64>(6).map_err(|e| db_err("read source", e))?),
        })
    }

    fn row_to_fact(row: &Row) -> Result<Fact> {
        Ok(Fact {
            id: row.get::<String>(0).map_err(|e| db_err("read fact", e))?,
            user_id: row.get::<i64>(1).map_err(|e| db_err("read fact", e))?,
            content: row.get::<String>(2).map_err(|e| db_err("read fact", e))?,
            source_url: row
                .get::<Option<String>>(3)
                .map_err(|e| db_err("read fact", e))?,
            confidence: row.get::<f64>(4).map_err(|e| db_err("read fact", e))?,
            extracted_at: timestamp(row.get::<i64>(5).map_err(|e| db_err("read fact", e))?),
        })
    }

    fn row_to_session(row: &Row) -> Result<ResearchSession> {
        Ok(ResearchSession {
            id: row.get::<String>(0).map_err(|e| db_err("read session", e))?,
            user_id: row.get::<i64>(1).map_err(|e| db_err("read session", e))?,
            question: row.get::<String>(2).map_err(|e| db_err("read session", e))?,
            strategy: row.get::<String>(3).map_err(|e| db_err("read session", e))?,
            created_at: timestamp(row.get::<i64>(4).map_err(|e| db_err("read session", e))?),
        })
    }

    async fn load_attributes(
        &self,
        conn: &Connection,
        entity_id: &str,
    ) -> Result<HashMap<String, String>> {
        let mut rows = conn
            .query(
                "SELECT key, value FROM entity_attributes WHERE entity_id = ?1",
                [entity_id],
            )
            .await
            .map_err(|e| db_err("query attributes", e))?;

        let mut attributes = HashMap::new();
        while let Some(row) = rows.next().await.map_err(|e| db_err("read attributes", e))? {
            let key = row.get::<String>(0).map_err(|e| db_err("read attributes", e))?;
            let value = row.get::<String>(1).map_err(|e| db_err("read attributes", e))?;
            attributes.insert(key, value);
        }
        Ok(attributes)
    }

    async fn row_to_entity(&self, conn: &Connection, row: &Row) -> Result<Entity> {
        let kind: String = row.get::<String>(3).map_err(|e| db_err("read entity", e))?;
        let id = row.get::<String>(0).map_err(|e| db_err("read entity", e))?;
        let attributes = self.load_attributes(conn, &id).await?;
        Ok(Entity {
            user_id: row.get::<i64>(1).map_err(|e| db_err("read entity", e))?,
            name: row.get::<String>(2).map_err(|e| db_err("read entity", e))?,
            entity_type: kind.parse()?,
            attributes,
            first_seen_at: timestamp(row.get::<i64>(4).map_err(|e| db_err("read entity", e))?),
            last_seen_at: timestamp(row.get::<i64>(5).map_err(|e| db_err("read entity", e))?),
            id,
        })
    }
}

#[async_trait]
impl UserRepository for LibsqlRepositories {
    async fn get_or_create(&self, principal_id: i64, display_name: &str) -> Result<User> {
        let conn = self.connection()?;

        if let Ok(mut user) = self.get_by_principal(principal_id).await {
            if user.display_name != display_name {
                conn.execute(
                    "UPDATE users SET display_name = ?1 WHERE principal_id = ?2",
                    (display_name, principal_id),
                )
                .await
                .map_err(|e| db_err("update user", e))?;
                user.display_name = display_name.to_string();
            }
            return Ok(user);
        }

        conn.execute(
            "INSERT INTO users (principal_id, display_name, created_at) VALUES (?1, ?2, ?3)",
            (principal_id, display_name, Utc::now().timestamp()),
        )
        .await
        .map_err(|e| db_err("create user", e))?;

        self.get_by_principal(principal_id).await
    }

    async fn get_by_id(&self, id: i64) -> Result<User> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, principal_id, display_name, created_at FROM users WHERE id = ?1",
                [id],
            )
            .await
            .map_err(|e| db_err("query user", e))?;

        match rows.next().await.map_err(|e| db_err("read user", e))? {
            Some(row) => Self::row_to_user(&row),
            None => Err(AppError::UserNotFound),
        }
    }

    async fn get_by_principal(&self, principal_id: i64) -> Result<User> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, principal_id, display_name, created_at FROM users WHERE principal_id = ?1",
                [principal_id],
            )
            .await
            .map_err(|e| db_err("query user", e))?;

        match rows.next().await.map_err(|e| db_err("read user", e))? {
            Some(row) => Self::row_to_user(&row),
            None => Err(AppError::UserNotFound),
        }
    }

    async fn update(&self, user: &User) -> Result<()> {
        let conn = self.connection()?;
        let affected = conn
            .execute(
                "UPDATE users SET display_name = ?1 WHERE id = ?2",
                (user.display_name.as_str(), user.id),
            )
            .await
            .map_err(|e| db_err("update user", e))?;

        if affected == 0 {
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }

    async fn create(&self, user: &User) -> Result<User> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO users (principal_id, display_name, created_at) VALUES (?1, ?2, ?3)",
            (
                user.principal_id,
                user.display_name.as_str(),
                Utc::now().timestamp(),
            ),
        )
        .await
        .map_err(|e| db_err("create user", e))?;

        self.get_by_principal(user.principal_id).await
    }
}

#[async_trait]
impl SourceRepository for LibsqlRepositories {
    async fn create(&self, source: &Source) -> Result<Source> {
        let conn = self.connection()?;
        let created_at = Utc::now().timestamp();

        conn.execute(
            "INSERT INTO sources (user_id, url, name, trust_level, is_user_added, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                source.user_id,
                source.url.as_str(),
                source.name.as_str(),
                source.trust_level.as_str(),
                source.is_user_added as i64,
                created_at,
            ),
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateSource
            } else {
                db_err("create source", e)
            }
        })?;

        let mut rows = conn
            .query(
                "SELECT id, user_id, url, name, trust_level, is_user_added, created_at
                 FROM sources WHERE user_id = ?1 AND url = ?2",
                (source.user_id, source.url.as_str()),
            )
            .await
            .map_err(|e| db_err("query source", e))?;

        match rows.next().await.map_err(|e| db_err("read source", e))? {
            Some(row) => Self::row_to_source(&row),
            None => Err(AppError::SourceNotFound),
        }
    }

    async fn delete(&self, user_id: i64, source_id: i64) -> Result<()> {
        let conn = self.connection()?;
        let affected = conn
            .execute(
                "DELETE FROM sources WHERE id = ?1 AND user_id = ?2",
                (source_id, user_id),
            )
            .await
            .map_err(|e| db_err("delete source", e))?;

        if affected == 0 {
            return Err(AppError::SourceNotFound);
        }
        Ok(())
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Source>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, url, name, trust_level, is_user_added, created_at
                 FROM sources WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
                [user_id],
            )
            .await
            .map_err(|e| db_err("query sources", e))?;

        let mut sources = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| db_err("read sources", e))? {
            sources.push(Self::row_to_source(&row)?);
        }
        Ok(sources)
    }

    async fn get_by_id(&self, source_id: i64) -> Result<Source> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, url, name, trust_level, is_user_added, created_at
                 FROM sources WHERE id = ?1",
                [source_id],
            )
            .await
            .map_err(|e| db_err("query source", e))?;

        match rows.next().await.map_err(|e| db_err("read source", e))? {
            Some(row) => Self::row_to_source(&row),
            None => Err(AppError::SourceNotFound),
        }
    }

    async fn exists_by_url(&self, user_id: i64, url: &str) -> Result<bool> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT 1 FROM sources WHERE user_id = ?1 AND url = ?2 LIMIT 1",
                (user_id, url),
            )
            .await
            .map_err(|e| db_err("query source", e))?;

        Ok(rows
            .next()
            .await
            .map_err(|e| db_err("read source", e))?
            .is_some())
    }

    async fn count_by_user(&self, user_id: i64) -> Result<usize> {
        let conn = self.connection()?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM sources WHERE user_id = ?1", [user_id])
            .await
            .map_err(|e| db_err("count sources", e))?;

        match rows.next().await.map_err(|e| db_err("read count", e))? {
            Some(row) => Ok(row.get::<i64>(0).map_err(|e| db_err("read count", e))? as usize),
            None => Ok(0),
        }
    }

    async fn get_domains_by_user(&self, user_id: i64) -> Result<Vec<String>> {
        // Domain derivation lives in the domain type; dedup here.
        let sources = self.list_by_user(user_id).await?;
        let mut seen = std::collections::HashSet::new();
        let mut domains = Vec::new();
        for source in sources {
            let domain = source.domain();
            if !domain.is_empty() && seen.insert(domain.clone()) {
                domains.push(domain);
            }
        }
        Ok(domains)
    }

    async fn update_trust_level(
        &self,
        user_id: i64,
        source_id: i64,
        level: TrustLevel,
    ) -> Result<()> {
        let conn = self.connection()?;
        let affected = conn
            .execute(
                "UPDATE sources SET trust_level = ?1 WHERE id = ?2 AND user_id = ?3",
                (level.as_str(), source_id, user_id),
            )
            .await
            .map_err(|e| db_err("update trust level", e))?;

        if affected == 0 {
            return Err(AppError::SourceNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl WorldModelRepository for LibsqlRepositories {
    async fn create_fact(&self, fact: &Fact) -> Result<()> {
        fact.validate()?;
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO facts (id, user_id, content, source_url, confidence, extracted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                fact.id.as_str(),
                fact.user_id,
                fact.content.as_str(),
                fact.source_url.clone(),
                fact.confidence,
                fact.extracted_at.timestamp(),
            ),
        )
        .await
        .map_err(|e| db_err("create fact", e))?;
        Ok(())
    }

    async fn get_facts_by_user(&self, user_id: i64, limit: usize) -> Result<Vec<Fact>> {
        let conn = self.connection()?;
        let sql = if limit > 0 {
            format!(
                "SELECT id, user_id, content, source_url, confidence, extracted_at
                 FROM facts WHERE user_id = ?1 ORDER BY extracted_at DESC LIMIT {}",
                limit
            )
        } else {
            "SELECT id, user_id, content, source_url, confidence, extracted_at
             FROM facts WHERE user_id = ?1 ORDER BY extracted_at DESC"
                .to_string()
        };

        let mut rows = conn
            .query(&sql, [user_id])
            .await
            .map_err(|e| db_err("query facts", e))?;

        let mut facts = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| db_err("read facts", e))? {
            facts.push(Self::row_to_fact(&row)?);
        }
        Ok(facts)
    }

    async fn get_facts_by_session(&self, session_id: &str) -> Result<Vec<Fact>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT f.id, f.user_id, f.content, f.source_url, f.confidence, f.extracted_at
                 FROM facts f
                 JOIN session_facts sf ON sf.fact_id = f.id
                 WHERE sf.session_id = ?1",
                [session_id],
            )
            .await
            .map_err(|e| db_err("query session facts", e))?;

        let mut facts = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| db_err("read facts", e))? {
            facts.push(Self::row_to_fact(&row)?);
        }
        Ok(facts)
    }

    async fn search_facts(&self, user_id: i64, query: &str) -> Result<Vec<Fact>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, content, source_url, confidence, extracted_at
                 FROM facts WHERE user_id = ?1 AND content LIKE '%' || ?2 || '%'",
                (user_id, query),
            )
            .await
            .map_err(|e| db_err("search facts", e))?;

        let mut facts = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| db_err("read facts", e))? {
            facts.push(Self::row_to_fact(&row)?);
        }
        Ok(facts)
    }

    async fn find_fact_by_content(&self, user_id: i64, content: &str) -> Result<Fact> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, content, source_url, confidence, extracted_at
                 FROM facts WHERE user_id = ?1 AND content = ?2 LIMIT 1",
                (user_id, content),
            )
            .await
            .map_err(|e| db_err("query fact", e))?;

        match rows.next().await.map_err(|e| db_err("read fact", e))? {
            Some(row) => Self::row_to_fact(&row),
            None => Err(AppError::NotFound),
        }
    }

    async fn create_entity(&self, entity: &Entity) -> Result<()> {
        entity.validate()?;
        let conn = self.connection()?;

        let tx = conn
            .transaction()
            .await
            .map_err(|e| db_err("begin transaction", e))?;

        tx.execute(
            "INSERT INTO entities (id, user_id, name, entity_type, first_seen_at, last_seen_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                entity.id.as_str(),
                entity.user_id,
                entity.name.as_str(),
                entity.entity_type.as_str(),
                entity.first_seen_at.timestamp(),
                entity.last_seen_at.timestamp(),
            ),
        )
        .await
        .map_err(|e| db_err("create entity", e))?;

        for (key, value) in &entity.attributes {
            tx.execute(
                "INSERT INTO entity_attributes (entity_id, key, value) VALUES (?1, ?2, ?3)",
                (entity.id.as_str(), key.as_str(), value.as_str()),
            )
            .await
            .map_err(|e| db_err("create entity attributes", e))?;
        }

        tx.commit().await.map_err(|e| db_err("commit entity", e))
    }

    async fn get_entity_by_name(&self, user_id: i64, name: &str) -> Result<Entity> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, name, entity_type, first_seen_at, last_seen_at
                 FROM entities WHERE user_id = ?1 AND name = ?2",
                (user_id, name),
            )
            .await
            .map_err(|e| db_err("query entity", e))?;

        match rows.next().await.map_err(|e| db_err("read entity", e))? {
            Some(row) => self.row_to_entity(&conn, &row).await,
            None => Err(AppError::NotFound),
        }
    }

    async fn get_entities_by_user(&self, user_id: i64) -> Result<Vec<Entity>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, name, entity_type, first_seen_at, last_seen_at
                 FROM entities WHERE user_id = ?1 ORDER BY last_seen_at DESC",
                [user_id],
            )
            .await
            .map_err(|e| db_err("query entities", e))?;

        let mut raw_rows = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| db_err("read entities", e))? {
            raw_rows.push(row);
        }

        let mut entities = Vec::new();
        for row in &raw_rows {
            entities.push(self.row_to_entity(&conn, row).await?);
        }
        Ok(entities)
    }

    async fn update_entity(&self, entity: &Entity) -> Result<()> {
        let conn = self.connection()?;

        let tx = conn
            .transaction()
            .await
            .map_err(|e| db_err("begin transaction", e))?;

        let affected = tx
            .execute(
                "UPDATE entities SET name = ?1, entity_type = ?2, last_seen_at = ?3 WHERE id = ?4",
                (
                    entity.name.as_str(),
                    entity.entity_type.as_str(),
                    entity.last_seen_at.timestamp(),
                    entity.id.as_str(),
                ),
            )
            .await
            .map_err(|e| db_err("update entity", e))?;

        if affected == 0 {
            return Err(AppError::NotFound);
        }

        tx.execute(
            "DELETE FROM entity_attributes WHERE entity_id = ?1",
            [entity.id.as_str()],
        )
        .await
        .map_err(|e| db_err("clear entity attributes", e))?;

        for (key, value) in &entity.attributes {
            tx.execute(
                "INSERT INTO entity_attributes (entity_id, key, value) VALUES (?1, ?2, ?3)",
                (entity.id.as_str(), key.as_str(), value.as_str()),
            )
            .await
            .map_err(|e| db_err("update entity attributes", e))?;
        }

        tx.commit().await.map_err(|e| db_err("commit entity", e))
    }

    async fn create_session(&self, session: &ResearchSession) -> Result<()> {
        session.validate()?;
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO research_sessions (id, user_id, question, strategy, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            (
                session.id.as_str(),
                session.user_id,
                session.question.as_str(),
                session.strategy.as_str(),
                session.created_at.timestamp(),
            ),
        )
        .await
        .map_err(|e| db_err("create session", e))?;
        Ok(())
    }

    async fn get_recent_sessions(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<ResearchSession>> {
        let conn = self.connection()?;
        let sql = if limit > 0 {
            format!(
                "SELECT id, user_id, question, strategy, created_at
                 FROM research_sessions WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT {}",
                limit
            )
        } else {
            "SELECT id, user_id, question, strategy, created_at
             FROM research_sessions WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
                .to_string()
        };

        let mut rows = conn
            .query(&sql, [user_id])
            .await
            .map_err(|e| db_err("query sessions", e))?;

        let mut sessions = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| db_err("read sessions", e))? {
            sessions.push(Self::row_to_session(&row)?);
        }
        Ok(sessions)
    }

    async fn add_fact_to_session(&self, session_id: &str, fact_id: &str) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT OR IGNORE INTO session_facts (session_id, fact_id) VALUES (?1, ?2)",
            (session_id, fact_id),
        )
        .await
        .map_err(|e| db_err("link fact", e))?;
        Ok(())
    }

    async fn add_entity_to_session(&self, session_id: &str, entity_id: &str) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT OR IGNORE INTO session_entities (session_id, entity_id) VALUES (?1, ?2)",
            (session_id, entity_id),
        )
        .await
        .map_err(|e| db_err("link entity", e))?;
        Ok(())
    }
}
