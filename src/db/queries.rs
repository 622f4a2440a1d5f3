use std::time::Duration;

use chrono::Utc;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, Row};

use super::{DbConnection, Endpoint, PolicyCommand, RlsPolicy, SchemaSnapshot, TableColumn};
use crate::error::{render_chain, Error, Result};

/// How a snapshot fetch talks to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub include_policies: bool,
    pub connect_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            include_policies: true,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Connects to `endpoint` and captures its public schema.
pub async fn fetch_snapshot(endpoint: &Endpoint, settings: &FetchSettings) -> Result<SchemaSnapshot> {
    let db = DbConnection::connect(endpoint, settings.connect_timeout).await?;
    let client = db.client();

    let columns = list_columns(client).await?;
    let policies = if settings.include_policies {
        list_policies(client).await?
    } else {
        Vec::new()
    };

    let snapshot = SchemaSnapshot::from_rows(columns, policies, Utc::now());
    tracing::info!(
        endpoint = %endpoint.describe(),
        tables = snapshot.table_count(),
        policies = snapshot.policies().count(),
        "captured schema snapshot"
    );
    Ok(snapshot)
}

/// Column rows via the introspection procedure, falling back to
/// `information_schema.columns` when the procedure does not exist.
pub async fn list_columns(client: &Client) -> Result<Vec<TableColumn>> {
    match list_columns_via_procedure(client).await {
        Ok(columns) => Ok(columns),
        Err(e) if is_undefined_function(&e) => {
            let primary = render_chain(&e);
            tracing::warn!(error = %primary, "introspection procedure missing, falling back to information_schema");
            list_columns_from_information_schema(client)
                .await
                .map_err(|source| Error::Fallback { primary, source })
        }
        Err(e) => Err(Error::Introspection(e)),
    }
}

fn is_undefined_function(err: &tokio_postgres::Error) -> bool {
    err.code() == Some(&SqlState::UNDEFINED_FUNCTION)
}

async fn list_columns_via_procedure(client: &Client) -> std::result::Result<Vec<TableColumn>, tokio_postgres::Error> {
    tracing::debug!("querying public.get_schema_info()");
    let rows = client
        .query(
            "SELECT table_name::text, column_name::text, data_type::text,
                    is_nullable::text, column_default::text
             FROM public.get_schema_info()",
            &[],
        )
        .await?;

    rows.iter().map(column_from_row).collect()
}

async fn list_columns_from_information_schema(
    client: &Client,
) -> std::result::Result<Vec<TableColumn>, tokio_postgres::Error> {
    tracing::debug!("querying information_schema.columns");
    let rows = client
        .query(
            "SELECT table_name::text, column_name::text, data_type::text,
                    is_nullable::text, column_default::text
             FROM information_schema.columns
             WHERE table_schema = 'public'
             ORDER BY table_name, ordinal_position",
            &[],
        )
        .await?;

    rows.iter().map(column_from_row).collect()
}

fn column_from_row(row: &Row) -> std::result::Result<TableColumn, tokio_postgres::Error> {
    let is_nullable: Option<String> = row.try_get(3)?;
    Ok(TableColumn::from_raw(
        row.try_get(0)?,
        row.try_get(1)?,
        row.try_get(2)?,
        is_nullable.as_deref().unwrap_or("NO"),
        row.try_get(4)?,
    ))
}

pub async fn list_policies(client: &Client) -> Result<Vec<RlsPolicy>> {
    tracing::debug!("querying pg_policies");
    let rows = client
        .query(
            "SELECT schemaname::text, tablename::text, policyname::text, permissive,
                    roles::text[], cmd, qual, with_check
             FROM pg_catalog.pg_policies
             WHERE schemaname = 'public'
             ORDER BY tablename, policyname",
            &[],
        )
        .await
        .map_err(Error::Policies)?;

    rows.iter()
        .map(policy_from_row)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::Policies)
}

fn policy_from_row(row: &Row) -> std::result::Result<RlsPolicy, tokio_postgres::Error> {
    let cmd: Option<String> = row.try_get(5)?;
    Ok(RlsPolicy {
        schema_name: row.try_get(0)?,
        table_name: row.try_get(1)?,
        policy_name: row.try_get(2)?,
        permissive: row
            .try_get::<_, Option<String>>(3)?
            .unwrap_or_else(|| "PERMISSIVE".to_string()),
        roles: row.try_get::<_, Option<Vec<String>>>(4)?.unwrap_or_default(),
        command: PolicyCommand::parse(cmd.as_deref().unwrap_or("ALL")),
        qual: row.try_get(6)?,
        with_check: row.try_get(7)?,
    })
}

#[cfg(all(test, feature = "test-postgres"))]
mod postgres_tests {
    use super::*;
    use testcontainers::runners::AsyncRunner;
    use testcontainers::ContainerAsync;
    use testcontainers_modules::postgres::Postgres;

    const TABLES: &str = "
        CREATE TABLE users (
            id bigint NOT NULL,
            email text NOT NULL,
            nickname text DEFAULT 'guest'
        );
        CREATE TABLE audit (id bigint NOT NULL, note text);
        ALTER TABLE users ENABLE ROW LEVEL SECURITY;
        CREATE POLICY owner_read ON users FOR SELECT TO public USING (true);
    ";

    /// Starts a server, runs `setup` on it and returns an endpoint to it.
    async fn database(setup: &str) -> (ContainerAsync<Postgres>, Endpoint) {
        let node = Postgres::default().start().await.unwrap();
        let host = node.get_host().await.unwrap();
        let port = node.get_host_port_ipv4(5432).await.unwrap();
        let endpoint = Endpoint::new(format!("postgres://postgres@{host}:{port}/postgres"), "postgres");

        let db = DbConnection::connect(&endpoint, Duration::from_secs(10)).await.unwrap();
        db.client().batch_execute(setup).await.unwrap();
        (node, endpoint)
    }

    #[tokio::test]
    async fn test_information_schema_fallback() {
        let (_node, endpoint) = database(TABLES).await;
        let snapshot = fetch_snapshot(&endpoint, &FetchSettings::default()).await.unwrap();

        let tables: Vec<_> = snapshot.tables().map(|t| t.name.as_str()).collect();
        assert_eq!(tables, vec!["audit", "users"]);

        let users = snapshot.table("users").unwrap();
        let columns: Vec<_> = users.columns.iter().map(|c| c.column_name.as_str()).collect();
        assert_eq!(columns, vec!["id", "email", "nickname"]);
        assert!(!users.columns[0].is_nullable);
        assert_eq!(users.columns[0].data_type, "bigint");
        assert!(users.columns[2].is_nullable);
        assert_eq!(users.columns[2].column_default.as_deref(), Some("'guest'::text"));
    }

    #[tokio::test]
    async fn test_procedure_is_preferred() {
        let setup = format!(
            "{TABLES}
            CREATE FUNCTION public.get_schema_info()
            RETURNS TABLE(table_name text, column_name text, data_type text, is_nullable text, column_default text)
            LANGUAGE sql AS $$
                SELECT 'reported'::text, 'id'::text, 'uuid'::text, 'NO'::text, NULL::text
            $$;"
        );
        let (_node, endpoint) = database(&setup).await;
        let settings = FetchSettings {
            include_policies: false,
            ..FetchSettings::default()
        };
        let snapshot = fetch_snapshot(&endpoint, &settings).await.unwrap();

        let tables: Vec<_> = snapshot.tables().map(|t| t.name.as_str()).collect();
        assert_eq!(tables, vec!["reported"]);
        assert_eq!(snapshot.policies().count(), 0);
    }

    #[tokio::test]
    async fn test_procedure_failure_does_not_fall_back() {
        let setup = format!(
            "{TABLES}
            CREATE FUNCTION public.get_schema_info()
            RETURNS TABLE(table_name text, column_name text, data_type text, is_nullable text, column_default text)
            LANGUAGE plpgsql AS $$
            BEGIN
                RAISE EXCEPTION 'introspection disabled';
            END
            $$;"
        );
        let (_node, endpoint) = database(&setup).await;
        let err = fetch_snapshot(&endpoint, &FetchSettings::default()).await.unwrap_err();

        assert!(matches!(err, Error::Introspection(_)));
        assert!(err.report().contains("introspection disabled"), "{}", err.report());
    }

    #[tokio::test]
    async fn test_policy_rows() {
        let (_node, endpoint) = database(TABLES).await;
        let snapshot = fetch_snapshot(&endpoint, &FetchSettings::default()).await.unwrap();

        let policies: Vec<_> = snapshot.policies().collect();
        assert_eq!(policies.len(), 1);
        let policy = policies[0];
        assert_eq!(policy.key(), "users.owner_read");
        assert_eq!(policy.schema_name, "public");
        assert_eq!(policy.permissive, "PERMISSIVE");
        assert_eq!(policy.roles, vec!["public".to_string()]);
        assert_eq!(policy.command, PolicyCommand::Select);
        assert_eq!(policy.qual.as_deref(), Some("true"));
        assert_eq!(policy.with_check, None);
    }
}
