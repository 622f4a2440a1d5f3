use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid endpoint URL")]
    InvalidEndpoint(#[source] tokio_postgres::Error),

    #[error("failed to connect to {endpoint}")]
    Connect {
        endpoint: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("schema introspection failed")]
    Introspection(#[source] tokio_postgres::Error),

    #[error("introspection procedure unavailable ({primary}); information_schema fallback failed")]
    Fallback {
        primary: String,
        #[source]
        source: tokio_postgres::Error,
    },

    #[error("failed to read row-level security policies")]
    Policies(#[source] tokio_postgres::Error),

    #[error("both schemas must be loaded before comparing (missing: {0})")]
    MissingSnapshots(String),

    #[error("no comparison has been run yet")]
    NoDiff,
}

impl Error {
    /// The message followed by every underlying cause, `: `-separated.
    ///
    /// `tokio_postgres::Error` only displays its kind ("db error"), so the
    /// server message or I/O failure is only reachable through the chain.
    pub fn report(&self) -> String {
        render_chain(self)
    }
}

pub fn render_chain(err: &(dyn std::error::Error + 'static)) -> String {
    anyhow::Chain::new(err)
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}

pub type Result<T> = std::result::Result<T, Error>;
