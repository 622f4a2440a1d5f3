//! Fetch, compare and generate, with the state the UI renders.
//!
//! Each side has a generation counter. Starting a fetch bumps it and aborts
//! the side's previous task, and an outcome is applied only if it carries the
//! current generation, so a slow earlier response can never overwrite a
//! newer one.

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::db::{self, Endpoint, FetchSettings, SchemaSnapshot};
use crate::diff::{self, SchemaDiff};
use crate::error::{Error, Result};
use crate::sqlgen::{self, GenerateOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The desired end state.
    Source,
    /// The currently deployed state.
    Target,
}

impl Side {
    pub fn label(&self) -> &'static str {
        match self {
            Side::Source => "Source (desired)",
            Side::Target => "Target (deployed)",
        }
    }

    fn index(&self) -> usize {
        match self {
            Side::Source => 0,
            Side::Target => 1,
        }
    }
}

/// Result of one background fetch, tagged with the request that produced it.
#[derive(Debug)]
pub struct FetchOutcome {
    pub side: Side,
    pub generation: u64,
    pub result: std::result::Result<SchemaSnapshot, String>,
}

#[derive(Default)]
struct SideState {
    snapshot: Option<SchemaSnapshot>,
    generation: u64,
    in_flight: bool,
    task: Option<JoinHandle<()>>,
}

pub struct SchemaCompare {
    sides: [SideState; 2],
    diff: Option<SchemaDiff>,
    error: Option<String>,
    settings: FetchSettings,
    outcomes: UnboundedSender<FetchOutcome>,
}

impl SchemaCompare {
    pub fn new(settings: FetchSettings, outcomes: UnboundedSender<FetchOutcome>) -> Self {
        Self {
            sides: Default::default(),
            diff: None,
            error: None,
            settings,
            outcomes,
        }
    }

    pub fn fetch_source(&mut self, url: &str, key: &str) {
        self.fetch(Side::Source, Endpoint::new(url, key));
    }

    pub fn fetch_target(&mut self, url: &str, key: &str) {
        self.fetch(Side::Target, Endpoint::new(url, key));
    }

    /// Starts a background fetch for `side`, superseding any fetch in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn fetch(&mut self, side: Side, endpoint: Endpoint) {
        let generation = self.begin_fetch(side);
        let settings = self.settings;
        let outcomes = self.outcomes.clone();

        tracing::info!(side = ?side, generation, endpoint = %endpoint.describe(), "fetching schema");
        let task = tokio::spawn(async move {
            let result = db::fetch_snapshot(&endpoint, &settings)
                .await
                .map_err(|e| e.report());
            // The receiver is gone only when the app is shutting down.
            let _ = outcomes.send(FetchOutcome {
                side,
                generation,
                result,
            });
        });
        self.sides[side.index()].task = Some(task);
    }

    pub(crate) fn begin_fetch(&mut self, side: Side) -> u64 {
        self.error = None;
        let state = &mut self.sides[side.index()];
        if let Some(previous) = state.task.take() {
            previous.abort();
        }
        state.generation += 1;
        state.in_flight = true;
        state.generation
    }

    /// Applies a finished fetch. Returns false if the outcome was stale.
    pub fn apply(&mut self, outcome: FetchOutcome) -> bool {
        let state = &mut self.sides[outcome.side.index()];
        if outcome.generation != state.generation {
            tracing::debug!(
                side = ?outcome.side,
                generation = outcome.generation,
                current = state.generation,
                "discarding stale fetch result"
            );
            return false;
        }

        state.in_flight = false;
        state.task = None;
        match outcome.result {
            Ok(snapshot) => {
                state.snapshot = Some(snapshot);
                self.diff = None;
            }
            Err(message) => {
                tracing::error!(side = ?outcome.side, error = %message, "schema fetch failed");
                self.error = Some(message);
            }
        }
        true
    }

    /// Compares source against target and stores the result.
    pub fn compare(&mut self) -> Result<&SchemaDiff> {
        let result = match (self.source(), self.target()) {
            (Some(source), Some(target)) => diff::diff(source, target),
            _ => {
                let missing: Vec<&str> = [Side::Source, Side::Target]
                    .into_iter()
                    .filter(|side| self.snapshot(*side).is_none())
                    .map(|side| side.label())
                    .collect();
                return Err(self.fail(Error::MissingSnapshots(missing.join(", "))));
            }
        };

        tracing::info!(changes = result.change_count(), "compared schemas");
        self.error = None;
        Ok(&*self.diff.insert(result))
    }

    /// Renders the migration script for the last comparison.
    pub fn generate_sql(&mut self, options: &GenerateOptions) -> Result<String> {
        if let (Some(diff), Some(source)) = (&self.diff, self.source()) {
            return Ok(sqlgen::generate_migration_now(diff, source, options));
        }
        Err(self.fail(Error::NoDiff))
    }

    fn fail(&mut self, error: Error) -> Error {
        self.error = Some(error.report());
        error
    }

    pub fn source(&self) -> Option<&SchemaSnapshot> {
        self.snapshot(Side::Source)
    }

    pub fn target(&self) -> Option<&SchemaSnapshot> {
        self.snapshot(Side::Target)
    }

    pub fn snapshot(&self, side: Side) -> Option<&SchemaSnapshot> {
        self.sides[side.index()].snapshot.as_ref()
    }

    pub fn diff(&self) -> Option<&SchemaDiff> {
        self.diff.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self, side: Side) -> bool {
        self.sides[side.index()].in_flight
    }

    pub fn loading(&self) -> bool {
        self.sides.iter().any(|s| s.in_flight)
    }
}
