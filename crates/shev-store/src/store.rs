//! The store session: location context, inserts, and searches.
//!
//! A [`Store`] binds one backend client and one location context. Every
//! insert is stamped with that context; updating it affects later inserts
//! only. Forked sessions share the client and hold their own context.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use shev_env::EnvConfig;
use shev_topology::{local_hostname, Directory, TopologyLocator};
use shev_types::{Event, Field, Identity, Location};

use crate::backend::{IndexClient, SearchRequest};
use crate::elastic::ElasticClient;
use crate::error::{BackendError, QueryError, StoreError, WriteStage};
use crate::index;
use crate::query::{self, field_map, EventQuery};

/// Page size used by the convenience searches.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// What to connect with. Empty fields are discovered.
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    pub location: Location,
    /// Environment tag; resolved from the cluster when empty.
    pub env: String,
    /// Per-request backend timeout.
    pub timeout: Option<Duration>,
}

impl StoreOptions {
    /// Fills the empty fields.
    ///
    /// A missing host is the machine's hostname. A missing cluster or rack
    /// places the host through `locator`, which sets both. A missing
    /// environment is resolved from the cluster.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Topology` when the hostname cannot be read or
    /// the host cannot be placed.
    pub fn discover<D: Directory>(
        mut self,
        config: &EnvConfig,
        locator: &TopologyLocator<D>,
    ) -> Result<Self, StoreError> {
        if self.location.host.is_empty() {
            self.location.host = local_hostname()?;
        }

        if self.location.cluster.is_empty() || self.location.rack.is_empty() {
            let placement = locator.describe(&self.location.host).map_err(|e| {
                tracing::error!(host = %self.location.host, error = %e, "failed to locate host");
                e
            })?;
            self.location.cluster = placement.cluster;
            self.location.rack = placement.rack;
        }

        if self.env.is_empty() {
            self.env = config.resolve(&self.location.cluster).to_string();
        }

        Ok(self)
    }
}

/// A session over the event index.
#[derive(Debug)]
pub struct Store<C> {
    client: Arc<C>,
    location: Location,
    /// Milliseconds since the epoch of the last insert on this handle.
    last_created: AtomicI64,
}

impl Store<ElasticClient> {
    /// Connects to the backend configured for `env` with an empty location.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Configuration` when `env` has no usable
    /// endpoint, `StoreError::Connection` when the client cannot be built,
    /// and any error of [`Store::open`].
    pub fn connect_env(
        config: &EnvConfig,
        env: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, StoreError> {
        let endpoint = config.endpoint(env)?;
        let client = ElasticClient::new(endpoint, timeout).map_err(|e| {
            tracing::error!(env, error = %e, "failed to build backend client");
            StoreError::Connection(e)
        })?;
        tracing::info!(env, endpoint = %client.endpoint(), "connecting to event store");
        Self::open(client)
    }

    /// Connects with a location, filling in whatever `options` leaves empty.
    ///
    /// See [`StoreOptions::discover`] for how the gaps are filled.
    ///
    /// # Errors
    ///
    /// Every error of [`StoreOptions::discover`] and
    /// [`Store::connect_env`].
    pub fn connect<D: Directory>(
        config: &EnvConfig,
        options: StoreOptions,
        locator: &TopologyLocator<D>,
    ) -> Result<Self, StoreError> {
        let StoreOptions {
            location,
            env,
            timeout,
        } = options.discover(config, locator)?;

        let mut store = Self::connect_env(config, &env, timeout)?;
        store.update_location(location);
        Ok(store)
    }
}

impl<C: IndexClient> Store<C> {
    /// Binds `client` and makes sure the index exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::IndexCreationFailed` if the index is missing
    /// and cannot be created.
    pub fn open(client: C) -> Result<Self, StoreError> {
        Self::open_shared(Arc::new(client))
    }

    /// Like [`Store::open`] for a client that is already shared.
    pub fn open_shared(client: Arc<C>) -> Result<Self, StoreError> {
        index::ensure_ready(client.as_ref())?;
        Ok(Self {
            client,
            location: Location::default(),
            last_created: AtomicI64::new(i64::MIN),
        })
    }

    /// A new session on the same client, starting from this location.
    pub fn fork(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            location: self.location.clone(),
            last_created: AtomicI64::new(self.last_created.load(Ordering::Relaxed)),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Replaces the location stamped on subsequent inserts.
    pub fn update_location(&mut self, location: Location) {
        tracing::debug!(
            cluster = %location.cluster,
            rack = %location.rack,
            host = %location.host,
            component = %location.component,
            "updated session location"
        );
        self.location = location;
    }

    // ── Index lifecycle ──────────────────────────────────────────────

    /// See [`index::ensure_ready`].
    pub fn ensure_ready(&self) -> Result<(), StoreError> {
        index::ensure_ready(self.client.as_ref())
    }

    /// See [`index::reset`].
    pub fn reset(&self) -> Result<(), StoreError> {
        index::reset(self.client.as_ref())
    }

    // ── Inserts ──────────────────────────────────────────────────────

    /// Stamps `payload` with this session's location and `identity`, writes
    /// it, and flushes so it is immediately searchable.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if the payload cannot be
    /// serialized or either backend call fails.
    pub fn insert<M: Serialize + ?Sized>(
        &self,
        payload: &M,
        identity: Identity,
    ) -> Result<Event, StoreError> {
        let msg = serde_json::to_value(payload).map_err(|e| write_failed(WriteStage::Write, e.into()))?;
        let event = Event::stamp(&self.location, identity, msg, self.next_created());
        let document =
            serde_json::to_value(&event).map_err(|e| write_failed(WriteStage::Write, e.into()))?;

        self.client
            .write(&document)
            .map_err(|e| write_failed(WriteStage::Write, e))?;
        self.client
            .flush()
            .map_err(|e| write_failed(WriteStage::Flush, e))?;

        tracing::debug!(
            kind = %event.kind,
            name = %event.name,
            cluster = %event.cluster,
            "inserted event"
        );
        Ok(event)
    }

    /// Inserts without a workload identity.
    pub fn insert_plain<M: Serialize + ?Sized>(&self, payload: &M) -> Result<Event, StoreError> {
        self.insert(payload, Identity::none())
    }

    pub fn insert_with_service<M: Serialize + ?Sized>(
        &self,
        payload: &M,
        id: &str,
        name: &str,
    ) -> Result<Event, StoreError> {
        self.insert(payload, Identity::service(id, name))
    }

    /// Inserts a task event referencing its owning `service`.
    pub fn insert_with_task<M: Serialize + ?Sized>(
        &self,
        payload: &M,
        id: &str,
        name: &str,
        service: &str,
    ) -> Result<Event, StoreError> {
        self.insert(payload, Identity::task(id, name, service))
    }

    /// A timestamp strictly after every earlier one from this handle, at the
    /// millisecond precision the index stores.
    fn next_created(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_created
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or(now);
        let assigned = now.max(previous.saturating_add(1));
        DateTime::from_timestamp_millis(assigned).unwrap_or_else(Utc::now)
    }

    // ── Searches ─────────────────────────────────────────────────────

    /// Runs a backend-native query, sorted by `created` ascending.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Backend` if the search fails and
    /// `QueryError::Decode` if a hit is not an event.
    pub fn search_by_query(
        &self,
        query: &Value,
        from: usize,
        size: usize,
    ) -> Result<Vec<Event>, QueryError> {
        let request = SearchRequest {
            query: query.clone(),
            from,
            size,
            sort_field: Field::Created,
            ascending: true,
        };

        let response = self.client.search(&request).map_err(|e| {
            tracing::error!(error = %e, "search failed");
            QueryError::Backend(e)
        })?;
        tracing::debug!(
            took_ms = response.took_ms,
            total_hits = response.total_hits,
            "search completed"
        );

        response
            .hits
            .into_iter()
            .map(|hit| serde_json::from_value(hit).map_err(QueryError::Decode))
            .collect()
    }

    /// Runs a built query.
    pub fn search(
        &self,
        query: &EventQuery,
        from: usize,
        size: usize,
    ) -> Result<Vec<Event>, QueryError> {
        self.search_by_query(&query.to_query(), from, size)
    }

    /// Runs a caller-supplied JSON query body verbatim.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::MalformedRaw` if `body` is not JSON, plus the
    /// errors of [`Store::search_by_query`].
    pub fn search_by_raw(
        &self,
        body: &str,
        from: usize,
        size: usize,
    ) -> Result<Vec<Event>, QueryError> {
        let query = query::raw(body).map_err(|e| {
            tracing::error!(error = %e, "rejected raw query");
            e
        })?;
        self.search_by_query(&query, from, size)
    }

    /// Exact conditions from `term` and full-text conditions from `matches`,
    /// all required.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::UnknownField` if a key is not an event field,
    /// `QueryError::DuplicateField` if two keys of one map name the same
    /// field, plus the errors of [`Store::search_by_query`].
    pub fn search_by_map<T, TK, TV, M, MK, MV>(
        &self,
        term: T,
        matches: M,
        from: usize,
        size: usize,
    ) -> Result<Vec<Event>, QueryError>
    where
        T: IntoIterator<Item = (TK, TV)>,
        TK: AsRef<str>,
        TV: Into<String>,
        M: IntoIterator<Item = (MK, MV)>,
        MK: AsRef<str>,
        MV: Into<String>,
    {
        let query = EventQuery::new()
            .terms(field_map(term)?)
            .matches(field_map(matches)?);
        self.search(&query, from, size)
    }

    pub fn search_cluster(&self, cluster: &str) -> Result<Vec<Event>, QueryError> {
        self.first_page(EventQuery::new().cluster(cluster))
    }

    /// A rack, optionally within one cluster.
    pub fn search_rack(&self, rack: &str, cluster: &str) -> Result<Vec<Event>, QueryError> {
        self.first_page(EventQuery::new().cluster(cluster).rack(rack))
    }

    pub fn search_host(
        &self,
        host: &str,
        cluster: &str,
        rack: &str,
    ) -> Result<Vec<Event>, QueryError> {
        self.first_page(EventQuery::new().cluster(cluster).rack(rack).host(host))
    }

    pub fn search_component(
        &self,
        component: &str,
        cluster: &str,
        rack: &str,
        host: &str,
    ) -> Result<Vec<Event>, QueryError> {
        self.first_page(
            EventQuery::new()
                .cluster(cluster)
                .rack(rack)
                .host(host)
                .component(component),
        )
    }

    /// Service events by id and/or name, optionally within one cluster.
    pub fn search_service(
        &self,
        id: &str,
        name: &str,
        cluster: &str,
    ) -> Result<Vec<Event>, QueryError> {
        self.first_page(EventQuery::new().cluster(cluster).service(id, name))
    }

    /// Task events by id and/or name, optionally within one cluster.
    pub fn search_task(
        &self,
        id: &str,
        name: &str,
        cluster: &str,
    ) -> Result<Vec<Event>, QueryError> {
        self.first_page(EventQuery::new().cluster(cluster).task(id, name))
    }

    fn first_page(&self, query: EventQuery) -> Result<Vec<Event>, QueryError> {
        self.search(&query, 0, DEFAULT_PAGE_SIZE)
    }
}

fn write_failed(stage: WriteStage, source: BackendError) -> StoreError {
    tracing::error!(%stage, error = %source, "insert failed");
    StoreError::WriteFailed { stage, source }
}
