use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock as StdRwLock};
use std::time::Duration;

use nctx_coerce::CoercionEngine;
use nctx_gate::{CommitGate, GateDecision, Violation};
use nctx_notify::{ChangeFeed, RawChange};
use nctx_protocol::{
    Credentials, DataNode, DatastoreTarget, EditRecord, ErrorTag, ErrorType, RpcError, RpcReply,
    RpcRequest,
};
use nctx_schema::{PathResolver, SchemaOracle};
use nctx_store::{diff_trees, DataTree, NodeChange};
use nctx_types::{DataPath, PathStep};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::auth::{AllowAllAuth, AuthProvider, Identity};
use crate::config::ServerConfig;
use crate::datastore::EditApplier;
use crate::error::{ServerError, ServerResult};
use crate::operations::{OperationCall, OperationHandler};

#[derive(Default)]
struct Datastores {
    running: DataTree,
    startup: DataTree,
}

/// Per-session state: who it is and the edits made to its candidate.
///
/// The candidate is kept as pending edits rather than a tree snapshot, so
/// a commit replays them on top of whatever `running` is at that moment.
struct SessionState {
    identity: Identity,
    pending: Vec<EditRecord>,
}

/// An in-process datastore backend.
///
/// Holds `running` and `startup` trees, one private candidate per session,
/// and validates every tree that would become `running` with a
/// [`CommitGate`]. Commits are serialized by a single write lock and
/// announced on the [`ChangeFeed`].
pub struct LoopbackServer {
    config: ServerConfig,
    resolver: PathResolver,
    engine: CoercionEngine,
    gate: CommitGate,
    auth: Arc<dyn AuthProvider>,
    stores: RwLock<Datastores>,
    sessions: Mutex<HashMap<u32, SessionState>>,
    /// Operation schema path to its handler.
    operations: StdRwLock<HashMap<String, Arc<dyn OperationHandler>>>,
    next_session: AtomicU32,
    response_delay_ms: AtomicU64,
    shut_down: AtomicBool,
    feed: ChangeFeed,
}

impl LoopbackServer {
    pub fn new(config: ServerConfig, schema: Arc<dyn SchemaOracle>) -> Self {
        Self::with_auth(config, schema, Arc::new(AllowAllAuth))
    }

    pub fn with_auth(
        config: ServerConfig,
        schema: Arc<dyn SchemaOracle>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let resolver = PathResolver::new(schema);
        let gate = CommitGate::with_default_stages(resolver.clone(), config.gate.clone());
        let feed = ChangeFeed::new(config.feed_capacity);
        info!(
            name = %config.name,
            modules = ?resolver.oracle().modules(),
            "loopback server started"
        );
        Self {
            response_delay_ms: AtomicU64::new(config.response_delay_ms),
            config,
            resolver,
            engine: CoercionEngine::new(),
            gate,
            auth,
            stores: RwLock::new(Datastores::default()),
            sessions: Mutex::new(HashMap::new()),
            operations: StdRwLock::new(HashMap::new()),
            next_session: AtomicU32::new(1),
            shut_down: AtomicBool::new(false),
            feed,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The feed every successful commit is announced on.
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.response_delay_ms.load(Ordering::SeqCst))
    }

    /// Change the latency added before every reply.
    pub fn set_response_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.response_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Stop serving: every later request fails as if the connection broke.
    pub fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            info!(name = %self.config.name, "loopback server shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().expect("session lock poisoned").len()
    }

    /// A snapshot of `running`.
    pub async fn running(&self) -> DataTree {
        self.stores.read().await.running.clone()
    }

    /// A snapshot of `startup`.
    pub async fn startup(&self) -> DataTree {
        self.stores.read().await.startup.clone()
    }

    /// Apply edits straight to `running`, through the gate, as an
    /// anonymous session 0 would.
    pub async fn seed(&self, edits: &[EditRecord]) -> Result<(), Vec<RpcError>> {
        let mut stores = self.stores.write().await;
        let mut candidate = stores.running.clone();
        self.applier()
            .apply_all(&mut candidate, edits)
            .map_err(|e| vec![e])?;
        self.replace_running(&mut stores, candidate, 0)
    }

    /// Serve the RPC or action at `path` with `handler`, replacing any
    /// earlier handler for it.
    pub fn register_operation(
        &self,
        path: &str,
        handler: Arc<dyn OperationHandler>,
    ) -> ServerResult<()> {
        let resolved = self
            .resolver
            .resolve_query(path)
            .map_err(|e| ServerError::Config(e.to_string()))?;
        let node = resolved
            .node
            .filter(|node| node.is_operation())
            .ok_or_else(|| ServerError::Config(format!("{path} is not an rpc or action")))?;
        info!(operation = %node.path, "operation handler registered");
        self.operations
            .write()
            .expect("operation lock poisoned")
            .insert(node.path.clone(), handler);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// Authenticate a client and open a session for it.
    pub async fn open_session(&self, credentials: &Credentials) -> Result<u32, RpcError> {
        if !credentials.is_authenticated() && !self.config.allow_anonymous {
            return Err(RpcError::new(
                ErrorType::Protocol,
                ErrorTag::AccessDenied,
                "anonymous sessions are not allowed",
            ));
        }
        let identity = self.auth.authenticate(credentials).await.map_err(|e| {
            warn!(method = credentials.display_name(), error = %e, "authentication failed");
            RpcError::new(ErrorType::Protocol, ErrorTag::AccessDenied, e.to_string())
        })?;

        let id = self.next_session.fetch_add(1, Ordering::SeqCst);
        info!(session = id, user = %identity.name, "session opened");
        self.sessions.lock().expect("session lock poisoned").insert(
            id,
            SessionState {
                identity,
                pending: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Forget a session and its candidate edits.
    pub fn end_session(&self, session: u32) {
        let removed = self
            .sessions
            .lock()
            .expect("session lock poisoned")
            .remove(&session);
        if let Some(state) = removed {
            info!(
                session,
                user = %state.identity.name,
                dropped_edits = state.pending.len(),
                "session closed"
            );
        }
    }

    /// Serve one request for an established session.
    pub async fn handle(&self, session: u32, request: RpcRequest) -> RpcReply {
        debug!(session, rpc = request.type_name(), "request");
        if !self.has_session(session) {
            return RpcReply::error(RpcError::new(
                ErrorType::Protocol,
                ErrorTag::OperationFailed,
                format!("no open session {session}"),
            ));
        }

        let result = match request {
            RpcRequest::Hello { .. } => Err(vec![RpcError::new(
                ErrorType::Protocol,
                ErrorTag::OperationFailed,
                "session already established",
            )]),
            RpcRequest::GetConfig { source, filter } => {
                return match self.get_config(session, source, filter.as_deref()).await {
                    Ok(nodes) => RpcReply::Data { nodes },
                    Err(errors) => RpcReply::Error { errors },
                };
            }
            RpcRequest::EditConfig { target, edits } => self.edit_config(session, target, edits).await,
            RpcRequest::Commit => self.commit(session).await,
            RpcRequest::DiscardChanges => {
                self.with_session(session, |state| state.pending.clear());
                Ok(())
            }
            RpcRequest::Validate { source } => self.validate(session, source).await,
            RpcRequest::CopyConfig { source, target } => {
                self.copy_config(session, source, target).await
            }
            RpcRequest::Execute { path, input } => {
                return match self.execute(session, &path, input).await {
                    Ok(nodes) => RpcReply::Data { nodes },
                    Err(errors) => RpcReply::Error { errors },
                };
            }
            RpcRequest::CloseSession => {
                self.end_session(session);
                Ok(())
            }
        };

        match result {
            Ok(()) => RpcReply::Ok,
            Err(errors) => RpcReply::Error { errors },
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    async fn get_config(
        &self,
        session: u32,
        source: DatastoreTarget,
        filter: Option<&str>,
    ) -> Result<Vec<DataNode>, Vec<RpcError>> {
        let pattern = match filter {
            Some(expr) => {
                self.resolver
                    .resolve_query(expr)
                    .map_err(|e| vec![RpcError::unknown_element(expr, e.to_string())])?
                    .path
            }
            None => DataPath::root(),
        };
        let tree = self.view(session, source).await?;
        Ok(tree
            .query(&pattern)
            .into_iter()
            .map(|node| DataNode {
                path: node.key(),
                value: node.literal.clone(),
            })
            .collect())
    }

    async fn edit_config(
        &self,
        session: u32,
        target: DatastoreTarget,
        edits: Vec<EditRecord>,
    ) -> Result<(), Vec<RpcError>> {
        match target {
            DatastoreTarget::Candidate => {
                // Dry run so errors surface now rather than at commit.
                let mut candidate = self.view(session, DatastoreTarget::Candidate).await?;
                self.applier()
                    .apply_all(&mut candidate, &edits)
                    .map_err(|e| vec![e])?;
                let count = edits.len();
                self.with_session(session, |state| state.pending.extend(edits));
                debug!(session, edits = count, "candidate edited");
                Ok(())
            }
            DatastoreTarget::Running => {
                let mut stores = self.stores.write().await;
                let mut candidate = stores.running.clone();
                self.applier()
                    .apply_all(&mut candidate, &edits)
                    .map_err(|e| vec![e])?;
                self.replace_running(&mut stores, candidate, session)
            }
            DatastoreTarget::Startup => {
                let mut stores = self.stores.write().await;
                let mut candidate = stores.startup.clone();
                self.applier()
                    .apply_all(&mut candidate, &edits)
                    .map_err(|e| vec![e])?;
                self.check(&candidate)?;
                stores.startup = candidate;
                Ok(())
            }
        }
    }

    async fn commit(&self, session: u32) -> Result<(), Vec<RpcError>> {
        let pending = self.with_session(session, |state| state.pending.clone()).unwrap_or_default();
        if pending.is_empty() {
            return Ok(());
        }

        let mut stores = self.stores.write().await;
        let mut candidate = stores.running.clone();
        self.applier()
            .apply_all(&mut candidate, &pending)
            .map_err(|e| vec![e])?;
        self.replace_running(&mut stores, candidate, session)?;
        drop(stores);

        self.with_session(session, |state| state.pending.clear());
        Ok(())
    }

    async fn validate(&self, session: u32, source: DatastoreTarget) -> Result<(), Vec<RpcError>> {
        let tree = self.view(session, source).await?;
        self.check(&tree)
    }

    async fn copy_config(
        &self,
        session: u32,
        source: DatastoreTarget,
        target: DatastoreTarget,
    ) -> Result<(), Vec<RpcError>> {
        if source == target {
            return Err(vec![RpcError::invalid_value(
                target.as_str(),
                "source and target are the same datastore",
            )]);
        }
        let tree = self.view(session, source).await?;
        let mut stores = self.stores.write().await;
        match target {
            DatastoreTarget::Running => self.replace_running(&mut stores, tree, session),
            DatastoreTarget::Startup => {
                self.check(&tree)?;
                stores.startup = tree;
                info!(session, from = %source, "startup replaced");
                Ok(())
            }
            DatastoreTarget::Candidate => Err(vec![RpcError::operation_not_supported(
                "copy-config into the candidate datastore is not supported",
            )]),
        }
    }

    async fn execute(
        &self,
        session: u32,
        expr: &str,
        input: Vec<DataNode>,
    ) -> Result<Vec<DataNode>, Vec<RpcError>> {
        let resolved = self
            .resolver
            .resolve(expr)
            .map_err(|e| vec![RpcError::unknown_element(expr, e.to_string())])?;
        let path = resolved.path;
        let node = resolved
            .node
            .filter(|node| node.is_operation())
            .ok_or_else(|| vec![RpcError::invalid_value(path.to_string(), "not an rpc or action")])?;

        // An action runs on data that must exist.
        let running = self.stores.read().await.running.clone();
        for len in 1..path.len() {
            let ancestor = path.prefix(len);
            let needed = self
                .resolver
                .node_for(&ancestor)
                .is_some_and(|n| n.is_list() || n.is_presence_container());
            if needed && !running.contains(&ancestor) {
                return Err(vec![RpcError::data_missing(ancestor.to_string())]);
            }
        }

        let input_root = parameter_root(&path, &node.module, "input");
        let mut params = BTreeMap::new();
        for param in input {
            let (relative, literal) = self.parameter(&input_root, &param.path, param.value)?;
            params.insert(relative, literal);
        }

        let handler = self
            .operations
            .read()
            .expect("operation lock poisoned")
            .get(&node.path)
            .cloned()
            .ok_or_else(|| {
                vec![RpcError::operation_not_supported(format!(
                    "no handler for {}",
                    node.path
                ))]
            })?;
        let call = OperationCall {
            session,
            path: path.clone(),
            input: params,
        };
        let output = handler.invoke(&call).await.map_err(|e| vec![e])?;

        let output_root = parameter_root(&path, &node.module, "output");
        let mut nodes = Vec::with_capacity(output.len());
        for (relative, literal) in output {
            let full = format!("{output_root}/{relative}");
            let (_, literal) = self
                .parameter(&output_root, &full, Some(literal))
                .map_err(|_| {
                    vec![RpcError::operation_failed(format!(
                        "handler for {} returned bad output at {full}",
                        node.path
                    ))]
                })?;
            nodes.push(DataNode {
                path: full,
                value: Some(literal),
            });
        }
        info!(session, operation = %path, outputs = nodes.len(), "operation executed");
        Ok(nodes)
    }

    /// Check one parameter below `root` and return its path relative to
    /// `root` with its canonical literal.
    fn parameter(
        &self,
        root: &DataPath,
        expr: &str,
        value: Option<String>,
    ) -> Result<(String, String), Vec<RpcError>> {
        let resolved = self
            .resolver
            .resolve(expr)
            .map_err(|e| vec![RpcError::unknown_element(expr, e.to_string())])?;
        let prefix = format!("{root}/");
        let canonical = resolved.path.to_string();
        let relative = canonical
            .strip_prefix(&prefix)
            .ok_or_else(|| vec![RpcError::unknown_element(expr, format!("not below {root}"))])?;
        let node = resolved
            .node
            .filter(|node| node.is_leaf())
            .ok_or_else(|| vec![RpcError::invalid_value(expr, "parameters are leaves")])?;
        let literal = value.ok_or_else(|| {
            vec![RpcError::new(ErrorType::Application, ErrorTag::MissingElement, "a value is required")
                .at(expr)]
        })?;
        let typed = self
            .engine
            .decode(&node, &literal)
            .map_err(|e| vec![RpcError::invalid_value(expr, e.to_string())])?;
        Ok((relative.to_string(), self.engine.render(&typed)))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn applier(&self) -> EditApplier<'_> {
        EditApplier {
            resolver: &self.resolver,
            engine: &self.engine,
        }
    }

    fn has_session(&self, session: u32) -> bool {
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .contains_key(&session)
    }

    fn with_session<T>(&self, session: u32, f: impl FnOnce(&mut SessionState) -> T) -> Option<T> {
        self.sessions
            .lock()
            .expect("session lock poisoned")
            .get_mut(&session)
            .map(f)
    }

    /// The content of a datastore as `session` sees it.
    async fn view(&self, session: u32, source: DatastoreTarget) -> Result<DataTree, Vec<RpcError>> {
        let stores = self.stores.read().await;
        match source {
            DatastoreTarget::Running => Ok(stores.running.clone()),
            DatastoreTarget::Startup => Ok(stores.startup.clone()),
            DatastoreTarget::Candidate => {
                let pending = self.with_session(session, |state| state.pending.clone()).unwrap_or_default();
                let mut candidate = stores.running.clone();
                self.applier()
                    .apply_all(&mut candidate, &pending)
                    .map_err(|e| vec![e])?;
                Ok(candidate)
            }
        }
    }

    /// Run the gate over a tree that is about to become a datastore.
    fn check(&self, tree: &DataTree) -> Result<(), Vec<RpcError>> {
        let result = self
            .gate
            .evaluate(tree)
            .map_err(|e| vec![RpcError::operation_failed(e.to_string())])?;
        match result.decision {
            GateDecision::Accepted => Ok(()),
            GateDecision::Rejected { stage } => {
                warn!(stage = %stage, violations = result.violations.len(), "validation failed");
                Err(result.violations.into_iter().map(violation_error).collect())
            }
        }
    }

    /// Validate `candidate`, swap it in as `running`, and announce the
    /// difference.
    fn replace_running(
        &self,
        stores: &mut Datastores,
        candidate: DataTree,
        session: u32,
    ) -> Result<(), Vec<RpcError>> {
        self.check(&candidate)?;
        let diff = diff_trees(&stores.running, &candidate);
        stores.running = candidate;

        let changes: Vec<RawChange> = diff.changes.iter().map(raw_change).collect();
        info!(
            session,
            created = diff.additions(),
            modified = diff.modifications(),
            deleted = diff.removals(),
            "running datastore updated"
        );
        self.feed.publish(session, changes);
        Ok(())
    }
}

/// `<operation>/input` or `<operation>/output`.
fn parameter_root(operation: &DataPath, module: &str, which: &str) -> DataPath {
    operation.child(PathStep::qualified(module, which))
}

fn violation_error(violation: Violation) -> RpcError {
    let tag = match violation.stage.as_str() {
        "types" => ErrorTag::InvalidValue,
        "leafref" => ErrorTag::DataMissing,
        _ => ErrorTag::OperationFailed,
    };
    RpcError::new(ErrorType::Application, tag, violation.message).at(violation.path)
}

fn raw_change(change: &NodeChange) -> RawChange {
    match change {
        NodeChange::Created { node } => RawChange::created(node.key(), node.literal.clone()),
        NodeChange::Deleted { node } => RawChange::deleted(node.key(), node.literal.clone()),
        NodeChange::Modified { old, new } => {
            RawChange::modified(new.key(), old.literal.clone(), new.literal.clone())
        }
    }
}
