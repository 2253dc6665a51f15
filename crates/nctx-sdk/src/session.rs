use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use nctx_coerce::{CoercionEngine, RawValue};
use nctx_notify::{ChangeFeed, Subscription, SubscriptionBridge};
use nctx_protocol::{
    capabilities, Connector, DataNode, DatastoreTarget, EditRecord, ProtocolError, RpcReply,
    RpcRequest, Transport,
};
use nctx_schema::{PathResolver, ResolvedPath, SchemaOracle};
use nctx_txn::{prepare, PendingEdit, StagedValue, TransactionBuffer};
use nctx_types::{DataPath, MovePosition, PathStep, Predicate, SchemaNode, TypedValue};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{CommitError, SessionError, SessionResult};
use crate::receipt::CommitReceipt;

/// Where a session is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing staged.
    Idle,
    /// Edits are waiting for a commit or a discard.
    Staging,
    /// Closed; every further call fails.
    Closed,
}

/// A client session against one datastore backend.
///
/// Writes are staged locally in a [`TransactionBuffer`] and sent as one
/// atomic batch on [`commit`](Self::commit). Reads go straight to the
/// backend and never wait on the buffer.
pub struct DatastoreSession {
    transport: Box<dyn Transport>,
    resolver: PathResolver,
    engine: CoercionEngine,
    config: SessionConfig,
    buffer: Mutex<TransactionBuffer>,
    target: RwLock<DatastoreTarget>,
    session_id: u32,
    capabilities: Vec<String>,
    closed: AtomicBool,
    /// Set once edits were sent to the backend candidate and not yet
    /// committed or discarded there.
    candidate_dirty: AtomicBool,
}

impl DatastoreSession {
    /// Connect to `config.endpoint` and exchange hellos.
    pub async fn connect(
        config: SessionConfig,
        connector: &dyn Connector,
        schema: Arc<dyn SchemaOracle>,
    ) -> SessionResult<Self> {
        let deadline = config.read_timeout();
        let transport = with_deadline(deadline, connector.connect(&config.endpoint))
            .await?
            .map_err(transport_error)?;

        let hello = RpcRequest::Hello {
            capabilities: vec![capabilities::BASE_1_0.into(), capabilities::BASE_1_1.into()],
            credentials: config.credentials.clone(),
        };
        let reply = with_deadline(deadline, transport.send(hello))
            .await?
            .map_err(transport_error)?;
        let (session_id, capabilities) = match reply {
            RpcReply::Hello {
                session_id,
                capabilities,
            } => (session_id, capabilities),
            RpcReply::Error { errors } => return Err(SessionError::Rejected(errors)),
            other => return Err(unexpected("hello", &other).into()),
        };

        info!(
            endpoint = %config.endpoint,
            session = session_id,
            user = config.credentials.username().unwrap_or("anonymous"),
            "session connected"
        );
        Ok(Self {
            transport,
            resolver: PathResolver::new(schema),
            engine: CoercionEngine::new(),
            target: RwLock::new(config.target),
            config,
            buffer: Mutex::new(TransactionBuffer::new()),
            session_id,
            capabilities,
            closed: AtomicBool::new(false),
            candidate_dirty: AtomicBool::new(false),
        })
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Capabilities the backend announced.
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub async fn state(&self) -> SessionState {
        if self.is_closed() {
            return SessionState::Closed;
        }
        if self.buffer.lock().await.is_empty() {
            SessionState::Idle
        } else {
            SessionState::Staging
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Returns `true` if the backend candidate may still hold edits from
    /// an exchange that didn't finish.
    pub fn candidate_is_dirty(&self) -> bool {
        self.candidate_dirty.load(Ordering::SeqCst)
    }

    /// The datastore reads come from.
    pub fn target(&self) -> DatastoreTarget {
        *self.target.read().expect("target lock poisoned")
    }

    pub fn set_target(&self, target: DatastoreTarget) {
        *self.target.write().expect("target lock poisoned") = target;
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Read every value at or below `expr`.
    ///
    /// Keys are canonical data paths. List keys may be left out of `expr`
    /// to read all entries, `/module:*` reads a whole module and `/` the
    /// whole datastore. Nothing matching is an empty map, not an error.
    pub async fn read(&self, expr: &str) -> SessionResult<BTreeMap<String, TypedValue>> {
        self.ensure_open()?;
        let resolved = self.resolver.resolve_query(expr)?;
        let filter = (!resolved.path.is_root()).then(|| resolved.canonical());
        let source = self.target();
        let reply = self.round_trip(RpcRequest::GetConfig { source, filter }).await?;
        let nodes = match reply {
            RpcReply::Data { nodes } => nodes,
            RpcReply::Error { errors } => return Err(SessionError::Rejected(errors)),
            other => return Err(unexpected("get-config", &other).into()),
        };

        let mut values = BTreeMap::new();
        for node in nodes {
            let Some(literal) = node.value else {
                continue;
            };
            let path = DataPath::parse(&node.path)?;
            let Some(schema) = self.resolver.node_for(&path) else {
                warn!(path = %node.path, "backend returned a node the schema doesn't know");
                continue;
            };
            match self.engine.decode(&schema, &literal) {
                Ok(value) => {
                    values.insert(node.path, value);
                }
                Err(e) => warn!(path = %node.path, error = %e, "stored value doesn't decode"),
            }
        }
        debug!(path = %resolved, %source, values = values.len(), "read");
        Ok(values)
    }

    /// The entries of the list or leaf-list at `expr`, in the order the
    /// backend keeps them.
    ///
    /// A list entry is its key leaves by name; a leaf-list entry is its
    /// value under `"."`. Key predicates on enclosing lists narrow the
    /// result; predicates on the list itself are not allowed.
    pub async fn list_instances(
        &self,
        expr: &str,
    ) -> SessionResult<Vec<BTreeMap<String, TypedValue>>> {
        self.ensure_open()?;
        let resolved = self.resolver.resolve_query(expr)?;
        let list = match &resolved.node {
            Some(node) if node.is_list() || node.is_leaf_list() => node.clone(),
            _ => {
                return Err(SessionError::InvalidOperation(format!(
                    "{} is not a list or leaf-list",
                    resolved.path
                )))
            }
        };
        if resolved.path.last().is_some_and(|step| !step.predicates.is_empty()) {
            return Err(SessionError::InvalidOperation(format!(
                "{}: name the list without predicates to get its entries",
                resolved.path
            )));
        }

        let source = self.target();
        let request = RpcRequest::GetConfig {
            source,
            filter: Some(resolved.canonical()),
        };
        let nodes = match self.round_trip(request).await? {
            RpcReply::Data { nodes } => nodes,
            RpcReply::Error { errors } => return Err(SessionError::Rejected(errors)),
            other => return Err(unexpected("get-config", &other).into()),
        };

        let mut instances = Vec::new();
        for node in nodes {
            let path = DataPath::parse(&node.path)?;
            if path.schema_path() != list.path {
                continue;
            }
            let instance = if list.is_leaf_list() {
                let literal = node.value.unwrap_or_default();
                let value = self.engine.decode(&list, &literal)?;
                BTreeMap::from([(".".to_string(), value)])
            } else {
                self.entry_keys(&path, &list)?
            };
            instances.push(instance);
        }
        debug!(path = %resolved, instances = instances.len(), "listed instances");
        Ok(instances)
    }

    /// Read the current target as a flat JSON object of path to value.
    pub async fn dump(&self) -> SessionResult<Value> {
        let values = self.read("/").await?;
        let object: Map<String, Value> = values
            .into_iter()
            .map(|(path, value)| (path, Value::String(self.engine.render(&value))))
            .collect();
        Ok(Value::Object(object))
    }

    // -----------------------------------------------------------------------
    // Staging
    // -----------------------------------------------------------------------

    /// Stage a new value for the leaf at `expr`.
    ///
    /// The value is coerced to the leaf's type right away. Whether an
    /// unparsable or out-of-range value fails here or at commit depends on
    /// the configured validation mode; a value of the wrong kind always
    /// fails here.
    pub async fn set_leaf(&self, expr: &str, value: impl Into<RawValue>) -> SessionResult<()> {
        self.ensure_open()?;
        let (path, node) = self.resolve_config(expr)?;
        if !node.is_leaf() {
            return Err(SessionError::InvalidOperation(format!(
                "{path} is a {}, only leaves can be set",
                node.kind.name()
            )));
        }
        if self.resolver.is_list_key(&node) {
            return Err(SessionError::InvalidOperation(format!(
                "{path} is a list key; keys are given in the entry's predicates"
            )));
        }
        let staged = prepare(&self.engine, &node, value.into(), self.config.validation)?;
        self.stage(PendingEdit::set(path, staged)).await?;
        Ok(())
    }

    /// Stage removal of the node at `expr` and everything below it.
    pub async fn delete_item(&self, expr: &str) -> SessionResult<()> {
        self.ensure_open()?;
        let (path, _) = self.resolve_config(expr)?;
        self.stage(PendingEdit::delete(path)).await?;
        Ok(())
    }

    /// Stage creation of the presence container at `expr`.
    pub async fn create_item(&self, expr: &str) -> SessionResult<()> {
        self.ensure_open()?;
        let (path, node) = self.resolve_config(expr)?;
        if !node.is_presence_container() {
            return Err(SessionError::InvalidOperation(format!(
                "{path} is a {}, only presence containers can be created",
                node.kind.name()
            )));
        }
        self.stage(PendingEdit::create(path)).await?;
        Ok(())
    }

    /// Stage creation of a list entry (`/m:list[key='v']`) or a leaf-list
    /// entry (`/m:leaf-list[.='v']`).
    pub async fn create_list_entry(&self, expr: &str) -> SessionResult<()> {
        self.ensure_open()?;
        let (path, node) = self.resolve_entry(expr)?;
        let value = match path.last().and_then(|step| step.leaf_list_value()) {
            Some(literal) if node.is_leaf_list() => prepare(
                &self.engine,
                &node,
                RawValue::from(literal),
                self.config.validation,
            )?,
            _ => StagedValue::absent(),
        };
        self.stage(PendingEdit::create_list_entry(path, value)).await?;
        Ok(())
    }

    /// Stage removal of a list entry or leaf-list entry.
    pub async fn remove_list_entry(&self, expr: &str) -> SessionResult<()> {
        self.ensure_open()?;
        let (path, _) = self.resolve_entry(expr)?;
        self.stage(PendingEdit::remove_list_entry(path)).await?;
        Ok(())
    }

    /// Stage moving the entry at `expr` of a user-ordered list or
    /// leaf-list to `position`.
    ///
    /// A relative position names its sibling by key predicates (lists) or
    /// a `.` predicate (leaf-lists). The move is applied at commit, after
    /// every edit staged before it.
    pub async fn move_item(&self, expr: &str, position: MovePosition) -> SessionResult<()> {
        self.ensure_open()?;
        let (path, node) = self.resolve_entry(expr)?;
        if !node.is_user_ordered() {
            return Err(SessionError::InvalidOperation(format!(
                "{path} is a {} that isn't ordered-by user",
                node.kind.name()
            )));
        }
        let position = match position.anchor_path(&path) {
            Some(anchor) => {
                let (anchor, _) = self.resolve_entry(&anchor.to_string())?;
                let predicates: Vec<Predicate> = anchor
                    .last()
                    .map(|step| step.predicates.clone())
                    .unwrap_or_default();
                position.with_anchor(predicates)
            }
            None => position,
        };
        self.stage(PendingEdit::move_entry(path, position)).await?;
        Ok(())
    }

    /// Stage a prepared edit as is. Returns the edit it replaced, if any.
    pub async fn stage(&self, edit: PendingEdit) -> SessionResult<Option<PendingEdit>> {
        self.ensure_open()?;
        let replaced = self.buffer.lock().await.stage(edit)?;
        Ok(replaced)
    }

    /// Pending edits in replay order: each path where it was last staged.
    pub async fn diff(&self) -> Vec<PendingEdit> {
        self.buffer.lock().await.diff()
    }

    /// Drop every pending edit.
    ///
    /// The backend is only contacted when an earlier commit or validate
    /// left edits in its candidate; those are discarded there too.
    pub async fn discard(&self) -> SessionResult<()> {
        let mut buffer = self.buffer.lock().await;
        self.ensure_open()?;
        buffer.clear();
        if self.candidate_dirty.load(Ordering::SeqCst) {
            self.reset_candidate().await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    /// Send every pending edit to the backend as one transaction.
    ///
    /// The backend validates the resulting tree as a whole. On success the
    /// buffer is cleared; on any failure nothing is applied and the buffer
    /// is kept so the edits can be fixed and committed again. Commits on
    /// one session are serialized.
    pub async fn commit(&self) -> SessionResult<CommitReceipt> {
        let mut buffer = self.buffer.lock().await;
        self.ensure_open()?;
        if buffer.is_empty() {
            return Ok(CommitReceipt::empty());
        }

        let edits: Vec<EditRecord> = buffer.iter().map(edit_record).collect();
        let count = edits.len();
        let deadline = self.config.commit_timeout();
        let use_candidate = self.has_capability(capabilities::CANDIDATE);
        let started = Instant::now();

        let outcome = match tokio::time::timeout(deadline, self.push(edits, use_candidate)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(CommitError::Timeout(deadline)),
        };
        if let Err(e) = outcome {
            warn!(session = self.session_id, edits = count, error = %e, "commit failed");
            if use_candidate {
                if let Err(reset) = self.reset_candidate().await {
                    warn!(session = self.session_id, error = %reset, "candidate left dirty");
                }
            }
            return Err(e.into());
        }

        buffer.clear();
        let receipt = CommitReceipt::new(count, started.elapsed());
        info!(
            session = self.session_id,
            transaction = %receipt.transaction_id,
            edits = count,
            "commit succeeded"
        );
        Ok(receipt)
    }

    /// Ask the backend whether committing the pending edits would succeed,
    /// without committing them.
    pub async fn validate(&self) -> SessionResult<()> {
        let buffer = self.buffer.lock().await;
        self.ensure_open()?;
        if !self.has_capability(capabilities::CANDIDATE) {
            return Err(SessionError::InvalidOperation(
                "backend has no candidate datastore to validate".into(),
            ));
        }

        let edits: Vec<EditRecord> = buffer.iter().map(edit_record).collect();
        let staged = !edits.is_empty();
        // Start from running so leftovers of an interrupted exchange don't
        // take part.
        self.reset_candidate().await?;
        let mut result = Ok(());
        if staged {
            let edit = RpcRequest::EditConfig {
                target: DatastoreTarget::Candidate,
                edits,
            };
            self.candidate_dirty.store(true, Ordering::SeqCst);
            result = self.expect_ok("edit-config", edit).await;
        }
        if result.is_ok() {
            let request = RpcRequest::Validate {
                source: DatastoreTarget::Candidate,
            };
            result = self.expect_ok("validate", request).await;
        }
        if staged {
            if let Err(e) = self.reset_candidate().await {
                warn!(session = self.session_id, error = %e, "candidate left dirty");
            }
        }
        debug!(session = self.session_id, valid = result.is_ok(), "validated");
        result
    }

    /// Replace one datastore with the content of another, such as
    /// `running` into `startup`.
    pub async fn copy_config(
        &self,
        source: DatastoreTarget,
        target: DatastoreTarget,
    ) -> SessionResult<()> {
        self.ensure_open()?;
        self.expect_ok("copy-config", RpcRequest::CopyConfig { source, target })
            .await?;
        info!(session = self.session_id, %source, %target, "datastore copied");
        Ok(())
    }

    /// Run the RPC or action at `expr` and return its output.
    ///
    /// `input` maps parameter paths relative to the operation's `input`,
    /// such as `"delay"`, to values coerced like [`set_leaf`](Self::set_leaf)
    /// values. The output comes back keyed relative to `output`. An action
    /// names the entry it runs on: `/m:list[key='v']/action`. The buffer
    /// is left alone.
    pub async fn execute(
        &self,
        expr: &str,
        input: BTreeMap<String, RawValue>,
    ) -> SessionResult<BTreeMap<String, TypedValue>> {
        self.ensure_open()?;
        let ResolvedPath { path, node } = self.resolver.resolve(expr)?;
        let operation = node.filter(|node| node.is_operation()).ok_or_else(|| {
            SessionError::InvalidOperation(format!("{path} is not an rpc or action"))
        })?;
        let input_root = path.child(PathStep::qualified(operation.module.clone(), "input"));

        let mut params = Vec::with_capacity(input.len());
        for (relative, raw) in input {
            let param = self.resolver.resolve(&format!("{input_root}/{relative}"))?;
            let leaf = param.node.filter(|node| node.is_leaf()).ok_or_else(|| {
                SessionError::InvalidOperation(format!("{} is not an input leaf", param.path))
            })?;
            let value = self.engine.encode(&leaf, raw)?;
            params.push(DataNode {
                path: param.path.to_string(),
                value: Some(self.engine.render(&value)),
            });
        }

        let request = RpcRequest::Execute {
            path: path.to_string(),
            input: params,
        };
        let nodes = match self.round_trip(request).await? {
            RpcReply::Data { nodes } => nodes,
            RpcReply::Error { errors } => return Err(SessionError::Rejected(errors)),
            other => return Err(unexpected("execute", &other).into()),
        };

        let output_root = path.child(PathStep::qualified(operation.module.clone(), "output"));
        let prefix = format!("{output_root}/");
        let mut output = BTreeMap::new();
        for node in nodes {
            let (Some(literal), Some(relative)) = (node.value, node.path.strip_prefix(&prefix))
            else {
                warn!(path = %node.path, "unexpected node in operation output");
                continue;
            };
            let Some(leaf) = self.resolver.node_for(&DataPath::parse(&node.path)?) else {
                warn!(path = %node.path, "backend returned a node the schema doesn't know");
                continue;
            };
            output.insert(relative.to_string(), self.engine.decode(&leaf, &literal)?);
        }
        info!(session = self.session_id, operation = %path, outputs = output.len(), "operation executed");
        Ok(output)
    }

    /// Watch committed changes at or below `subtree` on `feed`.
    pub fn subscribe(&self, feed: &ChangeFeed, subtree: &str) -> SessionResult<Subscription> {
        self.ensure_open()?;
        let bridge =
            SubscriptionBridge::new(self.resolver.clone(), self.engine.clone(), feed.clone());
        Ok(bridge.subscribe(subtree)?)
    }

    /// End the session. Pending edits are dropped.
    pub async fn close(&self) -> SessionResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(SessionError::Closed);
        }
        let mut buffer = self.buffer.lock().await;
        let dropped = buffer.len();
        buffer.clear();
        drop(buffer);

        let deadline = self.config.read_timeout();
        match tokio::time::timeout(deadline, self.transport.send(RpcRequest::CloseSession)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(session = self.session_id, error = %e, "close-session failed"),
            Err(_) => warn!(session = self.session_id, "close-session timed out"),
        }
        info!(session = self.session_id, dropped_edits = dropped, "session closed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn ensure_open(&self) -> SessionResult<()> {
        if self.is_closed() {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    /// Strictly resolve an editable, configurable node.
    fn resolve_config(&self, expr: &str) -> SessionResult<(DataPath, Arc<SchemaNode>)> {
        let ResolvedPath { path, node } = self.resolver.resolve(expr)?;
        let node = node.ok_or_else(|| {
            SessionError::InvalidOperation(format!("{path} doesn't address a single node"))
        })?;
        if !node.config {
            return Err(SessionError::InvalidOperation(format!(
                "{path} is state data and can't be edited"
            )));
        }
        Ok((path, node))
    }

    /// Resolve a list entry or a leaf-list entry carrying its value.
    fn resolve_entry(&self, expr: &str) -> SessionResult<(DataPath, Arc<SchemaNode>)> {
        let (path, node) = self.resolve_config(expr)?;
        let has_value = path.last().and_then(|step| step.leaf_list_value()).is_some();
        if node.is_list() || (node.is_leaf_list() && has_value) {
            return Ok((path, node));
        }
        let hint = if node.is_leaf_list() {
            "leaf-list entries need a [.='value'] predicate"
        } else {
            "not a list or leaf-list"
        };
        Err(SessionError::InvalidOperation(format!("{path}: {hint}")))
    }

    /// Key values of a list entry, typed by the key leaves' schema.
    fn entry_keys(
        &self,
        entry: &DataPath,
        list: &SchemaNode,
    ) -> SessionResult<BTreeMap<String, TypedValue>> {
        let mut keys = BTreeMap::new();
        let Some(step) = entry.last() else {
            return Ok(keys);
        };
        for name in list.keys() {
            let Some(literal) = step.key(name) else {
                continue;
            };
            let key_path = entry.child(PathStep::qualified(list.module.clone(), name.clone()));
            let Some(key_node) = self.resolver.node_for(&key_path) else {
                continue;
            };
            keys.insert(name.clone(), self.engine.decode(&key_node, literal)?);
        }
        Ok(keys)
    }

    /// One request under the read deadline.
    async fn round_trip(&self, request: RpcRequest) -> SessionResult<RpcReply> {
        let deadline = self.config.read_timeout();
        debug!(session = self.session_id, rpc = request.type_name(), "sending");
        with_deadline(deadline, self.transport.send(request))
            .await?
            .map_err(transport_error)
    }

    async fn expect_ok(&self, name: &'static str, request: RpcRequest) -> SessionResult<()> {
        match self.round_trip(request).await? {
            RpcReply::Ok => Ok(()),
            RpcReply::Error { errors } => Err(SessionError::Rejected(errors)),
            other => Err(unexpected(name, &other).into()),
        }
    }

    /// The commit exchange proper, without the deadline.
    ///
    /// On a candidate backend the exchange opens with discard-changes, so
    /// the commit carries exactly the edits sent here and nothing an
    /// earlier, interrupted exchange left behind. If that discard fails
    /// the commit fails.
    async fn push(&self, edits: Vec<EditRecord>, use_candidate: bool) -> Result<(), CommitError> {
        if !use_candidate {
            let target = DatastoreTarget::Running;
            return self
                .send_for_commit("edit-config", RpcRequest::EditConfig { target, edits })
                .await;
        }

        self.send_for_commit("discard-changes", RpcRequest::DiscardChanges)
            .await?;

        let target = DatastoreTarget::Candidate;
        self.candidate_dirty.store(true, Ordering::SeqCst);
        self.send_for_commit("edit-config", RpcRequest::EditConfig { target, edits })
            .await?;
        self.send_for_commit("commit", RpcRequest::Commit).await?;
        self.candidate_dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn send_for_commit(
        &self,
        name: &'static str,
        request: RpcRequest,
    ) -> Result<(), CommitError> {
        debug!(session = self.session_id, rpc = name, "sending");
        match self.transport.send(request).await {
            Ok(RpcReply::Ok) => Ok(()),
            Ok(RpcReply::Error { errors }) => Err(CommitError::ValidationFailed(errors)),
            Ok(other) => Err(CommitError::TransportLost(unexpected(name, &other).to_string())),
            Err(e) => Err(CommitError::TransportLost(e.to_string())),
        }
    }

    /// Make the backend candidate match `running` again.
    async fn reset_candidate(&self) -> SessionResult<()> {
        self.expect_ok("discard-changes", RpcRequest::DiscardChanges)
            .await?;
        self.candidate_dirty.store(false, Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for DatastoreSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatastoreSession")
            .field("endpoint", self.transport.endpoint())
            .field("session_id", &self.session_id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

async fn with_deadline<T>(deadline: Duration, future: impl Future<Output = T>) -> SessionResult<T> {
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| SessionError::Timeout(deadline))
}

fn transport_error(e: ProtocolError) -> SessionError {
    match e {
        ProtocolError::ConnectionClosed => SessionError::TransportLost(e.to_string()),
        other => SessionError::Protocol(other),
    }
}

fn unexpected(request: &'static str, reply: &RpcReply) -> ProtocolError {
    ProtocolError::UnexpectedReply {
        request,
        got: reply.type_name(),
    }
}

fn edit_record(edit: &PendingEdit) -> EditRecord {
    EditRecord {
        insert: edit.position.clone(),
        ..EditRecord::new(edit.path.to_string(), edit.operation, edit.value.literal())
    }
}
