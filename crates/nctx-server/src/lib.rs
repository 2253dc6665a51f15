//! In-process datastore backend for nctx.
//!
//! [`LoopbackServer`] keeps `running`, `startup`, and a private candidate
//! per session, applies edit batches atomically, runs every tree that
//! would become `running` through the commit gate, and announces what
//! changed on a change feed. [`LoopbackConnector`] makes servers
//! reachable as `loopback:<name>` endpoints so sessions can talk to them
//! through the ordinary [`Transport`](nctx_protocol::Transport) seam.

pub mod auth;
pub mod config;
mod datastore;
pub mod error;
pub mod operations;
pub mod schemas;
pub mod server;
pub mod transport;

pub use auth::{AllowAllAuth, AuthProvider, Identity, PasswordAuth};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use operations::{OperationCall, OperationHandler};
pub use schemas::{example_schema, netconf_server_schema, reference_schema};
pub use server::LoopbackServer;
pub use transport::{LoopbackConnector, LoopbackTransport};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use nctx_protocol::{
        Connector, Credentials, DataNode, DatastoreTarget, EditRecord, Endpoint, ErrorTag,
        ProtocolError, RpcReply, RpcRequest, Transport,
    };
    use nctx_txn::EditOperation;

    const TIMEOUT: &str =
        "/ietf-netconf-server:netconf-server/session-options/hello-timeout";

    fn server(config: ServerConfig) -> Arc<LoopbackServer> {
        Arc::new(LoopbackServer::new(config, Arc::new(reference_schema().unwrap())))
    }

    async fn open(connector: &LoopbackConnector, endpoint: &Endpoint) -> Box<dyn Transport> {
        let transport = connector.connect(endpoint).await.unwrap();
        let reply = transport
            .send(RpcRequest::Hello {
                capabilities: vec![],
                credentials: Credentials::default(),
            })
            .await
            .unwrap();
        assert!(matches!(reply, RpcReply::Hello { .. }));
        transport
    }

    fn set(path: &str, value: &str) -> EditRecord {
        EditRecord::new(path, EditOperation::Set, Some(value.into()))
    }

    fn edit(target: DatastoreTarget, edits: Vec<EditRecord>) -> RpcRequest {
        RpcRequest::EditConfig { target, edits }
    }

    fn get(source: DatastoreTarget, filter: &str) -> RpcRequest {
        RpcRequest::GetConfig {
            source,
            filter: Some(filter.into()),
        }
    }

    fn data(reply: RpcReply) -> Vec<DataNode> {
        match reply {
            RpcReply::Data { nodes } => nodes,
            other => panic!("expected data, got {other:?}"),
        }
    }

    fn error_tags(reply: &RpcReply) -> Vec<ErrorTag> {
        match reply {
            RpcReply::Error { errors } => errors.iter().map(|e| e.tag).collect(),
            other => panic!("expected rpc-error, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // 1. Hello and session lifecycle
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn hello_assigns_distinct_sessions() {
        let connector = LoopbackConnector::new();
        let endpoint = connector.register(server(ServerConfig::default()));
        assert_eq!(endpoint.to_string(), "loopback:default");

        let a = connector.connect(&endpoint).await.unwrap();
        let b = connector.connect(&endpoint).await.unwrap();
        let hello = || RpcRequest::Hello {
            capabilities: vec![],
            credentials: Credentials::default(),
        };
        let (RpcReply::Hello { session_id: sa, capabilities }, RpcReply::Hello { session_id: sb, .. }) =
            (a.send(hello()).await.unwrap(), b.send(hello()).await.unwrap())
        else {
            panic!("hello failed");
        };
        assert_ne!(sa, sb);
        assert!(capabilities.iter().any(|c| c == nctx_protocol::capabilities::CANDIDATE));
    }

    #[tokio::test]
    async fn requests_before_hello_are_errors() {
        let connector = LoopbackConnector::new();
        let endpoint = connector.register(server(ServerConfig::default()));
        let transport = connector.connect(&endpoint).await.unwrap();
        let reply = transport.send(RpcRequest::Commit).await.unwrap();
        assert_eq!(error_tags(&reply), vec![ErrorTag::OperationFailed]);
    }

    #[tokio::test]
    async fn close_session_ends_the_connection() {
        let connector = LoopbackConnector::new();
        let srv = server(ServerConfig::default());
        let endpoint = connector.register(srv.clone());
        let transport = open(&connector, &endpoint).await;
        assert_eq!(srv.session_count(), 1);

        assert!(transport.send(RpcRequest::CloseSession).await.unwrap().is_ok());
        assert_eq!(srv.session_count(), 0);
        assert!(matches!(
            transport.send(RpcRequest::Commit).await,
            Err(ProtocolError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn dropping_the_transport_ends_the_session() {
        let connector = LoopbackConnector::new();
        let srv = server(ServerConfig::default());
        let endpoint = connector.register(srv.clone());
        let transport = open(&connector, &endpoint).await;
        drop(transport);
        assert_eq!(srv.session_count(), 0);
    }

    #[tokio::test]
    async fn unknown_endpoints_are_refused() {
        let connector = LoopbackConnector::new();
        connector.register(server(ServerConfig::default()));
        assert!(matches!(
            connector.connect(&Endpoint::loopback("elsewhere")).await,
            Err(ProtocolError::ConnectionRefused(_))
        ));
        let ssh: Endpoint = "ssh:router.example:830".parse().unwrap();
        assert!(matches!(
            connector.connect(&ssh).await,
            Err(ProtocolError::UnsupportedEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn password_auth_and_anonymous_policy() {
        let mut config = ServerConfig::named("locked");
        config.allow_anonymous = false;
        let srv = Arc::new(LoopbackServer::with_auth(
            config,
            Arc::new(reference_schema().unwrap()),
            Arc::new(PasswordAuth::new().with_user("admin", "secret")),
        ));
        let connector = LoopbackConnector::new();
        let endpoint = connector.register(srv);

        let hello = |credentials| RpcRequest::Hello {
            capabilities: vec![],
            credentials,
        };
        let t = connector.connect(&endpoint).await.unwrap();
        let reply = t.send(hello(Credentials::default())).await.unwrap();
        assert_eq!(error_tags(&reply), vec![ErrorTag::AccessDenied]);
        let reply = t.send(hello(Credentials::password("admin", "wrong"))).await.unwrap();
        assert_eq!(error_tags(&reply), vec![ErrorTag::AccessDenied]);
        let reply = t.send(hello(Credentials::password("admin", "secret"))).await.unwrap();
        assert!(matches!(reply, RpcReply::Hello { .. }));
    }

    // -----------------------------------------------------------------------
    // 2. Candidate, commit, and validation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn candidate_is_private_until_commit() {
        let connector = LoopbackConnector::new();
        let srv = server(ServerConfig::default());
        let endpoint = connector.register(srv.clone());
        let a = open(&connector, &endpoint).await;
        let b = open(&connector, &endpoint).await;

        let reply = a
            .send(edit(DatastoreTarget::Candidate, vec![set(TIMEOUT, "61")]))
            .await
            .unwrap();
        assert!(reply.is_ok());

        let seen_by_a = data(a.send(get(DatastoreTarget::Candidate, TIMEOUT)).await.unwrap());
        assert_eq!(seen_by_a[0].value.as_deref(), Some("61"));
        assert!(data(b.send(get(DatastoreTarget::Candidate, TIMEOUT)).await.unwrap()).is_empty());
        assert!(data(a.send(get(DatastoreTarget::Running, TIMEOUT)).await.unwrap()).is_empty());

        assert!(a.send(RpcRequest::Commit).await.unwrap().is_ok());
        let running = data(b.send(get(DatastoreTarget::Running, TIMEOUT)).await.unwrap());
        assert_eq!(
            running,
            vec![DataNode {
                path: TIMEOUT.into(),
                value: Some("61".into()),
            }]
        );
        assert_eq!(srv.running().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_commit_keeps_running_and_pending() {
        let connector = LoopbackConnector::new();
        let srv = server(ServerConfig::default());
        let endpoint = connector.register(srv.clone());
        srv.seed(&[set(TIMEOUT, "61")]).await.unwrap();
        let t = open(&connector, &endpoint).await;

        let reply = t
            .send(edit(DatastoreTarget::Candidate, vec![set(TIMEOUT, "blesmrt")]))
            .await
            .unwrap();
        assert!(reply.is_ok(), "values are checked at commit");

        let reply = t.send(RpcRequest::Commit).await.unwrap();
        assert_eq!(error_tags(&reply), vec![ErrorTag::InvalidValue]);
        let running = data(t.send(get(DatastoreTarget::Running, TIMEOUT)).await.unwrap());
        assert_eq!(running[0].value.as_deref(), Some("61"));

        // The bad edit is still pending until discarded.
        let reply = t.send(RpcRequest::Validate { source: DatastoreTarget::Candidate }).await.unwrap();
        assert_eq!(error_tags(&reply), vec![ErrorTag::InvalidValue]);
        assert!(t.send(RpcRequest::DiscardChanges).await.unwrap().is_ok());
        assert!(t
            .send(RpcRequest::Validate { source: DatastoreTarget::Candidate })
            .await
            .unwrap()
            .is_ok());
    }

    #[tokio::test]
    async fn bad_edit_batch_is_rejected_whole() {
        let connector = LoopbackConnector::new();
        let endpoint = connector.register(server(ServerConfig::default()));
        let t = open(&connector, &endpoint).await;

        let batch = vec![
            set("/example-schema:leafInt8", "1"),
            EditRecord::new("/example-schema:down", EditOperation::Delete, None),
        ];
        let reply = t.send(edit(DatastoreTarget::Candidate, batch)).await.unwrap();
        assert_eq!(error_tags(&reply), vec![ErrorTag::DataMissing]);
        assert!(data(t.send(get(DatastoreTarget::Candidate, "/example-schema:*")).await.unwrap())
            .is_empty());
    }

    #[tokio::test]
    async fn dangling_leafref_fails_commit() {
        let connector = LoopbackConnector::new();
        let endpoint = connector.register(server(ServerConfig::default()));
        let t = open(&connector, &endpoint).await;

        t.send(edit(
            DatastoreTarget::Candidate,
            vec![set("/example-schema:bossPerson", "Dan")],
        ))
        .await
        .unwrap();
        let reply = t.send(RpcRequest::Commit).await.unwrap();
        assert_eq!(error_tags(&reply), vec![ErrorTag::DataMissing]);

        t.send(edit(
            DatastoreTarget::Candidate,
            vec![set("/example-schema:person[name='Dan']/age", "30")],
        ))
        .await
        .unwrap();
        assert!(t.send(RpcRequest::Commit).await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn commit_replays_pending_on_current_running() {
        let connector = LoopbackConnector::new();
        let endpoint = connector.register(server(ServerConfig::default()));
        let a = open(&connector, &endpoint).await;
        let b = open(&connector, &endpoint).await;

        a.send(edit(DatastoreTarget::Candidate, vec![set("/example-schema:leafInt8", "1")]))
            .await
            .unwrap();
        b.send(edit(DatastoreTarget::Candidate, vec![set("/example-schema:leafInt8", "2")]))
            .await
            .unwrap();
        assert!(a.send(RpcRequest::Commit).await.unwrap().is_ok());
        assert!(b.send(RpcRequest::Commit).await.unwrap().is_ok());

        let nodes = data(a.send(get(DatastoreTarget::Running, "/example-schema:leafInt8")).await.unwrap());
        assert_eq!(nodes[0].value.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn edit_running_directly() {
        let connector = LoopbackConnector::new();
        let srv = server(ServerConfig::default());
        let endpoint = connector.register(srv.clone());
        let t = open(&connector, &endpoint).await;

        let reply = t
            .send(edit(DatastoreTarget::Running, vec![set("/example-schema:up", "yes")]))
            .await
            .unwrap();
        assert_eq!(error_tags(&reply), vec![ErrorTag::InvalidValue]);
        let reply = t
            .send(edit(DatastoreTarget::Running, vec![set("/example-schema:up", "true")]))
            .await
            .unwrap();
        assert!(reply.is_ok());
        assert_eq!(srv.running().await.len(), 1);
    }

    // -----------------------------------------------------------------------
    // 3. Reads, copies, and the change feed
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn get_config_filters() {
        let connector = LoopbackConnector::new();
        let srv = server(ServerConfig::default());
        let endpoint = connector.register(srv.clone());
        srv.seed(&[
            set("/example-schema:person[name='Jan']/age", "40"),
            set("/example-schema:person[name='Eva']/age", "35"),
            set(TIMEOUT, "10"),
        ])
        .await
        .unwrap();
        let t = open(&connector, &endpoint).await;

        let ages = data(t.send(get(DatastoreTarget::Running, "/example-schema:person/age")).await.unwrap());
        assert_eq!(ages.len(), 2);
        let everything = t
            .send(RpcRequest::GetConfig {
                source: DatastoreTarget::Running,
                filter: None,
            })
            .await
            .unwrap();
        assert_eq!(data(everything).len(), 7);

        let reply = t.send(get(DatastoreTarget::Running, "/example-schema:nope")).await.unwrap();
        assert_eq!(error_tags(&reply), vec![ErrorTag::UnknownElement]);
    }

    #[tokio::test]
    async fn copy_config_between_datastores() {
        let connector = LoopbackConnector::new();
        let srv = server(ServerConfig::default());
        let endpoint = connector.register(srv.clone());
        srv.seed(&[set(TIMEOUT, "30")]).await.unwrap();
        let t = open(&connector, &endpoint).await;

        let copy = |source, target| RpcRequest::CopyConfig { source, target };
        assert!(t
            .send(copy(DatastoreTarget::Running, DatastoreTarget::Startup))
            .await
            .unwrap()
            .is_ok());
        assert_eq!(srv.startup().await, srv.running().await);

        let reply = t
            .send(copy(DatastoreTarget::Running, DatastoreTarget::Candidate))
            .await
            .unwrap();
        assert_eq!(error_tags(&reply), vec![ErrorTag::OperationNotSupported]);
        let reply = t
            .send(copy(DatastoreTarget::Running, DatastoreTarget::Running))
            .await
            .unwrap();
        assert_eq!(error_tags(&reply), vec![ErrorTag::InvalidValue]);
    }

    #[tokio::test]
    async fn commits_are_published() {
        let connector = LoopbackConnector::new();
        let srv = server(ServerConfig::default());
        let endpoint = connector.register(srv.clone());
        let mut feed = srv.feed().subscribe_raw();
        let t = open(&connector, &endpoint).await;

        t.send(edit(DatastoreTarget::Candidate, vec![set(TIMEOUT, "61")]))
            .await
            .unwrap();
        t.send(RpcRequest::Commit).await.unwrap();

        let batch = feed.recv().await.unwrap();
        assert_eq!(batch.sequence, 1);
        let paths: Vec<_> = batch.changes.iter().map(|c| c.path.as_str()).collect();
        assert!(paths.contains(&TIMEOUT));
        assert_eq!(batch.changes.len(), 1);

        // An empty commit publishes nothing.
        t.send(RpcRequest::Commit).await.unwrap();
        assert_eq!(srv.feed().last_sequence(), 1);
    }

    // -----------------------------------------------------------------------
    // 4. Latency and shutdown
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn response_delay_is_applied() {
        let connector = LoopbackConnector::new();
        let srv = server(ServerConfig::default());
        let endpoint = connector.register(srv.clone());
        let t = open(&connector, &endpoint).await;

        srv.set_response_delay(Duration::from_millis(50));
        let started = std::time::Instant::now();
        t.send(RpcRequest::DiscardChanges).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn shutdown_breaks_connections() {
        let connector = LoopbackConnector::new();
        let srv = server(ServerConfig::default());
        let endpoint = connector.register(srv.clone());
        let t = open(&connector, &endpoint).await;

        srv.shutdown();
        assert!(srv.is_shut_down());
        assert!(matches!(
            t.send(RpcRequest::Commit).await,
            Err(ProtocolError::ConnectionClosed)
        ));
        assert!(matches!(
            connector.connect(&endpoint).await,
            Err(ProtocolError::ConnectionRefused(_))
        ));
    }

    // -----------------------------------------------------------------------
    // 5. RPCs and actions
    // -----------------------------------------------------------------------

    const REBOOT: &str = "/example-schema:reboot";

    fn param(path: &str, value: &str) -> DataNode {
        DataNode {
            path: path.into(),
            value: Some(value.into()),
        }
    }

    fn execute(path: &str, input: Vec<DataNode>) -> RpcRequest {
        RpcRequest::Execute {
            path: path.into(),
            input,
        }
    }

    fn reboot_handler() -> Arc<dyn OperationHandler> {
        Arc::new(|call: &OperationCall| {
            let scheduled = call.param("delay").is_some_and(|delay| delay != "0");
            Ok::<_, nctx_protocol::RpcError>(std::collections::BTreeMap::from([(
                "scheduled".to_string(),
                scheduled.to_string(),
            )]))
        })
    }

    #[tokio::test]
    async fn registered_rpcs_are_executed() {
        let connector = LoopbackConnector::new();
        let srv = server(ServerConfig::default());
        let endpoint = connector.register(srv.clone());
        let t = open(&connector, &endpoint).await;

        srv.register_operation(REBOOT, reboot_handler()).unwrap();
        let reply = t
            .send(execute(
                REBOOT,
                vec![
                    param("/example-schema:reboot/input/delay", "30"),
                    param("/example-schema:reboot/example-schema:input/reason", "upgrade"),
                ],
            ))
            .await
            .unwrap();
        assert_eq!(
            data(reply),
            vec![param("/example-schema:reboot/output/scheduled", "true")]
        );
        assert!(srv.running().await.is_empty());
    }

    #[tokio::test]
    async fn operation_input_is_checked_before_the_handler() {
        let connector = LoopbackConnector::new();
        let srv = server(ServerConfig::default());
        let endpoint = connector.register(srv.clone());
        let t = open(&connector, &endpoint).await;

        let reply = t.send(execute(REBOOT, vec![])).await.unwrap();
        assert_eq!(error_tags(&reply), vec![ErrorTag::OperationNotSupported]);

        srv.register_operation(REBOOT, reboot_handler()).unwrap();
        let bad_value = execute(REBOOT, vec![param("/example-schema:reboot/input/delay", "soon")]);
        assert_eq!(
            error_tags(&t.send(bad_value).await.unwrap()),
            vec![ErrorTag::InvalidValue]
        );
        let output_as_input =
            execute(REBOOT, vec![param("/example-schema:reboot/output/scheduled", "true")]);
        assert_eq!(
            error_tags(&t.send(output_as_input).await.unwrap()),
            vec![ErrorTag::UnknownElement]
        );
        let not_an_operation = execute("/example-schema:up", vec![]);
        assert_eq!(
            error_tags(&t.send(not_an_operation).await.unwrap()),
            vec![ErrorTag::InvalidValue]
        );
        assert!(matches!(
            srv.register_operation("/example-schema:up", reboot_handler()),
            Err(ServerError::Config(_))
        ));
    }

    #[tokio::test]
    async fn actions_need_their_entry() {
        let connector = LoopbackConnector::new();
        let srv = server(ServerConfig::default());
        let endpoint = connector.register(srv.clone());
        let t = open(&connector, &endpoint).await;

        let poke = |call: &OperationCall| {
            let who = call.path.steps()[0].key("name").unwrap_or_default().to_string();
            let times = call.param("times").unwrap_or("1");
            Ok::<_, nctx_protocol::RpcError>(std::collections::BTreeMap::from([(
                "reply".to_string(),
                format!("{who} poked {times}x"),
            )]))
        };
        srv.register_operation("/example-schema:person/poke", Arc::new(poke))
            .unwrap();

        let action = "/example-schema:person[name='Eva']/poke";
        let input = vec![param("/example-schema:person[name='Eva']/poke/input/times", "2")];
        let reply = t.send(execute(action, input.clone())).await.unwrap();
        assert_eq!(error_tags(&reply), vec![ErrorTag::DataMissing]);

        srv.seed(&[set("/example-schema:person[name='Eva']/age", "30")])
            .await
            .unwrap();
        let output = data(t.send(execute(action, input)).await.unwrap());
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].path, "/example-schema:person[name='Eva']/poke/output/reply");
        assert_eq!(output[0].value.as_deref(), Some("Eva poked 2x"));
    }

    #[tokio::test]
    async fn bad_handler_output_fails_the_operation() {
        let connector = LoopbackConnector::new();
        let srv = server(ServerConfig::default());
        let endpoint = connector.register(srv.clone());
        let t = open(&connector, &endpoint).await;

        let handler = |_: &OperationCall| {
            Ok::<_, nctx_protocol::RpcError>(std::collections::BTreeMap::from([(
                "scheduled".to_string(),
                "maybe".to_string(),
            )]))
        };
        srv.register_operation(REBOOT, Arc::new(handler)).unwrap();
        let reply = t.send(execute(REBOOT, vec![])).await.unwrap();
        assert_eq!(error_tags(&reply), vec![ErrorTag::OperationFailed]);
    }
}
