//! Remote command driver
//!
//! Maintains a persistent connection to the controller as an explicit
//! state machine: Disconnected -> Connecting -> Connected, with a fixed
//! backoff between attempts (no exponential growth) and cancellation
//! observed at every suspension point. The transport sits behind the
//! [`Connector`]/[`Connection`] traits so the state machine is testable
//! without real sockets; production uses newline-delimited JSON over TCP.
//!
//! While connected, the outbound queue is drained completely before every
//! blocking receive. A transmission failure re-queues the message and
//! tears the connection down; the outer loop reconnects.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::watch;

use crate::context::Context;
use crate::server::config::ServerConfig;
use crate::server::guard::ExecutionGuard;
use crate::server::protocol::{AuthMessage, SocketMessage};
use crate::server::queue::OutboundQueue;
use crate::server::{load_manifest, run_engine};

/// Fixed delay between reconnect attempts.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Establishes connections to the controller.
#[async_trait]
pub trait Connector: Send + Sync {
    type Conn: Connection;

    async fn connect(&self) -> Result<Self::Conn>;
}

/// One established, bidirectional message connection.
#[async_trait]
pub trait Connection: Send {
    async fn send(&mut self, payload: &[u8]) -> Result<()>;
    async fn recv(&mut self) -> Result<Vec<u8>>;
}

/// TCP transport carrying one JSON message per line.
pub struct TcpConnector {
    pub endpoint: String,
}

pub struct TcpConnection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

#[async_trait]
impl Connector for TcpConnector {
    type Conn = TcpConnection;

    async fn connect(&self) -> Result<TcpConnection> {
        let stream = TcpStream::connect(&self.endpoint)
            .await
            .with_context(|| format!("cannot connect to socket: {}", self.endpoint))?;
        let (read, writer) = stream.into_split();
        Ok(TcpConnection {
            reader: BufReader::new(read),
            writer,
        })
    }
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(&mut self, payload: &[u8]) -> Result<()> {
        self.writer.write_all(payload).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Vec<u8>> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            bail!("connection closed by peer");
        }
        Ok(line.trim_end_matches(['\r', '\n']).as_bytes().to_vec())
    }
}

/// Connection lifecycle states.
enum DriverState<C> {
    Disconnected,
    Connected(C),
}

/// Why a connected session ended.
enum SessionEnd {
    Shutdown,
    ConnectionLost,
}

pub struct SocketDriver<C: Connector> {
    pub connector: C,
    pub config: Arc<ServerConfig>,
    pub queue: Arc<OutboundQueue>,
    pub guard: ExecutionGuard,
    pub ctx: Arc<Context>,
}

impl<C: Connector> SocketDriver<C> {
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut state: DriverState<C::Conn> = DriverState::Disconnected;
        loop {
            if *shutdown.borrow() {
                log::info!("SocketRunner received shutdown signal, exiting");
                return;
            }
            state = match state {
                DriverState::Disconnected => {
                    log::info!("SocketRunner connecting to: {}", self.config.endpoint);
                    tokio::select! {
                        _ = shutdown.changed() => return,
                        connected = self.connector.connect() => match connected {
                            Ok(conn) => {
                                log::debug!("SocketRunner connected successfully");
                                DriverState::Connected(conn)
                            }
                            Err(err) => {
                                log::error!("SocketRunner failed to connect: {err:#}");
                                tokio::select! {
                                    _ = shutdown.changed() => return,
                                    () = tokio::time::sleep(RECONNECT_BACKOFF) => {}
                                }
                                DriverState::Disconnected
                            }
                        }
                    }
                }
                DriverState::Connected(mut conn) => {
                    match self.session(&mut conn, &mut shutdown).await {
                        SessionEnd::Shutdown => {
                            log::info!("SocketRunner received shutdown signal, exiting");
                            return;
                        }
                        SessionEnd::ConnectionLost => {
                            log::debug!("SocketRunner connection lost, retrying");
                            tokio::select! {
                                _ = shutdown.changed() => return,
                                () = tokio::time::sleep(RECONNECT_BACKOFF) => {}
                            }
                            DriverState::Disconnected
                        }
                    }
                }
            };
        }
    }

    /// Drain-and-receive loop for one established connection.
    async fn session(&self, conn: &mut C::Conn, shutdown: &mut watch::Receiver<bool>) -> SessionEnd {
        loop {
            while self.queue.has_messages() {
                let Some(message) = self.queue.next() else {
                    break;
                };
                if let Err(err) = conn.send(&message).await {
                    log::error!("failed to write queued message: {err:#}");
                    // back at the tail; the next connection delivers it
                    self.queue.add(message);
                    return SessionEnd::ConnectionLost;
                }
                // already gone after the pop; defensive against content
                // re-queued mid-send
                self.queue.remove(&message);
            }

            tokio::select! {
                _ = shutdown.changed() => return SessionEnd::Shutdown,
                received = conn.recv() => match received {
                    Ok(payload) => {
                        if self.handle(&payload).await.is_err() {
                            return SessionEnd::ConnectionLost;
                        }
                    }
                    Err(err) => {
                        log::debug!("read error, likely connection lost: {err:#}");
                        return SessionEnd::ConnectionLost;
                    }
                }
            }
        }
    }

    /// Dispatch one inbound payload. An error return closes the connection.
    async fn handle(&self, payload: &[u8]) -> Result<()> {
        let msg = match SocketMessage::decode(payload) {
            Ok(msg) => msg,
            Err(_) => {
                log::warn!(
                    "received invalid message: {}",
                    String::from_utf8_lossy(payload)
                );
                return Ok(());
            }
        };
        match msg.msg_type.as_str() {
            "heartbeat" => {
                log::debug!("queueing heartbeat reply");
                self.queue.add(SocketMessage::pong().encode());
            }
            "authenticate" => {
                log::info!("auth request received, sending credentials");
                self.queue
                    .add(AuthMessage::new(&self.config.id, &self.config.key).encode());
            }
            "authentication" => {
                log::info!("auth result: {}", msg.message);
                if msg.message.to_lowercase().contains("fail") {
                    bail!("controller rejected authentication");
                }
            }
            "execute" => self.execute(&msg).await,
            other => log::warn!("unknown message type: {other}"),
        }
        Ok(())
    }

    /// Run the named event target and queue the outcome.
    async fn execute(&self, msg: &SocketMessage) {
        log::debug!("execute request received: {}", msg.action);
        let Some(target) = self.config.event_target(&msg.action) else {
            log::error!("no such action: {}", msg.action);
            self.reply(SocketMessage::execute_failure(
                &msg.action,
                &msg.action_id,
                &format!("no such action: {}", msg.action),
            ));
            return;
        };

        let Some(permit) = self.guard.try_acquire() else {
            self.reply(SocketMessage::execute_success(
                &msg.action,
                &msg.action_id,
                "already executing",
            ));
            return;
        };

        let outcome = match load_manifest(&target.target).await {
            Ok(manifest) => {
                run_engine(Arc::new(manifest), Arc::clone(&self.ctx)).await
            }
            Err(err) => Err(err.context(format!(
                "cannot continue without manifest data, bad event config for: {}",
                target.target
            ))),
        };
        drop(permit);

        match outcome {
            Ok(()) => self.reply(SocketMessage::execute_success(
                &msg.action,
                &msg.action_id,
                "execution completed",
            )),
            Err(err) => {
                log::error!("execution failed: {err:#}");
                self.reply(SocketMessage::execute_failure(
                    &msg.action,
                    &msg.action_id,
                    &format!("{err:#}"),
                ));
            }
        }
    }

    fn reply(&self, message: SocketMessage) {
        self.queue.add(message.encode());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::server::config::ExecutionTarget;

    /// Scripted in-memory connection for driving the session loop.
    struct ScriptedConn {
        inbound: VecDeque<Vec<u8>>,
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        failing_sends: usize,
    }

    #[async_trait]
    impl Connection for ScriptedConn {
        async fn send(&mut self, payload: &[u8]) -> Result<()> {
            if self.failing_sends > 0 {
                self.failing_sends -= 1;
                bail!("simulated transmission failure");
            }
            self.sent.lock().unwrap().push(payload.to_vec());
            Ok(())
        }

        async fn recv(&mut self) -> Result<Vec<u8>> {
            match self.inbound.pop_front() {
                Some(payload) => Ok(payload),
                None => bail!("connection closed by peer"),
            }
        }
    }

    struct NoConnector;

    #[async_trait]
    impl Connector for NoConnector {
        type Conn = ScriptedConn;

        async fn connect(&self) -> Result<ScriptedConn> {
            bail!("not used in session tests")
        }
    }

    fn driver(config: ServerConfig) -> (SocketDriver<NoConnector>, Arc<OutboundQueue>) {
        let queue = Arc::new(OutboundQueue::new());
        let driver = SocketDriver {
            connector: NoConnector,
            config: Arc::new(config),
            queue: Arc::clone(&queue),
            guard: ExecutionGuard::new(),
            ctx: Arc::new(Context::default()),
        };
        (driver, queue)
    }

    async fn run_session(
        driver: &SocketDriver<NoConnector>,
        inbound: Vec<Vec<u8>>,
        failing_sends: usize,
    ) -> (Vec<Vec<u8>>, SessionEnd) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut conn = ScriptedConn {
            inbound: inbound.into(),
            sent: Arc::clone(&sent),
            failing_sends,
        };
        let (_tx, mut shutdown) = watch::channel(false);
        let end = driver.session(&mut conn, &mut shutdown).await;
        let raw = sent.lock().unwrap().clone();
        (raw, end)
    }

    fn decoded(raw: &[Vec<u8>]) -> Vec<SocketMessage> {
        raw.iter()
            .map(|payload| SocketMessage::decode(payload).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_heartbeat_gets_pong_reply() {
        let (driver, _queue) = driver(ServerConfig::default());
        let inbound = vec![SocketMessage {
            msg_type: "heartbeat".to_string(),
            ..SocketMessage::default()
        }
        .encode()];
        let (sent, _end) = run_session(&driver, inbound, 0).await;
        assert_eq!(decoded(&sent), vec![SocketMessage::pong()]);
    }

    #[tokio::test]
    async fn test_authenticate_sends_credentials() {
        let config = ServerConfig {
            id: "node-1".to_string(),
            key: "k3y".to_string(),
            ..ServerConfig::default()
        };
        let (driver, _queue) = driver(config);
        let inbound = vec![br#"{"MsgType":"authenticate"}"#.to_vec()];
        let (sent, _end) = run_session(&driver, inbound, 0).await;
        assert_eq!(sent.len(), 1);
        let text = String::from_utf8(sent[0].clone()).unwrap();
        assert!(text.contains("\"id\":\"node-1\""));
        assert!(text.contains("\"key\":\"k3y\""));
    }

    #[tokio::test]
    async fn test_execute_unknown_action_reports_failure() {
        let (driver, _queue) = driver(ServerConfig::default());
        let inbound = vec![br#"{"MsgType":"execute","Action":"deploy"}"#.to_vec()];
        let (sent, _end) = run_session(&driver, inbound, 0).await;
        let sent = decoded(&sent);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type, "execute-failure");
        assert!(sent[0].message.contains("deploy"));
    }

    #[tokio::test]
    async fn test_execute_runs_target_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let manifest_path = dir.path().join("deploy.yml");
        std::fs::write(
            &manifest_path,
            format!("steps:\n  - name: touch\n    cmd: touch {}\n", marker.display()),
        )
        .unwrap();

        let config = ServerConfig {
            executions: vec![ExecutionTarget {
                name: "deploy handler".to_string(),
                action: "deploy".to_string(),
                kind: "event".to_string(),
                target: manifest_path.to_string_lossy().into_owned(),
                ..ExecutionTarget::default()
            }],
            ..ServerConfig::default()
        };
        let (driver, _queue) = driver(config);
        let inbound = vec![br#"{"MsgType":"execute","Action":"deploy","ActionId":"7"}"#.to_vec()];
        let (sent, _end) = run_session(&driver, inbound, 0).await;
        let sent = decoded(&sent);
        assert!(marker.exists());
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type, "execute-success");
        assert_eq!(sent[0].action_id, "7");
    }

    #[tokio::test]
    async fn test_busy_guard_answers_already_executing() {
        let config = ServerConfig {
            executions: vec![ExecutionTarget {
                action: "deploy".to_string(),
                kind: "event".to_string(),
                target: "/never/loaded.yml".to_string(),
                ..ExecutionTarget::default()
            }],
            ..ServerConfig::default()
        };
        let (driver, _queue) = driver(config);
        let _permit = driver.guard.try_acquire().unwrap();

        let inbound = vec![br#"{"MsgType":"execute","Action":"deploy"}"#.to_vec()];
        let (sent, _end) = run_session(&driver, inbound, 0).await;
        let sent = decoded(&sent);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].msg_type, "execute-success");
        assert_eq!(sent[0].message, "already executing");
    }

    #[tokio::test]
    async fn test_concurrent_executes_yield_one_run() {
        let dir = tempfile::tempdir().unwrap();
        let runs = dir.path().join("runs.log");
        let manifest_path = dir.path().join("deploy.yml");
        std::fs::write(
            &manifest_path,
            format!("steps:\n  - name: log run\n    cmd: echo ran >> {}\n", runs.display()),
        )
        .unwrap();

        let config = Arc::new(ServerConfig {
            executions: vec![ExecutionTarget {
                action: "deploy".to_string(),
                kind: "event".to_string(),
                target: manifest_path.to_string_lossy().into_owned(),
                ..ExecutionTarget::default()
            }],
            ..ServerConfig::default()
        });
        let guard = ExecutionGuard::new();
        let make = || SocketDriver {
            connector: NoConnector,
            config: Arc::clone(&config),
            queue: Arc::new(OutboundQueue::new()),
            guard: guard.clone(),
            ctx: Arc::new(Context::default()),
        };
        let (first, second) = (make(), make());

        // the first session claims the guard before its first suspension
        // point, so the second deterministically finds it busy
        let inbound = br#"{"MsgType":"execute","Action":"deploy"}"#.to_vec();
        let ((sent_a, _), (sent_b, _)) = tokio::join!(
            run_session(&first, vec![inbound.clone()], 0),
            run_session(&second, vec![inbound], 0),
        );

        let mut replies = decoded(&sent_a);
        replies.extend(decoded(&sent_b));
        let bodies: Vec<&str> = replies.iter().map(|m| m.message.as_str()).collect();
        assert!(bodies.contains(&"execution completed"), "replies: {bodies:?}");
        assert!(bodies.contains(&"already executing"), "replies: {bodies:?}");
        assert_eq!(std::fs::read_to_string(&runs).unwrap(), "ran\n");
    }

    #[tokio::test]
    async fn test_malformed_payload_keeps_connection_open() {
        let (driver, _queue) = driver(ServerConfig::default());
        let inbound = vec![
            b"}}} not json".to_vec(),
            SocketMessage {
                msg_type: "heartbeat".to_string(),
                ..SocketMessage::default()
            }
            .encode(),
        ];
        let (sent, _end) = run_session(&driver, inbound, 0).await;
        // the garbage line was ignored; the heartbeat after it was handled
        assert_eq!(decoded(&sent), vec![SocketMessage::pong()]);
    }

    #[tokio::test]
    async fn test_auth_failure_closes_connection() {
        let (driver, _queue) = driver(ServerConfig::default());
        let inbound = vec![
            br#"{"MsgType":"authentication","Message":"failed: bad key"}"#.to_vec(),
            SocketMessage {
                msg_type: "heartbeat".to_string(),
                ..SocketMessage::default()
            }
            .encode(),
        ];
        let (sent, end) = run_session(&driver, inbound, 0).await;
        assert!(matches!(end, SessionEnd::ConnectionLost));
        // the heartbeat behind the failure was never processed
        assert!(sent.is_empty());
    }

    #[tokio::test]
    async fn test_send_failure_requeues_message() {
        let (driver, queue) = driver(ServerConfig::default());
        queue.add(b"pending-status".to_vec());
        let (sent, end) = run_session(&driver, Vec::new(), 1).await;
        assert!(sent.is_empty());
        assert!(matches!(end, SessionEnd::ConnectionLost));
        // the message survived the failed connection
        assert_eq!(queue.next().unwrap(), b"pending-status");
    }
}
