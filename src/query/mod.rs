//! Game server queries.
//!
//! [`QueryClient::query`] asks one server for its state and never fails: any
//! problem is logged and reported as `None`. [`QueryClient::query_all`] fans
//! out over the whole registry and keeps the servers that answered.

pub(crate) mod protocol;

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::net::UdpSocket;

use crate::models::{ServerSnapshot, ServerTarget};
use protocol::{PlayerEntry, Reply, ServerInfo, NO_CHALLENGE};

/// Largest datagram a Source server sends without splitting.
const MAX_DATAGRAM: usize = 1400;

/// Why a single server query produced no data.
#[derive(Debug)]
pub enum QueryError {
    /// The address could not be resolved
    Resolve(String),
    /// Socket error, including ICMP port unreachable
    Io(std::io::Error),
    /// No complete answer within the configured timeout
    Timeout(Duration),
    /// Reply could not be decoded
    Malformed(String),
    /// Reply decoded but was not what the exchange expected
    UnexpectedReply(u8),
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::Resolve(msg) => write!(f, "resolve failed: {}", msg),
            QueryError::Io(err) => write!(f, "socket error: {}", err),
            QueryError::Timeout(after) => write!(f, "timed out after {:?}", after),
            QueryError::Malformed(msg) => write!(f, "malformed reply: {}", msg),
            QueryError::UnexpectedReply(header) => write!(f, "unexpected reply type {:#04x}", header),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<std::io::Error> for QueryError {
    fn from(err: std::io::Error) -> Self {
        QueryError::Io(err)
    }
}

/// Queries game servers with a fixed per-server timeout.
#[derive(Debug, Clone)]
pub struct QueryClient {
    timeout: Duration,
}

impl QueryClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Query one server. Failures are logged and yield `None`; there is no retry.
    pub async fn query(&self, target: &ServerTarget) -> Option<ServerSnapshot> {
        match self.try_query(target).await {
            Ok(snapshot) => {
                tracing::debug!(
                    "Queried {}: {} players on {} ({} ms)",
                    target,
                    snapshot.current_player_count,
                    snapshot.current_map,
                    snapshot.ping_milliseconds
                );
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!("Error querying server {}: {}", target, e);
                None
            }
        }
    }

    /// Query every target concurrently and return the snapshots of the
    /// servers that answered, in registry order.
    pub async fn query_all(&self, targets: &[ServerTarget]) -> Vec<ServerSnapshot> {
        let results = join_all(targets.iter().map(|target| self.query(target))).await;
        let snapshots: Vec<ServerSnapshot> = results.into_iter().flatten().collect();

        tracing::debug!("{} of {} servers answered", snapshots.len(), targets.len());
        snapshots
    }

    async fn try_query(&self, target: &ServerTarget) -> Result<ServerSnapshot, QueryError> {
        match tokio::time::timeout(self.timeout, exchange(target)).await {
            Ok(result) => result,
            Err(_) => Err(QueryError::Timeout(self.timeout)),
        }
    }
}

/// Run the info and player exchanges against one server.
async fn exchange(target: &ServerTarget) -> Result<ServerSnapshot, QueryError> {
    let addr = resolve(target).await?;
    let local: SocketAddr = if addr.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };

    let socket = UdpSocket::bind(local).await?;
    socket.connect(addr).await?;

    let mut session = Session::new(socket);
    let info = session.request_info().await?;
    let players = session.request_players().await?;
    let ping = session.shortest_rtt.unwrap_or_default().as_millis() as u64;

    Ok(snapshot(target, info, players, ping))
}

async fn resolve(target: &ServerTarget) -> Result<SocketAddr, QueryError> {
    let mut addrs = tokio::net::lookup_host((target.address.as_str(), target.port))
        .await
        .map_err(|e| QueryError::Resolve(e.to_string()))?;

    addrs
        .next()
        .ok_or_else(|| QueryError::Resolve(format!("no address for {}", target.address)))
}

/// One connected exchange. Ping is the shortest single round trip seen.
struct Session {
    socket: UdpSocket,
    shortest_rtt: Option<Duration>,
}

impl Session {
    fn new(socket: UdpSocket) -> Self {
        Self {
            socket,
            shortest_rtt: None,
        }
    }

    async fn request_info(&mut self) -> Result<ServerInfo, QueryError> {
        match self.round_trip(&protocol::info_request(None)).await? {
            Reply::Info(info) => Ok(info),
            // Servers protected against reflection ask for the challenge first.
            Reply::Challenge(challenge) => {
                match self.round_trip(&protocol::info_request(Some(challenge))).await? {
                    Reply::Info(info) => Ok(info),
                    other => Err(unexpected(&other)),
                }
            }
            other => Err(unexpected(&other)),
        }
    }

    async fn request_players(&mut self) -> Result<Vec<PlayerEntry>, QueryError> {
        match self.round_trip(&protocol::player_request(NO_CHALLENGE)).await? {
            Reply::Players(players) => Ok(players),
            Reply::Challenge(challenge) => {
                match self.round_trip(&protocol::player_request(challenge)).await? {
                    Reply::Players(players) => Ok(players),
                    other => Err(unexpected(&other)),
                }
            }
            other => Err(unexpected(&other)),
        }
    }

    async fn round_trip(&mut self, request: &[u8]) -> Result<Reply, QueryError> {
        let sent = Instant::now();
        self.socket.send(request).await?;

        let mut buf = [0u8; MAX_DATAGRAM];
        let len = self.socket.recv(&mut buf).await?;

        let rtt = sent.elapsed();
        self.shortest_rtt = Some(self.shortest_rtt.map_or(rtt, |shortest| shortest.min(rtt)));

        protocol::parse_reply(&buf[..len])
    }
}

fn unexpected(reply: &Reply) -> QueryError {
    let header = match reply {
        Reply::Challenge(_) => 0x41,
        Reply::Info(_) => 0x49,
        Reply::Players(_) => 0x44,
    };
    QueryError::UnexpectedReply(header)
}

fn snapshot(target: &ServerTarget, info: ServerInfo, players: Vec<PlayerEntry>, ping: u64) -> ServerSnapshot {
    let (humans, bots) = split_bots(players, info.bots.into());

    ServerSnapshot {
        name: info.name,
        current_map: info.map,
        current_player_count: info.players.saturating_sub(info.bots).into(),
        max_player_count: info.max_players.into(),
        player_names: humans,
        bot_count: bots as u32,
        connect_string: target.endpoint(info.game_port.unwrap_or(target.port)),
        ping_milliseconds: ping,
    }
}

/// Remove the `bots` most bot-like entries from a player list, returning the
/// remaining names in reply order and how many entries were removed.
///
/// Bots stay connected across map changes, so the longest connections are
/// taken first. A negative duration always marks a bot.
fn split_bots(players: Vec<PlayerEntry>, bots: usize) -> (Vec<String>, usize) {
    let bot_likeness = |p: &PlayerEntry| {
        if p.duration < 0.0 {
            f32::INFINITY
        } else {
            p.duration
        }
    };

    let mut ranked: Vec<usize> = (0..players.len()).collect();
    ranked.sort_by(|&a, &b| bot_likeness(&players[b]).total_cmp(&bot_likeness(&players[a])));

    let mut is_bot = vec![false; players.len()];
    for &i in ranked.iter().take(bots) {
        is_bot[i] = true;
    }
    let removed = is_bot.iter().filter(|&&bot| bot).count();

    let humans = players
        .into_iter()
        .zip(is_bot)
        .filter(|(_, bot)| !bot)
        .map(|(p, _)| p.name)
        .collect();

    (humans, removed)
}
