//! Source engine server query packets (A2S_INFO and A2S_PLAYER).
//!
//! Only single-packet replies are understood. CS2 info and player replies fit
//! in one datagram for any realistic player count.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::QueryError;

/// Prefix of every single-packet message.
const SINGLE_PACKET: i32 = -1;
/// Prefix of a split reply, which this client does not reassemble.
const SPLIT_PACKET: i32 = -2;

const A2S_INFO: u8 = 0x54;
const A2S_PLAYER: u8 = 0x55;
const S2C_CHALLENGE: u8 = 0x41;
const S2A_INFO: u8 = 0x49;
const S2A_PLAYER: u8 = 0x44;

const INFO_PAYLOAD: &[u8] = b"Source Engine Query\0";

/// Extra data flag: the reply carries the server's game port.
const EDF_PORT: u8 = 0x80;

/// Challenge sent with the first player request to ask for a real one.
pub const NO_CHALLENGE: i32 = -1;

/// The parts of an info reply the dashboard uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub map: String,
    pub players: u8,
    pub max_players: u8,
    pub bots: u8,
    /// Game port advertised in the extra data block
    pub game_port: Option<u16>,
}

/// One entry of a player reply. Bots are listed alongside humans.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEntry {
    pub name: String,
    /// Seconds connected, negative for some bots
    pub duration: f32,
}

/// A decoded server reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Challenge(i32),
    Info(ServerInfo),
    Players(Vec<PlayerEntry>),
}

pub fn info_request(challenge: Option<i32>) -> Vec<u8> {
    let mut packet = Vec::with_capacity(4 + 1 + INFO_PAYLOAD.len() + 4);
    // Writes into a Vec cannot fail.
    let _ = packet.write_i32::<LittleEndian>(SINGLE_PACKET);
    packet.push(A2S_INFO);
    packet.extend_from_slice(INFO_PAYLOAD);
    if let Some(challenge) = challenge {
        let _ = packet.write_i32::<LittleEndian>(challenge);
    }
    packet
}

pub fn player_request(challenge: i32) -> Vec<u8> {
    let mut packet = Vec::with_capacity(9);
    let _ = packet.write_i32::<LittleEndian>(SINGLE_PACKET);
    packet.push(A2S_PLAYER);
    let _ = packet.write_i32::<LittleEndian>(challenge);
    packet
}

pub fn parse_reply(datagram: &[u8]) -> Result<Reply, QueryError> {
    let mut cursor = Cursor::new(datagram);

    match cursor.read_i32::<LittleEndian>().map_err(truncated)? {
        SINGLE_PACKET => {}
        SPLIT_PACKET => {
            return Err(QueryError::Malformed("split replies are not supported".to_string()))
        }
        other => return Err(QueryError::Malformed(format!("bad packet header {:#x}", other))),
    }

    match cursor.read_u8().map_err(truncated)? {
        S2C_CHALLENGE => Ok(Reply::Challenge(
            cursor.read_i32::<LittleEndian>().map_err(truncated)?,
        )),
        S2A_INFO => parse_info(&mut cursor).map(Reply::Info),
        S2A_PLAYER => parse_players(&mut cursor).map(Reply::Players),
        other => Err(QueryError::UnexpectedReply(other)),
    }
}

fn parse_info(cursor: &mut Cursor<&[u8]>) -> Result<ServerInfo, QueryError> {
    let _protocol = cursor.read_u8().map_err(truncated)?;
    let name = read_cstring(cursor)?;
    let map = read_cstring(cursor)?;
    let _folder = read_cstring(cursor)?;
    let _game = read_cstring(cursor)?;
    let _app_id = cursor.read_u16::<LittleEndian>().map_err(truncated)?;
    let players = cursor.read_u8().map_err(truncated)?;
    let max_players = cursor.read_u8().map_err(truncated)?;
    let bots = cursor.read_u8().map_err(truncated)?;
    // server type, environment, visibility, VAC
    skip(cursor, 4)?;
    let _version = read_cstring(cursor)?;

    // Older servers end the reply here.
    let game_port = match cursor.read_u8() {
        Ok(edf) if edf & EDF_PORT != 0 => {
            Some(cursor.read_u16::<LittleEndian>().map_err(truncated)?)
        }
        _ => None,
    };

    Ok(ServerInfo {
        name,
        map,
        players,
        max_players,
        bots,
        game_port,
    })
}

fn parse_players(cursor: &mut Cursor<&[u8]>) -> Result<Vec<PlayerEntry>, QueryError> {
    let count = cursor.read_u8().map_err(truncated)?;
    let mut players = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let _index = cursor.read_u8().map_err(truncated)?;
        let name = read_cstring(cursor)?.trim().to_string();
        let _score = cursor.read_i32::<LittleEndian>().map_err(truncated)?;
        let duration = cursor.read_f32::<LittleEndian>().map_err(truncated)?;
        players.push(PlayerEntry { name, duration });
    }

    Ok(players)
}

fn read_cstring(cursor: &mut Cursor<&[u8]>) -> Result<String, QueryError> {
    let start = cursor.position() as usize;
    let rest = cursor.get_ref().get(start..).unwrap_or_default();
    let len = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| QueryError::Malformed("unterminated string".to_string()))?;

    let value = String::from_utf8_lossy(&rest[..len]).into_owned();
    cursor.set_position((start + len + 1) as u64);
    Ok(value)
}

fn skip(cursor: &mut Cursor<&[u8]>, n: usize) -> Result<(), QueryError> {
    let mut buf = [0u8; 8];
    cursor.read_exact(&mut buf[..n]).map_err(truncated)
}

fn truncated(_: std::io::Error) -> QueryError {
    QueryError::Malformed("reply is truncated".to_string())
}
