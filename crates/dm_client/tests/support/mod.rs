//! In-memory relay for integration tests.
//!
//! Mirrors the relay's observable behaviour closely enough to drive
//! `ChatsApi` end to end: every non-directory request must carry a valid
//! `x-sig`, the signer's wallet address identifies the caller, and only
//! ciphertext and sealed invites are stored.

#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};

use dm_client::{ChatsApi, ClientConfig, RelayMethod, RelayRequest, RelayResponse, Transport, TransportError};
use dm_crypto::{
    signature::recover_address, CryptoError, LocalKeyAuthority, PublicKeyBytes, RecoverableSignature,
    SigningAuthority,
};
use dm_proto::api::{ChatMember, ChatMessage, ChatMessageReaction, CommsResponse, Summary, UserChat};
use zeroize::Zeroizing;

pub const RELAY_URL: &str = "http://relay.test";

#[derive(Default)]
pub struct MemoryRelay {
    state: Mutex<RelayState>,
    latency: Mutex<Option<Duration>>,
    requests: AtomicUsize,
}

#[derive(Default)]
struct RelayState {
    pubkeys: HashMap<String, String>,
    wallets: HashMap<String, String>,
    chats: Vec<StoredChat>,
    blocks: HashSet<(String, String)>,
    permits: HashMap<String, String>,
    chat_fetches: HashMap<String, usize>,
    rpcs: Vec<Value>,
}

struct StoredChat {
    chat_id: String,
    created_at: DateTime<Utc>,
    invites: Vec<(String, String)>,
    messages: Vec<ChatMessage>,
    last_read: HashMap<String, DateTime<Utc>>,
}

impl StoredChat {
    fn is_member(&self, user_id: &str) -> bool {
        self.invites.iter().any(|(u, _)| u == user_id)
    }

    fn view_for(&self, user_id: &str) -> UserChat {
        let last = self.messages.last();
        let last_read_at = self.last_read.get(user_id).copied();
        let unread = self
            .messages
            .iter()
            .filter(|m| m.sender_user_id != user_id)
            .filter(|m| last_read_at.map_or(true, |t| m.created_at > t))
            .count() as u64;
        UserChat {
            chat_id: self.chat_id.clone(),
            last_message: last.map(|m| m.message.clone()).unwrap_or_default(),
            last_message_at: last.map_or(self.created_at, |m| m.created_at),
            invite_code: self
                .invites
                .iter()
                .find(|(u, code)| u == user_id && !code.is_empty())
                .map(|(_, code)| code.clone()),
            unread_message_count: unread,
            last_read_at,
            chat_members: self
                .invites
                .iter()
                .map(|(u, _)| ChatMember { user_id: u.clone() })
                .collect(),
            recheck_permissions: false,
        }
    }
}

impl MemoryRelay {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every request sleeps this long before being handled, so concurrent
    /// callers genuinely overlap.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn register(&self, user_id: &str, public_key: &PublicKeyBytes) {
        let mut state = self.state.lock();
        state.pubkeys.insert(user_id.to_owned(), public_key.to_b64());
        state.wallets.insert(public_key.address(), user_id.to_owned());
    }

    /// A registered user with a fresh key and a client bound to this relay.
    pub fn user(self: &Arc<Self>, user_id: &str) -> ChatsApi {
        let authority = Arc::new(LocalKeyAuthority::generate());
        self.user_with(user_id, authority)
    }

    pub fn user_with(self: &Arc<Self>, user_id: &str, authority: Arc<dyn SigningAuthority>) -> ChatsApi {
        self.register(user_id, &authority.public_key());
        let config = ClientConfig {
            relay_url: RELAY_URL.into(),
            ..ClientConfig::default()
        }
        .with_current_user(user_id);
        ChatsApi::new(config, authority, Arc::clone(self) as Arc<dyn Transport>)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// How many times `GET /comms/chats/{chat_id}` was served.
    pub fn chat_fetches(&self, chat_id: &str) -> usize {
        self.state.lock().chat_fetches.get(chat_id).copied().unwrap_or(0)
    }

    pub fn rpcs(&self) -> Vec<Value> {
        self.state.lock().rpcs.clone()
    }

    pub fn chat_ids(&self) -> Vec<String> {
        self.state.lock().chats.iter().map(|c| c.chat_id.clone()).collect()
    }

    pub fn invite_code(&self, chat_id: &str, user_id: &str) -> Option<String> {
        let state = self.state.lock();
        let chat = state.chats.iter().find(|c| c.chat_id == chat_id)?;
        chat.invites
            .iter()
            .find(|(u, _)| u == user_id)
            .map(|(_, code)| code.clone())
    }

    /// Keep `user_id` a member of the chat but forget their sealed invite,
    /// as a relay that lost or never stored it would.
    pub fn drop_invite(&self, chat_id: &str, user_id: &str) {
        let mut state = self.state.lock();
        if let Some((_, code)) = state
            .chats
            .iter_mut()
            .filter(|c| c.chat_id == chat_id)
            .flat_map(|c| c.invites.iter_mut())
            .find(|(u, _)| u == user_id)
        {
            code.clear();
        }
    }

    /// Stored (ciphertext) form of a message.
    pub fn stored_message(&self, chat_id: &str, message_id: &str) -> Option<ChatMessage> {
        let state = self.state.lock();
        let chat = state.chats.iter().find(|c| c.chat_id == chat_id)?;
        chat.messages.iter().find(|m| m.message_id == message_id).cloned()
    }

    /// Overwrite a stored message body, simulating relay-side tampering.
    pub fn tamper_message(&self, chat_id: &str, message_id: &str, body: &str) {
        let mut state = self.state.lock();
        if let Some(msg) = state
            .chats
            .iter_mut()
            .filter(|c| c.chat_id == chat_id)
            .flat_map(|c| c.messages.iter_mut())
            .find(|m| m.message_id == message_id)
        {
            msg.message = body.to_owned();
        }
    }

    fn handle(&self, req: &RelayRequest) -> RelayResponse {
        let path = req.path().to_owned();

        if path == "/comms/unfurl" {
            if req.signature.is_some() {
                return status(400, "unfurl is unsigned");
            }
            let previews: Vec<Value> = parse_query(&req.path_and_query)
                .into_iter()
                .filter(|(k, _)| k == "content")
                .map(|(_, url)| json!({ "url": url, "url_type": "website", "title": format!("preview of {url}") }))
                .collect();
            return ok(&previews);
        }

        if let Some(raw_id) = path.strip_prefix("/comms/pubkey/") {
            let user_id = decode(raw_id);
            let state = self.state.lock();
            return match state.pubkeys.get(&user_id) {
                Some(key) => ok(&json!({ "data": key })),
                None => status(404, "user not found"),
            };
        }

        let payload = match req.method {
            RelayMethod::Get => req.path_and_query.as_bytes().to_vec(),
            RelayMethod::Post => req.body.clone().unwrap_or_default(),
        };
        let Some(sig) = req.signature.as_deref() else {
            return status(401, "missing x-sig");
        };
        let Ok(wallet) = recover_address(&payload, sig) else {
            return status(401, "bad signature");
        };

        let mut state = self.state.lock();
        let Some(user_id) = state.wallets.get(&wallet).cloned() else {
            return status(401, "wallet not found");
        };

        let query = parse_query(&req.path_and_query);
        if let Some(claimed) = first(&query, "current_user_id") {
            if claimed != user_id {
                return status(403, "current_user_id does not match signer");
            }
        }

        match (req.method, path.as_str()) {
            (RelayMethod::Post, "/comms/mutate") => state.mutate(&user_id, &payload),
            (RelayMethod::Get, _) if first(&query, "timestamp").is_none() => {
                status(400, "timestamp required")
            }
            (RelayMethod::Get, "/comms/chats") => state.list_chats(&user_id, &query),
            (RelayMethod::Get, "/comms/chats/unread") => {
                let count = state
                    .chats
                    .iter()
                    .filter(|c| c.is_member(&user_id))
                    .filter(|c| c.view_for(&user_id).unread_message_count > 0)
                    .count() as u64;
                ok(&CommsResponse::new(count))
            }
            (RelayMethod::Get, "/comms/chats/blockers") => {
                let blockers: Vec<String> = state
                    .blocks
                    .iter()
                    .filter(|(_, blockee)| *blockee == user_id)
                    .map(|(blocker, _)| blocker.clone())
                    .collect();
                ok(&CommsResponse::new(blockers))
            }
            (RelayMethod::Get, "/comms/chats/blockees") => {
                let blockees: Vec<String> = state
                    .blocks
                    .iter()
                    .filter(|(blocker, _)| *blocker == user_id)
                    .map(|(_, blockee)| blockee.clone())
                    .collect();
                ok(&CommsResponse::new(blockees))
            }
            (RelayMethod::Get, "/comms/chats/permissions") => {
                let ids: Vec<&String> = query.iter().filter(|(k, _)| k == "id").map(|(_, v)| v).collect();
                if ids.is_empty() {
                    return status(400, "invalid id parameter");
                }
                let perms: Vec<Value> = ids
                    .into_iter()
                    .map(|id| {
                        let permits = state.permits.get(id).cloned().unwrap_or_else(|| "all".into());
                        let blocked = state.blocks.contains(&(id.clone(), user_id.clone()));
                        json!({
                            "user_id": id,
                            "permits": permits,
                            "current_user_has_permission": !blocked && permits != "none",
                        })
                    })
                    .collect();
                ok(&json!({ "health": { "is_healthy": true }, "data": perms }))
            }
            (RelayMethod::Get, p) => match p.strip_prefix("/comms/chats/") {
                Some(rest) => match rest.strip_suffix("/messages") {
                    Some(chat_id) => state.list_messages(&user_id, &decode(chat_id), &query),
                    None => state.get_chat(&user_id, &decode(rest)),
                },
                None => status(404, "no route"),
            },
            _ => status(404, "no route"),
        }
    }
}

impl RelayState {
    fn chat_for(&mut self, user_id: &str, chat_id: &str) -> Result<&mut StoredChat, RelayResponse> {
        let chat = self
            .chats
            .iter_mut()
            .find(|c| c.chat_id == chat_id)
            .ok_or_else(|| status(404, "chat not found"))?;
        if !chat.is_member(user_id) {
            return Err(status(403, "not a member"));
        }
        Ok(chat)
    }

    fn get_chat(&mut self, user_id: &str, chat_id: &str) -> RelayResponse {
        *self.chat_fetches.entry(chat_id.to_owned()).or_default() += 1;
        match self.chat_for(user_id, chat_id) {
            Ok(chat) => ok(&CommsResponse::new(chat.view_for(user_id))),
            Err(resp) => resp,
        }
    }

    fn list_chats(&self, user_id: &str, query: &[(String, String)]) -> RelayResponse {
        let mut chats: Vec<UserChat> = self
            .chats
            .iter()
            .filter(|c| c.is_member(user_id))
            .map(|c| c.view_for(user_id))
            .collect();
        let total = chats.len() as u64;
        if let Some(limit) = first(query, "limit").and_then(|l| l.parse::<usize>().ok()) {
            chats.truncate(limit);
        }
        ok(&CommsResponse::with_summary(chats, summary(total)))
    }

    fn list_messages(&mut self, user_id: &str, chat_id: &str, query: &[(String, String)]) -> RelayResponse {
        let chat = match self.chat_for(user_id, chat_id) {
            Ok(chat) => chat,
            Err(resp) => return resp,
        };
        // Newest first.
        let mut messages: Vec<ChatMessage> = chat.messages.iter().rev().cloned().collect();
        let total = messages.len() as u64;
        if let Some(limit) = first(query, "limit").and_then(|l| l.parse::<usize>().ok()) {
            messages.truncate(limit);
        }
        ok(&CommsResponse::with_summary(messages, summary(total)))
    }

    fn mutate(&mut self, user_id: &str, body: &[u8]) -> RelayResponse {
        let Ok(rpc) = serde_json::from_slice::<Value>(body) else {
            return status(400, "bad request: body is not json");
        };
        if rpc.get("timestamp").and_then(Value::as_i64).is_none() {
            return status(400, "bad request: timestamp required");
        }
        if let Some(claimed) = rpc.get("current_user_id").and_then(Value::as_str) {
            if claimed != user_id {
                return status(403, "current_user_id does not match signer");
            }
        }
        let method = rpc["method"].as_str().unwrap_or_default().to_owned();
        let params = &rpc["params"];
        let str_param = |key: &str| params[key].as_str().unwrap_or_default().to_owned();
        let now = Utc::now();

        let result: Result<(), RelayResponse> = match method.as_str() {
            "chat.create" => {
                let invites = parse_invites(&params["invites"]);
                if !invites.iter().any(|(u, _)| u == user_id) {
                    Err(status(400, "bad request: creator must be invited"))
                } else {
                    self.chats.push(StoredChat {
                        chat_id: str_param("chat_id"),
                        created_at: now,
                        invites,
                        messages: Vec::new(),
                        last_read: HashMap::new(),
                    });
                    Ok(())
                }
            }
            "chat.invite" => self.chat_for(user_id, &str_param("chat_id")).map(|chat| {
                for (u, code) in parse_invites(&params["invites"]) {
                    if !chat.is_member(&u) {
                        chat.invites.push((u, code));
                    }
                }
            }),
            "chat.message" => {
                let message = ChatMessage {
                    message_id: str_param("message_id"),
                    sender_user_id: user_id.to_owned(),
                    message: str_param("message"),
                    created_at: now,
                    reactions: Vec::new(),
                };
                self.chat_for(user_id, &str_param("chat_id")).map(|chat| chat.messages.push(message))
            }
            "chat.react" => {
                let message_id = str_param("message_id");
                let reaction = str_param("reaction");
                self.chat_for(user_id, &str_param("chat_id")).and_then(|chat| {
                    let msg = chat
                        .messages
                        .iter_mut()
                        .find(|m| m.message_id == message_id)
                        .ok_or_else(|| status(404, "message not found"))?;
                    msg.reactions.retain(|r| r.user_id != user_id);
                    msg.reactions.push(ChatMessageReaction {
                        user_id: user_id.to_owned(),
                        reaction,
                        created_at: now,
                    });
                    Ok(())
                })
            }
            "chat.read" => self
                .chat_for(user_id, &str_param("chat_id"))
                .map(|chat| {
                    chat.last_read.insert(user_id.to_owned(), now);
                }),
            "chat.block" => {
                self.blocks.insert((user_id.to_owned(), str_param("user_id")));
                Ok(())
            }
            "chat.unblock" => {
                self.blocks.remove(&(user_id.to_owned(), str_param("user_id")));
                Ok(())
            }
            "chat.delete" => self
                .chat_for(user_id, &str_param("chat_id"))
                .map(|chat| chat.invites.retain(|(u, _)| u != user_id)),
            "chat.permit" => {
                self.permits.insert(user_id.to_owned(), str_param("permit"));
                Ok(())
            }
            other => Err(status(400, &format!("bad request: unknown method {other}"))),
        };

        match result {
            Ok(()) => {
                self.rpcs.push(rpc);
                ok(&true)
            }
            Err(resp) => resp,
        }
    }
}

#[async_trait]
impl Transport for MemoryRelay {
    async fn send(&self, request: RelayRequest) -> Result<RelayResponse, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.handle(&request))
    }
}

/// Answers every request with the same body and records what was asked.
pub struct CannedRelay {
    body: Value,
    paths: Mutex<Vec<String>>,
}

impl CannedRelay {
    pub fn new(body: Value) -> Arc<Self> {
        Arc::new(Self { body, paths: Mutex::new(Vec::new()) })
    }

    pub fn client(self: &Arc<Self>) -> ChatsApi {
        let config = ClientConfig { relay_url: RELAY_URL.into(), ..ClientConfig::default() };
        ChatsApi::new(
            config,
            Arc::new(LocalKeyAuthority::generate()),
            Arc::clone(self) as Arc<dyn Transport>,
        )
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().clone()
    }
}

#[async_trait]
impl Transport for CannedRelay {
    async fn send(&self, request: RelayRequest) -> Result<RelayResponse, TransportError> {
        self.paths.lock().push(request.path().to_owned());
        Ok(ok(&self.body))
    }
}

/// Wraps a local key and delays key agreement per counterparty, so that
/// secret resolution for different conversations finishes out of order.
pub struct SlowAuthority {
    inner: LocalKeyAuthority,
    delays: Mutex<HashMap<String, Duration>>,
}

impl SlowAuthority {
    pub fn new() -> Self {
        Self { inner: LocalKeyAuthority::generate(), delays: Mutex::new(HashMap::new()) }
    }

    pub fn delay_for(&self, counterparty: &PublicKeyBytes, delay: Duration) {
        self.delays.lock().insert(counterparty.address(), delay);
    }
}

#[async_trait]
impl SigningAuthority for SlowAuthority {
    fn public_key(&self) -> PublicKeyBytes {
        self.inner.public_key()
    }

    async fn sign(&self, payload: &[u8]) -> Result<RecoverableSignature, CryptoError> {
        self.inner.sign(payload).await
    }

    async fn shared_secret(
        &self,
        counterparty: &PublicKeyBytes,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let delay = self.delays.lock().get(&counterparty.address()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.shared_secret(counterparty).await
    }
}

pub fn created_chat_id(envelope: &dm_proto::RpcEnvelope) -> String {
    match &envelope.rpc {
        dm_proto::Rpc::Create(params) => params.chat_id.clone(),
        other => panic!("expected chat.create, got {}", other.method_name()),
    }
}

pub fn sent_message_id(envelope: &dm_proto::RpcEnvelope) -> String {
    match &envelope.rpc {
        dm_proto::Rpc::Message(params) => params.message_id.clone(),
        other => panic!("expected chat.message, got {}", other.method_name()),
    }
}

fn summary(total: u64) -> Summary {
    Summary { total_count: total, ..Summary::default() }
}

fn parse_invites(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .map(|invites| {
            invites
                .iter()
                .map(|i| {
                    (
                        i["user_id"].as_str().unwrap_or_default().to_owned(),
                        i["invite_code"].as_str().unwrap_or_default().to_owned(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_query(path_and_query: &str) -> Vec<(String, String)> {
    let Some((_, query)) = path_and_query.split_once('?') else {
        return Vec::new();
    };
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (decode(k), decode(v)))
        .collect()
}

fn first<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
    query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw).map(|s| s.into_owned()).unwrap_or_else(|_| raw.to_owned())
}

fn ok<T: Serialize>(body: &T) -> RelayResponse {
    RelayResponse::ok(serde_json::to_vec(body).unwrap())
}

fn status(code: u16, message: &str) -> RelayResponse {
    RelayResponse { status: code, body: message.as_bytes().to_vec() }
}
