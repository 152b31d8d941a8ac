//! `ChatsApi`: every conversation operation, signed and end-to-end encrypted.
//!
//! Writes: validate → resolve secret → encrypt → build RPC → sign → send.
//! Reads:  validate → sign path+query → fetch → resolve secret per record →
//!         decrypt concurrently, preserving the relay's order.
//!
//! Plaintext and secrets are never logged.

use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use dm_crypto::{cipher, invite, ChatSecret, PublicKeyBytes, SealedInvite, SigningAuthority};
use dm_proto::{
    api::{
        ChatMessage, ChatMessageReaction, CommsResponse, Page, UnfurlMetadata, UserChat,
        ValidatedChatPermissions,
    },
    event::ChatWebsocketEventData,
    rpc::{
        ChatCreateParams, ChatIdParams, ChatInvite, ChatInviteParams, ChatMessageParams,
        ChatPermitParams, ChatReactParams, Rpc, RpcEnvelope, UserIdParams,
    },
};

use crate::{
    cache::SecretCache,
    config::ClientConfig,
    directory::PublicKeyDirectory,
    error::{ClientError, Result},
    events::{parse_timestamp, ChatEvent},
    http::HttpTransport,
    params::{
        ChatTarget, CreateChat, GetMessages, GetPermissions, InviteToChat, Permit, React,
        SendMessage, Unfurl, UserTarget, Validate,
    },
    signer::RequestSigner,
    transport::{RelayRequest, Transport},
};

pub const MUTATE_PATH: &str = "/comms/mutate";
pub const CHATS_PATH: &str = "/comms/chats";
pub const LISTEN_PATH: &str = "/comms/chats/ws";
pub const UNFURL_PATH: &str = "/comms/unfurl";

pub struct ChatsApi {
    config: ClientConfig,
    authority: Arc<dyn SigningAuthority>,
    signer: RequestSigner,
    transport: Arc<dyn Transport>,
    directory: PublicKeyDirectory,
    secrets: SecretCache,
}

impl ChatsApi {
    pub fn new(
        config: ClientConfig,
        authority: Arc<dyn SigningAuthority>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            signer: RequestSigner::new(Arc::clone(&authority)),
            directory: PublicKeyDirectory::new(Arc::clone(&transport)),
            secrets: SecretCache::new(),
            config,
            authority,
            transport,
        }
    }

    /// Talk to `config.relay_url` over HTTP.
    pub fn over_http(config: ClientConfig, authority: Arc<dyn SigningAuthority>) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::new(config, authority, transport))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn public_key(&self) -> PublicKeyBytes {
        self.authority.public_key()
    }

    pub fn secrets(&self) -> &SecretCache {
        &self.secrets
    }

    // ── Mutations ────────────────────────────────────────────────────────────

    /// Create a conversation with a fresh secret sealed for every participant.
    pub async fn create(&self, params: CreateChat) -> Result<RpcEnvelope> {
        params.validate("create")?;
        let chat_id = Uuid::new_v4().to_string();
        let secret = ChatSecret::generate();
        let invites = self
            .seal_invites(&params.user_id, &params.invited_user_ids, &secret)
            .await?;
        self.secrets.insert(chat_id.clone(), secret);

        tracing::info!(
            target: "dm_client",
            event = "chat_create",
            chat_id = %chat_id,
            participants = invites.len()
        );
        self.send_rpc(Rpc::Create(ChatCreateParams { chat_id, invites })).await
    }

    /// Seal the existing conversation secret for new members.
    pub async fn invite(&self, params: InviteToChat) -> Result<RpcEnvelope> {
        params.validate("invite")?;
        let secret = self.chat_secret(&params.chat_id).await?;
        let invites = self
            .seal_invites(&params.user_id, &params.invited_user_ids, &secret)
            .await?;
        self.send_rpc(Rpc::Invite(ChatInviteParams { chat_id: params.chat_id, invites }))
            .await
    }

    pub async fn message(&self, params: SendMessage) -> Result<RpcEnvelope> {
        params.validate("message")?;
        let secret = self.chat_secret(&params.chat_id).await?;
        let message = cipher::encrypt_text(&secret, &params.message)?;
        let message_id = params
            .message_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        tracing::info!(
            target: "dm_client",
            event = "chat_message",
            chat_id = %params.chat_id,
            message_id = %message_id,
            plaintext_bytes = params.message.len()
        );
        self.send_rpc(Rpc::Message(ChatMessageParams {
            chat_id: params.chat_id,
            message_id,
            message,
            parent_message_id: params.parent_message_id,
        }))
        .await
    }

    pub async fn react(&self, params: React) -> Result<RpcEnvelope> {
        params.validate("react")?;
        self.send_rpc(Rpc::React(ChatReactParams {
            chat_id: params.chat_id,
            message_id: params.message_id,
            reaction: params.reaction,
        }))
        .await
    }

    pub async fn read(&self, params: ChatTarget) -> Result<RpcEnvelope> {
        params.validate("read")?;
        self.send_rpc(Rpc::Read(ChatIdParams { chat_id: params.chat_id })).await
    }

    pub async fn block(&self, params: UserTarget) -> Result<RpcEnvelope> {
        params.validate("block")?;
        self.send_rpc(Rpc::Block(UserIdParams { user_id: params.user_id })).await
    }

    pub async fn unblock(&self, params: UserTarget) -> Result<RpcEnvelope> {
        params.validate("unblock")?;
        self.send_rpc(Rpc::Unblock(UserIdParams { user_id: params.user_id })).await
    }

    pub async fn delete(&self, params: ChatTarget) -> Result<RpcEnvelope> {
        params.validate("delete")?;
        let envelope = self
            .send_rpc(Rpc::Delete(ChatIdParams { chat_id: params.chat_id.clone() }))
            .await?;
        self.secrets.evict(&params.chat_id);
        Ok(envelope)
    }

    pub async fn permit(&self, params: Permit) -> Result<RpcEnvelope> {
        params.validate("permit")?;
        self.send_rpc(Rpc::Permit(ChatPermitParams { permit: params.permit })).await
    }

    // ── Reads ────────────────────────────────────────────────────────────────

    /// `data` is `None` when the relay has no record for this chat.
    pub async fn get(&self, params: ChatTarget) -> Result<CommsResponse<Option<UserChat>>> {
        params.validate("get")?;
        let resp: CommsResponse<Option<UserChat>> =
            self.signed_read(&chat_path(&params.chat_id), Vec::new()).await?;
        let CommsResponse { health, summary, data } = resp;
        let data = match data {
            Some(chat) => Some(self.decrypt_chat(chat).await?),
            None => None,
        };
        Ok(CommsResponse { health, summary, data })
    }

    pub async fn get_all(&self, page: Page) -> Result<CommsResponse<Vec<UserChat>>> {
        let resp: CommsResponse<Vec<UserChat>> =
            self.signed_read(CHATS_PATH, page.query_pairs()).await?;
        let CommsResponse { health, summary, data } = resp;
        let data = try_join_all(data.into_iter().map(|chat| self.decrypt_chat(chat))).await?;

        tracing::debug!(target: "dm_client", event = "chats_fetched", count = data.len());
        Ok(CommsResponse { health, summary, data })
    }

    pub async fn get_messages(&self, params: GetMessages) -> Result<CommsResponse<Vec<ChatMessage>>> {
        params.validate("get_messages")?;
        let path = format!("{}/messages", chat_path(&params.chat_id));
        let resp: CommsResponse<Vec<ChatMessage>> =
            self.signed_read(&path, params.page.query_pairs()).await?;
        let CommsResponse { health, summary, data } = resp;
        if data.is_empty() {
            return Ok(CommsResponse { health, summary, data });
        }

        let secret = self.chat_secret(&params.chat_id).await?;
        let secret = &secret;
        let data = try_join_all(data.into_iter().map(|mut msg| async move {
            msg.message = cipher::decrypt_text(secret, &msg.message)?;
            Ok::<_, ClientError>(msg)
        }))
        .await?;

        tracing::debug!(
            target: "dm_client",
            event = "messages_fetched",
            chat_id = %params.chat_id,
            count = data.len()
        );
        Ok(CommsResponse { health, summary, data })
    }

    /// Number of conversations with unread messages.
    pub async fn get_unread_count(&self) -> Result<CommsResponse<u64>> {
        self.signed_read(&format!("{CHATS_PATH}/unread"), Vec::new()).await
    }

    pub async fn get_permissions(
        &self,
        params: GetPermissions,
    ) -> Result<CommsResponse<Vec<ValidatedChatPermissions>>> {
        params.validate("get_permissions")?;
        let pairs = params.user_ids.into_iter().map(|id| ("id", id)).collect();
        self.signed_read(&format!("{CHATS_PATH}/permissions"), pairs).await
    }

    /// Users who have blocked the current user.
    pub async fn get_blockers(&self) -> Result<CommsResponse<Vec<String>>> {
        self.signed_read(&format!("{CHATS_PATH}/blockers"), Vec::new()).await
    }

    /// Users the current user has blocked.
    pub async fn get_blockees(&self) -> Result<CommsResponse<Vec<String>>> {
        self.signed_read(&format!("{CHATS_PATH}/blockees"), Vec::new()).await
    }

    /// Link previews for `urls`. Unsigned; the relay answers with a bare array.
    pub async fn unfurl(&self, params: Unfurl) -> Result<Vec<UnfurlMetadata>> {
        params.validate("unfurl")?;
        let query = params
            .urls
            .iter()
            .map(|url| format!("content={}", urlencoding::encode(url)))
            .collect::<Vec<_>>()
            .join("&");
        let request = RelayRequest::get(format!("{UNFURL_PATH}?{query}"));
        let resp = self.transport.send(request).await?.error_for_status()?;
        Ok(serde_json::from_slice(&resp.body)?)
    }

    // ── Live events ──────────────────────────────────────────────────────────

    /// Signed websocket URL. The signature travels as a query parameter
    /// because browsers cannot set headers on the upgrade request.
    pub async fn listen_url(&self) -> Result<String> {
        let path = self.read_path(LISTEN_PATH, Vec::new());
        let signature = self.signer.sign_request(path.as_bytes()).await?;
        Ok(format!(
            "{}{path}&signature={}",
            websocket_base(self.config.base_url()),
            urlencoding::encode(&signature)
        ))
    }

    /// Decode one websocket frame. Methods other than messages and reactions
    /// yield `None`.
    pub async fn decode_event(&self, frame: &str) -> Result<Option<ChatEvent>> {
        let event: ChatWebsocketEventData = serde_json::from_str(frame)?;
        match event.rpc.method.as_str() {
            "chat.message" => {
                let params: ChatMessageParams = serde_json::from_value(event.rpc.params)?;
                let secret = self.chat_secret(&params.chat_id).await?;
                let message = cipher::decrypt_text(&secret, &params.message)?;
                Ok(Some(ChatEvent::Message {
                    chat_id: params.chat_id,
                    message_id: params.message_id,
                    sender_user_id: event.metadata.user_id,
                    message,
                    parent_message_id: params.parent_message_id,
                    sent_at: parse_timestamp(&event.metadata.timestamp)?,
                }))
            }
            "chat.react" => {
                let params: ChatReactParams = serde_json::from_value(event.rpc.params)?;
                Ok(Some(ChatEvent::Reaction {
                    chat_id: params.chat_id,
                    message_id: params.message_id,
                    reaction: ChatMessageReaction {
                        user_id: event.metadata.user_id,
                        reaction: params.reaction,
                        created_at: parse_timestamp(&event.metadata.timestamp)?,
                    },
                }))
            }
            other => {
                tracing::debug!(target: "dm_client", event = "ws_event_ignored", method = %other);
                Ok(None)
            }
        }
    }

    /// Forget every cached conversation secret.
    pub fn logout(&self) {
        let cached = self.secrets.len();
        self.secrets.clear();
        tracing::info!(target: "dm_client", event = "logout", cleared_secrets = cached);
    }

    // ── Secrets ──────────────────────────────────────────────────────────────

    /// Conversation secret from cache, or fetched and opened from the
    /// current user's invite. At most one resolution runs per chat.
    pub async fn chat_secret(&self, chat_id: &str) -> Result<ChatSecret> {
        self.secrets
            .get_or_resolve(chat_id, || self.fetch_chat_secret(chat_id))
            .await
    }

    async fn fetch_chat_secret(&self, chat_id: &str) -> Result<ChatSecret> {
        let resp: CommsResponse<Option<UserChat>> =
            self.signed_read(&chat_path(chat_id), Vec::new()).await?;
        let chat = resp.data.ok_or_else(|| {
            ClientError::Protocol(format!("relay returned no record for chat {chat_id}"))
        })?;
        self.open_invite(chat_id, chat.invite_code.as_deref()).await
    }

    /// Like `chat_secret`, but opens the invite already on the record.
    async fn secret_for(&self, chat: &UserChat) -> Result<ChatSecret> {
        self.secrets
            .get_or_resolve(&chat.chat_id, || async {
                match chat.invite_code.as_deref().filter(|code| !code.is_empty()) {
                    Some(code) => self.open_invite(&chat.chat_id, Some(code)).await,
                    None => self.fetch_chat_secret(&chat.chat_id).await,
                }
            })
            .await
    }

    async fn open_invite(&self, chat_id: &str, invite_code: Option<&str>) -> Result<ChatSecret> {
        let Some(invite_code) = invite_code.filter(|code| !code.is_empty()) else {
            return Err(ClientError::Protocol(format!(
                "chat {chat_id} has no invite for the current user"
            )));
        };
        let sealed = SealedInvite::from_b64(invite_code)?;
        let secret = invite::open(self.authority.as_ref(), &sealed).await?;
        tracing::debug!(target: "dm_client", event = "chat_secret_resolved", chat_id = %chat_id);
        Ok(secret)
    }

    async fn decrypt_chat(&self, mut chat: UserChat) -> Result<UserChat> {
        if chat.last_message.is_empty() {
            return Ok(chat);
        }
        let secret = self.secret_for(&chat).await?;
        chat.last_message = cipher::decrypt_preview(&secret, &chat.last_message)?;
        Ok(chat)
    }

    /// One invite per distinct participant, in `[user_id, invited...]` order.
    async fn seal_invites(
        &self,
        user_id: &str,
        invited_user_ids: &[String],
        secret: &ChatSecret,
    ) -> Result<Vec<ChatInvite>> {
        let mut participants: Vec<&str> = Vec::with_capacity(invited_user_ids.len() + 1);
        for id in std::iter::once(user_id).chain(invited_user_ids.iter().map(String::as_str)) {
            if !participants.contains(&id) {
                participants.push(id);
            }
        }

        try_join_all(participants.into_iter().map(|participant| async move {
            let key = self.directory.lookup(participant).await?;
            let sealed = invite::seal(self.authority.as_ref(), &key, secret).await?;
            Ok::<_, ClientError>(ChatInvite {
                user_id: participant.to_owned(),
                invite_code: sealed.to_b64(),
            })
        }))
        .await
    }

    // ── Wire ─────────────────────────────────────────────────────────────────

    async fn send_rpc(&self, rpc: Rpc) -> Result<RpcEnvelope> {
        let envelope = RpcEnvelope::new(rpc, self.config.current_user_id.clone(), now_millis());
        let body = serde_json::to_vec(&envelope)?;
        let request = self.signer.signed_post(MUTATE_PATH, body).await?;
        self.transport.send(request).await?.error_for_status()?;

        tracing::info!(target: "dm_client", event = "rpc_sent", method = envelope.method_name());
        Ok(envelope)
    }

    async fn signed_read<T: DeserializeOwned>(
        &self,
        path: &str,
        pairs: Vec<(&'static str, String)>,
    ) -> Result<CommsResponse<T>> {
        let request = self.signer.signed_get(self.read_path(path, pairs)).await?;
        let resp = self.transport.send(request).await?.error_for_status()?;
        Ok(serde_json::from_slice(&resp.body)?)
    }

    /// `path?timestamp=..[&pairs..][&current_user_id=..]`, the exact bytes signed.
    fn read_path(&self, path: &str, pairs: Vec<(&'static str, String)>) -> String {
        let mut query = vec![("timestamp", now_millis().to_string())];
        query.extend(pairs);
        if let Some(user_id) = &self.config.current_user_id {
            query.push(("current_user_id", user_id.clone()));
        }
        let query = query
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{path}?{query}")
    }
}

fn chat_path(chat_id: &str) -> String {
    format!("{CHATS_PATH}/{}", urlencoding::encode(chat_id))
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn websocket_base(base_url: &str) -> String {
    if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_owned()
    }
}
